use std::collections::HashSet;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Type of a configured response header value
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum HeaderKind {
    #[default]
    String,
    Integer,
    /// Milliseconds since the Unix epoch, rendered as an HTTP date
    Date,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct HeaderConfig {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub kind: HeaderKind,
}

impl HeaderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Config(ConfigError::Message("header name cannot be empty".into())));
        }
        match self.kind {
            HeaderKind::String => {}
            HeaderKind::Integer | HeaderKind::Date => {
                if self.value.trim().parse::<i64>().is_err() {
                    return Err(Error::Config(ConfigError::Message(format!(
                        "header {} expects an integer value, got '{}'",
                        self.name, self.value
                    ))));
                }
            }
        }
        Ok(())
    }
}

/// Per page overrides
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PageConfig {
    pub path: String,
    /// Template rendered for this page. Defaults to the page path.
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub headers: Vec<HeaderConfig>,
}

/// Response headers applied to pages
///
/// `headers` replace the built-in no-cache defaults when non-empty. Headers
/// listed under a `[[pages.page]]` entry are merged over the common ones.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct PagesConfig {
    #[serde(default)]
    pub headers: Vec<HeaderConfig>,

    #[serde(default)]
    pub page: Vec<PageConfig>,
}

impl PagesConfig {
    pub fn validate(&self) -> Result<()> {
        for header in &self.headers {
            header.validate()?;
        }

        let mut seen = HashSet::new();
        for page in &self.page {
            if page.path.trim().is_empty() {
                return Err(Error::Config(ConfigError::Message("page path cannot be empty".into())));
            }
            if !seen.insert(page.path.as_str()) {
                return Err(Error::Config(ConfigError::Message(format!(
                    "page {} configured more than once",
                    page.path
                ))));
            }
            for header in &page.headers {
                header.validate()?;
            }
        }
        Ok(())
    }

    pub fn page(
        &self,
        path: &str,
    ) -> Option<&PageConfig> {
        self.page.iter().find(|p| p.path == path)
    }
}
