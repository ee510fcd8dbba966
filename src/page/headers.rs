use std::time::SystemTime;

use config::ConfigError;
use imbl::HashMap;
use tracing::warn;

use crate::utils::http_date;
use crate::utils::system_time_from_millis;
use crate::Error;
use crate::HeaderConfig;
use crate::HeaderKind;
use crate::Response;
use crate::Result;

/// Typed value of a page response header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageHeaderValue {
    Text(String),
    Int(i64),
    Date(SystemTime),
}

impl PageHeaderValue {
    /// Wire representation; dates use the HTTP date format
    pub fn render(&self) -> String {
        match self {
            PageHeaderValue::Text(s) => s.clone(),
            PageHeaderValue::Int(i) => i.to_string(),
            PageHeaderValue::Date(t) => http_date(*t),
        }
    }
}

impl From<&str> for PageHeaderValue {
    fn from(s: &str) -> Self {
        PageHeaderValue::Text(s.to_string())
    }
}

impl From<String> for PageHeaderValue {
    fn from(s: String) -> Self {
        PageHeaderValue::Text(s)
    }
}

impl From<i64> for PageHeaderValue {
    fn from(i: i64) -> Self {
        PageHeaderValue::Int(i)
    }
}

impl From<SystemTime> for PageHeaderValue {
    fn from(t: SystemTime) -> Self {
        PageHeaderValue::Date(t)
    }
}

/// Immutable response header map of a page.
///
/// Every update returns a new map sharing structure with the old one, so a
/// page can start from the application's headers and change its own copy
/// without affecting other pages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageHeaders {
    map: HashMap<String, PageHeaderValue>,
}

impl PageHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Headers disabling client side caching
    pub fn no_cache() -> Self {
        Self::new()
            .with("Pragma", "no-cache")
            .with(
                "Cache-Control",
                "no-store, no-cache, must-revalidate, post-check=0, pre-check=0",
            )
            .with("Expires", system_time_from_millis(1))
    }

    pub fn from_config(headers: &[HeaderConfig]) -> Result<Self> {
        let mut map = HashMap::new();
        for header in headers {
            let value = match header.kind {
                HeaderKind::String => PageHeaderValue::Text(header.value.clone()),
                HeaderKind::Integer | HeaderKind::Date => {
                    let number = header.value.trim().parse::<i64>().map_err(|_| {
                        Error::Config(ConfigError::Message(format!(
                            "header {} expects an integer value, got '{}'",
                            header.name, header.value
                        )))
                    })?;
                    if header.kind == HeaderKind::Date {
                        PageHeaderValue::Date(system_time_from_millis(number))
                    } else {
                        PageHeaderValue::Int(number)
                    }
                }
            };
            map.insert(header.name.clone(), value);
        }
        Ok(Self { map })
    }

    pub fn with(
        &self,
        name: impl Into<String>,
        value: impl Into<PageHeaderValue>,
    ) -> Self {
        Self {
            map: self.map.update(name.into(), value.into()),
        }
    }

    pub fn without(
        &self,
        name: &str,
    ) -> Self {
        Self {
            map: self.map.without(name),
        }
    }

    /// Union of both maps; entries of `overrides` win
    pub fn merged(
        &self,
        overrides: &PageHeaders,
    ) -> Self {
        Self {
            map: overrides.map.clone().union(self.map.clone()),
        }
    }

    pub fn get(
        &self,
        name: &str,
    ) -> Option<&PageHeaderValue> {
        self.map.get(name)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Entries sorted by header name
    pub fn entries(&self) -> Vec<(&String, &PageHeaderValue)> {
        let mut entries: Vec<_> = self.map.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    /// Sets every header on `response`. `Content-Encoding` is never set from
    /// page headers and invalid entries are skipped.
    pub fn apply_to(
        &self,
        response: &mut Response,
    ) {
        for (name, value) in self.entries() {
            if name.eq_ignore_ascii_case("content-encoding") {
                continue;
            }
            if let Err(e) = response.set_header(name, &value.render()) {
                warn!("skipping page header {}: {}", name, e);
            }
        }
    }
}
