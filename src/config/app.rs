use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;
use unic_langid::LanguageIdentifier;

use crate::constants::DEFAULT_CHARSET;
use crate::Error;
use crate::Result;

/// Application mode, controlling diagnostics and log verbosity
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Production,
    Profile,
    #[default]
    Development,
    Debug,
    Trace,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Production => "production",
            Mode::Profile => "profile",
            Mode::Development => "development",
            Mode::Debug => "debug",
            Mode::Trace => "trace",
        }
    }

    /// Default `tracing` filter directive for this mode
    pub fn log_filter(&self) -> &'static str {
        match self {
            Mode::Production => "warn",
            Mode::Profile | Mode::Development => "info",
            Mode::Debug => "debug",
            Mode::Trace => "trace",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Mode::Production)
    }
}

impl fmt::Display for Mode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "production" => Ok(Mode::Production),
            "profile" => Ok(Mode::Profile),
            "development" => Ok(Mode::Development),
            "debug" => Ok(Mode::Debug),
            "trace" => Ok(Mode::Trace),
            other => Err(Error::Config(ConfigError::Message(format!(
                "invalid application mode: {}",
                other
            )))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    /// Application mode
    /// Default: development
    #[serde(default)]
    pub mode: Mode,

    /// Character encoding applied to requests and rendered responses
    /// Default: UTF-8
    #[serde(default = "default_charset")]
    pub charset: String,

    /// Application default locale, consulted after the session locale
    /// Default: none (fall back to the request's Accept-Language)
    #[serde(default)]
    pub locale: Option<String>,

    /// Root directory of page templates
    /// Default: "templates"
    #[serde(default = "default_template_dir")]
    pub template_dir: PathBuf,

    /// Maximum number of nested server side forwards for one request
    /// Default: 8
    #[serde(default = "default_forward_depth_limit")]
    pub forward_depth_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            charset: default_charset(),
            locale: None,
            template_dir: default_template_dir(),
            forward_depth_limit: default_forward_depth_limit(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if self.charset.trim().is_empty() {
            return Err(Error::Config(ConfigError::Message("charset cannot be empty".into())));
        }

        if let Some(locale) = &self.locale {
            if locale.parse::<LanguageIdentifier>().is_err() {
                return Err(Error::Config(ConfigError::Message(format!(
                    "invalid default locale: {}",
                    locale
                ))));
            }
        }

        if self.forward_depth_limit == 0 {
            return Err(Error::Config(ConfigError::Message(
                "forward_depth_limit must be greater than 0".into(),
            )));
        }

        Ok(())
    }

    /// The configured default locale, if any and well formed
    pub fn default_locale(&self) -> Option<LanguageIdentifier> {
        self.locale.as_deref().and_then(|l| l.parse().ok())
    }
}

fn default_charset() -> String {
    DEFAULT_CHARSET.to_string()
}
fn default_template_dir() -> PathBuf {
    PathBuf::from("templates")
}
fn default_forward_depth_limit() -> usize {
    8
}
