use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Servlet init parameters
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServletConfig {
    /// `app-reloadable`: enables `/click/reload-app.htm` for `click-admin` callers
    /// Default: false
    #[serde(default)]
    pub app_reloadable: bool,

    /// Idle time after which a session expires
    /// Default: 1800 seconds
    #[serde(default = "default_session_timeout")]
    pub session_timeout_secs: u64,

    /// Number of pooled output buffers kept between requests
    /// Default: 40
    #[serde(default = "default_writer_pool_size")]
    pub writer_pool_size: usize,
}

impl Default for ServletConfig {
    fn default() -> Self {
        Self {
            app_reloadable: false,
            session_timeout_secs: default_session_timeout(),
            writer_pool_size: default_writer_pool_size(),
        }
    }
}

impl ServletConfig {
    pub fn validate(&self) -> Result<()> {
        if self.session_timeout_secs == 0 {
            return Err(Error::Config(ConfigError::Message(
                "session_timeout_secs must be greater than 0".into(),
            )));
        }
        Ok(())
    }
}

fn default_session_timeout() -> u64 {
    1800
}
fn default_writer_pool_size() -> usize {
    40
}
