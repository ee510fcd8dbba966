//! Configuration management for a Click application.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - An optional `config/click.toml` next to the working directory
//! - Configuration file support through `CONFIG_PATH`
//! - Environment variable overrides (`CLICK__` prefix)
//! - Component-wise validation
mod app;
mod pages;
mod server;
mod servlet;
pub use app::*;
pub use pages::*;
pub use server::*;
pub use servlet::*;


use std::env;
use std::fmt::Debug;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Main configuration container of a Click application
///
/// Combines all subsystem configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. `config/click.toml` (optional)
/// 3. Configuration file specified by `CONFIG_PATH`
/// 4. Environment variables (highest priority)
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct ClickConfig {
    /// Application mode, charset, locale and template settings
    #[serde(default)]
    pub app: AppConfig,
    /// Servlet init parameters
    #[serde(default)]
    pub servlet: ServletConfig,
    /// HTTP front-end settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Response headers, common and per page
    #[serde(default)]
    pub pages: PagesConfig,
}

impl Debug for ClickConfig {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ClickConfig")
            .field("mode", &self.app.mode)
            .field("app_reloadable", &self.servlet.app_reloadable)
            .field("port", &self.server.port)
            .finish()
    }
}

impl ClickConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// # Note
    /// Validation is deferred to allow further overrides via
    /// `with_override_config()`. Callers MUST call `validate()` before using
    /// the configuration.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("CONFIG_PATH", "config/production.toml");
    /// std::env::set_var("CLICK__APP__MODE", "production");
    /// let cfg = ClickConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder()
            .add_source(Config::try_from(&Self::default())?)
            .add_source(File::with_name("config/click").required(false));

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(environment());

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional configuration overrides from file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Latest environment variables (highest priority)
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(environment())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates configuration and returns validated instance.
    pub fn validate(self) -> Result<Self> {
        self.app.validate()?;
        self.servlet.validate()?;
        self.server.validate()?;
        self.pages.validate()?;
        Ok(self)
    }
}

fn environment() -> Environment {
    Environment::with_prefix("CLICK")
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}
