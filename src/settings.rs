//! Loading [`Settings`] from a config file and the environment.

use crate::Session;
use config::{Config, ConfigError, Environment, File};
use serde_derive::Deserialize;
use std::{
    fmt::{self, Debug, Formatter},
    path::{Path, PathBuf},
    time::Duration,
};

/// The prefix for environment variables, e.g. `ROLLCALL_PASSWORD`.
pub const ENV_PREFIX: &str = "ROLLCALL";

/// The config file looked for in the current directory when no path is
/// given (any extension the `config` crate understands).
pub const DEFAULT_CONFIG_NAME: &str = "config";

/// Everything needed to log in and poll.
#[derive(Clone, PartialEq, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_idp_base_url")]
    pub idp_base_url: String,
    #[serde(default = "default_app_base_url")]
    pub app_base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_idle_interval_secs")]
    pub idle_interval_secs: u64,
    #[serde(default = "default_cooldown_interval_secs")]
    pub cooldown_interval_secs: u64,
    /// Keep polling after the first batch of codes is found.
    #[serde(default)]
    pub continuous: bool,
    #[serde(default = "default_max_concurrent_lookups")]
    pub max_concurrent_lookups: usize,
    /// Only consider roll-calls that are in progress, unexpired, and where
    /// the student is still absent.
    #[serde(default)]
    pub only_open: bool,
    /// Also write logs to this file.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

fn default_user_agent() -> String { crate::DEFAULT_USER_AGENT.to_string() }

fn default_idp_base_url() -> String {
    crate::DEFAULT_IDP_BASE_URL.to_string()
}

fn default_app_base_url() -> String {
    crate::DEFAULT_APP_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 { crate::DEFAULT_TIMEOUT.as_secs() }

fn default_idle_interval_secs() -> u64 { 2 }

fn default_cooldown_interval_secs() -> u64 { 200 }

fn default_max_concurrent_lookups() -> usize { 1 }

impl Settings {
    /// Load settings from `path` (or `config.*` in the current directory if
    /// it exists), then `ROLLCALL_*` environment variables, then
    /// `overrides`.
    pub fn load(
        path: Option<&Path>,
        overrides: Overrides,
    ) -> Result<Self, SettingsError> {
        Settings::load_with_environment(
            path,
            Environment::with_prefix(ENV_PREFIX),
            overrides,
        )
    }

    /// Environment values are kept as strings so credentials like `007`
    /// reach the portal untouched. Numeric and boolean fields are converted
    /// during deserialization.
    fn load_with_environment(
        path: Option<&Path>,
        environment: Environment,
        overrides: Overrides,
    ) -> Result<Self, SettingsError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let config = Config::builder()
            .add_source(file)
            .add_source(environment)
            .set_override_option("username", overrides.username)?
            .set_override_option("password", overrides.password)?
            .set_override_option("continuous", overrides.continuous)?
            .build()?;

        Settings::from_config(config)
    }

    /// Deserialize and validate an already assembled [`Config`].
    pub fn from_config(config: Config) -> Result<Self, SettingsError> {
        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;

        log::debug!("Loaded settings {:#?}", settings);

        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.username.trim().is_empty() {
            return Err(SettingsError::Missing("username"));
        }
        if self.password.trim().is_empty() {
            return Err(SettingsError::Missing("password"));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Create a fresh [`Session`] using these settings.
    pub fn session(&self) -> Result<Session, crate::SessionError> {
        Session::builder()
            .user_agent(self.user_agent.as_str())
            .timeout(self.request_timeout())
            .idp_base_url(self.idp_base_url.as_str())
            .app_base_url(self.app_base_url.as_str())
            .build()
    }
}

impl Debug for Settings {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("username", &self.username)
            .field("password", &"***")
            .field("user_agent", &self.user_agent)
            .field("idp_base_url", &self.idp_base_url)
            .field("app_base_url", &self.app_base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("idle_interval_secs", &self.idle_interval_secs)
            .field("cooldown_interval_secs", &self.cooldown_interval_secs)
            .field("continuous", &self.continuous)
            .field("max_concurrent_lookups", &self.max_concurrent_lookups)
            .field("only_open", &self.only_open)
            .field("log_file", &self.log_file)
            .finish()
    }
}

/// Values from the command-line which take precedence over everything else.
#[derive(Default, Clone, PartialEq)]
pub struct Overrides {
    pub username: Option<String>,
    pub password: Option<String>,
    pub continuous: Option<bool>,
}

/// Errors that may occur while loading [`Settings`].
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Unable to read the configuration")]
    Config(#[from] ConfigError),
    #[error("The configuration is missing a {0}")]
    Missing(&'static str),
}
