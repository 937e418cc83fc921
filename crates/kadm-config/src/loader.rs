//! Configuration loader with file and environment variable support

use crate::{AdminConfig, ConfigError};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "kadm5.toml",
    "./config/kadm5.toml",
    "/etc/kadm5/kadm5.toml",
];

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found) with environment variable overrides
    pub fn load(&self) -> Result<AdminConfig, ConfigError> {
        let mut config = AdminConfig::default();

        if let Some(path) = self.find_config_file() {
            info!(?path, "Loading configuration from file");
            config = AdminConfig::from_file(&path)?;
        }

        self.apply_env_overrides(&mut config);
        config.validate()?;

        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
        }

        if let Ok(path) = env::var("KADM5_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&self, config: &mut AdminConfig) {
        apply_overrides(config, |key| env::var(key).ok());
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply overrides from an arbitrary variable source.
pub(crate) fn apply_overrides<F>(config: &mut AdminConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    // Session
    if let Some(val) = lookup("KADM5_CLIENT") {
        config.session.client = Some(val);
    }
    if let Some(val) = lookup("KADM5_REALM") {
        config.session.realm = Some(val);
    }
    if let Some(val) = lookup("KADM5_ADMIN_SERVER") {
        config.session.admin_server = Some(val);
    }
    if let Some(val) = lookup("KADM5_PORT") {
        match val.parse() {
            Ok(port) => config.session.port = Some(port),
            Err(_) => warn!(value = %val, "Ignoring unparsable KADM5_PORT"),
        }
    }
    if let Some(val) = lookup("KRB5CCNAME") {
        config.session.ccache = Some(val);
    }

    // Library defaults
    if let Some(val) = lookup("KADM5_DEFAULT_REALM") {
        config.libdefaults.default_realm = Some(val);
    }
}
