//! kadm5 Configuration System
//!
//! This crate provides TOML-based configuration with environment variable override support.
//! It carries both the explicit session settings (what the caller asked for) and the
//! Kerberos library defaults consulted when a setting is absent (default realm,
//! per-realm admin servers), plus the character classes for random passwords.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Default port of the administration service.
pub const DEFAULT_KADMIND_PORT: u16 = 749;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub session: SessionSettings,
    pub libdefaults: LibDefaults,
    /// Per-realm settings keyed by realm name
    pub realms: BTreeMap<String, RealmSettings>,
    pub password: PasswordSettings,
}

/// Explicit connection settings. Absent values fall back to library defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Client principal; the instance is always forced to `admin`
    pub client: Option<String>,
    pub realm: Option<String>,
    /// Admin server as `host[:port]`; an embedded port overrides `port`
    pub admin_server: Option<String>,
    pub port: Option<u16>,
    /// Credential cache name (`TYPE:residual`, `FILE:` assumed when no type is given)
    pub ccache: Option<String>,
}

/// Library-wide defaults, the equivalent of krb5.conf `[libdefaults]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LibDefaults {
    pub default_realm: Option<String>,
}

/// Realm configuration, the equivalent of a krb5.conf `[realms]` entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RealmSettings {
    pub admin_server: Option<String>,
}

/// Random password generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordSettings {
    pub classes: Vec<CharacterClassSettings>,
}

impl Default for PasswordSettings {
    fn default() -> Self {
        Self {
            classes: vec![
                CharacterClassSettings::new("abcdefghijklmnopqrstuvwxyz", 7),
                CharacterClassSettings::new("ABCDEFGHIJKLMNOPQRSTUVWXYZ", 2),
                CharacterClassSettings::new("@$%&*()-+=:,/<>1234567890", 1),
            ],
        }
    }
}

/// One weighted character class: `frequency` characters are drawn from `charset`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterClassSettings {
    pub charset: String,
    pub frequency: u32,
}

impl CharacterClassSettings {
    pub fn new(charset: impl Into<String>, frequency: u32) -> Self {
        Self {
            charset: charset.into(),
            frequency,
        }
    }
}

impl AdminConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AdminConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable override
    pub fn load() -> Result<Self, ConfigError> {
        let loader = ConfigLoader::new();
        loader.load()
    }

    /// Admin server string configured for a realm, if any
    pub fn realm_admin_server(&self, realm: &str) -> Option<&str> {
        self.realms
            .get(realm)
            .and_then(|r| r.admin_server.as_deref())
            .filter(|s| !s.is_empty())
    }

    /// Check settings that would otherwise only fail deep inside a session
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.port == Some(0) {
            return Err(ConfigError::ValidationError(
                "session.port must be between 1 and 65535".to_string(),
            ));
        }

        if self.password.classes.is_empty() {
            return Err(ConfigError::ValidationError(
                "password.classes must not be empty".to_string(),
            ));
        }

        for class in &self.password.classes {
            if class.frequency > 0 && class.charset.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "password class with frequency {} has an empty charset",
                    class.frequency
                )));
            }
            if !class.charset.is_ascii() {
                return Err(ConfigError::ValidationError(format!(
                    "password class '{}' contains non-ASCII characters",
                    class.charset
                )));
            }
        }

        Ok(())
    }

    /// Generate an example TOML configuration
    pub fn example_toml() -> String {
        r#"# kadm5 Configuration
# Environment variables override these settings

[session]
# client = "jdoe"              # instance is forced to /admin
# realm = "EXAMPLE.COM"
# admin_server = "kdc.example.com:749"
# port = 749
# ccache = "FILE:/tmp/krb5cc_1000"

[libdefaults]
default_realm = "EXAMPLE.COM"

[realms."EXAMPLE.COM"]
admin_server = "kdc.example.com"

[[password.classes]]
charset = "abcdefghijklmnopqrstuvwxyz"
frequency = 7

[[password.classes]]
charset = "ABCDEFGHIJKLMNOPQRSTUVWXYZ"
frequency = 2

[[password.classes]]
charset = "@$%&*()-+=:,/<>1234567890"
frequency = 1
"#
        .to_string()
    }
}
