//! Configuration types for Parley.
//!
//! `BotConfig` represents the top-level `config.toml`: language tag, NLU
//! credentials, and an optional persistence connection descriptor. Supplying
//! a `[persistence]` table is what turns session tracking on.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ConfigError;

/// Top-level configuration accepted at construction.
#[derive(Debug, Deserialize)]
pub struct BotConfig {
    /// Language tag the bot converses in (e.g. "en-US").
    pub language: String,

    pub nlu: NluConfig,

    /// Connection descriptor for the session store. Absent means session
    /// tracking is disabled.
    #[serde(default)]
    pub persistence: Option<PersistenceConfig>,

    #[serde(default)]
    pub fallback: FallbackConfig,
}

/// Credentials and endpoint for the NLU service.
#[derive(Debug, Deserialize)]
pub struct NluConfig {
    /// Base URL of the NLU service.
    pub endpoint: String,
    pub project_id: String,
    /// API key, never logged.
    #[serde(deserialize_with = "deserialize_secret")]
    pub api_key: SecretString,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

/// Which backend holds sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreDriver {
    #[default]
    Sqlite,
    Memory,
}

impl fmt::Display for StoreDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreDriver::Sqlite => write!(f, "sqlite"),
            StoreDriver::Memory => write!(f, "memory"),
        }
    }
}

impl FromStr for StoreDriver {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(StoreDriver::Sqlite),
            "memory" => Ok(StoreDriver::Memory),
            other => Err(format!("invalid store driver: '{other}'")),
        }
    }
}

/// Connection descriptor for the session store.
///
/// For the SQLite driver, `host` is the directory holding the database file
/// and `database` its file stem. The network fields are accepted so the same
/// descriptor shape works for any backend; the SQLite driver ignores them.
#[derive(Debug, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default)]
    pub driver: StoreDriver,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_secret")]
    pub password: Option<SecretString>,
    #[serde(default)]
    pub tls: bool,
    #[serde(default)]
    pub replica_set: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,

    /// Set by [`BotConfig::validate`] whenever a descriptor is present.
    #[serde(skip)]
    pub enabled: bool,
}

impl PersistenceConfig {
    /// Location of the SQLite database file, resolving a relative `host`
    /// against `data_dir`.
    pub fn sqlite_path(&self, data_dir: &Path) -> PathBuf {
        let host = Path::new(&self.host);
        let dir = if host.is_absolute() {
            host.to_path_buf()
        } else {
            data_dir.join(host)
        };
        dir.join(format!("{}.db", self.database))
    }

    /// Names of the set fields that only matter for networked backends.
    pub fn network_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.username.is_some() {
            fields.push("username");
        }
        if self.password.is_some() {
            fields.push("password");
        }
        if self.tls {
            fields.push("tls");
        }
        if self.replica_set.is_some() {
            fields.push("replica_set");
        }
        if self.port.is_some() {
            fields.push("port");
        }
        fields
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.password.is_some() && self.username.is_none() {
            return Err(ConfigError::Invalid {
                field: "persistence.password",
                reason: "a password requires a username".to_string(),
            });
        }
        if self.port == Some(0) {
            return Err(ConfigError::Invalid {
                field: "persistence.port",
                reason: "must be non-zero".to_string(),
            });
        }
        if self.driver == StoreDriver::Sqlite {
            if self.host.trim().is_empty() {
                return Err(ConfigError::Missing("persistence.host"));
            }
            if self.database.trim().is_empty() {
                return Err(ConfigError::Missing("persistence.database"));
            }
            if self.database.contains(['/', '\\']) {
                return Err(ConfigError::Invalid {
                    field: "persistence.database",
                    reason: "must be a name, not a path".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Re-prompts sent when the NLU layer reports it did not understand.
///
/// Entry `n - 1` is used for the `n`th consecutive miss.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    #[serde(default = "default_reprompts")]
    pub reprompts: Vec<String>,
}

fn default_reprompts() -> Vec<String> {
    vec![
        "Sorry, I didn't get that. Could you say it another way?".to_string(),
        "I'm still having trouble understanding. Could you rephrase?".to_string(),
    ]
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            reprompts: default_reprompts(),
        }
    }
}

impl BotConfig {
    /// Check every required setting and switch persistence on when a
    /// descriptor was supplied.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        let language = self.language.trim();
        if language.is_empty() {
            return Err(ConfigError::Missing("language"));
        }
        if !language
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ConfigError::Invalid {
                field: "language",
                reason: format!("'{language}' is not a language tag"),
            });
        }

        if self.nlu.endpoint.trim().is_empty() {
            return Err(ConfigError::Missing("nlu.endpoint"));
        }
        if !self.nlu.endpoint.starts_with("http://") && !self.nlu.endpoint.starts_with("https://")
        {
            return Err(ConfigError::Invalid {
                field: "nlu.endpoint",
                reason: "must be an http(s) URL".to_string(),
            });
        }
        if self.nlu.project_id.trim().is_empty() {
            return Err(ConfigError::Missing("nlu.project_id"));
        }
        if self.nlu.api_key.expose_secret().trim().is_empty() {
            return Err(ConfigError::Missing("nlu.api_key"));
        }
        if self.nlu.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "nlu.timeout_secs",
                reason: "must be non-zero".to_string(),
            });
        }

        if let Some(persistence) = self.persistence.as_mut() {
            persistence.validate()?;
            persistence.enabled = true;
        }

        Ok(())
    }

    /// Whether session tracking runs for each turn.
    pub fn persistence_enabled(&self) -> bool {
        self.persistence.as_ref().is_some_and(|p| p.enabled)
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

fn deserialize_optional_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}
