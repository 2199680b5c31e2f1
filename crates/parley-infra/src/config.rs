//! Bot configuration loader and session-store wiring.
//!
//! Reads `config.toml` (from the data directory unless a path is given),
//! applies environment overrides, validates, and opens the session store
//! the persistence descriptor asks for. Any problem is a [`ConfigError`]:
//! the bot refuses to start on a bad configuration.

use std::path::{Path, PathBuf};

use parley_core::session::{BoxSessionStore, InMemorySessionStore};
use parley_types::config::{BotConfig, StoreDriver};
use parley_types::error::ConfigError;
use secrecy::SecretString;

use crate::sqlite::{DatabasePool, SqliteSessionStore};

/// Environment variable that replaces `nlu.api_key`.
pub const API_KEY_ENV: &str = "PARLEY_NLU_API_KEY";

/// Environment variable that overrides the data directory.
pub const DATA_DIR_ENV: &str = "PARLEY_DATA_DIR";

/// Resolve the data directory.
///
/// Priority:
/// 1. `PARLEY_DATA_DIR` environment variable
/// 2. `~/.parley`
/// 3. `.parley` in the current directory
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".parley");
    }
    PathBuf::from(".parley")
}

/// Default config file location inside `data_dir`.
pub fn default_config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.toml")
}

/// Load, override, and validate the configuration at `path`.
pub async fn load_bot_config(path: &Path) -> Result<BotConfig, ConfigError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    let mut config = parse_bot_config(&content, path)?;
    apply_env_overrides(&mut config, std::env::var(API_KEY_ENV).ok());
    config.validate()?;

    tracing::debug!(
        path = %path.display(),
        language = %config.language,
        persistence = config.persistence_enabled(),
        "loaded bot configuration"
    );
    Ok(config)
}

fn parse_bot_config(content: &str, path: &Path) -> Result<BotConfig, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Replace the API key with `api_key` when it is set and non-blank.
pub fn apply_env_overrides(config: &mut BotConfig, api_key: Option<String>) {
    if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
        tracing::debug!("nlu.api_key taken from {API_KEY_ENV}");
        config.nlu.api_key = SecretString::from(key);
    }
}

/// Open the session store named by the persistence descriptor.
///
/// Returns `None` when persistence is disabled.
pub async fn open_session_store(
    config: &BotConfig,
    data_dir: &Path,
) -> Result<Option<BoxSessionStore>, ConfigError> {
    let Some(persistence) = config.persistence.as_ref().filter(|p| p.enabled) else {
        tracing::info!("persistence disabled, sessions are not tracked");
        return Ok(None);
    };

    match persistence.driver {
        StoreDriver::Memory => {
            tracing::info!(driver = %persistence.driver, "using in-process session store");
            Ok(Some(BoxSessionStore::new(InMemorySessionStore::new())))
        }
        StoreDriver::Sqlite => {
            let ignored = persistence.network_fields();
            if !ignored.is_empty() {
                tracing::warn!(
                    fields = ?ignored,
                    "persistence settings ignored by the sqlite driver"
                );
            }

            let path = persistence.sqlite_path(data_dir);
            let pool = DatabasePool::open(&path)
                .await
                .map_err(|e| ConfigError::Invalid {
                    field: "persistence",
                    reason: format!("cannot open {}: {e}", path.display()),
                })?;
            tracing::info!(driver = %persistence.driver, path = %path.display(), "session store ready");
            Ok(Some(BoxSessionStore::new(SqliteSessionStore::new(pool))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    const MINIMAL: &str = r#"
language = "en-US"

[nlu]
endpoint = "https://nlu.example.com"
project_id = "pizza-bot"
api_key = "file-key"
"#;

    async fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = default_config_path(dir.path());
        tokio::fs::write(&path, content).await.unwrap();
        path
    }

    #[tokio::test]
    async fn load_minimal_config() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(&tmp, MINIMAL).await;

        let config = load_bot_config(&path).await.unwrap();
        assert_eq!(config.language, "en-US");
        assert_eq!(config.nlu.timeout_secs, 30);
        assert!(!config.persistence_enabled());
    }

    #[tokio::test]
    async fn load_missing_file_is_read_error() {
        let tmp = TempDir::new().unwrap();
        let err = load_bot_config(&tmp.path().join("nope.toml"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[tokio::test]
    async fn load_invalid_toml_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(&tmp, "this is not { valid toml !!!").await;
        let err = load_bot_config(&path).await.unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[tokio::test]
    async fn load_rejects_incomplete_descriptor() {
        let tmp = TempDir::new().unwrap();
        let content = format!("{MINIMAL}\n[persistence]\ndriver = \"sqlite\"\nhost = \"db\"\n");
        let path = write_config(&tmp, &content).await;
        let err = load_bot_config(&path).await.unwrap_err();
        assert!(matches!(err, ConfigError::Missing("persistence.database")));
    }

    #[test]
    fn env_override_replaces_api_key() {
        let mut config = parse_bot_config(MINIMAL, Path::new("config.toml")).unwrap();
        apply_env_overrides(&mut config, Some("env-key".to_string()));
        assert_eq!(config.nlu.api_key.expose_secret(), "env-key");
    }

    #[test]
    fn blank_env_override_is_ignored() {
        let mut config = parse_bot_config(MINIMAL, Path::new("config.toml")).unwrap();
        apply_env_overrides(&mut config, Some("  ".to_string()));
        assert_eq!(config.nlu.api_key.expose_secret(), "file-key");
    }

    #[tokio::test]
    async fn open_store_disabled_without_descriptor() {
        let tmp = TempDir::new().unwrap();
        let mut config = parse_bot_config(MINIMAL, Path::new("config.toml")).unwrap();
        config.validate().unwrap();
        let store = open_session_store(&config, tmp.path()).await.unwrap();
        assert!(store.is_none());
    }

    #[tokio::test]
    async fn open_sqlite_store_under_data_dir() {
        let tmp = TempDir::new().unwrap();
        let content = format!(
            "{MINIMAL}\n[persistence]\ndriver = \"sqlite\"\nhost = \"db\"\ndatabase = \"sessions\"\ntls = true\n"
        );
        let mut config = parse_bot_config(&content, Path::new("config.toml")).unwrap();
        config.validate().unwrap();

        let store = open_session_store(&config, tmp.path())
            .await
            .unwrap()
            .unwrap();
        store.find_or_create_by_id("conv-1").await.unwrap();
        assert!(tmp.path().join("db/sessions.db").exists());
    }

    #[tokio::test]
    async fn open_memory_store() {
        let tmp = TempDir::new().unwrap();
        let content = format!("{MINIMAL}\n[persistence]\ndriver = \"memory\"\n");
        let mut config = parse_bot_config(&content, Path::new("config.toml")).unwrap();
        config.validate().unwrap();

        let store = open_session_store(&config, tmp.path())
            .await
            .unwrap()
            .unwrap();
        let created = store.find_or_create_by_id("conv-1").await.unwrap();
        assert_eq!(created.message_count, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn overlapping_turns_on_sqlite_keep_every_increment() {
        use std::sync::Arc;

        use parley_core::dispatch::TurnDispatcher;
        use parley_core::middleware::NotUnderstoodTracker;
        use parley_core::nlu::BoxNluClient;
        use parley_types::message::InboundMessage;

        use crate::nlu::HttpNluClient;

        let tmp = TempDir::new().unwrap();
        let content = format!(
            "{MINIMAL}\n[persistence]\ndriver = \"sqlite\"\nhost = \"db\"\ndatabase = \"sessions\"\n"
        );
        let mut config = parse_bot_config(&content, Path::new("config.toml")).unwrap();
        config.validate().unwrap();
        let store = open_session_store(&config, tmp.path()).await.unwrap();
        let nlu = BoxNluClient::new(HttpNluClient::new(&config.nlu, &config.language).unwrap());

        let mut dispatcher = TurnDispatcher::new(Arc::new(config), nlu, store.clone()).unwrap();
        dispatcher.use_middleware(NotUnderstoodTracker);
        let dispatcher = Arc::new(dispatcher);

        let mut handles = Vec::new();
        for i in 0..32 {
            let dispatcher = Arc::clone(&dispatcher);
            handles.push(tokio::spawn(async move {
                let mut message = InboundMessage::text("busy", format!("msg {i}"));
                message.fallback = i % 2 == 0;
                dispatcher.on_message(message).await
            }));
        }
        let mut counts = Vec::new();
        for handle in handles {
            let ctx = handle.await.unwrap().unwrap();
            counts.push(ctx.session().unwrap().message_count);
        }
        counts.sort_unstable();
        assert_eq!(counts, (1..=32).collect::<Vec<u64>>());

        let stored = store.unwrap().find_by_id("busy").await.unwrap();
        assert_eq!(stored.message_count, 32);
    }

    #[test]
    fn default_config_path_is_inside_data_dir() {
        let path = default_config_path(Path::new("/srv/parley"));
        assert_eq!(path, PathBuf::from("/srv/parley/config.toml"));
    }
}
