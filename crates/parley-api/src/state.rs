//! Application state wiring the dispatcher to its concrete adapters.
//!
//! `AppState` is shared by the CLI commands and the HTTP handlers. It pins the
//! dispatcher's ports to the infra implementations picked by the config.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use parley_core::dispatch::TurnDispatcher;
use parley_core::middleware::{NluRelay, NotUnderstoodTracker, TurnLogger};
use parley_core::nlu::BoxNluClient;
use parley_infra::config::{default_config_path, load_bot_config, open_session_store, resolve_data_dir};
use parley_infra::nlu::HttpNluClient;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<TurnDispatcher>,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Load the config, connect the NLU client and session store, and
    /// register the built-in middlewares.
    pub async fn init(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("cannot create data dir {}", data_dir.display()))?;

        let config_path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_config_path(&data_dir));
        let config = Arc::new(load_bot_config(&config_path).await?);

        let nlu = BoxNluClient::new(HttpNluClient::new(&config.nlu, &config.language)?);
        let store = open_session_store(&config, &data_dir).await?;

        let mut dispatcher = TurnDispatcher::new(config, nlu, store)?;
        dispatcher
            .use_middleware(TurnLogger)
            .use_middleware(NotUnderstoodTracker)
            .use_middleware(NluRelay);

        tracing::info!(
            data_dir = %data_dir.display(),
            middlewares = ?dispatcher.middleware_names(),
            persistence = dispatcher.persistence_enabled(),
            "application state ready"
        );

        Ok(Self::from_parts(dispatcher, data_dir))
    }

    pub fn from_parts(dispatcher: TurnDispatcher, data_dir: PathBuf) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            data_dir,
        }
    }
}
