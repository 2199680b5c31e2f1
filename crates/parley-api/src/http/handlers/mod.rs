//! HTTP request handlers.

pub mod converse;
pub mod session;
pub mod webhook;

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;
    use std::sync::Arc;

    use parley_core::dispatch::TurnDispatcher;
    use parley_core::nlu::{BoxNluClient, NluClient};
    use parley_core::session::{BoxSessionStore, InMemorySessionStore};
    use parley_types::config::BotConfig;
    use parley_types::error::NluError;
    use parley_types::message::NluReply;

    use crate::state::AppState;

    /// Echoes the text back, or fails when `fail` is set.
    pub(crate) struct EchoNlu {
        pub fail: bool,
    }

    impl NluClient for EchoNlu {
        async fn converse_by_text(
            &self,
            text: &str,
            conversation_token: Option<&str>,
        ) -> Result<NluReply, NluError> {
            if self.fail {
                return Err(NluError::Status {
                    status: 503,
                    body: "overloaded".to_string(),
                });
            }
            Ok(NluReply {
                reply: (text != "silence").then(|| format!("echo: {text}")),
                conversation_token: conversation_token.unwrap_or("new-token").to_string(),
            })
        }
    }

    pub(crate) fn config(persistence: bool) -> Arc<BotConfig> {
        let toml_src = format!(
            r#"
language = "en-US"
[nlu]
endpoint = "http://localhost:1"
project_id = "test"
api_key = "k"
{}
"#,
            if persistence { "[persistence]\ndriver = \"memory\"\n" } else { "" }
        );
        let mut config: BotConfig = toml::from_str(&toml_src).unwrap();
        config.validate().unwrap();
        Arc::new(config)
    }

    /// State with the built-in middlewares, an echoing NLU, and an
    /// in-memory store when `persistence` is set.
    pub(crate) fn state(persistence: bool, nlu_fails: bool) -> (AppState, Option<InMemorySessionStore>) {
        let store = persistence.then(InMemorySessionStore::new);
        let mut dispatcher = TurnDispatcher::new(
            config(persistence),
            BoxNluClient::new(EchoNlu { fail: nlu_fails }),
            store.clone().map(BoxSessionStore::new),
        )
        .unwrap();
        dispatcher
            .use_middleware(parley_core::middleware::TurnLogger)
            .use_middleware(parley_core::middleware::NotUnderstoodTracker)
            .use_middleware(parley_core::middleware::NluRelay);
        (AppState::from_parts(dispatcher, PathBuf::from("/tmp/parley-test")), store)
    }
}
