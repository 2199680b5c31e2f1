//! NLU client port.
//!
//! `NluClient` is the converse-by-text capability of the external NLU SDK.
//! `BoxNluClient` erases it (same blanket-impl pattern as `BoxSessionStore`)
//! so the dispatcher and every turn context can share one handle.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parley_types::error::NluError;
use parley_types::message::{ConverseOutcome, NluReply};

/// Converse-by-text access to the NLU service.
pub trait NluClient: Send + Sync {
    /// Send `text` and get the service's reply.
    ///
    /// `conversation_token` continues an earlier exchange; `None` starts a
    /// new one.
    fn converse_by_text(
        &self,
        text: &str,
        conversation_token: Option<&str>,
    ) -> impl Future<Output = Result<NluReply, NluError>> + Send;
}

type NluFuture<'a> = Pin<Box<dyn Future<Output = Result<NluReply, NluError>> + Send + 'a>>;

/// Object-safe version of [`NluClient`] with boxed futures.
pub trait NluClientDyn: Send + Sync {
    fn converse_by_text_boxed<'a>(
        &'a self,
        text: &'a str,
        conversation_token: Option<&'a str>,
    ) -> NluFuture<'a>;
}

impl<T: NluClient> NluClientDyn for T {
    fn converse_by_text_boxed<'a>(
        &'a self,
        text: &'a str,
        conversation_token: Option<&'a str>,
    ) -> NluFuture<'a> {
        Box::pin(self.converse_by_text(text, conversation_token))
    }
}

/// Type-erased, cheaply cloneable NLU client handle.
#[derive(Clone)]
pub struct BoxNluClient {
    inner: Arc<dyn NluClientDyn>,
}

impl BoxNluClient {
    pub fn new<T: NluClient + 'static>(client: T) -> Self {
        Self {
            inner: Arc::new(client),
        }
    }

    pub async fn converse_by_text(
        &self,
        text: &str,
        conversation_token: Option<&str>,
    ) -> Result<NluReply, NluError> {
        self.inner
            .converse_by_text_boxed(text, conversation_token)
            .await
    }

    /// Text entrypoint: converse and classify the answer.
    ///
    /// A blank or missing reply is `ConverseOutcome::NoReply`, not an error.
    pub async fn converse(
        &self,
        text: &str,
        conversation_token: Option<&str>,
    ) -> Result<ConverseOutcome, NluError> {
        let reply = self.converse_by_text(text, conversation_token).await?;
        let outcome = ConverseOutcome::from(reply);
        if let ConverseOutcome::NoReply { conversation_token } = &outcome {
            tracing::debug!(%conversation_token, "NLU returned no usable reply");
        }
        Ok(outcome)
    }
}

impl std::fmt::Debug for BoxNluClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxNluClient").finish_non_exhaustive()
    }
}
