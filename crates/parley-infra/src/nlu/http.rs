//! HttpNluClient -- concrete [`NluClient`] over the NLU service's JSON API.
//!
//! Sends `POST {endpoint}/v1/projects/{project_id}/converse` with bearer
//! authentication. The API key is held in a [`SecretString`] and only
//! exposed while building the request headers.

use std::time::Duration;

use parley_core::nlu::NluClient;
use parley_types::config::NluConfig;
use parley_types::error::NluError;
use parley_types::message::NluReply;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Request body for the converse endpoint.
#[derive(Debug, Serialize, PartialEq)]
pub(crate) struct ConverseRequest<'a> {
    pub query: &'a str,
    pub language: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_token: Option<&'a str>,
}

/// Response body from the converse endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct ConverseResponse {
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default)]
    pub conversation_token: Option<String>,
}

/// NLU client backed by `reqwest`.
///
/// Deliberately not `Debug`: it holds the API key.
pub struct HttpNluClient {
    client: reqwest::Client,
    api_key: SecretString,
    endpoint: String,
    project_id: String,
    language: String,
}

impl HttpNluClient {
    /// Build a client from the `[nlu]` settings and the bot's language.
    pub fn new(config: &NluConfig, language: &str) -> Result<Self, NluError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NluError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: SecretString::from(config.api_key.expose_secret().to_owned()),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            project_id: config.project_id.clone(),
            language: language.to_string(),
        })
    }

    fn converse_url(&self) -> String {
        format!("{}/v1/projects/{}/converse", self.endpoint, self.project_id)
    }

    fn request_body<'a>(
        &'a self,
        text: &'a str,
        conversation_token: Option<&'a str>,
    ) -> ConverseRequest<'a> {
        ConverseRequest {
            query: text,
            language: &self.language,
            conversation_token,
        }
    }
}

/// Turn a decoded response into an [`NluReply`].
///
/// When the service omits a token, the one we sent carries over; with
/// neither, the response is malformed.
pub(crate) fn into_reply(
    response: ConverseResponse,
    sent_token: Option<&str>,
) -> Result<NluReply, NluError> {
    let conversation_token = response
        .conversation_token
        .filter(|t| !t.trim().is_empty())
        .or_else(|| sent_token.map(str::to_string))
        .ok_or_else(|| {
            NluError::InvalidResponse("response carried no conversation token".to_string())
        })?;

    Ok(NluReply {
        reply: response.reply,
        conversation_token,
    })
}

/// Map a non-success status to an error, truncating long bodies.
pub(crate) fn status_error(status: u16, body: String) -> NluError {
    const MAX_BODY: usize = 512;
    let body = if body.len() > MAX_BODY {
        let mut end = MAX_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body
    };
    NluError::Status { status, body }
}

impl NluClient for HttpNluClient {
    async fn converse_by_text(
        &self,
        text: &str,
        conversation_token: Option<&str>,
    ) -> Result<NluReply, NluError> {
        let body = self.request_body(text, conversation_token);

        let response = self
            .client
            .post(self.converse_url())
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| NluError::Request(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "NLU service returned an error");
            return Err(status_error(status.as_u16(), error_body));
        }

        let decoded: ConverseResponse = response
            .json()
            .await
            .map_err(|e| NluError::InvalidResponse(format!("failed to parse response: {e}")))?;

        into_reply(decoded, conversation_token)
    }
}
