//! Webhook receiver: one NLU delivery in, one dispatcher turn, replies out.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use chrono::{DateTime, Utc};
use parley_types::message::InboundMessage;
use parley_types::session::Session;
use serde::{Deserialize, Serialize};

use crate::http::error::AppError;
use crate::http::response::{ApiResponse, RequestMeta};
use crate::state::AppState;

/// JSON body posted by the NLU layer.
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    /// Also accepted as `session`, the field name some NLU layers use.
    #[serde(alias = "session")]
    pub conversation_id: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub fallback: bool,
    #[serde(default)]
    pub parameters: serde_json::Value,
    #[serde(default)]
    pub language: Option<String>,
}

impl WebhookPayload {
    pub fn into_message(self, received_at: DateTime<Utc>) -> Result<InboundMessage, AppError> {
        // Ids are opaque: reject blank ones but never normalize.
        if self.conversation_id.trim().is_empty() {
            return Err(AppError::Validation(
                "conversation_id must not be empty".to_string(),
            ));
        }

        Ok(InboundMessage {
            conversation_id: self.conversation_id,
            text: self.text,
            intent: self.intent,
            fallback: self.fallback,
            parameters: self.parameters,
            language: self.language,
            received_at,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct TurnResult {
    pub conversation_id: String,
    pub replies: Vec<String>,
    /// Final session state; absent when persistence is disabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
}

/// POST /api/v1/webhook
pub async fn receive_webhook(
    State(state): State<AppState>,
    payload: Result<Json<WebhookPayload>, JsonRejection>,
) -> Result<Json<ApiResponse<TurnResult>>, AppError> {
    let request = RequestMeta::start();
    let Json(payload) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    let message = payload.into_message(Utc::now())?;
    let conversation_id = message.conversation_id.clone();

    let ctx = state.dispatcher.on_message(message).await?;

    let session = ctx.session().cloned();
    let result = TurnResult {
        conversation_id,
        replies: ctx.into_replies(),
        session,
    };
    Ok(Json(ApiResponse::success(result, &request)))
}
