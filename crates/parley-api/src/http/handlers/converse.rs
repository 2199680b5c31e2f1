//! Text entrypoint: send raw text to the NLU service, bypassing the
//! dispatcher.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use parley_types::message::ConverseOutcome;
use serde::Deserialize;

use crate::http::error::AppError;
use crate::http::response::{ApiResponse, RequestMeta};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ConverseRequest {
    pub text: String,
    #[serde(default)]
    pub conversation_token: Option<String>,
}

/// POST /api/v1/converse
///
/// A blank NLU answer is a successful `no_reply`, not an error.
pub async fn converse(
    State(state): State<AppState>,
    body: Result<Json<ConverseRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ConverseOutcome>>, AppError> {
    let request = RequestMeta::start();
    let Json(body) = body.map_err(|e| AppError::Validation(e.body_text()))?;

    let text = body.text.trim();
    if text.is_empty() {
        return Err(AppError::Validation("text must not be empty".to_string()));
    }

    let outcome = state
        .dispatcher
        .nlu()
        .converse(text, body.conversation_token.as_deref())
        .await?;

    Ok(Json(ApiResponse::success(outcome, &request)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::handlers::test_support::state;

    fn body(text: &str, token: Option<&str>) -> Result<Json<ConverseRequest>, JsonRejection> {
        Ok(Json(ConverseRequest {
            text: text.to_string(),
            conversation_token: token.map(str::to_string),
        }))
    }

    #[tokio::test]
    async fn reply_outcome() {
        let (state, _) = state(false, false);
        let Json(response) = converse(State(state), body("hello", Some("tok-1")))
            .await
            .unwrap();
        assert_eq!(
            response.data.unwrap(),
            ConverseOutcome::Reply {
                text: "echo: hello".to_string(),
                conversation_token: "tok-1".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn no_reply_is_success() {
        let (state, _) = state(false, false);
        let Json(response) = converse(State(state), body("silence", None)).await.unwrap();
        assert!(matches!(
            response.data.unwrap(),
            ConverseOutcome::NoReply { .. }
        ));
    }

    #[tokio::test]
    async fn blank_text_rejected() {
        let (state, _) = state(false, false);
        let err = converse(State(state), body("   ", None)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn nlu_failure_is_nlu_error() {
        let (state, _) = state(false, true);
        let err = converse(State(state), body("hello", None)).await.unwrap_err();
        assert_eq!(err.parts().1, "NLU_ERROR");
    }
}
