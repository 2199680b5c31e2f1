//! Read-only session inspection.

use axum::Json;
use axum::extract::{Path, State};
use parley_types::session::Session;

use crate::http::error::AppError;
use crate::http::response::{ApiResponse, RequestMeta};
use crate::state::AppState;

/// GET /api/v1/sessions/{id}
pub async fn get_session(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> Result<Json<ApiResponse<Session>>, AppError> {
    let request = RequestMeta::start();
    let store = state
        .dispatcher
        .store()
        .ok_or(AppError::PersistenceDisabled)?;

    let session = store.find_by_id(&conversation_id).await?;
    Ok(Json(ApiResponse::success(session, &request)))
}
