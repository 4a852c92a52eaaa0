use super::AppState;
use crate::config::{API_READY_TEXT, ROOT_READY_TEXT};
use crate::dataset::User;
use crate::error::LookupError;
use axum::extract::{RawPathParams, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub async fn root() -> &'static str {
    ROOT_READY_TEXT
}

pub async fn api_root() -> &'static str {
    API_READY_TEXT
}

pub async fn list_users(State(state): State<AppState>) -> Json<Vec<User>> {
    Json(state.dataset.users().to_vec())
}

/// The id is taken undecoded, so a segment that is not valid UTF-8 once
/// percent-decoded is still a plain miss.
pub async fn get_user(
    State(state): State<AppState>,
    params: RawPathParams,
) -> Result<Json<User>, LookupError> {
    let raw = params
        .iter()
        .find_map(|(name, value)| (name == "user_id").then_some(value))
        .unwrap_or_default();
    state.dataset.lookup(raw).cloned().map(Json)
}

impl IntoResponse for LookupError {
    fn into_response(self) -> Response {
        let status = match self {
            LookupError::NotFound { .. } => StatusCode::NOT_FOUND,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
