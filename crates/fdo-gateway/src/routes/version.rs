//! Version endpoints. Both are public.

use axum::http::StatusCode;
use axum::response::Response;

use super::{plain_text, relay};
use crate::error::AppError;
use crate::state::AppState;

/// `GET /api/version`: the gateway's own version.
pub fn get_version(state: &AppState) -> Response {
    plain_text(StatusCode::OK, state.config.version.clone())
}

/// `GET /api/fdo/version`: the Owner Service health response, relayed.
pub async fn get_owner_version(state: &AppState) -> Result<Response, AppError> {
    Ok(relay(state.owner.health().await?))
}
