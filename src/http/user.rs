use super::{ApiError, AppState, ValidJson};
use crate::backend::Backend;
use crate::configuration::Configuration;
use crate::types::User;
use axum::extract::State;
use axum::{http::StatusCode, response::IntoResponse, Json};
use tracing::info;

pub async fn list<B: Backend, C: Configuration>(
    State(state): State<AppState<B, C>>,
) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.backend.users()?))
}

/// Registers a user after sign-in with an external provider.
pub async fn add<B: Backend, C: Configuration>(
    State(state): State<AppState<B, C>>,
    ValidJson(user): ValidJson<User>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.backend.add_user(user)?;
    info!(uid = user.uid, role = ?user.role, "User registered");
    Ok((StatusCode::CREATED, Json(user)))
}
