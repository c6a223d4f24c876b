use super::{ApiError, ApiPath, AppState, ValidJson};
use crate::backend::Backend;
use crate::configuration::Configuration;
use crate::types::{MessageResponse, Service};
use axum::extract::State;
use axum::{http::StatusCode, response::IntoResponse, Json};
use tracing::info;

pub async fn list<B: Backend, C: Configuration>(
    State(state): State<AppState<B, C>>,
) -> Result<Json<Vec<Service>>, ApiError> {
    Ok(Json(state.backend.services()?))
}

pub async fn add<B: Backend, C: Configuration>(
    State(state): State<AppState<B, C>>,
    ValidJson(service): ValidJson<Service>,
) -> Result<impl IntoResponse, ApiError> {
    let service = state.backend.add_service(service.normalize())?;
    info!(id = ?service.id, title = service.title, "Service added");
    Ok((StatusCode::CREATED, Json(service)))
}

pub async fn update<B: Backend, C: Configuration>(
    State(state): State<AppState<B, C>>,
    ApiPath(id): ApiPath<i32>,
    ValidJson(service): ValidJson<Service>,
) -> Result<impl IntoResponse, ApiError> {
    let service = state.backend.update_service(id, service.normalize())?;
    info!(id, title = service.title, "Service updated");
    Ok(Json(service))
}

pub async fn remove<B: Backend, C: Configuration>(
    State(state): State<AppState<B, C>>,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse, ApiError> {
    state.backend.remove_service(id)?;
    info!(id, "Service removed");
    Ok(Json(MessageResponse::new("Service deleted successfully")))
}
