use super::{ApiError, ApiPath, ApiQuery, AppState, ValidJson};
use crate::backend::Backend;
use crate::configuration::Configuration;
use crate::reconciliation::{covered_dates, find_collision, services_for_date, timeslots_for};
use crate::types::{Availability, DateQuery, MessageResponse, TimeslotQuery};
use axum::extract::State;
use axum::{http::StatusCode, response::IntoResponse, Json};
use chrono::NaiveDate;
use tracing::{info, warn};

pub async fn list<B: Backend, C: Configuration>(
    State(state): State<AppState<B, C>>,
) -> Result<Json<Vec<Availability>>, ApiError> {
    Ok(Json(state.backend.availabilities()?))
}

pub async fn dates<B: Backend, C: Configuration>(
    State(state): State<AppState<B, C>>,
) -> Result<Json<Vec<NaiveDate>>, ApiError> {
    let availabilities = state.backend.availabilities()?;
    Ok(Json(covered_dates(&availabilities)))
}

pub async fn services<B: Backend, C: Configuration>(
    State(state): State<AppState<B, C>>,
    ApiQuery(query): ApiQuery<DateQuery>,
) -> Result<Json<Vec<String>>, ApiError> {
    let availabilities = state.backend.availabilities()?;
    let merge = state.configuration.service_merge();
    Ok(Json(services_for_date(&availabilities, query.date, merge)))
}

pub async fn timeslots<B: Backend, C: Configuration>(
    State(state): State<AppState<B, C>>,
    ValidJson(query): ValidJson<TimeslotQuery>,
) -> Result<Json<Vec<String>>, ApiError> {
    let availabilities = state.backend.availabilities()?;
    Ok(Json(timeslots_for(
        &availabilities,
        query.date,
        &query.services,
    )))
}

pub async fn add<B: Backend, C: Configuration>(
    State(state): State<AppState<B, C>>,
    ValidJson(availability): ValidJson<Availability>,
) -> Result<impl IntoResponse, ApiError> {
    check_collision(&state, &availability, None)?;
    warn_unknown_services(&state, &availability);

    let availability = state.backend.add_availability(availability)?;
    info!(id = ?availability.id, "Availability added");
    Ok((StatusCode::CREATED, Json(availability)))
}

pub async fn update<B: Backend, C: Configuration>(
    State(state): State<AppState<B, C>>,
    ApiPath(id): ApiPath<i32>,
    ValidJson(availability): ValidJson<Availability>,
) -> Result<impl IntoResponse, ApiError> {
    check_collision(&state, &availability, Some(id))?;
    warn_unknown_services(&state, &availability);

    let availability = state.backend.update_availability(id, availability)?;
    info!(id, "Availability updated");
    Ok(Json(availability))
}

pub async fn remove<B: Backend, C: Configuration>(
    State(state): State<AppState<B, C>>,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse, ApiError> {
    state.backend.remove_availability(id)?;
    info!(id, "Availability removed");
    Ok(Json(MessageResponse::new("Availability removed successfully")))
}

fn check_collision<B: Backend, C: Configuration>(
    state: &AppState<B, C>,
    availability: &Availability,
    exclude: Option<i32>,
) -> Result<(), ApiError> {
    let existing = state.backend.availabilities()?;
    match find_collision(&existing, availability, exclude) {
        Some(colliding) => Err(ApiError::conflict(format!(
            "Availability collides with {} - {} offering the same services",
            colliding.start_date, colliding.end_date
        ))),
        None => Ok(()),
    }
}

/// Availabilities reference services by title; unknown titles are only logged.
fn warn_unknown_services<B: Backend, C: Configuration>(
    state: &AppState<B, C>,
    availability: &Availability,
) {
    let Ok(catalog) = state.backend.services() else {
        return;
    };
    for service in &availability.services {
        if !catalog.iter().any(|known| known.has_title(service)) {
            warn!(service, "Availability offers a service missing from the catalog");
        }
    }
}
