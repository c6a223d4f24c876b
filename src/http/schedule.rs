use super::{publish_schedules, ApiError, ApiPath, AppState, ValidJson};
use crate::backend::{Backend, StoreError};
use crate::configuration::Configuration;
use crate::reconciliation::{double_booked, unoffered_timeslots};
use crate::types::{MessageResponse, Schedule};
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{http::StatusCode, response::IntoResponse, Json};
use futures::{Stream, StreamExt};
use tracing::info;
use uuid::Uuid;

pub async fn list<B: Backend, C: Configuration>(
    State(state): State<AppState<B, C>>,
) -> Result<Json<Vec<Schedule>>, ApiError> {
    Ok(Json(state.backend.schedules()?))
}

pub async fn add<B: Backend, C: Configuration>(
    State(state): State<AppState<B, C>>,
    ValidJson(mut schedule): ValidJson<Schedule>,
) -> Result<impl IntoResponse, ApiError> {
    if schedule.uid.trim().is_empty() {
        schedule.uid = Uuid::new_v4().to_string();
    }
    let existing = state.backend.schedules()?;
    if existing.iter().any(|stored| stored.uid == schedule.uid) {
        return Err(ApiError::conflict(format!(
            "Schedule {} already exists",
            schedule.uid
        )));
    }
    check_bookable(&state, &existing, &schedule, None)?;

    let schedule = state.backend.add_schedule(schedule)?;
    info!(uid = schedule.uid, date = %schedule.selected_date, "Schedule added");
    publish_schedules(&state);
    Ok((StatusCode::CREATED, Json(schedule)))
}

pub async fn update<B: Backend, C: Configuration>(
    State(state): State<AppState<B, C>>,
    ApiPath(uid): ApiPath<String>,
    ValidJson(mut schedule): ValidJson<Schedule>,
) -> Result<impl IntoResponse, ApiError> {
    let existing = state.backend.schedules()?;
    if !existing.iter().any(|stored| stored.uid == uid) {
        return Err(StoreError::NotFound(format!("Schedule {uid}")).into());
    }
    schedule.uid = uid.clone();
    check_bookable(&state, &existing, &schedule, Some(&uid))?;

    let schedule = state.backend.update_schedule(&uid, schedule)?;
    info!(uid, date = %schedule.selected_date, "Schedule updated");
    publish_schedules(&state);
    Ok(Json(schedule))
}

pub async fn remove<B: Backend, C: Configuration>(
    State(state): State<AppState<B, C>>,
    ApiPath(uid): ApiPath<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.backend.remove_schedule(&uid)?;
    info!(uid, "Schedule removed");
    publish_schedules(&state);
    Ok(Json(MessageResponse::new("Schedule removed successfully")))
}

/// Server-sent events carrying the full schedule list, current list first.
pub async fn events<B: Backend, C: Configuration>(
    State(state): State<AppState<B, C>>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let stream = state
        .schedule_feed
        .subscribe()
        .map(|schedules| Event::default().event("schedules").json_data(schedules));
    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn check_bookable<B: Backend, C: Configuration>(
    state: &AppState<B, C>,
    existing: &[Schedule],
    schedule: &Schedule,
    exclude: Option<&str>,
) -> Result<(), ApiError> {
    let availabilities = state.backend.availabilities()?;
    let unoffered = unoffered_timeslots(&availabilities, schedule);
    if !unoffered.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "{} not available on {} for {}",
            unoffered.join(", "),
            schedule.selected_date,
            schedule.services.join(", ")
        )));
    }
    if let Some(timeslot) = double_booked(existing, schedule, exclude) {
        return Err(ApiError::conflict(format!(
            "{timeslot} on {} is already booked",
            schedule.selected_date
        )));
    }
    Ok(())
}
