use crate::backend::Backend;
use crate::configuration::Configuration;
use crate::schedule_feed::ScheduleFeed;
use axum::async_trait;
use axum::extract::{DefaultBodyLimit, FromRequest, FromRequestParts, Path, Query, Request, State};
use axum::http::request::Parts;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{
    routing::{get, post, put},
    Json, Router,
};
use serde::de::DeserializeOwned;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;
use validator::Validate;

mod availability;
mod error;
mod schedule;
mod service;
mod upload;
mod user;

pub use error::{ApiError, ErrorBody};

pub const ADMIN_PASSWORD_HEADER: &str = "x-admin-password";

#[derive(Clone)]
pub struct AppState<B: Backend, C: Configuration> {
    pub backend: B,
    pub configuration: C,
    pub schedule_feed: ScheduleFeed,
}

/// JSON body that passed its `validator` rules.
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(request, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// Query string whose rejection becomes a `bad_request` error body.
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Path parameters whose rejection becomes a `bad_request` error body.
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}

pub fn create_app<B: Backend, C: Configuration>(backend: B, configuration: C) -> Router {
    let schedules = backend.schedules().unwrap_or_else(|err| {
        error!(?err, "Failed to load schedules for the schedule feed");
        vec![]
    });
    let state = AppState {
        backend,
        configuration,
        schedule_feed: ScheduleFeed::new(schedules),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let public = Router::new()
        .route("/availabilities", get(availability::list::<B, C>))
        .route("/availabilities/dates", get(availability::dates::<B, C>))
        .route("/availabilities/services", get(availability::services::<B, C>))
        .route("/availabilities/timeslots", post(availability::timeslots::<B, C>))
        .route(
            "/schedules",
            get(schedule::list::<B, C>).post(schedule::add::<B, C>),
        )
        .route("/schedules/events", get(schedule::events::<B, C>))
        .route(
            "/schedules/:uid",
            put(schedule::update::<B, C>).delete(schedule::remove::<B, C>),
        )
        .route("/services", get(service::list::<B, C>))
        .route("/users", post(user::add::<B, C>));

    let admin = Router::new()
        .route("/availabilities", post(availability::add::<B, C>))
        .route(
            "/availabilities/:id",
            put(availability::update::<B, C>).delete(availability::remove::<B, C>),
        )
        .route("/services", post(service::add::<B, C>))
        .route(
            "/services/:id",
            put(service::update::<B, C>).delete(service::remove::<B, C>),
        )
        .route(
            "/uploadimage",
            post(upload::upload_image::<B, C>).layer(DefaultBodyLimit::max(upload::BODY_LIMIT)),
        )
        .route("/users", get(user::list::<B, C>))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth::<B, C>,
        ));

    Router::new()
        .merge(public)
        .merge(admin)
        .with_state(state)
        .layer(cors)
}

async fn admin_auth<B: Backend, C: Configuration>(
    State(state): State<AppState<B, C>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(auth_header) = request.headers().get(ADMIN_PASSWORD_HEADER) else {
        return Err(ApiError::Unauthorized("Missing credentials"));
    };
    if auth_header.to_str().unwrap_or("") != state.configuration.password() {
        return Err(ApiError::Unauthorized("Unauthorized"));
    }
    Ok(next.run(request).await)
}

/// Pushes the stored schedules to feed subscribers after a mutation.
fn publish_schedules<B: Backend, C: Configuration>(state: &AppState<B, C>) {
    match state.backend.schedules() {
        Ok(schedules) => state.schedule_feed.publish(schedules),
        Err(err) => error!(?err, "Failed to refresh the schedule feed"),
    }
}
