use crate::types::{Availability, Schedule, Service, User};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub trait AvailabilityBackend {
    fn availabilities(&self) -> StoreResult<Vec<Availability>>;
    fn add_availability(&self, availability: Availability) -> StoreResult<Availability>;
    fn update_availability(&self, id: i32, availability: Availability)
        -> StoreResult<Availability>;
    fn remove_availability(&self, id: i32) -> StoreResult<()>;
}

/// Schedules are keyed by their client-visible `uid`.
pub trait ScheduleBackend {
    fn schedules(&self) -> StoreResult<Vec<Schedule>>;
    fn add_schedule(&self, schedule: Schedule) -> StoreResult<Schedule>;
    fn update_schedule(&self, uid: &str, schedule: Schedule) -> StoreResult<Schedule>;
    fn remove_schedule(&self, uid: &str) -> StoreResult<()>;
}

/// Titles are unique, compared case-insensitively.
pub trait ServiceBackend {
    fn services(&self) -> StoreResult<Vec<Service>>;
    fn add_service(&self, service: Service) -> StoreResult<Service>;
    fn update_service(&self, id: i32, service: Service) -> StoreResult<Service>;
    fn remove_service(&self, id: i32) -> StoreResult<()>;
}

pub trait UserBackend {
    fn users(&self) -> StoreResult<Vec<User>>;
    fn add_user(&self, user: User) -> StoreResult<User>;
}

pub trait Backend:
    AvailabilityBackend + ScheduleBackend + ServiceBackend + UserBackend + Clone + Send + Sync + 'static
{
}

impl<T> Backend for T where
    T: AvailabilityBackend
        + ScheduleBackend
        + ServiceBackend
        + UserBackend
        + Clone
        + Send
        + Sync
        + 'static
{
}
