use crate::backend::{
    AvailabilityBackend, ScheduleBackend, ServiceBackend, StoreError, StoreResult, UserBackend,
};
use crate::schema::{availabilities, schedules, services, users};
use crate::types::{Availability, PricingPlan, Schedule, Service, User};
use chrono::NaiveDate;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::{pg::Pg, prelude::*, ConnectionError, PgConnection};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::borrow::Cow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::error;

#[derive(Queryable, Selectable)]
#[diesel(table_name = availabilities)]
#[diesel(check_for_backend(Pg))]
struct AvailabilityRow {
    id: i32,
    start_date: NaiveDate,
    end_date: NaiveDate,
    timeslots: Vec<String>,
    services: Vec<String>,
    description: Option<String>,
}

#[derive(Insertable, AsChangeset)]
#[diesel(table_name = availabilities)]
#[diesel(treat_none_as_null = true)]
struct AvailabilityChanges {
    start_date: NaiveDate,
    end_date: NaiveDate,
    timeslots: Vec<String>,
    services: Vec<String>,
    description: Option<String>,
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = schedules)]
#[diesel(check_for_backend(Pg))]
struct ScheduleRow {
    id: i32,
    uid: String,
    contact_name: String,
    selected_date: NaiveDate,
    services: Vec<String>,
    timeslots: Vec<String>,
    note: Option<String>,
}

#[derive(Insertable, AsChangeset)]
#[diesel(table_name = schedules)]
#[diesel(treat_none_as_null = true)]
struct ScheduleChanges {
    uid: String,
    contact_name: String,
    selected_date: NaiveDate,
    services: Vec<String>,
    timeslots: Vec<String>,
    note: Option<String>,
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = services)]
#[diesel(check_for_backend(Pg))]
struct ServiceRow {
    id: i32,
    title: String,
    description: String,
    file_name: String,
    price: f64,
    features: Vec<String>,
    pricing_plans: Value,
}

#[derive(Insertable, AsChangeset)]
#[diesel(table_name = services)]
struct ServiceChanges {
    title: String,
    description: String,
    file_name: String,
    price: f64,
    features: Vec<String>,
    pricing_plans: Value,
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(Pg))]
struct UserRow {
    uid: String,
    display_name: Option<String>,
    email: Option<String>,
    email_verified: bool,
    role: i16,
    provider: i16,
}

impl From<AvailabilityRow> for Availability {
    fn from(row: AvailabilityRow) -> Self {
        Self {
            id: Some(row.id),
            start_date: row.start_date,
            end_date: row.end_date,
            timeslots: row.timeslots,
            services: row.services,
            description: row.description,
        }
    }
}

impl From<Availability> for AvailabilityChanges {
    fn from(availability: Availability) -> Self {
        Self {
            start_date: availability.start_date,
            end_date: availability.end_date,
            timeslots: availability.timeslots,
            services: availability.services,
            description: availability.description,
        }
    }
}

impl From<ScheduleRow> for Schedule {
    fn from(row: ScheduleRow) -> Self {
        Self {
            id: Some(row.id),
            contact_name: row.contact_name,
            selected_date: row.selected_date,
            services: row.services,
            timeslots: row.timeslots,
            note: row.note,
            uid: row.uid,
        }
    }
}

impl From<Schedule> for ScheduleChanges {
    fn from(schedule: Schedule) -> Self {
        Self {
            uid: schedule.uid,
            contact_name: schedule.contact_name,
            selected_date: schedule.selected_date,
            services: schedule.services,
            timeslots: schedule.timeslots,
            note: schedule.note,
        }
    }
}

impl TryFrom<ServiceRow> for Service {
    type Error = StoreError;

    fn try_from(row: ServiceRow) -> Result<Self, Self::Error> {
        let pricing_plans: Vec<PricingPlan> = serde_json::from_value(row.pricing_plans)
            .map_err(|err| database_error(format!("Corrupt pricing plans of service {}: {err}", row.id)))?;
        Ok(Self {
            id: Some(row.id),
            title: row.title,
            description: row.description,
            file_name: row.file_name,
            price: row.price,
            features: row.features,
            pricing_plans,
        })
    }
}

impl TryFrom<Service> for ServiceChanges {
    type Error = StoreError;

    fn try_from(service: Service) -> Result<Self, Self::Error> {
        let pricing_plans = serde_json::to_value(&service.pricing_plans)
            .map_err(|err| database_error(format!("Pricing plans can't be stored: {err}")))?;
        Ok(Self {
            title: service.title,
            description: service.description,
            file_name: service.file_name,
            price: service.price,
            features: service.features,
            pricing_plans,
        })
    }
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            role: row.role.try_into().map_err(database_error)?,
            provider: row.provider.try_into().map_err(database_error)?,
            display_name: row.display_name,
            email: row.email,
            email_verified: row.email_verified,
            uid: row.uid,
        })
    }
}

impl From<User> for UserRow {
    fn from(user: User) -> Self {
        Self {
            uid: user.uid,
            display_name: user.display_name,
            email: user.email,
            email_verified: user.email_verified,
            role: user.role.into(),
            provider: user.provider.into(),
        }
    }
}

fn database_error(message: String) -> StoreError {
    error!("Database error: {message}");
    StoreError::Database(message)
}

/// Maps diesel errors onto the store's error kinds. `what` names the affected
/// record for the messages.
fn map_error(err: DieselError, what: &str) -> StoreError {
    let err = match err {
        DieselError::NotFound => StoreError::NotFound(what.to_string()),
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            StoreError::Conflict(format!("{what} already exists"))
        }
        other => StoreError::Database(format!("{what}: {other}")),
    };
    error!(%err);
    err
}

fn expect_changed(changed: usize, what: &str) -> StoreResult<()> {
    match changed {
        0 => {
            let err = StoreError::NotFound(what.to_string());
            error!(%err, "0 database lines were changed");
            Err(err)
        }
        _ => Ok(()),
    }
}

lazy_static! {
    static ref URL_PASSWORD: Regex = Regex::new(r"(://[^:/@]*:)[^@/]*@").unwrap();
}

/// Connection URL with its password masked, for logging.
pub fn redact_password(database_url: &str) -> Cow<'_, str> {
    URL_PASSWORD.replace(database_url, "${1}***@")
}

/// PostgreSQL backend. Apply the SQL in `migrations/` before first use.
#[derive(Clone)]
pub struct DatabaseInterface {
    connection: Arc<Mutex<PgConnection>>,
}

impl DatabaseInterface {
    pub fn new(database_url: &str) -> Result<Self, ConnectionError> {
        let connection = PgConnection::establish(database_url)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    fn connection(&self) -> MutexGuard<'_, PgConnection> {
        self.connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    fn clear(&self) {
        let mut connection = self.connection();
        diesel::delete(schedules::table)
            .execute(&mut *connection)
            .unwrap();
        diesel::delete(availabilities::table)
            .execute(&mut *connection)
            .unwrap();
        diesel::delete(services::table)
            .execute(&mut *connection)
            .unwrap();
        diesel::delete(users::table)
            .execute(&mut *connection)
            .unwrap();
    }
}

impl AvailabilityBackend for DatabaseInterface {
    fn availabilities(&self) -> StoreResult<Vec<Availability>> {
        let rows = availabilities::table
            .order((availabilities::start_date, availabilities::id))
            .select(AvailabilityRow::as_select())
            .load(&mut *self.connection())
            .map_err(|err| map_error(err, "Availabilities"))?;
        Ok(rows.into_iter().map(Availability::from).collect())
    }

    fn add_availability(&self, availability: Availability) -> StoreResult<Availability> {
        diesel::insert_into(availabilities::table)
            .values(AvailabilityChanges::from(availability))
            .returning(AvailabilityRow::as_returning())
            .get_result(&mut *self.connection())
            .map(Availability::from)
            .map_err(|err| map_error(err, "Availability"))
    }

    fn update_availability(
        &self,
        id: i32,
        availability: Availability,
    ) -> StoreResult<Availability> {
        diesel::update(availabilities::table.find(id))
            .set(AvailabilityChanges::from(availability))
            .returning(AvailabilityRow::as_returning())
            .get_result(&mut *self.connection())
            .map(Availability::from)
            .map_err(|err| map_error(err, &format!("Availability {id}")))
    }

    fn remove_availability(&self, id: i32) -> StoreResult<()> {
        let what = format!("Availability {id}");
        let changed = diesel::delete(availabilities::table.find(id))
            .execute(&mut *self.connection())
            .map_err(|err| map_error(err, &what))?;
        expect_changed(changed, &what)
    }
}

impl ScheduleBackend for DatabaseInterface {
    fn schedules(&self) -> StoreResult<Vec<Schedule>> {
        let rows = schedules::table
            .order((schedules::selected_date, schedules::uid))
            .select(ScheduleRow::as_select())
            .load(&mut *self.connection())
            .map_err(|err| map_error(err, "Schedules"))?;
        Ok(rows.into_iter().map(Schedule::from).collect())
    }

    fn add_schedule(&self, schedule: Schedule) -> StoreResult<Schedule> {
        let what = format!("Schedule {}", schedule.uid);
        diesel::insert_into(schedules::table)
            .values(ScheduleChanges::from(schedule))
            .returning(ScheduleRow::as_returning())
            .get_result(&mut *self.connection())
            .map(Schedule::from)
            .map_err(|err| map_error(err, &what))
    }

    fn update_schedule(&self, uid: &str, mut schedule: Schedule) -> StoreResult<Schedule> {
        schedule.uid = uid.to_string();
        diesel::update(schedules::table.filter(schedules::uid.eq(uid)))
            .set(ScheduleChanges::from(schedule))
            .returning(ScheduleRow::as_returning())
            .get_result(&mut *self.connection())
            .map(Schedule::from)
            .map_err(|err| map_error(err, &format!("Schedule {uid}")))
    }

    fn remove_schedule(&self, uid: &str) -> StoreResult<()> {
        let what = format!("Schedule {uid}");
        let changed = diesel::delete(schedules::table.filter(schedules::uid.eq(uid)))
            .execute(&mut *self.connection())
            .map_err(|err| map_error(err, &what))?;
        expect_changed(changed, &what)
    }
}

impl ServiceBackend for DatabaseInterface {
    fn services(&self) -> StoreResult<Vec<Service>> {
        let rows = services::table
            .order(services::id)
            .select(ServiceRow::as_select())
            .load(&mut *self.connection())
            .map_err(|err| map_error(err, "Services"))?;
        rows.into_iter().map(Service::try_from).collect()
    }

    fn add_service(&self, service: Service) -> StoreResult<Service> {
        let what = format!("A service named {}", service.title);
        let row = diesel::insert_into(services::table)
            .values(ServiceChanges::try_from(service)?)
            .returning(ServiceRow::as_returning())
            .get_result(&mut *self.connection())
            .map_err(|err| map_error(err, &what))?;
        Service::try_from(row)
    }

    fn update_service(&self, id: i32, service: Service) -> StoreResult<Service> {
        let changes = ServiceChanges::try_from(service)?;
        let what = format!("A service named {}", changes.title);
        let row = diesel::update(services::table.find(id))
            .set(changes)
            .returning(ServiceRow::as_returning())
            .get_result(&mut *self.connection())
            .map_err(|err| match err {
                DieselError::NotFound => map_error(err, &format!("Service {id}")),
                other => map_error(other, &what),
            })?;
        Service::try_from(row)
    }

    fn remove_service(&self, id: i32) -> StoreResult<()> {
        let what = format!("Service {id}");
        let changed = diesel::delete(services::table.find(id))
            .execute(&mut *self.connection())
            .map_err(|err| map_error(err, &what))?;
        expect_changed(changed, &what)
    }
}

impl UserBackend for DatabaseInterface {
    fn users(&self) -> StoreResult<Vec<User>> {
        let rows = users::table
            .order(users::uid)
            .select(UserRow::as_select())
            .load(&mut *self.connection())
            .map_err(|err| map_error(err, "Users"))?;
        rows.into_iter().map(User::try_from).collect()
    }

    fn add_user(&self, user: User) -> StoreResult<User> {
        let what = format!("User {}", user.uid);
        let row = diesel::insert_into(users::table)
            .values(UserRow::from(user))
            .returning(UserRow::as_returning())
            .get_result(&mut *self.connection())
            .map_err(|err| map_error(err, &what))?;
        User::try_from(row)
    }
}
