use crate::{
    backend::{
        AvailabilityBackend, ScheduleBackend, ServiceBackend, StoreError, StoreResult, UserBackend,
    },
    types::{Availability, Schedule, Service, User},
};
use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tracing::error;

/// Non-persistent backend, used when no database is configured.
#[derive(Debug, Clone, Default)]
pub struct LocalStore {
    records: Arc<Mutex<Records>>,
}

#[derive(Debug, Default)]
struct Records {
    last_id: i32,
    availabilities: BTreeMap<i32, Availability>,
    schedules: HashMap<String, Schedule>,
    services: BTreeMap<i32, Service>,
    users: HashMap<String, User>,
}

impl Records {
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn title_taken(&self, title: &str, exclude: Option<i32>) -> bool {
        self.services
            .iter()
            .any(|(id, service)| Some(*id) != exclude && service.has_title(title))
    }
}

impl LocalStore {
    fn records(&self) -> MutexGuard<'_, Records> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn not_found(what: String) -> StoreError {
    let err = StoreError::NotFound(what);
    error!(%err);
    err
}

impl AvailabilityBackend for LocalStore {
    fn availabilities(&self) -> StoreResult<Vec<Availability>> {
        let mut availabilities: Vec<Availability> =
            self.records().availabilities.values().cloned().collect();
        availabilities.sort_by_key(|availability| (availability.start_date, availability.id));
        Ok(availabilities)
    }

    fn add_availability(&self, mut availability: Availability) -> StoreResult<Availability> {
        let mut records = self.records();
        let id = records.next_id();
        availability.id = Some(id);
        records.availabilities.insert(id, availability.clone());
        Ok(availability)
    }

    fn update_availability(
        &self,
        id: i32,
        mut availability: Availability,
    ) -> StoreResult<Availability> {
        let mut records = self.records();
        let Some(stored) = records.availabilities.get_mut(&id) else {
            return Err(not_found(format!("Availability {id}")));
        };
        availability.id = Some(id);
        *stored = availability.clone();
        Ok(availability)
    }

    fn remove_availability(&self, id: i32) -> StoreResult<()> {
        if self.records().availabilities.remove(&id).is_none() {
            return Err(not_found(format!("Availability {id}")));
        }
        Ok(())
    }
}

impl ScheduleBackend for LocalStore {
    fn schedules(&self) -> StoreResult<Vec<Schedule>> {
        let mut schedules: Vec<Schedule> = self.records().schedules.values().cloned().collect();
        schedules.sort_by(|a, b| {
            a.selected_date
                .cmp(&b.selected_date)
                .then_with(|| a.uid.cmp(&b.uid))
        });
        Ok(schedules)
    }

    fn add_schedule(&self, mut schedule: Schedule) -> StoreResult<Schedule> {
        let mut records = self.records();
        if records.schedules.contains_key(&schedule.uid) {
            let err = StoreError::Conflict(format!("Schedule {} already exists", schedule.uid));
            error!(%err);
            return Err(err);
        }
        schedule.id = Some(records.next_id());
        records
            .schedules
            .insert(schedule.uid.clone(), schedule.clone());
        Ok(schedule)
    }

    fn update_schedule(&self, uid: &str, mut schedule: Schedule) -> StoreResult<Schedule> {
        let mut records = self.records();
        let Some(stored) = records.schedules.get_mut(uid) else {
            return Err(not_found(format!("Schedule {uid}")));
        };
        schedule.id = stored.id;
        schedule.uid = uid.to_string();
        *stored = schedule.clone();
        Ok(schedule)
    }

    fn remove_schedule(&self, uid: &str) -> StoreResult<()> {
        if self.records().schedules.remove(uid).is_none() {
            return Err(not_found(format!("Schedule {uid}")));
        }
        Ok(())
    }
}

impl ServiceBackend for LocalStore {
    fn services(&self) -> StoreResult<Vec<Service>> {
        Ok(self.records().services.values().cloned().collect())
    }

    fn add_service(&self, mut service: Service) -> StoreResult<Service> {
        let mut records = self.records();
        if records.title_taken(&service.title, None) {
            let err = StoreError::Conflict(format!("A service named {} already exists", service.title));
            error!(%err);
            return Err(err);
        }
        let id = records.next_id();
        service.id = Some(id);
        records.services.insert(id, service.clone());
        Ok(service)
    }

    fn update_service(&self, id: i32, mut service: Service) -> StoreResult<Service> {
        let mut records = self.records();
        if !records.services.contains_key(&id) {
            return Err(not_found(format!("Service {id}")));
        }
        if records.title_taken(&service.title, Some(id)) {
            let err = StoreError::Conflict(format!("A service named {} already exists", service.title));
            error!(%err);
            return Err(err);
        }
        service.id = Some(id);
        records.services.insert(id, service.clone());
        Ok(service)
    }

    fn remove_service(&self, id: i32) -> StoreResult<()> {
        if self.records().services.remove(&id).is_none() {
            return Err(not_found(format!("Service {id}")));
        }
        Ok(())
    }
}

impl UserBackend for LocalStore {
    fn users(&self) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self.records().users.values().cloned().collect();
        users.sort_by(|a, b| a.uid.cmp(&b.uid));
        Ok(users)
    }

    fn add_user(&self, user: User) -> StoreResult<User> {
        let mut records = self.records();
        if records.users.contains_key(&user.uid) {
            let err = StoreError::Conflict(format!("User {} already exists", user.uid));
            error!(%err);
            return Err(err);
        }
        records.users.insert(user.uid.clone(), user.clone());
        Ok(user)
    }
}
