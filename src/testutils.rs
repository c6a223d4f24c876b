use std::{
    collections::HashMap,
    fmt::Debug,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use tempfile::TempDir;
use tokio::{net::TcpListener, task::JoinHandle, time::timeout};

use crate::{
    backend::{
        AvailabilityBackend, Backend, ScheduleBackend, ServiceBackend, StoreError, StoreResult,
        UserBackend,
    },
    configuration::Configuration,
    http::create_app,
    local_store::LocalStore,
    reconciliation::ServiceMerge,
    types::{Availability, Schedule, Service, User},
};

pub const TEST_PASSWORD: &str = "123";

#[derive(Clone)]
pub struct TestConfiguration {
    upload_dir: Arc<TempDir>,
    service_merge: ServiceMerge,
}

impl Configuration for TestConfiguration {
    fn password(&self) -> String {
        TEST_PASSWORD.into()
    }

    fn port(&self) -> u16 {
        0
    }

    fn database_url(&self) -> Option<String> {
        None
    }

    fn upload_dir(&self) -> PathBuf {
        self.upload_dir.path().to_path_buf()
    }

    fn service_merge(&self) -> ServiceMerge {
        self.service_merge
    }
}

pub async fn spawn_app<B: Backend>(backend: B) -> (JoinHandle<()>, String, TestConfiguration) {
    spawn_app_with(backend, ServiceMerge::Union).await
}

/// Serves the app on an ephemeral port. Returns the server task and its base
/// URL.
pub async fn spawn_app_with<B: Backend>(
    backend: B,
    service_merge: ServiceMerge,
) -> (JoinHandle<()>, String, TestConfiguration) {
    let configuration = TestConfiguration {
        upload_dir: Arc::new(tempfile::tempdir().unwrap()),
        service_merge,
    };
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = format!("http://{}", listener.local_addr().unwrap());
    let app = create_app(backend, configuration.clone());
    let server = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (server, address, configuration)
}

/// In-memory backend that counts calls per method and can be told to fail.
#[derive(Clone, Default)]
pub struct CountingBackend {
    inner: LocalStore,
    calls: Arc<Mutex<HashMap<&'static str, u64>>>,
    failing: Arc<AtomicBool>,
}

impl CountingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self, method: &str) -> u64 {
        self.calls
            .lock()
            .unwrap()
            .get(method)
            .copied()
            .unwrap_or_default()
    }

    fn record(&self, method: &'static str) -> StoreResult<()> {
        *self.calls.lock().unwrap().entry(method).or_default() += 1;
        match self.failing.load(Ordering::SeqCst) {
            true => Err(StoreError::Database("Supposed to fail".into())),
            false => Ok(()),
        }
    }
}

impl AvailabilityBackend for CountingBackend {
    fn availabilities(&self) -> StoreResult<Vec<Availability>> {
        self.record("availabilities")?;
        self.inner.availabilities()
    }

    fn add_availability(&self, availability: Availability) -> StoreResult<Availability> {
        self.record("add_availability")?;
        self.inner.add_availability(availability)
    }

    fn update_availability(
        &self,
        id: i32,
        availability: Availability,
    ) -> StoreResult<Availability> {
        self.record("update_availability")?;
        self.inner.update_availability(id, availability)
    }

    fn remove_availability(&self, id: i32) -> StoreResult<()> {
        self.record("remove_availability")?;
        self.inner.remove_availability(id)
    }
}

impl ScheduleBackend for CountingBackend {
    fn schedules(&self) -> StoreResult<Vec<Schedule>> {
        self.record("schedules")?;
        self.inner.schedules()
    }

    fn add_schedule(&self, schedule: Schedule) -> StoreResult<Schedule> {
        self.record("add_schedule")?;
        self.inner.add_schedule(schedule)
    }

    fn update_schedule(&self, uid: &str, schedule: Schedule) -> StoreResult<Schedule> {
        self.record("update_schedule")?;
        self.inner.update_schedule(uid, schedule)
    }

    fn remove_schedule(&self, uid: &str) -> StoreResult<()> {
        self.record("remove_schedule")?;
        self.inner.remove_schedule(uid)
    }
}

impl ServiceBackend for CountingBackend {
    fn services(&self) -> StoreResult<Vec<Service>> {
        self.record("services")?;
        self.inner.services()
    }

    fn add_service(&self, service: Service) -> StoreResult<Service> {
        self.record("add_service")?;
        self.inner.add_service(service)
    }

    fn update_service(&self, id: i32, service: Service) -> StoreResult<Service> {
        self.record("update_service")?;
        self.inner.update_service(id, service)
    }

    fn remove_service(&self, id: i32) -> StoreResult<()> {
        self.record("remove_service")?;
        self.inner.remove_service(id)
    }
}

impl UserBackend for CountingBackend {
    fn users(&self) -> StoreResult<Vec<User>> {
        self.record("users")?;
        self.inner.users()
    }

    fn add_user(&self, user: User) -> StoreResult<User> {
        self.record("add_user")?;
        self.inner.add_user(user)
    }
}

/// Reads server-sent events from a response body stream, skipping
/// keep-alive comments.
pub struct EventReader<S> {
    stream: S,
    buffer: String,
}

impl<S, B, E> EventReader<S>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Debug,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buffer: String::new(),
        }
    }

    /// Deserializes the data of the next event.
    pub async fn next<T: DeserializeOwned>(&mut self) -> T {
        loop {
            if let Some(end) = self.buffer.find("\n\n") {
                let block: String = self.buffer.drain(..end + 2).collect();
                let data: Vec<&str> = block
                    .lines()
                    .filter_map(|line| line.strip_prefix("data:"))
                    .map(str::trim_start)
                    .collect();
                if data.is_empty() {
                    continue;
                }
                return serde_json::from_str(&data.join("\n")).unwrap();
            }

            let chunk = timeout(Duration::from_secs(5), self.stream.next())
                .await
                .expect("No event within 5 seconds")
                .expect("Event stream ended")
                .unwrap();
            self.buffer
                .push_str(&String::from_utf8_lossy(chunk.as_ref()));
        }
    }
}
