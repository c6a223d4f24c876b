use crate::reconciliation::ServiceMerge;
use std::path::PathBuf;

pub trait Configuration: Clone + Send + Sync + 'static {
    fn password(&self) -> String;
    fn port(&self) -> u16;
    fn database_url(&self) -> Option<String>;
    fn upload_dir(&self) -> PathBuf;
    fn service_merge(&self) -> ServiceMerge;
}
