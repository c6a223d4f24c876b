use crate::{configuration::Configuration, reconciliation::ServiceMerge};
use clap::Parser;
use std::path::PathBuf;

/// Storefront backend for services, availabilities and appointments.
#[derive(Debug, Clone, Parser)]
#[command(version, about)]
pub struct ConfigurationHandler {
    /// Password expected in the `x-admin-password` header of admin requests
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    password: String,

    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// PostgreSQL connection URL. Records are kept in memory only if omitted.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Directory uploaded service images are written to
    #[arg(long, env = "UPLOAD_DIR", default_value = "uploads")]
    upload_dir: PathBuf,

    /// How services of overlapping availabilities are combined
    #[arg(long, env = "SERVICE_MERGE", value_enum, default_value_t = ServiceMerge::Union)]
    service_merge: ServiceMerge,
}

impl ConfigurationHandler {
    pub fn parse_arguments() -> Self {
        dotenvy::dotenv().ok();
        Self::parse()
    }
}

impl Configuration for ConfigurationHandler {
    fn password(&self) -> String {
        self.password.clone()
    }

    fn port(&self) -> u16 {
        self.port
    }

    fn database_url(&self) -> Option<String> {
        self.database_url.clone()
    }

    fn upload_dir(&self) -> PathBuf {
        self.upload_dir.clone()
    }

    fn service_merge(&self) -> ServiceMerge {
        self.service_merge
    }
}
