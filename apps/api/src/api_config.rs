use std::env;
use std::fmt::Display;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use strata_core::AppError;
use strata_domain::StatusCascade;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Where roles, groups and channels are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Postgres { database_url: String },
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Postgres { .. } => "postgres",
        }
    }
}

/// External policy service settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyConfig {
    /// Base URL; when absent every external check is denied.
    pub service_url: Option<Url>,
    pub timeout: Duration,
    pub max_attempts: u8,
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub api_host: String,
    pub api_port: u16,
    pub database_url: Option<String>,
    pub storage: StorageBackend,
    pub policy: PolicyConfig,
    pub status_cascade: StatusCascade,
    pub internal_api_token: Option<String>,
    pub request_timeout: Duration,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");
        Self::from_lookup(migrate_only, |name| env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(migrate_only: bool, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let api_host = non_empty("API_HOST").unwrap_or_else(|| "127.0.0.1".to_owned());
        let api_port = parsed_or(&non_empty, "API_PORT", 3001_u16)?;
        let database_url = non_empty("DATABASE_URL");

        let storage = match non_empty("STORAGE_BACKEND").as_deref().unwrap_or("memory") {
            "memory" => StorageBackend::Memory,
            "postgres" => StorageBackend::Postgres {
                database_url: database_url.clone().ok_or_else(|| {
                    AppError::Validation(
                        "DATABASE_URL is required when STORAGE_BACKEND is 'postgres'".to_owned(),
                    )
                })?,
            },
            other => {
                return Err(AppError::Validation(format!(
                    "STORAGE_BACKEND must be either 'memory' or 'postgres', got '{other}'"
                )));
            }
        };

        let service_url = non_empty("POLICY_SERVICE_URL")
            .map(|value| {
                Url::parse(value.as_str()).map_err(|error| {
                    AppError::Validation(format!("invalid POLICY_SERVICE_URL '{value}': {error}"))
                })
            })
            .transpose()?;
        let policy = PolicyConfig {
            service_url,
            timeout: Duration::from_millis(parsed_or(&non_empty, "POLICY_TIMEOUT_MS", 2_000_u64)?),
            max_attempts: parsed_or(&non_empty, "POLICY_MAX_ATTEMPTS", 3_u8)?,
            retry_backoff_ms: parsed_or(&non_empty, "POLICY_RETRY_BACKOFF_MS", 100_u64)?,
        };
        if policy.max_attempts == 0 {
            return Err(AppError::Validation(
                "POLICY_MAX_ATTEMPTS must be at least 1".to_owned(),
            ));
        }

        let status_cascade = non_empty("GROUP_STATUS_CASCADE")
            .map(|value| StatusCascade::from_str(value.trim()))
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            migrate_only,
            api_host,
            api_port,
            database_url,
            storage,
            policy,
            status_cascade,
            internal_api_token: non_empty("INTERNAL_API_TOKEN"),
            request_timeout: Duration::from_millis(parsed_or(
                &non_empty,
                "REQUEST_TIMEOUT_MS",
                10_000_u64,
            )?),
        })
    }

    pub fn require_database_url(&self) -> Result<&str, AppError> {
        self.database_url
            .as_deref()
            .ok_or_else(|| AppError::Validation("DATABASE_URL is required".to_owned()))
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn parsed_or<T, F>(lookup: &F, name: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|error| AppError::Validation(format!("invalid {name} '{value}': {error}"))),
        None => Ok(default),
    }
}
