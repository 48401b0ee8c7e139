//! Store primitives: connection settings, pool lifecycle and the employee
//! queries used by the onboarding workflow.

mod employees;

use std::time::Duration;

use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Statement,
};
use thiserror::Error;
use tracing::info;

pub use employees::{
    count_employees, find_by_employee_id, find_by_username, insert_employee, update_password,
};

/// Shared connection pool handle. Cloning is cheap.
pub type DbPool = DatabaseConnection;

const DEFAULT_URL_KEY: &str = "DATABASE_URL";
const MAX_CONNECTIONS_KEY: &str = "DATABASE_MAX_CONNECTIONS";
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database url missing; set {0}")]
    MissingUrl(String),
    #[error("invalid value {value:?} for {key}")]
    InvalidSetting { key: &'static str, value: String },
    #[error("username {0} already exists")]
    DuplicateUsername(String),
    #[error("employee record {0} no longer exists")]
    RecordMissing(uuid::Uuid),
    #[error(transparent)]
    Query(#[from] DbErr),
}

pub type DbResult<T> = Result<T, DbError>;

/// Connection settings, usually read from the environment.
#[derive(Clone, Debug)]
pub struct DatabaseSettings {
    url: String,
    max_connections: u32,
}

impl DatabaseSettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    pub fn from_env() -> DbResult<Self> {
        let url = std::env::var(DEFAULT_URL_KEY)
            .map_err(|_| DbError::MissingUrl(DEFAULT_URL_KEY.to_string()))?;
        let max_connections = match std::env::var(MAX_CONNECTIONS_KEY) {
            Ok(raw) => raw.trim().parse::<u32>().map_err(|_| DbError::InvalidSetting {
                key: MAX_CONNECTIONS_KEY,
                value: raw,
            })?,
            Err(_) => DEFAULT_MAX_CONNECTIONS,
        };
        Ok(Self::new(url).with_max_connections(max_connections))
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections.max(1);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn max_connections(&self) -> u32 {
        self.max_connections
    }
}

/// Open the pool. Called once at process start.
pub async fn connect(settings: &DatabaseSettings) -> DbResult<DbPool> {
    let mut options = ConnectOptions::new(settings.url.clone());
    options
        .max_connections(settings.max_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    let pool = Database::connect(options).await?;
    info!(
        backend = ?pool.get_database_backend(),
        max_connections = settings.max_connections,
        "database pool ready"
    );
    Ok(pool)
}

/// Drain and close the pool after the server has stopped.
pub async fn close(pool: DbPool) -> DbResult<()> {
    pool.close().await?;
    info!("database pool closed");
    Ok(())
}

/// Cheap liveness probe used by the health endpoint.
pub async fn ping<C: ConnectionTrait>(conn: &C) -> bool {
    let backend = conn.get_database_backend();
    conn.execute(Statement::from_string(backend, "SELECT 1".to_string()))
        .await
        .is_ok()
}
