use chrono::Utc;
use entity::employees;
use platform_api::ApiError;
use platform_db::{DbError, DbPool};
use sea_orm::Set;
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    credentials::{self, CredentialError, CredentialPair},
    employee::{
        BulkResult, EmployeeInput, EmployeeSummary, ResetRequest, ResetResult, RowFailure,
        describe_validation,
    },
    roster::{self, RosterError},
};

#[derive(Debug, Error)]
pub enum OnboardingError {
    #[error("{0}")]
    Validation(String),
    #[error("Username {0} already exists")]
    Duplicate(String),
    #[error("Employee not found")]
    NotFound,
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error("storage error: {0}")]
    Storage(#[source] DbError),
}

impl From<DbError> for OnboardingError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::DuplicateUsername(username) => Self::Duplicate(username),
            other => Self::Storage(other),
        }
    }
}

impl OnboardingError {
    /// Reason recorded against a failed roster row. Infrastructure details
    /// stay in the logs.
    fn row_reason(&self) -> String {
        match self {
            Self::Credential(_) | Self::Storage(_) => {
                "Internal server error while creating employee".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<OnboardingError> for ApiError {
    fn from(value: OnboardingError) -> Self {
        match value {
            OnboardingError::Validation(msg) => ApiError::Validation(msg),
            err @ OnboardingError::Duplicate(_) => ApiError::Duplicate(err.to_string()),
            err @ OnboardingError::NotFound => ApiError::NotFound(err.to_string()),
            err @ (OnboardingError::Credential(_) | OnboardingError::Storage(_)) => {
                ApiError::internal(err.into())
            }
        }
    }
}

impl From<RosterError> for ApiError {
    fn from(value: RosterError) -> Self {
        match value {
            err @ (RosterError::NotCsv | RosterError::MissingColumns(_)) => {
                ApiError::FileFormat(err.to_string())
            }
            err @ (RosterError::Encoding | RosterError::Unreadable(_)) => {
                ApiError::Parse(format!("Failed to process CSV file: {err}"))
            }
        }
    }
}

/// Creates employees and resets their passwords against an injected store.
#[derive(Clone)]
pub struct OnboardingService {
    pool: DbPool,
}

impl OnboardingService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Validate, deduplicate and persist one employee. The returned summary
    /// carries the only copy of the plaintext password.
    #[instrument(name = "hr.create_employee", skip_all, fields(employee_id = input.employee_id))]
    pub async fn create_employee(
        &self,
        input: EmployeeInput,
    ) -> Result<EmployeeSummary, OnboardingError> {
        let input = input.normalized();
        input
            .validate()
            .map_err(|errs| OnboardingError::Validation(describe_validation(&errs)))?;

        let username = credentials::generate_username(&input.name, input.employee_id);
        if platform_db::find_by_username(&self.pool, &username)
            .await?
            .is_some()
        {
            return Err(OnboardingError::Duplicate(username));
        }

        let CredentialPair { plaintext, encoded } = issue_credentials().await?;
        let record = employees::ActiveModel {
            id: Set(Uuid::new_v4()),
            employee_id: Set(input.employee_id),
            name: Set(input.name),
            email: Set(input.email),
            address1: Set(input.address1),
            address2: Set(input.address2),
            role: Set(input.role),
            mobile: Set(input.mobile),
            alt_mobile: Set(input.alt_mobile),
            latitude: Set(input.latitude),
            longitude: Set(input.longitude),
            physical_address: Set(input.physical_address),
            user_status: Set(input.user_status),
            username: Set(username),
            password: Set(encoded.into_inner()),
            active_timestamp: Set(Utc::now().into()),
            current_device_id: Set(String::new()),
            current_session: Set(String::new()),
        };
        let saved = platform_db::insert_employee(&self.pool, record).await?;
        info!(username = %saved.username, "employee onboarded");
        Ok(EmployeeSummary::new(&saved, plaintext))
    }

    /// Best-effort batch: each row is created on its own and failures are
    /// collected instead of aborting. Only a structurally bad file fails the
    /// call.
    #[instrument(name = "hr.bulk_create", skip_all, fields(bytes = contents.len()))]
    pub async fn bulk_create(&self, contents: &[u8]) -> Result<BulkResult, RosterError> {
        let rows = roster::parse_roster(contents)?;
        let mut result = BulkResult::default();
        for roster::RosterRow { row, entry } in rows {
            let outcome = match entry {
                Ok(input) => self.create_employee(input).await.map_err(|err| {
                    if matches!(
                        err,
                        OnboardingError::Credential(_) | OnboardingError::Storage(_)
                    ) {
                        error!(row, error = %err, "roster row failed");
                    }
                    err.row_reason()
                }),
                Err(reason) => Err(reason),
            };
            match outcome {
                Ok(summary) => result.employee_summaries.push(summary),
                Err(error) => {
                    warn!(row, %error, "skipping roster row");
                    result.failed_rows.push(RowFailure { row, error });
                }
            }
        }
        result.added = result.employee_summaries.len();
        result.failed = result.failed_rows.len();
        info!(added = result.added, failed = result.failed, "roster processed");
        Ok(result)
    }

    /// Issue a fresh password for the employee matching `(name, id)`.
    /// Names compare after normalization; the write is keyed by the
    /// record's internal id and touches only the password.
    #[instrument(name = "hr.reset_password", skip_all, fields(employee_id = request.employee_id))]
    pub async fn reset_password(
        &self,
        request: ResetRequest,
    ) -> Result<ResetResult, OnboardingError> {
        request
            .validate()
            .map_err(|errs| OnboardingError::Validation(describe_validation(&errs)))?;
        let wanted = credentials::normalize_name(&request.name);
        let record = platform_db::find_by_employee_id(&self.pool, request.employee_id)
            .await?
            .into_iter()
            .find(|record| credentials::normalize_name(&record.name) == wanted)
            .ok_or(OnboardingError::NotFound)?;

        let CredentialPair { plaintext, encoded } = issue_credentials().await?;
        platform_db::update_password(&self.pool, record.id, encoded.into_inner()).await?;
        info!(username = %record.username, "password reset");
        Ok(ResetResult {
            username: record.username,
            new_plain_password: plaintext,
        })
    }
}

async fn issue_credentials() -> Result<CredentialPair, CredentialError> {
    tokio::task::spawn_blocking(credentials::issue_credentials)
        .await
        .map_err(|err| CredentialError::Hash(format!("hashing task failed: {err}")))?
}

