//! HR vertical slice: employee onboarding, roster uploads and one-time
//! credentials.

pub mod credentials;
mod employee;
mod onboarding;
pub mod roster;

pub use employee::{
    BulkResult, EmployeeInput, EmployeeSummary, ResetRequest, ResetResult, RowFailure,
    describe_validation,
};
pub use entity::employees::UserStatus;
pub use onboarding::{OnboardingError, OnboardingService};
pub use roster::{REQUIRED_COLUMNS, RosterError};
