use std::ops::RangeInclusive;

use entity::employees::{self, UserStatus};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use validator::{Validate, ValidationError, ValidationErrors};

/// Request body for a single employee, and the row shape of a roster upload.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct EmployeeInput {
    #[serde(rename = "E_ID")]
    #[validate(range(min = 1, message = "must be a positive integer"))]
    pub employee_id: i64,
    #[serde(rename = "E_Name")]
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(custom(function = "not_blank"))]
    pub address1: String,
    #[serde(default)]
    pub address2: Option<String>,
    #[validate(custom(function = "not_blank"))]
    pub role: String,
    #[validate(custom(function = "not_blank"))]
    pub mobile: String,
    #[serde(rename = "altMobile", default)]
    pub alt_mobile: Option<String>,
    #[validate(custom(function = "valid_latitude"))]
    pub latitude: f64,
    #[validate(custom(function = "valid_longitude"))]
    pub longitude: f64,
    #[serde(rename = "physicalAddress")]
    #[validate(custom(function = "not_blank"))]
    pub physical_address: String,
    #[serde(rename = "userStatus", deserialize_with = "user_status")]
    pub user_status: UserStatus,
}

impl EmployeeInput {
    /// Trim every text field, collapse whitespace inside the name and turn
    /// blank optional fields into `None`.
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.split_whitespace().collect::<Vec<_>>().join(" "),
            email: self.email.trim().to_string(),
            address1: self.address1.trim().to_string(),
            address2: trimmed_option(self.address2),
            role: self.role.trim().to_string(),
            mobile: self.mobile.trim().to_string(),
            alt_mobile: trimmed_option(self.alt_mobile),
            physical_address: self.physical_address.trim().to_string(),
            ..self
        }
    }
}

fn trimmed_option(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some("is required".into());
        return Err(err);
    }
    Ok(())
}

// NaN fails `contains`, so non-finite coordinates are rejected too.
fn valid_latitude(value: f64) -> Result<(), ValidationError> {
    coordinate_in(&value, -90.0..=90.0, "must be between -90 and 90")
}

fn valid_longitude(value: f64) -> Result<(), ValidationError> {
    coordinate_in(&value, -180.0..=180.0, "must be between -180 and 180")
}

fn coordinate_in(
    value: &f64,
    bounds: RangeInclusive<f64>,
    message: &'static str,
) -> Result<(), ValidationError> {
    if bounds.contains(value) {
        return Ok(());
    }
    let mut err = ValidationError::new("range");
    err.message = Some(message.into());
    Err(err)
}

/// Roster decoding reports custom errors without a column, so the column
/// is named here.
fn user_status<'de, D: Deserializer<'de>>(deserializer: D) -> Result<UserStatus, D::Error> {
    UserStatus::deserialize(deserializer)
        .map_err(|err| de::Error::custom(format_args!("userStatus: {err}")))
}

/// Flatten validator output into one readable line, fields in name order.
pub fn describe_validation(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    fields
        .into_iter()
        .map(|(field, errs)| {
            let reasons = errs
                .iter()
                .map(|err| {
                    err.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string())
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("{} {reasons}", wire_name(&field))
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn wire_name(field: &str) -> &str {
    match field {
        "employee_id" => "E_ID",
        "name" => "E_Name",
        "alt_mobile" => "altMobile",
        "physical_address" => "physicalAddress",
        "user_status" => "userStatus",
        other => other,
    }
}

/// What the caller learns about a created employee. `Password` is the
/// plaintext secret and appears nowhere else.
#[derive(Debug, Serialize)]
pub struct EmployeeSummary {
    #[serde(rename = "E_ID")]
    pub employee_id: i64,
    #[serde(rename = "E_Name")]
    pub name: String,
    pub email: String,
    #[serde(rename = "userStatus")]
    pub user_status: UserStatus,
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(rename = "Password", serialize_with = "expose_secret")]
    pub password: SecretString,
}

impl EmployeeSummary {
    pub(crate) fn new(record: &employees::Model, password: SecretString) -> Self {
        Self {
            employee_id: record.employee_id,
            name: record.name.clone(),
            email: record.email.clone(),
            user_status: record.user_status,
            username: record.username.clone(),
            password,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RowFailure {
    pub row: usize,
    pub error: String,
}

#[derive(Debug, Default, Serialize)]
pub struct BulkResult {
    pub added: usize,
    pub failed: usize,
    pub employee_summaries: Vec<EmployeeSummary>,
    pub failed_rows: Vec<RowFailure>,
}

/// Password reset lookup key.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct ResetRequest {
    #[serde(rename = "E_Name")]
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    #[serde(rename = "E_ID")]
    pub employee_id: i64,
}

#[derive(Debug, Serialize)]
pub struct ResetResult {
    pub username: String,
    #[serde(serialize_with = "expose_secret")]
    pub new_plain_password: SecretString,
}

fn expose_secret<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}
