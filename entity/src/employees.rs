use sea_orm::prelude::{DateTimeWithTimeZone, *};
use serde::{Deserialize, Deserializer, Serialize, de};
use uuid::Uuid;

/// One onboarded employee. `password` holds the storage encoding of a
/// password hash, never a plaintext secret.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "employees")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(indexed)]
    pub employee_id: i64,
    pub name: String,
    pub email: String,
    pub address1: String,
    pub address2: Option<String>,
    pub role: String,
    pub mobile: String,
    pub alt_mobile: Option<String>,
    #[sea_orm(column_type = "Double")]
    pub latitude: f64,
    #[sea_orm(column_type = "Double")]
    pub longitude: f64,
    pub physical_address: String,
    pub user_status: UserStatus,
    #[sea_orm(unique)]
    pub username: String,
    pub password: String,
    pub active_timestamp: DateTimeWithTimeZone,
    pub current_device_id: String,
    pub current_session: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq, Serialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "inactive")]
    Inactive,
}

impl UserStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

/// Accepts any casing and surrounding whitespace.
impl<'de> Deserialize<'de> for UserStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let raw = raw.trim();
        [Self::Active, Self::Inactive]
            .into_iter()
            .find(|status| raw.eq_ignore_ascii_case(status.label()))
            .ok_or_else(|| de::Error::unknown_variant(raw, &["active", "inactive"]))
    }
}

impl ActiveModelBehavior for ActiveModel {}
