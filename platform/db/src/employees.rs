use entity::employees;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, SqlErr, sea_query::Expr,
};
use tracing::debug;
use uuid::Uuid;

use crate::{DbError, DbResult};

pub async fn find_by_username<C: ConnectionTrait>(
    conn: &C,
    username: &str,
) -> DbResult<Option<employees::Model>> {
    employees::Entity::find()
        .filter(employees::Column::Username.eq(username))
        .one(conn)
        .await
        .map_err(Into::into)
}

/// All records carrying `employee_id`, oldest first. The id is not unique on
/// its own; callers disambiguate by name.
pub async fn find_by_employee_id<C: ConnectionTrait>(
    conn: &C,
    employee_id: i64,
) -> DbResult<Vec<employees::Model>> {
    employees::Entity::find()
        .filter(employees::Column::EmployeeId.eq(employee_id))
        .order_by_asc(employees::Column::ActiveTimestamp)
        .all(conn)
        .await
        .map_err(Into::into)
}

/// Insert a fully built record in one statement. A unique-index hit on
/// `username` surfaces as [`DbError::DuplicateUsername`].
pub async fn insert_employee<C: ConnectionTrait>(
    conn: &C,
    record: employees::ActiveModel,
) -> DbResult<employees::Model> {
    let username = record.username.clone().take().unwrap_or_default();
    match record.insert(conn).await {
        Ok(model) => {
            debug!(id = %model.id, username = %model.username, "employee inserted");
            Ok(model)
        }
        Err(err) => match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => Err(DbError::DuplicateUsername(username)),
            _ => Err(err.into()),
        },
    }
}

/// Overwrite the stored password of one record, keyed by its internal id.
/// No other column is touched.
pub async fn update_password<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    encoded_password: String,
) -> DbResult<()> {
    let result = employees::Entity::update_many()
        .col_expr(employees::Column::Password, Expr::value(encoded_password))
        .filter(employees::Column::Id.eq(id))
        .exec(conn)
        .await?;
    if result.rows_affected == 0 {
        return Err(DbError::RecordMissing(id));
    }
    Ok(())
}

pub async fn count_employees<C: ConnectionTrait>(conn: &C) -> DbResult<u64> {
    employees::Entity::find()
        .count(conn)
        .await
        .map_err(Into::into)
}
