//! Delete a location category
//!
//! Categories that still have member locations are kept and the members
//! are listed back to the caller.

use serde_json::{Map, Value};
use sqlx::{PgConnection, PgPool};

use crate::dispatch::{Reply, RequestContext};
use crate::error::{AppError, AppResult};

/// Locations assigned to a category
#[tracing::instrument(skip(conn))]
pub async fn members(
    conn: &mut PgConnection,
    office: &str,
    category_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        r#"
        SELECT location_id
        FROM location_category_member
        WHERE office_code = $1 AND UPPER(category_id) = UPPER($2)
        ORDER BY location_id
        "#,
    )
    .bind(office)
    .bind(category_id)
    .fetch_all(conn)
    .await
}

/// Returns whether a row was deleted
#[tracing::instrument(skip(conn))]
pub async fn remove(
    conn: &mut PgConnection,
    office: &str,
    category_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM location_category
        WHERE office_code = $1 AND UPPER(category_id) = UPPER($2)
        "#,
    )
    .bind(office)
    .bind(category_id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// The failure reported for a category that still has members
pub fn blocked(category_id: &str, locations: Vec<String>) -> AppError {
    let mut references = Map::new();
    references.insert(
        "locations".to_string(),
        Value::Array(locations.into_iter().map(Value::from).collect()),
    );
    AppError::DeleteBlocked {
        message: format!("location category '{}'", category_id),
        references,
    }
}

pub async fn handle(mut ctx: RequestContext<PgPool>, category_id: String) -> AppResult<Reply> {
    let office = ctx.office().to_string();

    let locations = members(ctx.connection(), &office, &category_id).await?;
    if !locations.is_empty() {
        return Err(blocked(&category_id, locations));
    }

    // A member added after the check still trips the foreign key, which
    // maps to the same conflict.
    if !remove(ctx.connection(), &office, &category_id).await? {
        return Err(AppError::not_found("location category", &category_id));
    }

    tracing::info!(office = %office, id = %category_id, "location category deleted");
    Ok(Reply::no_content())
}
