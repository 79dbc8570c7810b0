use sqlx::{PgConnection, PgPool};

use crate::dispatch::{Reply, RequestContext};
use crate::error::{AppError, AppResult};
use crate::features::location_categories::LocationCategory;

/// Find one category of an office, ignoring the case of its id
#[tracing::instrument(skip(conn))]
pub async fn find(
    conn: &mut PgConnection,
    office: &str,
    category_id: &str,
) -> Result<Option<LocationCategory>, sqlx::Error> {
    sqlx::query_as::<_, LocationCategory>(
        r#"
        SELECT office_code AS office_id, category_id AS id, description
        FROM location_category
        WHERE office_code = $1 AND UPPER(category_id) = UPPER($2)
        "#,
    )
    .bind(office)
    .bind(category_id)
    .fetch_optional(conn)
    .await
}

pub async fn handle(mut ctx: RequestContext<PgPool>, category_id: String) -> AppResult<Reply> {
    let office = ctx.office().to_string();
    let category = find(ctx.connection(), &office, &category_id)
        .await?
        .ok_or_else(|| AppError::not_found("location category", &category_id))?;

    Reply::ok(&category)
}
