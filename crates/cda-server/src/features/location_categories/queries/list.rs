use serde::Serialize;
use sqlx::PgPool;

use crate::dispatch::{Filters, Reply, RequestContext};
use crate::error::AppResult;
use crate::features::location_categories::LocationCategory;

/// Criteria of a category listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListCategoriesQuery {
    pub office: String,
    /// Case-insensitive SQL `LIKE` pattern on the category id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub like: Option<String>,
}

impl ListCategoriesQuery {
    /// `?office=` narrows to another office than the one the request is
    /// scoped to; `?like=` filters ids
    pub fn from_filters(filters: &Filters, default_office: &str) -> Self {
        Self {
            office: filters
                .get("office")
                .map(str::trim)
                .filter(|office| !office.is_empty())
                .unwrap_or(default_office)
                .to_uppercase(),
            like: filters
                .get("like")
                .map(str::trim)
                .filter(|like| !like.is_empty())
                .map(str::to_string),
        }
    }
}

pub async fn handle(mut ctx: RequestContext<PgPool>, filters: Filters) -> AppResult<Reply> {
    let query = ListCategoriesQuery::from_filters(&filters, ctx.office());
    tracing::debug!(office = %query.office, like = ?query.like, "listing location categories");

    let categories = sqlx::query_as::<_, LocationCategory>(
        r#"
        SELECT office_code AS office_id, category_id AS id, description
        FROM location_category
        WHERE office_code = $1
          AND ($2::TEXT IS NULL OR category_id ILIKE $2)
        ORDER BY UPPER(category_id)
        "#,
    )
    .bind(&query.office)
    .bind(&query.like)
    .fetch_all(&mut **ctx.connection())
    .await?;

    Reply::ok(&categories)
}
