//! Create a location category
//!
//! ```json
//! {"office-id": "SPK", "id": "Reservoir", "description": "Reservoir projects"}
//! ```
//!
//! `office-id` may be left out; it must otherwise name the office the
//! request is scoped to. A category whose id already exists in the office,
//! in any case, is a conflict.

use serde::Deserialize;
use serde_json::{Map, Value};
use sqlx::{PgConnection, PgPool};

use crate::dispatch::{Payload, Reply, RequestContext};
use crate::error::{AppError, AppResult};

/// Longest category id the table holds
pub const MAX_ID_LENGTH: usize = 32;

/// Longest description the table holds
pub const MAX_DESCRIPTION_LENGTH: usize = 128;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct CreateCategoryCommand {
    #[serde(default)]
    pub office_id: Option<String>,
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl CreateCategoryCommand {
    /// Check the command against the office the request is scoped to
    pub fn validate(&self, office: &str) -> AppResult<()> {
        let mut fields = Map::new();

        let id = self.id.trim();
        if id.is_empty() {
            fields.insert("id".to_string(), Value::from("is required"));
        } else if id.chars().count() > MAX_ID_LENGTH {
            fields.insert(
                "id".to_string(),
                Value::from(format!("must be at most {} characters", MAX_ID_LENGTH)),
            );
        }

        if let Some(ref description) = self.description {
            if description.chars().count() > MAX_DESCRIPTION_LENGTH {
                fields.insert(
                    "description".to_string(),
                    Value::from(format!("must be at most {} characters", MAX_DESCRIPTION_LENGTH)),
                );
            }
        }

        if let Some(ref office_id) = self.office_id {
            if !office_id.trim().eq_ignore_ascii_case(office) {
                fields.insert(
                    "office-id".to_string(),
                    Value::from(format!("must be {}", office)),
                );
            }
        }

        if fields.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation {
                message: "Invalid location category".to_string(),
                fields,
            })
        }
    }
}

#[tracing::instrument(skip(conn))]
pub async fn insert(
    conn: &mut PgConnection,
    office: &str,
    command: &CreateCategoryCommand,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO location_category (office_code, category_id, description)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(office)
    .bind(command.id.trim())
    .bind(&command.description)
    .execute(conn)
    .await
    .map(|_| ())
}

pub async fn handle(mut ctx: RequestContext<PgPool>, payload: Payload) -> AppResult<Reply> {
    let command: CreateCategoryCommand = payload.json()?;
    let office = ctx.office().to_string();
    command.validate(&office)?;

    insert(ctx.connection(), &office, &command).await?;
    tracing::info!(office = %office, id = %command.id, "location category created");

    Ok(Reply::created())
}
