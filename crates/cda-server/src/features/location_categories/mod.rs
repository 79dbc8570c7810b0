//! Location categories
//!
//! ```text
//! GET    /location/category/                 fetch-all  (?office=, ?like=)
//! GET    /location/category/{category-id}    fetch-one
//! POST   /location/category/                 create
//! PATCH  /location/category/{category-id}    not implemented
//! DELETE /location/category/{category-id}    delete
//! ```
//!
//! Rows live in `location_category`, keyed by office and category id.
//! A category with rows in `location_category_member` cannot be deleted.

pub mod commands;
pub mod queries;

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::dispatch::ResourceHandler;

pub const TEMPLATE: &str = "/location/category/{category-id}";

/// A location category as stored and served
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "kebab-case")]
pub struct LocationCategory {
    pub office_id: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

pub fn handler() -> ResourceHandler<PgPool> {
    ResourceHandler::new()
        .fetch_one(queries::get::handle)
        .fetch_all(queries::list::handle)
        .create(commands::create::handle)
        .delete(commands::delete::handle)
}
