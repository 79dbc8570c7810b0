//! Resources served by the data API
//!
//! Each resource is a vertical slice:
//! - `queries/` - fetch-one and fetch-all
//! - `commands/` - create, update, delete
//! - `mod.rs` - path template and [`ResourceHandler`](crate::dispatch::ResourceHandler)
//!
//! # Resources
//!
//! - **location_categories**: `/location/category/{category-id}`

pub mod location_categories;

use sqlx::PgPool;

use cda_common::ConfigResult;

use crate::dispatch::{AccessPolicy, ResourceRegistry};

/// Register every resource under one access policy
pub fn register(registry: &mut ResourceRegistry<PgPool>, policy: &AccessPolicy) -> ConfigResult<()> {
    registry.register(
        location_categories::TEMPLATE,
        location_categories::handler(),
        policy.clone(),
    )?;

    Ok(())
}
