//! CWMS Data API resource server
//!
//! REST facade over the hydrologic database. Each resource is described
//! once, by a path template and the operations it implements, and served
//! through the dispatch engine:
//!
//! - **Routing**: every resource gets exactly five routes (fetch-all,
//!   fetch-one, create, update, delete); operations a resource leaves out
//!   answer `501 Not Implemented`
//! - **Access**: reads are open, writes require one of the configured roles
//! - **Caching**: successful reads carry a default `Cache-Control`
//! - **Errors**: every failure goes through one ordered taxonomy and gets a
//!   uniform JSON body
//! - **Offices**: each deployment is scoped to the office named by its base
//!   path (`/spk-data` serves `SPK`)
//!
//! # Example
//!
//! ```no_run
//! use cda_server::{api, config::Config, db};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let pool = db::create_pool(&config.database).await?;
//!     api::serve(config, pool).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod features;
pub mod middleware;

// Re-export commonly used types
pub use error::{AppError, AppResult};
