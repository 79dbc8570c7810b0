//! CDA Common Library
//!
//! Ambient pieces shared by the CDA workspace members.
//!
//! - **Logging**: `tracing` subscriber setup driven by the environment
//! - **Error Handling**: [`ConfigurationError`], raised while the server is
//!   being assembled (route registration, configuration validation)
//!
//! # Example
//!
//! ```no_run
//! use cda_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_logging(&LogConfig::from_env()?)?;
//!     tracing::info!("ready");
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;

pub use error::{ConfigResult, ConfigurationError};
