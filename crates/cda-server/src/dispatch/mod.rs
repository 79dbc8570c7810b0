//! Resource dispatch engine
//!
//! A resource is described once, by a path template, a [`ResourceHandler`]
//! and an [`AccessPolicy`]. The engine turns it into five routes, and for
//! every request seeds a [`RequestContext`], checks access, calls the
//! handler and maps the outcome to a response: the default cache header for
//! successful reads, the error [`taxonomy`] for failures.

pub mod access;
pub mod binder;
pub mod cache;
pub mod context;
pub mod handler;
pub mod input;
pub mod negotiate;
pub mod operation;
pub mod path;
pub mod registry;
pub mod reply;
pub mod taxonomy;

pub use access::{authorize, AccessPolicy, AccessRule, Decision};
pub use binder::{bind, RouteBinding};
pub use cache::{apply_default_cache, CacheRule, TimeUnit};
pub use context::{Caller, ConnectionSource, OfficeResolver, RequestContext, DEFAULT_OFFICE};
pub use handler::{Invocation, ResourceHandler};
pub use input::{Filters, Payload};
pub use operation::Operation;
pub use path::{validate, ResourcePath};
pub use registry::{Engine, ResourceRegistry};
pub use reply::Reply;
