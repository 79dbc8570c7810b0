//! Expand a resource into its route bindings
//!
//! | method | path        | operation |
//! |--------|-------------|-----------|
//! | GET    | collection  | fetch-all |
//! | GET    | item        | fetch-one |
//! | POST   | collection  | create    |
//! | PATCH  | item        | update    |
//! | DELETE | item        | delete    |
//!
//! Binding does no I/O. Nothing is registered with the HTTP layer here; the
//! registry does that in one pass once every resource has bound cleanly.

use axum::http::Method;
use std::sync::Arc;

use cda_common::ConfigResult;

use super::access::AccessPolicy;
use super::context::ConnectionSource;
use super::handler::{Invocation, ResourceHandler};
use super::path::{self, ResourcePath};
use super::Operation;

/// One method and path bound to one operation
pub struct RouteBinding<S: ConnectionSource> {
    pub method: Method,
    /// Concrete path, e.g. `/location/category/` or
    /// `/location/category/{category-id}`
    pub path: String,
    pub operation: Operation,
    pub invocation: Invocation<S>,
    /// False when `invocation` is the "not implemented" stand-in
    pub implemented: bool,
    pub resource: Arc<ResourcePath>,
    pub policy: Arc<AccessPolicy>,
}

impl<S: ConnectionSource> Clone for RouteBinding<S> {
    fn clone(&self) -> Self {
        Self {
            method: self.method.clone(),
            path: self.path.clone(),
            operation: self.operation,
            invocation: self.invocation.clone(),
            implemented: self.implemented,
            resource: self.resource.clone(),
            policy: self.policy.clone(),
        }
    }
}

impl<S: ConnectionSource> std::fmt::Debug for RouteBinding<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteBinding")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("operation", &self.operation)
            .field("implemented", &self.implemented)
            .finish_non_exhaustive()
    }
}

/// Produce the five bindings of the resource at `template`
///
/// Template and policy problems are returned unchanged and nothing is
/// bound.
pub fn bind<S: ConnectionSource>(
    template: &str,
    handler: &ResourceHandler<S>,
    policy: AccessPolicy,
) -> ConfigResult<Vec<RouteBinding<S>>> {
    let resource = Arc::new(path::validate(template)?);
    policy.check(template)?;
    let policy = Arc::new(policy);

    let item = resource.item_path();
    let collection = resource.collection_path();

    let bindings = Operation::ALL
        .into_iter()
        .map(|operation| {
            let (invocation, implemented) = match handler.invocation(operation) {
                Some(invocation) => (invocation, true),
                None => (Invocation::not_implemented(operation, resource.template()), false),
            };
            RouteBinding {
                method: operation.method(),
                path: if operation.targets_item() {
                    item.clone()
                } else {
                    collection.clone()
                },
                operation,
                invocation,
                implemented,
                resource: resource.clone(),
                policy: policy.clone(),
            }
        })
        .collect();

    Ok(bindings)
}
