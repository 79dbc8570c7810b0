//! Route registration and request dispatch
//!
//! Registration is two-phase. Resources are bound into an in-memory list
//! first, where every template, policy and duplicate check happens; a
//! single failure aborts start-up before any route exists. Only a fully
//! checked list is turned into an [`axum::Router`].
//!
//! Each request then runs through [`dispatch`]:
//!
//! ```text
//! negotiate Accept -> seed context -> authorize -> read inputs -> handler
//!                                                                  |
//!                                        Reply or AppError -> response
//! ```

use axum::{
    body::Body,
    extract::{rejection::PathRejection, Path, Request},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{MethodFilter, MethodRouter},
    Router,
};
use http_body_util::{BodyExt, Limited};
use std::collections::BTreeMap;
use std::sync::Arc;

use cda_common::{ConfigResult, ConfigurationError};

use super::access::{authorize, AccessPolicy, Decision};
use super::binder::{bind, RouteBinding};
use super::cache::CacheRule;
use super::context::{Caller, ConnectionSource, OfficeResolver, RequestContext};
use super::handler::{Invocation, ResourceHandler};
use super::input::{Filters, Payload};
use super::negotiate::negotiate;
use super::reply::Reply;
use super::Operation;
use crate::error::{AppError, AppResult};
use crate::middleware::DefaultCacheLayer;

/// Largest request body a create or update will read
pub const MAX_PAYLOAD_BYTES: usize = 2 * 1024 * 1024;

/// Shared, read-only state every dispatched request uses
#[derive(Debug, Clone)]
pub struct Engine<S: ConnectionSource> {
    source: S,
    offices: OfficeResolver,
    base_path: String,
}

impl<S: ConnectionSource> Engine<S> {
    /// `base_path` is where the resources are mounted, e.g. `/spk-data`
    pub fn new(source: S, offices: OfficeResolver, base_path: impl Into<String>) -> Self {
        Self {
            source,
            offices,
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Office every request through this engine is scoped to
    pub fn office(&self) -> String {
        self.offices.resolve(&self.base_path)
    }
}

/// Checked set of route bindings for all resources
pub struct ResourceRegistry<S: ConnectionSource> {
    bindings: Vec<RouteBinding<S>>,
}

impl<S: ConnectionSource> Default for ResourceRegistry<S> {
    fn default() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }
}

impl<S: ConnectionSource> ResourceRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a resource and add its routes
    ///
    /// On error the registry is left exactly as it was.
    pub fn register(
        &mut self,
        template: &str,
        handler: ResourceHandler<S>,
        policy: AccessPolicy,
    ) -> ConfigResult<()> {
        let bindings = bind(template, &handler, policy)?;

        for binding in &bindings {
            let clash = self
                .bindings
                .iter()
                .any(|existing| existing.method == binding.method && route_key(existing) == route_key(binding));
            if clash {
                return Err(ConfigurationError::DuplicateBinding {
                    method: binding.method.to_string(),
                    path: binding.path.clone(),
                });
            }
        }

        for binding in &bindings {
            tracing::info!(
                method = %binding.method,
                path = %binding.path,
                operation = %binding.operation,
                implemented = binding.implemented,
                "route bound"
            );
        }
        self.bindings.extend(bindings);
        Ok(())
    }

    pub fn bindings(&self) -> &[RouteBinding<S>] {
        &self.bindings
    }

    /// Register every binding with the HTTP layer in one pass
    pub fn into_router(self, engine: Engine<S>, cache: CacheRule) -> Router {
        let engine = Arc::new(engine);
        let mut routes: BTreeMap<String, (MethodRouter, Vec<Method>)> = BTreeMap::new();

        for binding in self.bindings {
            let binding = Arc::new(binding);
            for route in route_paths(&binding) {
                let (router, mut methods) = routes
                    .remove(&route)
                    .unwrap_or_else(|| (MethodRouter::new(), Vec::new()));
                methods.push(binding.method.clone());
                let router = bind_method(router, engine.clone(), binding.clone());
                routes.insert(route, (router, methods));
            }
        }

        if routes.is_empty() {
            return Router::new();
        }

        let mut router = Router::new();
        for (route, (method_router, methods)) in routes {
            let allow = allow_header(&methods);
            let method_router = method_router.options(move || {
                let allow = allow.clone();
                async move { (StatusCode::NO_CONTENT, [(header::ALLOW, allow)]) }
            });
            router = router.route(&route, method_router);
        }

        router.route_layer(DefaultCacheLayer::new(cache))
    }
}

/// Key under which the HTTP layer would match a binding
///
/// Identifier names do not take part, so `/a/{id}` and `/a/<name>` clash.
fn route_key<S: ConnectionSource>(binding: &RouteBinding<S>) -> String {
    if binding.operation.targets_item() {
        format!("{}/:", binding.resource.route_collection())
    } else {
        binding.resource.route_collection()
    }
}

/// HTTP-layer paths a binding answers on; collections answer with and
/// without the trailing separator
fn route_paths<S: ConnectionSource>(binding: &RouteBinding<S>) -> Vec<String> {
    if binding.operation.targets_item() {
        vec![binding.resource.route_item()]
    } else {
        let collection = binding.resource.route_collection();
        vec![format!("{}/", collection), collection]
    }
}

fn method_filter(operation: Operation) -> MethodFilter {
    match operation {
        Operation::FetchOne | Operation::FetchAll => MethodFilter::GET,
        Operation::Create => MethodFilter::POST,
        Operation::Update => MethodFilter::PATCH,
        Operation::Delete => MethodFilter::DELETE,
    }
}

fn allow_header(methods: &[Method]) -> HeaderValue {
    let mut names: Vec<&str> = methods.iter().map(Method::as_str).collect();
    names.push(Method::OPTIONS.as_str());
    HeaderValue::from_str(&names.join(", ")).unwrap_or_else(|_| HeaderValue::from_static("OPTIONS"))
}

fn bind_method<S: ConnectionSource>(
    router: MethodRouter,
    engine: Arc<Engine<S>>,
    binding: Arc<RouteBinding<S>>,
) -> MethodRouter {
    let filter = method_filter(binding.operation);

    if binding.operation.targets_item() {
        router.on(
            filter,
            move |params: Result<Path<Vec<(String, String)>>, PathRejection>, request: Request| {
                let engine = engine.clone();
                let binding = binding.clone();
                async move {
                    match params {
                        Ok(Path(params)) => {
                            let identifier = params.into_iter().last().map(|(_, value)| value);
                            dispatch(engine, binding, identifier, request).await
                        },
                        Err(rejection) => AppError::BadQueryParameter {
                            name: binding.resource.identifier_name().to_string(),
                            reason: rejection.body_text(),
                        }
                        .into_response(),
                    }
                }
            },
        )
    } else {
        router.on(filter, move |request: Request| {
            let engine = engine.clone();
            let binding = binding.clone();
            async move { dispatch(engine, binding, None, request).await }
        })
    }
}

/// Serve one request through one binding
#[tracing::instrument(
    name = "dispatch",
    skip_all,
    fields(
        operation = %binding.operation,
        path = %binding.path,
        office = tracing::field::Empty,
        caller = tracing::field::Empty,
    )
)]
pub async fn dispatch<S: ConnectionSource>(
    engine: Arc<Engine<S>>,
    binding: Arc<RouteBinding<S>>,
    identifier: Option<String>,
    request: Request,
) -> Response {
    match run(&engine, &binding, identifier, request).await {
        Ok(reply) => {
            tracing::debug!(status = reply.status().as_u16(), "request served");
            reply.into_response()
        },
        Err(err) => err.into_response(),
    }
}

async fn run<S: ConnectionSource>(
    engine: &Engine<S>,
    binding: &RouteBinding<S>,
    identifier: Option<String>,
    request: Request,
) -> AppResult<Reply> {
    let (parts, body) = request.into_parts();
    negotiate(&parts.headers)?;

    let caller = parts.extensions.get::<Caller>().cloned();
    let ctx = RequestContext::seed(&engine.source, &engine.offices, &engine.base_path, caller).await?;
    let span = tracing::Span::current();
    span.record("office", ctx.office());
    if let Some(caller) = ctx.caller() {
        span.record("caller", caller.name.as_str());
    }

    // The taxonomy logs the denial, inside this span
    if let Decision::Deny(reason) = authorize(binding.operation, &ctx.roles(), &binding.policy) {
        return Err(AppError::Forbidden(reason.to_string()));
    }

    match &binding.invocation {
        Invocation::Item(f) => {
            let id = require_identifier(identifier, binding)?;
            f(ctx, id).await
        },
        Invocation::Filters(f) => {
            let filters = Filters::from_uri(&parts.uri)?;
            f(ctx, filters).await
        },
        Invocation::Payload(f) => {
            let payload = read_payload(&parts.headers, body).await?;
            f(ctx, payload).await
        },
        Invocation::ItemPayload(f) => {
            let id = require_identifier(identifier, binding)?;
            let payload = read_payload(&parts.headers, body).await?;
            f(ctx, id, payload).await
        },
    }
}

fn require_identifier<S: ConnectionSource>(
    identifier: Option<String>,
    binding: &RouteBinding<S>,
) -> AppResult<String> {
    identifier
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::MissingParameter(binding.resource.identifier_name().to_string()))
}

async fn read_payload(headers: &HeaderMap, body: Body) -> AppResult<Payload> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let bytes = Limited::new(body, MAX_PAYLOAD_BYTES)
        .collect()
        .await
        .map_err(|e| AppError::bad_body(format!("failed to read request body: {}", e)))?
        .to_bytes();

    Ok(Payload::new(content_type, bytes))
}
