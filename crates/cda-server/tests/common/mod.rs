//! Common test utilities for dispatch integration tests
//!
//! Everything runs in memory: [`MemorySource`] hands out leases that only
//! count themselves, and [`categories`] is a location category resource
//! backed by a shared map.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::TestApp;
//!
//! #[tokio::test]
//! async fn test_fetch() {
//!     let app = TestApp::start();
//!     let (status, body) = app.get("/cwms-data/location/category/ABC").await;
//! }
//! ```

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, Response, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use cda_server::{
    api,
    config::Config,
    dispatch::{ConnectionSource, Reply, RequestContext, ResourceHandler, ResourceRegistry},
    AppError, AppResult,
};

pub const CATEGORIES: &str = "/location/category/{category-id}";
pub const ECHO: &str = "/office/echo/{name}";
pub const WRITER: &str = "CWMS Users";

/// Connection source that counts open leases
#[derive(Clone, Default)]
pub struct MemorySource {
    open: Arc<AtomicUsize>,
    acquired: Arc<AtomicUsize>,
    unavailable: bool,
}

pub struct Lease(Arc<AtomicUsize>);

impl Drop for Lease {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MemorySource {
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Leases currently held
    pub fn open(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    /// Leases handed out so far
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionSource for MemorySource {
    type Connection = Lease;

    async fn acquire(&self) -> AppResult<Lease> {
        if self.unavailable {
            return Err(AppError::Internal(anyhow::anyhow!("connection refused")));
        }
        self.open.fetch_add(1, Ordering::SeqCst);
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Lease(self.open.clone()))
    }
}

/// Category rows: id -> (description, member locations)
pub type Store = Arc<Mutex<BTreeMap<String, (Option<String>, Vec<String>)>>>;

/// Location categories over `store`; update is left unimplemented
///
/// `BOOM` fails with an unclassified error and `live` answers with
/// `Cache-Control: no-store`.
pub fn categories(store: Store, creates: Arc<AtomicUsize>) -> ResourceHandler<MemorySource> {
    let fetch_one_store = store.clone();
    let fetch_all_store = store.clone();
    let create_store = store.clone();
    let delete_store = store;

    ResourceHandler::new()
        .fetch_one(move |ctx: RequestContext<MemorySource>, id: String| {
            let store = fetch_one_store.clone();
            async move {
                match id.as_str() {
                    "BOOM" => Err(AppError::Internal(anyhow::anyhow!(
                        "ORA-06502: PL/SQL: numeric or value error"
                    ))),
                    "live" => Ok(Reply::ok(&json!({"id": "live"}))?.cache_control("no-store")),
                    _ => {
                        let rows = store.lock().unwrap();
                        let (description, _) = rows
                            .get(&id)
                            .ok_or_else(|| AppError::not_found("location category", &id))?;
                        Reply::ok(&json!({
                            "office-id": ctx.office(),
                            "id": id,
                            "description": description,
                        }))
                    },
                }
            }
        })
        .fetch_all(move |_ctx, filters| {
            let store = fetch_all_store.clone();
            async move {
                let like = filters.get("like").map(str::to_string);
                let rows = store.lock().unwrap();
                let ids: Vec<&String> = rows
                    .keys()
                    .filter(|id| like.as_deref().map_or(true, |prefix| id.starts_with(prefix)))
                    .collect();
                Reply::ok(&ids)
            }
        })
        .create(move |_ctx, payload| {
            let store = create_store.clone();
            let creates = creates.clone();
            async move {
                creates.fetch_add(1, Ordering::SeqCst);
                let body: Value = payload.json()?;
                let id = body["id"]
                    .as_str()
                    .ok_or_else(|| AppError::bad_body("id is required"))?
                    .to_string();
                let mut rows = store.lock().unwrap();
                if rows.contains_key(&id) {
                    return Err(AppError::already_exists("location category", &id));
                }
                let description = body["description"].as_str().map(str::to_string);
                rows.insert(id, (description, Vec::new()));
                Ok(Reply::created())
            }
        })
        .delete(move |_ctx, id| {
            let store = delete_store.clone();
            async move {
                let mut rows = store.lock().unwrap();
                let (_, members) = rows
                    .get(&id)
                    .ok_or_else(|| AppError::not_found("location category", &id))?;
                if !members.is_empty() {
                    let mut references = serde_json::Map::new();
                    references.insert("locations".to_string(), json!(members));
                    return Err(AppError::DeleteBlocked {
                        message: format!("location category '{}'", id),
                        references,
                    });
                }
                rows.remove(&id);
                Ok(Reply::no_content())
            }
        })
}

/// Answers with the office the request was scoped to
pub fn echo() -> ResourceHandler<MemorySource> {
    ResourceHandler::new().fetch_one(|ctx: RequestContext<MemorySource>, name: String| async move {
        Reply::ok(&json!({"office": ctx.office(), "name": name}))
    })
}

pub struct TestApp {
    pub router: Router,
    pub source: MemorySource,
    pub store: Store,
    /// Times the create handler actually ran
    pub creates: Arc<AtomicUsize>,
}

impl TestApp {
    /// Default configuration with trusted identity headers
    pub fn start() -> Self {
        let mut config = Config::default();
        config.access.trust_identity_headers = true;
        Self::with_config(config, MemorySource::default())
    }

    pub fn with_config(config: Config, source: MemorySource) -> Self {
        let store: Store = Arc::new(Mutex::new(BTreeMap::new()));
        let creates = Arc::new(AtomicUsize::new(0));

        let mut registry = ResourceRegistry::new();
        registry
            .register(
                CATEGORIES,
                categories(store.clone(), creates.clone()),
                config.access.policy(),
            )
            .unwrap();
        registry
            .register(ECHO, echo(), config.access.policy())
            .unwrap();

        Self {
            router: api::create_router(&config, registry, source.clone()),
            source,
            store,
            creates,
        }
    }

    /// Add a category with member locations
    pub fn seed(&self, id: &str, members: &[&str]) {
        self.store.lock().unwrap().insert(
            id.to_string(),
            (None, members.iter().map(|m| m.to_string()).collect()),
        );
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let response = self
            .send(request(Method::GET, uri).body(Body::empty()).unwrap())
            .await;
        let status = response.status();
        (status, json_body(response).await)
    }
}

pub fn request(method: Method, uri: &str) -> axum::http::request::Builder {
    Request::builder().method(method).uri(uri)
}

/// A request from a caller holding `roles`
pub fn as_user(builder: axum::http::request::Builder, roles: &str) -> axum::http::request::Builder {
    builder
        .header("x-cda-user", "q0hecadm")
        .header("x-cda-roles", roles)
}

pub fn json_request(method: Method, uri: &str, roles: &str, body: Value) -> Request<Body> {
    as_user(request(method, uri), roles)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    }
}
