//! Integration tests for resource dispatch
//!
//! These tests drive the assembled router end to end:
//! - Route bindings and the not-implemented stand-in
//! - Role checks before resource code runs
//! - Default caching of reads
//! - Error responses and incident identifiers
//! - Connection leases released on every path

mod common;

use axum::{
    body::Body,
    http::{header, Method, StatusCode},
};
use serde_json::json;

use cda_server::{
    config::Config,
    dispatch::{AccessPolicy, CacheRule, Engine, OfficeResolver, ResourceHandler, ResourceRegistry},
};
use tower::ServiceExt;
use cda_common::ConfigurationError;
use common::{as_user, json_body, json_request, request, MemorySource, TestApp, WRITER};

const COLLECTION: &str = "/cwms-data/location/category/";

#[tokio::test]
async fn test_unknown_category_is_not_found() {
    let app = TestApp::start();

    let (status, body) = app.get("/cwms-data/location/category/ABC").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"message": "Not Found."}));
}

#[tokio::test]
async fn test_create_without_role_is_forbidden() {
    let app = TestApp::start();

    let response = app
        .send(
            request(Method::POST, COLLECTION)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"id":"Reservoir"}"#))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await, json!({"message": "Not Authorized"}));
    assert_eq!(app.creates(), 0);
    assert!(app.store.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_with_wrong_role_is_forbidden() {
    let app = TestApp::start();

    let response = app
        .send(json_request(Method::POST, COLLECTION, "viewer", json!({"id": "Reservoir"})))
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.creates(), 0);
}

#[tokio::test]
async fn test_create_then_fetch() {
    let app = TestApp::start();

    let response = app
        .send(json_request(
            Method::POST,
            COLLECTION,
            WRITER,
            json!({"id": "Reservoir", "description": "Reservoir projects"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(!response.headers().contains_key(header::CACHE_CONTROL));

    let response = app
        .send(
            request(Method::GET, "/cwms-data/location/category/Reservoir")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CACHE_CONTROL], "max-age=300");
    assert_eq!(
        json_body(response).await,
        json!({"office-id": "HQ", "id": "Reservoir", "description": "Reservoir projects"})
    );
}

#[tokio::test]
async fn test_collection_answers_with_and_without_trailing_separator() {
    let app = TestApp::start();
    app.seed("Reservoir", &[]);
    app.seed("Stream", &[]);

    for uri in ["/cwms-data/location/category/", "/cwms-data/location/category"] {
        let (status, body) = app.get(uri).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
        assert_eq!(body, json!(["Reservoir", "Stream"]), "{}", uri);
    }

    let (_, body) = app.get("/cwms-data/location/category?like=Str").await;
    assert_eq!(body, json!(["Stream"]));
}

#[tokio::test]
async fn test_handler_cache_control_is_kept() {
    let app = TestApp::start();

    let response = app
        .send(
            request(Method::GET, "/cwms-data/location/category/live")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let values: Vec<_> = response.headers().get_all(header::CACHE_CONTROL).iter().collect();
    assert_eq!(values, vec!["no-store"]);
}

#[tokio::test]
async fn test_unimplemented_update_is_501() {
    let app = TestApp::start();
    app.seed("Reservoir", &[]);

    let response = app
        .send(json_request(
            Method::PATCH,
            "/cwms-data/location/category/Reservoir",
            WRITER,
            json!({"description": "changed"}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    assert_eq!(app.source.open(), 0);
}

#[tokio::test]
async fn test_access_is_checked_before_not_implemented() {
    let app = TestApp::start();

    let response = app
        .send(
            request(Method::PATCH, "/cwms-data/location/category/Reservoir")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_put_is_not_bound() {
    let app = TestApp::start();

    let response = app
        .send(json_request(
            Method::PUT,
            "/cwms-data/location/category/Reservoir",
            WRITER,
            json!({}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_delete_blocked_by_members() {
    let app = TestApp::start();
    app.seed("Reservoir", &["SPK-Folsom", "SPK-Oroville"]);

    let response = app
        .send(
            as_user(request(Method::DELETE, "/cwms-data/location/category/Reservoir"), WRITER)
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json_body(response).await;
    assert_eq!(body["details"]["locations"], json!(["SPK-Folsom", "SPK-Oroville"]));
    assert!(app.store.lock().unwrap().contains_key("Reservoir"));
}

#[tokio::test]
async fn test_delete_and_duplicate_create() {
    let app = TestApp::start();
    app.seed("Stream", &[]);

    let response = app
        .send(json_request(Method::POST, COLLECTION, WRITER, json!({"id": "Stream"})))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .send(
            as_user(request(Method::DELETE, "/cwms-data/location/category/Stream"), WRITER)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(app.store.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = TestApp::start();

    let response = app
        .send(
            as_user(request(Method::POST, COLLECTION), WRITER)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"id": "#))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["details"]["line"], 1);
}

#[tokio::test]
async fn test_unsupported_accept_is_406() {
    let app = TestApp::start();

    let response = app
        .send(
            request(Method::GET, COLLECTION)
                .header(header::ACCEPT, "application/xml")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
    assert_eq!(app.source.acquired(), 0);
}

#[tokio::test]
async fn test_unclassified_failure_returns_incident() {
    let app = TestApp::start();

    let (status, body) = app.get("/cwms-data/location/category/BOOM").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let incident = body["incidentIdentifier"].as_str().unwrap();
    assert!(uuid::Uuid::parse_str(incident).is_ok());
    assert!(!body.to_string().contains("ORA-06502"));
    assert_eq!(app.source.open(), 0);
}

#[tokio::test]
async fn test_every_request_releases_its_lease() {
    let app = TestApp::start();
    app.seed("Reservoir", &["SPK-Folsom"]);

    app.get("/cwms-data/location/category/Reservoir").await;
    app.get("/cwms-data/location/category/missing").await;
    app.get("/cwms-data/location/category/BOOM").await;
    app.send(
        as_user(request(Method::DELETE, "/cwms-data/location/category/Reservoir"), WRITER)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    app.send(
        request(Method::POST, COLLECTION)
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(app.source.acquired(), 5);
    assert_eq!(app.source.open(), 0);
}

#[tokio::test]
async fn test_unavailable_source_is_500() {
    let mut config = Config::default();
    config.access.trust_identity_headers = true;
    let app = TestApp::with_config(config, MemorySource::unavailable());

    let (status, body) = app.get("/cwms-data/location/category/ABC").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.get("incidentIdentifier").is_some());
}

#[tokio::test]
async fn test_office_from_context_path() {
    let mut config = Config::default();
    config.server.context_path = "/spk-data".to_string();
    let app = TestApp::with_config(config, MemorySource::default());

    let (status, body) = app.get("/spk-data/office/echo/Folsom").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"office": "SPK", "name": "Folsom"}));
}

#[tokio::test]
async fn test_office_override_wins() {
    let mut config = Config::default();
    config.server.context_path = "/spk-data".to_string();
    config.office = Some("swt".to_string());
    let app = TestApp::with_config(config, MemorySource::default());

    let (_, body) = app.get("/spk-data/office/echo/Keystone").await;

    assert_eq!(body["office"], "SWT");
}

#[tokio::test]
async fn test_reserved_context_path_is_hq() {
    let app = TestApp::start();

    let (_, body) = app.get("/cwms-data/office/echo/anything").await;

    assert_eq!(body["office"], "HQ");
}

#[tokio::test]
async fn test_root_context_path() {
    let mut config = Config::default();
    config.server.context_path = "/".to_string();
    let app = TestApp::with_config(config, MemorySource::default());

    let (status, body) = app.get("/office/echo/anything").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["office"], "HQ");
}

#[tokio::test]
async fn test_restricted_reads() {
    let mut config = Config::default();
    config.access.trust_identity_headers = true;
    config.access.restrict_reads = true;
    let app = TestApp::with_config(config, MemorySource::default());

    let (status, _) = app.get(COLLECTION).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let response = app
        .send(as_user(request(Method::GET, COLLECTION), WRITER).body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_identity_headers_ignored_unless_trusted() {
    let app = TestApp::with_config(Config::default(), MemorySource::default());

    let response = app
        .send(json_request(Method::POST, COLLECTION, WRITER, json!({"id": "Reservoir"})))
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_undecodable_identity_is_401() {
    let app = TestApp::start();

    let response = app
        .send(
            request(Method::GET, COLLECTION)
                .header("x-cda-user", "")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await, json!({"message": "Unauthorized"}));
    assert_eq!(app.source.acquired(), 0);
}

/// Preflights are answered by the CORS layer, so the registry router is
/// driven directly here
#[tokio::test]
async fn test_options_lists_bound_methods() {
    let mut registry = ResourceRegistry::new();
    registry
        .register(
            common::CATEGORIES,
            common::categories(Default::default(), Default::default()),
            AccessPolicy::new([WRITER]),
        )
        .unwrap();
    let engine = Engine::new(MemorySource::default(), OfficeResolver::derived(), "/cwms-data".to_string());
    let router = registry.into_router(engine, CacheRule::default());

    let response = router
        .clone()
        .oneshot(
            request(Method::OPTIONS, "/location/category/Reservoir")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(response.headers()[header::ALLOW], "GET, PATCH, DELETE, OPTIONS");

    let response = router
        .oneshot(request(Method::OPTIONS, "/location/category/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.headers()[header::ALLOW], "GET, POST, OPTIONS");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = TestApp::start();

    let (status, body) = app.get("/cwms-data/timeseries").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"message": "Not Found."}));
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::start();
    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "healthy"}));

    let app = TestApp::with_config(Config::default(), MemorySource::unavailable());
    let (status, _) = app.get("/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[test]
fn test_bad_template_aborts_registration() {
    let mut registry = ResourceRegistry::<MemorySource>::new();
    registry
        .register("/location/category/{category-id}", ResourceHandler::new(), AccessPolicy::new([WRITER]))
        .unwrap();

    let err = registry
        .register("/location/{office}/{id}", ResourceHandler::new(), AccessPolicy::new([WRITER]))
        .unwrap_err();

    assert!(matches!(err, ConfigurationError::BaseSegmentParameterized { .. }));
    assert_eq!(registry.bindings().len(), 5);
}

#[tokio::test]
async fn test_router_syntax_in_base_segment_never_routes() {
    let mut registry = ResourceRegistry::new();
    let err = registry
        .register("/:office/{id}", common::echo(), AccessPolicy::new([WRITER]))
        .unwrap_err();
    assert!(matches!(err, ConfigurationError::BaseSegmentParameterized { .. }));

    let engine = Engine::new(MemorySource::default(), OfficeResolver::derived(), "/cwms-data");
    let response = registry
        .into_router(engine, CacheRule::default())
        .oneshot(request(Method::GET, "/timeseries/ABC").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_head_carries_default_cache() {
    let app = TestApp::start();
    app.seed("Reservoir", &[]);

    let response = app
        .send(
            request(Method::HEAD, "/cwms-data/location/category/Reservoir")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CACHE_CONTROL], "max-age=300");
}
