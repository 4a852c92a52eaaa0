use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use usersvc::config::{API_READY_TEXT, ROOT_READY_TEXT};
use usersvc::service::{MemoryRequestLogger, RequestLogger, SilentRequestLogger};
use usersvc::{Dataset, Service};

const SCENARIO: &str = r#"{"users":[{"id":1,"name":"Alice"},{"id":2,"name":"Bob"}]}"#;

fn router_with(logger: Arc<dyn RequestLogger>) -> Router {
    let dataset = Dataset::from_json_str(SCENARIO).expect("scenario dataset");
    Service::new(dataset, logger).router()
}

fn router() -> Router {
    router_with(Arc::new(SilentRequestLogger))
}

struct Reply {
    status: StatusCode,
    content_type: Option<String>,
    body: String,
}

impl Reply {
    fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("response body is JSON")
    }
}

async fn send(router: &Router, method: Method, uri: &str) -> Reply {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("valid request");
    let response = router.clone().oneshot(request).await.expect("infallible");
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    Reply {
        status,
        content_type,
        body: String::from_utf8(bytes.to_vec()).expect("utf-8 body"),
    }
}

async fn get(router: &Router, uri: &str) -> Reply {
    send(router, Method::GET, uri).await
}

#[tokio::test]
async fn health_routes_return_fixed_text_every_time() {
    let router = router();
    for _ in 0..3 {
        let root = get(&router, "/").await;
        assert_eq!(root.status, StatusCode::OK);
        assert_eq!(root.body, ROOT_READY_TEXT);
        assert!(root.content_type.unwrap_or_default().starts_with("text/plain"));

        let api = get(&router, "/api/").await;
        assert_eq!(api.status, StatusCode::OK);
        assert_eq!(api.body, API_READY_TEXT);
    }
}

#[tokio::test]
async fn list_returns_whole_dataset_in_load_order() {
    let router = router();
    let expected = json!([{"id": 1, "name": "Alice"}, {"id": 2, "name": "Bob"}]);
    for _ in 0..2 {
        let reply = get(&router, "/api/users").await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.content_type.as_deref(), Some("application/json"));
        assert_eq!(reply.json(), expected);
    }
}

#[tokio::test]
async fn lookup_returns_exactly_the_matching_record() {
    let router = router();
    let alice = get(&router, "/api/users/1").await;
    assert_eq!(alice.status, StatusCode::OK);
    assert_eq!(alice.json(), json!({"id": 1, "name": "Alice"}));

    let bob = get(&router, "/api/users/2").await;
    assert_eq!(bob.json(), json!({"id": 2, "name": "Bob"}));
}

#[tokio::test]
async fn lookup_miss_is_not_found() {
    let router = router();
    for raw in ["99", "0", "-1", "abc", "1.5", "%FF", "%E2%82"] {
        let reply = get(&router, &format!("/api/users/{raw}")).await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND, "id {raw}");
        assert_eq!(reply.json(), json!({"error": format!("user {raw} not found")}));
    }
}

#[tokio::test]
async fn unknown_paths_and_methods_are_rejected() {
    let router = router();
    assert_eq!(get(&router, "/api/accounts").await.status, StatusCode::NOT_FOUND);
    assert_eq!(
        send(&router, Method::POST, "/api/users").await.status,
        StatusCode::METHOD_NOT_ALLOWED
    );
    assert_eq!(
        send(&router, Method::DELETE, "/api/users/1").await.status,
        StatusCode::METHOD_NOT_ALLOWED
    );
}

#[tokio::test]
async fn every_request_is_logged_once_after_completion() {
    let logger = Arc::new(MemoryRequestLogger::new());
    let router = router_with(logger.clone());

    get(&router, "/").await;
    get(&router, "/api/users/1?verbose=1").await;
    get(&router, "/api/users/42").await;

    let records = logger.records();
    let lines: Vec<(String, String, u16)> = records
        .iter()
        .map(|r| (r.method.clone(), r.url.clone(), r.status))
        .collect();
    assert_eq!(
        lines,
        vec![
            ("GET".to_string(), "/".to_string(), 200),
            ("GET".to_string(), "/api/users/1?verbose=1".to_string(), 200),
            ("GET".to_string(), "/api/users/42".to_string(), 404),
        ]
    );
    assert!(records[0].log_line().starts_with("GET / - "));
    assert!(records[0].log_line().ends_with("ms"));
}

#[tokio::test]
async fn bundled_dataset_is_served() {
    let service = Service::new(
        Dataset::bundled().expect("bundled dataset"),
        Arc::new(SilentRequestLogger),
    );
    let expected = service.dataset().len();
    let reply = get(&service.router(), "/api/users").await;
    assert_eq!(reply.json().as_array().map(Vec::len), Some(expected));
}
