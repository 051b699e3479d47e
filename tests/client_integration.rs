use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use resilient_api_client::{ApiClient, BatchRequest, ClientOptions, FilePart};
use serde_json::{json, Value as JsonValue};

#[derive(Clone)]
struct MockResponse {
    status: StatusCode,
    body: JsonValue,
    headers: Vec<(&'static str, String)>,
    delay: Duration,
}

impl MockResponse {
    fn json(status: StatusCode, body: JsonValue) -> Self {
        Self {
            status,
            body,
            headers: Vec::new(),
            delay: Duration::from_millis(0),
        }
    }

    fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Clone, Debug)]
struct SeenRequest {
    method: Method,
    path: String,
    query: Option<String>,
    authorization: Option<String>,
    content_type: Option<String>,
    body: String,
}

#[derive(Clone, Default)]
struct MockState {
    responses: Arc<Mutex<HashMap<String, VecDeque<MockResponse>>>>,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

async fn any_handler(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let header_text = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    };
    state
        .seen
        .lock()
        .expect("seen mutex must not be poisoned")
        .push(SeenRequest {
            method,
            path: uri.path().to_owned(),
            query: uri.query().map(str::to_owned),
            authorization: header_text("authorization"),
            content_type: header_text("content-type"),
            body,
        });

    let response = {
        let mut routes = state
            .responses
            .lock()
            .expect("response queue mutex must not be poisoned");
        routes
            .get_mut(uri.path())
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| {
                MockResponse::json(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"message": "no mock response available"}),
                )
            })
    };

    if !response.delay.is_zero() {
        tokio::time::sleep(response.delay).await;
    }

    let mut reply = (response.status, Json(response.body)).into_response();
    for (name, value) in response.headers {
        if let Ok(value) = HeaderValue::from_str(&value) {
            reply
                .headers_mut()
                .insert(HeaderName::from_static(name), value);
        }
    }
    reply
}

struct TestServer {
    base_url: String,
    state: MockState,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl TestServer {
    fn client(&self) -> ApiClient {
        ApiClient::new(format!("{}/api/v1", self.base_url)).with_options(fast_options())
    }

    fn seen(&self) -> Vec<SeenRequest> {
        self.state
            .seen
            .lock()
            .expect("seen mutex must not be poisoned")
            .clone()
    }

    fn hits(&self, path: &str) -> usize {
        self.seen().iter().filter(|seen| seen.path == path).count()
    }
}

fn fast_options() -> ClientOptions {
    ClientOptions {
        timeout_ms: 1_000,
        max_retries: 3,
        retry_backoff_ms: 1,
        rate_limit_warning_threshold: 10,
    }
}

async fn spawn_server(routes: Vec<(&str, Vec<MockResponse>)>) -> TestServer {
    let state = MockState::default();
    {
        let mut responses = state
            .responses
            .lock()
            .expect("response queue mutex must not be poisoned");
        for (path, queue) in routes {
            responses.insert(path.to_owned(), queue.into());
        }
    }

    let app = Router::new()
        .fallback(any_handler)
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("must bind test listener");
    let address = listener.local_addr().expect("must have local addr");
    let task = tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("mock server must run");
    });

    TestServer {
        base_url: format!("http://{address}"),
        state,
        task,
    }
}

#[tokio::test]
async fn get_sends_query_and_bearer_token() {
    let server = spawn_server(vec![(
        "/api/v1/metrics/traffic",
        vec![MockResponse::json(StatusCode::OK, json!({"visits": 1200}))
            .with_header("x-ratelimit-remaining", "2")],
    )])
    .await;
    let client = server.client();
    client.set_auth_token("tok-123");

    let result = client
        .get("/metrics/traffic", &[("period", "7d")])
        .await
        .expect("request must build");

    assert!(result.success);
    assert_eq!(result.status, 200);
    assert_eq!(result.data, Some(json!({"visits": 1200})));
    assert_eq!(
        result.rate_limit_warning.map(|warning| warning.remaining),
        Some(2)
    );

    let seen = server.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].method, Method::GET);
    assert_eq!(seen[0].query.as_deref(), Some("period=7d"));
    assert_eq!(seen[0].authorization.as_deref(), Some("Bearer tok-123"));
}

#[tokio::test]
async fn client_error_is_not_retried_and_keeps_body_message() {
    let server = spawn_server(vec![(
        "/api/v1/content/",
        vec![MockResponse::json(
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({"message": "title is required"}),
        )],
    )])
    .await;

    let result = server
        .client()
        .post("/content/", &json!({}))
        .await
        .expect("request must build");

    assert!(!result.success);
    assert_eq!(result.status, 422);
    assert_eq!(result.error.as_deref(), Some("title is required"));
    assert_eq!(server.hits("/api/v1/content/"), 1);

    let seen = server.seen();
    assert_eq!(seen[0].content_type.as_deref(), Some("application/json"));
    assert_eq!(seen[0].authorization, None);
}

#[tokio::test]
async fn retries_on_server_error_then_succeeds() {
    let server = spawn_server(vec![(
        "/api/v1/reports",
        vec![
            MockResponse::json(StatusCode::SERVICE_UNAVAILABLE, json!({"message": "busy"})),
            MockResponse::json(StatusCode::OK, json!({"rows": 3})),
        ],
    )])
    .await;

    let result = server
        .client()
        .get("/reports", &[])
        .await
        .expect("request must build");

    assert!(result.success);
    assert_eq!(result.attempts, 2);
    assert_eq!(result.data, Some(json!({"rows": 3})));
    assert_eq!(server.hits("/api/v1/reports"), 2);
}

#[tokio::test]
async fn request_timeout_is_reported_as_network_failure() {
    let slow = MockResponse::json(StatusCode::OK, json!({})).with_delay(Duration::from_millis(300));
    let server = spawn_server(vec![("/api/v1/slow", vec![slow.clone(), slow])]).await;

    let result = server
        .client()
        .with_options(ClientOptions {
            timeout_ms: 20,
            max_retries: 1,
            retry_backoff_ms: 1,
            rate_limit_warning_threshold: 10,
        })
        .get("/slow", &[])
        .await
        .expect("request must build");

    assert!(!result.success);
    assert_eq!(result.status, 0);
    assert_eq!(result.error.as_deref(), Some("Request timeout"));
    assert_eq!(result.attempts, 2);
}

#[tokio::test]
async fn upload_file_sends_multipart_form() {
    let server = spawn_server(vec![(
        "/api/v1/uploads",
        vec![MockResponse::json(StatusCode::CREATED, json!({"id": "up-1"}))],
    )])
    .await;

    let file = FilePart::new("report.csv", b"a,b\n1,2\n".to_vec()).with_mime_type("text/csv");
    let result = server
        .client()
        .upload_file("/uploads", file, [("folder", "q3")])
        .await
        .expect("request must build");

    assert!(result.success);
    assert_eq!(result.status, 201);

    let seen = server.seen();
    let content_type = seen[0].content_type.clone().unwrap_or_default();
    assert!(content_type.starts_with("multipart/form-data"));
    assert!(seen[0].body.contains("filename=\"report.csv\""));
    assert!(seen[0].body.contains("a,b"));
    assert!(seen[0].body.contains("name=\"folder\""));
}

#[tokio::test]
async fn batch_isolates_failing_entries() {
    let server = spawn_server(vec![(
        "/api/v1/ok",
        vec![MockResponse::json(StatusCode::OK, json!({"ok": true}))],
    )])
    .await;

    let results = server
        .client()
        .batch([
            BatchRequest::get("/ok"),
            BatchRequest::post("/down", json!({"n": 1})),
        ])
        .await;

    let ok = results[0].as_ref().expect("entry must build");
    let down = results[1].as_ref().expect("entry must build");
    assert!(ok.success);
    assert!(!down.success);
    assert_eq!(down.status, 500);
    assert_eq!(down.error.as_deref(), Some("no mock response available"));
    assert_eq!(server.hits("/api/v1/down"), 4);
}
