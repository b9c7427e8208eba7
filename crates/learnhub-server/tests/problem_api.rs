//! End-to-end tests over the HTTP surface: problem+json formatting, request
//! correlation headers, role checks, and the CRUD-with-invalidation flow.

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use tracing_subscriber::fmt::MakeWriter;

use learnhub_server::cache::CacheStore;
use learnhub_server::config::AppConfig;
use learnhub_server::server::{AppState, build_app};
use learnhub_storage::MemoryRepository;

fn test_app() -> Router {
    let repo = Arc::new(MemoryRepository::new());
    let state = AppState::new(
        repo.clone(),
        repo,
        CacheStore::memory(true),
        &AppConfig::default(),
    );
    build_app(state)
}

async fn json_body(res: Response<Body>) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(path: &str) -> Request<Body> {
    Request::builder().uri(path).body(Body::empty()).unwrap()
}

fn authed(
    method: &str,
    path: &str,
    user_id: i64,
    role: &str,
    body: Option<Value>,
) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(path)
        .header("x-user-id", user_id.to_string())
        .header("x-user-role", role)
        .header(header::CONTENT_TYPE, "application/json");
    match body {
        Some(v) => builder.body(Body::from(v.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Collects JSON log records emitted while a test-scoped subscriber is
/// installed.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn records(&self) -> Vec<Value> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn capture_subscriber(
    logs: &CapturedLogs,
    max_level: tracing::Level,
) -> impl tracing::Subscriber + Send + Sync {
    tracing_subscriber::fmt()
        .json()
        .with_writer(logs.clone())
        .with_max_level(max_level)
        .finish()
}

fn course_payload(title: &str, published: bool) -> Value {
    json!({
        "title": title,
        "description": "intro",
        "price_cents": 4900,
        "is_published": published,
    })
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = test_app();

    let res = app.clone().oneshot(get("/healthz")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app.oneshot(get("/readyz")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["store"]["mode"], "memory");
    assert_eq!(body["store"]["cache_enabled"], true);
}

#[tokio::test]
async fn test_not_found_returns_problem_details() {
    let app = test_app();
    let res = app.oneshot(get("/courses/999")).await.unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        res.headers()[header::CONTENT_TYPE],
        "application/problem+json"
    );
    let header_id = res.headers()["x-request-id"].to_str().unwrap().to_string();
    assert!(res.headers().contains_key("x-response-time-ms"));

    let body = json_body(res).await;
    assert_eq!(body["status"], 404);
    assert_eq!(body["title"], "Not Found");
    assert_eq!(body["instance"], "/courses/999");
    assert!(body["type"].as_str().is_some());
    assert!(body["timestamp"].as_str().is_some());
    // The body's request_id and the response header carry the same id
    assert_eq!(body["request_id"], header_id.as_str());
}

#[tokio::test]
async fn test_inbound_request_id_is_honored() {
    let app = test_app();
    let req = Request::builder()
        .uri("/courses/999")
        .header("x-request-id", "gw-abc-123")
        .body(Body::empty())
        .unwrap();
    let res = app.oneshot(req).await.unwrap();

    assert_eq!(res.headers()["x-request-id"], "gw-abc-123");
    let body = json_body(res).await;
    assert_eq!(body["request_id"], "gw-abc-123");
}

#[tokio::test]
async fn test_fault_log_record_carries_problem_request_id() {
    let logs = CapturedLogs::default();
    let _guard = tracing::subscriber::set_default(capture_subscriber(&logs, tracing::Level::WARN));

    let app = test_app();
    let res = app.oneshot(get("/courses/999")).await.unwrap();
    let body = json_body(res).await;
    let request_id = body["request_id"].as_str().unwrap().to_string();
    assert!(!request_id.is_empty());

    // The warn record for the fault carries the same correlation id as the
    // problem body
    let matched = logs.records().iter().any(|rec| {
        rec["level"] == "WARN"
            && rec["fields"]["fault_kind"] == "not_found"
            && rec["fields"]["request_id"] == request_id.as_str()
    });
    assert!(
        matched,
        "no warn record with request_id {request_id}: {:?}",
        logs.records()
    );
}

#[tokio::test]
async fn test_access_log_record_shape() {
    let logs = CapturedLogs::default();
    let _guard = tracing::subscriber::set_default(capture_subscriber(&logs, tracing::Level::INFO));

    let app = test_app();
    let res = app
        .oneshot(authed("GET", "/courses", 42, "student", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let request_id = res.headers()["x-request-id"].to_str().unwrap().to_string();

    let access: Vec<Value> = logs
        .records()
        .into_iter()
        .filter(|rec| rec["target"] == "learnhub::access")
        .collect();
    assert_eq!(access.len(), 1);

    let fields = &access[0]["fields"];
    assert_eq!(fields["method"], "GET");
    assert_eq!(fields["path"], "/courses");
    assert_eq!(fields["status"], "200");
    // Bare id, not an Option debug rendering
    assert_eq!(fields["user_id"], "42");
    assert_eq!(fields["request_id"], request_id.as_str());
}

#[tokio::test]
async fn test_anonymous_access_log_user_id_is_dash() {
    let logs = CapturedLogs::default();
    let _guard = tracing::subscriber::set_default(capture_subscriber(&logs, tracing::Level::INFO));

    let app = test_app();
    app.oneshot(get("/healthz")).await.unwrap();

    let records = logs.records();
    let access = records
        .iter()
        .find(|rec| rec["target"] == "learnhub::access")
        .expect("access record");
    assert_eq!(access["fields"]["user_id"], "-");
}

#[tokio::test]
async fn test_cors_preflight_carries_request_id() {
    let app = test_app();
    let req = Request::builder()
        .method("OPTIONS")
        .uri("/courses")
        .header("origin", "https://learnhub.example")
        .header("access-control-request-method", "POST")
        .body(Body::empty())
        .unwrap();
    let res = app.oneshot(req).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    // The correlation layer is outermost, so even CORS preflight responses
    // carry the correlation headers
    assert!(res.headers().contains_key("x-request-id"));
    assert!(res.headers().contains_key("x-response-time-ms"));
}

#[tokio::test]
async fn test_student_cannot_create_course() {
    let app = test_app();
    let req = authed(
        "POST",
        "/courses",
        3,
        "student",
        Some(course_payload("Rust 101", true)),
    );
    let res = app.oneshot(req).await.unwrap();

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body = json_body(res).await;
    assert_eq!(body["status"], 403);
    assert_eq!(body["title"], "Forbidden");
}

#[tokio::test]
async fn test_invalid_course_returns_field_errors() {
    let app = test_app();
    let req = authed(
        "POST",
        "/courses",
        1,
        "instructor",
        Some(json!({"title": "  ", "price_cents": -5})),
    );
    let res = app.oneshot(req).await.unwrap();

    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(res).await;
    assert_eq!(body["status"], 422);
    assert!(body["detail"]["errors"]["title"].as_str().is_some());
    assert!(body["detail"]["errors"]["price_cents"].as_str().is_some());
}

#[tokio::test]
async fn test_malformed_json_is_a_validation_problem() {
    let app = test_app();
    let req = Request::builder()
        .method("POST")
        .uri("/courses")
        .header("x-user-id", "1")
        .header("x-user-role", "instructor")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let res = app.oneshot(req).await.unwrap();

    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        res.headers()[header::CONTENT_TYPE],
        "application/problem+json"
    );
}

#[tokio::test]
async fn test_course_crud_with_invalidation() {
    let app = test_app();

    // Create
    let res = app
        .clone()
        .oneshot(authed(
            "POST",
            "/courses",
            1,
            "instructor",
            Some(course_payload("Rust 101", true)),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created = json_body(res).await;
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["owner_id"], 1);

    // Anonymous read lands in the cache
    let res = app
        .clone()
        .oneshot(get(&format!("/courses/{id}")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await["title"], "Rust 101");

    // Owner updates; invalidation means the next read sees the new title
    let res = app
        .clone()
        .oneshot(authed(
            "PUT",
            &format!("/courses/{id}"),
            1,
            "instructor",
            Some(course_payload("Rust 102", true)),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(get(&format!("/courses/{id}")))
        .await
        .unwrap();
    assert_eq!(json_body(res).await["title"], "Rust 102");

    // A different instructor cannot touch it
    let res = app
        .clone()
        .oneshot(authed(
            "PUT",
            &format!("/courses/{id}"),
            2,
            "instructor",
            Some(course_payload("Hijacked", true)),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Owner deletes; the course is gone on the next read
    let res = app
        .clone()
        .oneshot(authed(
            "DELETE",
            &format!("/courses/{id}"),
            1,
            "instructor",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = app.oneshot(get(&format!("/courses/{id}"))).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unpublished_course_hidden_from_non_staff() {
    let app = test_app();

    let res = app
        .clone()
        .oneshot(authed(
            "POST",
            "/courses",
            1,
            "instructor",
            Some(course_payload("Draft", false)),
        ))
        .await
        .unwrap();
    let id = json_body(res).await["id"].as_i64().unwrap();

    // Anonymous and student readers see a 404, not a 403
    let res = app
        .clone()
        .oneshot(get(&format!("/courses/{id}")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app
        .clone()
        .oneshot(authed("GET", &format!("/courses/{id}"), 3, "student", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Staff sees it
    let res = app
        .oneshot(authed("GET", &format!("/courses/{id}"), 2, "admin", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_anonymous_listing_shows_only_published() {
    let app = test_app();

    for (title, published) in [("Public", true), ("Draft", false)] {
        let res = app
            .clone()
            .oneshot(authed(
                "POST",
                "/courses",
                1,
                "instructor",
                Some(course_payload(title, published)),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let res = app.clone().oneshot(get("/courses")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let listed = json_body(res).await;
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["title"], "Public");

    // Staff listing includes drafts
    let res = app
        .oneshot(authed("GET", "/courses", 1, "instructor", None))
        .await
        .unwrap();
    let listed = json_body(res).await;
    assert_eq!(listed.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_enrollment_flow() {
    let app = test_app();

    let res = app
        .clone()
        .oneshot(authed(
            "POST",
            "/courses",
            1,
            "instructor",
            Some(course_payload("Rust 101", true)),
        ))
        .await
        .unwrap();
    let course_id = json_body(res).await["id"].as_i64().unwrap();

    // Student enrolls
    let res = app
        .clone()
        .oneshot(authed(
            "POST",
            "/enrollments",
            3,
            "student",
            Some(json!({"course_id": course_id})),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let enrollment = json_body(res).await;
    assert_eq!(enrollment["course_id"], course_id);
    assert_eq!(enrollment["student_id"], 3);

    // Enrolling twice in the same course is rejected
    let res = app
        .clone()
        .oneshot(authed(
            "POST",
            "/enrollments",
            3,
            "student",
            Some(json!({"course_id": course_id})),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Staff cannot enroll
    let res = app
        .clone()
        .oneshot(authed(
            "POST",
            "/enrollments",
            1,
            "instructor",
            Some(json!({"course_id": course_id})),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // The student sees their own enrollment
    let res = app
        .clone()
        .oneshot(authed("GET", "/enrollments", 3, "student", None))
        .await
        .unwrap();
    let listed = json_body(res).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    // Another student cannot unenroll them
    let enrollment_id = enrollment["id"].as_i64().unwrap();
    let res = app
        .clone()
        .oneshot(authed(
            "DELETE",
            &format!("/enrollments/{enrollment_id}"),
            4,
            "student",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // They can unenroll themselves
    let res = app
        .oneshot(authed(
            "DELETE",
            &format!("/enrollments/{enrollment_id}"),
            3,
            "student",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_enrollment_in_unknown_course_is_not_found() {
    let app = test_app();
    let res = app
        .oneshot(authed(
            "POST",
            "/enrollments",
            3,
            "student",
            Some(json!({"course_id": 999})),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
