use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::Duration;
use serde_json::{json, Value};
use tower::ServiceExt;

mod common;

use common::{TestDb, DOMAIN_ID, DOMAIN_SLUG, SUBJECT_SLUG, UNIT_ID, UNIT_SLUG};

const TOKEN: &str = "session-token-abc";
const ADMIN_TOKEN: &str = "pipeline-secret";

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, format!("auth_token={TOKEN}"))
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::COOKIE, format!("auth_token={TOKEN}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Multi-user app with one valid session for `learner-7`.
async fn multi_user_app(db: &TestDb) -> Router {
    db.seed_session(TOKEN, "learner-7", Duration::hours(1)).await;
    let mut config = db.config();
    config.single_user = false;
    config.admin_token = Some(ADMIN_TOKEN.to_string());
    db.app(config)
}

#[tokio::test]
async fn test_health_endpoints() {
    let db = TestDb::new().await;
    let app = db.app(db.config());

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "connected");

    let (status, body) = send(&app, get("/health/live")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, get("/health/info")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["databaseMode"], "sqlite");

    let (status, body) = send(&app, get("/api/health/ready")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_404_not_found() {
    let db = TestDb::new().await;
    let app = db.app(db.config());

    let (status, body) = send(&app, get("/nonexistent/path")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_unauthorized_without_session() {
    let db = TestDb::new().await;
    db.seed_world().await;
    let app = multi_user_app(&db).await;

    let request = Request::builder()
        .uri(format!("/api/play/problem?archetypeSlug={UNIT_SLUG}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let expired = Request::builder()
        .uri(format!("/api/worlds/{SUBJECT_SLUG}/{DOMAIN_SLUG}"))
        .header(header::AUTHORIZATION, "Bearer stale-token")
        .body(Body::empty())
        .unwrap();
    db.seed_session("stale-token", "learner-7", Duration::hours(-1))
        .await;
    let (status, _) = send(&app, expired).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_calibration_flow_over_http() {
    let db = TestDb::new().await;
    db.seed_world().await;
    db.seed_item("p-200", Some(UNIT_ID), 200, "B").await;
    let app = multi_user_app(&db).await;

    let (status, body) = send(&app, get(&format!("/api/worlds/{SUBJECT_SLUG}/{DOMAIN_SLUG}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isEnrolled"], false);
    assert!(body["data"].get("rating").is_none());

    let (status, body) = send(
        &app,
        post_json("/api/worlds/enroll", json!({ "domainId": DOMAIN_ID })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["createdCount"], 1);

    let (status, body) = send(
        &app,
        get(&format!("/api/play/problem?archetypeSlug={UNIT_SLUG}")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let problem = &body["data"];
    assert_eq!(problem["id"], "p-200");
    assert_eq!(problem["type"], "MCQ");
    assert_eq!(problem["userRating"], 200);
    assert_eq!(problem["subjectOrder"], 1);
    assert_eq!(problem["choices"].as_array().map(Vec::len), Some(3));
    assert!(problem.get("correctChoice").is_none());

    let submission = json!({ "problemId": "p-200", "chosenId": "B", "timeMs": 4200 });
    let (status, body) = send(&app, post_json("/api/play/submit", submission.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["correct"], true);
    assert_eq!(body["data"]["delta"], 16);
    assert_eq!(body["data"]["newRating"], 216);

    let (status, body) = send(&app, post_json("/api/play/submit", submission)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_SUBMITTED");

    let (status, body) = send(
        &app,
        get(&format!("/api/play/problem?archetypeSlug={UNIT_SLUG}")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NO_PROBLEMS");

    let (status, body) = send(
        &app,
        get(&format!("/api/standings/{UNIT_SLUG}/history?limit=10")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let events = body["data"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["before"], 200);
    assert_eq!(events[0]["after"], 216);
    assert_eq!(events[0]["reason"], "CALIBRATION_ATTEMPT");

    let (status, body) = send(&app, get(&format!("/api/worlds/{SUBJECT_SLUG}/{DOMAIN_SLUG}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isEnrolled"], true);
    assert_eq!(body["data"]["rating"], 216);
}

#[tokio::test]
async fn test_submit_without_enrollment_is_forbidden() {
    let db = TestDb::new().await;
    db.seed_world().await;
    db.seed_item("p1", Some(UNIT_ID), 200, "A").await;
    let app = multi_user_app(&db).await;

    let (status, body) = send(
        &app,
        post_json("/api/play/submit", json!({ "problemId": "p1", "chosenId": "A" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
    assert_eq!(db.count("attempts").await, 0);
}

#[tokio::test]
async fn test_bad_requests_are_rejected() {
    let db = TestDb::new().await;
    db.seed_world().await;
    let app = multi_user_app(&db).await;

    let (status, body) = send(&app, get("/api/play/problem")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");

    let (status, _) = send(
        &app,
        post_json("/api/play/submit", json!({ "problemId": "p1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, get("/api/play/problem?archetypeSlug=unknown")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_single_user_mode_needs_no_session() {
    let db = TestDb::new().await;
    db.seed_world().await;
    db.seed_item("p1", Some(UNIT_ID), 200, "A").await;
    let app = db.app(db.config());

    let request = Request::builder()
        .uri(format!("/api/play/problem?archetypeSlug={UNIT_SLUG}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], "p1");
}

#[tokio::test]
async fn test_pipeline_rating_change_requires_admin_token() {
    let db = TestDb::new().await;
    db.seed_world().await;
    let app = multi_user_app(&db).await;
    send(
        &app,
        post_json("/api/worlds/enroll", json!({ "domainId": DOMAIN_ID })),
    )
    .await;

    let payload = json!({ "userId": "learner-7", "archetypeId": UNIT_ID, "rating": 1500 });
    let unauthenticated = Request::builder()
        .method("POST")
        .uri("/api/pipeline/rating-change")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let (status, _) = send(&app, unauthenticated).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let admin = |token: &str| {
        Request::builder()
            .method("POST")
            .uri("/api/pipeline/rating-change")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-admin-token", token)
            .body(Body::from(payload.to_string()))
            .unwrap()
    };

    let (status, _) = send(&app, admin("wrong")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, admin(ADMIN_TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["standing"]["rating"], 1500);
    assert_eq!(body["data"]["standing"]["attemptCount"], 0);
    assert_eq!(body["data"]["event"]["delta"], 1300);
    assert_eq!(body["data"]["event"]["reason"], "PIPELINE_MANUAL_ADJUSTMENT");

    for rating in [10_001, i32::MAX] {
        let payload = json!({ "userId": "learner-7", "archetypeId": UNIT_ID, "rating": rating });
        let request = Request::builder()
            .method("POST")
            .uri("/api/pipeline/rating-change")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-admin-token", ADMIN_TOKEN)
            .body(Body::from(payload.to_string()))
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_INPUT");
    }
    assert_eq!(db.count("rating_events").await, 1);
}

#[tokio::test]
async fn test_world_endpoints() {
    let db = TestDb::new().await;
    db.seed_world().await;
    db.seed_subject("sub-physics", "physics", "Physics", 2).await;
    db.seed_domain_in("dom-mechanics", "sub-physics", "mechanics", 0).await;
    db.seed_skill_unit("arch-forces", "dom-mechanics", "forces", 0).await;
    let app = multi_user_app(&db).await;

    let (status, body) = send(&app, get("/api/worlds")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["enrolled"].as_array().map(Vec::len), Some(0));
    assert_eq!(body["data"]["available"][0]["slug"], SUBJECT_SLUG);
    assert_eq!(body["data"]["available"][1]["slug"], "physics");

    send(
        &app,
        post_json("/api/worlds/enroll", json!({ "domainId": DOMAIN_ID })),
    )
    .await;

    let (status, body) = send(&app, get("/api/worlds")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["enrolled"][0]["slug"], SUBJECT_SLUG);
    assert_eq!(body["data"]["enrolled"][0]["rating"], 200);
    assert_eq!(body["data"]["enrolled"][0]["isEnrolled"], true);
    assert!(body["data"]["available"][0].get("rating").is_none());

    let (status, body) = send(&app, get(&format!("/api/worlds/{SUBJECT_SLUG}"))).await;
    assert_eq!(status, StatusCode::OK);
    let domain = &body["data"]["domains"][0];
    assert_eq!(domain["slug"], DOMAIN_SLUG);
    assert_eq!(domain["archetypeCount"], 1);
    assert_eq!(domain["enrolledCount"], 1);
    assert_eq!(domain["rating"], 200);
    assert_eq!(domain["isEnrolled"], true);

    let (status, body) = send(&app, get("/api/worlds/alchemy")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, _) = send(&app, get(&format!("/api/worlds/physics/{DOMAIN_SLUG}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, get("/api/worlds/physics/mechanics")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isEnrolled"], false);
}
