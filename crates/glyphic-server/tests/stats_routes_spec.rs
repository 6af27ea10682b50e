use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use glyphic_server::state::AppState;
use glyphic_server::{Settings, SharedState, build_app_router};

fn test_state() -> SharedState {
    AppState::new(Arc::new(Settings::default()))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body readable")
        .to_bytes();
    serde_json::from_slice(bytes.as_ref()).expect("body must be valid JSON")
}

#[tokio::test]
async fn stats_reflect_counter_mutations() {
    let state = test_state();
    state.increment_request_count();
    state.increment_request_count();
    state.increment_request_count();
    state.increment_error_count();
    state.increment_image_requests();
    state.increment_pdf_requests();
    state.add_processing_time(0.9);

    let app = build_app_router(Arc::clone(&state));
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/v1/stats")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("stats responds");

    assert_eq!(response.status(), StatusCode::OK);
    let value = body_json(response).await;

    assert_eq!(value["request_count"], 3);
    assert_eq!(value["error_count"], 1);
    assert_eq!(value["image_requests"], 1);
    assert_eq!(value["pdf_requests"], 1);
    assert_eq!(value["is_initialized"], true);
    assert_eq!(value["model_loaded"], false);

    let error_rate = value["error_rate"].as_f64().expect("error_rate is a number");
    assert!((error_rate - 100.0 / 3.0).abs() < 1e-9, "unexpected rate {error_rate}");

    let average = value["average_processing_time"]
        .as_f64()
        .expect("average is a number");
    assert!((average - 0.3).abs() < 1e-6, "unexpected average {average}");
}

#[tokio::test]
async fn unknown_route_yields_error_response() {
    let app = build_app_router(test_state());
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/v1/ocr")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("fallback responds");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let value = body_json(response).await;
    assert_eq!(value["success"], false);
    assert_eq!(value["error_code"], "NOT_FOUND");
    assert!(
        value["error_message"]
            .as_str()
            .expect("message present")
            .contains("/v1/ocr")
    );
}

#[tokio::test]
async fn wrong_method_yields_405_error_response() {
    let app = build_app_router(test_state());
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/healthz")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("method fallback responds");

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let value = body_json(response).await;
    assert_eq!(value["success"], false);
    assert_eq!(value["error_code"], "METHOD_NOT_ALLOWED");
}

#[tokio::test]
async fn error_responses_echo_the_request_id() {
    let app = build_app_router(test_state());
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/v1/missing")
                .header("x-request-id", "req-42")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("fallback responds");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let value = body_json(response).await;
    assert_eq!(value["details"]["request_id"], "req-42");
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let app = build_app_router(test_state());
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/v1/healthz")
                .header(header::ORIGIN, "http://localhost:5173")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), StatusCode::OK);
    let allow_origin = response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .expect("permissive CORS emits allow-origin");
    assert_eq!(allow_origin, "*");
}

#[tokio::test]
async fn responses_carry_a_generated_request_id() {
    let app = build_app_router(test_state());
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/v1/healthz")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("request succeeds");

    let request_id = response
        .headers()
        .get("x-request-id")
        .expect("request id set by middleware")
        .to_str()
        .expect("request id is ascii");
    assert!(!request_id.is_empty());
}
