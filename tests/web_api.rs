use axum::{body::{Body, to_bytes}, http::{Request, StatusCode}};
use serpent_rs::config::Config;
use serpent_rs::control::handle_request;
use serpent_rs::snake::Snake;
use serpent_rs::transport::control_channel;
use serpent_rs::web::create_router;
use serde_json::json;
use tokio::time::Instant;
use tower::ServiceExt; // for .oneshot()

fn app() -> axum::Router {
    let (tx, mut rx) = control_channel(8);
    tokio::spawn(async move {
        let mut snake = Snake::new(&Config::default());
        while let Some(request) = rx.recv().await {
            handle_request(&mut snake, request, Instant::now());
        }
    });
    create_router(tx)
}

fn post_control(body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/control")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_control_echo_and_counter() {
    let app = app();
    let request = || post_control(json!({"frequency": 1.8, "steering": -20}).to_string());

    let response = app.clone().oneshot(request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["msg_count"], 1);
    assert!((json["frequency"].as_f64().unwrap() - 1.0).abs() < 1e-9);
    assert!((json["steering"].as_f64().unwrap() + 4.0).abs() < 1e-9);
    assert_eq!(json["amplitude"], 25.0);
    assert_eq!(json["phaseShift"], 60.0);

    let json = body_json(app.clone().oneshot(request()).await.unwrap()).await;
    assert_eq!(json["msg_count"], 2);
}

#[tokio::test]
async fn test_invalid_bodies_are_rejected() {
    let app = app();
    for body in ["{\"amplitude\": ", "{}", "{\"x\": 0.3}", "[1, 2]"] {
        let response = app.clone().oneshot(post_control(body.to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY, "{}", body);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        let json = body_json(response).await;
        assert_eq!(json["status"], "error");
        assert!(json["error"].is_string());
    }

    let status = Request::builder().uri("/api/status").body(Body::empty()).unwrap();
    let json = body_json(app.oneshot(status).await.unwrap()).await;
    assert_eq!(json["msg_count"], 0);
    assert_eq!(json["state"], "IDLE");
}

#[tokio::test]
async fn test_status_after_control() {
    let app = app();
    app.clone()
        .oneshot(post_control(json!({"amplitude": 45}).to_string()))
        .await
        .unwrap();

    let status = Request::builder().uri("/api/status").body(Body::empty()).unwrap();
    let response = app.oneshot(status).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["state"], "ACTIVE");
    assert_eq!(json["msg_count"], 1);
    assert!((json["amplitude"].as_f64().unwrap() - 29.0).abs() < 1e-9);
    assert_eq!(json["segments"], 5);
}

#[tokio::test]
async fn test_preflight_allows_any_origin() {
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/control")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}

#[tokio::test]
async fn test_loop_gone_is_unavailable() {
    let (tx, rx) = control_channel(1);
    drop(rx);
    let response = create_router(tx)
        .oneshot(post_control(json!({"amplitude": 30}).to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
