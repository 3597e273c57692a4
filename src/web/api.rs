//! Defines the Axum API routes and handlers.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tokio::net::TcpListener;

use crate::ingestion::ControlMessage;
use crate::telemetry::StatusReport;
use crate::transport::{RequestSender, TransportError, query_status, submit};
use crate::web::models::{ControlResponse, ErrorResponse};

pub type AppState = RequestSender;

/// Creates the Axum router with all the API endpoints.
pub fn create_router(requests: AppState) -> Router {
    Router::new()
        .route("/api/control", post(post_control).options(preflight))
        .route("/api/status", get(get_status))
        .layer(middleware::map_response(allow_any_origin))
        .with_state(requests)
}

/// Serve `router` until the listener fails.
pub async fn serve_http(listener: TcpListener, router: Router) -> Result<(), TransportError> {
    tracing::info!("Web API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router).await?;
    Ok(())
}

async fn allow_any_origin(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("content-type"),
    );
    response
}

async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

fn error_response(status: StatusCode, error: impl ToString) -> Response {
    (status, Json(ErrorResponse::new(error))).into_response()
}

/// Handler to apply one control message.
async fn post_control(
    State(requests): State<AppState>,
    payload: Result<Json<ControlMessage>, JsonRejection>,
) -> Result<Json<ControlResponse>, Response> {
    let Json(message) = payload.map_err(|e| {
        tracing::warn!("HTTP RX rejected: {}", e.body_text());
        error_response(StatusCode::UNPROCESSABLE_ENTITY, e.body_text())
    })?;
    match submit(&requests, message).await {
        Ok(ack) => Ok(Json(ControlResponse::from(&ack))),
        Err(TransportError::Rejected(e)) => Err(error_response(StatusCode::UNPROCESSABLE_ENTITY, e)),
        Err(e) => Err(error_response(StatusCode::SERVICE_UNAVAILABLE, e)),
    }
}

/// Handler to get the current status of the snake.
async fn get_status(State(requests): State<AppState>) -> Result<Json<StatusReport>, Response> {
    query_status(&requests)
        .await
        .map(Json)
        .map_err(|e| error_response(StatusCode::SERVICE_UNAVAILABLE, e))
}
