//! A degradable HTTP fixture for exercising `resilient-dispatcher` by hand.
//!
//! `GET /get` returns `200` with a fixed payload, or `503` while degraded.
//! `GET|POST /degrade/on` and `/degrade/off` flip the degraded flag.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Clone)]
struct AppState {
    degraded: Arc<AtomicBool>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    let listener = TcpListener::bind(addr).await.expect("bind error");

    tracing::info!("Listening on http://{}", addr);
    tracing::info!("  curl http://{}/get", addr);
    tracing::info!("  curl -X POST http://{}/degrade/on", addr);
    tracing::info!("  curl -X POST http://{}/degrade/off", addr);

    axum::serve(listener, app().into_make_service())
        .await
        .expect("server error");
}

fn app() -> Router {
    let state = AppState {
        degraded: Arc::new(AtomicBool::new(false)),
    };

    Router::new()
        .route("/get", get(get_payload))
        .route("/degrade/on", get(degrade_on).post(degrade_on))
        .route("/degrade/off", get(degrade_off).post(degrade_off))
        .with_state(state)
}

async fn get_payload(State(state): State<AppState>) -> impl IntoResponse {
    if state.degraded.load(Ordering::Relaxed) {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded").into_response()
    } else {
        (StatusCode::OK, "ok").into_response()
    }
}

async fn degrade_on(State(state): State<AppState>) -> impl IntoResponse {
    state.degraded.store(true, Ordering::Relaxed);
    tracing::info!("fixture now degraded");
    StatusCode::OK
}

async fn degrade_off(State(state): State<AppState>) -> impl IntoResponse {
    state.degraded.store(false, Ordering::Relaxed);
    tracing::info!("fixture no longer degraded");
    StatusCode::OK
}
