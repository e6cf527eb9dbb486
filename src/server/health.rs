//! Liveness endpoints. Load balancers tend to probe the webhook path itself,
//! so `GET /hook` answers too, without touching the dispatcher.

use axum::http::StatusCode;

/// `GET /health`: plain-text `OK` for as long as the listener is up.
pub async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

pub async fn hook_probe_handler() -> StatusCode {
    StatusCode::OK
}
