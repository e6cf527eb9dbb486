//! Webhook endpoint handler.
//!
//! Validates the transport envelope of a delivery and acknowledges it. The
//! payload is decoded and dispatched on a tracked background task, so the
//! response never waits on decoding or on any plugin.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{Instrument, debug, info_span, warn};

use super::AppState;
use crate::types::DeliveryId;
use crate::webhooks::WebhookSecret;

/// Header name for GitHub event type.
const HEADER_EVENT: &str = "x-github-event";
/// Header name for GitHub delivery ID.
const HEADER_DELIVERY: &str = "x-github-delivery";
/// Header name for GitHub signature.
const HEADER_SIGNATURE: &str = "x-hub-signature-256";

const JSON_MEDIA_TYPE: &str = "application/json";

/// Reasons a delivery is rejected before processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("missing required header: {0}")]
    MissingHeader(&'static str),

    #[error("unsupported content type {0:?}, expected application/json")]
    UnsupportedContentType(String),

    #[error("missing signature")]
    MissingSignature,

    #[error("invalid signature")]
    InvalidSignature,
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebhookError::MissingHeader(_) | WebhookError::UnsupportedContentType(_) => {
                StatusCode::BAD_REQUEST
            }
            WebhookError::MissingSignature | WebhookError::InvalidSignature => {
                StatusCode::UNAUTHORIZED
            }
        };

        (status, self.to_string()).into_response()
    }
}

/// Webhook handler.
///
/// # Request
///
/// - Method: POST
/// - Required headers:
///   - `X-GitHub-Event`: Event type (e.g., "issue_comment")
///   - `Content-Type`: `application/json` (parameters such as `charset` allowed)
///   - `X-Hub-Signature-256`: only when a webhook secret is configured
/// - Optional headers:
///   - `X-GitHub-Delivery`: delivery ID, used for log correlation
///
/// # Response
///
/// - 200 OK with `{"status":"ok"}`: delivery accepted. Malformed payloads and
///   unhandled event types are still acknowledged; they are logged and dropped.
/// - 400 Bad Request: missing event header or wrong content type
/// - 401 Unauthorized: missing or invalid signature
///
/// # Example
///
/// ```ignore
/// POST /hook HTTP/1.1
/// X-GitHub-Event: issue_comment
/// X-GitHub-Delivery: 550e8400-e29b-41d4-a716-446655440000
/// Content-Type: application/json
///
/// {"action": "created", "comment": {...}, "issue": {...}, "repository": {...}}
///
/// HTTP/1.1 200 OK
///
/// {"status":"ok"}
/// ```
pub async fn hook_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, WebhookError> {
    let event_type = get_header(&headers, HEADER_EVENT)?;
    check_content_type(&headers)?;
    let delivery_id = get_header(&headers, HEADER_DELIVERY)
        .map(DeliveryId::new)
        .unwrap_or_else(|_| DeliveryId::new("unknown"));

    debug!(
        delivery_id = %delivery_id,
        event_type = %event_type,
        "Received webhook"
    );

    // Read per request so a reloaded secret applies to the next delivery.
    let config = app_state.app_config().current();
    if let Some(secret) = &config.webhook_secret {
        let signature =
            get_header(&headers, HEADER_SIGNATURE).map_err(|_| WebhookError::MissingSignature)?;
        let verified = WebhookSecret::new(secret.as_bytes())
            .and_then(|secret| secret.verify(&body, &signature));
        if let Err(e) = verified {
            warn!(delivery_id = %delivery_id, error = %e, "Invalid webhook signature");
            return Err(WebhookError::InvalidSignature);
        }
    }

    let span = info_span!("delivery", delivery_id = %delivery_id, event_type = %event_type);
    let state = app_state.clone();
    app_state.dispatcher().spawn_tracked(
        async move { process_delivery(&state, &event_type, &body) }.instrument(span),
    );

    Ok(Json(json!({ "status": "ok" })))
}

/// Decodes one delivery and hands it to the dispatcher.
fn process_delivery(state: &AppState, event_type: &str, body: &[u8]) {
    match state.decoders().decode(event_type, body) {
        Ok(Some(event)) => {
            let launched = state.dispatcher().dispatch(event);
            debug!(launched, "Dispatched event");
        }
        Ok(None) => debug!("Ignoring unhandled event type"),
        Err(e) => warn!(error = %e, "Error parsing event"),
    }
}

/// Extracts a required header value as a string.
fn get_header(headers: &HeaderMap, name: &'static str) -> Result<String, WebhookError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .ok_or(WebhookError::MissingHeader(name))
}

/// Accepts `application/json` with or without parameters.
fn check_content_type(headers: &HeaderMap) -> Result<(), WebhookError> {
    let value = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let media_type = value.split(';').next().unwrap_or_default().trim();

    if media_type.eq_ignore_ascii_case(JSON_MEDIA_TYPE) {
        Ok(())
    } else {
        Err(WebhookError::UnsupportedContentType(value.to_string()))
    }
}
