//! HTTP endpoints
//!
//! The platform's verification handshake (GET /webhook), the event intake
//! (POST /webhook), health probes and Prometheus metrics. The webhook always
//! answers 2xx with an empty body — the platform ignores response payloads —
//! except on internal failure, where a 5xx requests redelivery.

use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use std::collections::HashMap;
use tower_http::trace::TraceLayer;

use leadbot_transport::WebhookBody;

use crate::router;
use crate::state::AppState;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", get(verify_webhook).post(receive_webhook))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Outcome of the platform verification handshake.
///
/// Echo the challenge when the mode is `subscribe` and the token matches the
/// configured secret; refuse otherwise.
pub fn verification_response(
    expected_token: Option<&str>,
    params: &HashMap<String, String>,
) -> Result<String, StatusCode> {
    let mode = params.get("hub.mode").map(String::as_str);
    let token = params.get("hub.verify_token").map(String::as_str);
    let challenge = params.get("hub.challenge");

    match (mode, token, challenge, expected_token) {
        (Some("subscribe"), Some(token), Some(challenge), Some(expected)) if token == expected => {
            Ok(challenge.clone())
        }
        _ => Err(StatusCode::FORBIDDEN),
    }
}

/// GET /webhook — verification handshake
async fn verify_webhook(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    match verification_response(state.settings.server.verify_token.as_deref(), &params) {
        Ok(challenge) => (StatusCode::OK, challenge).into_response(),
        Err(status) => {
            tracing::warn!("Webhook verification refused");
            status.into_response()
        }
    }
}

/// POST /webhook — inbound events
async fn receive_webhook(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> StatusCode {
    // Malformed input is not transient: acknowledge and move on so the
    // platform never retries it.
    let body: WebhookBody = match serde_json::from_value(payload) {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(error = %e, "Webhook payload failed to parse; acknowledged");
            return StatusCode::OK;
        }
    };
    let Some(value) = body.into_value() else {
        tracing::warn!("Webhook payload missing entry/changes/value; acknowledged");
        return StatusCode::OK;
    };

    match router::handle_value(&state, value).await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            // Transient failure: a 5xx asks the platform to redeliver, which
            // the idempotency gate makes safe.
            tracing::error!(error = %e, "Webhook handling failed");
            e.into()
        }
    }
}

/// GET /health
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /ready
async fn readiness_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ready",
        "catalog_steps": state.catalog.steps().len(),
    }))
}

/// GET /metrics — Prometheus exposition
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()).into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_verification_echoes_challenge_on_match() {
        let result = verification_response(
            Some("secret"),
            &params(&[
                ("hub.mode", "subscribe"),
                ("hub.verify_token", "secret"),
                ("hub.challenge", "12345"),
            ]),
        );
        assert_eq!(result.unwrap(), "12345");
    }

    #[test]
    fn test_verification_refuses_wrong_token() {
        let result = verification_response(
            Some("secret"),
            &params(&[
                ("hub.mode", "subscribe"),
                ("hub.verify_token", "wrong"),
                ("hub.challenge", "12345"),
            ]),
        );
        assert_eq!(result.unwrap_err(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_verification_refuses_when_unconfigured() {
        let result = verification_response(
            None,
            &params(&[
                ("hub.mode", "subscribe"),
                ("hub.verify_token", "anything"),
                ("hub.challenge", "12345"),
            ]),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_verification_requires_subscribe_mode() {
        let result = verification_response(
            Some("secret"),
            &params(&[
                ("hub.mode", "unsubscribe"),
                ("hub.verify_token", "secret"),
                ("hub.challenge", "12345"),
            ]),
        );
        assert!(result.is_err());
    }
}
