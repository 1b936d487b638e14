use {
    axum::{
        Json,
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
    },
    tracing::warn,
};

use deskbridge_bridge::{Error as BridgeError, InboundMessage, WebhookEvent};

use crate::server::AppState;

/// Desk webhook ingress.
///
/// Always answers 200 once the payload parses: the desk disables a
/// webhook target that keeps failing, so handler errors are reported in
/// the body instead of the status line.
pub async fn desk_webhook(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Json(event): Json<WebhookEvent>,
) -> impl IntoResponse {
    match state.outbound.handle_webhook(&tenant_id, &event).await {
        Ok(()) => Json(serde_json::json!({ "ok": true })).into_response(),
        Err(e) => {
            warn!(tenant_id, error = %e, "desk webhook handling failed");
            Json(serde_json::json!({ "ok": false, "note": e.to_string() })).into_response()
        },
    }
}

/// Network event ingress: normalized messages from the session adapter.
pub async fn network_event(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Json(message): Json<InboundMessage>,
) -> impl IntoResponse {
    match state.inbound.handle_inbound(&tenant_id, &message).await {
        Ok(()) => Json(serde_json::json!({ "ok": true })).into_response(),
        Err(BridgeError::Messaging(deskbridge_messaging::Error::UnknownTenant { tenant_id })) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": format!("unknown tenant: {tenant_id}") })),
        )
            .into_response(),
        Err(e) => {
            warn!(tenant_id, error = %e, "network event handling failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        },
    }
}
