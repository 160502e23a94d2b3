//! Point-to-point signaling relay for peer media negotiation

use crate::protocol::ServerMessage;
use crate::state::AppState;
use serde_json::Value;
use std::sync::Arc;

/// Forward `payload` to `to` in the sender's room. Never replies: unknown or
/// closed targets are dropped and retry is left to the peers.
pub async fn handle_signal(
    state: &Arc<AppState>,
    room: &str,
    client_id: &str,
    to: &str,
    payload: Value,
) -> Option<ServerMessage> {
    if state.relay_signal(room, client_id, to, payload).await {
        tracing::debug!(from = %client_id, to = %to, "Signal relayed");
    } else {
        tracing::debug!(from = %client_id, to = %to, "Signal target unavailable, dropped");
    }
    None
}
