//! WebSocket bridge between clients and the engine's push channels.
//!
//! On connect a run session is opened in the streaming registry and its id
//! is sent to the client, which passes it back in report requests. Incoming
//! frames can open additional run sessions (`{"new_session": true}`) for
//! concurrent runs on one connection, or subscribe to a report's enhanced
//! refreshes (`{"subscribe": "<report_id>"}`). Closing the socket releases
//! the channels; in-flight aggregations run to completion and still
//! populate the caches.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use rivalscope_engine::StreamSessionRegistry;

use crate::routes::AppState;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    /// Client-chosen connection id; run session ids derive from it.
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
struct ClientFrame {
    #[serde(default)]
    new_session: bool,
    #[serde(default)]
    subscribe: Option<Uuid>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, params.session_id))
}

async fn handle_socket(socket: WebSocket, state: AppState, connection_id: String) {
    let (mut sender, mut receiver) = socket.split();

    debug!(%connection_id, "WebSocket client connected");

    // All engine-side events funnel into one outbound queue
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
    let mut run_sessions: Vec<String> = Vec::new();

    open_run_session(&state, &connection_id, &out_tx, &mut run_sessions);

    let send_task = tokio::spawn(async move {
        while let Some(json) = out_rx.recv().await {
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(result) = receiver.next().await {
        let message = match result {
            Ok(message) => message,
            Err(e) => {
                warn!(%connection_id, error = %e, "WebSocket error");
                break;
            }
        };
        match message {
            Message::Text(text) => {
                let Ok(frame) = serde_json::from_str::<ClientFrame>(&text) else {
                    warn!(%connection_id, "Unparseable client frame");
                    continue;
                };
                if frame.new_session {
                    open_run_session(&state, &connection_id, &out_tx, &mut run_sessions);
                }
                if let Some(report_id) = frame.subscribe {
                    subscribe_enhanced(&state, report_id, &out_tx);
                }
            }
            Message::Close(_) => {
                debug!(%connection_id, "WebSocket client disconnected");
                break;
            }
            _ => {}
        }
    }

    // Release the push channels; running aggregations are not cancelled
    for session_id in &run_sessions {
        state.service.streaming().close(session_id);
    }
    send_task.abort();
    debug!(%connection_id, "WebSocket connection closed");
}

/// Open a registry channel under a fresh `{connection}_{timestamp}` id,
/// forward its events to the outbound queue, and tell the client the id.
fn open_run_session(
    state: &AppState,
    connection_id: &str,
    out_tx: &mpsc::UnboundedSender<String>,
    run_sessions: &mut Vec<String>,
) {
    let session_id = StreamSessionRegistry::make_session_id(connection_id);
    let mut rx = state.service.streaming().open(&session_id);
    run_sessions.push(session_id.clone());

    let _ = out_tx.send(
        serde_json::json!({
            "type": "session_opened",
            "session_id": session_id,
        })
        .to_string(),
    );

    let out = out_tx.clone();
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    warn!(error = %e, "Failed to serialize stream event");
                    continue;
                }
            };
            if out.send(json).is_err() {
                break;
            }
        }
    });
}

/// Forward a report's enhanced refreshes to the outbound queue until the
/// socket goes away.
fn subscribe_enhanced(state: &AppState, report_id: Uuid, out_tx: &mpsc::UnboundedSender<String>) {
    let enhanced = std::sync::Arc::clone(state.service.enhanced());
    let out = out_tx.clone();
    tokio::spawn(async move {
        let mut rx = enhanced.subscribe(report_id).await;
        while let Some(update) = rx.recv().await {
            let json = serde_json::json!({
                "type": "enhanced_update",
                "report_id": update.report_id,
                "payload": update.payload,
                "last_updated": update.last_updated,
            })
            .to_string();
            if out.send(json).is_err() {
                break;
            }
        }
    });
}
