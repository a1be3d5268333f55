use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::chat::events::ChatEvent;
use crate::chat::session::ConversationSession;
use crate::service::session_service::SessionService;

/// Commands a client may send over the socket.
#[derive(Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientCommand {
    /// Submit a turn; without `text` the session's draft is sent.
    Send {
        #[serde(default)]
        text: Option<String>,
    },
    Draft { text: String },
}

/// GET `/ws/sessions/{id}`: upgrades to a WebSocket streaming session events.
pub async fn ws_session_handler(
    ws: WebSocketUpgrade,
    Path(id): Path<String>,
    State(svc): State<SessionService>,
) -> Response {
    match svc.get(&id) {
        Ok(session) => ws.on_upgrade(move |socket| handle_socket(socket, session)),
        Err(e) => (StatusCode::NOT_FOUND, e.to_string()).into_response(),
    }
}

/// Handles a single WebSocket connection.
///
/// Protocol:
/// - Server sends `{ "type": "snapshot", ... }` first, then every session
///   event (`message`, `typing`, `chips`, `ended`, `toast`) as it happens.
///   A subscriber that falls behind gets a fresh snapshot.
/// - Client sends `{ "type": "send", "text": "..." }` (text optional) or
///   `{ "type": "draft", "text": "..." }`.
async fn handle_socket(socket: WebSocket, session: Arc<ConversationSession>) {
    info!(session = %session.id(), "WebSocket client connected");

    let (mut sink, mut stream) = socket.split();
    let mut events = session.subscribe();
    let snapshot = ChatEvent::Snapshot { snapshot: session.snapshot() };

    let forward_session = Arc::clone(&session);
    let mut forward = tokio::spawn(async move {
        if send_event(&mut sink, &snapshot).await.is_err() {
            return;
        }
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("WebSocket subscriber lagged by {skipped} events, resyncing");
                    ChatEvent::Snapshot { snapshot: forward_session.snapshot() }
                }
                Err(RecvError::Closed) => break,
            };
            if send_event(&mut sink, &event).await.is_err() {
                break;
            }
        }
    });

    let receive_session = Arc::clone(&session);
    let mut receive = tokio::spawn(async move {
        while let Some(msg) = stream.next().await {
            let msg = match msg {
                Ok(m) => m,
                Err(e) => {
                    warn!("WebSocket receive error: {e}");
                    break;
                }
            };

            // Only handle text messages
            let command = match &msg {
                Message::Text(t) => serde_json::from_str::<ClientCommand>(t.as_str()),
                Message::Close(_) => break,
                _ => continue,
            };

            match command {
                Ok(ClientCommand::Send { text }) => {
                    let session = Arc::clone(&receive_session);
                    tokio::spawn(async move {
                        let outcome = session.send_message(text.as_deref()).await;
                        debug!(session = %session.id(), ?outcome, "WebSocket send handled");
                    });
                }
                Ok(ClientCommand::Draft { text }) => receive_session.set_draft(text),
                Err(e) => warn!("Invalid WebSocket command: {e}"),
            }
        }
    });

    tokio::select! {
        _ = &mut forward => receive.abort(),
        _ = &mut receive => forward.abort(),
    }

    info!(session = %session.id(), "WebSocket client disconnected");
}

/// Helper: serialize a `ChatEvent` and send it over the socket.
async fn send_event(
    sink: &mut SplitSink<WebSocket, Message>,
    event: &ChatEvent,
) -> Result<(), axum::Error> {
    match serde_json::to_string(event) {
        Ok(json) => sink.send(Message::Text(json.into())).await,
        Err(e) => {
            warn!("Failed to serialize event: {e}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_commands_parse() {
        let cmd: ClientCommand = serde_json::from_str(r#"{ "type": "send", "text": "응" }"#).unwrap();
        assert_eq!(cmd, ClientCommand::Send { text: Some("응".into()) });

        let cmd: ClientCommand = serde_json::from_str(r#"{ "type": "send" }"#).unwrap();
        assert_eq!(cmd, ClientCommand::Send { text: None });

        let cmd: ClientCommand = serde_json::from_str(r#"{ "type": "draft", "text": "어" }"#).unwrap();
        assert_eq!(cmd, ClientCommand::Draft { text: "어".into() });

        assert!(serde_json::from_str::<ClientCommand>(r#"{ "type": "shout" }"#).is_err());
    }
}
