use crate::game_manager::{AppState, ArenaStats, Identity};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use shared::{ClientMessage, ServerMessage};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Identity attached by the auth layer in front of the server.
#[derive(Debug, Deserialize)]
pub struct IdentityParams {
    pub user_id: Option<String>,
    pub name: Option<String>,
}

impl IdentityParams {
    fn into_identity(self) -> Option<Identity> {
        let id = self.user_id.filter(|id| !id.trim().is_empty())?;
        let name = self
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| id.clone());
        Some(Identity { id, name })
    }
}

#[allow(clippy::unused_async)]
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<IdentityParams>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let Some(identity) = params.into_identity() else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    ws.on_upgrade(move |socket| handle_socket(socket, state, identity))
}

#[allow(clippy::unused_async, clippy::needless_pass_by_value)]
pub async fn stats_handler(State(state): State<Arc<AppState>>) -> Json<ArenaStats> {
    Json(state.stats())
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, identity: Identity) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    // Forward outbound messages from the channel to the socket
    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize server message");
                    continue;
                }
            };
            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let connection_id = uuid::Uuid::new_v4().to_string();
    state.add_connection(connection_id.clone(), identity, tx);

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => state.handle_message(&connection_id, client_msg),
                Err(e) => {
                    tracing::debug!(connection_id = %connection_id, error = %e, "Ignoring malformed message");
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    state.handle_disconnect(&connection_id);
    writer.abort();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_requires_a_user_id() {
        let missing = IdentityParams {
            user_id: None,
            name: Some("Alice".to_string()),
        };
        assert!(missing.into_identity().is_none());

        let blank = IdentityParams {
            user_id: Some("  ".to_string()),
            name: None,
        };
        assert!(blank.into_identity().is_none());
    }

    #[test]
    fn name_falls_back_to_user_id() {
        let params = IdentityParams {
            user_id: Some("u1".to_string()),
            name: None,
        };
        assert_eq!(
            params.into_identity(),
            Some(Identity {
                id: "u1".to_string(),
                name: "u1".to_string(),
            })
        );
    }
}
