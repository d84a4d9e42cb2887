use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    middleware::AuthUser,
    state::AppState,
    websocket::{
        rooms::{room_key, WsSender},
        types::{ClientMessage, ErrorPayload, RoomMessagePayload, WsMessage},
    },
};

/// Realtime relay endpoint.
///
/// Connections join listing rooms and exchange `chatMessage` payloads.
/// Nothing on this path is persisted — durable history goes through the
/// chat REST endpoints, which also publish into these rooms after a
/// successful append.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, user_id, state))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, user_id: Uuid, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();

    // Room membership is keyed by a per-connection id, not the user id:
    // one user may hold several connections.
    let connection_id = Uuid::new_v4();

    // Task: send messages from channel to WebSocket
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(json) = serde_json::to_string(&msg) {
                if sender.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
        }
    });

    // Task: receive messages from WebSocket
    let state_clone = state.clone();
    let tx_clone = tx.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Text(text) = msg {
                if let Err(e) =
                    process_client_message(&text, connection_id, user_id, &state_clone, &tx_clone)
                {
                    tracing::debug!("Relay message rejected for user {}: {:?}", user_id, e);
                    let error_msg = WsMessage::Error(ErrorPayload {
                        message: e.to_string(),
                    });
                    let _ = tx_clone.send(error_msg);
                }
            } else if let Message::Close(_) = msg {
                break;
            }
        }
    });

    // Heartbeat task
    let tx_heartbeat = tx.clone();
    let mut heartbeat_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(30));
        loop {
            interval.tick().await;
            if tx_heartbeat.send(WsMessage::Ping).is_err() {
                break;
            }
        }
    });

    // Stop all tasks when any one finishes
    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
            heartbeat_task.abort();
        },
        _ = &mut recv_task => {
            send_task.abort();
            heartbeat_task.abort();
        },
        _ = &mut heartbeat_task => {
            send_task.abort();
            recv_task.abort();
        }
    }

    // Cleanup
    state.rooms.remove_connection(&connection_id);
    tracing::info!("Relay WebSocket closed for user {}", user_id);
}

/// Process incoming relay messages.
///
/// `joinRoom` requires the authenticated identity to be one of the room's
/// declared participants; `chatMessage` is rebroadcast verbatim to the
/// room, sender included.
fn process_client_message(
    text: &str,
    connection_id: Uuid,
    auth_user_id: Uuid,
    state: &AppState,
    tx: &WsSender,
) -> Result<()> {
    let client_msg: ClientMessage = serde_json::from_str(text)
        .map_err(|e| AppError::BadRequest(format!("Invalid message format: {}", e)))?;

    match client_msg {
        ClientMessage::JoinRoom {
            listing_type,
            listing_id,
            user_id,
            owner_id,
        } => {
            if auth_user_id != user_id && auth_user_id != owner_id {
                return Err(AppError::Unauthorized(
                    "Not a participant of this chat".to_string(),
                ));
            }

            state
                .rooms
                .join(&room_key(listing_type, &listing_id), connection_id, tx.clone());
        }

        ClientMessage::ChatMessage {
            listing_type,
            listing_id,
            user_id,
            owner_id,
            message,
        } => {
            let payload = WsMessage::ChatMessage(RoomMessagePayload {
                listing_type,
                listing_id: listing_id.clone(),
                user_id,
                owner_id,
                message,
            });
            state
                .rooms
                .broadcast(&room_key(listing_type, &listing_id), payload);
        }

        ClientMessage::Ping => {
            let _ = tx.send(WsMessage::Pong);
        }
    }

    Ok(())
}
