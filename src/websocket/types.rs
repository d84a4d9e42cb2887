use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::chat::chat_models::ListingType;

/// Server-to-client relay messages.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WsMessage {
    ChatMessage(RoomMessagePayload),
    Error(ErrorPayload),
    Ping,
    Pong,
}

/// A message fanned out to a listing's room. `message` is carried verbatim:
/// the relay never inspects or persists it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomMessagePayload {
    pub listing_type: ListingType,
    pub listing_id: String,
    pub user_id: Uuid,
    pub owner_id: Uuid,
    pub message: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorPayload {
    pub message: String,
}

// Client-to-server messages
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    JoinRoom {
        listing_type: ListingType,
        listing_id: String,
        user_id: Uuid,
        owner_id: Uuid,
    },
    #[serde(rename_all = "camelCase")]
    ChatMessage {
        listing_type: ListingType,
        listing_id: String,
        user_id: Uuid,
        owner_id: Uuid,
        message: serde_json::Value,
    },
    Ping,
}
