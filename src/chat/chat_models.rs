use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// The kind of listing a conversation is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "listing_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ListingType {
    Adoption,
    Marketplace,
}

impl fmt::Display for ListingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListingType::Adoption => write!(f, "adoption"),
            ListingType::Marketplace => write!(f, "marketplace"),
        }
    }
}

impl FromStr for ListingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "adoption" => Ok(ListingType::Adoption),
            "marketplace" => Ok(ListingType::Marketplace),
            other => Err(format!("invalid listing type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "chat_message_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
    Voice,
}

/// One conversation per (listing_id, listing_type); participants are fixed
/// when the chat is created on first send.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Chat {
    pub id: Uuid,
    pub listing_id: String,
    pub listing_type: ListingType,
    pub user_id: Uuid,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ChatMessage {
    pub id: i64,
    pub chat_id: Uuid,
    pub sender_id: Uuid,
    pub kind: MessageKind,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatResponse {
    pub id: Uuid,
    #[serde(rename = "listingId")]
    pub listing_id: String,
    #[serde(rename = "listingType")]
    pub listing_type: ListingType,
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    #[serde(rename = "ownerId")]
    pub owner_id: Uuid,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl From<Chat> for ChatResponse {
    fn from(chat: Chat) -> Self {
        Self {
            id: chat.id,
            listing_id: chat.listing_id,
            listing_type: chat.listing_type,
            user_id: chat.user_id,
            owner_id: chat.owner_id,
            created_at: chat.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatMessageResponse {
    #[serde(rename = "from")]
    pub sender_id: Uuid,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl From<ChatMessage> for ChatMessageResponse {
    fn from(message: ChatMessage) -> Self {
        Self {
            sender_id: message.sender_id,
            kind: message.kind,
            content: message.content,
            timestamp: message.created_at,
        }
    }
}
