use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::chat::chat_models::{ChatMessageResponse, ChatResponse, MessageKind};

#[derive(Clone, Debug, Deserialize, Validate, ToSchema)]
pub struct SendChatMessageRequest {
    /// Defaults to `text` when omitted.
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
    #[validate(length(min = 1))]
    pub content: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChatHistoryResponse {
    pub messages: Vec<ChatMessageResponse>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SendChatMessageResponse {
    pub message: ChatMessageResponse,
    pub chat: ChatResponse,
}
