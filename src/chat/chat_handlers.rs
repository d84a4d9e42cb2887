use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    chat::{
        chat_dto::{ChatHistoryResponse, SendChatMessageRequest, SendChatMessageResponse},
        chat_models::{ChatMessageResponse, ListingType},
    },
    error::{AppError, Result},
    middleware::AuthUser,
    state::AppState,
};

pub const DEFAULT_PAGE_SIZE: u32 = 30;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    page: Option<u32>,
    limit: Option<u32>,
}

fn parse_listing_type(raw: &str) -> Result<ListingType> {
    raw.parse::<ListingType>().map_err(AppError::BadRequest)
}

/// Get paginated chat history for a listing
#[utoipa::path(
    get,
    path = "/api/chat/{listing_type}/{listing_id}/{user_id}/{owner_id}",
    tag = "chat",
    params(
        ("listing_type" = String, Path, description = "adoption or marketplace"),
        ("listing_id" = String, Path, description = "Listing the conversation concerns"),
        ("user_id" = Uuid, Path, description = "Initiating participant"),
        ("owner_id" = Uuid, Path, description = "Listing owner"),
        ("page" = Option<u32>, Query, description = "Page number, 1 = newest (default: 1)"),
        ("limit" = Option<u32>, Query, description = "Messages per page (default: 30)")
    ),
    responses(
        (status = 200, description = "Windowed chat history, oldest first", body = ChatHistoryResponse),
        (status = 400, description = "Invalid listing type or pagination")
    )
)]
pub async fn get_history(
    State(state): State<AppState>,
    Path((listing_type, listing_id, _user_id, _owner_id)): Path<(String, String, Uuid, Uuid)>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse> {
    // Reject before any store access.
    let listing_type = parse_listing_type(&listing_type)?;

    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    if page == 0 || limit == 0 {
        return Err(AppError::BadRequest(
            "page must be >= 1 and limit must be > 0".to_string(),
        ));
    }

    let (messages, total) = state
        .chat_service
        .get_history(listing_type, &listing_id, page, limit)
        .await?;

    let response = ChatHistoryResponse {
        messages: messages.into_iter().map(ChatMessageResponse::from).collect(),
        total,
        page,
        limit,
    };

    Ok((StatusCode::OK, Json(response)))
}

/// Send a message in a listing's chat
#[utoipa::path(
    post,
    path = "/api/chat/{listing_type}/{listing_id}/{user_id}/{owner_id}",
    tag = "chat",
    request_body = SendChatMessageRequest,
    params(
        ("listing_type" = String, Path, description = "adoption or marketplace"),
        ("listing_id" = String, Path, description = "Listing the conversation concerns"),
        ("user_id" = Uuid, Path, description = "Initiating participant"),
        ("owner_id" = Uuid, Path, description = "Listing owner")
    ),
    responses(
        (status = 201, description = "Message persisted and published to the listing's room", body = SendChatMessageResponse),
        (status = 400, description = "Invalid listing type or missing content"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn send_message(
    State(state): State<AppState>,
    AuthUser(sender_id): AuthUser,
    Path((listing_type, listing_id, user_id, owner_id)): Path<(String, String, Uuid, Uuid)>,
    Json(payload): Json<SendChatMessageRequest>,
) -> Result<impl IntoResponse> {
    // Reject before any store access.
    let listing_type = parse_listing_type(&listing_type)?;

    payload.validate()?;
    let content = payload
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("content is required".to_string()))?;

    let (chat, message) = state
        .chat_service
        .send_message(
            listing_type,
            &listing_id,
            user_id,
            owner_id,
            sender_id,
            payload.kind,
            &content,
        )
        .await?;

    let response = SendChatMessageResponse {
        message: ChatMessageResponse::from(message),
        chat: chat.into(),
    };

    Ok((StatusCode::CREATED, Json(response)))
}
