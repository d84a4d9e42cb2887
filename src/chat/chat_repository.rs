use crate::{
    chat::chat_models::{Chat, ChatMessage, ListingType, MessageKind},
    error::Result,
};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct ChatRepository {
    pool: PgPool,
}

impl ChatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_listing(
        &self,
        listing_type: ListingType,
        listing_id: &str,
    ) -> Result<Option<Chat>> {
        let chat = sqlx::query_as::<_, Chat>(
            "SELECT * FROM chats
             WHERE listing_id = $1 AND listing_type = $2",
        )
        .bind(listing_id)
        .bind(listing_type)
        .fetch_optional(&self.pool)
        .await?;

        Ok(chat)
    }

    /// Lazily create the chat for a listing; the UNIQUE constraint keeps
    /// concurrent first sends from producing two rows.
    pub async fn find_or_create(
        &self,
        listing_type: ListingType,
        listing_id: &str,
        user_id: Uuid,
        owner_id: Uuid,
    ) -> Result<Chat> {
        let chat = sqlx::query_as::<_, Chat>(
            "INSERT INTO chats (listing_id, listing_type, user_id, owner_id)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (listing_id, listing_type)
             DO UPDATE SET listing_id = EXCLUDED.listing_id
             RETURNING *",
        )
        .bind(listing_id)
        .bind(listing_type)
        .bind(user_id)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(chat)
    }

    pub async fn append_message(
        &self,
        chat_id: Uuid,
        sender_id: Uuid,
        kind: MessageKind,
        content: &str,
    ) -> Result<ChatMessage> {
        let message = sqlx::query_as::<_, ChatMessage>(
            "INSERT INTO chat_messages (chat_id, sender_id, kind, content)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(chat_id)
        .bind(sender_id)
        .bind(kind)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;

        Ok(message)
    }

    pub async fn count_messages(&self, chat_id: Uuid) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM chat_messages WHERE chat_id = $1")
                .bind(chat_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Oldest-first slice of a chat's messages. `id` is a bigserial, so
    /// ascending id is commit order.
    pub async fn find_message_window(
        &self,
        chat_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ChatMessage>> {
        let messages = sqlx::query_as::<_, ChatMessage>(
            "SELECT * FROM chat_messages
             WHERE chat_id = $1
             ORDER BY id ASC
             LIMIT $2 OFFSET $3",
        )
        .bind(chat_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }
}
