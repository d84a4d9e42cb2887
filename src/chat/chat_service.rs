use crate::chat::chat_models::{Chat, ChatMessage, ChatMessageResponse, ListingType, MessageKind};
use crate::chat::chat_repository::ChatRepository;
use crate::error::Result;
use crate::websocket::rooms::{room_key, RoomManager};
use crate::websocket::types::{RoomMessagePayload, WsMessage};
use uuid::Uuid;

#[derive(Clone)]
pub struct ChatService {
    repo: ChatRepository,
    rooms: RoomManager,
}

/// Tail-anchored pagination: page 1 is the newest `limit` messages, higher
/// pages walk backward in time. Returns `(offset, limit)` into the
/// oldest-first sequence, or `None` when the window is empty.
pub(crate) fn tail_window(total: i64, page: u32, limit: u32) -> Option<(i64, i64)> {
    let page = i64::from(page);
    let limit = i64::from(limit);

    let upper = total - (page - 1) * limit;
    if upper <= 0 {
        return None;
    }
    let lower = (total - page * limit).max(0);

    Some((lower, upper - lower))
}

impl ChatService {
    pub fn new(repo: ChatRepository, rooms: RoomManager) -> Self {
        Self { repo, rooms }
    }

    /// An unstarted conversation is valid state: a missing chat yields an
    /// empty page with `total = 0`, never an error.
    pub async fn get_history(
        &self,
        listing_type: ListingType,
        listing_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<ChatMessage>, i64)> {
        let Some(chat) = self.repo.find_by_listing(listing_type, listing_id).await? else {
            return Ok((Vec::new(), 0));
        };

        let total = self.repo.count_messages(chat.id).await?;
        match tail_window(total, page, limit) {
            Some((offset, window)) => {
                let messages = self
                    .repo
                    .find_message_window(chat.id, window, offset)
                    .await?;
                Ok((messages, total))
            }
            None => Ok((Vec::new(), total)),
        }
    }

    /// Persist a message, creating the chat on first send, then publish the
    /// durable copy to the listing's room so connected participants see it
    /// without re-fetching. The broadcast rides on the same append that
    /// persists the message; a relay failure never unwinds the append.
    pub async fn send_message(
        &self,
        listing_type: ListingType,
        listing_id: &str,
        user_id: Uuid,
        owner_id: Uuid,
        sender_id: Uuid,
        kind: MessageKind,
        content: &str,
    ) -> Result<(Chat, ChatMessage)> {
        let chat = self
            .repo
            .find_or_create(listing_type, listing_id, user_id, owner_id)
            .await?;

        let message = self
            .repo
            .append_message(chat.id, sender_id, kind, content)
            .await?;

        let payload = WsMessage::ChatMessage(RoomMessagePayload {
            listing_type,
            listing_id: listing_id.to_string(),
            user_id: chat.user_id,
            owner_id: chat.owner_id,
            message: serde_json::to_value(ChatMessageResponse::from(message.clone()))
                .unwrap_or(serde_json::Value::Null),
        });
        self.rooms
            .broadcast(&room_key(listing_type, listing_id), payload);

        Ok((chat, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;
    use tokio::sync::mpsc;

    fn service(pool: PgPool) -> ChatService {
        ChatService::new(ChatRepository::new(pool), RoomManager::new())
    }

    #[test]
    fn test_empty_chat_has_no_window() {
        assert_eq!(tail_window(0, 1, 30), None);
        assert_eq!(tail_window(0, 7, 5), None);
    }

    #[test]
    fn test_page_one_holds_the_newest_messages() {
        // 100 messages, limit 30: page 1 is messages 70..100.
        assert_eq!(tail_window(100, 1, 30), Some((70, 30)));
        assert_eq!(tail_window(100, 2, 30), Some((40, 30)));
    }

    #[test]
    fn test_short_history_fits_in_page_one() {
        assert_eq!(tail_window(5, 1, 30), Some((0, 5)));
    }

    #[test]
    fn test_out_of_range_page_is_empty_not_negative() {
        // total <= (page-1)*limit: the window is empty.
        assert_eq!(tail_window(5, 2, 30), None);
        assert_eq!(tail_window(30, 2, 30), None);
    }

    #[test]
    fn test_last_page_clamps_to_start() {
        // 100 messages, limit 30: page 4 is the oldest 10.
        assert_eq!(tail_window(100, 4, 30), Some((0, 10)));
    }

    #[test]
    fn test_exact_multiple_pages() {
        assert_eq!(tail_window(60, 1, 30), Some((30, 30)));
        assert_eq!(tail_window(60, 2, 30), Some((0, 30)));
        assert_eq!(tail_window(60, 3, 30), None);
    }

    #[sqlx::test]
    async fn test_unstarted_conversation_reads_empty(pool: PgPool) {
        let service = service(pool);

        let (messages, total) = service
            .get_history(ListingType::Marketplace, "nobody-wrote-here", 3, 10)
            .await
            .unwrap();

        assert!(messages.is_empty());
        assert_eq!(total, 0);
    }

    #[sqlx::test]
    async fn test_two_sends_by_different_users_both_persist(pool: PgPool) {
        let service = service(pool);
        let buyer = Uuid::new_v4();
        let owner = Uuid::new_v4();

        let (chat, first) = service
            .send_message(
                ListingType::Adoption,
                "p1",
                buyer,
                owner,
                buyer,
                MessageKind::Text,
                "Is p1 still available?",
            )
            .await
            .unwrap();
        assert_eq!(chat.user_id, buyer);
        assert_eq!(chat.owner_id, owner);
        assert_eq!(first.sender_id, buyer);

        // Second send reuses the same chat: one conversation per listing.
        let (chat_again, second) = service
            .send_message(
                ListingType::Adoption,
                "p1",
                buyer,
                owner,
                owner,
                MessageKind::Text,
                "Yes!",
            )
            .await
            .unwrap();
        assert_eq!(chat_again.id, chat.id);
        assert_eq!(second.sender_id, owner);

        let (messages, total) = service
            .get_history(ListingType::Adoption, "p1", 1, 30)
            .await
            .unwrap();

        assert_eq!(total, 2);
        assert_eq!(messages.len(), 2);
        // Oldest first.
        assert_eq!(messages[0].content, "Is p1 still available?");
        assert_eq!(messages[0].sender_id, buyer);
        assert_eq!(messages[1].content, "Yes!");
        assert_eq!(messages[1].sender_id, owner);
        assert!(messages[0].created_at <= messages[1].created_at);
    }

    #[sqlx::test]
    async fn test_out_of_range_page_reads_empty_window(pool: PgPool) {
        let service = service(pool);
        let buyer = Uuid::new_v4();
        let owner = Uuid::new_v4();

        service
            .send_message(
                ListingType::Adoption,
                "p2",
                buyer,
                owner,
                buyer,
                MessageKind::Text,
                "hello",
            )
            .await
            .unwrap();

        let (messages, total) = service
            .get_history(ListingType::Adoption, "p2", 2, 30)
            .await
            .unwrap();

        assert!(messages.is_empty());
        assert_eq!(total, 1);
    }

    #[sqlx::test]
    async fn test_listing_types_do_not_share_chats(pool: PgPool) {
        let service = service(pool);
        let buyer = Uuid::new_v4();
        let owner = Uuid::new_v4();

        let (adoption_chat, _) = service
            .send_message(
                ListingType::Adoption,
                "42",
                buyer,
                owner,
                buyer,
                MessageKind::Text,
                "about the adoption post",
            )
            .await
            .unwrap();
        let (marketplace_chat, _) = service
            .send_message(
                ListingType::Marketplace,
                "42",
                buyer,
                owner,
                buyer,
                MessageKind::Text,
                "about the product",
            )
            .await
            .unwrap();

        assert_ne!(adoption_chat.id, marketplace_chat.id);

        let (messages, total) = service
            .get_history(ListingType::Adoption, "42", 1, 30)
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(messages[0].content, "about the adoption post");
    }

    #[sqlx::test]
    async fn test_append_publishes_to_the_listing_room(pool: PgPool) {
        let rooms = RoomManager::new();
        let service = ChatService::new(ChatRepository::new(pool), rooms.clone());
        let buyer = Uuid::new_v4();
        let owner = Uuid::new_v4();

        let (tx, mut rx) = mpsc::unbounded_channel();
        rooms.join(
            &room_key(ListingType::Adoption, "p1"),
            Uuid::new_v4(),
            tx,
        );

        service
            .send_message(
                ListingType::Adoption,
                "p1",
                buyer,
                owner,
                buyer,
                MessageKind::Text,
                "Is p1 still available?",
            )
            .await
            .unwrap();

        let relayed = rx.recv().await.expect("room member should receive the send");
        match relayed {
            WsMessage::ChatMessage(payload) => {
                assert_eq!(payload.listing_id, "p1");
                assert_eq!(payload.message["content"], "Is p1 still available?");
            }
            other => panic!("unexpected relay message: {:?}", other),
        }
    }
}
