use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::chat::chat_models::ListingType;
use crate::websocket::types::WsMessage;

pub type WsSender = mpsc::UnboundedSender<WsMessage>;

/// Room key for a listing's conversation.
pub fn room_key(listing_type: ListingType, listing_id: &str) -> String {
    format!("{}_{}", listing_type, listing_id)
}

/// Ephemeral room membership. A room exists from the first join and is
/// dropped when its last connection leaves; nothing here is durable. The
/// membership table is private to this type — callers get `join`,
/// `remove_connection` and `broadcast` only.
#[derive(Clone, Default)]
pub struct RoomManager {
    rooms: Arc<DashMap<String, HashMap<Uuid, WsSender>>>,
}

impl RoomManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&self, room: &str, connection_id: Uuid, tx: WsSender) {
        self.rooms
            .entry(room.to_string())
            .or_default()
            .insert(connection_id, tx);
        tracing::debug!("Connection {} joined room {}", connection_id, room);
    }

    /// Drop a connection from every room it joined, deleting rooms that
    /// become empty.
    pub fn remove_connection(&self, connection_id: &Uuid) {
        self.rooms.retain(|_, members| {
            members.remove(connection_id);
            !members.is_empty()
        });
    }

    /// Fan a payload out to every connection in the room, the sender
    /// included. Sends are fire-and-forget; a closed receiver is ignored
    /// and cleaned up when its connection task exits.
    pub fn broadcast(&self, room: &str, message: WsMessage) {
        if let Some(members) = self.rooms.get(room) {
            for tx in members.values() {
                let _ = tx.send(message.clone());
            }
        }
    }
}
