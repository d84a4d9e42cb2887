use std::sync::Arc;

use crate::{chat::chat_service::ChatService, websocket::RoomManager};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub rooms: RoomManager,
    pub chat_service: ChatService,
}

#[derive(Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            jwt_secret: std::env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            jwt_expiration_hours: std::env::var("JWT_EXPIRATION_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .expect("JWT_EXPIRATION_HOURS must be a number"),
        }
    }
}
