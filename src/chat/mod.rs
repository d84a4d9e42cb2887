pub mod chat_dto;
pub mod chat_handlers;
pub mod chat_models;
pub mod chat_repository;
pub mod chat_service;

pub use chat_models::{Chat, ChatMessage, ListingType, MessageKind};
pub use chat_repository::ChatRepository;
pub use chat_service::ChatService;
