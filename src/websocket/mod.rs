pub mod handler;
pub mod rooms;
pub mod types;

pub use handler::ws_handler;
pub use rooms::{room_key, RoomManager};
