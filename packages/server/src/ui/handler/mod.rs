//! Request handlers.

mod http;
mod websocket;

pub use http::{get_room_data, health_check};
pub use websocket::websocket_handler;
