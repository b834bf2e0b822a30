//! HTTP and WebSocket surface of a coordinator node.

mod handler;
mod server;
mod signal;
pub mod state;

pub use server::Server;
pub use signal::shutdown_signal;
