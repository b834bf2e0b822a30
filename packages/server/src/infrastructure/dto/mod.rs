//! Data Transfer Objects (DTOs) for the pictionary server.
//!
//! DTOs are organized by protocol:
//! - `websocket`: client ⇄ coordinator events
//! - `bus`: inter-node messages (relayed game events and mutual-exclusion protocol)
//! - `http`: room snapshot API responses

pub mod bus;
pub mod conversion;
pub mod http;
pub mod websocket;
