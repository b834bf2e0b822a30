//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

use super::websocket::DrawingStrokeDto;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntryDto {
    pub name: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantDto {
    pub name: String,
    pub score: u32,
}

/// Response body of `GET /room/data/{room_id}`
///
/// Serialized with a `status` field of `"success"` or `"error"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RoomDataResponse {
    Success {
        chat: Vec<ChatEntryDto>,
        drawing: Vec<DrawingStrokeDto>,
        /// Current drawer, `"No drawer"` when no round is running
        drawer: String,
        participants: Vec<ParticipantDto>,
    },
    Error {
        message: String,
    },
}

/// Response body of `GET /api/health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    pub live_nodes: usize,
    pub local_rooms: usize,
}
