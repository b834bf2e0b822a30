//! WebSocket message DTOs.
//!
//! Every frame is a JSON object whose `type` field selects the variant.
//! Unknown `type` tags fail to parse and are dropped by the caller.

use serde::{Deserialize, Serialize};

/// A drawing stroke on the wire: flattened `[x0, y0, x1, y1, ...]` plus tension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingStrokeDto {
    pub points: Vec<f64>,
    pub tension: f64,
}

/// Events sent from a client to the coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientEvent {
    /// Create a new room and join it
    Create,
    /// Join an existing room
    Join { room_id: String },
    /// Leave the current room
    Remove,
    /// Chat message (or a guess while a round is running)
    Chat { chat_message: String },
    /// Request the right to draw
    Draw,
    /// A stroke from the current drawer
    Drawing { drawing_data: DrawingStrokeDto },
}

impl ClientEvent {
    /// Parse a client event from a text frame
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Events sent from the coordinator to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerEvent {
    Created {
        room_id: String,
    },
    Chat {
        user_name: String,
        chat_message: String,
    },
    Drawing {
        drawing_data: DrawingStrokeDto,
    },
    DrawFailure {
        message: String,
    },
    DrawSuccess {
        pictionary_word: String,
    },
    Drawer {
        user_name: String,
    },
    DrawerLeft,
    Score {
        user_name: String,
        correct_word: String,
    },
    RoundTimeout,
    ParticipantJoined {
        user_name: String,
    },
    ParticipantLeft {
        user_name: String,
    },
}

impl ServerEvent {
    /// Serialize the event to a JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
