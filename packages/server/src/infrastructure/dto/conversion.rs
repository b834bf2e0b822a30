//! Conversion logic between DTOs and domain entities.

use crate::domain::entity;
use crate::infrastructure::dto::{http, websocket as dto};

// ========================================
// DTO → Domain Entity
// ========================================

impl From<dto::DrawingStrokeDto> for entity::DrawingStroke {
    fn from(dto: dto::DrawingStrokeDto) -> Self {
        Self {
            points: dto.points,
            tension: dto.tension,
        }
    }
}

// ========================================
// Domain Entity → DTO
// ========================================

impl From<entity::DrawingStroke> for dto::DrawingStrokeDto {
    fn from(model: entity::DrawingStroke) -> Self {
        Self {
            points: model.points,
            tension: model.tension,
        }
    }
}

impl From<entity::ChatEntry> for http::ChatEntryDto {
    fn from(model: entity::ChatEntry) -> Self {
        Self {
            name: model.name.into_string(),
            message: model.message,
        }
    }
}

impl From<entity::Participant> for http::ParticipantDto {
    fn from(model: entity::Participant) -> Self {
        Self {
            name: model.name.into_string(),
            score: model.score,
        }
    }
}
