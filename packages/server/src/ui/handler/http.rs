//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::{
    infrastructure::dto::http::{HealthResponse, RoomDataResponse},
    ui::state::AppState,
    usecase::{RoomDataError, RoomSnapshot},
};

const NO_DRAWER: &str = "No drawer";

/// Query parameters for the room snapshot
#[derive(Debug, Deserialize)]
pub struct RoomDataQuery {
    pub user_name: Option<String>,
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let coordinator = &state.coordinator;
    Json(HealthResponse {
        status: "ok".to_string(),
        node_id: coordinator.node_id().to_string(),
        live_nodes: coordinator.live_node_count().await,
        local_rooms: coordinator.local_room_count().await,
    })
}

/// Snapshot of a room for a client about to join it
pub async fn get_room_data(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    Query(query): Query<RoomDataQuery>,
) -> (StatusCode, Json<RoomDataResponse>) {
    let result = state
        .get_room_data_usecase
        .execute(&room_id, query.user_name.as_deref())
        .await;

    match result {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot_to_response(snapshot))),
        Err(e @ (RoomDataError::MissingUserName | RoomDataError::InvalidRoom)) => {
            (StatusCode::BAD_REQUEST, Json(error_response(&e)))
        }
        Err(e @ RoomDataError::DuplicateUserName) => (StatusCode::OK, Json(error_response(&e))),
        Err(RoomDataError::Store(e)) => {
            tracing::error!("Room data for '{}' unavailable: {}", room_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(RoomDataResponse::Error {
                    message: "Room data is temporarily unavailable".to_string(),
                }),
            )
        }
    }
}

fn error_response(error: &RoomDataError) -> RoomDataResponse {
    RoomDataResponse::Error {
        message: error.to_string(),
    }
}

// Domain Model から DTO への変換
fn snapshot_to_response(snapshot: RoomSnapshot) -> RoomDataResponse {
    RoomDataResponse::Success {
        chat: snapshot.chat.into_iter().map(Into::into).collect(),
        drawing: snapshot.drawing.into_iter().map(Into::into).collect(),
        drawer: snapshot.drawer.unwrap_or_else(|| NO_DRAWER.to_string()),
        participants: snapshot.participants.into_iter().map(Into::into).collect(),
    }
}
