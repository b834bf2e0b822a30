//! Shared application state.

use std::sync::Arc;

use crate::{
    domain::ConnectionIdFactory,
    usecase::{GetRoomDataUseCase, RoomCoordinator},
};

/// Shared application state
pub struct AppState {
    /// RoomCoordinator（このノードのルームコーディネータ）
    pub coordinator: Arc<RoomCoordinator>,
    /// GetRoomDataUseCase（途中参加者向けスナップショット）
    pub get_room_data_usecase: Arc<GetRoomDataUseCase>,
    /// 接続 ID の採番
    pub connection_ids: Arc<ConnectionIdFactory>,
}
