//! UseCase 層
//!
//! - `coordinator`: ルームコーディネータ（参加・チャット・描く権利・故障検知・中継）
//! - `get_room_data`: 途中参加者向けのルームスナップショット

pub mod coordinator;
pub mod error;
pub mod get_room_data;

pub use coordinator::RoomCoordinator;
pub use error::{CoordinatorError, DrawRejection, RoomDataError};
pub use get_room_data::{GetRoomDataUseCase, RoomSnapshot};
