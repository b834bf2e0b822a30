//! UseCase 層のエラー型

use thiserror::Error;

use crate::domain::{BusError, StoreError, ValueObjectError};

/// コーディネータの操作エラー
///
/// クライアントには通知されず、ログに記録されます。
/// 描く権利の要求に対する拒否は [`DrawRejection`] としてクライアントに返します。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinatorError {
    #[error("Connection is not in any room")]
    NotInRoom,

    #[error("Room '{0}' does not exist")]
    RoomNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValueObjectError),

    #[error("Could not allocate a unique room id after {0} attempts")]
    RoomIdExhausted(usize),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Bus(#[from] BusError),

    #[error("Malformed bus message on '{channel}': {reason}")]
    MalformedMessage { channel: String, reason: String },
}

/// 描く権利の要求が拒否された理由（`DRAW_FAILURE` の `message`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DrawRejection {
    #[error("User is not in any room")]
    NotInRoom,

    #[error("Someone is already drawing")]
    AlreadyDrawing,

    #[error("Another user is currently requesting drawing rights")]
    RequestPending,

    #[error("The round ended before drawing rights were granted")]
    RoundEnded,

    #[error("Drawing rights are temporarily unavailable")]
    Unavailable,
}

impl DrawRejection {
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// ルームスナップショット取得のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomDataError {
    #[error("Username required in query params")]
    MissingUserName,

    #[error("Room ID is not valid")]
    InvalidRoom,

    #[error("Username already exists for this room")]
    DuplicateUserName,

    #[error(transparent)]
    Store(#[from] StoreError),
}
