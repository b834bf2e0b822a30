//! ドメイン層のエラー型

use thiserror::Error;

/// 値オブジェクトの生成エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("Invalid room id: '{0}'")]
    InvalidRoomId(String),

    #[error("Invalid user name: '{0}'")]
    InvalidUserName(String),

    #[error("Invalid node id: '{0}'")]
    InvalidNodeId(String),
}

/// 共有ストアのエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// ストアに到達できない
    #[error("Shared store unavailable: {0}")]
    Unavailable(String),

    /// 保存されているレコードが壊れている
    #[error("Corrupt record for key '{key}': {reason}")]
    CorruptRecord { key: String, reason: String },
}

/// ブロードキャストバスのエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("Failed to publish on channel '{channel}': {reason}")]
    PublishFailed { channel: String, reason: String },
}

/// クライアントへのメッセージ送信エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("Connection '{0}' not found")]
    ClientNotFound(String),

    #[error("Failed to push message: {0}")]
    PushFailed(String),
}

/// 辞書の読み込みエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DictionaryError {
    #[error("Dictionary contains no words")]
    Empty,
}
