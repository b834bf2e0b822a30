//! 値オブジェクト
//!
//! ルーム ID・ユーザー名・ノード ID など、ドメイン全体で使う識別子を定義します。
//! 生成時にバリデーションを行い、不正な値がドメイン層に入り込まないようにします。

use std::{
    fmt,
    str::FromStr,
    sync::atomic::{AtomicU64, Ordering},
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ValueObjectError;

/// ルーム ID の最大長
pub const ROOM_ID_MAX_LENGTH: usize = 32;

/// 生成されるルーム ID の長さ
pub const GENERATED_ROOM_ID_LENGTH: usize = 6;

/// ユーザー名の最大長（文字数）
pub const USER_NAME_MAX_LENGTH: usize = 64;

/// ルーム ID
///
/// ASCII 英数字のみ、1〜32 文字。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.is_empty() || value.len() > ROOM_ID_MAX_LENGTH {
            return Err(ValueObjectError::InvalidRoomId(value));
        }
        if !value.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ValueObjectError::InvalidRoomId(value));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for RoomId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// ルーム ID の生成器
///
/// v4 UUID を 36 進数に変換し、先頭 6 文字をルーム ID として使います。
pub struct RoomIdFactory;

impl RoomIdFactory {
    pub fn generate() -> RoomId {
        let encoded = to_base36(Uuid::new_v4().as_u128());
        let short: String = encoded.chars().take(GENERATED_ROOM_ID_LENGTH).collect();
        // base36 の文字しか含まないので常に妥当
        RoomId(short)
    }
}

fn to_base36(mut value: u128) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::with_capacity(25);
    while value > 0 {
        buf.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    buf.reverse();
    String::from_utf8_lossy(&buf).into_owned()
}

/// 参加者のユーザー名
///
/// 前後の空白を除いて 1 文字以上、64 文字以下。
/// ルーム内での一意性は HTTP 側（`/room/data`）で確認します。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserName(String);

impl UserName {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.trim().is_empty() || value.chars().count() > USER_NAME_MAX_LENGTH {
            return Err(ValueObjectError::InvalidUserName(value));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for UserName {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// コーディネータノードの ID
///
/// プロセス起動ごとにランダムに採番されます。順序は優先度の比較
/// （同じ論理タイムスタンプ同士のタイブレーク）に使われます。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Uuid);

impl NodeId {
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl FromStr for NodeId {
    type Err = ValueObjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| ValueObjectError::InvalidNodeId(s.to_string()))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// ラウンド ID
///
/// 出題者の割り当てごとに採番され、タイムアウトの照合に使われます。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoundId(Uuid);

impl RoundId {
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// ローカルな WebSocket 接続の ID
///
/// 接続受付時に採番されるプロセス内で一意なトークン。
/// 接続オブジェクトそのものではなく、この ID をマップのキーにします。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// 接続 ID の採番器
#[derive(Debug)]
pub struct ConnectionIdFactory {
    next: AtomicU64,
}

impl Default for ConnectionIdFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionIdFactory {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn generate(&self) -> ConnectionId {
        ConnectionId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}
