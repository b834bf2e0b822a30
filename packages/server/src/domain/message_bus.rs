//! ブロードキャストバス trait 定義
//!
//! ノード間で共有する publish/subscribe チャンネルへのインターフェース。
//! ゲームイベントの中継と、相互排他プロトコルのメッセージ送受信に使います。

use std::fmt;

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::BusError;

/// バスからの受信側
///
/// ペイロードは JSON 文字列のまま流れます。解釈は受信側で行い、
/// 壊れたメッセージはそこで破棄されます。
pub type BusSubscription = broadcast::Receiver<String>;

/// バスのチャンネル
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusChannel {
    /// ルーム単位のゲームイベントの中継
    Global,
    /// 相互排他プロトコル（REQUEST / RESPONSE / ANNOUNCE）
    Protocol,
    /// ハートビート
    Heartbeat,
}

impl BusChannel {
    pub const ALL: [BusChannel; 3] = [BusChannel::Global, BusChannel::Protocol, BusChannel::Heartbeat];

    /// 外部バス上のチャンネル名
    pub fn name(&self) -> &'static str {
        match self {
            BusChannel::Global => "global",
            BusChannel::Protocol => "ra_channel",
            BusChannel::Heartbeat => "ra_heartbeat",
        }
    }
}

impl fmt::Display for BusChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Broadcast Bus trait
///
/// 配送は at-least-once、順序保証は送信者ごとの FIFO までを前提とします。
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// チャンネルにメッセージを publish（自ノードの購読者にも届く）
    async fn publish(&self, channel: BusChannel, payload: String) -> Result<(), BusError>;

    /// チャンネルを購読
    fn subscribe(&self, channel: BusChannel) -> BusSubscription;
}
