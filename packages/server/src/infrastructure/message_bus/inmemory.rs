//! In-memory message bus using tokio broadcast channels
//!
//! One broadcast channel per [`BusChannel`]. Every subscriber, including the
//! publishing node itself, receives every message; nodes filter their own
//! traffic by node id. Can be swapped for an external pub/sub service when nodes
//! run in separate processes.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;

use crate::domain::{BusChannel, BusError, BusSubscription, MessageBus};

/// Default per-channel buffer size
pub const BUS_CAPACITY: usize = 1024;

pub struct InMemoryMessageBus {
    global: broadcast::Sender<String>,
    protocol: broadcast::Sender<String>,
    heartbeat: broadcast::Sender<String>,
}

impl InMemoryMessageBus {
    pub fn new() -> Self {
        Self::with_capacity(BUS_CAPACITY)
    }

    /// Create with custom per-channel capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (global, _) = broadcast::channel(capacity);
        let (protocol, _) = broadcast::channel(capacity);
        let (heartbeat, _) = broadcast::channel(capacity);
        Self {
            global,
            protocol,
            heartbeat,
        }
    }

    fn sender(&self, channel: BusChannel) -> &broadcast::Sender<String> {
        match channel {
            BusChannel::Global => &self.global,
            BusChannel::Protocol => &self.protocol,
            BusChannel::Heartbeat => &self.heartbeat,
        }
    }

    /// Number of active subscribers on a channel
    pub fn subscriber_count(&self, channel: BusChannel) -> usize {
        self.sender(channel).receiver_count()
    }
}

impl Default for InMemoryMessageBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBus for InMemoryMessageBus {
    async fn publish(&self, channel: BusChannel, payload: String) -> Result<(), BusError> {
        // send() returns error if there are no receivers, which is fine
        if let Err(e) = self.sender(channel).send(payload) {
            debug!("Bus publish on '{}' (no receivers): {}", channel, e);
        }
        Ok(())
    }

    fn subscribe(&self, channel: BusChannel) -> BusSubscription {
        self.sender(channel).subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber_of_the_channel() {
        // テスト項目: publish したメッセージは同じチャンネルの全購読者に届く
        // given (前提条件):
        let bus = InMemoryMessageBus::new();
        let mut first = bus.subscribe(BusChannel::Protocol);
        let mut second = bus.subscribe(BusChannel::Protocol);

        // when (操作):
        let result = bus.publish(BusChannel::Protocol, "ping".to_string()).await;

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(first.recv().await.unwrap(), "ping");
        assert_eq!(second.recv().await.unwrap(), "ping");
    }

    #[tokio::test]
    async fn test_channels_are_isolated() {
        // テスト項目: 別チャンネルのメッセージは届かない
        // given (前提条件):
        let bus = InMemoryMessageBus::new();
        let mut heartbeat = bus.subscribe(BusChannel::Heartbeat);

        // when (操作):
        bus.publish(BusChannel::Global, "relay".to_string())
            .await
            .unwrap();

        // then (期待する結果):
        assert!(heartbeat.try_recv().is_err());
        assert_eq!(bus.subscriber_count(BusChannel::Heartbeat), 1);
        assert_eq!(bus.subscriber_count(BusChannel::Global), 0);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        // テスト項目: 購読者がいなくても publish は成功する
        let bus = InMemoryMessageBus::new();

        let result = bus.publish(BusChannel::Global, "nobody".to_string()).await;

        assert!(result.is_ok());
    }
}
