//! バスメッセージの受信
//!
//! - `global`: 他ノードが中継したゲームイベントをローカルの参加者に配る
//! - `ra_channel` / `ra_heartbeat`: 相互排他プロトコルと生存確認
//!
//! 壊れたメッセージや未知のメッセージはログに残して破棄し、他のルームの状態には触れません。

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;

use crate::{
    domain::{BusChannel, BusSubscription, NodeId, PeerRequestDecision, RoomId},
    infrastructure::dto::bus::{ProtocolMessage, RelayEnvelope},
    usecase::error::CoordinatorError,
};

use super::RoomCoordinator;

/// 全チャンネルの購読を 1 つのループで処理する
pub(super) async fn run_bus_loop(
    coordinator: Arc<RoomCoordinator>,
    mut global: BusSubscription,
    mut protocol: BusSubscription,
    mut heartbeat: BusSubscription,
) {
    loop {
        let (channel, result) = tokio::select! {
            result = global.recv() => (BusChannel::Global, result),
            result = protocol.recv() => (BusChannel::Protocol, result),
            result = heartbeat.recv() => (BusChannel::Heartbeat, result),
        };
        match result {
            Ok(payload) => {
                if let Err(e) = coordinator.handle_bus_message(channel, &payload).await {
                    tracing::warn!("[{}] {}", coordinator.node_id, e);
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(
                    "[{}] Bus subscriber on '{}' lagged, {} message(s) skipped",
                    coordinator.node_id,
                    channel,
                    skipped
                );
            }
            Err(RecvError::Closed) => {
                tracing::info!(
                    "[{}] Bus channel '{}' closed, stopping bus loop",
                    coordinator.node_id,
                    channel
                );
                break;
            }
        }
    }
}

impl RoomCoordinator {
    /// バスから受信したメッセージを処理
    pub async fn handle_bus_message(
        &self,
        channel: BusChannel,
        payload: &str,
    ) -> Result<(), CoordinatorError> {
        match channel {
            BusChannel::Global => {
                let envelope = RelayEnvelope::parse(payload)
                    .map_err(|e| malformed(channel, e.to_string()))?;
                self.deliver_relayed(envelope).await
            }
            BusChannel::Protocol | BusChannel::Heartbeat => {
                let message = ProtocolMessage::parse(payload)
                    .map_err(|e| malformed(channel, e.to_string()))?;
                self.handle_protocol_message(channel, message).await
            }
        }
    }

    /// 他ノードが中継したイベントをローカルの参加者に配る
    async fn deliver_relayed(&self, envelope: RelayEnvelope) -> Result<(), CoordinatorError> {
        if envelope.instance_id == self.node_id {
            return Ok(());
        }
        let room_id = RoomId::new(envelope.global_room_id)
            .map_err(|e| malformed(BusChannel::Global, e.to_string()))?;

        let targets = self.rooms.lock().await.members(&room_id);
        if targets.is_empty() {
            return Ok(());
        }
        if let Err(e) = self.pusher.broadcast(targets, &envelope.event.to_json()).await {
            tracing::warn!("[{}] Relay delivery to '{}' failed: {}", self.node_id, room_id, e);
        }
        Ok(())
    }

    async fn handle_protocol_message(
        &self,
        channel: BusChannel,
        message: ProtocolMessage,
    ) -> Result<(), CoordinatorError> {
        let sender = message.node_id();
        if sender == self.node_id {
            return Ok(());
        }
        self.observe_peer(sender).await;

        match message {
            ProtocolMessage::Request {
                room_id,
                node_id,
                timestamp,
                user_name,
            } => {
                self.lamport.witness(timestamp);
                let room_id = RoomId::new(room_id).map_err(|e| malformed(channel, e.to_string()))?;
                let _room = self.lock_room(&room_id).await;

                let decision = self
                    .engine
                    .lock()
                    .await
                    .on_peer_request(&room_id, node_id, timestamp);
                match decision {
                    PeerRequestDecision::Grant => {
                        self.publish_grant(&room_id, node_id, Some(timestamp)).await;
                    }
                    PeerRequestDecision::Defer => {
                        tracing::debug!(
                            "[{}] Deferred request of '{}' from {} in '{}' (t={})",
                            self.node_id,
                            user_name,
                            node_id,
                            room_id,
                            timestamp
                        );
                    }
                }
            }
            ProtocolMessage::Response {
                room_id,
                node_id,
                request_node_id,
                request_timestamp,
            } => {
                if request_node_id != self.node_id {
                    return Ok(());
                }
                let room_id = RoomId::new(room_id).map_err(|e| malformed(channel, e.to_string()))?;
                let _room = self.lock_room(&room_id).await;

                let recorded =
                    self.engine
                        .lock()
                        .await
                        .record_grant(&room_id, node_id, request_timestamp);
                if recorded {
                    tracing::debug!(
                        "[{}] Grant from {} for '{}'",
                        self.node_id,
                        node_id,
                        room_id
                    );
                    self.try_enter_critical_section(&room_id).await;
                }
            }
            ProtocolMessage::NodeAnnounce { .. } | ProtocolMessage::Heartbeat { .. } => {}
        }
        Ok(())
    }

    /// ピアからのメッセージを観測し、初めて見るノードなら発見時の処理を行う
    async fn observe_peer(&self, peer: NodeId) {
        let now = self.clock.now_millis();
        let discovered = self.membership.lock().await.observe(peer, now);
        if !discovered {
            return;
        }

        tracing::info!("[{}] Discovered node {}", self.node_id, peer);

        // 新しいノードに自分の存在を知らせる
        self.announce_presence().await;

        // 未解決の要求は新しいノードの許可も必要になるので送り直す
        let pending = self.engine.lock().await.pending_requests();
        for (room_id, request) in pending {
            let message = ProtocolMessage::Request {
                room_id: room_id.to_string(),
                node_id: self.node_id,
                timestamp: request.timestamp,
                user_name: request.requester.user_name.to_string(),
            };
            if let Err(e) = self.bus.publish(BusChannel::Protocol, message.to_json()).await {
                tracing::warn!(
                    "[{}] Could not re-publish request for '{}': {}",
                    self.node_id,
                    room_id,
                    e
                );
            }
        }
    }

    /// `RA_RESPONSE`（許可）を publish
    pub(super) async fn publish_grant(
        &self,
        room_id: &RoomId,
        to: NodeId,
        request_timestamp: Option<u64>,
    ) {
        let response = ProtocolMessage::Response {
            room_id: room_id.to_string(),
            node_id: self.node_id,
            request_node_id: to,
            request_timestamp,
        };
        if let Err(e) = self.bus.publish(BusChannel::Protocol, response.to_json()).await {
            tracing::warn!(
                "[{}] Could not publish grant to {} for '{}': {}",
                self.node_id,
                to,
                room_id,
                e
            );
        }
    }
}

fn malformed(channel: BusChannel, reason: String) -> CoordinatorError {
    CoordinatorError::MalformedMessage {
        channel: channel.to_string(),
        reason,
    }
}
