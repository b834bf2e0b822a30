//! 故障検知
//!
//! 一定間隔でハートビートを publish し、ハートビート間隔の 3 倍以上沈黙したピアを
//! 故障とみなします。故障したノードは既知ノードから外し、要求中の全ルームに
//! そのノードからの許可を注入して定足数を判定し直します。

use crate::{
    domain::{BusChannel, NodeId},
    infrastructure::dto::bus::ProtocolMessage,
};

use super::RoomCoordinator;

impl RoomCoordinator {
    /// `RA_HEARTBEAT` を publish（タイムスタンプは壁時計で、論理時計は進めない）
    pub async fn emit_heartbeat(&self) {
        let heartbeat = ProtocolMessage::Heartbeat {
            node_id: self.node_id,
            timestamp: self.clock.now_millis(),
        };
        if let Err(e) = self.bus.publish(BusChannel::Heartbeat, heartbeat.to_json()).await {
            tracing::warn!("[{}] Could not publish heartbeat: {}", self.node_id, e);
        }
    }

    /// `RA_NODE_ANNOUNCE` を publish
    pub async fn announce_presence(&self) {
        let announce = ProtocolMessage::NodeAnnounce {
            node_id: self.node_id,
        };
        if let Err(e) = self.bus.publish(BusChannel::Protocol, announce.to_json()).await {
            tracing::warn!("[{}] Could not announce presence: {}", self.node_id, e);
        }
    }

    /// 沈黙したピアを故障として扱う
    ///
    /// 故障と判定したノードを返します。
    pub async fn sweep_failed_nodes(&self) -> Vec<NodeId> {
        let now = self.clock.now_millis();
        let failed = self
            .membership
            .lock()
            .await
            .expire(now, self.config.failure_timeout_millis());
        if failed.is_empty() {
            return failed;
        }

        for node in &failed {
            tracing::warn!("[{}] Node {} failed (no heartbeat)", self.node_id, node);
        }

        let rooms = self.engine.lock().await.requesting_rooms();
        for room_id in rooms {
            let _room = self.lock_room(&room_id).await;
            {
                let mut engine = self.engine.lock().await;
                for node in &failed {
                    engine.record_failed_node(&room_id, *node);
                }
            }
            self.try_enter_critical_section(&room_id).await;
        }
        failed
    }
}
