//! UseCase: ルームコーディネータ
//!
//! 1 ノード分のコーディネータです。ローカル接続からのイベント、バスからのメッセージ、
//! ハートビート・故障検知・ラウンドタイマーの各 tick を受け取り、
//! 共有ストア・バス・クライアントへの送信を組み合わせて処理します。
//!
//! ## 排他制御
//!
//! ルームの状態（要求・保留・ラウンド）に触れる処理は、ルームごとの非同期ロックを
//! 取ってから実行します（ルーム単位の単一書き込み者）。ロックの順序は常に
//! ルームロック → 内部状態（相互排他エンジン、メンバーシップ、インデックス）で、
//! 内部状態のロックは await をまたいで保持しません。
//!
//! ## モジュール構成
//!
//! - `room`: ルーム作成・参加・退出
//! - `chat`: チャット・回答判定・ストローク
//! - `drawing_rights`: 描く権利の要求とクリティカルセクション、ラウンド終了
//! - `failure_detector`: ハートビートと故障ノードの検出
//! - `relay`: バスメッセージの受信と中継

mod chat;
mod drawing_rights;
mod failure_detector;
mod relay;
mod room;


use std::{collections::HashMap, sync::Arc};

use pictionary_shared::time::Clock;
use tokio::{
    sync::{Mutex, OwnedMutexGuard},
    task::JoinHandle,
};

use crate::{
    config::CoordinatorConfig,
    domain::{
        BusChannel, ConnectionHandle, ConnectionId, DrawingStroke, LamportClock, LocalRoomIndex,
        MessageBus, MessagePusher, MutualExclusion, NodeId, NodeMembership, PusherChannel, RoomId,
        RoundTimers, SharedStore, WordSource,
    },
    infrastructure::dto::{
        bus::RelayEnvelope,
        websocket::{ClientEvent, ServerEvent},
    },
};

use super::error::CoordinatorError;

/// ルームコーディネータ
pub struct RoomCoordinator {
    node_id: NodeId,
    config: CoordinatorConfig,
    store: Arc<dyn SharedStore>,
    bus: Arc<dyn MessageBus>,
    pusher: Arc<dyn MessagePusher>,
    words: Arc<dyn WordSource>,
    clock: Arc<dyn Clock>,
    lamport: LamportClock,
    membership: Mutex<NodeMembership>,
    engine: Mutex<MutualExclusion>,
    rooms: Mutex<LocalRoomIndex>,
    room_locks: Mutex<HashMap<RoomId, Arc<Mutex<()>>>>,
    timers: Mutex<RoundTimers>,
}

impl RoomCoordinator {
    pub fn new(
        node_id: NodeId,
        config: CoordinatorConfig,
        store: Arc<dyn SharedStore>,
        bus: Arc<dyn MessageBus>,
        pusher: Arc<dyn MessagePusher>,
        words: Arc<dyn WordSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            node_id,
            config,
            store,
            bus,
            pusher,
            words,
            clock,
            lamport: LamportClock::new(),
            membership: Mutex::new(NodeMembership::new()),
            engine: Mutex::new(MutualExclusion::new(node_id)),
            rooms: Mutex::new(LocalRoomIndex::new()),
            room_locks: Mutex::new(HashMap::new()),
            timers: Mutex::new(RoundTimers::new()),
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// 現在の論理時計の値
    pub fn logical_time(&self) -> u64 {
        self.lamport.current()
    }

    /// 生存しているとみなしているピアの数（自ノードを含まない）
    pub async fn live_node_count(&self) -> usize {
        self.membership.lock().await.len()
    }

    /// ローカル接続がいるルームの数
    pub async fn local_room_count(&self) -> usize {
        self.rooms.lock().await.room_count()
    }

    /// 接続が参加しているルーム
    pub async fn room_of(&self, connection_id: ConnectionId) -> Option<RoomId> {
        self.rooms.lock().await.room_of(connection_id).cloned()
    }

    /// 新しい接続を受け付ける
    pub async fn connect(&self, handle: &ConnectionHandle, sender: PusherChannel) {
        self.pusher.register_client(handle.id, sender).await;
        tracing::info!(
            "[{}] '{}' connected as {}",
            self.node_id,
            handle.user_name,
            handle.id
        );
    }

    /// 接続の切断（ルームからの退出と送信チャンネルの解除）
    pub async fn disconnect(&self, handle: &ConnectionHandle) {
        if let Err(e) = self.remove_user(handle).await {
            tracing::warn!(
                "[{}] Failed to remove '{}' on disconnect: {}",
                self.node_id,
                handle.user_name,
                e
            );
        }
        self.pusher.unregister_client(handle.id).await;
        tracing::info!(
            "[{}] '{}' disconnected ({})",
            self.node_id,
            handle.user_name,
            handle.id
        );
    }

    /// クライアントイベントを処理
    pub async fn handle_client_event(
        &self,
        handle: &ConnectionHandle,
        event: ClientEvent,
    ) -> Result<(), CoordinatorError> {
        match event {
            ClientEvent::Create => self.create_room(handle).await.map(|_| ()),
            ClientEvent::Join { room_id } => self.join_room(handle, room_id).await,
            ClientEvent::Remove => self.remove_user(handle).await,
            ClientEvent::Chat { chat_message } => self.receive_chat(handle, chat_message).await,
            ClientEvent::Draw => self.request_drawing_rights(handle).await,
            ClientEvent::Drawing { drawing_data } => {
                self.receive_stroke(handle, DrawingStroke::from(drawing_data))
                    .await
            }
        }
    }

    /// バス購読とタイマーのバックグラウンドタスクを起動
    ///
    /// 購読はこの関数が戻る前に確立されます。
    pub fn spawn_background_tasks(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        let global = self.bus.subscribe(BusChannel::Global);
        let protocol = self.bus.subscribe(BusChannel::Protocol);
        let heartbeat = self.bus.subscribe(BusChannel::Heartbeat);

        let mut tasks = Vec::with_capacity(4);
        tasks.push(tokio::spawn(relay::run_bus_loop(
            Arc::clone(self),
            global,
            protocol,
            heartbeat,
        )));

        let coordinator = Arc::clone(self);
        tasks.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(coordinator.config.heartbeat_interval);
            loop {
                interval.tick().await;
                coordinator.emit_heartbeat().await;
            }
        }));

        let coordinator = Arc::clone(self);
        tasks.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(coordinator.config.heartbeat_interval);
            loop {
                interval.tick().await;
                coordinator.sweep_failed_nodes().await;
            }
        }));

        let coordinator = Arc::clone(self);
        tasks.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(coordinator.config.timer_tick);
            loop {
                interval.tick().await;
                coordinator.fire_due_round_timeouts().await;
            }
        }));

        tasks
    }

    /// ルームのロックを取得
    async fn lock_room(&self, room_id: &RoomId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.room_locks.lock().await;
            Arc::clone(locks.entry(room_id.clone()).or_default())
        };
        lock.lock_owned().await
    }

    /// 特定の接続にイベントを送信
    async fn send_to(&self, connection_id: ConnectionId, event: &ServerEvent) {
        if let Err(e) = self.pusher.push_to(connection_id, &event.to_json()).await {
            tracing::warn!("[{}] Failed to send to {}: {}", self.node_id, connection_id, e);
        }
    }

    /// ルームにイベントを配信
    ///
    /// ローカルの参加者（`except` を除く）に直接送り、他ノード向けにバスへ中継します。
    async fn broadcast_to_room(
        &self,
        room_id: &RoomId,
        event: ServerEvent,
        except: Option<ConnectionId>,
    ) {
        let targets = self.rooms.lock().await.members_except(room_id, except);
        if let Err(e) = self.pusher.broadcast(targets, &event.to_json()).await {
            tracing::warn!("[{}] Local broadcast to '{}' failed: {}", self.node_id, room_id, e);
        }

        let envelope = RelayEnvelope {
            event,
            global_room_id: room_id.to_string(),
            instance_id: self.node_id,
        };
        if let Err(e) = self.bus.publish(BusChannel::Global, envelope.to_json()).await {
            tracing::warn!("[{}] Relay to '{}' failed: {}", self.node_id, room_id, e);
        }
    }
}
