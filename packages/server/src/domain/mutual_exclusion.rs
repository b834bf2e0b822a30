//! 相互排他エンジン（Ricart–Agrawala 方式）
//!
//! ルームごとに「描く権利」をただ 1 人の要求者に与えるための状態機械です。
//! 中央のロックマネージャは持たず、既知の全ピアから許可（RESPONSE）を
//! 集めた時点でクリティカルセクションに入ります。
//!
//! この型は I/O を行いません。メッセージの送受信やストアの更新は
//! 呼び出し側（コーディネータ）が、ここで返された判断に従って行います。
//!
//! ## 優先度
//!
//! `(論理タイムスタンプ, ノード ID)` の辞書順で小さい方が優先されます。
//! 自ノードの方が優先される要求に対しては許可を保留（defer）し、
//! クリティカルセクションを抜けるときにまとめて許可します。

use std::collections::{HashMap, HashSet};

use super::{ConnectionId, NodeId, RoomId, UserName};

/// 描く権利を要求しているローカルの接続
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub connection_id: ConnectionId,
    pub user_name: UserName,
}

/// 未解決の要求
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub requester: Requester,
    pub timestamp: u64,
    granted: HashSet<NodeId>,
}

impl PendingRequest {
    /// 許可を送ってきたノード
    pub fn granted(&self) -> &HashSet<NodeId> {
        &self.granted
    }

    /// 生存している全ノードから許可を得たか
    fn has_quorum(&self, live_nodes: &HashSet<NodeId>) -> bool {
        live_nodes.iter().all(|node| self.granted.contains(node))
    }
}

/// ピアからの REQUEST に対する判断
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerRequestDecision {
    /// 直ちに RESPONSE を返す
    Grant,
    /// 自ノードが優先されるので保留する
    Defer,
}

/// 保留中の許可（要求元ノードと、その要求のタイムスタンプ）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeferredGrant {
    pub node: NodeId,
    pub request_timestamp: u64,
}

/// `own` が `other` より優先されるか
pub fn has_priority(own: (u64, NodeId), other: (u64, NodeId)) -> bool {
    own < other
}

/// ルームごとの相互排他の状態
#[derive(Debug)]
pub struct MutualExclusion {
    node_id: NodeId,
    pending: HashMap<RoomId, PendingRequest>,
    deferred: HashMap<RoomId, HashMap<NodeId, u64>>,
}

impl MutualExclusion {
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            pending: HashMap::new(),
            deferred: HashMap::new(),
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// このノードがルームの権利を要求中か
    pub fn is_requesting(&self, room_id: &RoomId) -> bool {
        self.pending.contains_key(room_id)
    }

    pub fn pending(&self, room_id: &RoomId) -> Option<&PendingRequest> {
        self.pending.get(room_id)
    }

    /// 要求を開始。既に要求中なら `false` を返し、何も変更しない
    pub fn begin(&mut self, room_id: RoomId, requester: Requester, timestamp: u64) -> bool {
        if self.pending.contains_key(&room_id) {
            return false;
        }
        self.pending.insert(
            room_id,
            PendingRequest {
                requester,
                timestamp,
                granted: HashSet::new(),
            },
        );
        true
    }

    /// ピアの REQUEST を処理
    pub fn on_peer_request(
        &mut self,
        room_id: &RoomId,
        peer: NodeId,
        peer_timestamp: u64,
    ) -> PeerRequestDecision {
        match self.pending.get(room_id) {
            Some(own) if has_priority((own.timestamp, self.node_id), (peer_timestamp, peer)) => {
                self.deferred
                    .entry(room_id.clone())
                    .or_default()
                    .insert(peer, peer_timestamp);
                PeerRequestDecision::Defer
            }
            _ => PeerRequestDecision::Grant,
        }
    }

    /// ピアからの RESPONSE を記録
    ///
    /// 要求中でない、または別の要求への応答（タイムスタンプ不一致）の場合は
    /// 無視して `false`。同じノードからの重複も `false`。
    pub fn record_grant(
        &mut self,
        room_id: &RoomId,
        from: NodeId,
        request_timestamp: Option<u64>,
    ) -> bool {
        let Some(pending) = self.pending.get_mut(room_id) else {
            return false;
        };
        if request_timestamp.is_some_and(|ts| ts != pending.timestamp) {
            return false;
        }
        pending.granted.insert(from)
    }

    /// 故障したノードからの許可を注入する。要求中でなければ `false`
    pub fn record_failed_node(&mut self, room_id: &RoomId, failed: NodeId) -> bool {
        match self.pending.get_mut(room_id) {
            Some(pending) => {
                pending.granted.insert(failed);
                true
            }
            None => false,
        }
    }

    /// 定足数に達していればクリティカルセクションに入る
    ///
    /// 入った場合は要求を取り除いて返します（要求中フラグのクリア）。
    pub fn try_enter(
        &mut self,
        room_id: &RoomId,
        live_nodes: &HashSet<NodeId>,
    ) -> Option<PendingRequest> {
        if self.pending.get(room_id)?.has_quorum(live_nodes) {
            self.pending.remove(room_id)
        } else {
            None
        }
    }

    /// ルームの要求を取り消す
    pub fn cancel(&mut self, room_id: &RoomId) -> Option<PendingRequest> {
        self.pending.remove(room_id)
    }

    /// 指定した接続の要求であれば取り消す
    pub fn cancel_for(
        &mut self,
        room_id: &RoomId,
        connection_id: ConnectionId,
    ) -> Option<PendingRequest> {
        match self.pending.get(room_id) {
            Some(pending) if pending.requester.connection_id == connection_id => {
                self.pending.remove(room_id)
            }
            _ => None,
        }
    }

    /// 保留していた許可を取り出す（クリティカルセクションからの退出時）
    pub fn take_deferred(&mut self, room_id: &RoomId) -> Vec<DeferredGrant> {
        let mut grants: Vec<DeferredGrant> = self
            .deferred
            .remove(room_id)
            .unwrap_or_default()
            .into_iter()
            .map(|(node, request_timestamp)| DeferredGrant {
                node,
                request_timestamp,
            })
            .collect();
        grants.sort_by_key(|grant| (grant.request_timestamp, grant.node));
        grants
    }

    /// 要求中のルーム
    pub fn requesting_rooms(&self) -> Vec<RoomId> {
        let mut rooms: Vec<RoomId> = self.pending.keys().cloned().collect();
        rooms.sort();
        rooms
    }

    /// 要求中のルームと要求内容（再送用）
    pub fn pending_requests(&self) -> Vec<(RoomId, PendingRequest)> {
        let mut requests: Vec<(RoomId, PendingRequest)> = self
            .pending
            .iter()
            .map(|(room, pending)| (room.clone(), pending.clone()))
            .collect();
        requests.sort_by(|a, b| a.0.cmp(&b.0));
        requests
    }
}
