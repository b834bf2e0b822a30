//! ノードメンバーシップ
//!
//! 生存しているピアノードの集合。静的には設定せず、ハートビートや
//! プロトコルメッセージを観測したときに発見します。

use std::collections::{HashMap, HashSet};

use super::NodeId;

/// 既知のピアノードと最終観測時刻
///
/// 自ノードは含みません。
#[derive(Debug, Default)]
pub struct NodeMembership {
    last_seen: HashMap<NodeId, i64>,
}

impl NodeMembership {
    pub fn new() -> Self {
        Self::default()
    }

    /// ピアを観測した。初めて見るノードなら `true`
    pub fn observe(&mut self, node: NodeId, now_millis: i64) -> bool {
        self.last_seen.insert(node, now_millis).is_none()
    }

    /// 既知の生存ノード
    pub fn live_nodes(&self) -> HashSet<NodeId> {
        self.last_seen.keys().copied().collect()
    }

    pub fn is_known(&self, node: &NodeId) -> bool {
        self.last_seen.contains_key(node)
    }

    pub fn len(&self) -> usize {
        self.last_seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_seen.is_empty()
    }

    /// `timeout_millis` より長く観測されていないノードを取り除いて返す
    pub fn expire(&mut self, now_millis: i64, timeout_millis: i64) -> Vec<NodeId> {
        let mut failed: Vec<NodeId> = self
            .last_seen
            .iter()
            .filter(|(_, seen)| now_millis - **seen > timeout_millis)
            .map(|(node, _)| *node)
            .collect();
        failed.sort();
        for node in &failed {
            self.last_seen.remove(node);
        }
        failed
    }
}
