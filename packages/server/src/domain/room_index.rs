//! ローカルルームインデックス
//!
//! このノードに接続しているクライアントについて、接続 → ルーム と
//! ルーム → 接続集合 の対応を保持します。全参加者の一覧は共有ストアが正です。

use std::collections::{HashMap, HashSet};

use super::{ConnectionId, RoomId};

#[derive(Debug, Default)]
pub struct LocalRoomIndex {
    room_of: HashMap<ConnectionId, RoomId>,
    members: HashMap<RoomId, HashSet<ConnectionId>>,
}

impl LocalRoomIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// 接続をルームに割り当てる。以前のルームがあれば外して返す
    pub fn assign(&mut self, connection_id: ConnectionId, room_id: RoomId) -> Option<RoomId> {
        let previous = self.remove(connection_id);
        self.members
            .entry(room_id.clone())
            .or_default()
            .insert(connection_id);
        self.room_of.insert(connection_id, room_id);
        previous
    }

    pub fn room_of(&self, connection_id: ConnectionId) -> Option<&RoomId> {
        self.room_of.get(&connection_id)
    }

    /// 接続をインデックスから外し、所属していたルームを返す
    pub fn remove(&mut self, connection_id: ConnectionId) -> Option<RoomId> {
        let room_id = self.room_of.remove(&connection_id)?;
        if let Some(members) = self.members.get_mut(&room_id) {
            members.remove(&connection_id);
            if members.is_empty() {
                self.members.remove(&room_id);
            }
        }
        Some(room_id)
    }

    /// ルームに所属するローカル接続（ID 順）
    pub fn members(&self, room_id: &RoomId) -> Vec<ConnectionId> {
        self.members_except(room_id, None)
    }

    /// ルームに所属するローカル接続のうち `except` 以外
    pub fn members_except(
        &self,
        room_id: &RoomId,
        except: Option<ConnectionId>,
    ) -> Vec<ConnectionId> {
        let mut members: Vec<ConnectionId> = self
            .members
            .get(room_id)
            .map(|set| {
                set.iter()
                    .copied()
                    .filter(|id| Some(*id) != except)
                    .collect()
            })
            .unwrap_or_default();
        members.sort();
        members
    }

    /// ローカル接続が 1 つ以上あるルームの数
    pub fn room_count(&self) -> usize {
        self.members.len()
    }
}
