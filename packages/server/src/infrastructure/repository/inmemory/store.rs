//! InMemory Shared Store 実装
//!
//! ドメイン層が定義する SharedStore trait の具体的な実装。
//! 同一プロセス内の複数ノードが `Arc` で共有し、外部のキーバリューストアの代わりに使います。
//!
//! ルーム ID 集合（`rooms`）とルームごとのレコードは独立しています。
//! 外部ストアと同じく、`rooms` に登録されていないルームにも参加者や履歴を書き込めます。

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    ActiveRound, ChatEntry, DrawingStroke, Participant, RoomId, RoundId, SharedStore, StoreError,
    UserName,
};

#[derive(Debug, Default)]
struct RoomRecord {
    participants: Vec<Participant>,
    chat: Vec<ChatEntry>,
    drawing: Vec<DrawingStroke>,
    round: Option<ActiveRound>,
}

#[derive(Debug, Default)]
struct StoreState {
    rooms: HashSet<RoomId>,
    records: HashMap<RoomId, RoomRecord>,
}

/// インメモリ共有ストア
#[derive(Debug, Default)]
pub struct InMemorySharedStore {
    state: Mutex<StoreState>,
}

impl InMemorySharedStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SharedStore for InMemorySharedStore {
    async fn add_room(&self, room_id: &RoomId) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        Ok(state.rooms.insert(room_id.clone()))
    }

    async fn room_exists(&self, room_id: &RoomId) -> Result<bool, StoreError> {
        let state = self.state.lock().await;
        Ok(state.rooms.contains(room_id))
    }

    async fn add_participant(
        &self,
        room_id: &RoomId,
        participant: Participant,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state
            .records
            .entry(room_id.clone())
            .or_default()
            .participants
            .push(participant);
        Ok(())
    }

    async fn remove_participant(&self, room_id: &RoomId, name: &UserName) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if let Some(record) = state.records.get_mut(room_id) {
            record.participants.retain(|p| &p.name != name);
        }
        Ok(())
    }

    async fn participants(&self, room_id: &RoomId) -> Result<Vec<Participant>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .records
            .get(room_id)
            .map(|record| record.participants.clone())
            .unwrap_or_default())
    }

    async fn increment_score(
        &self,
        room_id: &RoomId,
        name: &UserName,
    ) -> Result<Option<u32>, StoreError> {
        let mut state = self.state.lock().await;
        let participant = state
            .records
            .get_mut(room_id)
            .and_then(|record| record.participants.iter_mut().find(|p| &p.name == name));
        Ok(participant.map(|p| {
            p.score = p.score.saturating_add(1);
            p.score
        }))
    }

    async fn push_chat(&self, room_id: &RoomId, entry: ChatEntry) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.records.entry(room_id.clone()).or_default().chat.push(entry);
        Ok(())
    }

    async fn chat_history(&self, room_id: &RoomId) -> Result<Vec<ChatEntry>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .records
            .get(room_id)
            .map(|record| record.chat.clone())
            .unwrap_or_default())
    }

    async fn push_stroke(&self, room_id: &RoomId, stroke: DrawingStroke) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state
            .records
            .entry(room_id.clone())
            .or_default()
            .drawing
            .push(stroke);
        Ok(())
    }

    async fn drawing_history(&self, room_id: &RoomId) -> Result<Vec<DrawingStroke>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .records
            .get(room_id)
            .map(|record| record.drawing.clone())
            .unwrap_or_default())
    }

    async fn active_round(&self, room_id: &RoomId) -> Result<Option<ActiveRound>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .records
            .get(room_id)
            .and_then(|record| record.round.clone()))
    }

    async fn start_round(&self, room_id: &RoomId, round: ActiveRound) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.records.entry(room_id.clone()).or_default().round = Some(round);
        Ok(())
    }

    async fn end_round_if(&self, room_id: &RoomId, round_id: RoundId) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let Some(record) = state.records.get_mut(room_id) else {
            return Ok(false);
        };
        if record.round.as_ref().map(|round| round.round_id) != Some(round_id) {
            return Ok(false);
        }
        record.round = None;
        record.chat.clear();
        record.drawing.clear();
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - InMemorySharedStore のルーム登録・参加者・履歴・ラウンドの読み書き
    //
    // 【なぜこのテストが必要か】
    // - 全ノードが共有する状態の唯一の置き場所
    // - ラウンドの終了処理（スコア加算・履歴消去）が正しく反映されることを保証する
    //
    // 【どのようなシナリオをテストするか】
    // 1. ルーム登録の重複検出
    // 2. 参加者の追加・削除・スコア加算
    // 3. 履歴の追記
    // 4. ラウンドの開始と、ラウンド ID を比較した終了（同じラウンドの終了は 1 回だけ成功）
    // ========================================

    fn room(id: &str) -> RoomId {
        RoomId::new(id.to_string()).unwrap()
    }

    fn name(value: &str) -> UserName {
        UserName::new(value.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_add_room_detects_existing_room() {
        // テスト項目: 同じルーム ID の 2 回目の登録は false を返す
        // given (前提条件):
        let store = InMemorySharedStore::new();

        // when (操作):
        let first = store.add_room(&room("ab12cd")).await.unwrap();
        let second = store.add_room(&room("ab12cd")).await.unwrap();

        // then (期待する結果):
        assert!(first);
        assert!(!second);
        assert!(store.room_exists(&room("ab12cd")).await.unwrap());
        assert!(!store.room_exists(&room("zzzzzz")).await.unwrap());
    }

    #[tokio::test]
    async fn test_participants_keep_order_and_scores() {
        // テスト項目: 参加者は登録順に並び、スコア加算は対象の参加者だけに反映される
        // given (前提条件):
        let store = InMemorySharedStore::new();
        let room_id = room("ab12cd");
        store
            .add_participant(&room_id, Participant::new(name("alice")))
            .await
            .unwrap();
        store
            .add_participant(&room_id, Participant::new(name("bob")))
            .await
            .unwrap();

        // when (操作):
        let score = store.increment_score(&room_id, &name("bob")).await.unwrap();
        let missing = store.increment_score(&room_id, &name("carol")).await.unwrap();

        // then (期待する結果):
        assert_eq!(score, Some(1));
        assert_eq!(missing, None);
        let participants = store.participants(&room_id).await.unwrap();
        assert_eq!(participants.len(), 2);
        assert_eq!(participants[0].name, name("alice"));
        assert_eq!(participants[0].score, 0);
        assert_eq!(participants[1].score, 1);
    }

    #[tokio::test]
    async fn test_remove_participant() {
        // テスト項目: 参加者を削除すると一覧から消える
        // given (前提条件):
        let store = InMemorySharedStore::new();
        let room_id = room("ab12cd");
        store
            .add_participant(&room_id, Participant::new(name("alice")))
            .await
            .unwrap();

        // when (操作):
        store.remove_participant(&room_id, &name("alice")).await.unwrap();
        store.remove_participant(&room("other"), &name("alice")).await.unwrap();

        // then (期待する結果):
        assert!(store.participants(&room_id).await.unwrap().is_empty());
    }

    fn round(drawer: &str) -> ActiveRound {
        ActiveRound {
            drawer: name(drawer),
            answer: "cat".to_string(),
            round_id: RoundId::new_random(),
            started_at: 1_700_000_000_000,
        }
    }

    #[tokio::test]
    async fn test_end_round_clears_round_and_history_but_keeps_participants() {
        // テスト項目: ラウンドの終了で出題者・答え・履歴が消え、参加者は残る
        // given (前提条件):
        let store = InMemorySharedStore::new();
        let room_id = room("ab12cd");
        let round = round("alice");
        store
            .add_participant(&room_id, Participant::new(name("alice")))
            .await
            .unwrap();
        store.start_round(&room_id, round.clone()).await.unwrap();
        store
            .push_chat(
                &room_id,
                ChatEntry {
                    name: name("alice"),
                    message: "hi".to_string(),
                },
            )
            .await
            .unwrap();
        store
            .push_stroke(
                &room_id,
                DrawingStroke {
                    points: vec![1.0, 2.0],
                    tension: 0.5,
                },
            )
            .await
            .unwrap();
        let during = store.active_round(&room_id).await.unwrap();

        // when (操作):
        let ended = store.end_round_if(&room_id, round.round_id).await.unwrap();

        // then (期待する結果):
        assert_eq!(during, Some(round));
        assert!(ended);
        assert_eq!(store.active_round(&room_id).await.unwrap(), None);
        assert!(store.chat_history(&room_id).await.unwrap().is_empty());
        assert!(store.drawing_history(&room_id).await.unwrap().is_empty());
        assert_eq!(store.participants(&room_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_end_round_succeeds_only_once() {
        // テスト項目: 同じラウンドの終了は最初の 1 回だけが成功する
        // given (前提条件):
        let store = InMemorySharedStore::new();
        let room_id = room("ab12cd");
        let round = round("alice");
        store.start_round(&room_id, round.clone()).await.unwrap();

        // when (操作):
        let first = store.end_round_if(&room_id, round.round_id).await.unwrap();
        let second = store.end_round_if(&room_id, round.round_id).await.unwrap();

        // then (期待する結果):
        assert!(first);
        assert!(!second);
    }

    #[tokio::test]
    async fn test_end_round_ignores_other_round() {
        // テスト項目: 古いラウンド ID での終了は新しいラウンドと履歴に触れない
        // given (前提条件): 1 回目のラウンドが終わり、2 回目のラウンド中にチャットがある
        let store = InMemorySharedStore::new();
        let room_id = room("ab12cd");
        let old = round("alice");
        let current = round("bob");
        store.start_round(&room_id, old.clone()).await.unwrap();
        store.end_round_if(&room_id, old.round_id).await.unwrap();
        store.start_round(&room_id, current.clone()).await.unwrap();
        store
            .push_chat(
                &room_id,
                ChatEntry {
                    name: name("alice"),
                    message: "dog?".to_string(),
                },
            )
            .await
            .unwrap();

        // when (操作):
        let ended = store.end_round_if(&room_id, old.round_id).await.unwrap();
        let unknown_room = store
            .end_round_if(&room("zz99zz"), current.round_id)
            .await
            .unwrap();

        // then (期待する結果):
        assert!(!ended);
        assert!(!unknown_room);
        assert_eq!(store.active_round(&room_id).await.unwrap(), Some(current));
        assert_eq!(store.chat_history(&room_id).await.unwrap().len(), 1);
    }
}
