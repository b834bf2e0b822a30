//! UseCase: ルームスナップショットの取得
//!
//! 途中参加するクライアントが WebSocket で参加する前に呼び出します。
//! ルームの存在とユーザー名の重複を確認し、チャット・描画履歴・出題者・参加者を返します。

use std::sync::Arc;

use crate::domain::{ChatEntry, DrawingStroke, Participant, RoomId, SharedStore};

use super::error::RoomDataError;

/// ルームのスナップショット
#[derive(Debug, Clone, PartialEq)]
pub struct RoomSnapshot {
    pub chat: Vec<ChatEntry>,
    pub drawing: Vec<DrawingStroke>,
    /// 出題中でなければ `None`
    pub drawer: Option<String>,
    pub participants: Vec<Participant>,
}

/// ルームスナップショット取得のユースケース
pub struct GetRoomDataUseCase {
    store: Arc<dyn SharedStore>,
}

impl GetRoomDataUseCase {
    pub fn new(store: Arc<dyn SharedStore>) -> Self {
        Self { store }
    }

    /// スナップショットを取得
    ///
    /// # Arguments
    ///
    /// * `room_id` - パスで指定されたルーム ID（未検証）
    /// * `user_name` - 参加しようとしているユーザー名
    pub async fn execute(
        &self,
        room_id: &str,
        user_name: Option<&str>,
    ) -> Result<RoomSnapshot, RoomDataError> {
        let user_name = user_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or(RoomDataError::MissingUserName)?;

        let room_id =
            RoomId::new(room_id.to_string()).map_err(|_| RoomDataError::InvalidRoom)?;
        if !self.store.room_exists(&room_id).await? {
            return Err(RoomDataError::InvalidRoom);
        }

        let participants = self.store.participants(&room_id).await?;
        if participants.iter().any(|p| p.name.as_str() == user_name) {
            return Err(RoomDataError::DuplicateUserName);
        }

        let chat = self.store.chat_history(&room_id).await?;
        let drawing = self.store.drawing_history(&room_id).await?;
        let drawer = self
            .store
            .active_round(&room_id)
            .await?
            .map(|round| round.drawer.into_string());

        Ok(RoomSnapshot {
            chat,
            drawing,
            drawer,
            participants,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ActiveRound, MockSharedStore, RoundId, StoreError, UserName},
        infrastructure::repository::InMemorySharedStore,
    };

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - GetRoomDataUseCase::execute() の検証順序と返却内容
    //
    // 【なぜこのテストが必要か】
    // - 途中参加者はこのスナップショットでキャンバスとチャットを復元する
    // - ユーザー名の重複チェックはここでしか行われない
    //
    // 【どのようなシナリオをテストするか】
    // 1. ユーザー名なし・存在しないルーム・重複ユーザー名の拒否
    // 2. 出題中ルームのスナップショット
    // 3. ストア障害の伝播
    // ========================================

    fn name(value: &str) -> UserName {
        UserName::new(value.to_string()).unwrap()
    }

    async fn create_room_with_alice() -> (Arc<InMemorySharedStore>, RoomId) {
        let store = Arc::new(InMemorySharedStore::new());
        let room_id = RoomId::new("ab12cd".to_string()).unwrap();
        store.add_room(&room_id).await.unwrap();
        store
            .add_participant(&room_id, Participant::new(name("alice")))
            .await
            .unwrap();
        (store, room_id)
    }

    #[tokio::test]
    async fn test_rejects_missing_user_name() {
        // テスト項目: ユーザー名がない・空白のみの場合は MissingUserName
        // given (前提条件):
        let (store, _) = create_room_with_alice().await;
        let usecase = GetRoomDataUseCase::new(store);

        // when (操作):
        let missing = usecase.execute("ab12cd", None).await;
        let blank = usecase.execute("ab12cd", Some("  ")).await;

        // then (期待する結果):
        assert_eq!(missing, Err(RoomDataError::MissingUserName));
        assert_eq!(blank, Err(RoomDataError::MissingUserName));
    }

    #[tokio::test]
    async fn test_rejects_unknown_room() {
        // テスト項目: 登録されていないルーム・不正なルーム ID は InvalidRoom
        // given (前提条件):
        let (store, _) = create_room_with_alice().await;
        let usecase = GetRoomDataUseCase::new(store);

        // when (操作):
        let unknown = usecase.execute("zzzzzz", Some("bob")).await;
        let invalid = usecase.execute("not/a/room", Some("bob")).await;

        // then (期待する結果):
        assert_eq!(unknown, Err(RoomDataError::InvalidRoom));
        assert_eq!(invalid, Err(RoomDataError::InvalidRoom));
    }

    #[tokio::test]
    async fn test_rejects_duplicate_user_name() {
        // テスト項目: ルームに同名の参加者がいれば DuplicateUserName
        // given (前提条件):
        let (store, _) = create_room_with_alice().await;
        let usecase = GetRoomDataUseCase::new(store);

        // when (操作):
        let result = usecase.execute("ab12cd", Some("alice")).await;

        // then (期待する結果):
        assert_eq!(result, Err(RoomDataError::DuplicateUserName));
    }

    #[tokio::test]
    async fn test_returns_snapshot_with_drawer() {
        // テスト項目: 出題中のルームでは履歴・出題者・参加者が返る
        // given (前提条件):
        let (store, room_id) = create_room_with_alice().await;
        store
            .push_chat(
                &room_id,
                ChatEntry {
                    name: name("alice"),
                    message: "hello".to_string(),
                },
            )
            .await
            .unwrap();
        store
            .push_stroke(
                &room_id,
                DrawingStroke {
                    points: vec![1.0, 1.0, 2.0, 2.0],
                    tension: 0.5,
                },
            )
            .await
            .unwrap();
        store
            .start_round(
                &room_id,
                ActiveRound {
                    drawer: name("alice"),
                    answer: "cat".to_string(),
                    round_id: RoundId::new_random(),
                    started_at: 0,
                },
            )
            .await
            .unwrap();
        let usecase = GetRoomDataUseCase::new(store);

        // when (操作):
        let snapshot = usecase.execute("ab12cd", Some("bob")).await.unwrap();

        // then (期待する結果):
        assert_eq!(snapshot.chat.len(), 1);
        assert_eq!(snapshot.drawing.len(), 1);
        assert_eq!(snapshot.drawer.as_deref(), Some("alice"));
        assert_eq!(snapshot.participants.len(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_is_propagated() {
        // テスト項目: ストア障害は Store エラーとして返る
        // given (前提条件):
        let mut store = MockSharedStore::new();
        store
            .expect_room_exists()
            .returning(|_| Err(StoreError::Unavailable("connection refused".to_string())));
        let usecase = GetRoomDataUseCase::new(Arc::new(store));

        // when (操作):
        let result = usecase.execute("ab12cd", Some("bob")).await;

        // then (期待する結果):
        assert!(matches!(result, Err(RoomDataError::Store(_))));
    }
}
