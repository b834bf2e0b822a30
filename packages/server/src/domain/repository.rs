//! 共有ストア trait 定義
//!
//! 全ノードから見えるルーム状態（参加者・履歴・出題者・答え・ラウンド）への
//! インターフェースを定義します。具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! ## キー構成（外部ストアとの契約）
//!
//! | キー                  | 型             | 内容                         |
//! |-----------------------|----------------|------------------------------|
//! | `rooms`               | set            | 有効なルーム ID              |
//! | `participants:{room}` | list           | 参加者 `{name, score}`       |
//! | `chat:{room}`         | list           | チャット履歴 `{name, message}` |
//! | `drawing:{room}`      | list           | 描画ストローク               |
//! | `drawer:{room}`       | scalar         | 出題者名（存在 = 出題中）    |
//! | `answer:{room}`       | scalar         | 答え（小文字）               |
//! | `roomRound:{room}`    | scalar         | ラウンド ID                  |
//! | `roundStart:{room}`   | scalar         | ラウンド開始時刻（ミリ秒）   |
//!
//! `drawer` / `answer` / `roomRound` / `roundStart` は [`ActiveRound`] としてまとめて
//! 読み書きし、片方だけが存在する状態を作りません。
//! ラウンドの終了は `roomRound` を比較してから消す 1 回の操作で、
//! 外部ストアでは MULTI/EXEC かスクリプトで実装します。

use async_trait::async_trait;

use super::{
    ActiveRound, ChatEntry, DrawingStroke, Participant, RoomId, RoundId, StoreError, UserName,
};

/// Shared State Store trait
///
/// UseCase 層はこの trait に依存し、Infrastructure 層の具体的な実装には依存しない。
/// ストアは相互排他の結果のキャッシュであり、描く権利の調停者ではありません。
/// ただしラウンドの終了だけは [`SharedStore::end_round_if`] の比較削除で 1 回に絞ります。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SharedStore: Send + Sync {
    /// `rooms` にルームを登録。既に存在した場合は `false`
    async fn add_room(&self, room_id: &RoomId) -> Result<bool, StoreError>;

    /// ルームが登録済みか
    async fn room_exists(&self, room_id: &RoomId) -> Result<bool, StoreError>;

    /// 参加者を末尾に追加
    async fn add_participant(
        &self,
        room_id: &RoomId,
        participant: Participant,
    ) -> Result<(), StoreError>;

    /// 名前が一致する最初の参加者を削除
    async fn remove_participant(&self, room_id: &RoomId, name: &UserName)
    -> Result<(), StoreError>;

    /// 参加者リスト（登録順）
    async fn participants(&self, room_id: &RoomId) -> Result<Vec<Participant>, StoreError>;

    /// 参加者のスコアを 1 加算し、新しいスコアを返す。参加者がいなければ `None`
    async fn increment_score(
        &self,
        room_id: &RoomId,
        name: &UserName,
    ) -> Result<Option<u32>, StoreError>;

    /// チャット履歴に追記
    async fn push_chat(&self, room_id: &RoomId, entry: ChatEntry) -> Result<(), StoreError>;

    /// チャット履歴
    async fn chat_history(&self, room_id: &RoomId) -> Result<Vec<ChatEntry>, StoreError>;

    /// 描画履歴に追記
    async fn push_stroke(&self, room_id: &RoomId, stroke: DrawingStroke)
    -> Result<(), StoreError>;

    /// 描画履歴
    async fn drawing_history(&self, room_id: &RoomId) -> Result<Vec<DrawingStroke>, StoreError>;

    /// 進行中のラウンド（出題者・答え・ラウンド ID）
    async fn active_round(&self, room_id: &RoomId) -> Result<Option<ActiveRound>, StoreError>;

    /// 出題者・答え・ラウンド ID をまとめて設定
    async fn start_round(&self, room_id: &RoomId, round: ActiveRound) -> Result<(), StoreError>;

    /// ラウンド ID が一致するときだけラウンドを終了
    ///
    /// 出題者・答え・ラウンド ID とチャット・描画履歴を 1 回の操作で削除し、
    /// `true` を返します。ラウンドが既に終わっている、または別のラウンドに
    /// 置き換わっていれば何も変えずに `false` を返します。
    /// 同じラウンドを複数のノードが同時に終わらせても `true` を受け取るのは 1 つだけです。
    async fn end_round_if(&self, room_id: &RoomId, round_id: RoundId) -> Result<bool, StoreError>;
}
