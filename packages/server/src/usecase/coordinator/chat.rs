//! チャット・回答判定・描画ストローク

use crate::{
    domain::{ChatEntry, ConnectionHandle, DrawingStroke},
    infrastructure::dto::websocket::ServerEvent,
    usecase::error::CoordinatorError,
};

use super::RoomCoordinator;

impl RoomCoordinator {
    /// チャットを受信
    ///
    /// ラウンド中は回答として判定し、正解ならラウンドを終了してスコアを加算します。
    /// 同じラウンドへの正解が複数ノードで重なっても、得点するのはラウンドを終了できた 1 人だけです。
    /// 出題者のメッセージは回答にもチャットにもなりません。
    pub async fn receive_chat(
        &self,
        handle: &ConnectionHandle,
        chat_message: String,
    ) -> Result<(), CoordinatorError> {
        let Some(room_id) = self.room_of(handle.id).await else {
            return Err(CoordinatorError::NotInRoom);
        };
        let _room = self.lock_room(&room_id).await;

        if let Some(round) = self.store.active_round(&room_id).await? {
            if round.is_drawer(&handle.user_name) {
                tracing::debug!(
                    "[{}] Dropped chat from drawer '{}' in '{}'",
                    self.node_id,
                    handle.user_name,
                    room_id
                );
                return Ok(());
            }

            if round.is_correct_guess(&chat_message) {
                if !self.end_round(&room_id, round.round_id).await? {
                    // 他ノードでの正解かタイムアウトが先にラウンドを終えた
                    tracing::debug!(
                        "[{}] Late guess from '{}' in '{}' ignored",
                        self.node_id,
                        handle.user_name,
                        room_id
                    );
                    return Ok(());
                }
                let score = self
                    .store
                    .increment_score(&room_id, &handle.user_name)
                    .await?;
                self.broadcast_to_room(
                    &room_id,
                    ServerEvent::Score {
                        user_name: handle.user_name.to_string(),
                        correct_word: round.answer.clone(),
                    },
                    None,
                )
                .await;
                tracing::info!(
                    "[{}] '{}' guessed '{}' in '{}' (score: {:?})",
                    self.node_id,
                    handle.user_name,
                    round.answer,
                    room_id,
                    score
                );
                return Ok(());
            }
        }

        self.store
            .push_chat(
                &room_id,
                ChatEntry {
                    name: handle.user_name.clone(),
                    message: chat_message.clone(),
                },
            )
            .await?;
        self.broadcast_to_room(
            &room_id,
            ServerEvent::Chat {
                user_name: handle.user_name.to_string(),
                chat_message,
            },
            None,
        )
        .await;
        Ok(())
    }

    /// 描画ストロークを受信
    ///
    /// 送信者が現在の出題者のときだけ保存して中継し、それ以外は黙って破棄します。
    pub async fn receive_stroke(
        &self,
        handle: &ConnectionHandle,
        stroke: DrawingStroke,
    ) -> Result<(), CoordinatorError> {
        let Some(room_id) = self.room_of(handle.id).await else {
            return Ok(());
        };
        let _room = self.lock_room(&room_id).await;

        let is_drawer = self
            .store
            .active_round(&room_id)
            .await?
            .is_some_and(|round| round.is_drawer(&handle.user_name));
        if !is_drawer {
            tracing::debug!(
                "[{}] Dropped stroke from non-drawer '{}' in '{}'",
                self.node_id,
                handle.user_name,
                room_id
            );
            return Ok(());
        }

        self.store.push_stroke(&room_id, stroke.clone()).await?;
        self.broadcast_to_room(
            &room_id,
            ServerEvent::Drawing {
                drawing_data: stroke.into(),
            },
            Some(handle.id),
        )
        .await;
        Ok(())
    }
}
