//! 描く権利の要求・クリティカルセクション・ラウンド終了
//!
//! ## 流れ
//!
//! 1. `request_drawing_rights`: 即時に拒否できる要求（ルーム外・出題中・要求中）を
//!    弾き、論理時計を進めて `RA_REQUEST` を publish。
//!    期限を過ぎても残っているラウンドはここで終了させる
//! 2. ピアからの `RA_RESPONSE` や故障ノードの注入で許可が揃うと
//!    `try_enter_critical_section` がクリティカルセクションに入る
//! 3. `assign_drawer`: 出題者がいないことを再確認してからお題を決めてラウンドを開始し、
//!    保留していた許可を publish してクリティカルセクションを抜ける
//! 4. 正解・出題者の退出・タイムアウトで `end_round` がラウンドを終了する。
//!    ストア上のラウンド ID を比較して消すので、同じラウンドを終わらせるのは 1 回だけ
//!
//! 公開メソッドはルームロックを自分で取ります。
//! `pub(super)` の関数は呼び出し側がルームロックを保持している前提です。

use crate::{
    domain::{
        ActiveRound, BusChannel, ConnectionHandle, ConnectionId, PendingRequest, Requester,
        RoomId, RoundDeadline, RoundId,
    },
    infrastructure::dto::{bus::ProtocolMessage, websocket::ServerEvent},
    usecase::error::{CoordinatorError, DrawRejection},
};

use super::RoomCoordinator;

impl RoomCoordinator {
    /// 描く権利を要求
    ///
    /// 拒否は要求者にだけ `DRAW_FAILURE` で通知され、エラーにはなりません。
    pub async fn request_drawing_rights(
        &self,
        handle: &ConnectionHandle,
    ) -> Result<(), CoordinatorError> {
        let Some(room_id) = self.room_of(handle.id).await else {
            self.reject(handle.id, DrawRejection::NotInRoom).await;
            return Ok(());
        };
        let _room = self.lock_room(&room_id).await;

        let round = match self.store.active_round(&room_id).await {
            Ok(round) => round,
            Err(e) => {
                tracing::error!("[{}] Store unavailable for '{}': {}", self.node_id, room_id, e);
                self.reject(handle.id, DrawRejection::Unavailable).await;
                return Ok(());
            }
        };
        if let Some(round) = round {
            let now = self.clock.now_millis();
            if !round.is_expired(now, self.config.round_timeout_millis()) {
                self.reject(handle.id, DrawRejection::AlreadyDrawing).await;
                return Ok(());
            }
            // 開始したノードが期限前に停止すると、そのタイマーは誰も発火させない
            tracing::warn!(
                "[{}] Round {} in '{}' outlived its timeout, ending it",
                self.node_id,
                round.round_id,
                room_id
            );
            if let Err(e) = self.time_out_round(&room_id, round.round_id).await {
                tracing::error!(
                    "[{}] Failed to end expired round in '{}': {}",
                    self.node_id,
                    room_id,
                    e
                );
                self.reject(handle.id, DrawRejection::Unavailable).await;
                return Ok(());
            }
        }

        let timestamp = {
            let mut engine = self.engine.lock().await;
            if engine.is_requesting(&room_id) {
                drop(engine);
                self.reject(handle.id, DrawRejection::RequestPending).await;
                return Ok(());
            }
            let timestamp = self.lamport.tick();
            engine.begin(
                room_id.clone(),
                Requester {
                    connection_id: handle.id,
                    user_name: handle.user_name.clone(),
                },
                timestamp,
            );
            timestamp
        };

        let request = ProtocolMessage::Request {
            room_id: room_id.to_string(),
            node_id: self.node_id,
            timestamp,
            user_name: handle.user_name.to_string(),
        };
        if let Err(e) = self.bus.publish(BusChannel::Protocol, request.to_json()).await {
            tracing::error!("[{}] Could not publish request for '{}': {}", self.node_id, room_id, e);
            self.engine.lock().await.cancel(&room_id);
            self.reject(handle.id, DrawRejection::Unavailable).await;
            self.flush_deferred(&room_id).await;
            return Ok(());
        }

        tracing::info!(
            "[{}] '{}' requested drawing rights in '{}' at t={}",
            self.node_id,
            handle.user_name,
            room_id,
            timestamp
        );

        // ピアがいなければその場で入れる
        self.try_enter_critical_section(&room_id).await;
        Ok(())
    }

    /// 許可が揃っていればクリティカルセクションに入り、出題者を割り当てる
    pub(super) async fn try_enter_critical_section(&self, room_id: &RoomId) {
        let live_nodes = self.membership.lock().await.live_nodes();
        let entered = self.engine.lock().await.try_enter(room_id, &live_nodes);
        if let Some(pending) = entered {
            tracing::debug!(
                "[{}] Entered critical section for '{}' with grants from {} node(s)",
                self.node_id,
                room_id,
                pending.granted().len()
            );
            self.assign_drawer(room_id, pending).await;
        }
    }

    /// クリティカルセクション内の処理
    ///
    /// 出題者がいないことを再確認してからラウンドを開始します。
    /// 成否にかかわらず、最後に保留していた許可を publish して抜けます。
    async fn assign_drawer(&self, room_id: &RoomId, pending: PendingRequest) {
        let requester = pending.requester;
        match self.start_round(room_id, &requester).await {
            Ok(Some(answer)) => {
                self.send_to(
                    requester.connection_id,
                    &ServerEvent::DrawSuccess {
                        pictionary_word: answer,
                    },
                )
                .await;
                self.broadcast_to_room(
                    room_id,
                    ServerEvent::Drawer {
                        user_name: requester.user_name.to_string(),
                    },
                    Some(requester.connection_id),
                )
                .await;
                tracing::info!(
                    "[{}] '{}' is now drawing in '{}'",
                    self.node_id,
                    requester.user_name,
                    room_id
                );
            }
            Ok(None) => {
                self.reject(requester.connection_id, DrawRejection::AlreadyDrawing)
                    .await;
            }
            Err(e) => {
                tracing::error!(
                    "[{}] Failed to assign drawer in '{}': {}",
                    self.node_id,
                    room_id,
                    e
                );
                self.reject(requester.connection_id, DrawRejection::Unavailable)
                    .await;
            }
        }
        self.flush_deferred(room_id).await;
    }

    /// ラウンドを開始してお題を返す。既に出題者がいれば `None`
    async fn start_round(
        &self,
        room_id: &RoomId,
        requester: &Requester,
    ) -> Result<Option<String>, CoordinatorError> {
        if self.store.active_round(room_id).await?.is_some() {
            return Ok(None);
        }

        let answer = self.words.random_word().to_lowercase();
        let round_id = RoundId::new_random();
        let now = self.clock.now_millis();
        self.store
            .start_round(
                room_id,
                ActiveRound {
                    drawer: requester.user_name.clone(),
                    answer: answer.clone(),
                    round_id,
                    started_at: now,
                },
            )
            .await?;

        let fire_at = now.saturating_add(self.config.round_timeout_millis());
        self.timers.lock().await.schedule(RoundDeadline {
            fire_at,
            room_id: room_id.clone(),
            round_id,
        });
        Ok(Some(answer))
    }

    /// 保留していた許可をまとめて publish
    pub(super) async fn flush_deferred(&self, room_id: &RoomId) {
        let grants = self.engine.lock().await.take_deferred(room_id);
        for grant in grants {
            self.publish_grant(room_id, grant.node, Some(grant.request_timestamp))
                .await;
        }
    }

    /// ラウンドを終了（ストアのラウンドと履歴の消去、描く権利の解放）
    ///
    /// ストア上のラウンド ID が `round_id` と一致したときだけ終了して `true` を返します。
    /// 別の経路（他ノードの正解判定・タイムアウト・出題者の退出）が先に終わらせていれば
    /// 何もせずに `false` を返すので、得点や配信は `true` を受け取った側だけが行います。
    pub(super) async fn end_round(
        &self,
        room_id: &RoomId,
        round_id: RoundId,
    ) -> Result<bool, CoordinatorError> {
        if !self.store.end_round_if(room_id, round_id).await? {
            tracing::debug!(
                "[{}] Round {} in '{}' was already ended",
                self.node_id,
                round_id,
                room_id
            );
            return Ok(false);
        }
        self.release_drawing_rights(room_id).await;
        tracing::info!("[{}] Round ended in '{}'", self.node_id, room_id);
        Ok(true)
    }

    /// 描く権利を解放
    ///
    /// 同じルームでまだ要求中のローカル要求があれば `DRAW_FAILURE` で終わらせ、
    /// 保留していた許可を publish します。
    async fn release_drawing_rights(&self, room_id: &RoomId) {
        let cancelled = self.engine.lock().await.cancel(room_id);
        if let Some(pending) = cancelled {
            self.reject(pending.requester.connection_id, DrawRejection::RoundEnded)
                .await;
        }
        self.flush_deferred(room_id).await;
    }

    /// 期限切れのラウンドを終了し、終わらせたときだけ `ROUND_TIMEOUT` を配信
    async fn time_out_round(
        &self,
        room_id: &RoomId,
        round_id: RoundId,
    ) -> Result<bool, CoordinatorError> {
        if !self.end_round(room_id, round_id).await? {
            return Ok(false);
        }
        self.broadcast_to_room(room_id, ServerEvent::RoundTimeout, None)
            .await;
        tracing::info!("[{}] Round timed out in '{}'", self.node_id, room_id);
        Ok(true)
    }

    /// 期限を迎えたラウンドタイマーを処理
    ///
    /// ストア上のラウンド ID と一致するときだけ `ROUND_TIMEOUT` を配信します。
    pub async fn fire_due_round_timeouts(&self) {
        let now = self.clock.now_millis();
        let due = self.timers.lock().await.pop_due(now);

        for deadline in due {
            let _room = self.lock_room(&deadline.room_id).await;
            match self
                .time_out_round(&deadline.room_id, deadline.round_id)
                .await
            {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!(
                        "[{}] Stale round timer for '{}' ignored",
                        self.node_id,
                        deadline.room_id
                    );
                }
                Err(e) => {
                    tracing::error!(
                        "[{}] Failed to end timed out round in '{}': {}",
                        self.node_id,
                        deadline.room_id,
                        e
                    );
                }
            }
        }
    }

    async fn reject(&self, connection_id: ConnectionId, reason: DrawRejection) {
        tracing::debug!("[{}] Draw request of {} rejected: {}", self.node_id, connection_id, reason);
        self.send_to(
            connection_id,
            &ServerEvent::DrawFailure {
                message: reason.message(),
            },
        )
        .await;
    }
}
