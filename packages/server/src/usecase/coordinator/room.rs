//! ルームの作成・参加・退出

use crate::{
    domain::{ConnectionHandle, Participant, RoomId, RoomIdFactory},
    infrastructure::dto::websocket::ServerEvent,
    usecase::error::CoordinatorError,
};

use super::RoomCoordinator;

/// ルーム ID が衝突したときの再生成回数の上限
pub const ROOM_ID_MAX_ATTEMPTS: usize = 8;

impl RoomCoordinator {
    /// ルームを作成して作成者を参加させ、`CREATED` を返す
    pub async fn create_room(&self, handle: &ConnectionHandle) -> Result<RoomId, CoordinatorError> {
        self.remove_user(handle).await?;

        let room_id = self.allocate_room_id().await?;
        self.add_user_to_room(handle, room_id.clone()).await?;
        self.send_to(
            handle.id,
            &ServerEvent::Created {
                room_id: room_id.to_string(),
            },
        )
        .await;

        tracing::info!(
            "[{}] '{}' created room '{}'",
            self.node_id,
            handle.user_name,
            room_id
        );
        Ok(room_id)
    }

    async fn allocate_room_id(&self) -> Result<RoomId, CoordinatorError> {
        for _ in 0..ROOM_ID_MAX_ATTEMPTS {
            let candidate = RoomIdFactory::generate();
            if self.store.add_room(&candidate).await? {
                return Ok(candidate);
            }
            tracing::debug!("Room id '{}' already taken, retrying", candidate);
        }
        Err(CoordinatorError::RoomIdExhausted(ROOM_ID_MAX_ATTEMPTS))
    }

    /// 既存のルームに参加
    ///
    /// 存在しないルームへの参加は拒否します。別のルームにいる場合は先に退出します。
    pub async fn join_room(
        &self,
        handle: &ConnectionHandle,
        room_id: String,
    ) -> Result<(), CoordinatorError> {
        let room_id = RoomId::new(room_id)?;
        if !self.store.room_exists(&room_id).await? {
            return Err(CoordinatorError::RoomNotFound(room_id.into_string()));
        }
        if self.room_of(handle.id).await.as_ref() == Some(&room_id) {
            return Ok(());
        }

        self.remove_user(handle).await?;
        self.add_user_to_room(handle, room_id).await
    }

    /// ローカルインデックスと共有ストアに参加者を登録し、`PARTICIPANT_JOINED` を配信
    pub async fn add_user_to_room(
        &self,
        handle: &ConnectionHandle,
        room_id: RoomId,
    ) -> Result<(), CoordinatorError> {
        let _room = self.lock_room(&room_id).await;

        self.rooms.lock().await.assign(handle.id, room_id.clone());
        self.store
            .add_participant(&room_id, Participant::new(handle.user_name.clone()))
            .await?;

        self.broadcast_to_room(
            &room_id,
            ServerEvent::ParticipantJoined {
                user_name: handle.user_name.to_string(),
            },
            Some(handle.id),
        )
        .await;

        tracing::info!(
            "[{}] '{}' joined room '{}'",
            self.node_id,
            handle.user_name,
            room_id
        );
        Ok(())
    }

    /// ルームから退出
    ///
    /// 要求中の描く権利は取り消します。出題者だった場合はラウンドを終了して
    /// `DRAWER_LEFT` を配信し、最後に `PARTICIPANT_LEFT` をルーム全体に配信します。
    /// どのルームにもいなければ何もしません。
    pub async fn remove_user(&self, handle: &ConnectionHandle) -> Result<(), CoordinatorError> {
        let Some(room_id) = self.room_of(handle.id).await else {
            return Ok(());
        };
        let _room = self.lock_room(&room_id).await;

        // ロック待ちの間に別の処理が退出させている可能性がある
        if self.rooms.lock().await.remove(handle.id).is_none() {
            return Ok(());
        }

        let cancelled = self.engine.lock().await.cancel_for(&room_id, handle.id);
        if cancelled.is_some() {
            tracing::info!(
                "[{}] Cancelled pending drawing request of '{}' in '{}'",
                self.node_id,
                handle.user_name,
                room_id
            );
            self.flush_deferred(&room_id).await;
        }

        self.store
            .remove_participant(&room_id, &handle.user_name)
            .await?;

        let round = self.store.active_round(&room_id).await?;
        let drawer_round = round.filter(|round| round.is_drawer(&handle.user_name));
        let ended = match drawer_round {
            Some(round) => self.end_round(&room_id, round.round_id).await?,
            None => false,
        };
        if ended {
            self.broadcast_to_room(&room_id, ServerEvent::DrawerLeft, Some(handle.id))
                .await;
            tracing::info!(
                "[{}] Drawer '{}' left room '{}'",
                self.node_id,
                handle.user_name,
                room_id
            );
        }

        self.broadcast_to_room(
            &room_id,
            ServerEvent::ParticipantLeft {
                user_name: handle.user_name.to_string(),
            },
            None,
        )
        .await;

        tracing::info!(
            "[{}] '{}' left room '{}'",
            self.node_id,
            handle.user_name,
            room_id
        );
        Ok(())
    }
}
