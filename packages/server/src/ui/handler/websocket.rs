//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{Stream, StreamExt},
};
use serde::Deserialize;
use tokio::sync::{mpsc, oneshot};

use crate::{
    domain::{ConnectionHandle, UserName},
    infrastructure::dto::websocket::ClientEvent,
    ui::state::AppState,
    usecase::RoomCoordinator,
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub user_name: Option<String>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    // Convert String -> UserName (Domain Model)
    let user_name = match query.user_name.map(UserName::new) {
        Some(Ok(name)) => name,
        Some(Err(e)) => {
            tracing::warn!("Rejecting connection: {}", e);
            return Err(StatusCode::UNAUTHORIZED);
        }
        None => {
            tracing::warn!("Rejecting connection without user_name");
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    let handle = ConnectionHandle::new(state.connection_ids.generate(), user_name);
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, handle)))
}

/// Spawns a task that receives messages from the rx channel and pushes them to the WebSocket sender.
///
/// This function handles the outbound message flow: events produced by the coordinator
/// (via rx channel) are sent to this client's WebSocket connection.
///
/// # Arguments
///
/// * `rx` - Channel receiver for outbound events
/// * `sender` - WebSocket sink to send messages to this client
///
/// # Returns
///
/// A `JoinHandle` for the spawned task
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    })
}

/// Reads frames from this client and applies them to the coordinator.
///
/// Runs until the stream ends, the client sends a close frame, or `stop` fires.
/// `stop` is only checked between frames: an event that is already being
/// applied (a draw request may be inside its critical section, holding grants
/// deferred for other nodes) always runs to completion.
async fn receive_loop<S>(
    mut receiver: S,
    mut stop: oneshot::Receiver<()>,
    coordinator: Arc<RoomCoordinator>,
    handle: ConnectionHandle,
) where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    loop {
        let msg = tokio::select! {
            biased;
            msg = receiver.next() => msg,
            _ = &mut stop => break,
        };
        let msg = match msg {
            Some(Ok(msg)) => msg,
            Some(Err(e)) => {
                tracing::debug!("WebSocket error on {}: {}", handle.id, e);
                break;
            }
            None => break,
        };

        match msg {
            Message::Text(text) => {
                tracing::debug!("Received from '{}': {}", handle.user_name, text);

                let event = match ClientEvent::parse(text.as_str()) {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::warn!(
                            "Dropping malformed event from '{}': {}",
                            handle.user_name,
                            e
                        );
                        continue;
                    }
                };

                if let Err(e) = coordinator.handle_client_event(&handle, event).await {
                    tracing::warn!("Event from '{}' was not applied: {}", handle.user_name, e);
                }
            }
            Message::Ping(_) => {
                tracing::debug!("Received ping");
            }
            Message::Close(_) => {
                tracing::info!("Client '{}' requested close", handle.user_name);
                break;
            }
            _ => {}
        }
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, handle: ConnectionHandle) {
    let (tx, rx) = mpsc::unbounded_channel();
    state.coordinator.connect(&handle, tx).await;

    let (sender, receiver) = socket.split();

    // Spawn a task to receive events from this client
    let (stop_tx, stop_rx) = oneshot::channel();
    let mut recv_task = tokio::spawn(receive_loop(
        receiver,
        stop_rx,
        Arc::clone(&state.coordinator),
        handle.clone(),
    ));

    // Spawn a task to push coordinator events to this client
    let mut send_task = pusher_loop(rx, sender);

    // The pusher can be aborted at any point; the receiver is asked to stop
    // and awaited so that an event in progress is never cut short
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => {
            let _ = stop_tx.send(());
            if let Err(e) = recv_task.await {
                tracing::error!("Receive task of {} failed: {}", handle.id, e);
            }
        }
    };

    state.coordinator.disconnect(&handle).await;
}

#[cfg(test)]
mod tests {
    use futures_util::stream;
    use pictionary_shared::time::SystemClock;

    use super::*;
    use crate::{
        config::CoordinatorConfig,
        domain::{ConnectionId, Dictionary, NodeId, SharedStore},
        infrastructure::{
            dto::websocket::ServerEvent, message_bus::InMemoryMessageBus,
            message_pusher::WebSocketMessagePusher, repository::InMemorySharedStore,
        },
    };

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - 受信ループの停止が、受け取り済みのイベントの適用を途中で打ち切らないこと
    //
    // 【なぜこのテストが必要か】
    // - 描く権利の要求はクリティカルセクションの中で他ノードへの許可を保留している
    // - 途中で打ち切られると保留した許可が送られず、他ノードの要求が止まる
    // ========================================

    fn coordinator(store: Arc<InMemorySharedStore>) -> Arc<RoomCoordinator> {
        Arc::new(RoomCoordinator::new(
            NodeId::new_random(),
            CoordinatorConfig::default(),
            store,
            Arc::new(InMemoryMessageBus::new()),
            Arc::new(WebSocketMessagePusher::new()),
            Arc::new(Dictionary::from_text("Cat").unwrap()),
            Arc::new(SystemClock),
        ))
    }

    fn events(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(text) = rx.try_recv() {
            events.push(serde_json::from_str(&text).unwrap());
        }
        events
    }

    #[tokio::test]
    async fn test_stop_lets_received_event_finish() {
        // テスト項目: 停止を要求されても、受け取り済みの DRAW は最後まで処理される
        // given (前提条件): alice がルームを作り、DRAW を 1 件送ったまま接続が開いている
        let store = Arc::new(InMemorySharedStore::new());
        let coordinator = coordinator(Arc::clone(&store));
        let handle = ConnectionHandle::new(
            ConnectionId::new(1),
            UserName::new("alice".to_string()).unwrap(),
        );
        let (tx, mut rx) = mpsc::unbounded_channel();
        coordinator.connect(&handle, tx).await;
        let room_id = coordinator.create_room(&handle).await.unwrap();
        events(&mut rx);
        let frames = stream::iter(vec![Ok(Message::Text(r#"{"type":"DRAW"}"#.into()))])
            .chain(stream::pending());

        // when (操作): ループが DRAW を読む前に停止を要求する
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(receive_loop(
            frames,
            stop_rx,
            Arc::clone(&coordinator),
            handle.clone(),
        ));
        stop_tx.send(()).unwrap();
        task.await.unwrap();

        // then (期待する結果): ループは止まり、DRAW は適用されている
        assert_eq!(
            events(&mut rx),
            vec![ServerEvent::DrawSuccess {
                pictionary_word: "cat".to_string()
            }]
        );
        let round = store.active_round(&room_id).await.unwrap().unwrap();
        assert_eq!(round.drawer.as_str(), "alice");
    }

    #[tokio::test]
    async fn test_stop_ends_idle_loop() {
        // テスト項目: フレームが来ない接続でも停止の要求で受信ループが終わる
        // given (前提条件):
        let coordinator = coordinator(Arc::new(InMemorySharedStore::new()));
        let handle = ConnectionHandle::new(
            ConnectionId::new(2),
            UserName::new("bob".to_string()).unwrap(),
        );
        let frames = stream::pending::<Result<Message, axum::Error>>();
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(receive_loop(frames, stop_rx, coordinator, handle));

        // when (操作):
        stop_tx.send(()).unwrap();

        // then (期待する結果):
        tokio::time::timeout(std::time::Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}
