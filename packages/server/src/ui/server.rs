//! Server execution logic.

use std::{future::Future, sync::Arc};

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{
    domain::ConnectionIdFactory,
    usecase::{GetRoomDataUseCase, RoomCoordinator},
};

use super::{
    handler::{get_room_data, health_check, websocket_handler},
    state::AppState,
};

/// HTTP / WebSocket front of one coordinator node
///
/// # Example
///
/// ```ignore
/// let server = Server::new(coordinator, get_room_data_usecase);
/// let listener = TcpListener::bind("127.0.0.1:3001").await?;
/// server.serve(listener, shutdown_signal()).await?;
/// ```
pub struct Server {
    /// RoomCoordinator（ルームコーディネータ）
    coordinator: Arc<RoomCoordinator>,
    /// GetRoomDataUseCase（ルームスナップショット取得のユースケース）
    get_room_data_usecase: Arc<GetRoomDataUseCase>,
}

impl Server {
    /// Create a new Server instance
    ///
    /// # Arguments
    ///
    /// * `coordinator` - Coordinator that owns this node's rooms
    /// * `get_room_data_usecase` - UseCase for the late-joiner snapshot
    pub fn new(
        coordinator: Arc<RoomCoordinator>,
        get_room_data_usecase: Arc<GetRoomDataUseCase>,
    ) -> Self {
        Self {
            coordinator,
            get_room_data_usecase,
        }
    }

    /// Build the router with all endpoints
    pub fn router(&self) -> Router {
        let app_state = Arc::new(AppState {
            coordinator: Arc::clone(&self.coordinator),
            get_room_data_usecase: Arc::clone(&self.get_room_data_usecase),
            connection_ids: Arc::new(ConnectionIdFactory::new()),
        });

        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/room/data/{room_id}", get(get_room_data))
            .route("/api/health", get(health_check))
            .layer(TraceLayer::new_for_http())
            .with_state(app_state)
    }

    /// Serve on an already bound listener until `shutdown` resolves
    ///
    /// # Errors
    ///
    /// Returns an error if the listener address cannot be read or if there's
    /// an error during server execution.
    pub async fn serve<F>(
        self,
        listener: TcpListener,
        shutdown: F,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();

        tracing::info!(
            "[{}] Pictionary node listening on {}",
            self.coordinator.node_id(),
            listener.local_addr()?
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("[{}] Server shutdown complete", self.coordinator.node_id());

        Ok(())
    }
}
