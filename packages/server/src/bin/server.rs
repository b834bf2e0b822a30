//! Pictionary coordinator node(s).
//!
//! Starts one or more coordinator nodes in this process. The nodes share one
//! in-memory store and message bus and listen on consecutive ports.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin pictionary-server
//! cargo run --bin pictionary-server -- --nodes 3 --port 3001
//! ```

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use pictionary_server::{
    config::CoordinatorConfig,
    domain::{Dictionary, MessageBus, NodeId, SharedStore, WordSource},
    infrastructure::{
        message_bus::InMemoryMessageBus, message_pusher::WebSocketMessagePusher,
        repository::InMemorySharedStore,
    },
    ui::{Server, shutdown_signal},
    usecase::{GetRoomDataUseCase, RoomCoordinator},
};
use pictionary_shared::{logger::setup_logger, time::SystemClock};
use tokio::net::TcpListener;

#[derive(Parser, Debug)]
#[command(name = "pictionary-server")]
#[command(about = "Distributed room coordinator for a drawing-and-guessing game", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port of the first node; further nodes use the following ports
    #[arg(short = 'p', long, default_value = "3001")]
    port: u16,

    /// Number of coordinator nodes to run in this process
    #[arg(short = 'n', long, default_value = "1")]
    nodes: u16,

    /// Heartbeat interval in seconds (peers are failed after 3 silent intervals)
    #[arg(long, default_value = "5")]
    heartbeat_interval_secs: u64,

    /// Round timeout in seconds
    #[arg(long, default_value = "300")]
    round_timeout_secs: u64,

    /// How often due round timeouts are checked, in milliseconds
    #[arg(long, default_value = "500")]
    timer_tick_millis: u64,

    /// Newline-separated word list (the built-in list is used when omitted)
    #[arg(long)]
    words_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    if let Err(e) = run(args).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if args.nodes == 0 {
        return Err("--nodes must be at least 1".into());
    }
    if args.heartbeat_interval_secs == 0 || args.timer_tick_millis == 0 {
        return Err("--heartbeat-interval-secs and --timer-tick-millis must be positive".into());
    }

    let config = CoordinatorConfig::new(
        Duration::from_secs(args.heartbeat_interval_secs),
        Duration::from_secs(args.round_timeout_secs),
        Duration::from_millis(args.timer_tick_millis),
    );

    let words: Arc<dyn WordSource> = match &args.words_file {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            let dictionary = Dictionary::from_text(&text)?;
            tracing::info!("Loaded {} words from {}", dictionary.len(), path.display());
            Arc::new(dictionary)
        }
        None => Arc::new(Dictionary::builtin()),
    };

    // Initialize dependencies in order:
    // 1. Shared store and bus (one per process, shared by every node)
    // 2. Per node: MessagePusher, RoomCoordinator, UseCases, Server
    let store: Arc<dyn SharedStore> = Arc::new(InMemorySharedStore::new());
    let bus: Arc<dyn MessageBus> = Arc::new(InMemoryMessageBus::new());

    let mut servers = Vec::with_capacity(usize::from(args.nodes));
    for index in 0..args.nodes {
        let port = args
            .port
            .checked_add(index)
            .ok_or("port range exceeds 65535")?;
        let listener = TcpListener::bind((args.host.as_str(), port)).await?;

        let coordinator = Arc::new(RoomCoordinator::new(
            NodeId::new_random(),
            config,
            Arc::clone(&store),
            Arc::clone(&bus),
            Arc::new(WebSocketMessagePusher::new()),
            Arc::clone(&words),
            Arc::new(SystemClock),
        ));
        // 購読を確立してから存在を知らせる
        coordinator.spawn_background_tasks();
        coordinator.announce_presence().await;
        tracing::info!(
            "Node {} ready on ws://{}:{}/ws",
            coordinator.node_id(),
            args.host,
            port
        );

        let get_room_data_usecase = Arc::new(GetRoomDataUseCase::new(Arc::clone(&store)));
        let server = Server::new(coordinator, get_room_data_usecase);
        servers.push(server.serve(listener, shutdown_signal()));
    }

    tracing::info!("Press Ctrl+C to shutdown gracefully");
    futures_util::future::try_join_all(servers).await?;

    Ok(())
}
