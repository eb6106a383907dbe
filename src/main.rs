//! CLI for steeplejack-socketio
//!
//! Subcommands:
//! - `server`: run a chat server on the configured namespace
//! - `client`: connect, send one message and print what comes back

use std::sync::{Arc, Weak};

use clap::Parser;
use serde_json::{Value, json};
use steeplejack_socketio::config::{Settings, load_config};
use steeplejack_socketio::engine::Middleware;
use steeplejack_socketio::engine::ws::{
    DISCONNECT_EVENT, ServerFrame, TcpHost, WsClient, WsEngine, WsNamespace, WsSocket,
};
use steeplejack_socketio::strategy::{BroadcastIntent, ConnectedEvent, SocketIo, connected_event};
use steeplejack_socketio::utils::{self, logging};
use tracing::{error, info, warn};

type Strategy = SocketIo<WsEngine>;

#[derive(Parser)]
#[command(name = "steeplejack-socketio")]
enum Command {
    /// Start the chat server
    Server,
    /// Run the example client (connects, sends a broadcast, prints the reply)
    Client {
        /// WebSocket server URL to connect to
        #[arg(long, default_value = "ws://127.0.0.1:8080")]
        url: String,
        #[arg(long, default_value = "/chat")]
        namespace: String,
        #[arg(long, default_value = "Hello from the example client")]
        message: String,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cmd = Command::parse();

    match cmd {
        Command::Server => match load_config() {
            Ok(config) => {
                logging::init(&config.logging.level);
                if let Err(e) = run_server(config).await {
                    error!("Server failed: {}", e);
                }
            }
            Err(e) => {
                logging::init("info");
                error!("Failed to load configuration: {}", e);
            }
        },
        Command::Client {
            url,
            namespace,
            message,
        } => {
            logging::init("info");
            if let Err(e) = run_client(&url, &namespace, &message).await {
                error!("Client failed: {}", e);
            }
        }
    }
}

async fn run_server(config: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let host = TcpHost::bind(config.bind_addr())?;
    let strategy = Arc::new(Strategy::new());
    strategy.create_socket(&host)?;

    let namespace = config.socket.namespace.clone();
    let weak = Arc::downgrade(&strategy);
    strategy.on(connected_event(&namespace), move |connected| {
        register_chat_handlers(&weak, connected);
    });
    strategy.connect(&namespace, vec![log_handshake()])?;

    info!("Chat namespace {namespace} ready on ws://{}", host.local_addr()?);

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully.");

    Ok(())
}

fn log_handshake() -> Middleware<WsSocket> {
    Arc::new(|socket: &WsSocket| -> utils::Result<()> {
        let handshake = socket.handshake();
        info!("Handshake from {} at {}", handshake.address, handshake.time);
        Ok(())
    })
}

/// Wires the chat protocol onto a freshly connected socket:
/// `join`/`leave` take a channel name, `broadcast` takes a broadcast intent.
fn register_chat_handlers(strategy: &Weak<Strategy>, connected: &ConnectedEvent<WsNamespace>) {
    let Some(strategy) = strategy.upgrade() else {
        return;
    };
    let obj = connected.handle();
    let request = connected.request();

    {
        let inner = strategy.clone();
        let (target, request) = (obj.clone(), request.clone());
        strategy.listen(&obj, "join", move |args| {
            let Some(channel) = args.first().and_then(Value::as_str) else {
                return;
            };
            inner.join_channel(&target, channel);
            let ack = BroadcastIntent::new("joined", vec![json!(channel)]);
            if let Err(e) = inner.broadcast(&request, ack) {
                warn!("Failed to acknowledge join: {e}");
            }
        });
    }

    {
        let inner = strategy.clone();
        let target = obj.clone();
        strategy.listen(&obj, "leave", move |args| {
            if let Some(channel) = args.first().and_then(Value::as_str) {
                inner.leave_channel(&target, channel);
            }
        });
    }

    {
        let inner = strategy.clone();
        strategy.listen(&obj, "broadcast", move |args| {
            let Some(intent) = args.first().cloned() else {
                return;
            };
            match serde_json::from_value::<BroadcastIntent>(intent) {
                Ok(intent) => {
                    if let Err(e) = inner.broadcast(&request, intent) {
                        warn!("Broadcast failed: {e}");
                    }
                }
                Err(e) => warn!("Invalid broadcast intent: {e}"),
            }
        });
    }

    let id = strategy.get_socket_id(&obj);
    strategy.listen(&obj, DISCONNECT_EVENT, move |args| {
        let reason = args.first().and_then(Value::as_str).unwrap_or("unknown");
        info!("{id} disconnected: {reason}");
    });
}

async fn run_client(
    url: &str,
    namespace: &str,
    message: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut client = WsClient::connect(url).await?;

    match client.join(namespace).await? {
        Some(ServerFrame::Connected { sid, .. }) => println!("Connected to {namespace} as {sid}"),
        Some(other) => {
            println!("Connection refused: {other:?}");
            return Ok(());
        }
        None => return Ok(()),
    }

    let intent = json!({ "event": "message", "data": [message], "target": null });
    client.emit(namespace, "broadcast", vec![intent]).await?;

    if let Some(frame) = client.next_frame().await? {
        println!("Incoming: {}", serde_json::to_string(&frame)?);
    }

    client.close().await?;
    Ok(())
}
