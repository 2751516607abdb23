//! Mock WebSocket feed server for integration tests.
//!
//! Provides a simple WebSocket server that can:
//! - Accept connections and count them
//! - Record every text frame received, tagged with its connection number
//! - Push text frames to all live connections
//! - Drop all live connections abruptly (simulated network loss)

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::{accept_async, tungstenite::Message};

#[derive(Debug, Clone)]
enum Command {
    Push(String),
    DropAll,
}

/// A mock WebSocket server for testing.
pub struct MockWsServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    commands: broadcast::Sender<Command>,
    received: Arc<Mutex<Vec<(u32, String)>>>,
    connections: Arc<Mutex<u32>>,
    accept_task: JoinHandle<()>,
}

impl MockWsServer {
    /// Start a new mock server on an available port.
    pub async fn start() -> Self {
        Self::start_on("127.0.0.1:0".parse().unwrap()).await
    }

    /// Start a mock server on a fixed address.
    pub async fn start_on(addr: SocketAddr) -> Self {
        let listener = TcpListener::bind(addr).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let received = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(Mutex::new(0u32));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let (commands, _) = broadcast::channel(64);

        let received_clone = received.clone();
        let connections_clone = connections.clone();
        let commands_clone = commands.clone();

        let accept_task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        let conn = {
                            let mut count = connections_clone.lock().await;
                            *count += 1;
                            *count
                        };
                        tokio::spawn(handle_connection(
                            stream,
                            conn,
                            received_clone.clone(),
                            commands_clone.subscribe(),
                        ));
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            commands,
            received,
            connections,
            accept_task,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Number of TCP connections accepted so far.
    pub async fn connection_count(&self) -> u32 {
        *self.connections.lock().await
    }

    /// Text frames received on connection `conn` (1-based), in order.
    pub async fn received_on(&self, conn: u32) -> Vec<String> {
        self.received
            .lock()
            .await
            .iter()
            .filter(|(c, _)| *c == conn)
            .map(|(_, text)| text.clone())
            .collect()
    }

    /// All text frames received, across connections.
    pub async fn received_messages(&self) -> Vec<String> {
        self.received
            .lock()
            .await
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    /// Send a text frame to every live connection.
    pub fn push_text(&self, text: impl Into<String>) {
        let _ = self.commands.send(Command::Push(text.into()));
    }

    /// Drop every live connection without a close handshake.
    pub fn drop_connections(&self) {
        let _ = self.commands.send(Command::DropAll);
    }

    /// Stop accepting, close the listening socket, then drop live
    /// connections. Later dials are refused.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        let _ = self.accept_task.await;
        let _ = self.commands.send(Command::DropAll);
    }
}

async fn handle_connection(
    stream: TcpStream,
    conn: u32,
    received: Arc<Mutex<Vec<(u32, String)>>>,
    mut commands: broadcast::Receiver<Command>,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {}", e);
            return;
        }
    };

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    received.lock().await.push((conn, text));
                }
                Some(Ok(Message::Ping(data))) => {
                    let _ = write.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            cmd = commands.recv() => match cmd {
                Ok(Command::Push(text)) => {
                    let _ = write.send(Message::Text(text)).await;
                }
                Ok(Command::DropAll) | Err(_) => break,
            },
        }
    }
}
