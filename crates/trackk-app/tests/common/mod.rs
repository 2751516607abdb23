//! Local feed server and helpers for trackk-app integration tests.

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use trackk_app::config::{FeedSettings, WsSettings};
use trackk_app::AppConfig;
use trackk_ws::ConnectionConfig;

#[derive(Debug, Clone)]
enum Command {
    Push(String),
    DropAll,
}

#[derive(Default)]
struct Recorded {
    /// Request URI of each accepted connection, in accept order.
    uris: Vec<String>,
    /// (connection number, text frame)
    frames: Vec<(usize, String)>,
}

/// Minimal feed server: records handshakes and client frames, pushes text.
pub struct FeedServer {
    url: String,
    commands: broadcast::Sender<Command>,
    recorded: Arc<Mutex<Recorded>>,
    accept_task: JoinHandle<()>,
}

impl FeedServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/ws", listener.local_addr().unwrap());
        let (commands, _) = broadcast::channel(64);
        let recorded = Arc::new(Mutex::new(Recorded::default()));

        let accept_task = tokio::spawn({
            let commands = commands.clone();
            let recorded = recorded.clone();
            async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let recorded = recorded.clone();
                    let mut rx = commands.subscribe();
                    tokio::spawn(async move {
                        let uri = Arc::new(std::sync::Mutex::new(String::new()));
                        let uri_slot = uri.clone();
                        let callback = move |req: &Request,
                                             resp: Response|
                              -> Result<Response, ErrorResponse> {
                            *uri_slot.lock().unwrap() = req.uri().to_string();
                            Ok(resp)
                        };
                        let Ok(ws) = accept_hdr_async(stream, callback).await else {
                            return;
                        };
                        let conn = {
                            let mut rec = recorded.lock().await;
                            rec.uris.push(uri.lock().unwrap().clone());
                            rec.uris.len()
                        };

                        let (mut write, mut read) = ws.split();
                        loop {
                            tokio::select! {
                                msg = read.next() => match msg {
                                    Some(Ok(Message::Text(text))) => {
                                        recorded.lock().await.frames.push((conn, text));
                                    }
                                    Some(Ok(_)) => {}
                                    _ => break,
                                },
                                cmd = rx.recv() => match cmd {
                                    Ok(Command::Push(text)) => {
                                        let _ = write.send(Message::Text(text)).await;
                                    }
                                    _ => break,
                                },
                            }
                        }
                    });
                }
            }
        });

        Self {
            url,
            commands,
            recorded,
            accept_task,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn uris(&self) -> Vec<String> {
        self.recorded.lock().await.uris.clone()
    }

    pub async fn frames_on(&self, conn: usize) -> Vec<String> {
        self.recorded
            .lock()
            .await
            .frames
            .iter()
            .filter(|(c, _)| *c == conn)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn push_text(&self, text: impl Into<String>) {
        let _ = self.commands.send(Command::Push(text.into()));
    }

    pub fn drop_connections(&self) {
        let _ = self.commands.send(Command::DropAll);
    }

    pub fn stop(self) {
        self.accept_task.abort();
        let _ = self.commands.send(Command::DropAll);
    }
}

pub fn test_config(url: &str, workspace: &Path) -> AppConfig {
    AppConfig {
        ws: WsSettings {
            connection: ConnectionConfig {
                reconnect_base_delay_ms: 20,
                connect_timeout_ms: 2_000,
                ..ConnectionConfig::new(url)
            },
            token: Some("t0k".to_string()),
        },
        workspace_path: workspace.join("workspace.json"),
        default_preset: "day-trader".to_string(),
        feed: FeedSettings::default(),
        metrics_path: Some(workspace.join("trackk.prom")),
    }
}

/// Poll `check` until it returns true or `timeout` elapses.
pub async fn wait_until<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
