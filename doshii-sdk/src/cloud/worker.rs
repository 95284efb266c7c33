//! SocketWorker - Doshii order feed over WebSocket
//!
//! 1. Connect to the Doshii socket (bearer token + location header)
//! 2. Parse each text frame as a CloudEvent and hand it to the EventRouter
//! 3. Ping on an interval; silence longer than the socket timeout is a dead connection
//! 4. Reconnect with exponential backoff until shutdown

use futures::{SinkExt, StreamExt};
use shared::cloud::CloudEvent;
use shared::error::AppError;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::MaybeTlsStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_util::sync::CancellationToken;

use crate::core::Config;

pub type WsStream = tokio_tungstenite::WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Initial reconnect delay
const INITIAL_RETRY_DELAY_SECS: u64 = 5;
/// Max reconnect delay
const MAX_RECONNECT_DELAY_SECS: u64 = 120;

/// Why a session ended
#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    Disconnected,
    Stopped,
}

pub struct SocketWorker {
    socket_url: String,
    vendor_token: String,
    location_id: String,
    ping_interval: Duration,
    socket_timeout: Duration,
    events: mpsc::Sender<CloudEvent>,
    shutdown: CancellationToken,
}

impl SocketWorker {
    pub fn new(
        config: &Config,
        events: mpsc::Sender<CloudEvent>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            socket_url: config.socket_url.clone(),
            vendor_token: config.vendor_token.clone(),
            location_id: config.location_id.clone(),
            ping_interval: config.ping_interval(),
            socket_timeout: config.socket_timeout(),
            events,
            shutdown,
        }
    }

    /// Main run loop - connect, pump events, reconnect on failure
    pub async fn run(self) {
        tracing::info!(url = %self.socket_url, "SocketWorker started");
        let mut reconnect_delay = Duration::from_secs(INITIAL_RETRY_DELAY_SECS);

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            match self.connect().await {
                Ok(ws) => {
                    reconnect_delay = Duration::from_secs(INITIAL_RETRY_DELAY_SECS);
                    if self.run_session(ws).await == SessionEnd::Stopped {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        delay_secs = reconnect_delay.as_secs(),
                        "Socket connection failed, retrying: {e}"
                    );
                }
            }

            // Wait before reconnecting
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(reconnect_delay) => {},
            }
            reconnect_delay =
                (reconnect_delay * 2).min(Duration::from_secs(MAX_RECONNECT_DELAY_SECS));
        }

        tracing::info!("SocketWorker stopped");
    }

    async fn connect(&self) -> Result<WsStream, AppError> {
        let mut request = self
            .socket_url
            .as_str()
            .into_client_request()
            .map_err(|e| AppError::internal(format!("Invalid socket URL: {e}")))?;

        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.vendor_token))
            .map_err(|e| AppError::internal(format!("Invalid vendor token: {e}")))?;
        let location = HeaderValue::from_str(&self.location_id)
            .map_err(|e| AppError::internal(format!("Invalid location id: {e}")))?;
        request.headers_mut().insert("authorization", bearer);
        request.headers_mut().insert("doshii-location-id", location);

        let (ws, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| AppError::internal(format!("WebSocket connection failed: {e}")))?;

        tracing::info!(url = %self.socket_url, "Socket connected to Doshii");
        Ok(ws)
    }

    /// Run a single session until disconnect or shutdown
    async fn run_session(&self, ws: WsStream) -> SessionEnd {
        let (mut ws_sink, mut ws_stream) = ws.split();

        let mut ping_interval = tokio::time::interval(self.ping_interval);
        ping_interval.tick().await; // skip immediate tick
        let mut last_seen = Instant::now();

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("SocketWorker shutting down");
                    let _ = ws_sink.close().await;
                    return SessionEnd::Stopped;
                }

                // Keepalive ping + silence detection
                _ = ping_interval.tick() => {
                    if last_seen.elapsed() > self.socket_timeout {
                        tracing::warn!(
                            silent_secs = last_seen.elapsed().as_secs(),
                            "Socket silent past timeout, reconnecting"
                        );
                        return SessionEnd::Disconnected;
                    }
                    if ws_sink.send(Message::Ping(vec![].into())).await.is_err() {
                        tracing::warn!("Socket ping failed, disconnecting");
                        return SessionEnd::Disconnected;
                    }
                }

                msg = ws_stream.next() => {
                    last_seen = Instant::now();
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            let Some(event) = Self::parse_event(text.as_str()) else {
                                continue;
                            };
                            if self.events.send(event).await.is_err() {
                                tracing::info!("Event router gone, SocketWorker stopping");
                                let _ = ws_sink.close().await;
                                return SessionEnd::Stopped;
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            let _ = ws_sink.send(Message::Pong(data)).await;
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!("Socket closed by Doshii");
                            return SessionEnd::Disconnected;
                        }
                        Some(Err(e)) => {
                            tracing::warn!("Socket error: {e}");
                            return SessionEnd::Disconnected;
                        }
                        None => {
                            tracing::info!("Socket stream ended");
                            return SessionEnd::Disconnected;
                        }
                        _ => {} // Binary, Pong
                    }
                }
            }
        }
    }

    fn parse_event(text: &str) -> Option<CloudEvent> {
        match serde_json::from_str::<CloudEvent>(text) {
            Ok(event) => {
                tracing::debug!(event = event.kind(), "Cloud event received");
                Some(event)
            }
            Err(e) => {
                tracing::warn!("Invalid CloudEvent from Doshii: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::order::{Order, OrderItem};
    use std::sync::{Arc, Mutex};
    use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};

    fn config_for(addr: std::net::SocketAddr) -> Config {
        let mut config = Config::with_work_dir("unused");
        config.socket_url = format!("ws://{addr}/pos/socket");
        config.vendor_token = "tok".into();
        config.location_id = "loc-1".into();
        config
    }

    #[test]
    fn test_parse_event_skips_garbage() {
        assert!(SocketWorker::parse_event("not json").is_none());
        assert!(SocketWorker::parse_event(r#"{"type":"unknown_thing"}"#).is_none());
    }

    #[tokio::test]
    async fn test_events_are_forwarded_to_router() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let location = Arc::new(Mutex::new(None::<String>));

        let seen = location.clone();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_hdr_async(stream, |req: &Request, resp: Response| {
                *seen.lock().unwrap() = req
                    .headers()
                    .get("doshii-location-id")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                Ok(resp)
            })
            .await
            .unwrap();

            let event = CloudEvent::OrderCreated {
                order: Order::pending("d-1", vec![OrderItem::new("dish", "Dish", 1, 900)]),
                consumer: Default::default(),
                transactions: vec![],
            };
            let json = serde_json::to_string(&event).unwrap();
            ws.send(Message::Text("garbage".into())).await.unwrap();
            ws.send(Message::Text(json.into())).await.unwrap();
            // Keep the connection open until the client closes it
            while let Some(Ok(_)) = ws.next().await {}
        });

        let (tx, mut rx) = mpsc::channel(8);
        let shutdown = CancellationToken::new();
        let worker = SocketWorker::new(&config_for(addr), tx, shutdown.clone());
        let handle = tokio::spawn(worker.run());

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.kind(), "order_created");
        assert_eq!(location.lock().unwrap().as_deref(), Some("loc-1"));

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
