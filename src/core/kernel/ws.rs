use crate::core::errors::ExchangeError;
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, instrument, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Transport-level WebSocket settings
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000,
        }
    }
}

/// WebSocket session trait - pure transport layer
///
/// Sessions know nothing about channels or subscriptions. Reconnection and
/// resubscription are driven by the client that owns the session.
#[async_trait]
pub trait WsSession: Send + Sync {
    /// Connect (or reconnect) to the WebSocket
    async fn connect(&mut self) -> Result<(), ExchangeError>;

    /// Send a raw message
    async fn send_raw(&mut self, msg: Message) -> Result<(), ExchangeError>;

    /// Receive the next data message
    ///
    /// Pings are answered and pongs skipped here. `None` means the peer
    /// closed the connection.
    async fn next_raw(&mut self) -> Option<Result<Message, ExchangeError>>;

    /// Close the connection
    async fn close(&mut self) -> Result<(), ExchangeError>;

    /// Check if the connection is alive
    fn is_connected(&self) -> bool;
}

/// Connection statistics
#[derive(Debug, Default, Clone)]
pub struct ConnectionStats {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub connection_count: u32,
    pub last_message_at: Option<Instant>,
}

/// Tungstenite-based WebSocket implementation
pub struct TungsteniteWs {
    url: String,
    write: Option<SplitSink<WsStream, Message>>,
    read: Option<SplitStream<WsStream>>,
    connected: bool,
    exchange_name: String,
    config: WsConfig,
    connection_stats: ConnectionStats,
}

impl TungsteniteWs {
    /// Create a new WebSocket session
    ///
    /// # Arguments
    /// * `url` - The WebSocket URL to connect to
    /// * `exchange_name` - Name of the exchange for logging/tracing
    pub fn new(url: String, exchange_name: String) -> Self {
        Self {
            url,
            write: None,
            read: None,
            connected: false,
            exchange_name,
            config: WsConfig::default(),
            connection_stats: ConnectionStats::default(),
        }
    }

    pub fn with_config(mut self, config: WsConfig) -> Self {
        self.config = config;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn stats(&self) -> &ConnectionStats {
        &self.connection_stats
    }

    fn record_sent(&mut self, msg: &Message) {
        self.connection_stats.messages_sent += 1;
        self.connection_stats.bytes_sent += msg.len() as u64;
    }

    fn record_received(&mut self, msg: &Message) {
        self.connection_stats.messages_received += 1;
        self.connection_stats.bytes_received += msg.len() as u64;
        self.connection_stats.last_message_at = Some(Instant::now());
    }
}

impl std::fmt::Debug for TungsteniteWs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TungsteniteWs")
            .field("url", &self.url)
            .field("exchange_name", &self.exchange_name)
            .field("connected", &self.connected)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl WsSession for TungsteniteWs {
    #[instrument(skip(self), fields(exchange = %self.exchange_name, url = %self.url))]
    async fn connect(&mut self) -> Result<(), ExchangeError> {
        let connect_timeout = Duration::from_millis(self.config.connect_timeout_ms);

        let (ws_stream, _) = tokio::time::timeout(connect_timeout, connect_async(&self.url))
            .await
            .map_err(|_| {
                ExchangeError::TransportError("WebSocket connection timeout".to_string())
            })?
            .map_err(|e| {
                ExchangeError::TransportError(format!("WebSocket connection failed: {}", e))
            })?;

        let (write, read) = ws_stream.split();
        self.write = Some(write);
        self.read = Some(read);
        self.connected = true;
        self.connection_stats.connection_count += 1;
        debug!("WebSocket connected");

        Ok(())
    }

    #[instrument(skip(self, msg), fields(exchange = %self.exchange_name))]
    async fn send_raw(&mut self, msg: Message) -> Result<(), ExchangeError> {
        if !self.connected {
            return Err(ExchangeError::TransportError(
                "WebSocket not connected".to_string(),
            ));
        }

        let write = self.write.as_mut().ok_or_else(|| {
            ExchangeError::TransportError("WebSocket write stream not available".to_string())
        })?;

        let size = msg.len() as u64;
        if let Err(e) = write.send(msg).await {
            self.connected = false;
            return Err(ExchangeError::TransportError(format!(
                "Failed to send WebSocket message: {}",
                e
            )));
        }
        self.connection_stats.messages_sent += 1;
        self.connection_stats.bytes_sent += size;

        Ok(())
    }

    #[instrument(skip(self), fields(exchange = %self.exchange_name))]
    async fn next_raw(&mut self) -> Option<Result<Message, ExchangeError>> {
        loop {
            if !self.connected {
                return Some(Err(ExchangeError::TransportError(
                    "WebSocket not connected".to_string(),
                )));
            }

            let read = self.read.as_mut()?;
            let message = match read.next().await {
                Some(Ok(message)) => message,
                Some(Err(e)) => {
                    self.connected = false;
                    return Some(Err(ExchangeError::from(e)));
                }
                None => {
                    self.connected = false;
                    return None;
                }
            };
            self.record_received(&message);

            match message {
                Message::Ping(data) => {
                    let pong = Message::Pong(data);
                    self.record_sent(&pong);
                    if let Some(write) = self.write.as_mut() {
                        if let Err(e) = write.send(pong).await {
                            warn!("Failed to send pong response: {}", e);
                        }
                    }
                }
                Message::Pong(_) | Message::Frame(_) => {}
                Message::Close(frame) => {
                    debug!(?frame, "WebSocket closed by peer");
                    self.connected = false;
                    return None;
                }
                data => return Some(Ok(data)),
            }
        }
    }

    #[instrument(skip(self), fields(exchange = %self.exchange_name))]
    async fn close(&mut self) -> Result<(), ExchangeError> {
        if let Some(write) = self.write.as_mut() {
            let _ = write.send(Message::Close(None)).await;
        }
        self.connected = false;
        self.write = None;
        self.read = None;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
