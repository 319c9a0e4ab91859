use crate::core::errors::ExchangeError;
use serde_json::Value;
use tokio_tungstenite::tungstenite::Message;

/// One channel-tagged payload extracted from an inbound frame
#[derive(Debug, Clone, PartialEq)]
pub struct WireEvent {
    /// Channel or event name, matched against the converter's event types
    pub name: String,
    pub data: Value,
}

impl WireEvent {
    pub fn new(name: impl Into<String>, data: Value) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// Codec trait for an exchange's WebSocket envelope format
///
/// Channel names are produced by the converter; the codec only wraps them
/// into subscribe/unsubscribe commands and unwraps inbound frames into
/// channel-tagged payloads.
pub trait WsCodec: Send + Sync + 'static {
    /// Encode subscribe commands for the given channels
    ///
    /// # Returns
    /// The frames to send, in order. Exchanges that accept a batch return one frame.
    fn encode_subscription(
        &self,
        channels: &[impl AsRef<str> + Send + Sync],
    ) -> Result<Vec<Message>, ExchangeError>;

    /// Encode unsubscribe commands for the given channels
    fn encode_unsubscription(
        &self,
        channels: &[impl AsRef<str> + Send + Sync],
    ) -> Result<Vec<Message>, ExchangeError>;

    /// Decode a raw frame into channel-tagged payloads
    ///
    /// Control messages (ping, pong, close) never reach the codec. Acks and
    /// application-level pongs decode to an empty list.
    fn decode_message(&self, message: Message) -> Result<Vec<WireEvent>, ExchangeError>;

    /// Whether the protocol has an unsubscribe command
    ///
    /// When `false` the client drops subscriptions by reconnecting with the
    /// remaining set.
    fn supports_unsubscribe(&self) -> bool {
        true
    }

    /// Application-level keepalive frame, if the exchange expects one
    fn heartbeat(&self) -> Option<Message> {
        None
    }
}
