use crate::core::errors::ExchangeError;
use crate::core::kernel::codec::{WireEvent, WsCodec};
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message;

/// OKEx v1 WebSocket envelope
///
/// Outbound: one `{"event": "addChannel" | "removeChannel", "channel": ...}`
/// frame per channel. Inbound: an array (or single object) of
/// `{"channel": ..., "data": ...}` entries.
#[derive(Debug, Clone, Default)]
pub struct OkexCodec;

impl OkexCodec {
    pub fn new() -> Self {
        Self
    }

    fn command(event: &str, channels: &[impl AsRef<str> + Send + Sync]) -> Vec<Message> {
        channels
            .iter()
            .map(|channel| {
                Message::Text(json!({"event": event, "channel": channel.as_ref()}).to_string())
            })
            .collect()
    }

    fn decode_entry(entry: Value) -> Option<WireEvent> {
        let Value::Object(mut object) = entry else {
            return None;
        };

        // {"event": "pong"}
        if object.get("event").and_then(Value::as_str) == Some("pong") {
            return None;
        }

        let channel = object
            .get("channel")
            .and_then(Value::as_str)
            .map(str::to_string);
        let data = object.remove("data");

        match (channel, data) {
            (Some(channel), Some(data)) => {
                if is_ack(&channel, &data) {
                    return None;
                }
                Some(WireEvent::new(channel, data))
            }
            // errors without a data wrapper, e.g. {"channel": ..., "errorcode": "20116"}
            (Some(channel), None) => Some(WireEvent::new(channel, Value::Object(object))),
            (None, _) => Some(WireEvent::new(String::new(), Value::Object(object))),
        }
    }
}

/// Successful add/remove acknowledgements carry no market data
fn is_ack(channel: &str, data: &Value) -> bool {
    let command = channel == "addChannel" || channel == "removeChannel";
    let succeeded = data.get("result").and_then(Value::as_bool) == Some(true);
    command && succeeded
}

impl WsCodec for OkexCodec {
    fn encode_subscription(
        &self,
        channels: &[impl AsRef<str> + Send + Sync],
    ) -> Result<Vec<Message>, ExchangeError> {
        Ok(Self::command("addChannel", channels))
    }

    fn encode_unsubscription(
        &self,
        channels: &[impl AsRef<str> + Send + Sync],
    ) -> Result<Vec<Message>, ExchangeError> {
        Ok(Self::command("removeChannel", channels))
    }

    fn decode_message(&self, message: Message) -> Result<Vec<WireEvent>, ExchangeError> {
        let text = match message {
            Message::Text(text) => text,
            Message::Binary(data) => String::from_utf8(data).map_err(|e| {
                ExchangeError::DecodeError(format!("Invalid UTF-8 in binary message: {}", e))
            })?,
            _ => return Ok(Vec::new()),
        };

        let value: Value = serde_json::from_str(&text)?;
        let entries = match value {
            Value::Array(entries) => entries,
            single => vec![single],
        };
        Ok(entries.into_iter().filter_map(Self::decode_entry).collect())
    }

    fn heartbeat(&self) -> Option<Message> {
        Some(Message::Text(json!({"event": "ping"}).to_string()))
    }
}
