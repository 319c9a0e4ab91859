#![allow(dead_code)]

use async_trait::async_trait;
use marketbridge::core::kernel::{RestClient, WsSession};
use marketbridge::ExchangeError;
use serde_json::Value;
use std::collections::VecDeque;
use std::env;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message;

/// Test configuration utilities
pub struct TestConfig;

impl TestConfig {
    /// Live tests hit the real venue and only run when asked to
    pub fn should_run_integration_tests() -> bool {
        env::var("RUN_INTEGRATION_TESTS").unwrap_or_default() == "true"
    }

    pub fn test_timeout() -> Duration {
        let seconds = env::var("TEST_TIMEOUT_SECONDS")
            .unwrap_or_default()
            .parse()
            .unwrap_or(30);
        Duration::from_secs(seconds)
    }
}

/// One recorded REST call: absolute URL plus query pairs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub url: String,
    pub query: Vec<(String, String)>,
}

impl RecordedCall {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// `RestClient` returning canned JSON bodies in order
///
/// When the queue runs dry the last body is repeated.
#[derive(Debug, Clone, Default)]
pub struct MockRest {
    responses: Arc<Mutex<VecDeque<Result<Value, ExchangeError>>>>,
    last: Arc<Mutex<Option<Value>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockRest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond_with(body: Value) -> Self {
        let mock = Self::new();
        mock.push(Ok(body));
        mock
    }

    pub fn push(&self, response: Result<Value, ExchangeError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RestClient for MockRest {
    async fn get(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
    ) -> Result<Value, ExchangeError> {
        self.calls.lock().unwrap().push(RecordedCall {
            url: endpoint.to_string(),
            query: query_params
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        });

        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(Ok(body)) => {
                *self.last.lock().unwrap() = Some(body.clone());
                Ok(body)
            }
            Some(Err(e)) => Err(e),
            None => self.last.lock().unwrap().clone().ok_or_else(|| {
                ExchangeError::TransportError("no scripted response".to_string())
            }),
        }
    }
}

/// Scripted inbound behaviour for `MockWs`
#[derive(Debug, Clone)]
pub enum Inbound {
    Frame(Message),
    /// Transport failure; the session counts as disconnected afterwards
    Drop,
    /// Clean close by the peer
    Close,
}

#[derive(Debug, Default)]
struct WsState {
    connected: bool,
    connects: u32,
    failing_connects: u32,
    failing_sends: u32,
    inbound: VecDeque<Inbound>,
    sent: Vec<Message>,
    sent_per_connection: Vec<Vec<Message>>,
}

/// `WsSession` fed from a script; clones share state so a test can keep a
/// handle after moving one into the client
#[derive(Debug, Clone, Default)]
pub struct MockWs {
    state: Arc<Mutex<WsState>>,
}

impl MockWs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_text(&self, text: impl Into<String>) {
        self.push(Inbound::Frame(Message::Text(text.into())));
    }

    pub fn push_json(&self, value: &Value) {
        self.push_text(value.to_string());
    }

    pub fn push(&self, inbound: Inbound) {
        self.state.lock().unwrap().inbound.push_back(inbound);
    }

    /// Make the next `n` connect attempts fail
    pub fn fail_next_connects(&self, n: u32) {
        self.state.lock().unwrap().failing_connects = n;
    }

    /// Make the next `n` sends fail and drop the connection
    pub fn fail_next_sends(&self, n: u32) {
        self.state.lock().unwrap().failing_sends = n;
    }

    pub fn connects(&self) -> u32 {
        self.state.lock().unwrap().connects
    }

    pub fn sent(&self) -> Vec<Message> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Sent frames parsed as JSON
    pub fn sent_json(&self) -> Vec<Value> {
        self.sent()
            .into_iter()
            .filter_map(|message| match message {
                Message::Text(text) => serde_json::from_str(&text).ok(),
                _ => None,
            })
            .collect()
    }

    /// Frames sent on the most recent connection
    pub fn sent_on_last_connection(&self) -> Vec<Message> {
        self.state
            .lock()
            .unwrap()
            .sent_per_connection
            .last()
            .cloned()
            .unwrap_or_default()
    }

    pub fn clear_sent(&self) {
        self.state.lock().unwrap().sent.clear();
    }
}

#[async_trait]
impl WsSession for MockWs {
    async fn connect(&mut self) -> Result<(), ExchangeError> {
        let mut state = self.state.lock().unwrap();
        if state.failing_connects > 0 {
            state.failing_connects -= 1;
            return Err(ExchangeError::TransportError(
                "connection refused".to_string(),
            ));
        }
        state.connected = true;
        state.connects += 1;
        state.sent_per_connection.push(Vec::new());
        Ok(())
    }

    async fn send_raw(&mut self, msg: Message) -> Result<(), ExchangeError> {
        let mut state = self.state.lock().unwrap();
        if !state.connected {
            return Err(ExchangeError::TransportError("not connected".to_string()));
        }
        if state.failing_sends > 0 {
            state.failing_sends -= 1;
            state.connected = false;
            return Err(ExchangeError::TransportError("broken pipe".to_string()));
        }
        state.sent.push(msg.clone());
        if let Some(current) = state.sent_per_connection.last_mut() {
            current.push(msg);
        }
        Ok(())
    }

    async fn next_raw(&mut self) -> Option<Result<Message, ExchangeError>> {
        let next = {
            let mut state = self.state.lock().unwrap();
            let next = state.inbound.pop_front();
            if matches!(next, Some(Inbound::Drop | Inbound::Close)) {
                state.connected = false;
            }
            next
        };
        match next {
            Some(Inbound::Frame(message)) => Some(Ok(message)),
            Some(Inbound::Drop) => Some(Err(ExchangeError::TransportError(
                "connection reset".to_string(),
            ))),
            Some(Inbound::Close) => None,
            None => futures::future::pending().await,
        }
    }

    async fn close(&mut self) -> Result<(), ExchangeError> {
        self.state.lock().unwrap().connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state.lock().unwrap().connected
    }
}
