use crate::core::client::{ConverterRegistry, ObserverRegistry, Subscription};
use crate::core::converter::{Converter, ObjectKind};
use crate::core::errors::ExchangeError;
use crate::core::kernel::{WsCodec, WsSession};
use crate::core::types::{
    CanonicalValue, DomainObject, Endpoint, ErrorInfo, ParamName, Params, Platform,
    WebSocketConfig,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, sleep, Instant};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, instrument, warn};

const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Subscribing,
    Streaming,
}

/// Counters for inbound dispatch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub delivered: u64,
    pub platform_errors: u64,
    pub ignored_events: u64,
    pub decode_failures: u64,
    pub dropped_outside_streaming: u64,
    /// Recognised events for streams no longer in the active set
    pub dropped_unsubscribed: u64,
    pub reconnects: u64,
}

/// Streaming client for one connection
///
/// All mutation (subscribe, unsubscribe, reconnect, dispatch) goes through
/// `&mut self`, so the active set and the per-connection sent set never race.
/// Run it on its own task and cancel it by dropping the `run` future.
pub struct PlatformWsClient<W: WsSession, C: WsCodec> {
    session: W,
    codec: C,
    converter: Arc<Converter>,
    config: WebSocketConfig,
    state: ConnectionState,
    active: BTreeMap<Subscription, String>,
    sent: HashSet<String>,
    observers: ObserverRegistry,
    stats: DispatchStats,
}

impl<W: WsSession, C: WsCodec> PlatformWsClient<W, C> {
    /// Fails with `ConfigurationError` when the selected version has no converter
    pub fn new(
        session: W,
        codec: C,
        converters: &ConverterRegistry,
        config: WebSocketConfig,
    ) -> Result<Self, ExchangeError> {
        let converter = Arc::clone(converters.current()?);
        let observers = ObserverRegistry::new(config.observer_buffer);
        Ok(Self {
            session,
            codec,
            converter,
            config,
            state: ConnectionState::Disconnected,
            active: BTreeMap::new(),
            sent: HashSet::new(),
            observers,
            stats: DispatchStats::default(),
        })
    }

    pub fn platform(&self) -> Platform {
        self.converter.platform()
    }

    pub fn converter(&self) -> &Converter {
        &self.converter
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    pub fn session(&self) -> &W {
        &self.session
    }

    pub fn active_subscriptions(&self) -> impl Iterator<Item = (&Subscription, &str)> {
        self.active
            .iter()
            .map(|(subscription, channel)| (subscription, channel.as_str()))
    }

    pub fn observe(
        &mut self,
        endpoint: Endpoint,
        symbol: Option<&str>,
    ) -> mpsc::Receiver<DomainObject> {
        self.observers.observe(endpoint, symbol)
    }

    pub fn observe_errors(&mut self) -> mpsc::Receiver<ErrorInfo> {
        self.observers.observe_errors()
    }

    /// Connect and re-send every subscription in the active set
    #[instrument(skip(self), fields(platform = %self.platform()))]
    pub async fn connect(&mut self) -> Result<(), ExchangeError> {
        self.state = ConnectionState::Connecting;
        if let Err(e) = self.session.connect().await {
            self.state = ConnectionState::Disconnected;
            return Err(e);
        }
        self.state = ConnectionState::Connected;
        self.sent.clear();

        let channels: Vec<String> = self.active.values().cloned().collect();
        if let Err(e) = self.send_subscribe(channels).await {
            self.state = ConnectionState::Disconnected;
            return Err(e);
        }
        Ok(())
    }

    /// Subscribe to every endpoint × symbol combination
    ///
    /// All channels are built before any state changes, so a bad endpoint or
    /// interval leaves the active set untouched. An empty `symbols` slice
    /// subscribes without a symbol.
    #[instrument(skip(self, params), fields(platform = %self.platform()))]
    pub async fn subscribe(
        &mut self,
        endpoints: &[Endpoint],
        symbols: &[&str],
        params: &Params,
    ) -> Result<(), ExchangeError> {
        let expanded = self.expand(endpoints, symbols, params)?;
        let mut channels = Vec::with_capacity(expanded.len());
        for (subscription, channel) in expanded {
            channels.push(channel.clone());
            self.active.entry(subscription).or_insert(channel);
        }

        if self.session.is_connected() {
            self.send_subscribe(channels).await?;
        }
        Ok(())
    }

    #[instrument(skip(self, params), fields(platform = %self.platform()))]
    pub async fn unsubscribe(
        &mut self,
        endpoints: &[Endpoint],
        symbols: &[&str],
        params: &Params,
    ) -> Result<(), ExchangeError> {
        let expanded = self.expand(endpoints, symbols, params)?;
        let removed: Vec<String> = expanded
            .into_iter()
            .filter_map(|(subscription, _)| self.active.remove(&subscription))
            .collect();
        if self.active.is_empty() && self.state == ConnectionState::Streaming {
            self.state = ConnectionState::Connected;
        }

        if removed.is_empty() || !self.session.is_connected() {
            return Ok(());
        }

        if self.codec.supports_unsubscribe() {
            let live: Vec<String> = removed
                .into_iter()
                .filter(|channel| self.sent.remove(channel))
                .collect();
            if live.is_empty() {
                return Ok(());
            }
            for message in self.codec.encode_unsubscription(live.as_slice())? {
                self.session.send_raw(message).await?;
            }
            Ok(())
        } else {
            debug!("No unsubscribe command, reconnecting with the remaining set");
            self.session.close().await?;
            self.state = ConnectionState::Disconnected;
            self.connect().await
        }
    }

    /// Read and dispatch one frame
    ///
    /// Returns `Ok(false)` once the peer has closed the connection.
    pub async fn process_next(&mut self) -> Result<bool, ExchangeError> {
        match self.session.next_raw().await {
            Some(Ok(message)) => {
                self.dispatch(message);
                Ok(true)
            }
            Some(Err(e)) => {
                self.state = ConnectionState::Disconnected;
                Err(e)
            }
            None => {
                self.state = ConnectionState::Disconnected;
                Ok(false)
            }
        }
    }

    /// Drive the connection: dispatch frames, send heartbeats, reconnect
    ///
    /// Returns when the connection ends and auto-reconnect is off, or when
    /// reconnecting gives up.
    #[instrument(skip(self), fields(platform = %self.platform()))]
    pub async fn run(&mut self) -> Result<(), ExchangeError> {
        if !self.session.is_connected() {
            self.connect().await?;
        }

        let heartbeat = self
            .config
            .heartbeat_interval_ms
            .filter(|_| self.codec.heartbeat().is_some())
            .map(Duration::from_millis);
        let mut ticker = heartbeat.map(|period| interval_at(Instant::now() + period, period));

        loop {
            let frame = match ticker.as_mut() {
                Some(ticker) => {
                    tokio::select! {
                        frame = self.session.next_raw() => Some(frame),
                        _ = ticker.tick() => None,
                    }
                }
                None => Some(self.session.next_raw().await),
            };

            let lost = match frame {
                None => {
                    self.send_heartbeat().await;
                    false
                }
                Some(Some(Ok(message))) => {
                    self.dispatch(message);
                    false
                }
                Some(Some(Err(e))) => {
                    warn!("WebSocket connection lost: {}", e);
                    if !self.config.auto_reconnect {
                        self.state = ConnectionState::Disconnected;
                        return Err(e);
                    }
                    true
                }
                Some(None) => {
                    warn!("WebSocket closed by peer");
                    true
                }
            };

            if lost || !self.session.is_connected() {
                self.state = ConnectionState::Disconnected;
                if !self.config.auto_reconnect {
                    return Ok(());
                }
                self.reconnect().await?;
            }
        }
    }

    /// Close the connection and forget all subscriptions
    pub async fn close(&mut self) -> Result<(), ExchangeError> {
        self.session.close().await?;
        self.state = ConnectionState::Disconnected;
        self.sent.clear();
        self.active.clear();
        Ok(())
    }

    /// Reconnect with exponential backoff, resubscribing the active set
    pub async fn reconnect(&mut self) -> Result<(), ExchangeError> {
        let max_attempts = self.config.max_reconnect_attempts.max(1);
        let mut delay = Duration::from_millis(self.config.reconnect_delay_ms);

        for attempt in 1..=max_attempts {
            match self.connect().await {
                Ok(()) => {
                    self.stats.reconnects += 1;
                    info!(
                        attempt,
                        subscriptions = self.active.len(),
                        "Reconnected"
                    );
                    return Ok(());
                }
                Err(e) => {
                    error!("Reconnection attempt {} failed: {}", attempt, e);
                    if attempt < max_attempts {
                        sleep(delay).await;
                        delay = std::cmp::min(delay * 2, MAX_RECONNECT_DELAY);
                    }
                }
            }
        }

        Err(ExchangeError::TransportError(format!(
            "Failed to reconnect after {} attempts",
            max_attempts
        )))
    }

    fn expand(
        &self,
        endpoints: &[Endpoint],
        symbols: &[&str],
        params: &Params,
    ) -> Result<Vec<(Subscription, String)>, ExchangeError> {
        let interval = match params.get(&ParamName::Interval).and_then(|value| value.as_canonical()) {
            Some(CanonicalValue::Interval(interval)) => Some(interval),
            _ => None,
        };
        let symbols: Vec<Option<&str>> = if symbols.is_empty() {
            vec![None]
        } else {
            symbols.iter().copied().map(Some).collect()
        };

        let mut expanded = Vec::with_capacity(endpoints.len() * symbols.len());
        for endpoint in endpoints {
            let uses_interval = self
                .converter
                .table()
                .endpoint_template(*endpoint)
                .is_some_and(|template| template.has_placeholder(ParamName::Interval.as_str()));
            for symbol in &symbols {
                let channel = self
                    .converter
                    .generate_subscription(*endpoint, *symbol, params)?;
                let subscription = Subscription::new(
                    *endpoint,
                    symbol.map(str::to_string),
                    interval.filter(|_| uses_interval),
                );
                expanded.push((subscription, channel));
            }
        }
        Ok(expanded)
    }

    /// Send subscribe commands for channels not yet sent on this connection
    async fn send_subscribe(&mut self, channels: Vec<String>) -> Result<(), ExchangeError> {
        let mut pending = Vec::new();
        for channel in channels {
            if !self.sent.contains(&channel) && !pending.contains(&channel) {
                pending.push(channel);
            }
        }

        if !pending.is_empty() {
            self.state = ConnectionState::Subscribing;
            for message in self.codec.encode_subscription(pending.as_slice())? {
                self.session.send_raw(message).await?;
            }
            debug!(count = pending.len(), "Subscribe commands sent");
            self.sent.extend(pending);
        }
        if !self.active.is_empty() {
            self.state = ConnectionState::Streaming;
        }
        Ok(())
    }

    async fn send_heartbeat(&mut self) {
        if let Some(message) = self.codec.heartbeat() {
            if let Err(e) = self.session.send_raw(message).await {
                warn!("Failed to send heartbeat: {}", e);
            }
        }
    }

    fn dispatch(&mut self, message: Message) {
        let events = match self.codec.decode_message(message) {
            Ok(events) => events,
            Err(e) => {
                self.stats.decode_failures += 1;
                warn!("Failed to decode frame: {}", e);
                return;
            }
        };

        for event in events {
            if let Some(info) = self.converter.detect_error(&event.data) {
                self.stats.platform_errors += 1;
                warn!(code = %info.code, channel = %event.name, "Platform error: {}", info.message);
                self.observers.dispatch_error(&info);
                continue;
            }

            let Some(matched) = self.converter.identify_event(&event.name) else {
                self.stats.ignored_events += 1;
                debug!(channel = %event.name, "Ignoring unrecognized event");
                continue;
            };

            if self.state != ConnectionState::Streaming {
                self.stats.dropped_outside_streaming += 1;
                continue;
            }

            let subscription = Subscription::new(
                matched.endpoint,
                matched.symbol.clone(),
                matched.interval,
            );
            if !self.active.contains_key(&subscription) {
                self.stats.dropped_unsubscribed += 1;
                debug!(channel = %event.name, "Dropping event for inactive subscription");
                continue;
            }

            let kind = ObjectKind::for_endpoint(matched.endpoint);
            match self
                .converter
                .decode_items(kind, &event.data, &matched.context())
            {
                Ok(objects) => {
                    for object in objects {
                        self.stats.delivered += 1;
                        self.observers.dispatch(matched.endpoint, &object);
                    }
                }
                Err(e) => {
                    self.stats.decode_failures += 1;
                    warn!(channel = %event.name, "Failed to decode payload: {}", e);
                }
            }
        }
    }
}
