mod common;

use common::{Inbound, MockWs};
use marketbridge::core::kernel::{WireEvent, WsCodec};
use marketbridge::exchanges::okex::{self, OkexCodec};
use marketbridge::{
    ConnectionState, Direction, DomainObject, Endpoint, ExchangeConfig, ExchangeError, Interval,
    ParamName, ParamValue, Params, PlatformWsClient, WebSocketConfig,
};
use serde_json::json;
use std::time::Duration;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

/// OKEx envelope on a venue without an unsubscribe command
struct NoUnsubscribeCodec(OkexCodec);

impl WsCodec for NoUnsubscribeCodec {
    fn encode_subscription(
        &self,
        channels: &[impl AsRef<str> + Send + Sync],
    ) -> Result<Vec<Message>, ExchangeError> {
        self.0.encode_subscription(channels)
    }

    fn encode_unsubscription(
        &self,
        channels: &[impl AsRef<str> + Send + Sync],
    ) -> Result<Vec<Message>, ExchangeError> {
        self.0.encode_unsubscription(channels)
    }

    fn decode_message(&self, message: Message) -> Result<Vec<WireEvent>, ExchangeError> {
        self.0.decode_message(message)
    }

    fn supports_unsubscribe(&self) -> bool {
        false
    }
}

fn ws_config() -> WebSocketConfig {
    WebSocketConfig {
        heartbeat_interval_ms: None,
        reconnect_delay_ms: 1,
        ..WebSocketConfig::default()
    }
}

fn client_with(mock: &MockWs, config: WebSocketConfig) -> PlatformWsClient<MockWs, OkexCodec> {
    let converters = okex::ws_converters(&ExchangeConfig::default()).unwrap();
    PlatformWsClient::new(mock.clone(), OkexCodec::new(), &converters, config).unwrap()
}

fn client(mock: &MockWs) -> PlatformWsClient<MockWs, OkexCodec> {
    client_with(mock, ws_config())
}

fn interval(interval: Interval) -> Params {
    Params::from([(ParamName::Interval, ParamValue::from(interval))])
}

fn channels(frames: &[serde_json::Value], event: &str) -> Vec<String> {
    frames
        .iter()
        .filter(|frame| frame["event"] == event)
        .filter_map(|frame| frame["channel"].as_str().map(str::to_string))
        .collect()
}

#[tokio::test]
async fn test_subscribe_is_idempotent() {
    let mock = MockWs::new();
    let mut ws = client(&mock);
    ws.connect().await.unwrap();

    ws.subscribe(&[Endpoint::Trade], &["btc_usdt"], &Params::new())
        .await
        .unwrap();
    ws.subscribe(&[Endpoint::Trade], &["btc_usdt"], &Params::new())
        .await
        .unwrap();

    assert_eq!(ws.active_subscriptions().count(), 1);
    assert_eq!(
        channels(&mock.sent_json(), "addChannel"),
        vec!["ok_sub_spot_btc_usdt_deals"]
    );
    assert_eq!(ws.state(), ConnectionState::Streaming);
}

#[tokio::test]
async fn test_subscribe_before_connect_is_sent_on_connect() {
    let mock = MockWs::new();
    let mut ws = client(&mock);

    ws.subscribe(
        &[Endpoint::Trade, Endpoint::Candle],
        &["ltc_btc", "eth_btc"],
        &interval(Interval::Min15),
    )
    .await
    .unwrap();
    assert!(mock.sent().is_empty());
    assert_eq!(ws.active_subscriptions().count(), 4);

    ws.connect().await.unwrap();
    let mut sent = channels(&mock.sent_json(), "addChannel");
    sent.sort();
    assert_eq!(
        sent,
        vec![
            "ok_sub_spot_eth_btc_deals",
            "ok_sub_spot_eth_btc_kline_15min",
            "ok_sub_spot_ltc_btc_deals",
            "ok_sub_spot_ltc_btc_kline_15min",
        ]
    );
}

#[tokio::test]
async fn test_deals_are_delivered_to_observers() {
    let mock = MockWs::new();
    let mut ws = client(&mock);
    let mut by_symbol = ws.observe(Endpoint::Trade, Some("bch_btc"));
    let mut all = ws.observe(Endpoint::Trade, None);
    let mut other = ws.observe(Endpoint::Trade, Some("eth_btc"));

    ws.connect().await.unwrap();
    ws.subscribe(&[Endpoint::Trade], &["bch_btc"], &Params::new())
        .await
        .unwrap();

    mock.push_json(&json!([{
        "binary": 0,
        "channel": "ok_sub_spot_bch_btc_deals",
        "data": [["1001", "0.0532", "0.5", "16:34:07", "bid"], ["1002", "0.0531", "1.5", "16:34:08", "ask"]]
    }]));
    assert!(ws.process_next().await.unwrap());

    let first = by_symbol.recv().await.unwrap().into_trade().unwrap();
    assert_eq!(first.symbol, "bch_btc");
    assert_eq!(first.item_id.as_deref(), Some("1001"));
    assert_eq!(first.direction, Some(Direction::Buy));
    let second = by_symbol.recv().await.unwrap().into_trade().unwrap();
    assert_eq!(second.direction, Some(Direction::Sell));

    assert!(matches!(all.try_recv(), Ok(DomainObject::Trade(_))));
    assert!(other.try_recv().is_err());
    assert_eq!(ws.stats().delivered, 2);
}

#[tokio::test]
async fn test_kline_frames_decode_positionally() {
    let mock = MockWs::new();
    let mut ws = client(&mock);
    let mut candles = ws.observe(Endpoint::Candle, None);

    ws.connect().await.unwrap();
    ws.subscribe(&[Endpoint::Candle], &["ltc_btc"], &interval(Interval::Hrs1))
        .await
        .unwrap();

    mock.push_json(&json!([{
        "channel": "ok_sub_spot_ltc_btc_kline_1hour",
        "data": [[1_500_000_000_000_i64, "0.01", "0.02", "0.005", "0.015", "300"]]
    }]));
    mock.push_json(&json!([{
        "channel": "ok_sub_spot_ltc_btc_kline_1hour",
        "data": [1_500_003_600_000_i64, "0.015", "0.02", "0.01", "0.012", "120"]
    }]));
    mock.push_json(&json!([{
        "channel": "ok_sub_spot_ltc_btc_kline_1hour",
        "data": [[1_500_007_200_000_i64, "0.015", "0.02"]]
    }]));
    for _ in 0..3 {
        ws.process_next().await.unwrap();
    }

    let candle = candles.recv().await.unwrap().into_candle().unwrap();
    assert_eq!(candle.timestamp, 1_500_000_000_000);
    assert_eq!(candle.interval, Some(Interval::Hrs1));
    assert_eq!(candle.volume.to_string(), "300");
    let single = candles.recv().await.unwrap().into_candle().unwrap();
    assert_eq!(single.timestamp, 1_500_003_600_000);

    assert_eq!(ws.stats().delivered, 2);
    assert_eq!(ws.stats().decode_failures, 1);
}

#[tokio::test]
async fn test_unrecognized_event_is_counted_not_raised() {
    let mock = MockWs::new();
    let mut ws = client(&mock);
    ws.connect().await.unwrap();
    ws.subscribe(&[Endpoint::Trade], &["btc_usdt"], &Params::new())
        .await
        .unwrap();

    mock.push_json(&json!([{"channel": "unknown_channel", "data": [["1", "2"]]}]));
    assert!(ws.process_next().await.unwrap());

    assert_eq!(ws.stats().ignored_events, 1);
    assert_eq!(ws.stats().delivered, 0);
    assert_eq!(ws.stats().decode_failures, 0);
}

#[tokio::test]
async fn test_platform_error_reaches_error_observers() {
    let mock = MockWs::new();
    let mut ws = client(&mock);
    let mut errors = ws.observe_errors();
    ws.connect().await.unwrap();

    mock.push_json(&json!([{"channel": "addChannel", "data": {"result": false, "error_code": 20116}}]));
    ws.process_next().await.unwrap();

    let info = errors.recv().await.unwrap();
    assert_eq!(info.code, "20116");
    assert_eq!(ws.stats().platform_errors, 1);
}

#[tokio::test]
async fn test_data_outside_streaming_is_dropped() {
    let mock = MockWs::new();
    let mut ws = client(&mock);
    ws.connect().await.unwrap();
    assert_eq!(ws.state(), ConnectionState::Connected);

    mock.push_json(&json!([{"channel": "ok_sub_spot_btc_usdt_deals", "data": [["1", "2", "3", "10:00:00", "bid"]]}]));
    ws.process_next().await.unwrap();

    assert_eq!(ws.stats().dropped_outside_streaming, 1);
    assert_eq!(ws.stats().delivered, 0);
}

#[tokio::test]
async fn test_run_reconnects_and_resubscribes() {
    let mock = MockWs::new();
    let mut ws = client(&mock);
    ws.connect().await.unwrap();
    ws.subscribe(&[Endpoint::Trade], &["btc_usdt", "eth_usdt"], &Params::new())
        .await
        .unwrap();

    mock.fail_next_connects(1);
    mock.push(Inbound::Drop);
    assert!(timeout(Duration::from_millis(200), ws.run()).await.is_err());

    assert_eq!(mock.connects(), 2);
    assert_eq!(ws.stats().reconnects, 1);
    assert_eq!(mock.sent_on_last_connection().len(), 2);
    assert_eq!(ws.active_subscriptions().count(), 2);
    assert_eq!(ws.state(), ConnectionState::Streaming);
}

#[tokio::test]
async fn test_reconnect_gives_up_after_max_attempts() {
    let mock = MockWs::new();
    let mut ws = client_with(
        &mock,
        WebSocketConfig {
            max_reconnect_attempts: 2,
            ..ws_config()
        },
    );

    mock.fail_next_connects(5);
    let err = ws.reconnect().await.unwrap_err();
    assert!(matches!(err, ExchangeError::TransportError(_)));
    assert_eq!(ws.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_run_returns_on_close_without_auto_reconnect() {
    let mock = MockWs::new();
    let mut ws = client_with(
        &mock,
        WebSocketConfig {
            auto_reconnect: false,
            ..ws_config()
        },
    );
    ws.connect().await.unwrap();
    mock.push(Inbound::Close);

    timeout(Duration::from_secs(1), ws.run())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ws.state(), ConnectionState::Disconnected);
    assert_eq!(mock.connects(), 1);
}

#[tokio::test]
async fn test_unsubscribe_sends_remove_channel() {
    let mock = MockWs::new();
    let mut ws = client(&mock);
    ws.connect().await.unwrap();
    ws.subscribe(&[Endpoint::Trade], &["btc_usdt", "eth_usdt"], &Params::new())
        .await
        .unwrap();

    ws.unsubscribe(&[Endpoint::Trade], &["eth_usdt"], &Params::new())
        .await
        .unwrap();

    assert_eq!(
        channels(&mock.sent_json(), "removeChannel"),
        vec!["ok_sub_spot_eth_usdt_deals"]
    );
    let remaining: Vec<&str> = ws.active_subscriptions().map(|(_, channel)| channel).collect();
    assert_eq!(remaining, vec!["ok_sub_spot_btc_usdt_deals"]);

    // a second unsubscribe has nothing left to remove
    mock.clear_sent();
    ws.unsubscribe(&[Endpoint::Trade], &["eth_usdt"], &Params::new())
        .await
        .unwrap();
    assert!(mock.sent().is_empty());
}

#[tokio::test]
async fn test_heartbeat_is_sent_while_idle() {
    let mock = MockWs::new();
    let mut ws = client_with(
        &mock,
        WebSocketConfig {
            heartbeat_interval_ms: Some(20),
            ..ws_config()
        },
    );
    ws.connect().await.unwrap();

    let _ = timeout(Duration::from_millis(100), ws.run()).await;

    assert!(mock
        .sent_json()
        .iter()
        .any(|frame| *frame == json!({"event": "ping"})));
}

#[tokio::test]
async fn test_invalid_subscriptions_leave_active_set_untouched() {
    let mock = MockWs::new();
    let mut ws = client(&mock);
    ws.connect().await.unwrap();

    let err = ws
        .subscribe(&[Endpoint::Trade], &[], &Params::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ExchangeError::ConfigurationError(_)));

    let err = ws
        .subscribe(
            &[Endpoint::Trade, Endpoint::Candle],
            &["btc_usdt"],
            &interval(Interval::Hrs8),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ExchangeError::InvalidParameter(_)));

    let err = ws
        .subscribe(&[Endpoint::TradeHistory], &["btc_usdt"], &Params::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ExchangeError::ConfigurationError(_)));

    assert_eq!(ws.active_subscriptions().count(), 0);
    assert!(mock.sent().is_empty());
}

#[tokio::test]
async fn test_close_forgets_subscriptions() {
    let mock = MockWs::new();
    let mut ws = client(&mock);
    ws.connect().await.unwrap();
    ws.subscribe(&[Endpoint::Trade], &["btc_usdt"], &Params::new())
        .await
        .unwrap();

    ws.close().await.unwrap();
    assert_eq!(ws.active_subscriptions().count(), 0);
    assert_eq!(ws.state(), ConnectionState::Disconnected);

    ws.connect().await.unwrap();
    assert!(mock.sent_on_last_connection().is_empty());
}

#[test]
fn test_unknown_version_fails_construction() {
    let converters = okex::ws_converters(&ExchangeConfig::new().version("3")).unwrap();
    let result = PlatformWsClient::new(MockWs::new(), OkexCodec::new(), &converters, ws_config());
    assert!(matches!(result, Err(ExchangeError::ConfigurationError(_))));
}

#[tokio::test]
async fn test_unsubscribing_everything_stops_delivery() {
    let mock = MockWs::new();
    let mut ws = client(&mock);
    let mut trades = ws.observe(Endpoint::Trade, None);
    ws.connect().await.unwrap();
    ws.subscribe(&[Endpoint::Trade], &["btc_usdt"], &Params::new())
        .await
        .unwrap();

    ws.unsubscribe(&[Endpoint::Trade], &["btc_usdt"], &Params::new())
        .await
        .unwrap();
    assert_eq!(ws.state(), ConnectionState::Connected);

    mock.push_json(&json!([{"channel": "ok_sub_spot_btc_usdt_deals", "data": [["1", "2", "3", "10:00:00", "bid"]]}]));
    ws.process_next().await.unwrap();

    assert_eq!(ws.stats().delivered, 0);
    assert_eq!(ws.stats().dropped_outside_streaming, 1);
    assert!(trades.try_recv().is_err());
}

#[tokio::test]
async fn test_events_for_removed_streams_are_dropped() {
    let mock = MockWs::new();
    let mut ws = client(&mock);
    let mut trades = ws.observe(Endpoint::Trade, None);
    ws.connect().await.unwrap();
    ws.subscribe(&[Endpoint::Trade], &["btc_usdt", "eth_usdt"], &Params::new())
        .await
        .unwrap();
    ws.unsubscribe(&[Endpoint::Trade], &["eth_usdt"], &Params::new())
        .await
        .unwrap();
    assert_eq!(ws.state(), ConnectionState::Streaming);

    mock.push_json(&json!([
        {"channel": "ok_sub_spot_eth_usdt_deals", "data": [["1", "2", "3", "10:00:00", "bid"]]},
        {"channel": "ok_sub_spot_btc_usdt_deals", "data": [["2", "5", "1", "10:00:01", "ask"]]}
    ]));
    ws.process_next().await.unwrap();

    assert_eq!(ws.stats().dropped_unsubscribed, 1);
    assert_eq!(ws.stats().delivered, 1);
    let trade = trades.try_recv().unwrap().into_trade().unwrap();
    assert_eq!(trade.symbol, "btc_usdt");
    assert!(trades.try_recv().is_err());
}

#[tokio::test]
async fn test_unsubscribe_without_command_reconnects_with_remaining_set() {
    let mock = MockWs::new();
    let converters = okex::ws_converters(&ExchangeConfig::default()).unwrap();
    let mut ws = PlatformWsClient::new(
        mock.clone(),
        NoUnsubscribeCodec(OkexCodec::new()),
        &converters,
        ws_config(),
    )
    .unwrap();
    ws.connect().await.unwrap();
    ws.subscribe(&[Endpoint::Trade], &["btc_usdt", "eth_usdt"], &Params::new())
        .await
        .unwrap();
    assert_eq!(mock.connects(), 1);

    ws.unsubscribe(&[Endpoint::Trade], &["eth_usdt"], &Params::new())
        .await
        .unwrap();

    assert!(channels(&mock.sent_json(), "removeChannel").is_empty());
    assert_eq!(mock.connects(), 2);
    let resent: Vec<serde_json::Value> = mock
        .sent_on_last_connection()
        .into_iter()
        .filter_map(|message| match message {
            Message::Text(text) => serde_json::from_str(&text).ok(),
            _ => None,
        })
        .collect();
    assert_eq!(
        channels(&resent, "addChannel"),
        vec!["ok_sub_spot_btc_usdt_deals"]
    );
    assert_eq!(ws.state(), ConnectionState::Streaming);
}

#[tokio::test]
async fn test_failed_resubscribe_leaves_client_disconnected() {
    let mock = MockWs::new();
    let mut ws = client(&mock);
    ws.subscribe(&[Endpoint::Trade], &["btc_usdt"], &Params::new())
        .await
        .unwrap();

    mock.fail_next_sends(1);
    let err = ws.connect().await.unwrap_err();

    assert!(matches!(err, ExchangeError::TransportError(_)));
    assert_eq!(ws.state(), ConnectionState::Disconnected);
    assert_eq!(ws.active_subscriptions().count(), 1);
}
