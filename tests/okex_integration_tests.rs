mod common;

use common::TestConfig;
use marketbridge::exchanges::okex;
use marketbridge::{
    Endpoint, ExchangeConfig, ExchangeFactory, Interval, MarketDataSource, Params, Platform,
    WebSocketConfig,
};
use std::time::Duration;
use tokio::time::timeout;

const SYMBOL: &str = "btc_usdt";

fn live_source() -> Box<dyn MarketDataSource> {
    ExchangeFactory::create_source(Platform::Okex, None).unwrap()
}

#[cfg(test)]
mod live_tests {
    use super::*;

    #[tokio::test]
    async fn test_okex_recent_trades() {
        if !TestConfig::should_run_integration_tests() {
            println!("⚠️ Skipping OKEx live trades (set RUN_INTEGRATION_TESTS=true)");
            return;
        }

        let source = live_source();
        let result = timeout(
            TestConfig::test_timeout(),
            source.fetch_trades(SYMBOL, Some(10), Params::new()),
        )
        .await;

        match result {
            Ok(Ok(trades)) => {
                println!("✅ OKEx: fetched {} trades", trades.len());
                for trade in &trades {
                    assert_eq!(trade.symbol, SYMBOL);
                    assert!(trade.timestamp > 1_000_000_000_000);
                    assert!(trade.price.value() > rust_decimal::Decimal::ZERO);
                }
            }
            Ok(Err(e)) => println!("⚠️ OKEx trades failed: {}", e),
            Err(_) => println!("⚠️ OKEx trades timed out"),
        }
    }

    #[tokio::test]
    async fn test_okex_candles() {
        if !TestConfig::should_run_integration_tests() {
            println!("⚠️ Skipping OKEx live candles (set RUN_INTEGRATION_TESTS=true)");
            return;
        }

        let source = live_source();
        let result = timeout(
            TestConfig::test_timeout(),
            source.fetch_candles(SYMBOL, Interval::Min15, Some(5), None, Params::new()),
        )
        .await;

        match result {
            Ok(Ok(candles)) => {
                println!("✅ OKEx: fetched {} candles", candles.len());
                for candle in &candles {
                    assert!(candle.high >= candle.low);
                    assert_eq!(candle.interval, Some(Interval::Min15));
                }
            }
            Ok(Err(e)) => println!("⚠️ OKEx candles failed: {}", e),
            Err(_) => println!("⚠️ OKEx candles timed out"),
        }
    }

    #[tokio::test]
    async fn test_okex_deal_stream() {
        if !TestConfig::should_run_integration_tests() {
            println!("⚠️ Skipping OKEx live stream (set RUN_INTEGRATION_TESTS=true)");
            return;
        }

        let config = ExchangeConfig::new().websocket(WebSocketConfig {
            auto_reconnect: false,
            ..WebSocketConfig::default()
        });
        let mut ws = match okex::build_ws_client(config) {
            Ok(ws) => ws,
            Err(e) => {
                println!("⚠️ OKEx WebSocket client failed to build: {}", e);
                return;
            }
        };
        let mut trades = ws.observe(Endpoint::Trade, Some(SYMBOL));

        if let Err(e) = ws.connect().await {
            println!("⚠️ OKEx WebSocket connect failed: {}", e);
            return;
        }
        if let Err(e) = ws
            .subscribe(&[Endpoint::Trade], &[SYMBOL], &Params::new())
            .await
        {
            println!("⚠️ OKEx subscribe failed: {}", e);
            return;
        }

        let _ = timeout(Duration::from_secs(15), ws.run()).await;
        let received = std::iter::from_fn(|| trades.try_recv().ok()).count();
        println!(
            "✅ OKEx stream: {} trades received, stats {:?}",
            received,
            ws.stats()
        );
        let _ = ws.close().await;
    }
}
