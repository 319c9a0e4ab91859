use anyhow::Context;
use marketbridge::exchanges::okex;
use marketbridge::{Endpoint, ExchangeConfig, ExchangeFactory, Interval, Params, Platform};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const SYMBOL: &str = "btc_usdt";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let source = ExchangeFactory::create_source_from_env(Platform::Okex)
        .context("Failed to build OKEx REST client")?;

    println!("Fetching recent trades for {}...", SYMBOL);
    match source.fetch_trades(SYMBOL, Some(5), Params::new()).await {
        Ok(trades) => {
            println!("Got {} trades", trades.len());
            for trade in trades.iter().take(5) {
                println!(
                    "  {} {:?} price={} amount={:?}",
                    trade.timestamp, trade.direction, trade.price, trade.amount
                );
            }
        }
        Err(e) => println!("Error fetching trades: {}", e),
    }

    println!("Fetching 1h candles for {}...", SYMBOL);
    match source
        .fetch_candles(SYMBOL, Interval::Hrs1, Some(5), None, Params::new())
        .await
    {
        Ok(candles) => {
            for candle in &candles {
                println!(
                    "  {} O={} H={} L={} C={} V={}",
                    candle.timestamp, candle.open, candle.high, candle.low, candle.close, candle.volume
                );
            }
        }
        Err(e) => println!("Error fetching candles: {}", e),
    }

    println!("Streaming deals for {} for 10 seconds...", SYMBOL);
    let mut ws = okex::build_ws_client(ExchangeConfig::from_env("OKEX")?)?;
    let mut trades = ws.observe(Endpoint::Trade, Some(SYMBOL));
    ws.subscribe(&[Endpoint::Trade], &[SYMBOL], &Params::new())
        .await?;

    let printer = tokio::spawn(async move {
        while let Some(object) = trades.recv().await {
            if let Some(trade) = object.into_trade() {
                println!("  live {} {:?} {}", trade.timestamp, trade.direction, trade.price);
            }
        }
    });

    match tokio::time::timeout(Duration::from_secs(10), ws.run()).await {
        Ok(Err(e)) => println!("Stream ended with error: {}", e),
        Ok(Ok(())) => println!("Stream closed"),
        Err(_) => println!("Done. Stats: {:?}", ws.stats()),
    }
    ws.close().await?;
    printer.abort();

    Ok(())
}
