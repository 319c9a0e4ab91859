//! Kernel - exchange-agnostic transport layer
//!
//! The kernel holds only transport logic and the generic interfaces the
//! clients talk to. It knows nothing about channels, params or domain objects;
//! those belong to the converter.
//!
//! # Components
//!
//! - `RestClient`: HTTP interface, implemented by `ReqwestRest`
//! - `WsSession`: WebSocket connection, implemented by `TungsteniteWs`
//! - `WsCodec`: exchange-specific envelope encoding and frame splitting
//!
//! # Usage
//!
//! ```rust,no_run
//! use marketbridge::core::kernel::*;
//!
//! # async fn example() -> Result<(), marketbridge::ExchangeError> {
//! let config = RestClientConfig::new(
//!     "https://www.okex.com/api/v1/".to_string(),
//!     "okex".to_string(),
//! );
//! let rest = RestClientBuilder::new(config).build()?;
//! let trades = rest.get("trades.do", &[("symbol", "btc_usdt")]).await?;
//! println!("{}", trades);
//! # Ok(())
//! # }
//! ```
pub mod codec;
pub mod rest;
pub mod ws;

pub use codec::{WireEvent, WsCodec};
pub use rest::{ReqwestRest, RestClient, RestClientBuilder, RestClientConfig};
pub use ws::{ConnectionStats, TungsteniteWs, WsConfig, WsSession};
