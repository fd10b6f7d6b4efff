//! Karabo Pipeline Channel Client
//!
//! Connects to a Karabo output channel, announces itself with a `hello`
//! handshake and receives data as binary-encoded [`Hash`] records. Each
//! message on the wire is a 4-byte little-endian length followed by that
//! many bytes.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use karabo_channel::{AsyncChannelClient, ChannelConfig, ChannelHandler, Hash};
//!
//! struct Printer;
//!
//! #[async_trait]
//! impl ChannelHandler for Printer {
//!     async fn on_data(&self, data: Hash, meta: Hash) -> anyhow::Result<()> {
//!         println!("{:?} from {:?}", data.keys().collect::<Vec<_>>(), meta.get("source"));
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ChannelConfig::new("exflqr30450", 38198);
//!     let mut client = AsyncChannelClient::new(config, Arc::new(Printer));
//!     client.connect();
//!
//!     tokio::signal::ctrl_c().await.ok();
//!     client.cancel();
//!     client.wait_closed().await;
//! }
//! ```

pub mod codec;
pub mod config;
mod client;
mod error;
mod frame;
mod handler;
mod hash;

pub use client::{AsyncChannelClient, ChannelState, REBOUND_SLEEP};
pub use config::{ChannelConfig, DataDistribution, OnSlowness};
pub use error::{ChannelError, HashError};
pub use frame::{Channel, DEFAULT_MAX_MESSAGE_SIZE};
pub use handler::{ChannelHandler, LoggingHandler};
pub use hash::{Hash, HashValue, Node, ValueType};
