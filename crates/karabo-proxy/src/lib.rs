//! Karabo WebProxy Client Library
//!
//! Provides typed access to a Karabo WebProxy, the HTTP gateway that exposes
//! a Karabo topology (devices, servers, properties and slots) as REST/JSON.
//!
//! Two clients share one request/response mapping:
//!
//! - [`AsyncKaraboProxy`] awaits each request on the caller's runtime.
//! - [`SyncKaraboProxy`] blocks the calling thread for each request.
//!
//! Read operations return `Err(ProxyError)` for every failure. Write
//! operations return a [`WriteResponse`] whose `success` flag carries
//! HTTP-level failures, so callers branch on it instead of matching errors.
//!
//! # Example
//!
//! ```rust,no_run
//! use karabo_proxy::{AsyncKaraboProxy, PropertyValue};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let proxy = AsyncKaraboProxy::new("http://localhost:8282")?;
//!
//!     let topology = proxy.get_topology().await?;
//!     println!("{} devices online", topology.devices.len());
//!
//!     proxy.set_access_token("<token>")?;
//!     let result = proxy
//!         .set_device_config_path("KARABO_DATALOGGERMANAGER_0", "flushInterval", 85)
//!         .await?;
//!     if !result.success {
//!         eprintln!("write rejected: {}", result.reason);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Testing
//!
//! The `testing` module serves an axum router on an ephemeral port and hands
//! out a client pointed at it:
//!
//! ```rust,ignore
//! use karabo_proxy::testing::TestServer;
//!
//! let server = TestServer::start(mock_web_proxy()).await?;
//! let topology = server.client.get_topology().await?;
//! ```

mod blocking;
mod classify;
mod client;
pub mod config;
mod error;
pub mod message;
mod request;
pub mod testing;
mod types;

pub use blocking::SyncKaraboProxy;
pub use classify::{classify, read_outcome, write_outcome};
pub use client::AsyncKaraboProxy;
pub use config::ProxyConfig;
pub use error::{ErrorKind, ProxyError, Result};
pub use request::ProxyRequest;
pub use types::*;
