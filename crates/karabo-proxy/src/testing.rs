//! Mock WebProxy harness for integration tests
//!
//! Serves any axum router on an ephemeral local port and hands out an
//! [`AsyncKaraboProxy`] pointed at it.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::{AsyncKaraboProxy, ProxyConfig, Result};

/// A mock WebProxy that shuts down when dropped
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: AsyncKaraboProxy,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    /// Serve `router` with a client using short timeouts
    ///
    /// ```ignore
    /// use axum::{routing::get, Router};
    /// use karabo_proxy::testing::TestServer;
    ///
    /// let router = Router::new().route("/topology.json", get(topology));
    /// let server = TestServer::start(router).await?;
    /// let topology = server.client.get_topology().await?;
    /// ```
    pub async fn start(router: axum::Router) -> Result<Self> {
        Self::start_with(router, |config| config).await
    }

    /// Serve `router`; `configure` adjusts the client configuration
    /// (token, timeouts) before the client is built
    pub async fn start_with(
        router: axum::Router,
        configure: impl FnOnce(ProxyConfig) -> ProxyConfig,
    ) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let mut config = ProxyConfig::new(format!("http://{addr}"));
        config.timeout = Duration::from_secs(5);
        config.connect_timeout = Duration::from_secs(2);
        let client = AsyncKaraboProxy::from_config(&configure(config))?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await
            {
                tracing::warn!(error = %e, "Mock WebProxy stopped");
            }
        });

        Ok(Self {
            addr,
            client,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Base URL of the mock, without trailing slash
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop accepting requests and wait for in-flight ones to finish
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
