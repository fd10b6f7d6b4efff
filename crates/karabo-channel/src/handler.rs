//! Callbacks invoked by the channel client

use async_trait::async_trait;
use tracing::info;

use crate::hash::Hash;

/// Receives events from an [`AsyncChannelClient`](crate::AsyncChannelClient)
///
/// Calls are serialized: no two handler bodies run at the same time. An
/// error or panic is logged and otherwise ignored. Every method has a
/// default that only logs, so implementors override what they need.
#[async_trait]
pub trait ChannelHandler: Send + Sync + 'static {
    /// Connection established, before the handshake is sent
    async fn on_connect(&self, channel: &str) -> anyhow::Result<()> {
        info!(channel, "Connect handler called");
        Ok(())
    }

    /// One data chunk with its source metadata
    async fn on_data(&self, data: Hash, meta: Hash) -> anyhow::Result<()> {
        let _ = data;
        info!(meta = ?meta, "Received data");
        Ok(())
    }

    async fn on_end_of_stream(&self, channel: &str) -> anyhow::Result<()> {
        info!(channel, "EndOfStream handler called");
        Ok(())
    }

    /// Stream ended or failed; not called on cancellation
    async fn on_close(&self, channel: &str) -> anyhow::Result<()> {
        info!(channel, "Close handler called");
        Ok(())
    }
}

/// Handler that only logs what it receives
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ChannelHandler for LoggingHandler {}
