//! Output channel client: connect, handshake, read loop and reconnection

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::net::TcpStream;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::codec;
use crate::config::ChannelConfig;
use crate::error::{ChannelError, HashError, Result};
use crate::frame::Channel;
use crate::handler::ChannelHandler;
use crate::hash::Hash;

/// Default pause before reconnecting
pub const REBOUND_SLEEP: Duration = Duration::from_secs(2);

/// Lifecycle of the channel connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Handshaking,
    Streaming,
    Closing,
    Reconnecting,
}

/// Client for a Karabo pipeline output channel
///
/// [`connect`](Self::connect) spawns a task on the current Tokio runtime that
/// drives the connection until it is cancelled or, with reconnection
/// disabled, until the stream ends. Dropping the client cancels that task.
pub struct AsyncChannelClient {
    inner: Arc<Inner>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

struct Inner {
    config: ChannelConfig,
    name: String,
    handler: Arc<dyn ChannelHandler>,
    handler_lock: Mutex<()>,
    state: watch::Sender<ChannelState>,
    initialized: AtomicBool,
}

impl AsyncChannelClient {
    pub fn new(config: ChannelConfig, handler: Arc<dyn ChannelHandler>) -> Self {
        let (state, _) = watch::channel(ChannelState::Disconnected);
        Self {
            inner: Arc::new(Inner {
                name: config.name(),
                config,
                handler,
                handler_lock: Mutex::new(()),
                state,
                initialized: AtomicBool::new(false),
            }),
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.inner.config
    }

    /// Start driving the connection in a background task
    ///
    /// Does nothing if a task is already running. Must be called from
    /// within a Tokio runtime.
    pub fn connect(&mut self) {
        if self.is_running() {
            warn!(channel = %self.inner.name, "Channel already running");
            return;
        }
        self.cancel = CancellationToken::new();
        self.inner.initialized.store(true, Ordering::Release);
        let inner = Arc::clone(&self.inner);
        let cancel = self.cancel.clone();
        self.task = Some(tokio::spawn(inner.run(cancel)));
    }

    /// Interrupt the connection without calling the close handler
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn stop(&self) {
        self.cancel();
    }

    /// Wait until the background task has finished
    pub async fn wait_closed(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        if let Err(e) = task.await {
            if e.is_panic() {
                error!(channel = %self.inner.name, "Channel task panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Whether a connection attempt has ever been started
    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::Acquire)
    }

    pub fn state(&self) -> ChannelState {
        *self.inner.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ChannelState> {
        self.inner.state.subscribe()
    }
}

impl Drop for AsyncChannelClient {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl Inner {
    #[instrument(skip_all, fields(channel = %self.name))]
    async fn run(self: Arc<Self>, cancel: CancellationToken) {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Channel cancelled");
            }
            _ = self.drive() => {}
        }
        self.set_state(ChannelState::Disconnected);
    }

    async fn drive(self: &Arc<Self>) {
        let host = self.config.host.as_str();
        let port = self.config.port;
        loop {
            match self.session().await {
                Ok(()) => info!("Stream finished"),
                Err(e) => warn!(error = %e, "Channel failed"),
            }

            self.set_state(ChannelState::Closing);
            self.call_handler("close", |handler, name| async move {
                handler.on_close(&name).await
            })
            .await;

            if !self.config.reconnect {
                info!("Exiting channel");
                return;
            }
            self.set_state(ChannelState::Reconnecting);
            info!(
                host,
                port,
                delay_ms = self.config.reconnect_delay.as_millis() as u64,
                "Trying to reconnect"
            );
            tokio::time::sleep(self.config.reconnect_delay).await;
        }
    }

    /// One connection from connect to end of stream
    async fn session(self: &Arc<Self>) -> Result<()> {
        self.set_state(ChannelState::Connecting);
        info!(host = %self.config.host, port = self.config.port, "Connecting");
        let stream = TcpStream::connect((self.config.host.as_str(), self.config.port)).await?;
        let mut channel = Channel::with_max_message_size(stream, self.config.max_message_size);

        let result = self.stream(&mut channel).await;
        if let Err(e) = channel.close().await {
            debug!(error = %e, "Error closing channel");
        }
        result
    }

    async fn stream(self: &Arc<Self>, channel: &mut Channel<TcpStream>) -> Result<()> {
        self.set_state(ChannelState::Handshaking);
        self.call_handler("connect", |handler, name| async move {
            handler.on_connect(&name).await
        })
        .await;
        channel.write_hash(&self.hello()).await?;

        self.set_state(ChannelState::Streaming);
        while self.process_chunk(channel).await? {
            if !self.config.delay_on_input.is_zero() {
                tokio::time::sleep(self.config.delay_on_input).await;
            }
            debug!("Requesting new data");
        }
        Ok(())
    }

    /// Handle one header/payload pair; `false` once the peer closed the stream
    async fn process_chunk(self: &Arc<Self>, channel: &mut Channel<TcpStream>) -> Result<bool> {
        let Some(header) = channel.read_hash().await? else {
            return Ok(false);
        };
        let data = channel
            .read_bytes()
            .await?
            .ok_or(ChannelError::UnexpectedEof)?;
        channel.write_hash(&self.update()).await?;

        if header.contains("endOfStream") {
            self.call_handler("end_of_stream", |handler, name| async move {
                handler.on_end_of_stream(&name).await
            })
            .await;
            return Ok(true);
        }

        let (sizes, sources) = chunk_layout(&header)?;
        debug!(chunks = sizes.len(), bytes = data.len(), "Received data");
        let mut pos = 0;
        for (size, meta) in sizes.into_iter().zip(sources) {
            let chunk = slice_chunk(&data, pos, size)?;
            let chunk = codec::decode(&chunk)?;
            self.call_handler("data", move |handler, _| async move {
                handler.on_data(chunk, meta).await
            })
            .await;
            pos += size;
        }
        Ok(true)
    }

    /// Run one handler call under the handler lock
    ///
    /// The call runs as its own task, so cancelling the channel does not
    /// interrupt it. Errors and panics are logged and dropped.
    async fn call_handler<F, Fut>(self: &Arc<Self>, event: &'static str, call: F)
    where
        F: FnOnce(Arc<dyn ChannelHandler>, String) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let inner = Arc::clone(self);
        let task = tokio::spawn(async move {
            let _guard = inner.handler_lock.lock().await;
            call(Arc::clone(&inner.handler), inner.name.clone()).await
        });
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(event, error = %e, "Handler failed"),
            Err(e) if e.is_panic() => error!(event, "Handler panicked"),
            Err(e) => warn!(event, error = %e, "Handler aborted"),
        }
    }

    fn hello(&self) -> Hash {
        Hash::new()
            .with("reason", "hello")
            .with("instanceId", self.name.as_str())
            .with("memoryLocation", "remote")
            .with("dataDistribution", self.config.data_distribution.as_str())
            .with("onSlowness", self.config.on_slowness.as_str())
            .with("maxQueueLength", self.config.max_queue_length)
    }

    fn update(&self) -> Hash {
        Hash::new()
            .with("reason", "update")
            .with("instanceId", self.name.as_str())
    }

    fn set_state(&self, state: ChannelState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(from = ?previous, to = ?state, "State changed");
        }
    }
}

/// Chunk sizes and source metadata from a data header, paired in order
fn chunk_layout(header: &Hash) -> std::result::Result<(Vec<usize>, Vec<Hash>), HashError> {
    let sizes = header
        .get("byteSizes")
        .ok_or(HashError::MissingField("byteSizes"))?
        .to_sizes()
        .ok_or(HashError::UnexpectedType("byteSizes"))?;
    let sources = header
        .get("sourceInfo")
        .ok_or(HashError::MissingField("sourceInfo"))?
        .as_hashes()
        .ok_or(HashError::UnexpectedType("sourceInfo"))?
        .to_vec();
    Ok((sizes, sources))
}

fn slice_chunk(data: &Bytes, offset: usize, size: usize) -> std::result::Result<Bytes, HashError> {
    match offset.checked_add(size) {
        Some(end) if end <= data.len() => Ok(data.slice(offset..end)),
        _ => Err(HashError::ChunkOverrun {
            offset,
            size,
            total: data.len(),
        }),
    }
}
