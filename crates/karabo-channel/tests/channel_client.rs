//! AsyncChannelClient against a fake output channel on a local TCP listener

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use karabo_channel::{
    codec, AsyncChannelClient, Channel, ChannelConfig, ChannelHandler, ChannelState, Hash,
    HashValue,
};
use pretty_assertions::assert_eq;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

const WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Connect(String),
    Data(Hash, Hash),
    EndOfStream,
    Close,
}

struct Recorder {
    tx: mpsc::UnboundedSender<Event>,
}

#[async_trait]
impl ChannelHandler for Recorder {
    async fn on_connect(&self, channel: &str) -> anyhow::Result<()> {
        self.tx.send(Event::Connect(channel.to_string()))?;
        Ok(())
    }

    async fn on_data(&self, data: Hash, meta: Hash) -> anyhow::Result<()> {
        self.tx.send(Event::Data(data, meta))?;
        Ok(())
    }

    async fn on_end_of_stream(&self, _channel: &str) -> anyhow::Result<()> {
        self.tx.send(Event::EndOfStream)?;
        Ok(())
    }

    async fn on_close(&self, _channel: &str) -> anyhow::Result<()> {
        self.tx.send(Event::Close)?;
        Ok(())
    }
}

fn recorder() -> (Arc<Recorder>, mpsc::UnboundedReceiver<Event>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(Recorder { tx }), rx)
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<Event>) -> Event {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for handler event")
        .expect("handler channel closed")
}

async fn listen() -> (TcpListener, u16) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

fn config(port: u16) -> ChannelConfig {
    ChannelConfig::new("127.0.0.1", port).with_reconnect_delay(Duration::from_millis(50))
}

/// Accept one input and consume its handshake
async fn accept(listener: &TcpListener) -> (Channel<TcpStream>, Hash) {
    let (stream, _) = tokio::time::timeout(WAIT, listener.accept())
        .await
        .expect("timed out waiting for connection")
        .unwrap();
    let mut channel = Channel::new(stream);
    let hello = channel.read_hash().await.unwrap().expect("missing hello");
    (channel, hello)
}

async fn send_data(channel: &mut Channel<TcpStream>, chunks: &[(Hash, Hash)]) {
    let mut payload = BytesMut::new();
    let mut sizes = Vec::new();
    for (data, _) in chunks {
        let encoded = codec::encode(data).unwrap();
        sizes.push(encoded.len() as u32);
        payload.extend_from_slice(&encoded);
    }
    let metas: Vec<Hash> = chunks.iter().map(|(_, meta)| meta.clone()).collect();
    let header = Hash::new().with("byteSizes", sizes).with("sourceInfo", metas);
    channel.write_hash(&header).await.unwrap();
    channel.write_bytes(payload.freeze()).await.unwrap();
}

async fn expect_ack(channel: &mut Channel<TcpStream>, name: &str) {
    let ack = channel.read_hash().await.unwrap().expect("missing ack");
    assert_eq!(ack.get("reason").and_then(HashValue::as_str), Some("update"));
    assert_eq!(ack.get("instanceId").and_then(HashValue::as_str), Some(name));
}

fn sample(train: u64, source: &str) -> (Hash, Hash) {
    (
        Hash::new()
            .with("trainId", train)
            .with("image", vec![1.0f32, 2.0, 3.0]),
        Hash::new().with("source", source),
    )
}

#[tokio::test]
async fn test_data_then_end_of_stream_reconnects_once() {
    let (listener, port) = listen().await;
    let (handler, mut rx) = recorder();
    let mut client = AsyncChannelClient::new(config(port), handler);
    let name = client.name().to_string();
    assert_eq!(name, format!("AsyncChannelClient<127.0.0.1:{port}>"));

    client.connect();
    assert!(client.is_initialized());

    let (mut output, hello) = accept(&listener).await;
    assert_eq!(hello.get("reason").and_then(HashValue::as_str), Some("hello"));
    assert_eq!(hello.get("instanceId").and_then(HashValue::as_str), Some(name.as_str()));
    assert_eq!(hello.get("memoryLocation").and_then(HashValue::as_str), Some("remote"));
    assert_eq!(hello.get("dataDistribution").and_then(HashValue::as_str), Some("copy"));
    assert_eq!(hello.get("onSlowness").and_then(HashValue::as_str), Some("drop"));

    let chunks = [sample(1, "SA1/DET/0:output"), sample(2, "SA1/DET/1:output")];
    send_data(&mut output, &chunks).await;
    expect_ack(&mut output, &name).await;
    drop(output);

    assert_eq!(next_event(&mut rx).await, Event::Connect(name.clone()));
    assert_eq!(
        next_event(&mut rx).await,
        Event::Data(chunks[0].0.clone(), chunks[0].1.clone())
    );
    assert_eq!(
        next_event(&mut rx).await,
        Event::Data(chunks[1].0.clone(), chunks[1].1.clone())
    );
    assert_eq!(next_event(&mut rx).await, Event::Close);

    let (_second, hello) = accept(&listener).await;
    assert_eq!(hello.get("reason").and_then(HashValue::as_str), Some("hello"));
    assert_eq!(next_event(&mut rx).await, Event::Connect(name.clone()));

    client.cancel();
    tokio::time::timeout(WAIT, client.wait_closed()).await.unwrap();
    assert_eq!(client.state(), ChannelState::Disconnected);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_end_of_stream_marker_is_acknowledged() {
    let (listener, port) = listen().await;
    let (handler, mut rx) = recorder();
    let mut client = AsyncChannelClient::new(config(port).with_reconnect(false), handler);
    let name = client.name().to_string();
    client.connect();

    let (mut output, _) = accept(&listener).await;
    output
        .write_hash(&Hash::new().with("endOfStream", true))
        .await
        .unwrap();
    output.write_bytes(bytes::Bytes::new()).await.unwrap();
    expect_ack(&mut output, &name).await;

    let chunks = [sample(3, "SA1/DET/0:output")];
    send_data(&mut output, &chunks).await;
    expect_ack(&mut output, &name).await;
    drop(output);

    assert_eq!(next_event(&mut rx).await, Event::Connect(name));
    assert_eq!(next_event(&mut rx).await, Event::EndOfStream);
    assert!(matches!(next_event(&mut rx).await, Event::Data(..)));
    assert_eq!(next_event(&mut rx).await, Event::Close);

    tokio::time::timeout(WAIT, client.wait_closed()).await.unwrap();
    assert!(!client.is_running());
    assert_eq!(client.state(), ChannelState::Disconnected);
}

#[tokio::test]
async fn test_connection_refused_without_reconnect() {
    let (listener, port) = listen().await;
    drop(listener);

    let (handler, mut rx) = recorder();
    let mut client = AsyncChannelClient::new(config(port).with_reconnect(false), handler);
    client.connect();

    assert_eq!(next_event(&mut rx).await, Event::Close);
    tokio::time::timeout(WAIT, client.wait_closed()).await.unwrap();
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_overrunning_byte_sizes_closes_channel() {
    let (listener, port) = listen().await;
    let (handler, mut rx) = recorder();
    let mut client = AsyncChannelClient::new(config(port).with_reconnect(false), handler);
    let name = client.name().to_string();
    client.connect();

    let (mut output, _) = accept(&listener).await;
    let header = Hash::new()
        .with("byteSizes", vec![64u32])
        .with("sourceInfo", vec![Hash::new().with("source", "x")]);
    output.write_hash(&header).await.unwrap();
    output
        .write_bytes(bytes::Bytes::from_static(b"short"))
        .await
        .unwrap();
    expect_ack(&mut output, &name).await;

    assert_eq!(next_event(&mut rx).await, Event::Connect(name));
    assert_eq!(next_event(&mut rx).await, Event::Close);
    tokio::time::timeout(WAIT, client.wait_closed()).await.unwrap();
}

#[tokio::test]
async fn test_oversized_message_closes_channel() {
    let (listener, port) = listen().await;
    let (handler, mut rx) = recorder();
    let config = config(port)
        .with_reconnect(false)
        .with_max_message_size(1024);
    let mut client = AsyncChannelClient::new(config, handler);
    client.connect();

    let (output, _) = accept(&listener).await;
    let mut stream = output.into_inner();
    stream.write_all(&u32::MAX.to_le_bytes()).await.unwrap();

    assert!(matches!(next_event(&mut rx).await, Event::Connect(_)));
    assert_eq!(next_event(&mut rx).await, Event::Close);
    tokio::time::timeout(WAIT, client.wait_closed()).await.unwrap();
}

#[tokio::test]
async fn test_cancel_while_streaming_skips_close_handler() {
    let (listener, port) = listen().await;
    let (handler, mut rx) = recorder();
    let mut client = AsyncChannelClient::new(config(port), handler);
    let mut state = client.watch_state();
    client.connect();

    let (_output, _) = accept(&listener).await;
    assert!(matches!(next_event(&mut rx).await, Event::Connect(_)));
    tokio::time::timeout(WAIT, state.wait_for(|s| *s == ChannelState::Streaming))
        .await
        .unwrap()
        .unwrap();

    client.cancel();
    tokio::time::timeout(WAIT, client.wait_closed()).await.unwrap();
    assert_eq!(client.state(), ChannelState::Disconnected);
    assert!(rx.try_recv().is_err());
}

/// Fails on the first chunk and panics on the second
struct Unruly {
    calls: AtomicUsize,
    tx: mpsc::UnboundedSender<u64>,
}

#[async_trait]
impl ChannelHandler for Unruly {
    async fn on_data(&self, data: Hash, _meta: Hash) -> anyhow::Result<()> {
        match self.calls.fetch_add(1, Ordering::SeqCst) {
            0 => anyhow::bail!("cannot handle train"),
            1 => panic!("handler bug"),
            _ => {}
        }
        let train = data.get("trainId").and_then(HashValue::as_i64).unwrap_or(-1);
        self.tx.send(train as u64)?;
        Ok(())
    }
}

#[tokio::test]
async fn test_failing_handlers_do_not_stop_the_stream() {
    let (listener, port) = listen().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handler = Arc::new(Unruly {
        calls: AtomicUsize::new(0),
        tx,
    });
    let mut client = AsyncChannelClient::new(config(port).with_reconnect(false), handler);
    let name = client.name().to_string();
    client.connect();

    let (mut output, _) = accept(&listener).await;
    let chunks = [
        sample(10, "a"),
        sample(11, "b"),
        sample(12, "c"),
    ];
    send_data(&mut output, &chunks).await;
    expect_ack(&mut output, &name).await;

    let train = tokio::time::timeout(WAIT, rx.recv()).await.unwrap();
    assert_eq!(train, Some(12));

    // The loop is still reading after the failures
    send_data(&mut output, &[sample(13, "d")]).await;
    expect_ack(&mut output, &name).await;
    let train = tokio::time::timeout(WAIT, rx.recv()).await.unwrap();
    assert_eq!(train, Some(13));

    client.cancel();
    tokio::time::timeout(WAIT, client.wait_closed()).await.unwrap();
}
