//! Length-prefixed framing of binary Hashes over a byte stream

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::codec;
use crate::error::Result;
use crate::hash::Hash;

/// Largest message accepted by [`Channel::new`]
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 256 * 1024 * 1024;

/// Reads and writes Hash messages on one output channel connection
///
/// Every message is a `u32` little-endian length followed by that many bytes.
pub struct Channel<T> {
    framed: Framed<T, LengthDelimitedCodec>,
}

impl<T> Channel<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(io: T) -> Self {
        Self::with_max_message_size(io, DEFAULT_MAX_MESSAGE_SIZE)
    }

    /// A length prefix above `max_size` fails the read before any buffer
    /// is reserved for it
    pub fn with_max_message_size(io: T, max_size: usize) -> Self {
        let codec = LengthDelimitedCodec::builder()
            .little_endian()
            .length_field_length(4)
            .max_frame_length(max_size)
            .new_codec();
        Self {
            framed: Framed::new(io, codec),
        }
    }

    /// Read the next message
    ///
    /// Returns `Ok(None)` when the peer closed the stream between messages;
    /// a stream ending inside a message is an error.
    pub async fn read_bytes(&mut self) -> Result<Option<Bytes>> {
        match self.framed.next().await {
            Some(frame) => Ok(Some(frame?.freeze())),
            None => Ok(None),
        }
    }

    /// Read and decode the next message as a Hash
    pub async fn read_hash(&mut self) -> Result<Option<Hash>> {
        match self.read_bytes().await? {
            Some(bytes) => Ok(Some(codec::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn write_bytes(&mut self, data: Bytes) -> Result<()> {
        self.framed.send(data).await?;
        Ok(())
    }

    pub async fn write_hash(&mut self, hash: &Hash) -> Result<()> {
        self.write_bytes(codec::encode(hash)?).await
    }

    /// Give back the underlying stream, dropping buffered bytes
    pub fn into_inner(self) -> T {
        self.framed.into_inner()
    }

    /// Shut down the write half; handlers are not involved
    pub async fn close(&mut self) -> Result<()> {
        SinkExt::<Bytes>::close(&mut self.framed).await?;
        Ok(())
    }
}
