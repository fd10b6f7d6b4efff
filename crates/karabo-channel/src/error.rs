//! Error types for the channel client

use thiserror::Error;

/// Failure decoding or encoding a binary Hash
#[derive(Error, Debug)]
pub enum HashError {
    #[error("truncated record: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    #[error("unknown type code {0}")]
    UnknownType(u32),

    #[error("invalid UTF-8 in key or string")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("key too long ({0} bytes, max 255)")]
    KeyTooLong(usize),

    #[error("length {0} does not fit the wire format")]
    TooLarge(usize),

    #[error("record nested deeper than {0} levels")]
    TooDeep(usize),

    #[error("missing field '{0}'")]
    MissingField(&'static str),

    #[error("field '{0}' has an unexpected type")]
    UnexpectedType(&'static str),

    #[error("chunk of {size} bytes at offset {offset} overruns payload of {total} bytes")]
    ChunkOverrun {
        offset: usize,
        size: usize,
        total: usize,
    },
}

/// Failure on an output channel connection
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed mid-message")]
    UnexpectedEof,

    #[error("decode error: {0}")]
    Hash(#[from] HashError),
}

pub type Result<T> = std::result::Result<T, ChannelError>;
