//! Error types for request dispatch and message framing.

use std::{io, path::PathBuf};

use sokobots_core::{LoadError, SpawnError};

/// Errors surfaced to clients as `{"status": "error"}` responses.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The request names an action the engine does not know.
    #[error("unknown action: {0:?}")]
    UnknownAction(String),

    /// The request is not an object with a string `action`, or its fields have
    /// the wrong shape.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// A spawn request named a controller command that does not exist.
    #[error("unsupported controller command: {0:?}")]
    UnsupportedCommand(String),

    /// The level description was rejected.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// The spawn request was rejected.
    #[error(transparent)]
    Spawn(#[from] SpawnError),

    /// The level file could not be read from disk.
    #[error("cannot read level file {}: {source}", .path.display())]
    LevelUnreadable {
        /// Resolved path of the level file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

impl DispatchError {
    /// Stable machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownAction(_) => "unknown_action",
            Self::MalformedRequest(_) => "malformed_request",
            Self::UnsupportedCommand(_) => "invalid_command",
            Self::Load(error) => error.code(),
            Self::Spawn(error) => error.code(),
            Self::LevelUnreadable { .. } => "level_unreadable",
        }
    }
}

/// Errors that end a transport session.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The peer closed the stream part-way through a message.
    #[error("short read: expected {expected} bytes, received {received}")]
    ShortRead {
        /// Bytes the frame declared.
        expected: usize,
        /// Bytes that arrived before the stream ended.
        received: usize,
    },

    /// The frame header or body violates the framing rules.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// The peer closed the stream between messages, or sent an empty line.
    #[error("peer closed the session")]
    PeerClosed,

    /// The underlying stream failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}
