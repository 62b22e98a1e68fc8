use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Could not read job list {path}: {source}")]
    JobList {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not open response file {path}: {source}")]
    ResponseSink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;

/// Reasons a worker submission is refused. Every variant closes the
/// connection; none of them advance the worker to another job.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("empty submission")]
    EmptyPayload,

    #[error("non-text frame")]
    NonTextFrame,

    #[error("insufficient proof of work: {zeros} leading zero bits, {required} required")]
    InsufficientWork { zeros: u32, required: u32 },

    #[error("malformed submission: {0}")]
    Malformed(String),

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("invalid time value {0:?}")]
    InvalidTime(String),

    #[error("stale submission: sent at {submitted}, job assigned at {assigned}")]
    Stale { submitted: u64, assigned: u64 },

    #[error("no job is assigned to this connection")]
    NoJobHeld,

    #[error("could not record response: {0}")]
    SinkFailed(String),
}
