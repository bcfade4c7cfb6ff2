use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to open track {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported or corrupt audio in {path}: {reason}")]
    Probe { path: PathBuf, reason: String },
    #[error("no playable audio stream in {0}")]
    NoTrack(PathBuf),
    #[error("unsupported codec in {path}: {reason}")]
    UnsupportedCodec { path: PathBuf, reason: String },
    #[error("failed to decode {path}: {reason}")]
    Read { path: PathBuf, reason: String },
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("no audio output device available: {0}")]
    NoDevice(String),
    #[error("audio output device not found: {0}")]
    DeviceNotFound(String),
    #[error("failed to start output stream: {0}")]
    Stream(String),
    #[error("audio output rejected samples: {0}")]
    Write(String),
    #[error("audio output stopped playing for {0:?}")]
    Stalled(std::time::Duration),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("no track at playlist index {index}")]
pub struct NotFoundError {
    pub index: u32,
}

/// Anything that ends a single track early without a user request.
#[derive(Debug, Error)]
pub enum TrackError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Sink(#[from] SinkError),
}
