//! Audio subsystem errors

use thiserror::Error;

/// Failures opening or driving the output device
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no output device available")]
    NoDevice,

    #[error("output device '{0}' not found")]
    DeviceNotFound(String),

    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to query output config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to enumerate devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("failed to spawn audio thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("audio thread exited before the stream was ready")]
    ThreadGone,
}
