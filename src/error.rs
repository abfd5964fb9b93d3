//! Error types shared by the audio, waveform and playback layers

use thiserror::Error;

/// Errors surfaced by loading and transport operations.
///
/// Every variant is cloneable so a failure can be published through the
/// controller's observable error field instead of being thrown past it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlayerError {
    /// Wrong encoding, channel count or sample rate, or no tracks at all
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The asset could not be opened or read
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// A transport operation was attempted before the media was prepared
    #[error("Preparing media player...")]
    EngineNotReady,

    /// The playback engine failed while preparing, playing, pausing or seeking
    #[error("Playback engine failure: {0}")]
    EngineFailure(String),
}

/// Result type for player operations
pub type PlayerResult<T> = Result<T, PlayerError>;
