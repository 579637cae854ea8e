//! Error types for show-core
//!
//! Defines the error types used throughout the choreography engine.
//! Adapter crates (camera, detector, LLM, TTS synth) fold their own errors
//! in via `Other`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShowError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("serial dispatcher error: {0}")]
    Serial(String),

    #[error("SSR controller error: {0}")]
    Ssr(String),

    #[error("caption engine error: {0}")]
    Caption(String),

    #[error("TTS/DSP adapter error: {0}")]
    Tts(String),

    #[error("weapon sequencer error: {0}")]
    Weapon(String),

    #[error("show conductor rejected event {event} in state {state}")]
    RejectedEvent { state: String, event: String },

    #[error("audio device unavailable: {0}")]
    AudioDeviceUnavailable(String),

    #[error("screenshot write failed: {0}")]
    ScreenshotWriteFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ShowError {
    /// Fatal errors halt the installation; everything else is recoverable
    /// and the show continues.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ShowError::AudioDeviceUnavailable(_) | ShowError::ScreenshotWriteFailed(_)
        )
    }
}

/// Result type that uses `ShowError`.
pub type Result<T> = std::result::Result<T, ShowError>;
