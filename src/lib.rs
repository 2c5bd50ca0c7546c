//! Cue sound manager for interactive front ends
//!
//! Loads short clips under logical keys, plays them with per-key volume and
//! loop presets, and exposes named cue actions (`click`, `hover`, `success`,
//! `ambient`) together with a global mute flag to any UI component.
//!
//! # Layers
//! - [`registry::SoundRegistry`]: owns the loaded [`registry::SoundHandle`]s
//!   keyed by logical name (load/play/stop/pause/set-volume)
//! - [`context::SoundContext`]: pre-wired cues, mute flag, ambient autoplay,
//!   explicit `init`/`teardown` lifecycle
//! - [`context::SoundCues`]: the injected handle UI code calls; every action
//!   degrades to a no-op when no context is reachable
//! - [`music::BackgroundMusic`]: looping background track with its own mute
//!   toggle, one autoplay attempt and resume-on-unmute
//!
//! # Crate feature flags
//! - `streaming` (opt-in): real audio output through `rodio` plus the
//!   `sankofa-audio` CLI
//!
//! # Quick start
//! ```no_run
//! use std::time::{Duration, Instant};
//! use sankofa_audio::backend::memory::MemoryBackend;
//! use sankofa_audio::{SoundContext, SoundManifest};
//!
//! let backend = MemoryBackend::new();
//! let shared = SoundContext::new(Box::new(backend), SoundManifest::default()).into_shared();
//! let start = Instant::now();
//! shared.borrow_mut().init(start);
//!
//! let cues = sankofa_audio::SoundCues::new(&shared);
//! cues.play_click_sound();
//!
//! // event loop tick: ambient autoplay fires once the delay elapsed
//! shared.borrow_mut().update(start + Duration::from_secs(2));
//! ```

#![warn(missing_docs)]

pub mod backend; // Host audio seam
pub mod config; // Sound manifest
pub mod context; // Cue facade and lifecycle
pub mod music; // Background music player
pub mod registry; // Keyed clip handles
pub mod source; // Clip byte sources

/// Error types for sound manager setup operations
#[derive(thiserror::Error, Debug)]
pub enum SoundError {
    /// IO error from filesystem
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Clip file does not exist
    #[error("Sound source not found: {0}")]
    SourceNotFound(String),

    /// Clip bytes could not be decoded
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// Audio device error
    #[error("Audio device error: {0}")]
    AudioDeviceError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Malformed manifest JSON
    #[error("Manifest JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for SoundError {
    /// Converts a String into `SoundError::Other`.
    ///
    /// Prefer the specific variants (`ConfigError`, `DecodeError`, ...) where
    /// the failure kind is known.
    fn from(msg: String) -> Self {
        SoundError::Other(msg)
    }
}

impl From<&str> for SoundError {
    fn from(msg: &str) -> Self {
        SoundError::Other(msg.to_string())
    }
}

/// Result type for sound manager operations
pub type Result<T> = std::result::Result<T, SoundError>;

// Public API exports
pub use backend::{AudioBackend, Blocked, PlayStart, PlaybackState, Playing, Voice};
pub use config::{CueConfig, SoundManifest};
pub use context::{ContextState, Cue, SharedSoundContext, SoundContext, SoundCues};
pub use music::BackgroundMusic;
pub use registry::{LoadOptions, PlayOptions, SoundHandle, SoundRegistry};
pub use source::SoundSource;

#[cfg(feature = "streaming")]
pub use backend::rodio::RodioBackend;
