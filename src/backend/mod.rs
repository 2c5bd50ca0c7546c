//! Host audio seam
//!
//! The registry never talks to an audio API directly. It asks an
//! [`AudioBackend`] to open a [`Voice`] per registered key and drives that
//! voice. Starting a voice is the only request the host may refuse (autoplay
//! policy, missing device), and the refusal comes back as a value:
//! [`PlayStart`] is `Result<Playing, Blocked>`.
//!
//! Backends shipped with the crate:
//! - [`memory::MemoryBackend`]: silent, records every request; headless hosts and tests
//! - `rodio::RodioBackend` (feature `streaming`): default system output device

pub mod memory;
#[cfg(feature = "streaming")]
pub mod rodio;

use crate::source::SoundSource;
use crate::Result;
use std::fmt;
use std::time::Duration;

/// Playback state of a registered sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Not playing, position at the start.
    #[default]
    Stopped,
    /// Playback was started and the host confirmed it.
    Playing,
    /// Paused, position kept.
    Paused,
}

/// Host confirmed that playback started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Playing;

/// Host refused to start playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blocked {
    /// Human readable cause, e.g. autoplay policy or missing device
    pub reason: String,
}

impl Blocked {
    /// Create a refusal with the given cause
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Blocked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "playback blocked: {}", self.reason)
    }
}

/// Outcome of a start request
pub type PlayStart = std::result::Result<Playing, Blocked>;

/// One playable clip owned by the host.
///
/// Voices are driven exclusively by their [`crate::registry::SoundHandle`].
pub trait Voice: Send {
    /// Request playback from the current position.
    fn start(&mut self) -> PlayStart;

    /// Pause, keeping the position.
    fn pause(&mut self);

    /// Move the position back to the start. Does not change play/pause.
    fn rewind(&mut self);

    /// Set the output gain, already clamped to [0, 1].
    fn set_volume(&mut self, volume: f32);

    /// Enable or disable looping.
    fn set_looping(&mut self, looping: bool);

    /// Current playback position.
    fn position(&self) -> Duration;

    /// Whether the host is currently rendering this voice.
    ///
    /// A non-looping clip that ran to its end is no longer active.
    fn is_active(&self) -> bool;

    /// Drop the clip data. The voice stays silent afterwards.
    fn release(&mut self);
}

/// Factory for voices.
pub trait AudioBackend {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Open a voice for `source`, registered under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error when the source cannot be read or decoded.
    fn open(&mut self, key: &str, source: &SoundSource) -> Result<Box<dyn Voice>>;
}
