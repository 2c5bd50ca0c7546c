//! Background music player
//!
//! One looping clip with its own mute button, independent of the cue
//! context. Playback is attempted once as soon as the clip is loaded. When
//! the host refuses it the player shows as muted and waits for the user;
//! unmuting continues from where the music stopped.

use crate::backend::{AudioBackend, PlaybackState};
use crate::config::{CueConfig, SoundManifest};
use crate::registry::{PlayOptions, SoundRegistry};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Registry key of the music clip
pub const MUSIC_KEY: &str = "music";

/// Looping background music with a mute toggle
pub struct BackgroundMusic {
    registry: SoundRegistry,
    config: CueConfig,
    muted: bool,
    autoplay_attempted: bool,
}

impl BackgroundMusic {
    /// Player drawing its voice from `backend`
    pub fn new(backend: Box<dyn AudioBackend>, config: CueConfig) -> Self {
        Self {
            registry: SoundRegistry::new(backend),
            config,
            muted: false,
            autoplay_attempted: false,
        }
    }

    /// Player configured by the manifest's `music` presets
    pub fn from_manifest(backend: Box<dyn AudioBackend>, manifest: &SoundManifest) -> Self {
        Self::new(backend, manifest.music.clone())
    }

    /// Load the clip and make the autoplay attempt.
    ///
    /// Returns whether music is playing afterwards. A clip that cannot be
    /// loaded leaves the player inert: toggling mute then does nothing.
    pub fn init(&mut self) -> bool {
        if !self.is_loaded() {
            if let Err(e) = self.registry.load(
                self.config.source(),
                MUSIC_KEY,
                self.config.load_options(),
            ) {
                warn!(error = %e, "could not load background music");
                return false;
            }
        }
        self.autoplay()
    }

    fn autoplay(&mut self) -> bool {
        if self.autoplay_attempted {
            return self.is_playing();
        }
        self.autoplay_attempted = true;
        match self.registry.play(MUSIC_KEY, PlayOptions::default()) {
            Some(Ok(_)) => {
                info!("background music started");
                true
            }
            Some(Err(_)) => {
                info!("autoplay refused, background music waits for unmute");
                self.muted = true;
                false
            }
            None => false,
        }
    }

    /// Flip the mute flag and return the new value
    pub fn toggle_mute(&mut self) -> bool {
        self.set_muted(!self.muted)
    }

    /// Mute or unmute, returning the resulting flag.
    ///
    /// Muting pauses the music. Unmuting restores the preset gain and
    /// resumes from the paused position, from the start if the clip had
    /// ended. A refused resume leaves the player muted.
    pub fn set_muted(&mut self, muted: bool) -> bool {
        if !self.is_loaded() {
            debug!("background music not loaded, ignoring mute change");
            return self.muted;
        }
        if muted == self.muted {
            return self.muted;
        }
        if muted {
            self.registry.pause(MUSIC_KEY);
            self.muted = true;
            info!("background music muted");
        } else {
            self.registry.set_volume(MUSIC_KEY, self.config.volume);
            self.muted = !matches!(self.registry.resume(MUSIC_KEY), Some(Ok(_)));
            if self.muted {
                info!("background music could not resume, staying muted");
            } else {
                info!("background music unmuted");
            }
        }
        self.muted
    }

    /// Whether the player shows as muted
    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Whether the music is audible right now
    pub fn is_playing(&self) -> bool {
        self.registry
            .get(MUSIC_KEY)
            .is_some_and(|handle| handle.is_playing())
    }

    /// Whether the clip was loaded
    pub fn is_loaded(&self) -> bool {
        self.registry.contains(MUSIC_KEY)
    }

    /// Whether the single autoplay attempt was made
    pub fn autoplay_attempted(&self) -> bool {
        self.autoplay_attempted
    }

    /// Playback state of the clip, stopped when not loaded
    pub fn state(&self) -> PlaybackState {
        self.registry
            .get(MUSIC_KEY)
            .map(|handle| handle.state())
            .unwrap_or_default()
    }

    /// Current position in the clip
    pub fn position(&self) -> Duration {
        self.registry
            .get(MUSIC_KEY)
            .map(|handle| handle.position())
            .unwrap_or_default()
    }

    /// Presets in use
    pub fn config(&self) -> &CueConfig {
        &self.config
    }

    /// Release the voice. The player is inert afterwards.
    pub fn teardown(&mut self) {
        self.registry.teardown();
    }
}
