//! A loaded sound and the voice rendering it

use super::{clamp_volume, LoadOptions};
use crate::backend::{PlayStart, PlaybackState, Playing, Voice};
use crate::source::SoundSource;
use std::fmt;
use std::time::Duration;

/// A sound registered under a logical key
pub struct SoundHandle {
    key: String,
    source: SoundSource,
    volume: f32,
    looping: bool,
    state: PlaybackState,
    voice: Box<dyn Voice>,
}

impl SoundHandle {
    pub(super) fn new(
        key: &str,
        source: SoundSource,
        mut voice: Box<dyn Voice>,
        options: LoadOptions,
    ) -> Self {
        let volume = clamp_volume(options.volume);
        voice.set_volume(volume);
        voice.set_looping(options.looping);
        Self {
            key: key.to_string(),
            source,
            volume,
            looping: options.looping,
            state: PlaybackState::Stopped,
            voice,
        }
    }

    /// Logical key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Where the clip was loaded from
    pub fn source(&self) -> &SoundSource {
        &self.source
    }

    /// Current gain in [0, 1]
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Whether the clip loops
    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Playback state. A one-shot clip that reached its end reads as stopped.
    pub fn state(&self) -> PlaybackState {
        match self.state {
            PlaybackState::Playing if !self.voice.is_active() => PlaybackState::Stopped,
            state => state,
        }
    }

    /// Whether the clip is audible right now
    pub fn is_playing(&self) -> bool {
        self.state() == PlaybackState::Playing
    }

    /// Current playback position
    pub fn position(&self) -> Duration {
        self.voice.position()
    }

    pub(super) fn start(&mut self, volume: Option<f32>) -> PlayStart {
        self.voice.rewind();
        if let Some(volume) = volume {
            self.set_volume(volume);
        }
        match self.voice.start() {
            Ok(playing) => {
                self.state = PlaybackState::Playing;
                Ok(playing)
            }
            Err(blocked) => {
                self.voice.pause();
                self.voice.rewind();
                self.state = PlaybackState::Stopped;
                Err(blocked)
            }
        }
    }

    pub(super) fn resume(&mut self) -> PlayStart {
        match self.state {
            PlaybackState::Playing if self.voice.is_active() => return Ok(Playing),
            // ran to its end
            PlaybackState::Playing => self.voice.rewind(),
            _ => {}
        }
        match self.voice.start() {
            Ok(playing) => {
                self.state = PlaybackState::Playing;
                Ok(playing)
            }
            Err(blocked) => {
                self.voice.pause();
                self.state = if self.voice.position().is_zero() {
                    PlaybackState::Stopped
                } else {
                    PlaybackState::Paused
                };
                Err(blocked)
            }
        }
    }

    pub(super) fn stop(&mut self) -> bool {
        if self.state() == PlaybackState::Stopped && self.position().is_zero() {
            return false;
        }
        self.voice.pause();
        self.voice.rewind();
        self.state = PlaybackState::Stopped;
        true
    }

    pub(super) fn pause(&mut self) -> bool {
        if self.state() != PlaybackState::Playing {
            return false;
        }
        self.voice.pause();
        self.state = PlaybackState::Paused;
        true
    }

    pub(super) fn set_volume(&mut self, volume: f32) -> f32 {
        self.volume = clamp_volume(volume);
        self.voice.set_volume(self.volume);
        self.volume
    }

    pub(super) fn release(&mut self) {
        self.voice.pause();
        self.voice.release();
        self.state = PlaybackState::Stopped;
    }
}

impl fmt::Debug for SoundHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoundHandle")
            .field("key", &self.key)
            .field("source", &self.source)
            .field("volume", &self.volume)
            .field("looping", &self.looping)
            .field("state", &self.state())
            .field("position", &self.position())
            .finish()
    }
}
