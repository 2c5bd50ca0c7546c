//! Sound registry
//!
//! Owns every loaded [`SoundHandle`], keyed by logical name. Loading is
//! idempotent per key, and every playback operation on an unknown key is a
//! logged no-op. Playback refusals come back as [`PlayStart`] values and are
//! never turned into errors.

mod handle;

pub use handle::SoundHandle;

use crate::backend::{AudioBackend, PlayStart};
use crate::source::SoundSource;
use crate::Result;
use std::collections::btree_map::{BTreeMap, Entry};
use tracing::{debug, info, warn};

/// Default gain for a newly loaded sound
pub const DEFAULT_VOLUME: f32 = 0.5;

/// Clamp a gain to [0, 1]. NaN maps to silence.
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

/// Options applied when a key is first loaded
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadOptions {
    /// Gain in [0, 1]
    pub volume: f32,
    /// Restart from the beginning when the clip ends
    pub looping: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            volume: DEFAULT_VOLUME,
            looping: false,
        }
    }
}

impl LoadOptions {
    /// Options with the given gain, not looping
    pub fn volume(volume: f32) -> Self {
        Self {
            volume,
            ..Self::default()
        }
    }

    /// Set the loop flag
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }
}

/// Per-call playback options
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlayOptions {
    /// Gain override, kept on the handle afterwards
    pub volume: Option<f32>,
}

impl PlayOptions {
    /// Override the gain for this play
    pub fn with_volume(volume: f32) -> Self {
        Self {
            volume: Some(volume),
        }
    }
}

/// Keyed set of loaded sounds
pub struct SoundRegistry {
    backend: Box<dyn AudioBackend>,
    sounds: BTreeMap<String, SoundHandle>,
}

impl SoundRegistry {
    /// Empty registry opening voices through `backend`
    pub fn new(backend: Box<dyn AudioBackend>) -> Self {
        Self {
            backend,
            sounds: BTreeMap::new(),
        }
    }

    /// Register `source` under `key`.
    ///
    /// If `key` is already registered the existing handle is returned as is:
    /// the source is not reopened and `options` are ignored.
    ///
    /// # Errors
    ///
    /// Fails when the backend cannot open the source. Nothing is registered
    /// in that case.
    pub fn load(
        &mut self,
        source: SoundSource,
        key: &str,
        options: LoadOptions,
    ) -> Result<&SoundHandle> {
        match self.sounds.entry(key.to_string()) {
            Entry::Occupied(existing) => {
                debug!(key, "sound already loaded, keeping existing handle");
                Ok(&*existing.into_mut())
            }
            Entry::Vacant(slot) => {
                let voice = self.backend.open(key, &source)?;
                debug!(
                    key,
                    %source,
                    volume = options.volume,
                    looping = options.looping,
                    backend = self.backend.name(),
                    "sound loaded"
                );
                Ok(&*slot.insert(SoundHandle::new(key, source, voice, options)))
            }
        }
    }

    /// Play `key` from the start.
    ///
    /// Returns `None` when the key is not registered. A refused start is
    /// logged and returned as `Some(Err(Blocked))`; the handle is then left
    /// stopped at the start.
    pub fn play(&mut self, key: &str, options: PlayOptions) -> Option<PlayStart> {
        let Some(handle) = self.sounds.get_mut(key) else {
            warn!(key, "play requested for unregistered sound");
            return None;
        };
        let outcome = handle.start(options.volume);
        if let Err(blocked) = &outcome {
            warn!(key, reason = %blocked.reason, "could not play sound");
        }
        Some(outcome)
    }

    /// Continue `key` from where it was paused.
    ///
    /// A clip that already ran to its end starts over; one that is playing is
    /// left alone. Returns `None` when the key is not registered. A refused
    /// start is logged and leaves the handle paused at its position.
    pub fn resume(&mut self, key: &str) -> Option<PlayStart> {
        let Some(handle) = self.sounds.get_mut(key) else {
            warn!(key, "resume requested for unregistered sound");
            return None;
        };
        let outcome = handle.resume();
        if let Err(blocked) = &outcome {
            warn!(key, reason = %blocked.reason, "could not resume sound");
        }
        Some(outcome)
    }

    /// Pause `key` and move it back to the start.
    ///
    /// Returns whether anything changed.
    pub fn stop(&mut self, key: &str) -> bool {
        match self.sounds.get_mut(key) {
            Some(handle) => handle.stop(),
            None => {
                debug!(key, "stop requested for unregistered sound");
                false
            }
        }
    }

    /// Pause `key`, keeping its position.
    ///
    /// Returns whether anything changed.
    pub fn pause(&mut self, key: &str) -> bool {
        match self.sounds.get_mut(key) {
            Some(handle) => handle.pause(),
            None => {
                debug!(key, "pause requested for unregistered sound");
                false
            }
        }
    }

    /// Set the gain of `key`, clamped to [0, 1].
    ///
    /// Returns the effective gain, or `None` when the key is not registered.
    pub fn set_volume(&mut self, key: &str, volume: f32) -> Option<f32> {
        let Some(handle) = self.sounds.get_mut(key) else {
            debug!(key, "volume change requested for unregistered sound");
            return None;
        };
        Some(handle.set_volume(volume))
    }

    /// Handle registered under `key`
    pub fn get(&self, key: &str) -> Option<&SoundHandle> {
        self.sounds.get(key)
    }

    /// Whether `key` is registered
    pub fn contains(&self, key: &str) -> bool {
        self.sounds.contains_key(key)
    }

    /// Registered keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.sounds.keys().map(String::as_str)
    }

    /// Number of registered sounds
    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }

    /// Pause and release every handle, then empty the registry.
    pub fn teardown(&mut self) {
        if self.sounds.is_empty() {
            return;
        }
        let count = self.sounds.len();
        for handle in self.sounds.values_mut() {
            handle.release();
        }
        self.sounds.clear();
        info!(count, "sound registry torn down");
    }
}

impl Drop for SoundRegistry {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::{AutoplayPolicy, MemoryBackend, MemoryProbe};
    use crate::backend::{PlaybackState, Playing};
    use approx::assert_relative_eq;
    use std::time::Duration;

    fn clip() -> SoundSource {
        SoundSource::bytes("clip", vec![0u8; 64])
    }

    fn registry() -> (SoundRegistry, MemoryProbe) {
        let backend = MemoryBackend::new();
        let probe = backend.probe();
        (SoundRegistry::new(Box::new(backend)), probe)
    }

    #[test]
    fn test_load_defaults() {
        let (mut reg, _probe) = registry();
        let handle = reg.load(clip(), "click", LoadOptions::default()).unwrap();
        assert_relative_eq!(handle.volume(), 0.5);
        assert!(!handle.is_looping());
        assert_eq!(handle.state(), PlaybackState::Stopped);
        assert_eq!(handle.position(), Duration::ZERO);
    }

    #[test]
    fn test_load_is_idempotent() {
        let (mut reg, probe) = registry();
        reg.load(clip(), "ambient", LoadOptions::volume(0.3).looping(true))
            .unwrap();
        let again = reg
            .load(
                SoundSource::bytes("other", vec![1u8; 8]),
                "ambient",
                LoadOptions::volume(0.9),
            )
            .unwrap();

        assert_relative_eq!(again.volume(), 0.3);
        assert!(again.is_looping());
        assert_eq!(again.source(), &clip());
        assert_eq!(reg.len(), 1);
        assert_eq!(probe.opened("ambient"), 1);
    }

    #[test]
    fn test_load_failure_registers_nothing() {
        let (mut reg, _probe) = registry();
        assert!(reg
            .load(SoundSource::path("nope/sound.mp3"), "click", LoadOptions::default())
            .is_err());
        assert!(!reg.contains("click"));
        assert!(reg.play("click", PlayOptions::default()).is_none());
    }

    #[test]
    fn test_play_unregistered_is_noop() {
        let (mut reg, probe) = registry();
        reg.load(clip(), "click", LoadOptions::default()).unwrap();
        probe.clear_events();

        assert!(reg.play("missing", PlayOptions::default()).is_none());
        assert!(probe.events().is_empty());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_play_rewinds_and_applies_volume_override() {
        let (mut reg, probe) = registry();
        reg.load(clip(), "success", LoadOptions::volume(0.6)).unwrap();
        assert_eq!(
            reg.play("success", PlayOptions::default()),
            Some(Ok(Playing))
        );
        probe.advance(Duration::from_millis(400));

        let outcome = reg.play("success", PlayOptions::with_volume(0.9));
        assert_eq!(outcome, Some(Ok(Playing)));
        let handle = reg.get("success").unwrap();
        assert_eq!(handle.position(), Duration::ZERO);
        assert_relative_eq!(handle.volume(), 0.9);
        assert_eq!(probe.volume("success"), Some(0.9));
    }

    #[test]
    fn test_blocked_play_leaves_handle_stopped() {
        let backend = MemoryBackend::with_policy(AutoplayPolicy::BlockAll);
        let mut reg = SoundRegistry::new(Box::new(backend));
        reg.load(clip(), "ambient", LoadOptions::volume(0.3).looping(true))
            .unwrap();

        let outcome = reg.play("ambient", PlayOptions::default());
        assert!(matches!(outcome, Some(Err(_))));
        let handle = reg.get("ambient").unwrap();
        assert_eq!(handle.state(), PlaybackState::Stopped);
        assert_eq!(handle.position(), Duration::ZERO);
    }

    #[test]
    fn test_refused_restart_silences_running_voice() {
        let (mut reg, probe) = registry();
        reg.load(clip(), "ambient", LoadOptions::volume(0.3).looping(true))
            .unwrap();
        assert!(matches!(reg.play("ambient", PlayOptions::default()), Some(Ok(_))));
        probe.advance(Duration::from_millis(500));

        probe.set_policy(AutoplayPolicy::BlockAll);
        assert!(matches!(reg.play("ambient", PlayOptions::default()), Some(Err(_))));
        assert!(!probe.is_playing("ambient"));
        assert_eq!(probe.position("ambient"), Some(Duration::ZERO));
        let handle = reg.get("ambient").unwrap();
        assert_eq!(handle.state(), PlaybackState::Stopped);

        // nothing left for stop to silence
        assert!(!reg.stop("ambient"));
        probe.advance(Duration::from_millis(500));
        assert!(!probe.is_playing("ambient"));
        assert_eq!(probe.position("ambient"), Some(Duration::ZERO));
    }

    #[test]
    fn test_resume_continues_from_pause() {
        let (mut reg, probe) = registry();
        reg.load(clip(), "ambient", LoadOptions::volume(0.3).looping(true))
            .unwrap();
        reg.play("ambient", PlayOptions::default());
        probe.advance(Duration::from_millis(700));
        assert!(reg.pause("ambient"));

        assert!(matches!(reg.resume("ambient"), Some(Ok(Playing))));
        assert_eq!(probe.position("ambient"), Some(Duration::from_millis(700)));
        assert_eq!(reg.get("ambient").unwrap().state(), PlaybackState::Playing);

        // already playing: no second start request
        assert!(matches!(reg.resume("ambient"), Some(Ok(Playing))));
        assert_eq!(probe.start_requests("ambient"), 2);
        assert!(reg.resume("missing").is_none());
    }

    #[test]
    fn test_resume_restarts_finished_clip() {
        let backend = MemoryBackend::new().with_clip_length(Duration::from_secs(1));
        let probe = backend.probe();
        let mut reg = SoundRegistry::new(Box::new(backend));
        reg.load(clip(), "chime", LoadOptions::default()).unwrap();
        reg.play("chime", PlayOptions::default());
        probe.advance(Duration::from_secs(2));
        assert_eq!(reg.get("chime").unwrap().state(), PlaybackState::Stopped);

        assert!(matches!(reg.resume("chime"), Some(Ok(Playing))));
        assert_eq!(probe.position("chime"), Some(Duration::ZERO));
        assert!(probe.is_playing("chime"));
    }

    #[test]
    fn test_refused_resume_keeps_position() {
        let (mut reg, probe) = registry();
        reg.load(clip(), "ambient", LoadOptions::volume(0.3).looping(true))
            .unwrap();
        reg.play("ambient", PlayOptions::default());
        probe.advance(Duration::from_millis(300));
        reg.pause("ambient");

        probe.set_policy(AutoplayPolicy::BlockAll);
        assert!(matches!(reg.resume("ambient"), Some(Err(_))));
        let handle = reg.get("ambient").unwrap();
        assert_eq!(handle.state(), PlaybackState::Paused);
        assert_eq!(handle.position(), Duration::from_millis(300));
        assert!(!probe.is_playing("ambient"));
    }

    #[test]
    fn test_stop_then_play_restarts_from_zero() {
        let (mut reg, probe) = registry();
        reg.load(clip(), "ambient", LoadOptions::volume(0.3).looping(true))
            .unwrap();
        reg.play("ambient", PlayOptions::default());
        probe.advance(Duration::from_millis(750));
        assert_eq!(reg.get("ambient").unwrap().position(), Duration::from_millis(750));

        assert!(reg.stop("ambient"));
        assert_eq!(reg.get("ambient").unwrap().position(), Duration::ZERO);
        assert_eq!(reg.get("ambient").unwrap().state(), PlaybackState::Stopped);

        reg.play("ambient", PlayOptions::default());
        assert_eq!(reg.get("ambient").unwrap().position(), Duration::ZERO);
        assert!(probe.is_playing("ambient"));
    }

    #[test]
    fn test_stop_when_already_stopped_is_noop() {
        let (mut reg, probe) = registry();
        reg.load(clip(), "click", LoadOptions::default()).unwrap();
        probe.clear_events();
        assert!(!reg.stop("click"));
        assert!(!reg.stop("missing"));
        assert!(probe.events().is_empty());
    }

    #[test]
    fn test_pause_keeps_position() {
        let (mut reg, probe) = registry();
        reg.load(clip(), "ambient", LoadOptions::default()).unwrap();
        reg.play("ambient", PlayOptions::default());
        probe.advance(Duration::from_millis(120));

        assert!(reg.pause("ambient"));
        let handle = reg.get("ambient").unwrap();
        assert_eq!(handle.state(), PlaybackState::Paused);
        assert_eq!(handle.position(), Duration::from_millis(120));
        assert!(!reg.pause("ambient"));
        assert!(!reg.pause("missing"));
    }

    #[test]
    fn test_set_volume_clamps() {
        let (mut reg, probe) = registry();
        reg.load(clip(), "hover", LoadOptions::volume(0.2)).unwrap();

        assert_eq!(reg.set_volume("hover", 1.5), Some(1.0));
        assert_relative_eq!(reg.get("hover").unwrap().volume(), 1.0);
        assert_eq!(reg.set_volume("hover", -0.2), Some(0.0));
        assert_relative_eq!(reg.get("hover").unwrap().volume(), 0.0);
        assert_eq!(probe.volume("hover"), Some(0.0));
        assert_eq!(reg.set_volume("missing", 0.4), None);
    }

    #[test]
    fn test_teardown_releases_everything() {
        let (mut reg, probe) = registry();
        for key in ["ambient", "click", "hover"] {
            reg.load(clip(), key, LoadOptions::default()).unwrap();
        }
        reg.play("ambient", PlayOptions::default());

        reg.teardown();
        assert!(reg.is_empty());
        for key in ["ambient", "click", "hover"] {
            assert!(probe.is_released(key), "{key} should be released");
        }
        assert!(!probe.is_playing("ambient"));
    }

    #[test]
    fn test_drop_releases_everything() {
        let (mut reg, probe) = registry();
        reg.load(clip(), "click", LoadOptions::default()).unwrap();
        drop(reg);
        assert!(probe.is_released("click"));
    }

    #[test]
    fn test_clamp_volume_nan() {
        assert_eq!(clamp_volume(f32::NAN), 0.0);
        assert_eq!(clamp_volume(0.25), 0.25);
    }
}
