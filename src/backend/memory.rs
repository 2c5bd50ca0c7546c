//! In-memory backend
//!
//! Renders nothing. Every request a voice receives is appended to a shared
//! event log, and playback position only moves when the host advances the
//! clock through [`MemoryProbe::advance`]. An [`AutoplayPolicy`] reproduces
//! the start refusals a browser-like host applies before the first user
//! gesture.

use super::{AudioBackend, Blocked, PlayStart, Playing, Voice};
use crate::source::SoundSource;
use crate::Result;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// When the host accepts start requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoplayPolicy {
    /// Every start is accepted
    #[default]
    Allow,
    /// Every start is refused
    BlockAll,
    /// Starts are refused until [`MemoryProbe::gesture`] is called
    BlockUntilGesture,
}

/// A request recorded by the backend
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceEvent {
    /// A voice was opened for a key
    Opened {
        /// Logical key
        key: String,
    },
    /// A start request was accepted
    Started {
        /// Logical key
        key: String,
        /// Gain at the time of the start
        volume: f32,
    },
    /// A start request was refused
    Blocked {
        /// Logical key
        key: String,
    },
    /// The voice was paused
    Paused {
        /// Logical key
        key: String,
    },
    /// Position moved back to the start
    Rewound {
        /// Logical key
        key: String,
    },
    /// Gain changed
    VolumeSet {
        /// Logical key
        key: String,
        /// New gain
        volume: f32,
    },
    /// Clip data dropped
    Released {
        /// Logical key
        key: String,
    },
}

#[derive(Debug, Default)]
struct VoiceSlot {
    playing: bool,
    position: Duration,
    volume: f32,
    looping: bool,
    released: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
    policy: AutoplayPolicy,
    gesture_seen: bool,
    clip_length: Option<Duration>,
    events: Vec<VoiceEvent>,
    voices: BTreeMap<String, VoiceSlot>,
}

impl MemoryState {
    fn start_allowed(&self) -> bool {
        match self.policy {
            AutoplayPolicy::Allow => true,
            AutoplayPolicy::BlockAll => false,
            AutoplayPolicy::BlockUntilGesture => self.gesture_seen,
        }
    }
}

/// Backend that keeps all voice state in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    /// Backend accepting every start request, clips of unbounded length
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend applying the given autoplay policy
    pub fn with_policy(policy: AutoplayPolicy) -> Self {
        let backend = Self::new();
        backend.state.lock().policy = policy;
        backend
    }

    /// Give every clip a fixed length so non-looping voices end on their own
    pub fn with_clip_length(self, length: Duration) -> Self {
        self.state.lock().clip_length = Some(length);
        self
    }

    /// Observer sharing this backend's state
    pub fn probe(&self) -> MemoryProbe {
        MemoryProbe {
            state: Arc::clone(&self.state),
        }
    }
}

impl AudioBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn open(&mut self, key: &str, source: &SoundSource) -> Result<Box<dyn Voice>> {
        // Same failure surface as a real backend: unreadable sources fail here.
        source.read_bytes()?;

        let mut state = self.state.lock();
        state.voices.insert(
            key.to_string(),
            VoiceSlot {
                volume: 1.0,
                ..VoiceSlot::default()
            },
        );
        state.events.push(VoiceEvent::Opened {
            key: key.to_string(),
        });
        drop(state);

        Ok(Box::new(MemoryVoice {
            key: key.to_string(),
            state: Arc::clone(&self.state),
        }))
    }
}

struct MemoryVoice {
    key: String,
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryVoice {
    fn with_slot<R>(&self, f: impl FnOnce(&mut VoiceSlot, &mut Vec<VoiceEvent>) -> R) -> Option<R> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let slot = state.voices.get_mut(&self.key)?;
        Some(f(slot, &mut state.events))
    }
}

impl Voice for MemoryVoice {
    fn start(&mut self) -> PlayStart {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let allowed = state.start_allowed();
        let Some(slot) = state.voices.get_mut(&self.key) else {
            return Err(Blocked::new("voice was released"));
        };
        if slot.released {
            return Err(Blocked::new("voice was released"));
        }
        if !allowed {
            state.events.push(VoiceEvent::Blocked {
                key: self.key.clone(),
            });
            return Err(Blocked::new(
                "autoplay policy requires a user gesture before playback",
            ));
        }
        slot.playing = true;
        let volume = slot.volume;
        state.events.push(VoiceEvent::Started {
            key: self.key.clone(),
            volume,
        });
        Ok(Playing)
    }

    fn pause(&mut self) {
        let key = self.key.clone();
        self.with_slot(|slot, events| {
            slot.playing = false;
            events.push(VoiceEvent::Paused { key });
        });
    }

    fn rewind(&mut self) {
        let key = self.key.clone();
        self.with_slot(|slot, events| {
            slot.position = Duration::ZERO;
            events.push(VoiceEvent::Rewound { key });
        });
    }

    fn set_volume(&mut self, volume: f32) {
        let key = self.key.clone();
        self.with_slot(|slot, events| {
            slot.volume = volume;
            events.push(VoiceEvent::VolumeSet { key, volume });
        });
    }

    fn set_looping(&mut self, looping: bool) {
        self.with_slot(|slot, _| slot.looping = looping);
    }

    fn position(&self) -> Duration {
        self.with_slot(|slot, _| slot.position).unwrap_or_default()
    }

    fn is_active(&self) -> bool {
        self.with_slot(|slot, _| slot.playing).unwrap_or(false)
    }

    fn release(&mut self) {
        let key = self.key.clone();
        self.with_slot(|slot, events| {
            slot.playing = false;
            slot.released = true;
            slot.position = Duration::ZERO;
            events.push(VoiceEvent::Released { key });
        });
    }
}

/// Host-side view of a [`MemoryBackend`]
#[derive(Debug, Clone)]
pub struct MemoryProbe {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryProbe {
    /// Snapshot of every recorded request
    pub fn events(&self) -> Vec<VoiceEvent> {
        self.state.lock().events.clone()
    }

    /// Forget recorded requests
    pub fn clear_events(&self) {
        self.state.lock().events.clear();
    }

    /// Number of accepted starts for `key`
    pub fn starts(&self, key: &str) -> usize {
        self.count(|e| matches!(e, VoiceEvent::Started { key: k, .. } if k == key))
    }

    /// Number of refused starts for `key`
    pub fn blocked(&self, key: &str) -> usize {
        self.count(|e| matches!(e, VoiceEvent::Blocked { key: k } if k == key))
    }

    /// Number of start requests for `key`, accepted or not
    pub fn start_requests(&self, key: &str) -> usize {
        self.starts(key) + self.blocked(key)
    }

    /// Number of voices opened for `key`
    pub fn opened(&self, key: &str) -> usize {
        self.count(|e| matches!(e, VoiceEvent::Opened { key: k } if k == key))
    }

    /// Whether the voice for `key` is rendering
    pub fn is_playing(&self, key: &str) -> bool {
        self.state
            .lock()
            .voices
            .get(key)
            .is_some_and(|slot| slot.playing)
    }

    /// Position of the voice for `key`
    pub fn position(&self, key: &str) -> Option<Duration> {
        self.state.lock().voices.get(key).map(|slot| slot.position)
    }

    /// Gain of the voice for `key`
    pub fn volume(&self, key: &str) -> Option<f32> {
        self.state.lock().voices.get(key).map(|slot| slot.volume)
    }

    /// Whether the voice for `key` dropped its clip data
    pub fn is_released(&self, key: &str) -> bool {
        self.state
            .lock()
            .voices
            .get(key)
            .is_some_and(|slot| slot.released)
    }

    /// Record a user gesture, unlocking [`AutoplayPolicy::BlockUntilGesture`]
    pub fn gesture(&self) {
        self.state.lock().gesture_seen = true;
    }

    /// Change the autoplay policy
    pub fn set_policy(&self, policy: AutoplayPolicy) {
        self.state.lock().policy = policy;
    }

    /// Move every playing voice forward by `elapsed`.
    ///
    /// With a clip length set, looping voices wrap and the others stop at
    /// the end of the clip.
    pub fn advance(&self, elapsed: Duration) {
        let mut state = self.state.lock();
        let clip_length = state.clip_length;
        for slot in state.voices.values_mut().filter(|s| s.playing) {
            slot.position += elapsed;
            let Some(length) = clip_length.filter(|l| !l.is_zero()) else {
                continue;
            };
            if slot.position >= length {
                if slot.looping {
                    let wrapped = slot.position.as_nanos() % length.as_nanos();
                    slot.position = Duration::from_nanos(wrapped as u64);
                } else {
                    slot.position = length;
                    slot.playing = false;
                }
            }
        }
    }

    fn count(&self, pred: impl Fn(&VoiceEvent) -> bool) -> usize {
        self.state.lock().events.iter().filter(|e| pred(e)).count()
    }
}
