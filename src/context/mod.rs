//! Sound context
//!
//! Consumer-facing facade over the [`SoundRegistry`]: four pre-wired cues, a
//! global mute flag, and a best-effort ambient autoplay a fixed delay after
//! [`SoundContext::init`].
//!
//! The context runs on the UI event loop. Nothing blocks: the host calls
//! [`SoundContext::update`] on every tick and the pending autoplay fires on
//! the first tick past its deadline.
//!
//! Lifecycle:
//!
//! ```text
//! Uninitialized -> Loading -> Ready -> AmbientPlaying <-> AmbientStopped
//!                                  \______________________________/
//!                                              teardown -> TornDown
//! ```
//!
//! Mute overlays every state.

mod cues;

pub use cues::SoundCues;

use crate::backend::{AudioBackend, PlayStart};
use crate::config::SoundManifest;
use crate::registry::{PlayOptions, SoundRegistry};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Context owned by the top-level UI scope and shared with [`SoundCues`]
pub type SharedSoundContext = Rc<RefCell<SoundContext>>;

/// The named cues every UI component can trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Cue {
    /// Looping background clip, started automatically
    Ambient,
    /// Button press
    Click,
    /// Pointer enter
    Hover,
    /// Completed action
    Success,
}

impl Cue {
    /// Every cue, in registration order
    pub const ALL: [Cue; 4] = [Cue::Ambient, Cue::Click, Cue::Hover, Cue::Success];

    /// Registry key of the cue
    pub fn key(self) -> &'static str {
        match self {
            Cue::Ambient => "ambient",
            Cue::Click => "click",
            Cue::Hover => "hover",
            Cue::Success => "success",
        }
    }

    /// Cue registered under `key`
    pub fn from_key(key: &str) -> Option<Self> {
        Cue::ALL.into_iter().find(|cue| cue.key() == key)
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Observable lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Created, nothing registered yet
    Uninitialized,
    /// Cues are being registered
    Loading,
    /// Cues registered, ambient not touched yet
    Ready,
    /// Ambient cue is audible
    AmbientPlaying,
    /// Ambient cue was started or stopped before and is silent now
    AmbientStopped,
    /// Every handle released
    TornDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Uninitialized,
    Loading,
    Ready,
    TornDown,
}

/// Cue facade with mute flag and ambient autoplay
pub struct SoundContext {
    registry: SoundRegistry,
    manifest: SoundManifest,
    lifecycle: Lifecycle,
    muted: Rc<Cell<bool>>,
    ambient_touched: bool,
    autoplay_at: Option<Instant>,
}

impl SoundContext {
    /// Context drawing voices from `backend`, configured by `manifest`
    pub fn new(backend: Box<dyn AudioBackend>, manifest: SoundManifest) -> Self {
        Self {
            registry: SoundRegistry::new(backend),
            manifest,
            lifecycle: Lifecycle::Uninitialized,
            muted: Rc::new(Cell::new(false)),
            ambient_touched: false,
            autoplay_at: None,
        }
    }

    /// Move into a shared cell for injection into UI components
    pub fn into_shared(self) -> SharedSoundContext {
        Rc::new(RefCell::new(self))
    }

    /// Register the four cues and schedule the ambient autoplay.
    ///
    /// A cue whose clip cannot be opened is skipped; playing it later is a
    /// no-op. Calling `init` again, or after teardown, does nothing.
    pub fn init(&mut self, now: Instant) {
        if self.lifecycle != Lifecycle::Uninitialized {
            debug!(state = ?self.state(), "sound context already initialized");
            return;
        }
        self.lifecycle = Lifecycle::Loading;
        info!("loading sound cues");

        for cue in Cue::ALL {
            let cfg = self.manifest.cue(cue);
            if let Err(e) = self
                .registry
                .load(cfg.source(), cue.key(), cfg.load_options())
            {
                warn!(cue = cue.key(), error = %e, "could not load sound cue");
            }
        }

        self.lifecycle = Lifecycle::Ready;
        // a delay past the clock's range never fires
        self.autoplay_at = now.checked_add(self.manifest.autoplay_delay());
        info!(
            loaded = self.registry.len(),
            autoplay_delay_ms = self.manifest.autoplay_delay_ms,
            "sound cues ready"
        );
    }

    /// Event loop tick. Fires the pending ambient autoplay once `now`
    /// reaches its deadline.
    ///
    /// Returns whether the autoplay fired on this tick.
    pub fn update(&mut self, now: Instant) -> bool {
        match self.autoplay_at {
            Some(at) if now >= at => {
                self.autoplay_at = None;
                info!("starting ambient sound");
                self.play_ambient_sound();
                true
            }
            _ => false,
        }
    }

    /// Deadline of the pending autoplay, if any
    pub fn autoplay_deadline(&self) -> Option<Instant> {
        self.autoplay_at
    }

    /// Play `cue` unless muted. Failures are logged, never raised.
    pub fn play_cue(&mut self, cue: Cue) -> Option<PlayStart> {
        if self.muted.get() {
            debug!(cue = cue.key(), "muted, skipping cue");
            return None;
        }
        debug!(cue = cue.key(), "playing cue");
        if cue == Cue::Ambient {
            self.ambient_touched = true;
        }
        self.registry.play(cue.key(), PlayOptions::default())
    }

    /// Button press cue
    pub fn play_click_sound(&mut self) -> Option<PlayStart> {
        self.play_cue(Cue::Click)
    }

    /// Pointer enter cue
    pub fn play_hover_sound(&mut self) -> Option<PlayStart> {
        self.play_cue(Cue::Hover)
    }

    /// Completed action cue
    pub fn play_success_sound(&mut self) -> Option<PlayStart> {
        self.play_cue(Cue::Success)
    }

    /// Restart the ambient loop
    pub fn play_ambient_sound(&mut self) -> Option<PlayStart> {
        self.play_cue(Cue::Ambient)
    }

    /// Stop the ambient loop. Works while muted.
    pub fn stop_ambient_sound(&mut self) -> bool {
        debug!("stopping ambient sound");
        self.ambient_touched = true;
        self.registry.stop(Cue::Ambient.key())
    }

    /// Flip the mute flag and return the new value.
    ///
    /// Muting stops the ambient loop right away. Other cues that are still
    /// sounding are left to finish.
    pub fn toggle_mute(&mut self) -> bool {
        self.set_muted(!self.muted.get());
        self.muted.get()
    }

    /// Set the mute flag, with the same ambient rule as [`Self::toggle_mute`]
    pub fn set_muted(&mut self, muted: bool) {
        if self.muted.get() == muted {
            return;
        }
        self.muted.set(muted);
        info!(muted, "{}", if muted { "sounds muted" } else { "sounds unmuted" });
        if muted {
            self.stop_ambient_sound();
        }
    }

    /// Whether cues are silenced
    pub fn is_muted(&self) -> bool {
        self.muted.get()
    }

    /// Flag readable while the context is borrowed elsewhere
    pub(crate) fn mute_flag(&self) -> Rc<Cell<bool>> {
        Rc::clone(&self.muted)
    }

    /// Current lifecycle state
    pub fn state(&self) -> ContextState {
        match self.lifecycle {
            Lifecycle::Uninitialized => ContextState::Uninitialized,
            Lifecycle::Loading => ContextState::Loading,
            Lifecycle::TornDown => ContextState::TornDown,
            Lifecycle::Ready => {
                let ambient_playing = self
                    .registry
                    .get(Cue::Ambient.key())
                    .is_some_and(|h| h.is_playing());
                if ambient_playing {
                    ContextState::AmbientPlaying
                } else if self.ambient_touched {
                    ContextState::AmbientStopped
                } else {
                    ContextState::Ready
                }
            }
        }
    }

    /// The manifest the cues were registered from
    pub fn manifest(&self) -> &SoundManifest {
        &self.manifest
    }

    /// The underlying registry
    pub fn registry(&self) -> &SoundRegistry {
        &self.registry
    }

    /// Mutable access to the registry, for sounds beyond the four cues
    pub fn registry_mut(&mut self) -> &mut SoundRegistry {
        &mut self.registry
    }

    /// Cancel the pending autoplay and release every handle.
    pub fn teardown(&mut self) {
        if self.lifecycle == Lifecycle::TornDown {
            return;
        }
        self.autoplay_at = None;
        self.registry.teardown();
        self.lifecycle = Lifecycle::TornDown;
        info!("sound context torn down");
    }
}

impl Drop for SoundContext {
    fn drop(&mut self) {
        self.teardown();
    }
}
