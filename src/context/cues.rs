//! Injected cue handle
//!
//! UI components receive a [`SoundCues`] instead of the context itself.
//! The handle holds a weak reference, so it never keeps the context alive,
//! and every action silently does nothing when the context is gone, was
//! never provided, or is busy with another call.

use super::{Cue, SharedSoundContext, SoundContext};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use tracing::warn;

/// Cue actions for UI components
#[derive(Clone)]
pub struct SoundCues {
    context: Option<Weak<RefCell<SoundContext>>>,
    muted: Option<Rc<Cell<bool>>>,
}

impl SoundCues {
    /// Handle bound to `shared`
    pub fn new(shared: &SharedSoundContext) -> Self {
        let muted = match shared.try_borrow() {
            Ok(ctx) => Some(ctx.mute_flag()),
            Err(_) => {
                warn!("sound context busy, cue handle cannot read the mute flag");
                None
            }
        };
        Self {
            context: Some(Rc::downgrade(shared)),
            muted,
        }
    }

    /// Handle for a component rendered without a sound context
    pub fn detached() -> Self {
        warn!("sound cues used without a sound context, cue actions are no-ops");
        Self {
            context: None,
            muted: None,
        }
    }

    /// Whether the context behind this handle is still alive
    pub fn is_connected(&self) -> bool {
        self.context
            .as_ref()
            .is_some_and(|weak| weak.strong_count() > 0)
    }

    fn with<R>(&self, action: impl FnOnce(&mut SoundContext) -> R) -> Option<R> {
        let context = self.context.as_ref()?.upgrade()?;
        let Ok(mut guard) = context.try_borrow_mut() else {
            warn!("sound context busy, dropping cue action");
            return None;
        };
        Some(action(&mut guard))
    }

    /// Play a cue
    pub fn play(&self, cue: Cue) {
        self.with(|ctx| ctx.play_cue(cue));
    }

    /// Button press cue
    pub fn play_click_sound(&self) {
        self.play(Cue::Click);
    }

    /// Pointer enter cue
    pub fn play_hover_sound(&self) {
        self.play(Cue::Hover);
    }

    /// Completed action cue
    pub fn play_success_sound(&self) {
        self.play(Cue::Success);
    }

    /// Restart the ambient loop
    pub fn play_ambient_sound(&self) {
        self.play(Cue::Ambient);
    }

    /// Stop the ambient loop
    pub fn stop_ambient_sound(&self) {
        self.with(|ctx| ctx.stop_ambient_sound());
    }

    /// Flip the mute flag. Returns the new value, `false` without a context.
    pub fn toggle_mute(&self) -> bool {
        self.with(|ctx| ctx.toggle_mute()).unwrap_or(false)
    }

    /// Whether cues are muted, `false` without a context.
    ///
    /// Reads a flag shared with the context, so the answer is right even
    /// while the context is busy with another call.
    pub fn is_muted(&self) -> bool {
        self.is_connected() && self.muted.as_ref().is_some_and(|flag| flag.get())
    }
}
