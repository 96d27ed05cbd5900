#![forbid(unsafe_code)]

//! Controller output stream.
//!
//! Every visible change the controller makes is reported as a [`RollEvent`]
//! to its [`RollObserver`]. A session always produces, in order:
//!
//! ```text
//! SessionStarted, Rotated*, (Committed | Reverted), SessionEnded
//! ```
//!
//! unless a new `begin` supersedes it first, in which case the stream is
//! `SessionStarted, Rotated*, SessionEnded { outcome: Superseded }`.
//! `TriggerChanged` events are interleaved freely because the trigger
//! cooldown is independent of the animation.

use std::cell::RefCell;
use std::rc::Rc;

use dice_core::{Face, Rotation};
use serde::Serialize;

/// Monotonically increasing session identifier, starting at 1.
pub type SessionId = u64;

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    /// Settled on the provider's face.
    Committed,
    /// Fetch failed; settled back on the last confirmed face.
    Reverted,
    /// A newer session started before this one finished.
    Superseded,
}

/// A visible change. Times are milliseconds on the controller's clock.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RollEvent {
    SessionStarted {
        session: SessionId,
        at_ms: u64,
    },
    /// One spin tick moved the die.
    Rotated {
        session: SessionId,
        rotation: Rotation,
        at_ms: u64,
    },
    Committed {
        session: SessionId,
        face: Face,
        rotation: Rotation,
        extra_spins: u32,
        at_ms: u64,
    },
    Reverted {
        session: SessionId,
        face: Face,
        rotation: Rotation,
        error: String,
        at_ms: u64,
    },
    SessionEnded {
        session: SessionId,
        outcome: SessionOutcome,
        at_ms: u64,
    },
    TriggerChanged {
        enabled: bool,
        label: String,
        at_ms: u64,
    },
}

impl RollEvent {
    /// Session the event belongs to; `None` for trigger changes.
    #[must_use]
    pub fn session(&self) -> Option<SessionId> {
        match self {
            Self::SessionStarted { session, .. }
            | Self::Rotated { session, .. }
            | Self::Committed { session, .. }
            | Self::Reverted { session, .. }
            | Self::SessionEnded { session, .. } => Some(*session),
            Self::TriggerChanged { .. } => None,
        }
    }

    #[must_use]
    pub fn at_ms(&self) -> u64 {
        match self {
            Self::SessionStarted { at_ms, .. }
            | Self::Rotated { at_ms, .. }
            | Self::Committed { at_ms, .. }
            | Self::Reverted { at_ms, .. }
            | Self::SessionEnded { at_ms, .. }
            | Self::TriggerChanged { at_ms, .. } => *at_ms,
        }
    }

    /// Rotation carried by the event, if any.
    #[must_use]
    pub fn rotation(&self) -> Option<Rotation> {
        match self {
            Self::Rotated { rotation, .. }
            | Self::Committed { rotation, .. }
            | Self::Reverted { rotation, .. } => Some(*rotation),
            _ => None,
        }
    }

    /// Short event name, matching the serialized `event` tag.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SessionStarted { .. } => "session_started",
            Self::Rotated { .. } => "rotated",
            Self::Committed { .. } => "committed",
            Self::Reverted { .. } => "reverted",
            Self::SessionEnded { .. } => "session_ended",
            Self::TriggerChanged { .. } => "trigger_changed",
        }
    }
}

/// Receives controller output.
pub trait RollObserver {
    fn on_event(&mut self, event: &RollEvent);
}

impl<F: FnMut(&RollEvent)> RollObserver for F {
    fn on_event(&mut self, event: &RollEvent) {
        self(event);
    }
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl RollObserver for NoopObserver {
    fn on_event(&mut self, _event: &RollEvent) {}
}

/// Recording observer. Clones share the same buffer, so a test can keep one
/// handle while the controller owns another.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<RollEvent>>>,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<RollEvent> {
        self.events.borrow().clone()
    }

    /// Remove and return everything recorded so far.
    pub fn drain(&self) -> Vec<RollEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    /// Recorded events belonging to `session`.
    #[must_use]
    pub fn for_session(&self, session: SessionId) -> Vec<RollEvent> {
        self.events
            .borrow()
            .iter()
            .filter(|e| e.session() == Some(session))
            .cloned()
            .collect()
    }
}

impl RollObserver for EventLog {
    fn on_event(&mut self, event: &RollEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}
