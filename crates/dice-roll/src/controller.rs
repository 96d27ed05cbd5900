#![forbid(unsafe_code)]

//! The roll state machine.
//!
//! [`RollController`] is a [`Model`] driven by [`RollMsg`]. One `Begin`
//! opens a session that fans out into four independent pieces of work:
//!
//! - a spin tick chain ([`SpinScheduler`]),
//! - a background fetch ([`ResultFetcher`]),
//! - a minimum-duration timer,
//! - the trigger cooldown timer.
//!
//! The first three belong to the session and are torn down with it. The
//! cooldown only re-enables the trigger, so it may fire before or after
//! the animation settles.
//!
//! # Commit gate
//!
//! A session commits once both signals are in: the fetched face and the
//! minimum spin duration. Whichever arrives second performs the commit, so
//! a fast provider still spins for the minimum duration and a slow one
//! commits the moment it answers.
//!
//! ```text
//!   Begin ─▶ Spinning ──result (min pending)──▶ Settling ──min elapsed──┐
//!               │                                                       ▼
//!               ├──result (min elapsed)──────────────────────────────▶ Idle
//!               └──fetch error───────────────────────────────────────▶ Idle
//! ```
//!
//! # Invariants
//!
//! 1. At most one session is live; opening one first tears down the last.
//! 2. Messages carry the session id and are ignored once it is stale.
//! 3. Rotation never decreases on either axis, including at commit and
//!    revert.
//! 4. The confirmed face only changes on commit.

use std::sync::Arc;
use std::time::Duration;

use dice_core::{Face, FaceOrientationTable, Rotation};
use dice_runtime::{CancellationSource, Clock, Cmd, Model};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{Span, debug, info, trace, warn};

use crate::config::RollConfig;
use crate::event::{NoopObserver, RollEvent, RollObserver, SessionId, SessionOutcome};
use crate::fetch::{FetchError, ResultFetcher};
use crate::scheduler::SpinScheduler;

/// Messages understood by [`RollController`].
#[derive(Debug, Clone, PartialEq)]
pub enum RollMsg {
    /// User pressed the trigger.
    Begin,
    SpinTick {
        session: SessionId,
    },
    Fetched {
        session: SessionId,
        result: Result<Face, FetchError>,
    },
    MinSpinElapsed {
        session: SessionId,
    },
    CooldownElapsed {
        session: SessionId,
    },
    Quit,
}

impl RollMsg {
    fn kind(&self) -> &'static str {
        match self {
            Self::Begin => "begin",
            Self::SpinTick { .. } => "spin_tick",
            Self::Fetched { .. } => "fetched",
            Self::MinSpinElapsed { .. } => "min_spin_elapsed",
            Self::CooldownElapsed { .. } => "cooldown_elapsed",
            Self::Quit => "quit",
        }
    }
}

/// Animation phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    /// Spinning, no result yet.
    Spinning,
    /// Spinning with a result held until the minimum duration elapses.
    Settling,
}

/// Trigger state as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub enabled: bool,
    pub label: String,
}

#[derive(Debug, Default)]
struct CommitGate {
    result: Option<Face>,
    min_elapsed: bool,
}

impl CommitGate {
    fn ready(&self) -> Option<Face> {
        if self.min_elapsed { self.result } else { None }
    }
}

#[derive(Debug)]
struct RollSession {
    id: SessionId,
    started_at: Duration,
    gate: CommitGate,
    min_spin: Option<CancellationSource>,
    fetch: Option<CancellationSource>,
}

impl RollSession {
    fn close(&mut self) {
        if let Some(timer) = self.min_spin.take() {
            timer.cancel();
        }
        if let Some(task) = self.fetch.take() {
            task.cancel();
        }
    }
}

#[derive(Debug, Clone)]
struct Settings {
    min_spin: Duration,
    cooldown: Duration,
    extra_spins: (u32, u32),
    idle_label: String,
    rolling_label: String,
}

/// Dice roll controller.
pub struct RollController<O: RollObserver = NoopObserver> {
    settings: Settings,
    table: FaceOrientationTable,
    fetcher: Arc<dyn ResultFetcher>,
    clock: Arc<dyn Clock>,
    rng: SmallRng,
    scheduler: SpinScheduler,
    rotation: Rotation,
    confirmed: Face,
    phase: Phase,
    trigger: Trigger,
    session: Option<RollSession>,
    cooldown: Option<(SessionId, CancellationSource)>,
    last_session: SessionId,
    observer: O,
}

impl RollController<NoopObserver> {
    /// Build a controller resting on face 1.
    ///
    /// `config` is taken as-is; validate it first if it came from a user.
    pub fn new(config: &RollConfig, fetcher: Arc<dyn ResultFetcher>, clock: Arc<dyn Clock>) -> Self {
        Self {
            settings: Settings {
                min_spin: config.min_spin_duration(),
                cooldown: config.cooldown(),
                extra_spins: config.extra_spins(),
                idle_label: config.trigger.idle_label.clone(),
                rolling_label: config.trigger.rolling_label.clone(),
            },
            table: FaceOrientationTable::standard(),
            fetcher,
            clock,
            rng: SmallRng::from_os_rng(),
            scheduler: SpinScheduler::new(config.cadence(), config.spin.quarter_turn_probability),
            rotation: Rotation::ZERO,
            confirmed: Face::ONE,
            phase: Phase::Idle,
            trigger: Trigger {
                enabled: true,
                label: config.trigger.idle_label.clone(),
            },
            session: None,
            cooldown: None,
            last_session: 0,
            observer: NoopObserver,
        }
    }
}

impl<O: RollObserver> RollController<O> {
    /// Replace the observer.
    pub fn with_observer<P: RollObserver>(self, observer: P) -> RollController<P> {
        RollController {
            settings: self.settings,
            table: self.table,
            fetcher: self.fetcher,
            clock: self.clock,
            rng: self.rng,
            scheduler: self.scheduler,
            rotation: self.rotation,
            confirmed: self.confirmed,
            phase: self.phase,
            trigger: self.trigger,
            session: self.session,
            cooldown: self.cooldown,
            last_session: self.last_session,
            observer,
        }
    }

    /// Seed the spin and extra-revolution randomness for reproducible runs.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    /// Use a different face-to-orientation table. The die is re-seated on
    /// the confirmed face.
    #[must_use]
    pub fn with_table(mut self, table: FaceOrientationTable) -> Self {
        self.table = table;
        self.rotation = self.table.compute_target(Rotation::ZERO, self.confirmed, 0);
        self
    }

    /// Start resting on `face` instead of face 1.
    #[must_use]
    pub fn with_confirmed_face(mut self, face: Face) -> Self {
        self.confirmed = face;
        self.rotation = self.table.compute_target(Rotation::ZERO, face, 0);
        self
    }

    #[must_use]
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Last face the die settled on through a successful fetch.
    #[must_use]
    pub fn confirmed_face(&self) -> Face {
        self.confirmed
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    #[must_use]
    pub fn active_session(&self) -> Option<SessionId> {
        self.session.as_ref().map(|s| s.id)
    }

    #[must_use]
    pub fn table(&self) -> &FaceOrientationTable {
        &self.table
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    fn begin(&mut self) -> Cmd<RollMsg> {
        if !self.trigger.enabled {
            debug!(target: "dice.roll", "trigger disabled; ignoring roll request");
            return Cmd::none();
        }

        self.set_trigger(false);
        if let Some(old) = self.teardown_session() {
            debug!(target: "dice.roll", session = old, "superseding unfinished session");
            let at_ms = self.now_ms();
            self.emit(RollEvent::SessionEnded {
                session: old,
                outcome: SessionOutcome::Superseded,
                at_ms,
            });
        }
        if let Some((_, cooldown)) = self.cooldown.take() {
            cooldown.cancel();
        }

        self.last_session += 1;
        let id = self.last_session;
        let _span = session_span(id).entered();
        let started_at = self.clock.now();
        let at_ms = self.now_ms();
        info!(target: "dice.roll", "roll started");
        self.emit(RollEvent::SessionStarted { session: id, at_ms });

        self.phase = Phase::Spinning;
        let (_, tick) =
            self.scheduler
                .start(&mut self.rotation, &mut self.rng, RollMsg::SpinTick { session: id });
        self.emit(RollEvent::Rotated {
            session: id,
            rotation: self.rotation,
            at_ms,
        });

        let fetcher = Arc::clone(&self.fetcher);
        let (fetch, fetch_source) = Cmd::task(move || RollMsg::Fetched {
            session: id,
            result: fetcher.fetch(),
        });
        let (min_spin, min_spin_source) =
            Cmd::schedule(self.settings.min_spin, RollMsg::MinSpinElapsed { session: id });
        let (cooldown, cooldown_source) =
            Cmd::schedule(self.settings.cooldown, RollMsg::CooldownElapsed { session: id });

        self.session = Some(RollSession {
            id,
            started_at,
            gate: CommitGate::default(),
            min_spin: Some(min_spin_source),
            fetch: Some(fetch_source),
        });
        self.cooldown = Some((id, cooldown_source));

        Cmd::batch(vec![tick, fetch, min_spin, cooldown])
    }

    fn on_tick(&mut self, session: SessionId) -> Cmd<RollMsg> {
        if !self.is_live(session) || !self.scheduler.is_running() {
            return self.stale(session, "spin_tick");
        }
        let (_, next) =
            self.scheduler
                .tick(&mut self.rotation, &mut self.rng, RollMsg::SpinTick { session });
        trace!(
            target: "dice.roll",
            session,
            x = self.rotation.x,
            y = self.rotation.y,
            next_ms = self.scheduler.current_delay().as_millis() as u64,
            "spin tick"
        );
        let at_ms = self.now_ms();
        self.emit(RollEvent::Rotated {
            session,
            rotation: self.rotation,
            at_ms,
        });
        next
    }

    fn on_fetched(&mut self, session: SessionId, result: Result<Face, FetchError>) -> Cmd<RollMsg> {
        let now = self.clock.now();
        let min_spin = self.settings.min_spin;
        let Some(active) = self.session.as_mut().filter(|s| s.id == session) else {
            return self.stale(session, "fetched");
        };
        active.fetch = None;
        let _span = session_span(session).entered();

        let face = match result {
            Ok(face) => face,
            Err(err) => return self.revert(err),
        };

        active.gate.result = Some(face);
        let elapsed = now.saturating_sub(active.started_at);
        debug!(
            target: "dice.roll",
            face = face.get(),
            elapsed_ms = elapsed.as_millis() as u64,
            "outcome received"
        );
        if let Some(face) = active.gate.ready() {
            return self.commit(face);
        }

        debug!(
            target: "dice.roll",
            remaining_ms = min_spin.saturating_sub(elapsed).as_millis() as u64,
            "holding outcome until minimum spin elapses"
        );
        self.phase = Phase::Settling;
        Cmd::none()
    }

    fn on_min_spin_elapsed(&mut self, session: SessionId) -> Cmd<RollMsg> {
        let Some(active) = self.session.as_mut().filter(|s| s.id == session) else {
            return self.stale(session, "min_spin_elapsed");
        };
        active.min_spin = None;
        active.gate.min_elapsed = true;
        match active.gate.ready() {
            Some(face) => {
                let _span = session_span(session).entered();
                self.commit(face)
            }
            None => Cmd::none(),
        }
    }

    fn on_cooldown_elapsed(&mut self, session: SessionId) -> Cmd<RollMsg> {
        match self.cooldown.take() {
            Some((id, _)) if id == session => {
                debug!(target: "dice.roll", session, "cooldown elapsed");
                self.set_trigger(true);
            }
            other => {
                self.cooldown = other;
                self.stale(session, "cooldown_elapsed");
            }
        }
        Cmd::none()
    }

    fn commit(&mut self, face: Face) -> Cmd<RollMsg> {
        let Some(mut session) = self.session.take() else {
            return Cmd::none();
        };
        self.scheduler.stop();
        session.close();

        let (lo, hi) = self.settings.extra_spins;
        let extra_spins = self.rng.random_range(lo..=hi);
        self.rotation = self.table.compute_target(self.rotation, face, extra_spins);
        self.confirmed = face;
        self.phase = Phase::Idle;

        let elapsed = self.clock.now().saturating_sub(session.started_at);
        info!(
            target: "dice.roll",
            face = face.get(),
            extra_spins,
            elapsed_ms = elapsed.as_millis() as u64,
            "roll committed"
        );
        let at_ms = self.now_ms();
        self.emit(RollEvent::Committed {
            session: session.id,
            face,
            rotation: self.rotation,
            extra_spins,
            at_ms,
        });
        self.emit(RollEvent::SessionEnded {
            session: session.id,
            outcome: SessionOutcome::Committed,
            at_ms,
        });
        Cmd::none()
    }

    fn revert(&mut self, err: FetchError) -> Cmd<RollMsg> {
        let Some(mut session) = self.session.take() else {
            return Cmd::none();
        };
        self.scheduler.stop();
        session.close();

        self.rotation = self.table.compute_target(self.rotation, self.confirmed, 0);
        self.phase = Phase::Idle;

        warn!(
            target: "dice.roll",
            error = %err,
            face = self.confirmed.get(),
            "outcome fetch failed; returning to last confirmed face"
        );
        let at_ms = self.now_ms();
        self.emit(RollEvent::Reverted {
            session: session.id,
            face: self.confirmed,
            rotation: self.rotation,
            error: err.to_string(),
            at_ms,
        });
        self.emit(RollEvent::SessionEnded {
            session: session.id,
            outcome: SessionOutcome::Reverted,
            at_ms,
        });
        Cmd::none()
    }

    /// Cancel everything owned by the live session, if any, and return its id.
    fn teardown_session(&mut self) -> Option<SessionId> {
        self.scheduler.stop();
        self.phase = Phase::Idle;
        let mut old = self.session.take()?;
        old.close();
        Some(old.id)
    }

    fn shutdown(&mut self) -> Cmd<RollMsg> {
        let _ = self.teardown_session();
        if let Some((_, cooldown)) = self.cooldown.take() {
            cooldown.cancel();
        }
        debug!(target: "dice.roll", "controller shut down");
        Cmd::quit()
    }

    fn set_trigger(&mut self, enabled: bool) {
        let label = if enabled {
            &self.settings.idle_label
        } else {
            &self.settings.rolling_label
        };
        self.trigger = Trigger {
            enabled,
            label: label.clone(),
        };
        let at_ms = self.now_ms();
        self.emit(RollEvent::TriggerChanged {
            enabled,
            label: self.trigger.label.clone(),
            at_ms,
        });
    }

    fn is_live(&self, session: SessionId) -> bool {
        self.session.as_ref().is_some_and(|s| s.id == session)
    }

    fn stale(&self, session: SessionId, kind: &'static str) -> Cmd<RollMsg> {
        debug!(
            target: "dice.roll",
            session,
            current = ?self.active_session(),
            kind,
            "ignoring stale message"
        );
        Cmd::none()
    }

    fn emit(&mut self, event: RollEvent) {
        self.observer.on_event(&event);
    }

    fn now_ms(&self) -> u64 {
        u64::try_from(self.clock.now().as_millis()).unwrap_or(u64::MAX)
    }
}

fn session_span(session: SessionId) -> Span {
    tracing::info_span!(target: "dice.roll", "roll.session", session)
}

impl<O: RollObserver> Model for RollController<O> {
    type Message = RollMsg;

    fn update(&mut self, msg: RollMsg) -> Cmd<RollMsg> {
        trace!(target: "dice.roll", msg = msg.kind(), phase = ?self.phase, "update");
        match msg {
            RollMsg::Begin => self.begin(),
            RollMsg::SpinTick { session } => self.on_tick(session),
            RollMsg::Fetched { session, result } => self.on_fetched(session, result),
            RollMsg::MinSpinElapsed { session } => self.on_min_spin_elapsed(session),
            RollMsg::CooldownElapsed { session } => self.on_cooldown_elapsed(session),
            RollMsg::Quit => self.shutdown(),
        }
    }
}

impl<O: RollObserver> std::fmt::Debug for RollController<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RollController")
            .field("rotation", &self.rotation)
            .field("confirmed", &self.confirmed)
            .field("phase", &self.phase)
            .field("trigger", &self.trigger)
            .field("session", &self.active_session())
            .finish_non_exhaustive()
    }
}
