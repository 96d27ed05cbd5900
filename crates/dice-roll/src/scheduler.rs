#![forbid(unsafe_code)]

//! Self-rescheduling spin ticks.
//!
//! The scheduler applies one [`SpinPerturbation`] per tick and arms the next
//! tick with a [`Cmd::schedule`] whose delay grows along the configured
//! [`SpinCadence`]. It owns the cancellation handle of the single pending
//! tick, so [`SpinScheduler::stop`] is the only teardown call needed.
//!
//! # Invariants
//!
//! 1. At most one tick is pending at any time.
//! 2. Waits between ticks start at `min_delay` and grow by `step` up to
//!    `max_delay`.
//! 3. After `stop()` no tick armed before it is delivered.

use std::time::Duration;

use dice_core::{Rotation, SpinCadence, SpinPerturbation};
use dice_runtime::{CancellationSource, Cmd};
use rand::Rng;

/// Decelerating tick driver for one spin at a time.
#[derive(Debug)]
pub struct SpinScheduler {
    cadence: SpinCadence,
    quarter_turn_probability: f64,
    delay: Duration,
    pending: Option<CancellationSource>,
    ticks: u32,
}

impl SpinScheduler {
    #[must_use]
    pub fn new(cadence: SpinCadence, quarter_turn_probability: f64) -> Self {
        Self {
            delay: cadence.initial(),
            cadence,
            quarter_turn_probability,
            pending: None,
            ticks: 0,
        }
    }

    /// Start a spin: reset the cadence and tick immediately.
    ///
    /// `next` is the message delivered when the following tick is due. Any
    /// tick still pending from an earlier spin is cancelled.
    pub fn start<M, R>(
        &mut self,
        rotation: &mut Rotation,
        rng: &mut R,
        next: M,
    ) -> (SpinPerturbation, Cmd<M>)
    where
        M: Send + 'static,
        R: Rng + ?Sized,
    {
        self.stop();
        self.ticks = 0;
        self.delay = self.cadence.initial();
        self.step(rotation, rng, next)
    }

    /// Handle a due tick: perturb and arm the next one after a longer delay.
    pub fn tick<M, R>(
        &mut self,
        rotation: &mut Rotation,
        rng: &mut R,
        next: M,
    ) -> (SpinPerturbation, Cmd<M>)
    where
        M: Send + 'static,
        R: Rng + ?Sized,
    {
        self.delay = self.cadence.next(self.delay);
        self.step(rotation, rng, next)
    }

    /// Cancel the pending tick. Idempotent.
    pub fn stop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel();
        }
    }

    /// `true` while a tick is armed.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.pending.is_some()
    }

    /// Wait before the pending tick.
    #[must_use]
    pub fn current_delay(&self) -> Duration {
        self.delay
    }

    /// Ticks performed since the last `start`, including the immediate one.
    #[must_use]
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    fn step<M, R>(&mut self, rotation: &mut Rotation, rng: &mut R, next: M) -> (SpinPerturbation, Cmd<M>)
    where
        M: Send + 'static,
        R: Rng + ?Sized,
    {
        let perturbation = SpinPerturbation::sample(rng, self.quarter_turn_probability);
        perturbation.apply(rotation);
        self.ticks = self.ticks.saturating_add(1);

        let (cmd, source) = Cmd::schedule(self.delay, next);
        self.pending = Some(source);
        (perturbation, cmd)
    }
}
