#![forbid(unsafe_code)]

//! Pure parts of the in-flight spin.
//!
//! [`SpinCadence`] describes how the delay between spin ticks grows from
//! fast to slow, which is what makes the die appear to decelerate.
//! [`SpinPerturbation`] is the random nudge applied on each tick. Neither
//! knows about timers; the scheduler in `dice-roll` combines them.

use std::time::Duration;

use rand::Rng;

use crate::rotation::{Axis, Rotation};

/// Quarter-turn increment.
pub const QUARTER_TURN: u32 = 90;
/// Half-turn increment.
pub const HALF_TURN: u32 = 180;

/// Decelerating tick cadence.
///
/// "Min" and "max" bound the *delay*, so the spin is fastest at `min_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpinCadence {
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub step: Duration,
}

impl Default for SpinCadence {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(60),
            max_delay: Duration::from_millis(240),
            step: Duration::from_millis(20),
        }
    }
}

impl SpinCadence {
    /// Delay for the first tick of a session.
    #[inline]
    #[must_use]
    pub fn initial(&self) -> Duration {
        self.min_delay.min(self.max_delay)
    }

    /// Delay after `current`, clamped to `max_delay`.
    #[must_use]
    pub fn next(&self, current: Duration) -> Duration {
        current.saturating_add(self.step).min(self.max_delay)
    }
}

/// One random rotation increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpinPerturbation {
    pub axis: Axis,
    pub degrees: u32,
}

impl SpinPerturbation {
    /// Draw an increment: axis uniform, 90° with `quarter_turn_probability`,
    /// 180° otherwise.
    ///
    /// The probability is clamped into `[0, 1]`.
    pub fn sample<R: Rng + ?Sized>(rng: &mut R, quarter_turn_probability: f64) -> Self {
        let axis = if rng.random_bool(0.5) { Axis::X } else { Axis::Y };
        let p = if quarter_turn_probability.is_nan() {
            0.5
        } else {
            quarter_turn_probability.clamp(0.0, 1.0)
        };
        let degrees = if rng.random_bool(p) {
            QUARTER_TURN
        } else {
            HALF_TURN
        };
        Self { axis, degrees }
    }

    /// Apply this increment to `rotation`.
    pub fn apply(self, rotation: &mut Rotation) {
        rotation.turn(self.axis, self.degrees);
    }
}
