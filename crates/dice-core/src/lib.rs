#![forbid(unsafe_code)]

//! Core: the die as a value model.
//!
//! # Role in dicetumble
//! `dice-core` owns everything about the die that is independent of time:
//! which faces exist, how the accumulated 3D rotation is represented, which
//! orientation shows which face, and how a forward-only target rotation is
//! computed for a settle. It also owns the pure half of the spin: the
//! decelerating delay cadence and the random per-tick perturbation.
//!
//! # How it fits in the system
//! `dice-roll` drives these types from inside the single-threaded event loop
//! provided by `dice-runtime`. Nothing here schedules work or performs I/O.

pub mod face;
pub mod orientation;
pub mod rotation;
pub mod spin;

pub use face::{Face, FaceError};
pub use orientation::{FaceOrientationTable, Orientation};
pub use rotation::{Axis, FULL_TURN, Rotation};
pub use spin::{SpinCadence, SpinPerturbation};
