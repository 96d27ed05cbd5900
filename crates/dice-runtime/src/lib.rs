#![forbid(unsafe_code)]

//! dicetumble runtime
//!
//! A small Elm-style runtime: a [`Model`] receives messages one at a time in
//! [`Model::update`] and answers with a [`Cmd`] describing side effects. All
//! updates run on a single thread, so model state needs no locking.
//!
//! # Key Components
//!
//! - [`Model`] - Trait for application state and behavior
//! - [`Cmd`] - Commands for side effects (messages, timers, background tasks)
//! - [`CancellationSource`] - Teardown handle captured when a timer or task is scheduled
//! - [`Clock`] - Monotonic time source ([`SystemClock`], [`ManualClock`])
//! - [`Program`] - Real-time event loop
//! - [`Simulator`] - Deterministic virtual-time driver for tests
//!
//! # Ordering and cancellation
//!
//! Timers fire in deadline order (ties in scheduling order). A timer or task
//! whose [`CancellationSource`] was cancelled is dropped before its message
//! reaches `update()`, even if the task itself already finished on its
//! worker thread.

pub mod cancellation;
pub mod clock;
pub mod program;
pub mod simulator;
mod timer;

pub use cancellation::{CancellationSource, CancellationToken};
pub use clock::{Clock, ManualClock, SystemClock};
pub use program::{Cmd, Model, Program, ProgramConfig, ProgramHandle, Task};
pub use simulator::Simulator;
