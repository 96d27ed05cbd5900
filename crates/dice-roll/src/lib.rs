#![forbid(unsafe_code)]

//! Roll animation controller.
//!
//! # Role in dicetumble
//! `dice-roll` is the part of the system with real temporal coordination:
//! a spin that keeps perturbing the die on a decelerating timer, a
//! background request for the outcome, a minimum perceived spin duration,
//! a forward-only settle onto the received face, and a revert to the last
//! confirmed face when the request fails.
//!
//! # Primary responsibilities
//! - **[`RollController`]**: the [`dice_runtime::Model`] that owns the
//!   session lifecycle (`Idle → Spinning → Settling → Idle`) and the trigger
//!   cooldown.
//! - **[`SpinScheduler`]**: self-rescheduling, cancellable spin ticks.
//! - **[`ResultFetcher`]**: outcome request and payload validation, with an
//!   HTTP implementation in [`HttpResultFetcher`].
//! - **[`RollConfig`]**: tunables loaded from TOML or JSON.
//! - **[`RollEvent`]**: the output stream a renderer consumes.

pub mod config;
pub mod controller;
pub mod event;
pub mod fetch;
pub mod scheduler;

pub use config::{ConfigError, ProviderConfig, RollConfig, SpinConfig, TimingConfig, TriggerConfig};
pub use controller::{Phase, RollController, RollMsg, Trigger};
pub use event::{EventLog, NoopObserver, RollEvent, RollObserver, SessionId, SessionOutcome};
pub use fetch::{FetchError, HttpResultFetcher, ResultFetcher, parse_payload};
pub use scheduler::SpinScheduler;
