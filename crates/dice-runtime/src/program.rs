#![forbid(unsafe_code)]

//! Elm-style program loop.
//!
//! The program owns the model and runs every `update()` on the calling
//! thread. Side effects come back as [`Cmd`] values:
//!
//! - one-shot timers ([`Cmd::schedule`]) are kept in a deadline queue and
//!   fired by the loop itself;
//! - background tasks ([`Cmd::task`]) run on a worker thread and deliver
//!   their result message back through the program's channel;
//! - external producers (an input reader, a test) push messages with a
//!   [`ProgramHandle`].
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use dice_runtime::{Cmd, Model, Program};
//!
//! struct Countdown {
//!     left: u32,
//! }
//!
//! enum Msg {
//!     Tick,
//! }
//!
//! impl Model for Countdown {
//!     type Message = Msg;
//!
//!     fn init(&mut self) -> Cmd<Msg> {
//!         Cmd::msg(Msg::Tick)
//!     }
//!
//!     fn update(&mut self, msg: Msg) -> Cmd<Msg> {
//!         match msg {
//!             Msg::Tick if self.left == 0 => Cmd::quit(),
//!             Msg::Tick => {
//!                 self.left -= 1;
//!                 let (cmd, _timer) = Cmd::schedule(Duration::from_millis(1), Msg::Tick);
//!                 cmd
//!             }
//!         }
//!     }
//! }
//!
//! let mut program = Program::new(Countdown { left: 3 });
//! program.run();
//! assert_eq!(program.model().left, 0);
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use crate::cancellation::{CancellationSource, CancellationToken};
use crate::clock::{Clock, SystemClock};
use crate::timer::TimerQueue;

/// The Model trait defines application state and behavior.
pub trait Model: Sized {
    /// Messages that drive state transitions.
    type Message: Send + 'static;

    /// Initialize the model with startup commands.
    fn init(&mut self) -> Cmd<Self::Message> {
        Cmd::none()
    }

    /// Update the model in response to a message.
    ///
    /// This is the only place model state changes. Returns commands for any
    /// side effects that should be executed.
    fn update(&mut self, msg: Self::Message) -> Cmd<Self::Message>;
}

/// Work executed on a background thread; its return value is delivered to
/// `update()`.
pub type Task<M> = Box<dyn FnOnce() -> M + Send + 'static>;

/// Commands represent side effects to be executed by the runtime.
pub enum Cmd<M> {
    /// No operation.
    None,
    /// Stop the program after the current update.
    Quit,
    /// Execute several commands in order.
    Batch(Vec<Cmd<M>>),
    /// Deliver a message to the model immediately.
    Msg(M),
    /// Deliver `msg` once `after` has elapsed, unless `token` is cancelled.
    Schedule {
        after: Duration,
        token: CancellationToken,
        msg: M,
    },
    /// Run `task` in the background and deliver its result, unless `token`
    /// is cancelled by the time it completes.
    Task {
        token: CancellationToken,
        task: Task<M>,
    },
}

impl<M> Cmd<M> {
    /// Create a no-op command.
    #[inline]
    pub fn none() -> Self {
        Self::None
    }

    /// Create a quit command.
    #[inline]
    pub fn quit() -> Self {
        Self::Quit
    }

    /// Create a message command.
    #[inline]
    pub fn msg(m: M) -> Self {
        Self::Msg(m)
    }

    /// Create a batch of commands, collapsing trivial cases.
    pub fn batch(cmds: Vec<Self>) -> Self {
        let mut cmds: Vec<Self> = cmds
            .into_iter()
            .filter(|c| !matches!(c, Self::None))
            .collect();
        match cmds.len() {
            0 => Self::None,
            1 => cmds.pop().unwrap_or(Self::None),
            _ => Self::Batch(cmds),
        }
    }

    /// Schedule `msg` after `after`.
    ///
    /// The returned source is the only way to tear the timer down; dropping
    /// it leaves the timer armed.
    pub fn schedule(after: Duration, msg: M) -> (Self, CancellationSource) {
        let source = CancellationSource::new();
        let cmd = Self::Schedule {
            after,
            token: source.token(),
            msg,
        };
        (cmd, source)
    }

    /// Run `f` on a background thread and deliver its result.
    ///
    /// Cancelling the source discards the result but cannot interrupt `f`:
    /// a blocked task keeps its thread until `f` returns. Bound blocking
    /// work (for example with a request timeout) when that matters.
    pub fn task(f: impl FnOnce() -> M + Send + 'static) -> (Self, CancellationSource) {
        let source = CancellationSource::new();
        let cmd = Self::Task {
            token: source.token(),
            task: Box::new(f),
        };
        (cmd, source)
    }

    /// Short name used in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Quit => "quit",
            Self::Batch(_) => "batch",
            Self::Msg(_) => "msg",
            Self::Schedule { .. } => "schedule",
            Self::Task { .. } => "task",
        }
    }
}

impl<M> Default for Cmd<M> {
    fn default() -> Self {
        Self::None
    }
}

impl<M: fmt::Debug> fmt::Debug for Cmd<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Quit => f.write_str("Quit"),
            Self::Batch(cmds) => f.debug_tuple("Batch").field(cmds).finish(),
            Self::Msg(m) => f.debug_tuple("Msg").field(m).finish(),
            Self::Schedule { after, token, msg } => f
                .debug_struct("Schedule")
                .field("after", after)
                .field("cancelled", &token.is_cancelled())
                .field("msg", msg)
                .finish(),
            Self::Task { token, .. } => f
                .debug_struct("Task")
                .field("cancelled", &token.is_cancelled())
                .finish_non_exhaustive(),
        }
    }
}

/// Configuration for the program runtime.
#[derive(Debug, Clone)]
pub struct ProgramConfig {
    /// Longest the loop blocks waiting for a message when no timer is due
    /// sooner.
    pub poll_timeout: Duration,
    /// Name given to background task threads.
    pub task_thread_name: String,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_millis(100),
            task_thread_name: "dice-task".to_string(),
        }
    }
}

enum Envelope<M> {
    External(M),
    TaskDone { token: CancellationToken, msg: M },
}

/// Cloneable sender for pushing messages into a running program.
pub struct ProgramHandle<M> {
    sender: mpsc::Sender<Envelope<M>>,
}

impl<M> Clone for ProgramHandle<M> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<M> fmt::Debug for ProgramHandle<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgramHandle").finish_non_exhaustive()
    }
}

impl<M: Send + 'static> ProgramHandle<M> {
    /// Queue `msg` for the program. Returns `false` once the program is gone.
    pub fn send(&self, msg: M) -> bool {
        self.sender.send(Envelope::External(msg)).is_ok()
    }
}

/// The program runtime that manages the update loop.
pub struct Program<M: Model> {
    model: M,
    clock: Arc<dyn Clock>,
    timers: TimerQueue<M::Message>,
    sender: mpsc::Sender<Envelope<M::Message>>,
    receiver: mpsc::Receiver<Envelope<M::Message>>,
    config: ProgramConfig,
    running: bool,
}

impl<M: Model> Program<M> {
    /// Create a program driven by the system clock.
    pub fn new(model: M) -> Self {
        Self::with_clock(model, Arc::new(SystemClock::new()))
    }

    /// Create a program driven by `clock`.
    ///
    /// Pass the same clock to the model if it reads time, so that timer
    /// deadlines and model timestamps agree.
    pub fn with_clock(model: M, clock: Arc<dyn Clock>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            model,
            clock,
            timers: TimerQueue::new(),
            sender,
            receiver,
            config: ProgramConfig::default(),
            running: true,
        }
    }

    /// Replace the runtime configuration.
    #[must_use]
    pub fn with_config(mut self, config: ProgramConfig) -> Self {
        self.config = config;
        self
    }

    /// A handle for sending messages from other threads.
    pub fn handle(&self) -> ProgramHandle<M::Message> {
        ProgramHandle {
            sender: self.sender.clone(),
        }
    }

    /// Run until the model returns [`Cmd::Quit`].
    pub fn run(&mut self) {
        tracing::debug!(target: "dice.runtime", "program started");
        let cmd = self.model.init();
        self.execute(cmd);

        while self.running {
            self.fire_due_timers();
            if !self.running {
                break;
            }

            let timeout = self.effective_timeout();
            match self.receiver.recv_timeout(timeout) {
                Ok(envelope) => self.dispatch(envelope),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
            while self.running {
                match self.receiver.try_recv() {
                    Ok(envelope) => self.dispatch(envelope),
                    Err(_) => break,
                }
            }
        }

        let abandoned = self.timers.live_len();
        self.timers.clear();
        tracing::debug!(
            target: "dice.runtime",
            abandoned_timers = abandoned,
            "program stopped"
        );
    }

    /// Get a reference to the model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Get a mutable reference to the model.
    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    /// Check if the program is running.
    pub fn is_running(&self) -> bool {
        self.running
    }

    fn update(&mut self, msg: M::Message) {
        let cmd = self.model.update(msg);
        self.execute(cmd);
    }

    fn dispatch(&mut self, envelope: Envelope<M::Message>) {
        match envelope {
            Envelope::External(msg) => self.update(msg),
            Envelope::TaskDone { token, msg } => {
                if token.is_cancelled() {
                    tracing::debug!(target: "dice.runtime", "discarding result of cancelled task");
                } else {
                    self.update(msg);
                }
            }
        }
    }

    fn execute(&mut self, cmd: Cmd<M::Message>) {
        match cmd {
            Cmd::None => {}
            Cmd::Quit => self.running = false,
            Cmd::Msg(m) => self.update(m),
            Cmd::Batch(cmds) => {
                for c in cmds {
                    self.execute(c);
                }
            }
            Cmd::Schedule { after, token, msg } => {
                let deadline = self.clock.now().saturating_add(after);
                self.timers.push(deadline, token, msg);
            }
            Cmd::Task { token, task } => self.spawn_task(token, task),
        }
    }

    fn spawn_task(&mut self, token: CancellationToken, task: Task<M::Message>) {
        let sender = self.sender.clone();
        let worker_token = token.clone();
        let spawned = thread::Builder::new()
            .name(self.config.task_thread_name.clone())
            .spawn(move || {
                let msg = task();
                // The receiver only disappears when the program is dropped.
                let _ = sender.send(Envelope::TaskDone {
                    token: worker_token,
                    msg,
                });
            });
        if let Err(err) = spawned {
            tracing::error!(
                target: "dice.runtime",
                error = %err,
                "failed to spawn task thread"
            );
        }
    }

    fn fire_due_timers(&mut self) {
        while self.running {
            let now = self.clock.now();
            match self.timers.pop_due(now) {
                Some(msg) => self.update(msg),
                None => break,
            }
        }
    }

    fn effective_timeout(&mut self) -> Duration {
        let poll = self.config.poll_timeout;
        match self.timers.next_deadline() {
            Some(deadline) => deadline.saturating_sub(self.clock.now()).min(poll),
            None => poll,
        }
    }
}
