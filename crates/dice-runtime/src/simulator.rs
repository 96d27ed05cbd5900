#![forbid(unsafe_code)]

//! Deterministic program driver for tests.
//!
//! [`Simulator`] executes the same [`Cmd`] vocabulary as [`Program`] but on
//! virtual time: timers fire only when the test calls [`Simulator::advance`],
//! and background tasks are parked until the test calls
//! [`Simulator::run_tasks`]. This makes races such as "the result arrives
//! before the minimum spin duration" reproducible to the millisecond.
//!
//! [`Program`]: crate::Program

use std::collections::VecDeque;
use std::time::Duration;

use crate::cancellation::CancellationToken;
use crate::clock::{Clock, ManualClock};
use crate::program::{Cmd, Model, Task};
use crate::timer::TimerQueue;

/// Virtual-time driver for a [`Model`].
pub struct Simulator<M: Model> {
    model: M,
    clock: ManualClock,
    timers: TimerQueue<M::Message>,
    tasks: VecDeque<(CancellationToken, Task<M::Message>)>,
    running: bool,
    updates: u64,
}

impl<M: Model> Simulator<M> {
    /// Wrap `model`. The clock should be the one the model reads, if any.
    pub fn new(model: M, clock: ManualClock) -> Self {
        Self {
            model,
            clock,
            timers: TimerQueue::new(),
            tasks: VecDeque::new(),
            running: true,
            updates: 0,
        }
    }

    /// Run `Model::init` and execute its commands.
    pub fn init(&mut self) {
        let cmd = self.model.init();
        self.execute(cmd);
    }

    /// Deliver a message now, as if it came from outside the program.
    pub fn send(&mut self, msg: M::Message) {
        if self.running {
            self.update(msg);
        }
    }

    /// Advance virtual time by `by`, firing due timers in deadline order.
    ///
    /// The clock is moved to each timer's deadline before it fires, so the
    /// model observes exact times. Timers scheduled while advancing fire too
    /// if they fall inside the window.
    pub fn advance(&mut self, by: Duration) {
        let target = self.clock.now().saturating_add(by);
        self.advance_to(target);
    }

    /// Advance virtual time to the absolute instant `to`.
    pub fn advance_to(&mut self, to: Duration) {
        while self.running {
            match self.timers.next_deadline() {
                Some(deadline) if deadline <= to => {
                    self.clock.advance_to(deadline);
                    if let Some(msg) = self.timers.pop_due(deadline) {
                        self.update(msg);
                    }
                }
                _ => break,
            }
        }
        self.clock.advance_to(to);
    }

    /// Complete the oldest parked task at the current virtual time.
    ///
    /// Returns `false` when no task was pending. A task whose source was
    /// cancelled still runs (as it would on a worker thread) but its message
    /// is discarded.
    pub fn run_next_task(&mut self) -> bool {
        let Some((token, task)) = self.tasks.pop_front() else {
            return false;
        };
        let msg = task();
        if !token.is_cancelled() && self.running {
            self.update(msg);
        }
        true
    }

    /// Complete every parked task, including ones spawned while doing so.
    ///
    /// Returns the number of tasks completed.
    pub fn run_tasks(&mut self) -> usize {
        let mut n = 0;
        while self.run_next_task() {
            n += 1;
        }
        n
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Number of parked background tasks.
    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Number of armed (uncancelled) timers.
    pub fn pending_timers(&self) -> usize {
        self.timers.live_len()
    }

    /// Deadline of the next armed timer.
    pub fn next_deadline(&mut self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    /// Total number of `update()` calls so far.
    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// `false` once the model returned [`Cmd::Quit`].
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    fn update(&mut self, msg: M::Message) {
        self.updates += 1;
        let cmd = self.model.update(msg);
        self.execute(cmd);
    }

    fn execute(&mut self, cmd: Cmd<M::Message>) {
        match cmd {
            Cmd::None => {}
            Cmd::Quit => {
                self.running = false;
                self.timers.clear();
                self.tasks.clear();
            }
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
            Cmd::Task { token, task } => self.tasks.push_back((token, task)),
        }
    }
}
