#![forbid(unsafe_code)]

//! `dice roll`: the interactive front end.
//!
//! The roll controller runs inside a [`Program`] on the main thread. A
//! reader thread turns stdin lines into [`RollMsg`]s, and the [`Console`]
//! observer renders events and, with `--count`, triggers the next roll as
//! soon as the trigger re-enables.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use clap::Args;
use dice_roll::{
    HttpResultFetcher, RollConfig, RollController, RollEvent, RollMsg, RollObserver, SessionId,
};
use dice_runtime::{Clock, Program, ProgramHandle, SystemClock};
use tracing::{info, warn};

use crate::error::Result;
use crate::render::{OutputFormat, Renderer};

#[derive(Debug, Clone, Args)]
pub struct RollArgs {
    /// Configuration file (TOML, or JSON with a `.json` extension).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Outcome provider URL, overriding the configuration.
    #[arg(long)]
    pub url: Option<String>,

    /// Roll this many times without waiting for input, then exit.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub count: Option<u32>,

    /// Seed for the spin animation.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Load `path` (or defaults), apply command-line overrides, and validate.
pub fn resolve_config(path: Option<&Path>, url: Option<&str>) -> Result<RollConfig> {
    let mut config = match path {
        Some(path) => RollConfig::from_file(path)?,
        None => RollConfig::default(),
    };
    if let Some(url) = url {
        config.provider.url = url.to_string();
    }
    Ok(config.validated()?)
}

pub fn run_roll(args: RollArgs) -> Result<()> {
    let config = resolve_config(args.config.as_deref(), args.url.as_deref())?;
    let fetcher = HttpResultFetcher::from_config(&config.provider)?;
    info!(
        target: "dice.cli",
        url = fetcher.url(),
        count = ?args.count,
        "starting dice"
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let mut controller = RollController::new(&config, Arc::new(fetcher), Arc::clone(&clock));
    if let Some(seed) = args.seed {
        controller = controller.with_seed(seed);
    }

    let interactive = args.count.is_none();
    let mut renderer = Renderer::new(io::stdout(), args.format, interactive);
    renderer.intro(controller.confirmed_face(), controller.trigger())?;

    let console = Console::new(renderer, args.count);
    let mut program = Program::with_clock(controller.with_observer(console), clock);
    let handle = program.handle();
    program.model_mut().observer_mut().attach(handle.clone());
    spawn_input_reader(handle.clone(), interactive)?;

    if args.count.is_some() {
        handle.send(RollMsg::Begin);
    }
    program.run();
    Ok(())
}

/// Map one line of user input to a message.
///
/// Only `q` is honoured when rolls are automatic.
#[must_use]
pub fn parse_command(line: &str, interactive: bool) -> Option<RollMsg> {
    match line.trim() {
        "q" | "quit" => Some(RollMsg::Quit),
        "" | "r" | "roll" if interactive => Some(RollMsg::Begin),
        _ => None,
    }
}

fn spawn_input_reader(handle: ProgramHandle<RollMsg>, interactive: bool) -> io::Result<()> {
    thread::Builder::new()
        .name("dice-input".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if let Some(msg) = parse_command(&line, interactive)
                    && !handle.send(msg)
                {
                    return;
                }
            }
            if interactive {
                handle.send(RollMsg::Quit);
            }
        })?;
    Ok(())
}

/// Automatic rolling for `--count`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoPlay {
    remaining: u32,
    last_started: Option<SessionId>,
}

impl AutoPlay {
    #[must_use]
    pub fn new(total: u32) -> Self {
        Self {
            remaining: total,
            last_started: None,
        }
    }

    /// Message to send in reaction to `event`, if any.
    pub fn observe(&mut self, event: &RollEvent) -> Option<RollMsg> {
        match event {
            RollEvent::SessionStarted { session, .. } => {
                self.remaining = self.remaining.saturating_sub(1);
                self.last_started = Some(*session);
                None
            }
            RollEvent::TriggerChanged { enabled: true, .. } if self.remaining > 0 => {
                Some(RollMsg::Begin)
            }
            RollEvent::SessionEnded { session, .. }
                if self.remaining == 0 && self.last_started == Some(*session) =>
            {
                Some(RollMsg::Quit)
            }
            _ => None,
        }
    }
}

/// Renders events and drives automatic rolls.
pub struct Console<W: Write> {
    renderer: Renderer<W>,
    autoplay: Option<AutoPlay>,
    handle: Option<ProgramHandle<RollMsg>>,
}

impl<W: Write> Console<W> {
    pub fn new(renderer: Renderer<W>, count: Option<u32>) -> Self {
        Self {
            renderer,
            autoplay: count.map(AutoPlay::new),
            handle: None,
        }
    }

    /// Connect to the running program so automatic rolls can be sent.
    pub fn attach(&mut self, handle: ProgramHandle<RollMsg>) {
        self.handle = Some(handle);
    }
}

impl<W: Write> RollObserver for Console<W> {
    fn on_event(&mut self, event: &RollEvent) {
        if let Err(err) = self.renderer.render(event) {
            warn!(target: "dice.cli", error = %err, event = event.kind(), "cannot write output");
        }
        let next = self.autoplay.as_mut().and_then(|auto| auto.observe(event));
        if let (Some(msg), Some(handle)) = (next, &self.handle) {
            handle.send(msg);
        }
    }
}
