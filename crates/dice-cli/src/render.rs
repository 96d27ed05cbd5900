#![forbid(unsafe_code)]

//! Terminal output for roll events.
//!
//! Text mode redraws the spinning rotation in place on one line and prints
//! the settled face as a pip diagram. JSON mode writes each [`RollEvent`] as
//! one line, for piping into other tools.

use std::io::{self, Write};

use clap::ValueEnum;
use dice_core::Face;
use dice_roll::{RollEvent, SessionOutcome, Trigger};

/// Stdout format for `dice roll` and `dice check-config`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

const BORDER: &str = "+-------+";

/// Pip grid cells, row-major, for each face.
const PIPS: [[bool; 9]; 6] = [
    [false, false, false, false, true, false, false, false, false],
    [true, false, false, false, false, false, false, false, true],
    [true, false, false, false, true, false, false, false, true],
    [true, false, true, false, false, false, true, false, true],
    [true, false, true, false, true, false, true, false, true],
    [true, false, true, true, false, true, true, false, true],
];

/// ASCII drawing of `face`, five lines, no trailing newline.
#[must_use]
pub fn draw_face(face: Face) -> String {
    let cells = PIPS[face.index()];
    let mut lines = vec![BORDER.to_string()];
    for row in cells.chunks(3) {
        let pips: Vec<&str> = row.iter().map(|&on| if on { "o" } else { " " }).collect();
        lines.push(format!("| {} |", pips.join(" ")));
    }
    lines.push(BORDER.to_string());
    lines.join("\n")
}

/// Writes events to `out` in the chosen format.
pub struct Renderer<W: Write> {
    out: W,
    format: OutputFormat,
    label: String,
    interactive: bool,
    mid_line: bool,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W, format: OutputFormat, interactive: bool) -> Self {
        Self {
            out,
            format,
            label: String::new(),
            interactive,
            mid_line: false,
        }
    }

    /// Show the resting die before the first roll.
    pub fn intro(&mut self, face: Face, trigger: &Trigger) -> io::Result<()> {
        self.label = trigger.label.clone();
        if self.format == OutputFormat::Json {
            return Ok(());
        }
        writeln!(self.out, "{}", draw_face(face))?;
        if self.interactive {
            self.prompt()?;
        }
        self.out.flush()
    }

    pub fn render(&mut self, event: &RollEvent) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.out, event)?;
                writeln!(self.out)?;
            }
            OutputFormat::Text => self.render_text(event)?,
        }
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn render_text(&mut self, event: &RollEvent) -> io::Result<()> {
        match event {
            RollEvent::SessionStarted { .. } => {}
            RollEvent::Rotated { rotation, .. } => {
                write!(
                    self.out,
                    "\r[{}] x={:>6}° y={:>6}°",
                    self.label, rotation.x, rotation.y
                )?;
                self.mid_line = true;
            }
            RollEvent::Committed { face, .. } => {
                self.end_line()?;
                writeln!(self.out, "{}", draw_face(*face))?;
                writeln!(self.out, "rolled {face}")?;
            }
            RollEvent::Reverted { face, error, .. } => {
                self.end_line()?;
                writeln!(self.out, "roll failed: {error}")?;
                writeln!(self.out, "{}", draw_face(*face))?;
                writeln!(self.out, "still showing {face}")?;
            }
            RollEvent::SessionEnded {
                session,
                outcome: SessionOutcome::Superseded,
                ..
            } => {
                self.end_line()?;
                writeln!(self.out, "roll {session} superseded")?;
            }
            RollEvent::SessionEnded { .. } => {}
            RollEvent::TriggerChanged { enabled, label, .. } => {
                self.label = label.clone();
                if *enabled && self.interactive {
                    self.end_line()?;
                    self.prompt()?;
                }
            }
        }
        Ok(())
    }

    fn prompt(&mut self) -> io::Result<()> {
        writeln!(self.out, "[{}] Enter or r to roll, q to quit", self.label)
    }

    fn end_line(&mut self) -> io::Result<()> {
        if self.mid_line {
            self.mid_line = false;
            writeln!(self.out)?;
        }
        Ok(())
    }
}
