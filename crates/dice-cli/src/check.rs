#![forbid(unsafe_code)]

//! `dice check-config`: validate a configuration file and print the
//! effective values, defaults filled in.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::Args;
use dice_roll::RollConfig;
use tracing::info;

use crate::error::Result;
use crate::render::OutputFormat;

#[derive(Debug, Clone, Args)]
pub struct CheckConfigArgs {
    /// Configuration file (TOML, or JSON with a `.json` extension).
    pub path: PathBuf,

    /// Format of the printed configuration.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Load and validate `path`, then write the effective configuration to `out`.
///
/// Text output is TOML so it can be saved back as a config file.
pub fn check_config(path: &Path, format: OutputFormat, out: &mut impl Write) -> Result<()> {
    let config = RollConfig::from_file(path)?.validated()?;
    info!(target: "dice.cli", path = %path.display(), "configuration is valid");
    match format {
        OutputFormat::Text => {
            let text = toml::to_string_pretty(&config).map_err(io::Error::other)?;
            out.write_all(text.as_bytes())?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &config).map_err(io::Error::from)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

pub fn run_check_config(args: CheckConfigArgs) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    check_config(&args.path, args.format, &mut out)?;
    out.flush()?;
    Ok(())
}
