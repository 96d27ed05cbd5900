use clap::{Parser, Subcommand};

use crate::check::{CheckConfigArgs, run_check_config};
use crate::error::Result;
use crate::logging::{self, LogFormat};
use crate::roll::{RollArgs, run_roll};
use crate::serve::{ServeArgs, run_serve};

#[derive(Debug, Parser)]
#[command(
    name = "dice",
    about = "Roll a die whose outcome comes from a remote provider",
    version
)]
pub struct Cli {
    /// Log filter directives (overrides RUST_LOG).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log line format on stderr.
    #[arg(long, global = true, value_enum, default_value_t)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Roll interactively, or `--count` times.
    Roll(RollArgs),

    /// Run a reference outcome provider.
    Serve(ServeArgs),

    /// Validate a configuration file and print the effective values.
    #[command(name = "check-config")]
    CheckConfig(CheckConfigArgs),
}

pub fn run(cli: Cli) -> Result<()> {
    logging::init(cli.log_level.as_deref(), cli.log_format);
    match cli.command {
        Commands::Roll(args) => run_roll(args),
        Commands::Serve(args) => run_serve(args),
        Commands::CheckConfig(args) => run_check_config(args),
    }
}
