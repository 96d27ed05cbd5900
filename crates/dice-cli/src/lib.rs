#![forbid(unsafe_code)]

pub mod check;
pub mod cli;
pub mod error;
pub mod logging;
pub mod render;
pub mod roll;
pub mod serve;

pub use cli::{Cli, Commands, run};
pub use error::{CliError, Result};
