//! Asyncify CLI library
//!
//! Command-line host for the asyncify engine: loads a JSON workspace
//! document, reports blocking waits, applies fixes and renders source.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

mod commands;
mod config;
mod error;
pub mod logging;
mod output;
pub mod workspace;

pub use commands::{
    CheckArgs, Cli, ColorArg, Commands, ConfigArgs, FixArgs, FormatArg, LogFormatArg, RenderArgs,
};
pub use config::{CliConfig, ColorChoice, LogFormat, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{render_check_json, render_check_report, render_fix_summary, OutputFormat};
pub use workspace::{Workspace, WorkspaceDocument};
