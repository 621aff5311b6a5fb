//! CLI command definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Asyncify: find and rewrite blocking waits on asynchronous routines
#[derive(Parser, Debug)]
#[command(name = "asyncify")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Log line format
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormatArg,

    /// Engine configuration file (YAML)
    #[arg(short, long, global = true, env = "ASYNCIFY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Report blocking waits (exit code 1 when any are found)
    Check(CheckArgs),

    /// Rewrite blocking waits into awaits
    Fix(FixArgs),

    /// Render a workspace document as source
    Render(RenderArgs),

    /// Show the effective engine configuration
    Config(ConfigArgs),
}

/// Arguments for the check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Workspace document (JSON)
    pub document: PathBuf,

    /// Report format
    #[arg(short, long, default_value = "text")]
    pub format: FormatArg,
}

/// Arguments for the fix command
#[derive(Args, Debug)]
#[command(group(clap::ArgGroup::new("target").required(true).args(["node", "all"])))]
pub struct FixArgs {
    /// Workspace document (JSON)
    pub document: PathBuf,

    /// Node id of the site to fix, as printed by `check`
    #[arg(short, long)]
    pub node: Option<u32>,

    /// Fix every reported site
    #[arg(short, long)]
    pub all: bool,

    /// Do not propagate to callers
    #[arg(long)]
    pub no_propagate: bool,

    /// Write the result here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// `text` renders source; `json` writes the rewritten document
    #[arg(short, long, default_value = "text")]
    pub format: FormatArg,
}

/// Arguments for the render command
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Workspace document (JSON)
    pub document: PathBuf,
}

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Print the built-in defaults instead of the effective configuration
    #[arg(long)]
    pub defaults: bool,
}

/// Output format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum FormatArg {
    /// Human-readable text
    #[default]
    Text,
    /// JSON
    Json,
}

impl From<FormatArg> for crate::output::OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
        }
    }
}

/// Color argument
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

/// Log format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormatArg {
    /// Human-readable lines
    #[default]
    Text,
    /// JSON lines
    Json,
}

impl From<LogFormatArg> for crate::config::LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => Self::Text,
            LogFormatArg::Json => Self::Json,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_check() {
        let cli = Cli::try_parse_from(["asyncify", "check", "doc.json", "--format", "json"]).unwrap();
        match cli.command {
            Commands::Check(args) => {
                assert_eq!(args.document, PathBuf::from("doc.json"));
                assert!(matches!(args.format, FormatArg::Json));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_fix_node() {
        let cli = Cli::try_parse_from(["asyncify", "-vv", "fix", "doc.json", "--node", "12"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Fix(args) => {
                assert_eq!(args.node, Some(12));
                assert!(!args.all);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_fix_requires_target() {
        assert!(Cli::try_parse_from(["asyncify", "fix", "doc.json"]).is_err());
        assert!(Cli::try_parse_from(["asyncify", "fix", "doc.json", "--all", "--node", "1"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["asyncify", "config", "--quiet", "--log-format", "json"]).unwrap();
        assert!(cli.quiet);
        assert!(matches!(cli.log_format, LogFormatArg::Json));
    }
}
