//! Asyncify CLI: report and rewrite blocking waits
//!
//! ## Usage
//!
//! ```bash
//! asyncify check unit.json              # Report blocking waits
//! asyncify fix unit.json --node 12      # Fix one site and its callers
//! asyncify fix unit.json --all -o out.cs
//! asyncify render unit.json             # Render the document as source
//! asyncify config                       # Show effective configuration
//! ```

use asyncify::syntax::{render, NodeId};
use asyncify::{Asyncify, AsyncifyConfig};
use asyncify_cli::{
    logging, render_check_json, render_check_report, render_fix_summary, CheckArgs, Cli,
    CliConfig, CliResult, ColorChoice, Commands, ConfigArgs, FixArgs, OutputFormat, RenderArgs,
    Verbosity, Workspace,
};
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;

/// Exit code when `check` finds blocking waits.
const FINDINGS: u8 = 1;
/// Exit code for usage, input and engine errors.
const FAILURE: u8 = 2;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(FAILURE)
        }
    }
}

fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();

    let config = build_config(&cli);
    logging::init(config.verbosity, config.log_format);

    match cli.command {
        Commands::Check(args) => run_check(&config, &args),
        Commands::Fix(args) => run_fix(&config, &args).map(|()| ExitCode::SUCCESS),
        Commands::Render(args) => run_render(&args).map(|()| ExitCode::SUCCESS),
        Commands::Config(args) => run_config(&config, &args).map(|()| ExitCode::SUCCESS),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = if cli.quiet {
        Verbosity::Quiet
    } else {
        match cli.verbose {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            _ => Verbosity::Debug,
        }
    };

    let color: ColorChoice = cli.color.clone().into();

    CliConfig::new()
        .with_verbosity(verbosity)
        .with_color(color)
        .with_log_format(cli.log_format.into())
        .with_config_path(cli.config.clone())
}

fn run_check(config: &CliConfig, args: &CheckArgs) -> CliResult<ExitCode> {
    let engine_config = config.engine_config()?;
    let workspace = Workspace::load(&args.document)?;
    let table = workspace.bind();
    let report = Asyncify::with_config(&table, engine_config).analyze(&workspace.tree);

    match OutputFormat::from(args.format) {
        OutputFormat::Json => println!("{}", render_check_json(&report)?),
        OutputFormat::Text => {
            if !config.verbosity.is_quiet() || report.has_findings() {
                let source = args.document.display().to_string();
                print!(
                    "{}",
                    render_check_report(&source, &report, config.color.should_color())
                );
            }
        }
    }

    Ok(if report.has_findings() {
        ExitCode::from(FINDINGS)
    } else {
        ExitCode::SUCCESS
    })
}

fn run_fix(config: &CliConfig, args: &FixArgs) -> CliResult<()> {
    let mut engine_config = config.engine_config()?;
    if args.no_propagate {
        engine_config = engine_config.with_propagation(false);
    }
    let mut workspace = Workspace::load(&args.document)?;

    let fixes = if args.all {
        workspace.fix_all(&engine_config)?
    } else {
        let node = args.node.ok_or_else(|| {
            asyncify_cli::CliError::invalid_argument("either --node or --all is required")
        })?;
        vec![workspace
            .fix_site(&engine_config, NodeId::new(node))?
            .summary()]
    };

    if !config.verbosity.is_quiet() {
        eprint!("{}", render_fix_summary(&fixes));
    }

    let text = match OutputFormat::from(args.format) {
        OutputFormat::Text => render(&workspace.tree),
        OutputFormat::Json => workspace.to_json()? + "\n",
    };
    emit(&text, args.output.as_deref())
}

fn run_render(args: &RenderArgs) -> CliResult<()> {
    let workspace = Workspace::load(&args.document)?;
    emit(&render(&workspace.tree), None)
}

fn run_config(config: &CliConfig, args: &ConfigArgs) -> CliResult<()> {
    let engine_config = if args.defaults {
        AsyncifyConfig::default()
    } else {
        config.engine_config()?
    };
    print!("{}", engine_config.to_yaml()?);
    Ok(())
}

fn emit(text: &str, output: Option<&Path>) -> CliResult<()> {
    match output {
        Some(path) => std::fs::write(path, text)?,
        None => print!("{text}"),
    }
    Ok(())
}
