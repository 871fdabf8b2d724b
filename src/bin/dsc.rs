//! DSC engine CLI
//!
//! Runs scripted scenarios against an in-memory deployment of the engine.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

use dsc_engine::cli::{run_scenario, OutputFormat, OutputFormatter, Scenario};
use dsc_engine::core::config::{EngineConfig, EngineParams};

/// DSC engine CLI - over-collateralized synthetic dollar
#[derive(Parser)]
#[command(name = "dsc")]
#[command(version = dsc_engine::VERSION)]
#[command(about = "Run and inspect DSC engine scenarios", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output format: text, json or json-pretty
    #[arg(short, long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario and print the report
    Run {
        /// Scenario JSON file
        #[arg(env = "DSC_SCENARIO")]
        scenario: PathBuf,

        /// Exit with an error if any step fails
        #[arg(long)]
        strict: bool,
    },

    /// Check a scenario file without running it
    Validate {
        /// Scenario JSON file
        #[arg(env = "DSC_SCENARIO")]
        scenario: PathBuf,
    },

    /// Show risk parameters (defaults, or those of an engine config file)
    Params {
        /// Engine config JSON file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

// ═══════════════════════════════════════════════════════════════════════════════
// MAIN
// ═══════════════════════════════════════════════════════════════════════════════

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut output = OutputFormatter::new(cli.format);
    if cli.no_color {
        output = output.without_color();
    }

    if let Err(e) = run_command(&cli, &output) {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}

fn run_command(cli: &Cli, output: &OutputFormatter) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Run { scenario, strict } => cmd_run(scenario, *strict, output),
        Commands::Validate { scenario } => cmd_validate(scenario, output),
        Commands::Params { config } => cmd_params(config.as_deref(), output),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMMAND HANDLERS
// ═══════════════════════════════════════════════════════════════════════════════

fn cmd_run(path: &Path, strict: bool, output: &OutputFormatter) -> anyhow::Result<()> {
    let scenario = Scenario::load(path)
        .with_context(|| format!("loading scenario {}", path.display()))?;
    let report = run_scenario(&scenario).context("running scenario")?;
    output.report(&report);

    let failures = report.failures();
    if strict && failures > 0 {
        anyhow::bail!("{} of {} steps failed", failures, report.steps.len());
    }
    Ok(())
}

fn cmd_validate(path: &Path, output: &OutputFormatter) -> anyhow::Result<()> {
    let scenario = Scenario::load(path)
        .with_context(|| format!("loading scenario {}", path.display()))?;
    scenario.validate().context("invalid scenario")?;
    output.success(&format!(
        "{} is valid: {} assets, {} users, {} steps",
        path.display(),
        scenario.assets.len(),
        scenario.users().len(),
        scenario.steps.len()
    ));
    Ok(())
}

fn cmd_params(config: Option<&Path>, output: &OutputFormatter) -> anyhow::Result<()> {
    let params = match config {
        Some(path) => {
            let config = EngineConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?;
            config.validate().context("invalid config")?;
            config.params
        }
        None => EngineParams::default(),
    };
    output.params(&params);
    Ok(())
}
