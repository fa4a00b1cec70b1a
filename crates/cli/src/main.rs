//! kube-e2e CLI - Main Entry Point
//!
//! Drives the kube-e2e assertions from shell-based test scripts. Exits 0 when
//! the assertion holds, 1 when it fails and 2 on usage or setup errors.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use kube_e2e::{AssertConfig, Asserter};

mod commands;
mod output;

use commands::{apply, check, name};
use output::print_error;

/// kube-e2e - polling assertions over kubectl output
#[derive(Parser)]
#[command(name = "kube-e2e")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// YAML file with assertion defaults
    #[arg(long, global = true, env = "KUBE_E2E_CONFIG")]
    config: Option<PathBuf>,

    /// Polling deadline in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Pause between poll cycles in milliseconds
    #[arg(long, global = true)]
    interval_ms: Option<u64>,

    /// kubectl program (split on spaces like any fragment)
    #[arg(long, global = true)]
    kubectl: Option<String>,

    /// Output format
    #[arg(long, default_value = "plain", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll a command until it exits successfully
    Run(check::CommandArgs),

    /// Run a command once and require it to fail
    Fail(check::CommandArgs),

    /// Poll until a command succeeds with all substrings in its output
    Contains(check::ContainsArgs),

    /// Poll until a command succeeds with none of the substrings in its output
    NotContains(check::ContainsArgs),

    /// Poll until a command fails with all substrings in its output
    ErrorContains(check::ContainsArgs),

    /// Check a resource field rendered through `kubectl get -o template`
    Field(check::FieldArgs),

    /// Apply a manifest, optionally as another user
    Apply(apply::ApplyArgs),

    /// Print a unique e2e resource name
    Name(name::NameArgs),
}

impl Cli {
    /// File (or defaults), then KUBE_E2E_* variables, then flags
    fn assert_config(&self) -> Result<AssertConfig> {
        let mut config = match &self.config {
            Some(path) => AssertConfig::from_yaml_file(path)?,
            None => AssertConfig::default(),
        };
        config.apply_env()?;
        if let Some(secs) = self.timeout {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = self.interval_ms {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(kubectl) = &self.kubectl {
            config.kubectl = kubectl.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            print_error(&format!("{e:#}"));
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<bool> {
    let k = Asserter::new(cli.assert_config()?);
    let format = cli.format;

    let report = match cli.command {
        Commands::Run(args) => check::run(&k, args)?,
        Commands::Fail(args) => check::fail(&k, args)?,
        Commands::Contains(args) => check::contains(&k, args)?,
        Commands::NotContains(args) => check::not_contains(&k, args)?,
        Commands::ErrorContains(args) => check::error_contains(&k, args)?,
        Commands::Field(args) => check::field(&k, args)?,
        Commands::Apply(args) => apply::execute(&k, args)?,
        Commands::Name(args) => {
            name::execute(args);
            return Ok(true);
        }
    };

    commands::print_report(&report, format);
    Ok(report.passed)
}
