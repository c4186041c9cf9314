//! Runlet - one-shot script invocation harness.
//!
//! Executes a user script against a JSON input value and emits the resolved
//! result as a single JSON line on stdout. Fatal faults print
//! `Error: <message>` on stderr and exit 1; a missing result is a valid
//! silent success.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Runlet - one-shot script invocation harness
#[derive(Parser)]
#[command(name = "runlet")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose diagnostics on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a script against a JSON input value
    Run(RunArgs),

    /// Parse a script without executing it
    Check(CheckArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Script file; omit to read a combined {"code","input"} payload from stdin
    script: Option<PathBuf>,

    /// Input JSON text; in file mode it is otherwise read from stdin,
    /// blank meaning {}
    #[arg(long)]
    input: Option<String>,
}

#[derive(Args)]
struct CheckArgs {
    /// Script file to validate
    script: PathBuf,
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let outcome = match cli.command {
        Commands::Run(args) => run(args),
        Commands::Check(args) => check(args),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "runlet=debug,runlet_harness=debug,runlet_script=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_env("RUNLET_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(args: RunArgs) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match args.script {
        Some(path) => {
            debug!(script = %path.display(), "file mode");
            let code = fs::read_to_string(&path)
                .with_context(|| format!("failed to read script '{}'", path.display()))?;
            let raw_input = match args.input {
                Some(text) => text,
                None => read_stdin()?,
            };
            runlet_harness::run_invocation(&code, &raw_input, &mut out)?;
        }
        None => {
            debug!("payload mode");
            let payload = read_stdin()?;
            runlet_harness::run_payload(&payload, &mut out)?;
        }
    }
    Ok(())
}

fn check(args: CheckArgs) -> Result<()> {
    let code = fs::read_to_string(&args.script)
        .with_context(|| format!("failed to read script '{}'", args.script.display()))?;
    runlet_harness::compile(&code)?;
    Ok(())
}

fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("failed to read stdin")?;
    Ok(buf)
}
