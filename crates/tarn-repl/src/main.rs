//! tarn CLI entry point.
//!
//! Usage:
//!   tarn                       # Read stdin, or open the console on a terminal
//!   tarn init.lua [ARGS...]    # Run a startup script
//!   tarn -e 'print(1)'         # Run a snippet
//!   tarn -l fiber -i           # Preload a module and open the console

use std::process::ExitCode;

use anyhow::{Context, Result};
use tarn_host::{metadata, HostConfig, Reactor, ScriptingHost};
use tarn_repl::cli::{self, Command, Invocation};
use tarn_repl::console;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> ExitCode {
    // Initialize tracing (respects RUST_LOG env var); stdout belongs to scripts
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    match cli::parse(std::env::args().skip(1))? {
        Command::Help => {
            print!("{}", cli::usage());
            Ok(ExitCode::SUCCESS)
        }
        Command::Version => {
            println!(
                "{} {} ({})",
                metadata::PACKAGE,
                metadata::version(),
                metadata::build_date()
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::BuildInfo => {
            let info = serde_json::to_string_pretty(&metadata::build_info())
                .context("Failed to serialize build info")?;
            println!("{info}");
            Ok(ExitCode::SUCCESS)
        }
        Command::Run(invocation) => run_task(invocation),
    }
}

/// Run the startup task and turn its outcome into an exit status.
fn run_task(invocation: Invocation) -> Result<ExitCode> {
    let Invocation { task, argv } = invocation;

    let reactor = Reactor::new().context("Failed to create reactor")?;
    let host = ScriptingHost::init(HostConfig::process().with_argv(argv));

    let lua = host
        .lua()
        .map_err(|e| anyhow::anyhow!("Scripting host is not ready: {e}"))?;
    console::install(&lua)
        .map_err(|e| anyhow::anyhow!("Failed to install console: {e}"))?;
    drop(lua);

    let outcome = host.run_script(&reactor, task);
    host.teardown();

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(diag) => {
            tracing::debug!(kind = %diag.kind, "startup script failed");
            eprintln!("error: {diag}");
            Ok(ExitCode::FAILURE)
        }
    }
}
