use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use txtprep::cli::{Cli, Invocation};
use txtprep::config;
use txtprep::docker::CancelToken;
use txtprep::pipeline;

fn main() -> Result<ExitCode> {
    // Diagnostics go to stderr; stdout carries the banners and container output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("txtprep=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    run(cli)
}

fn run(cli: Cli) -> Result<ExitCode> {
    let cwd = std::env::current_dir().context("failed to read the current directory")?;
    let cfg = config::load(&cwd)?;
    let Invocation {
        input,
        report,
        dry_run,
    } = cli.into_invocation(cfg, cwd);

    if dry_run {
        let plan = pipeline::plan(&input)?;
        println!("{}", plan.command.to_shell_line());
        return Ok(ExitCode::SUCCESS);
    }

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .context("failed to install Ctrl-C handler")?;

    // Unlocked handles: the runner thread logs to stderr while output is forwarded.
    let outcome = pipeline::run_extraction(&input, cancel, &mut io::stdout(), &mut io::stderr())?;

    if let Some(path) = report {
        let json = serde_json::to_string_pretty(&outcome)?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        tracing::info!(path = %path.display(), "wrote run report");
    }

    let code = u8::try_from(outcome.process_exit_code()).unwrap_or(1);
    Ok(ExitCode::from(code))
}
