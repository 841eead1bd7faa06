/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::{error, info, warn};

use alarmd::config::{ConfigOverrides, ServiceConfig};
use alarmd::{AlarmStore, AlarmWorker, RequestIntake, StdoutSink};

// ── CLI argument definition ───────────────────────────────────────────────────

/// alarmd – interactive alarm scheduler.
///
/// Reads `<seconds> <message>` lines from stdin and prints
/// `(<seconds>) <message>` once each alarm is due.
///
/// Example:
///   alarmd --config alarmd.yaml --debug-dump
#[derive(Debug, Parser)]
#[command(
    name = "alarmd",
    about = "alarmd – interactive alarm scheduler",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML service configuration file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Longest accepted alarm message in bytes (overrides the config file).
    #[arg(short = 'm', long = "max-message-bytes")]
    max_message_bytes: Option<usize>,

    /// Log the pending queue after every insert (needs RUST_LOG=debug).
    #[arg(short = 'd', long = "debug-dump", default_value_t = false)]
    debug_dump: bool,

    /// Do not print the interactive prompt.
    #[arg(long = "no-prompt", default_value_t = false)]
    no_prompt: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            max_message_bytes: self.max_message_bytes,
            debug_dump: self.debug_dump,
            no_prompt: self.no_prompt,
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Initialise structured logging on stderr; stdout carries alarm output.
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // Exit explicitly: the runtime would otherwise wait on the blocking
    // stdin reader thread.
    match run(cli).await {
        Ok(()) => process::exit(0),
        Err(e) => {
            error!("{:#}", e);
            process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    // ── Load configuration ────────────────────────────────────────────────────
    let base = match &cli.config {
        Some(path) => ServiceConfig::load_from_file(path)?,
        None => {
            info!("No configuration file provided, using defaults");
            ServiceConfig::default()
        }
    };
    let config = base.apply_overrides(&cli.overrides())?;

    info!(
        max_message_bytes = config.max_message_bytes,
        debug_dump        = config.debug_dump,
        prompt            = !config.prompt.is_empty(),
        "alarmd starting up"
    );

    // ── Start the worker ──────────────────────────────────────────────────────
    let store = Arc::new(AlarmStore::with_debug_dump(config.debug_dump));
    let worker = AlarmWorker::new(Arc::clone(&store), StdoutSink)
        .spawn()
        .context("Failed to spawn alarm worker thread")?;
    let intake = RequestIntake::new(Arc::clone(&store), config.max_message_bytes);

    // ── Intake loop ───────────────────────────────────────────────────────────
    let lines = BufReader::new(tokio::io::stdin()).lines();
    let interrupted = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for interrupt");
        }
    };
    serve(lines, &intake, &config.prompt, interrupted).await?;

    // ── Shutdown ──────────────────────────────────────────────────────────────
    store.close();
    let stats = tokio::task::spawn_blocking(move || worker.join())
        .await
        .context("Failed to join alarm worker")?
        .map_err(|_| anyhow!("alarm worker thread panicked"))?;

    info!(
        fired = stats.fired,
        preemptions = stats.preemptions,
        unfired = stats.unfired,
        "alarmd stopped"
    );
    Ok(())
}

/// Feeds request lines to `intake` until end of input or `shutdown` resolves.
///
/// `shutdown` is polled across iterations, so a signal raised while a
/// request is being handled still ends the loop.
async fn serve<R, S>(
    mut lines: Lines<R>,
    intake: &RequestIntake,
    prompt: &str,
    shutdown: S,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    loop {
        print_prompt(prompt);

        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read request from stdin")?,
            () = &mut shutdown => {
                info!("Interrupted, shutting down");
                None
            }
        };
        let Some(line) = line else {
            return Ok(());
        };

        // Blank lines are ignored silently, like an empty shell command.
        if line.trim().is_empty() {
            continue;
        }

        if let Err(e) = intake.submit_line(&line) {
            eprintln!("Bad command");
            warn!(reason = e.kind(), error = %e, "request rejected");
        }
    }
}

fn print_prompt(prompt: &str) {
    if prompt.is_empty() {
        return;
    }
    let mut out = std::io::stdout().lock();
    if let Err(e) = write!(out, "{prompt}").and_then(|()| out.flush()) {
        warn!(error = %e, "failed to write prompt");
    }
}
