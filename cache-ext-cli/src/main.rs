// SPDX-License-Identifier: MIT OR Apache-2.0
//! Observer CLI for the adaptive page-cache eviction engine.
//!
//! Walks a watch directory to seed the inode watchlist, attaches to a
//! cgroup path (validated but not otherwise used here — attaching the real
//! kernel hook surface is a separate concern this observer doesn't
//! implement), and drives the engine from filesystem activity until
//! `SIGINT`/`SIGTERM`.

mod sink;
mod watch;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cache_ext_core::{CacheExtError, CacheExtResult, CompatibilityMode};
use cache_ext_engine::{Engine, EngineConfig};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cache-ext")]
#[command(author, version, about = "Adaptive page-cache eviction observer", long_about = None)]
struct Cli {
    /// Directory to watch; its contents seed the inode watchlist.
    #[arg(long)]
    watch_dir: PathBuf,

    /// Cgroup path this attachment is scoped to (validated at startup).
    #[arg(long)]
    cgroup_path: PathBuf,

    /// Verbose output, including per-event traces and metric snapshots.
    #[arg(short, long)]
    verbose: bool,

    /// Emit policy-switch records in the minimum-compatibility wire
    /// format, omitting working-set fields.
    #[arg(long)]
    min_compat: bool,
}

fn install_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cache_ext_engine={default_level},cache_ext_cli={default_level}")));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn validate_startup(cli: &Cli) -> CacheExtResult<PathBuf> {
    let canonical = cli.watch_dir.canonicalize().map_err(|_| {
        CacheExtError::WatchDirNotFound(cli.watch_dir.display().to_string())
    })?;
    cache_ext_core::watchlist::validate_watch_dir_path(&canonical.to_string_lossy())?;

    std::fs::File::open(&cli.cgroup_path).map_err(|source| CacheExtError::CgroupOpenFailed {
        path: cli.cgroup_path.display().to_string(),
        source,
    })?;

    Ok(canonical)
}

async fn run(cli: Cli) -> CacheExtResult<()> {
    let watch_dir = validate_startup(&cli)?;
    info!(watch_dir = %watch_dir.display(), cgroup = %cli.cgroup_path.display(), "starting observer");

    let watchlist = watch::scan_watchlist(&watch_dir);
    info!(tracked_inodes = watchlist.len(), "watchlist seeded");

    let compat = if cli.min_compat {
        CompatibilityMode::MinimumCompatible
    } else {
        CompatibilityMode::Full
    };
    let (event_sink, switch_events) = sink::terminal_sink();
    let engine = Engine::with_sink(EngineConfig::default(), watchlist, Box::new(event_sink), compat);

    let exit = Arc::new(AtomicBool::new(false));
    let signal_exit = Arc::clone(&exit);
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        signal_exit.store(true, Ordering::Relaxed);
    });

    let printer = tokio::spawn(sink::print_switch_events(switch_events));

    watch::run(engine, watch_dir, exit).await?;
    let _ = printer.await;
    Ok(())
}

async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(err) => {
            error!(%err, "failed to install SIGTERM handler");
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    install_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("cache-ext: {err}");
            ExitCode::FAILURE
        }
    }
}
