//! TrustIE - edit the Internet Explorer zone map and the Java exception site list.
//!
//! On Windows the zone map is the registry; elsewhere (or with `--database`)
//! it is kept in an SQLite database with the same layout.

mod cli;
mod commands;
mod config;

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use directories::ProjectDirs;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use trustie_storage::SqliteTree;

use cli::{Cli, Command};
use config::AppConfig;

/// Get the logs directory path.
fn logs_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "trustie", "TrustIE").map(|dirs| dirs.data_dir().join("logs"))
}

/// Initialize logging with file rotation.
fn init_logging(cli: &Cli) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_level = if cli.debug { "debug" } else { &cli.log_level };

    // `trustie` also matches the `trustie_core` and `trustie_storage` targets
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("trustie={},warn", log_level)));

    if let Some(log_dir) = logs_dir() {
        if std::fs::create_dir_all(&log_dir).is_ok() {
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .max_log_files(5)
                .filename_prefix("trustie")
                .filename_suffix("log")
                .build(&log_dir)
                .ok();

            if let Some(appender) = file_appender {
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);

                // stdout carries command output, so the console layer uses stderr
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().with_writer(io::stderr))
                    .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                    .init();

                tracing::debug!("Logging to {:?}", log_dir);
                return Some(guard);
            }
        }
    }

    // Fallback: console logging only
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();

    tracing::warn!("File logging unavailable, using console only");
    None
}

fn main() {
    let cli = Cli::parse();
    let _log_guard = init_logging(&cli);

    tracing::debug!("TrustIE v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = dispatch(cli) {
        tracing::debug!("Command failed: {:?}", e);
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn dispatch(cli: Cli) -> Result<()> {
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    if cli.database.is_some() {
        config.database = cli.database;
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();

    // Parsing touches no store
    if let Command::Parse(args) = cli.command {
        commands::parse::parse(args, &mut out)?;
        return flush(&mut out);
    }

    match config.database.clone() {
        Some(path) => {
            let tree = SqliteTree::open(&path)
                .with_context(|| format!("failed to open database {}", path.display()))?;
            commands::run(cli.command, &config, tree, &mut out)?;
        }
        None => run_native(cli.command, &config, &mut out)?,
    }

    flush(&mut out)
}

#[cfg(target_os = "windows")]
fn run_native(command: Command, config: &AppConfig, out: &mut dyn Write) -> Result<()> {
    commands::run(command, config, trustie_core::RegistryTree, out)
}

#[cfg(not(target_os = "windows"))]
fn run_native(command: Command, config: &AppConfig, out: &mut dyn Write) -> Result<()> {
    let tree = SqliteTree::new().context("failed to open the zone map database")?;
    commands::run(command, config, tree, out)
}

fn flush(out: &mut dyn Write) -> Result<()> {
    out.flush().context("failed to write output")
}
