use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Where log lines go.
#[derive(Debug, Clone)]
pub enum LogTarget {
    Stderr,
    /// Append to a file. The form surface uses this so output never lands on
    /// the alternate screen.
    File(PathBuf),
}

fn env_filter(verbose: bool) -> EnvFilter {
    let fallback = if verbose {
        "workout_logger=debug,info"
    } else {
        "workout_logger=info"
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

pub fn init_logger(verbose: bool, target: LogTarget) -> Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter(verbose));
    let fmt = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact();

    match target {
        LogTarget::Stderr => registry
            .with(fmt.with_writer(std::io::stderr))
            .try_init()
            .map_err(|err| anyhow!("failed to install logger: {err}")),
        LogTarget::File(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create log directory {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            registry
                .with(fmt.with_ansi(false).with_writer(Mutex::new(file)))
                .try_init()
                .map_err(|err| anyhow!("failed to install logger: {err}"))
        }
    }
}
