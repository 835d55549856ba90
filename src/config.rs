use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::db::default_db_path;

pub const DEFAULT_ADDR: &str = "127.0.0.1:5000";

#[derive(Debug, Parser)]
#[command(name = "workout-logger")]
#[command(about = "Record workouts from the terminal or over a JSON API")]
pub struct Cli {
    /// SQLite file holding the workout log
    #[arg(long, global = true, env = "WORKOUT_LOGGER_DB")]
    pub db: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Interactive form for logging a day's workouts (default)
    Tui,
    /// Serve the REST API
    Serve {
        /// Address to listen on
        #[arg(long, env = "WORKOUT_LOGGER_ADDR", default_value = DEFAULT_ADDR)]
        addr: String,
    },
}

impl Cli {
    /// Database file to open: `--db`, then `WORKOUT_LOGGER_DB`, then the
    /// per-user default.
    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.db {
            Some(path) => Ok(path.clone()),
            None => default_db_path(),
        }
    }

    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Tui)
    }
}
