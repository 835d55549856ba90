//! Binary entry point: parse the command line, install logging, open the
//! store, then run either the terminal form or the REST server.
use anyhow::Result;
use chrono::Local;
use clap::Parser;
use tracing::info;

use workout_logger::api::Server;
use workout_logger::config::{Cli, Command};
use workout_logger::db::data_dir;
use workout_logger::logging::{init_logger, LogTarget};
use workout_logger::{run_app, App, Database};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command();

    let target = match command {
        Command::Tui => LogTarget::File(data_dir()?.join("workout-logger.log")),
        Command::Serve { .. } => LogTarget::Stderr,
    };
    init_logger(cli.verbose, target)?;

    let database = Database::open(cli.db_path()?)?;
    info!(path = %database.path().display(), "database ready");

    match command {
        Command::Tui => {
            let today = Local::now().date_naive();
            let mut app = App::new(database.connect()?, today)?;
            run_app(&mut app)
        }
        Command::Serve { addr } => Server::bind(&addr, database)?.run(),
    }
}
