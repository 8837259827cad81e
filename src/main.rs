//! Binary entry point: parse the command line, bring up logging and the
//! database, load every manager, then drive the Ratatui event loop until the
//! user exits.
use anyhow::Context;
use clap::Parser;
use library_manager::config::{init_logging, Cli};
use library_manager::{open_database, run_app, App, Library};
use tracing::info;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let database = cli.database_path()?;
    init_logging(&cli.log_path(&database), &cli.log_level)?;
    info!(path = %database.display(), "starting library manager");

    let conn = open_database(&database)?;
    let library = Library::open(conn).context("failed to load library")?;

    let mut app = App::new(library);
    run_app(&mut app)
}
