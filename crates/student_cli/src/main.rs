//! Command-line entry point for the student store.
//!
//! # Responsibility
//! - Load config, start logging and open the configured store.
//! - Map one subcommand onto one `StudentService` operation.
//!
//! # Invariants
//! - Without a database path the store is in-memory and seeded at startup.
//! - Errors go to stderr with a kind-specific exit code.

mod args;
mod commands;

use args::Cli;
use clap::Parser;
use commands::{execute, CliResult};
use log::info;
use student_core::db::{open_db, open_db_in_memory};
use student_core::{
    init_from_config, seed_default_students, CoreConfig, SqliteStudentRepository, StudentService,
};

fn main() {
    let cli = Cli::parse();
    match run(cli) {
        Ok(output) => println!("{output}"),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.exit_code());
        }
    }
}

fn run(cli: Cli) -> CliResult<String> {
    let mut config = CoreConfig::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.db_path = Some(db);
    }
    init_from_config(&config)?;
    info!(
        "event=cli_start module=cli status=ok version={} persistent={}",
        student_core::core_version(),
        config.db_path.is_some()
    );

    let conn = match &config.db_path {
        Some(path) => open_db(path)?,
        None => open_db_in_memory()?,
    };
    let service = StudentService::new(SqliteStudentRepository::new(&conn));
    if config.db_path.is_none() {
        seed_default_students(&service)?;
    }

    execute(&service, cli.command)
}
