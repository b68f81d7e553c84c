//! flatdb command-line interface
//!
//! Runs exactly one statement against the current database and prints the
//! result on standard output.
//!
//! ```bash
//! flatdb "CREATE TABLE users (id, name)"
//! flatdb "INSERT INTO users VALUES (1, alice)"
//! flatdb "SELECT * FROM users"
//! flatdb --data-dir /srv/flatdb --database shop "DESC orders"
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use flatdb::{Config, Database, Error};

/// Minimal flat-file relational store
#[derive(Parser, Debug)]
#[command(name = "flatdb", version, about)]
struct Args {
    /// Statement to run
    statement: Option<String>,

    /// Directory holding the databases
    #[arg(long, value_name = "DIR", env = "FLATDB_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Name of the current database
    #[arg(short = 'd', long, env = "FLATDB_DATABASE")]
    database: Option<String>,

    /// Extension of table files
    #[arg(long)]
    extension: Option<String>,

    /// Configuration file path (TOML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// List the tables of the current database and exit
    #[arg(long)]
    list_tables: bool,

    /// Enable verbose output
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose);

    let config = load_config(&args)?;
    debug!(path = %config.database_path().display(), "opening database");
    let db = Database::open(&config).context("failed to open database")?;

    if args.list_tables {
        for table in db.list_tables()? {
            println!("- {table}");
        }
        return Ok(());
    }

    let Some(statement) = &args.statement else {
        return Ok(());
    };

    match db.execute(statement) {
        Ok(response) => print!("{response}"),
        // Statement-level failures are answered, not fatal.
        Err(e) if is_reported(&e) => println!("{e}"),
        Err(e) => return Err(e).context("statement failed"),
    }

    Ok(())
}

fn is_reported(err: &Error) -> bool {
    !matches!(err, Error::Storage(_))
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("flatdb=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("flatdb=error"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    if let Some(data_dir) = &args.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(database) = &args.database {
        config.database = database.clone();
    }
    if let Some(extension) = &args.extension {
        config.extension = extension.clone();
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_override_config() {
        let args = Args::parse_from([
            "flatdb",
            "--data-dir",
            "/tmp/x",
            "--database",
            "shop",
            "SELECT * FROM t",
        ]);

        let config = load_config(&args).unwrap();

        assert_eq!(config.database_path(), PathBuf::from("/tmp/x/shop"));
        assert_eq!(config.extension, "csv");
        assert_eq!(args.statement.as_deref(), Some("SELECT * FROM t"));
    }

    #[test]
    fn test_storage_errors_are_fatal() {
        assert!(is_reported(&Error::TableNotFound("t".into())));
        let io = std::io::Error::other("boom");
        assert!(!is_reported(&Error::Storage(flatdb::StorageError::Io {
            path: PathBuf::from("t.csv"),
            source: io,
        })));
    }
}
