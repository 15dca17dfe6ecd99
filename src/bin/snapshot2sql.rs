//! snapshot2sql - build a SQLite store from the IAMS Published Snapshot.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use iams2rf::{ingest, IngestConfig, ParserConfig, SourceEncoding};

/// IAMS data preparation for Researcher Format.
#[derive(Debug, Parser)]
#[command(name = "snapshot2sql", version, about = "Convert the IAMS Published Snapshot to an SQL database")]
struct Cli {
    /// Path to the IAMS Published Snapshot.
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Path of the SQL database to create.
    #[arg(short = 'd', long = "database")]
    database: PathBuf,

    /// Replace an existing database.
    #[arg(long)]
    overwrite: bool,

    /// Character encoding of the snapshot when it has no byte-order mark.
    #[arg(long, default_value = "utf-16le")]
    encoding: SourceEncoding,

    /// Show debug output.
    #[arg(long)]
    debug: bool,
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        tracing_subscriber::EnvFilter::new("iams2rf=debug,snapshot2sql=debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "iams2rf=info,snapshot2sql=info".into())
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let config = IngestConfig::default()
        .with_parser(ParserConfig::default().with_encoding(cli.encoding))
        .with_overwrite(cli.overwrite);
    tracing::info!(
        snapshot = %cli.input.display(),
        database = %cli.database.display(),
        "starting conversion"
    );
    let summary = ingest(&cli.input, &cli.database, &config).with_context(|| {
        format!(
            "converting {} to {}",
            cli.input.display(),
            cli.database.display()
        )
    })?;
    println!("{summary}");
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            let code = e
                .downcast_ref::<iams2rf::Error>()
                .map_or(1, |e| e.kind().exit_code());
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        },
    }
}
