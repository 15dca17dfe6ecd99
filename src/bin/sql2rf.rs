//! sql2rf - extract Researcher Format CSV files from a snapshot2sql store.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use iams2rf::extract::extract;
use iams2rf::prompt::prompt_request;
use iams2rf::{OutputFile, RequestSpec};

/// IAMS data extraction for Researcher Format.
#[derive(Debug, Parser)]
#[command(
    name = "sql2rf",
    version,
    about = "Search a snapshot2sql database and convert matching records to Researcher Format"
)]
struct Cli {
    /// Path to the SQL database created by snapshot2sql.
    #[arg(short = 'd', long = "database")]
    database: PathBuf,

    /// Request file: JSON (.json) or a message with coded parameters.
    #[arg(short = 'r', long = "request", conflicts_with = "all")]
    request: Option<PathBuf>,

    /// Folder for the output files.
    #[arg(short = 'o', long = "output", default_value = ".")]
    output: PathBuf,

    /// Export every record to every file without prompting.
    #[arg(long)]
    all: bool,

    /// Show debug output.
    #[arg(long)]
    debug: bool,
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        tracing_subscriber::EnvFilter::new("iams2rf=debug,sql2rf=debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "iams2rf=info,sql2rf=info".into())
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn request(cli: &Cli) -> Result<RequestSpec> {
    if cli.all {
        return Ok(RequestSpec::export_all());
    }
    match &cli.request {
        Some(path) => RequestSpec::from_path(path)
            .with_context(|| format!("reading request {}", path.display())),
        None => Ok(prompt_request()?),
    }
}

fn run(cli: &Cli) -> Result<()> {
    let request = request(cli)?;
    let summary = extract(&cli.database, &request, &cli.output)
        .with_context(|| format!("extracting from {}", cli.database.display()))?;
    println!("{} matching records", summary.matched);
    for file in OutputFile::ALL {
        if request.files.contains(&file) {
            println!("{}: {} rows", file.file_name(), summary.rows_in(file));
        }
    }
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
