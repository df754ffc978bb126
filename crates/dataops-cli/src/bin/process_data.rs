//! `process-data`: stamp a CSV file with `processed_at`, sort it and write
//! ZSTD Parquet.

use std::{io, path::PathBuf};

use clap::Parser;
use dataops::{DEFAULT_INPUT, DEFAULT_PARQUET_OUTPUT, process_data};
use dataops_cli::{
    Outcome,
    error::{CliResult, PipelineSnafu},
    logging::init_logging,
    render,
};
use snafu::prelude::*;

#[derive(Debug, Parser)]
#[command(name = "process-data", version, about)]
struct Args {
    /// Input CSV file
    #[arg(default_value = DEFAULT_INPUT)]
    input: PathBuf,

    /// Output Parquet file
    #[arg(default_value = DEFAULT_PARQUET_OUTPUT)]
    output: PathBuf,

    /// Run the default quality checklist first; stop on failures
    #[arg(long, default_value_t = false)]
    validate: bool,
}

async fn run(args: Args) -> CliResult<Outcome> {
    if args.validate {
        let report = dataops_cli::validate_input(&args.input)?;
        render::write_report(&report, false, &mut io::stdout().lock())?;
        if !report.failed.is_empty() {
            return Ok(Outcome::ChecksFailed);
        }
    }

    let rows = process_data(&args.input, &args.output)
        .await
        .context(PipelineSnafu)?;
    println!("Processed {rows} rows -> {}", args.output.display());
    Ok(Outcome::Success)
}

#[tokio::main]
async fn main() {
    init_logging();

    let code = match run(Args::parse()).await {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            eprintln!("{e}");
            1
        }
    };
    std::process::exit(code);
}
