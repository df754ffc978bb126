//! `convert-csv`: write a CSV file as an indented JSON array.

use std::{io, path::PathBuf};

use clap::Parser;
use dataops::{DEFAULT_INPUT, DEFAULT_JSON_OUTPUT, convert_csv_to_json};
use dataops_cli::{
    Outcome,
    error::{CliResult, PipelineSnafu},
    logging::init_logging,
    render,
};
use snafu::prelude::*;

#[derive(Debug, Parser)]
#[command(name = "convert-csv", version, about)]
struct Args {
    /// Input CSV file
    #[arg(default_value = DEFAULT_INPUT)]
    input: PathBuf,

    /// Output JSON file
    #[arg(default_value = DEFAULT_JSON_OUTPUT)]
    output: PathBuf,

    /// Run the default quality checklist first; stop on failures
    #[arg(long, default_value_t = false)]
    validate: bool,
}

fn run(args: Args) -> CliResult<Outcome> {
    if args.validate {
        let report = dataops_cli::validate_input(&args.input)?;
        render::write_report(&report, false, &mut io::stdout().lock())?;
        if !report.failed.is_empty() {
            return Ok(Outcome::ChecksFailed);
        }
    }

    let rows = convert_csv_to_json(&args.input, &args.output).context(PipelineSnafu)?;
    println!("Converted {rows} rows -> {}", args.output.display());
    Ok(Outcome::Success)
}

fn main() {
    init_logging();

    let code = match run(Args::parse()) {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            eprintln!("{e}");
            1
        }
    };
    std::process::exit(code);
}
