use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};

use clap::{Parser, Subcommand, ValueEnum};
use dataops::{
    formats,
    prelude::*,
    profile_data,
    sql::default_table_name,
};
use dataops_cli::{
    Outcome,
    error::{
        CliResult, DeltaSnafu, InferFormatSnafu, PipelineSnafu, ProfileSnafu, ReadInputSnafu,
        SqlSnafu, SuiteSnafu, WriteOutputSnafu,
    },
    logging::init_logging,
    render::{self, Preview},
};
use snafu::prelude::*;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    Json,
    Parquet,
    Xml,
    Excel,
}

impl From<FormatArg> for Format {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Csv => Format::Csv,
            FormatArg::Json => Format::Json,
            FormatArg::Parquet => Format::Parquet,
            FormatArg::Xml => Format::Xml,
            FormatArg::Excel => Format::Excel,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CompressionArg {
    Snappy,
    Zstd,
    Uncompressed,
}

impl From<CompressionArg> for ParquetCompression {
    fn from(value: CompressionArg) -> Self {
        match value {
            CompressionArg::Snappy => ParquetCompression::Snappy,
            CompressionArg::Zstd => ParquetCompression::Zstd,
            CompressionArg::Uncompressed => ParquetCompression::Uncompressed,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum JsonLayoutArg {
    Lines,
    Array,
    Pretty,
}

impl From<JsonLayoutArg> for JsonLayout {
    fn from(value: JsonLayoutArg) -> Self {
        match value {
            JsonLayoutArg::Lines => JsonLayout::Lines,
            JsonLayoutArg::Array => JsonLayout::Array,
            JsonLayoutArg::Pretty => JsonLayout::PrettyArray,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormatArg {
    Csv,
    Jsonl,
    Json,
    Parquet,
}

impl OutputFormatArg {
    fn format_and_options(self) -> (Format, WriteOptions) {
        let mut opts = WriteOptions::default();
        let format = match self {
            OutputFormatArg::Csv => Format::Csv,
            OutputFormatArg::Jsonl => Format::Json,
            OutputFormatArg::Json => {
                opts.json_layout = JsonLayout::PrettyArray;
                Format::Json
            }
            OutputFormatArg::Parquet => Format::Parquet,
        };
        (format, opts)
    }
}

/// `name=path` or a bare path (named after its file stem).
#[derive(Debug, Clone)]
struct TableArg {
    name: String,
    path: PathBuf,
}

fn parse_table_arg(raw: &str) -> Result<TableArg, String> {
    let (name, path) = match raw.split_once('=') {
        Some((name, path)) => (name.trim().to_string(), PathBuf::from(path.trim())),
        None => {
            let path = PathBuf::from(raw.trim());
            (default_table_name(&path), path)
        }
    };
    if name.is_empty() {
        return Err(format!("missing table name in '{raw}'"));
    }
    if path.as_os_str().is_empty() {
        return Err(format!("missing table path in '{raw}'"));
    }
    Ok(TableArg { name, path })
}

#[derive(Debug, Subcommand)]
enum DeltaCommand {
    /// Create (or overwrite) a Delta table from a data file
    Create {
        /// Source file; its format is taken from the extension
        #[arg(long)]
        source: PathBuf,

        /// Table directory
        #[arg(long)]
        table: PathBuf,
    },

    /// Append a data file to a Delta table as one new version
    Append {
        #[arg(long)]
        source: PathBuf,

        #[arg(long)]
        table: PathBuf,
    },

    /// Print rows of a Delta table, optionally at an older version
    Read {
        #[arg(long)]
        table: PathBuf,

        /// Version to time-travel to (default: latest)
        #[arg(long)]
        version: Option<i64>,

        #[arg(long, default_value_t = 10)]
        max_rows: usize,
    },

    /// List commits, newest first
    History {
        #[arg(long)]
        table: PathBuf,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Run `SELECT * ... LIMIT n` through the SQL engine
    Query {
        #[arg(long)]
        table: PathBuf,

        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Convert a file between CSV, JSON, Parquet, XML and Excel
    Convert {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        output: PathBuf,

        /// Input format (default: from the input extension)
        #[arg(long, value_enum)]
        from: Option<FormatArg>,

        /// Output format (default: from the output extension)
        #[arg(long, value_enum)]
        to: Option<FormatArg>,

        /// Workbook sheet, by name or zero-based index
        #[arg(long)]
        sheet: Option<SheetSelector>,

        /// Dotted path to the records inside an XML document
        #[arg(long)]
        record_path: Option<String>,

        #[arg(long, value_enum, default_value_t = CompressionArg::Snappy)]
        compression: CompressionArg,

        #[arg(long, value_enum, default_value_t = JsonLayoutArg::Lines)]
        json_layout: JsonLayoutArg,
    },

    /// Run SQL over one or more files or Delta tables
    Query {
        #[arg(long)]
        sql: String,

        /// Repeatable `name=path`; a bare path is named after its file stem
        #[arg(long = "table", value_parser = parse_table_arg)]
        tables: Vec<TableArg>,

        /// Rows to preview (0 suppresses the preview)
        #[arg(long, default_value_t = 10)]
        max_rows: usize,

        /// Write the full result here
        #[arg(long)]
        output: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = OutputFormatArg::Csv)]
        format: OutputFormatArg,

        /// Print the query plan instead of running it
        #[arg(long, default_value_t = false)]
        explain: bool,
    },

    /// Print shape, types, nulls and duplicate count of a file
    Profile {
        #[arg(long)]
        input: PathBuf,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Run a quality suite; exits 1 when any failure-level check fails
    Validate {
        #[arg(long)]
        input: PathBuf,

        /// Suite JSON file (default: the built-in checklist)
        #[arg(long)]
        suite: Option<PathBuf>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Count rows of every CSV file in a directory
    CheckRaw {
        #[arg(long, default_value = dataops::DEFAULT_RAW_DIR)]
        dir: PathBuf,
    },

    /// Delta Lake table operations
    Delta {
        #[command(subcommand)]
        cmd: DeltaCommand,
    },
}

#[derive(Debug, Parser)]
#[command(name = "dataops", version, about = "Multi-format tabular data tool")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

fn resolve_format(explicit: Option<FormatArg>, path: &Path) -> CliResult<Format> {
    match explicit {
        Some(f) => Ok(f.into()),
        None => Format::from_path(path).context(InferFormatSnafu { path }),
    }
}

fn read_input(path: &Path, format: Format, opts: &ReadOptions) -> CliResult<Dataset> {
    formats::read(path, format, opts).context(ReadInputSnafu { path })
}

fn read_any(path: &Path) -> CliResult<Dataset> {
    let format = resolve_format(None, path)?;
    read_input(path, format, &ReadOptions::default())
}

fn print_preview(dataset: &Dataset, max_rows: usize) -> CliResult<()> {
    let preview = Preview::from_dataset(dataset, max_rows)?;
    preview.write_to(&mut io::stdout().lock())
}

struct ConvertArgs {
    input: PathBuf,
    output: PathBuf,
    from: Option<FormatArg>,
    to: Option<FormatArg>,
    sheet: Option<SheetSelector>,
    record_path: Option<String>,
    compression: CompressionArg,
    json_layout: JsonLayoutArg,
}

fn cmd_convert(args: ConvertArgs) -> CliResult<Outcome> {
    let from = resolve_format(args.from, &args.input)?;
    let to = resolve_format(args.to, &args.output)?;

    let read_opts = ReadOptions {
        csv: CsvOptions::default(),
        sheet: args.sheet.unwrap_or_default(),
        record_path: args.record_path,
    };
    let dataset = read_input(&args.input, from, &read_opts)?;

    let write_opts = WriteOptions {
        compression: args.compression.into(),
        json_layout: args.json_layout.into(),
    };
    formats::write(&dataset, &args.output, to, &write_opts).context(WriteOutputSnafu {
        path: &args.output,
    })?;

    println!(
        "Converted {} rows: {} ({from}) -> {} ({to})",
        dataset.num_rows(),
        args.input.display(),
        args.output.display()
    );
    Ok(Outcome::Success)
}

async fn register_table(session: &SqlSession, table: &TableArg) -> CliResult<()> {
    if table.path.join("_delta_log").is_dir() {
        let delta = VersionedTable::open(&table.path).await.context(DeltaSnafu)?;
        delta.register(session, &table.name).context(DeltaSnafu)?;
    } else {
        let format = resolve_format(None, &table.path)?;
        match format {
            Format::Csv | Format::Json | Format::Parquet => session
                .register_file(&table.name, &table.path, format)
                .await
                .context(SqlSnafu)?,
            Format::Xml | Format::Excel => {
                let dataset = read_input(&table.path, format, &ReadOptions::default())?;
                session
                    .register_dataset(&table.name, &dataset)
                    .context(SqlSnafu)?;
            }
        }
    }
    eprintln!("Registered {} as '{}'", table.path.display(), table.name);
    Ok(())
}

struct QueryArgs {
    sql: String,
    tables: Vec<TableArg>,
    max_rows: usize,
    output: Option<PathBuf>,
    format: OutputFormatArg,
    explain: bool,
}

async fn cmd_query(args: QueryArgs) -> CliResult<Outcome> {
    let session = SqlSession::new();
    for table in &args.tables {
        register_table(&session, table).await?;
    }

    if args.explain {
        let plan = session.explain(&args.sql).await.context(SqlSnafu)?;
        println!("{plan}");
        session.close();
        return Ok(Outcome::Success);
    }

    let result = session.sql(&args.sql).await.context(SqlSnafu)?;
    session.close();

    print_preview(&result, args.max_rows)?;

    if let Some(path) = &args.output {
        let (format, opts) = args.format.format_and_options();
        formats::write(&result, path, format, &opts).context(WriteOutputSnafu { path })?;
        println!("wrote: {} ({format})", path.display());
    }
    Ok(Outcome::Success)
}

fn cmd_profile(input: &Path, json: bool) -> CliResult<Outcome> {
    let dataset = read_any(input)?;
    let profile = profile_data(&dataset).context(ProfileSnafu)?;
    render::write_profile(&profile, json, &mut io::stdout().lock())?;
    Ok(Outcome::Success)
}

fn cmd_validate(input: &Path, suite: Option<&Path>, json: bool) -> CliResult<Outcome> {
    let suite = match suite {
        Some(path) => QualitySuite::load(path).context(SuiteSnafu)?,
        None => QualitySuite::default(),
    };
    let dataset = read_any(input)?;
    let report = suite.validate(&dataset);
    render::write_report(&report, json, &mut io::stdout().lock())?;

    if report.failed.is_empty() {
        Ok(Outcome::Success)
    } else {
        Ok(Outcome::ChecksFailed)
    }
}

async fn cmd_check_raw(dir: &Path) -> CliResult<Outcome> {
    let report = validate_csv_files(dir).await.context(PipelineSnafu)?;
    render::write_csv_check(&report, &mut io::stdout().lock())?;

    if report.all_valid() {
        Ok(Outcome::Success)
    } else {
        Ok(Outcome::ChecksFailed)
    }
}

async fn cmd_delta(cmd: DeltaCommand) -> CliResult<Outcome> {
    match cmd {
        DeltaCommand::Create { source, table } => {
            let dataset = read_any(&source)?;
            let created = VersionedTable::create(&table, &dataset)
                .await
                .context(DeltaSnafu)?;
            println!(
                "Created Delta table at {} (version {}, {} rows)",
                table.display(),
                created.version(),
                dataset.num_rows()
            );
        }

        DeltaCommand::Append { source, table } => {
            let dataset = read_any(&source)?;
            let mut opened = VersionedTable::open(&table).await.context(DeltaSnafu)?;
            opened.append(&dataset).await.context(DeltaSnafu)?;
            println!(
                "Appended {} rows to {} (version {})",
                dataset.num_rows(),
                table.display(),
                opened.version()
            );
        }

        DeltaCommand::Read {
            table,
            version,
            max_rows,
        } => {
            let opened = match version {
                Some(v) => VersionedTable::open_version(&table, v).await,
                None => VersionedTable::open(&table).await,
            }
            .context(DeltaSnafu)?;
            let dataset = opened.to_dataset().await.context(DeltaSnafu)?;
            println!("version: {}", opened.version());
            print_preview(&dataset, max_rows)?;
        }

        DeltaCommand::History { table, limit } => {
            let opened = VersionedTable::open(&table).await.context(DeltaSnafu)?;
            let entries = opened.history(limit).await.context(DeltaSnafu)?;
            render::write_history(&entries, &mut io::stdout().lock())?;
        }

        DeltaCommand::Query { table, limit } => {
            let opened = VersionedTable::open(&table).await.context(DeltaSnafu)?;
            let session = SqlSession::new();
            let name = default_table_name(&table);
            let dataset = opened
                .query(&session, &name, limit)
                .await
                .context(DeltaSnafu)?;
            session.close();
            print_preview(&dataset, limit)?;
        }
    }
    Ok(Outcome::Success)
}

async fn run() -> CliResult<Outcome> {
    let cli = Cli::parse();

    match cli.cmd {
        Command::Convert {
            input,
            output,
            from,
            to,
            sheet,
            record_path,
            compression,
            json_layout,
        } => cmd_convert(ConvertArgs {
            input,
            output,
            from,
            to,
            sheet,
            record_path,
            compression,
            json_layout,
        }),

        Command::Query {
            sql,
            tables,
            max_rows,
            output,
            format,
            explain,
        } => {
            cmd_query(QueryArgs {
                sql,
                tables,
                max_rows,
                output,
                format,
                explain,
            })
            .await
        }

        Command::Profile { input, json } => cmd_profile(&input, json),

        Command::Validate { input, suite, json } => cmd_validate(&input, suite.as_deref(), json),

        Command::CheckRaw { dir } => cmd_check_raw(&dir).await,

        Command::Delta { cmd } => cmd_delta(cmd).await,
    }
}

#[tokio::main]
async fn main() {
    init_logging();

    let code = match run().await {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            eprintln!("{e}");
            1
        }
    };
    // `process::exit` skips destructors.
    let _ = io::stdout().flush();
    std::process::exit(code);
}
