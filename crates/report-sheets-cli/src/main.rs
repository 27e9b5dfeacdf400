//! Report Sheets CLI - formula evaluation and report generation tool

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use report_sheets::prelude::*;
use report_sheets::{handle_parse_request, handle_request, Request};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rsheets")]
#[command(
    author,
    version,
    about = "Evaluate report formulas and generate reports from templates"
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// JSON data store with technological, x-line and laboratory series
    #[arg(short, long, env = "RSHEETS_STORE")]
    store: Option<PathBuf>,

    /// Resolve the ciphers of a formula on parallel threads
    #[arg(long)]
    concurrent: bool,

    /// Upper bound on resolver threads per formula with --concurrent
    #[arg(long, env = "RSHEETS_MAX_THREADS")]
    max_threads: Option<usize>,
}

#[derive(Args)]
struct WindowArgs {
    /// Window start (YYYY-MM-DD or "YYYY-MM-DD HH:MM:SS")
    #[arg(long, env = "RSHEETS_START")]
    start: String,

    /// Window end, inclusive
    #[arg(long, env = "RSHEETS_END")]
    end: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate one formula and print its result as JSON
    Eval {
        /// Formula (`=sum(T500)`) or literal text
        formula: String,

        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        window: WindowArgs,
    },

    /// Answer a cell-parsing request read from a file or stdin
    Parse {
        /// Request JSON file, `-` for stdin
        #[arg(default_value = "-")]
        input: PathBuf,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Generate a report from a template
    Report {
        /// Template JSON file
        template: PathBuf,

        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        window: WindowArgs,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Field delimiter for CSV output
        #[arg(short, long, default_value = ",")]
        delimiter: char,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Eval {
            formula,
            source,
            window,
        } => eval(&formula, &source, &window),
        Commands::Parse { input, source } => parse(&input, &source),
        Commands::Report {
            template,
            source,
            window,
            output,
            format,
            delimiter,
        } => report(
            &template,
            &source,
            &window,
            output.as_deref(),
            format,
            delimiter,
        ),
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn engine(source: &SourceArgs) -> Result<FormulaEngine<MemoryStore>> {
    let store = match &source.store {
        Some(path) => MemoryStore::from_path(path)
            .with_context(|| format!("Failed to load data store '{}'", path.display()))?,
        None => {
            tracing::warn!("no data store given; every cipher resolves to an empty series");
            MemoryStore::new()
        }
    };
    let mut options = if source.concurrent {
        EngineOptions::concurrent()
    } else {
        EngineOptions::default()
    };
    if let Some(max_threads) = source.max_threads {
        options = options.with_max_threads(max_threads);
    }
    Ok(FormulaEngine::with_options(store, options))
}

fn time_window(args: &WindowArgs) -> Result<TimeWindow> {
    TimeWindow::parse(&args.start, &args.end)
        .with_context(|| format!("Invalid report window '{}'..'{}'", args.start, args.end))
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        Ok(text)
    } else {
        fs::read_to_string(path).with_context(|| format!("Failed to read '{}'", path.display()))
    }
}

fn eval(formula: &str, source: &SourceArgs, window: &WindowArgs) -> Result<()> {
    let engine = engine(source)?;
    let window = time_window(window)?;
    let result = engine.evaluate(formula, &window);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn parse(input: &Path, source: &SourceArgs) -> Result<()> {
    let engine = engine(source)?;
    let text = read_input(input)?;

    // Accept both the typed envelope and a bare request body
    let response = match serde_json::from_str::<Request>(&text) {
        Ok(request) => serde_json::to_value(handle_request(&engine, &request)?)?,
        Err(_) => {
            let request: ParseRequest =
                serde_json::from_str(&text).context("Failed to parse request JSON")?;
            serde_json::to_value(handle_parse_request(&engine, &request)?)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn report(
    template_path: &Path,
    source: &SourceArgs,
    window: &WindowArgs,
    output: Option<&Path>,
    format: OutputFormat,
    delimiter: char,
) -> Result<()> {
    let template = TemplateDocument::from_json(&read_input(template_path)?)
        .with_context(|| format!("Failed to parse template '{}'", template_path.display()))?;
    let window = time_window(window)?;

    let report = ReportBuilder::new(engine(source)?)
        .generate(&template, &window)
        .context("Failed to generate report")?;

    let errors = report.error_count();
    if errors > 0 {
        eprintln!("Warning: {} cell(s) evaluated to an error", errors);
    }

    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&report)? + "\n",
        OutputFormat::Csv => to_csv(&report, delimiter)?,
    };

    match output {
        Some(path) => fs::write(path, rendered)
            .with_context(|| format!("Failed to write '{}'", path.display()))?,
        None => io::stdout().write_all(rendered.as_bytes())?,
    }
    Ok(())
}

fn to_csv(report: &Report, delimiter: char) -> Result<String> {
    if !delimiter.is_ascii() {
        anyhow::bail!("CSV delimiter must be an ASCII character, got '{}'", delimiter);
    }
    let delimiter = delimiter as u8;

    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());
    for row in report.to_rows() {
        writer.write_record(&row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV output: {}", e.error()))?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}
