use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, ValueEnum};
use courtside_core::{
    JsonLinesSink, Pipeline, PipelineConfig, PrimeBudget, RecordFilter, RecordSink, RunReport,
    TextSink, load_records,
};
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "courtside",
    version,
    about = "Enrich and filter player records on a bounded worker pipeline",
    long_about = "Reads a JSON array of player records, counts primes below each birth year \
                  on a pool of workers, and writes the players that pass the filter."
)]
struct Cli {
    /// JSON file holding an array of player records.
    input: PathBuf,

    /// Destination file for the filtered records.
    #[arg(short, long, default_value = "filtered_players.txt")]
    output: PathBuf,

    /// Output format.
    #[arg(long, value_enum, default_value_t = FormatArg::Text)]
    format: FormatArg,

    /// Number of worker threads.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_WORKERS)]
    workers: usize,

    /// Intake queue capacity (defaults to half the number of input records).
    #[arg(long)]
    capacity: Option<usize>,

    /// Command queue capacity (defaults to 3x the intake capacity).
    #[arg(long)]
    command_capacity: Option<usize>,

    /// Wall-clock enrichment budget per record, in milliseconds.
    #[arg(long, default_value_t = 20, conflicts_with = "budget_steps")]
    budget_ms: u64,

    /// Test a fixed number of integers per record instead of a time budget.
    #[arg(long)]
    budget_steps: Option<u64>,

    /// Minimum prime count a record needs to be kept.
    #[arg(long, default_value_t = RecordFilter::DEFAULT_MIN_METRIC)]
    min_metric: u64,

    /// Points per game a record must exceed to be kept.
    #[arg(long, default_value_t = RecordFilter::DEFAULT_MIN_RATE)]
    min_rate: f64,

    /// Write the run report as JSON to this path.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Log verbosity written to stderr.
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    /// One `ID: .., LastName: ..` line per record.
    Text,
    /// Newline-delimited JSON.
    Jsonl,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn init_logging(level: LogLevel) {
    tracing_subscriber::fmt()
        .with_max_level(Level::from(level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let records = load_records(&cli.input)?;
    let config = build_config(&cli, records.len());
    let pipeline = Pipeline::new(config)?;

    if let Some(parent) = cli
        .output
        .parent()
        .filter(|path| !path.as_os_str().is_empty())
    {
        fs::create_dir_all(parent)?;
    }
    let writer = BufWriter::new(File::create(&cli.output)?);
    let sink: Box<dyn RecordSink + Send> = match cli.format {
        FormatArg::Text => Box::new(TextSink::new(writer)),
        FormatArg::Jsonl => Box::new(JsonLinesSink::new(writer)),
    };

    eprintln!(
        "processing {} records with {} workers...",
        records.len(),
        pipeline.config().workers
    );
    let (_sink, report) = pipeline.run(records, sink)?;

    if let Some(path) = &cli.report {
        write_report(path, &report)?;
    }
    print_summary(&cli.output, &report);
    Ok(())
}

fn build_config(cli: &Cli, input_len: usize) -> PipelineConfig {
    let mut config = PipelineConfig::for_input_len(input_len);
    config.workers = cli.workers;
    if let Some(capacity) = cli.capacity {
        config.intake_capacity = capacity;
    }
    config.command_capacity = cli.command_capacity;
    config.budget = match cli.budget_steps {
        Some(steps) => PrimeBudget::Steps(steps),
        None => PrimeBudget::WallClock(Duration::from_millis(cli.budget_ms)),
    };
    config.filter = RecordFilter::new(cli.min_metric, cli.min_rate);
    config
}

fn write_report(path: &Path, report: &RunReport) -> Result<(), Box<dyn std::error::Error>> {
    let mut file = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut file, report)?;
    file.write_all(b"\n")?;
    file.flush()?;
    Ok(())
}

fn print_summary(output: &Path, report: &RunReport) {
    println!("records read:     {}", report.records_in);
    println!("records enriched: {}", report.records_enriched());
    println!(
        "records kept:     {} (dropped {})",
        report.records_accepted, report.records_rejected
    );
    println!(
        "records written:  {} -> {}",
        report.records_written,
        output.display()
    );
    println!(
        "elapsed:          {} ({:.1} records/s)",
        format_duration(report.elapsed),
        report.throughput()
    );
    for worker in &report.workers {
        println!(
            "  worker {:>2}: {:>5} records, busy {}, utilization {:>5.1}%",
            worker.worker_id,
            worker.records_processed,
            format_duration(worker.busy),
            worker.utilization() * 100.0
        );
    }
}

fn format_duration(duration: Duration) -> String {
    let millis = duration.as_secs_f64() * 1000.0;
    if millis >= 1000.0 {
        format!("{:.2}s", millis / 1000.0)
    } else {
        format!("{millis:.1}ms")
    }
}
