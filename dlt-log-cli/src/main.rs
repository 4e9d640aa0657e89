//! DLT Log Reader CLI Application
//!
//! Command-line front end for the dlt-log-decoder library: parse a DLT
//! capture file, print its records and summarize corruption.

use anyhow::{Context, Result};
use clap::Parser;
use dlt_log_decoder::{DecoderConfig, DltFile, SourceBackend};
use std::path::PathBuf;

/// DLT Log Reader - decode AUTOSAR DLT capture files
#[derive(Parser, Debug)]
#[command(name = "dlt-log-cli")]
#[command(about = "Decode AUTOSAR DLT capture files", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the DLT capture file to decode
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Memory-map the file instead of reading it up front
    #[arg(long)]
    mmap: bool,

    /// Number of worker threads (default: hardware concurrency)
    #[arg(long, value_name = "COUNT")]
    threads: Option<usize>,

    /// Maximum number of records to print
    #[arg(long, value_name = "COUNT")]
    max_records: Option<usize>,

    /// Print only corruption markers
    #[arg(long)]
    corrupted_only: bool,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    log::info!("DLT Log Reader CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using decoder library v{}", dlt_log_decoder::VERSION);

    let mut config = DecoderConfig::new();
    if args.mmap {
        config = config.with_backend(SourceBackend::Mmap);
    }
    if let Some(threads) = args.threads {
        config = config.with_threads(threads);
    }

    let file = DltFile::parse_with(&args.file, config)
        .with_context(|| format!("failed to parse {:?}", args.file))?;

    let limit = args.max_records.unwrap_or(usize::MAX);
    let mut corrupted = 0usize;
    let mut printed = 0usize;

    for (index, record) in file.records().iter().enumerate() {
        if record.is_corrupted() {
            corrupted += 1;
        }
        if args.corrupted_only && !record.is_corrupted() {
            continue;
        }
        if printed >= limit {
            continue;
        }
        printed += 1;

        if record.is_corrupted() {
            println!(
                "{index:>8}  !! corrupted: {}",
                record.corruption_cause().unwrap_or("unknown cause")
            );
            continue;
        }

        let time = record
            .timestamp_utc()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S%.6f").to_string())
            .unwrap_or_else(|| record.timestamp().to_string());
        println!(
            "{index:>8}  {time}  {:<4} {:<4} {:<4} {:<9} {}",
            record.ecu(),
            record.apid(),
            record.ctid(),
            record.message_type().to_string(),
            record.message()
        );
    }

    if !args.quiet {
        println!(
            "\n{} records, {} corrupted",
            file.records_num(),
            corrupted
        );
    }

    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
