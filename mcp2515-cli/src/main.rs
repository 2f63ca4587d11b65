//! MCP2515 SPI Decoder CLI Application
//!
//! Command-line interface for the mcp2515-decoder library. It adds:
//! - TOML configuration with command-line overrides
//! - Parallel decoding of capture files
//! - Report generation (TXT/JSON)

use anyhow::{Context, Result};
use clap::Parser;
use mcp2515_decoder::{Decoder, OutputEvent};
use rayon::prelude::*;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

mod config;
mod report;

use config::{AppConfig, OutputFormat};
use report::CaptureReport;

/// MCP2515 SPI Decoder - Decode SPI captures of an MCP2515 CAN controller
#[derive(Parser, Debug)]
#[command(name = "mcp2515-cli")]
#[command(about = "Decode MCP2515 SPI captures (CSV, JSON) into labeled events", long_about = None)]
#[command(version)]
struct Args {
    /// Capture file(s) to decode (can be repeated)
    #[arg(short, long, value_name = "FILE")]
    input: Vec<PathBuf>,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Output file for the report (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Only report events that carry warnings
    #[arg(long)]
    only_warnings: bool,

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

    log::info!("MCP2515 Decoder CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using decoder library v{}", mcp2515_decoder::VERSION);

    let mut config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => AppConfig::default(),
    };
    apply_overrides(&mut config, &args);

    if config.input.files.is_empty() {
        println!("MCP2515 Decoder - No input specified");
        println!("\nQuick Start:");
        println!("  mcp2515-cli --input capture.csv");
        println!("  mcp2515-cli --input capture.json --format json --output report.json");
        println!("\nWith a configuration file:");
        println!("  mcp2515-cli --config config.toml");
        println!("\nUse --help for more options");
        return Ok(());
    }

    let decoder = Decoder::with_config(config.decoder.clone());
    let reports = config
        .input
        .files
        .iter()
        .map(|path| decode_capture(&decoder, path, &config))
        .collect::<Result<Vec<_>>>()?;

    match &config.output.path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {:?}", path))?;
            let mut out = BufWriter::new(file);
            report::write_report(&mut out, &reports, &config.output)?;
            out.flush()?;
            log::info!("Report written to {:?}", path);
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            report::write_report(&mut out, &reports, &config.output)?;
        }
    }

    Ok(())
}

/// Command-line arguments take precedence over the configuration file
fn apply_overrides(config: &mut AppConfig, args: &Args) {
    if !args.input.is_empty() {
        config.input.files = args.input.clone();
    }
    if let Some(format) = args.format {
        config.output.format = format;
    }
    if let Some(path) = &args.output {
        config.output.path = Some(path.clone());
    }
    if args.only_warnings {
        config.filtering.only_warnings = true;
    }
}

/// Read one capture and decode its transactions in parallel
fn decode_capture(decoder: &Decoder, path: &Path, config: &AppConfig) -> Result<CaptureReport> {
    let transactions = mcp2515_decoder::formats::read_capture(path)
        .with_context(|| format!("Failed to read capture: {:?}", path))?;
    log::info!("{:?}: {} transactions", path, transactions.len());

    let events: Vec<OutputEvent> = transactions
        .par_iter()
        .map(|tx| decoder.decode_transaction(tx))
        .collect();

    let events: Vec<OutputEvent> = events
        .into_iter()
        .filter(|event| config.decoder.should_emit(event.kind()))
        .filter(|event| !config.filtering.only_warnings || event.has_warnings())
        .collect();

    let report = CaptureReport::new(path.to_path_buf(), events);
    if report.summary.warnings > 0 {
        log::warn!(
            "{:?}: {} warnings in {} events",
            path,
            report.summary.warnings,
            report.summary.events_with_warnings
        );
    }
    Ok(report)
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn args(argv: &[&str]) -> Args {
        Args::parse_from(std::iter::once("mcp2515-cli").chain(argv.iter().copied()))
    }

    #[test]
    fn test_cli_overrides_config() {
        let mut config: AppConfig = toml::from_str(
            "[input]\nfiles = [\"a.csv\"]\n[output]\nformat = \"txt\"\n",
        )
        .unwrap();
        apply_overrides(
            &mut config,
            &args(&["-i", "b.csv", "-i", "c.json", "--format", "json", "--only-warnings"]),
        );
        assert_eq!(config.input.files, vec![PathBuf::from("b.csv"), PathBuf::from("c.json")]);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.filtering.only_warnings);
        assert!(config.output.path.is_none());
    }

    #[test]
    fn test_decode_capture_filters_and_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.csv");
        fs::write(
            &path,
            "type,start_time,duration,mosi,miso\n\
             enable,0.000000,0,,\n\
             result,0.000001,0.000001,0xC0,0xFF\n\
             disable,0.000003,0,,\n\
             enable,0.000010,0,,\n\
             result,0.000011,0.000001,0xFF,0xFF\n\
             disable,0.000013,0,,\n\
             enable,0.000020,0,,\n\
             result,0.000021,0.000001,0x02,0xFF\n\
             result,0.000022,0.000001,0x0E,0xFF\n\
             result,0.000023,0.000001,0x80,0xFF\n\
             disable,0.000025,0,,\n",
        )
        .unwrap();

        let decoder = Decoder::new();
        let mut config = AppConfig::default();
        let report = decode_capture(&decoder, &path, &config).unwrap();
        let labels: Vec<_> = report.events.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["RESET", "UNKNOWN 0xFF", "WRITE CANCTRL"]);

        config.filtering.only_warnings = true;
        let report = decode_capture(&decoder, &path, &config).unwrap();
        assert_eq!(report.events.len(), 1);
        assert_eq!(report.summary.events, 1);
    }
}
