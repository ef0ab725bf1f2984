//! xlsxjson command-line tool
//!
//! ```text
//! xlsxjson <convertexcel|convertjson> <simple|full> <source> [destination]
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use xlsxjson::{ConversionDirection, ConversionMode, ConverterBuilder};

/// 引数が不正な場合の終了コード
const EXIT_INVALID_ARGUMENT: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "xlsxjson",
    version,
    about = "Convert Excel workbooks (XLSX) to JSON and back",
    long_about = "Convert a single file, or every matching file directly inside a directory, \
                  between XLSX and JSON.\n\n\
                  convertexcel: *.xlsx -> *.json\n\
                  convertjson:  *.json -> *.xlsx",
    arg_required_else_help = true
)]
struct Cli {
    /// Conversion direction: "convertexcel" or "convertjson"
    direction: String,

    /// Conversion mode: "simple" or "full"
    mode: String,

    /// Source file or directory
    source: PathBuf,

    /// Destination file or directory (defaults to the source's directory;
    /// relative paths are resolved against it)
    destination: Option<PathBuf>,

    #[arg(long, default_value = "info", value_parser = ["error", "warn", "info", "debug"])]
    log_level: String,
}

fn setup_logging(log_level: &str) {
    let log_level_filter = match log_level {
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "debug" => log::LevelFilter::Debug,
        _ => log::LevelFilter::Info,
    };
    env_logger::Builder::new()
        .filter_level(log_level_filter)
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    let direction = match cli.direction.parse::<ConversionDirection>() {
        Ok(direction) => direction,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGUMENT);
        }
    };
    let mode = match cli.mode.parse::<ConversionMode>() {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGUMENT);
        }
    };

    match run(&cli, direction, mode) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// 変換を実行し、すべてのジョブが成功したかを返す
fn run(cli: &Cli, direction: ConversionDirection, mode: ConversionMode) -> anyhow::Result<bool> {
    let converter = ConverterBuilder::new()
        .with_direction(direction)
        .with_mode(mode)
        .build()
        .context("Failed to configure converter")?;

    let report = converter
        .run(&cli.source, cli.destination.as_deref())
        .with_context(|| format!("Failed to convert \"{}\"", cli.source.display()))?;

    println!(
        "{} of {} file(s) converted ({} mode).",
        report.converted.len(),
        report.total(),
        mode
    );
    for failure in &report.failed {
        println!("  failed: {}: {}", failure.input.display(), failure.error);
    }

    Ok(report.is_success())
}
