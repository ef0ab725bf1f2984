//! xlsxjson - Batch converter between Excel workbooks (XLSX) and JSON
//!
//! This crate converts XLSX workbooks to JSON and JSON back to XLSX, one file at a
//! time or for every matching file in a directory.
//!
//! Two conversion modes are available:
//!
//! - `Simple`: each worksheet becomes an array of row objects keyed by the header row.
//! - `Full`: the whole workbook is snapshotted (cells, formulas, merges, hidden
//!   rows/columns, shared strings, number formats and every package part), so the
//!   JSON converts back to the same workbook.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::fs::File;
//! use xlsxjson::ConverterBuilder;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Workbook -> JSON in Simple mode (default settings)
//!     let converter = ConverterBuilder::new().build()?;
//!
//!     let input = File::open("sales.xlsx")?;
//!     let output = File::create("sales.json")?;
//!     converter.convert(input, output)?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Batch Conversion
//!
//! ```rust,no_run
//! use std::path::Path;
//! use xlsxjson::{ConversionDirection, ConversionMode, ConverterBuilder};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let converter = ConverterBuilder::new()
//!         .with_direction(ConversionDirection::ToWorkbook)
//!         .with_mode(ConversionMode::Full)
//!         .build()?;
//!
//!     // Every *.json file directly under "snapshots" is written to "snapshots/xlsx"
//!     let report = converter.run(Path::new("snapshots"), Some(Path::new("xlsx")))?;
//!     for failure in &report.failed {
//!         eprintln!("{}: {}", failure.input.display(), failure.error);
//!     }
//!
//!     Ok(())
//! }
//! ```

mod api;
mod builder;
mod document;
mod error;
mod output;
mod parser;
mod resolver;
mod security;
mod types;

// 公開API
pub use api::{ConversionDirection, ConversionMode};
pub use builder::{Converter, ConverterBuilder};
pub use error::XlsxJsonError;
pub use resolver::{collect_inputs, output_path_for, prepare_paths, InputSet};
pub use types::{BatchReport, FileJob, JobFailure, ResolvedPaths};
