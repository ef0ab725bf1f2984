//! パフォーマンスベンチマーク
//!
//! ワークブック -> JSON、JSON -> ワークブックの変換速度を、
//! メモリ上で生成したワークブック（1,000行 x 10列）で測定します。

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rust_xlsxwriter::Workbook;
use std::io::Cursor;
use xlsxjson::{ConversionDirection, ConversionMode, ConverterBuilder};

const ROWS: u32 = 1_000;
const COLS: u16 = 10;

/// 見出し行と数値・文字列が交互に並ぶデータ行を持つワークブック
fn generate_workbook() -> Vec<u8> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    for col in 0..COLS {
        worksheet
            .write_string(0, col, &format!("column_{}", col))
            .unwrap();
    }
    for row in 1..=ROWS {
        for col in 0..COLS {
            if col % 2 == 0 {
                worksheet
                    .write_number(row, col, f64::from(row) * f64::from(col))
                    .unwrap();
            } else {
                worksheet
                    .write_string(row, col, &format!("r{}c{}", row, col))
                    .unwrap();
            }
        }
    }
    workbook.save_to_buffer().unwrap()
}

fn convert(direction: ConversionDirection, mode: ConversionMode, data: &[u8]) -> Vec<u8> {
    let converter = ConverterBuilder::new()
        .with_direction(direction)
        .with_mode(mode)
        .build()
        .unwrap();
    let mut output = Vec::new();
    converter.convert(Cursor::new(data), &mut output).unwrap();
    output
}

fn benchmark_to_json(c: &mut Criterion) {
    let data = generate_workbook();

    let mut group = c.benchmark_group("workbook_to_json");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.sample_size(10);

    for mode in [ConversionMode::Simple, ConversionMode::Full] {
        group.bench_function(mode.as_str(), |b| {
            b.iter(|| {
                black_box(convert(
                    ConversionDirection::ToStructuredData,
                    mode,
                    black_box(&data),
                ))
            });
        });
    }

    group.finish();
}

fn benchmark_to_workbook(c: &mut Criterion) {
    let workbook = generate_workbook();

    let mut group = c.benchmark_group("json_to_workbook");
    group.sample_size(10);

    for mode in [ConversionMode::Simple, ConversionMode::Full] {
        let json = convert(ConversionDirection::ToStructuredData, mode, &workbook);
        group.throughput(Throughput::Bytes(json.len() as u64));
        group.bench_function(mode.as_str(), |b| {
            b.iter(|| {
                black_box(convert(
                    ConversionDirection::ToWorkbook,
                    mode,
                    black_box(&json),
                ))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_to_json, benchmark_to_workbook);
criterion_main!(benches);
