//! Snapshot Writer
//!
//! `Package`を持たないFullモードのドキュメントを、シートのセルスナップショットから
//! rust_xlsxwriterで再構築します。書式やグラフなど、スナップショットに
//! 含まれない情報は復元されません。

use rust_xlsxwriter::{ColNum, Format, Formula, Workbook, Worksheet};
use serde_json::Value;

use crate::document::{CellSnapshot, FullWorkbook, SheetSnapshot};
use crate::error::XlsxJsonError;
use crate::types::{CellCoord, CellRange};

/// セルスナップショットからXLSXのバイト列を生成
///
/// シートは`SheetNames`の順序で追加し、`SheetNames`に無いシートは末尾に追加します。
pub(crate) fn write_snapshot(document: &FullWorkbook) -> Result<Vec<u8>, XlsxJsonError> {
    let mut order: Vec<&str> = document.sheet_names.iter().map(String::as_str).collect();
    for name in document.sheets.keys() {
        if !order.contains(&name.as_str()) {
            order.push(name.as_str());
        }
    }
    if order.is_empty() {
        return Err(XlsxJsonError::Config(
            "JSON data contains no sheets".to_string(),
        ));
    }

    let empty = SheetSnapshot::default();
    let mut workbook = Workbook::new();
    for name in order {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(name)?;
        let snapshot = document.sheets.get(name).unwrap_or(&empty);
        write_sheet(worksheet, name, snapshot)?;
    }

    Ok(workbook.save_to_buffer()?)
}

fn write_sheet(
    worksheet: &mut Worksheet,
    sheet_name: &str,
    snapshot: &SheetSnapshot,
) -> Result<(), XlsxJsonError> {
    let blank = Format::new();
    for merge in &snapshot.merges {
        let range = CellRange::from_a1_notation(merge).ok_or_else(|| {
            XlsxJsonError::Config(format!(
                "Invalid merge range '{}' in sheet '{}'",
                merge, sheet_name
            ))
        })?;
        if range.start == range.end {
            continue;
        }
        worksheet.merge_range(
            range.start.row,
            column(range.start.col, sheet_name)?,
            range.end.row,
            column(range.end.col, sheet_name)?,
            "",
            &blank,
        )?;
    }

    for cell in &snapshot.cells {
        write_cell(worksheet, sheet_name, cell)?;
    }

    for row in &snapshot.hidden_rows {
        worksheet.set_row_hidden(*row)?;
    }
    for col in &snapshot.hidden_cols {
        worksheet.set_column_hidden(column(*col, sheet_name)?)?;
    }

    Ok(())
}

/// 1セルを型記号`t`に従って書き込む
fn write_cell(
    worksheet: &mut Worksheet,
    sheet_name: &str,
    cell: &CellSnapshot,
) -> Result<(), XlsxJsonError> {
    let coord = CellCoord::from_a1_notation(&cell.r).ok_or_else(|| {
        XlsxJsonError::Config(format!(
            "Invalid cell reference '{}' in sheet '{}'",
            cell.r, sheet_name
        ))
    })?;
    let row = coord.row;
    let col = column(coord.col, sheet_name)?;

    if let Some(formula) = &cell.f {
        let mut formula = Formula::new(formula);
        if let Some(result) = cached_result(&cell.v) {
            formula = formula.set_result(result);
        }
        worksheet.write_formula(row, col, formula)?;
        return Ok(());
    }

    match (cell.t.as_str(), &cell.v) {
        (_, Value::Null) | ("z", _) => {}
        ("n", Value::Number(n)) => {
            let number = n.as_f64().ok_or_else(|| {
                XlsxJsonError::Config(format!("Number {} cannot be stored in a cell", n))
            })?;
            worksheet.write_number(row, col, number)?;
        }
        ("b", Value::Bool(b)) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        ("s" | "d" | "e", Value::String(s)) => {
            worksheet.write_string(row, col, s)?;
        }
        (t, v) => {
            return Err(XlsxJsonError::Config(format!(
                "Cell {} in sheet '{}' has unsupported type '{}' for value {}",
                cell.r, sheet_name, t, v
            )))
        }
    }
    Ok(())
}

/// 数式セルのキャッシュ値を文字列で取得
fn cached_result(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(true) => Some("TRUE".to_string()),
        Value::Bool(false) => Some("FALSE".to_string()),
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn column(col: u32, sheet_name: &str) -> Result<ColNum, XlsxJsonError> {
    ColNum::try_from(col).map_err(|_| {
        XlsxJsonError::Config(format!(
            "Column index {} out of range in sheet '{}'",
            col, sheet_name
        ))
    })
}
