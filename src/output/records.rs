//! Records Writer
//!
//! Simpleモードのドキュメント（シート名 -> 行オブジェクト配列）を
//! rust_xlsxwriterでワークブックに変換します。

use std::collections::HashMap;

use rust_xlsxwriter::{ColNum, RowNum, Workbook, Worksheet};
use serde_json::{Map, Value};

use crate::error::XlsxJsonError;

/// 行オブジェクト配列のマップをXLSXのバイト列に変換
///
/// シートはマップの順序で追加します。各シートの1行目には、行オブジェクトの
/// キーを初出順に並べた見出しを書き込みます。
pub(crate) fn write_records(document: &Map<String, Value>) -> Result<Vec<u8>, XlsxJsonError> {
    if document.is_empty() {
        return Err(XlsxJsonError::Config(
            "JSON data contains no sheets".to_string(),
        ));
    }

    let mut workbook = Workbook::new();
    for (sheet_name, rows) in document {
        let rows = rows.as_array().ok_or_else(|| {
            XlsxJsonError::Config(format!(
                "Sheet '{}' must be an array of row objects",
                sheet_name
            ))
        })?;

        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name)?;
        write_sheet(worksheet, sheet_name, rows)?;
    }

    Ok(workbook.save_to_buffer()?)
}

fn write_sheet(
    worksheet: &mut Worksheet,
    sheet_name: &str,
    rows: &[Value],
) -> Result<(), XlsxJsonError> {
    let mut headers: Vec<&str> = Vec::new();
    let mut columns: HashMap<&str, ColNum> = HashMap::new();

    for (index, row) in rows.iter().enumerate() {
        let record = row.as_object().ok_or_else(|| {
            XlsxJsonError::Config(format!(
                "Row {} of sheet '{}' is not an object",
                index, sheet_name
            ))
        })?;
        let row_num = RowNum::try_from(index + 1).map_err(|_| {
            XlsxJsonError::Config(format!("Sheet '{}' has too many rows", sheet_name))
        })?;

        for (key, value) in record {
            let col = match columns.get(key.as_str()) {
                Some(col) => *col,
                None => {
                    let col = ColNum::try_from(headers.len()).map_err(|_| {
                        XlsxJsonError::Config(format!(
                            "Sheet '{}' has too many columns",
                            sheet_name
                        ))
                    })?;
                    headers.push(key);
                    columns.insert(key, col);
                    col
                }
            };
            write_value(worksheet, row_num, col, value)?;
        }
    }

    for (col, header) in headers.iter().enumerate() {
        // headersの長さはColNumに収まることを確認済み
        worksheet.write_string(0, col as ColNum, *header)?;
    }

    Ok(())
}

/// JSON値を型に応じてセルに書き込む
///
/// `null`は空セルのまま、配列・オブジェクトはJSON文字列として書き込みます。
fn write_value(
    worksheet: &mut Worksheet,
    row: RowNum,
    col: ColNum,
    value: &Value,
) -> Result<(), XlsxJsonError> {
    match value {
        Value::Null => {}
        Value::Bool(b) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        Value::Number(n) => {
            let number = n.as_f64().ok_or_else(|| {
                XlsxJsonError::Config(format!("Number {} cannot be stored in a cell", n))
            })?;
            worksheet.write_number(row, col, number)?;
        }
        Value::String(s) => {
            worksheet.write_string(row, col, s)?;
        }
        Value::Array(_) | Value::Object(_) => {
            worksheet.write_string(row, col, &value.to_string())?;
        }
    }
    Ok(())
}
