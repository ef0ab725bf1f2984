//! Workbook Parser Module
//!
//! calamineを使用したワークブックの読み込み。
//! Simpleモードの行レコードと、Fullモードのセルスナップショットを抽出します。

use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read, Seek};

use calamine::{open_workbook_auto_from_rs, CellErrorType, Data, Reader, Sheets, Xlsx};
use serde_json::{Map, Value};

use crate::document::{number_to_json, number_to_text, CellSnapshot, SheetSnapshot};
use crate::error::XlsxJsonError;
use crate::types::{CellCoord, CellRange};

/// 見出しセルが空の場合に使用する列名
const EMPTY_HEADER: &str = "__EMPTY";

/// ワークブックパーサー
///
/// calamineのラッパーとして、ワークブックレベルの操作を提供します。
pub(crate) struct WorkbookParser<R: Read + Seek> {
    /// calamineのワークブック（XLSX形式のみサポート）
    workbook: Xlsx<R>,
}

impl WorkbookParser<Cursor<Vec<u8>>> {
    /// メモリ上のXLSXデータからワークブックを開く
    ///
    /// # 戻り値
    ///
    /// * `Ok(WorkbookParser)` - ワークブックの読み込みに成功した場合（XLSX形式のみサポート）
    /// * `Err(XlsxJsonError::Parse)` - ワークブックの読み込みに失敗した場合
    /// * `Err(XlsxJsonError::Config)` - XLSX形式でない場合
    pub fn open(buffer: Vec<u8>) -> Result<Self, XlsxJsonError> {
        let sheets = open_workbook_auto_from_rs(Cursor::new(buffer)).map_err(XlsxJsonError::Parse)?;
        let mut workbook = match sheets {
            Sheets::Xlsx(workbook) => workbook,
            _ => {
                return Err(XlsxJsonError::Config(
                    "Only XLSX format is supported".to_string(),
                ))
            }
        };

        // 結合セル情報は全シート分を一度だけ読み込む
        workbook
            .load_merged_regions()
            .map_err(|e| XlsxJsonError::Parse(e.into()))?;

        Ok(Self { workbook })
    }
}

impl<R: Read + Seek> WorkbookParser<R> {
    /// すべてのシート名をワークブック内の順序で取得
    pub fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names().to_vec()
    }

    /// シートを行レコードの配列に変換（Simpleモード）
    ///
    /// 使用範囲の1行目を列見出しとし、2行目以降を`{見出し: 値}`形式の
    /// オブジェクトに変換します。空セルはキーごと省略し、すべて空の行はスキップします。
    pub fn sheet_records(&mut self, sheet_name: &str) -> Result<Vec<Value>, XlsxJsonError> {
        let range = self
            .workbook
            .worksheet_range(sheet_name)
            .map_err(|e| XlsxJsonError::Parse(e.into()))?;

        let mut rows = range.rows();
        let headers = match rows.next() {
            Some(header_row) => build_headers(header_row),
            None => return Ok(Vec::new()),
        };

        let mut records = Vec::new();
        for row in rows {
            let mut record = Map::new();
            let mut is_blank = true;
            for (header, cell) in headers.iter().zip(row.iter()) {
                if let Some(value) = record_value(cell) {
                    is_blank &= value.is_null();
                    record.insert(header.clone(), value);
                }
            }
            if !is_blank {
                records.push(Value::Object(record));
            }
        }

        Ok(records)
    }

    /// シートのセル・結合情報をスナップショットとして抽出（Fullモード）
    ///
    /// 非表示行・列はcalamineから取得できないため、呼び出し側で
    /// パッケージのXMLから補完します。
    pub fn sheet_snapshot(&mut self, sheet_name: &str) -> Result<SheetSnapshot, XlsxJsonError> {
        let range = self
            .workbook
            .worksheet_range(sheet_name)
            .map_err(|e| XlsxJsonError::Parse(e.into()))?;

        // 数式は1回だけ取得して全セルで再利用する
        let formula_range = self.workbook.worksheet_formula(sheet_name).ok();

        // 行優先順に並べるためBTreeMapを使用
        let mut cells: BTreeMap<CellCoord, CellSnapshot> = BTreeMap::new();

        if let Some((start_row, start_col)) = range.start() {
            for (row, col, cell) in range.used_cells() {
                let coord = CellCoord::new(start_row + row as u32, start_col + col as u32);
                if let Some((t, v)) = cell_type_and_value(cell) {
                    cells.insert(
                        coord,
                        CellSnapshot {
                            r: coord.to_a1_notation(),
                            t: t.to_string(),
                            v,
                            f: None,
                        },
                    );
                }
            }
        }

        if let Some(formula_range) = &formula_range {
            if let Some((start_row, start_col)) = formula_range.start() {
                for (row, col, formula) in formula_range.used_cells() {
                    let coord = CellCoord::new(start_row + row as u32, start_col + col as u32);
                    // キャッシュ値のない数式セルは型"z"（スタブ）として扱う
                    let cell = cells.entry(coord).or_insert_with(|| CellSnapshot {
                        r: coord.to_a1_notation(),
                        t: "z".to_string(),
                        v: Value::Null,
                        f: None,
                    });
                    cell.f = Some(formula.clone());
                }
            }
        }

        let used_range = used_range(cells.keys().copied());
        let merges = match self.workbook.worksheet_merge_cells(sheet_name) {
            Some(Ok(regions)) => regions
                .iter()
                .map(|dims| {
                    CellRange::new(
                        CellCoord::new(dims.start.0, dims.start.1),
                        CellCoord::new(dims.end.0, dims.end.1),
                    )
                    .to_a1_notation()
                })
                .collect(),
            Some(Err(e)) => return Err(XlsxJsonError::Parse(e.into())),
            None => Vec::new(),
        };

        Ok(SheetSnapshot {
            range: used_range.map(|r| r.to_a1_notation()),
            cells: cells.into_values().collect(),
            merges,
            hidden_rows: Vec::new(),
            hidden_cols: Vec::new(),
        })
    }
}

/// 見出し行から列名を生成
///
/// 空の見出しは`__EMPTY`、重複した見出しには`_1`, `_2`, ...の接尾辞を付けます。
/// 接尾辞付きの名前も使用済みとして記録し、既存の見出しと衝突しない番号まで進めます。
fn build_headers(row: &[Data]) -> Vec<String> {
    // 見出し -> 次に試す接尾辞の番号
    let mut seen: HashMap<String, usize> = HashMap::new();
    row.iter()
        .map(|cell| {
            let base = header_text(cell).unwrap_or_else(|| EMPTY_HEADER.to_string());
            let Some(&next) = seen.get(&base) else {
                seen.insert(base.clone(), 1);
                return base;
            };

            let mut counter = next;
            let name = loop {
                let candidate = format!("{}_{}", base, counter);
                counter += 1;
                if !seen.contains_key(&candidate) {
                    break candidate;
                }
            };
            seen.insert(base, counter);
            seen.insert(name.clone(), 1);
            name
        })
        .collect()
}

/// 見出しセルの表示文字列（空セルは`None`）
fn header_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) if s.is_empty() => None,
        Data::String(s) => Some(s.clone()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(number_to_text(*f)),
        Data::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::Error(e) => Some(e.to_string()),
        Data::DateTime(dt) => Some(number_to_text(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
        #[allow(unreachable_patterns)]
        _ => None,
    }
}

/// 行レコードに格納するセル値（省略するセルは`None`）
///
/// 日付セルはExcelのシリアル値（数値）として出力します。
/// エラーセルは省略し、`#NULL!`のみ`null`とします。
fn record_value(cell: &Data) -> Option<Value> {
    match cell {
        Data::Error(CellErrorType::Null) => Some(Value::Null),
        Data::Error(_) => None,
        _ => cell_type_and_value(cell).map(|(_, value)| value),
    }
}

/// セルの型記号とJSON値を取得（空セルは`None`）
fn cell_type_and_value(cell: &Data) -> Option<(&'static str, Value)> {
    match cell {
        Data::Empty => None,
        Data::Int(i) => Some(("n", Value::from(*i))),
        Data::Float(f) => Some(("n", number_to_json(*f))),
        Data::String(s) => Some(("s", Value::String(s.clone()))),
        Data::Bool(b) => Some(("b", Value::Bool(*b))),
        Data::Error(e) => Some(("e", Value::String(e.to_string()))),
        Data::DateTime(dt) => Some(("n", number_to_json(dt.as_f64()))),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(("d", Value::String(s.clone()))),
        #[allow(unreachable_patterns)]
        _ => None,
    }
}

/// セル座標の集合を囲む最小の範囲
fn used_range(coords: impl Iterator<Item = CellCoord>) -> Option<CellRange> {
    coords.fold(None, |acc: Option<CellRange>, coord| {
        Some(match acc {
            None => CellRange::new(coord, coord),
            Some(range) => CellRange::new(
                CellCoord::new(range.start.row.min(coord.row), range.start.col.min(coord.col)),
                CellCoord::new(range.end.row.max(coord.row), range.end.col.max(coord.col)),
            ),
        })
    })
}
