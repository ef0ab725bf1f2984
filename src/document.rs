//! Document Module
//!
//! JSON側のドキュメント構造を定義するモジュール。
//! Simpleモードは`serde_json::Map`（シート名 -> 行オブジェクト配列）をそのまま使用し、
//! Fullモードは本モジュールの`FullWorkbook`でシリアライズします。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Fullモードのドキュメントを判別するフィールド名
pub(crate) const BOOK_TYPE_KEY: &str = "bookType";

/// Fullモードで出力するワークブック形式
pub(crate) const BOOK_TYPE_XLSX: &str = "xlsx";

/// Fullモードのワークブックスナップショット
///
/// `Package`にはXLSXパッケージのすべてのパートが格納され、ワークブックへの
/// 再変換ではこれをそのまま使用します。`Sheets`などの他のフィールドは
/// パッケージから抽出した参照用のビューで、`Package`が無い場合のみ
/// ワークブック再構築の入力になります。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct FullWorkbook {
    #[serde(rename = "bookType")]
    pub book_type: String,

    #[serde(rename = "SheetNames", default)]
    pub sheet_names: Vec<String>,

    #[serde(rename = "Workbook", default)]
    pub workbook: WorkbookProps,

    #[serde(rename = "Sheets", default)]
    pub sheets: BTreeMap<String, SheetSnapshot>,

    #[serde(rename = "SharedStrings", default)]
    pub shared_strings: Vec<String>,

    #[serde(rename = "NumberFormats", default)]
    pub number_formats: BTreeMap<u32, String>,

    #[serde(rename = "Package", default, skip_serializing_if = "Vec::is_empty")]
    pub package: Vec<PackagePart>,
}

/// ワークブック全体の設定
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct WorkbookProps {
    /// 1904年エポックを使用するかどうか
    #[serde(default)]
    pub date1904: bool,
}

/// 1シート分のスナップショット
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct SheetSnapshot {
    /// 使用範囲（例: "A1:C10"）、空のシートでは`None`
    #[serde(rename = "!ref", default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,

    /// 行優先順のセル一覧
    #[serde(default)]
    pub cells: Vec<CellSnapshot>,

    /// 結合セル範囲（例: "A1:C1"）
    #[serde(rename = "!merges", default)]
    pub merges: Vec<String>,

    /// 非表示行（0始まり）
    #[serde(rename = "hiddenRows", default)]
    pub hidden_rows: Vec<u32>,

    /// 非表示列（0始まり）
    #[serde(rename = "hiddenCols", default)]
    pub hidden_cols: Vec<u32>,
}

/// 1セル分のスナップショット
///
/// `t`はセルの型で、`n`（数値）、`s`（文字列）、`b`（論理値）、
/// `e`（エラー）、`d`（ISO形式の日付・期間）のいずれかです。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct CellSnapshot {
    pub r: String,
    pub t: String,
    #[serde(default)]
    pub v: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub f: Option<String>,
}

/// XLSXパッケージ内の1パート
///
/// UTF-8として読めるパートは`text`に、それ以外は`base64`に格納します。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct PackagePart {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
}

/// セルの数値をJSONの数値に変換
///
/// 整数値は整数として出力します（`10.0` -> `10`）。NaNや無限大は`null`になります。
pub(crate) fn number_to_json(n: f64) -> Value {
    // 2^53未満の整数はf64で正確に表現できる
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

/// 数値を見出し用の文字列に変換（整数は小数点なし）
pub(crate) fn number_to_text(n: f64) -> String {
    match number_to_json(n) {
        Value::Number(num) => num.to_string(),
        _ => n.to_string(),
    }
}
