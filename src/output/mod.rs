//! Output Module
//!
//! JSONドキュメントからXLSXワークブックを生成するモジュール。
//! ドキュメントの形に応じて書き込み戦略を選択します。

mod package;
mod records;
mod snapshot;

use serde_json::{Map, Value};

use crate::api::ConversionMode;
use crate::document::{FullWorkbook, BOOK_TYPE_KEY, BOOK_TYPE_XLSX};
use crate::error::XlsxJsonError;
use crate::security::SecurityConfig;

/// ワークブックの書き込み戦略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkbookWriter {
    /// シート名 -> 行オブジェクト配列（Simpleモード）
    Records,
    /// パッケージパートからZIPを再構築（Fullモード、無損失）
    Package,
    /// セルスナップショットから再構築（Fullモード、`Package`なし）
    Snapshot,
}

impl WorkbookWriter {
    /// 変換モードとドキュメントの内容から書き込み戦略を選択
    ///
    /// # 戻り値
    ///
    /// * `Err(XlsxJsonError::ModeMismatch)` - ドキュメントが別のモードで保存されている場合
    pub fn select(mode: ConversionMode, document: &Map<String, Value>) -> Result<Self, XlsxJsonError> {
        let is_full_document = document.contains_key(BOOK_TYPE_KEY);
        match (mode, is_full_document) {
            (ConversionMode::Simple, false) => Ok(WorkbookWriter::Records),
            (ConversionMode::Simple, true) => Err(XlsxJsonError::ModeMismatch {
                expected: ConversionMode::Simple,
                found: ConversionMode::Full,
            }),
            (ConversionMode::Full, false) => Err(XlsxJsonError::ModeMismatch {
                expected: ConversionMode::Full,
                found: ConversionMode::Simple,
            }),
            (ConversionMode::Full, true) => {
                let has_package = document
                    .get("Package")
                    .and_then(Value::as_array)
                    .is_some_and(|parts| !parts.is_empty());
                Ok(if has_package {
                    WorkbookWriter::Package
                } else {
                    WorkbookWriter::Snapshot
                })
            }
        }
    }
}

/// JSONドキュメントをXLSXのバイト列に変換
///
/// # 引数
///
/// * `mode` - 変換モード
/// * `document` - トップレベルのJSONオブジェクト
/// * `security_config` - パッケージ再構築時の制限
pub(crate) fn write_workbook(
    mode: ConversionMode,
    document: Map<String, Value>,
    security_config: &SecurityConfig,
) -> Result<Vec<u8>, XlsxJsonError> {
    let writer = WorkbookWriter::select(mode, &document)?;
    log::debug!("Writing workbook with {:?} strategy", writer);

    match writer {
        WorkbookWriter::Records => records::write_records(&document),
        WorkbookWriter::Package | WorkbookWriter::Snapshot => {
            let workbook: FullWorkbook = serde_json::from_value(Value::Object(document))?;
            if workbook.book_type != BOOK_TYPE_XLSX {
                return Err(XlsxJsonError::Config(format!(
                    "Unsupported bookType '{}' (only \"{}\" can be written)",
                    workbook.book_type, BOOK_TYPE_XLSX
                )));
            }
            if writer == WorkbookWriter::Package {
                package::write_package(&workbook.package, security_config)
            } else {
                snapshot::write_snapshot(&workbook)
            }
        }
    }
}
