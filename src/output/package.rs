//! Package Writer
//!
//! Fullモードのパッケージパートから、XLSXのZIPアーカイブを再構築します。

use std::collections::HashSet;
use std::io::{Cursor, Write};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

use crate::document::PackagePart;
use crate::error::XlsxJsonError;
use crate::security::{validate_part_name, SecurityConfig};

/// XLSXとして必須のパート
const REQUIRED_PARTS: [&str; 2] = ["[Content_Types].xml", "xl/workbook.xml"];

/// パッケージパートをドキュメント内の順序でZIPアーカイブに書き込む
///
/// パート名はパストラバーサル対策として検証し、重複や必須パートの欠落は
/// 設定エラーとして扱います。
pub(crate) fn write_package(
    parts: &[PackagePart],
    security_config: &SecurityConfig,
) -> Result<Vec<u8>, XlsxJsonError> {
    security_config.check_part_count(parts.len())?;

    let mut seen = HashSet::new();
    for part in parts {
        validate_part_name(&part.name)?;
        if !seen.insert(part.name.as_str()) {
            return Err(XlsxJsonError::Config(format!(
                "Duplicate package part '{}'",
                part.name
            )));
        }
    }
    for required in REQUIRED_PARTS {
        if !seen.contains(required) {
            return Err(XlsxJsonError::Config(format!(
                "Package is missing required part '{}'",
                required
            )));
        }
    }

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for part in parts {
        let content = decode_part(part)?;
        zip.start_file(part.name.as_str(), options)
            .map_err(|e| XlsxJsonError::Zip(format!("{}", e)))?;
        zip.write_all(&content)?;
    }

    let cursor = zip
        .finish()
        .map_err(|e| XlsxJsonError::Zip(format!("{}", e)))?;
    Ok(cursor.into_inner())
}

/// パートの内容をバイト列に戻す（`text`と`base64`のどちらか一方が必要）
fn decode_part(part: &PackagePart) -> Result<Vec<u8>, XlsxJsonError> {
    match (&part.text, &part.base64) {
        (Some(text), None) => Ok(text.as_bytes().to_vec()),
        (None, Some(encoded)) => STANDARD.decode(encoded).map_err(|e| {
            XlsxJsonError::Config(format!(
                "Package part '{}' has invalid base64 content: {}",
                part.name, e
            ))
        }),
        _ => Err(XlsxJsonError::Config(format!(
            "Package part '{}' must have exactly one of \"text\" or \"base64\"",
            part.name
        ))),
    }
}
