//! Security Module
//!
//! 入力ファイルとXLSXパッケージに対する制限値の定義と検証。
//! ワークブックの読み込み時と、JSONからのパッケージ再構築時の両方で使用します。

use crate::error::XlsxJsonError;

/// 入力ファイルの既定の上限: 2GB
const DEFAULT_MAX_INPUT_SIZE: u64 = 2 * 1024 * 1024 * 1024;

/// パッケージ内のパート数の既定の上限
const DEFAULT_MAX_PARTS: usize = 10_000;

/// 単一パートの展開後サイズの既定の上限: 100MB
const DEFAULT_MAX_PART_SIZE: u64 = 100 * 1024 * 1024;

/// 全パートの展開後サイズ合計の既定の上限: 1GB
const DEFAULT_MAX_TOTAL_SIZE: u64 = 1024 * 1024 * 1024;

/// 変換時の制限値
///
/// いずれの上限を超えても`XlsxJsonError::SecurityViolation`になります。
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SecurityConfig {
    /// 全パートの展開後サイズ合計（バイト）
    pub max_decompressed_size: u64,
    /// パッケージ内のパート数
    pub max_file_count: usize,
    /// 単一パートの展開後サイズ（バイト）
    pub max_file_size: u64,
    /// 変換元ファイルのサイズ（バイト）
    pub max_input_file_size: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_decompressed_size: DEFAULT_MAX_TOTAL_SIZE,
            max_file_count: DEFAULT_MAX_PARTS,
            max_file_size: DEFAULT_MAX_PART_SIZE,
            max_input_file_size: DEFAULT_MAX_INPUT_SIZE,
        }
    }
}

impl SecurityConfig {
    /// 変換元データのサイズを検証
    pub fn check_input_size(&self, len: u64) -> Result<(), XlsxJsonError> {
        if len > self.max_input_file_size {
            return Err(XlsxJsonError::SecurityViolation(format!(
                "Input file size exceeds maximum: {} bytes (max: {} bytes)",
                len, self.max_input_file_size
            )));
        }
        Ok(())
    }

    /// パッケージのパート数を検証
    pub fn check_part_count(&self, count: usize) -> Result<(), XlsxJsonError> {
        if count > self.max_file_count {
            return Err(XlsxJsonError::SecurityViolation(format!(
                "Package contains too many files: {} (max: {})",
                count, self.max_file_count
            )));
        }
        Ok(())
    }

    /// 展開後の単一パートのサイズを検証
    pub fn check_part_size(&self, name: &str, size: u64) -> Result<(), XlsxJsonError> {
        if size > self.max_file_size {
            return Err(XlsxJsonError::SecurityViolation(format!(
                "Part '{}' exceeds maximum size: {} bytes",
                name, self.max_file_size
            )));
        }
        Ok(())
    }

    /// 展開後のサイズ合計を検証
    pub fn check_total_size(&self, total: u64) -> Result<(), XlsxJsonError> {
        if total > self.max_decompressed_size {
            return Err(XlsxJsonError::SecurityViolation(format!(
                "Total decompressed size exceeds maximum: {} bytes (max: {} bytes)",
                total, self.max_decompressed_size
            )));
        }
        Ok(())
    }
}

/// パッケージパート名を検証する
///
/// 空の名前、絶対パス（`/xl/...`、`C:\...`）、`..`セグメント、
/// バックスラッシュを含む名前を拒否します。
pub(crate) fn validate_part_name(name: &str) -> Result<(), XlsxJsonError> {
    let reason = if name.is_empty() {
        "Empty name is not allowed"
    } else if name.starts_with('/') || has_drive_prefix(name) {
        "Absolute path is not allowed"
    } else if name.split('/').any(|segment| segment == "..") {
        "Path traversal detected"
    } else if name.contains('\\') {
        "Backslash is not allowed"
    } else {
        return Ok(());
    };

    Err(XlsxJsonError::SecurityViolation(format!(
        "{} in package part name: '{}'",
        reason, name
    )))
}

/// `C:`のようなドライブレターで始まるか
fn has_drive_prefix(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation(result: Result<(), XlsxJsonError>) -> String {
        match result {
            Err(XlsxJsonError::SecurityViolation(msg)) => msg,
            other => panic!("Expected SecurityViolation, got {:?}", other),
        }
    }

    #[test]
    fn test_part_names_accepted() {
        for name in [
            "[Content_Types].xml",
            "_rels/.rels",
            "xl/workbook.xml",
            "xl/worksheets/_rels/sheet1.xml.rels",
            "xl/media/image..1.png",
        ] {
            assert!(validate_part_name(name).is_ok(), "{}", name);
        }
    }

    #[test]
    fn test_part_names_rejected() {
        assert!(violation(validate_part_name("")).contains("Empty name"));
        assert!(violation(validate_part_name("/xl/workbook.xml")).contains("Absolute path"));
        assert!(violation(validate_part_name("C:\\Windows\\system32")).contains("Absolute path"));
        assert!(violation(validate_part_name("d:/data.xml")).contains("Absolute path"));
        assert!(violation(validate_part_name("xl/../../etc/passwd")).contains("Path traversal"));
        assert!(violation(validate_part_name("..")).contains("Path traversal"));
        assert!(violation(validate_part_name("xl\\workbook.xml")).contains("Backslash"));
    }

    #[test]
    fn test_limits() {
        let config = SecurityConfig {
            max_input_file_size: 10,
            max_file_count: 2,
            max_file_size: 5,
            max_decompressed_size: 8,
        };

        assert!(config.check_input_size(10).is_ok());
        assert!(violation(config.check_input_size(11)).contains("11 bytes"));
        assert!(config.check_part_count(2).is_ok());
        assert!(violation(config.check_part_count(3)).contains("too many files"));
        assert!(config.check_part_size("xl/a.xml", 5).is_ok());
        assert!(violation(config.check_part_size("xl/a.xml", 6)).contains("'xl/a.xml'"));
        assert!(config.check_total_size(8).is_ok());
        assert!(violation(config.check_total_size(9)).contains("Total decompressed size"));
    }
}
