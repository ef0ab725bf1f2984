//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。

use std::path::PathBuf;

use crate::error::XlsxJsonError;

/// セル座標（0始まり）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct CellCoord {
    pub row: u32,
    pub col: u32,
}

impl CellCoord {
    /// 新しい座標を生成
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// A1形式の文字列に変換（例: (0, 0) -> "A1"）
    #[allow(clippy::wrong_self_convention)]
    pub fn to_a1_notation(&self) -> String {
        let col_str = Self::col_index_to_letter(self.col);
        format!("{}{}", col_str, self.row + 1)
    }

    /// A1形式の文字列から座標を生成（例: "B3" -> (2, 1)）
    ///
    /// `$`による絶対参照は無視します。形式が不正な場合は`None`を返します。
    pub fn from_a1_notation(s: &str) -> Option<Self> {
        let s = s.replace('$', "");
        let split = s.find(|c: char| c.is_ascii_digit())?;
        let (letters, digits) = s.split_at(split);
        if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }

        // 列を数値に変換（A=0, B=1, ..., Z=25, AA=26, ...）
        let mut col: u32 = 0;
        for ch in letters.chars() {
            let val = (ch.to_ascii_uppercase() as u32) - ('A' as u32) + 1;
            col = col.checked_mul(26)?.checked_add(val)?;
        }

        // 行は1始まりなので0始まりに変換
        let row = digits.parse::<u32>().ok()?.checked_sub(1)?;

        Some(Self::new(row, col - 1))
    }

    /// 列インデックスを文字列に変換（0 -> "A", 25 -> "Z", 26 -> "AA"）
    fn col_index_to_letter(mut col: u32) -> String {
        let mut result = String::new();
        loop {
            let remainder = col % 26;
            result.insert(0, (b'A' + remainder as u8) as char);
            if col < 26 {
                break;
            }
            col = col / 26 - 1;
        }
        result
    }
}

/// セル範囲
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CellRange {
    pub start: CellCoord,
    pub end: CellCoord,
}

impl CellRange {
    /// 新しい範囲を生成
    pub fn new(start: CellCoord, end: CellCoord) -> Self {
        Self { start, end }
    }

    /// A1形式の範囲文字列に変換（例: "A1:C3"、単一セルの場合は "A1"）
    #[allow(clippy::wrong_self_convention)]
    pub fn to_a1_notation(&self) -> String {
        if self.start == self.end {
            self.start.to_a1_notation()
        } else {
            format!(
                "{}:{}",
                self.start.to_a1_notation(),
                self.end.to_a1_notation()
            )
        }
    }

    /// A1形式の範囲文字列から範囲を生成（例: "A1:C3"、"B2"）
    pub fn from_a1_notation(s: &str) -> Option<Self> {
        match s.split_once(':') {
            Some((start, end)) => Some(Self::new(
                CellCoord::from_a1_notation(start)?,
                CellCoord::from_a1_notation(end)?,
            )),
            None => {
                let coord = CellCoord::from_a1_notation(s)?;
                Some(Self::new(coord, coord))
            }
        }
    }
}

/// 解決済みの変換元・出力先パスの組（いずれも絶対パス）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    /// 変換元（ファイルまたはディレクトリ）
    pub source: PathBuf,
    /// 出力先（ファイルまたはディレクトリ、存在が保証されている）
    pub destination: PathBuf,
}

/// 1件の変換ジョブ（入力ファイルと出力ファイルの組）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileJob {
    /// 入力ファイルのパス
    pub input: PathBuf,
    /// 出力ファイルのパス
    pub output: PathBuf,
}

impl FileJob {
    /// 新しいジョブを生成
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }
}

/// 失敗したジョブ
#[derive(Debug)]
pub struct JobFailure {
    /// 入力ファイルのパス
    pub input: PathBuf,
    /// 失敗の原因
    pub error: XlsxJsonError,
}

/// 1回の実行結果
///
/// ジョブは実行順に記録されます。
#[derive(Debug, Default)]
pub struct BatchReport {
    /// 変換に成功したジョブ
    pub converted: Vec<FileJob>,
    /// 変換に失敗したジョブ
    pub failed: Vec<JobFailure>,
    /// 変換対象外としてスキップしたディレクトリエントリ
    pub skipped: Vec<PathBuf>,
}

impl BatchReport {
    /// すべてのジョブが成功したか（ジョブが0件の場合も`true`）
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// 実行したジョブの件数
    pub fn total(&self) -> usize {
        self.converted.len() + self.failed.len()
    }
}
