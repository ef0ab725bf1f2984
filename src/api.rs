//! Public API Types
//!
//! 公開APIで使用する列挙型を定義するモジュール。

use std::fmt;
use std::str::FromStr;

use crate::error::XlsxJsonError;

/// 変換方向
///
/// どちらの変換関数を使用するか、どの拡張子を入力・出力として扱うかを決定します。
///
/// | 方向 | CLI表記 | 入力 | 出力 |
/// | ---- | ------- | ---- | ---- |
/// | `ToStructuredData` | `convertexcel` | `.xlsx` | `.json` |
/// | `ToWorkbook` | `convertjson` | `.json` | `.xlsx` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversionDirection {
    /// ワークブック（XLSX）からJSONへ変換
    ToStructuredData,

    /// JSONからワークブック（XLSX）へ変換
    ToWorkbook,
}

impl ConversionDirection {
    /// 変換対象として扱う入力ファイルの拡張子（先頭のドットを含む）
    pub fn input_extension(self) -> &'static str {
        match self {
            ConversionDirection::ToStructuredData => ".xlsx",
            ConversionDirection::ToWorkbook => ".json",
        }
    }

    /// 出力ファイルの拡張子（先頭のドットを含む）
    pub fn output_extension(self) -> &'static str {
        match self {
            ConversionDirection::ToStructuredData => ".json",
            ConversionDirection::ToWorkbook => ".xlsx",
        }
    }

    /// CLIでの表記
    pub fn as_str(self) -> &'static str {
        match self {
            ConversionDirection::ToStructuredData => "convertexcel",
            ConversionDirection::ToWorkbook => "convertjson",
        }
    }
}

impl fmt::Display for ConversionDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversionDirection {
    type Err = XlsxJsonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "convertexcel" => Ok(ConversionDirection::ToStructuredData),
            "convertjson" => Ok(ConversionDirection::ToWorkbook),
            other => Err(XlsxJsonError::InvalidArgument(format!(
                "Unknown conversion direction '{}'. Exists only \"convertexcel\" and \"convertjson\" directions.",
                other
            ))),
        }
    }
}

/// 変換モード
///
/// ワークブックとJSONの対応付けの粒度を指定します。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversionMode {
    /// シートごとに行オブジェクトの配列として表現（デフォルト）
    ///
    /// 各シートの1行目を列見出しとして扱い、2行目以降を
    /// `{見出し: 値}`形式のオブジェクトに変換します。書式情報は失われます。
    /// 空セルとエラーセルは省略し、`#NULL!`のみ`null`として出力します。
    ///
    /// # 出力例
    ///
    /// ```json
    /// {
    ///   "Q1": [
    ///     { "name": "A", "amount": 10 },
    ///     { "name": "B", "amount": 20 }
    ///   ]
    /// }
    /// ```
    Simple,

    /// ワークブック全体のスナップショットとして表現
    ///
    /// シート名、セル（値・数式）、結合セル、非表示行・列、共有文字列、
    /// 数値書式に加えて、XLSXパッケージのすべてのパートを保持します。
    /// `bookType`フィールドを判別子として持ち、往復変換で内容が失われません。
    Full,
}

impl ConversionMode {
    /// CLIでの表記
    pub fn as_str(self) -> &'static str {
        match self {
            ConversionMode::Simple => "simple",
            ConversionMode::Full => "full",
        }
    }
}

impl fmt::Display for ConversionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversionMode {
    type Err = XlsxJsonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(ConversionMode::Simple),
            "full" => Ok(ConversionMode::Full),
            other => Err(XlsxJsonError::InvalidArgument(format!(
                "Unknown conversion mode '{}'. Exists only \"simple\" and \"full\" conversion mode, check command.",
                other
            ))),
        }
    }
}
