//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。

use std::path::PathBuf;

use thiserror::Error;

use crate::api::ConversionMode;

/// xlsxjsonクレート全体で使用するエラー型
///
/// パス解決、ファイルの読み書き、ワークブックとJSONの相互変換中に発生する
/// すべてのエラーを統一的に扱うために使用されます。
///
/// # エラーの分類
///
/// - 致命的: `SourceNotFound`, `UnsupportedLayout`（ジョブは1件も実行されない）
/// - ジョブ単位: `Io`, `Parse`, `Json`, `Write`, `Zip`, `ModeMismatch`,
///   `UnsupportedDestination` など（該当ジョブのみ失敗し、残りは継続）
/// - 引数エラー: `InvalidArgument`（変換は実行されない）
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxjson::XlsxJsonError;
/// use std::fs::File;
///
/// fn open_input(path: &str) -> Result<File, XlsxJsonError> {
///     let file = File::open(path)?;  // Ioエラーが自動的に変換される
///     Ok(file)
/// }
/// ```
#[derive(Error, Debug)]
pub enum XlsxJsonError {
    /// I/O操作中に発生したエラー
    ///
    /// `#[from]`属性により、`std::io::Error`から自動的に変換されます。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Excelファイルの解析中に発生したエラー（calamine由来）
    #[error("Failed to parse Excel file: {0}")]
    Parse(#[from] calamine::Error),

    /// JSONの解析・生成中に発生したエラー
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// ワークブックの書き込み中に発生したエラー（rust_xlsxwriter由来）
    #[error("Failed to write Excel file: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    /// UTF-8文字列の変換エラー
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// 数値の解析エラー
    #[error("Number parse error: {0}")]
    ParseInt(#[from] std::num::ParseIntError),

    /// ZIPアーカイブの読み書きエラー
    #[error("ZIP archive error: {0}")]
    Zip(String),

    /// XMLの解析エラー
    #[error("XML parse error: {0}")]
    Xml(String),

    /// 設定の検証、または入力ドキュメントの構造検証に失敗したエラー
    ///
    /// # 例
    ///
    /// ```rust,no_run
    /// use xlsxjson::{ConverterBuilder, XlsxJsonError};
    ///
    /// let result = ConverterBuilder::new()
    ///     .with_max_input_size(0)  // 無効な上限
    ///     .build();
    ///
    /// match result {
    ///     Err(XlsxJsonError::Config(msg)) => {
    ///         println!("設定エラー: {}", msg);
    ///     }
    ///     _ => {}
    /// }
    /// ```
    #[error("Configuration error: {0}")]
    Config(String),

    /// 変換方向・変換モードの指定が不正
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// 変換元のパスが存在しない（致命的エラー）
    #[error("Cannot access file {}. Please check the file path.", .0.display())]
    SourceNotFound(PathBuf),

    /// 出力先がファイルでもディレクトリでもない
    #[error("{} is neither a file nor a directory.", .0.display())]
    UnsupportedDestination(PathBuf),

    /// サポートされていない入出力の組み合わせ
    ///
    /// 例: 変換元がディレクトリで、出力先が既存のファイルの場合。
    #[error(
        "Unsupported layout: cannot convert '{}' into '{}' (a directory source needs a directory destination)",
        .input.display(),
        .destination.display()
    )]
    UnsupportedLayout {
        /// 変換元のパス
        input: PathBuf,
        /// 出力先のパス
        destination: PathBuf,
    },

    /// JSONデータが別の変換モードで保存されている
    ///
    /// # 例
    ///
    /// ```rust,no_run
    /// use xlsxjson::{ConversionMode, XlsxJsonError};
    ///
    /// let error = XlsxJsonError::ModeMismatch {
    ///     expected: ConversionMode::Simple,
    ///     found: ConversionMode::Full,
    /// };
    ///
    /// println!("{}", error);
    /// // 出力: "This JSON data was saved in full mode. Use \"full\" mode to convert data."
    /// ```
    #[error("This JSON data was saved in {found} mode. Use \"{found}\" mode to convert data.")]
    ModeMismatch {
        /// 指定された変換モード
        expected: ConversionMode,
        /// JSONデータから検出された変換モード
        found: ConversionMode,
    },

    /// セキュリティ制限に違反したエラー
    ///
    /// 入力ファイルサイズの上限、ZIP bomb対策、パストラバーサル対策などの
    /// 制限に違反した場合に発生します。
    #[error("Security violation: {0}")]
    SecurityViolation(String),
}
