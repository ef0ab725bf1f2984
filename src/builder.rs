//! Builder Module
//!
//! Fluent Builder APIを提供し、`Converter`インスタンスを段階的に構築する。
//! `Converter`は1回の実行に必要な設定（変換方向、変換モード、制限値）を保持し、
//! バッチ変換の実行と結果の集計を行います。

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use serde_json::{Map, Value};

use crate::api::{ConversionDirection, ConversionMode};
use crate::document::{FullWorkbook, WorkbookProps, BOOK_TYPE_XLSX};
use crate::error::XlsxJsonError;
use crate::parser::{PackageReader, WorkbookParser};
use crate::resolver::{collect_inputs, output_path_for, prepare_paths};
use crate::security::SecurityConfig;
use crate::types::{BatchReport, FileJob, JobFailure};

/// 変換処理の設定を保持する内部構造体
#[derive(Debug, Clone)]
pub(crate) struct ConversionConfig {
    /// 変換方向
    pub direction: ConversionDirection,

    /// 変換モード
    pub mode: ConversionMode,

    /// セキュリティ制限
    pub security: SecurityConfig,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            direction: ConversionDirection::ToStructuredData,
            mode: ConversionMode::Simple,
            security: SecurityConfig::default(),
        }
    }
}

/// Fluent Builder APIを提供する構造体
///
/// `Converter`インスタンスを段階的に構築するためのビルダーです。
/// すべての設定項目にデフォルト値が設定されており、必要な設定のみをオーバーライドできます。
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxjson::{ConversionDirection, ConversionMode, ConverterBuilder};
///
/// # fn main() -> Result<(), xlsxjson::XlsxJsonError> {
/// let converter = ConverterBuilder::new()
///     .with_direction(ConversionDirection::ToWorkbook)
///     .with_mode(ConversionMode::Full)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConverterBuilder {
    /// 内部設定（構築中）
    config: ConversionConfig,
}

impl Default for ConverterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConverterBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - 変換方向: ワークブック -> JSON（`convertexcel`）
    /// - 変換モード: Simple
    /// - 入力ファイルの最大サイズ: 2GB
    pub fn new() -> Self {
        Self {
            config: ConversionConfig::default(),
        }
    }

    /// 変換方向を指定する
    ///
    /// # 引数
    ///
    /// * `direction: ConversionDirection`: 変換方向
    pub fn with_direction(mut self, direction: ConversionDirection) -> Self {
        self.config.direction = direction;
        self
    }

    /// 変換モードを指定する
    ///
    /// # 引数
    ///
    /// * `mode: ConversionMode`: 変換モード
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use xlsxjson::{ConversionMode, ConverterBuilder};
    ///
    /// let builder = ConverterBuilder::new()
    ///     .with_mode(ConversionMode::Full);
    /// ```
    pub fn with_mode(mut self, mode: ConversionMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// 入力ファイルの最大サイズ（バイト）を指定する
    ///
    /// 上限を超える入力は`XlsxJsonError::SecurityViolation`で失敗します。
    pub fn with_max_input_size(mut self, bytes: u64) -> Self {
        self.config.security.max_input_file_size = bytes;
        self
    }

    /// 設定を検証し、`Converter`インスタンスを生成する
    ///
    /// # 戻り値
    ///
    /// * `Ok(Converter)`: 設定が有効な場合、Converterインスタンス
    /// * `Err(XlsxJsonError::Config)`: 設定が無効な場合（例: 入力サイズの上限が0）
    pub fn build(self) -> Result<Converter, XlsxJsonError> {
        if self.config.security.max_input_file_size == 0 {
            return Err(XlsxJsonError::Config(
                "Maximum input size must be greater than 0".to_string(),
            ));
        }

        Ok(Converter::new(self.config))
    }
}

/// 変換処理のファサード
///
/// `ConverterBuilder`で構築された設定に基づいて、単一の入力の変換
/// （`convert`、`convert_file`）またはパス単位のバッチ変換（`run`）を実行します。
///
/// # 使用例
///
/// ```rust,no_run
/// use std::path::Path;
/// use xlsxjson::{ConversionDirection, ConverterBuilder};
///
/// # fn main() -> Result<(), xlsxjson::XlsxJsonError> {
/// let converter = ConverterBuilder::new()
///     .with_direction(ConversionDirection::ToStructuredData)
///     .build()?;
/// let report = converter.run(Path::new("reports"), Some(Path::new("json")))?;
/// println!("{} converted, {} failed", report.converted.len(), report.failed.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Converter {
    /// 変換設定
    config: ConversionConfig,
}

impl Converter {
    pub(crate) fn new(config: ConversionConfig) -> Self {
        Self { config }
    }

    /// 変換方向
    pub fn direction(&self) -> ConversionDirection {
        self.config.direction
    }

    /// 変換モード
    pub fn mode(&self) -> ConversionMode {
        self.config.mode
    }

    /// 変換元のパスに含まれるファイルを順に変換する
    ///
    /// # 引数
    ///
    /// * `source` - 変換元のファイルまたはディレクトリ
    /// * `destination` - 出力先（`None`の場合は変換元と同じディレクトリ）
    ///
    /// # 戻り値
    ///
    /// * `Ok(BatchReport)` - 実行結果。個々のジョブの失敗はここに記録され、残りのジョブは継続します
    /// * `Err(XlsxJsonError::SourceNotFound)` - 変換元が存在しない場合
    /// * `Err(XlsxJsonError::UnsupportedLayout)` - ディレクトリをファイルに変換しようとした場合
    ///
    /// # 処理フロー
    ///
    /// 1. パスの解決（必要なら出力先ディレクトリを作成）
    /// 2. 変換対象ファイルの列挙
    /// 3. 各ファイルについて出力パスを計算し、変換（逐次）
    pub fn run(
        &self,
        source: &Path,
        destination: Option<&Path>,
    ) -> Result<BatchReport, XlsxJsonError> {
        let paths = prepare_paths(source, destination)?;
        let inputs = collect_inputs(self.config.direction, &paths)?;

        let mut report = BatchReport {
            skipped: inputs.skipped,
            ..BatchReport::default()
        };

        for input in inputs.inputs {
            let result = output_path_for(self.config.direction, &input, &paths.destination)
                .map(|output| FileJob::new(&input, output))
                .and_then(|job| self.convert_file(&job).map(|()| job));

            match result {
                Ok(job) => report.converted.push(job),
                Err(error) => {
                    log::error!("Failed to convert \"{}\": {}", input.display(), error);
                    report.failed.push(JobFailure { input, error });
                }
            }
        }

        Ok(report)
    }

    /// 1件のジョブを実行する
    ///
    /// 入力ファイル全体を読み込んで変換し、成功した場合のみ出力ファイルを書き込みます。
    pub fn convert_file(&self, job: &FileJob) -> Result<(), XlsxJsonError> {
        let size = fs::metadata(&job.input)?.len();
        self.config.security.check_input_size(size)?;

        let data = fs::read(&job.input)?;
        let converted = self.transcode(data)?;
        fs::write(&job.output, converted)?;

        match self.config.direction {
            ConversionDirection::ToStructuredData => log::info!(
                "Excel data has been successfully converted and saved to: {}",
                job.output.display()
            ),
            ConversionDirection::ToWorkbook => log::info!(
                "JSON data has been successfully converted and saved to: {}",
                job.output.display()
            ),
        }

        Ok(())
    }

    /// リーダーから入力を読み込み、変換結果をライターに書き込む
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use std::fs::File;
    /// use xlsxjson::ConverterBuilder;
    ///
    /// # fn main() -> Result<(), xlsxjson::XlsxJsonError> {
    /// let converter = ConverterBuilder::new().build()?;
    /// let input = File::open("sales.xlsx")?;
    /// let mut json = Vec::new();
    /// converter.convert(input, &mut json)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn convert<R: Read, W: Write>(&self, input: R, mut output: W) -> Result<(), XlsxJsonError> {
        // 上限+1バイトまで読めば上限超過を判定できる
        let limit = self.config.security.max_input_file_size;
        let mut buffer = Vec::new();
        input.take(limit.saturating_add(1)).read_to_end(&mut buffer)?;
        self.config.security.check_input_size(buffer.len() as u64)?;

        let converted = self.transcode(buffer)?;
        output.write_all(&converted)?;
        output.flush()?;
        Ok(())
    }

    fn transcode(&self, data: Vec<u8>) -> Result<Vec<u8>, XlsxJsonError> {
        match self.config.direction {
            ConversionDirection::ToStructuredData => self.workbook_to_json(data),
            ConversionDirection::ToWorkbook => self.json_to_workbook(&data),
        }
    }

    /// ワークブックをJSON（2スペースインデント）に変換
    ///
    /// パッケージの検証（ファイル数、展開サイズ、パート名）はどちらのモードでも行います。
    fn workbook_to_json(&self, data: Vec<u8>) -> Result<Vec<u8>, XlsxJsonError> {
        let package = PackageReader::new(&data, &self.config.security)?;

        match self.config.mode {
            ConversionMode::Simple => {
                let mut parser = WorkbookParser::open(data)?;
                let mut document = Map::new();
                for name in parser.sheet_names() {
                    let records = parser.sheet_records(&name)?;
                    document.insert(name, Value::Array(records));
                }
                Ok(serde_json::to_vec_pretty(&Value::Object(document))?)
            }
            ConversionMode::Full => {
                let sheet_parts: HashMap<String, String> =
                    package.sheet_parts()?.into_iter().collect();

                let mut parser = WorkbookParser::open(data)?;
                let sheet_names = parser.sheet_names();
                let mut sheets = BTreeMap::new();
                for name in &sheet_names {
                    let mut snapshot = parser.sheet_snapshot(name)?;
                    if let Some(part) = sheet_parts.get(name) {
                        let (hidden_rows, hidden_cols) = package.hidden_rows_and_cols(part)?;
                        snapshot.hidden_rows = hidden_rows;
                        snapshot.hidden_cols = hidden_cols;
                    }
                    sheets.insert(name.clone(), snapshot);
                }

                let workbook = FullWorkbook {
                    book_type: BOOK_TYPE_XLSX.to_string(),
                    sheet_names,
                    workbook: WorkbookProps {
                        date1904: package.is_1904()?,
                    },
                    sheets,
                    shared_strings: package.shared_strings()?,
                    number_formats: package.number_formats()?,
                    package: package.package_parts(),
                };
                Ok(serde_json::to_vec_pretty(&workbook)?)
            }
        }
    }

    /// JSONをワークブックに変換
    fn json_to_workbook(&self, data: &[u8]) -> Result<Vec<u8>, XlsxJsonError> {
        let text = std::str::from_utf8(data)?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let Value::Object(document) = serde_json::from_str::<Value>(text)? else {
            return Err(XlsxJsonError::Config(
                "JSON data must be an object keyed by sheet name".to_string(),
            ));
        };

        crate::output::write_workbook(self.config.mode, document, &self.config.security)
    }
}
