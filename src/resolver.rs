//! Path Resolver Module
//!
//! 変換元・出力先パスの解決、変換対象ファイルの列挙、出力パスの計算を行うモジュール。
//! 変換処理そのものは行わず、`Converter::run`が本モジュールの結果を使ってジョブを実行します。

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::api::ConversionDirection;
use crate::error::XlsxJsonError;
use crate::types::ResolvedPaths;

/// 変換対象として列挙されたファイル
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputSet {
    /// 変換するファイル（ファイル名順）
    pub inputs: Vec<PathBuf>,
    /// 拡張子が一致しない、または通常のファイルでないためスキップしたエントリ
    pub skipped: Vec<PathBuf>,
}

/// 変換元・出力先パスを解決する
///
/// # 引数
///
/// * `source` - 変換元のファイルまたはディレクトリ（相対パスはカレントディレクトリ基準）
/// * `destination` - 出力先。`None`または空の場合は変換元を含むディレクトリ。
///   相対パスは変換元を含むディレクトリを基準に解決します
///
/// # 戻り値
///
/// * `Ok(ResolvedPaths)` - 絶対パスの組。出力先が存在しない場合はディレクトリとして作成済み
/// * `Err(XlsxJsonError::SourceNotFound)` - 変換元が存在しない場合（出力先には触れない）
///
/// # 使用例
///
/// ```rust,no_run
/// use std::path::Path;
/// use xlsxjson::prepare_paths;
///
/// # fn main() -> Result<(), xlsxjson::XlsxJsonError> {
/// let paths = prepare_paths(Path::new("data/sales.xlsx"), Some(Path::new("out")))?;
/// // 出力先は data/out に解決される
/// assert!(paths.destination.ends_with("data/out"));
/// # Ok(())
/// # }
/// ```
pub fn prepare_paths(
    source: &Path,
    destination: Option<&Path>,
) -> Result<ResolvedPaths, XlsxJsonError> {
    let source = absolute(source)?;
    if !source.exists() {
        return Err(XlsxJsonError::SourceNotFound(source));
    }

    let base = source
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| source.clone());
    let destination = match destination {
        Some(dest) if !dest.as_os_str().is_empty() => normalize(&base.join(dest)),
        _ => base,
    };

    if !destination.exists() {
        fs::create_dir_all(&destination)?;
        log::info!("Created output directory: \"{}\"", destination.display());
    }

    Ok(ResolvedPaths {
        source,
        destination,
    })
}

/// 1件の入力ファイルに対する出力パスを計算する
///
/// * 出力先がディレクトリ: `出力先/入力ファイルのステム + 出力拡張子`
/// * 出力先がファイル: 出力先をそのまま使用（上書き）
/// * それ以外: `XlsxJsonError::UnsupportedDestination`
pub fn output_path_for(
    direction: ConversionDirection,
    input: &Path,
    destination: &Path,
) -> Result<PathBuf, XlsxJsonError> {
    if destination.is_dir() {
        let stem = input.file_stem().ok_or_else(|| {
            XlsxJsonError::Config(format!("'{}' has no file name", input.display()))
        })?;
        let mut file_name = stem.to_os_string();
        file_name.push(direction.output_extension());
        Ok(destination.join(file_name))
    } else if destination.is_file() {
        Ok(destination.to_path_buf())
    } else {
        Err(XlsxJsonError::UnsupportedDestination(
            destination.to_path_buf(),
        ))
    }
}

/// 変換対象のファイルを列挙する
///
/// 変換元がファイルの場合は拡張子に関係なくそのファイルのみを対象とします。
/// ディレクトリの場合は直下のエントリのみを名前順に走査し（再帰しない）、
/// 入力拡張子に一致する通常のファイルを対象とします。
///
/// # 戻り値
///
/// * `Err(XlsxJsonError::UnsupportedLayout)` - 変換元がディレクトリで出力先がディレクトリでない場合
pub fn collect_inputs(
    direction: ConversionDirection,
    paths: &ResolvedPaths,
) -> Result<InputSet, XlsxJsonError> {
    if !paths.source.is_dir() {
        return Ok(InputSet {
            inputs: vec![paths.source.clone()],
            skipped: Vec::new(),
        });
    }

    if !paths.destination.is_dir() {
        return Err(XlsxJsonError::UnsupportedLayout {
            input: paths.source.clone(),
            destination: paths.destination.clone(),
        });
    }

    let mut entries = fs::read_dir(&paths.source)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    entries.sort();

    let mut set = InputSet::default();
    for entry in entries {
        if entry.is_file() && has_extension(&entry, direction.input_extension()) {
            set.inputs.push(entry);
        } else {
            log::debug!("Skipping \"{}\"", entry.display());
            set.skipped.push(entry);
        }
    }

    Ok(set)
}

/// ファイル名が指定の拡張子（先頭のドットを含む）で終わるか
fn has_extension(path: &Path, extension: &str) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.len() > extension.len() && name.ends_with(extension))
}

/// カレントディレクトリを基準に絶対パスへ変換し、`.`と`..`を取り除く
fn absolute(path: &Path) -> Result<PathBuf, XlsxJsonError> {
    if path.is_absolute() {
        Ok(normalize(path))
    } else {
        Ok(normalize(&std::env::current_dir()?.join(path)))
    }
}

/// パスを字句的に正規化する（シンボリックリンクは解決しない）
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"").unwrap();
        path
    }

    #[test]
    fn test_prepare_paths_defaults_to_source_directory() {
        let temp = TempDir::new().unwrap();
        let source = touch(temp.path(), "sales.xlsx");

        let paths = prepare_paths(&source, None).unwrap();
        assert_eq!(paths.source, normalize(&source));
        assert_eq!(paths.destination, normalize(temp.path()));

        let paths = prepare_paths(&source, Some(Path::new(""))).unwrap();
        assert_eq!(paths.destination, normalize(temp.path()));
    }

    #[test]
    fn test_prepare_paths_relative_destination_is_created_beside_source() {
        let temp = TempDir::new().unwrap();
        let source = touch(temp.path(), "sales.xlsx");

        let paths = prepare_paths(&source, Some(Path::new("out/json"))).unwrap();
        assert_eq!(paths.destination, normalize(&temp.path().join("out/json")));
        assert!(paths.destination.is_dir());
    }

    #[test]
    fn test_prepare_paths_missing_source_leaves_destination_untouched() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("missing.xlsx");
        let destination = temp.path().join("out");

        match prepare_paths(&source, Some(&destination)) {
            Err(XlsxJsonError::SourceNotFound(path)) => assert!(path.ends_with("missing.xlsx")),
            other => panic!("Expected SourceNotFound, got {:?}", other),
        }
        assert!(!destination.exists());
    }

    #[test]
    fn test_output_path_for() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("report.v2.xlsx");

        let out = output_path_for(ConversionDirection::ToStructuredData, &input, temp.path()).unwrap();
        assert_eq!(out, temp.path().join("report.v2.json"));

        let existing = touch(temp.path(), "fixed.json");
        let out = output_path_for(ConversionDirection::ToStructuredData, &input, &existing).unwrap();
        assert_eq!(out, existing);

        let missing = temp.path().join("nowhere");
        assert!(matches!(
            output_path_for(ConversionDirection::ToWorkbook, &input, &missing),
            Err(XlsxJsonError::UnsupportedDestination(_))
        ));
    }

    #[test]
    fn test_collect_inputs_filters_and_sorts() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "b.xlsx");
        touch(temp.path(), "a.xlsx");
        touch(temp.path(), "notes.txt");
        touch(temp.path(), "data.json");
        fs::create_dir(temp.path().join("nested.xlsx")).unwrap();

        let paths = ResolvedPaths {
            source: temp.path().to_path_buf(),
            destination: temp.path().to_path_buf(),
        };
        let set = collect_inputs(ConversionDirection::ToStructuredData, &paths).unwrap();
        assert_eq!(
            set.inputs,
            vec![temp.path().join("a.xlsx"), temp.path().join("b.xlsx")]
        );
        assert_eq!(set.skipped.len(), 3);

        let set = collect_inputs(ConversionDirection::ToWorkbook, &paths).unwrap();
        assert_eq!(set.inputs, vec![temp.path().join("data.json")]);
    }

    #[test]
    fn test_collect_inputs_single_file_ignores_extension() {
        let temp = TempDir::new().unwrap();
        let source = touch(temp.path(), "legacy.dat");
        let paths = ResolvedPaths {
            source: source.clone(),
            destination: temp.path().to_path_buf(),
        };

        let set = collect_inputs(ConversionDirection::ToStructuredData, &paths).unwrap();
        assert_eq!(set.inputs, vec![source]);
        assert!(set.skipped.is_empty());
    }

    #[test]
    fn test_collect_inputs_rejects_directory_into_file() {
        let temp = TempDir::new().unwrap();
        let destination = touch(temp.path(), "single.json");
        let paths = ResolvedPaths {
            source: temp.path().to_path_buf(),
            destination,
        };

        assert!(matches!(
            collect_inputs(ConversionDirection::ToStructuredData, &paths),
            Err(XlsxJsonError::UnsupportedLayout { .. })
        ));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert!(has_extension(Path::new("/x/a.xlsx"), ".xlsx"));
        assert!(!has_extension(Path::new("/x/.xlsx"), ".xlsx"));
        assert!(!has_extension(Path::new("/x/a.XLSX"), ".xlsx"));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_output_extension_follows_direction(stem in "[a-zA-Z0-9_]{1,16}", to_json in any::<bool>()) {
                let direction = if to_json {
                    ConversionDirection::ToStructuredData
                } else {
                    ConversionDirection::ToWorkbook
                };
                let temp = TempDir::new().unwrap();
                let input = temp.path().join(format!("{}{}", stem, direction.input_extension()));

                let out = output_path_for(direction, &input, temp.path()).unwrap();
                let expected = format!("{}{}", stem, direction.output_extension());
                prop_assert_eq!(out.file_name().and_then(|n| n.to_str()), Some(expected.as_str()));
                prop_assert_eq!(out.parent(), Some(temp.path()));
            }
        }
    }
}
