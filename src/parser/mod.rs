//! Parser Module
//!
//! XLSXファイルの読み込み。セルの値はcalamineで、パッケージ構造は
//! ZIPアーカイブとXMLから直接取得します。

mod package;
mod workbook;

pub(crate) use package::PackageReader;
pub(crate) use workbook::WorkbookParser;
