//! XLSX Package Reader Module
//!
//! XLSXファイル（ZIPアーカイブ）のパートを直接読み込むモジュール。
//! Fullモードでは、パッケージの全パートをそのまま保持するとともに、
//! calamineで取得できない情報（シートとパートの対応、共有文字列、
//! 数値書式、非表示行・列、1904年エポック）をXMLから抽出します。

use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

use crate::document::PackagePart;
use crate::error::XlsxJsonError;
use crate::security::{validate_part_name, SecurityConfig};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const STYLES_PART: &str = "xl/styles.xml";

/// ワークシートの最大列数（XFD列）
const MAX_COLUMNS: u32 = 16_384;

/// XLSXパッケージリーダー
///
/// アーカイブ内の順序でパート名と内容を保持します。
#[derive(Debug, Clone)]
pub(crate) struct PackageReader {
    parts: Vec<(String, Vec<u8>)>,
}

impl PackageReader {
    /// XLSXファイル（ZIPアーカイブ）のすべてのパートを読み込む
    ///
    /// ファイル数、パートごとのサイズ、展開後の合計サイズ、パート名を検証します。
    pub fn new(data: &[u8], security_config: &SecurityConfig) -> Result<Self, XlsxJsonError> {
        let mut archive =
            ZipArchive::new(Cursor::new(data)).map_err(|e| XlsxJsonError::Zip(format!("{}", e)))?;

        security_config.check_part_count(archive.len())?;

        let mut parts = Vec::with_capacity(archive.len());
        let mut total_decompressed_size = 0u64;
        for i in 0..archive.len() {
            let file = archive
                .by_index(i)
                .map_err(|e| XlsxJsonError::Zip(format!("{}", e)))?;
            if file.is_dir() {
                continue;
            }

            let name = file.name().to_string();
            validate_part_name(&name)?;

            // 宣言サイズを信用せず、上限+1バイトまでしか展開しない
            let mut content = Vec::new();
            file.take(security_config.max_file_size + 1)
                .read_to_end(&mut content)?;
            security_config.check_part_size(&name, content.len() as u64)?;

            total_decompressed_size += content.len() as u64;
            security_config.check_total_size(total_decompressed_size)?;

            parts.push((name, content));
        }

        Ok(Self { parts })
    }

    /// パート名から内容を取得
    fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|(part_name, _)| part_name == name)
            .map(|(_, content)| content.as_slice())
    }

    /// すべてのパートをJSON用の表現に変換
    ///
    /// UTF-8として読めるパートはテキスト、それ以外はBase64で格納します。
    pub fn package_parts(&self) -> Vec<PackagePart> {
        self.parts
            .iter()
            .map(|(name, content)| match std::str::from_utf8(content) {
                Ok(text) => PackagePart {
                    name: name.clone(),
                    text: Some(text.to_string()),
                    base64: None,
                },
                Err(_) => PackagePart {
                    name: name.clone(),
                    text: None,
                    base64: Some(STANDARD.encode(content)),
                },
            })
            .collect()
    }

    /// `<workbookPr date1904="1"/>` を解析し、1904年エポックフラグを取得
    pub fn is_1904(&self) -> Result<bool, XlsxJsonError> {
        let Some(xml) = self.part(WORKBOOK_PART) else {
            return Ok(false);
        };

        let mut reader = Reader::from_reader(xml);
        reader.trim_text(true);

        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                    if e.local_name().as_ref() == b"workbookPr" {
                        if let Some(value) = attribute(&e, b"date1904")? {
                            return Ok(value == "1" || value == "true");
                        }
                        return Ok(false);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxJsonError::Xml(e.to_string())),
                _ => {}
            }
            buf.clear();
        }

        Ok(false)
    }

    /// シート名とワークシートパートの対応を取得（ワークブック内の順序）
    ///
    /// `xl/workbook.xml`の`<sheet name r:id>`と`xl/_rels/workbook.xml.rels`の
    /// リレーションシップを突き合わせます。
    pub fn sheet_parts(&self) -> Result<Vec<(String, String)>, XlsxJsonError> {
        let Some(xml) = self.part(WORKBOOK_PART) else {
            return Ok(Vec::new());
        };
        let relationships = match self.part(WORKBOOK_RELS_PART) {
            Some(rels) => parse_relationships(rels)?,
            None => HashMap::new(),
        };

        let mut reader = Reader::from_reader(xml);
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut sheets = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"sheet" => {
                    let name = attribute(&e, b"name")?;
                    let rel_id = attribute(&e, b"id")?;
                    if let (Some(name), Some(rel_id)) = (name, rel_id) {
                        if let Some(target) = relationships.get(&rel_id) {
                            sheets.push((name, resolve_target("xl", target)));
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxJsonError::Xml(e.to_string())),
                _ => {}
            }
            buf.clear();
        }

        Ok(sheets)
    }

    /// `xl/sharedStrings.xml`を解析し、共有文字列テーブルをプレーンテキストで取得
    ///
    /// リッチテキストの各ランは連結し、ふりがな（`<rPh>`）は除外します。
    pub fn shared_strings(&self) -> Result<Vec<String>, XlsxJsonError> {
        let Some(xml) = self.part(SHARED_STRINGS_PART) else {
            return Ok(Vec::new());
        };

        // 空白は意味を持つためtrimしない
        let mut reader = Reader::from_reader(xml);

        let mut buf = Vec::new();
        let mut strings = Vec::new();
        let mut current = String::new();
        let mut in_si = false;
        let mut in_t = false;
        let mut in_phonetic = false;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.local_name().as_ref() {
                    b"si" => {
                        in_si = true;
                        current.clear();
                    }
                    b"rPh" if in_si => in_phonetic = true,
                    b"t" if in_si && !in_phonetic => in_t = true,
                    _ => {}
                },
                Ok(Event::Empty(e)) => {
                    // <si/> は空文字列
                    if e.local_name().as_ref() == b"si" {
                        strings.push(String::new());
                    }
                }
                Ok(Event::Text(e)) if in_t => {
                    let text = e
                        .unescape()
                        .map_err(|e| XlsxJsonError::Xml(format!("XML text error: {}", e)))?;
                    current.push_str(&text);
                }
                Ok(Event::CData(e)) if in_t => {
                    current.push_str(std::str::from_utf8(&e)?);
                }
                Ok(Event::End(e)) => match e.local_name().as_ref() {
                    b"si" => {
                        strings.push(std::mem::take(&mut current));
                        in_si = false;
                    }
                    b"rPh" => in_phonetic = false,
                    b"t" => in_t = false,
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxJsonError::Xml(e.to_string())),
                _ => {}
            }
            buf.clear();
        }

        Ok(strings)
    }

    /// `xl/styles.xml`の`<numFmts>`を解析し、カスタム数値書式を取得
    ///
    /// ビルトイン書式（ID 0-163）は含みません。
    pub fn number_formats(&self) -> Result<BTreeMap<u32, String>, XlsxJsonError> {
        let mut num_formats = BTreeMap::new();
        let Some(xml) = self.part(STYLES_PART) else {
            return Ok(num_formats);
        };

        let mut reader = Reader::from_reader(xml);
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut in_num_fmts = false;
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) if e.local_name().as_ref() == b"numFmts" => {
                    in_num_fmts = true;
                }
                Ok(Event::Start(e)) | Ok(Event::Empty(e))
                    if in_num_fmts && e.local_name().as_ref() == b"numFmt" =>
                {
                    // <numFmt numFmtId="165" formatCode="0.000"/>
                    let id = attribute(&e, b"numFmtId")?;
                    let code = attribute(&e, b"formatCode")?;
                    if let (Some(id), Some(code)) = (id, code) {
                        let id: u32 = id.parse()?;
                        if id >= 164 {
                            num_formats.insert(id, code);
                        }
                    }
                }
                Ok(Event::End(e)) if e.local_name().as_ref() == b"numFmts" => {
                    in_num_fmts = false;
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxJsonError::Xml(e.to_string())),
                _ => {}
            }
            buf.clear();
        }

        Ok(num_formats)
    }

    /// ワークシートパートから非表示行・非表示列（0始まり）を取得
    pub fn hidden_rows_and_cols(
        &self,
        sheet_part: &str,
    ) -> Result<(Vec<u32>, Vec<u32>), XlsxJsonError> {
        let Some(xml) = self.part(sheet_part) else {
            return Ok((Vec::new(), Vec::new()));
        };

        let mut reader = Reader::from_reader(xml);
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut hidden_rows = Vec::new();
        let mut hidden_cols = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                    b"col" if is_hidden(&e)? => {
                        // <col min="3" max="3" hidden="1"/>（1始まり）
                        let min = attribute(&e, b"min")?;
                        let max = attribute(&e, b"max")?;
                        if let (Some(min), Some(max)) = (min, max) {
                            let min: u32 = min.parse()?;
                            let max: u32 = max.parse()?;
                            if min == 0 || min > max || max > MAX_COLUMNS {
                                return Err(XlsxJsonError::SecurityViolation(format!(
                                    "Invalid column range in '{}': min={} max={} (max column: {})",
                                    sheet_part, min, max, MAX_COLUMNS
                                )));
                            }
                            hidden_cols.extend(min - 1..max);
                        }
                    }
                    b"row" if is_hidden(&e)? => {
                        // <row r="15" hidden="1">（1始まり）
                        if let Some(r) = attribute(&e, b"r")? {
                            let r: u32 = r.parse()?;
                            hidden_rows.push(r.saturating_sub(1));
                        }
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxJsonError::Xml(e.to_string())),
                _ => {}
            }
            buf.clear();
        }

        Ok((hidden_rows, hidden_cols))
    }
}

/// リレーションシップパートを解析（Id -> Target）
fn parse_relationships(xml: &[u8]) -> Result<HashMap<String, String>, XlsxJsonError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut relationships = HashMap::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if let (Some(id), Some(target)) = (attribute(&e, b"Id")?, attribute(&e, b"Target")?)
                {
                    relationships.insert(id, target);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxJsonError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(relationships)
}

/// リレーションシップのTargetをパッケージ内のパート名に変換
///
/// `/`で始まるTargetはパッケージルートからの絶対パス、それ以外は`base`からの相対パスです。
fn resolve_target(base: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// 要素の属性値を取得（名前空間接頭辞は無視）
fn attribute(element: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, XlsxJsonError> {
    for attr in element.attributes() {
        let attr =
            attr.map_err(|e| XlsxJsonError::Xml(format!("XML attribute error: {}", e)))?;
        if attr.key.local_name().as_ref() == key {
            let raw = std::str::from_utf8(&attr.value)?;
            let value = unescape(raw)
                .map_err(|e| XlsxJsonError::Xml(format!("XML attribute error: {}", e)))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn is_hidden(element: &BytesStart<'_>) -> Result<bool, XlsxJsonError> {
    Ok(matches!(
        attribute(element, b"hidden")?.as_deref(),
        Some("1") | Some("true")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(parts: &[(&str, &str)]) -> PackageReader {
        PackageReader {
            parts: parts
                .iter()
                .map(|(name, content)| (name.to_string(), content.as_bytes().to_vec()))
                .collect(),
        }
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("xl", "worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_target("xl", "/xl/worksheets/sheet2.xml"), "xl/worksheets/sheet2.xml");
        assert_eq!(resolve_target("xl/worksheets", "../media/image1.png"), "xl/media/image1.png");
    }

    #[test]
    fn test_sheet_parts_follow_relationships() {
        let reader = package(&[
            (
                WORKBOOK_PART,
                r#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><workbookPr date1904="1"/><sheets><sheet name="Q&amp;A" sheetId="1" r:id="rId2"/><sheet name="Data" sheetId="2" r:id="rId1"/></sheets></workbook>"#,
            ),
            (
                WORKBOOK_RELS_PART,
                r#"<Relationships><Relationship Id="rId1" Target="worksheets/sheet2.xml"/><Relationship Id="rId2" Target="/xl/worksheets/sheet1.xml"/></Relationships>"#,
            ),
        ]);

        assert_eq!(
            reader.sheet_parts().unwrap(),
            vec![
                ("Q&A".to_string(), "xl/worksheets/sheet1.xml".to_string()),
                ("Data".to_string(), "xl/worksheets/sheet2.xml".to_string()),
            ]
        );
        assert!(reader.is_1904().unwrap());
    }

    #[test]
    fn test_shared_strings_plain_text() {
        let reader = package(&[(
            SHARED_STRINGS_PART,
            r#"<sst><si><t>plain</t></si><si><r><rPr><b/></rPr><t>bold</t></r><r><t xml:space="preserve"> tail</t></r></si><si><t>漢字</t><rPh><t>かんじ</t></rPh></si><si/></sst>"#,
        )]);

        assert_eq!(
            reader.shared_strings().unwrap(),
            vec!["plain", "bold tail", "漢字", ""]
        );
    }

    #[test]
    fn test_number_formats_custom_only() {
        let reader = package(&[(
            STYLES_PART,
            r#"<styleSheet><numFmts count="2"><numFmt numFmtId="14" formatCode="mm-dd-yy"/><numFmt numFmtId="165" formatCode="0.000"/></numFmts></styleSheet>"#,
        )]);

        let formats = reader.number_formats().unwrap();
        assert_eq!(formats.len(), 1);
        assert_eq!(formats.get(&165).map(String::as_str), Some("0.000"));
    }

    #[test]
    fn test_hidden_rows_and_cols() {
        let reader = package(&[(
            "xl/worksheets/sheet1.xml",
            r#"<worksheet><cols><col min="2" max="3" hidden="1"/><col min="5" max="5"/></cols><sheetData><row r="1"><c r="A1"/></row><row r="3" hidden="1"><c r="A3"/></row></sheetData></worksheet>"#,
        )]);

        let (rows, cols) = reader.hidden_rows_and_cols("xl/worksheets/sheet1.xml").unwrap();
        assert_eq!(rows, vec![2]);
        assert_eq!(cols, vec![1, 2]);

        let (rows, cols) = reader.hidden_rows_and_cols("xl/worksheets/missing.xml").unwrap();
        assert!(rows.is_empty() && cols.is_empty());
    }

    #[test]
    fn test_hidden_cols_out_of_range() {
        for cols in [
            r#"<col min="1" max="4294967295" hidden="1"/>"#,
            r#"<col min="1" max="16385" hidden="1"/>"#,
            r#"<col min="5" max="3" hidden="1"/>"#,
            r#"<col min="0" max="2" hidden="1"/>"#,
        ] {
            let xml = format!("<worksheet><cols>{}</cols><sheetData/></worksheet>", cols);
            let reader = package(&[("xl/worksheets/sheet1.xml", xml.as_str())]);

            match reader.hidden_rows_and_cols("xl/worksheets/sheet1.xml") {
                Err(XlsxJsonError::SecurityViolation(msg)) => {
                    assert!(msg.contains("Invalid column range"))
                }
                other => panic!("Expected SecurityViolation for {}, got {:?}", cols, other),
            }
        }

        // 最終列までの範囲は許可される
        let reader = package(&[(
            "xl/worksheets/sheet1.xml",
            r#"<worksheet><cols><col min="16383" max="16384" hidden="1"/></cols></worksheet>"#,
        )]);
        let (_, cols) = reader.hidden_rows_and_cols("xl/worksheets/sheet1.xml").unwrap();
        assert_eq!(cols, vec![16_382, 16_383]);
    }

    #[test]
    fn test_attribute_unescapes_entities() {
        let reader = package(&[(
            STYLES_PART,
            r#"<styleSheet><numFmts count="1"><numFmt numFmtId="170" formatCode="&quot;JPY&quot; #,##0;[Red]&lt;0&gt;"/></numFmts></styleSheet>"#,
        )]);

        let formats = reader.number_formats().unwrap();
        assert_eq!(
            formats.get(&170).map(String::as_str),
            Some(r#""JPY" #,##0;[Red]<0>"#)
        );
    }

    #[test]
    fn test_total_decompressed_size_limit() {
        use std::io::Write;
        use zip::write::{FileOptions, ZipWriter};

        let mut data = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut data));
            let options = FileOptions::default();
            for name in ["xl/a.xml", "xl/b.xml", "xl/c.xml"] {
                zip.start_file(name, options).unwrap();
                zip.write_all(&[b'x'; 40]).unwrap();
            }
            zip.finish().unwrap();
        }

        // 各パートは上限内だが、合計（120バイト）が上限を超える
        let config = SecurityConfig {
            max_decompressed_size: 100,
            max_file_size: 64,
            ..SecurityConfig::default()
        };
        match PackageReader::new(&data, &config) {
            Err(XlsxJsonError::SecurityViolation(msg)) => {
                assert!(msg.contains("Total decompressed size exceeds maximum"))
            }
            other => panic!("Expected SecurityViolation, got {:?}", other.map(|_| ())),
        }

        let config = SecurityConfig {
            max_decompressed_size: 120,
            ..config
        };
        assert_eq!(PackageReader::new(&data, &config).unwrap().parts.len(), 3);
    }

    #[test]
    fn test_package_parts_text_and_binary() {
        let mut reader = package(&[("xl/workbook.xml", "<workbook/>")]);
        reader
            .parts
            .push(("xl/media/image1.png".to_string(), vec![0x89, 0x50, 0xff, 0xfe]));

        let parts = reader.package_parts();
        assert_eq!(parts[0].text.as_deref(), Some("<workbook/>"));
        assert!(parts[0].base64.is_none());
        assert!(parts[1].text.is_none());
        assert_eq!(
            STANDARD.decode(parts[1].base64.as_deref().unwrap()).unwrap(),
            vec![0x89, 0x50, 0xff, 0xfe]
        );
    }
}
