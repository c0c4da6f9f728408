//! Excel Workbook Writer Module
//! Writes a merged worksheet as a single-sheet .xlsx file.
//!
//! Uses direct ZIP/XML generation; the workbook only needs one sheet of
//! plain values so no spreadsheet library is pulled in.

use crate::data::Worksheet;
use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;
use thiserror::Error;
use tracing::info;
use zip::write::FileOptions;
use zip::ZipWriter;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to create {path}: {source}")]
    Create {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Write error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Excel caps sheet names at 31 characters
const MAX_SHEET_NAME: usize = 31;

/// Workbook writer for merged worm data
pub struct XlsxWriter;

impl XlsxWriter {
    /// Write `sheet` to `output_path`: header row first, then data rows, no index column.
    pub fn write(sheet: &Worksheet, output_path: &Path, sheet_name: &str) -> Result<(), ExportError> {
        let file = File::create(output_path).map_err(|source| ExportError::Create {
            path: output_path.display().to_string(),
            source,
        })?;
        Self::write_to(sheet, file, sheet_name)?;

        info!(
            "Excel generated: {} ({} columns, {} rows)",
            output_path.display(),
            sheet.width(),
            sheet.height()
        );
        Ok(())
    }

    /// Write the workbook into any seekable writer.
    pub fn write_to<W: Write + Seek>(
        sheet: &Worksheet,
        writer: W,
        sheet_name: &str,
    ) -> Result<(), ExportError> {
        let mut zip = ZipWriter::new(writer);
        let options = FileOptions::default();
        let name = Self::sanitize_sheet_name(sheet_name);

        // 1. [Content_Types].xml
        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(Self::content_types_xml().as_bytes())?;

        // 2. _rels/.rels
        zip.start_file("_rels/.rels", options)?;
        zip.write_all(Self::rels_xml().as_bytes())?;

        // 3. Workbook and its relationships
        zip.start_file("xl/workbook.xml", options)?;
        zip.write_all(Self::workbook_xml(&name).as_bytes())?;
        zip.start_file("xl/_rels/workbook.xml.rels", options)?;
        zip.write_all(Self::workbook_rels_xml().as_bytes())?;

        // 4. Styles (bold header)
        zip.start_file("xl/styles.xml", options)?;
        zip.write_all(Self::styles_xml().as_bytes())?;

        // 5. The sheet itself
        zip.start_file("xl/worksheets/sheet1.xml", options)?;
        zip.write_all(Self::sheet_xml(sheet).as_bytes())?;

        // 6. docProps
        zip.start_file("docProps/core.xml", options)?;
        zip.write_all(Self::core_props_xml(&name).as_bytes())?;
        zip.start_file("docProps/app.xml", options)?;
        zip.write_all(Self::app_props_xml(&name).as_bytes())?;

        zip.finish()?;
        Ok(())
    }

    /// Spreadsheet column letters for a 0-based index: A..Z, AA, AB, ...
    pub fn column_name(mut index: usize) -> String {
        let mut letters = Vec::new();
        loop {
            letters.push(b'A' + (index % 26) as u8);
            if index < 26 {
                break;
            }
            index = index / 26 - 1;
        }
        letters.iter().rev().map(|&b| b as char).collect()
    }

    fn sanitize_sheet_name(name: &str) -> String {
        let cleaned: String = name
            .chars()
            .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
            .take(MAX_SHEET_NAME)
            .collect();
        let cleaned = cleaned.trim_matches('\'').to_string();
        if cleaned.is_empty() {
            "Sheet1".to_string()
        } else {
            cleaned
        }
    }

    fn escape(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            match c {
                '&' => out.push_str("&amp;"),
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                '"' => out.push_str("&quot;"),
                '\'' => out.push_str("&apos;"),
                // Control characters are not allowed in XML 1.0
                '\t' | '\n' | '\r' => out.push(c),
                c if c.is_control() => {}
                c => out.push(c),
            }
        }
        out
    }

    fn string_cell(reference: &str, text: &str, style: Option<u32>) -> String {
        let style = style.map(|s| format!(r#" s="{}""#, s)).unwrap_or_default();
        format!(
            r#"<c r="{}"{} t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
            reference,
            style,
            Self::escape(text)
        )
    }

    /// Numeric only when the number prints back as the same text, so
    /// leading zeros, trailing zeros and long digit runs stay untouched.
    fn value_cell(reference: &str, value: &str) -> String {
        match value.parse::<f64>() {
            Ok(number) if number.is_finite() && number.to_string() == value => {
                format!(r#"<c r="{}"><v>{}</v></c>"#, reference, number)
            }
            _ => Self::string_cell(reference, value, None),
        }
    }

    fn sheet_xml(sheet: &Worksheet) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
        );

        let columns: Vec<String> = (0..sheet.width()).map(Self::column_name).collect();

        if !sheet.headers.is_empty() {
            xml.push_str(r#"<row r="1">"#);
            for (col, header) in columns.iter().zip(&sheet.headers) {
                xml.push_str(&Self::string_cell(&format!("{}1", col), header, Some(1)));
            }
            xml.push_str("</row>");
        }

        for (idx, row) in sheet.rows.iter().enumerate() {
            let row_num = idx + 2;
            xml.push_str(&format!(r#"<row r="{}">"#, row_num));
            for (col, cell) in columns.iter().zip(&row.cells) {
                if let Some(value) = cell {
                    xml.push_str(&Self::value_cell(&format!("{}{}", col, row_num), value));
                }
            }
            xml.push_str("</row>");
        }

        xml.push_str("</sheetData></worksheet>");
        xml
    }

    fn content_types_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
<Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>
</Types>"#
    }

    fn rels_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/>
</Relationships>"#
    }

    fn workbook_xml(sheet_name: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#,
            Self::escape(sheet_name)
        )
    }

    fn workbook_rels_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#
    }

    fn styles_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts>
<fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>
<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>
<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
<cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/></cellXfs>
<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>
</styleSheet>"#
    }

    fn core_props_xml(title: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
<dc:title>{}</dc:title>
<dc:creator>Worm Merger</dc:creator>
</cp:coreProperties>"#,
            Self::escape(title)
        )
    }

    fn app_props_xml(sheet_name: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes">
<Application>Worm Merger</Application>
<TitlesOfParts><vt:vector size="1" baseType="lpstr"><vt:lpstr>{}</vt:lpstr></vt:vector></TitlesOfParts>
</Properties>"#,
            Self::escape(sheet_name)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{merge_files, Exclusions, Row};
    use std::io::{Cursor, Read};
    use zip::ZipArchive;

    fn sheet() -> Worksheet {
        Worksheet {
            headers: vec!["w1".into(), "w<2>".into()],
            rows: vec![
                Row {
                    index: 0,
                    cells: vec![Some("1.5".into()), Some("a&b".into())],
                },
                Row {
                    index: 1,
                    cells: vec![None, Some("7".into())],
                },
            ],
        }
    }

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut part = archive.by_name(name).unwrap();
        let mut text = String::new();
        part.read_to_string(&mut text).unwrap();
        text
    }

    #[test]
    fn column_names() {
        assert_eq!(XlsxWriter::column_name(0), "A");
        assert_eq!(XlsxWriter::column_name(25), "Z");
        assert_eq!(XlsxWriter::column_name(26), "AA");
        assert_eq!(XlsxWriter::column_name(27), "AB");
        assert_eq!(XlsxWriter::column_name(701), "ZZ");
        assert_eq!(XlsxWriter::column_name(702), "AAA");
    }

    #[test]
    fn sheet_names_are_sanitized() {
        assert_eq!(XlsxWriter::sanitize_sheet_name("a/b:c"), "abc");
        assert_eq!(XlsxWriter::sanitize_sheet_name("[]"), "Sheet1");
        assert_eq!(XlsxWriter::sanitize_sheet_name(&"x".repeat(40)).len(), 31);
    }

    #[test]
    fn workbook_contains_all_parts() {
        let mut buf = Cursor::new(Vec::new());
        XlsxWriter::write_to(&sheet(), &mut buf, "Sheet1").unwrap();
        let bytes = buf.into_inner();

        let archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        for part in [
            "[Content_Types].xml",
            "_rels/.rels",
            "xl/workbook.xml",
            "xl/_rels/workbook.xml.rels",
            "xl/styles.xml",
            "xl/worksheets/sheet1.xml",
            "docProps/core.xml",
            "docProps/app.xml",
        ] {
            assert!(names.contains(&part), "missing {}", part);
        }
    }

    #[test]
    fn cells_are_typed_and_escaped() {
        let mut buf = Cursor::new(Vec::new());
        XlsxWriter::write_to(&sheet(), &mut buf, "Sheet1").unwrap();
        let xml = read_part(&buf.into_inner(), "xl/worksheets/sheet1.xml");

        assert!(xml.contains(r#"<c r="A1" s="1" t="inlineStr"><is><t xml:space="preserve">w1</t></is></c>"#));
        assert!(xml.contains("w&lt;2&gt;"));
        assert!(xml.contains(r#"<c r="A2"><v>1.5</v></c>"#));
        assert!(xml.contains("a&amp;b"));
        assert!(xml.contains(r#"<c r="B3"><v>7</v></c>"#));
        // Missing cells are omitted
        assert!(!xml.contains(r#"r="A3""#));
    }

    #[test]
    fn non_finite_numbers_stay_text() {
        assert!(XlsxWriter::value_cell("A1", "NaN").contains("inlineStr"));
        assert!(XlsxWriter::value_cell("A1", "inf").contains("inlineStr"));
        assert_eq!(XlsxWriter::value_cell("A1", "-2"), r#"<c r="A1"><v>-2</v></c>"#);
        assert_eq!(XlsxWriter::value_cell("A1", "0.25"), r#"<c r="A1"><v>0.25</v></c>"#);
    }

    #[test]
    fn lossy_numbers_keep_their_text() {
        for text in ["007", "12345678901234567890", "1.50", "+5", "1e3"] {
            let cell = XlsxWriter::value_cell("A1", text);
            assert_eq!(
                cell,
                format!(
                    r#"<c r="A1" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                    text
                )
            );
        }
    }

    #[test]
    fn merged_files_reach_the_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.csv");
        let b = dir.path().join("b.csv");
        std::fs::write(&a, ",w1,w2\n0,007,2\n").unwrap();
        std::fs::write(&b, ",w3\n0,4.5\n1,6\n").unwrap();

        let excluded: Exclusions = ["w2".to_string()].into_iter().collect();
        let entries = vec![(a, excluded), (b, Exclusions::new())];
        let outcome = merge_files(&entries, |_| {}).unwrap();

        let path = dir.path().join("merged.xlsx");
        XlsxWriter::write(&outcome.sheet, &path, "Sheet1").unwrap();
        let xml = read_part(&std::fs::read(&path).unwrap(), "xl/worksheets/sheet1.xml");

        // Bold header row, then the header line repeated as the first data row
        assert!(xml.contains(r#"<c r="A1" s="1" t="inlineStr"><is><t xml:space="preserve">w1</t></is></c>"#));
        assert!(xml.contains(r#"<c r="B1" s="1" t="inlineStr"><is><t xml:space="preserve">w3</t></is></c>"#));
        assert!(xml.contains(r#"<c r="A2" t="inlineStr"><is><t xml:space="preserve">w1</t></is></c>"#));
        assert!(xml.contains(r#"<c r="A3" t="inlineStr"><is><t xml:space="preserve">007</t></is></c>"#));
        assert!(xml.contains(r#"<c r="B3"><v>4.5</v></c>"#));
        assert!(xml.contains(r#"<c r="B4"><v>6</v></c>"#));
        assert!(!xml.contains(r#"r="A4""#));
        assert!(!xml.contains(r#"r="C1""#));
    }

    #[test]
    fn writes_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        XlsxWriter::write(&sheet(), &path, "Worms").unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(read_part(&bytes, "xl/workbook.xml").contains(r#"name="Worms""#));
    }
}
