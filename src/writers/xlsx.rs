//! Minimal XLSX writer
//!
//! Builds an OOXML spreadsheet package by hand: content types, relationship
//! parts, a workbook with one worksheet, and sheet data using inline strings
//! so no shared string table is needed. The package is written through the
//! `zip` crate with deflate compression.

use std::io::{Cursor, Write};

use quick_xml::escape::escape;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::errors::{WriterError, WriterResult};

use super::SpreadsheetWriter;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#;

/// Writes one-worksheet XLSX blobs with inline string cells.
pub struct XlsxWriter;

impl XlsxWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for XlsxWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl SpreadsheetWriter for XlsxWriter {
    fn write(
        &self,
        headers: &[&str],
        rows: &[Vec<String>],
        sheet_name: &str,
    ) -> WriterResult<Vec<u8>> {
        for row in rows {
            if row.len() != headers.len() {
                return Err(WriterError::ShapeMismatch {
                    expected: headers.len(),
                    actual: row.len(),
                });
            }
        }

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(CONTENT_TYPES.as_bytes())?;

        zip.start_file("_rels/.rels", options)?;
        zip.write_all(ROOT_RELS.as_bytes())?;

        zip.start_file("xl/workbook.xml", options)?;
        zip.write_all(workbook_xml(sheet_name).as_bytes())?;

        zip.start_file("xl/_rels/workbook.xml.rels", options)?;
        zip.write_all(WORKBOOK_RELS.as_bytes())?;

        zip.start_file("xl/worksheets/sheet1.xml", options)?;
        zip.write_all(sheet_xml(headers, rows).as_bytes())?;

        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }
}

fn workbook_xml(sheet_name: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            "\n",
            r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" "#,
            r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
            r#"<sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#
        ),
        escape(sheet_name)
    )
}

/// Build the worksheet XML: one header row followed by the data rows,
/// every cell an inline string.
fn sheet_xml(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut out = String::with_capacity(4096);
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    out.push('\n');
    out.push_str(
        r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
    );
    out.push('\n');

    let end_col = col_to_letter(headers.len().saturating_sub(1));
    out.push_str(&format!(
        "<dimension ref=\"A1:{}{}\"/>\n",
        end_col,
        rows.len() + 1
    ));

    out.push_str("<sheetData>\n");
    write_row(&mut out, 1, headers.iter().copied());
    for (i, row) in rows.iter().enumerate() {
        write_row(&mut out, i as u64 + 2, row.iter().map(String::as_str));
    }
    out.push_str("</sheetData>\n");

    out.push_str("</worksheet>");
    out
}

fn write_row<'a>(out: &mut String, row_number: u64, cells: impl Iterator<Item = &'a str>) {
    out.push_str(&format!("<row r=\"{row_number}\">"));
    for (col, value) in cells.enumerate() {
        out.push_str(&format!(
            "<c r=\"{}{}\" t=\"inlineStr\"><is><t xml:space=\"preserve\">{}</t></is></c>",
            col_to_letter(col),
            row_number,
            escape(value)
        ));
    }
    out.push_str("</row>\n");
}

/// 0-based column index to spreadsheet letters (0 -> A, 26 -> AA).
fn col_to_letter(mut col: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (col % 26) as u8);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_else(|_| "A".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn col_letters() {
        assert_eq!(col_to_letter(0), "A");
        assert_eq!(col_to_letter(25), "Z");
        assert_eq!(col_to_letter(26), "AA");
        assert_eq!(col_to_letter(27), "AB");
        assert_eq!(col_to_letter(701), "ZZ");
        assert_eq!(col_to_letter(702), "AAA");
    }

    #[test]
    fn sheet_xml_contains_header_and_data_rows() {
        let headers = ["ID", "Name"];
        let rows = vec![
            vec!["1".to_string(), "Ada".to_string()],
            vec!["2".to_string(), "Grace & Co".to_string()],
        ];
        let xml = sheet_xml(&headers, &rows);
        assert!(xml.contains(r#"<row r="1">"#));
        assert!(xml.contains(r#"<row r="3">"#));
        assert!(xml.contains("<t xml:space=\"preserve\">Grace &amp; Co</t>"));
        assert!(xml.contains(r#"<dimension ref="A1:B3"/>"#));
    }

    #[test]
    fn writes_a_valid_zip_package() {
        let writer = XlsxWriter::new();
        let blob = writer
            .write(
                &["ID", "Name"],
                &[vec!["1".into(), "Ada".into()]],
                "Sheet1",
            )
            .unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(blob)).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert!(names.contains(&"[Content_Types].xml".to_string()));
        assert!(names.contains(&"xl/workbook.xml".to_string()));
        assert!(names.contains(&"xl/worksheets/sheet1.xml".to_string()));
    }

    #[test]
    fn rejects_misshapen_rows() {
        let writer = XlsxWriter::new();
        let result = writer.write(&["ID", "Name"], &[vec!["1".into()]], "Sheet1");
        assert!(matches!(
            result,
            Err(WriterError::ShapeMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }
}
