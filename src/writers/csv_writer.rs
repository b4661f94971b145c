//! CSV writer
//!
//! Serializes rows through the `csv` crate. Output starts with a UTF-8 BOM
//! so Excel opens the file with correct encoding.

use crate::errors::{WriterError, WriterResult};

use super::SpreadsheetWriter;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub struct CsvSheetWriter;

impl CsvSheetWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CsvSheetWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl SpreadsheetWriter for CsvSheetWriter {
    fn write(
        &self,
        headers: &[&str],
        rows: &[Vec<String>],
        _sheet_name: &str,
    ) -> WriterResult<Vec<u8>> {
        let mut buffer = Vec::with_capacity(rows.len() * 64 + 64);
        buffer.extend_from_slice(UTF8_BOM);

        {
            let mut writer = csv::WriterBuilder::new().from_writer(&mut buffer);
            writer.write_record(headers)?;
            for row in rows {
                if row.len() != headers.len() {
                    return Err(WriterError::ShapeMismatch {
                        expected: headers.len(),
                        actual: row.len(),
                    });
                }
                writer.write_record(row)?;
            }
            writer.flush()?;
        }

        Ok(buffer)
    }
}
