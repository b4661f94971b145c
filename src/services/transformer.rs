//! Record transformation
//!
//! Maps raw JSON records onto template-shaped string rows: field selection
//! in header order, type-directed formatting, status-code translation and
//! cell sanitization. Pure apart from logging; a malformed record never
//! aborts the transform.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use tracing::warn;

use crate::models::{ExportType, RawRecord, Template};
use crate::writers::sanitize_cell;

/// Placeholder for fields absent from a record.
const MISSING_VALUE: &str = "N/A";

/// Input date patterns tried in order when normalizing date-like fields.
const DATE_PATTERNS: [&str; 4] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Date,
    Currency,
    Status,
    Generic,
}

/// Stateless transformer from raw records to spreadsheet rows.
pub struct RecordTransformer;

impl RecordTransformer {
    /// Transform records into rows of sanitized strings in header order.
    ///
    /// A record whose values cannot be rendered (nested objects or arrays in
    /// a template field) yields a row of empty strings and a warning rather
    /// than failing the export.
    pub fn transform(
        records: &[RawRecord],
        template: &Template,
        export_type: ExportType,
    ) -> Vec<Vec<String>> {
        records
            .iter()
            .enumerate()
            .map(|(index, record)| match render_record(record, template, export_type) {
                Ok(row) => row,
                Err(field) => {
                    warn!(
                        record_index = index,
                        field, "skipping malformed record; emitting empty row"
                    );
                    vec![String::new(); template.fields.len()]
                }
            })
            .collect()
    }
}

/// Render one record; `Err` carries the offending field name.
fn render_record(
    record: &RawRecord,
    template: &Template,
    export_type: ExportType,
) -> Result<Vec<String>, &'static str> {
    let mut row = Vec::with_capacity(template.fields.len());
    for field in &template.fields {
        let rendered = match record.get(*field) {
            None | Some(Value::Null) => MISSING_VALUE.to_string(),
            Some(Value::Object(_)) | Some(Value::Array(_)) => return Err(*field),
            Some(value) => format_value(value, classify(field), export_type),
        };
        row.push(sanitize_cell(&rendered));
    }
    Ok(row)
}

fn classify(field: &str) -> FieldKind {
    if field == "date" || field.ends_with("_date") || field.ends_with("_at") {
        FieldKind::Date
    } else if field.contains("amount") || field.contains("fee") || field.contains("total") {
        FieldKind::Currency
    } else if field == "status" || field.ends_with("_status") {
        FieldKind::Status
    } else {
        FieldKind::Generic
    }
}

fn format_value(value: &Value, kind: FieldKind, export_type: ExportType) -> String {
    if let Value::Bool(b) = value {
        return if *b { "Yes" } else { "No" }.to_string();
    }

    match kind {
        FieldKind::Date => format_date(value),
        FieldKind::Currency => format_currency(value),
        FieldKind::Status => format_status(value, export_type),
        FieldKind::Generic => scalar_to_string(value),
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Normalize date-like values to `YYYY-MM-DD`, keeping the original string
/// when no known pattern matches.
fn format_date(value: &Value) -> String {
    let raw = scalar_to_string(value);

    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
        return dt.format("%Y-%m-%d").to_string();
    }
    for pattern in DATE_PATTERNS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&raw, pattern) {
            return dt.format("%Y-%m-%d").to_string();
        }
        if let Ok(d) = NaiveDate::parse_from_str(&raw, pattern) {
            return d.format("%Y-%m-%d").to_string();
        }
    }
    raw
}

/// Thousands separators and two decimals; non-numeric values pass through.
fn format_currency(value: &Value) -> String {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    let Some(number) = number else {
        return scalar_to_string(value);
    };

    let negative = number < 0.0;
    let formatted = format!("{:.2}", number.abs());
    let (int_part, dec_part) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}{grouped}.{dec_part}")
}

/// Translate a status code through the export type's lookup table; unknown
/// codes pass through unchanged.
fn format_status(value: &Value, export_type: ExportType) -> String {
    let code = scalar_to_string(value);
    status_label(export_type, &code)
        .map(str::to_string)
        .unwrap_or(code)
}

fn status_label(export_type: ExportType, code: &str) -> Option<&'static str> {
    match export_type {
        ExportType::Participants => match code {
            "0" => Some("Pending"),
            "1" => Some("Confirmed"),
            "2" => Some("Cancelled"),
            "3" => Some("Waitlisted"),
            _ => None,
        },
        ExportType::Payments => match code {
            "0" => Some("Pending"),
            "1" => Some("Paid"),
            "2" => Some("Failed"),
            "3" => Some("Refunded"),
            _ => None,
        },
        ExportType::Ambassadors => match code {
            "0" => Some("Inactive"),
            "1" => Some("Active"),
            "2" => Some("Suspended"),
            _ => None,
        },
    }
}
