pub mod human_format;
pub mod validation;

pub use human_format::format_bytes;
pub use validation::{validate_filename, validate_sheet_name, MAX_SHEET_NAME_CHARS};
