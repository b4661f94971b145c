//! Input validation for filenames and worksheet names
//!
//! Both validators run before any processing starts; a failure aborts the
//! pipeline with a `VALIDATION_ERROR` and no side effects.

/// Characters Excel forbids inside a worksheet name.
const FORBIDDEN_SHEET_CHARS: [char; 7] = ['\\', '/', '?', '*', '[', ']', ':'];

/// Excel's worksheet name length limit.
pub const MAX_SHEET_NAME_CHARS: usize = 31;

/// Validate a caller-supplied base filename.
///
/// Rejects empty names, path separators, traversal sequences and control
/// characters. The extension is appended by the pipeline, so dots are only
/// allowed away from the edges.
pub fn validate_filename(name: &str) -> Result<(), String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("filename must not be empty".to_string());
    }
    if trimmed.contains("..") {
        return Err("filename must not contain path traversal sequences".to_string());
    }
    if trimmed.contains(['/', '\\', '\0']) {
        return Err("filename must not contain path separators".to_string());
    }
    if trimmed.starts_with('.') {
        return Err("filename must not start with a dot".to_string());
    }
    if trimmed.chars().any(char::is_control) {
        return Err("filename must not contain control characters".to_string());
    }
    if trimmed.chars().count() > 128 {
        return Err("filename must be at most 128 characters".to_string());
    }
    Ok(())
}

/// Validate and normalize a worksheet name.
///
/// Forbidden characters (`\ / ? * [ ] :`) are rejected; a valid name is
/// truncated to Excel's 31-character limit.
pub fn validate_sheet_name(name: &str) -> Result<String, String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("sheet name must not be empty".to_string());
    }
    if let Some(bad) = trimmed.chars().find(|c| FORBIDDEN_SHEET_CHARS.contains(c)) {
        return Err(format!("sheet name must not contain '{bad}'"));
    }
    if trimmed.chars().any(char::is_control) {
        return Err("sheet name must not contain control characters".to_string());
    }
    Ok(trimmed.chars().take(MAX_SHEET_NAME_CHARS).collect())
}
