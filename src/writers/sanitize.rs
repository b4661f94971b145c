//! Cell value sanitization
//!
//! Every string placed in a spreadsheet cell passes through `sanitize_cell`
//! exactly once in the transformer; the function is idempotent so defensive
//! re-sanitization elsewhere cannot corrupt values.

/// Hard ceiling on characters per spreadsheet cell (the XLSX limit).
pub const MAX_CELL_CHARS: usize = 32_767;

/// Characters that trigger formula evaluation when leading a cell.
const FORMULA_PREFIXES: [char; 4] = ['=', '+', '-', '@'];

/// Sanitize a value for safe embedding in a spreadsheet cell.
///
/// - strips control characters except tab, newline and carriage return
/// - collapses runs of spaces into one space
/// - neutralizes a leading `=`, `+`, `-` or `@` with a `'` prefix
/// - truncates to [`MAX_CELL_CHARS`] characters
pub fn sanitize_cell(value: &str) -> String {
    let mut out = String::with_capacity(value.len().min(MAX_CELL_CHARS));
    let mut last_was_space = false;

    for c in value.chars() {
        if c.is_control() && c != '\t' && c != '\n' && c != '\r' {
            continue;
        }
        if c == ' ' {
            if last_was_space {
                continue;
            }
            last_was_space = true;
        } else {
            last_was_space = false;
        }
        out.push(c);
    }

    if out.starts_with(FORMULA_PREFIXES) {
        out.insert(0, '\'');
    }

    if out.chars().count() > MAX_CELL_CHARS {
        out = out.chars().take(MAX_CELL_CHARS).collect();
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_disallowed_control_characters() {
        assert_eq!(sanitize_cell("a\u{0}b\u{7}c"), "abc");
        // Tab, newline and CR survive
        assert_eq!(sanitize_cell("a\tb\nc\rd"), "a\tb\nc\rd");
    }

    #[test]
    fn collapses_space_runs() {
        assert_eq!(sanitize_cell("a    b  c"), "a b c");
    }

    #[test]
    fn neutralizes_formula_prefixes() {
        assert_eq!(sanitize_cell("=SUM(A1:A9)"), "'=SUM(A1:A9)");
        assert_eq!(sanitize_cell("+1234"), "'+1234");
        assert_eq!(sanitize_cell("-1234"), "'-1234");
        assert_eq!(sanitize_cell("@handle"), "'@handle");
        // Non-leading occurrences are untouched
        assert_eq!(sanitize_cell("a=b"), "a=b");
    }

    #[test]
    fn truncates_to_cell_ceiling() {
        let long = "x".repeat(MAX_CELL_CHARS + 100);
        assert_eq!(sanitize_cell(&long).chars().count(), MAX_CELL_CHARS);
    }

    #[test]
    fn sanitization_is_idempotent() {
        let inputs = [
            "=SUM(A1)",
            "plain text",
            "a   b\u{1}c",
            "@mention  with   spaces",
            "-42.5",
        ];
        for input in inputs {
            let once = sanitize_cell(input);
            let twice = sanitize_cell(&once);
            assert_eq!(once, twice, "not idempotent for {input:?}");
        }
    }
}
