//! Markdown table rendering.

use std::fmt::Write;

/// Format a number with fixed precision; non-finite values render as `NaN`/`inf`.
pub fn fmt_num(value: f64, precision: u32) -> String {
    if value.is_finite() {
        format!("{:.*}", precision as usize, value)
    } else {
        value.to_string()
    }
}

fn escape(cell: &str) -> String {
    cell.replace('|', "\\|")
}

/// A GitHub-flavoured table. Short rows are padded with empty cells.
pub fn table<S: AsRef<str>>(headers: &[S], rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    let width = headers.len();

    out.push('|');
    for h in headers {
        let _ = write!(out, " {} |", escape(h.as_ref()));
    }
    out.push('\n');
    out.push('|');
    for _ in 0..width {
        out.push_str("---|");
    }
    out.push('\n');

    for row in rows {
        out.push('|');
        for i in 0..width {
            let cell = row.get(i).map(String::as_str).unwrap_or("");
            let _ = write!(out, " {} |", escape(cell));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_header_separator_and_rows() {
        let md = table(&["k", "bic"], &[vec!["2".into(), "10.5".into()], vec!["3".into()]]);
        let lines: Vec<&str> = md.lines().collect();
        assert_eq!(lines[0], "| k | bic |");
        assert_eq!(lines[1], "|---|---|");
        assert_eq!(lines[2], "| 2 | 10.5 |");
        assert_eq!(lines[3], "| 3 |  |");
    }

    #[test]
    fn escapes_pipes() {
        let md = table(&["name"], &[vec!["a|b".into()]]);
        assert!(md.contains("a\\|b"));
    }

    #[test]
    fn numbers() {
        assert_eq!(fmt_num(1.23456, 2), "1.23");
        assert_eq!(fmt_num(f64::NAN, 2), "NaN");
        assert_eq!(fmt_num(f64::NEG_INFINITY, 2), "-inf");
    }
}
