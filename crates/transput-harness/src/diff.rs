//! Diff rendering for fixture comparison.
//!
//! Transput output is mostly short and column-sensitive, so each differing
//! line is shown with a caret under the first differing column. Blanks are
//! made visible as `·`.

fn visible(line: &str) -> String {
    line.chars().map(|c| if c == ' ' { '·' } else { c }).collect()
}

fn first_difference(expected: &str, actual: &str) -> usize {
    expected
        .chars()
        .zip(actual.chars())
        .position(|(e, a)| e != a)
        .unwrap_or_else(|| expected.chars().count().min(actual.chars().count()))
}

/// Render a text diff between expected and actual output.
#[must_use]
pub fn render_diff(expected: &str, actual: &str) -> String {
    if expected == actual {
        return String::from("[identical]");
    }

    let expected_lines: Vec<&str> = expected.split('\n').collect();
    let actual_lines: Vec<&str> = actual.split('\n').collect();
    let mut out = String::from("--- expected\n+++ actual\n");
    for i in 0..expected_lines.len().max(actual_lines.len()) {
        let e = expected_lines.get(i).copied();
        let a = actual_lines.get(i).copied();
        if e == a {
            continue;
        }
        out.push_str(&format!("@@ line {} @@\n", i + 1));
        if let Some(e) = e {
            out.push_str(&format!("-{}\n", visible(e)));
        }
        if let Some(a) = a {
            out.push_str(&format!("+{}\n", visible(a)));
        }
        if let (Some(e), Some(a)) = (e, a) {
            let col = first_difference(e, a);
            out.push_str(&format!(" {}^ column {}\n", " ".repeat(col), col + 1));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_text() {
        assert_eq!(render_diff("abc", "abc"), "[identical]");
    }

    #[test]
    fn caret_marks_first_difference() {
        let diff = render_diff("  -12", "   12");
        assert!(diff.contains("-··-12\n"));
        assert!(diff.contains("+···12\n"));
        assert!(diff.contains("   ^ column 3\n"));
    }

    #[test]
    fn extra_lines_are_reported() {
        let diff = render_diff("a\nb", "a");
        assert!(diff.contains("@@ line 2 @@\n-b\n"));
        assert!(!diff.contains("@@ line 1 @@"));
    }
}
