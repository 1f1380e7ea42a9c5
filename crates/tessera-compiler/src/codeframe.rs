//! Source excerpts with carets under a byte range.
//!
//! ```text
//! 1  |  <div>
//! 2  |    <p v-if="a b"></p>
//!    |       ^^^^^^^^^
//! 3  |  </div>
//! ```

use std::sync::LazyLock;

use regex::Regex;
use tessera_parser::Range;

/// Lines shown around the first line of the range.
const CONTEXT_LINES: i64 = 2;

static LINE_BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n").expect("valid regex"));

/// Code frame for `start..end`, as byte offsets into `source`.
///
/// Lines are numbered from 1. Carets cover the range, continuing across the
/// following lines when the range spans several of them.
pub fn generate_code_frame(source: &str, start: usize, end: usize) -> String {
    let lines: Vec<&str> = LINE_BREAK_RE.split(source).collect();
    let line_count = lines.len() as i64;
    let start = start as i64;
    let end = end as i64;
    let mut frame = Vec::new();
    let mut count: i64 = 0;

    for (i, line) in lines.iter().enumerate() {
        let i = i as i64;
        count += line.len() as i64 + 1;
        if count < start {
            continue;
        }
        let mut j = i - CONTEXT_LINES;
        while j <= i + CONTEXT_LINES || end > count {
            if j >= line_count {
                break;
            }
            if j < 0 {
                j += 1;
                continue;
            }
            let line = lines[j as usize];
            let number = (j + 1).to_string();
            frame.push(format!(
                "{number}{}|  {line}",
                " ".repeat(3usize.saturating_sub(number.len()))
            ));
            let line_length = line.len() as i64;
            if j == i {
                let pad = start - (count - line_length) + 1;
                let length = if end > count {
                    line_length - pad
                } else {
                    end - start
                };
                frame.push(format!("   |  {}{}", repeat(" ", pad), repeat("^", length)));
            } else if j > i {
                if end > count {
                    let length = (end - count).min(line_length);
                    frame.push(format!("   |  {}", repeat("^", length)));
                }
                count += line_length + 1;
            }
            j += 1;
        }
        break;
    }
    frame.join("\n")
}

/// Code frame for a diagnostic range; open ends default to the whole source.
pub fn code_frame_for(source: &str, range: Range) -> String {
    generate_code_frame(
        source,
        range.start.unwrap_or(0),
        range.end.unwrap_or(source.len()),
    )
}

fn repeat(s: &str, n: i64) -> String {
    if n > 0 {
        s.repeat(n as usize)
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SOURCE: &str = "<div>\n  <p>{{ a b }}</p>\n  <span></span>\n  <b></b>\n  <i></i>\n</div>";

    fn offset_of(needle: &str) -> usize {
        SOURCE.find(needle).unwrap()
    }

    // =========================================================================
    // Single line ranges
    // =========================================================================

    #[test]
    fn test_caret_under_range() {
        let start = offset_of("{{");
        let frame = generate_code_frame(SOURCE, start, start + "{{ a b }}".len());
        assert_eq!(
            frame,
            [
                "1  |  <div>",
                "2  |    <p>{{ a b }}</p>",
                "   |       ^^^^^^^^^",
                "3  |    <span></span>",
                "4  |    <b></b>",
            ]
            .join("\n")
        );
    }

    #[test]
    fn test_context_clipped_at_end() {
        let start = offset_of("</div>") + 2;
        let frame = generate_code_frame(SOURCE, start, start + 3);
        assert_eq!(
            frame,
            [
                "4  |    <b></b>",
                "5  |    <i></i>",
                "6  |  </div>",
                "   |    ^^^",
            ]
            .join("\n")
        );
    }

    #[test]
    fn test_range_starting_on_line_boundary() {
        // A range starting right after a line break is anchored on the line
        // before it, with carets continuing below.
        let start = offset_of("</div>");
        let frame = generate_code_frame(SOURCE, start, start + 6);
        assert_eq!(
            frame,
            [
                "3  |    <span></span>".to_string(),
                "4  |    <b></b>".to_string(),
                "5  |    <i></i>".to_string(),
                format!("   |  {}", " ".repeat(10)),
                "6  |  </div>".to_string(),
                "   |  ^^^^^^".to_string(),
            ]
            .join("\n")
        );
    }

    #[test]
    fn test_first_line() {
        let frame = generate_code_frame("<p>x</p>", 0, 3);
        assert_eq!(frame, "1  |  <p>x</p>\n   |  ^^^");
    }

    // =========================================================================
    // Multi line ranges
    // =========================================================================

    #[test]
    fn test_range_spanning_lines() {
        let source = "<div>\n  <p\n  id=\"x\">\n</div>";
        let start = source.find("<p").unwrap();
        let end = source.find("\">").unwrap() + 2;
        let frame = generate_code_frame(source, start, end);
        assert_eq!(
            frame,
            [
                "1  |  <div>",
                "2  |    <p",
                "   |    ^^",
                "3  |    id=\"x\">",
                "   |  ^^^^^^^^^",
                "4  |  </div>",
            ]
            .join("\n")
        );
    }

    #[test]
    fn test_crlf_line_breaks() {
        let frame = generate_code_frame("<a>\r\n<b>", 5, 8);
        assert!(frame.starts_with("1  |  <a>\n2  |  <b>\n"));
        assert!(!frame.contains('\r'));
    }

    #[test]
    fn test_open_range_covers_source() {
        let frame = code_frame_for("<p>", Range::none());
        assert_eq!(frame, "1  |  <p>\n   |  ^^^");
    }

    #[test]
    fn test_end_past_source_terminates() {
        let frame = generate_code_frame("ab", 0, 100);
        assert_eq!(frame, "1  |  ab\n   |  ^^");
    }
}
