//! `v-model` value paths.
//!
//! A model expression is split into a base expression and a final key so the
//! generated setter can go through `$set` when the last segment is computed:
//!
//! ```text
//! test                 → exp: test,           key: none
//! test.a               → exp: test,           key: "a"
//! test[key]            → exp: test,           key: key
//! test["a"][key]       → exp: test["a"],      key: key
//! xxx.test[a[a].b[k]]  → exp: xxx.test,       key: a[a].b[k]
//! ```

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPath {
    pub exp: String,
    /// `None` when the whole value is a plain assignable identifier.
    pub key: Option<String>,
}

/// Split a model value into base expression and last key.
pub fn parse_model(value: &str) -> ModelPath {
    let val = value.trim();

    if !val.contains('[') || !val.ends_with(']') {
        return match val.rfind('.') {
            Some(dot) => ModelPath {
                exp: val[..dot].to_string(),
                key: Some(format!("\"{}\"", &val[dot + 1..])),
            },
            None => ModelPath {
                exp: val.to_string(),
                key: None,
            },
        };
    }

    let mut scanner = PathScanner {
        chars: val.char_indices().collect(),
        index: 0,
        expression_pos: 0,
        expression_end_pos: 0,
    };
    scanner.run();

    let byte = |i: usize| scanner.chars.get(i).map_or(val.len(), |&(offset, _)| offset);
    let exp_end = byte(scanner.expression_pos);
    let key_start = byte(scanner.expression_pos + 1).max(exp_end);
    let key_end = byte(scanner.expression_end_pos).max(key_start);

    ModelPath {
        exp: val[..exp_end].to_string(),
        key: Some(val[key_start..key_end].to_string()),
    }
}

/// Scans for the last top-level `[...]` accessor, skipping quoted strings.
struct PathScanner {
    chars: Vec<(usize, char)>,
    index: usize,
    expression_pos: usize,
    expression_end_pos: usize,
}

impl PathScanner {
    fn run(&mut self) {
        // The first character is never the start of an accessor.
        while !self.eof() {
            let ch = self.next();
            if is_string_start(ch) {
                self.skip_string(ch);
            } else if ch == Some('[') {
                self.bracket();
            }
        }
    }

    fn next(&mut self) -> Option<char> {
        self.index += 1;
        self.chars.get(self.index).map(|&(_, c)| c)
    }

    fn eof(&self) -> bool {
        self.index >= self.chars.len()
    }

    fn bracket(&mut self) {
        let mut depth = 1;
        self.expression_pos = self.index;
        while !self.eof() {
            let ch = self.next();
            if is_string_start(ch) {
                self.skip_string(ch);
                continue;
            }
            match ch {
                Some('[') => depth += 1,
                Some(']') => depth -= 1,
                _ => {}
            }
            if depth == 0 {
                self.expression_end_pos = self.index;
                break;
            }
        }
    }

    fn skip_string(&mut self, quote: Option<char>) {
        while !self.eof() {
            if self.next() == quote {
                break;
            }
        }
    }
}

fn is_string_start(ch: Option<char>) -> bool {
    matches!(ch, Some('"') | Some('\''))
}

fn ends_with_accessor(value: &str) -> bool {
    let val = value.trim();
    val.contains('[') && val.ends_with(']')
}

/// Code that assigns `assignment` to the model path `value`.
///
/// Plain and dotted paths are assigned directly. A path ending in a computed
/// `[...]` accessor goes through `$set` so that new keys stay reactive.
pub fn gen_assignment_code(value: &str, assignment: &str) -> String {
    if !ends_with_accessor(value) {
        return format!("{value}={assignment}");
    }
    let path = parse_model(value);
    match path.key {
        None => format!("{value}={assignment}"),
        Some(key) => format!("$set({}, {key}, {assignment})", path.exp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn split(value: &str) -> (String, Option<String>) {
        let path = parse_model(value);
        (path.exp, path.key)
    }

    // =========================================================================
    // parse_model
    // =========================================================================

    #[test]
    fn test_plain_identifier() {
        assert_eq!(split("test"), ("test".into(), None));
    }

    #[test]
    fn test_dot_path() {
        assert_eq!(split("a.b.c"), ("a.b".into(), Some("\"c\"".into())));
    }

    #[test]
    fn test_bracket_key() {
        assert_eq!(split("test[key]"), ("test".into(), Some("key".into())));
    }

    #[test]
    fn test_nested_brackets() {
        assert_eq!(
            split("xxx.test[a[a].test1[key]]"),
            ("xxx.test".into(), Some("a[a].test1[key]".into()))
        );
    }

    #[test]
    fn test_last_bracket_wins() {
        assert_eq!(
            split(r#"test["a"][key]"#),
            (r#"test["a"]"#.into(), Some("key".into()))
        );
    }

    #[test]
    fn test_quoted_bracket_inside_string() {
        assert_eq!(
            split(r#"obj["a]b"]"#),
            ("obj".into(), Some(r#""a]b""#.into()))
        );
    }

    #[test]
    fn test_bracket_not_at_end_falls_back_to_dot() {
        assert_eq!(split("a[0].b"), ("a[0]".into(), Some("\"b\"".into())));
    }

    // =========================================================================
    // gen_assignment_code
    // =========================================================================

    #[test]
    fn test_assignment_direct() {
        assert_eq!(gen_assignment_code("obj", "$$v"), "obj=$$v");
    }

    #[test]
    fn test_assignment_dot_path_is_direct() {
        assert_eq!(gen_assignment_code("obj.a", "$$v"), "obj.a=$$v");
    }

    #[test]
    fn test_assignment_string_key_uses_set() {
        assert_eq!(
            gen_assignment_code(r#"obj["a-b"]"#, "$event"),
            r#"$set(obj, "a-b", $event)"#
        );
    }

    #[test]
    fn test_assignment_computed_key_uses_set() {
        assert_eq!(gen_assignment_code("obj.a[b]", "$$v"), "$set(obj.a, b, $$v)");
    }
}
