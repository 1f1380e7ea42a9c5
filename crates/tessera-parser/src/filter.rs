//! Filter chains: `value | format('x') | upper`.
//!
//! A `|` splits the expression only outside quotes, template strings, regex
//! literals and brackets, and only when it is not half of `||`. Each filter
//! wraps the expression built so far, so the first filter ends up innermost.

/// Characters after which `/` is a division operator, not a regex start.
fn is_division_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | ')' | '.' | '+' | '-' | '$' | ']')
}

/// Rewrite the filter chain in `exp` into nested `_f` calls.
pub fn parse_filters(exp: &str) -> String {
    let chars: Vec<(usize, char)> = exp.char_indices().collect();

    let mut in_single = false;
    let mut in_double = false;
    let mut in_template = false;
    let mut in_regex = false;
    let mut curly = 0i32;
    let mut square = 0i32;
    let mut paren = 0i32;

    let mut expression: Option<String> = None;
    let mut filters: Vec<String> = Vec::new();
    let mut last_filter_index = 0usize;
    let mut prev: Option<char> = None;

    let char_at = |i: usize| chars.get(i).map(|&(_, c)| c);

    for (i, &(offset, c)) in chars.iter().enumerate() {
        let escaped = prev == Some('\\');
        prev = Some(c);

        if in_single {
            if c == '\'' && !escaped {
                in_single = false;
            }
        } else if in_double {
            if c == '"' && !escaped {
                in_double = false;
            }
        } else if in_template {
            if c == '`' && !escaped {
                in_template = false;
            }
        } else if in_regex {
            if c == '/' && !escaped {
                in_regex = false;
            }
        } else if c == '|'
            && char_at(i + 1) != Some('|')
            && (i == 0 || char_at(i - 1) != Some('|'))
            && curly == 0
            && square == 0
            && paren == 0
        {
            match expression {
                None => expression = Some(exp[..offset].trim().to_string()),
                Some(_) => filters.push(exp[last_filter_index..offset].trim().to_string()),
            }
            last_filter_index = offset + 1;
        } else {
            match c {
                '"' => in_double = true,
                '\'' => in_single = true,
                '`' => in_template = true,
                '(' => paren += 1,
                ')' => paren -= 1,
                '[' => square += 1,
                ']' => square -= 1,
                '{' => curly += 1,
                '}' => curly -= 1,
                _ => {}
            }
            if c == '/' {
                let before = chars[..i].iter().rev().map(|&(_, p)| p).find(|&p| p != ' ');
                if !before.is_some_and(is_division_char) {
                    in_regex = true;
                }
            }
        }
    }

    let expression = match expression {
        None => exp.trim().to_string(),
        Some(expression) => {
            filters.push(exp[last_filter_index..].trim().to_string());
            expression
        }
    };

    filters
        .iter()
        .fold(expression, |acc, filter| wrap_filter(&acc, filter))
}

fn wrap_filter(exp: &str, filter: &str) -> String {
    match filter.find('(') {
        None => format!("_f(\"{filter}\")({exp})"),
        Some(i) => {
            let name = &filter[..i];
            let args = &filter[i + 1..];
            if args == ")" {
                format!("_f(\"{name}\")({exp}{args}")
            } else {
                format!("_f(\"{name}\")({exp},{args}")
            }
        }
    }
}
