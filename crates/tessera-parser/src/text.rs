//! Text interpolation: `Hello {{ name | capitalize }}!`.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::filter::parse_filters;
use crate::json_string;

static DEFAULT_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{((?:.|\r?\n)+?)\}\}").expect("valid interpolation pattern")
});

/// A piece of interpolated text, for tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TextToken {
    Literal(String),
    Binding {
        #[serde(rename = "@binding")]
        binding: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedText {
    /// `+`-joined concatenation of JSON literals and `_s(...)` calls.
    pub expression: String,
    pub tokens: Vec<TextToken>,
}

fn delimiter_pattern(delimiters: &(String, String)) -> Option<Regex> {
    let pattern = format!(
        r"{}((?:.|\n)+?){}",
        regex::escape(&delimiters.0),
        regex::escape(&delimiters.1)
    );
    match Regex::new(&pattern) {
        Ok(re) => Some(re),
        Err(err) => {
            log::error!("cannot build interpolation pattern for {delimiters:?}: {err}");
            None
        }
    }
}

/// Split `text` into literal and interpolated parts.
///
/// Returns `None` when the text contains no interpolation at all.
pub fn parse_text(text: &str, delimiters: Option<&(String, String)>) -> Option<ParsedText> {
    let tag_re: Cow<'_, Regex> = match delimiters {
        Some(delimiters) => Cow::Owned(delimiter_pattern(delimiters)?),
        None => Cow::Borrowed(&*DEFAULT_TAG),
    };
    if !tag_re.is_match(text) {
        return None;
    }

    let mut parts = Vec::new();
    let mut tokens = Vec::new();
    let mut last_index = 0;

    for caps in tag_re.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > last_index {
            let literal = &text[last_index..whole.start()];
            parts.push(json_string(literal));
            tokens.push(TextToken::Literal(literal.to_string()));
        }
        let exp = parse_filters(caps[1].trim());
        parts.push(format!("_s({exp})"));
        tokens.push(TextToken::Binding { binding: exp });
        last_index = whole.end();
    }

    if last_index < text.len() {
        let literal = &text[last_index..];
        parts.push(json_string(literal));
        tokens.push(TextToken::Literal(literal.to_string()));
    }

    Some(ParsedText {
        expression: parts.join("+"),
        tokens,
    })
}
