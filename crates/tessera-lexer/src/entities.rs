//! Character reference decoding.
//!
//! Attribute values only ever decode the handful of references that the
//! scanner itself produces when markup is inlined in a page. Text content is
//! decoded in full: every named reference in the HTML table (via the
//! `entities` crate) and decimal or hexadecimal numeric references.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static ENCODED_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(?:lt|gt|quot|amp|#39);").expect("valid attribute entity pattern"));

static ENCODED_ATTR_WITH_NEWLINES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:lt|gt|quot|amp|#39|#10|#9);").expect("valid attribute entity pattern")
});

static CHARACTER_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#[xX]([0-9a-fA-F]+);?|#([0-9]+);?|([A-Za-z][A-Za-z0-9]*);?)")
        .expect("valid character reference pattern")
});

/// Decode the references allowed inside attribute values.
pub fn decode_attr(value: &str, decode_newlines: bool) -> Cow<'_, str> {
    let re = if decode_newlines {
        &*ENCODED_ATTR_WITH_NEWLINES
    } else {
        &*ENCODED_ATTR
    };
    re.replace_all(value, |caps: &Captures| match &caps[0] {
        "&lt;" => "<",
        "&gt;" => ">",
        "&quot;" => "\"",
        "&amp;" => "&",
        "&#10;" => "\n",
        "&#9;" => "\t",
        "&#39;" => "'",
        other => other,
    }
    .to_string())
}

/// Decode every character reference in a run of text content.
///
/// Named references come from the full HTML table. Without a trailing
/// semicolon, or when the full name is unknown, only the legacy names
/// browsers accept are decoded, and they also match as a prefix
/// (`&notit;` is `¬it;`). Anything else is left untouched.
pub fn decode_html(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }
    CHARACTER_REFERENCE.replace_all(text, |caps: &Captures| {
        let whole = &caps[0];
        if let Some(hex) = caps.get(1) {
            return numeric(u32::from_str_radix(hex.as_str(), 16).ok());
        }
        if let Some(dec) = caps.get(2) {
            return numeric(dec.as_str().parse().ok());
        }
        let name = caps.get(3).map_or("", |m| m.as_str());
        if whole.ends_with(';') {
            if let Some(chars) = NAMED.get(name) {
                return chars.to_string();
            }
        }
        legacy_prefix(name)
            .and_then(|prefix| {
                let chars = NAMED.get(prefix)?;
                Some(format!("{chars}{}", &whole[1 + prefix.len()..]))
            })
            .unwrap_or_else(|| whole.to_string())
    })
}

/// Entity name (without `&` and `;`) to its characters.
static NAMED: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    ::entities::ENTITIES
        .iter()
        .filter_map(|entity| {
            let name = entity.entity.strip_prefix('&')?;
            Some((name.strip_suffix(';').unwrap_or(name), entity.characters))
        })
        .collect()
});

/// Names that decode without a semicolon.
const LEGACY: &[&str] = &[
    "AElig", "AMP", "Aacute", "Acirc", "Agrave", "Aring", "Atilde", "Auml", "COPY", "Ccedil",
    "ETH", "Eacute", "Ecirc", "Egrave", "Euml", "GT", "Iacute", "Icirc", "Igrave", "Iuml", "LT",
    "Ntilde", "Oacute", "Ocirc", "Ograve", "Oslash", "Otilde", "Ouml", "QUOT", "REG", "THORN",
    "Uacute", "Ucirc", "Ugrave", "Uuml", "Yacute", "aacute", "acirc", "acute", "aelig",
    "agrave", "amp", "aring", "atilde", "auml", "brvbar", "ccedil", "cedil", "cent", "copy",
    "curren", "deg", "divide", "eacute", "ecirc", "egrave", "eth", "euml", "frac12", "frac14",
    "frac34", "gt", "iacute", "icirc", "iexcl", "igrave", "iquest", "iuml", "laquo", "lt",
    "macr", "micro", "middot", "nbsp", "not", "ntilde", "oacute", "ocirc", "ograve", "ordf",
    "ordm", "oslash", "otilde", "ouml", "para", "plusmn", "pound", "quot", "raquo", "reg",
    "sect", "shy", "sup1", "sup2", "sup3", "szlig", "thorn", "times", "uacute", "ucirc",
    "ugrave", "uml", "uuml", "yacute", "yen", "yuml",
];

/// Longest legacy name `name` starts with.
fn legacy_prefix(name: &str) -> Option<&'static str> {
    LEGACY
        .iter()
        .copied()
        .filter(|legacy| name.starts_with(legacy))
        .max_by_key(|legacy| legacy.len())
}

/// Code points 0x80..=0x9F as browsers read them: windows-1252.
const WINDOWS_1252: [u32; 32] = [
    0x20AC, 0x81, 0x201A, 0x0192, 0x201E, 0x2026, 0x2020, 0x2021, 0x02C6, 0x2030, 0x0160,
    0x2039, 0x0152, 0x8D, 0x017D, 0x8F, 0x90, 0x2018, 0x2019, 0x201C, 0x201D, 0x2022, 0x2013,
    0x2014, 0x02DC, 0x2122, 0x0161, 0x203A, 0x0153, 0x9D, 0x017E, 0x0178,
];

fn numeric(code: Option<u32>) -> String {
    code.filter(|&c| c != 0)
        .map(|c| match c {
            0x80..=0x9F => WINDOWS_1252[(c - 0x80) as usize],
            _ => c,
        })
        .and_then(char::from_u32)
        .unwrap_or('\u{FFFD}')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_attr_basic() {
        assert_eq!(decode_attr("a &lt; b &amp;&amp; c", false), "a < b && c");
        assert_eq!(decode_attr("&quot;x&quot; &#39;y&#39;", false), "\"x\" 'y'");
    }

    #[test]
    fn test_decode_attr_newlines_only_when_asked() {
        assert_eq!(decode_attr("a&#10;b&#9;c", false), "a&#10;b&#9;c");
        assert_eq!(decode_attr("a&#10;b&#9;c", true), "a\nb\tc");
    }

    #[test]
    fn test_decode_attr_leaves_other_references() {
        assert_eq!(decode_attr("&copy; &nbsp;", true), "&copy; &nbsp;");
    }

    #[test]
    fn test_decode_html_named() {
        assert_eq!(decode_html("Tom &amp; Jerry &copy; 2024"), "Tom & Jerry © 2024");
        assert_eq!(decode_html("a&nbsp;b"), "a\u{00A0}b");
    }

    #[test]
    fn test_decode_html_full_table() {
        assert_eq!(decode_html("&hellip; &mdash; &euro; &rsquo;"), "\u{2026} \u{2014} \u{20AC} \u{2019}");
        assert_eq!(decode_html("&notin; &NotEqualTilde;"), "\u{2209} \u{2242}\u{0338}");
    }

    #[test]
    fn test_decode_html_legacy_prefix() {
        assert_eq!(decode_html("&noti; &copy2024"), "\u{00AC}i; \u{00A9}2024");
        assert_eq!(decode_html("&mdash"), "&mdash");
    }

    #[test]
    fn test_decode_html_numeric() {
        assert_eq!(decode_html("&#65;&#x42;&#X43;"), "ABC");
        assert_eq!(decode_html("&#0;"), "\u{FFFD}");
        assert_eq!(decode_html("&#128;&#x99;"), "\u{20AC}\u{2122}");
        assert_eq!(decode_html("&#xD800;"), "\u{FFFD}");
    }

    #[test]
    fn test_decode_html_unknown_kept() {
        assert_eq!(decode_html("&bogus; &amp"), "&bogus; &");
        assert_eq!(decode_html("&hellip"), "&hellip");
    }

    #[test]
    fn test_decode_html_borrowed_without_ampersand() {
        assert!(matches!(decode_html("plain"), Cow::Borrowed("plain")));
    }
}
