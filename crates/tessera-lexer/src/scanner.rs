//! Markup scanner.
//!
//! Reports start tags, end tags, text and comments to a [`Handler`] as it
//! walks the template once. The scanner tracks open elements only to close
//! them: it never builds a tree.
//!
//! ```
//! use tessera_lexer::{scan, Attr, Handler, Range, ScanOptions};
//!
//! #[derive(Default)]
//! struct Events(Vec<String>);
//!
//! impl Handler for Events {
//!     fn start(&mut self, tag: &str, _: Vec<Attr>, _: bool, _: usize, _: usize) {
//!         self.0.push(format!("<{tag}>"));
//!     }
//!     fn end(&mut self, tag: &str, _: usize, _: usize) {
//!         self.0.push(format!("</{tag}>"));
//!     }
//!     fn chars(&mut self, text: &str, _: Option<usize>, _: Option<usize>) {
//!         self.0.push(text.to_string());
//!     }
//!     fn comment(&mut self, _: &str, _: usize, _: usize) {}
//!     fn warn(&mut self, _: String, _: Range) {}
//! }
//!
//! let mut events = Events::default();
//! scan("<p>hi<b>there</p>", ScanOptions::default(), &mut events);
//! assert_eq!(events.0, ["<p>", "hi", "<b>", "there", "</b>", "</p>"]);
//! ```

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::entities::decode_attr;
use crate::token::{Attr, Range};
use crate::{is_plain_text_element, no};

// Name characters follow the XML ncname production, extended with the
// unicode ranges custom element names may use.
const NCNAME: &str = r"[a-zA-Z_][\-\.0-9_a-zA-Z\x{00B7}\x{00C0}-\x{00D6}\x{00D8}-\x{00F6}\x{00F8}-\x{037D}\x{037F}-\x{1FFF}\x{200C}-\x{200D}\x{203F}-\x{2040}\x{2070}-\x{218F}\x{2C00}-\x{2FEF}\x{3001}-\x{D7FF}\x{F900}-\x{FDCF}\x{FDF0}-\x{FFFD}]*";

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*([^\s"'<>/=]+)(?:\s*(=)\s*(?:"([^"]*)"+|'([^']*)'+|([^\s"'=<>`]+)))?"#)
        .expect("valid attribute pattern")
});

static DYNAMIC_ARG_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^\s*((?:v-[\w-]+:|@|:|#)\[[^=]+\][^\s"'<>/=]*)(?:\s*(=)\s*(?:"([^"]*)"+|'([^']*)'+|([^\s"'=<>`]+)))?"#,
    )
    .expect("valid dynamic attribute pattern")
});

static START_TAG_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^<((?:{NCNAME}:)?{NCNAME})")).expect("valid start tag pattern")
});

static START_TAG_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(/?)>").expect("valid start tag close pattern"));

static END_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^</((?:{NCNAME}:)?{NCNAME})[^>]*>")).expect("valid end tag pattern")
});

static DOCTYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^<!DOCTYPE [^>]+>").expect("valid doctype pattern"));

static RAW_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<!--([\s\S]*?)-->").expect("valid comment pattern"));

static RAW_CDATA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<!\[CDATA\[([\s\S]*?)]]>").expect("valid cdata pattern"));

/// Receives scanner events in source order.
///
/// Positions are byte offsets into the scanned source. Text found inside a
/// raw-text element, and a malformed tail that stopped the scan, carry no
/// positions.
pub trait Handler {
    fn start(&mut self, tag: &str, attrs: Vec<Attr>, unary: bool, start: usize, end: usize);
    fn end(&mut self, tag: &str, start: usize, end: usize);
    fn chars(&mut self, text: &str, start: Option<usize>, end: Option<usize>);
    fn comment(&mut self, text: &str, start: usize, end: usize);
    fn warn(&mut self, msg: String, range: Range);
}

/// Platform knowledge the scanner needs for implied tag closing and decoding.
#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    /// Apply HTML's implied-close rules for `<p>` and left-open tags.
    pub expect_html: bool,
    pub is_unary_tag: fn(&str) -> bool,
    pub can_be_left_open_tag: fn(&str) -> bool,
    pub is_non_phrasing_tag: fn(&str) -> bool,
    /// Elements whose body is text up to the matching end tag.
    pub is_raw_text_element: fn(&str) -> bool,
    pub should_decode_newlines: bool,
    pub should_decode_newlines_for_href: bool,
    pub should_keep_comment: bool,
    pub output_source_range: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            expect_html: false,
            is_unary_tag: no,
            can_be_left_open_tag: no,
            is_non_phrasing_tag: no,
            is_raw_text_element: is_plain_text_element,
            should_decode_newlines: false,
            should_decode_newlines_for_href: false,
            should_keep_comment: false,
            output_source_range: false,
        }
    }
}

/// An element that has been opened but not yet closed.
#[derive(Debug, Clone)]
struct OpenTag {
    tag: String,
    lower: String,
    start: usize,
    end: usize,
}

/// A start tag matched by `parse_start_tag`, before attribute decoding.
#[derive(Debug)]
struct StartTagMatch {
    tag_name: String,
    attrs: Vec<RawAttr>,
    start: usize,
    end: usize,
    unary_slash: bool,
}

#[derive(Debug)]
struct RawAttr {
    name: String,
    value: String,
    start: usize,
    end: usize,
}

/// Markup scanner.
///
/// Walks the source once, left to right, and reports every construct to a
/// [`Handler`]. Keeps its own stack of open tags so that unclosed elements are
/// always closed, either by a later end tag further up the stack or when the
/// input runs out.
pub struct Scanner<'a, H: Handler> {
    source: &'a str,
    index: usize,
    stack: Vec<OpenTag>,
    last_tag: Option<String>,
    options: ScanOptions,
    handler: &'a mut H,
    raw_end_patterns: HashMap<String, Option<Regex>>,
}

impl<'a, H: Handler> Scanner<'a, H> {
    /// Create a scanner reporting to `handler`.
    pub fn new(source: &'a str, options: ScanOptions, handler: &'a mut H) -> Self {
        Self {
            source,
            index: 0,
            stack: Vec::new(),
            last_tag: None,
            options,
            handler,
            raw_end_patterns: HashMap::new(),
        }
    }

    /// Scan `source` to completion.
    pub fn scan(source: &'a str, options: ScanOptions, handler: &'a mut H) {
        Scanner::new(source, options, handler).run();
    }

    /// Scan the whole input, then close whatever is still open.
    pub fn run(&mut self) {
        let source = self.source;
        while self.index < source.len() {
            let last = self.index;
            let in_raw_text = self
                .last_tag
                .as_deref()
                .is_some_and(|tag| (self.options.is_raw_text_element)(tag));

            if in_raw_text {
                self.scan_raw_text();
            } else if self.scan_markup() {
                continue;
            }

            if self.index == last {
                let rest = &source[self.index..];
                self.handler.chars(rest, None, None);
                if self.stack.is_empty() {
                    self.handler.warn(
                        format!("Mal-formatted tag at end of template: \"{rest}\""),
                        Range::at(self.index + rest.len()),
                    );
                }
                break;
            }
        }

        self.parse_end_tag(None, None, None);
    }

    // --- Markup ---

    /// Scan one markup construct or run of text. Returns `true` when a tag,
    /// comment or declaration was consumed.
    fn scan_markup(&mut self) -> bool {
        let source = self.source;
        let html = &source[self.index..];
        let text_end = html.find('<');

        if text_end == Some(0) {
            if html.starts_with("<!--") {
                if let Some(comment_end) = html.find("-->") {
                    if self.options.should_keep_comment {
                        let (from, to) = if comment_end < 4 {
                            (comment_end, 4)
                        } else {
                            (4, comment_end)
                        };
                        self.handler.comment(
                            &html[from..to],
                            self.index,
                            self.index + comment_end + 3,
                        );
                    }
                    self.advance(comment_end + 3);
                    return true;
                }
            }

            // Downlevel-revealed conditional comments: `<![if IE]>`, `<![endif]>`.
            if html.starts_with("<![") {
                if let Some(conditional_end) = html.find("]>") {
                    self.advance(conditional_end + 2);
                    return true;
                }
            }

            if let Some(doctype) = DOCTYPE.find(html) {
                self.advance(doctype.end());
                return true;
            }

            if let Some(caps) = END_TAG.captures(html) {
                let current = self.index;
                let tag = caps[1].to_string();
                self.advance(caps[0].len());
                let index = self.index;
                self.parse_end_tag(Some(&tag), Some(current), Some(index));
                return true;
            }

            if let Some(start_tag) = self.parse_start_tag() {
                let tag = start_tag.tag_name.clone();
                self.handle_start_tag(start_tag);
                if should_ignore_first_newline(&tag, &source[self.index..]) {
                    self.advance(1);
                }
                return true;
            }
        }

        // A failed start tag may already have consumed input, in which case
        // the text search continues from where it stopped.
        let html = &source[self.index..];
        let text = match text_end {
            Some(mut end) => {
                end = end.min(html.len());
                let mut rest = &html[end..];
                while !END_TAG.is_match(rest)
                    && !START_TAG_OPEN.is_match(rest)
                    && !rest.starts_with("<!--")
                    && !rest.starts_with("<![")
                {
                    // `<` in plain text: be forgiving and treat it as text.
                    let Some(first) = rest.chars().next() else {
                        break;
                    };
                    let skip = first.len_utf8();
                    let Some(next) = rest[skip..].find('<') else {
                        break;
                    };
                    end += skip + next;
                    rest = &html[end..];
                }
                &html[..end]
            }
            None => html,
        };

        if !text.is_empty() {
            self.advance(text.len());
            self.handler
                .chars(text, Some(self.index - text.len()), Some(self.index));
        }
        false
    }

    fn parse_start_tag(&mut self) -> Option<StartTagMatch> {
        let source = self.source;
        let caps = START_TAG_OPEN.captures(&source[self.index..])?;
        let mut matched = StartTagMatch {
            tag_name: caps[1].to_string(),
            attrs: Vec::new(),
            start: self.index,
            end: self.index,
            unary_slash: false,
        };
        self.advance(caps[0].len());

        loop {
            let html = &source[self.index..];
            if let Some(close) = START_TAG_CLOSE.captures(html) {
                matched.unary_slash = !close[1].is_empty();
                self.advance(close[0].len());
                matched.end = self.index;
                return Some(matched);
            }

            let attr = DYNAMIC_ARG_ATTRIBUTE
                .captures(html)
                .or_else(|| ATTRIBUTE.captures(html))?;
            let whole = &attr[0];
            let leading = whole.len() - whole.trim_start().len();
            let value = [3, 4, 5]
                .iter()
                .find_map(|&i| attr.get(i).map(|m| m.as_str()).filter(|v| !v.is_empty()))
                .unwrap_or_default();
            matched.attrs.push(RawAttr {
                name: attr[1].to_string(),
                value: value.to_string(),
                start: self.index + leading,
                end: self.index + whole.len(),
            });
            self.advance(whole.len());
        }
    }

    fn handle_start_tag(&mut self, matched: StartTagMatch) {
        let tag = matched.tag_name;

        if self.options.expect_html {
            if self.last_tag.as_deref() == Some("p") && (self.options.is_non_phrasing_tag)(&tag) {
                self.parse_end_tag(Some("p"), None, None);
            }
            if (self.options.can_be_left_open_tag)(&tag) && self.last_tag.as_deref() == Some(tag.as_str()) {
                self.parse_end_tag(Some(&tag), None, None);
            }
        }

        let unary = (self.options.is_unary_tag)(&tag) || matched.unary_slash;

        let attrs = matched
            .attrs
            .into_iter()
            .map(|raw| {
                let decode_newlines = if tag == "a" && raw.name == "href" {
                    self.options.should_decode_newlines_for_href
                } else {
                    self.options.should_decode_newlines
                };
                let value = decode_attr(&raw.value, decode_newlines).into_owned();
                let (start, end) = if self.options.output_source_range {
                    (Some(raw.start), Some(raw.end))
                } else {
                    (None, None)
                };
                Attr {
                    name: raw.name,
                    value,
                    start,
                    end,
                }
            })
            .collect();

        if !unary {
            self.stack.push(OpenTag {
                lower: tag.to_lowercase(),
                tag: tag.clone(),
                start: matched.start,
                end: matched.end,
            });
            self.last_tag = Some(tag.clone());
        }

        self.handler
            .start(&tag, attrs, unary, matched.start, matched.end);
    }

    /// Close the nearest open tag named `tag_name` and everything above it.
    /// With no name, close everything.
    fn parse_end_tag(&mut self, tag_name: Option<&str>, start: Option<usize>, end: Option<usize>) {
        let start = start.unwrap_or(self.index);
        let end = end.unwrap_or(self.index);

        let lower = tag_name.map(str::to_lowercase);
        let pos = match &lower {
            Some(lower) => self.stack.iter().rposition(|open| &open.lower == lower),
            None => Some(0),
        };

        match (pos, tag_name, lower.as_deref()) {
            (Some(pos), _, _) => {
                for i in (pos..self.stack.len()).rev() {
                    let open = self.stack[i].clone();
                    if i > pos || tag_name.is_none() {
                        self.handler.warn(
                            format!("tag <{}> has no matching end tag.", open.tag),
                            Range::new(open.start, open.end),
                        );
                    }
                    self.handler.end(&open.tag, start, end);
                }
                self.stack.truncate(pos);
                self.last_tag = self.stack.last().map(|open| open.tag.clone());
            }
            (None, Some(name), Some("br")) => {
                self.handler.start(name, Vec::new(), true, start, end);
            }
            (None, Some(name), Some("p")) => {
                self.handler.start(name, Vec::new(), false, start, end);
                self.handler.end(name, start, end);
            }
            _ => {}
        }
    }

    // --- Raw text ---

    /// Consume the body of a raw-text element up to its end tag.
    fn scan_raw_text(&mut self) {
        let source = self.source;
        let Some(stacked) = self.last_tag.as_deref().map(str::to_lowercase) else {
            return;
        };
        let html = &source[self.index..];

        let mut consumed = 0;
        let mut end_tag_len = 0;
        if let Some(caps) = self.raw_end_pattern(&stacked).and_then(|re| re.captures(html)) {
            end_tag_len = caps[2].len();
            consumed = caps[0].len();
            let mut text = caps[1].to_string();
            if !is_plain_text_element(&stacked) && stacked != "noscript" {
                text = RAW_COMMENT.replace_all(&text, "$1").into_owned();
                text = RAW_CDATA.replace_all(&text, "$1").into_owned();
            }
            if should_ignore_first_newline(&stacked, &text) {
                text.remove(0);
            }
            self.handler.chars(&text, None, None);
        }

        self.index += consumed;
        let index = self.index;
        self.parse_end_tag(Some(&stacked), Some(index - end_tag_len), Some(index));
    }

    fn raw_end_pattern(&mut self, tag: &str) -> Option<Regex> {
        self.raw_end_patterns
            .entry(tag.to_string())
            .or_insert_with(|| {
                let pattern = format!(r"(?i)([\s\S]*?)(</{}[^>]*>)", regex::escape(tag));
                match Regex::new(&pattern) {
                    Ok(re) => Some(re),
                    Err(err) => {
                        log::error!("cannot build end tag pattern for <{tag}>: {err}");
                        None
                    }
                }
            })
            .clone()
    }

    // --- Helpers ---

    fn advance(&mut self, n: usize) {
        self.index += n;
    }
}

/// `<pre>` and `<textarea>` drop a newline directly after the start tag.
fn should_ignore_first_newline(tag: &str, html: &str) -> bool {
    matches!(tag, "pre" | "textarea") && html.starts_with('\n')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Start(String, Vec<(String, String)>, bool),
        End(String),
        Chars(String),
        Comment(String),
        Warn(String),
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<Event>,
        positions: Vec<(String, Option<usize>, Option<usize>)>,
        attrs: Vec<Attr>,
    }

    impl Handler for Recorder {
        fn start(&mut self, tag: &str, attrs: Vec<Attr>, unary: bool, start: usize, end: usize) {
            let pairs = attrs
                .iter()
                .map(|a| (a.name.clone(), a.value.clone()))
                .collect();
            self.attrs.extend(attrs);
            self.positions
                .push((format!("<{tag}>"), Some(start), Some(end)));
            self.events.push(Event::Start(tag.to_string(), pairs, unary));
        }

        fn end(&mut self, tag: &str, start: usize, end: usize) {
            self.positions
                .push((format!("</{tag}>"), Some(start), Some(end)));
            self.events.push(Event::End(tag.to_string()));
        }

        fn chars(&mut self, text: &str, start: Option<usize>, end: Option<usize>) {
            self.positions.push((text.to_string(), start, end));
            self.events.push(Event::Chars(text.to_string()));
        }

        fn comment(&mut self, text: &str, _start: usize, _end: usize) {
            self.events.push(Event::Comment(text.to_string()));
        }

        fn warn(&mut self, msg: String, _range: Range) {
            self.events.push(Event::Warn(msg));
        }
    }

    fn scan_with(source: &str, options: ScanOptions) -> Recorder {
        let mut recorder = Recorder::default();
        Scanner::scan(source, options, &mut recorder);
        recorder
    }

    fn events(source: &str) -> Vec<Event> {
        scan_with(source, ScanOptions::default()).events
    }

    fn start(tag: &str, attrs: &[(&str, &str)], unary: bool) -> Event {
        Event::Start(
            tag.to_string(),
            attrs
                .iter()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect(),
            unary,
        )
    }

    fn end(tag: &str) -> Event {
        Event::End(tag.to_string())
    }

    fn chars(text: &str) -> Event {
        Event::Chars(text.to_string())
    }

    fn html_options() -> ScanOptions {
        fn unary(tag: &str) -> bool {
            matches!(tag, "br" | "img" | "input" | "hr")
        }
        fn left_open(tag: &str) -> bool {
            matches!(tag, "li" | "p" | "td" | "tr")
        }
        fn non_phrasing(tag: &str) -> bool {
            matches!(tag, "div" | "ul" | "li" | "p" | "table")
        }
        ScanOptions {
            expect_html: true,
            is_unary_tag: unary,
            can_be_left_open_tag: left_open,
            is_non_phrasing_tag: non_phrasing,
            ..ScanOptions::default()
        }
    }

    // =========================================================================
    // Elements and text
    // =========================================================================

    #[test]
    fn test_empty_source() {
        assert_eq!(events(""), vec![]);
    }

    #[test]
    fn test_simple_element() {
        assert_eq!(
            events(r#"<div id="app">hi</div>"#),
            vec![start("div", &[("id", "app")], false), chars("hi"), end("div")]
        );
    }

    #[test]
    fn test_positions() {
        let recorder = scan_with("<p>ab</p>", ScanOptions::default());
        assert_eq!(
            recorder.positions,
            vec![
                ("<p>".to_string(), Some(0), Some(3)),
                ("ab".to_string(), Some(3), Some(5)),
                ("</p>".to_string(), Some(5), Some(9)),
            ]
        );
    }

    #[test]
    fn test_self_closing_tag() {
        assert_eq!(
            events("<my-comp />"),
            vec![start("my-comp", &[], true)]
        );
    }

    #[test]
    fn test_unary_tag_from_options() {
        assert_eq!(
            scan_with("<div><br><img src=a></div>", html_options()).events,
            vec![
                start("div", &[], false),
                start("br", &[], true),
                start("img", &[("src", "a")], true),
                end("div"),
            ]
        );
    }

    #[test]
    fn test_attribute_quoting_styles() {
        assert_eq!(
            events(r#"<i a="1" b='2' c=3 d></i>"#),
            vec![
                start("i", &[("a", "1"), ("b", "2"), ("c", "3"), ("d", "")], false),
                end("i"),
            ]
        );
    }

    #[test]
    fn test_dynamic_argument_attributes() {
        assert_eq!(
            events(r#"<a :[key]="v" @[event].stop="h" v-bind:[name]="x"></a>"#),
            vec![
                start(
                    "a",
                    &[(":[key]", "v"), ("@[event].stop", "h"), ("v-bind:[name]", "x")],
                    false
                ),
                end("a"),
            ]
        );
    }

    #[test]
    fn test_attribute_positions_in_range_mode() {
        let options = ScanOptions {
            output_source_range: true,
            ..ScanOptions::default()
        };
        let recorder = scan_with(r#"<div  id="a" v-if="ok"></div>"#, options);
        let ranges: Vec<_> = recorder.attrs.iter().map(|a| (a.start, a.end)).collect();
        assert_eq!(ranges, vec![(Some(6), Some(12)), (Some(13), Some(22))]);
    }

    #[test]
    fn test_attribute_positions_omitted_by_default() {
        let recorder = scan_with(r#"<div id="a"></div>"#, ScanOptions::default());
        assert_eq!(recorder.attrs[0].start, None);
    }

    #[test]
    fn test_attribute_decoding() {
        assert_eq!(
            events(r#"<b title="a&amp;b&#10;c"></b>"#)[0],
            start("b", &[("title", "a&b&#10;c")], false)
        );
        let options = ScanOptions {
            should_decode_newlines: true,
            ..ScanOptions::default()
        };
        assert_eq!(
            scan_with(r#"<b title="a&#10;c"></b>"#, options).events[0],
            start("b", &[("title", "a\nc")], false)
        );
    }

    #[test]
    fn test_href_uses_its_own_newline_flag() {
        let options = ScanOptions {
            should_decode_newlines_for_href: true,
            ..ScanOptions::default()
        };
        assert_eq!(
            scan_with(r#"<a href="x&#10;y" title="x&#10;y"></a>"#, options).events[0],
            start("a", &[("href", "x\ny"), ("title", "x&#10;y")], false)
        );
    }

    #[test]
    fn test_less_than_in_text() {
        assert_eq!(
            events("<p>a < b</p>"),
            vec![start("p", &[], false), chars("a < b"), end("p")]
        );
    }

    #[test]
    fn test_case_insensitive_end_tag() {
        assert_eq!(events("<DIV></div>"), vec![start("DIV", &[], false), end("DIV")]);
    }

    // =========================================================================
    // Comments and declarations
    // =========================================================================

    #[test]
    fn test_comment_dropped_by_default() {
        assert_eq!(
            events("<div><!-- note --></div>"),
            vec![start("div", &[], false), end("div")]
        );
    }

    #[test]
    fn test_comment_kept() {
        let options = ScanOptions {
            should_keep_comment: true,
            ..ScanOptions::default()
        };
        assert_eq!(
            scan_with("<div><!-- note --></div>", options).events,
            vec![
                start("div", &[], false),
                Event::Comment(" note ".to_string()),
                end("div"),
            ]
        );
    }

    #[test]
    fn test_doctype_and_conditional_comment_skipped() {
        assert_eq!(
            events("<!DOCTYPE html><![if IE]><div></div><![endif]>"),
            vec![start("div", &[], false), end("div")]
        );
    }

    // =========================================================================
    // Recovery
    // =========================================================================

    #[test]
    fn test_unclosed_inner_tag_closed_by_outer_end() {
        assert_eq!(
            events("<div><span></div>"),
            vec![
                start("div", &[], false),
                start("span", &[], false),
                Event::Warn("tag <span> has no matching end tag.".to_string()),
                end("span"),
                end("div"),
            ]
        );
    }

    #[test]
    fn test_open_tags_closed_at_end_of_input() {
        assert_eq!(
            events("<div><p>"),
            vec![
                start("div", &[], false),
                start("p", &[], false),
                Event::Warn("tag <p> has no matching end tag.".to_string()),
                end("p"),
                Event::Warn("tag <div> has no matching end tag.".to_string()),
                end("div"),
            ]
        );
    }

    #[test]
    fn test_stray_end_tags() {
        assert_eq!(
            events("<div></br></p></span></div>"),
            vec![
                start("div", &[], false),
                start("br", &[], true),
                start("p", &[], false),
                end("p"),
                end("div"),
            ]
        );
    }

    #[test]
    fn test_implied_close_of_paragraph() {
        assert_eq!(
            scan_with("<p>a<div>b</div>", html_options()).events,
            vec![
                start("p", &[], false),
                chars("a"),
                end("p"),
                start("div", &[], false),
                chars("b"),
                end("div"),
            ]
        );
    }

    #[test]
    fn test_left_open_sibling() {
        assert_eq!(
            scan_with("<ul><li>a<li>b</ul>", html_options()).events,
            vec![
                start("ul", &[], false),
                start("li", &[], false),
                chars("a"),
                end("li"),
                start("li", &[], false),
                chars("b"),
                Event::Warn("tag <li> has no matching end tag.".to_string()),
                end("li"),
                end("ul"),
            ]
        );
    }

    #[test]
    fn test_malformed_tail() {
        assert_eq!(
            events("<div></div><"),
            vec![
                start("div", &[], false),
                end("div"),
                chars("<"),
                Event::Warn("Mal-formatted tag at end of template: \"<\"".to_string()),
            ]
        );
    }

    #[test]
    fn test_unterminated_start_tag_is_dropped() {
        assert_eq!(events(r#"<div class="a""#), vec![]);
    }

    // =========================================================================
    // Raw text elements
    // =========================================================================

    #[test]
    fn test_raw_text_body() {
        assert_eq!(
            events("<div><style>a<b{color:red}</STYLE></div>"),
            vec![
                start("div", &[], false),
                start("style", &[], false),
                chars("a<b{color:red}"),
                end("style"),
                end("div"),
            ]
        );
    }

    #[test]
    fn test_textarea_leading_newline() {
        assert_eq!(
            events("<textarea>\n\nhello</textarea>"),
            vec![start("textarea", &[], false), chars("hello"), end("textarea")]
        );
    }

    #[test]
    fn test_pre_leading_newline() {
        assert_eq!(
            events("<pre>\nx</pre>"),
            vec![start("pre", &[], false), chars("x"), end("pre")]
        );
    }

    #[test]
    fn test_custom_raw_text_element_unwraps_comments() {
        fn raw(tag: &str) -> bool {
            matches!(tag, "code-block")
        }
        let options = ScanOptions {
            is_raw_text_element: raw,
            ..ScanOptions::default()
        };
        assert_eq!(
            scan_with("<code-block><!--<b>--><![CDATA[x]]></code-block>", options).events,
            vec![start("code-block", &[], false), chars("<b>x"), end("code-block")]
        );
    }

    #[test]
    fn test_unterminated_raw_text() {
        assert_eq!(
            events("<script>let a"),
            vec![
                start("script", &[], false),
                end("script"),
                chars("let a"),
                Event::Warn("Mal-formatted tag at end of template: \"let a\"".to_string()),
            ]
        );
    }
}
