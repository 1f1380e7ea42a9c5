//! The browser platform: HTML/SVG tag knowledge, the `class` and `style`
//! modules and the `v-model`/`v-text`/`v-html` directives.

pub mod directives;
pub mod modules;

use std::sync::Arc;

use tessera_codegen::DirectiveSet;
use tessera_parser::{Module, Platform};

use crate::BaseOptions;

const HTML_TAGS: &[&str] = &[
    "html", "body", "base", "head", "link", "meta", "style", "title", "address", "article",
    "aside", "footer", "header", "h1", "h2", "h3", "h4", "h5", "h6", "hgroup", "nav", "section",
    "div", "dd", "dl", "dt", "figcaption", "figure", "picture", "hr", "img", "li", "main", "ol",
    "p", "pre", "ul", "a", "b", "abbr", "bdi", "bdo", "br", "cite", "code", "data", "dfn", "em",
    "i", "kbd", "mark", "q", "rp", "rt", "rtc", "ruby", "s", "samp", "small", "span", "strong",
    "sub", "sup", "time", "u", "var", "wbr", "area", "audio", "map", "track", "video", "embed",
    "object", "param", "source", "canvas", "script", "noscript", "del", "ins", "caption", "col",
    "colgroup", "table", "thead", "tbody", "td", "th", "tr", "button", "datalist", "fieldset",
    "form", "input", "label", "legend", "meter", "optgroup", "option", "output", "progress",
    "select", "textarea", "details", "dialog", "menu", "menuitem", "summary", "content",
    "element", "shadow", "template", "blockquote", "iframe", "tfoot",
];

/// Matched case-insensitively.
const SVG_TAGS: &[&str] = &[
    "svg", "animate", "circle", "clippath", "cursor", "defs", "desc", "ellipse", "filter",
    "font-face", "foreignobject", "g", "glyph", "image", "line", "marker", "mask",
    "missing-glyph", "path", "pattern", "polygon", "polyline", "rect", "switch", "symbol", "text",
    "textpath", "tspan", "use", "view",
];

const UNARY_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "frame", "hr", "img", "input", "isindex", "keygen",
    "link", "meta", "param", "source", "track", "wbr",
];

/// Elements whose end tag may be omitted.
const LEFT_OPEN_TAGS: &[&str] = &[
    "colgroup", "dd", "dt", "li", "options", "p", "td", "tfoot", "th", "thead", "tr", "source",
];

const NON_PHRASING_TAGS: &[&str] = &[
    "address", "article", "aside", "base", "blockquote", "body", "caption", "col", "colgroup",
    "dd", "details", "dialog", "div", "dl", "dt", "fieldset", "figcaption", "figure", "footer",
    "form", "h1", "h2", "h3", "h4", "h5", "h6", "head", "header", "hgroup", "hr", "html",
    "legend", "li", "menuitem", "meta", "optgroup", "option", "param", "rp", "rt", "source",
    "style", "summary", "tbody", "td", "tfoot", "th", "thead", "title", "tr", "track",
];

/// Form controls whose `value` is a property.
const ACCEPT_VALUE_TAGS: &[&str] = &["input", "textarea", "option", "select", "progress"];

pub fn is_html_tag(tag: &str) -> bool {
    HTML_TAGS.contains(&tag)
}

pub fn is_svg(tag: &str) -> bool {
    SVG_TAGS.contains(&tag.to_ascii_lowercase().as_str())
}

pub fn is_reserved_tag(tag: &str) -> bool {
    is_html_tag(tag) || is_svg(tag)
}

pub fn is_unary_tag(tag: &str) -> bool {
    UNARY_TAGS.contains(&tag)
}

pub fn can_be_left_open_tag(tag: &str) -> bool {
    LEFT_OPEN_TAGS.contains(&tag)
}

pub fn is_non_phrasing_tag(tag: &str) -> bool {
    NON_PHRASING_TAGS.contains(&tag)
}

pub fn is_pre_tag(tag: &str) -> bool {
    tag == "pre"
}

/// Attributes bound as DOM properties rather than attributes.
pub fn must_use_prop(tag: &str, type_attr: Option<&str>, attr: &str) -> bool {
    (attr == "value" && ACCEPT_VALUE_TAGS.contains(&tag) && type_attr != Some("button"))
        || (attr == "selected" && tag == "option")
        || (attr == "checked" && tag == "input")
        || (attr == "muted" && tag == "video")
}

pub fn get_tag_namespace(tag: &str) -> Option<&'static str> {
    if is_svg(tag) {
        Some("svg")
    } else if tag == "math" {
        Some("math")
    } else {
        None
    }
}

pub fn platform() -> Platform {
    Platform {
        is_unary_tag,
        can_be_left_open_tag,
        is_non_phrasing_tag,
        is_pre_tag,
        must_use_prop,
        is_reserved_tag,
        get_tag_namespace,
    }
}

/// Base options for compiling templates rendered in a browser.
pub fn base_options() -> BaseOptions {
    let modules: Vec<Arc<dyn Module>> =
        vec![Arc::new(modules::ClassModule), Arc::new(modules::StyleModule)];
    let mut directives = DirectiveSet::new();
    directives.insert("model", Arc::new(directives::ModelDirective));
    directives.insert("text", Arc::new(directives::TextDirective));
    directives.insert("html", Arc::new(directives::HtmlDirective));
    BaseOptions {
        expect_html: true,
        platform: platform(),
        modules,
        directives,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // =========================================================================
    // Tag tables
    // =========================================================================

    #[test]
    fn test_reserved_tags() {
        assert!(is_reserved_tag("div"));
        assert!(is_reserved_tag("template"));
        assert!(is_reserved_tag("circle"));
        assert!(!is_reserved_tag("my-comp"));
        assert!(!is_reserved_tag("Div"));
    }

    #[test]
    fn test_svg_case_insensitive() {
        assert!(is_svg("foreignObject"));
        assert!(is_svg("clipPath"));
        assert!(!is_svg("div"));
    }

    #[test]
    fn test_namespaces() {
        assert_eq!(get_tag_namespace("svg"), Some("svg"));
        assert_eq!(get_tag_namespace("path"), Some("svg"));
        assert_eq!(get_tag_namespace("math"), Some("math"));
        assert_eq!(get_tag_namespace("div"), None);
    }

    #[test]
    fn test_html_tables() {
        assert!(is_unary_tag("br"));
        assert!(!is_unary_tag("div"));
        assert!(can_be_left_open_tag("li"));
        assert!(is_non_phrasing_tag("div"));
        assert!(!is_non_phrasing_tag("span"));
        assert!(is_pre_tag("pre"));
    }

    // =========================================================================
    // Property bindings
    // =========================================================================

    #[test]
    fn test_must_use_prop() {
        assert!(must_use_prop("input", None, "value"));
        assert!(must_use_prop("input", Some("text"), "value"));
        assert!(!must_use_prop("input", Some("button"), "value"));
        assert!(must_use_prop("option", None, "selected"));
        assert!(must_use_prop("input", Some("checkbox"), "checked"));
        assert!(must_use_prop("video", None, "muted"));
        assert!(!must_use_prop("div", None, "value"));
        assert!(!must_use_prop("audio", None, "muted"));
    }

    #[test]
    fn test_base_options() {
        let base = base_options();
        assert!(base.expect_html);
        assert_eq!(base.modules.len(), 2);
        let mut names: Vec<_> = base.directives.names().collect();
        names.sort();
        assert_eq!(names, vec!["html", "model", "text"]);
    }
}
