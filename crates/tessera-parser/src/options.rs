//! Parse options, platform predicates and module hooks.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use tessera_lexer::no;

use crate::ast::Element;
use crate::DiagnosticSink;

/// Whitespace policy between and around elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Whitespace {
    /// Whitespace-only text between elements becomes a single space.
    Preserve,
    /// Like `Preserve`, but runs containing a line break are dropped and
    /// whitespace runs inside text collapse to one space.
    Condense,
}

impl std::str::FromStr for Whitespace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preserve" => Ok(Whitespace::Preserve),
            "condense" => Ok(Whitespace::Condense),
            other => Err(format!("unknown whitespace mode '{other}'")),
        }
    }
}

/// Tag and attribute knowledge about the target platform.
#[derive(Clone, Copy)]
pub struct Platform {
    pub is_unary_tag: fn(&str) -> bool,
    pub can_be_left_open_tag: fn(&str) -> bool,
    pub is_non_phrasing_tag: fn(&str) -> bool,
    pub is_pre_tag: fn(&str) -> bool,
    /// `(tag, type attribute, attribute name)`: bind as a property.
    pub must_use_prop: fn(&str, Option<&str>, &str) -> bool,
    /// Native element rather than a component.
    pub is_reserved_tag: fn(&str) -> bool,
    pub get_tag_namespace: fn(&str) -> Option<&'static str>,
}

fn no_prop(_: &str, _: Option<&str>, _: &str) -> bool {
    false
}

fn no_namespace(_: &str) -> Option<&'static str> {
    None
}

impl Default for Platform {
    fn default() -> Self {
        Self {
            is_unary_tag: no,
            can_be_left_open_tag: no,
            is_non_phrasing_tag: no,
            is_pre_tag: no,
            must_use_prop: no_prop,
            is_reserved_tag: no,
            get_tag_namespace: no_namespace,
        }
    }
}

impl fmt::Debug for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Platform").finish_non_exhaustive()
    }
}

/// A set of platform hooks run on every element.
///
/// `pre_transform_node` runs right after the element is created, before any
/// structural directive is read. `transform_node` runs while the element's
/// attributes are resolved, before generic attribute processing, and
/// `post_transform_node` once the element is closed. `gen_data` contributes
/// to the generated data object and `static_keys` names the `extra` keys that
/// do not prevent an element from being static.
pub trait Module: Send + Sync {
    fn pre_transform_node(
        &self,
        _el: &mut Element,
        _options: &ParseOptions,
        _warn: &mut dyn DiagnosticSink,
    ) {
    }

    fn transform_node(
        &self,
        _el: &mut Element,
        _options: &ParseOptions,
        _warn: &mut dyn DiagnosticSink,
    ) {
    }

    fn post_transform_node(
        &self,
        _el: &mut Element,
        _options: &ParseOptions,
        _warn: &mut dyn DiagnosticSink,
    ) {
    }

    fn gen_data(&self, _el: &Element) -> String {
        String::new()
    }

    fn static_keys(&self) -> &[&'static str] {
        &[]
    }
}

/// Everything the tree builder needs to know, resolved once per compile.
#[derive(Clone)]
pub struct ParseOptions {
    pub delimiters: Option<(String, String)>,
    pub whitespace: Option<Whitespace>,
    /// Only consulted when `whitespace` is unset.
    pub preserve_whitespace: bool,
    pub output_source_range: bool,
    pub comments: bool,
    pub expect_html: bool,
    pub should_decode_newlines: bool,
    pub should_decode_newlines_for_href: bool,
    pub platform: Platform,
    pub modules: Vec<Arc<dyn Module>>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            delimiters: None,
            whitespace: None,
            preserve_whitespace: true,
            output_source_range: false,
            comments: false,
            expect_html: false,
            should_decode_newlines: false,
            should_decode_newlines_for_href: false,
            platform: Platform::default(),
            modules: Vec::new(),
        }
    }
}

impl fmt::Debug for ParseOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseOptions")
            .field("delimiters", &self.delimiters)
            .field("whitespace", &self.whitespace)
            .field("preserve_whitespace", &self.preserve_whitespace)
            .field("output_source_range", &self.output_source_range)
            .field("comments", &self.comments)
            .field("expect_html", &self.expect_html)
            .field("modules", &self.modules.len())
            .finish_non_exhaustive()
    }
}

impl ParseOptions {
    /// Element may render a component: bound with `is`, or not a native tag.
    pub fn maybe_component(&self, el: &Element) -> bool {
        el.component.is_some() || !(self.platform.is_reserved_tag)(&el.tag)
    }
}
