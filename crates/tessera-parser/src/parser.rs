//! Tree builder and directive resolver.
//!
//! Drives the markup scanner and materializes an [`Ast`]. Structural
//! directives (`v-pre`, `v-for`, `v-if` family, `v-once`) are read when an
//! element opens; everything else (keys, refs, slots, components, bindings,
//! events, generic directives) is resolved when it closes, once its children
//! are known.
//!
//! Problems are reported to the [`DiagnosticSink`] and never stop the build.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use tessera_lexer::{decode_html, is_plain_text_element, Attr, Range, ScanOptions, Scanner};

use crate::ast::{
    Ast, AttrsMap, Binding, Directive, Element, ExpressionText, IfCondition, LiteralText,
    Modifiers, Node, NodeId, NodeKind,
};
use crate::filter::parse_filters;
use crate::helpers::{
    add_attr, add_directive, add_handler, add_prop, get_and_remove_attr,
    get_and_remove_attr_by_regex, get_binding_attr, get_raw_binding_attr, HandlerSpec,
};
use crate::model::gen_assignment_code;
use crate::options::{ParseOptions, Whitespace};
use crate::text::parse_text;
use crate::{camelize, hyphenate, json_string, DiagnosticSink};

/// Slot scope given to `v-slot` content without a binding.
pub const EMPTY_SLOT_SCOPE_TOKEN: &str = "_empty_";

fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("valid builder pattern")
}

/// Attribute names that are directives.
pub static DIR_RE: LazyLock<Regex> = LazyLock::new(|| pattern(r"^v-|^@|^:|^#"));
pub static ON_RE: LazyLock<Regex> = LazyLock::new(|| pattern(r"^@|^v-on:"));
pub static BIND_RE: LazyLock<Regex> = LazyLock::new(|| pattern(r"^:|^\.|^v-bind:"));
static FOR_ALIAS_RE: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"([\s\S]*?)\s+(?:in|of)\s+([\s\S]*)"));
static FOR_ITERATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| pattern(r",([^,\}\]]*)(?:,([^,\}\]]*))?$"));
static STRIP_PARENS_RE: LazyLock<Regex> = LazyLock::new(|| pattern(r"^\(|\)$"));
static DYNAMIC_ARG_RE: LazyLock<Regex> = LazyLock::new(|| pattern(r"^\[.*\]$"));
static ARG_RE: LazyLock<Regex> = LazyLock::new(|| pattern(r":(.*)$"));
static SLOT_RE: LazyLock<Regex> = LazyLock::new(|| pattern(r"^v-slot(:|$)|^#"));
static LINE_BREAK_RE: LazyLock<Regex> = LazyLock::new(|| pattern(r"[\r\n]"));
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| pattern(r"\s+"));
static INVALID_ATTRIBUTE_RE: LazyLock<Regex> = LazyLock::new(|| pattern(r#"[\s"'<>/=]"#));

/// Build the tree for `template`.
pub fn parse(template: &str, options: &ParseOptions, sink: &mut dyn DiagnosticSink) -> Ast {
    let scan_options = ScanOptions {
        expect_html: options.expect_html,
        is_unary_tag: options.platform.is_unary_tag,
        can_be_left_open_tag: options.platform.can_be_left_open_tag,
        is_non_phrasing_tag: options.platform.is_non_phrasing_tag,
        is_raw_text_element: is_plain_text_element,
        should_decode_newlines: options.should_decode_newlines,
        should_decode_newlines_for_href: options.should_decode_newlines_for_href,
        should_keep_comment: options.comments,
        output_source_range: options.output_source_range,
    };

    let mut builder = TreeBuilder {
        template,
        options,
        sink,
        ast: Ast::new(),
        stack: Vec::new(),
        current_parent: None,
        in_v_pre: false,
        in_pre: false,
        warned: false,
    };
    Scanner::scan(template, scan_options, &mut builder);

    log::debug!(
        "built tree with {} nodes, root: {:?}",
        builder.ast.len(),
        builder.ast.root
    );
    builder.ast
}

// =============================================================================
// v-for
// =============================================================================

/// Parts of a `v-for` expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForParseResult {
    pub for_exp: String,
    pub alias: String,
    pub iterator1: Option<String>,
    pub iterator2: Option<String>,
}

/// Split `(item, index) in list` into iterable, alias and iterators.
pub fn parse_for(exp: &str) -> Option<ForParseResult> {
    let caps = FOR_ALIAS_RE.captures(exp)?;
    let for_exp = caps[2].trim().to_string();
    let alias = STRIP_PARENS_RE.replace_all(caps[1].trim(), "").into_owned();

    match FOR_ITERATOR_RE.captures(&alias) {
        Some(iterators) => Some(ForParseResult {
            for_exp,
            alias: FOR_ITERATOR_RE.replace(&alias, "").trim().to_string(),
            iterator1: Some(iterators[1].trim().to_string()),
            iterator2: iterators
                .get(2)
                .filter(|m| !m.as_str().is_empty())
                .map(|m| m.as_str().trim().to_string()),
        }),
        None => Some(ForParseResult {
            for_exp,
            alias,
            iterator1: None,
            iterator2: None,
        }),
    }
}

// =============================================================================
// Modifiers
// =============================================================================

/// Byte spans of `.modifier` segments. Only dots after the last `]` count, so
/// a dynamic argument like `[a.b]` is never split.
fn modifier_spans(name: &str) -> Vec<(usize, usize)> {
    let tail = name.rfind(']').map_or(0, |i| i + 1);
    let mut spans = Vec::new();
    let mut i = tail;
    while let Some(dot) = name[i..].find('.').map(|d| d + i) {
        let run = name[dot + 1..].find('.').map_or(name.len(), |d| d + dot + 1);
        if run > dot + 1 {
            spans.push((dot, run));
        }
        i = run.max(dot + 1);
    }
    spans
}

fn parse_modifiers(name: &str) -> Option<Modifiers> {
    let spans = modifier_spans(name);
    if spans.is_empty() {
        return None;
    }
    Some(spans.iter().map(|&(s, e)| &name[s + 1..e]).collect())
}

fn strip_modifiers(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last = 0;
    for (s, e) in modifier_spans(name) {
        out.push_str(&name[last..s]);
        last = e;
    }
    out.push_str(&name[last..]);
    out
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// `[expr]` → `expr`.
fn unwrap_brackets(value: &str) -> String {
    value[1..value.len() - 1].to_string()
}

// =============================================================================
// Builder
// =============================================================================

struct TreeBuilder<'a> {
    template: &'a str,
    options: &'a ParseOptions,
    sink: &'a mut dyn DiagnosticSink,
    ast: Ast,
    stack: Vec<NodeId>,
    current_parent: Option<NodeId>,
    in_v_pre: bool,
    in_pre: bool,
    warned: bool,
}

impl tessera_lexer::Handler for TreeBuilder<'_> {
    fn start(&mut self, tag: &str, attrs: Vec<Attr>, unary: bool, start: usize, end: usize) {
        self.open_element(tag, attrs, unary, start, end);
    }

    fn end(&mut self, _tag: &str, _start: usize, end: usize) {
        let Some(id) = self.stack.pop() else {
            return;
        };
        self.current_parent = self.stack.last().copied();
        if self.options.output_source_range {
            if let Some(node) = self.ast.node_mut(id) {
                node.end = Some(end);
            }
        }
        self.close_element(id);
    }

    fn chars(&mut self, text: &str, start: Option<usize>, end: Option<usize>) {
        self.add_text(text, start, end);
    }

    fn comment(&mut self, text: &str, start: usize, end: usize) {
        let Some(parent) = self.current_parent else {
            return;
        };
        let (start, end) = self.positions(start, end);
        self.push_child(
            parent,
            Node {
                parent: Some(parent),
                start,
                end,
                kind: NodeKind::Text(LiteralText {
                    text: text.to_string(),
                    is_comment: true,
                }),
            },
        );
    }

    fn warn(&mut self, msg: String, range: Range) {
        self.sink.warn(msg, range, false);
    }
}

impl TreeBuilder<'_> {
    fn warn(&mut self, msg: impl Into<String>, range: Range) {
        self.sink.warn(msg.into(), range, false);
    }

    fn tip(&mut self, msg: impl Into<String>, range: Range) {
        self.sink.warn(msg.into(), range, true);
    }

    fn warn_once(&mut self, msg: impl Into<String>, range: Range) {
        if !self.warned {
            self.warned = true;
            self.warn(msg, range);
        }
    }

    fn positions(&self, start: usize, end: usize) -> (Option<usize>, Option<usize>) {
        if self.options.output_source_range {
            (Some(start), Some(end))
        } else {
            (None, None)
        }
    }

    fn start_of(&self, id: NodeId) -> Range {
        Range::from_options(self.ast.range(id).start, None)
    }

    fn push_child(&mut self, parent: NodeId, node: Node) {
        let id = self.ast.push(node);
        if let Some(el) = self.ast.element_mut(parent) {
            el.children.push(id);
        }
    }

    fn is_pre_tag(&self, tag: &str) -> bool {
        (self.options.platform.is_pre_tag)(tag)
    }

    fn slot_scope_of(&self, id: NodeId) -> bool {
        self.ast.element(id).is_some_and(|el| el.slot_scope.is_some())
    }

    // --- Opening ---

    fn open_element(&mut self, tag: &str, attrs: Vec<Attr>, unary: bool, start: usize, end: usize) {
        let ns = self
            .current_parent
            .and_then(|p| self.ast.element(p))
            .and_then(|p| p.ns.clone())
            .or_else(|| (self.options.platform.get_tag_namespace)(tag).map(str::to_string));

        let mut el = Element {
            tag: tag.to_string(),
            attrs_map: self.make_attrs_map(&attrs),
            attrs_list: attrs,
            ns,
            ..Element::default()
        };
        let (node_start, node_end) = self.positions(start, end);
        if self.options.output_source_range {
            el.raw_attrs = el.attrs_list.clone();
        }

        for attr in &el.attrs_list {
            if INVALID_ATTRIBUTE_RE.is_match(&attr.name) {
                let bracket = attr.name.find('[');
                let range = Range::from_options(
                    attr.start.map(|s| match bracket {
                        Some(i) => s + i,
                        None => s.saturating_sub(1),
                    }),
                    attr.start.map(|s| s + attr.name.len()),
                );
                self.sink.warn(
                    "Invalid dynamic argument expression: attribute names cannot contain \
                     spaces, quotes, <, >, / or =."
                        .to_string(),
                    range,
                    false,
                );
            }
        }

        if is_forbidden_tag(&el) {
            el.forbidden = true;
            self.warn(
                format!(
                    "Templates should only be responsible for mapping the state to the UI. \
                     Avoid placing tags with side-effects in your templates, such as <{tag}>, \
                     as they will not be parsed."
                ),
                Range::from_options(node_start, None),
            );
        }

        for module in &self.options.modules {
            module.pre_transform_node(&mut el, self.options, &mut *self.sink);
        }

        if !self.in_v_pre {
            if get_and_remove_attr(&mut el, "v-pre", false).is_some() {
                el.pre = true;
            }
            if el.pre {
                self.in_v_pre = true;
            }
        }
        if self.is_pre_tag(&el.tag) {
            self.in_pre = true;
        }

        let id = self.ast.push(Node {
            parent: self.current_parent,
            start: node_start,
            end: node_end,
            kind: NodeKind::Element(Element::default()),
        });

        if self.in_v_pre {
            process_raw_attrs(&mut el);
        } else if !el.processed {
            self.process_for(&mut el);
            process_if(&mut el, id);
            if get_and_remove_attr(&mut el, "v-once", false).is_some() {
                el.once = true;
            }
        }
        self.ast.restore_element(id, el);

        if self.ast.root.is_none() {
            self.ast.root = Some(id);
            self.check_root_constraints(id);
        }

        if unary {
            self.close_element(id);
        } else {
            self.current_parent = Some(id);
            self.stack.push(id);
        }
    }

    fn make_attrs_map(&mut self, attrs: &[Attr]) -> AttrsMap {
        let mut map = AttrsMap::default();
        for attr in attrs {
            if map.get(&attr.name).is_some_and(|v| !v.is_empty()) {
                self.warn(format!("duplicate attribute: {}", attr.name), attr.range());
            }
            map.insert(attr.name.clone(), attr.value.clone());
        }
        map
    }

    fn check_root_constraints(&mut self, id: NodeId) {
        let Some(el) = self.ast.element(id) else {
            return;
        };
        let tag = el.tag.clone();
        let has_for = el.attrs_map.contains("v-for");
        let for_range = el.raw_attr_range("v-for");
        if tag == "slot" || tag == "template" {
            self.warn_once(
                format!(
                    "Cannot use <{tag}> as component root element because it may contain \
                     multiple nodes."
                ),
                self.start_of(id),
            );
        }
        if has_for {
            self.warn_once(
                "Cannot use v-for on stateful component root element because it renders \
                 multiple elements.",
                for_range,
            );
        }
    }

    fn process_for(&mut self, el: &mut Element) {
        let Some(exp) = non_empty(get_and_remove_attr(el, "v-for", false)) else {
            return;
        };
        match parse_for(&exp) {
            Some(res) => {
                el.for_exp = Some(res.for_exp);
                el.alias = Some(res.alias);
                el.iterator1 = res.iterator1;
                el.iterator2 = res.iterator2;
            }
            None => self.warn(
                format!("Invalid v-for expression: {exp}"),
                el.raw_attr_range("v-for"),
            ),
        }
    }

    // --- Text ---

    fn add_text(&mut self, text: &str, start: Option<usize>, end: Option<usize>) {
        let Some(parent) = self.current_parent else {
            if text == self.template {
                self.warn_once(
                    "Component template requires a root element, rather than just text.",
                    Range::from_options(start, None),
                );
            } else {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    self.warn_once(
                        format!("text \"{trimmed}\" outside root element will be ignored."),
                        Range::from_options(start, None),
                    );
                }
            }
            return;
        };
        let Some(parent_el) = self.ast.element(parent) else {
            return;
        };
        let has_children = !parent_el.children.is_empty();
        let last_is_space = parent_el
            .children
            .last()
            .and_then(|&c| self.ast.text(c))
            .is_some_and(|t| t == " ");
        let is_text_tag = matches!(parent_el.tag.as_str(), "script" | "style");

        let mut text: Cow<'_, str> = if self.in_pre || !text.trim().is_empty() {
            if is_text_tag {
                Cow::Borrowed(text)
            } else {
                decode_html(text)
            }
        } else if !has_children {
            Cow::Borrowed("")
        } else {
            match self.options.whitespace {
                Some(Whitespace::Condense) if LINE_BREAK_RE.is_match(text) => Cow::Borrowed(""),
                Some(_) => Cow::Borrowed(" "),
                None if self.options.preserve_whitespace => Cow::Borrowed(" "),
                None => Cow::Borrowed(""),
            }
        };
        if text.is_empty() {
            return;
        }
        if !self.in_pre && self.options.whitespace == Some(Whitespace::Condense) {
            text = Cow::Owned(WHITESPACE_RE.replace_all(&text, " ").into_owned());
        }

        let (start, end) = if self.options.output_source_range {
            (start, end)
        } else {
            (None, None)
        };

        let parsed = if !self.in_v_pre && text != " " {
            parse_text(&text, self.options.delimiters.as_ref())
        } else {
            None
        };
        let kind = match parsed {
            Some(parsed) => NodeKind::Expression(ExpressionText {
                expression: parsed.expression,
                tokens: parsed.tokens,
                text: text.into_owned(),
            }),
            None if text != " " || !has_children || !last_is_space => {
                NodeKind::Text(LiteralText {
                    text: text.into_owned(),
                    is_comment: false,
                })
            }
            None => return,
        };
        self.push_child(
            parent,
            Node {
                parent: Some(parent),
                start,
                end,
                kind,
            },
        );
    }

    // --- Closing ---

    fn close_element(&mut self, id: NodeId) {
        self.trim_ending_whitespace(id);
        let processed = self.ast.element(id).is_some_and(|el| el.processed);
        if !self.in_v_pre && !processed {
            self.process_element(id);
        }

        let Some(el) = self.ast.element(id) else {
            return;
        };
        let is_branch = el.elseif.is_some() || el.else_;
        let elseif = el.elseif.clone();
        let forbidden = el.forbidden;
        let slot_scope = el.slot_scope.is_some();
        let slot_target = el.slot_target.clone();

        if self.stack.is_empty() && self.ast.root != Some(id) {
            let root = self.ast.root;
            let root_has_if = root
                .and_then(|r| self.ast.element(r))
                .is_some_and(|r| r.if_exp.is_some());
            match root {
                Some(root) if root_has_if && is_branch => {
                    self.check_root_constraints(id);
                    if let Some(root_el) = self.ast.element_mut(root) {
                        root_el.if_conditions.push(IfCondition {
                            exp: elseif.clone(),
                            block: id,
                        });
                    }
                }
                _ => self.warn_once(
                    "Component template should contain exactly one root element. \
                     If you are using v-if on multiple elements, \
                     use v-else-if to chain them instead.",
                    self.start_of(id),
                ),
            }
        }

        if let Some(parent) = self.current_parent {
            if !forbidden {
                if is_branch {
                    self.process_if_conditions(id, parent);
                } else {
                    if slot_scope {
                        let name = slot_target.unwrap_or_else(|| "\"default\"".to_string());
                        if let Some(parent_el) = self.ast.element_mut(parent) {
                            parent_el.add_scoped_slot(name, id);
                        }
                    }
                    if let Some(parent_el) = self.ast.element_mut(parent) {
                        parent_el.children.push(id);
                    }
                    if let Some(node) = self.ast.node_mut(id) {
                        node.parent = Some(parent);
                    }
                }
            }
        }

        // Scoped slot content is rendered through `scopedSlots`, not as children.
        let children: Vec<NodeId> = self
            .ast
            .children(id)
            .iter()
            .copied()
            .filter(|&c| !self.slot_scope_of(c))
            .collect();
        if let Some(el) = self.ast.element_mut(id) {
            el.children = children;
        }
        self.trim_ending_whitespace(id);

        let (pre, tag) = match self.ast.element(id) {
            Some(el) => (el.pre, el.tag.clone()),
            None => return,
        };
        if pre {
            self.in_v_pre = false;
        }
        if self.is_pre_tag(&tag) {
            self.in_pre = false;
        }

        if !self.options.modules.is_empty() {
            if let Some(mut el) = self.ast.take_element(id) {
                for module in &self.options.modules {
                    module.post_transform_node(&mut el, self.options, &mut *self.sink);
                }
                self.ast.restore_element(id, el);
            }
        }
    }

    fn trim_ending_whitespace(&mut self, id: NodeId) {
        if self.in_pre {
            return;
        }
        loop {
            let Some(&last) = self.ast.children(id).last() else {
                return;
            };
            let is_space = self.ast.is_literal_text(last) && self.ast.text(last) == Some(" ");
            if !is_space {
                return;
            }
            if let Some(el) = self.ast.element_mut(id) {
                el.children.pop();
            }
        }
    }

    fn process_if_conditions(&mut self, id: NodeId, parent: NodeId) {
        let prev = self.find_prev_element(parent);
        let prev_has_if = prev
            .and_then(|p| self.ast.element(p))
            .is_some_and(|p| p.if_exp.is_some());
        let Some(el) = self.ast.element(id) else {
            return;
        };
        let elseif = el.elseif.clone();

        match prev {
            Some(prev) if prev_has_if => {
                if let Some(prev_el) = self.ast.element_mut(prev) {
                    prev_el.if_conditions.push(IfCondition {
                        exp: elseif,
                        block: id,
                    });
                }
            }
            _ => {
                let (directive, range) = match &elseif {
                    Some(exp) => (
                        format!("else-if=\"{exp}\""),
                        el.raw_attr_range("v-else-if"),
                    ),
                    None => ("else".to_string(), el.raw_attr_range("v-else")),
                };
                let msg = format!(
                    "v-{directive} used on element <{}> without corresponding v-if.",
                    el.tag
                );
                self.warn(msg, range);
            }
        }
    }

    /// Last element child of `parent`, dropping any text after it.
    fn find_prev_element(&mut self, parent: NodeId) -> Option<NodeId> {
        while let Some(&last) = self.ast.children(parent).last() {
            if self.ast.element(last).is_some() {
                return Some(last);
            }
            if let Some(text) = self.ast.text(last).filter(|t| *t != " ") {
                let msg = format!(
                    "text \"{}\" between v-if and v-else(-if) will be ignored.",
                    text.trim()
                );
                let range = self.ast.range(last);
                self.warn(msg, range);
            }
            if let Some(el) = self.ast.element_mut(parent) {
                el.children.pop();
            }
        }
        None
    }

    // --- Element processing ---

    fn process_element(&mut self, id: NodeId) {
        let Some(mut el) = self.ast.take_element(id) else {
            return;
        };

        self.process_key(id, &mut el);
        el.plain = el.key.is_none() && el.scoped_slots.is_empty() && el.attrs_list.is_empty();
        self.process_ref(id, &mut el);
        self.process_slot_content(id, &mut el);
        self.process_slot_outlet(&mut el);
        process_component(&mut el);
        for module in &self.options.modules {
            module.transform_node(&mut el, self.options, &mut *self.sink);
        }
        self.process_attrs(id, &mut el);

        self.ast.restore_element(id, el);
    }

    fn process_key(&mut self, id: NodeId, el: &mut Element) {
        let Some(exp) = non_empty(get_binding_attr(el, "key", true)) else {
            return;
        };
        if el.tag == "template" {
            self.warn(
                "<template> cannot be keyed. Place the key on real elements instead.",
                get_raw_binding_attr(el, "key"),
            );
        }
        if el.for_exp.is_some() {
            let iterator = non_empty(el.iterator2.clone()).or_else(|| non_empty(el.iterator1.clone()));
            let in_transition_group = self
                .ast
                .parent(id)
                .and_then(|p| self.ast.element(p))
                .is_some_and(|p| p.tag == "transition-group");
            if iterator.as_deref() == Some(exp.as_str()) && in_transition_group {
                self.tip(
                    "Do not use v-for index as key on <transition-group> children, \
                     this is the same as not using keys.",
                    get_raw_binding_attr(el, "key"),
                );
            }
        }
        el.key = Some(exp);
    }

    fn process_ref(&mut self, id: NodeId, el: &mut Element) {
        if let Some(r) = non_empty(get_binding_attr(el, "ref", true)) {
            el.ref_ = Some(r);
            el.ref_in_for = el.for_exp.is_some()
                || self
                    .ast
                    .ancestors(id)
                    .any(|a| self.ast.element(a).is_some_and(|e| e.for_exp.is_some()));
        }
    }

    fn process_slot_content(&mut self, id: NodeId, el: &mut Element) {
        if el.tag == "template" {
            let scope = non_empty(get_and_remove_attr(el, "scope", false));
            if scope.is_some() {
                self.tip(
                    "the \"scope\" attribute for scoped slots have been deprecated and \
                     replaced by \"slot-scope\" since 2.5. The new \"slot-scope\" attribute \
                     can also be used on plain elements in addition to <template> to \
                     denote scoped slots.",
                    el.raw_attr_range("scope"),
                );
            }
            el.slot_scope = scope.or_else(|| non_empty(get_and_remove_attr(el, "slot-scope", false)));
        } else if let Some(scope) = non_empty(get_and_remove_attr(el, "slot-scope", false)) {
            if el.attrs_map.get("v-for").is_some_and(|v| !v.is_empty()) {
                self.tip(
                    format!(
                        "Ambiguous combined usage of slot-scope and v-for on <{}> \
                         (v-for takes higher priority). Use a wrapper <template> for the \
                         scoped slot to make it clearer.",
                        el.tag
                    ),
                    el.raw_attr_range("slot-scope"),
                );
            }
            el.slot_scope = Some(scope);
        }

        if let Some(target) = non_empty(get_binding_attr(el, "slot", true)) {
            el.slot_target = Some(if target == "\"\"" {
                "\"default\"".to_string()
            } else {
                target.clone()
            });
            el.slot_target_dynamic = [":slot", "v-bind:slot"]
                .iter()
                .any(|n| el.attrs_map.get(n).is_some_and(|v| !v.is_empty()));
            if el.tag != "template" && el.slot_scope.is_none() {
                let range = get_raw_binding_attr(el, "slot");
                add_attr(el, "slot", &target, range, false);
            }
        }

        let el_range = self.ast.range(id);
        if el.tag == "template" {
            let Some(binding) = get_and_remove_attr_by_regex(el, &SLOT_RE) else {
                return;
            };
            if el.slot_target.is_some() || el.slot_scope.is_some() {
                self.warn("Unexpected mixed usage of different slot syntaxes.", el_range);
            }
            let parent_is_component = self
                .ast
                .parent(id)
                .and_then(|p| self.ast.element(p))
                .map(|p| self.options.maybe_component(p));
            if parent_is_component == Some(false) {
                self.warn(
                    "<template v-slot> can only appear at the root level inside \
                     the receiving component",
                    el_range,
                );
            }
            let (name, dynamic) = self.slot_name(&binding);
            el.slot_target = Some(name);
            el.slot_target_dynamic = dynamic;
            el.slot_scope = Some(slot_scope_value(&binding));
        } else {
            let Some(binding) = get_and_remove_attr_by_regex(el, &SLOT_RE) else {
                return;
            };
            if !self.options.maybe_component(el) {
                self.warn(
                    "v-slot can only be used on components or <template>.",
                    binding.range(),
                );
            }
            if el.slot_scope.is_some() || el.slot_target.is_some() {
                self.warn("Unexpected mixed usage of different slot syntaxes.", el_range);
            }
            if !el.scoped_slots.is_empty() {
                self.warn(
                    "To avoid scope ambiguity, the default slot should also use \
                     <template> syntax when there are other named slots.",
                    binding.range(),
                );
            }

            // The component's own children become the content of a synthesized
            // default slot template.
            let (name, dynamic) = self.slot_name(&binding);
            let content: Vec<NodeId> = el
                .children
                .iter()
                .copied()
                .filter(|&c| !self.slot_scope_of(c))
                .collect();
            let container = Element {
                tag: "template".to_string(),
                children: content.clone(),
                slot_target: Some(name.clone()),
                slot_target_dynamic: dynamic,
                slot_scope: Some(slot_scope_value(&binding)),
                ..Element::default()
            };
            let container_id = self.ast.push(Node {
                parent: Some(id),
                start: None,
                end: None,
                kind: NodeKind::Element(container),
            });
            for child in content {
                if let Some(node) = self.ast.node_mut(child) {
                    node.parent = Some(container_id);
                }
            }
            el.add_scoped_slot(name, container_id);
            el.children.clear();
            el.plain = false;
        }
    }

    fn slot_name(&mut self, binding: &Attr) -> (String, bool) {
        let mut name = SLOT_RE.replace(&binding.name, "").into_owned();
        if name.is_empty() {
            if binding.name.starts_with('#') {
                self.warn("v-slot shorthand syntax requires a slot name.", binding.range());
            } else {
                name = "default".to_string();
            }
        }
        if DYNAMIC_ARG_RE.is_match(&name) {
            (unwrap_brackets(&name), true)
        } else {
            (format!("\"{name}\""), false)
        }
    }

    fn process_slot_outlet(&mut self, el: &mut Element) {
        if el.tag != "slot" {
            return;
        }
        el.slot_name = get_binding_attr(el, "name", true);
        if el.key.is_some() {
            self.warn(
                "`key` does not work on <slot> because slots are abstract outlets \
                 and can possibly expand into multiple elements. \
                 Use the key on a wrapping element instead.",
                get_raw_binding_attr(el, "key"),
            );
        }
    }

    fn process_attrs(&mut self, id: NodeId, el: &mut Element) {
        let must_use_prop = self.options.platform.must_use_prop;
        let list = el.attrs_list.clone();

        for attr in &list {
            let raw_name = attr.name.as_str();
            let range = attr.range();
            let mut name = raw_name.to_string();

            if !DIR_RE.is_match(&name) {
                if parse_text(&attr.value, self.options.delimiters.as_ref()).is_some() {
                    self.warn(
                        format!(
                            "{name}=\"{}\": Interpolation inside attributes has been removed. \
                             Use v-bind or the colon shorthand instead. For example, \
                             instead of <div id=\"{{{{ val }}}}\">, use <div :id=\"val\">.",
                            attr.value
                        ),
                        range,
                    );
                }
                add_attr(el, &name, &json_string(&attr.value), range, false);
                let type_attr = el.attrs_map.get("type").map(str::to_string);
                if el.component.is_none()
                    && name == "muted"
                    && must_use_prop(&el.tag, type_attr.as_deref(), &name)
                {
                    add_prop(el, &name, "true", range, false);
                }
                continue;
            }

            el.has_bindings = true;
            let modifiers = parse_modifiers(&DIR_RE.replace(&name, ""));
            if modifiers.is_some() {
                name = strip_modifiers(&name);
            }

            if BIND_RE.is_match(&name) {
                name = BIND_RE.replace(&name, "").into_owned();
                let value = parse_filters(&attr.value);
                let is_dynamic = DYNAMIC_ARG_RE.is_match(&name);
                if is_dynamic {
                    name = unwrap_brackets(&name);
                }
                if value.trim().is_empty() {
                    self.warn(
                        format!(
                            "The value for a v-bind expression cannot be empty. Found in \"v-bind:{name}\""
                        ),
                        Range::none(),
                    );
                }
                let has = |m: &str| modifiers.as_ref().is_some_and(|mods| mods.contains(m));
                if has("prop") && !is_dynamic {
                    name = camelize(&name);
                    if name == "innerHtml" {
                        name = "innerHTML".to_string();
                    }
                }
                if has("camel") && !is_dynamic {
                    name = camelize(&name);
                }
                if has("sync") {
                    let sync_gen = gen_assignment_code(&value, "$event");
                    if is_dynamic {
                        let event = format!("\"update:\"+({name})");
                        self.add_sync_handler(el, &event, &sync_gen, range, true);
                    } else {
                        let camel = camelize(&name);
                        let hyphen = hyphenate(&name);
                        self.add_sync_handler(el, &format!("update:{camel}"), &sync_gen, range, false);
                        if hyphen != camel {
                            self.add_sync_handler(el, &format!("update:{hyphen}"), &sync_gen, range, false);
                        }
                    }
                }
                let type_attr = el.attrs_map.get("type").map(str::to_string);
                if has("prop")
                    || (el.component.is_none() && must_use_prop(&el.tag, type_attr.as_deref(), &name))
                {
                    add_prop(el, &name, &value, range, is_dynamic);
                } else {
                    add_attr(el, &name, &value, range, is_dynamic);
                }
            } else if ON_RE.is_match(&name) {
                name = ON_RE.replace(&name, "").into_owned();
                let is_dynamic = DYNAMIC_ARG_RE.is_match(&name);
                if is_dynamic {
                    name = unwrap_brackets(&name);
                }
                add_handler(
                    el,
                    HandlerSpec {
                        name: &name,
                        value: &attr.value,
                        modifiers,
                        important: false,
                        range,
                        dynamic: is_dynamic,
                    },
                    &mut *self.sink,
                );
            } else {
                name = DIR_RE.replace(&name, "").into_owned();
                let mut arg = ARG_RE
                    .captures(&name)
                    .map(|c| c[1].to_string())
                    .filter(|a| !a.is_empty());
                let mut is_dynamic_arg = false;
                if let Some(a) = arg.take() {
                    name.truncate(name.len() - a.len() - 1);
                    if DYNAMIC_ARG_RE.is_match(&a) {
                        arg = Some(unwrap_brackets(&a));
                        is_dynamic_arg = true;
                    } else {
                        arg = Some(a);
                    }
                }
                let is_model = name == "model";
                add_directive(
                    el,
                    Directive {
                        name,
                        raw_name: raw_name.to_string(),
                        value: attr.value.clone(),
                        arg,
                        is_dynamic_arg,
                        modifiers,
                        start: range.start,
                        end: range.end,
                    },
                );
                if is_model {
                    self.check_for_alias_model(id, el, &attr.value);
                }
            }
        }
    }

    fn add_sync_handler(&mut self, el: &mut Element, event: &str, code: &str, range: Range, dynamic: bool) {
        add_handler(
            el,
            HandlerSpec {
                name: event,
                value: code,
                modifiers: None,
                important: false,
                range,
                dynamic,
            },
            &mut *self.sink,
        );
    }

    fn check_for_alias_model(&mut self, id: NodeId, el: &Element, value: &str) {
        let own = el.for_exp.is_some() && el.alias.as_deref() == Some(value);
        let from_ancestors = self
            .ast
            .ancestors(id)
            .filter(|&a| {
                self.ast
                    .element(a)
                    .is_some_and(|e| e.for_exp.is_some() && e.alias.as_deref() == Some(value))
            })
            .count();
        for _ in 0..(usize::from(own) + from_ancestors) {
            self.warn(
                format!(
                    "<{} v-model=\"{value}\">: You are binding v-model directly to a v-for \
                     iteration alias. This will not be able to modify the v-for source array \
                     because writing to the alias is like modifying a function local variable. \
                     Consider using an array of objects and use v-model on an object property \
                     instead.",
                    el.tag
                ),
                el.raw_attr_range("v-model"),
            );
        }
    }
}

fn is_forbidden_tag(el: &Element) -> bool {
    el.tag == "style"
        || (el.tag == "script"
            && el
                .attrs_map
                .get("type")
                .is_none_or(|t| t.is_empty() || t == "text/javascript"))
}

fn process_if(el: &mut Element, id: NodeId) {
    if let Some(exp) = non_empty(get_and_remove_attr(el, "v-if", false)) {
        el.if_exp = Some(exp.clone());
        el.if_conditions.push(IfCondition {
            exp: Some(exp),
            block: id,
        });
    } else {
        if get_and_remove_attr(el, "v-else", false).is_some() {
            el.else_ = true;
        }
        if let Some(exp) = non_empty(get_and_remove_attr(el, "v-else-if", false)) {
            el.elseif = Some(exp);
        }
    }
}

/// Inside `v-pre`: every attribute is kept as a literal.
fn process_raw_attrs(el: &mut Element) {
    if el.attrs_list.is_empty() {
        if !el.pre {
            el.plain = true;
        }
        return;
    }
    el.attrs = el
        .attrs_list
        .iter()
        .map(|a| Binding {
            name: a.name.clone(),
            value: json_string(&a.value),
            dynamic: false,
            start: a.start,
            end: a.end,
        })
        .collect();
}

fn process_component(el: &mut Element) {
    if let Some(binding) = non_empty(get_binding_attr(el, "is", true)) {
        el.component = Some(binding);
    }
    if get_and_remove_attr(el, "inline-template", false).is_some() {
        el.inline_template = true;
    }
}

fn slot_scope_value(binding: &Attr) -> String {
    if binding.value.is_empty() {
        EMPTY_SLOT_SCOPE_TOKEN.to_string()
    } else {
        binding.value.clone()
    }
}
