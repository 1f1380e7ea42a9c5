//! Template tree.
//!
//! Nodes live in an arena owned by [`Ast`] and refer to each other by
//! [`NodeId`]. Parent links are plain ids, never owning. Elements that were
//! dropped from their parent's child list (forbidden tags, `v-else` branches,
//! scoped slot content) stay in the arena and remain reachable from wherever
//! they were stitched in.

use tessera_lexer::{Attr, Range};

use crate::text::TextToken;

/// Index of a node in its [`Ast`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// The tree produced by the builder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ast {
    nodes: Vec<Node>,
    pub root: Option<NodeId>,
}

/// Envelope shared by every node kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub start: Option<usize>,
    pub end: Option<usize>,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Element(Element),
    /// Text containing at least one interpolation.
    Expression(ExpressionText),
    /// Literal text or a retained comment.
    Text(LiteralText),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionText {
    /// Concatenation expression, e.g. `"hi "+_s(name)`.
    pub expression: String,
    pub tokens: Vec<TextToken>,
    /// The source text, as seen after whitespace handling.
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiteralText {
    pub text: String,
    pub is_comment: bool,
}

/// Attribute name → raw value, last occurrence wins, first-seen order kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttrsMap(Vec<(String, String)>);

impl AttrsMap {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|(n, _)| n == name)
    }

    /// Insert or replace. Returns `true` when the name was already present.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => {
                slot.1 = value;
                true
            }
            None => {
                self.0.push((name, value));
                false
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let pos = self.0.iter().position(|(n, _)| n == name)?;
        Some(self.0.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An attribute or property binding produced by directive resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    /// Expression source. Literal attributes are JSON-quoted.
    pub value: String,
    /// The name itself is an expression (`:[key]="v"`).
    pub dynamic: bool,
    pub start: Option<usize>,
    pub end: Option<usize>,
}

/// Ordered set of directive modifiers (`.stop.prevent` → `["stop", "prevent"]`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Modifiers(Vec<String>);

impl Modifiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|m| m == name)
    }

    pub fn insert(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.contains(&name) {
            self.0.push(name);
        }
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|m| m != name);
        before != self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for Modifiers {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut modifiers = Modifiers::new();
        for m in iter {
            modifiers.insert(m);
        }
        modifiers
    }
}

/// One event handler registered on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handler {
    pub value: String,
    pub dynamic: bool,
    /// `Some` whenever the attribute carried modifiers, even if all of them
    /// were consumed as event-name markers.
    pub modifiers: Option<Modifiers>,
    pub start: Option<usize>,
    pub end: Option<usize>,
}

/// Event name → handlers, in registration order.
pub type Handlers = Vec<(String, Vec<Handler>)>;

/// A directive that is not handled structurally (`v-model`, `v-show`, custom).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub name: String,
    pub raw_name: String,
    pub value: String,
    pub arg: Option<String>,
    pub is_dynamic_arg: bool,
    pub modifiers: Option<Modifiers>,
    pub start: Option<usize>,
    pub end: Option<usize>,
}

impl Directive {
    pub fn has_modifier(&self, name: &str) -> bool {
        self.modifiers.as_ref().is_some_and(|m| m.contains(name))
    }
}

/// A branch of a `v-if` chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfCondition {
    /// `None` for a plain `v-else`.
    pub exp: Option<String>,
    pub block: NodeId,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attrs_list: Vec<Attr>,
    pub attrs_map: AttrsMap,
    /// Attributes by name with their source ranges, filled in source-range mode.
    pub raw_attrs: Vec<Attr>,
    pub children: Vec<NodeId>,
    pub ns: Option<String>,

    pub plain: bool,
    pub pre: bool,
    pub once: bool,
    pub forbidden: bool,
    /// Set by a module hook to skip the builder's own directive processing.
    pub processed: bool,

    pub if_exp: Option<String>,
    pub elseif: Option<String>,
    pub else_: bool,
    pub if_conditions: Vec<IfCondition>,

    pub for_exp: Option<String>,
    pub alias: Option<String>,
    pub iterator1: Option<String>,
    pub iterator2: Option<String>,

    pub key: Option<String>,
    pub ref_: Option<String>,
    pub ref_in_for: bool,

    pub slot_name: Option<String>,
    pub slot_target: Option<String>,
    pub slot_target_dynamic: bool,
    pub slot_scope: Option<String>,
    pub scoped_slots: Vec<(String, NodeId)>,

    pub component: Option<String>,
    pub inline_template: bool,

    pub attrs: Vec<Binding>,
    pub dynamic_attrs: Vec<Binding>,
    pub props: Vec<Binding>,
    pub events: Handlers,
    pub native_events: Handlers,
    pub directives: Vec<Directive>,
    pub has_bindings: bool,

    /// Data attached by platform modules, e.g. `staticClass`.
    pub extra: Vec<(String, String)>,
}

impl Element {
    pub fn new(tag: impl Into<String>, attrs: Vec<Attr>) -> Self {
        let mut attrs_map = AttrsMap::default();
        for attr in &attrs {
            attrs_map.insert(attr.name.clone(), attr.value.clone());
        }
        Self {
            tag: tag.into(),
            attrs_list: attrs,
            attrs_map,
            ..Self::default()
        }
    }

    /// Source range of the attribute `name`, if ranges are tracked.
    pub fn raw_attr_range(&self, name: &str) -> Range {
        self.raw_attrs
            .iter()
            .rev()
            .find(|a| a.name == name)
            .map(Attr::range)
            .unwrap_or_default()
    }

    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extra
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_extra(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.extra.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.extra.push((key, value)),
        }
    }

    pub fn add_scoped_slot(&mut self, name: String, block: NodeId) {
        match self.scoped_slots.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = block,
            None => self.scoped_slots.push((name, block)),
        }
    }
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.node(id)?.kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.element(id).map_or(&[], |el| el.children.as_slice())
    }

    pub fn range(&self, id: NodeId) -> Range {
        self.node(id)
            .map(|n| Range::from_options(n.start, n.end))
            .unwrap_or_default()
    }

    /// Literal text of a text or expression node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id)?.kind {
            NodeKind::Text(t) => Some(&t.text),
            NodeKind::Expression(e) => Some(&e.text),
            NodeKind::Element(_) => None,
        }
    }

    pub fn is_literal_text(&self, id: NodeId) -> bool {
        matches!(self.node(id).map(|n| &n.kind), Some(NodeKind::Text(_)))
    }

    /// Walk from `id`'s parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    /// `id` or one of its ancestors carries `v-pre`.
    pub fn in_v_pre(&self, id: NodeId) -> bool {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .any(|n| self.element(n).is_some_and(|el| el.pre))
    }

    /// Move the element at `id` out of the arena so it can be edited while
    /// the rest of the tree is borrowed. Pair with [`Ast::restore_element`].
    pub fn take_element(&mut self, id: NodeId) -> Option<Element> {
        self.element_mut(id).map(std::mem::take)
    }

    pub fn restore_element(&mut self, id: NodeId, element: Element) {
        if let Some(slot) = self.element_mut(id) {
            *slot = element;
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }
}

/// Optimizer annotations, indexed by [`NodeId`].
///
/// Kept outside the tree so that running the optimizer never changes what
/// it inspects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticMarks {
    pub is_static: Vec<bool>,
    pub static_root: Vec<bool>,
    /// Recorded for static and `v-once` nodes: inside a `v-for` ancestor.
    pub static_in_for: Vec<bool>,
}

impl StaticMarks {
    pub fn new(len: usize) -> Self {
        Self {
            is_static: vec![false; len],
            static_root: vec![false; len],
            static_in_for: vec![false; len],
        }
    }

    pub fn is_static(&self, id: NodeId) -> bool {
        self.is_static.get(id.0).copied().unwrap_or(false)
    }

    pub fn is_static_root(&self, id: NodeId) -> bool {
        self.static_root.get(id.0).copied().unwrap_or(false)
    }

    pub fn static_in_for(&self, id: NodeId) -> bool {
        self.static_in_for.get(id.0).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn element_node(tag: &str, parent: Option<NodeId>) -> Node {
        Node {
            parent,
            start: None,
            end: None,
            kind: NodeKind::Element(Element::new(tag, Vec::new())),
        }
    }

    #[test]
    fn test_attrs_map_last_wins_first_order() {
        let el = Element::new(
            "div",
            vec![Attr::new("a", "1"), Attr::new("b", "2"), Attr::new("a", "3")],
        );
        assert_eq!(el.attrs_map.get("a"), Some("3"));
        let names: Vec<_> = el.attrs_map.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(el.attrs_list.len(), 3);
    }

    #[test]
    fn test_modifiers_are_a_set() {
        let mods: Modifiers = ["stop", "prevent", "stop"].into_iter().collect();
        assert_eq!(mods.iter().collect::<Vec<_>>(), vec!["stop", "prevent"]);
    }

    #[test]
    fn test_ancestors_and_v_pre() {
        let mut ast = Ast::new();
        let root = ast.push(element_node("div", None));
        let mid = ast.push(element_node("p", Some(root)));
        let leaf = ast.push(element_node("span", Some(mid)));
        assert_eq!(ast.ancestors(leaf).collect::<Vec<_>>(), vec![mid, root]);
        assert!(!ast.in_v_pre(leaf));
        if let Some(el) = ast.element_mut(mid) {
            el.pre = true;
        }
        assert!(ast.in_v_pre(leaf));
        assert!(!ast.in_v_pre(root));
    }

    #[test]
    fn test_take_and_restore_element() {
        let mut ast = Ast::new();
        let id = ast.push(element_node("div", None));
        let mut el = ast.take_element(id).unwrap();
        el.key = Some("k".into());
        ast.restore_element(id, el);
        assert_eq!(ast.element(id).unwrap().key.as_deref(), Some("k"));
        assert_eq!(ast.element(id).unwrap().tag, "div");
    }
}
