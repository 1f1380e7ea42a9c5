//! Static subtree detection.
//!
//! Two passes over the finished tree:
//!
//! 1. mark every node whose whole subtree renders the same output for any
//!    data context (`is_static`);
//! 2. mark the topmost static elements worth hoisting into their own render
//!    function (`static_root`). An element whose only child is literal text
//!    is not worth it.
//!
//! Marks live in a [`StaticMarks`] table next to the tree, so the tree
//! itself is never touched.

use tessera_parser::ast::Element;
use tessera_parser::{Ast, NodeId, NodeKind, ParseOptions, StaticMarks};

/// Element fields that never make an element dynamic. Everything else an
/// element can carry (bindings, directives, conditions, slots) does, unless
/// a platform module declares the `extra` key static.
fn is_static_key(options: &ParseOptions, key: &str) -> bool {
    options
        .modules
        .iter()
        .any(|module| module.static_keys().contains(&key))
}

/// Annotate `ast` with static marks.
pub fn optimize(ast: &Ast, options: &ParseOptions) -> StaticMarks {
    let mut marks = StaticMarks::new(ast.len());
    let Some(root) = ast.root else {
        return marks;
    };
    let mut optimizer = Optimizer {
        ast,
        options,
        marks: &mut marks,
    };
    optimizer.mark_static(root);
    optimizer.mark_static_roots(root, false);
    log::debug!(
        "optimizer: {} static nodes, {} static roots",
        marks.is_static.iter().filter(|s| **s).count(),
        marks.static_root.iter().filter(|s| **s).count()
    );
    marks
}

struct Optimizer<'a> {
    ast: &'a Ast,
    options: &'a ParseOptions,
    marks: &'a mut StaticMarks,
}

impl Optimizer<'_> {
    fn set_static(&mut self, id: NodeId, value: bool) {
        if let Some(slot) = self.marks.is_static.get_mut(id.0) {
            *slot = value;
        }
    }

    fn mark_static(&mut self, id: NodeId) {
        let is_static = self.is_static(id);
        self.set_static(id, is_static);

        let ast = self.ast;
        let Some(el) = ast.element(id) else {
            return;
        };
        // Component slot content stays dynamic so the child component can
        // re-render it.
        if !(self.options.platform.is_reserved_tag)(&el.tag)
            && el.tag != "slot"
            && !el.attrs_map.contains("inline-template")
        {
            return;
        }

        for &child in &el.children {
            self.mark_static(child);
            if !self.marks.is_static(child) {
                self.set_static(id, false);
            }
        }
        for condition in el.if_conditions.iter().skip(1) {
            let block = condition.block;
            self.mark_static(block);
            if !self.marks.is_static(block) {
                self.set_static(id, false);
            }
        }
    }

    fn mark_static_roots(&mut self, id: NodeId, in_for: bool) {
        let ast = self.ast;
        let Some(el) = ast.element(id) else {
            return;
        };
        let is_static = self.marks.is_static(id);
        if is_static || el.once {
            if let Some(slot) = self.marks.static_in_for.get_mut(id.0) {
                *slot = in_for;
            }
        }

        let only_text_child = matches!(el.children.as_slice(), [only] if ast.is_literal_text(*only));
        if is_static && !el.children.is_empty() && !only_text_child {
            if let Some(slot) = self.marks.static_root.get_mut(id.0) {
                *slot = true;
            }
            return;
        }

        let child_in_for = in_for || el.for_exp.is_some();
        for &child in &el.children {
            self.mark_static_roots(child, child_in_for);
        }
        for condition in el.if_conditions.iter().skip(1) {
            self.mark_static_roots(condition.block, in_for);
        }
    }

    fn is_static(&self, id: NodeId) -> bool {
        let Some(node) = self.ast.node(id) else {
            return false;
        };
        let el = match &node.kind {
            NodeKind::Expression(_) => return false,
            NodeKind::Text(_) => return true,
            NodeKind::Element(el) => el,
        };
        if el.pre {
            return true;
        }
        !el.has_bindings
            && el.if_exp.is_none()
            && el.for_exp.is_none()
            && el.tag != "slot"
            && el.tag != "component"
            && (self.options.platform.is_reserved_tag)(&el.tag)
            && !self.is_direct_child_of_template_for(id)
            && self.only_static_keys(el)
    }

    /// Inside a `<template v-for>`, possibly through nested plain templates.
    fn is_direct_child_of_template_for(&self, id: NodeId) -> bool {
        for ancestor in self.ast.ancestors(id) {
            let Some(parent) = self.ast.element(ancestor) else {
                return false;
            };
            if parent.tag != "template" {
                return false;
            }
            if parent.for_exp.is_some() {
                return true;
            }
        }
        false
    }

    fn only_static_keys(&self, el: &Element) -> bool {
        el.ns.is_none()
            && !el.forbidden
            && !el.once
            && !el.processed
            && el.elseif.is_none()
            && !el.else_
            && el.if_conditions.is_empty()
            && el.alias.is_none()
            && el.iterator1.is_none()
            && el.iterator2.is_none()
            && el.key.is_none()
            && el.ref_.is_none()
            && !el.ref_in_for
            && el.slot_name.is_none()
            && el.slot_target.is_none()
            && el.slot_scope.is_none()
            && el.scoped_slots.is_empty()
            && el.component.is_none()
            && !el.inline_template
            && el.props.is_empty()
            && el.dynamic_attrs.is_empty()
            && el.events.is_empty()
            && el.native_events.is_empty()
            && el.directives.is_empty()
            && el
                .extra
                .iter()
                .all(|(key, _)| is_static_key(self.options, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BaseOptions;
    use pretty_assertions::assert_eq;
    use tessera_parser::{parse, Diagnostics};

    fn web_options() -> ParseOptions {
        let base = BaseOptions::web();
        ParseOptions {
            expect_html: base.expect_html,
            platform: base.platform,
            modules: base.modules,
            ..ParseOptions::default()
        }
    }

    fn analyze(source: &str) -> (Ast, StaticMarks) {
        let options = web_options();
        let mut sink = Diagnostics::new();
        let ast = parse(source, &options, &mut sink);
        let marks = optimize(&ast, &options);
        (ast, marks)
    }

    fn root(ast: &Ast) -> NodeId {
        ast.root.unwrap()
    }

    fn child(ast: &Ast, id: NodeId, index: usize) -> NodeId {
        ast.children(id)[index]
    }

    // =========================================================================
    // Static detection
    // =========================================================================

    #[test]
    fn test_plain_subtree_is_static_root() {
        let (ast, marks) = analyze("<div><p><span>a</span></p></div>");
        let root = root(&ast);
        assert!(marks.is_static(root));
        assert!(marks.is_static_root(root));
        // Hoisting stops at the topmost static root.
        assert!(!marks.is_static_root(child(&ast, root, 0)));
    }

    #[test]
    fn test_lone_text_child_not_hoisted() {
        let (ast, marks) = analyze("<div><p>text</p><b>{{ x }}</b></div>");
        let root = root(&ast);
        let p = child(&ast, root, 0);
        assert!(marks.is_static(p));
        assert!(!marks.is_static_root(p));
        assert!(!marks.is_static(root));
    }

    #[test]
    fn test_interpolation_is_dynamic() {
        let (ast, marks) = analyze("<div>{{ msg }}</div>");
        let root = root(&ast);
        assert!(!marks.is_static(root));
        assert!(!marks.is_static(child(&ast, root, 0)));
    }

    #[test]
    fn test_bindings_make_element_dynamic() {
        let (ast, marks) = analyze(
            r#"<div><p :id="x"><b><i>a</i></b></p><p @click="go"><b><i>a</i></b></p><p v-if="ok"><b><i>a</i></b></p></div>"#,
        );
        let root = root(&ast);
        for index in 0..3 {
            let p = child(&ast, root, index);
            assert!(!marks.is_static(p), "child {index}");
            // The static grandchild is still hoistable.
            assert!(marks.is_static_root(child(&ast, p, 0)), "child {index}");
        }
    }

    #[test]
    fn test_static_class_and_style_allowed() {
        let (ast, marks) =
            analyze(r#"<div class="a b" style="color: red"><span>x</span></div>"#);
        assert!(marks.is_static_root(root(&ast)));
    }

    #[test]
    fn test_class_binding_not_static() {
        let (ast, marks) = analyze(r#"<div :class="c"><span>x</span></div>"#);
        assert!(!marks.is_static(root(&ast)));
    }

    #[test]
    fn test_component_children_left_alone() {
        let (ast, marks) = analyze("<div><my-comp><p>a</p></my-comp></div>");
        let root = root(&ast);
        let comp = child(&ast, root, 0);
        assert!(!marks.is_static(comp));
        assert!(!marks.is_static(child(&ast, comp, 0)));
        assert!(!marks.is_static(root));
    }

    #[test]
    fn test_slot_and_component_tags_dynamic() {
        let (ast, marks) = analyze(r#"<div><slot></slot><component is="x"></component></div>"#);
        let root = root(&ast);
        assert!(!marks.is_static(child(&ast, root, 0)));
        assert!(!marks.is_static(child(&ast, root, 1)));
    }

    #[test]
    fn test_v_pre_is_static() {
        let (ast, marks) = analyze("<div><p v-pre>{{ raw }}</p></div>");
        let p = child(&ast, root(&ast), 0);
        assert!(marks.is_static(p));
    }

    #[test]
    fn test_svg_namespace_not_static() {
        let (ast, marks) = analyze(r#"<div><svg><path d="M0"></path></svg></div>"#);
        let svg = child(&ast, root(&ast), 0);
        assert!(!marks.is_static(svg));
    }

    #[test]
    fn test_direct_child_of_template_for() {
        let (ast, marks) =
            analyze(r#"<div><template v-for="i in l"><span>a</span></template></div>"#);
        let template = child(&ast, root(&ast), 0);
        let span = child(&ast, template, 0);
        assert!(!marks.is_static(span));
    }

    // =========================================================================
    // Conditions and loops
    // =========================================================================

    #[test]
    fn test_else_branch_dynamic_makes_head_dynamic() {
        let (ast, marks) = analyze(r#"<div><p v-if="a"><b>x</b></p><p v-else>{{ y }}</p></div>"#);
        let head = child(&ast, root(&ast), 0);
        let else_block = ast.element(head).unwrap().if_conditions[1].block;
        assert!(!marks.is_static(else_block));
        assert!(!marks.is_static(head));
    }

    #[test]
    fn test_static_in_for_recorded() {
        let (ast, marks) =
            analyze(r#"<ul><li v-for="i in l" :key="i"><span><b>x</b></span></li></ul>"#);
        let li = child(&ast, root(&ast), 0);
        let span = child(&ast, li, 0);
        assert!(marks.is_static_root(span));
        assert!(marks.static_in_for(span));
        assert!(!marks.static_in_for(li));
    }

    #[test]
    fn test_once_records_in_for() {
        let (ast, marks) =
            analyze(r#"<ul><li v-for="i in l" :key="i"><p v-once>{{ i }}</p></li></ul>"#);
        let li = child(&ast, root(&ast), 0);
        let p = child(&ast, li, 0);
        assert!(!marks.is_static(p));
        assert!(marks.static_in_for(p));
    }

    // =========================================================================
    // Edges
    // =========================================================================

    #[test]
    fn test_empty_tree() {
        let (ast, marks) = analyze("");
        assert!(ast.root.is_none());
        assert_eq!(marks.is_static.len(), ast.len());
    }

    #[test]
    fn test_optimize_is_pure() {
        let (ast, first) = analyze("<div><p><b>a</b></p>{{ x }}</div>");
        let second = optimize(&ast, &web_options());
        assert_eq!(first, second);
    }
}
