//! Element, children and slot generation.

use tessera_parser::ast::{IfCondition, NodeKind};
use tessera_parser::{json_string, Element, NodeId, Range, EMPTY_SLOT_SCOPE_TOKEN};

use crate::{transform_special_newlines, CodegenState};

/// Structural steps already applied to the element being generated.
///
/// Generation of an element re-enters [`CodegenState::gen_element`] after
/// each wrapper (`_m`, `_o`, `_l`, ternary) with the matching flag set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Processed {
    pub static_root: bool,
    pub once: bool,
    pub for_: bool,
    pub if_: bool,
}

/// What to generate for each item of a `v-if` chain or `v-for` body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gen {
    Element,
    ScopedSlot,
}

impl CodegenState<'_> {
    pub(crate) fn gen_element(&mut self, id: NodeId, done: Processed) -> String {
        let ast = self.ast;
        let Some(el) = ast.element(id) else {
            return self.gen_node(id);
        };

        if self.marks.is_static_root(id) && !done.static_root {
            return self.gen_static(id, done);
        }
        if el.once && !done.once {
            return self.gen_once(id, done);
        }
        if el.for_exp.is_some() && !done.for_ {
            return self.gen_for(id, done, Gen::Element);
        }
        if el.if_exp.is_some() && !done.if_ {
            return self.gen_if(id, done, Gen::Element, None);
        }
        if el.tag == "template" && el.slot_target.is_none() && !self.pre {
            return self
                .gen_children(id, false)
                .unwrap_or_else(|| "void 0".to_string());
        }
        if el.tag == "slot" {
            return self.gen_slot(id);
        }
        if let Some(component) = &el.component {
            return self.gen_component(component, id);
        }

        let pre = ast.in_v_pre(id);
        let data = if !el.plain || (pre && self.maybe_component(el)) {
            Some(self.gen_data(id))
        } else {
            None
        };
        let children = if el.inline_template {
            None
        } else {
            self.gen_children(id, true)
        };
        let mut code = format!("_c('{}'", el.tag);
        if let Some(data) = data {
            code.push(',');
            code.push_str(&data);
        }
        if let Some(children) = children {
            code.push(',');
            code.push_str(&children);
        }
        code.push(')');
        code
    }

    /// Hoist the subtree into a static render function.
    fn gen_static(&mut self, id: NodeId, mut done: Processed) -> String {
        done.static_root = true;
        let original_pre = self.pre;
        if self.ast.in_v_pre(id) {
            self.pre = true;
        }
        let code = self.gen_element(id, done);
        self.pre = original_pre;
        self.static_render_fns.push(format!("with(this){{return {code}}}"));
        let index = self.static_render_fns.len() - 1;
        log::debug!("hoisted static subtree at node {} as _m({index})", id.0);
        if self.marks.static_in_for(id) {
            format!("_m({index},true)")
        } else {
            format!("_m({index})")
        }
    }

    /// `v-once`: hoisted, or cached with `_o` inside a keyed `v-for`.
    fn gen_once(&mut self, id: NodeId, mut done: Processed) -> String {
        done.once = true;
        let ast = self.ast;
        let Some(el) = ast.element(id) else {
            return String::new();
        };
        if el.if_exp.is_some() && !done.if_ {
            return self.gen_if(id, done, Gen::Element, None);
        }
        if !self.marks.static_in_for(id) {
            return self.gen_static(id, done);
        }

        let key = ast
            .ancestors(id)
            .filter_map(|p| ast.element(p))
            .find(|p| p.for_exp.is_some())
            .and_then(|p| p.key.clone());
        match key {
            Some(key) => {
                let code = self.gen_element(id, done);
                let once_id = self.once_id;
                self.once_id += 1;
                format!("_o({code},{once_id},{key})")
            }
            None => {
                self.warn.warn(
                    "v-once can only be used inside v-for that is keyed. ".to_string(),
                    el.raw_attr_range("v-once"),
                    false,
                );
                self.gen_element(id, done)
            }
        }
    }

    fn gen_if(&mut self, id: NodeId, mut done: Processed, gen: Gen, alt_empty: Option<&str>) -> String {
        done.if_ = true;
        let ast = self.ast;
        let conditions = ast
            .element(id)
            .map_or(&[][..], |el| el.if_conditions.as_slice());
        self.gen_if_conditions(id, done, conditions, gen, alt_empty)
    }

    fn gen_if_conditions(
        &mut self,
        head: NodeId,
        done: Processed,
        conditions: &[IfCondition],
        gen: Gen,
        alt_empty: Option<&str>,
    ) -> String {
        let Some((condition, rest)) = conditions.split_first() else {
            return alt_empty.unwrap_or("_e()").to_string();
        };
        let block_done = if condition.block == head {
            done
        } else {
            Processed::default()
        };
        let block = self.gen_ternary_exp(condition.block, block_done, gen);
        match &condition.exp {
            Some(exp) => {
                let otherwise = self.gen_if_conditions(head, done, rest, gen, alt_empty);
                format!("({exp})?{block}:{otherwise}")
            }
            None => block,
        }
    }

    fn gen_ternary_exp(&mut self, id: NodeId, done: Processed, gen: Gen) -> String {
        match gen {
            Gen::ScopedSlot => self.gen_scoped_slot(id, done),
            Gen::Element if self.ast.element(id).is_some_and(|el| el.once) => {
                self.gen_once(id, done)
            }
            Gen::Element => self.gen_element(id, done),
        }
    }

    fn gen_for(&mut self, id: NodeId, mut done: Processed, gen: Gen) -> String {
        let ast = self.ast;
        let Some(el) = ast.element(id) else {
            return String::new();
        };
        let exp = el.for_exp.as_deref().unwrap_or_default();
        let alias = el.alias.as_deref().unwrap_or_default();
        let iterator1 = el.iterator1.as_ref().map(|i| format!(",{i}")).unwrap_or_default();
        let iterator2 = el.iterator2.as_ref().map(|i| format!(",{i}")).unwrap_or_default();

        if self.maybe_component(el) && el.tag != "slot" && el.tag != "template" && el.key.is_none() {
            self.warn.warn(
                format!(
                    "<{} v-for=\"{alias} in {exp}\">: component lists rendered with v-for \
                     should have explicit keys.",
                    el.tag
                ),
                el.raw_attr_range("v-for"),
                true,
            );
        }

        done.for_ = true;
        let body = match gen {
            Gen::Element => self.gen_element(id, done),
            Gen::ScopedSlot => self.gen_scoped_slot(id, done),
        };
        format!("_l(({exp}),function({alias}{iterator1}{iterator2}){{return {body}}})")
    }

    /// Children array plus normalization hint, or `None` without children.
    pub(crate) fn gen_children(&mut self, id: NodeId, check_skip: bool) -> Option<String> {
        let ast = self.ast;
        let children = ast.children(id);
        let &first = children.first()?;

        if let [only] = children {
            if let Some(el) = ast.element(*only) {
                if el.for_exp.is_some() && el.tag != "template" && el.tag != "slot" {
                    let normalization = match (check_skip, self.maybe_component(el)) {
                        (false, _) => "",
                        (true, true) => ",1",
                        (true, false) => ",0",
                    };
                    return Some(format!("{}{normalization}", self.gen_element(first, Processed::default())));
                }
            }
        }

        let normalization = if check_skip {
            self.normalization_type(children)
        } else {
            0
        };
        let nodes: Vec<String> = children.iter().map(|&c| self.gen_node(c)).collect();
        let mut code = format!("[{}]", nodes.join(","));
        if normalization != 0 {
            code.push_str(&format!(",{normalization}"));
        }
        Some(code)
    }

    /// 0: no normalization, 1: simple (may contain components),
    /// 2: full (nested arrays from `v-for`, `<template>` or `<slot>`).
    fn normalization_type(&self, children: &[NodeId]) -> u8 {
        let ast = self.ast;
        let needs_normalization =
            |el: &Element| el.for_exp.is_some() || el.tag == "template" || el.tag == "slot";
        let blocks = |el: &Element| {
            el.if_conditions
                .iter()
                .filter_map(|c| ast.element(c.block))
                .collect::<Vec<_>>()
        };

        let mut res = 0;
        for el in children.iter().filter_map(|&c| ast.element(c)) {
            if needs_normalization(el) || blocks(el).into_iter().any(needs_normalization) {
                return 2;
            }
            if self.maybe_component(el) || blocks(el).into_iter().any(|b| self.maybe_component(b)) {
                res = 1;
            }
        }
        res
    }

    pub(crate) fn gen_node(&mut self, id: NodeId) -> String {
        let ast = self.ast;
        match ast.node(id).map(|n| &n.kind) {
            Some(NodeKind::Element(_)) => self.gen_element(id, Processed::default()),
            Some(NodeKind::Text(text)) if text.is_comment => {
                format!("_e({})", json_string(&text.text))
            }
            Some(NodeKind::Text(text)) => {
                format!("_v({})", transform_special_newlines(&json_string(&text.text)))
            }
            Some(NodeKind::Expression(exp)) => format!("_v({})", exp.expression),
            None => "_e()".to_string(),
        }
    }

    /// `<slot>` outlet: `_t(name, fallback, props, bind)`.
    fn gen_slot(&mut self, id: NodeId) -> String {
        let ast = self.ast;
        let Some(el) = ast.element(id) else {
            return String::new();
        };
        let slot_name = el.slot_name.as_deref().unwrap_or("\"default\"");
        let children = self.gen_children(id, false);
        let mut res = format!("_t({slot_name}");
        if let Some(children) = &children {
            res.push_str(&format!(",function(){{return {children}}}"));
        }

        let attrs = if el.attrs.is_empty() && el.dynamic_attrs.is_empty() {
            None
        } else {
            let props: Vec<_> = el
                .attrs
                .iter()
                .chain(&el.dynamic_attrs)
                .map(|attr| {
                    let mut attr = attr.clone();
                    attr.name = tessera_parser::camelize(&attr.name);
                    attr
                })
                .collect();
            Some(crate::data::gen_props(&props))
        };
        let bind = el.attrs_map.get("v-bind");

        if (attrs.is_some() || bind.is_some()) && children.is_none() {
            res.push_str(",null");
        }
        if let Some(attrs) = &attrs {
            res.push(',');
            res.push_str(attrs);
        }
        if let Some(bind) = bind {
            if attrs.is_none() {
                res.push_str(",null");
            }
            res.push(',');
            res.push_str(bind);
        }
        res.push(')');
        res
    }

    /// `<component :is="...">`: the tag comes from the binding.
    fn gen_component(&mut self, component: &str, id: NodeId) -> String {
        let inline_template = self.ast.element(id).is_some_and(|el| el.inline_template);
        let children = if inline_template {
            None
        } else {
            self.gen_children(id, true)
        };
        let data = self.gen_data(id);
        match children {
            Some(children) => format!("_c({component},{data},{children})"),
            None => format!("_c({component},{data})"),
        }
    }

    /// `scopedSlots:_u([...])` with the stability flags the runtime needs
    /// to decide whether slot content must be re-rendered.
    pub(crate) fn gen_scoped_slots(&mut self, id: NodeId) -> String {
        let ast = self.ast;
        let Some(el) = ast.element(id) else {
            return String::new();
        };
        let slots = &el.scoped_slots;

        let mut needs_force_update = el.for_exp.is_some()
            || slots.iter().any(|(_, block)| {
                ast.element(*block).is_some_and(|slot| {
                    slot.slot_target_dynamic
                        || slot.if_exp.is_some()
                        || slot.for_exp.is_some()
                        || self.contains_slot_child(*block)
                })
            });
        let mut needs_key = el.if_exp.is_some();

        if !needs_force_update {
            for parent in ast.ancestors(id).filter_map(|p| ast.element(p)) {
                let scoped = parent
                    .slot_scope
                    .as_deref()
                    .is_some_and(|s| s != EMPTY_SLOT_SCOPE_TOKEN);
                if scoped || parent.for_exp.is_some() {
                    needs_force_update = true;
                    break;
                }
                if parent.if_exp.is_some() {
                    needs_key = true;
                }
            }
        }

        let generated: Vec<String> = slots
            .iter()
            .map(|(_, block)| self.gen_scoped_slot(*block, Processed::default()))
            .collect();
        let generated = generated.join(",");

        if needs_force_update {
            format!("scopedSlots:_u([{generated}],null,true)")
        } else if needs_key {
            format!("scopedSlots:_u([{generated}],null,false,{})", hash(&generated))
        } else {
            format!("scopedSlots:_u([{generated}])")
        }
    }

    fn contains_slot_child(&self, id: NodeId) -> bool {
        match self.ast.element(id) {
            Some(el) if el.tag == "slot" => true,
            Some(el) => el.children.iter().any(|&c| self.contains_slot_child(c)),
            None => false,
        }
    }

    fn gen_scoped_slot(&mut self, id: NodeId, done: Processed) -> String {
        let ast = self.ast;
        let Some(el) = ast.element(id) else {
            return String::new();
        };
        let legacy = el.attrs_map.get("slot-scope").is_some_and(|s| !s.is_empty());
        if el.if_exp.is_some() && !done.if_ && !legacy {
            return self.gen_if(id, done, Gen::ScopedSlot, Some("null"));
        }
        if el.for_exp.is_some() && !done.for_ {
            return self.gen_for(id, done, Gen::ScopedSlot);
        }

        let slot_scope = match el.slot_scope.as_deref() {
            Some(EMPTY_SLOT_SCOPE_TOKEN) | None => "",
            Some(scope) => scope,
        };
        let body = if el.tag == "template" {
            let children = self
                .gen_children(id, false)
                .unwrap_or_else(|| "undefined".to_string());
            match &el.if_exp {
                Some(test) if legacy => format!("({test})?{children}:undefined"),
                _ => children,
            }
        } else {
            self.gen_element(id, done)
        };
        let key = el.slot_target.as_deref().unwrap_or("\"default\"");
        let proxy = if slot_scope.is_empty() { ",proxy:true" } else { "" };
        format!("{{key:{key},fn:function({slot_scope}){{return {body}}}{proxy}}}")
    }

    /// `inlineTemplate:{render,staticRenderFns}` from the only child element.
    pub(crate) fn gen_inline_template(&mut self, id: NodeId) -> Option<String> {
        let ast = self.ast;
        let children = ast.children(id);
        let first = children.first().copied();
        let first_is_element = first.is_some_and(|c| ast.element(c).is_some());
        if children.len() != 1 || !first_is_element {
            let start = ast.node(id).and_then(|n| n.start);
            self.warn.warn(
                "Inline-template components must have exactly one child element.".to_string(),
                Range::from_options(start, None),
                false,
            );
        }
        let child = first.filter(|_| first_is_element)?;

        // The inline template is a separate render program with its own
        // static functions and `v-once` counter.
        let saved_fns = std::mem::take(&mut self.static_render_fns);
        let saved_once = std::mem::replace(&mut self.once_id, 0);
        let saved_pre = std::mem::replace(&mut self.pre, false);
        let render = self.gen_root(Some(child));
        let fns = std::mem::replace(&mut self.static_render_fns, saved_fns);
        self.once_id = saved_once;
        self.pre = saved_pre;

        let fns: Vec<String> = fns.iter().map(|code| format!("function(){{{code}}}")).collect();
        Some(format!(
            "inlineTemplate:{{render:function(){{{render}}},staticRenderFns:[{}]}}",
            fns.join(",")
        ))
    }
}

/// djb2 over UTF-16 code units, last to first, as an unsigned 32-bit value.
fn hash(text: &str) -> u32 {
    let units: Vec<u16> = text.encode_utf16().collect();
    let mut hash: i32 = 5381;
    for &unit in units.iter().rev() {
        hash = hash.wrapping_mul(33) ^ i32::from(unit);
    }
    hash as u32
}
