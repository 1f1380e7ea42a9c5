//! The data object passed as the second argument of `_c`.

use tessera_parser::ast::{Binding, Modifiers};
use tessera_parser::{json_string, NodeId};

use crate::directives::ElementData;
use crate::events::gen_handlers;
use crate::{transform_special_newlines, CodegenState};

impl CodegenState<'_> {
    /// `{directives,key,ref,...}`, wrapped by `_b`/`_g` when needed.
    ///
    /// Directive handlers may add props and listeners, so they run on a
    /// working copy of the element before anything else is read.
    pub(crate) fn gen_data(&mut self, id: NodeId) -> String {
        let ast = self.ast;
        let Some(source) = ast.element(id) else {
            return "{}".to_string();
        };
        let mut el = source.clone();
        let mut extra = ElementData::default();
        let mut data = String::from("{");

        if let Some(dirs) = self.gen_directives(&mut el, &mut extra) {
            data.push_str(&dirs);
            data.push(',');
        }
        if let Some(key) = &el.key {
            data.push_str(&format!("key:{key},"));
        }
        if let Some(ref_) = &el.ref_ {
            data.push_str(&format!("ref:{ref_},"));
        }
        if el.ref_in_for {
            data.push_str("refInFor:true,");
        }
        if ast.in_v_pre(id) {
            data.push_str("pre:true,");
        }
        if el.component.is_some() {
            data.push_str(&format!("tag:\"{}\",", el.tag));
        }
        for module in &self.options.parse.modules {
            data.push_str(&module.gen_data(&el));
        }
        if !el.attrs.is_empty() {
            data.push_str(&format!("attrs:{},", gen_props(&el.attrs)));
        }
        if !el.props.is_empty() {
            data.push_str(&format!("domProps:{},", gen_props(&el.props)));
        }
        if !el.events.is_empty() {
            data.push_str(&gen_handlers(&el.events, false));
            data.push(',');
        }
        if !el.native_events.is_empty() {
            data.push_str(&gen_handlers(&el.native_events, true));
            data.push(',');
        }
        if let (Some(target), None) = (&el.slot_target, &el.slot_scope) {
            data.push_str(&format!("slot:{target},"));
        }
        if !el.scoped_slots.is_empty() {
            data.push_str(&self.gen_scoped_slots(id));
            data.push(',');
        }
        if let Some(model) = &extra.model {
            data.push_str(&format!(
                "model:{{value:{},callback:{},expression:{}}},",
                model.value, model.callback, model.expression
            ));
        }
        if el.inline_template {
            if let Some(inline) = self.gen_inline_template(id) {
                data.push_str(&inline);
                data.push(',');
            }
        }

        if data.ends_with(',') {
            data.pop();
        }
        data.push('}');

        if !el.dynamic_attrs.is_empty() {
            data = format!("_b({data},\"{}\",{})", el.tag, gen_props(&el.dynamic_attrs));
        }
        if let Some(wrap) = &extra.wrap_data {
            data = wrap(&data);
        }
        if let Some(wrap) = &extra.wrap_listeners {
            data = wrap(&data);
        }
        data
    }

    /// `directives:[...]` for the directives that still need the runtime.
    fn gen_directives(
        &mut self,
        el: &mut tessera_parser::Element,
        extra: &mut ElementData,
    ) -> Option<String> {
        if el.directives.is_empty() {
            return None;
        }
        let directives = el.directives.clone();
        let mut entries = Vec::new();
        for dir in &directives {
            let need_runtime = self
                .options
                .directives
                .generate(el, dir, extra, &mut *self.warn);
            if !need_runtime {
                continue;
            }
            let mut entry = format!(
                "{{name:\"{}\",rawName:\"{}\"",
                dir.name, dir.raw_name
            );
            if !dir.value.is_empty() {
                entry.push_str(&format!(
                    ",value:({}),expression:{}",
                    dir.value,
                    json_string(&dir.value)
                ));
            }
            if let Some(arg) = &dir.arg {
                if dir.is_dynamic_arg {
                    entry.push_str(&format!(",arg:{arg}"));
                } else {
                    entry.push_str(&format!(",arg:\"{arg}\""));
                }
            }
            if let Some(modifiers) = &dir.modifiers {
                entry.push_str(&format!(",modifiers:{}", modifiers_json(modifiers)));
            }
            entry.push('}');
            entries.push(entry);
        }
        if entries.is_empty() {
            None
        } else {
            Some(format!("directives:[{}]", entries.join(",")))
        }
    }
}

/// `{"a":true,"b":true}`
fn modifiers_json(modifiers: &Modifiers) -> String {
    let fields: Vec<String> = modifiers
        .iter()
        .map(|m| format!("{}:true", json_string(m)))
        .collect();
    format!("{{{}}}", fields.join(","))
}

/// Static bindings as an object literal; dynamic names go through `_d`.
pub fn gen_props(props: &[Binding]) -> String {
    let mut static_props = Vec::new();
    let mut dynamic_props = Vec::new();
    for prop in props {
        let value = transform_special_newlines(&prop.value);
        if prop.dynamic {
            dynamic_props.push(format!("{},{value}", prop.name));
        } else {
            static_props.push(format!("\"{}\":{value}", prop.name));
        }
    }
    let static_props = format!("{{{}}}", static_props.join(","));
    if dynamic_props.is_empty() {
        static_props
    } else {
        format!("_d({static_props},[{}])", dynamic_props.join(","))
    }
}
