//! Compile-time handlers for `v-model`, `v-text` and `v-html`.

use tessera_codegen::{gen_component_model, DirectiveHandler, ElementData};
use tessera_parser::ast::{Directive, Element};
use tessera_parser::helpers::{add_handler, add_prop, get_binding_attr, HandlerSpec};
use tessera_parser::{gen_assignment_code, DiagnosticSink, Range};

use super::is_reserved_tag;

/// Event used by `<input type="range">`, normalized by the runtime.
pub const RANGE_TOKEN: &str = "__r";

/// Two-way binding on form controls and components.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelDirective;

impl DirectiveHandler for ModelDirective {
    fn generate(
        &self,
        el: &mut Element,
        dir: &Directive,
        data: &mut ElementData,
        warn: &mut dyn DiagnosticSink,
    ) -> bool {
        let value = dir.value.as_str();
        let has = |m: &str| dir.has_modifier(m);
        let tag = el.tag.clone();
        let input_type = el.attrs_map.get("type").map(str::to_string);
        let range = el.raw_attr_range("v-model");

        if tag == "input" && input_type.as_deref() == Some("file") {
            warn.warn(
                format!(
                    "<{tag} v-model=\"{value}\" type=\"file\">:\n\
                     File inputs are read only. Use a v-on:change listener instead."
                ),
                range,
                false,
            );
        }

        if el.component.is_some() {
            data.model = Some(gen_component_model(value, dir.modifiers.as_ref()));
            return false;
        }
        match (tag.as_str(), input_type.as_deref()) {
            ("select", _) => gen_select(el, value, has("number"), warn),
            ("input", Some("checkbox")) => gen_checkbox_model(el, value, has("number"), warn),
            ("input", Some("radio")) => gen_radio_model(el, value, has("number"), warn),
            ("input", _) | ("textarea", _) => {
                let modifiers = ModelModifiers {
                    lazy: has("lazy"),
                    number: has("number"),
                    trim: has("trim"),
                };
                gen_default_model(el, value, modifiers, warn);
            }
            _ if !is_reserved_tag(&tag) => {
                data.model = Some(gen_component_model(value, dir.modifiers.as_ref()));
                return false;
            }
            _ => warn.warn(
                format!(
                    "<{tag} v-model=\"{value}\">: v-model is not supported on this element type. \
                     If you are working with contenteditable, it's recommended to wrap a \
                     library dedicated for that purpose inside a custom component."
                ),
                range,
                false,
            ),
        }
        // The runtime directive keeps IME composition and select options in sync.
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ModelModifiers {
    lazy: bool,
    number: bool,
    trim: bool,
}

fn on(el: &mut Element, event: &str, code: &str, important: bool, warn: &mut dyn DiagnosticSink) {
    add_handler(
        el,
        HandlerSpec {
            name: event,
            value: code,
            modifiers: None,
            important,
            range: Range::none(),
            dynamic: false,
        },
        warn,
    );
}

fn gen_checkbox_model(el: &mut Element, value: &str, number: bool, warn: &mut dyn DiagnosticSink) {
    let value_binding = get_binding_attr(el, "value", true).unwrap_or_else(|| "null".to_string());
    let true_binding =
        get_binding_attr(el, "true-value", true).unwrap_or_else(|| "true".to_string());
    let false_binding =
        get_binding_attr(el, "false-value", true).unwrap_or_else(|| "false".to_string());

    let checked_when_scalar = if true_binding == "true" {
        format!(":({value})")
    } else {
        format!(":_q({value},{true_binding})")
    };
    add_prop(
        el,
        "checked",
        &format!("Array.isArray({value})?_i({value},{value_binding})>-1{checked_when_scalar}"),
        Range::none(),
        false,
    );

    let item = if number {
        format!("_n({value_binding})")
    } else {
        value_binding
    };
    let code = format!(
        "var $$a={value},$$el=$event.target,$$c=$$el.checked?({true_binding}):({false_binding});\
         if(Array.isArray($$a)){{var $$v={item},$$i=_i($$a,$$v);\
         if($$el.checked){{$$i<0&&({})}}else{{$$i>-1&&({})}}}}else{{{}}}",
        gen_assignment_code(value, "$$a.concat([$$v])"),
        gen_assignment_code(value, "$$a.slice(0,$$i).concat($$a.slice($$i+1))"),
        gen_assignment_code(value, "$$c"),
    );
    on(el, "change", &code, true, warn);
}

fn gen_radio_model(el: &mut Element, value: &str, number: bool, warn: &mut dyn DiagnosticSink) {
    let mut value_binding =
        get_binding_attr(el, "value", true).unwrap_or_else(|| "null".to_string());
    if number {
        value_binding = format!("_n({value_binding})");
    }
    add_prop(el, "checked", &format!("_q({value},{value_binding})"), Range::none(), false);
    on(el, "change", &gen_assignment_code(value, &value_binding), true, warn);
}

fn gen_select(el: &mut Element, value: &str, number: bool, warn: &mut dyn DiagnosticSink) {
    let selected = format!(
        "Array.prototype.filter.call($event.target.options,function(o){{return o.selected}})\
         .map(function(o){{var val = \"_value\" in o ? o._value : o.value;return {}}})",
        if number { "_n(val)" } else { "val" }
    );
    let assignment = "$event.target.multiple ? $$selectedVal : $$selectedVal[0]";
    let code = format!(
        "var $$selectedVal = {selected}; {}",
        gen_assignment_code(value, assignment)
    );
    on(el, "change", &code, true, warn);
}

fn gen_default_model(
    el: &mut Element,
    value: &str,
    modifiers: ModelModifiers,
    warn: &mut dyn DiagnosticSink,
) {
    let input_type = el.attrs_map.get("type").map(str::to_string);
    let bound_value = el
        .attrs_map
        .get("v-bind:value")
        .or_else(|| el.attrs_map.get(":value"))
        .map(str::to_string);
    let type_binding = el.attrs_map.contains("v-bind:type") || el.attrs_map.contains(":type");
    if let (Some(bound), false) = (bound_value.filter(|v| !v.is_empty()), type_binding) {
        let binding = if el.attrs_map.contains("v-bind:value") {
            "v-bind:value"
        } else {
            ":value"
        };
        warn.warn(
            format!(
                "{binding}=\"{bound}\" conflicts with v-model on the same element \
                 because the latter already expands to a value binding internally"
            ),
            el.raw_attr_range(binding),
            false,
        );
    }

    let ModelModifiers { lazy, number, trim } = modifiers;
    let is_range = input_type.as_deref() == Some("range");
    let event = if lazy {
        "change"
    } else if is_range {
        RANGE_TOKEN
    } else {
        "input"
    };

    let mut value_expression = "$event.target.value".to_string();
    if trim {
        value_expression = "$event.target.value.trim()".to_string();
    }
    if number {
        value_expression = format!("_n({value_expression})");
    }
    let mut code = gen_assignment_code(value, &value_expression);
    if !lazy && !is_range {
        code = format!("if($event.target.composing)return;{code}");
    }

    add_prop(el, "value", &format!("({value})"), Range::none(), false);
    on(el, event, &code, true, warn);
    if trim || number {
        on(el, "blur", "$forceUpdate()", false, warn);
    }
}

/// `v-text`: bind `textContent`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextDirective;

impl DirectiveHandler for TextDirective {
    fn generate(
        &self,
        el: &mut Element,
        dir: &Directive,
        _data: &mut ElementData,
        _warn: &mut dyn DiagnosticSink,
    ) -> bool {
        if !dir.value.is_empty() {
            add_prop(
                el,
                "textContent",
                &format!("_s({})", dir.value),
                Range::from_options(dir.start, dir.end),
                false,
            );
        }
        false
    }
}

/// `v-html`: bind `innerHTML`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlDirective;

impl DirectiveHandler for HtmlDirective {
    fn generate(
        &self,
        el: &mut Element,
        dir: &Directive,
        _data: &mut ElementData,
        _warn: &mut dyn DiagnosticSink,
    ) -> bool {
        if !dir.value.is_empty() {
            add_prop(
                el,
                "innerHTML",
                &format!("_s({})", dir.value),
                Range::from_options(dir.start, dir.end),
                false,
            );
        }
        false
    }
}
