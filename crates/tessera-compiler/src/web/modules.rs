//! `class` and `style` handling.
//!
//! Static values are normalized at compile time (`staticClass`,
//! `staticStyle`); bound values are kept as expressions for the runtime to
//! merge.

use tessera_parser::helpers::{get_and_remove_attr, get_binding_attr};
use tessera_parser::{json_string, parse_text, DiagnosticSink, Element, Module, ParseOptions};

const STATIC_CLASS: &str = "staticClass";
const CLASS_BINDING: &str = "classBinding";
const STATIC_STYLE: &str = "staticStyle";
const STYLE_BINDING: &str = "styleBinding";

fn warn_interpolation(
    el: &Element,
    attr: &str,
    value: &str,
    options: &ParseOptions,
    warn: &mut dyn DiagnosticSink,
) {
    if parse_text(value, options.delimiters.as_ref()).is_some() {
        warn.warn(
            format!(
                "{attr}=\"{value}\": Interpolation inside attributes has been removed. \
                 Use v-bind or the colon shorthand instead. For example, \
                 instead of <div {attr}=\"{{{{ val }}}}\">, use <div :{attr}=\"val\">."
            ),
            el.raw_attr_range(attr),
            false,
        );
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ClassModule;

impl Module for ClassModule {
    fn transform_node(&self, el: &mut Element, options: &ParseOptions, warn: &mut dyn DiagnosticSink) {
        if let Some(class) = get_and_remove_attr(el, "class", false) {
            warn_interpolation(el, "class", &class, options, warn);
            let normalized = class.split_whitespace().collect::<Vec<_>>().join(" ");
            el.set_extra(STATIC_CLASS, json_string(&normalized));
        }
        if let Some(binding) = get_binding_attr(el, "class", false) {
            el.set_extra(CLASS_BINDING, binding);
        }
    }

    fn gen_data(&self, el: &Element) -> String {
        let mut data = String::new();
        if let Some(class) = el.extra(STATIC_CLASS) {
            data.push_str(&format!("staticClass:{class},"));
        }
        if let Some(binding) = el.extra(CLASS_BINDING) {
            data.push_str(&format!("class:{binding},"));
        }
        data
    }

    fn static_keys(&self) -> &[&'static str] {
        &[STATIC_CLASS]
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StyleModule;

impl Module for StyleModule {
    fn transform_node(&self, el: &mut Element, options: &ParseOptions, warn: &mut dyn DiagnosticSink) {
        if let Some(style) = get_and_remove_attr(el, "style", false) {
            warn_interpolation(el, "style", &style, options, warn);
            el.set_extra(STATIC_STYLE, style_object_json(&parse_style_text(&style)));
        }
        if let Some(binding) = get_binding_attr(el, "style", false) {
            el.set_extra(STYLE_BINDING, binding);
        }
    }

    fn gen_data(&self, el: &Element) -> String {
        let mut data = String::new();
        if let Some(style) = el.extra(STATIC_STYLE) {
            data.push_str(&format!("staticStyle:{style},"));
        }
        if let Some(binding) = el.extra(STYLE_BINDING) {
            data.push_str(&format!("style:({binding}),"));
        }
        data
    }

    fn static_keys(&self) -> &[&'static str] {
        &[STATIC_STYLE]
    }
}

/// `color: red; background: url(a;b)` → `[("color", "red"), ("background", "url(a;b)")]`.
///
/// Declarations are split on `;` outside parentheses, and each one on its
/// first `:`. A repeated property keeps its first position and last value.
pub fn parse_style_text(css: &str) -> Vec<(String, String)> {
    let mut declarations: Vec<(String, String)> = Vec::new();
    for item in split_declarations(css) {
        let Some((name, value)) = item.split_once(':') else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        let (name, value) = (name.trim().to_string(), value.trim().to_string());
        match declarations.iter_mut().find(|(n, _)| *n == name) {
            Some(existing) => existing.1 = value,
            None => declarations.push((name, value)),
        }
    }
    declarations
}

fn split_declarations(css: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut from = 0;
    for (i, ch) in css.char_indices() {
        if ch != ';' {
            continue;
        }
        // A `)` before the next `(` means this `;` sits inside parentheses.
        let rest = &css[i + 1..];
        let inside_parens = match (rest.find('('), rest.find(')')) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(open), Some(close)) => close < open,
        };
        if !inside_parens {
            items.push(&css[from..i]);
            from = i + 1;
        }
    }
    items.push(&css[from..]);
    items.into_iter().filter(|item| !item.is_empty()).collect()
}

fn style_object_json(declarations: &[(String, String)]) -> String {
    let fields: Vec<String> = declarations
        .iter()
        .map(|(name, value)| format!("{}:{}", json_string(name), json_string(value)))
        .collect();
    format!("{{{}}}", fields.join(","))
}
