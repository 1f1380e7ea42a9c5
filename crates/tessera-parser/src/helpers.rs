//! Element editing helpers shared by the tree builder and platform modules.

use regex::Regex;
use tessera_lexer::{Attr, Range};

use crate::ast::{Binding, Directive, Element, Handler, Modifiers};
use crate::filter::parse_filters;
use crate::{json_string, DiagnosticSink};

/// Bind `name` as a DOM property.
pub fn add_prop(el: &mut Element, name: &str, value: &str, range: Range, dynamic: bool) {
    el.props.push(binding(name, value, range, dynamic));
    el.plain = false;
}

/// Bind `name` as an attribute, statically or with a dynamic name.
pub fn add_attr(el: &mut Element, name: &str, value: &str, range: Range, dynamic: bool) {
    let target = if dynamic {
        &mut el.dynamic_attrs
    } else {
        &mut el.attrs
    };
    target.push(binding(name, value, range, dynamic));
    el.plain = false;
}

/// Add a source-level attribute, as if it had been written in the template.
pub fn add_raw_attr(el: &mut Element, name: &str, value: &str, range: Range) {
    el.attrs_map.insert(name, value);
    el.attrs_list.push(Attr {
        name: name.to_string(),
        value: value.to_string(),
        start: range.start,
        end: range.end,
    });
}

pub fn add_directive(el: &mut Element, directive: Directive) {
    el.directives.push(directive);
    el.plain = false;
}

fn binding(name: &str, value: &str, range: Range, dynamic: bool) -> Binding {
    Binding {
        name: name.to_string(),
        value: value.to_string(),
        dynamic,
        start: range.start,
        end: range.end,
    }
}

fn prepend_modifier_marker(symbol: &str, name: &str, dynamic: bool) -> String {
    if dynamic {
        format!("_p({name},\"{symbol}\")")
    } else {
        format!("{symbol}{name}")
    }
}

/// An event binding request for [`add_handler`].
#[derive(Debug, Clone)]
pub struct HandlerSpec<'a> {
    pub name: &'a str,
    pub value: &'a str,
    pub modifiers: Option<Modifiers>,
    /// Run before handlers already registered for the same event.
    pub important: bool,
    pub range: Range,
    pub dynamic: bool,
}

/// Register an event handler, folding capture/once/passive modifiers into
/// the event name and `.native` into the native event map.
pub fn add_handler(el: &mut Element, spec: HandlerSpec<'_>, warn: &mut dyn DiagnosticSink) {
    let HandlerSpec {
        name,
        value,
        modifiers,
        important,
        range,
        dynamic,
    } = spec;
    let had_modifiers = modifiers.is_some();
    let mut modifiers = modifiers.unwrap_or_default();

    if modifiers.contains("prevent") && modifiers.contains("passive") {
        warn.warn(
            "passive and prevent can't be used together. \
             Passive handler can't prevent default event."
                .to_string(),
            range,
            false,
        );
    }

    // Right and middle clicks never fire `click`.
    let mut name = name.to_string();
    if modifiers.contains("right") {
        if dynamic {
            name = format!("({name})==='click'?'contextmenu':({name})");
        } else if name == "click" {
            name = "contextmenu".to_string();
            modifiers.remove("right");
        }
    } else if modifiers.contains("middle") {
        if dynamic {
            name = format!("({name})==='click'?'mouseup':({name})");
        } else if name == "click" {
            name = "mouseup".to_string();
        }
    }

    if modifiers.remove("capture") {
        name = prepend_modifier_marker("!", &name, dynamic);
    }
    if modifiers.remove("once") {
        name = prepend_modifier_marker("~", &name, dynamic);
    }
    if modifiers.remove("passive") {
        name = prepend_modifier_marker("&", &name, dynamic);
    }

    let native = modifiers.remove("native");
    let handler = Handler {
        value: value.trim().to_string(),
        dynamic,
        modifiers: had_modifiers.then_some(modifiers),
        start: range.start,
        end: range.end,
    };

    let events = if native {
        &mut el.native_events
    } else {
        &mut el.events
    };
    match events.iter_mut().find(|(n, _)| *n == name) {
        Some((_, handlers)) if important => handlers.insert(0, handler),
        Some((_, handlers)) => handlers.push(handler),
        None => events.push((name, vec![handler])),
    }
    el.plain = false;
}

/// Range of a possibly bound attribute: `:name`, `v-bind:name` or `name`.
pub fn get_raw_binding_attr(el: &Element, name: &str) -> Range {
    [format!(":{name}"), format!("v-bind:{name}"), name.to_string()]
        .iter()
        .find(|n| el.raw_attrs.iter().any(|a| &a.name == *n))
        .map(|n| el.raw_attr_range(n))
        .unwrap_or_default()
}

/// Read and consume `:name` / `v-bind:name` (filter-parsed), falling back to
/// a static `name` (JSON-quoted) when `get_static` is set.
pub fn get_binding_attr(el: &mut Element, name: &str, get_static: bool) -> Option<String> {
    let shorthand = get_and_remove_attr(el, &format!(":{name}"), false);
    let dynamic = match shorthand {
        Some(value) if !value.is_empty() => Some(value),
        _ => get_and_remove_attr(el, &format!("v-bind:{name}"), false),
    };
    if let Some(value) = dynamic {
        return Some(parse_filters(&value));
    }
    if get_static {
        return get_and_remove_attr(el, name, false).map(|value| json_string(&value));
    }
    None
}

/// Value of `name`, removed from the pending attribute list.
///
/// The attribute map keeps the value unless `remove_from_map` is set, since
/// code generation still reads it.
pub fn get_and_remove_attr(el: &mut Element, name: &str, remove_from_map: bool) -> Option<String> {
    let value = el.attrs_map.get(name).map(str::to_string);
    if value.is_some() {
        if let Some(pos) = el.attrs_list.iter().position(|a| a.name == name) {
            el.attrs_list.remove(pos);
        }
    }
    if remove_from_map {
        el.attrs_map.remove(name);
    }
    value
}

/// Remove and return the first pending attribute whose name matches `re`.
pub fn get_and_remove_attr_by_regex(el: &mut Element, re: &Regex) -> Option<Attr> {
    let pos = el.attrs_list.iter().position(|a| re.is_match(&a.name))?;
    Some(el.attrs_list.remove(pos))
}
