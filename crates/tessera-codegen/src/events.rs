//! Event handler generation for `on:` and `nativeOn:`.
//!
//! Modifiers become guard statements placed before the handler body: the
//! key filter first, then `stop`/`prevent`/`self`, system keys and `exact`.

use std::sync::LazyLock;

use regex::Regex;
use tessera_parser::ast::{Handler, Handlers};
use tessera_parser::json_string;

/// `a => ...`, `(a, b) => ...` or `function (...)`.
static FN_EXP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9_$]+|\([^)]*?\))\s*=>|^function(?:\s+[A-Za-z0-9_$]+)?\s*\(")
        .expect("valid regex")
});

/// Trailing call arguments: `handle(a, b);`.
static FN_INVOKE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*?\);*$").expect("valid regex"));

/// `a`, `a.b`, `a['b']`, `a["b"]`, `a[0]`, `a[b]`.
static SIMPLE_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^[A-Za-z_$][A-Za-z0-9_$]*(?:\.[A-Za-z_$][A-Za-z0-9_$]*|\['[^']*?'\]|\["[^"]*?"\]|\[\d+\]|\[[A-Za-z_$][A-Za-z0-9_$]*\])*$"#,
    )
    .expect("valid regex")
});

/// Key codes of the named key modifiers.
fn key_code(key: &str) -> Option<&'static str> {
    Some(match key {
        "esc" => "27",
        "tab" => "9",
        "enter" => "13",
        "space" => "32",
        "up" => "38",
        "left" => "37",
        "right" => "39",
        "down" => "40",
        "delete" => "[8,46]",
        _ => return None,
    })
}

/// `KeyboardEvent.key` values of the named key modifiers, as JSON.
fn key_name(key: &str) -> Option<&'static str> {
    Some(match key {
        "esc" => r#"["Esc","Escape"]"#,
        "tab" => r#""Tab""#,
        "enter" => r#""Enter""#,
        "space" => r#"[" ","Spacebar"]"#,
        "up" => r#"["Up","ArrowUp"]"#,
        "left" => r#"["Left","ArrowLeft"]"#,
        "right" => r#"["Right","ArrowRight"]"#,
        "down" => r#"["Down","ArrowDown"]"#,
        "delete" => r#"["Backspace","Delete","Del"]"#,
        _ => return None,
    })
}

fn gen_guard(condition: &str) -> String {
    format!("if({condition})return null;")
}

fn modifier_code(modifier: &str) -> Option<String> {
    let code = match modifier {
        "stop" => return Some("$event.stopPropagation();".to_string()),
        "prevent" => return Some("$event.preventDefault();".to_string()),
        "self" => "$event.target !== $event.currentTarget",
        "ctrl" => "!$event.ctrlKey",
        "shift" => "!$event.shiftKey",
        "alt" => "!$event.altKey",
        "meta" => "!$event.metaKey",
        "left" => "'button' in $event && $event.button !== 0",
        "middle" => "'button' in $event && $event.button !== 1",
        "right" => "'button' in $event && $event.button !== 2",
        _ => return None,
    };
    Some(gen_guard(code))
}

/// `on:{...}` or `nativeOn:{...}`; events with a dynamic name go through `_d`.
pub fn gen_handlers(events: &Handlers, native: bool) -> String {
    let prefix = if native { "nativeOn:" } else { "on:" };
    let mut static_handlers = Vec::new();
    let mut dynamic_handlers = Vec::new();
    for (name, handlers) in events {
        let code = gen_handler_list(handlers);
        // A dynamic name is only honoured for a single handler.
        match handlers.as_slice() {
            [only] if only.dynamic => dynamic_handlers.push(format!("{name},{code}")),
            _ => static_handlers.push(format!("\"{name}\":{code}")),
        }
    }
    let static_handlers = format!("{{{}}}", static_handlers.join(","));
    if dynamic_handlers.is_empty() {
        format!("{prefix}{static_handlers}")
    } else {
        format!("{prefix}_d({static_handlers},[{}])", dynamic_handlers.join(","))
    }
}

fn gen_handler_list(handlers: &[Handler]) -> String {
    match handlers {
        [] => "function(){}".to_string(),
        [only] => gen_handler(only),
        many => {
            let codes: Vec<String> = many.iter().map(gen_handler).collect();
            format!("[{}]", codes.join(","))
        }
    }
}

fn gen_handler(handler: &Handler) -> String {
    let value = handler.value.as_str();
    let is_method_path = SIMPLE_PATH_RE.is_match(value);
    let is_function_expression = FN_EXP_RE.is_match(value);
    let is_function_invocation = SIMPLE_PATH_RE.is_match(&FN_INVOKE_RE.replace(value, ""));

    let Some(modifiers) = &handler.modifiers else {
        if is_method_path || is_function_expression {
            return value.to_string();
        }
        return if is_function_invocation {
            format!("function($event){{return {value}}}")
        } else {
            format!("function($event){{{value}}}")
        };
    };

    let mut keys = Vec::new();
    let mut guards = String::new();
    for modifier in modifiers.iter() {
        if let Some(code) = modifier_code(modifier) {
            guards.push_str(&code);
            if key_code(modifier).is_some() {
                keys.push(modifier);
            }
        } else if modifier == "exact" {
            let unset: Vec<String> = ["ctrl", "shift", "alt", "meta"]
                .iter()
                .filter(|m| !modifiers.contains(m))
                .map(|m| format!("$event.{m}Key"))
                .collect();
            guards.push_str(&gen_guard(&unset.join("||")));
        } else {
            keys.push(modifier);
        }
    }

    let mut code = String::new();
    if !keys.is_empty() {
        code.push_str(&gen_key_filter(&keys));
    }
    code.push_str(&guards);

    let body = if is_method_path {
        format!("return {value}($event)")
    } else if is_function_expression {
        format!("return ({value})($event)")
    } else if is_function_invocation {
        format!("return {value}")
    } else {
        value.to_string()
    };
    format!("function($event){{{code}{body}}}")
}

fn gen_key_filter(keys: &[&str]) -> String {
    let filters: Vec<String> = keys.iter().map(|k| gen_filter_code(k)).collect();
    format!(
        "if(!$event.type.indexOf('key')&&{})return null;",
        filters.join("&&")
    )
}

fn gen_filter_code(key: &str) -> String {
    if let Some(code) = leading_int(key).filter(|&n| n != 0) {
        return format!("$event.keyCode!=={code}");
    }
    format!(
        "_k($event.keyCode,{},{},$event.key,{})",
        json_string(key),
        key_code(key).unwrap_or("undefined"),
        key_name(key).unwrap_or("undefined"),
    )
}

/// Integer prefix of `key`, like `parseInt(key, 10)`.
fn leading_int(key: &str) -> Option<u64> {
    let digits: String = key.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}
