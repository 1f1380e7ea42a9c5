//! Expression checks over the finished tree.
//!
//! Every directive value and interpolation is run through the host
//! expression validator. Failures are reported with the attribute (or text)
//! they came from, and a clearer message when a reserved word used as a
//! property name is the likely cause.

use std::sync::LazyLock;

use regex::Regex;
use tessera_parser::parser::{DIR_RE, ON_RE};
use tessera_parser::{
    validate_binding, validate_params, validate_return_body, Ast, DiagnosticSink, NodeId, NodeKind,
    Range,
};

static PROHIBITED_KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    let words = [
        "do", "if", "for", "let", "new", "try", "var", "case", "else", "with", "await", "break",
        "catch", "class", "const", "super", "throw", "while", "yield", "delete", "export",
        "import", "return", "switch", "default", "extends", "finally", "continue", "debugger",
        "function", "arguments",
    ];
    let alternation: Vec<String> = words.iter().map(|w| format!(r"\b{w}\b")).collect();
    Regex::new(&alternation.join("|")).expect("valid regex")
});

static UNARY_OPERATORS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bdelete\s*\([^)]*\)|\btypeof\s*\([^)]*\)|\bvoid\s*\([^)]*\)")
        .expect("valid regex")
});

/// String literals and the literal parts of template strings.
static STRIP_STRING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"'(?:[^'\\]|\\.)*'|"(?:[^"\\]|\\.)*"|`(?:[^`\\]|\\.)*\$\{|\}(?:[^`\\]|\\.)*`|`(?:[^`\\]|\\.)*`"#,
    )
    .expect("valid regex")
});

/// Walk the tree from the root and report every malformed expression.
pub fn detect_errors(ast: &Ast, warn: &mut dyn DiagnosticSink) {
    if let Some(root) = ast.root {
        check_node(ast, root, warn);
    }
}

fn check_node(ast: &Ast, id: NodeId, warn: &mut dyn DiagnosticSink) {
    let Some(node) = ast.node(id) else {
        return;
    };
    match &node.kind {
        NodeKind::Element(el) => {
            for (name, value) in el.attrs_map.iter() {
                if !DIR_RE.is_match(name) || value.is_empty() {
                    continue;
                }
                let range = el.raw_attr_range(name);
                let text = format!("{name}=\"{value}\"");
                if name == "v-for" {
                    check_expression(el.for_exp.as_deref().unwrap_or(""), &text, range, warn);
                    check_identifier(el.alias.as_deref(), "v-for alias", &text, range, warn);
                    check_identifier(el.iterator1.as_deref(), "v-for iterator", &text, range, warn);
                    check_identifier(el.iterator2.as_deref(), "v-for iterator", &text, range, warn);
                } else if name == "v-slot" || name.starts_with('#') {
                    check_function_parameters(value, &text, range, warn);
                } else if ON_RE.is_match(name) {
                    check_event(value, &text, range, warn);
                } else {
                    check_expression(value, &text, range, warn);
                }
            }

            for &child in &el.children {
                check_node(ast, child, warn);
            }
            // Branches and slot content hang off the element, not its children.
            for condition in el.if_conditions.iter().skip(1) {
                check_node(ast, condition.block, warn);
            }
            for (_, block) in &el.scoped_slots {
                check_node(ast, *block, warn);
            }
        }
        NodeKind::Expression(exp) => {
            check_expression(&exp.expression, &exp.text, ast.range(id), warn);
        }
        NodeKind::Text(_) => {}
    }
}

fn check_event(exp: &str, text: &str, range: Range, warn: &mut dyn DiagnosticSink) {
    let stripped = STRIP_STRING_RE.replace_all(exp, "");
    if let Some(m) = UNARY_OPERATORS_RE.find(&stripped) {
        // `$delete(...)` and friends are instance methods.
        if !stripped[..m.start()].ends_with('$') {
            warn.warn(
                format!(
                    "avoid using JavaScript unary operator as property name: \"{}\" in expression {}",
                    m.as_str(),
                    text.trim()
                ),
                range,
                false,
            );
        }
    }
    check_expression(exp, text, range, warn);
}

fn check_identifier(
    ident: Option<&str>,
    kind: &str,
    text: &str,
    range: Range,
    warn: &mut dyn DiagnosticSink,
) {
    let Some(ident) = ident else {
        return;
    };
    if validate_binding(ident).is_err() {
        warn.warn(
            format!("invalid {kind} \"{ident}\" in expression: {}", text.trim()),
            range,
            false,
        );
    }
}

fn check_expression(exp: &str, text: &str, range: Range, warn: &mut dyn DiagnosticSink) {
    let Err(err) = validate_return_body(exp) else {
        return;
    };
    let stripped = STRIP_STRING_RE.replace_all(exp, "");
    let msg = match PROHIBITED_KEYWORD_RE.find(&stripped) {
        Some(keyword) => format!(
            "avoid using JavaScript keyword as property name: \"{}\"\n  Raw expression: {}",
            keyword.as_str(),
            text.trim()
        ),
        None => format!(
            "invalid expression: {} in\n\n    {exp}\n\n  Raw expression: {}\n",
            err.message,
            text.trim()
        ),
    };
    warn.warn(msg, range, false);
}

fn check_function_parameters(exp: &str, text: &str, range: Range, warn: &mut dyn DiagnosticSink) {
    if let Err(err) = validate_params(exp) {
        warn.warn(
            format!(
                "invalid function parameter expression: {} in\n\n    {exp}\n\n  Raw expression: {}\n",
                err.message,
                text.trim()
            ),
            range,
            false,
        );
    }
}
