//! Tessera Parser
//!
//! Builds the template tree from scanner events and resolves directives on
//! the way: conditionals, iteration, slots, bindings and event handlers.
//! Also hosts the small expression languages embedded in templates (filters,
//! text interpolation, `v-model` paths) and a validator for host expressions.
//!
//! ```text
//! template ──scan──▶ TreeBuilder ──▶ Ast (arena of nodes)
//!                        │
//!                        └─▶ DiagnosticSink (warnings and tips)
//! ```

pub mod ast;
pub mod expr_lexer;
pub mod expr_parser;
pub mod filter;
pub mod helpers;
pub mod model;
pub mod options;
pub mod parser;
pub mod text;

pub use ast::{Ast, Element, Node, NodeId, NodeKind, StaticMarks};
pub use expr_parser::{
    validate_binding, validate_function_body, validate_params, validate_return_body,
};
pub use filter::parse_filters;
pub use model::{gen_assignment_code, parse_model};
pub use options::{Module, ParseOptions, Platform, Whitespace};
pub use parser::{parse, EMPTY_SLOT_SCOPE_TOKEN};
pub use tessera_lexer::{Attr, Range};
pub use text::{parse_text, TextToken};

use serde::Serialize;

/// Host expression syntax error with the byte position it was found at.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ExprSyntaxError {
    pub message: String,
    pub position: usize,
}

/// A template problem, optionally located in the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
}

impl Diagnostic {
    pub fn new(msg: impl Into<String>, range: Range) -> Self {
        Self {
            msg: msg.into(),
            start: range.start,
            end: range.end,
        }
    }

    pub fn range(&self) -> Range {
        Range::from_options(self.start, self.end)
    }
}

/// Receiver for warnings and tips raised while compiling a template.
///
/// Every stage that can complain takes one of these explicitly.
pub trait DiagnosticSink {
    fn warn(&mut self, msg: String, range: Range, tip: bool);
}

/// Sink that forwards everything to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn warn(&mut self, msg: String, _range: Range, tip: bool) {
        if tip {
            log::info!("[tessera compiler tip]: {msg}");
        } else {
            log::warn!("[tessera compiler]: {msg}");
        }
    }
}

/// Sink that keeps errors and tips apart, in the order they were raised.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Diagnostics {
    pub errors: Vec<Diagnostic>,
    pub tips: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.tips.is_empty()
    }

    /// Error messages without their ranges.
    pub fn error_messages(&self) -> Vec<&str> {
        self.errors.iter().map(|d| d.msg.as_str()).collect()
    }

    pub fn tip_messages(&self) -> Vec<&str> {
        self.tips.iter().map(|d| d.msg.as_str()).collect()
    }
}

impl DiagnosticSink for Diagnostics {
    fn warn(&mut self, msg: String, range: Range, tip: bool) {
        let diagnostic = Diagnostic::new(msg, range);
        if tip {
            self.tips.push(diagnostic);
        } else {
            self.errors.push(diagnostic);
        }
    }
}

/// Quote `value` as a JSON string literal.
pub fn json_string(value: &str) -> String {
    serde_json::Value::String(value.to_owned()).to_string()
}

/// `foo-bar` → `fooBar`.
pub fn camelize(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '-' {
            if let Some(next) = chars.peek().copied().filter(|c| c.is_ascii_alphanumeric() || *c == '_') {
                out.push(next.to_ascii_uppercase());
                chars.next();
                continue;
            }
        }
        out.push(ch);
    }
    out
}

/// `fooBar` → `foo-bar`.
pub fn hyphenate(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 4);
    let mut prev: Option<char> = None;
    for ch in value.chars() {
        if ch.is_ascii_uppercase() && prev.is_some_and(|p| p.is_ascii_alphanumeric() || p == '_') {
            out.push('-');
        }
        out.push(ch.to_ascii_lowercase());
        prev = Some(ch);
    }
    out
}
