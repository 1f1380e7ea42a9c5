//! Directive code generation.
//!
//! Directives that survive tree building (`v-model`, `v-show`, custom ones)
//! are offered to a handler while the element's data object is generated.
//! A handler may rewrite the element (add props or listeners), record data
//! wrappers, and decides whether the directive is still needed at runtime.
//!
//! The built-in set is closed ([`BuiltinDirective`]). Platforms and users
//! extend it through [`DirectiveSet`], which maps names to
//! [`DirectiveHandler`] trait objects and takes precedence over built-ins.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tessera_parser::ast::{Directive, Element, Modifiers};
use tessera_parser::{gen_assignment_code, json_string, DiagnosticSink, Range};

/// Extra data-object state produced by directive handlers.
#[derive(Default)]
pub struct ElementData {
    /// Component `v-model`, emitted as `model:{...}`.
    pub model: Option<ComponentModel>,
    /// Wraps the finished data object, e.g. `_b(data,...)` for `v-bind="obj"`.
    pub wrap_data: Option<Box<dyn Fn(&str) -> String>>,
    /// Wraps the data object after `wrap_data`, e.g. `_g(data,...)`.
    pub wrap_listeners: Option<Box<dyn Fn(&str) -> String>>,
}

impl fmt::Debug for ElementData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementData")
            .field("model", &self.model)
            .field("wrap_data", &self.wrap_data.is_some())
            .field("wrap_listeners", &self.wrap_listeners.is_some())
            .finish()
    }
}

/// `v-model` on a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentModel {
    pub value: String,
    pub callback: String,
    pub expression: String,
}

/// Compile-time handler for a named directive.
pub trait DirectiveHandler: Send + Sync {
    /// Returns `true` when the directive must also be emitted in the
    /// `directives:[...]` list for the runtime.
    fn generate(
        &self,
        el: &mut Element,
        dir: &Directive,
        data: &mut ElementData,
        warn: &mut dyn DiagnosticSink,
    ) -> bool;
}

/// Directives every platform understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinDirective {
    /// `v-on="listeners"`
    On,
    /// `v-bind="attrs"`
    Bind,
    /// `v-cloak`, removed once compiled.
    Cloak,
}

impl BuiltinDirective {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "on" => Some(Self::On),
            "bind" => Some(Self::Bind),
            "cloak" => Some(Self::Cloak),
            _ => None,
        }
    }

    pub fn generate(
        self,
        el: &mut Element,
        dir: &Directive,
        data: &mut ElementData,
        warn: &mut dyn DiagnosticSink,
    ) -> bool {
        match self {
            Self::On => {
                if dir.modifiers.is_some() {
                    warn.warn(
                        "v-on without argument does not support modifiers.".to_string(),
                        Range::from_options(dir.start, dir.end),
                        false,
                    );
                }
                let value = dir.value.clone();
                data.wrap_listeners = Some(Box::new(move |code| format!("_g({code},{value})")));
            }
            Self::Bind => {
                let tag = el.tag.clone();
                let value = dir.value.clone();
                let prop = if dir.has_modifier("prop") { "true" } else { "false" };
                let sync = if dir.has_modifier("sync") { ",true" } else { "" };
                data.wrap_data = Some(Box::new(move |code| {
                    format!("_b({code},'{tag}',{value},{prop}{sync})")
                }));
            }
            Self::Cloak => {}
        }
        false
    }
}

/// Name → handler table consulted before the built-ins.
#[derive(Clone, Default)]
pub struct DirectiveSet {
    custom: HashMap<String, Arc<dyn DirectiveHandler>>,
}

impl DirectiveSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `name`, replacing any previous one.
    pub fn insert(&mut self, name: impl Into<String>, handler: Arc<dyn DirectiveHandler>) {
        self.custom.insert(name.into(), handler);
    }

    /// Overlay `other` on top of this set.
    pub fn extend(&mut self, other: &DirectiveSet) {
        for (name, handler) in &other.custom {
            self.custom.insert(name.clone(), Arc::clone(handler));
        }
    }

    /// A handler (custom or built-in) exists for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.custom.contains_key(name) || BuiltinDirective::from_name(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.custom.keys().map(String::as_str)
    }

    /// Run the handler for `dir`. Unknown directives always need the runtime.
    pub fn generate(
        &self,
        el: &mut Element,
        dir: &Directive,
        data: &mut ElementData,
        warn: &mut dyn DiagnosticSink,
    ) -> bool {
        if let Some(handler) = self.custom.get(&dir.name) {
            return handler.generate(el, dir, data, warn);
        }
        match BuiltinDirective::from_name(&dir.name) {
            Some(builtin) => builtin.generate(el, dir, data, warn),
            None => true,
        }
    }
}

impl fmt::Debug for DirectiveSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.custom.keys().collect();
        names.sort();
        f.debug_struct("DirectiveSet").field("custom", &names).finish()
    }
}

/// `v-model` on a component: a `model` entry with value, callback and the
/// source expression.
pub fn gen_component_model(value: &str, modifiers: Option<&Modifiers>) -> ComponentModel {
    let has = |m: &str| modifiers.is_some_and(|mods| mods.contains(m));
    let base = "$$v";
    let mut value_expression = base.to_string();
    if has("trim") {
        value_expression = format!("(typeof {base} === 'string'? {base}.trim(): {base})");
    }
    if has("number") {
        value_expression = format!("_n({value_expression})");
    }
    let assignment = gen_assignment_code(value, &value_expression);
    ComponentModel {
        value: format!("({value})"),
        callback: format!("function ({base}) {{{assignment}}}"),
        expression: json_string(value),
    }
}
