//! Tessera Code Generator
//!
//! Turns a template tree into render-program text: one main function body
//! and a list of hoisted static render functions. The output only refers to
//! the runtime helper surface (`_c _o _n _s _l _t _q _i _m _f _k _b _v _e
//! _u _g _d _p`); turning it into something callable is left to the caller.
//!
//! ```text
//! Ast + StaticMarks → generate() → CodegenResult { render, static_render_fns }
//! ```

pub mod data;
pub mod directives;
pub mod element;
pub mod events;

pub use directives::{
    gen_component_model, BuiltinDirective, ComponentModel, DirectiveHandler, DirectiveSet,
    ElementData,
};
pub use events::gen_handlers;

use tessera_parser::{Ast, DiagnosticSink, Element, NodeId, ParseOptions, StaticMarks};

/// Generated render program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodegenResult {
    /// `with(this){return ...}`
    pub render: String,
    pub static_render_fns: Vec<String>,
}

/// What the generator needs from the compile configuration.
#[derive(Debug, Clone, Copy)]
pub struct CodegenOptions<'a> {
    /// Platform predicates and the modules contributing `gen_data`.
    pub parse: &'a ParseOptions,
    pub directives: &'a DirectiveSet,
}

/// Generate the render program for `ast`.
///
/// `marks` comes from the optimizer; pass `StaticMarks::default()` to
/// generate without hoisting.
pub fn generate(
    ast: &Ast,
    marks: &StaticMarks,
    options: CodegenOptions<'_>,
    warn: &mut dyn DiagnosticSink,
) -> CodegenResult {
    let mut state = CodegenState::new(ast, marks, options, warn);
    let render = state.gen_root(ast.root);
    log::debug!(
        "generated render program ({} bytes, {} static fns)",
        render.len(),
        state.static_render_fns.len()
    );
    CodegenResult {
        render,
        static_render_fns: state.static_render_fns,
    }
}

/// Per-generation state shared by the element and data generators.
pub(crate) struct CodegenState<'a> {
    pub(crate) ast: &'a Ast,
    pub(crate) marks: &'a StaticMarks,
    pub(crate) options: CodegenOptions<'a>,
    pub(crate) warn: &'a mut dyn DiagnosticSink,
    pub(crate) static_render_fns: Vec<String>,
    pub(crate) once_id: usize,
    /// Generating inside a hoisted `v-pre` subtree.
    pub(crate) pre: bool,
}

impl<'a> CodegenState<'a> {
    fn new(
        ast: &'a Ast,
        marks: &'a StaticMarks,
        options: CodegenOptions<'a>,
        warn: &'a mut dyn DiagnosticSink,
    ) -> Self {
        Self {
            ast,
            marks,
            options,
            warn,
            static_render_fns: Vec::new(),
            once_id: 0,
            pre: false,
        }
    }

    /// `with(this){return ...}` for the subtree at `root`.
    pub(crate) fn gen_root(&mut self, root: Option<NodeId>) -> String {
        let code = match root {
            Some(id) if self.ast.element(id).is_some_and(|el| el.tag == "script") => {
                "null".to_string()
            }
            Some(id) => self.gen_element(id, element::Processed::default()),
            None => "_c(\"div\")".to_string(),
        };
        format!("with(this){{return {code}}}")
    }

    pub(crate) fn maybe_component(&self, el: &Element) -> bool {
        self.options.parse.maybe_component(el)
    }
}

/// Escape U+2028/U+2029, which end a line in script source.
pub fn transform_special_newlines(text: &str) -> String {
    text.replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tessera_parser::{parse, Diagnostics, Module, Platform};

    pub(crate) fn reserved(tag: &str) -> bool {
        matches!(
            tag,
            "div" | "span" | "p" | "ul" | "li" | "a" | "input" | "template" | "button"
                | "section" | "img" | "script"
        )
    }

    pub(crate) fn test_options() -> ParseOptions {
        ParseOptions {
            expect_html: true,
            platform: Platform {
                is_unary_tag: |t| matches!(t, "img" | "input"),
                is_reserved_tag: reserved,
                ..Platform::default()
            },
            ..ParseOptions::default()
        }
    }

    pub(crate) fn compile_with(
        source: &str,
        options: &ParseOptions,
        marks: impl FnOnce(&Ast) -> StaticMarks,
    ) -> (CodegenResult, Diagnostics) {
        let mut sink = Diagnostics::new();
        let ast = parse(source, options, &mut sink);
        let marks = marks(&ast);
        let directives = DirectiveSet::new();
        let result = generate(
            &ast,
            &marks,
            CodegenOptions {
                parse: options,
                directives: &directives,
            },
            &mut sink,
        );
        (result, sink)
    }

    /// Render body without the `with(this){return ...}` wrapper.
    pub(crate) fn render(source: &str) -> String {
        let (result, _) = compile_with(source, &test_options(), |_| StaticMarks::default());
        unwrap_render(&result.render)
    }

    pub(crate) fn unwrap_render(render: &str) -> String {
        render
            .strip_prefix("with(this){return ")
            .and_then(|r| r.strip_suffix('}'))
            .unwrap()
            .to_string()
    }

    struct ClassModule;

    impl Module for ClassModule {
        fn gen_data(&self, el: &Element) -> String {
            el.extra("staticClass")
                .map(|c| format!("staticClass:{c},"))
                .unwrap_or_default()
        }

        fn transform_node(
            &self,
            el: &mut Element,
            _options: &ParseOptions,
            _warn: &mut dyn DiagnosticSink,
        ) {
            if let Some(class) = tessera_parser::helpers::get_and_remove_attr(el, "class", false) {
                el.set_extra("staticClass", tessera_parser::json_string(&class));
            }
        }
    }

    // =========================================================================
    // Top level
    // =========================================================================

    #[test]
    fn test_round_trip_bindings_events_interpolation() {
        assert_eq!(
            render(r#"<div :id="x" @click.stop="go">{{ msg }}</div>"#),
            "_c('div',{attrs:{\"id\":x},on:{\"click\":function($event){\
             $event.stopPropagation();return go($event)}}},[_v(_s(msg))])"
        );
    }

    #[test]
    fn test_empty_template_renders_div() {
        let (result, _) = compile_with("", &test_options(), |_| StaticMarks::default());
        assert_eq!(result.render, "with(this){return _c(\"div\")}");
        assert!(result.static_render_fns.is_empty());
    }

    #[test]
    fn test_script_root_renders_null() {
        let (result, _) = compile_with(
            r#"<script type="text/x-template">hi</script>"#,
            &test_options(),
            |_| StaticMarks::default(),
        );
        assert_eq!(result.render, "with(this){return null}");
    }

    #[test]
    fn test_module_gen_data() {
        let mut options = test_options();
        options.modules.push(Arc::new(ClassModule));
        let (result, _) = compile_with(r#"<div class="a" id="b"></div>"#, &options, |_| {
            StaticMarks::default()
        });
        assert_eq!(
            unwrap_render(&result.render),
            r#"_c('div',{staticClass:"a",attrs:{"id":"b"}})"#
        );
    }

    #[test]
    fn test_static_root_hoisted() {
        let (result, _) = compile_with(
            "<div><p><span>a</span></p><b>{{ x }}</b></div>",
            &test_options(),
            |ast| {
                let mut marks = StaticMarks::new(ast.len());
                let p = ast.children(ast.root.unwrap())[0];
                marks.is_static[p.0] = true;
                marks.static_root[p.0] = true;
                marks
            },
        );
        assert_eq!(
            unwrap_render(&result.render),
            "_c('div',[_m(0),_c('b',[_v(_s(x))])],1)"
        );
        assert_eq!(
            result.static_render_fns,
            vec!["with(this){return _c('p',[_c('span',[_v(\"a\")])])}"]
        );
    }

    #[test]
    fn test_static_in_for_flag() {
        let (result, _) = compile_with(
            r#"<ul><li v-for="i in list" :key="i"><span><b>x</b></span></li></ul>"#,
            &test_options(),
            |ast| {
                let mut marks = StaticMarks::new(ast.len());
                let li = ast.children(ast.root.unwrap())[0];
                let span = ast.children(li)[0];
                marks.static_root[span.0] = true;
                marks.static_in_for[span.0] = true;
                marks
            },
        );
        assert_eq!(
            unwrap_render(&result.render),
            "_c('ul',_l((list),function(i){return _c('li',{key:i},[_m(0,true)])}),0)"
        );
    }

    #[test]
    fn test_special_newlines_escaped() {
        assert_eq!(
            render("<div>a\u{2028}b</div>"),
            "_c('div',[_v(\"a\\u2028b\")])"
        );
    }

    #[test]
    fn test_generation_is_deterministic() {
        let source = r#"<div><p v-if="a" @click="f">x</p><p v-else>{{ y }}</p></div>"#;
        assert_eq!(render(source), render(source));
    }

    #[test]
    fn test_marks_shorter_than_tree() {
        let (result, _) = compile_with("<div><span></span></div>", &test_options(), |_| {
            StaticMarks::new(1)
        });
        assert_eq!(unwrap_render(&result.render), "_c('div',[_c('span')])");
    }
}
