//! Tessera Compiler
//!
//! The full template pipeline on top of the parser and code generator:
//!
//! ```text
//! template ─trim─▶ parse ─▶ optimize ─▶ generate ─▶ detect_errors
//!                                           │
//!                       CompiledResult { ast, render, static_render_fns, errors, tips }
//! ```
//!
//! A [`Compiler`] is built from platform [`BaseOptions`] and compiles any
//! number of templates with per-call [`CompilerOptions`]. The web platform
//! is the default ([`compile`]).

pub mod codeframe;
pub mod error_detector;
pub mod optimizer;
pub mod to_function;
pub mod web;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tessera_codegen::{generate, CodegenOptions, DirectiveHandler, DirectiveSet};
use tessera_parser::{
    parse, Ast, Diagnostic, DiagnosticSink, Module, ParseOptions, Platform, Range, StaticMarks,
};

pub use codeframe::{code_frame_for, generate_code_frame};
pub use error_detector::detect_errors;
pub use optimizer::optimize;
pub use tessera_parser::Whitespace;
pub use to_function::{
    CompileUnit, CompileUnitError, CompiledFunctions, FunctionCompiler, SyntaxCheckedUnit,
};

/// Per-call options.
///
/// Unset fields fall back to the platform's [`BaseOptions`]. Modules are
/// appended to the platform's and directives overlay the platform's.
#[derive(Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompilerOptions {
    /// Interpolation delimiters, `{{` `}}` when unset.
    pub delimiters: Option<(String, String)>,
    pub whitespace: Option<Whitespace>,
    pub preserve_whitespace: Option<bool>,
    /// Record source positions and report diagnostics with ranges.
    pub output_source_range: bool,
    /// Keep HTML comments in the tree.
    pub comments: Option<bool>,
    /// Hoist static subtrees; on unless set to `false`.
    pub optimize: Option<bool>,
    pub should_decode_newlines: Option<bool>,
    pub should_decode_newlines_for_href: Option<bool>,
    #[serde(skip)]
    pub modules: Vec<Arc<dyn Module>>,
    #[serde(skip)]
    pub directives: DirectiveSet,
}

impl CompilerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delimiters(mut self, open: impl Into<String>, close: impl Into<String>) -> Self {
        self.delimiters = Some((open.into(), close.into()));
        self
    }

    pub fn whitespace(mut self, whitespace: Whitespace) -> Self {
        self.whitespace = Some(whitespace);
        self
    }

    pub fn preserve_whitespace(mut self, preserve: bool) -> Self {
        self.preserve_whitespace = Some(preserve);
        self
    }

    pub fn output_source_range(mut self, enabled: bool) -> Self {
        self.output_source_range = enabled;
        self
    }

    pub fn comments(mut self, keep: bool) -> Self {
        self.comments = Some(keep);
        self
    }

    pub fn optimize(mut self, enabled: bool) -> Self {
        self.optimize = Some(enabled);
        self
    }

    pub fn module(mut self, module: Arc<dyn Module>) -> Self {
        self.modules.push(module);
        self
    }

    pub fn directive(mut self, name: impl Into<String>, handler: Arc<dyn DirectiveHandler>) -> Self {
        self.directives.insert(name, handler);
        self
    }
}

impl fmt::Debug for CompilerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompilerOptions")
            .field("delimiters", &self.delimiters)
            .field("whitespace", &self.whitespace)
            .field("preserve_whitespace", &self.preserve_whitespace)
            .field("output_source_range", &self.output_source_range)
            .field("comments", &self.comments)
            .field("optimize", &self.optimize)
            .field("modules", &self.modules.len())
            .field("directives", &self.directives)
            .finish_non_exhaustive()
    }
}

/// What a target platform contributes to every compile.
#[derive(Clone)]
pub struct BaseOptions {
    pub expect_html: bool,
    pub platform: Platform,
    pub modules: Vec<Arc<dyn Module>>,
    pub directives: DirectiveSet,
}

impl BaseOptions {
    /// The browser platform.
    pub fn web() -> Self {
        web::base_options()
    }
}

impl Default for BaseOptions {
    fn default() -> Self {
        Self {
            expect_html: false,
            platform: Platform::default(),
            modules: Vec::new(),
            directives: DirectiveSet::new(),
        }
    }
}

impl fmt::Debug for BaseOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseOptions")
            .field("expect_html", &self.expect_html)
            .field("modules", &self.modules.len())
            .field("directives", &self.directives)
            .finish_non_exhaustive()
    }
}

/// Base and per-call options merged, fixed for the duration of a compile.
#[derive(Debug, Clone)]
pub struct CompileContext {
    pub parse: ParseOptions,
    pub directives: DirectiveSet,
    pub optimize: bool,
}

impl CompileContext {
    pub fn new(base: &BaseOptions, options: &CompilerOptions) -> Self {
        let defaults = ParseOptions::default();
        let mut modules = base.modules.clone();
        modules.extend(options.modules.iter().cloned());
        let mut directives = base.directives.clone();
        directives.extend(&options.directives);

        let parse = ParseOptions {
            delimiters: options.delimiters.clone(),
            whitespace: options.whitespace,
            preserve_whitespace: options
                .preserve_whitespace
                .unwrap_or(defaults.preserve_whitespace),
            output_source_range: options.output_source_range,
            comments: options.comments.unwrap_or(defaults.comments),
            expect_html: base.expect_html,
            should_decode_newlines: options
                .should_decode_newlines
                .unwrap_or(defaults.should_decode_newlines),
            should_decode_newlines_for_href: options
                .should_decode_newlines_for_href
                .unwrap_or(defaults.should_decode_newlines_for_href),
            platform: base.platform,
            modules,
        };
        Self {
            parse,
            directives,
            optimize: options.optimize.unwrap_or(true),
        }
    }

    pub fn codegen(&self) -> CodegenOptions<'_> {
        CodegenOptions {
            parse: &self.parse,
            directives: &self.directives,
        }
    }
}

/// A reported problem: plain text, or located in the template when
/// compiled with `output_source_range`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CompileMessage {
    Text(String),
    Located(Diagnostic),
}

impl CompileMessage {
    pub fn msg(&self) -> &str {
        match self {
            Self::Text(msg) => msg,
            Self::Located(diagnostic) => &diagnostic.msg,
        }
    }

    pub fn range(&self) -> Range {
        match self {
            Self::Text(_) => Range::none(),
            Self::Located(diagnostic) => diagnostic.range(),
        }
    }
}

impl fmt::Display for CompileMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.msg())
    }
}

/// Output of [`Compiler::compile`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledResult {
    #[serde(skip)]
    pub ast: Ast,
    #[serde(skip)]
    pub marks: StaticMarks,
    pub render: String,
    pub static_render_fns: Vec<String>,
    pub errors: Vec<CompileMessage>,
    pub tips: Vec<CompileMessage>,
}

/// Collects diagnostics for a [`CompiledResult`].
///
/// Stages see the trimmed template, so located messages are shifted back by
/// the length of the leading whitespace that was cut.
struct MessageCollector {
    located: bool,
    leading: usize,
    errors: Vec<CompileMessage>,
    tips: Vec<CompileMessage>,
}

impl MessageCollector {
    fn new(template: &str, located: bool) -> Self {
        Self {
            located,
            leading: template.len() - template.trim_start().len(),
            errors: Vec::new(),
            tips: Vec::new(),
        }
    }
}

impl DiagnosticSink for MessageCollector {
    fn warn(&mut self, msg: String, range: Range, tip: bool) {
        let message = if self.located {
            let shift = |pos: Option<usize>| pos.map(|p| p + self.leading);
            let range = Range::from_options(shift(range.start), shift(range.end));
            CompileMessage::Located(Diagnostic::new(msg, range))
        } else {
            CompileMessage::Text(msg)
        };
        if tip {
            self.tips.push(message);
        } else {
            self.errors.push(message);
        }
    }
}

/// Template compiler for one platform.
#[derive(Debug, Clone)]
pub struct Compiler {
    base: BaseOptions,
}

impl Compiler {
    pub fn new(base: BaseOptions) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &BaseOptions {
        &self.base
    }

    /// Compile `template`, collecting every diagnostic in the result.
    pub fn compile(&self, template: &str, options: &CompilerOptions) -> CompiledResult {
        let context = CompileContext::new(&self.base, options);
        let mut collector = MessageCollector::new(template, options.output_source_range);
        let (ast, marks, render, static_render_fns) =
            base_compile(template.trim(), &context, &mut collector);
        detect_errors(&ast, &mut collector);
        log::debug!(
            "compiled template: {} errors, {} tips",
            collector.errors.len(),
            collector.tips.len()
        );
        CompiledResult {
            ast,
            marks,
            render,
            static_render_fns,
            errors: collector.errors,
            tips: collector.tips,
        }
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(BaseOptions::web())
    }
}

fn base_compile(
    template: &str,
    context: &CompileContext,
    warn: &mut dyn DiagnosticSink,
) -> (Ast, StaticMarks, String, Vec<String>) {
    let ast = parse(template, &context.parse, warn);
    log::debug!("parsed template into {} nodes", ast.len());
    let marks = if context.optimize {
        optimize(&ast, &context.parse)
    } else {
        StaticMarks::default()
    };
    let code = generate(&ast, &marks, context.codegen(), warn);
    (ast, marks, code.render, code.static_render_fns)
}

/// Compile `template` for the browser platform.
pub fn compile(template: &str, options: &CompilerOptions) -> CompiledResult {
    Compiler::default().compile(template, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tessera_codegen::ElementData;
    use tessera_parser::ast::{Directive, Element};

    fn render(source: &str, options: &CompilerOptions) -> String {
        compile(source, options).render
    }

    fn messages(list: &[CompileMessage]) -> Vec<&str> {
        list.iter().map(CompileMessage::msg).collect()
    }

    struct Tooltip;

    impl DirectiveHandler for Tooltip {
        fn generate(
            &self,
            el: &mut Element,
            dir: &Directive,
            _data: &mut ElementData,
            _warn: &mut dyn DiagnosticSink,
        ) -> bool {
            el.attrs.push(tessera_parser::ast::Binding {
                name: "title".to_string(),
                value: dir.value.clone(),
                dynamic: false,
                start: None,
                end: None,
            });
            false
        }
    }

    // =========================================================================
    // Pipeline
    // =========================================================================

    #[test]
    fn test_compile_simple_template() {
        let result = compile(r#"<div id="app">{{ msg }}</div>"#, &CompilerOptions::default());
        assert_eq!(
            result.render,
            r#"with(this){return _c('div',{attrs:{"id":"app"}},[_v(_s(msg))])}"#
        );
        assert!(result.static_render_fns.is_empty());
        assert!(result.errors.is_empty());
        assert!(result.tips.is_empty());
    }

    #[test]
    fn test_static_subtree_hoisted() {
        let result = compile(
            "<div><p class=\"x\"><b>static</b></p><span>{{ y }}</span></div>",
            &CompilerOptions::default(),
        );
        assert_eq!(
            result.render,
            "with(this){return _c('div',[_m(0),_c('span',[_v(_s(y))])])}"
        );
        assert_eq!(
            result.static_render_fns,
            vec!["with(this){return _c('p',{staticClass:\"x\"},[_c('b',[_v(\"static\")])])}"]
        );
    }

    #[test]
    fn test_optimize_disabled() {
        let result = compile(
            "<div><p><b>static</b></p></div>",
            &CompilerOptions::new().optimize(false),
        );
        assert_eq!(
            result.render,
            "with(this){return _c('div',[_c('p',[_c('b',[_v(\"static\")])])])}"
        );
        assert!(result.static_render_fns.is_empty());
    }

    #[test]
    fn test_template_is_trimmed() {
        let options = CompilerOptions::default();
        assert_eq!(render("\n  <div></div>\n", &options), render("<div></div>", &options));
    }

    #[test]
    fn test_empty_template() {
        let result = compile("   ", &CompilerOptions::default());
        assert_eq!(result.render, "with(this){return _c(\"div\")}");
        assert!(result.ast.root.is_none());
    }

    #[test]
    fn test_compile_is_deterministic() {
        let source = r#"<ul><li v-for="(item, i) in items" :key="item.id" @click="pick(i)">{{ item.name }}</li></ul>"#;
        let options = CompilerOptions::default();
        let first = compile(source, &options);
        let second = compile(source, &options);
        assert_eq!(first.render, second.render);
        assert_eq!(first.static_render_fns, second.static_render_fns);
    }

    // =========================================================================
    // Options
    // =========================================================================

    #[test]
    fn test_custom_delimiters() {
        let options = CompilerOptions::new().delimiters("${", "}");
        assert_eq!(
            render("<p>${ a } {{ b }}</p>", &options),
            r#"with(this){return _c('p',[_v(_s(a)+" {{ b }}")])}"#
        );
    }

    #[test]
    fn test_comments_kept() {
        let options = CompilerOptions::new().comments(true);
        assert_eq!(
            render("<div><!-- note --></div>", &options),
            r#"with(this){return _c('div',[_e(" note ")])}"#
        );
    }

    #[test]
    fn test_user_directive_overlays_platform() {
        let options = CompilerOptions::new().directive("text", Arc::new(Tooltip));
        assert_eq!(
            render(r#"<p v-text="t"></p>"#, &options),
            r#"with(this){return _c('p',{attrs:{"title":t}})}"#
        );
    }

    #[test]
    fn test_context_merge() {
        let options = CompilerOptions::new()
            .comments(true)
            .module(Arc::new(web::modules::ClassModule))
            .directive("tooltip", Arc::new(Tooltip));
        let context = CompileContext::new(&BaseOptions::web(), &options);
        assert!(context.parse.comments);
        assert!(context.parse.expect_html);
        assert!(context.parse.preserve_whitespace);
        assert_eq!(context.parse.modules.len(), 3);
        assert!(context.directives.contains("model"));
        assert!(context.directives.contains("tooltip"));
        assert!(context.optimize);
    }

    #[test]
    fn test_options_deserialize() {
        let options: CompilerOptions = serde_json::from_str(
            r#"{"delimiters":["[[","]]"],"whitespace":"condense","outputSourceRange":true,"optimize":false}"#,
        )
        .unwrap();
        assert_eq!(options.delimiters, Some(("[[".to_string(), "]]".to_string())));
        assert_eq!(options.whitespace, Some(Whitespace::Condense));
        assert!(options.output_source_range);
        assert_eq!(options.optimize, Some(false));
        assert_eq!(options.comments, None);
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    #[test]
    fn test_errors_collected_as_text() {
        let result = compile(r#"<div :id="a b"></div>"#, &CompilerOptions::default());
        assert_eq!(result.errors.len(), 1);
        assert!(matches!(result.errors[0], CompileMessage::Text(_)));
        assert!(result.errors[0].msg().starts_with("invalid expression: "));
    }

    #[test]
    fn test_located_errors_shifted_by_leading_whitespace() {
        let source = "\n   <div :id=\"a b\"></div>";
        let result = compile(source, &CompilerOptions::new().output_source_range(true));
        let range = result.errors[0].range();
        assert_eq!(range, Range::new(9, 18));
        assert_eq!(&source[9..18], r#":id="a b""#);
    }

    #[test]
    fn test_collector_shifts_each_bound() {
        let mut collector = MessageCollector::new("  <p></p>", true);
        collector.warn("open".to_string(), Range::at(3), false);
        collector.warn("tail".to_string(), Range::from_options(None, Some(4)), false);
        collector.warn("none".to_string(), Range::none(), true);
        let ranges: Vec<Range> = collector.errors.iter().map(CompileMessage::range).collect();
        assert_eq!(ranges, vec![Range::at(5), Range::from_options(None, Some(6))]);
        assert_eq!(collector.tips[0].range(), Range::none());
    }

    #[test]
    fn test_tips_separated() {
        let result = compile(
            r#"<div><my-item v-for="i in list"></my-item></div>"#,
            &CompilerOptions::default(),
        );
        assert!(result.errors.is_empty());
        assert_eq!(
            messages(&result.tips),
            vec!["<my-item v-for=\"i in list\">: component lists rendered with v-for \
                  should have explicit keys."]
        );
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let result = compile("<div>{{ x }}</div>", &CompilerOptions::default());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["render"], "with(this){return _c('div',[_v(_s(x))])}");
        assert!(json["staticRenderFns"].as_array().unwrap().is_empty());
        assert!(json.get("ast").is_none());
    }

    #[test]
    fn test_located_message_serializes_flat() {
        let message = CompileMessage::Located(Diagnostic::new("bad", Range::new(1, 4)));
        assert_eq!(
            serde_json::to_string(&message).unwrap(),
            r#"{"msg":"bad","start":1,"end":4}"#
        );
        let text = CompileMessage::Text("bad".to_string());
        assert_eq!(serde_json::to_string(&text).unwrap(), r#""bad""#);
    }
}
