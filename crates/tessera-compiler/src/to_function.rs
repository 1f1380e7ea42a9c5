//! Turning generated render code into callable units, with a cache.
//!
//! What "callable" means is up to the embedder: a [`CompileUnit`] takes a
//! function body and produces whatever the host runs. The default
//! [`SyntaxCheckedUnit`] only proves the body parses.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tessera_parser::{validate_function_body, DiagnosticSink, ExprSyntaxError, Range};

use crate::codeframe::code_frame_for;
use crate::{CompileMessage, Compiler, CompilerOptions};

/// Failure to turn a function body into a unit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("SyntaxError: {message}")]
pub struct CompileUnitError {
    pub message: String,
}

impl From<ExprSyntaxError> for CompileUnitError {
    fn from(err: ExprSyntaxError) -> Self {
        Self {
            message: err.message,
        }
    }
}

/// Host hook that turns a generated function body into a runnable unit.
pub trait CompileUnit {
    type Output;

    fn create(&self, code: &str) -> Result<Self::Output, CompileUnitError>;
}

/// Validates the body and hands it back unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntaxCheckedUnit;

impl CompileUnit for SyntaxCheckedUnit {
    type Output = String;

    fn create(&self, code: &str) -> Result<String, CompileUnitError> {
        validate_function_body(code)?;
        Ok(code.to_string())
    }
}

/// Units for one template. `None` stands for a unit that failed to build
/// and renders nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFunctions<T> {
    pub render: Option<T>,
    pub static_render_fns: Vec<Option<T>>,
}

/// A [`Compiler`] paired with a [`CompileUnit`], caching results per
/// delimiters and template text.
pub struct FunctionCompiler<U: CompileUnit> {
    compiler: Compiler,
    unit: U,
    cache: RwLock<HashMap<String, Arc<CompiledFunctions<U::Output>>>>,
}

impl<U: CompileUnit> FunctionCompiler<U> {
    pub fn new(compiler: Compiler, unit: U) -> Self {
        Self {
            compiler,
            unit,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Number of cached templates.
    pub fn cached(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Compile `template` and build its units, reporting problems to `warn`.
    ///
    /// Repeated calls with the same template and delimiters return the
    /// cached result without compiling or reporting again.
    pub fn compile_to_functions(
        &self,
        template: &str,
        options: &CompilerOptions,
        warn: &mut dyn DiagnosticSink,
    ) -> Arc<CompiledFunctions<U::Output>> {
        let key = cache_key(template, options.delimiters.as_ref());
        if let Some(hit) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            log::debug!("compile cache hit ({} bytes)", template.len());
            return Arc::clone(hit);
        }
        log::debug!("compile cache miss ({} bytes)", template.len());

        let compiled = self.compiler.compile(template, options);
        if !compiled.errors.is_empty() {
            report_errors(template, &compiled.errors, options.output_source_range, warn);
        }
        for tip in &compiled.tips {
            warn.warn(tip.msg().to_string(), Range::none(), true);
        }

        let mut failures: Vec<(CompileUnitError, String)> = Vec::new();
        let mut create = |code: &str| -> Option<U::Output> {
            match self.unit.create(code) {
                Ok(unit) => Some(unit),
                Err(err) => {
                    failures.push((err, code.to_string()));
                    None
                }
            }
        };
        let render = create(compiled.render.as_str());
        let static_render_fns = compiled
            .static_render_fns
            .iter()
            .map(|code| create(code.as_str()))
            .collect();

        // Broken generated code is only worth reporting for a clean template.
        if compiled.errors.is_empty() && !failures.is_empty() {
            let details: Vec<String> = failures
                .iter()
                .map(|(err, code)| format!("{err} in\n\n{code}\n"))
                .collect();
            warn.warn(
                format!("Failed to generate render function:\n\n{}", details.join("\n")),
                Range::none(),
                false,
            );
        }

        let functions = Arc::new(CompiledFunctions {
            render,
            static_render_fns,
        });
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(cache.entry(key).or_insert(functions))
    }
}

/// `open,close` followed by the template, or just the template.
fn cache_key(template: &str, delimiters: Option<&(String, String)>) -> String {
    match delimiters {
        Some((open, close)) => format!("{open},{close}{template}"),
        None => template.to_string(),
    }
}

fn report_errors(
    template: &str,
    errors: &[CompileMessage],
    located: bool,
    warn: &mut dyn DiagnosticSink,
) {
    if located {
        for error in errors {
            warn.warn(
                format!(
                    "Error compiling template:\n\n{}\n\n{}",
                    error.msg(),
                    code_frame_for(template, error.range())
                ),
                Range::none(),
                false,
            );
        }
    } else {
        let list: Vec<String> = errors.iter().map(|e| format!("- {e}")).collect();
        warn.warn(
            format!(
                "Error compiling template:\n\n{template}\n\n{}\n",
                list.join("\n")
            ),
            Range::none(),
            false,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tessera_parser::Diagnostics;

    #[derive(Default)]
    struct CountingUnit {
        calls: AtomicUsize,
    }

    impl CompileUnit for CountingUnit {
        type Output = usize;

        fn create(&self, code: &str) -> Result<usize, CompileUnitError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(code.len())
        }
    }

    struct RejectingUnit;

    impl CompileUnit for RejectingUnit {
        type Output = ();

        fn create(&self, _code: &str) -> Result<(), CompileUnitError> {
            Err(CompileUnitError {
                message: "Unexpected token".to_string(),
            })
        }
    }

    fn checked() -> FunctionCompiler<SyntaxCheckedUnit> {
        FunctionCompiler::new(Compiler::default(), SyntaxCheckedUnit)
    }

    // =========================================================================
    // Units
    // =========================================================================

    #[test]
    fn test_syntax_checked_render() {
        let mut sink = Diagnostics::new();
        let functions = checked().compile_to_functions(
            "<div><p><b>a</b></p>{{ msg }}</div>",
            &CompilerOptions::default(),
            &mut sink,
        );
        assert!(sink.is_empty(), "{sink:?}");
        assert_eq!(
            functions.render.as_deref(),
            Some("with(this){return _c('div',[_m(0),_v(_s(msg))])}")
        );
        assert_eq!(functions.static_render_fns.len(), 1);
        assert!(functions.static_render_fns[0].is_some());
    }

    #[test]
    fn test_syntax_checked_rejects_garbage() {
        let err = SyntaxCheckedUnit.create("return (").unwrap_err();
        assert!(err.to_string().starts_with("SyntaxError: "));
    }

    #[test]
    fn test_unit_failure_reported() {
        let compiler = FunctionCompiler::new(Compiler::default(), RejectingUnit);
        let mut sink = Diagnostics::new();
        let functions = compiler.compile_to_functions("<div></div>", &CompilerOptions::default(), &mut sink);
        assert_eq!(functions.render, None);
        assert_eq!(
            sink.error_messages(),
            vec!["Failed to generate render function:\n\n\
                  SyntaxError: Unexpected token in\n\nwith(this){return _c('div')}\n"]
        );
    }

    #[test]
    fn test_unit_failure_silent_when_template_has_errors() {
        let compiler = FunctionCompiler::new(Compiler::default(), RejectingUnit);
        let mut sink = Diagnostics::new();
        compiler.compile_to_functions(r#"<div :id="a b"></div>"#, &CompilerOptions::default(), &mut sink);
        assert_eq!(sink.errors.len(), 1);
        assert!(sink.errors[0].msg.starts_with("Error compiling template:"));
    }

    // =========================================================================
    // Cache
    // =========================================================================

    #[test]
    fn test_cache_hit_skips_compile() {
        let compiler = FunctionCompiler::new(Compiler::default(), CountingUnit::default());
        let mut sink = Diagnostics::new();
        let options = CompilerOptions::default();
        let first = compiler.compile_to_functions("<p>{{ a }}</p>", &options, &mut sink);
        let second = compiler.compile_to_functions("<p>{{ a }}</p>", &options, &mut sink);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(compiler.unit.calls.load(Ordering::SeqCst), 1);
        assert_eq!(compiler.cached(), 1);
    }

    #[test]
    fn test_cache_keyed_by_delimiters() {
        let compiler = FunctionCompiler::new(Compiler::default(), CountingUnit::default());
        let mut sink = Diagnostics::new();
        compiler.compile_to_functions("<p>[[ a ]]</p>", &CompilerOptions::default(), &mut sink);
        compiler.compile_to_functions(
            "<p>[[ a ]]</p>",
            &CompilerOptions::new().delimiters("[[", "]]"),
            &mut sink,
        );
        assert_eq!(compiler.cached(), 2);
        assert_eq!(cache_key("t", Some(&("[[".to_string(), "]]".to_string()))), "[[,]]t");
    }

    // =========================================================================
    // Reporting
    // =========================================================================

    #[test]
    fn test_errors_listed_with_template() {
        let template = r#"<div v-for="x"></div>"#;
        let mut sink = Diagnostics::new();
        checked().compile_to_functions(template, &CompilerOptions::default(), &mut sink);
        assert_eq!(
            sink.error_messages(),
            vec![format!(
                "Error compiling template:\n\n{template}\n\n- Invalid v-for expression: x\n"
            )]
        );
    }

    #[test]
    fn test_located_errors_get_code_frames() {
        let template = r#"<div :id="a b"></div>"#;
        let mut sink = Diagnostics::new();
        checked().compile_to_functions(
            template,
            &CompilerOptions::new().output_source_range(true),
            &mut sink,
        );
        let message = &sink.errors[0].msg;
        assert!(message.starts_with("Error compiling template:\n\ninvalid expression: "));
        assert!(message.ends_with("1  |  <div :id=\"a b\"></div>\n   |       ^^^^^^^^^"), "{message}");
    }

    #[test]
    fn test_tips_forwarded() {
        let mut sink = Diagnostics::new();
        checked().compile_to_functions(
            r#"<div><my-item v-for="i in list"></my-item></div>"#,
            &CompilerOptions::default(),
            &mut sink,
        );
        assert!(sink.errors.is_empty());
        assert_eq!(sink.tips.len(), 1);
    }
}
