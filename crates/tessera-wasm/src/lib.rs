//! WASM bindings for the tessera compiler.
//!
//! Exposes `compile()` to JavaScript via wasm-bindgen.
//! Returns a JS object `{ render, staticRenderFns, errors, tips }`.

use tessera_compiler::{CompiledResult, CompilerOptions};
use wasm_bindgen::prelude::*;

/// Compile a template to render function code.
///
/// `options` is a plain object using the camelCase option names
/// (`delimiters`, `whitespace`, `comments`, `outputSourceRange`, ...) and
/// may be omitted. Template problems are returned in `errors`; only
/// malformed options throw.
#[wasm_bindgen]
pub fn compile(source: &str, options: JsValue) -> Result<JsValue, JsError> {
    let options: CompilerOptions = if options.is_undefined() || options.is_null() {
        CompilerOptions::default()
    } else {
        serde_wasm_bindgen::from_value(options)
            .map_err(|e| JsError::new(&format!("invalid options: {e}")))?
    };

    let result = tessera_compiler::compile(source, &options);
    to_js(&result)
}

/// Get the compiler version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn to_js(result: &CompiledResult) -> Result<JsValue, JsError> {
    let static_render_fns: js_sys::Array = result
        .static_render_fns
        .iter()
        .map(|code| JsValue::from_str(code))
        .collect();
    let errors = serde_wasm_bindgen::to_value(&result.errors)?;
    let tips = serde_wasm_bindgen::to_value(&result.tips)?;

    let js_obj = js_sys::Object::new();
    for (key, value) in [
        ("render", JsValue::from_str(&result.render)),
        ("staticRenderFns", static_render_fns.into()),
        ("errors", errors),
        ("tips", tips),
    ] {
        js_sys::Reflect::set(&js_obj, &key.into(), &value)
            .map_err(|_| JsError::new(&format!("Failed to set {key} property")))?;
    }
    Ok(js_obj.into())
}
