//! Tessera Lexer
//!
//! Single-pass markup scanner for component templates. The scanner does not
//! build a tree: it reports start tags, end tags, text and comments to a
//! [`Handler`] and recovers from unbalanced markup by closing open elements
//! itself.
//!
//! Also hosts the character reference decoders shared by the scanner and the
//! tree builder.
//!
//! # Example
//!
//! ```
//! use tessera_lexer::decode_html;
//!
//! assert_eq!(decode_html("a &lt; b"), "a < b");
//! ```

pub mod entities;
pub mod scanner;
pub mod token;

pub use crate::entities::{decode_attr, decode_html};
pub use scanner::{Handler, ScanOptions, Scanner};
pub use token::{Attr, Range};

/// Scan `source`, reporting every construct to `handler`.
pub fn scan<H: Handler>(source: &str, options: ScanOptions, handler: &mut H) {
    Scanner::scan(source, options, handler);
}

/// Predicate that accepts nothing. Default for every platform hook.
pub fn no(_: &str) -> bool {
    false
}

/// Elements whose body is never parsed as markup.
pub fn is_plain_text_element(tag: &str) -> bool {
    matches!(tag, "script" | "style" | "textarea")
}
