//! Rich-text delta compilation.
//!
//! Long-form template fields carry formatted text as Quill-style deltas, a
//! JSON list of insert operations. This module parses those payloads and
//! compiles them into word-processing paragraph markup ready to splice into
//! a document. Payloads that do not parse as deltas pass through as-is.

mod compiler;
mod delta;

pub use compiler::{DeltaCompiler, Paragraph, Run};
pub use delta::{Delta, DeltaOp, OpAttributes};

/// Compile a rich-text delta payload into paragraph markup.
///
/// Shorthand for [`DeltaCompiler::compile`] with default formatting.
pub fn compile_delta(source: &str) -> String {
    DeltaCompiler::new().compile(source)
}
