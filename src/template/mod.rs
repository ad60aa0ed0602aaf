//! Template rendering.
//!
//! Ties the other modules together: a [`Template`] owns a parsed archive,
//! and each render flattens the caller's context, substitutes tokens in
//! every XML part and writes the archive back out.

mod engine;
mod render;

pub use render::{RenderOptions, RenderReport, Template};
