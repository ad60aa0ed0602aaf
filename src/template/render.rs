//! Template handles and render entry points.

use std::path::Path;

use serde_json::Value;

use super::engine::substitute_tree;
use crate::archive::{Archive, EntryContent};
use crate::context::flatten_context;
use crate::error::Result;
use crate::richtext::DeltaCompiler;

/// Options controlling how a template renders.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Justify compiled rich-text paragraphs and give them trailing spacing
    pub justify_rich_text: bool,
}

/// Diagnostics from one render.
#[derive(Debug, Clone, Default)]
pub struct RenderReport {
    /// Token paths that had no value in the context, in discovery order
    pub unresolved: Vec<String>,
}

/// A parsed template document, reusable across renders.
///
/// Opening parses the container and every XML part once; each render then
/// works on a copy, so one template can serve many contexts.
///
/// # Examples
///
/// ```no_run
/// use serde_json::json;
/// use longan::Template;
///
/// let template = Template::open("subscription-agreement.docx")?;
/// let document = template.render(&json!({
///     "investor": { "primary_owner": { "full_name": "Ada Lovelace" } },
/// }))?;
/// std::fs::write("subscription-agreement-ada.docx", document)?;
/// # Ok::<(), longan::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Template {
    archive: Archive,
    options: RenderOptions,
}

impl Template {
    /// Parse a template from document bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            archive: Archive::open(bytes)?,
            options: RenderOptions::default(),
        })
    }

    /// Parse a template from a file on disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            archive: Archive::from_path(path)?,
            options: RenderOptions::default(),
        })
    }

    /// Replace the render options.
    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    /// Render against a context, returning the finished document bytes.
    ///
    /// Unresolved tokens are logged and substituted with the empty string;
    /// use [`Template::render_with_report`] to inspect them.
    pub fn render(&self, context: &Value) -> Result<Vec<u8>> {
        let (bytes, report) = self.render_with_report(context)?;
        if !report.unresolved.is_empty() {
            log::warn!(
                "render left {} token(s) unresolved: {}",
                report.unresolved.len(),
                report.unresolved.join(", ")
            );
        }
        Ok(bytes)
    }

    /// Render against a context, also returning unresolved-token diagnostics.
    pub fn render_with_report(&self, context: &Value) -> Result<(Vec<u8>, RenderReport)> {
        let values = flatten_context(context);
        let compiler = DeltaCompiler::new().justified(self.options.justify_rich_text);
        let mut archive = self.archive.clone();
        let mut report = RenderReport::default();
        for (_, content) in archive.entries_mut() {
            if let EntryContent::Markup(tree) = content {
                substitute_tree(tree, &values, &compiler, &mut report.unresolved);
            }
        }
        Ok((archive.to_bytes()?, report))
    }
}
