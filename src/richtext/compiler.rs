//! Delta to paragraph markup compilation.

use super::delta::{Delta, DeltaOp};
use crate::xml::escape_text;

/// A fragment of text with inline formatting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Run {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
}

/// A block of runs with paragraph-level formatting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paragraph {
    pub runs: Vec<Run>,
    pub bullet: bool,
}

impl Paragraph {
    fn is_empty(&self) -> bool {
        self.runs.is_empty() && !self.bullet
    }
}

/// Compiles rich-text deltas into word-processing paragraph markup.
///
/// # Examples
///
/// ```
/// use longan::DeltaCompiler;
///
/// let markup = DeltaCompiler::new().compile(r#"{"ops":[{"insert":"Quill\n"}]}"#);
/// assert_eq!(markup, "<w:p><w:r><w:t xml:space=\"preserve\">Quill</w:t></w:r></w:p>");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DeltaCompiler {
    justify: bool,
}

impl DeltaCompiler {
    /// Create a compiler with default formatting.
    pub fn new() -> Self {
        Self::default()
    }

    /// Justify every compiled paragraph and give it trailing spacing.
    pub fn justified(mut self, justify: bool) -> Self {
        self.justify = justify;
        self
    }

    /// Compile a JSON delta payload, or return the input unchanged when it
    /// is not one.
    ///
    /// The passthrough keeps plain strings usable in fields that usually
    /// carry rich text, and keeps a malformed payload visible in the output
    /// instead of silently vanishing.
    pub fn compile(&self, source: &str) -> String {
        match Delta::from_json(source) {
            Some(delta) => self.compile_ops(&delta.ops),
            None => {
                log::debug!("payload is not a rich-text delta, passing through unchanged");
                source.to_string()
            }
        }
    }

    /// Render parsed ops into a sequence of `<w:p>` fragments.
    pub fn compile_ops(&self, ops: &[DeltaOp]) -> String {
        let mut xml = String::new();
        for paragraph in build_paragraphs(ops) {
            self.write_paragraph(&paragraph, &mut xml);
        }
        xml
    }

    fn write_paragraph(&self, paragraph: &Paragraph, xml: &mut String) {
        xml.push_str("<w:p>");
        if self.justify || paragraph.bullet {
            xml.push_str("<w:pPr>");
            if self.justify {
                xml.push_str("<w:jc w:val=\"both\"/>");
            }
            if paragraph.bullet {
                xml.push_str("<w:numPr><w:ilvl w:val=\"0\"/><w:numId w:val=\"1\"/></w:numPr>");
            }
            if self.justify {
                xml.push_str("<w:spacing w:after=\"120\"/>");
            }
            xml.push_str("</w:pPr>");
        }
        for run in &paragraph.runs {
            xml.push_str("<w:r>");
            if run.bold || run.italic {
                xml.push_str("<w:rPr>");
                if run.bold {
                    xml.push_str("<w:b/>");
                }
                if run.italic {
                    xml.push_str("<w:i/>");
                }
                xml.push_str("</w:rPr>");
            }
            xml.push_str("<w:t xml:space=\"preserve\">");
            xml.push_str(&escape_text(&run.text));
            xml.push_str("</w:t></w:r>");
        }
        xml.push_str("</w:p>");
    }
}

/// Fold the op stream into paragraphs.
///
/// A lone-newline op terminates the line accumulated so far and carries its
/// block attributes. Newlines embedded in a longer insert terminate lines
/// without attributes. A final unterminated fragment still becomes a
/// paragraph; only the empty paragraph left open by a conventional trailing
/// newline is dropped.
fn build_paragraphs(ops: &[DeltaOp]) -> Vec<Paragraph> {
    let mut paragraphs = Vec::new();
    let mut current = Paragraph::default();

    for op in ops {
        if op.is_line_format() {
            current.bullet = op.is_bullet();
            paragraphs.push(std::mem::take(&mut current));
            continue;
        }
        for (index, fragment) in op.insert.split('\n').enumerate() {
            if index > 0 {
                paragraphs.push(std::mem::take(&mut current));
            }
            if !fragment.is_empty() {
                current.runs.push(Run {
                    text: fragment.to_string(),
                    bold: op.attributes.bold,
                    italic: op.attributes.italic,
                });
            }
        }
    }

    if !current.is_empty() {
        paragraphs.push(current);
    }
    paragraphs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_insert_compiles_to_one_plain_paragraph() {
        let markup = DeltaCompiler::new().compile(r#"{"ops":[{"insert":"Quill\n"}]}"#);
        assert_eq!(
            markup,
            "<w:p><w:r><w:t xml:space=\"preserve\">Quill</w:t></w:r></w:p>"
        );
    }

    #[test]
    fn test_bold_and_italic_runs() {
        let markup = DeltaCompiler::new().compile(
            r#"{"ops":[{"insert":"b","attributes":{"bold":true}},{"insert":"i","attributes":{"italic":true}},{"insert":"bi","attributes":{"italic":true,"bold":true}},{"insert":"\n"}]}"#,
        );
        assert_eq!(
            markup,
            "<w:p>\
             <w:r><w:rPr><w:b/></w:rPr><w:t xml:space=\"preserve\">b</w:t></w:r>\
             <w:r><w:rPr><w:i/></w:rPr><w:t xml:space=\"preserve\">i</w:t></w:r>\
             <w:r><w:rPr><w:b/><w:i/></w:rPr><w:t xml:space=\"preserve\">bi</w:t></w:r>\
             </w:p>"
        );
    }

    #[test]
    fn test_bullet_line_gets_numbering_properties() {
        let markup = DeltaCompiler::new().compile(
            r#"{"ops":[{"insert":"first"},{"insert":"\n","attributes":{"list":"bullet"}},{"insert":"after\n"}]}"#,
        );
        assert_eq!(
            markup,
            "<w:p><w:pPr><w:numPr><w:ilvl w:val=\"0\"/><w:numId w:val=\"1\"/></w:numPr></w:pPr>\
             <w:r><w:t xml:space=\"preserve\">first</w:t></w:r></w:p>\
             <w:p><w:r><w:t xml:space=\"preserve\">after</w:t></w:r></w:p>"
        );
    }

    #[test]
    fn test_embedded_newlines_split_paragraphs() {
        let markup = DeltaCompiler::new().compile(r#"{"ops":[{"insert":"one\ntwo\n"}]}"#);
        assert_eq!(
            markup,
            "<w:p><w:r><w:t xml:space=\"preserve\">one</w:t></w:r></w:p>\
             <w:p><w:r><w:t xml:space=\"preserve\">two</w:t></w:r></w:p>"
        );
    }

    #[test]
    fn test_unterminated_tail_is_kept() {
        let markup = DeltaCompiler::new().compile(r#"{"ops":[{"insert":"no newline"}]}"#);
        assert_eq!(
            markup,
            "<w:p><w:r><w:t xml:space=\"preserve\">no newline</w:t></w:r></w:p>"
        );
    }

    #[test]
    fn test_justified_mode_adds_alignment_and_spacing() {
        let markup = DeltaCompiler::new()
            .justified(true)
            .compile(r#"{"ops":[{"insert":"text\n"}]}"#);
        assert_eq!(
            markup,
            "<w:p><w:pPr><w:jc w:val=\"both\"/><w:spacing w:after=\"120\"/></w:pPr>\
             <w:r><w:t xml:space=\"preserve\">text</w:t></w:r></w:p>"
        );
    }

    #[test]
    fn test_text_is_escaped() {
        let markup = DeltaCompiler::new().compile(r#"{"ops":[{"insert":"a < b & c\n"}]}"#);
        assert!(markup.contains("a &lt; b &amp; c"));
    }

    #[test]
    fn test_malformed_payload_passes_through_unchanged() {
        let compiler = DeltaCompiler::new();
        assert_eq!(
            compiler.compile("this is not a quill delta"),
            "this is not a quill delta"
        );
        assert_eq!(compiler.compile("{\"ops\":\"wrong\"}"), "{\"ops\":\"wrong\"}");
        assert_eq!(compiler.compile(""), "");
    }

    #[test]
    fn test_empty_ops_compile_to_nothing() {
        assert_eq!(DeltaCompiler::new().compile(r#"{"ops":[]}"#), "");
    }

    #[test]
    fn test_formatting_spans_split_fragments() {
        let markup = DeltaCompiler::new()
            .compile(r#"{"ops":[{"insert":"one\ntwo","attributes":{"bold":true}},{"insert":"\n"}]}"#);
        assert_eq!(
            markup,
            "<w:p><w:r><w:rPr><w:b/></w:rPr><w:t xml:space=\"preserve\">one</w:t></w:r></w:p>\
             <w:p><w:r><w:rPr><w:b/></w:rPr><w:t xml:space=\"preserve\">two</w:t></w:r></w:p>"
        );
    }
}
