//! XML parsing, escaping and whitespace-exact serialization.
//!
//! Built on [`quick_xml`] for event-based parsing, with an owned tree on top
//! so substitution can address and rewrite individual text nodes before the
//! document is serialized back out byte-compatibly.

mod escape;
mod tree;

pub use escape::{escape_attribute, escape_text};
pub use tree::{MarkupTree, NodePath, XmlElement, XmlNode, XmlText};
