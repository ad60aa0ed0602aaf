//! In-memory XML tree with whitespace-exact serialization.
//!
//! Word-processing XML is whitespace significant: introducing indentation or
//! line breaks between elements corrupts document layout. The tree therefore
//! keeps children exactly as parsed (elements, text, CDATA and comments in
//! document order) and the serializer re-emits them with no formatting of its
//! own. Within one parent, adjacent character data is merged into a single
//! text node so fragmented entity references do not over-fragment runs.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::escape::{escape_attribute, escape_text};
use crate::error::{Error, Result};

/// Child-index path from the document root to a node.
///
/// An empty path addresses the root element itself. Paths stay valid across
/// text mutation because substitution never adds or removes tree nodes.
pub type NodePath = Vec<usize>;

/// One node in the tree.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    /// A child element
    Element(XmlElement),
    /// Character data
    Text(XmlText),
    /// A CDATA section, emitted verbatim
    CData(String),
    /// A comment, emitted verbatim
    Comment(String),
}

/// Character data held by an element.
///
/// Content is stored unescaped and re-escaped during serialization. A node
/// flagged as raw holds a markup fragment instead and is emitted verbatim;
/// this is how compiled rich-text is spliced into a document.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlText {
    content: String,
    raw: bool,
}

impl XmlText {
    /// Create a plain character-data node.
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            raw: false,
        }
    }

    /// The node's content, unescaped for plain nodes and verbatim markup for
    /// raw nodes.
    #[inline]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Whether the node holds a raw markup fragment.
    #[inline]
    pub fn is_raw(&self) -> bool {
        self.raw
    }

    /// Reset the node to empty plain text.
    pub fn clear(&mut self) {
        self.content.clear();
        self.raw = false;
    }

    /// Append plain character data.
    pub fn push_plain(&mut self, s: &str) {
        if self.raw {
            self.content.push_str(&escape_text(s));
        } else {
            self.content.push_str(s);
        }
    }

    /// Append a raw markup fragment, converting any plain content already
    /// present so it survives verbatim emission.
    pub fn push_raw(&mut self, s: &str) {
        if !self.raw {
            self.content = escape_text(&self.content);
            self.raw = true;
        }
        self.content.push_str(s);
    }
}

/// An element node: tag name, attributes and children in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlNode>,
    self_closing: bool,
}

impl XmlElement {
    /// Create an element with no attributes or children.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            self_closing: false,
        }
    }

    /// Tag name, including any namespace prefix.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attributes in document order.
    #[inline]
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Look up an attribute value by name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Children in document order.
    #[inline]
    pub fn children(&self) -> &[XmlNode] {
        &self.children
    }

    /// Append a child element.
    pub fn push_element(&mut self, element: XmlElement) {
        self.children.push(XmlNode::Element(element));
    }

    /// Append character data, merging with a trailing plain text child.
    pub fn push_text(&mut self, content: &str) {
        if let Some(XmlNode::Text(last)) = self.children.last_mut()
            && !last.raw
        {
            last.content.push_str(content);
            return;
        }
        self.children.push(XmlNode::Text(XmlText::plain(content)));
    }

    fn collect_text(&self, output: &mut String) {
        for child in &self.children {
            match child {
                XmlNode::Text(text) => output.push_str(&text.content),
                XmlNode::Element(element) => element.collect_text(output),
                XmlNode::CData(_) | XmlNode::Comment(_) => {}
            }
        }
    }

    fn write_xml(&self, output: &mut String) {
        output.push('<');
        output.push_str(&self.name);
        for (key, value) in &self.attributes {
            output.push(' ');
            output.push_str(key);
            output.push_str("=\"");
            output.push_str(&escape_attribute(value));
            output.push('"');
        }
        if self.self_closing && self.children.is_empty() {
            output.push_str("/>");
            return;
        }
        output.push('>');
        for child in &self.children {
            match child {
                XmlNode::Element(element) => element.write_xml(output),
                XmlNode::Text(text) => {
                    if text.raw {
                        output.push_str(&text.content);
                    } else {
                        output.push_str(&escape_text(&text.content));
                    }
                }
                XmlNode::CData(content) => {
                    output.push_str("<![CDATA[");
                    output.push_str(content);
                    output.push_str("]]>");
                }
                XmlNode::Comment(content) => {
                    output.push_str("<!--");
                    output.push_str(content);
                    output.push_str("-->");
                }
            }
        }
        output.push_str("</");
        output.push_str(&self.name);
        output.push('>');
    }
}

/// A parsed XML document: optional declaration plus the root element.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkupTree {
    declaration: Option<String>,
    root: XmlElement,
}

impl MarkupTree {
    /// Parse a document from bytes.
    ///
    /// Attribute values and character data are unescaped on load. Whitespace
    /// inside elements is kept as text nodes; only trivia outside the root
    /// element is discarded.
    ///
    /// # Examples
    ///
    /// ```
    /// use longan::xml::MarkupTree;
    /// let tree = MarkupTree::parse(b"<w:p><w:t>A &amp; B</w:t></w:p>")?;
    /// assert_eq!(tree.visible_text(), "A & B");
    /// # Ok::<(), longan::Error>(())
    /// ```
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(bytes);
        let mut buf = Vec::new();
        let mut declaration: Option<String> = None;
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Decl(ref decl) => {
                    declaration = Some(utf8(decl.as_ref(), "XML declaration")?.to_string());
                }
                Event::Start(ref start) => {
                    stack.push(element_from_start(start, false)?);
                }
                Event::Empty(ref start) => {
                    let element = element_from_start(start, true)?;
                    attach(XmlNode::Element(element), &mut stack, &mut root)?;
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or_else(|| {
                        Error::MalformedMarkup("closing tag without opening tag".to_string())
                    })?;
                    attach(XmlNode::Element(element), &mut stack, &mut root)?;
                }
                Event::Text(ref text) => {
                    let content = text.decode().map_err(|err| {
                        Error::MalformedMarkup(format!("invalid character data: {err}"))
                    })?;
                    if let Some(parent) = stack.last_mut() {
                        parent.push_text(&content);
                    }
                }
                Event::GeneralRef(ref reference) => {
                    let resolved = resolve_reference(utf8(reference.as_ref(), "entity reference")?);
                    if let Some(parent) = stack.last_mut() {
                        parent.push_text(&resolved);
                    }
                }
                Event::CData(ref cdata) => {
                    let content = utf8(cdata.as_ref(), "CDATA section")?.to_string();
                    attach(XmlNode::CData(content), &mut stack, &mut root)?;
                }
                Event::Comment(ref comment) => {
                    let content = utf8(comment.as_ref(), "comment")?.to_string();
                    attach(XmlNode::Comment(content), &mut stack, &mut root)?;
                }
                Event::PI(_) | Event::DocType(_) => {}
                Event::Eof => break,
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(Error::MalformedMarkup(
                "unclosed element at end of input".to_string(),
            ));
        }
        match root {
            Some(root) => Ok(Self { declaration, root }),
            None => Err(Error::MalformedMarkup("no root element".to_string())),
        }
    }

    /// The root element.
    #[inline]
    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    /// The XML declaration content, without the `<?` and `?>` delimiters.
    #[inline]
    pub fn declaration(&self) -> Option<&str> {
        self.declaration.as_deref()
    }

    /// Serialize the document, introducing no indentation or line breaks.
    pub fn to_xml_string(&self) -> String {
        let mut output = String::new();
        if let Some(declaration) = &self.declaration {
            output.push_str("<?");
            output.push_str(declaration);
            output.push_str("?>");
        }
        self.root.write_xml(&mut output);
        output
    }

    /// Serialize the document to bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_xml_string().into_bytes()
    }

    /// The element addressed by `path`, if the path resolves to one.
    pub fn element_at(&self, path: &[usize]) -> Option<&XmlElement> {
        let mut current = &self.root;
        for &index in path {
            match current.children.get(index)? {
                XmlNode::Element(element) => current = element,
                _ => return None,
            }
        }
        Some(current)
    }

    /// The text node addressed by `path`, if the path resolves to one.
    pub fn text_at(&self, path: &[usize]) -> Option<&XmlText> {
        let (&last, parents) = path.split_last()?;
        match self.element_at(parents)?.children.get(last)? {
            XmlNode::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Mutable access to the text node addressed by `path`.
    pub fn text_at_mut(&mut self, path: &[usize]) -> Option<&mut XmlText> {
        let (&last, parents) = path.split_last()?;
        let mut current = &mut self.root;
        for &index in parents {
            match current.children.get_mut(index)? {
                XmlNode::Element(element) => current = element,
                _ => return None,
            }
        }
        match current.children.get_mut(last)? {
            XmlNode::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Paths of elements holding a direct text child that contains `{`.
    ///
    /// A weak pre-filter: an opening brace may belong to a placeholder whose
    /// closing brace lives in a sibling node, so callers widen from here.
    pub fn find_text_bearing_nodes(&self) -> Vec<NodePath> {
        let mut found = Vec::new();
        let mut path = NodePath::new();
        collect_candidates(&self.root, &mut path, &mut found);
        found
    }

    /// Paths of every text node under `path`, in document order.
    pub fn descendant_text_paths(&self, path: &[usize]) -> Vec<NodePath> {
        let mut found = Vec::new();
        if let Some(element) = self.element_at(path) {
            let mut prefix = path.to_vec();
            collect_text_paths(element, &mut prefix, &mut found);
        }
        found
    }

    /// Concatenated content of every text node under `path`.
    pub fn concatenated_text(&self, path: &[usize]) -> String {
        let mut text = String::new();
        if let Some(element) = self.element_at(path) {
            element.collect_text(&mut text);
        }
        text
    }

    /// All character data of the document, in document order.
    pub fn visible_text(&self) -> String {
        self.concatenated_text(&[])
    }
}

fn utf8<'a>(bytes: &'a [u8], context: &str) -> Result<&'a str> {
    std::str::from_utf8(bytes)
        .map_err(|_| Error::MalformedMarkup(format!("invalid UTF-8 in {context}")))
}

fn element_from_start(start: &BytesStart<'_>, self_closing: bool) -> Result<XmlElement> {
    let mut element = XmlElement::new(utf8(start.name().as_ref(), "tag name")?);
    element.self_closing = self_closing;
    for attr in start.attributes() {
        let attr =
            attr.map_err(|err| Error::MalformedMarkup(format!("invalid attribute: {err}")))?;
        let key = utf8(attr.key.as_ref(), "attribute name")?.to_string();
        let value = attr
            .unescape_value()
            .map_err(|err| Error::MalformedMarkup(format!("invalid attribute value: {err}")))?
            .into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(node: XmlNode, stack: &mut Vec<XmlElement>, root: &mut Option<XmlElement>) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
        return Ok(());
    }
    match node {
        XmlNode::Element(element) => {
            if root.is_some() {
                return Err(Error::MalformedMarkup("multiple root elements".to_string()));
            }
            *root = Some(element);
        }
        // Trivia outside the root element carries no document content
        XmlNode::Text(_) | XmlNode::CData(_) | XmlNode::Comment(_) => {}
    }
    Ok(())
}

/// Resolve a general entity reference to its character data.
fn resolve_reference(name: &str) -> String {
    match name {
        "amp" => "&".to_string(),
        "lt" => "<".to_string(),
        "gt" => ">".to_string(),
        "quot" => "\"".to_string(),
        "apos" => "'".to_string(),
        _ => {
            if let Some(digits) = name.strip_prefix('#') {
                let code = match digits.strip_prefix('x').or_else(|| digits.strip_prefix('X')) {
                    Some(hex) => u32::from_str_radix(hex, 16).ok(),
                    None => digits.parse::<u32>().ok(),
                };
                if let Some(ch) = code.and_then(char::from_u32) {
                    return ch.to_string();
                }
            }
            // Unknown entity: keep the reference text
            format!("&{name};")
        }
    }
}

fn collect_candidates(element: &XmlElement, path: &mut NodePath, found: &mut Vec<NodePath>) {
    let has_opening_brace = element.children.iter().any(
        |child| matches!(child, XmlNode::Text(text) if !text.raw && text.content.contains('{')),
    );
    if has_opening_brace {
        found.push(path.clone());
    }
    for (index, child) in element.children.iter().enumerate() {
        if let XmlNode::Element(child_element) = child {
            path.push(index);
            collect_candidates(child_element, path, found);
            path.pop();
        }
    }
}

fn collect_text_paths(element: &XmlElement, prefix: &mut NodePath, found: &mut Vec<NodePath>) {
    for (index, child) in element.children.iter().enumerate() {
        prefix.push(index);
        match child {
            XmlNode::Text(_) => found.push(prefix.clone()),
            XmlNode::Element(child_element) => collect_text_paths(child_element, prefix, found),
            XmlNode::CData(_) | XmlNode::Comment(_) => {}
        }
        prefix.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_preserves_structure_and_whitespace() {
        let source = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve"> spaced </w:t></w:r></w:p></w:body></w:document>"#;
        let tree = MarkupTree::parse(source).unwrap();
        assert_eq!(tree.to_bytes(), source.to_vec());
    }

    #[test]
    fn test_roundtrip_keeps_entities_and_literal_quotes() {
        let source = b"<root a=\"x &amp; y\"><t>it's A &amp; B &lt;ok&gt;</t></root>";
        let tree = MarkupTree::parse(source).unwrap();
        assert_eq!(tree.to_bytes(), source.to_vec());
        assert_eq!(tree.visible_text(), "it's A & B <ok>");
    }

    #[test]
    fn test_roundtrip_distinguishes_empty_element_forms() {
        let source = b"<root><a/><b></b></root>";
        let tree = MarkupTree::parse(source).unwrap();
        assert_eq!(tree.to_bytes(), source.to_vec());
    }

    #[test]
    fn test_roundtrip_keeps_carriage_returns_in_text() {
        // Line endings inside character data must not be normalized
        let source = b"<root><t>line one\r\nline two\rline three</t></root>";
        let tree = MarkupTree::parse(source).unwrap();
        assert_eq!(tree.to_bytes(), source.to_vec());
    }

    #[test]
    fn test_roundtrip_keeps_comments_and_cdata() {
        let source = b"<root><!-- keep me --><t><![CDATA[1 < 2]]></t></root>";
        let tree = MarkupTree::parse(source).unwrap();
        assert_eq!(tree.to_bytes(), source.to_vec());
    }

    #[test]
    fn test_parse_rejects_invalid_markup() {
        assert!(MarkupTree::parse(b"<root><unclosed></root>").is_err());
        assert!(MarkupTree::parse(b"no markup here").is_err());
        assert!(MarkupTree::parse(b"").is_err());
    }

    #[test]
    fn test_attribute_values_are_unescaped_on_load() {
        let tree = MarkupTree::parse(b"<root title=\"a &amp; b\"/>").unwrap();
        assert_eq!(tree.root().attribute("title"), Some("a & b"));
    }

    #[test]
    fn test_find_text_bearing_nodes_returns_direct_holders() {
        let tree =
            MarkupTree::parse(b"<doc><p><r><t>{inv</t></r><r><t>plain</t></r></p></doc>").unwrap();
        let candidates = tree.find_text_bearing_nodes();
        assert_eq!(candidates, vec![vec![0, 0, 0]]);
        assert_eq!(tree.element_at(&candidates[0]).unwrap().name(), "t");
    }

    #[test]
    fn test_descendant_text_paths_in_document_order() {
        let tree = MarkupTree::parse(b"<doc><r><t>one</t></r>mid<r><t>two</t></r></doc>").unwrap();
        let paths = tree.descendant_text_paths(&[]);
        let contents: Vec<&str> = paths
            .iter()
            .map(|path| tree.text_at(path).unwrap().content())
            .collect();
        assert_eq!(contents, vec!["one", "mid", "two"]);
    }

    #[test]
    fn test_concatenated_text_of_subtree() {
        let tree = MarkupTree::parse(b"<doc><p><t>{a</t><t>.b}</t></p><t>tail</t></doc>").unwrap();
        assert_eq!(tree.concatenated_text(&[0]), "{a.b}");
        assert_eq!(tree.visible_text(), "{a.b}tail");
    }

    #[test]
    fn test_raw_text_is_emitted_verbatim() {
        let mut tree = MarkupTree::parse(b"<doc><t>{body}</t></doc>").unwrap();
        let path = tree.descendant_text_paths(&[])[0].clone();
        let node = tree.text_at_mut(&path).unwrap();
        node.clear();
        node.push_raw("<w:p><w:r><w:t>hi</w:t></w:r></w:p>");
        assert_eq!(
            tree.to_xml_string(),
            "<doc><t><w:p><w:r><w:t>hi</w:t></w:r></w:p></t></doc>"
        );
    }

    #[test]
    fn test_push_raw_escapes_existing_plain_content() {
        let mut text = XmlText::plain("a & b");
        text.push_raw("<w:br/>");
        text.push_plain(" < c");
        assert!(text.is_raw());
        assert_eq!(text.content(), "a &amp; b<w:br/> &lt; c");
    }

    #[test]
    fn test_declaration_preserved() {
        let tree = MarkupTree::parse(b"<?xml version=\"1.0\"?>\r\n<root/>").unwrap();
        assert_eq!(tree.declaration(), Some("xml version=\"1.0\""));
        assert_eq!(tree.to_xml_string(), "<?xml version=\"1.0\"?><root/>");
    }
}
