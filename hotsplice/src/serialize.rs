//! HTML5 serialization of the arena DOM.
//!
//! Follows the HTML5 serialization rules:
//!
//! - Void elements never get end tags
//! - Text content is escaped, except inside raw text elements (script, style, …)
//! - RCDATA elements (title, textarea) escape only `&` and `<`
//! - Attribute values are escaped and double-quoted, in source order
//! - Foreign content (SVG/MathML) without children uses self-closing syntax
//! - The DOCTYPE is written where the parser saw it, after any leading comments
//!
//! The tree is walked with an explicit stack, so arbitrarily deep documents
//! serialize without growing the call stack.

use indextree::NodeId;
use std::fmt::Write;

use crate::arena_dom::{Document, ElementData, Namespace, NodeKind};

/// Options for HTML serialization.
#[derive(Clone, Debug)]
pub struct SerializeOptions {
    /// Whether to emit `<!DOCTYPE …>` when the document has one (default: true)
    pub doctype: bool,
    /// Whether to sort attributes by name instead of keeping source order (default: false).
    /// Enable this for attribute-order-insensitive comparisons.
    pub sort_attributes: bool,
    /// Whether to escape `</script` sequences in script content (default: true)
    pub escape_script_end_tags: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            doctype: true,
            sort_attributes: false,
            escape_script_end_tags: true,
        }
    }
}

impl SerializeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Leave the DOCTYPE out of document output.
    pub fn no_doctype(mut self) -> Self {
        self.doctype = false;
        self
    }

    /// Enable sorting attributes alphabetically for deterministic output.
    pub fn sort_attributes(mut self) -> Self {
        self.sort_attributes = true;
        self
    }

    /// Disable escaping `</script` in script content (not recommended).
    pub fn no_escape_script_end_tags(mut self) -> Self {
        self.escape_script_end_tags = false;
        self
    }
}

/// Serialize the whole tree that `node` belongs to, from its root down.
pub fn serialize_document(doc: &Document, node: NodeId, opts: &SerializeOptions) -> String {
    serialize_node(doc, doc.root_of(node), opts)
}

/// Serialize `node` and its descendants.
///
/// A `Document` node contributes the DOCTYPE (if enabled) and its children.
pub fn serialize_node(doc: &Document, node: NodeId, opts: &SerializeOptions) -> String {
    let mut out = String::new();
    Serializer::new(&mut out, doc, opts).write_node(node);
    out
}

/// HTML5 void elements - these never have end tags.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Raw text elements - content is not escaped.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "xmp", "iframe", "noembed", "noframes", "plaintext", "noscript",
];

/// RCDATA elements - only `&` and `<` are escaped.
const RCDATA_ELEMENTS: &[&str] = &["title", "textarea"];

fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| tag.eq_ignore_ascii_case(v))
}

fn is_raw_text_element(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.iter().any(|v| tag.eq_ignore_ascii_case(v))
}

fn is_rcdata_element(tag: &str) -> bool {
    RCDATA_ELEMENTS.iter().any(|v| tag.eq_ignore_ascii_case(v))
}

/// How the text children of an element are written.
#[derive(Clone, Copy, PartialEq, Eq)]
enum TextMode {
    Escaped,
    Rcdata,
    Raw,
}

/// Pending work for the serializer's traversal stack.
enum Frame<'a> {
    /// Write a node; text uses `mode`, raw text needs the parent's tag.
    Enter {
        node: NodeId,
        mode: TextMode,
        parent_tag: &'a str,
    },
    Doctype(&'a str),
    /// Close an element.
    Exit(&'a str),
}

struct Serializer<'a, W: Write> {
    out: &'a mut W,
    doc: &'a Document,
    options: &'a SerializeOptions,
}

impl<'a, W: Write> Serializer<'a, W> {
    fn new(out: &'a mut W, doc: &'a Document, options: &'a SerializeOptions) -> Self {
        Self { out, doc, options }
    }

    /// Escape text content for normal HTML elements.
    fn write_text_escaped(&mut self, text: &str) {
        for c in text.chars() {
            let _ = match c {
                '&' => self.out.write_str("&amp;"),
                '<' => self.out.write_str("&lt;"),
                '>' => self.out.write_str("&gt;"),
                _ => self.out.write_char(c),
            };
        }
    }

    /// Escape text content for RCDATA elements (only & and <).
    fn write_rcdata_escaped(&mut self, text: &str) {
        for c in text.chars() {
            let _ = match c {
                '&' => self.out.write_str("&amp;"),
                '<' => self.out.write_str("&lt;"),
                _ => self.out.write_char(c),
            };
        }
    }

    /// Write raw text content, optionally escaping script end tags.
    fn write_raw_text(&mut self, text: &str, tag: &str) {
        if !(self.options.escape_script_end_tags && tag.eq_ignore_ascii_case("script")) {
            let _ = self.out.write_str(text);
            return;
        }

        // ASCII case-insensitive match on bytes keeps indices on char boundaries
        const PATTERN: &[u8] = b"</script";
        let bytes = text.as_bytes();
        let mut last_end = 0;
        let mut i = 0;
        while i + PATTERN.len() <= bytes.len() {
            if bytes[i..i + PATTERN.len()].eq_ignore_ascii_case(PATTERN) {
                let _ = self.out.write_str(&text[last_end..i]);
                let _ = self.out.write_str("<\\/script");
                i += PATTERN.len();
                last_end = i;
            } else {
                i += 1;
            }
        }
        let _ = self.out.write_str(&text[last_end..]);
    }

    fn write_attr(&mut self, name: &str, value: &str) {
        let _ = write!(self.out, " {}=\"", name);
        for c in value.chars() {
            let _ = match c {
                '&' => self.out.write_str("&amp;"),
                '"' => self.out.write_str("&quot;"),
                '<' => self.out.write_str("&lt;"),
                '>' => self.out.write_str("&gt;"),
                _ => self.out.write_char(c),
            };
        }
        let _ = self.out.write_char('"');
    }

    /// Walks the subtree with an explicit stack so nesting depth is bounded
    /// by the heap, not the thread stack.
    fn write_node(&mut self, node: NodeId) {
        let doc = self.doc;
        let mut stack = vec![Frame::Enter {
            node,
            mode: TextMode::Escaped,
            parent_tag: "",
        }];

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter {
                    node,
                    mode,
                    parent_tag,
                } => match &doc.get(node).kind {
                    NodeKind::Document => self.enter_document(node, &mut stack),
                    NodeKind::Element(elem) => self.enter_element(node, elem, &mut stack),
                    NodeKind::Text(text) => match mode {
                        TextMode::Escaped => self.write_text_escaped(text),
                        TextMode::Rcdata => self.write_rcdata_escaped(text),
                        TextMode::Raw => self.write_raw_text(text, parent_tag),
                    },
                    NodeKind::Comment(text) => {
                        let _ = write!(self.out, "<!--{}-->", text);
                    }
                },
                Frame::Doctype(name) => {
                    let _ = write!(self.out, "<!DOCTYPE {}>", name);
                }
                Frame::Exit(tag) => {
                    let _ = write!(self.out, "</{}>", tag);
                }
            }
        }
    }

    /// Queue the document's children, with the DOCTYPE at the position the
    /// parser saw it.
    fn enter_document(&mut self, node: NodeId, stack: &mut Vec<Frame<'a>>) {
        let doc = self.doc;
        let doctype = doc
            .doctype
            .as_ref()
            .filter(|_| self.options.doctype)
            .map(|name| Frame::Doctype(name.as_ref()));

        let mut frames: Vec<Frame<'a>> = doc
            .children(node)
            .map(|child| Frame::Enter {
                node: child,
                mode: TextMode::Escaped,
                parent_tag: "",
            })
            .collect();
        if let Some(doctype) = doctype {
            let position = doc.doctype_position.min(frames.len());
            frames.insert(position, doctype);
        }
        stack.extend(frames.into_iter().rev());
    }

    fn enter_element(&mut self, node: NodeId, elem: &'a ElementData, stack: &mut Vec<Frame<'a>>) {
        let doc = self.doc;
        let tag = elem.tag.as_ref();
        let ns = doc.get(node).ns;

        let _ = write!(self.out, "<{}", tag);
        if self.options.sort_attributes {
            let mut attrs: Vec<_> = elem.attrs.iter().collect();
            attrs.sort_by(|(a, _), (b, _)| a.cmp(b));
            for (name, value) in attrs {
                self.write_attr(name, value);
            }
        } else {
            for (name, value) in &elem.attrs {
                self.write_attr(name, value);
            }
        }

        if ns == Namespace::Html && is_void_element(tag) {
            let _ = self.out.write_char('>');
            return;
        }

        let mut children = doc.children(node).rev().peekable();
        if ns != Namespace::Html && children.peek().is_none() {
            let _ = self.out.write_str("/>");
            return;
        }

        let _ = self.out.write_char('>');

        let mode = if ns != Namespace::Html {
            TextMode::Escaped
        } else if is_raw_text_element(tag) {
            TextMode::Raw
        } else if is_rcdata_element(tag) {
            TextMode::Rcdata
        } else {
            TextMode::Escaped
        };

        stack.push(Frame::Exit(tag));
        stack.extend(children.map(|child| Frame::Enter {
            node: child,
            mode,
            parent_tag: tag,
        }));
    }
}

impl Document {
    /// Serialize the whole document with default options.
    pub fn to_html(&self) -> String {
        serialize_node(self, self.root, &SerializeOptions::default())
    }

    /// Serialize the whole document with custom options.
    pub fn to_html_with_options(&self, opts: &SerializeOptions) -> String {
        serialize_node(self, self.root, opts)
    }
}
