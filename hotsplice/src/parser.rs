//! HTML5 parsing into the arena DOM via html5ever's `TreeSink`.
//!
//! html5ever runs the full tree construction algorithm, including the error
//! recovery browsers do, so any input produces a tree. Bare fragments come
//! back wrapped in the synthetic `<html><head></head><body>…</body></html>`
//! structure, which the splicer strips again.

use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::{ElemName, ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{Attribute, LocalName, QualName, parse_document};
use indextree::{Arena, NodeId};
use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::io::Read;
use tendril::StrTendril;

use crate::arena_dom::{Attrs, Document, ElementData, Namespace, NodeData, NodeKind};
use crate::error::SpliceError;

/// Parse an HTML string into a [`Document`].
///
/// Never fails: malformed markup is repaired the way a browser would.
pub fn parse(html: &str) -> Document {
    trace!(len = html.len(), "parsing HTML string");
    parse_document(ArenaSink::new(), Default::default()).one(StrTendril::from(html))
}

/// Parse HTML from a byte stream, decoding it as UTF-8.
///
/// Invalid UTF-8 sequences are replaced, not rejected; the only failure is an
/// I/O error from `reader`.
pub fn parse_reader<R: Read>(mut reader: R) -> Result<Document, SpliceError> {
    let doc = parse_document(ArenaSink::new(), Default::default())
        .from_utf8()
        .read_from(&mut reader)?;
    trace!(nodes = doc.arena.count(), "parsed HTML stream");
    Ok(doc)
}

/// Owned element name wrapper
#[derive(Debug, Clone)]
struct OwnedElemName(QualName);

impl ElemName for OwnedElemName {
    fn ns(&self) -> &html5ever::Namespace {
        &self.0.ns
    }

    fn local_name(&self) -> &LocalName {
        &self.0.local
    }
}

/// TreeSink implementation for building arena-based DOM
struct ArenaSink {
    arena: RefCell<Arena<NodeData>>,

    /// Document node (parent of `<html>`)
    document: NodeId,

    doctype: RefCell<Option<StrTendril>>,

    /// Children of `document` already present when the DOCTYPE arrived
    doctype_position: Cell<usize>,
}

impl ArenaSink {
    fn new() -> Self {
        let mut arena = Arena::new();
        let document = arena.new_node(NodeData::new(NodeKind::Document));

        ArenaSink {
            arena: RefCell::new(arena),
            document,
            doctype: RefCell::new(None),
            doctype_position: Cell::new(0),
        }
    }

    fn text_node(arena: &mut Arena<NodeData>, text: StrTendril) -> NodeId {
        arena.new_node(NodeData::new(NodeKind::Text(text)))
    }
}

/// Attribute name as written in markup (`xlink:href` keeps its prefix).
fn attr_name(name: &QualName) -> String {
    match &name.prefix {
        Some(prefix) => format!("{}:{}", prefix, name.local),
        None => name.local.to_string(),
    }
}

impl TreeSink for ArenaSink {
    type Handle = NodeId;
    type Output = Document;
    type ElemName<'a>
        = OwnedElemName
    where
        Self: 'a;

    fn finish(self) -> Self::Output {
        Document {
            arena: self.arena.into_inner(),
            root: self.document,
            doctype: self.doctype.into_inner(),
            doctype_position: self.doctype_position.get(),
        }
    }

    fn parse_error(&self, _msg: Cow<'static, str>) {
        // html5ever recovers on its own
    }

    fn get_document(&self) -> Self::Handle {
        self.document
    }

    fn set_quirks_mode(&self, _mode: QuirksMode) {}

    fn same_node(&self, a: &Self::Handle, b: &Self::Handle) -> bool {
        a == b
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> OwnedElemName {
        let arena = self.arena.borrow();
        let node = arena[*target].get();

        let (local, ns) = match &node.kind {
            NodeKind::Element(elem) => (LocalName::from(elem.tag.as_ref()), node.ns),
            _ => (LocalName::from(""), Namespace::Html),
        };

        OwnedElemName(QualName {
            prefix: None,
            ns: html5ever::Namespace::from(ns.url()),
            local,
        })
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Attribute>,
        _flags: ElementFlags,
    ) -> Self::Handle {
        let attrs: Attrs = attrs
            .into_iter()
            .map(|attr| (attr_name(&attr.name), attr.value))
            .collect();

        self.arena.borrow_mut().new_node(NodeData {
            kind: NodeKind::Element(ElementData {
                tag: StrTendril::from(name.local.as_ref()),
                attrs,
            }),
            ns: Namespace::from_url(name.ns.as_ref()),
        })
    }

    fn create_comment(&self, text: StrTendril) -> Self::Handle {
        self.arena
            .borrow_mut()
            .new_node(NodeData::new(NodeKind::Comment(text)))
    }

    fn create_pi(&self, _target: StrTendril, data: StrTendril) -> Self::Handle {
        // HTML has no processing instructions; keep the data as a comment
        self.arena
            .borrow_mut()
            .new_node(NodeData::new(NodeKind::Comment(data)))
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        let mut arena = self.arena.borrow_mut();
        match child {
            NodeOrText::AppendNode(node) => {
                parent.append(node, &mut arena);
            }
            NodeOrText::AppendText(text) => {
                // Adjacent text merges into one node, as in a browser DOM
                let last_child = parent.children(&arena).next_back();
                if let Some(last_child) = last_child
                    && let NodeKind::Text(existing) = &mut arena[last_child].get_mut().kind
                {
                    existing.push_tendril(&text);
                    return;
                }

                let text_node = Self::text_node(&mut arena, text);
                parent.append(text_node, &mut arena);
            }
        }
    }

    fn append_before_sibling(&self, sibling: &Self::Handle, new_node: NodeOrText<Self::Handle>) {
        let mut arena = self.arena.borrow_mut();
        match new_node {
            NodeOrText::AppendNode(node) => {
                sibling.insert_before(node, &mut arena);
            }
            NodeOrText::AppendText(text) => {
                let previous = arena[*sibling].previous_sibling();
                if let Some(previous) = previous
                    && let NodeKind::Text(existing) = &mut arena[previous].get_mut().kind
                {
                    existing.push_tendril(&text);
                    return;
                }

                let text_node = Self::text_node(&mut arena, text);
                sibling.insert_before(text_node, &mut arena);
            }
        }
    }

    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        let has_parent = self.arena.borrow()[*element].parent().is_some();
        if has_parent {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(
        &self,
        name: StrTendril,
        _public_id: StrTendril,
        _system_id: StrTendril,
    ) {
        let position = self.document.children(&self.arena.borrow()).count();
        self.doctype_position.set(position);
        *self.doctype.borrow_mut() = Some(name);
    }

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        // Template contents live directly under the <template> element
        *target
    }

    fn add_attrs_if_missing(&self, target: &Self::Handle, attrs: Vec<Attribute>) {
        let mut arena = self.arena.borrow_mut();
        if let NodeKind::Element(elem) = &mut arena[*target].get_mut().kind {
            for attr in attrs {
                let name = attr_name(&attr.name);
                if elem.attr(&name).is_none() {
                    elem.attrs.push((name, attr.value));
                }
            }
        }
    }

    fn remove_from_parent(&self, target: &Self::Handle) {
        target.detach(&mut self.arena.borrow_mut());
    }

    fn reparent_children(&self, node: &Self::Handle, new_parent: &Self::Handle) {
        let mut arena = self.arena.borrow_mut();
        let children: Vec<NodeId> = node.children(&arena).collect();
        for child in children {
            child.detach(&mut arena);
            new_parent.append(child, &mut arena);
        }
    }
}
