//! Arena-based DOM used by the splicer.
//!
//! Every node of a [`Document`] lives in one `indextree` arena owned by that
//! document. Parent, child and sibling links are arena indices, so a parent
//! link never owns anything and detaching/reattaching cannot build a cycle of
//! owners. Two documents never share an arena: moving a subtree from one tree
//! into another goes through [`Document::adopt`], which consumes the source.

use indextree::{Arena, NodeId};
use smallvec::SmallVec;
use tendril::StrTendril;

use crate::error::TreeError;

/// Attribute list, in source order. Keys may repeat; lookups take the first.
pub type Attrs = SmallVec<[(String, StrTendril); 4]>;

/// A parsed HTML tree.
#[derive(Debug, Clone)]
pub struct Document {
    /// All nodes of this tree (plus any detached or removed ones).
    pub arena: Arena<NodeData>,

    /// The `Document` node, the only attached node without a parent.
    pub root: NodeId,

    /// DOCTYPE name if present (usually "html")
    pub doctype: Option<StrTendril>,

    /// How many children of `root` precede the DOCTYPE (comments may).
    pub doctype_position: usize,
}

/// What goes in each arena slot
#[derive(Debug, Clone)]
pub struct NodeData {
    pub kind: NodeKind,
    pub ns: Namespace,
}

impl NodeData {
    pub(crate) fn new(kind: NodeKind) -> Self {
        NodeData {
            kind,
            ns: Namespace::Html,
        }
    }
}

/// Node types
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Document root (invisible, parent of `<html>`)
    Document,
    /// Element with tag and attributes
    Element(ElementData),
    /// Text content (StrTendril is refcounted - cheap to clone)
    Text(StrTendril),
    /// HTML comment
    Comment(StrTendril),
}

/// Element data (tag + attributes)
#[derive(Debug, Clone)]
pub struct ElementData {
    /// Tag name as produced by the parser
    pub tag: StrTendril,
    pub attrs: Attrs,
}

impl ElementData {
    /// First value for `name`, if any.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_ref())
    }
}

/// XML namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Html,
    Svg,
    MathMl,
}

impl Namespace {
    pub fn from_url(url: &str) -> Self {
        match url {
            "http://www.w3.org/2000/svg" => Namespace::Svg,
            "http://www.w3.org/1998/Math/MathML" => Namespace::MathMl,
            _ => Namespace::Html,
        }
    }

    pub fn url(&self) -> &'static str {
        match self {
            Namespace::Html => "http://www.w3.org/1999/xhtml",
            Namespace::Svg => "http://www.w3.org/2000/svg",
            Namespace::MathMl => "http://www.w3.org/1998/Math/MathML",
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty tree holding just the `Document` node.
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(NodeData::new(NodeKind::Document));
        Document {
            arena,
            root,
            doctype: None,
            doctype_position: 0,
        }
    }

    /// Get immutable reference to node data
    pub fn get(&self, id: NodeId) -> &NodeData {
        self.arena[id].get()
    }

    /// Get mutable reference to node data
    pub fn get_mut(&mut self, id: NodeId) -> &mut NodeData {
        self.arena[id].get_mut()
    }

    /// Iterate children of a node
    pub fn children(&self, id: NodeId) -> impl DoubleEndedIterator<Item = NodeId> + '_ {
        id.children(&self.arena)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].parent()
    }

    /// Tag name, for element nodes.
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match &self.get(id).kind {
            NodeKind::Element(elem) => Some(elem.tag.as_ref()),
            _ => None,
        }
    }

    /// First value of attribute `name` on `id`, for element nodes.
    pub fn get_attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.get(id).kind {
            NodeKind::Element(elem) => elem.attr(name),
            _ => None,
        }
    }

    /// The `<html>` element, if the parser produced one.
    pub fn html(&self) -> Option<NodeId> {
        self.child_element(self.root, "html")
    }

    /// Get the `<body>` element if present
    pub fn body(&self) -> Option<NodeId> {
        self.child_element(self.html()?, "body")
    }

    /// Get the `<head>` element if present
    pub fn head(&self) -> Option<NodeId> {
        self.child_element(self.html()?, "head")
    }

    fn child_element(&self, parent: NodeId, tag: &str) -> Option<NodeId> {
        self.children(parent)
            .find(|&id| self.tag_name(id) == Some(tag))
    }

    /// Depth-first, pre-order search below (and including) `from` for the
    /// first element whose `id` attribute equals `id` exactly.
    pub fn find_by_id(&self, from: NodeId, id: &str) -> Option<NodeId> {
        from.descendants(&self.arena)
            .find(|&node| self.get_attr(node, "id") == Some(id))
    }

    /// Walk parent links up from `id` to the node that has no parent.
    pub fn root_of(&self, id: NodeId) -> NodeId {
        id.ancestors(&self.arena).last().unwrap_or(id)
    }

    /// Follow last-child links from `from` until reaching a node with no
    /// children. With `skip_trivia`, trailing whitespace-only text and
    /// comment nodes are passed over when picking the last child.
    pub fn last_leaf(&self, from: NodeId, skip_trivia: bool) -> NodeId {
        let mut current = from;
        while let Some(next) = self.last_child(current, skip_trivia) {
            current = next;
        }
        current
    }

    fn last_child(&self, id: NodeId, skip_trivia: bool) -> Option<NodeId> {
        self.children(id)
            .rev()
            .find(|&child| !(skip_trivia && self.is_trivia(child)))
    }

    /// Whitespace-only text or a comment: nodes that carry no content.
    pub fn is_trivia(&self, id: NodeId) -> bool {
        matches!(self.get(id).kind, NodeKind::Comment(_)) || self.is_whitespace_text(id)
    }

    /// Whether `id` is a text node made only of ASCII whitespace.
    pub fn is_whitespace_text(&self, id: NodeId) -> bool {
        match &self.get(id).kind {
            NodeKind::Text(text) => text.chars().all(|c| c.is_ascii_whitespace()),
            _ => false,
        }
    }

    /// Remove `id` from its parent's children, keeping its own subtree.
    /// Detaching an already-detached node does nothing.
    pub fn detach(&mut self, id: NodeId) {
        id.detach(&mut self.arena);
    }

    /// Drop every current child of `id` (and their subtrees), then attach
    /// `new_children` in order. Each new child must be detached, live, not
    /// `id` or one of its ancestors, and listed once.
    ///
    /// All new children are checked before anything changes: on error the
    /// tree is left as it was.
    pub fn replace_children(
        &mut self,
        id: NodeId,
        new_children: impl IntoIterator<Item = NodeId>,
    ) -> Result<(), TreeError> {
        let new_children: Vec<NodeId> = new_children.into_iter().collect();
        if self.arena[id].is_removed() {
            return Err(TreeError::Removed);
        }
        for (index, &child) in new_children.iter().enumerate() {
            if self.arena[child].is_removed() {
                return Err(TreeError::Removed);
            }
            if self.arena[child].parent().is_some() {
                return Err(TreeError::AlreadyAttached);
            }
            if id.ancestors(&self.arena).any(|ancestor| ancestor == child) {
                return Err(TreeError::Cycle);
            }
            // Appending the same node twice would move it, not copy it
            if new_children[..index].contains(&child) {
                return Err(TreeError::AlreadyAttached);
            }
        }

        let old: Vec<NodeId> = id.children(&self.arena).collect();
        trace!(discarded = old.len(), "replace_children: dropping old children");
        for child in old {
            child.remove_subtree(&mut self.arena);
        }

        for child in new_children {
            id.checked_append(child, &mut self.arena)?;
        }
        Ok(())
    }

    /// Attach a detached node as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        if self.arena[child].is_removed() || self.arena[parent].is_removed() {
            return Err(TreeError::Removed);
        }
        if self.arena[child].parent().is_some() {
            return Err(TreeError::AlreadyAttached);
        }
        parent.checked_append(child, &mut self.arena)?;
        Ok(())
    }

    /// Move the subtree rooted at `node` out of `other` and into this tree,
    /// returning the id of its copy here. The copy starts detached; `other`
    /// is consumed, so the moved nodes can't be reached from two trees.
    pub fn adopt(&mut self, mut other: Document, node: NodeId) -> NodeId {
        let new_root = self.arena.new_node(other.take(node));
        let mut stack = vec![(node, new_root)];

        while let Some((src, dst)) = stack.pop() {
            let children: Vec<NodeId> = src.children(&other.arena).collect();
            for child in children {
                let moved = self.arena.new_node(other.take(child));
                dst.append(moved, &mut self.arena);
                stack.push((child, moved));
            }
        }

        new_root
    }

    fn take(&mut self, id: NodeId) -> NodeData {
        std::mem::replace(self.get_mut(id), NodeData::new(NodeKind::Document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn element(doc: &Document, id: NodeId) -> &ElementData {
        match &doc.get(id).kind {
            NodeKind::Element(elem) => elem,
            other => panic!("expected element, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_simple_html() {
        let doc = parse("<html><body><p>Hello</p></body></html>");

        assert!(matches!(doc.get(doc.root).kind, NodeKind::Document));
        assert_eq!(doc.parent(doc.root), None);

        let body = doc.body().expect("should have body");
        let p = doc.children(body).next().expect("body should have child");
        assert_eq!(element(&doc, p).tag.as_ref(), "p");

        let text = doc.children(p).next().expect("p should have text");
        if let NodeKind::Text(t) = &doc.get(text).kind {
            assert_eq!(t.as_ref(), "Hello");
        } else {
            panic!("expected text node");
        }
    }

    #[test]
    fn test_attributes_keep_source_order() {
        let doc = parse(r#"<div data-z="1" class="container" id="main">Content</div>"#);
        let div = doc.find_by_id(doc.root, "main").expect("div");

        let keys: Vec<&str> = element(&doc, div)
            .attrs
            .iter()
            .map(|(k, _)| k.as_str())
            .collect();
        assert_eq!(keys, ["data-z", "class", "id"]);
        assert_eq!(doc.get_attr(div, "class"), Some("container"));
        assert_eq!(doc.get_attr(div, "missing"), None);
    }

    #[test]
    fn test_attr_first_match_wins() {
        let mut elem = ElementData {
            tag: StrTendril::from("div"),
            attrs: Attrs::new(),
        };
        elem.attrs.push(("id".to_string(), StrTendril::from("first")));
        elem.attrs.push(("id".to_string(), StrTendril::from("second")));
        assert_eq!(elem.attr("id"), Some("first"));
    }

    #[test]
    fn test_find_by_id_is_preorder_first_match() {
        let doc = parse(
            r#"<div><section><span id="x" class="deep"></span></section></div><p id="x" class="shallow"></p>"#,
        );
        let found = doc.find_by_id(doc.root, "x").expect("should find x");
        assert_eq!(doc.get_attr(found, "class"), Some("deep"));
    }

    #[test]
    fn test_find_by_id_is_case_sensitive() {
        let doc = parse(r#"<div id="Content"></div>"#);
        assert!(doc.find_by_id(doc.root, "content").is_none());
        assert!(doc.find_by_id(doc.root, "Content").is_some());
    }

    #[test]
    fn test_find_by_id_ignores_text() {
        let doc = parse("<p>id</p>");
        assert!(doc.find_by_id(doc.root, "id").is_none());
    }

    #[test]
    fn test_root_of_walks_to_document() {
        let doc = parse(r#"<div><ul><li id="leaf">x</li></ul></div>"#);
        let leaf = doc.find_by_id(doc.root, "leaf").unwrap();
        assert_eq!(doc.root_of(leaf), doc.root);
        assert_eq!(doc.root_of(doc.root), doc.root);
    }

    #[test]
    fn test_last_leaf() {
        let doc = parse("<ul><li>a</li><li>b</li></ul>\n");

        let leaf = doc.last_leaf(doc.root, true);
        assert!(matches!(&doc.get(leaf).kind, NodeKind::Text(t) if t.as_ref() == "b"));

        let leaf = doc.last_leaf(doc.root, false);
        assert!(doc.is_whitespace_text(leaf));
    }

    #[test]
    fn test_last_leaf_skips_trailing_comments() {
        let doc = parse("<p>kept</p><!-- a -->\n<!-- b -->");
        let body = doc.body().unwrap();

        let leaf = doc.last_leaf(body, true);
        assert!(matches!(&doc.get(leaf).kind, NodeKind::Text(t) if t.as_ref() == "kept"));

        let leaf = doc.last_leaf(body, false);
        assert!(matches!(&doc.get(leaf).kind, NodeKind::Comment(t) if t.as_ref() == " b "));
        assert!(doc.is_trivia(leaf));
    }

    #[test]
    fn test_detach_twice_is_noop() {
        let mut doc = parse(r#"<div id="a"><p id="b"></p></div>"#);
        let a = doc.find_by_id(doc.root, "a").unwrap();
        let b = doc.find_by_id(doc.root, "b").unwrap();

        doc.detach(b);
        doc.detach(b);
        assert_eq!(doc.parent(b), None);
        assert_eq!(doc.children(a).count(), 0);
        assert!(doc.find_by_id(doc.root, "b").is_none());
    }

    #[test]
    fn test_replace_children_drops_old_subtrees() {
        let mut doc = parse(r#"<div id="a"><p id="old"><b>x</b></p>tail</div>"#);
        let a = doc.find_by_id(doc.root, "a").unwrap();
        let old = doc.find_by_id(doc.root, "old").unwrap();

        doc.replace_children(a, []).unwrap();
        assert_eq!(doc.children(a).count(), 0);
        assert!(doc.arena[old].is_removed());
        assert!(doc.find_by_id(doc.root, "old").is_none());
    }

    #[test]
    fn test_replace_children_sets_parents() {
        let mut doc = parse(r#"<div id="a">old</div><p id="p1"></p><p id="p2"></p>"#);
        let a = doc.find_by_id(doc.root, "a").unwrap();
        let p1 = doc.find_by_id(doc.root, "p1").unwrap();
        let p2 = doc.find_by_id(doc.root, "p2").unwrap();
        doc.detach(p1);
        doc.detach(p2);

        doc.replace_children(a, [p1, p2]).unwrap();
        let children: Vec<_> = doc.children(a).collect();
        assert_eq!(children, [p1, p2]);
        assert_eq!(doc.parent(p1), Some(a));
        assert_eq!(doc.parent(p2), Some(a));
    }

    #[test]
    fn test_replace_children_failure_leaves_tree_unchanged() {
        let mut doc = parse(r#"<div id="a"><i id="old">x</i></div><p id="p1"></p><div id="b"></div>"#);
        let a = doc.find_by_id(doc.root, "a").unwrap();
        let old = doc.find_by_id(doc.root, "old").unwrap();
        let p1 = doc.find_by_id(doc.root, "p1").unwrap();
        let b = doc.find_by_id(doc.root, "b").unwrap();
        doc.detach(p1);

        assert_eq!(doc.replace_children(a, [p1, b]), Err(TreeError::AlreadyAttached));
        assert_eq!(doc.children(a).collect::<Vec<_>>(), [old]);
        assert!(!doc.arena[old].is_removed());
        assert_eq!(doc.parent(p1), None);
        assert_eq!(doc.parent(b), doc.body());

        assert_eq!(doc.replace_children(a, [p1, p1]), Err(TreeError::AlreadyAttached));
        assert_eq!(doc.children(a).collect::<Vec<_>>(), [old]);
    }

    #[test]
    fn test_replace_children_rejects_ancestor() {
        let mut doc = parse(r#"<div id="outer"><div id="inner">keep</div></div>"#);
        let outer = doc.find_by_id(doc.root, "outer").unwrap();
        let inner = doc.find_by_id(doc.root, "inner").unwrap();
        doc.detach(outer);

        assert_eq!(doc.replace_children(inner, [outer]), Err(TreeError::Cycle));
        assert_eq!(doc.children(inner).count(), 1);
    }

    #[test]
    fn test_append_attached_node_is_rejected() {
        let mut doc = parse(r#"<div id="a"></div><div id="b"></div>"#);
        let a = doc.find_by_id(doc.root, "a").unwrap();
        let b = doc.find_by_id(doc.root, "b").unwrap();

        assert_eq!(doc.append_child(a, b), Err(TreeError::AlreadyAttached));
    }

    #[test]
    fn test_append_ancestor_is_rejected() {
        let mut doc = parse(r#"<div id="outer"><div id="inner"></div></div>"#);
        let outer = doc.find_by_id(doc.root, "outer").unwrap();
        let inner = doc.find_by_id(doc.root, "inner").unwrap();
        doc.detach(outer);

        assert_eq!(doc.append_child(inner, outer), Err(TreeError::Cycle));
        assert_eq!(doc.append_child(outer, outer), Err(TreeError::Cycle));
    }

    #[test]
    fn test_append_removed_node_is_rejected() {
        let mut doc = parse(r#"<div id="a"><p id="p"></p></div><div id="b"></div>"#);
        let a = doc.find_by_id(doc.root, "a").unwrap();
        let b = doc.find_by_id(doc.root, "b").unwrap();
        let p = doc.find_by_id(doc.root, "p").unwrap();

        doc.replace_children(a, []).unwrap();
        assert_eq!(doc.append_child(b, p), Err(TreeError::Removed));
    }

    #[test]
    fn test_adopt_moves_subtree_in_order() {
        let mut doc = parse(r#"<div id="target"></div>"#);
        let other = parse(r#"<ul id="list"><li>a</li><li>b</li><li>c</li></ul>"#);
        let list = other.find_by_id(other.root, "list").unwrap();

        let adopted = doc.adopt(other, list);
        assert_eq!(doc.parent(adopted), None);
        assert_eq!(doc.tag_name(adopted), Some("ul"));

        let texts: Vec<String> = doc
            .children(adopted)
            .map(|li| {
                let text = doc.children(li).next().unwrap();
                match &doc.get(text).kind {
                    NodeKind::Text(t) => t.to_string(),
                    other => panic!("expected text, got {other:?}"),
                }
            })
            .collect();
        assert_eq!(texts, ["a", "b", "c"]);

        let target = doc.find_by_id(doc.root, "target").unwrap();
        doc.append_child(target, adopted).unwrap();
        assert_eq!(doc.find_by_id(doc.root, "list"), Some(adopted));
    }
}
