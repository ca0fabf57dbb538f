//! Splicing a fragment into a document by element id.
//!
//! The pipeline is parse → locate → recover → splice → serialize:
//!
//! 1. parse the document,
//! 2. find the first element (pre-order) whose `id` matches,
//! 3. parse the fragment and recover its real root from under the wrappers
//!    the HTML parser synthesizes (`#document > html > body`),
//! 4. replace the target's children with that root,
//! 5. serialize the whole document, starting from the root of the target's tree.
//!
//! Nothing is shared between calls; each call owns both of its trees.

use indextree::NodeId;
use std::io::Read;

use crate::arena_dom::{Document, NodeKind};
use crate::error::SpliceError;
use crate::parser::{parse, parse_reader};
use crate::serialize::{SerializeOptions, serialize_document};

/// Options for [`Splicer`].
#[derive(Clone, Debug)]
pub struct SpliceOptions {
    /// How the spliced document is written out.
    pub serialize: SerializeOptions,
    /// Whether fragment-root recovery passes over trailing whitespace-only
    /// text and comments, so `"<p>x</p>\n<!-- end -->"` recovers the `<p>`
    /// (default: true). A fragment made only of comments is then empty.
    pub skip_trailing_trivia: bool,
}

impl Default for SpliceOptions {
    fn default() -> Self {
        Self {
            serialize: SerializeOptions::default(),
            skip_trailing_trivia: true,
        }
    }
}

impl SpliceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Leave the DOCTYPE out of the output.
    pub fn no_doctype(mut self) -> Self {
        self.serialize.doctype = false;
        self
    }

    /// Emit attributes sorted by name.
    pub fn sort_attributes(mut self) -> Self {
        self.serialize.sort_attributes = true;
        self
    }

    /// Disable escaping `</script` in script content (not recommended).
    pub fn no_escape_script_end_tags(mut self) -> Self {
        self.serialize.escape_script_end_tags = false;
        self
    }

    /// Follow the literal last child during fragment-root recovery, even
    /// when it is whitespace-only text or a comment.
    pub fn keep_trailing_trivia(mut self) -> Self {
        self.skip_trailing_trivia = false;
        self
    }
}

/// Result of [`Splicer::try_splice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpliceOutcome {
    /// The target was found; this is the whole updated document.
    Spliced(String),
    /// No element carries the requested id. Nothing was parsed past the document.
    TargetNotFound,
}

impl SpliceOutcome {
    /// The spliced markup, or an empty string when the target was missing.
    pub fn into_html(self) -> String {
        match self {
            SpliceOutcome::Spliced(html) => html,
            SpliceOutcome::TargetNotFound => String::new(),
        }
    }

    pub fn is_spliced(&self) -> bool {
        matches!(self, SpliceOutcome::Spliced(_))
    }
}

/// Splice with default options.
///
/// Returns an empty string when no element has `target_id`.
///
/// # Example
///
/// ```rust
/// let page = r#"<html><body><div id="content">old</div></body></html>"#;
/// let out = hotsplice::splice(page, "content", "<p>new</p>").unwrap();
/// assert!(out.contains(r#"<div id="content"><p>new</p></div>"#));
/// assert!(!out.contains("old"));
///
/// assert_eq!(hotsplice::splice(page, "absent", "<p>new</p>").unwrap(), "");
/// ```
pub fn splice(document: &str, target_id: &str, fragment: &str) -> Result<String, SpliceError> {
    Splicer::default().splice(document, target_id, fragment)
}

/// A reusable, immutable splicing context.
///
/// Holds configuration only, so one `Splicer` can serve any number of
/// concurrent calls.
#[derive(Clone, Debug, Default)]
pub struct Splicer {
    options: SpliceOptions,
}

impl Splicer {
    pub fn new(options: SpliceOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SpliceOptions {
        &self.options
    }

    /// Splice `fragment` into `document` as the only child of the element
    /// with id `target_id`, returning the whole updated document.
    ///
    /// Returns an empty string when the target is missing; use
    /// [`Splicer::try_splice`] to tell that apart from empty output.
    pub fn splice(
        &self,
        document: &str,
        target_id: &str,
        fragment: &str,
    ) -> Result<String, SpliceError> {
        Ok(self.try_splice(document, target_id, fragment)?.into_html())
    }

    /// Like [`Splicer::splice`], but reports a missing target explicitly.
    pub fn try_splice(
        &self,
        document: &str,
        target_id: &str,
        fragment: &str,
    ) -> Result<SpliceOutcome, SpliceError> {
        self.splice_tree(parse(document), target_id, || Ok(parse(fragment)))
    }

    /// Splice from byte streams (decoded as UTF-8).
    ///
    /// The fragment stream is only read when the target exists.
    pub fn splice_reader<D: Read, F: Read>(
        &self,
        document: D,
        target_id: &str,
        fragment: F,
    ) -> Result<SpliceOutcome, SpliceError> {
        let doc = parse_reader(document)?;
        self.splice_tree(doc, target_id, || parse_reader(fragment))
    }

    /// Splice into an already-parsed document.
    ///
    /// `fragment` is only parsed when the target exists.
    pub fn splice_tree(
        &self,
        mut doc: Document,
        target_id: &str,
        fragment: impl FnOnce() -> Result<Document, SpliceError>,
    ) -> Result<SpliceOutcome, SpliceError> {
        let Some(target) = doc.find_by_id(doc.root, target_id) else {
            debug!(target_id, "splice target not found");
            return Ok(SpliceOutcome::TargetNotFound);
        };
        debug!(target_id, tag = ?doc.tag_name(target), "found splice target");

        let mut fragment = fragment()?;
        let fragment_root = recover_fragment_root(&fragment, self.options.skip_trailing_trivia)
            .ok_or(SpliceError::EmptyFragment)?;
        debug!(tag = ?fragment.tag_name(fragment_root), "recovered fragment root");

        fragment.detach(fragment_root);
        let adopted = doc.adopt(fragment, fragment_root);

        doc.replace_children(target, [])?;
        doc.append_child(target, adopted)?;

        Ok(SpliceOutcome::Spliced(serialize_document(
            &doc,
            target,
            &self.options.serialize,
        )))
    }
}

/// Find the node a parsed fragment was meant to be.
///
/// Starting at the fragment's root, follow last-child links down to a leaf.
/// On that path, the parser's synthetic wrappers come first (the document
/// node, then `<html>`, then `<head>` or `<body>`); the first node below them
/// is the fragment's real root. For `<p>new</p>` that is the leaf's parent;
/// for `<ul><li>a</li><li>b</li></ul>` it is the `<ul>`, not the last `<li>`.
///
/// Only the last chain is followed: of several top-level siblings, only the
/// last one is recovered. Returns `None` when nothing lies below the wrappers.
pub fn recover_fragment_root(fragment: &Document, skip_trivia: bool) -> Option<NodeId> {
    let leaf = fragment.last_leaf(fragment.root, skip_trivia);
    let mut path: Vec<NodeId> = leaf.ancestors(&fragment.arena).collect();
    path.reverse();

    let root = path
        .into_iter()
        .enumerate()
        .find(|&(depth, node)| !is_synthetic_wrapper(fragment, node, depth))
        .map(|(_, node)| node)?;

    if let Some(parent) = fragment.parent(root) {
        let siblings = fragment
            .children(parent)
            .filter(|&child| !(skip_trivia && fragment.is_trivia(child)))
            .count();
        if siblings > 1 {
            warn!(
                siblings,
                "fragment has several top-level nodes; only the last one is spliced"
            );
        }
    }

    Some(root)
}

/// Whether `node`, at `depth` along the last-child path, is one of the
/// wrappers the HTML parser adds around bare content.
fn is_synthetic_wrapper(doc: &Document, node: NodeId, depth: usize) -> bool {
    match (&doc.get(node).kind, depth) {
        (NodeKind::Document, 0) => true,
        (NodeKind::Element(elem), 1) => elem.tag.as_ref() == "html",
        (NodeKind::Element(elem), 2) => matches!(elem.tag.as_ref(), "head" | "body"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body><div id="content">old</div></body></html>"#;

    fn recovered_tag(fragment: &str) -> Option<String> {
        let doc = parse(fragment);
        let root = recover_fragment_root(&doc, true)?;
        Some(match &doc.get(root).kind {
            NodeKind::Element(elem) => elem.tag.to_string(),
            NodeKind::Text(text) => format!("#text:{}", text),
            NodeKind::Comment(_) => "#comment".to_string(),
            NodeKind::Document => "#document".to_string(),
        })
    }

    #[test]
    fn test_recover_single_element() {
        assert_eq!(recovered_tag("<p>new</p>").as_deref(), Some("p"));
    }

    #[test]
    fn test_recover_takes_outermost_element() {
        assert_eq!(
            recovered_tag("<ul><li>a</li><li>b</li></ul>").as_deref(),
            Some("ul")
        );
        assert_eq!(
            recovered_tag("<div><section><p>deep</p></section></div>").as_deref(),
            Some("div")
        );
    }

    #[test]
    fn test_recover_childless_element() {
        assert_eq!(recovered_tag(r#"<img src="a.png">"#).as_deref(), Some("img"));
    }

    #[test]
    fn test_recover_ignores_trailing_whitespace() {
        assert_eq!(recovered_tag("<p>x</p>\n  \n").as_deref(), Some("p"));

        let doc = parse("<p>x</p>\n");
        let root = recover_fragment_root(&doc, false).unwrap();
        assert!(doc.is_whitespace_text(root));
    }

    #[test]
    fn test_recover_ignores_trailing_comments() {
        assert_eq!(
            recovered_tag("<article><p>post</p></article>\n<!-- /view -->").as_deref(),
            Some("article")
        );
        assert_eq!(recovered_tag("<!-- only a comment -->"), None);

        let doc = parse("<p>x</p><!-- end -->");
        let root = recover_fragment_root(&doc, false).unwrap();
        assert!(matches!(doc.get(root).kind, NodeKind::Comment(_)));
    }

    #[test]
    fn test_recover_bare_text() {
        assert_eq!(recovered_tag("just text").as_deref(), Some("#text:just text"));
    }

    #[test]
    fn test_recover_full_document_fragment() {
        assert_eq!(
            recovered_tag("<html><body><article>x</article></body></html>").as_deref(),
            Some("article")
        );
    }

    #[test]
    fn test_recover_multiple_siblings_keeps_last() {
        assert_eq!(recovered_tag("<p>a</p><span>b</span>").as_deref(), Some("span"));
    }

    #[test]
    fn test_recover_empty_fragment() {
        assert_eq!(recovered_tag(""), None);
        assert_eq!(recovered_tag("   "), None);
    }

    #[test]
    fn test_splice_basic() {
        let out = splice(PAGE, "content", "<p>new</p>").unwrap();
        assert_eq!(
            out,
            r#"<html><head></head><body><div id="content"><p>new</p></div></body></html>"#
        );
    }

    #[test]
    fn test_missing_target_is_empty() {
        assert_eq!(splice(PAGE, "absent", "<p>new</p>").unwrap(), "");
        assert_eq!(
            Splicer::default()
                .try_splice(PAGE, "absent", "<p>new</p>")
                .unwrap(),
            SpliceOutcome::TargetNotFound
        );
    }

    #[test]
    fn test_missing_target_skips_fragment() {
        let outcome = Splicer::default()
            .splice_tree(parse(PAGE), "absent", || {
                panic!("fragment must not be parsed")
            })
            .unwrap();
        assert!(!outcome.is_spliced());
    }

    #[test]
    fn test_empty_fragment_is_an_error() {
        assert!(matches!(
            splice(PAGE, "content", ""),
            Err(SpliceError::EmptyFragment)
        ));
    }

    #[test]
    fn test_options_flow_through() {
        let page = r#"<!DOCTYPE html><html><body><div id="content" class="c">old</div></body></html>"#;
        let splicer = Splicer::new(SpliceOptions::new().no_doctype().sort_attributes());
        let out = splicer.splice(page, "content", "<p>new</p>").unwrap();
        assert!(out.starts_with("<html>"));
        assert!(out.contains(r#"<div class="c" id="content"><p>new</p></div>"#));

        let out = Splicer::default().splice(page, "content", "<p>new</p>").unwrap();
        assert!(out.starts_with("<!DOCTYPE html><html>"));
    }

    #[test]
    fn test_keep_trailing_trivia_splices_text() {
        let splicer = Splicer::new(SpliceOptions::new().keep_trailing_trivia());
        let out = splicer.splice(PAGE, "content", "<p>new</p>\n").unwrap();
        assert!(out.contains("<div id=\"content\">\n</div>"));
    }

    #[test]
    fn test_trailing_comment_does_not_replace_content() {
        let out = splice(PAGE, "content", "<section>body</section><!-- rendered by view -->").unwrap();
        assert_eq!(
            out,
            r#"<html><head></head><body><div id="content"><section>body</section></div></body></html>"#
        );

        let splicer = Splicer::new(SpliceOptions::new().keep_trailing_trivia());
        let out = splicer
            .splice(PAGE, "content", "<section>body</section><!-- rendered by view -->")
            .unwrap();
        assert!(out.contains(r#"<div id="content"><!-- rendered by view --></div>"#));
    }

    #[test]
    fn test_splice_reader() {
        let outcome = Splicer::default()
            .splice_reader(PAGE.as_bytes(), "content", "<em>hi</em>".as_bytes())
            .unwrap();
        assert!(outcome.into_html().contains(r#"<div id="content"><em>hi</em></div>"#));
    }
}
