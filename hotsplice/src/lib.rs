//! Splice HTML fragments into full documents, built on html5ever and an
//! indextree arena DOM.
//!
//! hotsplice provides:
//! - **Arena DOM**: a cycle-free tree where parent links are indices, with
//!   id lookup, detach, and child replacement
//! - **Parsing**: browser-compatible HTML5 parsing via html5ever with full error recovery
//! - **Serialization**: HTML5-correct serialization with proper escaping
//! - **Splicing**: replace an element's children with a parsed fragment and
//!   get the whole updated page back
//! - **Layouts**: serve a view as a bare partial or spliced into a shell page
//!
//! # Example
//!
//! ```rust
//! use hotsplice::{Layout, RenderMode, SpliceOutcome, Splicer};
//!
//! let page = r#"<html><body><nav>menu</nav><div id="content">old</div></body></html>"#;
//!
//! let out = hotsplice::splice(page, "content", "<ul><li>a</li><li>b</li></ul>").unwrap();
//! assert_eq!(
//!     out,
//!     r#"<html><head></head><body><nav>menu</nav><div id="content"><ul><li>a</li><li>b</li></ul></div></body></html>"#
//! );
//!
//! // A missing id is not an error; `try_splice` says so explicitly.
//! let outcome = Splicer::default().try_splice(page, "typo", "<p>x</p>").unwrap();
//! assert_eq!(outcome, SpliceOutcome::TargetNotFound);
//!
//! let layout = Layout::new(page, "content");
//! assert_eq!(layout.render("<p>x</p>", RenderMode::Partial).unwrap(), "<p>x</p>");
//! ```

#[macro_use]
mod tracing_macros;

pub mod arena_dom;
mod error;
mod layout;
mod parser;
pub mod serialize;
mod splice;

pub use arena_dom::{Attrs, Document, ElementData, Namespace, NodeData, NodeKind};
pub use error::{SpliceError, TreeError};
pub use layout::{Layout, RenderMode};
pub use parser::{parse, parse_reader};
pub use serialize::{SerializeOptions, serialize_document, serialize_node};
pub use splice::{SpliceOptions, SpliceOutcome, Splicer, recover_fragment_root, splice};

pub use indextree::NodeId;
pub use tendril::StrTendril;
