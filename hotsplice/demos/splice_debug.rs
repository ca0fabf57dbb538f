//! Splice stdin into a document and show what happened.
//!
//! ```text
//! cargo run --example splice_debug -- page.html content < fragment.html
//! ```

use hotsplice::{Document, NodeId, NodeKind, SpliceOutcome, Splicer};
use std::io::{self, Read};

fn print_node(doc: &Document, node_id: NodeId, depth: usize) {
    let indent = "  ".repeat(depth);
    match &doc.get(node_id).kind {
        NodeKind::Element(el) => {
            let attrs: String = el
                .attrs
                .iter()
                .map(|(k, v)| format!(" {k}={v:?}"))
                .collect();
            eprintln!("{}<{}{}>", indent, el.tag, attrs);
            for child_id in doc.children(node_id) {
                print_node(doc, child_id, depth + 1);
            }
        }
        NodeKind::Text(t) => {
            if !t.trim().is_empty() {
                eprintln!("{}TEXT: {:?}", indent, t.as_ref());
            }
        }
        NodeKind::Comment(c) => {
            eprintln!("{}COMMENT: {:?}", indent, c.as_ref());
        }
        NodeKind::Document => {
            eprintln!("{}#document", indent);
            for child_id in doc.children(node_id) {
                print_node(doc, child_id, depth + 1);
            }
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(path), Some(target_id)) = (args.next(), args.next()) else {
        eprintln!("usage: splice_debug <document.html> <target-id> < fragment.html");
        std::process::exit(2);
    };

    let document = std::fs::read_to_string(&path)?;
    let mut fragment = String::new();
    io::stdin().read_to_string(&mut fragment)?;

    let parsed = hotsplice::parse(&fragment);
    eprintln!("== fragment tree");
    print_node(&parsed, parsed.root, 0);
    match hotsplice::recover_fragment_root(&parsed, true) {
        Some(root) => eprintln!("== recovered root: {:?}", parsed.tag_name(root)),
        None => eprintln!("== fragment is empty"),
    }

    match Splicer::default().try_splice(&document, &target_id, &fragment)? {
        SpliceOutcome::Spliced(html) => println!("{html}"),
        SpliceOutcome::TargetNotFound => {
            eprintln!("no element with id {target_id:?} in {path}");
            std::process::exit(1);
        }
    }

    Ok(())
}
