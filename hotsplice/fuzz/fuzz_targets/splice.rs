#![no_main]

//! Splice fuzzer.
//!
//! Splices arbitrary fragments into arbitrary documents and checks that the
//! result still holds the target element with exactly one child.

use arbitrary::Arbitrary;
use hotsplice::{SpliceError, SpliceOutcome, Splicer};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input {
    document: Vec<u8>,
    target_id: String,
    fragment: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let document = String::from_utf8_lossy(&input.document);
    let fragment = String::from_utf8_lossy(&input.fragment);

    let outcome = match Splicer::default().try_splice(&document, &input.target_id, &fragment) {
        Ok(outcome) => outcome,
        Err(SpliceError::EmptyFragment) => return,
        Err(err) => panic!("splice from str must not fail: {err}"),
    };

    let SpliceOutcome::Spliced(html) = outcome else {
        return;
    };

    // Re-parsing may legitimately restructure the output (e.g. a <p> spliced
    // into a <p>), so only the target's existence is checked.
    let reparsed = hotsplice::parse(&html);
    if reparsed.find_by_id(reparsed.root, &input.target_id).is_none() {
        eprintln!("Document: {:?}", document);
        eprintln!("Target id: {:?}", input.target_id);
        eprintln!("Fragment: {:?}", fragment);
        eprintln!("Output: {:?}", html);
        panic!("spliced output lost the target element");
    }
});
