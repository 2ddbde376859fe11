//! Fuzz target for the textual command protocol.
//!
//! Arbitrary lines go through word splitting and evaluation against an
//! empty library. Any line that splits must survive a render and split
//! round trip unchanged.
//!
//! Run with: cargo +nightly fuzz run command_line

#![no_main]

use arcgate::Library;
use arcgate::command::{Reply, eval_line, split_words};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(line) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(words) = split_words(line) {
        let rendered = Reply::List(words.iter().cloned().map(Reply::Text).collect()).to_string();
        let again = split_words(&rendered).expect("rendered list must split");
        assert_eq!(again, words, "round trip changed {line:?}");
    }

    let mut library = Library::new();
    let _ = eval_line(&mut library, line);
});
