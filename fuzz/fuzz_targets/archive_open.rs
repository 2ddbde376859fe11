//! Fuzz target for opening arbitrary bytes as an archive session.
//!
//! The bytes are registered as a memory channel and opened with type
//! detection, so both engines see the input. Listing every item with
//! its property record exercises the metadata adapters.
//!
//! Run with: cargo +nightly fuzz run archive_open

#![no_main]

use arcgate::channel::MemoryChannel;
use arcgate::{Library, ListOptions, OpenOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut library = Library::new();
    library
        .channels_mut()
        .register("input", MemoryChannel::from_bytes(data.to_vec()));

    let Ok(id) = library.open(&OpenOptions::channel("input").detect_type(true)) else {
        return;
    };
    if let Ok(view) = library.session(&id) {
        let _ = view.info();
        let _ = view.count();
        let _ = view.list(&ListOptions::new().info(true));
    }
    let _ = library.close(&id);
});
