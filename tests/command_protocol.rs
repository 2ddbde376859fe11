//! Textual command protocol integration tests.
//!
//! Drives a [`Library`] through [`eval_line`] the way the `shell`
//! subcommand does and checks replies and error messages.

#![cfg(all(feature = "sevenz", feature = "zip"))]

mod common;

use arcgate::channel::{ChannelMode, MemoryChannel};
use arcgate::command::{Reply, eval_line, quote_element, split_words};
use arcgate::{Library, Result};
use common::*;
use tempfile::tempdir;

fn run(library: &mut Library, line: &str) -> Result<String> {
    eval_line(library, line).map(|reply| reply.to_string())
}

#[test]
fn test_full_session() {
    let dir = tempdir().unwrap();
    let archive = write_file(
        dir.path(),
        "my tree.7z",
        &sevenz_archive(TREE_FILES, TREE_DIRS),
    );
    let mut library = Library::new();

    let id = run(&mut library, &format!("open {}", quote_element(&path_string(&archive)))).unwrap();
    assert_eq!(id, "sevenzip0");

    assert_eq!(run(&mut library, &format!("{id} count")).unwrap(), "5");
    assert_eq!(
        run(&mut library, &format!("{id} list -type f *.txt")).unwrap(),
        "docs/readme.txt"
    );
    assert_eq!(
        run(&mut library, &format!("{id} list -nocase -type f -- *.txt")).unwrap(),
        "docs/readme.txt docs/Guide.TXT"
    );
    assert_eq!(
        run(&mut library, &format!("{id} list -type d")).unwrap(),
        "docs"
    );

    let record = run(&mut library, &format!("{id} list -info -exact main.rs")).unwrap();
    let words = split_words(&record).unwrap();
    assert_eq!(words.len(), 1);
    let fields = split_words(&words[0]).unwrap();
    let pairs: Vec<(&str, &str)> = fields
        .chunks(2)
        .map(|pair| (pair[0].as_str(), pair[1].as_str()))
        .collect();
    assert!(pairs.contains(&("path", "main.rs")));
    assert!(pairs.contains(&("isdir", "0")));
    assert!(pairs.contains(&("size", "13")));
    assert!(pairs.contains(&("mtime", "1000000000")));

    let dest = dir.path().join("out dir");
    std::fs::create_dir(&dest).unwrap();
    let dest = dest.join("main.rs");
    let reply = run(
        &mut library,
        &format!("{id} extract main.rs {}", quote_element(&path_string(&dest))),
    )
    .unwrap();
    assert_eq!(reply, "");
    assert_eq!(std::fs::read(&dest).unwrap(), b"fn main() {}\n");

    assert_eq!(run(&mut library, &format!("{id} close")).unwrap(), "");
    let err = run(&mut library, &format!("{id} count")).unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn test_info_renders_flat_pairs() {
    let mut library = Library::new();
    library.channels_mut().register(
        "src",
        MemoryChannel::from_bytes(sevenz_solid(&[("a", b"1"), ("b", b"22")])),
    );
    let id = run(&mut library, "open -channel -forcetype 7z src").unwrap();

    let reply = eval_line(&mut library, &format!("{id} info")).unwrap();
    let Reply::List(items) = &reply else {
        panic!("expected a list reply");
    };
    assert_eq!(items.len() % 2, 0);
    let text = reply.to_string();
    // catalog order puts solid before physize
    assert!(text.starts_with("solid 1 physize "), "{text}");
}

#[test]
fn test_extract_to_channel_and_prefixes() {
    let mut library = Library::new();
    library
        .channels_mut()
        .register("src", MemoryChannel::from_bytes(zip_archive(TREE_FILES, &[])));
    let sink = library
        .channels_mut()
        .register("sink", MemoryChannel::new(ChannelMode::WRITE));

    // options and verbs accept unique prefixes
    let id = run(&mut library, "open -ch -force zip src").unwrap();
    run(&mut library, &format!("{id} ex -ch docs/readme.txt sink")).unwrap();
    assert_eq!(sink.borrow().contents(), b"Read me first.\n");
    assert_eq!(run(&mut library, &format!("{id} co")).unwrap(), "4");
    assert_eq!(run(&mut library, &format!("{id} cl")).unwrap(), "");
    assert!(library.sessions().is_empty());
}

#[test]
fn test_ambiguous_prefixes() {
    let mut library = Library::new();
    library
        .channels_mut()
        .register("src", MemoryChannel::from_bytes(zip_archive(TREE_FILES, &[])));
    let id = run(&mut library, "open -channel -forcetype zip src").unwrap();

    assert_eq!(
        run(&mut library, &format!("{id} c")).unwrap_err().to_string(),
        "ambiguous subcommand \"c\": must be info, count, list, extract, or close"
    );
    assert_eq!(
        run(&mut library, &format!("{id} list - main.rs")).unwrap_err().to_string(),
        "ambiguous option \"-\": must be -info, -nocase, -exact, -type, or --"
    );
    assert_eq!(run(&mut library, &format!("{id} count")).unwrap(), "4");
}

#[test]
fn test_list_patterns_never_fail() {
    let mut library = Library::new();
    library.channels_mut().register(
        "src",
        MemoryChannel::from_bytes(zip_archive(&[("a*", b"star"), ("ab", b"plain")], &[])),
    );
    let id = run(&mut library, "open -channel -forcetype zip src").unwrap();

    assert_eq!(run(&mut library, &format!("{id} list {{[abc}}")).unwrap(), "");
    assert_eq!(run(&mut library, &format!("{id} list {{a\\*}}")).unwrap(), "a*");
    assert_eq!(run(&mut library, &format!("{id} list a*")).unwrap(), "a* ab");
}

#[test]
fn test_error_messages() {
    let dir = tempdir().unwrap();
    let archive = write_file(dir.path(), "t.zip", &zip_archive(TREE_FILES, TREE_DIRS));
    let mut library = Library::new();
    let id = run(&mut library, &format!("open {}", quote_element(&path_string(&archive)))).unwrap();

    let message = |library: &mut Library, line: &str| run(library, line).unwrap_err().to_string();

    assert_eq!(
        message(&mut library, &format!("{id} bogus")),
        "bad subcommand \"bogus\": must be info, count, list, extract, or close"
    );
    assert_eq!(
        message(&mut library, &format!("{id}")),
        format!("wrong # args: should be \"{id} subcommand\"")
    );
    assert_eq!(
        message(&mut library, &format!("{id} count extra")),
        format!("wrong # args: should be \"{id} count\"")
    );
    assert_eq!(
        message(&mut library, &format!("{id} list -type x")),
        "\"-type\" option must be followed by \"d\" or \"f\""
    );
    assert_eq!(
        message(&mut library, &format!("{id} list -bogus *.txt")),
        "bad option \"-bogus\": must be -info, -nocase, -exact, -type, or --"
    );
    assert_eq!(
        message(&mut library, &format!("{id} extract missing.txt out")),
        "no such item \"missing.txt\" in the archive"
    );
    assert_eq!(
        message(&mut library, "open -detecttype -forcetype zip x.zip"),
        "only one of options \"-detecttype\" or \"-forcetype\" must be specified"
    );
    assert_eq!(
        message(&mut library, "open -multivolume -channel x"),
        "only one of options \"-multivolume\" or \"-channel\" must be specified"
    );
    assert_eq!(
        message(&mut library, "sevenzip42 count"),
        "bad subcommand \"sevenzip42\": must be extensions or open"
    );

    // a failed command leaves the session usable
    assert_eq!(run(&mut library, &format!("{id} count")).unwrap(), "5");
}

#[test]
fn test_extensions_verb() {
    let mut library = Library::new();
    let words = split_words(&run(&mut library, "extensions").unwrap()).unwrap();
    for ext in ["7z", "zip", "jar"] {
        assert!(words.iter().any(|w| w == ext), "{ext} missing from {words:?}");
    }
}
