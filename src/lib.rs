//! # arcgate
//!
//! Read-only archive sessions over 7z and zip.
//!
//! The crate sits between a caller's I/O handles and an archive engine. It
//! presents files, caller-owned channels and split volume sets to the engine
//! as streams. It also enumerates archive and item metadata as typed property
//! records, and lists and extracts single items.
//!
//! ## Quick Start
//!
//! ### Listing and Extracting
//!
//! ```rust,no_run
//! use arcgate::{ExtractTarget, Library, ListOptions, OpenOptions, Result};
//!
//! fn main() -> Result<()> {
//!     let mut library = Library::new();
//!     let id = library.open(&OpenOptions::path("archive.7z"))?;
//!
//!     let view = library.session(&id)?;
//!     for entry in view.list(&ListOptions::new().pattern("*.txt"))? {
//!         println!("{entry}");
//!     }
//!
//!     library.extract(&id, "docs/readme.txt", &ExtractTarget::path("readme.txt"))?;
//!     library.close(&id)?;
//!     Ok(())
//! }
//! ```
//!
//! ### Split Archives
//!
//! ```rust,no_run
//! use arcgate::{Library, OpenOptions, Result};
//!
//! fn main() -> Result<()> {
//!     let library = Library::new();
//!     let view = library.open_view(&OpenOptions::path("backup.7z.001").multivolume(true))?;
//!     println!("{} items", view.count()?);
//!     Ok(())
//! }
//! ```
//!
//! ### Caller-Owned Channels
//!
//! Channels registered in the library's [`ChannelTable`] can be used as
//! archive sources and extraction sinks. They are configured for binary,
//! non-blocking transfer and are never closed by the library.
//!
//! ```rust,no_run
//! use arcgate::channel::{ChannelMode, MemoryChannel};
//! use arcgate::{ExtractTarget, Library, OpenOptions, Result};
//!
//! fn main() -> Result<()> {
//!     let mut library = Library::new();
//!     let bytes = std::fs::read("archive.zip")?;
//!     library.channels_mut().register("in", MemoryChannel::from_bytes(bytes));
//!     let out = library.channels_mut().register("out", MemoryChannel::new(ChannelMode::WRITE));
//!
//!     let id = library.open(&OpenOptions::channel("in").force_type("zip"))?;
//!     library.extract(&id, "hello.txt", &ExtractTarget::channel("out"))?;
//!     library.close(&id)?;
//!     println!("{} bytes", out.borrow().contents().len());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `sevenz` | Yes | 7z backend |
//! | `zip` | Yes | zip and jar backend |
//! | `aes` | Yes | AES-256 encrypted 7z archives (includes `sevenz`) |
//! | `cli` | No | Command-line interface tool |
//!
//! ## Error Handling
//!
//! All operations return [`Result<T>`]. See [`Error`] for the failure
//! classes and [`EngineErrorCode`] for the codes an engine reports.
//!
//! ## Minimum Supported Rust Version (MSRV)
//!
//! This crate requires **Rust 1.85** or later.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]

/// Default buffer size for copy loops (8 KiB).
pub(crate) const READ_BUFFER_SIZE: usize = 8192;

pub mod archive_path;
pub mod channel;
pub mod command;
pub mod engine;
pub mod error;
pub mod property;
pub mod select;
pub mod session;
pub mod stream;
pub mod timestamp;
pub mod view;
pub mod volume;

pub use archive_path::ItemPath;
pub use channel::{Channel, ChannelTable, SharedChannel};
pub use engine::{ArchiveFormat, BuiltinEngine, Engine, EngineArchive};
pub use error::{EngineErrorCode, Error, Result};
pub use property::{Property, PropertyId, PropertyValue, RawProperty};
pub use select::{ListOptions, TypeFilter};
pub use session::{Library, OpenOptions};
pub use stream::{ByteChannel, ChannelTarget, InStream, OutStream};
pub use timestamp::{Timestamp, filetime_to_unix_secs};
pub use view::{ArchiveView, ExtractTarget, ListEntry};
pub use volume::{VolumeCallback, VolumeSet};
