//! Error types for archive sessions.
//!
//! Every fallible operation in this crate returns [`Result<T>`]. The variants
//! of [`Error`] follow the failure classes a caller can act on:
//!
//! | Class | Variants | Typical cause |
//! |-------|----------|---------------|
//! | Channel | [`Channel`][Error::Channel], [`Io`][Error::Io] | target could not be opened, direction mismatch, I/O failure |
//! | Session | [`NotOpen`][Error::NotOpen] | operation on a closed archive view |
//! | Lookup | [`ItemNotFound`][Error::ItemNotFound] | extract target absent from the archive |
//! | Callback | [`Unsupported`][Error::Unsupported] | deliberately unimplemented stream callback |
//! | Engine | [`Engine`][Error::Engine] | the archive engine rejected the archive or password |
//! | Arguments | [`Validation`][Error::Validation] | conflicting or malformed options |
//!
//! # Example
//!
//! ```rust,no_run
//! use arcgate::{EngineErrorCode, Error, Library, OpenOptions};
//!
//! let mut library = Library::new();
//! match library.open(&OpenOptions::path("secret.7z")) {
//!     Ok(id) => println!("opened {id}"),
//!     Err(Error::Engine { code: EngineErrorCode::NeedPassword, .. }) => {
//!         eprintln!("archive is encrypted");
//!     }
//!     Err(e) => eprintln!("{e}"),
//! }
//! ```

use std::fmt;
use std::io;

/// Status codes reported by the archive engine.
///
/// Each code has a fixed user-facing message, returned by
/// [`message`](Self::message) and used as the `Display` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum EngineErrorCode {
    /// The engine reported failure without setting an error.
    NoError,
    /// Unclassified engine failure.
    Unknown,
    /// The engine was used before it was initialized.
    NotInitialized,
    /// The archive or item is encrypted and no usable password was given.
    NeedPassword,
    /// The archive type is not recognized or uses an unsupported method.
    NotSupported,
}

impl EngineErrorCode {
    /// Returns the user-facing message for this code.
    pub fn message(self) -> &'static str {
        match self {
            Self::NoError => "no error",
            Self::Unknown => "unknown error",
            Self::NotInitialized => "not initialized",
            Self::NeedPassword => "need password",
            Self::NotSupported => "not supported",
        }
    }
}

impl fmt::Display for EngineErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// The error type for all archive session operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A channel could not be resolved, opened or configured.
    ///
    /// The message is complete and user-facing, e.g.
    /// `couldn't read file "a.7z": No such file or directory`.
    #[error("{message}")]
    Channel {
        /// User-facing description.
        message: String,
        /// Underlying I/O failure, if any.
        #[source]
        source: Option<io::Error>,
    },

    /// An I/O error raised while transferring data through a channel.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The archive view has no archive handle (never opened or already closed).
    #[error("error opening archive")]
    NotOpen,

    /// No non-directory item with the requested path exists.
    #[error("no such item \"{path}\" in the archive")]
    ItemNotFound {
        /// The path exactly as requested.
        path: String,
    },

    /// A stream or volume callback that is intentionally not implemented.
    #[error("{operation} is not supported")]
    Unsupported {
        /// Name of the callback, e.g. `InStream::size`.
        operation: &'static str,
    },

    /// The archive engine reported a failure.
    ///
    /// Displays only the code's message; backend specifics are kept in
    /// `detail` for logging.
    #[error("{code}")]
    Engine {
        /// Engine status code.
        code: EngineErrorCode,
        /// Backend-specific description, if the backend provided one.
        detail: Option<String>,
    },

    /// Conflicting or malformed options.
    #[error("{0}")]
    Validation(String),
}

impl Error {
    /// Creates a channel error without an I/O source.
    pub fn channel(message: impl Into<String>) -> Self {
        Error::Channel {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a channel error that wraps an I/O failure.
    pub fn channel_io(message: impl Into<String>, source: io::Error) -> Self {
        Error::Channel {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates an engine error from a bare code.
    pub fn engine(code: EngineErrorCode) -> Self {
        Error::Engine { code, detail: None }
    }

    /// Creates an engine error carrying backend detail.
    pub fn engine_detail(code: EngineErrorCode, detail: impl Into<String>) -> Self {
        Error::Engine {
            code,
            detail: Some(detail.into()),
        }
    }

    /// Creates an item-not-found error for `path`.
    pub fn item_not_found(path: impl Into<String>) -> Self {
        Error::ItemNotFound { path: path.into() }
    }

    /// Creates an unsupported-callback error.
    pub fn unsupported(operation: &'static str) -> Self {
        Error::Unsupported { operation }
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// Returns `true` for failures of the channel layer.
    pub fn is_channel_error(&self) -> bool {
        matches!(self, Error::Channel { .. } | Error::Io(_))
    }

    /// Returns `true` if the extract target was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::ItemNotFound { .. })
    }

    /// Returns `true` for option validation failures.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// Returns the engine status code, if this is an engine error.
    pub fn engine_code(&self) -> Option<EngineErrorCode> {
        match self {
            Error::Engine { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// A specialized Result type for archive session operations.
pub type Result<T> = std::result::Result<T, Error>;
