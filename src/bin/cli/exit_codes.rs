//! Exit codes for the CLI tool.

use arcgate::{EngineErrorCode, Error};

/// Exit code constants
pub const SUCCESS: i32 = 0;
/// Fatal error occurred
pub const FATAL_ERROR: i32 = 2;
/// Archive format error
pub const BAD_ARCHIVE: i32 = 3;
/// Missing or wrong password
pub const WRONG_PASSWORD: i32 = 4;
/// I/O error
pub const IO_ERROR: i32 = 5;
/// Requested item not in the archive
pub const NOT_FOUND: i32 = 6;
/// Ctrl+C (128 + SIGINT)
pub const USER_INTERRUPT: i32 = 130;
/// Invalid command line arguments
pub const BAD_ARGS: i32 = 255;

/// Exit code enum for structured handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    FatalError,
    BadArchive,
    WrongPassword,
    IoError,
    NotFound,
    BadArgs,
}

impl ExitCode {
    /// Returns the numeric exit code
    pub fn code(self) -> i32 {
        match self {
            Self::Success => SUCCESS,
            Self::FatalError => FATAL_ERROR,
            Self::BadArchive => BAD_ARCHIVE,
            Self::WrongPassword => WRONG_PASSWORD,
            Self::IoError => IO_ERROR,
            Self::NotFound => NOT_FOUND,
            Self::BadArgs => BAD_ARGS,
        }
    }
}

/// Converts an arcgate error to an exit code
pub fn error_to_exit_code(error: &Error) -> ExitCode {
    match error {
        Error::Channel { .. } | Error::Io(_) => ExitCode::IoError,
        Error::NotOpen => ExitCode::FatalError,
        Error::ItemNotFound { .. } => ExitCode::NotFound,
        Error::Unsupported { .. } => ExitCode::FatalError,
        Error::Engine {
            code: EngineErrorCode::NeedPassword,
            ..
        } => ExitCode::WrongPassword,
        Error::Engine { .. } => ExitCode::BadArchive,
        Error::Validation(_) => ExitCode::BadArgs,
        // Future error variants - required by #[non_exhaustive]
        _ => ExitCode::FatalError,
    }
}
