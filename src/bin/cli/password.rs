//! Password handling for CLI operations.

use std::io::IsTerminal;

use arcgate::{EngineErrorCode, Error};
use rpassword::prompt_password;

/// Whether `error` asks for a password the user could still supply.
pub fn needs_password(error: &Error, provided: Option<&str>) -> bool {
    provided.is_none() && error.engine_code() == Some(EngineErrorCode::NeedPassword)
}

/// Prompts the user for a password.
///
/// Returns `None` when stdin is not a terminal or the answer is empty.
pub fn prompt() -> Option<String> {
    if !std::io::stdin().is_terminal() {
        return None;
    }
    match prompt_password("Enter password: ") {
        Ok(pwd) if !pwd.is_empty() => Some(pwd),
        _ => None,
    }
}
