//! Archive item paths and target name helpers.

use std::fmt;

/// Characters that terminate the final segment of a target name.
const NAME_SEPARATORS: &[char] = &['/', '\\', ':'];

/// A normalized archive item path.
///
/// Engines report item paths with whatever separator the archive was written
/// with. `ItemPath` converts each single backslash to `/` and collapses a
/// doubled backslash into one literal backslash, on every platform.
///
/// # Examples
///
/// ```
/// use arcgate::ItemPath;
///
/// let path = ItemPath::normalize("docs\\guide.txt");
/// assert_eq!(path.as_str(), "docs/guide.txt");
///
/// let escaped = ItemPath::normalize("a\\\\b\\c");
/// assert_eq!(escaped.as_str(), "a\\b/c");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ItemPath(String);

impl ItemPath {
    /// Normalizes a raw engine path.
    pub fn normalize(raw: &str) -> Self {
        let mut out = String::with_capacity(raw.len());
        let mut chars = raw.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
            } else if chars.peek() == Some(&'\\') {
                chars.next();
                out.push('\\');
            } else {
                out.push('/');
            }
        }
        Self(out)
    }

    /// Normalizes a UTF-16 engine path.
    ///
    /// Unpaired surrogates become U+FFFD.
    pub fn from_wide(wide: &[u16]) -> Self {
        Self::normalize(&String::from_utf16_lossy(wide))
    }

    /// Returns the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the path and returns the inner string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for ItemPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives the type extension of a target name.
///
/// Returns the text after the last `.`, provided no path separator
/// (`/`, `\` or `:`) follows that dot.
///
/// ```
/// use arcgate::archive_path::type_extension;
///
/// assert_eq!(type_extension("dir/data.7z"), Some("7z"));
/// assert_eq!(type_extension("dir.v2/data"), None);
/// ```
pub fn type_extension(name: &str) -> Option<&str> {
    let dot = name.rfind('.')?;
    let tail = &name[dot + 1..];
    if tail.contains(NAME_SEPARATORS) {
        None
    } else {
        Some(tail)
    }
}

/// Splits a trailing all-digit extension off a volume name.
///
/// `"a.7z.001"` yields `Some(("a.7z", "001"))`.
pub fn split_volume_suffix(name: &str) -> Option<(&str, &str)> {
    let digits = type_extension(name)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((&name[..name.len() - digits.len() - 1], digits))
}

/// Returns the name of the volume that follows `name`.
///
/// The numeric suffix is incremented keeping its zero padding; the width
/// grows only when the number overflows it. Names without a numeric suffix
/// have no successor.
pub fn next_volume_name(name: &str) -> Option<String> {
    let (base, digits) = split_volume_suffix(name)?;
    let number: u64 = digits.parse().ok()?;
    let next = number.checked_add(1)?;
    Some(format!("{base}.{next:0width$}", width = digits.len()))
}
