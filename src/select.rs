//! Item selection for listings.
//!
//! Items are filtered first by type and then by pattern. Patterns use
//! wildcard syntax by default, where `*` and `?` also match `/` and
//! `\` escapes the next character:
//!
//! ```
//! use arcgate::select::{ListOptions, TypeFilter};
//!
//! let options = ListOptions::new().pattern("docs/*.TXT").nocase(true);
//! let matcher = options.matcher();
//! assert!(matcher.matches("docs/guide/intro.txt", false));
//!
//! let dirs = ListOptions::new().type_filter(TypeFilter::Directories);
//! assert!(!dirs.matcher().matches("file.txt", false));
//! ```

/// Which item types a listing keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeFilter {
    /// Directories and files.
    #[default]
    Any,
    /// Directories only.
    Directories,
    /// Files only.
    Files,
}

impl TypeFilter {
    /// Parses the `-type` argument: `d` or `f`.
    pub fn from_flag(flag: &str) -> Option<Self> {
        match flag {
            "d" => Some(Self::Directories),
            "f" => Some(Self::Files),
            _ => None,
        }
    }

    /// Whether an item of the given kind passes.
    pub fn accepts(self, is_dir: bool) -> bool {
        match self {
            Self::Any => true,
            Self::Directories => is_dir,
            Self::Files => !is_dir,
        }
    }
}

/// How a pattern is compared with item paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Wildcard match.
    #[default]
    Glob,
    /// String equality.
    Exact,
}

/// Options for [`ArchiveView::list`](crate::ArchiveView::list).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Pattern to match, or `None` for every item.
    pub pattern: Option<String>,
    /// Item type filter.
    pub type_filter: TypeFilter,
    /// Compare without regard to case.
    pub nocase: bool,
    /// Pattern interpretation.
    pub mode: MatchMode,
    /// Return full property records instead of paths.
    pub info: bool,
}

impl ListOptions {
    /// Options that list every item by path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pattern.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Sets the type filter.
    pub fn type_filter(mut self, filter: TypeFilter) -> Self {
        self.type_filter = filter;
        self
    }

    /// Enables case-insensitive matching.
    pub fn nocase(mut self, nocase: bool) -> Self {
        self.nocase = nocase;
        self
    }

    /// Enables exact matching.
    pub fn exact(mut self, exact: bool) -> Self {
        self.mode = if exact {
            MatchMode::Exact
        } else {
            MatchMode::Glob
        };
        self
    }

    /// Requests property records.
    pub fn info(mut self, info: bool) -> Self {
        self.info = info;
        self
    }

    /// Compiles the options into a [`Matcher`].
    ///
    /// Every pattern compiles: text that is not a well-formed pattern
    /// simply matches fewer paths.
    pub fn matcher(&self) -> Matcher {
        let pattern = match (&self.pattern, self.mode) {
            (None, _) => CompiledPattern::All,
            (Some(text), MatchMode::Exact) => CompiledPattern::Exact(text.chars().collect()),
            (Some(text), MatchMode::Glob) => CompiledPattern::Glob(text.chars().collect()),
        };
        Matcher {
            pattern,
            type_filter: self.type_filter,
            nocase: self.nocase,
        }
    }
}

#[derive(Debug, Clone)]
enum CompiledPattern {
    All,
    Glob(Vec<char>),
    Exact(Vec<char>),
}

/// A compiled item filter.
#[derive(Debug, Clone)]
pub struct Matcher {
    pattern: CompiledPattern,
    type_filter: TypeFilter,
    nocase: bool,
}

impl Matcher {
    /// Whether an item with normalized `path` passes the filter.
    pub fn matches(&self, path: &str, is_dir: bool) -> bool {
        if !self.type_filter.accepts(is_dir) {
            return false;
        }
        let path: Vec<char> = path.chars().collect();
        match &self.pattern {
            CompiledPattern::All => true,
            CompiledPattern::Glob(pattern) => string_match(pattern, &path, self.nocase),
            CompiledPattern::Exact(text) => {
                text.len() == path.len()
                    && text
                        .iter()
                        .zip(&path)
                        .all(|(&a, &b)| fold(a, self.nocase) == fold(b, self.nocase))
            }
        }
    }
}

fn fold(c: char, nocase: bool) -> char {
    if nocase {
        c.to_lowercase().next().unwrap_or(c)
    } else {
        c
    }
}

/// Matches `string` against a wildcard pattern.
///
/// `*` matches any run of characters including `/`, `?` matches one
/// character, `[...]` matches one character from a set or range and `\x`
/// matches `x` literally. A class missing its `]` ends at the end of the
/// pattern; a trailing lone `\` matches nothing.
fn string_match(pattern: &[char], string: &[char], nocase: bool) -> bool {
    let (mut p, mut s) = (0, 0);
    loop {
        let Some(&pc) = pattern.get(p) else {
            return s == string.len();
        };
        if s == string.len() && pc != '*' {
            return false;
        }
        match pc {
            '*' => {
                while pattern.get(p) == Some(&'*') {
                    p += 1;
                }
                if p == pattern.len() {
                    return true;
                }
                return (s..=string.len())
                    .any(|start| string_match(&pattern[p..], &string[start..], nocase));
            }
            '?' => {
                p += 1;
                s += 1;
            }
            '[' => {
                let ch = fold(string[s], nocase);
                s += 1;
                match match_class(pattern, p + 1, ch, nocase) {
                    Some(next) => p = next,
                    None => return false,
                }
            }
            _ => {
                if pc == '\\' {
                    p += 1;
                }
                let Some(&literal) = pattern.get(p) else {
                    return false;
                };
                if fold(literal, nocase) != fold(string[s], nocase) {
                    return false;
                }
                p += 1;
                s += 1;
            }
        }
    }
}

/// Matches `ch` against the class body starting at `p`.
///
/// Returns the pattern index after the class, or `None` if no member
/// matches.
fn match_class(pattern: &[char], mut p: usize, ch: char, nocase: bool) -> Option<usize> {
    loop {
        let mut first = *pattern.get(p)?;
        if first == ']' {
            return None;
        }
        if first == '\\' {
            p += 1;
            first = *pattern.get(p)?;
        }
        p += 1;
        let first = fold(first, nocase);
        if pattern.get(p) == Some(&'-') {
            p += 1;
            let mut last = *pattern.get(p)?;
            if last == '\\' {
                p += 1;
                last = *pattern.get(p)?;
            }
            p += 1;
            let last = fold(last, nocase);
            // [a-z] and [z-a] are the same range
            if (first <= ch && ch <= last) || (last <= ch && ch <= first) {
                break;
            }
        } else if first == ch {
            break;
        }
    }
    match pattern[p..].iter().position(|&c| c == ']') {
        Some(offset) => Some(p + offset + 1),
        None => Some(pattern.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_crosses_separators() {
        let matcher = ListOptions::new().pattern("*.txt").matcher();
        assert!(matcher.matches("readme.txt", false));
        assert!(matcher.matches("docs/deep/notes.txt", false));
        assert!(!matcher.matches("image.png", false));

        let matcher = ListOptions::new().pattern("a?b").matcher();
        assert!(matcher.matches("a/b", false));
    }

    #[test]
    fn test_glob_classes_and_case() {
        let matcher = ListOptions::new().pattern("[ab]*.TXT").matcher();
        assert!(!matcher.matches("a1.txt", false));

        let matcher = ListOptions::new()
            .pattern("[ab]*.TXT")
            .nocase(true)
            .matcher();
        assert!(matcher.matches("a1.txt", false));
        assert!(matcher.matches("B.txt", false));
        assert!(!matcher.matches("c.txt", false));
    }

    #[test]
    fn test_exact_mode() {
        let matcher = ListOptions::new().pattern("Dir/*").exact(true).matcher();
        assert!(matcher.matches("Dir/*", false));
        assert!(!matcher.matches("Dir/file", false));
        assert!(!matcher.matches("dir/*", false));

        let matcher = ListOptions::new()
            .pattern("Dir/File")
            .exact(true)
            .nocase(true)
            .matcher();
        assert!(matcher.matches("dir/FILE", false));
    }

    #[test]
    fn test_type_filter_applies_before_pattern() {
        let matcher = ListOptions::new()
            .pattern("*")
            .type_filter(TypeFilter::Directories)
            .matcher();
        assert!(matcher.matches("docs", true));
        assert!(!matcher.matches("docs/a", false));

        let files = ListOptions::new().type_filter(TypeFilter::Files).matcher();
        assert!(files.matches("a", false));
        assert!(!files.matches("d", true));
    }

    #[test]
    fn test_no_pattern_matches_everything() {
        let matcher = ListOptions::new().matcher();
        assert!(matcher.matches("", false));
        assert!(matcher.matches("any/path/file.ext", true));
    }

    #[test]
    fn test_unclosed_class_is_lenient() {
        let matcher = ListOptions::new().pattern("[abc").matcher();
        assert!(matcher.matches("a", false));
        assert!(matcher.matches("c", false));
        assert!(!matcher.matches("d", false));
        assert!(!matcher.matches("ab", false));

        let matcher = ListOptions::new().pattern("docs/[a").matcher();
        assert!(matcher.matches("docs/a", false));
        assert!(!matcher.matches("docs/readme.txt", false));

        // exact mode takes the text literally
        let matcher = ListOptions::new().pattern("[unclosed").exact(true).matcher();
        assert!(matcher.matches("[unclosed", false));
    }

    #[test]
    fn test_backslash_escapes() {
        let matcher = ListOptions::new().pattern("a\\*").matcher();
        assert!(matcher.matches("a*", false));
        assert!(!matcher.matches("a\\xyz", false));
        assert!(!matcher.matches("abc", false));

        // a literal backslash in a path needs a doubled one in the pattern
        let matcher = ListOptions::new().pattern("dir\\\\name").matcher();
        assert!(matcher.matches("dir\\name", false));

        let matcher = ListOptions::new().pattern("[\\]]x").matcher();
        assert!(matcher.matches("]x", false));

        // a lone trailing backslash matches nothing
        let matcher = ListOptions::new().pattern("a\\").matcher();
        assert!(!matcher.matches("a", false));
        assert!(!matcher.matches("a\\", false));
    }

    #[test]
    fn test_class_ranges() {
        let matcher = ListOptions::new().pattern("file[0-9].txt").matcher();
        assert!(matcher.matches("file7.txt", false));
        assert!(!matcher.matches("fileA.txt", false));

        let reversed = ListOptions::new().pattern("file[9-0].txt").matcher();
        assert!(reversed.matches("file3.txt", false));

        let matcher = ListOptions::new().pattern("[A-C]*").nocase(true).matcher();
        assert!(matcher.matches("banana", false));
        assert!(!matcher.matches("date", false));
    }

    #[test]
    fn test_stars_and_empty_paths() {
        let matcher = ListOptions::new().pattern("**a**").matcher();
        assert!(matcher.matches("a", false));
        assert!(matcher.matches("x/ya/z", false));
        assert!(!matcher.matches("", false));

        assert!(ListOptions::new().pattern("*").matcher().matches("", false));
        assert!(!ListOptions::new().pattern("?").matcher().matches("", false));
        assert!(ListOptions::new().pattern("").matcher().matches("", false));
    }

    #[test]
    fn test_type_flag() {
        assert_eq!(TypeFilter::from_flag("d"), Some(TypeFilter::Directories));
        assert_eq!(TypeFilter::from_flag("f"), Some(TypeFilter::Files));
        assert_eq!(TypeFilter::from_flag("x"), None);
    }
}
