//! Textual command protocol.
//!
//! Commands are word lists. Library verbs are `open` and `extensions`;
//! every other command starts with a session identifier followed by one of
//! `info`, `count`, `list`, `extract` or `close`:
//!
//! ```text
//! open ?-multivolume? ?-detecttype|-forcetype type? ?-password p? ?-channel? target
//! extensions
//! <id> info
//! <id> count
//! <id> list ?-info? ?-nocase? ?-exact? ?-type d|f? ?--? ?pattern?
//! <id> extract ?-password p? ?-channel? item destination
//! <id> close
//! ```
//!
//! Options may be abbreviated to any unique prefix. Replies render as
//! whitespace-separated lists with brace quoting.
//!
//! # Example
//!
//! ```rust,no_run
//! use arcgate::command::eval_line;
//! use arcgate::Library;
//!
//! # fn main() -> arcgate::Result<()> {
//! let mut library = Library::new();
//! let id = eval_line(&mut library, "open -detecttype {my archive.bin}")?.to_string();
//! println!("{}", eval_line(&mut library, &format!("{id} list -type f *.txt"))?);
//! eval_line(&mut library, &format!("{id} close"))?;
//! # Ok(())
//! # }
//! ```

use std::fmt;

use crate::property::Property;
use crate::select::{ListOptions, TypeFilter};
use crate::session::{Library, OpenOptions};
use crate::stream::ChannelTarget;
use crate::view::{ExtractTarget, ListEntry};
use crate::{Error, Result};

/// Result of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// No result.
    Empty,
    /// An integer.
    Integer(i64),
    /// A single word.
    Text(String),
    /// A list of replies.
    List(Vec<Reply>),
}

impl Reply {
    /// Flat list of alternating names and values.
    pub fn record(record: &[Property]) -> Self {
        Reply::List(
            record
                .iter()
                .flat_map(|p| [Reply::Text(p.name().to_string()), Reply::Text(p.value.to_string())])
                .collect(),
        )
    }

    fn render_element(&self, out: &mut String) {
        match self {
            Reply::Empty => out.push_str("{}"),
            Reply::Integer(n) => out.push_str(&n.to_string()),
            Reply::Text(text) => out.push_str(&quote_element(text)),
            Reply::List(_) => out.push_str(&quote_element(&self.to_string())),
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Empty => Ok(()),
            Reply::Integer(n) => write!(f, "{n}"),
            Reply::Text(text) => f.write_str(text),
            Reply::List(items) => {
                let mut out = String::new();
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    item.render_element(&mut out);
                }
                f.write_str(&out)
            }
        }
    }
}

fn is_special(c: char) -> bool {
    c.is_whitespace() || matches!(c, '{' | '}' | '"' | '\\' | '[' | ']' | '$' | ';')
}

fn braces_balanced(text: &str) -> bool {
    let mut depth = 0i32;
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Quotes one list element so [`split_words`] yields it back unchanged.
pub fn quote_element(text: &str) -> String {
    if text.is_empty() {
        return "{}".to_string();
    }
    if !text.chars().any(is_special) && !text.starts_with('#') {
        return text.to_string();
    }
    if braces_balanced(text) && !text.ends_with('\\') {
        return format!("{{{text}}}");
    }
    let mut out = String::with_capacity(text.len() * 2);
    for c in text.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c if is_special(c) || c == '#' => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

/// Splits a command line into words.
///
/// Words are separated by whitespace. A word may be grouped with braces,
/// taken literally, or with double quotes, where backslash escapes apply.
///
/// # Errors
///
/// Returns [`Error::Validation`] for unbalanced braces or quotes.
pub fn split_words(line: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut chars = line.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let Some(&first) = chars.peek() else {
            break;
        };

        let mut word = String::new();
        match first {
            '{' => {
                chars.next();
                let mut depth = 1;
                loop {
                    let c = chars
                        .next()
                        .ok_or_else(|| Error::validation("missing close-brace"))?;
                    match c {
                        '\\' => {
                            word.push(c);
                            if let Some(next) = chars.next() {
                                word.push(next);
                            }
                        }
                        '{' => {
                            depth += 1;
                            word.push(c);
                        }
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                            word.push(c);
                        }
                        c => word.push(c),
                    }
                }
                expect_separator(chars.peek().copied(), "braces")?;
            }
            '"' => {
                chars.next();
                loop {
                    let c = chars
                        .next()
                        .ok_or_else(|| Error::validation("missing \""))?;
                    match c {
                        '"' => break,
                        '\\' => push_escape(&mut word, chars.next()),
                        c => word.push(c),
                    }
                }
                expect_separator(chars.peek().copied(), "quotes")?;
            }
            _ => {
                while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                    if c == '\\' {
                        push_escape(&mut word, chars.next());
                    } else {
                        word.push(c);
                    }
                }
            }
        }
        words.push(word);
    }
    Ok(words)
}

fn expect_separator(next: Option<char>, group: &str) -> Result<()> {
    match next {
        Some(c) if !c.is_whitespace() => Err(Error::validation(format!(
            "extra characters after close-{}",
            if group == "braces" { "brace" } else { "quote" }
        ))),
        _ => Ok(()),
    }
}

fn push_escape(word: &mut String, escaped: Option<char>) {
    match escaped {
        Some('n') => word.push('\n'),
        Some('t') => word.push('\t'),
        Some('r') => word.push('\r'),
        Some(c) => word.push(c),
        None => word.push('\\'),
    }
}

/// Formats the choices of an option table: `a`, `a or b`, `a, b, or c`.
fn choices(table: &[&str]) -> String {
    match table {
        [] => String::new(),
        [only] => (*only).to_string(),
        [first, second] => format!("{first} or {second}"),
        [init @ .., last] => format!("{}, or {last}", init.join(", ")),
    }
}

/// Resolves `word` against `table`, accepting unique prefixes.
fn lookup(word: &str, table: &[&str], kind: &str) -> Result<usize> {
    if let Some(index) = table.iter().position(|entry| *entry == word) {
        return Ok(index);
    }
    let candidates: Vec<usize> = if word.is_empty() {
        Vec::new()
    } else {
        table
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.starts_with(word))
            .map(|(i, _)| i)
            .collect()
    };
    match candidates.as_slice() {
        [index] => Ok(*index),
        [] => Err(Error::validation(format!(
            "bad {kind} \"{word}\": must be {}",
            choices(table)
        ))),
        _ => Err(Error::validation(format!(
            "ambiguous {kind} \"{word}\": must be {}",
            choices(table)
        ))),
    }
}

fn wrong_args(prefix: &str, usage: &str) -> Error {
    if usage.is_empty() {
        Error::validation(format!("wrong # args: should be \"{prefix}\""))
    } else {
        Error::validation(format!("wrong # args: should be \"{prefix} {usage}\""))
    }
}

const LIBRARY_VERBS: [&str; 2] = ["extensions", "open"];
const SESSION_VERBS: [&str; 5] = ["info", "count", "list", "extract", "close"];
const OPEN_OPTIONS: [&str; 5] = [
    "-multivolume",
    "-detecttype",
    "-forcetype",
    "-password",
    "-channel",
];
const LIST_OPTIONS: [&str; 5] = ["-info", "-nocase", "-exact", "-type", "--"];
const EXTRACT_OPTIONS: [&str; 2] = ["-password", "-channel"];

/// Splits `line` into words and evaluates them.
pub fn eval_line(library: &mut Library, line: &str) -> Result<Reply> {
    let words = split_words(line)?;
    eval(library, &words)
}

/// Evaluates one command.
pub fn eval<S: AsRef<str>>(library: &mut Library, words: &[S]) -> Result<Reply> {
    let words: Vec<&str> = words.iter().map(AsRef::as_ref).collect();
    let Some((&head, args)) = words.split_first() else {
        return Ok(Reply::Empty);
    };

    if library.sessions().contains(head) {
        return eval_session(library, head, args);
    }
    match lookup(head, &LIBRARY_VERBS, "subcommand")? {
        0 => {
            if !args.is_empty() {
                return Err(wrong_args("extensions", ""));
            }
            Ok(Reply::List(
                library
                    .supported_extensions()
                    .into_iter()
                    .map(Reply::Text)
                    .collect(),
            ))
        }
        _ => {
            let options = parse_open(args)?;
            library.open(&options).map(Reply::Text)
        }
    }
}

/// Parses the arguments of `open`.
pub fn parse_open(args: &[&str]) -> Result<OpenOptions> {
    let Some((&target, flags)) = args.split_last() else {
        return Err(wrong_args("open", "?options? filename"));
    };
    let mut options = OpenOptions::path(target);
    let mut i = 0;
    while i < flags.len() {
        match lookup(flags[i], &OPEN_OPTIONS, "option")? {
            0 => options.multivolume = true,
            1 => options.detect_type = true,
            2 => {
                i += 1;
                let forced = flags.get(i).ok_or_else(|| {
                    Error::validation("\"-forcetype\" option must be followed by type")
                })?;
                options.force_type = Some((*forced).to_string());
            }
            3 => {
                i += 1;
                let password = flags.get(i).ok_or_else(|| {
                    Error::validation("\"-password\" option must be followed by password")
                })?;
                options.password = Some((*password).to_string());
            }
            _ => options.use_channel = true,
        }
        i += 1;
    }
    options.validate()?;
    Ok(options)
}

/// Parses the arguments of `list`.
///
/// An unrecognized word is the pattern when it is the last argument and an
/// error otherwise.
pub fn parse_list(args: &[&str]) -> Result<ListOptions> {
    let mut options = ListOptions::new();
    let mut i = 0;
    while i < args.len() {
        let is_last = i + 1 == args.len();
        let index = match lookup(args[i], &LIST_OPTIONS, "option") {
            Ok(index) => index,
            Err(_) if is_last => {
                options.pattern = Some(args[i].to_string());
                break;
            }
            Err(e) => return Err(e),
        };
        match index {
            0 => options.info = true,
            1 => options.nocase = true,
            2 => options = options.exact(true),
            3 => {
                i += 1;
                options.type_filter = args
                    .get(i)
                    .and_then(|flag| TypeFilter::from_flag(flag))
                    .ok_or_else(|| {
                        Error::validation("\"-type\" option must be followed by \"d\" or \"f\"")
                    })?;
            }
            _ => {
                match args.len() - i {
                    1 => {}
                    2 => options.pattern = Some(args[i + 1].to_string()),
                    _ => {
                        return Err(Error::validation(
                            "\"--\" option can be followed by pattern only",
                        ));
                    }
                }
                break;
            }
        }
        i += 1;
    }
    Ok(options)
}

/// Parses the arguments of `extract` into the item path and target.
pub fn parse_extract<'a>(id: &str, args: &[&'a str]) -> Result<(&'a str, ExtractTarget)> {
    if args.len() < 2 {
        return Err(wrong_args(&format!("{id} extract"), "?options? item path"));
    }
    let (flags, rest) = args.split_at(args.len() - 2);
    let mut password = None;
    let mut use_channel = false;
    let mut i = 0;
    while i < flags.len() {
        match lookup(flags[i], &EXTRACT_OPTIONS, "option")? {
            0 => {
                i += 1;
                let value = flags.get(i).ok_or_else(|| {
                    Error::validation("\"-password\" option must be followed by password")
                })?;
                password = Some((*value).to_string());
            }
            _ => use_channel = true,
        }
        i += 1;
    }
    let target = ExtractTarget {
        destination: ChannelTarget::from_name(rest[1], use_channel),
        password,
    };
    Ok((rest[0], target))
}

fn eval_session(library: &mut Library, id: &str, args: &[&str]) -> Result<Reply> {
    let Some((&verb, args)) = args.split_first() else {
        return Err(wrong_args(id, "subcommand"));
    };
    let no_args = |verb: &str| -> Result<()> {
        if args.is_empty() {
            Ok(())
        } else {
            Err(wrong_args(&format!("{id} {verb}"), ""))
        }
    };

    match lookup(verb, &SESSION_VERBS, "subcommand")? {
        0 => {
            no_args("info")?;
            let info = library.session(id)?.info()?;
            Ok(Reply::record(&info))
        }
        1 => {
            no_args("count")?;
            let count = library.session(id)?.count()?;
            Ok(Reply::Integer(i64::from(count)))
        }
        2 => {
            let options = parse_list(args)?;
            let entries = library.session(id)?.list(&options)?;
            Ok(Reply::List(
                entries
                    .into_iter()
                    .map(|entry| match entry {
                        ListEntry::Path(path) => Reply::Text(path),
                        ListEntry::Record(record) => Reply::record(&record),
                    })
                    .collect(),
            ))
        }
        3 => {
            let (item, target) = parse_extract(id, args)?;
            library.extract(id, item, &target)?;
            Ok(Reply::Empty)
        }
        _ => {
            no_args("close")?;
            library.close(id)?;
            Ok(Reply::Empty)
        }
    }
}
