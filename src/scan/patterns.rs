//! Pattern filter (spec component B): the single file-admission predicate
//! shared by the walker, the pairwise comparator, and the equivalence grouper.
//!
//! Grounded in the reference `Command::validFile`/`FileMatches` pair: a file
//! is admitted iff its name clears the exclude/include-file lists and its
//! full path clears the exclude/include-path lists, in that order. An empty
//! include list matches everything; an empty exclude list matches nothing.

use std::sync::atomic::{AtomicUsize, Ordering};

use regex::Regex;

use crate::core::errors::{DupError, Result};

/// Translate a DOS-style glob (`*` → any run of characters, `?` → any one
/// character) into an anchored regular expression. Any other regex
/// metacharacter in the input is escaped literally, since glob patterns have
/// no other special syntax.
fn glob_to_regex(glob: &str) -> String {
    let mut body = String::with_capacity(glob.len() * 2);
    for ch in glob.chars() {
        match ch {
            '*' => body.push_str(".*"),
            '?' => body.push('.'),
            _ => {
                if regex_syntax::is_meta_character(ch) {
                    body.push('\\');
                }
                body.push(ch);
            }
        }
    }
    body
}

/// Compile one pattern into an anchored [`Regex`] matching the whole string,
/// mirroring `std::regex_match`'s whole-string semantics.
///
/// `use_regex`: if set, `raw` is already a regular expression and is used
/// as-is (still anchored); otherwise it is treated as a DOS-style glob.
fn compile_pattern(raw: &str, use_regex: bool) -> Result<Regex> {
    let body = if use_regex {
        raw.to_string()
    } else {
        glob_to_regex(raw)
    };
    let anchored = format!("^(?:{body})$");
    Regex::new(&anchored).map_err(|source| DupError::PatternError {
        pattern: raw.to_string(),
        details: source.to_string(),
    })
}

fn compile_set(raw: &[String], use_regex: bool) -> Result<Vec<Regex>> {
    raw.iter().map(|pat| compile_pattern(pat, use_regex)).collect()
}

/// Return `true` if `candidate` matches any pattern in `list`; if `list` is
/// empty (or `candidate` is empty), return `empty_result` instead.
fn matches(list: &[Regex], candidate: &str, empty_result: bool) -> bool {
    if list.is_empty() || candidate.is_empty() {
        return empty_result;
    }
    list.iter().any(|pat| pat.is_match(candidate))
}

/// The compiled include/exclude pattern sets plus the running skip counter.
pub struct PatternFilter {
    include_file: Vec<Regex>,
    exclude_file: Vec<Regex>,
    include_path: Vec<Regex>,
    exclude_path: Vec<Regex>,
    skip_count: AtomicUsize,
}

impl PatternFilter {
    /// Compile all four pattern lists. `use_regex` applies uniformly: mixing
    /// glob and regex patterns in one invocation is not supported, matching
    /// the original tool's single global `-regex` switch.
    pub fn compile(
        include_file: &[String],
        exclude_file: &[String],
        include_path: &[String],
        exclude_path: &[String],
        use_regex: bool,
    ) -> Result<Self> {
        Ok(Self {
            include_file: compile_set(include_file, use_regex)?,
            exclude_file: compile_set(exclude_file, use_regex)?,
            include_path: compile_set(include_path, use_regex)?,
            exclude_path: compile_set(exclude_path, use_regex)?,
            skip_count: AtomicUsize::new(0),
        })
    }

    /// An empty filter: admits every non-empty name.
    #[must_use]
    pub fn accept_all() -> Self {
        Self {
            include_file: Vec::new(),
            exclude_file: Vec::new(),
            include_path: Vec::new(),
            exclude_path: Vec::new(),
            skip_count: AtomicUsize::new(0),
        }
    }

    /// Evaluate the five-step admission predicate (§4.B) against one file.
    /// `name` is the final path component; `full_path` is the complete path.
    pub fn valid_file(&self, name: &str, full_path: &str) -> bool {
        let admitted = !name.is_empty()
            && !matches(&self.exclude_file, name, false)
            && matches(&self.include_file, name, true)
            && !matches(&self.exclude_path, full_path, false)
            && matches(&self.include_path, full_path, true);

        if !admitted {
            self.skip_count.fetch_add(1, Ordering::Relaxed);
        }
        admitted
    }

    /// Total files rejected by [`valid_file`](Self::valid_file) so far.
    #[must_use]
    pub fn skip_count(&self) -> usize {
        self.skip_count.load(Ordering::Relaxed)
    }
}

/// Minimal is-regex-metacharacter test, local to avoid taking a dependency on
/// the `regex-syntax` crate just for this one predicate.
mod regex_syntax {
    pub fn is_meta_character(ch: char) -> bool {
        matches!(
            ch,
            '.' | '+'
                | '('
                | ')'
                | '['
                | ']'
                | '{'
                | '}'
                | '|'
                | '^'
                | '$'
                | '\\'
        )
    }
}
