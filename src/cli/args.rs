//! Argument grammar (spec component J): prefix-matched `-flag=value` parsing,
//! `\n \t \\ \xNN \NNN` escape decoding, and resolution into the structures
//! the comparator (H) and grouper (I) actually run on.
//!
//! Grounded in the reference `Command::parseCommandLine`: flags are matched
//! by any unique leading substring of their canonical name (`-inc` is
//! ambiguous between `includeFile`/`ignoreExtn`/`invert`; `-incl` resolves to
//! `includeFile`), `=` separates name from value, and `--` ends option
//! parsing so a root named `-weird` can still be passed positionally.

#![allow(missing_docs)]

use std::io::BufRead;
use std::path::PathBuf;

use crate::commands::comparator::{ComparatorOptions, DeleteTarget};
use crate::commands::grouper::GrouperOptions;
use crate::commands::output::Selector;
use crate::core::config::{Config, OutputConfig};
use crate::core::errors::{DupError, Result};

/// Canonical flag names, matched by unique leading prefix. Order is
/// insignificant; case is significant (`IncludePath`/`ExcludePath` are
/// deliberately distinct from `includeFile`/`excludeFile`, per spec §6).
const FLAG_NAMES: &[&str] = &[
    "includeFile",
    "excludeFile",
    "IncludePath",
    "ExcludePath",
    "regex",
    "justName",
    "ignoreExtn",
    "sameAll",
    "showDiff",
    "showMiss",
    "hideDup",
    "showAll",
    "invert",
    "preDup",
    "preDiff",
    "preMiss",
    "preDivider",
    "postDivider",
    "separator",
    "simple",
    "log",
    "delete",
    "n",
    "hardlink",
    "verbose",
    "quiet",
    "config",
    "jsonLog",
];

fn usage(details: impl Into<String>) -> DupError {
    DupError::UsageError {
        details: details.into(),
    }
}

fn resolve_flag(prefix: &str) -> Result<&'static str> {
    let matches: Vec<&'static str> = FLAG_NAMES
        .iter()
        .copied()
        .filter(|name| name.starts_with(prefix))
        .collect();
    match matches.as_slice() {
        [] => Err(usage(format!("unknown option -{prefix}"))),
        [only] => Ok(only),
        many => Err(usage(format!(
            "ambiguous option -{prefix} (matches {})",
            many.join(", ")
        ))),
    }
}

/// Decode the reference tool's output-string escapes: `\n`, `\t`, `\\`, a
/// two-digit hex byte `\xNN`, or up to three octal digits `\NNN`. Any other
/// backslash escape is passed through literally (backslash plus the char).
fn decode_escapes(input: &str) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some('x') => {
                let hex: String = (0..2).filter_map(|_| chars.next()).collect();
                let byte = u8::from_str_radix(&hex, 16)
                    .map_err(|_| usage(format!("invalid \\x escape in {input:?}")))?;
                out.push(byte as char);
            }
            Some(d) if d.is_digit(8) => {
                let mut octal = String::new();
                octal.push(d);
                for _ in 0..2 {
                    match chars.peek() {
                        Some(next) if next.is_digit(8) => {
                            octal.push(*next);
                            chars.next();
                        }
                        _ => break,
                    }
                }
                let byte = u8::from_str_radix(&octal, 8)
                    .map_err(|_| usage(format!("invalid octal escape in {input:?}")))?;
                out.push(byte as char);
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    Ok(out)
}

/// Which top-level command a resolved invocation should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Exactly two roots, `-sameAll` absent: the pairwise comparator (H).
    Pairwise,
    /// `-sameAll`, or any root count other than two: the equivalence grouper (I).
    Collecting,
}

/// Pattern lists ready for [`crate::scan::patterns::PatternFilter::compile`],
/// already merged with the config file's defaults (spec §11: CLI patterns
/// extend, not replace, the configured defaults).
#[derive(Debug, Clone, Default)]
pub struct FilterInputs {
    pub include_file: Vec<String>,
    pub exclude_file: Vec<String>,
    pub include_path: Vec<String>,
    pub exclude_path: Vec<String>,
    pub use_regex: bool,
}

/// A fully resolved invocation: everything needed to execute one run,
/// combining compiled-in defaults, an optional TOML config, and CLI flags
/// (lowest to highest precedence, per spec §11).
#[derive(Debug, Clone)]
pub struct Invocation {
    pub roots: Vec<PathBuf>,
    pub mode: Mode,
    pub filter_inputs: FilterInputs,
    pub comparator_options: ComparatorOptions,
    pub grouper_options: GrouperOptions,
    pub hashing: crate::core::config::HashingConfig,
    pub output: OutputConfig,
    pub quiet: bool,
    pub json_log_path: Option<PathBuf>,
}

#[derive(Default)]
struct RawArgs {
    include_file: Vec<String>,
    exclude_file: Vec<String>,
    include_path: Vec<String>,
    exclude_path: Vec<String>,
    use_regex: bool,
    just_name: bool,
    ignore_extn: bool,
    same_all: bool,
    show_diff: bool,
    show_miss: bool,
    hide_dup: bool,
    show_all: bool,
    invert: bool,
    pre_dup: Option<String>,
    pre_diff: Option<String>,
    pre_miss: Option<String>,
    pre_divider: Option<String>,
    post_divider: Option<String>,
    separator: Option<String>,
    simple: bool,
    log: Option<Selector>,
    delete: Option<DeleteTarget>,
    dry_run: bool,
    hardlink: bool,
    verbose: bool,
    quiet: bool,
    config_path: Option<PathBuf>,
    json_log_path: Option<PathBuf>,
    roots: Vec<String>,
}

impl RawArgs {
    fn apply(&mut self, canonical: &'static str, value: Option<&str>, original: &str) -> Result<()> {
        let require_value = |value: Option<&str>| -> Result<String> {
            value
                .map(str::to_string)
                .ok_or_else(|| usage(format!("{original} requires a value")))
        };
        let require_switch = |value: Option<&str>| -> Result<()> {
            if value.is_some() {
                return Err(usage(format!("{original} does not take a value")));
            }
            Ok(())
        };

        match canonical {
            "includeFile" => self.include_file.push(require_value(value)?),
            "excludeFile" => self.exclude_file.push(require_value(value)?),
            "IncludePath" => self.include_path.push(require_value(value)?),
            "ExcludePath" => self.exclude_path.push(require_value(value)?),
            "regex" => {
                require_switch(value)?;
                self.use_regex = true;
            }
            "justName" => {
                require_switch(value)?;
                self.just_name = true;
            }
            "ignoreExtn" => {
                require_switch(value)?;
                self.ignore_extn = true;
            }
            "sameAll" => {
                require_switch(value)?;
                self.same_all = true;
            }
            "showDiff" => {
                require_switch(value)?;
                self.show_diff = true;
            }
            "showMiss" => {
                require_switch(value)?;
                self.show_miss = true;
            }
            "hideDup" => {
                require_switch(value)?;
                self.hide_dup = true;
            }
            "showAll" => {
                require_switch(value)?;
                self.show_all = true;
            }
            "invert" => {
                require_switch(value)?;
                self.invert = true;
            }
            "preDup" => self.pre_dup = Some(require_value(value)?),
            "preDiff" => self.pre_diff = Some(require_value(value)?),
            "preMiss" => self.pre_miss = Some(require_value(value)?),
            "preDivider" => self.pre_divider = Some(require_value(value)?),
            "postDivider" => self.post_divider = Some(require_value(value)?),
            "separator" => self.separator = Some(require_value(value)?),
            "simple" => {
                require_switch(value)?;
                self.simple = true;
            }
            "log" => {
                let raw = require_value(value)?;
                self.log = Some(match raw.as_str() {
                    "1" => Selector::First,
                    "2" => Selector::Second,
                    other => return Err(usage(format!("-log must be 1 or 2, got {other:?}"))),
                });
            }
            "delete" => {
                let raw = require_value(value)?;
                self.delete = Some(match raw.as_str() {
                    "1" => DeleteTarget::First,
                    "2" => DeleteTarget::Second,
                    "both" => DeleteTarget::Both,
                    other => {
                        return Err(usage(format!(
                            "-delete must be 1, 2, or both, got {other:?}"
                        )));
                    }
                });
            }
            "n" => {
                require_switch(value)?;
                self.dry_run = true;
            }
            "hardlink" => {
                require_switch(value)?;
                self.hardlink = true;
            }
            "verbose" => {
                require_switch(value)?;
                self.verbose = true;
            }
            "quiet" => {
                require_switch(value)?;
                self.quiet = true;
            }
            "config" => self.config_path = Some(PathBuf::from(require_value(value)?)),
            "jsonLog" => self.json_log_path = Some(PathBuf::from(require_value(value)?)),
            other => return Err(usage(format!("unhandled option {other}"))),
        }
        Ok(())
    }
}

/// Parse and resolve `argv` (excluding `argv[0]`) into a runnable
/// [`Invocation`], loading the TOML config file as part of resolution.
pub fn parse(argv: &[String]) -> Result<Invocation> {
    let mut raw = RawArgs::default();
    let mut end_of_options = false;

    for arg in argv {
        if end_of_options {
            raw.roots.push(arg.clone());
            continue;
        }
        if arg == "--" {
            end_of_options = true;
            continue;
        }
        if arg.len() > 1 && arg.starts_with('-') {
            let rest = &arg[1..];
            let (name_part, value) = match rest.split_once('=') {
                Some((n, v)) => (n, Some(v)),
                None => (rest, None),
            };
            if name_part.is_empty() {
                return Err(usage(format!("empty option name in {arg:?}")));
            }
            let canonical = resolve_flag(name_part)?;
            raw.apply(canonical, value, arg)?;
        } else {
            raw.roots.push(arg.clone());
        }
    }

    resolve(raw)
}

fn expand_roots(roots: Vec<String>) -> Result<Vec<PathBuf>> {
    if roots.len() == 1 && roots[0] == "-" {
        let stdin = std::io::stdin();
        let mut out = Vec::new();
        for line in stdin.lock().lines() {
            let line = line.map_err(|source| DupError::io("-", source))?;
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                out.push(PathBuf::from(trimmed));
            }
        }
        return Ok(out);
    }
    Ok(roots.into_iter().map(PathBuf::from).collect())
}

fn resolve(raw: RawArgs) -> Result<Invocation> {
    let roots = expand_roots(raw.roots)?;
    if roots.is_empty() {
        return Err(DupError::NoInputs);
    }

    let config = Config::load(raw.config_path.as_deref())?;

    let mut filter_inputs = FilterInputs {
        include_file: config.patterns.default_include_file.clone(),
        exclude_file: config.patterns.default_exclude_file.clone(),
        include_path: config.patterns.default_include_path.clone(),
        exclude_path: config.patterns.default_exclude_path.clone(),
        use_regex: raw.use_regex,
    };
    filter_inputs.include_file.extend(raw.include_file);
    filter_inputs.exclude_file.extend(raw.exclude_file);
    filter_inputs.include_path.extend(raw.include_path);
    filter_inputs.exclude_path.extend(raw.exclude_path);

    let mut output = config.output.clone();
    if raw.simple {
        output.pre_dup = String::new();
        output.pre_diff = String::new();
        output.pre_miss = String::new();
        output.pre_divider = String::new();
        output.separator = " ".to_string();
        output.post_divider = "\n".to_string();
    }
    if let Some(v) = raw.pre_dup {
        output.pre_dup = decode_escapes(&v)?;
    }
    if let Some(v) = raw.pre_diff {
        output.pre_diff = decode_escapes(&v)?;
    }
    if let Some(v) = raw.pre_miss {
        output.pre_miss = decode_escapes(&v)?;
    }
    if let Some(v) = raw.pre_divider {
        output.pre_divider = decode_escapes(&v)?;
    }
    if let Some(v) = raw.post_divider {
        output.post_divider = decode_escapes(&v)?;
    }
    if let Some(v) = raw.separator {
        output.separator = decode_escapes(&v)?;
    }

    let (show_diff, show_miss, hide_dup) = if raw.show_all {
        (true, true, false)
    } else {
        (raw.show_diff, raw.show_miss, raw.hide_dup)
    };

    let comparator_options = ComparatorOptions {
        just_name: raw.just_name,
        show_diff,
        show_miss,
        hide_dup,
        invert: raw.invert,
        selector: raw.log.unwrap_or(Selector::Both),
        delete: raw.delete.unwrap_or_default(),
        dry_run: raw.dry_run,
        hardlink: raw.hardlink,
        verbose: raw.verbose,
    };

    let grouper_options = GrouperOptions {
        just_name: raw.just_name,
        ignore_extn: raw.ignore_extn,
        same_name: false,
        invert: raw.invert,
        verbose: raw.verbose,
    };

    let mode = if raw.same_all || roots.len() != 2 {
        Mode::Collecting
    } else {
        Mode::Pairwise
    };

    Ok(Invocation {
        roots,
        mode,
        filter_inputs,
        comparator_options,
        grouper_options,
        hashing: config.hashing,
        output,
        quiet: raw.quiet,
        json_log_path: raw.json_log_path,
    })
}
