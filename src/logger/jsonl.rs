//! JSONL event logger: one self-contained JSON object per line.
//!
//! Grounded in the reference daemon's `logger/jsonl.rs`, trimmed for a
//! short-lived CLI run rather than a long-lived daemon: no rotation (a single
//! `dup` invocation never writes enough to need it) and a two-level fallback
//! chain instead of four (primary file, then stderr; there is no RAM-backed
//! fallback path or periodic recovery to schedule for a process that exits
//! when the scan finishes).
//!
//! Entirely optional: [`EventLogger::disabled`] is the default, and every
//! call becomes a no-op when no `-jsonLog=PATH` flag was given.

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Severity level for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Event types emitted over the lifetime of one run (spec §12).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ScanStart,
    ScanComplete,
    PatternError,
    HashFailure,
    Mutation,
    Aborted,
}

/// A single JSONL log entry. Only `ts`, `event`, `severity` are mandatory;
/// everything else is populated as the event warrants.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub ts: String,
    pub event: EventType,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roots: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub same: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub miss: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEntry {
    #[must_use]
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: format_utc_now(),
            event,
            severity,
            path: None,
            roots: None,
            same: None,
            diff: None,
            miss: None,
            skip: None,
            pattern: None,
            details: None,
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_roots(mut self, roots: Vec<String>) -> Self {
        self.roots = Some(roots);
        self
    }

    #[must_use]
    pub fn with_counts(mut self, same: usize, diff: usize, miss: usize, skip: usize) -> Self {
        self.same = Some(same);
        self.diff = Some(diff);
        self.miss = Some(miss);
        self.skip = Some(skip);
        self
    }

    #[must_use]
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Normal,
    Stderr,
    Discard,
}

/// Event logger bound to at most one JSONL output file for a run's duration.
pub struct EventLogger {
    writer: Option<BufWriter<File>>,
    state: WriterState,
}

impl EventLogger {
    /// A logger that discards every event: the default when `-jsonLog` is absent.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            writer: None,
            state: WriterState::Discard,
        }
    }

    /// Open `path` for appending, falling back to stderr if that fails.
    #[must_use]
    pub fn open(path: &Path) -> Self {
        match open_append(path) {
            Ok(file) => Self {
                writer: Some(BufWriter::new(file)),
                state: WriterState::Normal,
            },
            Err(source) => {
                let _ = writeln!(
                    io::stderr(),
                    "dup: warning: could not open -jsonLog path {}: {source}",
                    path.display()
                );
                Self {
                    writer: None,
                    state: WriterState::Stderr,
                }
            }
        }
    }

    /// Append one event as a single JSON line.
    pub fn log(&mut self, entry: LogEntry) {
        let line = match serde_json::to_string(&entry) {
            Ok(json) => json,
            Err(e) => {
                let _ = writeln!(io::stderr(), "dup: warning: failed to serialize log entry: {e}");
                return;
            }
        };

        match self.state {
            WriterState::Normal => {
                if let Some(w) = self.writer.as_mut() {
                    if writeln!(w, "{line}").is_err() {
                        self.state = WriterState::Stderr;
                        self.writer = None;
                        eprintln!("[dup-jsonlog] {line}");
                    }
                }
            }
            WriterState::Stderr => eprintln!("[dup-jsonlog] {line}"),
            WriterState::Discard => {}
        }
    }

    /// Flush buffered output, if any.
    pub fn flush(&mut self) {
        if let Some(w) = self.writer.as_mut() {
            let _ = w.flush();
        }
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}

fn format_utc_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_logger_never_writes() {
        let mut logger = EventLogger::disabled();
        logger.log(LogEntry::new(EventType::ScanStart, Severity::Info));
        logger.flush();
    }

    #[test]
    fn open_writes_one_json_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.jsonl");
        let mut logger = EventLogger::open(&path);

        logger.log(
            LogEntry::new(EventType::ScanComplete, Severity::Info).with_counts(3, 1, 0, 2),
        );
        logger.flush();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 1);
        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["event"], "scan_complete");
        assert_eq!(parsed["same"], 3);
    }

    #[test]
    fn optional_fields_omitted_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sparse.jsonl");
        let mut logger = EventLogger::open(&path);
        logger.log(LogEntry::new(EventType::ScanStart, Severity::Info));
        logger.flush();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(!contents.contains("\"path\""));
        assert!(!contents.contains("\"same\""));
    }

    #[test]
    fn multiple_entries_produce_multiple_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("multi.jsonl");
        let mut logger = EventLogger::open(&path);
        for _ in 0..4 {
            logger.log(LogEntry::new(EventType::Mutation, Severity::Warning));
        }
        logger.flush();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 4);
    }

    #[test]
    fn pattern_error_entry_round_trips_pattern_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pat.jsonl");
        let mut logger = EventLogger::open(&path);
        logger.log(
            LogEntry::new(EventType::PatternError, Severity::Error)
                .with_pattern("(unterminated")
                .with_details("regex parse error"),
        );
        logger.flush();

        let contents = fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
        assert_eq!(parsed["pattern"], "(unterminated");
    }
}
