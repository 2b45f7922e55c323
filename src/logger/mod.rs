//! Structured run logging (spec component M): a JSONL event log, inert
//! unless `-jsonLog=PATH` is given.

pub mod jsonl;

pub use jsonl::{EventLogger, EventType, LogEntry, Severity};
