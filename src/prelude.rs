//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use dup::prelude::*;
//! ```

pub use crate::cli::args::{FilterInputs, Invocation, Mode};
pub use crate::commands::{Comparator, ComparatorOptions, Counts, DeleteTarget};
pub use crate::commands::{Group, Grouper, GrouperOptions};
pub use crate::commands::{OutputWriter, Selector};
pub use crate::core::config::Config;
pub use crate::core::errors::{DupError, Result};
pub use crate::hash::HashWorkerPool;
pub use crate::logger::{EventLogger, EventType, LogEntry, Severity};
pub use crate::scan::{PatternFilter, walk, walk_collect, walk_relative_breadth};
