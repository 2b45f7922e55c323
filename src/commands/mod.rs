//! The two top-level commands: the pairwise comparator (H) and the
//! equivalence grouper (I), plus the output formatter (N) they share.

pub mod comparator;
pub mod grouper;
pub mod output;

pub use comparator::{Comparator, ComparatorOptions, Counts, DeleteTarget};
pub use grouper::{Group, Grouper, GrouperOptions};
pub use output::{OutputWriter, Selector};
