//! Pairwise comparator (spec component H): the two-root verdict engine.
//!
//! Grounded in the reference `DupScan` class: for every `RelativeFile`
//! discovered under either root, probe lengths on both sides first (cheap),
//! only falling through to content hashing when the lengths agree. Missing
//! and different-by-length verdicts are resolved immediately from the walk;
//! duplicate/different-by-content verdicts depend on [`HashWorkerPool`]'s
//! asynchronous join. `run` records every relative file's walk position and
//! defers *all* emission to a final pass in that single walk order, so the
//! inline and hashed verdict streams cannot interleave differently between
//! runs — this is what keeps two runs over the same tree byte-identical
//! (spec P4).

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use crate::commands::output::{OutputWriter, Selector};
use crate::core::errors::Result;
use crate::hash::worker_pool::{HashWorkerPool, JobGroupResult};
use crate::scan::patterns::PatternFilter;
use crate::scan::walker::walk_relative_breadth;

/// Which file(s) a duplicate verdict should delete (spec §4.H side effects).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteTarget {
    /// No deletion side effect.
    #[default]
    None,
    /// Delete the copy under the first root.
    First,
    /// Delete the copy under the second root.
    Second,
    /// Delete both copies.
    Both,
}

/// Every flag that shapes comparator behaviour, already resolved from CLI +
/// config layering (spec §11) — the comparator itself makes no config
/// decisions, it only executes them.
#[derive(Debug, Clone)]
pub struct ComparatorOptions {
    /// `-justName`: a length match alone is a duplicate verdict; no hashing.
    pub just_name: bool,
    /// `-showDiff`.
    pub show_diff: bool,
    /// `-showMiss`.
    pub show_miss: bool,
    /// `-hideDup`.
    pub hide_dup: bool,
    /// `-invert`: flips which side of a *missing* verdict is printed.
    pub invert: bool,
    /// `-log=1|2`: restrict printed paths to one side; `Both` is the default.
    pub selector: Selector,
    /// `-delete=1|2`/`both`, fired on a *duplicate* verdict.
    pub delete: DeleteTarget,
    /// `-n`: print mutations instead of performing them.
    pub dry_run: bool,
    /// `-hardlink`: reserved/unimplemented (spec §9); accepted, warned, no-op.
    pub hardlink: bool,
    /// `-verbose`: stat-line detail (currently unused by the comparator's own
    /// output, which is always one line per verdict; kept for symmetry with
    /// [`crate::commands::grouper::GrouperOptions`]).
    pub verbose: bool,
}

impl Default for ComparatorOptions {
    fn default() -> Self {
        Self {
            just_name: false,
            show_diff: false,
            show_miss: false,
            hide_dup: false,
            invert: false,
            selector: Selector::Both,
            delete: DeleteTarget::None,
            dry_run: false,
            hardlink: false,
            verbose: false,
        }
    }
}

/// Final verdict tallies (spec §3 `Counters`), summed for the run summary and
/// checked by the `sameCnt + diffCnt + missCnt + skipCnt` invariant (P3).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    /// Files with identical content (or, in `justName` mode, identical name/length).
    pub same: usize,
    /// Files present on both sides with differing content/length.
    pub diff: usize,
    /// Files present on exactly one side.
    pub miss: usize,
    /// Files rejected by the pattern filter.
    pub skip: usize,
}

/// One relative file's outcome, recorded at walk time and held until the
/// final ordered emission pass so that inline and hashed verdicts cannot
/// interleave differently across runs.
enum Pending {
    Missing { have1: bool, path1: PathBuf, path2: PathBuf },
    Different { path1: PathBuf, path2: PathBuf },
    Duplicate { path1: PathBuf, path2: PathBuf },
    Hashed { relative_file: String },
}

/// Two-root pairwise comparator.
pub struct Comparator<'a> {
    root1: PathBuf,
    root2: PathBuf,
    filter: &'a PatternFilter,
    pool: &'a HashWorkerPool,
    options: ComparatorOptions,
    hash_failures: RefCell<Vec<PathBuf>>,
}

impl<'a> Comparator<'a> {
    /// Bind a comparator to exactly two roots for the run's duration.
    #[must_use]
    pub fn new(
        root1: PathBuf,
        root2: PathBuf,
        filter: &'a PatternFilter,
        pool: &'a HashWorkerPool,
        options: ComparatorOptions,
    ) -> Self {
        Self {
            root1,
            root2,
            filter,
            pool,
            options,
            hash_failures: RefCell::new(Vec::new()),
        }
    }

    /// Paths that could not be hashed during the last [`Comparator::run`]
    /// call (spec §7 kind 4): the worker pool recorded a zero-hash fallback
    /// for each. Populated as a side effect of `run`; call after it returns.
    #[must_use]
    pub fn hash_failures(&self) -> Vec<PathBuf> {
        self.hash_failures.borrow().clone()
    }

    /// Run the full comparison, writing verdict lines to `out` and returning
    /// the final tallies.
    ///
    /// Two passes: the first walks the tree, resolving inline verdicts
    /// (missing, different-by-length) immediately and admitting a hash job
    /// for every length-matched pair, but holding every verdict — inline or
    /// hashed — in `pending` rather than writing it. The second pass, once
    /// every admitted hash job has joined, walks `pending` in that same walk
    /// order and emits each verdict. This total ordering is what makes output
    /// order independent of worker-thread completion timing (spec P4).
    pub fn run(&self, out: &mut dyn std::io::Write, writer: &OutputWriter, aborted: &AtomicBool) -> Result<Counts> {
        let mut counts = Counts::default();
        let roots = [self.root1.clone(), self.root2.clone()];
        let relative_files = walk_relative_breadth(&roots, self.filter, aborted);

        let mut pending = Vec::with_capacity(relative_files.len());
        let mut hash_results: HashMap<String, JobGroupResult> = HashMap::new();

        for relative_file in &relative_files {
            if aborted.load(std::sync::atomic::Ordering::Relaxed) {
                break;
            }

            let path1 = self.root1.join(relative_file);
            let path2 = self.root2.join(relative_file);
            let len1 = std::fs::metadata(&path1).ok().map(|m| m.len());
            let len2 = std::fs::metadata(&path2).ok().map(|m| m.len());

            match (len1, len2) {
                (None, None) => {}
                (Some(_), None) => pending.push(Pending::Missing { have1: true, path1, path2 }),
                (None, Some(_)) => pending.push(Pending::Missing { have1: false, path1, path2 }),
                (Some(l1), Some(l2)) if l1 != l2 => pending.push(Pending::Different { path1, path2 }),
                (Some(_), Some(_)) if self.options.just_name => {
                    pending.push(Pending::Duplicate { path1, path2 });
                }
                (Some(_), Some(_)) => {
                    for group in self.pool.find_dups_async(&roots, relative_file) {
                        hash_results.insert(group.relative_file.clone(), group);
                    }
                    pending.push(Pending::Hashed {
                        relative_file: relative_file.clone(),
                    });
                }
            }
        }

        if !self.options.just_name {
            for group in self.pool.wait_for_async() {
                hash_results.insert(group.relative_file.clone(), group);
            }
        }

        if self.options.hardlink {
            eprintln!("dup: warning: -hardlink is reserved and not implemented; ignoring");
        }

        for item in pending {
            match item {
                Pending::Missing { have1, path1, path2 } => {
                    self.emit_missing(out, writer, have1, &path1, &path2, &mut counts)?;
                }
                Pending::Different { path1, path2 } => {
                    self.emit_different(out, writer, &path1, &path2, &mut counts)?;
                }
                Pending::Duplicate { path1, path2 } => {
                    self.emit_duplicate(out, writer, &path1, &path2, &mut counts)?;
                }
                Pending::Hashed { relative_file } => {
                    if let Some(group) = hash_results.remove(&relative_file) {
                        self.emit_hash_result(&group, out, writer, &mut counts)?;
                    }
                }
            }
        }

        counts.skip = self.filter.skip_count();
        Ok(counts)
    }

    fn emit_hash_result(
        &self,
        group: &JobGroupResult,
        out: &mut dyn std::io::Write,
        writer: &OutputWriter,
        counts: &mut Counts,
    ) -> Result<()> {
        let h1 = &group.hashes[0];
        let h2 = &group.hashes[1];
        if !h1.ok {
            eprintln!("dup: warning: could not hash {}, treating as zero-hash", h1.path.display());
            self.hash_failures.borrow_mut().push(h1.path.clone());
        }
        if !h2.ok {
            eprintln!("dup: warning: could not hash {}, treating as zero-hash", h2.path.display());
            self.hash_failures.borrow_mut().push(h2.path.clone());
        }
        if h1.hash == h2.hash {
            self.emit_duplicate(out, writer, &h1.path, &h2.path, counts)
        } else {
            self.emit_different(out, writer, &h1.path, &h2.path, counts)
        }
    }

    fn emit_duplicate(
        &self,
        out: &mut dyn std::io::Write,
        writer: &OutputWriter,
        path1: &Path,
        path2: &Path,
        counts: &mut Counts,
    ) -> Result<()> {
        counts.same += 1;
        if !self.options.hide_dup {
            writer
                .write_duplicate(out, path1, path2, self.options.selector)
                .map_err(|source| crate::core::errors::DupError::io(path1, source))?;
        }
        self.apply_side_effects(path1, path2);
        Ok(())
    }

    fn emit_different(
        &self,
        out: &mut dyn std::io::Write,
        writer: &OutputWriter,
        path1: &Path,
        path2: &Path,
        counts: &mut Counts,
    ) -> Result<()> {
        counts.diff += 1;
        if self.options.show_diff {
            writer
                .write_different(out, path1, path2, self.options.selector)
                .map_err(|source| crate::core::errors::DupError::io(path1, source))?;
        }
        Ok(())
    }

    fn emit_missing(
        &self,
        out: &mut dyn std::io::Write,
        writer: &OutputWriter,
        have1: bool,
        path1: &Path,
        path2: &Path,
        counts: &mut Counts,
    ) -> Result<()> {
        counts.miss += 1;
        if self.options.show_miss {
            writer
                .write_missing(out, have1, path1, path2, self.options.invert)
                .map_err(|source| crate::core::errors::DupError::io(path1, source))?;
        }
        Ok(())
    }

    /// Fire the delete side effect for a duplicate verdict (spec §4.H). The
    /// `-hardlink` reserved-feature warning is emitted once at the start of
    /// [`Comparator::run`], not per verdict.
    fn apply_side_effects(&self, path1: &Path, path2: &Path) {
        match self.options.delete {
            DeleteTarget::None => {}
            DeleteTarget::First => self.delete_one(path1),
            DeleteTarget::Second => self.delete_one(path2),
            DeleteTarget::Both => {
                self.delete_one(path1);
                self.delete_one(path2);
            }
        }
    }

    fn delete_one(&self, path: &Path) {
        if self.options.dry_run {
            eprintln!("dup: (dry run) would delete {}", path.display());
            return;
        }
        if let Err(source) = std::fs::remove_file(path) {
            eprintln!("dup: failed to delete {}: {source}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{HashingConfig, OutputConfig};
    use std::sync::atomic::AtomicBool;

    fn pool() -> HashWorkerPool {
        HashWorkerPool::new(&HashingConfig {
            max_threads: 2,
            num_buffers: 4,
            buffer_size: 4096,
        })
    }

    fn no_abort() -> AtomicBool {
        AtomicBool::new(false)
    }

    #[test]
    fn identical_files_emit_one_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let root1 = dir.path().join("a");
        let root2 = dir.path().join("b");
        std::fs::create_dir_all(&root1).unwrap();
        std::fs::create_dir_all(&root2).unwrap();
        std::fs::write(root1.join("x"), vec![7u8; 512]).unwrap();
        std::fs::write(root2.join("x"), vec![7u8; 512]).unwrap();
        std::fs::write(root1.join("y"), vec![1u8; 512]).unwrap();
        std::fs::write(root2.join("y"), vec![2u8; 512]).unwrap();

        let filter = PatternFilter::accept_all();
        let pool = pool();
        let output_cfg = OutputConfig {
            pre_dup: String::new(),
            pre_diff: String::new(),
            pre_miss: String::new(),
            pre_divider: String::new(),
            post_divider: "\n".to_string(),
            separator: " ".to_string(),
        };
        let writer = OutputWriter::new(&output_cfg);
        let options = ComparatorOptions {
            show_diff: true,
            ..ComparatorOptions::default()
        };
        let comparator = Comparator::new(root1, root2, &filter, &pool, options);

        let mut buf = Vec::new();
        let counts = comparator.run(&mut buf, &writer, &no_abort()).unwrap();
        assert_eq!(counts.same, 1);
        assert_eq!(counts.diff, 1);
        assert_eq!(counts.miss, 0);
    }

    #[test]
    fn missing_file_is_reported_with_show_miss() {
        let dir = tempfile::tempdir().unwrap();
        let root1 = dir.path().join("a");
        let root2 = dir.path().join("b");
        std::fs::create_dir_all(&root1).unwrap();
        std::fs::create_dir_all(&root2).unwrap();
        std::fs::write(root1.join("only.txt"), b"hi").unwrap();

        let filter = PatternFilter::accept_all();
        let pool = pool();
        let output_cfg = OutputConfig {
            pre_dup: String::new(),
            pre_diff: String::new(),
            pre_miss: "MISS ".to_string(),
            pre_divider: String::new(),
            post_divider: "\n".to_string(),
            separator: " ".to_string(),
        };
        let writer = OutputWriter::new(&output_cfg);
        let options = ComparatorOptions {
            show_miss: true,
            ..ComparatorOptions::default()
        };
        let comparator = Comparator::new(root1.clone(), root2, &filter, &pool, options);

        let mut buf = Vec::new();
        let counts = comparator.run(&mut buf, &writer, &no_abort()).unwrap();
        assert_eq!(counts.miss, 1);
        let printed = String::from_utf8(buf).unwrap();
        assert!(printed.contains("only.txt"));
        assert!(printed.starts_with("MISS "));
    }

    #[test]
    fn just_name_mode_skips_hashing_on_length_match() {
        let dir = tempfile::tempdir().unwrap();
        let root1 = dir.path().join("a");
        let root2 = dir.path().join("b");
        std::fs::create_dir_all(&root1).unwrap();
        std::fs::create_dir_all(&root2).unwrap();
        std::fs::write(root1.join("f"), vec![9u8; 64]).unwrap();
        std::fs::write(root2.join("f"), vec![0u8; 64]).unwrap();

        let filter = PatternFilter::accept_all();
        let pool = pool();
        let output_cfg = OutputConfig {
            pre_dup: String::new(),
            pre_diff: String::new(),
            pre_miss: String::new(),
            pre_divider: String::new(),
            post_divider: "\n".to_string(),
            separator: " ".to_string(),
        };
        let writer = OutputWriter::new(&output_cfg);
        let options = ComparatorOptions {
            just_name: true,
            ..ComparatorOptions::default()
        };
        let comparator = Comparator::new(root1, root2, &filter, &pool, options);

        let mut buf = Vec::new();
        let counts = comparator.run(&mut buf, &writer, &no_abort()).unwrap();
        assert_eq!(counts.same, 1, "justName treats equal lengths as duplicate without hashing");
    }

    #[test]
    fn dry_run_delete_leaves_files_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let root1 = dir.path().join("a");
        let root2 = dir.path().join("b");
        std::fs::create_dir_all(&root1).unwrap();
        std::fs::create_dir_all(&root2).unwrap();
        let p1 = root1.join("x");
        let p2 = root2.join("x");
        std::fs::write(&p1, b"same").unwrap();
        std::fs::write(&p2, b"same").unwrap();

        let filter = PatternFilter::accept_all();
        let pool = pool();
        let output_cfg = OutputConfig {
            pre_dup: String::new(),
            pre_diff: String::new(),
            pre_miss: String::new(),
            pre_divider: String::new(),
            post_divider: "\n".to_string(),
            separator: " ".to_string(),
        };
        let writer = OutputWriter::new(&output_cfg);
        let options = ComparatorOptions {
            delete: DeleteTarget::First,
            dry_run: true,
            ..ComparatorOptions::default()
        };
        let comparator = Comparator::new(root1, root2, &filter, &pool, options);

        let mut buf = Vec::new();
        comparator.run(&mut buf, &writer, &no_abort()).unwrap();
        assert!(p1.exists(), "dry run must not delete the first root's copy");
        assert!(p2.exists());
    }

    /// Regression test for the ordering bug where inline verdicts (missing,
    /// different-by-length) and hashed verdicts (duplicate, different-by-
    /// content) were emitted on two separate streams that could interleave
    /// differently depending on worker-thread completion timing. Every
    /// verdict must now follow the single walk order, making two runs over
    /// the same mixed tree byte-identical (spec P4).
    #[test]
    fn mixed_inline_and_hashed_verdicts_are_order_deterministic_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let root1 = dir.path().join("a");
        let root2 = dir.path().join("b");
        std::fs::create_dir_all(&root1).unwrap();
        std::fs::create_dir_all(&root2).unwrap();

        for i in 0..12 {
            let content = vec![(i % 251) as u8; 4096];
            std::fs::write(root1.join(format!("hash{i}.bin")), &content).unwrap();
            std::fs::write(root2.join(format!("hash{i}.bin")), &content).unwrap();
        }
        std::fs::write(root1.join("len-diff.bin"), vec![1u8; 64]).unwrap();
        std::fs::write(root2.join("len-diff.bin"), vec![1u8; 128]).unwrap();
        std::fs::write(root1.join("only-in-a.bin"), b"solo").unwrap();

        let filter = PatternFilter::accept_all();
        let output_cfg = OutputConfig {
            pre_dup: String::new(),
            pre_diff: "DIFF ".to_string(),
            pre_miss: "MISS ".to_string(),
            pre_divider: String::new(),
            post_divider: "\n".to_string(),
            separator: " ".to_string(),
        };
        let writer = OutputWriter::new(&output_cfg);

        let run_once = || {
            let pool = HashWorkerPool::new(&HashingConfig {
                max_threads: 1,
                num_buffers: 2,
                buffer_size: 4096,
            });
            let options = ComparatorOptions {
                show_diff: true,
                show_miss: true,
                ..ComparatorOptions::default()
            };
            let comparator = Comparator::new(root1.clone(), root2.clone(), &filter, &pool, options);
            let mut buf = Vec::new();
            comparator.run(&mut buf, &writer, &no_abort()).unwrap();
            String::from_utf8(buf).unwrap()
        };

        let first = run_once();
        let second = run_once();
        assert_eq!(first, second, "verdict order must not depend on hash completion timing");
    }
}
