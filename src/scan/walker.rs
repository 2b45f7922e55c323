//! Recursive walker (spec component G): depth-first single-root file discovery
//! used by the N-root equivalence grouper.
//!
//! Grounded in the reference `InspectFiles` recursion: offer the root directly
//! if it is itself a regular file, otherwise descend depth-first, invoking
//! the callback for every admitted regular file. Unreadable directories are
//! skipped, not fatal; a single process-wide abort flag is polled so a long
//! walk can be cut short between entries.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::core::paths::split_name;
use crate::scan::patterns::PatternFilter;

/// Walk `root` depth-first, invoking `on_file` for every admitted regular
/// file reachable from it. `aborted` is checked after every directory entry;
/// once set, the walk returns without visiting further entries.
///
/// `stat` failures and unreadable directories are skipped silently rather
/// than treated as errors: a single permission-denied subtree should not
/// abort discovery under every other root.
pub fn walk(root: &Path, filter: &PatternFilter, aborted: &AtomicBool, on_file: &mut dyn FnMut(&Path)) {
    let Ok(meta) = std::fs::metadata(root) else {
        return;
    };

    if meta.is_file() {
        offer(root, filter, on_file);
        return;
    }

    if !meta.is_dir() {
        return;
    }

    walk_dir(root, filter, aborted, on_file);
}

fn walk_dir(dir: &Path, filter: &PatternFilter, aborted: &AtomicBool, on_file: &mut dyn FnMut(&Path)) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        if aborted.load(Ordering::Relaxed) {
            return;
        }

        let path = entry.path();
        let Ok(meta) = std::fs::metadata(&path) else {
            continue;
        };

        if meta.is_dir() {
            walk_dir(&path, filter, aborted, on_file);
        } else if meta.is_file() {
            offer(&path, filter, on_file);
        }
    }
}

fn offer(path: &Path, filter: &PatternFilter, on_file: &mut dyn FnMut(&Path)) {
    let full_path = path.to_string_lossy();
    let (_, name) = split_name(&full_path);
    if filter.valid_file(name, &full_path) {
        on_file(path);
    }
}

/// Convenience over [`walk`] that collects every admitted path into a `Vec`,
/// for callers (tests, the single-root grouper) that don't need streaming.
#[must_use]
pub fn walk_collect(root: &Path, filter: &PatternFilter, aborted: &AtomicBool) -> Vec<PathBuf> {
    let mut out = Vec::new();
    walk(root, filter, aborted, &mut |path| out.push(path.to_path_buf()));
    out
}

/// Discover every admitted [`RelativeFile`](crate::commands::comparator) name
/// reachable from any of `roots`, level-by-level across the whole root set
/// (spec §4.H): all roots' top-level children are offered before any of
/// their subdirectories are descended into, so a file at depth *d* under
/// `roots[0]` is discovered in the same pass as the same-named file at depth
/// *d* under `roots[1]`, regardless of which root's subtree is larger.
///
/// Relative names are deduplicated across roots (a name appearing under two
/// roots is one identity, not two) and returned in first-seen order, which is
/// root order at the outermost level and directory-iteration order below
/// that — stable within a run, matching the walker's general ordering
/// contract.
///
/// A relative name is offered to the filter at most once, no matter how many
/// roots contain it: a rejection under one root's copy is remembered in
/// `rejected_files` so a later root's copy of the same name is not re-tested
/// (and does not inflate the filter's skip count a second time — the skip
/// tally is meant to count distinct relative files, matching how same/diff/
/// miss each count a relative file exactly once).
///
/// A root that is itself a regular file is treated as a single-entry root
/// whose one file has the empty-string relative name joined with its own
/// file name, so two single-file roots still compare by name.
#[must_use]
pub fn walk_relative_breadth(
    roots: &[PathBuf],
    filter: &PatternFilter,
    aborted: &AtomicBool,
) -> Vec<String> {
    let mut results = Vec::new();
    let mut seen_files: std::collections::HashSet<String> = std::collections::HashSet::new();
    let mut rejected_files: std::collections::HashSet<String> = std::collections::HashSet::new();
    let mut level: VecDeque<String> = VecDeque::new();
    level.push_back(String::new());

    let mut offer = |rel_name: String,
                      full_path: &Path,
                      seen_files: &mut std::collections::HashSet<String>,
                      rejected_files: &mut std::collections::HashSet<String>,
                      results: &mut Vec<String>| {
        if seen_files.contains(&rel_name) || rejected_files.contains(&rel_name) {
            return;
        }
        let (_, name) = split_name(&rel_name);
        if filter.valid_file(name, &full_path.to_string_lossy()) {
            seen_files.insert(rel_name.clone());
            results.push(rel_name);
        } else {
            rejected_files.insert(rel_name);
        }
    };

    while let Some(rel_dir) = level.pop_front() {
        if aborted.load(Ordering::Relaxed) {
            break;
        }

        let mut next_dirs = Vec::new();
        let mut seen_subdirs: std::collections::HashSet<String> = std::collections::HashSet::new();

        for root in roots {
            let full_dir = if rel_dir.is_empty() {
                root.clone()
            } else {
                root.join(&rel_dir)
            };

            let Ok(meta) = std::fs::metadata(&full_dir) else {
                continue;
            };

            if meta.is_file() {
                if rel_dir.is_empty() {
                    let name = full_dir
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    offer(name, &full_dir, &mut seen_files, &mut rejected_files, &mut results);
                }
                continue;
            }

            let Ok(entries) = std::fs::read_dir(&full_dir) else {
                continue;
            };

            for entry in entries.flatten() {
                if aborted.load(Ordering::Relaxed) {
                    return results;
                }
                let Ok(entry_meta) = entry.metadata() else {
                    continue;
                };
                let entry_path = entry.path();
                let entry_name = entry.file_name().to_string_lossy().into_owned();
                let rel_name = if rel_dir.is_empty() {
                    entry_name.clone()
                } else {
                    format!("{rel_dir}{}{entry_name}", std::path::MAIN_SEPARATOR)
                };

                if entry_meta.is_dir() {
                    if seen_subdirs.insert(rel_name.clone()) {
                        next_dirs.push(rel_name);
                    }
                } else if entry_meta.is_file() {
                    offer(rel_name, &entry_path, &mut seen_files, &mut rejected_files, &mut results);
                }
            }
        }

        for dir in next_dirs {
            level.push_back(dir);
        }
    }

    results
}
