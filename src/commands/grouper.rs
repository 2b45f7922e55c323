//! Equivalence grouper (spec component I): N-root collecting mode.
//!
//! Grounded in the reference `DupFiles` class: files are accumulated into an
//! in-memory `fileList: name -> [pathIndex]` index as they are discovered,
//! then clustered into duplicate groups in one pass at `end()`, using the
//! algorithm selected by `(justName, ignoreExtn, sameName)`. The directory
//! prefix interning (`PathList`) mirrors the reference `pathList`/`lastPath`
//! cache, which exploits the walker's depth-first locality to keep `add()`
//! at amortised O(1) memory per file.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::core::paths::{split_extension, split_name};
use crate::hash::primitive::hash_path_bytes;
use crate::hash::worker_pool::HashWorkerPool;

/// Interns directory prefixes so [`FileRecord`] can store an index instead of
/// a repeated `PathBuf`. A one-slot "last prefix" cache absorbs the common
/// case of many consecutive files sharing a directory during a depth-first
/// walk, matching the reference tool's `lastPath`/`lastIndex` shortcut.
#[derive(Default)]
struct PathList {
    prefixes: Vec<PathBuf>,
    index_of: HashMap<PathBuf, usize>,
    last: Option<usize>,
}

impl PathList {
    fn intern(&mut self, dir: &Path) -> usize {
        if let Some(i) = self.last {
            if self.prefixes[i] == dir {
                return i;
            }
        }
        if let Some(&i) = self.index_of.get(dir) {
            self.last = Some(i);
            return i;
        }
        let i = self.prefixes.len();
        self.prefixes.push(dir.to_path_buf());
        self.index_of.insert(dir.to_path_buf(), i);
        self.last = Some(i);
        i
    }

    fn resolve(&self, index: usize, name: &str) -> PathBuf {
        self.prefixes[index].join(name)
    }
}

struct FileRecord {
    name: String,
    path_index: usize,
}

/// Flags selecting the grouper's sub-algorithm (spec §4.I) and output shape.
#[derive(Debug, Clone, Default)]
pub struct GrouperOptions {
    /// `-justName`: group by name alone, content unread.
    pub just_name: bool,
    /// `-ignoreExtn`: combined with `just_name`, strip extensions before grouping.
    pub ignore_extn: bool,
    /// Group by (name, content-hash) instead of the full general algorithm.
    /// Not currently exposed as its own CLI flag (see DESIGN.md); `general`
    /// is used whenever `just_name` is unset, which is a superset of this
    /// mode's results.
    pub same_name: bool,
    /// `-invert`: emit singletons (unique files) instead of duplicate groups.
    pub invert: bool,
    /// `-verbose`: per-file stat line instead of a joined group line.
    pub verbose: bool,
}

/// One emitted equivalence class: two or more paths considered the same
/// (content-equal, or name-equal in `justName` mode) — or, under `invert`, a
/// single unique path.
pub type Group = Vec<PathBuf>;

/// N-root equivalence grouper.
#[derive(Default)]
pub struct Grouper {
    path_list: PathList,
    by_name: HashMap<String, Vec<usize>>,
    records: Vec<FileRecord>,
    hash_failures: RefCell<Vec<PathBuf>>,
}

impl Grouper {
    /// Fresh, empty grouper.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit one file, as discovered by the walker (component G).
    pub fn add(&mut self, full_path: &Path) {
        let full = full_path.to_string_lossy();
        let (dir, name) = split_name(&full);
        let path_index = self.path_list.intern(Path::new(dir));
        let record_index = self.records.len();
        self.records.push(FileRecord {
            name: name.to_string(),
            path_index,
        });
        self.by_name
            .entry(name.to_string())
            .or_default()
            .push(record_index);
    }

    /// Total files admitted so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether any file has been admitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn path_of(&self, record_index: usize) -> PathBuf {
        let record = &self.records[record_index];
        self.path_list.resolve(record.path_index, &record.name)
    }

    /// Paths that could not be hashed during the last [`Grouper::end`] call
    /// (spec §7 kind 4): the worker pool recorded a zero-hash fallback for
    /// each. Populated as a side effect of `end`; call after it returns.
    #[must_use]
    pub fn hash_failures(&self) -> Vec<PathBuf> {
        self.hash_failures.borrow().clone()
    }

    /// Run the selected sub-algorithm and return the emitted groups, in the
    /// order their identity (name, size, or hash) was first encountered.
    #[must_use]
    pub fn end(&self, options: &GrouperOptions, pool: &HashWorkerPool) -> Vec<Group> {
        if options.just_name && options.ignore_extn {
            return self.end_just_name_ignore_extn(options.invert);
        }
        if options.just_name {
            return self.end_just_name(options.invert);
        }
        if options.same_name {
            return self.end_same_name(options.invert, pool);
        }
        self.end_general(options.invert, pool)
    }

    fn emit_or_invert(buckets: Vec<Vec<PathBuf>>, invert: bool) -> Vec<Group> {
        buckets
            .into_iter()
            .filter(|bucket| if invert { bucket.len() == 1 } else { bucket.len() >= 2 })
            .collect()
    }

    fn end_just_name(&self, invert: bool) -> Vec<Group> {
        let mut order: Vec<&str> = Vec::new();
        let mut seen: std::collections::HashSet<&str> = std::collections::HashSet::new();
        for record in &self.records {
            if seen.insert(record.name.as_str()) {
                order.push(record.name.as_str());
            }
        }

        let buckets: Vec<Vec<PathBuf>> = order
            .into_iter()
            .map(|name| {
                self.by_name[name]
                    .iter()
                    .map(|&idx| self.path_of(idx))
                    .collect()
            })
            .collect();

        Self::emit_or_invert(buckets, invert)
    }

    fn end_just_name_ignore_extn(&self, invert: bool) -> Vec<Group> {
        let mut by_stem: HashMap<String, Vec<usize>> = HashMap::new();
        let mut order: Vec<String> = Vec::new();
        for (i, record) in self.records.iter().enumerate() {
            let (stem, _) = split_extension(&record.name);
            if !by_stem.contains_key(stem) {
                order.push(stem.to_string());
            }
            by_stem.entry(stem.to_string()).or_default().push(i);
        }

        let buckets: Vec<Vec<PathBuf>> = order
            .into_iter()
            .map(|stem| by_stem[&stem].iter().map(|&idx| self.path_of(idx)).collect())
            .collect();

        Self::emit_or_invert(buckets, invert)
    }

    fn end_same_name(&self, invert: bool, pool: &HashWorkerPool) -> Vec<Group> {
        let mut order: Vec<&str> = Vec::new();
        let mut seen: std::collections::HashSet<&str> = std::collections::HashSet::new();
        for record in &self.records {
            if seen.insert(record.name.as_str()) {
                order.push(record.name.as_str());
            }
        }

        let mut buckets = Vec::new();
        for name in order {
            let indices = &self.by_name[name];
            if indices.len() < 2 {
                if invert {
                    buckets.push(vec![self.path_of(indices[0])]);
                }
                continue;
            }

            let paths: Vec<PathBuf> = indices.iter().map(|&idx| self.path_of(idx)).collect();
            let hashes = hash_paths(pool, &paths, &self.hash_failures);

            let mut by_hash: HashMap<u64, Vec<PathBuf>> = HashMap::new();
            let mut hash_order: Vec<u64> = Vec::new();
            for (path, hash) in paths.into_iter().zip(hashes) {
                if !by_hash.contains_key(&hash) {
                    hash_order.push(hash);
                }
                by_hash.entry(hash).or_default().push(path);
            }
            for hash in hash_order {
                buckets.push(by_hash.remove(&hash).unwrap());
            }
        }

        Self::emit_or_invert(buckets, invert)
    }

    fn end_general(&self, invert: bool, pool: &HashWorkerPool) -> Vec<Group> {
        let mut by_size: HashMap<u64, Vec<usize>> = HashMap::new();
        let mut size_order: Vec<u64> = Vec::new();
        for (i, record) in self.records.iter().enumerate() {
            let path = self.path_list.resolve(record.path_index, &record.name);
            let Ok(meta) = std::fs::metadata(&path) else {
                continue;
            };
            let size = meta.len();
            if !by_size.contains_key(&size) {
                size_order.push(size);
            }
            by_size.entry(size).or_default().push(i);
        }

        let mut buckets = Vec::new();
        for size in size_order {
            let indices = by_size.remove(&size).unwrap();
            if indices.len() < 2 {
                if invert {
                    buckets.push(vec![self.path_of(indices[0])]);
                }
                continue;
            }

            let paths: Vec<PathBuf> = indices.iter().map(|&idx| self.path_of(idx)).collect();
            let hashes = if size == 0 {
                // Each zero-length file is fingerprinted by a hash of its full
                // path rather than its (absent) bytes, so distinct empty files
                // never collapse into one spurious duplicate group (spec
                // §4.I, §9).
                paths.iter().map(|p| hash_path_bytes(&p.to_string_lossy())).collect()
            } else {
                hash_paths(pool, &paths, &self.hash_failures)
            };

            let mut by_hash: HashMap<u64, Vec<PathBuf>> = HashMap::new();
            let mut hash_order: Vec<u64> = Vec::new();
            for (path, hash) in paths.into_iter().zip(hashes) {
                if !by_hash.contains_key(&hash) {
                    hash_order.push(hash);
                }
                by_hash.entry(hash).or_default().push(path);
            }
            for hash in hash_order {
                buckets.push(by_hash.remove(&hash).unwrap());
            }
        }

        Self::emit_or_invert(buckets, invert)
    }
}

/// Hash every path in `paths`, reusing the comparator's worker pool (F) by
/// treating each as a "relative file" against a single empty virtual root —
/// `PathBuf::new().join(path)` reproduces `path` unchanged whether it is
/// absolute or relative, so no separate hashing machinery is needed here.
/// Paths that fail to hash are appended to `failures` for structured logging
/// by the caller (spec §7 kind 4), in addition to the stderr warning below.
fn hash_paths(pool: &HashWorkerPool, paths: &[PathBuf], failures: &RefCell<Vec<PathBuf>>) -> Vec<u64> {
    let virtual_root = [PathBuf::new()];
    let mut groups = Vec::new();
    for path in paths {
        groups.extend(pool.find_dups_async(&virtual_root, &path.to_string_lossy()));
    }
    groups.extend(pool.wait_for_async());

    let mut by_path: HashMap<PathBuf, u64> = HashMap::new();
    for group in groups {
        let relative_file: PathBuf = group.relative_file.into();
        if let Some(first) = group.hashes.first() {
            if !first.ok {
                eprintln!(
                    "dup: warning: could not hash {}, treating as zero-hash",
                    relative_file.display()
                );
                failures.borrow_mut().push(relative_file.clone());
            }
            // `first.hash` is already the zero fallback when `!first.ok` (spec
            // §4.F/§9's acknowledged quirk): an unreadable file and a genuine
            // zero-hash file land in the same bucket, deliberately.
            by_path.insert(relative_file, first.hash);
        }
    }

    paths
        .iter()
        .map(|p| by_path.get(p).copied().unwrap_or(0))
        .collect()
}
