//! Concurrent hash worker pool (spec component F).
//!
//! A fixed pool of `max_threads` workers, fed by a bounded channel, computes
//! file hashes on behalf of the comparator and grouper. Jobs are admitted in
//! groups (one job per root, sharing a `relative_file` name) and FIFO-ordered:
//! a group is only handed back to the caller once every job in it — and every
//! group admitted before it — has finished. This keeps verdict output
//! deterministic with respect to admission order even though the workers
//! themselves may finish jobs in any order.
//!
//! Grounded in the reference design's `ThreadJob`/`threadGroups` machinery
//! (one raw `std::thread` per hash, `anyFinishedGroups` polling a `done`
//! flag), redesigned per spec §14 onto a fixed thread pool plus channel: the
//! external admission/drain contract is unchanged, only the thread lifecycle
//! management is.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Sender};
use parking_lot::Mutex;

use crate::core::config::HashingConfig;
use crate::hash::buffer_pool::BufferPool;
use crate::hash::primitive::hash_file;

/// How long the admission call sleeps between retries while over capacity.
const ADMISSION_BACKOFF: Duration = Duration::from_millis(50);
/// How long `wait_for_async` sleeps between drain attempts.
const DRAIN_BACKOFF: Duration = Duration::from_millis(10);

struct Task {
    path: PathBuf,
    done: Arc<AtomicBool>,
    hash: Arc<AtomicU64>,
    ok: Arc<AtomicBool>,
}

struct JobSlot {
    root_index: usize,
    path: PathBuf,
    done: Arc<AtomicBool>,
    hash: Arc<AtomicU64>,
    ok: Arc<AtomicBool>,
}

struct PendingGroup {
    relative_file: String,
    jobs: Vec<JobSlot>,
}

/// One root's resolved hash for a single emitted group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootHash {
    /// Index into the root list this hash belongs to.
    pub root_index: usize,
    /// The full path that was hashed.
    pub path: PathBuf,
    /// The computed digest, or `0` if the file could not be read.
    pub hash: u64,
    /// `false` if hashing failed and `hash` is the zero fallback (§4.F failure policy).
    pub ok: bool,
}

/// A fully-joined group, ready for the comparator or grouper to consume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobGroupResult {
    /// The RelativeFile name shared by every job in the group.
    pub relative_file: String,
    /// One entry per root, in root order.
    pub hashes: Vec<RootHash>,
}

/// Bounded-concurrency hash worker pool.
pub struct HashWorkerPool {
    max_threads: usize,
    sender: Option<Sender<Task>>,
    workers: Vec<thread::JoinHandle<()>>,
    in_flight: Arc<AtomicUsize>,
    fifo: Mutex<VecDeque<PendingGroup>>,
}

impl HashWorkerPool {
    /// Build a pool sized by `config`. Assumes `config` has already passed
    /// [`crate::core::config::Config::validate`] (`num_buffers >= max_threads`).
    #[must_use]
    pub fn new(config: &HashingConfig) -> Self {
        let buffer_pool = BufferPool::new(config.num_buffers, config.buffer_size);
        let (sender, receiver) = bounded::<Task>(config.max_threads * 2);
        let in_flight = Arc::new(AtomicUsize::new(0));

        let mut workers = Vec::with_capacity(config.max_threads);
        for _ in 0..config.max_threads {
            let receiver = receiver.clone();
            let pool = buffer_pool.clone();
            let in_flight = Arc::clone(&in_flight);
            workers.push(thread::spawn(move || {
                while let Ok(task) = receiver.recv() {
                    let mut handle = pool.acquire();
                    match hash_file(&task.path, handle.as_mut_slice()) {
                        Ok(digest) => {
                            task.hash.store(digest, Ordering::SeqCst);
                            task.ok.store(true, Ordering::SeqCst);
                        }
                        Err(_) => {
                            task.hash.store(0, Ordering::SeqCst);
                            task.ok.store(false, Ordering::SeqCst);
                        }
                    }
                    task.done.store(true, Ordering::SeqCst);
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                }
            }));
        }

        Self {
            max_threads: config.max_threads,
            sender: Some(sender),
            workers,
            in_flight,
            fifo: Mutex::new(VecDeque::new()),
        }
    }

    /// Number of jobs currently queued, running, or done-but-not-yet-joined.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Enqueue one hash job per root for `relative_file`, blocking (briefly,
    /// re-polling) if admitting them would exceed `max_threads` in flight.
    ///
    /// Returns any groups that drained to completion as a side effect of this
    /// call's opportunistic/backoff polling — never the group just admitted.
    pub fn find_dups_async(&self, roots: &[PathBuf], relative_file: &str) -> Vec<JobGroupResult> {
        let mut emitted = self.drain_finished();

        loop {
            let running = self.in_flight.load(Ordering::SeqCst);
            let incoming = roots.len();
            let over_cap =
                running > self.max_threads || (running > 0 && running + incoming > self.max_threads);
            if !over_cap {
                break;
            }
            thread::sleep(ADMISSION_BACKOFF);
            emitted.extend(self.drain_finished());
        }

        let sender = self
            .sender
            .as_ref()
            .expect("find_dups_async called after pool shutdown");

        let mut jobs = Vec::with_capacity(roots.len());
        for (root_index, root) in roots.iter().enumerate() {
            let path = root.join(relative_file);
            let done = Arc::new(AtomicBool::new(false));
            let hash = Arc::new(AtomicU64::new(0));
            let ok = Arc::new(AtomicBool::new(false));

            self.in_flight.fetch_add(1, Ordering::SeqCst);
            sender
                .send(Task {
                    path: path.clone(),
                    done: Arc::clone(&done),
                    hash: Arc::clone(&hash),
                    ok: Arc::clone(&ok),
                })
                .expect("hash worker channel closed while pool is alive");

            jobs.push(JobSlot {
                root_index,
                path,
                done,
                hash,
                ok,
            });
        }

        self.fifo.lock().push_back(PendingGroup {
            relative_file: relative_file.to_string(),
            jobs,
        });

        emitted
    }

    /// Drain every remaining admitted group, blocking until all are joined.
    pub fn wait_for_async(&self) -> Vec<JobGroupResult> {
        let mut emitted = Vec::new();
        loop {
            emitted.extend(self.drain_finished());
            if self.fifo.lock().is_empty() {
                break;
            }
            thread::sleep(DRAIN_BACKOFF);
        }
        emitted
    }

    /// Walk the FIFO from the front, popping and emitting each fully-joined
    /// group. Stops at the first group with an outstanding job, even if a
    /// later group in the queue has already finished — emission order must
    /// match admission order.
    fn drain_finished(&self) -> Vec<JobGroupResult> {
        let mut emitted = Vec::new();
        let mut fifo = self.fifo.lock();
        while let Some(front) = fifo.front() {
            if !front.jobs.iter().all(|job| job.done.load(Ordering::SeqCst)) {
                break;
            }
            let group = fifo.pop_front().expect("front checked above");
            let hashes = group
                .jobs
                .into_iter()
                .map(|job| RootHash {
                    root_index: job.root_index,
                    path: job.path,
                    hash: job.hash.load(Ordering::SeqCst),
                    ok: job.ok.load(Ordering::SeqCst),
                })
                .collect();
            emitted.push(JobGroupResult {
                relative_file: group.relative_file,
                hashes,
            });
        }
        emitted
    }
}

impl Drop for HashWorkerPool {
    fn drop(&mut self) {
        self.sender.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_threads: usize) -> HashingConfig {
        HashingConfig {
            max_threads,
            num_buffers: max_threads * 2,
            buffer_size: 4096,
        }
    }

    #[test]
    fn single_group_round_trips_through_wait_for_async() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        std::fs::write(root.join("a.txt"), b"hello").unwrap();

        let pool = HashWorkerPool::new(&config(2));
        let drained = pool.find_dups_async(std::slice::from_ref(&root), "a.txt");
        assert!(drained.is_empty());

        let results = pool.wait_for_async();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].relative_file, "a.txt");
        assert_eq!(results[0].hashes.len(), 1);
        assert!(results[0].hashes[0].ok);
    }

    #[test]
    fn identical_files_across_roots_hash_equal() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        std::fs::write(dir_a.path().join("f.bin"), b"same bytes").unwrap();
        std::fs::write(dir_b.path().join("f.bin"), b"same bytes").unwrap();

        let pool = HashWorkerPool::new(&config(4));
        let roots = vec![dir_a.path().to_path_buf(), dir_b.path().to_path_buf()];
        pool.find_dups_async(&roots, "f.bin");
        let results = pool.wait_for_async();

        assert_eq!(results.len(), 1);
        let hashes = &results[0].hashes;
        assert_eq!(hashes.len(), 2);
        assert_eq!(hashes[0].hash, hashes[1].hash);
        assert!(hashes[0].ok && hashes[1].ok);
    }

    #[test]
    fn missing_file_yields_not_ok_zero_hash() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();

        let pool = HashWorkerPool::new(&config(2));
        pool.find_dups_async(std::slice::from_ref(&root), "does-not-exist.bin");
        let results = pool.wait_for_async();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].hashes[0].hash, 0);
        assert!(!results[0].hashes[0].ok);
    }

    #[test]
    fn emission_preserves_admission_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let names: Vec<String> = (0..10).map(|i| format!("f{i}.bin")).collect();
        for name in &names {
            std::fs::write(root.join(name), format!("contents-{name}")).unwrap();
        }

        let pool = HashWorkerPool::new(&config(3));
        for name in &names {
            pool.find_dups_async(std::slice::from_ref(&root), name);
        }
        let results = pool.wait_for_async();

        let emitted_names: Vec<&str> = results.iter().map(|r| r.relative_file.as_str()).collect();
        let expected: Vec<&str> = names.iter().map(String::as_str).collect();
        assert_eq!(emitted_names, expected);
    }

    #[test]
    fn never_exceeds_max_threads_in_flight() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        for i in 0..20 {
            std::fs::write(root.join(format!("g{i}.bin")), vec![i as u8; 256]).unwrap();
        }

        let pool = HashWorkerPool::new(&config(2));
        let mut peak = 0usize;
        for i in 0..20 {
            pool.find_dups_async(std::slice::from_ref(&root), &format!("g{i}.bin"));
            peak = peak.max(pool.in_flight_count());
        }
        pool.wait_for_async();
        assert!(peak <= 2, "peak in-flight {peak} exceeded max_threads");
    }
}
