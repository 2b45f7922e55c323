//! Command-line entry point (spec component J): argument resolution plus the
//! top-level dispatch between pairwise comparison and equivalence grouping.

pub mod args;

use std::sync::atomic::AtomicBool;

use crate::cli::args::{Invocation, Mode};
use crate::commands::{Comparator, Grouper, OutputWriter};
use crate::core::errors::Result;
use crate::hash::HashWorkerPool;
use crate::logger::{EventLogger, EventType, LogEntry, Severity};
use crate::scan::{walk_collect, PatternFilter};

/// Parse `argv` (excluding the program name) and run the resolved invocation
/// to completion, writing verdict/group output to `out`.
pub fn run(argv: &[String], out: &mut dyn std::io::Write) -> Result<i32> {
    let invocation = args::parse(argv)?;
    run_invocation(invocation, out)
}

fn run_invocation(invocation: Invocation, out: &mut dyn std::io::Write) -> Result<i32> {
    let mut logger = match &invocation.json_log_path {
        Some(path) => EventLogger::open(path),
        None => EventLogger::disabled(),
    };

    let root_strings: Vec<String> = invocation
        .roots
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    logger.log(LogEntry::new(EventType::ScanStart, Severity::Info).with_roots(root_strings));

    let filter = match PatternFilter::compile(
        &invocation.filter_inputs.include_file,
        &invocation.filter_inputs.exclude_file,
        &invocation.filter_inputs.include_path,
        &invocation.filter_inputs.exclude_path,
        invocation.filter_inputs.use_regex,
    ) {
        Ok(f) => f,
        Err(e) => {
            logger.log(
                LogEntry::new(EventType::PatternError, Severity::Error).with_details(e.to_string()),
            );
            logger.flush();
            return Err(e);
        }
    };

    let aborted = AtomicBool::new(false);
    let writer = OutputWriter::new(&invocation.output);
    let pool = HashWorkerPool::new(&invocation.hashing);

    let exit_code = match invocation.mode {
        Mode::Pairwise => {
            let comparator = Comparator::new(
                invocation.roots[0].clone(),
                invocation.roots[1].clone(),
                &filter,
                &pool,
                invocation.comparator_options,
            );
            let counts = comparator.run(out, &writer, &aborted)?;

            for path in comparator.hash_failures() {
                logger.log(
                    LogEntry::new(EventType::HashFailure, Severity::Warning)
                        .with_path(path.to_string_lossy()),
                );
            }

            logger.log(
                LogEntry::new(EventType::ScanComplete, Severity::Info)
                    .with_counts(counts.same, counts.diff, counts.miss, counts.skip),
            );

            if !invocation.quiet {
                eprintln!(
                    "dup: {} same, {} different, {} missing, {} skipped",
                    counts.same, counts.diff, counts.miss, counts.skip
                );
            }

            0
        }
        Mode::Collecting => {
            let mut grouper = Grouper::new();
            for root in &invocation.roots {
                for path in walk_collect(root, &filter, &aborted) {
                    grouper.add(&path);
                }
            }

            let groups = grouper.end(&invocation.grouper_options, &pool);

            for path in grouper.hash_failures() {
                logger.log(
                    LogEntry::new(EventType::HashFailure, Severity::Warning)
                        .with_path(path.to_string_lossy()),
                );
            }

            for group in &groups {
                let refs: Vec<&std::path::Path> = group.iter().map(std::path::PathBuf::as_path).collect();
                writer
                    .write_group(out, &refs, invocation.grouper_options.verbose)
                    .map_err(|source| crate::core::errors::DupError::io(&group[0], source))?;
            }

            logger.log(
                LogEntry::new(EventType::ScanComplete, Severity::Info).with_counts(
                    groups.iter().map(std::vec::Vec::len).sum(),
                    0,
                    0,
                    filter.skip_count(),
                ),
            );

            if !invocation.quiet {
                eprintln!("dup: {} groups, {} skipped", groups.len(), filter.skip_count());
            }

            0
        }
    };

    logger.flush();
    Ok(exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn pairwise_run_reports_duplicate_and_different_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::create_dir_all(&a).unwrap();
        std::fs::create_dir_all(&b).unwrap();
        std::fs::write(a.join("same.txt"), b"hello").unwrap();
        std::fs::write(b.join("same.txt"), b"hello").unwrap();
        std::fs::write(a.join("diff.txt"), b"one").unwrap();
        std::fs::write(b.join("diff.txt"), b"two!").unwrap();

        let mut buf = Vec::new();
        let code = run(
            &args(&[
                "-showDiff",
                "-quiet",
                a.to_str().unwrap(),
                b.to_str().unwrap(),
            ]),
            &mut buf,
        )
        .unwrap();
        let printed = String::from_utf8(buf).unwrap();
        assert!(printed.contains("same.txt"));
        assert!(printed.contains("diff.txt"));
        assert_eq!(code, 0, "a successful scan exits 0 regardless of verdicts found");
    }

    #[test]
    fn collecting_run_over_single_root_groups_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("x.bin"), vec![1u8; 64]).unwrap();
        std::fs::write(dir.path().join("y.bin"), vec![1u8; 64]).unwrap();
        std::fs::write(dir.path().join("z.bin"), vec![2u8; 64]).unwrap();

        let mut buf = Vec::new();
        let code = run(&args(&["-quiet", dir.path().to_str().unwrap()]), &mut buf).unwrap();
        let printed = String::from_utf8(buf).unwrap();
        assert!(printed.contains("x.bin"));
        assert!(printed.contains("y.bin"));
        assert!(!printed.contains("z.bin"));
        assert_eq!(code, 0, "a successful scan exits 0 regardless of verdicts found");
    }

    #[test]
    fn no_roots_is_an_error_before_any_output() {
        let mut buf = Vec::new();
        let result = run(&args(&[]), &mut buf);
        assert!(result.is_err());
        assert!(buf.is_empty());
    }

    #[test]
    fn json_log_path_records_scan_events() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::create_dir_all(&a).unwrap();
        std::fs::create_dir_all(&b).unwrap();
        std::fs::write(a.join("f"), b"same").unwrap();
        std::fs::write(b.join("f"), b"same").unwrap();
        let log_path = dir.path().join("run.jsonl");

        let mut buf = Vec::new();
        run(
            &args(&[
                &format!("-jsonLog={}", log_path.display()),
                "-quiet",
                a.to_str().unwrap(),
                b.to_str().unwrap(),
            ]),
            &mut buf,
        )
        .unwrap();

        let contents = std::fs::read_to_string(&log_path).unwrap();
        assert!(contents.contains("scan_start"));
        assert!(contents.contains("scan_complete"));
    }
}
