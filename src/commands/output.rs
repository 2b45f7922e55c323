//! Output formatting (spec component N): verdict and group printers
//! parameterised by [`OutputConfig`]'s divider/separator strings.
//!
//! Grounded in `DupScan::showDuplicate`/`showDifferent`/`showMissing` and
//! `DupFiles::printPaths` (reference `command.cpp`/`dupscan.cpp`): every
//! verdict line is `preX` + path(s) joined by `separator` + `postDivider`.

use std::io::{self, Write};
use std::path::Path;

use chrono::{DateTime, Local};

use crate::core::config::OutputConfig;

/// Which side(s) of a two-path verdict to print (`-log=1|2`) or mutate
/// (`-delete=1|2`). The reference tool shares one enum for both purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selector {
    /// Neither side.
    None,
    /// The first root's path only.
    First,
    /// The second root's path only.
    Second,
    /// Both, in root order.
    #[default]
    Both,
}

/// Stateless formatter bound to one run's [`OutputConfig`].
pub struct OutputWriter<'a> {
    config: &'a OutputConfig,
}

impl<'a> OutputWriter<'a> {
    /// Bind a formatter to `config` for the run's duration.
    #[must_use]
    pub fn new(config: &'a OutputConfig) -> Self {
        Self { config }
    }

    /// A *duplicate* verdict: two paths with identical content (or, in
    /// `justName` mode, identical name/length).
    pub fn write_duplicate(
        &self,
        out: &mut dyn Write,
        path1: &Path,
        path2: &Path,
        selector: Selector,
    ) -> io::Result<()> {
        write!(out, "{}", self.config.pre_dup)?;
        self.write_pair(out, path1, path2, selector)?;
        write!(out, "{}", self.config.post_divider)
    }

    /// A *different* verdict: both present, content (or length) differs.
    pub fn write_different(
        &self,
        out: &mut dyn Write,
        path1: &Path,
        path2: &Path,
        selector: Selector,
    ) -> io::Result<()> {
        write!(out, "{}", self.config.pre_diff)?;
        self.write_pair(out, path1, path2, selector)?;
        write!(out, "{}", self.config.post_divider)
    }

    /// A *missing* verdict: exactly one side has the file.
    ///
    /// `have1` is `true` when the first root has it. Absent `invert`, the
    /// path that exists is printed; `invert` prints the absent side's path
    /// instead, matching the reference tool's `have1 != invert` branch.
    pub fn write_missing(
        &self,
        out: &mut dyn Write,
        have1: bool,
        path1: &Path,
        path2: &Path,
        invert: bool,
    ) -> io::Result<()> {
        write!(out, "{}", self.config.pre_miss)?;
        if have1 != invert {
            write!(out, "{}", path1.display())?;
        } else {
            write!(out, "{}", path2.display())?;
        }
        write!(out, "{}", self.config.post_divider)
    }

    fn write_pair(
        &self,
        out: &mut dyn Write,
        path1: &Path,
        path2: &Path,
        selector: Selector,
    ) -> io::Result<()> {
        match selector {
            Selector::Both => {
                write!(out, "{}{}{}", path1.display(), self.config.separator, path2.display())
            }
            Selector::First => write!(out, "{}", path1.display()),
            Selector::Second => write!(out, "{}", path2.display()),
            Selector::None => Ok(()),
        }
    }

    /// One equivalence-group line: `preDivider` + paths joined by
    /// `separator` + `postDivider`, or (if `verbose`) one stat line per path.
    pub fn write_group(&self, out: &mut dyn Write, paths: &[&Path], verbose: bool) -> io::Result<()> {
        if verbose {
            for path in paths {
                write_verbose_line(out, path)?;
            }
            return Ok(());
        }

        write!(out, "{}", self.config.pre_divider)?;
        for (idx, path) in paths.iter().enumerate() {
            if idx != 0 {
                write!(out, "{}", self.config.separator)?;
            }
            write!(out, "{}", path.display())?;
        }
        write!(out, "{}", self.config.post_divider)
    }
}

#[cfg(unix)]
fn write_verbose_line(out: &mut dyn Write, path: &Path) -> io::Result<()> {
    use std::os::unix::fs::MetadataExt;

    let meta = std::fs::symlink_metadata(path)?;
    let is_symlink = meta.file_type().is_symlink();
    let stat_meta = if is_symlink { std::fs::metadata(path).unwrap_or(meta.clone()) } else { meta.clone() };

    let modified: DateTime<Local> = stat_meta
        .modified()
        .map(DateTime::<Local>::from)
        .unwrap_or_else(|_| Local::now());

    writeln!(
        out,
        "{:>8} {} {:>10}{} Links {} {}",
        stat_meta.len(),
        modified.format("%a %d-%b-%Y %I:%M %p"),
        meta.ino(),
        if is_symlink { " S" } else { "  " },
        meta.nlink(),
        path.display(),
    )
}

#[cfg(not(unix))]
fn write_verbose_line(out: &mut dyn Write, path: &Path) -> io::Result<()> {
    let meta = std::fs::metadata(path)?;
    let modified: DateTime<Local> = meta
        .modified()
        .map(DateTime::<Local>::from)
        .unwrap_or_else(|_| Local::now());

    writeln!(
        out,
        "{:>8} {}   {}",
        meta.len(),
        modified.format("%a %d-%b-%Y %I:%M %p"),
        path.display(),
    )
}
