//! Path/name utilities shared by the walker, comparator, and grouper (spec component A).

use std::env;
use std::path::{Component, Path, PathBuf};

/// Resolve a path to an absolute, normalized path.
///
/// If `fs::canonicalize` succeeds (path exists), it is used to resolve symlinks
/// and normalize components.
///
/// If it fails (e.g. path does not exist), the path is made absolute relative
/// to CWD and `..`/`.` components are resolved syntactically. This fallback
/// matters for the pairwise comparator: a root that only exists on one side of
/// a *missing* verdict must still resolve to something stable for display.
pub fn resolve_absolute_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    };

    if let Ok(canonical) = std::fs::canonicalize(&absolute) {
        return canonical;
    }

    normalize_syntactic(&absolute)
}

fn normalize_syntactic(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(..) | Component::RootDir | Component::Normal(_) => {
                components.push(component);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if let Some(Component::Normal(_)) = components.last() {
                    components.pop();
                }
            }
        }
    }
    components.into_iter().collect()
}

/// Split a path into its parent directory name and final component name.
///
/// Mirrors the original tool's `getName`: the name is everything after the
/// last separator, the directory is everything up to and including it.
#[must_use]
pub fn split_name(path: &str) -> (&str, &str) {
    match path.rfind(std::path::MAIN_SEPARATOR) {
        Some(pos) => (&path[..=pos], &path[pos + 1..]),
        None => ("", path),
    }
}

/// Split a file name into `(stem, extension)` on the last `.`.
///
/// A name with no dot, or whose only dot is the leading character (a dotfile
/// like `.gitignore`), is treated as having no extension — matching the
/// original tool's `removeExtn`, which only strips a *trailing* extension.
#[must_use]
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) if pos > 0 => (&name[..pos], &name[pos + 1..]),
        _ => (name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_existing_path_canonically() {
        let cwd = env::current_dir().unwrap();
        let resolved = resolve_absolute_path(Path::new("."));
        assert_eq!(resolved, std::fs::canonicalize(&cwd).unwrap());
    }

    #[test]
    fn normalizes_nonexistent_path_syntactically() {
        #[cfg(unix)]
        let root = Path::new("/");
        #[cfg(windows)]
        let root = Path::new("C:");

        let input = root.join("nonexistent").join("foo").join("..").join("bar");
        let expected = root.join("nonexistent").join("bar");

        assert!(std::fs::canonicalize(&input).is_err());

        let resolved = resolve_absolute_path(&input);
        assert_eq!(resolved, expected);
    }

    #[test]
    fn handles_parent_at_root() {
        #[cfg(unix)]
        {
            let input = Path::new("/../foo");
            let resolved = normalize_syntactic(input);
            assert_eq!(resolved, Path::new("/foo"));
        }
    }

    #[test]
    fn split_name_separates_dir_and_file() {
        let sep = std::path::MAIN_SEPARATOR;
        let path = format!("a{sep}b{sep}c.txt");
        let (dir, name) = split_name(&path);
        assert_eq!(name, "c.txt");
        assert_eq!(dir, format!("a{sep}b{sep}"));
    }

    #[test]
    fn split_name_with_no_separator_is_all_name() {
        let (dir, name) = split_name("c.txt");
        assert_eq!(dir, "");
        assert_eq!(name, "c.txt");
    }

    #[test]
    fn split_extension_separates_stem_and_ext() {
        assert_eq!(split_extension("foo.txt"), ("foo", "txt"));
        assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", "gz"));
    }

    #[test]
    fn split_extension_no_dot_has_empty_extension() {
        assert_eq!(split_extension("README"), ("README", ""));
    }

    #[test]
    fn split_extension_leading_dot_is_not_an_extension() {
        assert_eq!(split_extension(".gitignore"), (".gitignore", ""));
    }
}
