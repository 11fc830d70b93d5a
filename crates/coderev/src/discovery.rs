//! File discovery: walk a source tree, applying an inclusion pattern and a
//! set of excluded directory names.
//!
//! Excluded directories are pruned during traversal, so an excluded subtree
//! is never visited at all. The inclusion pattern is matched against file
//! names only, never full paths.

use crate::error::{CoderevError, Result};
use glob::Pattern;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Directory names excluded by default: internals and caches that are never
/// useful review input and can be enormous.
pub const DEFAULT_EXCLUDE_DIR_NAMES: &[&str] = &["node_modules", ".git", "__pycache__", ".cache"];

/// Walk `root` and lazily yield absolute paths of files whose name matches
/// `pattern`, skipping any directory whose name is in `excluded_dirs`.
///
/// Fails up front with `NotFound`/`PermissionDenied` if the root is missing
/// or unreadable; a missing root is never reported as an empty result.
/// Per-entry walk errors (e.g. an unreadable subdirectory) are yielded as
/// `Err` items for the caller to recover from.
pub fn discover(
    root: &Path,
    pattern: &str,
    excluded_dirs: &[String],
) -> Result<impl Iterator<Item = Result<PathBuf>>> {
    let pattern = Pattern::new(pattern)?;
    let excluded: HashSet<String> = excluded_dirs.iter().cloned().collect();

    // Canonicalize doubles as the existence check and makes every yielded
    // path absolute.
    let root = std::fs::canonicalize(root).map_err(|e| CoderevError::from_io(e, root))?;
    if !root.is_dir() {
        return Err(CoderevError::NotFound(format!(
            "{} is not a directory",
            root.display()
        )));
    }
    // Catch an unreadable root before handing back a lazy iterator
    std::fs::read_dir(&root).map_err(|e| CoderevError::from_io(e, &root))?;

    let walker = walkdir::WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(move |entry| {
            entry.depth() == 0
                || !(entry.file_type().is_dir()
                    && excluded.contains(entry.file_name().to_string_lossy().as_ref()))
        });

    Ok(walker.filter_map(move |entry| match entry {
        Ok(entry) => {
            if !entry.file_type().is_file() {
                return None;
            }
            let name = entry.file_name().to_string_lossy();
            if pattern.matches(&name) {
                Some(Ok(entry.into_path()))
            } else {
                None
            }
        }
        Err(err) => {
            let path = err
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<unknown>".to_string());
            let io_kind = err.io_error().map(|e| e.kind());
            Some(Err(match io_kind {
                Some(std::io::ErrorKind::PermissionDenied) => {
                    CoderevError::PermissionDenied(path)
                }
                _ => CoderevError::Io(std::io::Error::other(format!(
                    "walk failed at {path}: {err}"
                ))),
            }))
        }
    }))
}
