//! Recursive directory enumeration.
//!
//! The walk is depth-first and keeps the file system's own entry order at
//! every level, expanding subdirectories in place. Only non-directory entries
//! are reported. `walkdir` holds the frontier on the heap, so deep trees do
//! not grow the call stack.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::WalkError;

/// Knobs for a directory walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkOptions {
    /// Descend through symbolic links to directories. Link cycles are
    /// reported as [`WalkError::Loop`].
    pub follow_links: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self { follow_links: true }
    }
}

impl WalkOptions {
    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Collect every file below `root`. Fails on the first unreadable entry.
    pub fn list_files(&self, root: &Path) -> Result<Vec<PathBuf>, WalkError> {
        ensure_directory(root)?;

        let mut files = Vec::new();
        for entry in WalkDir::new(root).follow_links(self.follow_links) {
            let entry = entry.map_err(|err| convert_error(err, root))?;
            if entry.file_type().is_dir() {
                continue;
            }
            files.push(entry.into_path());
        }

        tracing::debug!(root = %root.display(), files = files.len(), "walk completed");
        Ok(files)
    }
}

/// Collect every file below `root` using the default options.
pub fn list_files(root: impl AsRef<Path>) -> Result<Vec<PathBuf>, WalkError> {
    WalkOptions::default().list_files(root.as_ref())
}

/// Walk `root`, then call `callback` once per file with that file's path and
/// the complete list produced by the walk.
///
/// The list is fully materialised before the first call, so a failing walk
/// never invokes the callback.
pub fn walk_dir<P, F>(root: P, mut callback: F) -> Result<(), WalkError>
where
    P: AsRef<Path>,
    F: FnMut(&Path, &[PathBuf]),
{
    let elements = list_files(root)?;
    for element in &elements {
        callback(element, &elements);
    }
    Ok(())
}

/// Like [`walk_dir`], but the callback may fail. The first callback error
/// stops the iteration and is returned.
pub fn try_walk_dir<P, F, E>(root: P, mut callback: F) -> Result<(), E>
where
    P: AsRef<Path>,
    F: FnMut(&Path, &[PathBuf]) -> Result<(), E>,
    E: From<WalkError>,
{
    let elements = list_files(root)?;
    for element in &elements {
        callback(element, &elements)?;
    }
    Ok(())
}

fn ensure_directory(root: &Path) -> Result<(), WalkError> {
    let metadata = fs::metadata(root).map_err(|source| WalkError::Io {
        path: root.to_path_buf(),
        source,
    })?;
    if !metadata.is_dir() {
        return Err(WalkError::NotADirectory {
            path: root.to_path_buf(),
        });
    }
    Ok(())
}

fn convert_error(err: walkdir::Error, root: &Path) -> WalkError {
    let path = err
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.to_path_buf());

    if let Some(ancestor) = err.loop_ancestor().map(Path::to_path_buf) {
        return WalkError::Loop { path, ancestor };
    }

    let source = err
        .into_io_error()
        .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "directory walk failed"));
    WalkError::Io { path, source }
}
