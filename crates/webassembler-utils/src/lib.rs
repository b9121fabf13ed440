//! Shared utilities for webassembler crates.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tempfile::Builder;
use thiserror::Error;

/// Map `func` over `items` on the rayon pool, stopping at the first error.
///
/// Results keep the order of `items`. Work already started on other threads
/// may still finish after an error is observed.
pub fn parallel_try_map<T, R, E, F>(items: Vec<T>, func: F) -> Result<Vec<R>, E>
where
    T: Send,
    R: Send,
    E: Send,
    F: Fn(T) -> Result<R, E> + Send + Sync,
{
    items.into_par_iter().map(func).collect()
}

/// Failure of [`atomic_write`], tagged with the stage that failed.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to stage {}: {source}", .path.display())]
    Stage { path: PathBuf, source: io::Error },

    #[error("failed to replace {}: {source}", .path.display())]
    Persist { path: PathBuf, source: io::Error },
}

impl WriteError {
    /// The directory or file the failed step was working on.
    pub fn path(&self) -> &Path {
        match self {
            WriteError::CreateDir { path, .. }
            | WriteError::Stage { path, .. }
            | WriteError::Persist { path, .. } => path,
        }
    }
}

/// Write `contents` to `path` through a hidden sibling file that is renamed
/// over the target, so readers see either the old page or the new one.
/// Missing parent directories are created. An existing target keeps its
/// permissions.
pub fn atomic_write(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), WriteError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|source| WriteError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let stage = |source| WriteError::Stage {
        path: path.to_path_buf(),
        source,
    };
    let mut staged = Builder::new()
        .prefix(".webassembler")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(stage)?;
    staged.write_all(contents.as_ref()).map_err(stage)?;
    staged.as_file().sync_all().map_err(stage)?;

    if let Ok(existing) = fs::metadata(path) {
        fs::set_permissions(staged.path(), existing.permissions()).map_err(stage)?;
    }

    staged
        .persist(path)
        .map(drop)
        .map_err(|err| WriteError::Persist {
            path: path.to_path_buf(),
            source: err.error,
        })
}
