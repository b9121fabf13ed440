use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalkError {
    #[error("failed to read {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("{} is not a directory", .path.display())]
    NotADirectory { path: PathBuf },

    #[error("symbolic link loop at {} (back to {})", .path.display(), .ancestor.display())]
    Loop { path: PathBuf, ancestor: PathBuf },
}

#[derive(Debug, Error)]
pub enum MarkdownError {
    #[error("failed to read markdown {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to read template {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    /// The marker asked for a substitution that was not supplied.
    #[error("Input index out of range in {}: {index}", .path.display())]
    IndexOutOfRange {
        path: PathBuf,
        index: String,
        available: usize,
    },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Walk(#[from] WalkError),

    #[error(transparent)]
    Markdown(#[from] MarkdownError),

    #[error(transparent)]
    Template(#[from] TemplateError),
}

pub type Result<T> = std::result::Result<T, Error>;
