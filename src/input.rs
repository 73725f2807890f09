//! Input provider: string- and file-based sources
//!
//! String-based input is the core; file-based input is a thin wrapper that
//! reads the whole file up front (matching is never streaming, the buffer is
//! fully materialized before the first attempt). File handles are scoped by
//! RAII: they are closed on every exit path.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ParseError;

/// An input source for one parse call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// In-memory text.
    Text(String),
    /// A file to be read in full before matching starts.
    File(PathBuf),
}

impl Input {
    /// Produce the complete input buffer.
    pub fn read(&self) -> Result<String, ParseError> {
        match self {
            Input::Text(text) => Ok(text.clone()),
            Input::File(path) => fs::read_to_string(path)
                .map_err(|e| ParseError::Io(format!("{}: {}", path.display(), e))),
        }
    }
}

impl From<&str> for Input {
    fn from(text: &str) -> Self {
        Input::Text(text.to_string())
    }
}

impl From<String> for Input {
    fn from(text: String) -> Self {
        Input::Text(text)
    }
}

impl From<&Path> for Input {
    fn from(path: &Path) -> Self {
        Input::File(path.to_path_buf())
    }
}

impl From<PathBuf> for Input {
    fn from(path: PathBuf) -> Self {
        Input::File(path)
    }
}
