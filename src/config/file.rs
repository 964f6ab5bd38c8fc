//! File-based document source.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::format::DocumentFormat;
use super::source::DocumentSource;
use super::tree::Tree;
use super::ConfigError;

/// Loads documents from the filesystem.
///
/// Relative identifiers are resolved against the base directory when one is
/// set, and against the working directory otherwise. The format follows the
/// file extension (see [`DocumentFormat::from_path`]).
#[derive(Debug, Clone, Default)]
pub struct FileSource {
    base_dir: Option<PathBuf>,
}

impl FileSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves relative identifiers against `dir`.
    #[must_use]
    pub fn with_base_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.base_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    fn path_for(&self, identifier: &str) -> PathBuf {
        let path = Path::new(identifier);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl DocumentSource for FileSource {
    fn load(&self, identifier: &str) -> Result<Tree, ConfigError> {
        load(self.path_for(identifier))
    }
}

/// Reads and parses a document file.
pub fn load(path: impl AsRef<Path>) -> Result<Tree, ConfigError> {
    let path = path.as_ref();
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };

    let format = DocumentFormat::from_path(path);
    debug!(path = %path.display(), ?format, "loading document");
    format
        .parse(&contents)
        .map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: Box::new(e),
        })
}
