use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("no pyproject.toml [project] table or setup.cfg in {}", .0.display())]
    NotFound(PathBuf),

    #[error("read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse {}: {source}", .path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("parse {}:{line}: {message}", .path.display())]
    Ini { path: PathBuf, line: usize, message: String },
}
