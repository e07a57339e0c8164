//! Reads the package name and optional extras from a Python project manifest.

mod error;
mod pyproject;
mod setup_cfg;

use std::path::{Path, PathBuf};

use tracing::debug;

pub use error::ManifestError;
pub use pyproject::read_pyproject;
pub use setup_cfg::{parse_setup_cfg, read_setup_cfg, IniDocument};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ManifestKind {
    PyprojectToml,
    SetupCfg,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectManifest {
    pub path: PathBuf,
    pub kind: ManifestKind,
    /// `None` when the manifest does not declare a name.
    pub package_name: Option<String>,
    /// Extra names in declaration order (sorted for pyproject.toml).
    pub extras: Vec<String>,
}

/// Find and read the manifest of the project rooted at `project_dir`.
///
/// A `pyproject.toml` with a `[project]` table wins; otherwise `setup.cfg`.
pub fn discover(project_dir: &Path) -> Result<ProjectManifest, ManifestError> {
    let pyproject = project_dir.join("pyproject.toml");
    if pyproject.is_file() {
        if let Some(manifest) = read_pyproject(&pyproject)? {
            debug!(path = %pyproject.display(), "using pyproject.toml");
            return Ok(manifest);
        }
        debug!(path = %pyproject.display(), "pyproject.toml has no [project] table");
    }
    let setup_cfg = project_dir.join("setup.cfg");
    if setup_cfg.is_file() {
        debug!(path = %setup_cfg.display(), "using setup.cfg");
        return read_setup_cfg(&setup_cfg);
    }
    Err(ManifestError::NotFound(project_dir.to_path_buf()))
}
