use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::{ManifestError, ManifestKind, ProjectManifest};

#[derive(Debug, Deserialize)]
struct PyProject {
    #[serde(default)]
    project: Option<ProjectTable>,
}

#[derive(Debug, Deserialize)]
struct ProjectTable {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "optional-dependencies")]
    optional_dependencies: BTreeMap<String, toml::Value>,
}

/// `Ok(None)` when the file has no `[project]` table (e.g. a tool-only pyproject).
pub fn read_pyproject(path: &Path) -> Result<Option<ProjectManifest>, ManifestError> {
    let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Io { path: path.to_path_buf(), source })?;
    let doc: PyProject = toml::from_str(&text).map_err(|source| ManifestError::Toml { path: path.to_path_buf(), source })?;
    Ok(doc.project.map(|project| ProjectManifest {
        path: path.to_path_buf(),
        kind: ManifestKind::PyprojectToml,
        package_name: project.name.filter(|n| !n.trim().is_empty()),
        extras: project.optional_dependencies.into_keys().collect(),
    }))
}
