use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use deplog_core::FailurePolicy;
use deplog_engine::EngineKind;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub project: ProjectConfig,
    pub engine: EngineConfig,
    pub logs: LogsConfig,
    pub scheduler: SchedulerConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Package excluded from its own logs; discovered from the manifest when unset.
    pub self_package: Option<String>,
    pub repo: Option<String>,
    /// Where the build context lands inside the image.
    pub install_root: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub kind: EngineKind,
    /// Binary to invoke instead of `docker`/`podman`.
    pub program: Option<String>,
    pub base_image: String,
    pub image_prefix: String,
    pub keep_images: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LogsConfig {
    pub dir: String,
    pub file_name: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// 0 runs every variant at once.
    pub jobs: usize,
    pub failure_policy: FailurePolicy,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self { self_package: None, repo: None, install_root: "/src".to_string() }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kind: EngineKind::Docker,
            program: None,
            base_image: "python:3.12".to_string(),
            image_prefix: "deplog".to_string(),
            keep_images: false,
        }
    }
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self { dir: ".".to_string(), file_name: "dependencies.log".to_string() }
    }
}

impl Config {
    pub fn load_from(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let cfg: Config = toml::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
        Ok(cfg)
    }

    /// Defaults when `path` does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn config_path(project_dir: &Path) -> PathBuf {
        project_dir.join("deplog.toml")
    }

    /// Log directory, `~`-expanded and resolved against `project_dir`.
    pub fn log_dir(&self, project_dir: &Path) -> PathBuf {
        resolve(project_dir, &self.logs.dir)
    }
}

pub fn resolve(base: &Path, raw: &str) -> PathBuf {
    let expanded = PathBuf::from(shellexpand::tilde(raw).to_string());
    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}
