use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use deplog_core::ImageTag;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    #[default]
    Docker,
    Podman,
}

impl EngineKind {
    pub fn program(self) -> &'static str {
        match self {
            EngineKind::Docker => "docker",
            EngineKind::Podman => "podman",
        }
    }

    /// The engine `--use-alternate-engine` switches to.
    pub fn alternate(self) -> Self {
        match self {
            EngineKind::Docker => EngineKind::Podman,
            EngineKind::Podman => EngineKind::Docker,
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

/// An image that exists in the local store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageHandle {
    pub tag: ImageTag,
}

#[derive(Clone, Debug)]
pub struct BuildRequest {
    pub build_file_content: String,
    pub tag: ImageTag,
    pub context_dir: PathBuf,
    /// Where the build file is written before the engine reads it.
    pub scratch_dir: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mount {
    pub host: PathBuf,
    pub container: String,
}

#[derive(Clone, Debug, Default)]
pub struct RunSpec {
    pub command: Vec<String>,
    pub mounts: Vec<Mount>,
    pub env: Vec<(String, String)>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {}:\n{stderr_tail}", code_label(.code))]
    Failed { program: String, code: Option<i32>, stderr_tail: String },

    #[error("write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EngineError {
    pub fn code(&self) -> Option<i32> {
        match self {
            EngineError::Failed { code, .. } => *code,
            EngineError::Spawn { .. } | EngineError::Io { .. } => None,
        }
    }

    /// The engine's own words, for surfacing to the operator unchanged.
    pub fn detail(&self) -> String {
        match self {
            EngineError::Failed { stderr_tail, .. } => stderr_tail.clone(),
            other => other.to_string(),
        }
    }
}

fn code_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "no status (killed by signal?)".to_string(),
    }
}

#[async_trait]
pub trait ImageBuilder: Send + Sync {
    async fn build(&self, request: &BuildRequest) -> Result<ImageHandle, EngineError>;

    /// Drop an image from the local store.
    async fn remove(&self, image: &ImageHandle) -> Result<(), EngineError>;
}

#[async_trait]
pub trait RunnerSandbox: Send + Sync {
    async fn run(&self, image: &ImageHandle, spec: &RunSpec) -> Result<CapturedOutput, EngineError>;
}

/// Both halves of a container engine, usable as one trait object.
pub trait ContainerEngine: ImageBuilder + RunnerSandbox {
    fn describe(&self) -> String;
}
