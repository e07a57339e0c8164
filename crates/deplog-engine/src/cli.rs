use std::process::Stdio;

use async_trait::async_trait;
use tracing::debug;

use crate::{
    BuildRequest, CapturedOutput, ContainerEngine, EngineError, EngineKind, ImageBuilder, ImageHandle, RunSpec,
    RunnerSandbox,
};

const BUILD_FILE_NAME: &str = "Containerfile";
const STDERR_TAIL_LINES: usize = 20;

/// Drives `docker` or `podman` through their command line.
#[derive(Clone, Debug)]
pub struct CliEngine {
    pub kind: EngineKind,
    pub program: String,
}

impl CliEngine {
    pub fn new(kind: EngineKind) -> Self {
        Self { kind, program: kind.program().to_string() }
    }

    /// Use a specific binary (e.g. a wrapper script) for `kind`.
    pub fn with_program(kind: EngineKind, program: impl Into<String>) -> Self {
        Self { kind, program: program.into() }
    }

    pub fn build_args(&self, request: &BuildRequest) -> Vec<String> {
        vec![
            "build".into(),
            "-f".into(),
            request.scratch_dir.join(BUILD_FILE_NAME).display().to_string(),
            "-t".into(),
            request.tag.to_string(),
            request.context_dir.display().to_string(),
        ]
    }

    pub fn run_args(&self, image: &ImageHandle, spec: &RunSpec) -> Vec<String> {
        let mut args: Vec<String> = vec!["run".into(), "--rm".into()];
        if self.kind == EngineKind::Podman {
            // keep the host uid so a non-root image user's files stay removable
            args.push("--userns=keep-id".into());
        }
        for m in &spec.mounts {
            let mut volume = format!("{}:{}", m.host.display(), m.container);
            if self.kind == EngineKind::Podman {
                volume.push_str(":z");
            }
            args.push("-v".into());
            args.push(volume);
        }
        for (k, v) in &spec.env {
            args.push("-e".into());
            args.push(format!("{k}={v}"));
        }
        args.push(image.tag.to_string());
        args.extend(spec.command.iter().cloned());
        args
    }

    /// `<program> --version`, trimmed.
    pub async fn version(&self) -> Result<String, EngineError> {
        let out = self.exec(&["--version".to_string()]).await?;
        Ok(out.stdout.trim().to_string())
    }

    async fn exec(&self, args: &[String]) -> Result<CapturedOutput, EngineError> {
        debug!(program = %self.program, ?args, "exec");
        let out = tokio::process::Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| EngineError::Spawn { program: self.program.clone(), source })?;

        let captured = CapturedOutput {
            code: out.status.code(),
            stdout: String::from_utf8_lossy(&out.stdout).to_string(),
            stderr: String::from_utf8_lossy(&out.stderr).to_string(),
        };
        if !out.status.success() {
            return Err(EngineError::Failed {
                program: self.program.clone(),
                code: captured.code,
                stderr_tail: tail(&captured.stderr, STDERR_TAIL_LINES),
            });
        }
        Ok(captured)
    }
}

#[async_trait]
impl ImageBuilder for CliEngine {
    async fn build(&self, request: &BuildRequest) -> Result<ImageHandle, EngineError> {
        let path = request.scratch_dir.join(BUILD_FILE_NAME);
        tokio::fs::write(&path, &request.build_file_content)
            .await
            .map_err(|source| EngineError::Io { path: path.clone(), source })?;
        self.exec(&self.build_args(request)).await?;
        Ok(ImageHandle { tag: request.tag.clone() })
    }

    async fn remove(&self, image: &ImageHandle) -> Result<(), EngineError> {
        self.exec(&["image".into(), "rm".into(), "--force".into(), image.tag.to_string()]).await?;
        Ok(())
    }
}

#[async_trait]
impl RunnerSandbox for CliEngine {
    async fn run(&self, image: &ImageHandle, spec: &RunSpec) -> Result<CapturedOutput, EngineError> {
        self.exec(&self.run_args(image, spec)).await
    }
}

impl ContainerEngine for CliEngine {
    fn describe(&self) -> String {
        format!("{} ({})", self.kind, self.program)
    }
}

/// Last `n` lines of `text`.
pub fn tail(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}
