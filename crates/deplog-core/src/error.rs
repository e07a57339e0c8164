use std::path::PathBuf;

use thiserror::Error;

/// Everything that can stop a pipeline, labelled with the variant it hit.
///
/// Engine output is carried verbatim so operators see the tool's own message.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("usage error: {0}")]
    Usage(String),

    #[error("input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("[{variant}] image build failed ({}):\n{stderr}", exit_label(.code))]
    Build { variant: String, code: Option<i32>, stderr: String },

    #[error("[{variant}] sandbox run failed ({}):\n{stderr}", exit_label(.code))]
    Run { variant: String, code: Option<i32>, stderr: String },

    #[error("[{variant}] {message}")]
    Extract { variant: String, message: String },

    #[error("[{variant}] could not write {}: {source}", .path.display())]
    Publish {
        variant: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[{variant}] cancelled after a sibling variant failed")]
    Cancelled { variant: String },

    #[error("[{variant}] internal error: {message}")]
    Internal { variant: String, message: String },
}

impl PipelineError {
    /// Process exit code for this error.
    ///
    /// 1 usage, 2 missing input, otherwise whatever the engine exited with.
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Usage(_) => 1,
            PipelineError::InputNotFound(_) => 2,
            PipelineError::Build { code, .. } | PipelineError::Run { code, .. } => match code {
                Some(c) if *c != 0 => *c,
                _ => 1,
            },
            PipelineError::Extract { .. }
            | PipelineError::Publish { .. }
            | PipelineError::Cancelled { .. }
            | PipelineError::Internal { .. } => 1,
        }
    }

    pub fn variant(&self) -> Option<&str> {
        match self {
            PipelineError::Usage(_) | PipelineError::InputNotFound(_) => None,
            PipelineError::Build { variant, .. }
            | PipelineError::Run { variant, .. }
            | PipelineError::Extract { variant, .. }
            | PipelineError::Publish { variant, .. }
            | PipelineError::Cancelled { variant }
            | PipelineError::Internal { variant, .. } => Some(variant),
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exit {c}"),
        None => "no exit code".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(PipelineError::Usage("x".into()).exit_code(), 1);
        assert_eq!(PipelineError::InputNotFound("Dockerfile".into()).exit_code(), 2);
        let build = PipelineError::Build { variant: "dev".into(), code: Some(125), stderr: String::new() };
        assert_eq!(build.exit_code(), 125);
        let run = PipelineError::Run { variant: "dev".into(), code: None, stderr: String::new() };
        assert_eq!(run.exit_code(), 1);
    }

    #[test]
    fn message_carries_variant_and_stderr() {
        let e = PipelineError::Build { variant: "dev".into(), code: Some(1), stderr: "no such image".into() };
        let msg = e.to_string();
        assert!(msg.starts_with("[dev] image build failed (exit 1)"));
        assert!(msg.contains("no such image"));
        assert_eq!(e.variant(), Some("dev"));
    }
}
