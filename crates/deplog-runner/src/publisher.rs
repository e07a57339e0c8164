use std::io::Write;
use std::path::PathBuf;

use deplog_core::{PipelineError, Variant};
use deplog_extract::DependencyLog;
use tracing::info;

pub trait ResultPublisher: Send + Sync {
    /// Write `log` to its target path, replacing whatever was there.
    fn publish(&self, variant: &Variant, log: &DependencyLog) -> Result<PathBuf, PipelineError>;
}

/// Writes logs to the filesystem through a sibling temp file and a rename, so a
/// reader never sees a half-written log.
#[derive(Clone, Debug, Default)]
pub struct FsPublisher;

impl FsPublisher {
    pub fn new() -> Self {
        Self
    }
}

impl ResultPublisher for FsPublisher {
    fn publish(&self, variant: &Variant, log: &DependencyLog) -> Result<PathBuf, PipelineError> {
        let path = log.target_path.clone();
        let err = |source: std::io::Error| PipelineError::Publish { variant: variant.to_string(), path: path.clone(), source };

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(err)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(err)?;
        tmp.write_all(log.render().as_bytes()).map_err(err)?;
        tmp.flush().map_err(err)?;
        // temp files are created 0600; the rename would carry that over
        #[cfg(unix)]
        tmp.as_file().set_permissions(target_permissions(&path)).map_err(err)?;
        tmp.persist(&path).map_err(|e| err(e.error))?;

        info!(variant = %variant, path = %path.display(), "published dependency log");
        Ok(path)
    }
}

/// Mode of the log being replaced, or 0644 for a new one.
#[cfg(unix)]
fn target_permissions(path: &std::path::Path) -> std::fs::Permissions {
    use std::os::unix::fs::PermissionsExt;
    match std::fs::metadata(path) {
        Ok(meta) => meta.permissions(),
        Err(_) => std::fs::Permissions::from_mode(0o644),
    }
}
