use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

const OUTPUT_DIR: &str = "out";

/// A job-private temporary directory, removed when dropped.
///
/// Drop runs on every exit path of the owning task, including errors, panics
/// and the task being aborted by the scheduler. Layout:
///
/// ```text
/// <tmp>/deplog-<label>-XXXXXX/
///     Containerfile     build file handed to the engine
///     out/              bind-mounted into the container
/// ```
#[derive(Debug)]
pub struct ScratchWorkspace {
    dir: TempDir,
}

impl ScratchWorkspace {
    pub fn create(label: &str) -> io::Result<Self> {
        Self::create_in(&std::env::temp_dir(), label)
    }

    pub fn create_in(parent: &Path, label: &str) -> io::Result<Self> {
        std::fs::create_dir_all(parent)?;
        let dir = tempfile::Builder::new().prefix(&format!("deplog-{label}-")).tempdir_in(parent)?;
        let out = dir.path().join(OUTPUT_DIR);
        std::fs::create_dir(&out)?;
        // the image may run as a user other than the host's
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&out, std::fs::Permissions::from_mode(0o777))?;
        }
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Directory the in-container step writes its results into.
    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join(OUTPUT_DIR)
    }

    pub async fn read_output(&self, name: &str) -> io::Result<String> {
        tokio::fs::read_to_string(self.output_dir().join(name)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn removed_on_drop() {
        let parent = tempfile::tempdir().unwrap();
        let ws = ScratchWorkspace::create_in(parent.path(), "base").unwrap();
        let path = ws.path().to_path_buf();
        std::fs::write(ws.output_dir().join("freeze.txt"), "requests==2.27.1\n").unwrap();
        assert_eq!(ws.read_output("freeze.txt").await.unwrap(), "requests==2.27.1\n");
        drop(ws);
        assert!(!path.exists());
    }

    #[test]
    fn names_are_unique() {
        let parent = tempfile::tempdir().unwrap();
        let a = ScratchWorkspace::create_in(parent.path(), "dev").unwrap();
        let b = ScratchWorkspace::create_in(parent.path(), "dev").unwrap();
        assert_ne!(a.path(), b.path());
        assert!(a.path().file_name().unwrap().to_string_lossy().starts_with("deplog-dev-"));
    }

    #[test]
    fn removed_on_panic() {
        let parent = tempfile::tempdir().unwrap();
        let parent_path = parent.path().to_path_buf();
        let result = std::panic::catch_unwind(move || {
            let _ws = ScratchWorkspace::create_in(&parent_path, "boom").unwrap();
            panic!("job blew up");
        });
        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(parent.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn output_dir_is_writable_by_any_user() {
        use std::os::unix::fs::PermissionsExt;
        let parent = tempfile::tempdir().unwrap();
        let ws = ScratchWorkspace::create_in(parent.path(), "base").unwrap();
        let mode = std::fs::metadata(ws.output_dir()).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o777);
    }
}
