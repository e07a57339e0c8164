//! Text handed to the engine: the generated build file and the capture script.

/// Where the job's scratch output directory is mounted inside the container.
pub const OUTPUT_MOUNT: &str = "/deplog-out";

pub const FREEZE_FILE: &str = "freeze.txt";
pub const TREE_FILE: &str = "tree.txt";
pub const PYTHON_VERSION_FILE: &str = "python-version.txt";

/// Environment passed to the capture step.
pub const ENV_SELF_PACKAGE: &str = "DEPLOG_SELF_PACKAGE";
pub const ENV_REPO: &str = "DEPLOG_REPO";
pub const ENV_SUBTITLE: &str = "DEPLOG_SUBTITLE";
pub const ENV_OUT: &str = "DEPLOG_OUT";

/// Build file installing `install_target` on top of `base_image`.
///
/// The build context is copied to `/src`, so `install_target` is normally
/// `/src` or `/src[<extra>]`.
pub fn render_build_file(base_image: &str, install_target: &str) -> String {
    format!(
        "FROM {base_image}\n\
         WORKDIR /src\n\
         COPY . /src\n\
         RUN python -m pip install --no-cache-dir --upgrade pip \\\n \
         && python -m pip install --no-cache-dir \"{install_target}\"\n"
    )
}

/// Shell script run inside the image. Freeze is captured before pipdeptree is
/// installed, so the tool never shows up in the freeze listing.
pub fn capture_script() -> String {
    format!(
        "set -eu\n\
         out=\"${{{ENV_OUT}:-{OUTPUT_MOUNT}}}\"\n\
         python --version > \"$out/{PYTHON_VERSION_FILE}\" 2>&1\n\
         python -m pip freeze > \"$out/{FREEZE_FILE}\"\n\
         python -m pip install --quiet --disable-pip-version-check pipdeptree > /dev/null\n\
         python -m pipdeptree --exclude pipdeptree > \"$out/{TREE_FILE}\"\n\
         chmod a+rw \"$out\"/*.txt || true\n"
    )
}

pub fn capture_command() -> Vec<String> {
    vec!["sh".into(), "-c".into(), capture_script()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_file_installs_target() {
        let text = render_build_file("python:3.12", "/src[dev]");
        assert!(text.starts_with("FROM python:3.12\n"));
        assert!(text.contains("COPY . /src\n"));
        assert!(text.contains("pip install --no-cache-dir \"/src[dev]\"\n"));
    }

    #[test]
    fn script_writes_into_output_mount() {
        let script = capture_script();
        assert!(script.contains("out=\"${DEPLOG_OUT:-/deplog-out}\""));
        let freeze = script.find("pip freeze").unwrap();
        let install = script.find("install --quiet").unwrap();
        assert!(freeze < install);
        assert!(script.contains("> \"$out/tree.txt\""));
    }
}
