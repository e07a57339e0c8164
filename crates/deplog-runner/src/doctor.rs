use anyhow::{anyhow, Result};
use deplog_engine::CliEngine;
use tracing::info;

/// Check that the engine binary is installed and answers `--version`.
pub async fn doctor(engine: &CliEngine) -> Result<String> {
    let version = engine.version().await.map_err(|e| {
        anyhow!("{} is not usable ({}); install it or try --use-alternate-engine", engine.program, e.detail())
    })?;
    if version.is_empty() {
        return Err(anyhow!("{} --version printed nothing", engine.program));
    }
    info!(engine = %engine.kind, %version, "engine ok");
    Ok(version)
}
