use std::path::Path;

use anyhow::{Context, Result};
use deplog_core::JobStatus;
use serde::{Deserialize, Serialize};

use crate::scheduler::AggregateResult;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct VariantRecord {
    pub variant: String,
    pub status: JobStatus,
    pub log_path: Option<String>,
    pub error: Option<String>,
    pub exit_code: i32,
}

/// Machine-readable record of one `run-all`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub engine: String,
    pub variants: Vec<VariantRecord>,
}

impl RunSummary {
    pub fn from_result(result: &AggregateResult, engine: impl Into<String>) -> Self {
        let variants = result
            .outcomes
            .iter()
            .map(|o| match &o.result {
                Ok(path) => VariantRecord {
                    variant: o.variant.to_string(),
                    status: o.status,
                    log_path: Some(path.display().to_string()),
                    error: None,
                    exit_code: 0,
                },
                Err(e) => VariantRecord {
                    variant: o.variant.to_string(),
                    status: o.status,
                    log_path: None,
                    error: Some(e.to_string()),
                    exit_code: e.exit_code(),
                },
            })
            .collect();
        Self { run_id: result.run_id.to_string(), engine: engine.into(), variants }
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        let bytes = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, bytes).with_context(|| format!("write summary {}", path.display()))?;
        Ok(())
    }
}
