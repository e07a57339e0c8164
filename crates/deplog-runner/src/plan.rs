use std::path::PathBuf;

use deplog_core::{variant_set, PipelineError, Variant};
use deplog_engine::render_build_file;

use crate::pipeline::JobSpec;

/// Inputs shared by every generated job of a `run-all`.
#[derive(Clone, Debug)]
pub struct PlanSettings {
    pub base_image: String,
    pub install_root: String,
    pub image_prefix: String,
    pub log_dir: PathBuf,
    pub log_file_name: String,
    /// Shown in each log's subtitle, e.g. the package name.
    pub display_name: String,
}

/// One job for the base install plus one per extra, base first.
pub fn plan_jobs(settings: &PlanSettings, extras: &[String]) -> Result<Vec<JobSpec>, PipelineError> {
    let variants = variant_set(extras.iter().cloned())?;
    Ok(variants
        .into_iter()
        .map(|variant| JobSpec {
            build_file_content: render_build_file(&settings.base_image, &variant.install_target(&settings.install_root)),
            image_tag: variant.image_tag(&settings.image_prefix),
            subtitle: subtitle(&settings.display_name, &variant),
            target_path: variant.log_path(&settings.log_dir, &settings.log_file_name),
            variant,
        })
        .collect())
}

pub fn subtitle(display_name: &str, variant: &Variant) -> String {
    match variant {
        Variant::Base => format!("Dependencies for {display_name}"),
        Variant::Named(extra) => format!("Dependencies for {display_name}[{extra}]"),
    }
}
