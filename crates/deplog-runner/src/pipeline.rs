use std::path::PathBuf;
use std::sync::Arc;

use deplog_core::{BuildJob, ImageTag, JobStatus, PipelineError, Variant};
use deplog_engine::{
    capture_command, BuildRequest, ContainerEngine, EngineError, ImageHandle, Mount, RunSpec, ScratchWorkspace,
    ENV_OUT, ENV_REPO, ENV_SELF_PACKAGE, ENV_SUBTITLE, FREEZE_FILE, OUTPUT_MOUNT, PYTHON_VERSION_FILE, TREE_FILE,
};
use deplog_extract::{CapturedListings, LogExtractor};
use tracing::{debug, info, warn};

use crate::publisher::ResultPublisher;

/// Everything a job needs besides its own spec. Shared read-only by all jobs
/// of a run; nothing in here is looked up from the process environment.
pub struct RunContext {
    pub engine: Arc<dyn ContainerEngine>,
    pub publisher: Arc<dyn ResultPublisher>,
    pub extractor: LogExtractor,
    /// Empty when no self package is configured.
    pub self_package: String,
    pub repo: String,
    pub context_dir: PathBuf,
    pub keep_images: bool,
    /// Parent for scratch workspaces; the system temp dir when `None`.
    pub scratch_root: Option<PathBuf>,
}

impl RunContext {
    pub fn new(
        engine: Arc<dyn ContainerEngine>,
        publisher: Arc<dyn ResultPublisher>,
        self_package: impl Into<String>,
        context_dir: PathBuf,
    ) -> Self {
        let self_package = self_package.into();
        Self {
            engine,
            publisher,
            extractor: LogExtractor::new(&self_package),
            self_package,
            repo: String::new(),
            context_dir,
            keep_images: false,
            scratch_root: None,
        }
    }
}

/// One variant's inputs, resolved up front.
#[derive(Clone, Debug)]
pub struct JobSpec {
    pub variant: Variant,
    pub build_file_content: String,
    pub image_tag: ImageTag,
    pub subtitle: String,
    pub target_path: PathBuf,
}

#[derive(Debug)]
pub struct VariantOutcome {
    pub variant: Variant,
    pub status: JobStatus,
    pub result: Result<PathBuf, PipelineError>,
}

impl VariantOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub(crate) fn failed(variant: Variant, error: PipelineError) -> Self {
        Self { variant, status: JobStatus::Failed, result: Err(error) }
    }
}

/// Build, run, extract and publish one variant.
///
/// Never panics on engine or IO failure; every error ends up in the outcome.
pub async fn run_job(ctx: &RunContext, spec: JobSpec) -> VariantOutcome {
    let mut job = BuildJob::new(spec.variant.clone());
    info!(variant = %spec.variant, tag = %spec.image_tag, "job started");

    let result = drive(ctx, &spec, &mut job).await;
    if let Err(e) = &result {
        warn!(variant = %spec.variant, error = %e, "job failed");
        if !job.status().is_terminal() {
            transition(&mut job, JobStatus::Failed);
        }
    } else {
        info!(variant = %spec.variant, "job succeeded");
    }

    VariantOutcome { variant: spec.variant, status: job.status(), result }
}

async fn drive(ctx: &RunContext, spec: &JobSpec, job: &mut BuildJob) -> Result<PathBuf, PipelineError> {
    let label = spec.variant.to_string();

    transition(job, JobStatus::Building);
    let scratch = create_scratch(ctx, spec).await.map_err(|e| PipelineError::Build {
        variant: label.clone(),
        code: None,
        stderr: format!("create scratch workspace: {e}"),
    })?;

    let result = drive_in(ctx, spec, job, &scratch).await;
    release_scratch(scratch).await;
    result
}

async fn drive_in(
    ctx: &RunContext,
    spec: &JobSpec,
    job: &mut BuildJob,
    scratch: &ScratchWorkspace,
) -> Result<PathBuf, PipelineError> {
    let label = spec.variant.to_string();

    let request = BuildRequest {
        build_file_content: spec.build_file_content.clone(),
        tag: spec.image_tag.clone(),
        context_dir: ctx.context_dir.clone(),
        scratch_dir: scratch.path().to_path_buf(),
    };
    let image = ctx.engine.build(&request).await.map_err(|e| build_error(&label, e))?;
    match job.built(image.tag.clone()) {
        Ok(()) => debug!(variant = %label, from = ?JobStatus::Building, to = ?JobStatus::Built, "job transition"),
        Err(e) => warn!(error = %e, "unexpected job state"),
    }

    transition(job, JobStatus::Running);
    let run = ctx.engine.run(&image, &run_spec(ctx, spec, scratch)).await;
    remove_image(ctx, &image).await;
    let captured = run.map_err(|e| run_error(&label, e))?;
    debug!(variant = %label, stdout_bytes = captured.stdout.len(), "capture step finished");

    let listings = read_listings(&label, scratch).await?;
    let log = ctx.extractor.extract(&listings, &spec.subtitle, spec.target_path.clone());

    let publisher = Arc::clone(&ctx.publisher);
    let variant = spec.variant.clone();
    let path = tokio::task::spawn_blocking(move || publisher.publish(&variant, &log))
        .await
        .map_err(|e| PipelineError::Internal { variant: label.clone(), message: format!("publish task failed: {e}") })??;

    transition(job, JobStatus::Succeeded);
    Ok(path)
}

fn transition(job: &mut BuildJob, next: JobStatus) {
    let from = job.status();
    match job.advance(next) {
        Ok(()) => debug!(variant = %job.variant, ?from, to = ?next, "job transition"),
        Err(e) => warn!(error = %e, "unexpected job state"),
    }
}

async fn create_scratch(ctx: &RunContext, spec: &JobSpec) -> std::io::Result<ScratchWorkspace> {
    let label = spec.variant.name().unwrap_or("base").to_string();
    let root = ctx.scratch_root.clone();
    let created = tokio::task::spawn_blocking(move || match root {
        Some(root) => ScratchWorkspace::create_in(&root, &label),
        None => ScratchWorkspace::create(&label),
    })
    .await;
    created.map_err(std::io::Error::other)?
}

/// Removes the workspace off the async threads. An aborted job still drops it
/// in place.
async fn release_scratch(scratch: ScratchWorkspace) {
    if let Err(e) = tokio::task::spawn_blocking(move || drop(scratch)).await {
        warn!(error = %e, "scratch cleanup task failed");
    }
}

fn run_spec(ctx: &RunContext, spec: &JobSpec, scratch: &ScratchWorkspace) -> RunSpec {
    RunSpec {
        command: capture_command(),
        mounts: vec![Mount { host: scratch.output_dir(), container: OUTPUT_MOUNT.to_string() }],
        env: vec![
            (ENV_SELF_PACKAGE.to_string(), ctx.self_package.clone()),
            (ENV_REPO.to_string(), ctx.repo.clone()),
            (ENV_SUBTITLE.to_string(), spec.subtitle.clone()),
            (ENV_OUT.to_string(), OUTPUT_MOUNT.to_string()),
        ],
    }
}

async fn remove_image(ctx: &RunContext, image: &ImageHandle) {
    if ctx.keep_images {
        return;
    }
    if let Err(e) = ctx.engine.remove(image).await {
        warn!(tag = %image.tag, error = %e, "could not remove image");
    }
}

async fn read_listings(label: &str, scratch: &ScratchWorkspace) -> Result<CapturedListings, PipelineError> {
    let missing = |name: &str, e: std::io::Error| PipelineError::Extract {
        variant: label.to_string(),
        message: format!("capture step produced no {name}: {e}"),
    };
    let freeze = scratch.read_output(FREEZE_FILE).await.map_err(|e| missing(FREEZE_FILE, e))?;
    let tree = scratch.read_output(TREE_FILE).await.map_err(|e| missing(TREE_FILE, e))?;
    let python_version = scratch.read_output(PYTHON_VERSION_FILE).await.unwrap_or_else(|_| "unknown".to_string());
    Ok(CapturedListings { freeze, tree, python_version })
}

fn build_error(label: &str, e: EngineError) -> PipelineError {
    PipelineError::Build { variant: label.to_string(), code: e.code(), stderr: e.detail() }
}

fn run_error(label: &str, e: EngineError) -> PipelineError {
    PipelineError::Run { variant: label.to_string(), code: e.code(), stderr: e.detail() }
}
