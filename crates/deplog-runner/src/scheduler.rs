use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use deplog_core::{FailurePolicy, ImageTag, PipelineError, RunId, Variant};
use deplog_engine::ImageHandle;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinSet};
use tracing::{debug, info, warn};

use crate::pipeline::{run_job, JobSpec, RunContext, VariantOutcome};

/// Every variant's outcome from one run, sorted by variant.
#[derive(Debug)]
pub struct AggregateResult {
    pub run_id: RunId,
    pub outcomes: Vec<VariantOutcome>,
}

impl AggregateResult {
    pub fn succeeded(&self) -> impl Iterator<Item = (&Variant, &PathBuf)> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok().map(|p| (&o.variant, p)))
    }

    pub fn failed(&self) -> impl Iterator<Item = (&Variant, &PipelineError)> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().err().map(|e| (&o.variant, e)))
    }

    pub fn is_success(&self) -> bool {
        self.failed().next().is_none()
    }

    /// 0, or the exit code of the first failed variant in sorted order.
    ///
    /// Variants cancelled by fail-fast only count when nothing else failed.
    pub fn exit_code(&self) -> i32 {
        self.failed()
            .find(|(_, e)| !matches!(e, PipelineError::Cancelled { .. }))
            .or_else(|| self.failed().next())
            .map(|(_, e)| e.exit_code())
            .unwrap_or(0)
    }
}

/// Fans a run out into one task per variant.
pub struct VariantScheduler {
    ctx: Arc<RunContext>,
    concurrency: usize,
    policy: FailurePolicy,
}

impl VariantScheduler {
    pub fn new(ctx: Arc<RunContext>) -> Self {
        Self { ctx, concurrency: 0, policy: FailurePolicy::default() }
    }

    /// At most `limit` variants in flight; 0 means no limit.
    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.concurrency = limit;
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run every job and wait for all of them.
    ///
    /// Fails up front only when two jobs share a variant. Per-variant failures
    /// land in the returned outcomes.
    pub async fn run_all(&self, jobs: Vec<JobSpec>) -> Result<AggregateResult, PipelineError> {
        let mut seen = BTreeSet::new();
        for job in &jobs {
            if !seen.insert(job.variant.clone()) {
                return Err(PipelineError::Usage(format!("duplicate variant {}", job.variant)));
            }
        }

        let run_id = RunId::new();
        info!(
            run_id = %run_id,
            variants = jobs.len(),
            concurrency = self.concurrency,
            policy = ?self.policy,
            "dispatching variants"
        );

        let sem = (self.concurrency > 0).then(|| Arc::new(Semaphore::new(self.concurrency)));
        let mut join_set: JoinSet<VariantOutcome> = JoinSet::new();
        let mut task_variants = HashMap::new();

        for spec in jobs {
            let ctx = Arc::clone(&self.ctx);
            let sem = sem.clone();
            let variant = spec.variant.clone();
            let tag = spec.image_tag.clone();
            let handle = join_set.spawn(async move {
                let _permit = match sem {
                    Some(s) => s.acquire_owned().await.ok(),
                    None => None,
                };
                run_job(&ctx, spec).await
            });
            task_variants.insert(handle.id(), (variant, tag));
        }

        let mut outcomes = Vec::with_capacity(task_variants.len());
        let mut cancelling = false;
        while let Some(res) = join_set.join_next_with_id().await {
            let outcome = match res {
                Ok((_, outcome)) => outcome,
                Err(e) => {
                    let Some((variant, _)) = task_variants.get(&e.id()).cloned() else {
                        warn!(error = %e, "untracked variant task ended");
                        continue;
                    };
                    let label = variant.to_string();
                    let error = if e.is_cancelled() {
                        PipelineError::Cancelled { variant: label }
                    } else {
                        warn!(variant = %variant, error = %e, "variant task panicked");
                        PipelineError::Internal { variant: label, message: format!("task panicked: {e}") }
                    };
                    VariantOutcome::failed(variant, error)
                }
            };

            let cancelled = matches!(outcome.result, Err(PipelineError::Cancelled { .. }));
            if !outcome.is_success() && !cancelled && self.policy == FailurePolicy::FailFast && !cancelling {
                warn!(variant = %outcome.variant, "fail-fast: cancelling outstanding variants");
                join_set.abort_all();
                cancelling = true;
            }
            outcomes.push(outcome);
        }

        if cancelling {
            self.remove_cancelled_images(&outcomes, &task_variants).await;
        }

        outcomes.sort_by(|a, b| a.variant.cmp(&b.variant));
        let result = AggregateResult { run_id, outcomes };
        info!(
            succeeded = result.succeeded().count(),
            failed = result.failed().count(),
            "run finished"
        );
        Ok(result)
    }

    /// An aborted job never reaches its own image removal. Its container is
    /// left to the engine's `--rm`.
    async fn remove_cancelled_images(&self, outcomes: &[VariantOutcome], tasks: &HashMap<Id, (Variant, ImageTag)>) {
        if self.ctx.keep_images {
            return;
        }
        let cancelled: BTreeSet<&Variant> = outcomes
            .iter()
            .filter(|o| matches!(o.result, Err(PipelineError::Cancelled { .. })))
            .map(|o| &o.variant)
            .collect();
        for (variant, tag) in tasks.values().filter(|(v, _)| cancelled.contains(v)) {
            let image = ImageHandle { tag: tag.clone() };
            // the job may have been aborted before its image existed
            if let Err(e) = self.ctx.engine.remove(&image).await {
                debug!(variant = %variant, tag = %tag, error = %e, "no image to remove for cancelled variant");
            }
        }
    }
}
