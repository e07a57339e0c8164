use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ImageTag, Variant};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Building,
    Built,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Pending, Building)
                | (Building, Built)
                | (Building, Failed)
                | (Built, Running)
                | (Running, Succeeded)
                | (Running, Failed)
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("illegal job transition for {variant}: {from:?} -> {to:?}")]
    IllegalTransition { variant: String, from: JobStatus, to: JobStatus },
}

/// One variant's trip through build, run, extract and publish.
///
/// Owned by the task executing it; nothing else mutates it.
#[derive(Clone, Debug)]
pub struct BuildJob {
    pub variant: Variant,
    pub image: Option<ImageTag>,
    status: JobStatus,
    history: Vec<JobStatus>,
}

impl BuildJob {
    pub fn new(variant: Variant) -> Self {
        Self { variant, image: None, status: JobStatus::Pending, history: vec![JobStatus::Pending] }
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Every status this job has been in, oldest first.
    pub fn history(&self) -> &[JobStatus] {
        &self.history
    }

    pub fn advance(&mut self, next: JobStatus) -> Result<(), JobError> {
        if !self.status.can_transition_to(next) {
            return Err(JobError::IllegalTransition {
                variant: self.variant.to_string(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.history.push(next);
        Ok(())
    }

    /// Record a successful build.
    pub fn built(&mut self, image: ImageTag) -> Result<(), JobError> {
        self.advance(JobStatus::Built)?;
        self.image = Some(image);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path() {
        let mut job = BuildJob::new(Variant::Base);
        job.advance(JobStatus::Building).unwrap();
        job.built(ImageTag::from_str("deplog-base")).unwrap();
        job.advance(JobStatus::Running).unwrap();
        job.advance(JobStatus::Succeeded).unwrap();
        assert!(job.status().is_terminal());
        assert_eq!(job.history().len(), 5);
        assert_eq!(job.image.as_ref().map(|t| t.as_str()), Some("deplog-base"));
    }

    #[test]
    fn build_can_fail() {
        let mut job = BuildJob::new(Variant::Base);
        job.advance(JobStatus::Building).unwrap();
        job.advance(JobStatus::Failed).unwrap();
        assert_eq!(job.status(), JobStatus::Failed);
    }

    #[test]
    fn rejects_skipping_states() {
        let mut job = BuildJob::new(Variant::Named("dev".into()));
        let err = job.advance(JobStatus::Running).unwrap_err();
        assert_eq!(
            err,
            JobError::IllegalTransition { variant: "dev".into(), from: JobStatus::Pending, to: JobStatus::Running }
        );
        assert_eq!(job.status(), JobStatus::Pending);
    }

    #[test]
    fn terminal_states_are_final() {
        for terminal in [JobStatus::Succeeded, JobStatus::Failed] {
            for next in [JobStatus::Pending, JobStatus::Building, JobStatus::Running, JobStatus::Failed] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }
}
