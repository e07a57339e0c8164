use serde::{Deserialize, Serialize};

/// What the scheduler does with siblings once one variant fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Keep running every variant and report all failures at the end.
    #[default]
    BestEffort,
    /// Abort outstanding variants after the first failure.
    FailFast,
}
