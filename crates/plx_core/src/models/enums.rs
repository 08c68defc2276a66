//! Status and strategy enums for extraction jobs.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a job.
///
/// Transitions move forward only: `Pending` -> `Processing` ->
/// `{Completed | Failed}`, with `Cancelled` reachable from `Pending` or
/// `Processing`. Terminal states never transition again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Created but not yet started.
    #[default]
    Pending,
    /// A worker process is running for this job.
    Processing,
    /// Worker finished and its output was accepted.
    Completed,
    /// Worker failed, or its output could not be parsed.
    Failed,
    /// Cancelled by the caller.
    Cancelled,
}

impl JobStatus {
    /// Check whether this status permits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Get display string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Worker invocation mode, chosen by batch size unless overridden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Simple extraction program: delay flag plus item list.
    Basic,
    /// Resilient extraction program: delay and chunk-size flags plus item list.
    Advanced,
}

impl Strategy {
    /// Get display string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Advanced => "advanced",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&JobStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
    }

    #[test]
    fn strategy_display() {
        assert_eq!(Strategy::Basic.to_string(), "basic");
        assert_eq!(Strategy::Advanced.to_string(), "advanced");
    }
}
