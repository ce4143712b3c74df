//! Task state definitions for tracking crawl progress
//!
//! This module defines the states a task moves through during a run.
use std::fmt;

/// Represents the current state of a task in the crawl process
///
/// Transitions are `Pending -> Running -> {Completed, Failed}`. A `Failed`
/// task becomes `Pending` again on the next run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Task has not been attempted in this run (or failed in an earlier one)
    Pending,

    /// Task is paginating its listing pages right now
    Running,

    /// Task finished and its records are part of the checkpoint
    Completed,

    /// A listing page could not be fetched; the error text is recorded
    Failed,
}

impl TaskState {
    /// Returns true if this task needs no further work in the current run
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// String form used in logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
