//! Task records and the task status machine.
//!
//! A task is a single unit of work within a phase, dispatched to one skill.
//! Tasks are created `Pending`, move to `InProgress` exactly once, and end in
//! one of the terminal statuses `Completed` or `Failed`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The phase a task belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskPhase {
    /// Foundation gathering (company profile, market landscape, ...).
    #[serde(rename = "phase1")]
    Phase1,
    /// Strategic framework analysis over Phase-1 results.
    #[serde(rename = "phase2")]
    Phase2,
}

impl TaskPhase {
    /// Task-ID prefix for this phase (`phase1_task_N` / `phase2_task_N`).
    pub fn task_id_prefix(&self) -> &'static str {
        match self {
            Self::Phase1 => "phase1_task_",
            Self::Phase2 => "phase2_task_",
        }
    }
}

impl std::fmt::Display for TaskPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Phase1 => write!(f, "phase1"),
            Self::Phase2 => write!(f, "phase2"),
        }
    }
}

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Whether this status ends the task's lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether a transition from `self` to `next` is legal.
    ///
    /// Pending -> InProgress -> {Completed, Failed}; a pending task may also
    /// fail directly (dependency skip, cancellation). Terminal statuses never
    /// transition again.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        match self {
            Self::Pending => matches!(next, Self::InProgress | Self::Failed),
            Self::InProgress => next.is_terminal(),
            Self::Completed | Self::Failed => false,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A single task in the execution plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier (e.g. `phase1_task_1`).
    pub id: String,
    /// Human-readable description of what the task should accomplish.
    pub description: String,
    /// Phase the task belongs to.
    pub phase: TaskPhase,
    /// Identifier of the skill that executes this task.
    pub skill: String,
    /// IDs of same-phase tasks that must complete first.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Current lifecycle status.
    #[serde(default = "default_status")]
    pub status: TaskStatus,
    /// Execution result, set on completion.
    #[serde(default)]
    pub result: Option<Value>,
    /// Failure feedback, set when the task fails.
    #[serde(default)]
    pub error: Option<String>,
    /// Stamped on the first transition to InProgress.
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    /// Stamped on the terminal transition.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

fn default_status() -> TaskStatus {
    TaskStatus::Pending
}

impl Task {
    /// Create a new pending task.
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        phase: TaskPhase,
        skill: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            phase,
            skill: skill.into(),
            dependencies: Vec::new(),
            status: TaskStatus::Pending,
            result: None,
            error: None,
            started_at: None,
            completed_at: None,
        }
    }

    /// Set the task's dependencies.
    pub fn with_dependencies(mut self, deps: Vec<String>) -> Self {
        self.dependencies = deps;
        self
    }

    /// Whether the task ended in a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_machine() {
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::InProgress));
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::Failed));
        assert!(!TaskStatus::Pending.can_transition_to(TaskStatus::Completed));
        assert!(TaskStatus::InProgress.can_transition_to(TaskStatus::Completed));
        assert!(TaskStatus::InProgress.can_transition_to(TaskStatus::Failed));
        assert!(!TaskStatus::InProgress.can_transition_to(TaskStatus::Pending));
        assert!(!TaskStatus::Completed.can_transition_to(TaskStatus::InProgress));
        assert!(!TaskStatus::Failed.can_transition_to(TaskStatus::Pending));
    }

    #[test]
    fn test_serde_shape() {
        let task = Task::new(
            "phase1_task_1",
            "Gather company intelligence",
            TaskPhase::Phase1,
            "company-intelligence",
        );
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["phase"], "phase1");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["skill"], "company-intelligence");
    }

    #[test]
    fn test_deserialize_defaults_missing_fields() {
        let task: Task = serde_json::from_str(
            r#"{"id":"phase2_task_1","description":"SWOT","phase":"phase2","skill":"swot-analyzer"}"#,
        )
        .unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.dependencies.is_empty());
        assert!(task.started_at.is_none());
    }
}
