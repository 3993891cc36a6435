//! Progress tracking for analysis runs.
//!
//! The tracker receives structured events from the orchestrator, maintains a
//! per-task timeline, computes an ETA from completed-task durations, and
//! pushes immutable snapshots to an observer (typically a UI).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::task::TaskStatus;

/// Granularity of a progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressLevel {
    /// Phase transitions (Phase 1, Phase 2).
    Phase,
    /// Individual task lifecycle.
    Task,
    /// Skill loading and execution.
    Skill,
    /// External API calls.
    Api,
    /// Language-model operations.
    Llm,
    /// Generic actions.
    Action,
}

/// A single progress event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub task_id: String,
    pub task_name: String,
    pub action: String,
    pub status: TaskStatus,
    pub level: ProgressLevel,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// One recorded action within a task's timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub action: String,
    pub level: ProgressLevel,
    pub timestamp: DateTime<Utc>,
}

/// Per-task progress record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskProgress {
    pub id: String,
    pub name: String,
    pub status: TaskStatus,
    pub actions: Vec<ActionRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

/// The most recent in-progress action, surfaced to the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentAction {
    pub task_id: String,
    pub task_name: String,
    pub action: String,
    pub level: ProgressLevel,
}

/// Observer-facing view of one task (last five actions only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskProgressView {
    pub id: String,
    pub name: String,
    pub status: TaskStatus,
    pub actions: Vec<ActionRecord>,
}

/// Immutable view of run progress at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub phase: String,
    pub total_tasks: usize,
    pub completed: usize,
    pub failed: usize,
    pub in_progress: bool,
    /// Clamped to at most 100.
    pub progress_percent: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_action: Option<CurrentAction>,
    pub tasks: Vec<TaskProgressView>,
    pub eta: String,
    pub elapsed: String,
}

/// Receives snapshots after every emitted event. Called synchronously on the
/// orchestrator's task; implementations must stay fast or buffer internally.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, snapshot: &ProgressSnapshot);
}

impl<F> ProgressObserver for F
where
    F: Fn(&ProgressSnapshot) + Send + Sync,
{
    fn on_progress(&self, snapshot: &ProgressSnapshot) {
        self(snapshot)
    }
}

/// Tracks analysis progress and notifies an observer.
pub struct ProgressTracker {
    observer: Option<Arc<dyn ProgressObserver>>,
    events: Vec<ProgressEvent>,
    tasks: Vec<TaskProgress>,
    start_time: DateTime<Utc>,
    task_durations_secs: Vec<f64>,
    current_phase: String,
    total_tasks: usize,
    completed_tasks: usize,
    failed_tasks: usize,
}

impl ProgressTracker {
    /// Create a tracker; the task total grows as phases are planned.
    pub fn new(observer: Option<Arc<dyn ProgressObserver>>) -> Self {
        Self {
            observer,
            events: Vec::new(),
            tasks: Vec::new(),
            start_time: Utc::now(),
            task_durations_secs: Vec::new(),
            current_phase: String::new(),
            total_tasks: 0,
            completed_tasks: 0,
            failed_tasks: 0,
        }
    }

    /// Register newly planned tasks in the total.
    pub fn add_planned_tasks(&mut self, count: usize) {
        self.total_tasks += count;
    }

    /// Set the current phase label and notify the observer.
    pub fn set_phase(&mut self, phase: impl Into<String>) {
        self.current_phase = phase.into();
        self.notify();
    }

    /// Emit a progress event, updating the per-task record and notifying the
    /// observer with a fresh snapshot.
    pub fn emit(
        &mut self,
        task_id: &str,
        task_name: &str,
        action: &str,
        status: TaskStatus,
        level: ProgressLevel,
        details: Option<Value>,
    ) {
        let event = ProgressEvent {
            task_id: task_id.to_string(),
            task_name: task_name.to_string(),
            action: action.to_string(),
            status,
            level,
            timestamp: Utc::now(),
            details,
        };

        let timestamp = event.timestamp;
        self.events.push(event);

        let index = match self.tasks.iter().position(|t| t.id == task_id) {
            Some(index) => index,
            None => {
                self.tasks.push(TaskProgress {
                    id: task_id.to_string(),
                    name: task_name.to_string(),
                    status,
                    actions: Vec::new(),
                    start_time: None,
                    end_time: None,
                });
                self.tasks.len() - 1
            }
        };
        let task = &mut self.tasks[index];

        task.status = status;
        task.actions.push(ActionRecord {
            action: action.to_string(),
            level,
            timestamp,
        });

        match status {
            TaskStatus::InProgress => {
                if task.start_time.is_none() {
                    task.start_time = Some(timestamp);
                }
            }
            TaskStatus::Completed => {
                if let Some(start) = task.start_time {
                    task.end_time = Some(timestamp);
                    let duration = (timestamp - start).num_milliseconds() as f64 / 1000.0;
                    self.task_durations_secs.push(duration);
                }
                self.completed_tasks += 1;
            }
            TaskStatus::Failed => {
                if task.start_time.is_some() {
                    task.end_time = Some(timestamp);
                }
                self.failed_tasks += 1;
            }
            TaskStatus::Pending => {}
        }

        self.notify();
    }

    /// Build an immutable snapshot of the current state.
    pub fn snapshot(&self) -> ProgressSnapshot {
        let finished = self.completed_tasks + self.failed_tasks;
        let progress_percent = if self.total_tasks > 0 {
            ((finished as f64 / self.total_tasks as f64) * 100.0).min(100.0)
        } else {
            0.0
        };

        let current_action = self.events.last().and_then(|event| {
            if event.status == TaskStatus::InProgress {
                Some(CurrentAction {
                    task_id: event.task_id.clone(),
                    task_name: event.task_name.clone(),
                    action: event.action.clone(),
                    level: event.level,
                })
            } else {
                None
            }
        });

        let tasks = self
            .tasks
            .iter()
            .map(|task| TaskProgressView {
                id: task.id.clone(),
                name: task.name.clone(),
                status: task.status,
                actions: task.actions.iter().rev().take(5).rev().cloned().collect(),
            })
            .collect();

        ProgressSnapshot {
            phase: self.current_phase.clone(),
            total_tasks: self.total_tasks,
            completed: self.completed_tasks,
            failed: self.failed_tasks,
            in_progress: finished < self.total_tasks,
            progress_percent,
            current_action,
            tasks,
            eta: self.estimated_time_remaining(),
            elapsed: self.elapsed(),
        }
    }

    /// All events emitted so far.
    pub fn events(&self) -> &[ProgressEvent] {
        &self.events
    }

    /// Full action history for one task.
    pub fn task_history(&self, task_id: &str) -> &[ActionRecord] {
        self.tasks
            .iter()
            .find(|t| t.id == task_id)
            .map(|t| t.actions.as_slice())
            .unwrap_or(&[])
    }

    /// ETA from mean completed-task duration times remaining tasks.
    fn estimated_time_remaining(&self) -> String {
        if self.task_durations_secs.is_empty() {
            return "Calculating...".to_string();
        }

        let finished = self.completed_tasks + self.failed_tasks;
        let remaining = self.total_tasks.saturating_sub(finished);
        if remaining == 0 {
            return "Almost done...".to_string();
        }

        let avg = self.task_durations_secs.iter().sum::<f64>()
            / self.task_durations_secs.len() as f64;
        format_duration(avg * remaining as f64)
    }

    fn elapsed(&self) -> String {
        let secs = (Utc::now() - self.start_time).num_milliseconds() as f64 / 1000.0;
        format_duration(secs.max(0.0))
    }

    fn notify(&self) {
        if let Some(observer) = &self.observer {
            observer.on_progress(&self.snapshot());
        }
    }
}

/// Format a duration in seconds to a human-readable string.
fn format_duration(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    if seconds < 60.0 {
        format!("{} seconds", seconds as u64)
    } else if seconds < 3600.0 {
        let minutes = (seconds / 60.0) as u64;
        let secs = (seconds % 60.0) as u64;
        let plural = if minutes != 1 { "s" } else { "" };
        format!("{minutes} minute{plural} {secs} seconds")
    } else {
        let hours = (seconds / 3600.0) as u64;
        let minutes = ((seconds % 3600.0) / 60.0) as u64;
        let plural = if hours != 1 { "s" } else { "" };
        format!("{hours} hour{plural} {minutes} minutes")
    }
}
