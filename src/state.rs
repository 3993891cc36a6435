//! Authoritative run state: company context, phase buckets, task registry,
//! timestamps, and JSON persistence.
//!
//! The state manager is the sole mutator of the task list and context
//! buckets; everything handed outward is a copy, not a view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::task::{Task, TaskPhase, TaskStatus};

/// Phase-1 skill-identifier fragments and the slots they route to.
const PHASE1_SLOTS: &[(&str, &str)] = &[
    ("company-intelligence", "company_intelligence"),
    ("business-model-canvas", "business_model_canvas"),
    ("value-chain", "value_chain"),
    ("org-structure", "org_structure"),
    ("market-intelligence", "market_intelligence"),
    ("competitor-intelligence", "competitor_intelligence"),
];

/// Phase-2 skill-identifier fragments and the slots they route to.
const PHASE2_SLOTS: &[(&str, &str)] = &[
    ("swot", "swot"),
    ("porter", "porters_five_forces"),
    ("bcg", "bcg_matrix"),
    ("blue-ocean", "blue_ocean"),
    ("pestel", "pestel"),
    ("competitive-strategy", "competitive_strategy"),
    ("sales-intelligence", "sales_intelligence"),
    ("ansoff", "ansoff_matrix"),
    ("mckinsey", "mckinsey_7s"),
    ("functional-strategy", "functional_strategy"),
    ("value-proposition", "value_proposition_canvas"),
];

fn slot_for(skill: &str, table: &[(&str, &str)]) -> String {
    for (fragment, slot) in table {
        if skill.contains(fragment) {
            return (*slot).to_string();
        }
    }
    // Unknown skills get a same-named generic slot.
    skill.to_string()
}

/// Task counts for the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub pending: usize,
}

/// Execution summary surfaced in the result envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub company: String,
    pub current_phase: String,
    pub tasks: TaskCounts,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
}

/// On-disk shape of a saved run.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedState {
    #[serde(default = "Uuid::new_v4")]
    run_id: Uuid,
    company_name: String,
    company_website: String,
    industry: String,
    phase1_context: BTreeMap<String, Value>,
    phase2_context: BTreeMap<String, Value>,
    tasks: Vec<Task>,
    current_phase: String,
    #[serde(default)]
    started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    phase1_completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    phase2_completed_at: Option<DateTime<Utc>>,
}

/// Owns all mutable run state.
#[derive(Debug, Clone)]
pub struct StateManager {
    run_id: Uuid,
    company_name: String,
    company_website: String,
    industry: String,
    phase1_context: BTreeMap<String, Value>,
    phase2_context: BTreeMap<String, Value>,
    tasks: Vec<Task>,
    current_phase: String,
    started_at: Option<DateTime<Utc>>,
    phase1_completed_at: Option<DateTime<Utc>>,
    phase2_completed_at: Option<DateTime<Utc>>,
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl StateManager {
    /// Create empty state for a fresh run.
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            company_name: String::new(),
            company_website: String::new(),
            industry: String::new(),
            phase1_context: BTreeMap::new(),
            phase2_context: BTreeMap::new(),
            tasks: Vec::new(),
            current_phase: "phase1".to_string(),
            started_at: None,
            phase1_completed_at: None,
            phase2_completed_at: None,
        }
    }

    /// Set the target company. Called once per run.
    pub fn set_company(
        &mut self,
        name: impl Into<String>,
        website: impl Into<String>,
        industry: impl Into<String>,
    ) {
        self.company_name = name.into();
        self.company_website = website.into();
        self.industry = industry.into();
    }

    pub fn company_name(&self) -> &str {
        &self.company_name
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn current_phase(&self) -> &str {
        &self.current_phase
    }

    /// Update the phase marker ("phase1", "phase1_complete", "phase2", ...).
    pub fn set_current_phase(&mut self, phase: impl Into<String>) {
        self.current_phase = phase.into();
    }

    /// Stamp the run start time if not already stamped.
    pub fn mark_started(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn mark_phase1_complete(&mut self) {
        self.phase1_completed_at = Some(Utc::now());
    }

    pub fn mark_phase2_complete(&mut self) {
        self.phase2_completed_at = Some(Utc::now());
    }

    /// Append a task to the plan. Duplicate IDs are rejected.
    pub fn add_task(&mut self, task: Task) -> Result<()> {
        if self.tasks.iter().any(|t| t.id == task.id) {
            return Err(Error::invalid_argument(format!(
                "duplicate task id: {}",
                task.id
            )));
        }
        self.tasks.push(task);
        Ok(())
    }

    /// Look up a task by ID.
    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    /// All tasks in plan order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Completed tasks, optionally filtered by phase.
    pub fn completed_tasks(&self, phase: Option<TaskPhase>) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .filter(|t| phase.map_or(true, |p| t.phase == p))
            .collect()
    }

    /// Pending tasks, optionally filtered by phase.
    pub fn pending_tasks(&self, phase: Option<TaskPhase>) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Pending)
            .filter(|t| phase.map_or(true, |p| t.phase == p))
            .collect()
    }

    /// Apply a status transition, enforcing the task status machine.
    ///
    /// `started_at` is stamped on the first transition to InProgress and
    /// `completed_at` on the terminal transition.
    pub fn update_task_status(
        &mut self,
        task_id: &str,
        status: TaskStatus,
        result: Option<Value>,
        error: Option<String>,
    ) -> Result<()> {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| Error::invalid_argument(format!("unknown task id: {task_id}")))?;

        if !task.status.can_transition_to(status) {
            return Err(Error::invalid_state(format!(
                "task {} cannot transition from {} to {}",
                task_id, task.status, status
            )));
        }

        task.status = status;
        if let Some(result) = result {
            task.result = Some(result);
        }
        if let Some(error) = error {
            task.error = Some(error);
        }

        let now = Utc::now();
        if status == TaskStatus::InProgress && task.started_at.is_none() {
            task.started_at = Some(now);
        } else if status.is_terminal() {
            task.completed_at = Some(now);
        }
        Ok(())
    }

    /// Store a Phase-1 payload in the slot its skill routes to.
    pub fn store_phase1_result(&mut self, skill: &str, payload: Value) {
        self.phase1_context
            .insert(slot_for(skill, PHASE1_SLOTS), payload);
    }

    /// Store a Phase-2 payload in the slot its skill routes to.
    pub fn store_phase2_result(&mut self, skill: &str, payload: Value) {
        self.phase2_context
            .insert(slot_for(skill, PHASE2_SLOTS), payload);
    }

    /// Whether any Phase-1 results exist (required before Phase 2).
    pub fn has_phase1_context(&self) -> bool {
        !self.phase1_context.is_empty()
    }

    /// The raw Phase-1 bucket.
    pub fn phase1_context(&self) -> &BTreeMap<String, Value> {
        &self.phase1_context
    }

    /// The raw Phase-2 bucket.
    pub fn phase2_context(&self) -> &BTreeMap<String, Value> {
        &self.phase2_context
    }

    /// Replace the Phase-1 bucket wholesale (FrameworksOnly preload path).
    pub fn set_phase1_context(&mut self, context: BTreeMap<String, Value>) {
        self.phase1_context = context;
    }

    /// Copy of the Phase-1 context with the company record
    /// embedded, suitable for Phase-2 planning and execution.
    pub fn phase1_snapshot(&self) -> BTreeMap<String, Value> {
        let mut snapshot = self.phase1_context.clone();
        snapshot.insert(
            "company".to_string(),
            json!({
                "name": self.company_name,
                "website": self.company_website,
                "industry": self.industry,
            }),
        );
        snapshot
    }

    /// Execution summary.
    pub fn summary(&self) -> RunSummary {
        let total = self.tasks.len();
        let completed = self
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .count();
        let failed = self
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Failed)
            .count();
        let pending = self
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Pending)
            .count();

        RunSummary {
            company: self.company_name.clone(),
            current_phase: self.current_phase.clone(),
            tasks: TaskCounts {
                total,
                completed,
                failed,
                pending,
            },
            started_at: self.started_at,
        }
    }

    /// Save the full state graph as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let persisted = PersistedState {
            run_id: self.run_id,
            company_name: self.company_name.clone(),
            company_website: self.company_website.clone(),
            industry: self.industry.clone(),
            phase1_context: self.phase1_context.clone(),
            phase2_context: self.phase2_context.clone(),
            tasks: self.tasks.clone(),
            current_phase: self.current_phase.clone(),
            started_at: self.started_at,
            phase1_completed_at: self.phase1_completed_at,
            phase2_completed_at: self.phase2_completed_at,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&persisted)?)?;
        Ok(())
    }

    /// Load a saved run, reconstructing tasks, context, and timestamps.
    ///
    /// Tasks that were in flight when the state was saved restore as
    /// Pending. Unknown fields in the file are ignored.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let persisted: PersistedState = serde_json::from_str(&content)?;

        self.run_id = persisted.run_id;
        self.company_name = persisted.company_name;
        self.company_website = persisted.company_website;
        self.industry = persisted.industry;
        self.phase1_context = persisted.phase1_context;
        self.phase2_context = persisted.phase2_context;
        self.current_phase = persisted.current_phase;
        self.started_at = persisted.started_at;
        self.phase1_completed_at = persisted.phase1_completed_at;
        self.phase2_completed_at = persisted.phase2_completed_at;

        self.tasks = persisted
            .tasks
            .into_iter()
            .map(|mut task| {
                if task.status == TaskStatus::InProgress {
                    task.status = TaskStatus::Pending;
                    task.started_at = None;
                }
                task
            })
            .collect();
        Ok(())
    }
}
