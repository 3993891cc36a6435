//! Top-level analysis driver.
//!
//! Coordinates the run using a multi-agent pattern:
//! - Planner decomposes each phase into tasks
//! - Executor runs tasks through skills
//! - Validator accepts or rejects task output
//! - StateManager holds context across phases
//!
//! The selected [`RunMode`] decides which phases execute; a global step
//! budget caps total task executions.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::cancel::CancelToken;
use crate::config::{AnalysisConfig, RunMode};
use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::llm::LanguageModel;
use crate::planner::Planner;
use crate::progress::{ProgressLevel, ProgressObserver, ProgressSnapshot, ProgressTracker};
use crate::skill::{SkillContext, SkillRegistry};
use crate::skills::{builtin_registry, ProviderSet};
use crate::state::{RunSummary, StateManager};
use crate::task::{TaskPhase, TaskStatus};
use crate::validator::Validator;

/// Final output of a run: accumulated phase buckets plus the run summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub company: String,
    pub phase1: BTreeMap<String, Value>,
    pub phase2: BTreeMap<String, Value>,
    pub summary: RunSummary,
    pub analysis_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Orchestrates the full analysis workflow.
pub struct Orchestrator {
    config: AnalysisConfig,
    state: StateManager,
    planner: Planner,
    executor: Executor,
    validator: Validator,
    tracker: ProgressTracker,
    registry: Arc<SkillRegistry>,
    current_step: usize,
    state_path: Option<PathBuf>,
}

impl Orchestrator {
    /// Create an orchestrator with the built-in skill registry, wiring
    /// provider clients from the config's data-source toggles.
    pub fn new(config: AnalysisConfig, llm: Arc<dyn LanguageModel>) -> Result<Self> {
        let providers = ProviderSet::from_data_sources(&config.data_sources)?;
        let registry = builtin_registry(llm.clone(), providers);
        Self::with_registry(config, registry, llm)
    }

    /// Create an orchestrator with a caller-supplied skill registry.
    pub fn with_registry(
        config: AnalysisConfig,
        registry: SkillRegistry,
        llm: Arc<dyn LanguageModel>,
    ) -> Result<Self> {
        config.validate()?;

        let registry = Arc::new(registry);
        let mut state = StateManager::new();
        state.set_company(
            &config.company.name,
            &config.company.website,
            &config.company.industry,
        );
        info!(company = %config.company.name, "orchestrator initialized");

        let max_steps_per_task = config.limits.max_steps_per_task;
        Ok(Self {
            config,
            state,
            planner: Planner::new(llm.clone()),
            executor: Executor::new(registry.clone(), llm.clone(), max_steps_per_task),
            validator: Validator::new(llm),
            tracker: ProgressTracker::new(None),
            registry,
            current_step: 0,
            state_path: None,
        })
    }

    /// Attach a progress observer. Must be called before [`Self::run`].
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.tracker = ProgressTracker::new(Some(observer));
        self
    }

    /// Persist state to this path when a run is cancelled.
    pub fn with_state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_path = Some(path.into());
        self
    }

    /// Read access to the run state.
    pub fn state(&self) -> &StateManager {
        &self.state
    }

    /// Current progress view.
    pub fn progress(&self) -> ProgressSnapshot {
        self.tracker.snapshot()
    }

    /// Run the analysis selected by the configured mode.
    pub async fn run(&mut self, cancel: &CancelToken) -> ResultEnvelope {
        self.state.mark_started();

        let outcome = match self.config.mode {
            RunMode::BusinessOverview => self.run_business_overview(cancel).await,
            RunMode::FrameworksOnly => self.run_frameworks_only(cancel).await,
            RunMode::Full => self.run_full(cancel).await,
        };

        match outcome {
            Ok(envelope) => envelope,
            Err(err) => {
                error!(error = %err, "orchestrator run failed");
                if matches!(err, Error::Cancelled) {
                    if let Some(path) = self.state_path.clone() {
                        if let Err(save_err) = self.state.save(&path) {
                            warn!(error = %save_err, "failed to save state after cancellation");
                        }
                    }
                }
                self.envelope(self.config.mode.analysis_type(), Some(err.to_string()))
            }
        }
    }

    /// Save current run state for recovery.
    pub fn save_state(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        self.state.save(path)
    }

    /// Load run state from a prior session (FrameworksOnly preload path).
    pub fn load_state(&mut self, path: impl AsRef<std::path::Path>) -> Result<()> {
        self.state.load(path)
    }

    async fn run_business_overview(&mut self, cancel: &CancelToken) -> Result<ResultEnvelope> {
        info!("BUSINESS OVERVIEW ANALYSIS");
        self.run_phase(TaskPhase::Phase1, cancel).await?;

        if !self.state.has_phase1_context() {
            return Err(Error::skill("business overview produced no results"));
        }
        self.state.mark_phase1_complete();
        self.state.set_current_phase("phase1_complete");

        info!("BUSINESS OVERVIEW COMPLETE");
        Ok(self.envelope("business_overview", None))
    }

    async fn run_frameworks_only(&mut self, cancel: &CancelToken) -> Result<ResultEnvelope> {
        info!("STRATEGIC FRAMEWORKS ANALYSIS");
        if !self.state.has_phase1_context() {
            return Err(Error::precondition(
                "business overview required before running frameworks",
            ));
        }

        self.state.set_current_phase("phase2");
        self.run_phase(TaskPhase::Phase2, cancel).await?;
        self.state.mark_phase2_complete();

        info!("STRATEGIC FRAMEWORKS COMPLETE");
        Ok(self.envelope("frameworks", None))
    }

    async fn run_full(&mut self, cancel: &CancelToken) -> Result<ResultEnvelope> {
        info!("PHASE 1: FOUNDATION BUILDING");
        self.run_phase(TaskPhase::Phase1, cancel).await?;

        if !self.state.has_phase1_context() {
            return Err(Error::skill("phase 1 failed - cannot proceed to phase 2"));
        }
        self.state.mark_phase1_complete();
        self.state.set_current_phase("phase2");

        info!("PHASE 2: STRATEGY ANALYSIS");
        self.run_phase(TaskPhase::Phase2, cancel).await?;
        self.state.mark_phase2_complete();

        info!("ANALYSIS COMPLETE");
        Ok(self.envelope("full", None))
    }

    /// Plan and execute one phase: dependency-ordered tasks, step budget,
    /// validation routing, loop-detection reset per task.
    async fn run_phase(&mut self, phase: TaskPhase, cancel: &CancelToken) -> Result<()> {
        let phase_label = match phase {
            TaskPhase::Phase1 => "Phase 1",
            TaskPhase::Phase2 => "Phase 2",
        };
        self.tracker.set_phase(phase_label);

        info!("planning {phase_label} tasks");
        let tasks = match phase {
            TaskPhase::Phase1 => self.planner.plan_phase1(&self.config, &self.registry).await,
            TaskPhase::Phase2 => {
                let snapshot = self.state.phase1_snapshot();
                self.planner
                    .plan_phase2(&self.config, &snapshot, &self.registry)
                    .await
            }
        };

        for task in &tasks {
            self.state.add_task(task.clone())?;
            info!("  - {}: {}", task.id, task.description);
        }
        self.tracker.add_planned_tasks(tasks.len());

        info!("executing {} {phase_label} tasks", tasks.len());
        let mut completed_ids: Vec<String> = Vec::new();

        for task in &tasks {
            if self.current_step >= self.config.limits.max_steps {
                warn!(
                    max_steps = self.config.limits.max_steps,
                    "reached max steps - stopping {phase_label}"
                );
                break;
            }

            if cancel.is_cancelled() {
                self.fail_outstanding(phase)?;
                return Err(Error::Cancelled);
            }

            if !Validator::dependencies_met(task, &completed_ids) {
                info!(task_id = %task.id, "skipping - dependencies not met");
                continue;
            }

            self.tracker.emit(
                &task.id,
                &task.description,
                &format!("Starting {}...", task.description),
                TaskStatus::InProgress,
                ProgressLevel::Task,
                None,
            );
            self.state
                .update_task_status(&task.id, TaskStatus::InProgress, None, None)?;
            self.executor.reset_loop_detection();

            self.tracker.emit(
                &task.id,
                &task.description,
                &format!("Loading {} skill...", title_case(&task.skill)),
                TaskStatus::InProgress,
                ProgressLevel::Skill,
                None,
            );

            let context = self.phase_context(phase);
            let result = self
                .executor
                .execute_task(task, &context, &self.config, cancel)
                .await;
            self.current_step += 1;

            let (valid, feedback) = self.validator.validate(task, &result).await;
            if valid {
                let payload = result.data.clone().unwrap_or(Value::Null);
                match phase {
                    TaskPhase::Phase1 => self.state.store_phase1_result(&task.skill, payload),
                    TaskPhase::Phase2 => self.state.store_phase2_result(&task.skill, payload),
                }
                self.state.update_task_status(
                    &task.id,
                    TaskStatus::Completed,
                    Some(serde_json::to_value(&result)?),
                    None,
                )?;
                completed_ids.push(task.id.clone());
                info!(task_id = %task.id, "task completed");

                self.tracker.emit(
                    &task.id,
                    &task.description,
                    &format!("✓ Completed {}", task.description),
                    TaskStatus::Completed,
                    ProgressLevel::Task,
                    None,
                );
            } else {
                self.state.update_task_status(
                    &task.id,
                    TaskStatus::Failed,
                    None,
                    Some(feedback.clone()),
                )?;
                warn!(task_id = %task.id, feedback = %feedback, "task validation failed");

                self.tracker.emit(
                    &task.id,
                    &task.description,
                    &format!("✗ Failed: {feedback}"),
                    TaskStatus::Failed,
                    ProgressLevel::Task,
                    Some(json!({ "error": feedback })),
                );
            }
        }

        Ok(())
    }

    /// Context snapshot handed to the executor: the phase's own bucket, plus
    /// the Phase-1 snapshot underneath Phase-2 work.
    fn phase_context(&self, phase: TaskPhase) -> SkillContext {
        match phase {
            TaskPhase::Phase1 => self.state.phase1_context().clone(),
            TaskPhase::Phase2 => {
                let mut context = self.state.phase1_snapshot();
                for (slot, value) in self.state.phase2_context() {
                    context.insert(slot.clone(), value.clone());
                }
                context
            }
        }
    }

    /// Mark this phase's unfinished tasks failed after cancellation.
    fn fail_outstanding(&mut self, phase: TaskPhase) -> Result<()> {
        let outstanding: Vec<String> = self
            .state
            .tasks()
            .iter()
            .filter(|t| t.phase == phase && !t.is_terminal())
            .map(|t| t.id.clone())
            .collect();

        for task_id in outstanding {
            self.state.update_task_status(
                &task_id,
                TaskStatus::Failed,
                None,
                Some(Error::Cancelled.to_string()),
            )?;
        }
        Ok(())
    }

    fn envelope(&self, analysis_type: &str, error: Option<String>) -> ResultEnvelope {
        ResultEnvelope {
            company: self.state.company_name().to_string(),
            phase1: self.state.phase1_context().clone(),
            phase2: self.state.phase2_context().clone(),
            summary: self.state.summary(),
            analysis_type: analysis_type.to_string(),
            error,
        }
    }
}

/// "company-intelligence" -> "Company Intelligence".
fn title_case(skill: &str) -> String {
    skill
        .split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
