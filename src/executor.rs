//! Task execution: skill routing, loop detection, and the language-model
//! fallback for unregistered skills.
//!
//! The executor never propagates failures. Every error is captured into the
//! execution result so the orchestrator can mark the task failed and move on.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::cancel::CancelToken;
use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::llm::json::parse_json_payload;
use crate::llm::{truncate_for_prompt, CompletionRequest, LanguageModel};
use crate::skill::{SkillContext, SkillRegistry};
use crate::task::Task;

/// Sliding-window size for action signatures.
const LOOP_WINDOW: usize = 5;

/// Identical consecutive signatures that count as a loop.
const LOOP_RUN_LENGTH: usize = 4;

const MAX_CONTEXT_SUMMARY_CHARS: usize = 1000;

/// Outcome of executing one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub task_id: String,
    /// "skill" for registry hits, "llm_fallback" for synthesized results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl ExecutionResult {
    fn success(task_id: &str, data: Value, method: &str) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            task_id: task_id.to_string(),
            method: Some(method.to_string()),
        }
    }

    fn failure(task_id: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            task_id: task_id.to_string(),
            method: None,
        }
    }
}

/// Routes tasks to skills, watching for repetitive behavior.
pub struct Executor {
    registry: Arc<SkillRegistry>,
    llm: Arc<dyn LanguageModel>,
    max_steps_per_task: usize,
    recent_actions: Vec<String>,
}

impl Executor {
    pub fn new(
        registry: Arc<SkillRegistry>,
        llm: Arc<dyn LanguageModel>,
        max_steps_per_task: usize,
    ) -> Self {
        Self {
            registry,
            llm,
            max_steps_per_task,
            recent_actions: Vec::new(),
        }
    }

    /// Retry budget within a single task, honored when a skill signals it.
    pub fn max_steps_per_task(&self) -> usize {
        self.max_steps_per_task
    }

    /// Record an action signature and report whether the last
    /// [`LOOP_RUN_LENGTH`] entries are identical.
    pub fn detect_loop(&mut self, signature: &str) -> bool {
        self.recent_actions.push(signature.to_string());
        if self.recent_actions.len() > LOOP_WINDOW {
            let excess = self.recent_actions.len() - LOOP_WINDOW;
            self.recent_actions.drain(..excess);
        }

        if self.recent_actions.len() >= LOOP_RUN_LENGTH {
            let tail = &self.recent_actions[self.recent_actions.len() - LOOP_RUN_LENGTH..];
            if tail.iter().all(|a| a == signature) {
                warn!(signature, "loop detected: signature repeated {LOOP_RUN_LENGTH} times");
                return true;
            }
        }
        false
    }

    /// Clear the loop-detection window. Called between tasks.
    pub fn reset_loop_detection(&mut self) {
        self.recent_actions.clear();
    }

    /// Execute a single task against the current-phase context.
    pub async fn execute_task(
        &mut self,
        task: &Task,
        context: &SkillContext,
        config: &AnalysisConfig,
        cancel: &CancelToken,
    ) -> ExecutionResult {
        info!(task_id = %task.id, skill = %task.skill, "executing task");

        if cancel.is_cancelled() {
            return ExecutionResult::failure(&task.id, Error::Cancelled.to_string());
        }

        let signature = format!("skill:{}", task.skill);
        if self.detect_loop(&signature) {
            return ExecutionResult::failure(
                &task.id,
                Error::loop_detected(signature, LOOP_RUN_LENGTH).to_string(),
            );
        }

        match self.registry.get(&task.skill) {
            Some(skill) => match skill.execute(task, context, config).await {
                Ok(result) if result.success => {
                    ExecutionResult::success(&task.id, result.data, "skill")
                }
                Ok(result) => ExecutionResult::failure(
                    &task.id,
                    result
                        .error
                        .unwrap_or_else(|| "skill reported unsuccessful completion".to_string()),
                ),
                Err(e) => {
                    error!(task_id = %task.id, error = %e, "skill execution failed");
                    ExecutionResult::failure(&task.id, e.to_string())
                }
            },
            None => {
                warn!(skill = %task.skill, "skill not registered - using llm fallback");
                match self.llm_fallback(task, context, config).await {
                    Ok(data) => ExecutionResult::success(&task.id, data, "llm_fallback"),
                    Err(e) => {
                        error!(task_id = %task.id, error = %e, "llm fallback failed");
                        ExecutionResult::failure(&task.id, e.to_string())
                    }
                }
            }
        }
    }

    /// Synthesize a best-effort payload when no skill matches the task.
    async fn llm_fallback(
        &self,
        task: &Task,
        context: &SkillContext,
        config: &AnalysisConfig,
    ) -> Result<Value> {
        let company = &config.company;
        let prompt = format!(
            "You are executing a business analysis task.\n\n\
             Company: {name}\nWebsite: {website}\nIndustry: {industry}\n\n\
             Task: {description}\nSkill: {skill}\nPhase: {phase}\n\n\
             Context from previous tasks:\n{context}\n\n\
             Accomplish this task to the best of your ability using your \
             knowledge.\n\n\
             Return a JSON object with your findings:\n\
             {{\"findings\": {{...}}, \"summary\": \"...\", \
             \"confidence\": \"low/medium/high\"}}",
            name = company.name,
            website = company.website,
            industry = company.industry,
            description = task.description,
            skill = task.skill,
            phase = task.phase,
            context = summarize_context(context),
        );

        let response = self
            .llm
            .complete(CompletionRequest::from_prompt(prompt).with_max_tokens(4000))
            .await?;

        let mut data = parse_json_payload(&response.content)
            .unwrap_or_else(|_| json!({ "summary": response.content }));
        if let Some(map) = data.as_object_mut() {
            map.insert("_fallback".to_string(), json!(true));
        }
        Ok(data)
    }
}

/// Brief context rendering for fallback prompts.
fn summarize_context(context: &SkillContext) -> String {
    let mut parts = Vec::new();

    if let Some(company) = context.get("company") {
        if let Some(name) = company.get("name").and_then(Value::as_str) {
            parts.push(format!("Company: {name}"));
        }
    }

    for (key, value) in context {
        if key == "company" {
            continue;
        }
        match value {
            Value::Object(map) if !map.is_empty() => {
                parts.push(format!("{key}: {} data points", map.len()));
            }
            Value::Array(items) if !items.is_empty() => {
                parts.push(format!("{key}: {} items", items.len()));
            }
            _ => {}
        }
    }

    truncate_for_prompt(&parts.join("\n"), MAX_CONTEXT_SUMMARY_CHARS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompanyInfo;
    use crate::llm::stubs::{FailingModel, ScriptedModel};
    use crate::skill::stubs::StaticSkill;
    use crate::skill::SkillResult;
    use crate::task::TaskPhase;
    use std::collections::BTreeMap;

    fn config() -> AnalysisConfig {
        AnalysisConfig::new(CompanyInfo::new("Acme", "acme.test", "SaaS"))
    }

    fn task(skill: &str) -> Task {
        Task::new("phase1_task_1", "do work", TaskPhase::Phase1, skill)
    }

    fn executor_with(registry: SkillRegistry, llm: Arc<dyn LanguageModel>) -> Executor {
        Executor::new(Arc::new(registry), llm, 10)
    }

    #[tokio::test]
    async fn test_registered_skill_executes() {
        let mut registry = SkillRegistry::new();
        registry.register(Arc::new(StaticSkill::trivial("company-intelligence")));
        let mut executor = executor_with(registry, Arc::new(FailingModel));

        let result = executor
            .execute_task(
                &task("company-intelligence"),
                &BTreeMap::new(),
                &config(),
                &CancelToken::new(),
            )
            .await;

        assert!(result.success);
        assert_eq!(result.method.as_deref(), Some("skill"));
        assert!(result.data.unwrap()["findings"]["status"] == json!("complete"));
    }

    #[tokio::test]
    async fn test_unregistered_skill_uses_llm_fallback() {
        let llm = Arc::new(ScriptedModel::new(vec![
            r#"{"findings": {"niche": "payments"}, "summary": "ok", "confidence": "low"}"#,
        ]));
        let mut executor = executor_with(SkillRegistry::new(), llm);

        let result = executor
            .execute_task(
                &task("mystery-skill"),
                &BTreeMap::new(),
                &config(),
                &CancelToken::new(),
            )
            .await;

        assert!(result.success);
        assert_eq!(result.method.as_deref(), Some("llm_fallback"));
        let data = result.data.unwrap();
        assert_eq!(data["_fallback"], json!(true));
        assert_eq!(data["findings"]["niche"], "payments");
    }

    #[tokio::test]
    async fn test_skill_error_is_captured_not_propagated() {
        let mut registry = SkillRegistry::new();
        registry.register(Arc::new(StaticSkill::new(
            "broken-skill",
            SkillResult::fail("backend exploded"),
        )));
        let mut executor = executor_with(registry, Arc::new(FailingModel));

        let result = executor
            .execute_task(
                &task("broken-skill"),
                &BTreeMap::new(),
                &config(),
                &CancelToken::new(),
            )
            .await;

        assert!(!result.success);
        assert!(result.error.unwrap().contains("backend exploded"));
    }

    #[tokio::test]
    async fn test_loop_detected_on_fourth_identical_signature() {
        let mut registry = SkillRegistry::new();
        registry.register(Arc::new(StaticSkill::trivial("stuck-skill")));
        let mut executor = executor_with(registry, Arc::new(FailingModel));

        let task = task("stuck-skill");
        let context = BTreeMap::new();
        let cancel = CancelToken::new();

        for _ in 0..3 {
            let result = executor
                .execute_task(&task, &context, &config(), &cancel)
                .await;
            assert!(result.success);
        }

        let result = executor
            .execute_task(&task, &context, &config(), &cancel)
            .await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("loop detected"));
    }

    #[tokio::test]
    async fn test_reset_clears_loop_window() {
        let mut registry = SkillRegistry::new();
        registry.register(Arc::new(StaticSkill::trivial("stuck-skill")));
        let mut executor = executor_with(registry, Arc::new(FailingModel));

        let task = task("stuck-skill");
        let context = BTreeMap::new();
        let cancel = CancelToken::new();

        for _ in 0..3 {
            executor
                .execute_task(&task, &context, &config(), &cancel)
                .await;
        }
        executor.reset_loop_detection();

        let result = executor
            .execute_task(&task, &context, &config(), &cancel)
            .await;
        assert!(result.success);
    }

    #[tokio::test]
    async fn test_cancelled_token_short_circuits() {
        let mut executor = executor_with(SkillRegistry::new(), Arc::new(FailingModel));
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = executor
            .execute_task(&task("any"), &BTreeMap::new(), &config(), &cancel)
            .await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("cancelled"));
    }

    #[test]
    fn test_loop_detection_window_semantics() {
        let mut executor = executor_with(SkillRegistry::new(), Arc::new(FailingModel));

        // Three identical then one different: no loop.
        assert!(!executor.detect_loop("skill:a"));
        assert!(!executor.detect_loop("skill:a"));
        assert!(!executor.detect_loop("skill:a"));
        assert!(!executor.detect_loop("skill:b"));

        // Four identical in a row within the window: loop.
        executor.reset_loop_detection();
        assert!(!executor.detect_loop("skill:a"));
        assert!(!executor.detect_loop("skill:a"));
        assert!(!executor.detect_loop("skill:a"));
        assert!(executor.detect_loop("skill:a"));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Detection fires exactly when the last four signatures in the
            /// five-entry window are identical.
            #[test]
            fn loop_detection_matches_reference_model(
                signatures in proptest::collection::vec(0u8..3, 1..20),
            ) {
                let mut executor =
                    executor_with(SkillRegistry::new(), Arc::new(FailingModel));
                let mut window: Vec<u8> = Vec::new();

                for signature in signatures {
                    let detected = executor.detect_loop(&format!("skill:{signature}"));

                    window.push(signature);
                    if window.len() > 5 {
                        let excess = window.len() - 5;
                        window.drain(..excess);
                    }
                    let expected = window.len() >= 4
                        && window[window.len() - 4..].iter().all(|s| *s == signature);

                    prop_assert_eq!(detected, expected);
                }
            }
        }
    }
}
