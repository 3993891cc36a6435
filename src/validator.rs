//! Accept-or-reject validation of executor output.
//!
//! Most skills get cheap heuristic checks; a fixed allowlist of complex
//! analytical skills is escalated to the language model, which falls back to
//! the heuristic path on any error.

use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::executor::ExecutionResult;
use crate::llm::json::parse_json_payload;
use crate::llm::{truncate_for_prompt, CompletionRequest, LanguageModel};
use crate::task::Task;

/// Skills whose output is too open-ended for heuristics alone.
const LLM_VALIDATED_SKILLS: &[&str] = &[
    "business-model-canvas",
    "value-chain-mapper",
    "swot-analyzer",
    "porters-five-forces",
    "bcg-matrix",
];

/// Minimum length for a string payload to count as substantive.
const MIN_STRING_PAYLOAD: usize = 10;

const MAX_RESULT_SUMMARY_CHARS: usize = 500;

/// Validates task completion before results enter the context.
pub struct Validator {
    llm: Arc<dyn LanguageModel>,
}

impl Validator {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// Decide whether a task's result is acceptable.
    ///
    /// Returns the decision plus human-readable feedback; rejected results
    /// carry the reason the task will be marked failed with.
    pub async fn validate(&self, task: &Task, result: &ExecutionResult) -> (bool, String) {
        if Self::needs_llm_validation(task) {
            match self.llm_validate(task, result).await {
                Ok(decision) => return decision,
                Err(e) => {
                    warn!(task_id = %task.id, error = %e, "llm validation failed - using heuristics");
                }
            }
        }
        Self::heuristic_validate(result)
    }

    /// True iff every dependency of `task` is in `completed_ids`.
    pub fn dependencies_met(task: &Task, completed_ids: &[String]) -> bool {
        task.dependencies
            .iter()
            .all(|dep| completed_ids.iter().any(|id| id == dep))
    }

    fn needs_llm_validation(task: &Task) -> bool {
        LLM_VALIDATED_SKILLS.contains(&task.skill.as_str())
    }

    /// Cheap structural checks: errors, unsuccessful completion, and empty
    /// or trivially short payloads all reject.
    fn heuristic_validate(result: &ExecutionResult) -> (bool, String) {
        if let Some(error) = &result.error {
            return (false, format!("Task reported error: {error}"));
        }
        if !result.success {
            return (false, "Task reported unsuccessful completion".to_string());
        }

        match &result.data {
            None | Some(Value::Null) => (false, "Task produced no result".to_string()),
            Some(Value::Object(map)) if map.is_empty() => {
                (false, "Task data is empty".to_string())
            }
            Some(Value::Array(items)) if items.is_empty() => {
                (false, "Task data list is empty".to_string())
            }
            Some(Value::String(s)) if s.len() < MIN_STRING_PAYLOAD => {
                (false, "Task data is too short".to_string())
            }
            Some(_) => (true, "Task completed successfully".to_string()),
        }
    }

    /// Ask the language model whether the result fulfills the task.
    async fn llm_validate(
        &self,
        task: &Task,
        result: &ExecutionResult,
    ) -> crate::error::Result<(bool, String)> {
        let prompt = format!(
            "You are validating task completion for a business analysis system.\n\n\
             Task: {description}\nSkill Used: {skill}\nPhase: {phase}\n\n\
             Result Summary:\n{summary}\n\n\
             Criteria:\n\
             1. Does the result address the task description?\n\
             2. Is the result substantive and useful?\n\
             3. Are there any obvious gaps or errors?\n\n\
             Respond with ONLY a JSON object:\n\
             {{\"is_valid\": true/false, \"feedback\": \"brief explanation\"}}",
            description = task.description,
            skill = task.skill,
            phase = task.phase,
            summary = summarize_result(result),
        );

        let response = self
            .llm
            .complete(
                CompletionRequest::from_prompt(prompt)
                    .with_max_tokens(500)
                    .with_temperature(0.0),
            )
            .await?;

        let parsed = parse_json_payload(&response.content)?;
        let is_valid = parsed["is_valid"].as_bool().unwrap_or(false);
        let feedback = parsed["feedback"]
            .as_str()
            .unwrap_or("No feedback provided")
            .to_string();

        info!(task_id = %task.id, is_valid, "llm validation decision");
        Ok((is_valid, feedback))
    }
}

/// Truncated JSON rendering of the result for validation prompts.
fn summarize_result(result: &ExecutionResult) -> String {
    let rendered =
        serde_json::to_string_pretty(result).unwrap_or_else(|_| "<unrenderable>".to_string());
    truncate_for_prompt(&rendered, MAX_RESULT_SUMMARY_CHARS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::stubs::{FailingModel, ScriptedModel};
    use crate::task::TaskPhase;
    use serde_json::json;

    fn task(skill: &str) -> Task {
        Task::new("phase1_task_1", "analyze", TaskPhase::Phase1, skill)
    }

    fn success_result(data: Value) -> ExecutionResult {
        serde_json::from_value(json!({
            "success": true,
            "data": data,
            "task_id": "phase1_task_1",
            "method": "skill",
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_heuristic_accepts_substantive_payload() {
        let validator = Validator::new(Arc::new(FailingModel));
        let result = success_result(json!({"summary": "a full analysis"}));
        let (valid, feedback) = validator.validate(&task("market-intelligence"), &result).await;
        assert!(valid);
        assert!(!feedback.is_empty());
    }

    #[tokio::test]
    async fn test_heuristic_rejects_empty_string() {
        let validator = Validator::new(Arc::new(FailingModel));
        let result = success_result(json!(""));
        let (valid, feedback) = validator.validate(&task("market-intelligence"), &result).await;
        assert!(!valid);
        assert_eq!(feedback, "Task data is too short");
    }

    #[tokio::test]
    async fn test_heuristic_rejects_empty_object_and_list() {
        let validator = Validator::new(Arc::new(FailingModel));

        let (valid, _) = validator
            .validate(&task("market-intelligence"), &success_result(json!({})))
            .await;
        assert!(!valid);

        let (valid, _) = validator
            .validate(&task("market-intelligence"), &success_result(json!([])))
            .await;
        assert!(!valid);
    }

    #[tokio::test]
    async fn test_heuristic_rejects_error_and_failure() {
        let validator = Validator::new(Arc::new(FailingModel));

        let result: ExecutionResult = serde_json::from_value(json!({
            "success": false,
            "error": "provider timeout",
            "task_id": "phase1_task_1",
        }))
        .unwrap();
        let (valid, feedback) = validator.validate(&task("market-intelligence"), &result).await;
        assert!(!valid);
        assert!(feedback.contains("provider timeout"));
    }

    #[tokio::test]
    async fn test_llm_validation_for_allowlisted_skill() {
        let llm = Arc::new(ScriptedModel::new(vec![
            r#"{"is_valid": false, "feedback": "Missing customer segments"}"#,
        ]));
        let validator = Validator::new(llm);
        let result = success_result(json!({"value_proposition": "x"}));

        let (valid, feedback) = validator
            .validate(&task("business-model-canvas"), &result)
            .await;
        assert!(!valid);
        assert_eq!(feedback, "Missing customer segments");
    }

    #[tokio::test]
    async fn test_llm_error_falls_back_to_heuristics() {
        let validator = Validator::new(Arc::new(FailingModel));
        let result = success_result(json!({"strengths": ["brand"], "weaknesses": []}));

        // swot-analyzer is allowlisted but the model is down; heuristics accept.
        let (valid, _) = validator.validate(&task("swot-analyzer"), &result).await;
        assert!(valid);
    }

    #[test]
    fn test_dependencies_met() {
        let mut task = task("any");
        assert!(Validator::dependencies_met(&task, &[]));

        task.dependencies = vec!["phase1_task_0".to_string()];
        assert!(!Validator::dependencies_met(&task, &[]));
        assert!(Validator::dependencies_met(
            &task,
            &["phase1_task_0".to_string()]
        ));
    }
}
