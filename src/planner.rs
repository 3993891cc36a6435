//! Task planning.
//!
//! The primary path asks the language model for a structured decomposition
//! of each phase; the response is validated against the skill registry and
//! dependency rules. Any failure (network, malformed output, unknown skill)
//! falls back to a deterministic plan, so planning itself never fails.

use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{AnalysisConfig, Framework};
use crate::error::{Error, Result};
use crate::llm::json::parse_json_payload;
use crate::llm::{CompletionRequest, LanguageModel};
use crate::skill::{SkillContext, SkillRegistry};
use crate::task::{Task, TaskPhase};

/// Decomposes a phase into an ordered, dependency-feasible task list.
pub struct Planner {
    llm: Arc<dyn LanguageModel>,
}

#[derive(Debug, Deserialize)]
struct PlannedTask {
    id: String,
    description: String,
    skill: String,
    #[serde(default)]
    dependencies: Vec<String>,
}

impl Planner {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// Plan Phase-1 foundation tasks.
    pub async fn plan_phase1(
        &self,
        config: &AnalysisConfig,
        registry: &SkillRegistry,
    ) -> Vec<Task> {
        let company = &config.company;
        let prompt = format!(
            "You are planning Phase 1 (Foundation Building) for a business \
             context analysis.\n\n\
             Target Company: {name}\nWebsite: {website}\nIndustry: {industry}\n\n\
             Phase 1 gathers foundational business intelligence:\n\
             1. Company Intelligence - basic facts, products, business model\n\
             2. Business Model Canvas - value proposition, customers, channels\n\
             3. Value Chain Analysis - activities from suppliers to customers\n\
             4. Market Intelligence - market size, trends, opportunities\n\
             5. Competitor Intelligence - profiles of key competitors\n\n\
             Available skills: {skills}\n\n\
             Return ONLY a JSON array of tasks:\n\
             [{{\"id\": \"phase1_task_1\", \"description\": \"...\", \
             \"skill\": \"company-intelligence\", \"dependencies\": []}}, ...]\n\n\
             Keep it practical - 5-8 tasks. Dependencies may only reference \
             earlier task ids in the list.",
            name = company.name,
            website = company.website,
            industry = company.industry,
            skills = registry.names().join(", "),
        );

        match self.request_plan(&prompt, TaskPhase::Phase1, registry).await {
            Ok(tasks) => {
                info!(count = tasks.len(), "planned phase 1 tasks");
                tasks
            }
            Err(e) => {
                warn!(error = %e, "phase 1 planning failed - using fallback plan");
                Self::fallback_phase1_plan()
            }
        }
    }

    /// Plan Phase-2 framework tasks from the Phase-1 snapshot.
    pub async fn plan_phase2(
        &self,
        config: &AnalysisConfig,
        phase1_context: &SkillContext,
        registry: &SkillRegistry,
    ) -> Vec<Task> {
        let company = &config.company;
        let frameworks = config
            .frameworks
            .iter()
            .map(|f| f.display_name())
            .collect::<Vec<_>>()
            .join(", ");

        let prompt = format!(
            "You are planning Phase 2 (Strategy Analysis) for a business \
             context analysis.\n\n\
             Target Company: {name}\nIndustry: {industry}\n\n\
             Phase 1 Summary:\n{summary}\n\n\
             Strategic frameworks to apply: {frameworks}\n\n\
             Available skills: {skills}\n\n\
             Create 1-2 specific tasks per framework.\n\
             Return ONLY a JSON array of tasks:\n\
             [{{\"id\": \"phase2_task_1\", \"description\": \"...\", \
             \"skill\": \"swot-analyzer\", \"dependencies\": []}}, ...]\n\n\
             All Phase 2 tasks implicitly depend on Phase 1 completion; \
             dependencies may only reference earlier phase-2 task ids.",
            name = company.name,
            industry = company.industry,
            summary = summarize_phase1(phase1_context),
            frameworks = frameworks,
            skills = registry.names().join(", "),
        );

        match self.request_plan(&prompt, TaskPhase::Phase2, registry).await {
            Ok(tasks) => {
                info!(count = tasks.len(), "planned phase 2 tasks");
                tasks
            }
            Err(e) => {
                warn!(error = %e, "phase 2 planning failed - using fallback plan");
                Self::fallback_phase2_plan(&config.frameworks)
            }
        }
    }

    async fn request_plan(
        &self,
        prompt: &str,
        phase: TaskPhase,
        registry: &SkillRegistry,
    ) -> Result<Vec<Task>> {
        let response = self
            .llm
            .complete(
                CompletionRequest::from_prompt(prompt)
                    .with_max_tokens(2000)
                    .with_temperature(0.0),
            )
            .await?;
        Self::parse_plan(&response.content, phase, registry)
    }

    /// Validate a model-produced plan: non-empty unique ids, registry-known
    /// skills, and dependencies restricted to previously emitted ids.
    fn parse_plan(
        content: &str,
        phase: TaskPhase,
        registry: &SkillRegistry,
    ) -> Result<Vec<Task>> {
        let planned: Vec<PlannedTask> = serde_json::from_value(parse_json_payload(content)?)?;
        if planned.is_empty() {
            return Err(Error::invalid_argument("planner returned an empty task list"));
        }

        let mut seen: HashSet<String> = HashSet::new();
        let mut tasks = Vec::with_capacity(planned.len());

        for item in planned {
            if item.id.trim().is_empty() {
                return Err(Error::invalid_argument("planned task has an empty id"));
            }
            if !seen.insert(item.id.clone()) {
                return Err(Error::invalid_argument(format!(
                    "planned task id repeated: {}",
                    item.id
                )));
            }
            if !registry.contains(&item.skill) {
                return Err(Error::invalid_argument(format!(
                    "planned task {} names unknown skill: {}",
                    item.id, item.skill
                )));
            }
            for dep in &item.dependencies {
                if !seen.contains(dep) {
                    return Err(Error::invalid_argument(format!(
                        "planned task {} depends on {dep}, which is not an earlier task",
                        item.id
                    )));
                }
            }

            tasks.push(
                Task::new(item.id, item.description, phase, item.skill)
                    .with_dependencies(item.dependencies),
            );
        }
        Ok(tasks)
    }

    /// Deterministic Phase-1 plan used when the model path fails.
    pub fn fallback_phase1_plan() -> Vec<Task> {
        vec![
            Task::new(
                "phase1_task_1",
                "Gather company intelligence from website and public sources",
                TaskPhase::Phase1,
                "company-intelligence",
            ),
            Task::new(
                "phase1_task_2",
                "Analyze business model using the Business Model Canvas",
                TaskPhase::Phase1,
                "business-model-canvas",
            )
            .with_dependencies(vec!["phase1_task_1".to_string()]),
            Task::new(
                "phase1_task_3",
                "Map company value chain from suppliers to customers",
                TaskPhase::Phase1,
                "value-chain-mapper",
            )
            .with_dependencies(vec!["phase1_task_1".to_string()]),
            Task::new(
                "phase1_task_4",
                "Research market landscape and competitive dynamics",
                TaskPhase::Phase1,
                "market-intelligence",
            )
            .with_dependencies(vec!["phase1_task_1".to_string()]),
            Task::new(
                "phase1_task_5",
                "Profile key competitors and their strategies",
                TaskPhase::Phase1,
                "competitor-intelligence",
            )
            .with_dependencies(vec!["phase1_task_4".to_string()]),
        ]
    }

    /// Deterministic Phase-2 plan: one task per selected framework, no
    /// intra-phase dependencies.
    pub fn fallback_phase2_plan(frameworks: &[Framework]) -> Vec<Task> {
        frameworks
            .iter()
            .enumerate()
            .map(|(index, framework)| {
                Task::new(
                    format!("phase2_task_{}", index + 1),
                    format!(
                        "Apply {} to generate strategic insights",
                        framework.display_name()
                    ),
                    TaskPhase::Phase2,
                    framework.skill_slug(),
                )
            })
            .collect()
    }
}

/// One line per non-empty Phase-1 slot.
fn summarize_phase1(context: &SkillContext) -> String {
    let mut lines = Vec::new();
    for (slot, value) in context {
        if slot == "company" {
            continue;
        }
        if let Some(map) = value.as_object() {
            if !map.is_empty() {
                lines.push(format!("- {slot}: {} insights gathered", map.len()));
            }
        }
    }
    if lines.is_empty() {
        "Phase 1 context available".to_string()
    } else {
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompanyInfo;
    use crate::llm::stubs::{FailingModel, ScriptedModel};
    use crate::skill::stubs::StaticSkill;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn registry_with(skills: &[&str]) -> SkillRegistry {
        let mut registry = SkillRegistry::new();
        for skill in skills {
            registry.register(Arc::new(StaticSkill::trivial(*skill)));
        }
        registry
    }

    fn config() -> AnalysisConfig {
        AnalysisConfig::new(CompanyInfo::new("Acme", "acme.test", "SaaS"))
            .with_frameworks(vec![Framework::Swot, Framework::PortersFiveForces])
    }

    #[tokio::test]
    async fn test_model_plan_is_used_when_valid() {
        let llm = Arc::new(ScriptedModel::new(vec![
            r#"[
                {"id": "phase1_task_1", "description": "Gather intel", "skill": "company-intelligence", "dependencies": []},
                {"id": "phase1_task_2", "description": "Map market", "skill": "market-intelligence", "dependencies": ["phase1_task_1"]}
            ]"#,
        ]));
        let planner = Planner::new(llm);
        let registry = registry_with(&["company-intelligence", "market-intelligence"]);

        let tasks = planner.plan_phase1(&config(), &registry).await;
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].skill, "company-intelligence");
        assert_eq!(tasks[1].dependencies, vec!["phase1_task_1"]);
        assert_eq!(tasks[1].phase, TaskPhase::Phase1);
    }

    #[tokio::test]
    async fn test_unknown_skill_triggers_fallback() {
        let llm = Arc::new(ScriptedModel::new(vec![
            r#"[{"id": "phase1_task_1", "description": "x", "skill": "nonexistent-skill", "dependencies": []}]"#,
        ]));
        let planner = Planner::new(llm);
        let registry = registry_with(&["company-intelligence"]);

        let tasks = planner.plan_phase1(&config(), &registry).await;
        assert_eq!(tasks.len(), 5);
        assert_eq!(tasks[0].skill, "company-intelligence");
    }

    #[tokio::test]
    async fn test_model_error_triggers_fallback() {
        let planner = Planner::new(Arc::new(FailingModel));
        let registry = registry_with(&["company-intelligence"]);

        let tasks = planner.plan_phase1(&config(), &registry).await;
        assert_eq!(tasks.len(), 5);
        assert_eq!(tasks[4].dependencies, vec!["phase1_task_4"]);
    }

    #[tokio::test]
    async fn test_forward_dependency_rejected() {
        let llm = Arc::new(ScriptedModel::new(vec![
            r#"[
                {"id": "phase1_task_1", "description": "x", "skill": "company-intelligence", "dependencies": ["phase1_task_2"]},
                {"id": "phase1_task_2", "description": "y", "skill": "company-intelligence", "dependencies": []}
            ]"#,
        ]));
        let planner = Planner::new(llm);
        let registry = registry_with(&["company-intelligence"]);

        // Forward reference invalidates the plan; deterministic fallback used.
        let tasks = planner.plan_phase1(&config(), &registry).await;
        assert_eq!(tasks.len(), 5);
    }

    #[tokio::test]
    async fn test_phase2_fallback_maps_frameworks_to_skills() {
        let planner = Planner::new(Arc::new(FailingModel));
        let registry = registry_with(&["swot-analyzer", "porters-five-forces"]);

        let tasks = planner
            .plan_phase2(&config(), &BTreeMap::new(), &registry)
            .await;
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, "phase2_task_1");
        assert_eq!(tasks[0].skill, "swot-analyzer");
        assert_eq!(tasks[1].skill, "porters-five-forces");
        assert!(tasks.iter().all(|t| t.dependencies.is_empty()));
    }

    #[test]
    fn test_fallback_phase1_shape() {
        let tasks = Planner::fallback_phase1_plan();
        let skills: Vec<&str> = tasks.iter().map(|t| t.skill.as_str()).collect();
        assert_eq!(
            skills,
            vec![
                "company-intelligence",
                "business-model-canvas",
                "value-chain-mapper",
                "market-intelligence",
                "competitor-intelligence",
            ]
        );
        // Dependency edges stay within previously emitted ids.
        let mut seen = HashSet::new();
        for task in &tasks {
            for dep in &task.dependencies {
                assert!(seen.contains(dep));
            }
            seen.insert(task.id.clone());
        }
    }
}
