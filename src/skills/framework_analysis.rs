//! Generic language-model-backed analytical skill.
//!
//! The analytical skills (Business Model Canvas, SWOT, PESTEL, ...) share
//! one shape: build a prompt from the task description and the accumulated
//! context, ask the language model for structured output, and store the
//! parsed result in the skill's slot. Each registered instance carries its
//! framework name and the section layout it asks for.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::llm::json::parse_json_payload;
use crate::llm::{truncate_for_prompt, CompletionRequest, LanguageModel};
use crate::skill::{Skill, SkillContext, SkillResult};
use crate::task::Task;

const MAX_CONTEXT_CHARS: usize = 4000;

pub struct FrameworkAnalysisSkill {
    name: String,
    framework: String,
    /// Comma-separated top-level keys the JSON answer should carry.
    sections: String,
    llm: Arc<dyn LanguageModel>,
}

impl FrameworkAnalysisSkill {
    pub fn new(
        name: impl Into<String>,
        framework: impl Into<String>,
        sections: impl Into<String>,
        llm: Arc<dyn LanguageModel>,
    ) -> Self {
        Self {
            name: name.into(),
            framework: framework.into(),
            sections: sections.into(),
            llm,
        }
    }

    /// Compact textual rendering of the context for the prompt.
    fn summarize_context(context: &SkillContext) -> String {
        let mut parts = Vec::new();
        for (slot, value) in context {
            if slot == "company" {
                continue;
            }
            let rendered = serde_json::to_string(value).unwrap_or_default();
            parts.push(truncate_for_prompt(&format!("{slot}: {rendered}"), 800));
        }

        let summary = truncate_for_prompt(&parts.join("\n"), MAX_CONTEXT_CHARS);
        if summary.is_empty() {
            "No prior analysis available.".to_string()
        } else {
            summary
        }
    }
}

#[async_trait]
impl Skill for FrameworkAnalysisSkill {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(
        &self,
        task: &Task,
        context: &SkillContext,
        config: &AnalysisConfig,
    ) -> Result<SkillResult> {
        debug!(skill = %self.name, "running framework analysis");

        let company = &config.company;
        let goal = config
            .user_goal
            .as_deref()
            .unwrap_or("a complete, decision-ready analysis");

        let prompt = format!(
            "You are applying {framework} to a business analysis.\n\n\
             Company: {name}\nWebsite: {website}\nIndustry: {industry}\n\
             Analysis goal: {goal}\n\n\
             Task: {description}\n\n\
             Context from previous analysis:\n{context}\n\n\
             Return ONLY a JSON object with these top-level keys:\n\
             {sections}\n\
             plus a \"summary\" string. Be specific and grounded in the \
             context above; note assumptions where the context is silent.",
            framework = self.framework,
            name = company.name,
            website = company.website,
            industry = company.industry,
            goal = goal,
            description = task.description,
            context = Self::summarize_context(context),
            sections = self.sections,
        );

        let response = self
            .llm
            .complete(CompletionRequest::from_prompt(prompt).with_max_tokens(4000))
            .await?;

        let data = match parse_json_payload(&response.content) {
            Ok(value) if value.is_object() => value,
            _ => json!({ "analysis": response.content }),
        };

        Ok(SkillResult::ok(data)
            .with_metadata(json!({ "framework": self.framework })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompanyInfo;
    use crate::llm::stubs::{FailingModel, ScriptedModel};
    use crate::task::TaskPhase;
    use std::collections::BTreeMap;

    fn swot_skill(llm: Arc<dyn LanguageModel>) -> FrameworkAnalysisSkill {
        FrameworkAnalysisSkill::new(
            "swot-analyzer",
            "SWOT Analysis",
            "strengths, weaknesses, opportunities, threats",
            llm,
        )
    }

    fn task() -> Task {
        Task::new(
            "phase2_task_1",
            "Conduct SWOT analysis based on Phase 1 findings",
            TaskPhase::Phase2,
            "swot-analyzer",
        )
    }

    #[tokio::test]
    async fn test_parses_structured_answer() {
        let llm = Arc::new(ScriptedModel::new(vec![
            r#"```json
{"strengths": ["brand"], "weaknesses": ["scale"], "opportunities": ["expansion"], "threats": ["rivals"], "summary": "Solid position"}
```"#,
        ]));
        let skill = swot_skill(llm);
        let config = AnalysisConfig::new(CompanyInfo::new("Acme", "acme.test", "SaaS"));

        let mut context = BTreeMap::new();
        context.insert("company_intelligence".to_string(), json!({"industry": "SaaS"}));

        let result = skill.execute(&task(), &context, &config).await.unwrap();
        assert!(result.success);
        assert_eq!(result.data["strengths"], json!(["brand"]));
        assert_eq!(result.metadata.unwrap()["framework"], "SWOT Analysis");
    }

    #[tokio::test]
    async fn test_unstructured_answer_is_wrapped() {
        let llm = Arc::new(ScriptedModel::new(vec!["Just prose, no JSON at all"]));
        let skill = swot_skill(llm);
        let config = AnalysisConfig::new(CompanyInfo::new("Acme", "acme.test", "SaaS"));

        let result = skill
            .execute(&task(), &BTreeMap::new(), &config)
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.data["analysis"], "Just prose, no JSON at all");
    }

    #[tokio::test]
    async fn test_llm_error_propagates_for_executor_capture() {
        let skill = swot_skill(Arc::new(FailingModel));
        let config = AnalysisConfig::new(CompanyInfo::new("Acme", "acme.test", "SaaS"));

        let result = skill.execute(&task(), &BTreeMap::new(), &config).await;
        assert!(result.is_err());
    }
}
