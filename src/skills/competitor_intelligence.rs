//! Competitor profiling with bounded per-competitor fan-out.
//!
//! Competitors come from the run configuration; when none are supplied the
//! skill discovers them via similar-company search (or the language model as
//! a last resort). Profiles are gathered concurrently with a small bounded
//! degree and joined before the skill returns.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::info;

use crate::config::{AnalysisConfig, MAX_COMPETITORS};
use crate::error::Result;
use crate::llm::json::parse_json_payload;
use crate::llm::{truncate_for_prompt, CompletionRequest, LanguageModel};
use crate::providers::NeuralSearch;
use crate::skill::{Skill, SkillContext, SkillResult};
use crate::task::Task;

const SKILL_NAME: &str = "competitor-intelligence";

/// Parallelism cap for per-competitor lookups.
const FAN_OUT_DEGREE: usize = 3;

pub struct CompetitorIntelligenceSkill {
    llm: Arc<dyn LanguageModel>,
    search: Option<Arc<dyn NeuralSearch>>,
}

impl CompetitorIntelligenceSkill {
    pub fn new(llm: Arc<dyn LanguageModel>, search: Option<Arc<dyn NeuralSearch>>) -> Self {
        Self { llm, search }
    }

    /// Competitor names: configured list first, then similar-company search,
    /// then the model's own knowledge.
    async fn competitor_names(&self, config: &AnalysisConfig) -> Vec<String> {
        if !config.competitors.is_empty() {
            return config.competitors.clone();
        }

        if let Some(search) = &self.search {
            let response = search
                .find_similar(&config.company.website, MAX_COMPETITORS)
                .await;
            if response.success && !response.results.is_empty() {
                return response
                    .results
                    .into_iter()
                    .map(|hit| {
                        if hit.title.is_empty() {
                            hit.url
                        } else {
                            hit.title
                        }
                    })
                    .take(MAX_COMPETITORS)
                    .collect();
            }
        }

        let prompt = format!(
            "List the {} most significant competitors of {} ({} industry).\n\
             Return ONLY a JSON array of company names.",
            MAX_COMPETITORS, config.company.name, config.company.industry
        );
        match self
            .llm
            .complete(CompletionRequest::from_prompt(prompt).with_max_tokens(500))
            .await
        {
            Ok(response) => parse_json_payload(&response.content)
                .ok()
                .and_then(|v| v.as_array().cloned())
                .map(|items| {
                    items
                        .into_iter()
                        .filter_map(|v| v.as_str().map(String::from))
                        .take(MAX_COMPETITORS)
                        .collect()
                })
                .unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }

    /// Profile one competitor: search snippets when available, the model's
    /// knowledge otherwise.
    async fn profile_competitor(&self, name: &str, config: &AnalysisConfig) -> (String, Value) {
        let mut evidence = String::new();
        if let Some(search) = &self.search {
            let response = search
                .search(&format!("{name} company products strategy"), 3)
                .await;
            if response.success {
                evidence = response
                    .results
                    .iter()
                    .map(|hit| format!("{}\n{}", hit.title, hit.text))
                    .collect::<Vec<_>>()
                    .join("\n---\n");
            }
        }

        let prompt = if evidence.is_empty() {
            format!(
                "Profile the company {name}, a competitor of {} in the {} industry.\n\
                 Return ONLY a JSON object with keys: positioning, products, \
                 strengths, weaknesses.",
                config.company.name, config.company.industry
            )
        } else {
            format!(
                "Profile the company {name} using this research:\n{}\n\n\
                 Return ONLY a JSON object with keys: positioning, products, \
                 strengths, weaknesses.",
                truncate_for_prompt(&evidence, 3000)
            )
        };

        let profile = match self
            .llm
            .complete(CompletionRequest::from_prompt(prompt).with_max_tokens(1500))
            .await
        {
            Ok(response) => parse_json_payload(&response.content)
                .unwrap_or_else(|_| json!({ "profile": response.content })),
            Err(e) => json!({ "error": e.to_string() }),
        };

        (name.to_string(), profile)
    }
}

#[async_trait]
impl Skill for CompetitorIntelligenceSkill {
    fn name(&self) -> &str {
        SKILL_NAME
    }

    async fn execute(
        &self,
        _task: &Task,
        _context: &SkillContext,
        config: &AnalysisConfig,
    ) -> Result<SkillResult> {
        let names = self.competitor_names(config).await;
        info!(count = names.len(), "profiling competitors");

        if names.is_empty() {
            return Ok(SkillResult::ok(json!({
                "competitors": {},
                "summary": "No competitors identified",
            })));
        }

        let profiles: Vec<(String, Value)> = stream::iter(names.clone())
            .map(|name| async move { self.profile_competitor(&name, config).await })
            .buffered(FAN_OUT_DEGREE)
            .collect()
            .await;

        let mut competitors = Map::new();
        for (name, profile) in profiles {
            competitors.insert(name, profile);
        }

        let summary = format!("Profiled {} competitor(s)", competitors.len());
        Ok(SkillResult::ok(json!({
            "competitors": Value::Object(competitors),
            "summary": summary,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompanyInfo;
    use crate::llm::stubs::ScriptedModel;
    use crate::task::TaskPhase;
    use std::collections::BTreeMap;

    fn task() -> Task {
        Task::new(
            "phase1_task_5",
            "Profile key competitors",
            TaskPhase::Phase1,
            SKILL_NAME,
        )
    }

    #[tokio::test]
    async fn test_profiles_configured_competitors() {
        let llm = Arc::new(ScriptedModel::new(vec![
            r#"{"positioning": "upmarket", "products": ["X"], "strengths": ["brand"], "weaknesses": ["price"]}"#,
        ]));
        let skill = CompetitorIntelligenceSkill::new(llm, None);
        let config = AnalysisConfig::new(CompanyInfo::new("Acme", "acme.test", "SaaS"))
            .with_competitors(vec!["Globex".into(), "Initech".into()]);

        let result = skill
            .execute(&task(), &BTreeMap::new(), &config)
            .await
            .unwrap();
        assert!(result.success);
        let competitors = result.data["competitors"].as_object().unwrap();
        assert_eq!(competitors.len(), 2);
        assert!(competitors.contains_key("Globex"));
        assert!(competitors.contains_key("Initech"));
    }

    #[tokio::test]
    async fn test_empty_competitor_list_is_valid() {
        // LLM returns no usable names; skill still succeeds with an empty map.
        let llm = Arc::new(ScriptedModel::new(vec!["[]"]));
        let skill = CompetitorIntelligenceSkill::new(llm, None);
        let config = AnalysisConfig::new(CompanyInfo::new("Acme", "acme.test", "SaaS"));

        let result = skill
            .execute(&task(), &BTreeMap::new(), &config)
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.data["competitors"], json!({}));
    }
}
