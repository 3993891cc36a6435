//! Multi-source company intelligence.
//!
//! The reference implementation of the multi-source pattern: gather fact maps
//! from independent providers (website scrape as primary, neural research as
//! secondary, verified-answer search as verification), cross-reference them
//! through the truth engine, and return a verified dataset with full source
//! attribution. With every provider disabled the skill degrades to a
//! knowledge-base-only language-model pass, explicitly marked unverified.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::llm::json::parse_json_payload;
use crate::llm::{truncate_for_prompt, CompletionRequest, LanguageModel};
use crate::providers::{AnswerEngine, NeuralSearch, Recency, WebScraper};
use crate::skill::{Skill, SkillContext, SkillResult};
use crate::task::Task;
use crate::truth::{SourceType, SourcedData, TruthEngine};

const SKILL_NAME: &str = "company-intelligence";
const MAX_CONTENT_CHARS: usize = 6000;

pub struct CompanyIntelligenceSkill {
    llm: Arc<dyn LanguageModel>,
    scraper: Option<Arc<dyn WebScraper>>,
    search: Option<Arc<dyn NeuralSearch>>,
    answers: Option<Arc<dyn AnswerEngine>>,
}

impl CompanyIntelligenceSkill {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        scraper: Option<Arc<dyn WebScraper>>,
        search: Option<Arc<dyn NeuralSearch>>,
        answers: Option<Arc<dyn AnswerEngine>>,
    ) -> Self {
        Self {
            llm,
            scraper,
            search,
            answers,
        }
    }

    /// Distill raw text into a flat fact map via the language model.
    async fn extract_facts(&self, company: &str, text: &str) -> Result<Value> {
        let content = truncate_for_prompt(text, MAX_CONTENT_CHARS);

        let prompt = format!(
            "Extract structured facts about {company} from the content below.\n\n\
             Content:\n{content}\n\n\
             Return ONLY a flat JSON object mapping fact names to values, e.g.:\n\
             {{\"industry\": \"...\", \"headquarters\": \"...\", \"founded\": \"...\",\n\
              \"ceo\": \"...\", \"employee_count\": \"...\", \"revenue\": \"...\",\n\
              \"products\": [\"...\"], \"business_model\": \"...\"}}\n\n\
             Use \"unknown\" for facts the content does not establish."
        );

        let response = self
            .llm
            .complete(CompletionRequest::from_prompt(prompt).with_max_tokens(2000))
            .await?;
        match parse_json_payload(&response.content) {
            Ok(value) if value.is_object() => Ok(value),
            _ => Ok(json!({ "overview": response.content })),
        }
    }

    /// Primary source: the company's own website.
    async fn gather_website(&self, config: &AnalysisConfig) -> Option<SourcedData> {
        let scraper = self.scraper.as_ref()?;
        let website = &config.company.website;
        if website.is_empty() {
            return None;
        }

        let scraped = scraper.scrape(website, &["markdown"]).await;
        if !scraped.success {
            warn!(
                %website,
                error = scraped.error.as_deref().unwrap_or("unknown"),
                "website scrape failed"
            );
            return None;
        }

        let facts = self
            .extract_facts(&config.company.name, &scraped.content)
            .await
            .ok()?;
        Some(
            SourcedData::new(
                SourceType::Primary,
                website.clone(),
                website.clone(),
                facts,
            )
            .with_reliability(1.0),
        )
    }

    /// Secondary source: aggregated neural research.
    async fn gather_research(&self, config: &AnalysisConfig) -> Option<SourcedData> {
        let search = self.search.as_ref()?;
        let company = &config.company.name;

        let response = search
            .search(
                &format!(
                    "{company} company overview products business model {}",
                    config.company.industry
                ),
                5,
            )
            .await;
        if !response.success || response.results.is_empty() {
            return None;
        }

        let corpus = response
            .results
            .iter()
            .map(|hit| format!("{}\n{}", hit.title, hit.text))
            .collect::<Vec<_>>()
            .join("\n---\n");
        let facts = self.extract_facts(company, &corpus).await.ok()?;

        Some(
            SourcedData::new(
                SourceType::Secondary,
                "Exa Deep Research",
                "https://exa.ai",
                facts,
            )
            .with_reliability(0.85),
        )
    }

    /// Verification source: citation-backed answer search.
    async fn gather_verification(&self, config: &AnalysisConfig) -> Option<SourcedData> {
        let answers = self.answers.as_ref()?;
        let company = &config.company.name;

        let response = answers
            .query(
                &format!(
                    "Key verifiable facts about {company}: industry, headquarters, \
                     founding year, CEO, employee count, annual revenue"
                ),
                Recency::Month,
                5,
            )
            .await;
        if !response.success || response.answer.is_empty() {
            return None;
        }

        let facts = self.extract_facts(company, &response.answer).await.ok()?;
        Some(SourcedData::new(
            SourceType::Verification,
            "Perplexity",
            "https://www.perplexity.ai",
            facts,
        ))
    }

    /// No providers reachable: answer from the model's own knowledge,
    /// explicitly marked unverified.
    async fn knowledge_base_fallback(&self, config: &AnalysisConfig) -> Result<SkillResult> {
        let company = &config.company;
        let prompt = format!(
            "You are gathering company intelligence without live data access.\n\n\
             Company: {}\nWebsite: {}\nIndustry: {}\n\n\
             Return ONLY a JSON object:\n\
             {{\"findings\": {{...facts about the company...}},\n\
              \"summary\": \"brief summary\",\n\
              \"confidence\": \"low/medium/high\"}}\n\n\
             Acknowledge assumptions; do not invent specifics you are unsure of.",
            company.name, company.website, company.industry
        );

        let response = self
            .llm
            .complete(CompletionRequest::from_prompt(prompt).with_max_tokens(3000))
            .await?;
        let mut data = parse_json_payload(&response.content)
            .unwrap_or_else(|_| json!({ "summary": response.content }));
        if let Some(map) = data.as_object_mut() {
            map.insert("verification".to_string(), json!("knowledge_base_only"));
        }
        Ok(SkillResult::ok(data))
    }
}

#[async_trait]
impl Skill for CompanyIntelligenceSkill {
    fn name(&self) -> &str {
        SKILL_NAME
    }

    async fn execute(
        &self,
        _task: &Task,
        _context: &SkillContext,
        config: &AnalysisConfig,
    ) -> Result<SkillResult> {
        info!(company = %config.company.name, "gathering multi-source company intelligence");

        let mut sources_data = Vec::new();
        if let Some(data) = self.gather_website(config).await {
            sources_data.push(data);
        }
        if let Some(data) = self.gather_research(config).await {
            sources_data.push(data);
        }
        if let Some(data) = self.gather_verification(config).await {
            sources_data.push(data);
        }

        if sources_data.is_empty() {
            info!("no data sources available - using knowledge-base fallback");
            return self.knowledge_base_fallback(config).await;
        }

        let engine = TruthEngine::new(config.verification);
        let dataset =
            engine.cross_reference(&sources_data, &config.company.name, "company");
        let consulted = sources_data.iter().map(|s| s.to_source()).collect();

        Ok(SkillResult::ok(serde_json::to_value(&dataset)?).with_sources(consulted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompanyInfo;
    use crate::llm::stubs::ScriptedModel;
    use crate::providers::ScrapeResult;
    use crate::task::TaskPhase;
    use std::collections::BTreeMap;

    struct FixedScraper(&'static str);

    #[async_trait]
    impl WebScraper for FixedScraper {
        fn available(&self) -> bool {
            true
        }

        async fn scrape(&self, url: &str, _formats: &[&str]) -> ScrapeResult {
            ScrapeResult {
                success: true,
                url: url.to_string(),
                content: self.0.to_string(),
                metadata: Value::Null,
                source: "stub".to_string(),
                error: None,
            }
        }
    }

    fn config() -> AnalysisConfig {
        AnalysisConfig::new(CompanyInfo::new("Acme", "https://acme.test", "SaaS"))
    }

    fn task() -> Task {
        Task::new(
            "phase1_task_1",
            "Gather company intelligence",
            TaskPhase::Phase1,
            SKILL_NAME,
        )
    }

    #[tokio::test]
    async fn test_single_source_produces_verified_dataset() {
        let llm = Arc::new(ScriptedModel::new(vec![
            r#"{"industry": "SaaS", "ceo": "J. Doe"}"#,
        ]));
        let skill = CompanyIntelligenceSkill::new(
            llm,
            Some(Arc::new(FixedScraper("Acme builds SaaS tools. CEO: J. Doe."))),
            None,
            None,
        );

        let result = skill
            .execute(&task(), &BTreeMap::new(), &config())
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.data["entity_name"], "Acme");
        assert_eq!(result.data["verified_count"].as_u64().unwrap(), 2);
        assert_eq!(result.sources.len(), 1);
    }

    #[tokio::test]
    async fn test_all_providers_disabled_uses_knowledge_base() {
        let llm = Arc::new(ScriptedModel::new(vec![
            r#"{"findings": {"industry": "SaaS"}, "summary": "Acme is a SaaS company", "confidence": "medium"}"#,
        ]));
        let skill = CompanyIntelligenceSkill::new(llm, None, None, None);

        let result = skill
            .execute(&task(), &BTreeMap::new(), &config())
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.data["verification"], "knowledge_base_only");
        assert!(result.sources.is_empty());
    }
}
