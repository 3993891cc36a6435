//! Built-in skill implementations and registry assembly.

mod company_intelligence;
mod competitor_intelligence;
mod framework_analysis;

pub use company_intelligence::CompanyIntelligenceSkill;
pub use competitor_intelligence::CompetitorIntelligenceSkill;
pub use framework_analysis::FrameworkAnalysisSkill;

use std::sync::Arc;

use crate::config::DataSources;
use crate::error::Result;
use crate::llm::LanguageModel;
use crate::providers::{
    AnswerEngine, ExaClient, FirecrawlClient, NeuralSearch, PerplexityClient, WebScraper,
};
use crate::skill::SkillRegistry;

/// The analytical skills that share the [`FrameworkAnalysisSkill`] shape:
/// identifier, framework name, and the JSON sections the answer carries.
const FRAMEWORK_SKILLS: &[(&str, &str, &str)] = &[
    (
        "business-model-canvas",
        "the Business Model Canvas",
        "value_proposition, customer_segments, channels, customer_relationships, \
         revenue_streams, key_resources, key_activities, key_partnerships, cost_structure",
    ),
    (
        "value-chain-mapper",
        "Value Chain Analysis",
        "primary_activities, support_activities, strengths, weaknesses",
    ),
    (
        "org-structure-analyzer",
        "Organizational Structure Analysis",
        "leadership, teams, culture, hiring_signals",
    ),
    (
        "market-intelligence",
        "Market Landscape Analysis",
        "market_size, growth_rate, trends, opportunities, threats",
    ),
    (
        "swot-analyzer",
        "SWOT Analysis",
        "strengths, weaknesses, opportunities, threats",
    ),
    (
        "porters-five-forces",
        "Porter's Five Forces",
        "competitive_rivalry, supplier_power, buyer_power, threat_of_substitution, \
         threat_of_new_entry",
    ),
    (
        "pestel-analyzer",
        "PESTEL Analysis",
        "political, economic, social, technological, environmental, legal",
    ),
    (
        "bcg-matrix",
        "the BCG Growth-Share Matrix",
        "stars, cash_cows, question_marks, dogs",
    ),
    (
        "blue-ocean-strategy",
        "Blue Ocean Strategy",
        "eliminate, reduce, raise, create",
    ),
    (
        "competitive-strategy",
        "Competitive Strategy positioning",
        "positioning, differentiation, cost_leadership, focus",
    ),
    (
        "sales-intelligence",
        "Sales Intelligence",
        "target_personas, pain_points, objections, playbooks",
    ),
    (
        "ansoff-matrix",
        "the Ansoff Matrix",
        "market_penetration, market_development, product_development, diversification",
    ),
    (
        "mckinsey-7s",
        "the McKinsey 7S framework",
        "strategy, structure, systems, shared_values, skills, style, staff",
    ),
    (
        "functional-strategy",
        "Functional Strategy planning",
        "sales, marketing, product_engineering, operations, finance, \
         human_resources, it_technology, cross_functional_alignment",
    ),
    (
        "value-proposition-canvas",
        "the Value Proposition Canvas",
        "customer_profile, value_map, fit_assessment",
    ),
];

/// The external providers a registry's skills may call.
#[derive(Clone, Default)]
pub struct ProviderSet {
    pub scraper: Option<Arc<dyn WebScraper>>,
    pub search: Option<Arc<dyn NeuralSearch>>,
    pub answers: Option<Arc<dyn AnswerEngine>>,
}

impl ProviderSet {
    /// No providers; every skill uses its knowledge-base fallback.
    pub fn none() -> Self {
        Self::default()
    }

    /// Build HTTP clients for each enabled data source.
    pub fn from_data_sources(sources: &DataSources) -> Result<Self> {
        let scraper: Option<Arc<dyn WebScraper>> = if sources.firecrawl.enabled {
            Some(Arc::new(FirecrawlClient::new(
                sources.firecrawl.api_key.clone(),
            )?))
        } else {
            None
        };
        let search: Option<Arc<dyn NeuralSearch>> = if sources.exa.enabled {
            Some(Arc::new(ExaClient::new(sources.exa.api_key.clone())?))
        } else {
            None
        };
        let answers: Option<Arc<dyn AnswerEngine>> = if sources.perplexity.enabled {
            Some(Arc::new(PerplexityClient::new(
                sources.perplexity.api_key.clone(),
            )?))
        } else {
            None
        };
        Ok(Self {
            scraper,
            search,
            answers,
        })
    }
}

/// Assemble the default registry: the multi-source intelligence skills plus
/// one framework-analysis instance per analytical slot.
pub fn builtin_registry(llm: Arc<dyn LanguageModel>, providers: ProviderSet) -> SkillRegistry {
    let mut registry = SkillRegistry::new();

    registry.register(Arc::new(CompanyIntelligenceSkill::new(
        llm.clone(),
        providers.scraper.clone(),
        providers.search.clone(),
        providers.answers.clone(),
    )));
    registry.register(Arc::new(CompetitorIntelligenceSkill::new(
        llm.clone(),
        providers.search.clone(),
    )));

    for (name, framework, sections) in FRAMEWORK_SKILLS {
        registry.register(Arc::new(FrameworkAnalysisSkill::new(
            *name,
            *framework,
            *sections,
            llm.clone(),
        )));
    }

    registry
}
