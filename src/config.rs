//! Run configuration: target company, run mode, frameworks, and data-source
//! toggles.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::truth::VerificationMode;

/// Maximum number of user-supplied competitors carried into a run.
pub const MAX_COMPETITORS: usize = 5;

/// The target company under analysis. Set once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyInfo {
    pub name: String,
    pub website: String,
    pub industry: String,
}

impl CompanyInfo {
    pub fn new(
        name: impl Into<String>,
        website: impl Into<String>,
        industry: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            website: website.into(),
            industry: industry.into(),
        }
    }
}

/// Which phases the orchestrator executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Phase 1 only.
    BusinessOverview,
    /// Phase 2 only; requires a preloaded Phase-1 context.
    FrameworksOnly,
    /// Both phases in sequence.
    Full,
}

impl RunMode {
    /// The `analysis_type` string carried in the result envelope.
    pub fn analysis_type(&self) -> &'static str {
        match self {
            Self::BusinessOverview => "business_overview",
            Self::FrameworksOnly => "frameworks",
            Self::Full => "full",
        }
    }
}

impl Default for RunMode {
    fn default() -> Self {
        Self::Full
    }
}

/// Strategic frameworks available for Phase 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framework {
    Swot,
    PortersFiveForces,
    Pestel,
    BcgMatrix,
    BlueOcean,
    CompetitiveStrategy,
    SalesIntelligence,
    AnsoffMatrix,
    #[serde(rename = "mckinsey_7s")]
    McKinsey7S,
    FunctionalStrategy,
    ValuePropositionCanvas,
}

impl Framework {
    /// Human-readable framework name, as shown in plans and prompts.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Swot => "SWOT Analysis",
            Self::PortersFiveForces => "Porter's Five Forces",
            Self::Pestel => "PESTEL Analysis",
            Self::BcgMatrix => "BCG Matrix",
            Self::BlueOcean => "Blue Ocean Strategy",
            Self::CompetitiveStrategy => "Competitive Strategy",
            Self::SalesIntelligence => "Sales Intelligence",
            Self::AnsoffMatrix => "Ansoff Matrix",
            Self::McKinsey7S => "McKinsey 7S",
            Self::FunctionalStrategy => "Functional Strategy",
            Self::ValuePropositionCanvas => "Value Proposition Canvas",
        }
    }

    /// Identifier of the skill that applies this framework.
    pub fn skill_slug(&self) -> &'static str {
        match self {
            Self::Swot => "swot-analyzer",
            Self::PortersFiveForces => "porters-five-forces",
            Self::Pestel => "pestel-analyzer",
            Self::BcgMatrix => "bcg-matrix",
            Self::BlueOcean => "blue-ocean-strategy",
            Self::CompetitiveStrategy => "competitive-strategy",
            Self::SalesIntelligence => "sales-intelligence",
            Self::AnsoffMatrix => "ansoff-matrix",
            Self::McKinsey7S => "mckinsey-7s",
            Self::FunctionalStrategy => "functional-strategy",
            Self::ValuePropositionCanvas => "value-proposition-canvas",
        }
    }
}

impl std::fmt::Display for Framework {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Safety limits for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvancedLimits {
    /// Global cap on executed tasks per run.
    pub max_steps: usize,
    /// Cap on loop-avoidance retries within a single task.
    pub max_steps_per_task: usize,
}

impl Default for AdvancedLimits {
    fn default() -> Self {
        Self {
            max_steps: 50,
            max_steps_per_task: 10,
        }
    }
}

/// Per-provider opt-in settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Whether skills may call this provider at all.
    pub enabled: bool,
    /// Route calls through the remote tool protocol instead of direct HTTP.
    #[serde(default)]
    pub use_remote_protocol: bool,
    /// API key; absent keys leave the provider unavailable even when enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl ProviderSettings {
    /// Enabled provider with an API key.
    pub fn enabled_with_key(api_key: impl Into<String>) -> Self {
        Self {
            enabled: true,
            use_remote_protocol: false,
            api_key: Some(api_key.into()),
        }
    }
}

/// Opt-in data sources consumed by skills. Disabled providers force skills
/// onto their knowledge-base-only fallback path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSources {
    /// Web scraping (site content, primary source).
    pub firecrawl: ProviderSettings,
    /// Neural/semantic search (research aggregation, secondary source).
    pub exa: ProviderSettings,
    /// Verified-answer search (fact checking, verification source).
    pub perplexity: ProviderSettings,
}

/// Full input bundle for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Target company.
    pub company: CompanyInfo,
    /// Which phases to run.
    #[serde(default)]
    pub mode: RunMode,
    /// Ordered Phase-2 framework selection.
    #[serde(default)]
    pub frameworks: Vec<Framework>,
    /// Free-text user goal steering prompts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_goal: Option<String>,
    /// Known competitor names (capped at [`MAX_COMPETITORS`]).
    #[serde(default)]
    pub competitors: Vec<String>,
    /// Step budgets.
    #[serde(default)]
    pub limits: AdvancedLimits,
    /// External data-source toggles.
    #[serde(default)]
    pub data_sources: DataSources,
    /// Truth-engine verification mode.
    #[serde(default)]
    pub verification: VerificationMode,
}

impl AnalysisConfig {
    /// Create a config with defaults for everything but the company.
    pub fn new(company: CompanyInfo) -> Self {
        Self {
            company,
            mode: RunMode::default(),
            frameworks: Vec::new(),
            user_goal: None,
            competitors: Vec::new(),
            limits: AdvancedLimits::default(),
            data_sources: DataSources::default(),
            verification: VerificationMode::default(),
        }
    }

    /// Set the run mode.
    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the Phase-2 framework selection.
    pub fn with_frameworks(mut self, frameworks: Vec<Framework>) -> Self {
        self.frameworks = frameworks;
        self
    }

    /// Set the user goal text.
    pub fn with_user_goal(mut self, goal: impl Into<String>) -> Self {
        self.user_goal = Some(goal.into());
        self
    }

    /// Set the competitor list (truncated to [`MAX_COMPETITORS`]).
    pub fn with_competitors(mut self, mut competitors: Vec<String>) -> Self {
        competitors.truncate(MAX_COMPETITORS);
        self.competitors = competitors;
        self
    }

    /// Set the step budgets.
    pub fn with_limits(mut self, limits: AdvancedLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the data-source toggles.
    pub fn with_data_sources(mut self, data_sources: DataSources) -> Self {
        self.data_sources = data_sources;
        self
    }

    /// Set the truth-engine mode.
    pub fn with_verification(mut self, mode: VerificationMode) -> Self {
        self.verification = mode;
        self
    }

    /// Validate structural requirements; called by the orchestrator
    /// constructor.
    pub fn validate(&self) -> Result<()> {
        if self.company.name.trim().is_empty() {
            return Err(Error::invalid_argument("company name must not be empty"));
        }
        if self.competitors.len() > MAX_COMPETITORS {
            return Err(Error::invalid_argument(format!(
                "at most {} competitors are supported",
                MAX_COMPETITORS
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framework_slugs_are_stable() {
        assert_eq!(Framework::Swot.skill_slug(), "swot-analyzer");
        assert_eq!(
            Framework::PortersFiveForces.skill_slug(),
            "porters-five-forces"
        );
        assert_eq!(Framework::BlueOcean.skill_slug(), "blue-ocean-strategy");
        assert_eq!(
            Framework::FunctionalStrategy.skill_slug(),
            "functional-strategy"
        );
        assert_eq!(
            Framework::ValuePropositionCanvas.skill_slug(),
            "value-proposition-canvas"
        );
    }

    #[test]
    fn test_analysis_type_strings() {
        assert_eq!(RunMode::BusinessOverview.analysis_type(), "business_overview");
        assert_eq!(RunMode::FrameworksOnly.analysis_type(), "frameworks");
        assert_eq!(RunMode::Full.analysis_type(), "full");
    }

    #[test]
    fn test_competitor_cap() {
        let config = AnalysisConfig::new(CompanyInfo::new("Acme", "acme.test", "SaaS"))
            .with_competitors((0..8).map(|i| format!("rival-{i}")).collect());
        assert_eq!(config.competitors.len(), MAX_COMPETITORS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_company_name_rejected() {
        let config = AnalysisConfig::new(CompanyInfo::new("  ", "acme.test", "SaaS"));
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_framework_serde_names() {
        assert_eq!(
            serde_json::to_value(Framework::McKinsey7S).unwrap(),
            "mckinsey_7s"
        );
        assert_eq!(
            serde_json::to_value(Framework::PortersFiveForces).unwrap(),
            "porters_five_forces"
        );
    }
}
