//! # bcos-core
//!
//! A multi-source business context orchestration engine. Turns a small input
//! (company name, website, industry, optional frameworks and competitors)
//! into a structured multi-section analysis in two phases: foundation
//! gathering (Phase 1) and strategic framework application (Phase 2).
//!
//! ## Core Components
//!
//! - **Orchestrator**: run-mode dispatch, phase loops, step budgets
//! - **Planner**: LLM-assisted task decomposition with deterministic fallback
//! - **Executor**: skill routing, loop detection, LLM fallback
//! - **Validator**: heuristic + LLM-assisted acceptance of task output
//! - **TruthEngine**: cross-source fact verification with confidence scoring
//! - **StateManager**: context buckets, task registry, JSON persistence
//! - **ProgressTracker**: structured event stream for observers
//!
//! ## Example
//!
//! ```rust,ignore
//! use bcos_core::{
//!     AnalysisConfig, AnthropicClient, CancelToken, ClientConfig, CompanyInfo,
//!     Framework, Orchestrator, RunMode,
//! };
//! use std::sync::Arc;
//!
//! let config = AnalysisConfig::new(CompanyInfo::new("Acme", "acme.test", "SaaS"))
//!     .with_mode(RunMode::Full)
//!     .with_frameworks(vec![Framework::Swot, Framework::PortersFiveForces]);
//!
//! let llm = Arc::new(AnthropicClient::new(ClientConfig::new(api_key))?);
//! let mut orchestrator = Orchestrator::new(config, llm)?;
//! let envelope = orchestrator.run(&CancelToken::new()).await;
//! ```

pub mod cancel;
pub mod config;
pub mod error;
pub mod executor;
pub mod llm;
pub mod orchestrator;
pub mod planner;
pub mod progress;
pub mod providers;
pub mod skill;
pub mod skills;
pub mod state;
pub mod task;
pub mod truth;
pub mod validator;

// Re-exports for convenience
pub use cancel::CancelToken;
pub use config::{
    AdvancedLimits, AnalysisConfig, CompanyInfo, DataSources, Framework, ProviderSettings,
    RunMode, MAX_COMPETITORS,
};
pub use error::{Error, Result};
pub use executor::{ExecutionResult, Executor};
pub use llm::{
    AnthropicClient, ChatMessage, ChatRole, ClientConfig, CompletionRequest, CompletionResponse,
    LanguageModel, TokenUsage,
};
pub use orchestrator::{Orchestrator, ResultEnvelope};
pub use planner::Planner;
pub use progress::{
    ActionRecord, CurrentAction, ProgressEvent, ProgressLevel, ProgressObserver,
    ProgressSnapshot, ProgressTracker, TaskProgressView,
};
pub use providers::{
    AnswerEngine, AnswerResponse, AnswerSource, ExaClient, FactCheckResponse, FirecrawlClient,
    NeuralSearch, PerplexityClient, Recency, ScrapeResult, SearchHit, SearchResponse, WebScraper,
};
pub use skill::{Skill, SkillContext, SkillRegistry, SkillResult};
pub use skills::{
    builtin_registry, CompanyIntelligenceSkill, CompetitorIntelligenceSkill,
    FrameworkAnalysisSkill, ProviderSet,
};
pub use state::{RunSummary, StateManager, TaskCounts};
pub use task::{Task, TaskPhase, TaskStatus};
pub use truth::{
    ConfidenceLevel, Conflict, ConflictSeverity, Source, SourceType, SourcedData, TruthEngine,
    VerificationMode, VerifiedDataset, VerifiedFact,
};
pub use validator::Validator;
