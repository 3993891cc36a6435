//! Skill interface and registry.
//!
//! A skill produces the payload for one context slot. The registry is an
//! explicit map built at orchestrator startup; identifiers not present in it
//! route to the executor's language-model fallback.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::task::Task;
use crate::truth::Source;

/// The context snapshot a skill reads: accumulated slot payloads, plus a
/// `company` record when executing Phase 2.
pub type SkillContext = BTreeMap<String, Value>;

/// What a skill hands back to the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillResult {
    pub success: bool,
    /// The slot payload. Attribution-heavy skills embed sourcing here.
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Sources consulted, for callers that track provenance separately.
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl SkillResult {
    /// Successful result with a payload.
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data,
            error: None,
            sources: Vec::new(),
            metadata: None,
        }
    }

    /// Failed result with an error message.
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Value::Null,
            error: Some(error.into()),
            sources: Vec::new(),
            metadata: None,
        }
    }

    /// Attach consulted sources.
    pub fn with_sources(mut self, sources: Vec<Source>) -> Self {
        self.sources = sources;
        self
    }

    /// Attach metadata.
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A pluggable unit of work producing one context slot's payload.
#[async_trait]
pub trait Skill: Send + Sync {
    /// The identifier tasks are routed by (e.g. "company-intelligence").
    fn name(&self) -> &str;

    /// Execute the skill against the current context.
    async fn execute(
        &self,
        task: &Task,
        context: &SkillContext,
        config: &AnalysisConfig,
    ) -> Result<SkillResult>;
}

/// Explicit skill-identifier -> implementation map, constructed at startup.
#[derive(Default)]
pub struct SkillRegistry {
    skills: HashMap<String, Arc<dyn Skill>>,
}

impl SkillRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a skill under its own name. Later registrations replace
    /// earlier ones.
    pub fn register(&mut self, skill: Arc<dyn Skill>) {
        self.skills.insert(skill.name().to_string(), skill);
    }

    /// Resolve a skill by identifier.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Skill>> {
        self.skills.get(name).cloned()
    }

    /// Whether an identifier is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.skills.contains_key(name)
    }

    /// Registered identifiers, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.skills.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered skills.
    pub fn len(&self) -> usize {
        self.skills.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod stubs {
    //! Canned skills shared across component tests.

    use super::*;
    use serde_json::json;

    /// Returns a fixed payload for any task.
    pub struct StaticSkill {
        name: String,
        result: SkillResult,
    }

    impl StaticSkill {
        pub fn new(name: impl Into<String>, result: SkillResult) -> Self {
            Self {
                name: name.into(),
                result,
            }
        }

        /// A skill returning a small non-trivial payload.
        pub fn trivial(name: impl Into<String>) -> Self {
            let name = name.into();
            let result = SkillResult::ok(json!({
                "summary": format!("stub analysis from {name}"),
                "findings": {"status": "complete"},
            }));
            Self::new(name, result)
        }
    }

    #[async_trait]
    impl Skill for StaticSkill {
        fn name(&self) -> &str {
            &self.name
        }

        async fn execute(
            &self,
            _task: &Task,
            _context: &SkillContext,
            _config: &AnalysisConfig,
        ) -> Result<SkillResult> {
            Ok(self.result.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::stubs::StaticSkill;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registry_resolution() {
        let mut registry = SkillRegistry::new();
        registry.register(Arc::new(StaticSkill::trivial("company-intelligence")));
        registry.register(Arc::new(StaticSkill::trivial("swot-analyzer")));

        assert!(registry.contains("company-intelligence"));
        assert!(!registry.contains("unknown-skill"));
        assert_eq!(
            registry.names(),
            vec!["company-intelligence", "swot-analyzer"]
        );
    }

    #[test]
    fn test_later_registration_wins() {
        let mut registry = SkillRegistry::new();
        registry.register(Arc::new(StaticSkill::new(
            "swot-analyzer",
            SkillResult::ok(json!({"v": 1})),
        )));
        registry.register(Arc::new(StaticSkill::new(
            "swot-analyzer",
            SkillResult::ok(json!({"v": 2})),
        )));
        assert_eq!(registry.len(), 1);
    }
}
