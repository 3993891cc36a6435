//! Core types for multi-source fact verification.
//!
//! Every fact carries full source attribution. A claim that cannot be found
//! in any source is kept but explicitly marked unverified.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Type of data source, ordered by authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Official company sources (website, filings).
    Primary,
    /// News articles, research reports.
    Secondary,
    /// Third-party databases, aggregators.
    Tertiary,
    /// Fact-checking services.
    Verification,
}

impl SourceType {
    /// Default reliability weight for this source type.
    pub fn default_reliability(&self) -> f64 {
        match self {
            Self::Primary => 1.0,
            Self::Secondary => 0.8,
            Self::Tertiary => 0.6,
            Self::Verification => 0.9,
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Secondary => write!(f, "secondary"),
            Self::Tertiary => write!(f, "tertiary"),
            Self::Verification => write!(f, "verification"),
        }
    }
}

/// A data source with full attribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    pub source_type: SourceType,
    /// e.g. "stripe.com", "TechCrunch", "Exa Deep Research".
    pub source_name: String,
    pub date_accessed: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_published: Option<DateTime<Utc>>,
    /// How reliable this source is, 0.0-1.0.
    pub reliability_score: f64,
}

impl Source {
    /// Create a source with the type's default reliability and the current
    /// access timestamp.
    pub fn new(
        url: impl Into<String>,
        source_type: SourceType,
        source_name: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            source_type,
            source_name: source_name.into(),
            date_accessed: Utc::now(),
            date_published: None,
            reliability_score: source_type.default_reliability(),
        }
    }

    /// Override the reliability score.
    pub fn with_reliability(mut self, score: f64) -> Self {
        self.reliability_score = score.clamp(0.0, 1.0);
        self
    }

    /// Set the publication date.
    pub fn with_published(mut self, date: DateTime<Utc>) -> Self {
        self.date_published = Some(date);
        self
    }
}

/// Severity of a cross-source conflict, by number of disagreeing values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSeverity {
    Minor,
    Moderate,
    Critical,
}

impl ConflictSeverity {
    /// Classify by the number of conflicting alternatives.
    pub fn from_count(count: usize) -> Self {
        match count {
            0 | 1 => Self::Minor,
            2 => Self::Moderate,
            _ => Self::Critical,
        }
    }
}

/// A disagreement between sources about one claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub claim: String,
    /// The claimed value followed by each disagreeing alternative.
    pub conflicting_values: Vec<Value>,
    /// Sources carrying the disagreeing alternatives.
    pub sources: Vec<Source>,
    pub severity: ConflictSeverity,
    /// How the conflict was resolved, if it was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
}

/// Human-readable confidence bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl ConfidenceLevel {
    /// Bucket a confidence score.
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.90 {
            Self::VeryHigh
        } else if confidence >= 0.75 {
            Self::High
        } else if confidence >= 0.50 {
            Self::Medium
        } else if confidence >= 0.25 {
            Self::Low
        } else {
            Self::VeryLow
        }
    }
}

/// A claim reconciled across sources, with a confidence score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedFact {
    /// The fact being claimed (e.g. "Annual Revenue").
    pub claim: String,
    /// The claimed value (string, number, list, object).
    pub value: Value,
    /// Whether the claim met the verification predicate.
    pub verified: bool,
    /// 0.0-1.0 confidence score.
    pub confidence: f64,
    /// Sources supporting the fact (or all consulted sources when none
    /// supported it).
    pub sources: Vec<Source>,
    #[serde(default)]
    pub conflicts: Vec<Conflict>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub last_verified: DateTime<Utc>,
}

impl VerifiedFact {
    /// Bucketed confidence level.
    pub fn confidence_level(&self) -> ConfidenceLevel {
        ConfidenceLevel::from_confidence(self.confidence)
    }

    /// Whether any conflicts were recorded.
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// Supporting primary sources only.
    pub fn primary_sources(&self) -> Vec<&Source> {
        self.sources
            .iter()
            .filter(|s| s.source_type == SourceType::Primary)
            .collect()
    }
}

/// A collection of verified facts about one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedDataset {
    pub entity_name: String,
    /// "company", "market", "competitor", ...
    pub entity_type: String,
    pub facts: Vec<VerifiedFact>,
    /// Mean confidence over verified facts, 0.0 when none verified.
    pub overall_confidence: f64,
    /// Unique `(url, source_name)` pairs across all facts.
    pub total_sources: usize,
    pub verified_count: usize,
    pub unverified_count: usize,
    /// Number of facts carrying at least one conflict.
    pub conflict_count: usize,
    pub created_at: DateTime<Utc>,
}

impl VerifiedDataset {
    /// Build a dataset from facts, deriving the aggregate statistics.
    pub fn from_facts(
        entity_name: impl Into<String>,
        entity_type: impl Into<String>,
        facts: Vec<VerifiedFact>,
    ) -> Self {
        let verified: Vec<&VerifiedFact> = facts.iter().filter(|f| f.verified).collect();
        let overall_confidence = if verified.is_empty() {
            0.0
        } else {
            verified.iter().map(|f| f.confidence).sum::<f64>() / verified.len() as f64
        };

        let mut unique_sources: HashSet<(String, String)> = HashSet::new();
        for fact in &facts {
            for source in &fact.sources {
                unique_sources.insert((source.url.clone(), source.source_name.clone()));
            }
        }

        let verified_count = verified.len();
        let conflict_count = facts.iter().filter(|f| f.has_conflicts()).count();
        let unverified_count = facts.len() - verified_count;

        Self {
            entity_name: entity_name.into(),
            entity_type: entity_type.into(),
            facts,
            overall_confidence,
            total_sources: unique_sources.len(),
            verified_count,
            unverified_count,
            conflict_count,
            created_at: Utc::now(),
        }
    }
}

/// One provider's contribution to verification: a flat fact map plus the
/// attribution needed to build a [`Source`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcedData {
    pub source_type: SourceType,
    pub source_name: String,
    pub url: String,
    pub date_accessed: DateTime<Utc>,
    /// Overrides the type's default reliability when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reliability_score: Option<f64>,
    /// Flat map of claim key -> value as reported by this provider.
    pub data: Value,
}

impl SourcedData {
    /// Create a sourced fact map accessed now.
    pub fn new(
        source_type: SourceType,
        source_name: impl Into<String>,
        url: impl Into<String>,
        data: Value,
    ) -> Self {
        Self {
            source_type,
            source_name: source_name.into(),
            url: url.into(),
            date_accessed: Utc::now(),
            reliability_score: None,
            data,
        }
    }

    /// Override the reliability score.
    pub fn with_reliability(mut self, score: f64) -> Self {
        self.reliability_score = Some(score.clamp(0.0, 1.0));
        self
    }

    /// Build the attribution record for this provider.
    pub fn to_source(&self) -> Source {
        Source {
            url: self.url.clone(),
            source_type: self.source_type,
            source_name: self.source_name.clone(),
            date_accessed: self.date_accessed,
            date_published: None,
            reliability_score: self
                .reliability_score
                .unwrap_or_else(|| self.source_type.default_reliability()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fact(claim: &str, verified: bool, confidence: f64, sources: Vec<Source>) -> VerifiedFact {
        VerifiedFact {
            claim: claim.to_string(),
            value: json!("x"),
            verified,
            confidence,
            sources,
            conflicts: Vec::new(),
            notes: None,
            last_verified: Utc::now(),
        }
    }

    #[test]
    fn test_confidence_level_buckets() {
        assert_eq!(ConfidenceLevel::from_confidence(0.95), ConfidenceLevel::VeryHigh);
        assert_eq!(ConfidenceLevel::from_confidence(0.90), ConfidenceLevel::VeryHigh);
        assert_eq!(ConfidenceLevel::from_confidence(0.84), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_confidence(0.50), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_confidence(0.30), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_confidence(0.10), ConfidenceLevel::VeryLow);
    }

    #[test]
    fn test_default_reliability_by_type() {
        assert_eq!(SourceType::Primary.default_reliability(), 1.0);
        assert_eq!(SourceType::Secondary.default_reliability(), 0.8);
        assert_eq!(SourceType::Tertiary.default_reliability(), 0.6);
        assert_eq!(SourceType::Verification.default_reliability(), 0.9);
    }

    #[test]
    fn test_conflict_severity_from_count() {
        assert_eq!(ConflictSeverity::from_count(1), ConflictSeverity::Minor);
        assert_eq!(ConflictSeverity::from_count(2), ConflictSeverity::Moderate);
        assert_eq!(ConflictSeverity::from_count(3), ConflictSeverity::Critical);
        assert_eq!(ConflictSeverity::from_count(7), ConflictSeverity::Critical);
    }

    #[test]
    fn test_dataset_aggregates() {
        let s1 = Source::new("https://acme.test", SourceType::Primary, "acme.test");
        let s2 = Source::new("https://exa.ai", SourceType::Secondary, "Exa Deep Research");
        // Same (url, name) pair as s1 - must not double count.
        let s3 = Source::new("https://acme.test", SourceType::Primary, "acme.test");

        let dataset = VerifiedDataset::from_facts(
            "Acme",
            "company",
            vec![
                fact("revenue", true, 0.8, vec![s1, s2]),
                fact("employees", true, 0.6, vec![s3]),
                fact("founded", false, 0.1, vec![]),
            ],
        );

        assert_eq!(dataset.verified_count, 2);
        assert_eq!(dataset.unverified_count, 1);
        assert_eq!(dataset.total_sources, 2);
        assert!((dataset.overall_confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_dataset_empty_confidence_is_zero() {
        let dataset = VerifiedDataset::from_facts(
            "Acme",
            "company",
            vec![fact("revenue", false, 0.1, vec![])],
        );
        assert_eq!(dataset.overall_confidence, 0.0);
        assert_eq!(dataset.verified_count, 0);
    }
}
