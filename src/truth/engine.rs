//! Multi-source verification engine.
//!
//! Validates claims across source datasets and assigns confidence scores
//! from source agreement, reliability, and conflicts. Every fact keeps full
//! attribution; a claim no source supports stays in the output marked
//! unverified.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::merge::prefer;
use super::similarity::{keys_similar, normalize_key, values_similar};
use super::types::{
    Conflict, ConflictSeverity, Source, SourceType, SourcedData, VerifiedDataset, VerifiedFact,
};

/// Verification strictness.
///
/// Permissive accepts low-confidence facts and tolerates conflicts; Strict
/// raises the confidence floor and disqualifies any conflicted claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMode {
    Permissive,
    Strict,
}

impl VerificationMode {
    /// Default minimum confidence for the verification predicate.
    pub fn min_confidence(&self) -> f64 {
        match self {
            Self::Permissive => 0.2,
            Self::Strict => 0.5,
        }
    }

    /// Confidence subtracted per conflicting value.
    pub fn conflict_penalty(&self) -> f64 {
        match self {
            Self::Permissive => 0.02,
            Self::Strict => 0.10,
        }
    }

    /// Whether any conflict disqualifies verification outright.
    pub fn conflicts_disqualify(&self) -> bool {
        matches!(self, Self::Strict)
    }
}

impl Default for VerificationMode {
    fn default() -> Self {
        Self::Permissive
    }
}

/// Cross-references multi-source data into [`VerifiedFact`]s. Pure: no shared
/// state beyond its configuration.
#[derive(Debug, Clone)]
pub struct TruthEngine {
    mode: VerificationMode,
    min_confidence: f64,
}

impl Default for TruthEngine {
    fn default() -> Self {
        Self::new(VerificationMode::default())
    }
}

impl TruthEngine {
    /// Create an engine with the mode's default confidence floor.
    pub fn new(mode: VerificationMode) -> Self {
        Self {
            mode,
            min_confidence: mode.min_confidence(),
        }
    }

    /// Override the minimum confidence threshold.
    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence.clamp(0.0, 1.0);
        self
    }

    /// The active verification mode.
    pub fn mode(&self) -> VerificationMode {
        self.mode
    }

    /// The active confidence floor.
    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    /// Verify a single claim against the given source datasets.
    pub fn verify_claim(
        &self,
        claim: &str,
        value: &Value,
        sources_data: &[SourcedData],
    ) -> VerifiedFact {
        debug!(claim, "verifying claim");

        let mut all_sources = Vec::with_capacity(sources_data.len());
        let mut supporting: Vec<Source> = Vec::new();
        let mut conflicting: Vec<(Value, Source)> = Vec::new();

        for sourced in sources_data {
            let source = sourced.to_source();
            all_sources.push(source.clone());

            match self.lookup_claim(sourced, claim, value) {
                ClaimLookup::Supports => supporting.push(source),
                ClaimLookup::Disagrees(alt) => conflicting.push((alt, source)),
                ClaimLookup::Silent => {}
            }
        }

        let confidence =
            self.calculate_confidence(&supporting, all_sources.len(), conflicting.len());

        let conflicts = if conflicting.is_empty() {
            Vec::new()
        } else {
            let mut conflicting_values = vec![value.clone()];
            conflicting_values.extend(conflicting.iter().map(|(v, _)| v.clone()));
            vec![Conflict {
                claim: claim.to_string(),
                conflicting_values,
                sources: conflicting.iter().map(|(_, s)| s.clone()).collect(),
                severity: ConflictSeverity::from_count(conflicting.len()),
                resolution: None,
            }]
        };

        let verified = !supporting.is_empty()
            && confidence >= self.min_confidence
            && (!self.mode.conflicts_disqualify() || conflicts.is_empty());

        let notes = self.verification_notes(&supporting, conflicting.len());
        let sources = if supporting.is_empty() {
            all_sources
        } else {
            supporting
        };

        VerifiedFact {
            claim: claim.to_string(),
            value: value.clone(),
            verified,
            confidence,
            sources,
            conflicts,
            notes,
            last_verified: chrono::Utc::now(),
        }
    }

    /// Cross-reference several source datasets into a verified dataset for
    /// one entity.
    ///
    /// The union of top-level claims is extracted, values merged preferring
    /// the more informative one, and each merged claim verified against the
    /// datasets that mention it.
    pub fn cross_reference(
        &self,
        datasets: &[SourcedData],
        entity_name: &str,
        entity_type: &str,
    ) -> VerifiedDataset {
        info!(entity_name, "cross-referencing {} datasets", datasets.len());

        struct MergedClaim {
            claim: String,
            value: Value,
            dataset_indices: Vec<usize>,
        }

        let mut claims: BTreeMap<String, MergedClaim> = BTreeMap::new();

        for (index, dataset) in datasets.iter().enumerate() {
            let Some(map) = dataset.data.as_object() else {
                continue;
            };
            for (key, val) in map {
                let claim_key = normalize_key(key);
                let entry = claims.entry(claim_key).or_insert_with(|| MergedClaim {
                    claim: key.clone(),
                    value: Value::Null,
                    dataset_indices: Vec::new(),
                });
                entry.value = prefer(std::mem::take(&mut entry.value), val.clone());
                entry.dataset_indices.push(index);
            }
        }

        let facts: Vec<VerifiedFact> = claims
            .values()
            .map(|merged| {
                let mentioning: Vec<SourcedData> = merged
                    .dataset_indices
                    .iter()
                    .map(|&i| datasets[i].clone())
                    .collect();
                self.verify_claim(&merged.claim, &merged.value, &mentioning)
            })
            .collect();

        let dataset = VerifiedDataset::from_facts(entity_name, entity_type, facts);
        info!(
            entity_name,
            verified = dataset.verified_count,
            unverified = dataset.unverified_count,
            conflicts = dataset.conflict_count,
            "verification complete"
        );
        dataset
    }

    /// Find the claim in a source's fact map: exact normalized-key match
    /// first, then fuzzy key matches. A matched key whose value agrees means
    /// support; a matched key with a different value is a conflict.
    fn lookup_claim(&self, sourced: &SourcedData, claim: &str, value: &Value) -> ClaimLookup {
        let Some(map) = sourced.data.as_object() else {
            return ClaimLookup::Silent;
        };
        let claim_key = normalize_key(claim);

        let mut first_alternative: Option<Value> = None;

        for (key, candidate) in map {
            let key_norm = normalize_key(key);
            if key_norm != claim_key && !keys_similar(&claim_key, &key_norm) {
                continue;
            }
            if values_match(value, candidate) {
                return ClaimLookup::Supports;
            }
            if first_alternative.is_none() {
                first_alternative = Some(candidate.clone());
            }
        }

        match first_alternative {
            Some(alt) => ClaimLookup::Disagrees(alt),
            None => ClaimLookup::Silent,
        }
    }

    /// Confidence from source agreement, reliability, and conflicts.
    fn calculate_confidence(
        &self,
        supporting: &[Source],
        total_sources: usize,
        conflict_count: usize,
    ) -> f64 {
        if supporting.is_empty() {
            return 0.0;
        }

        let agreement = supporting.len() as f64 / total_sources.max(1) as f64;
        let avg_reliability = supporting
            .iter()
            .map(|s| s.reliability_score)
            .sum::<f64>()
            / supporting.len() as f64;

        let mut confidence = agreement * avg_reliability;

        if supporting
            .iter()
            .any(|s| s.source_type == SourceType::Primary)
        {
            confidence *= 1.10;
        }

        confidence -= conflict_count as f64 * self.mode.conflict_penalty();

        if supporting.len() >= 3 {
            confidence *= 1.05;
        }

        confidence.clamp(0.0, 1.0)
    }

    fn verification_notes(&self, supporting: &[Source], conflict_count: usize) -> Option<String> {
        let mut notes = Vec::new();

        if supporting.is_empty() {
            notes.push("No sources found supporting this claim.".to_string());
        }
        if supporting.len() == 1 {
            notes.push("Verified by single source only - confidence limited.".to_string());
        }
        if conflict_count > 0 {
            notes.push(format!(
                "Found {} conflicting value(s) in other sources.",
                conflict_count
            ));
        }
        let primary = supporting
            .iter()
            .filter(|s| s.source_type == SourceType::Primary)
            .count();
        if primary > 0 {
            notes.push(format!("Confirmed by {} primary source(s).", primary));
        }

        if notes.is_empty() {
            None
        } else {
            Some(notes.join(" "))
        }
    }
}

/// Outcome of looking a claim up in one source.
enum ClaimLookup {
    Supports,
    Disagrees(Value),
    Silent,
}

/// Whether two values agree: exact equality, fuzzy match for strings,
/// type-promoted equality for numbers, elementwise match for equal-length
/// lists, stringified comparison across types.
fn values_match(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (Value::String(x), Value::String(y)) => values_similar(x, y),
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(fx), Some(fy)) => fx == fy,
            _ => x.to_string() == y.to_string(),
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(va, vb)| values_match(va, vb))
        }
        (Value::Object(_), Value::Object(_)) => false,
        _ => values_similar(&stringify(a), &stringify(b)),
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::truth::types::ConfidenceLevel;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn secondary(name: &str, data: Value) -> SourcedData {
        SourcedData::new(SourceType::Secondary, name, format!("https://{name}"), data)
    }

    #[test]
    fn test_three_agreeing_secondary_sources() {
        let engine = TruthEngine::default();
        let sources = vec![
            secondary("a.test", json!({"revenue": "$100M"})),
            secondary("b.test", json!({"revenue": "$100M"})),
            secondary("c.test", json!({"revenue": "$100M"})),
        ];

        let fact = engine.verify_claim("revenue", &json!("$100M"), &sources);
        assert!(fact.verified);
        assert!((fact.confidence - 0.84).abs() < 1e-9);
        assert_eq!(fact.confidence_level(), ConfidenceLevel::High);
        assert!(fact.conflicts.is_empty());
        assert_eq!(fact.sources.len(), 3);
    }

    #[test]
    fn test_primary_source_boost() {
        let engine = TruthEngine::default();
        let sources = vec![SourcedData::new(
            SourceType::Primary,
            "acme.test",
            "https://acme.test",
            json!({"industry": "SaaS"}),
        )];

        let fact = engine.verify_claim("industry", &json!("SaaS"), &sources);
        // 1.0 agreement * 1.0 reliability * 1.10 primary boost, clamped.
        assert_eq!(fact.confidence, 1.0);
        assert!(fact.verified);
        assert!(fact.notes.as_deref().unwrap().contains("primary"));
    }

    #[test]
    fn test_conflicting_source_recorded() {
        let engine = TruthEngine::default();
        let sources = vec![
            secondary("a.test", json!({"revenue": "$100M"})),
            secondary("b.test", json!({"revenue": "$250M"})),
        ];

        let fact = engine.verify_claim("revenue", &json!("$100M"), &sources);
        assert_eq!(fact.conflicts.len(), 1);
        let conflict = &fact.conflicts[0];
        assert_eq!(conflict.severity, ConflictSeverity::Minor);
        assert_eq!(conflict.conflicting_values.len(), 2);
        // Permissive mode: the conflict does not disqualify verification.
        assert!(fact.verified);
        // 0.5 agreement * 0.8 reliability - 0.02 conflict penalty.
        assert!((fact.confidence - 0.38).abs() < 1e-9);
    }

    #[test]
    fn test_strict_mode_disqualifies_conflicts() {
        let engine = TruthEngine::new(VerificationMode::Strict);
        let sources = vec![
            secondary("a.test", json!({"revenue": "$100M"})),
            secondary("b.test", json!({"revenue": "$250M"})),
        ];

        let fact = engine.verify_claim("revenue", &json!("$100M"), &sources);
        assert!(!fact.verified);
        assert_eq!(fact.conflicts.len(), 1);
    }

    #[test]
    fn test_unsupported_claim_is_unverified() {
        let engine = TruthEngine::default();
        let sources = vec![secondary("a.test", json!({"employees": 500}))];

        let fact = engine.verify_claim("revenue", &json!("$100M"), &sources);
        assert!(!fact.verified);
        assert_eq!(fact.confidence, 0.0);
        // All consulted sources retained for attribution.
        assert_eq!(fact.sources.len(), 1);
        assert!(fact.notes.as_deref().unwrap().contains("No sources"));
    }

    #[test]
    fn test_fuzzy_key_match_supports() {
        let engine = TruthEngine::default();
        let sources = vec![secondary(
            "a.test",
            json!({"Annual Revenues": "$100M"}),
        )];

        let fact = engine.verify_claim("annual revenue", &json!("$100M"), &sources);
        assert!(fact.verified);
    }

    #[test]
    fn test_values_match_numeric_promotion() {
        assert!(values_match(&json!(100), &json!(100.0)));
        assert!(!values_match(&json!(100), &json!(101)));
    }

    #[test]
    fn test_values_match_cross_type_stringification() {
        assert!(values_match(&json!(2010), &json!("2010")));
        assert!(!values_match(&json!(2010), &json!("1999")));
    }

    #[test]
    fn test_values_match_lists_elementwise() {
        assert!(values_match(
            &json!(["US", "EU"]),
            &json!(["us", "eu"])
        ));
        assert!(!values_match(&json!(["US"]), &json!(["US", "EU"])));
    }

    #[test]
    fn test_cross_reference_merges_and_verifies() {
        let engine = TruthEngine::default();
        let datasets = vec![
            SourcedData::new(
                SourceType::Primary,
                "acme.test",
                "https://acme.test",
                json!({"industry": "SaaS", "ceo": "unknown"}),
            ),
            secondary("exa.ai", json!({"industry": "SaaS", "ceo": "J. Doe"})),
        ];

        let dataset = engine.cross_reference(&datasets, "Acme", "company");
        assert_eq!(dataset.entity_name, "Acme");
        assert_eq!(dataset.facts.len(), 2);

        let ceo = dataset.facts.iter().find(|f| f.claim == "ceo").unwrap();
        // Merge preferred the real name over "unknown".
        assert_eq!(ceo.value, json!("J. Doe"));

        let industry = dataset
            .facts
            .iter()
            .find(|f| f.claim == "industry")
            .unwrap();
        assert!(industry.verified);
        assert_eq!(dataset.total_sources, 2);
    }

    #[test]
    fn test_cross_reference_empty_datasets() {
        let engine = TruthEngine::default();
        let dataset = engine.cross_reference(&[], "Acme", "company");
        assert_eq!(dataset.facts.len(), 0);
        assert_eq!(dataset.overall_confidence, 0.0);
    }
}
