//! Key normalization and fuzzy matching for cross-source comparison.
//!
//! Claims arrive under slightly different keys per provider ("Annual
//! Revenue", "annual_revenue", "revenue (annual)"). Keys are normalized to a
//! canonical snake form, then matched exactly or by similarity ratio.

use regex::Regex;
use std::sync::OnceLock;

/// Similarity threshold above which two normalized keys refer to the same
/// claim.
pub const KEY_SIMILARITY_THRESHOLD: f64 = 0.8;

/// Similarity threshold above which two string values agree.
pub const VALUE_SIMILARITY_THRESHOLD: f64 = 0.9;

fn non_alnum() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9\s]").expect("static regex"))
}

fn whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

/// Normalize a claim key: lowercase, strip non-alphanumerics, collapse
/// whitespace runs to single underscores.
pub fn normalize_key(key: &str) -> String {
    let lowered = key.to_lowercase();
    let stripped = non_alnum().replace_all(&lowered, "");
    whitespace()
        .replace_all(stripped.trim(), "_")
        .into_owned()
}

/// Similarity ratio between two strings in `[0, 1]`.
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

/// Whether two normalized keys refer to the same claim.
pub fn keys_similar(a: &str, b: &str) -> bool {
    similarity(a, b) >= KEY_SIMILARITY_THRESHOLD
}

/// Whether two string values agree after case folding.
pub fn values_similar(a: &str, b: &str) -> bool {
    similarity(&a.to_lowercase(), &b.to_lowercase()) >= VALUE_SIMILARITY_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("Annual Revenue"), "annual_revenue");
        assert_eq!(normalize_key("revenue (annual)"), "revenue_annual");
        assert_eq!(normalize_key("  CEO   Name "), "ceo_name");
        assert_eq!(normalize_key("employees!!!"), "employees");
    }

    #[test]
    fn test_identical_keys_are_similar() {
        assert!(keys_similar("annual_revenue", "annual_revenue"));
    }

    #[test]
    fn test_near_keys_are_similar() {
        assert!(keys_similar("annual_revenue", "annual_revenues"));
        assert!(!keys_similar("annual_revenue", "employee_count"));
    }

    #[test]
    fn test_value_similarity_case_folds() {
        assert!(values_similar("Cloud Infrastructure", "cloud infrastructure"));
        assert!(values_similar("$100M", "$100M"));
        assert!(!values_similar("$100M", "$250M "));
    }
}
