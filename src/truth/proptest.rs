//! Property-based tests for the truth engine using proptest.
//!
//! These validate the verification invariants over randomized inputs:
//!
//! - A verified fact always has supporting sources and confidence at or
//!   above the configured floor
//! - Confidence is always within [0, 1]
//! - Fuzzy-similar string values (ratio >= 0.9) count as support
//! - Key normalization produces the canonical snake charset
//! - Dataset aggregates stay consistent with their facts
