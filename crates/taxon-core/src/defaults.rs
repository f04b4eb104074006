//! Centralized default constants for the taxonomy integrity engine.
//!
//! **This module is the single source of truth** for analysis thresholds and
//! weights. The configuration layer, the analyzer, and the CLI reference these
//! constants instead of defining their own magic numbers.

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// Maximum entity ids listed in one issue's `affectedItems`.
/// Overflow is summarized by count only.
pub const MAX_AFFECTED_ITEMS: usize = 50;

/// Whether issues are split per category scope by default.
pub const GROUP_BY_CATEGORY: bool = false;

// =============================================================================
// MAPPING RECOMMENDER
// =============================================================================

/// Candidates scoring below this are never surfaced.
pub const MIN_CONFIDENCE: f64 = 0.5;

/// A runner-up within this distance of the top score is surfaced too.
pub const TIE_MARGIN: f64 = 0.05;

/// Added when a sibling from the same legacy group already lives in the division.
pub const SIBLING_BONUS: f64 = 0.15;

/// Maximum deduction for mapping into an overloaded division.
pub const IMBALANCE_PENALTY: f64 = 0.1;

/// A division is overloaded above this multiple of the mean category load.
pub const IMBALANCE_RATIO: f64 = 1.5;

/// Exact normalized name matches always score at least this much.
pub const EXACT_MATCH_CONFIDENCE: f64 = 0.9;

// =============================================================================
// ENVIRONMENT
// =============================================================================

pub const ENV_MAX_AFFECTED_ITEMS: &str = "TAXON_MAX_AFFECTED_ITEMS";
pub const ENV_GROUP_BY_CATEGORY: &str = "TAXON_GROUP_BY_CATEGORY";
pub const ENV_EXPECTED_DIVISIONS: &str = "TAXON_EXPECTED_DIVISIONS";
pub const ENV_MIN_CONFIDENCE: &str = "TAXON_MIN_CONFIDENCE";
pub const ENV_TIE_MARGIN: &str = "TAXON_TIE_MARGIN";
pub const ENV_SIBLING_BONUS: &str = "TAXON_SIBLING_BONUS";
pub const ENV_IMBALANCE_PENALTY: &str = "TAXON_IMBALANCE_PENALTY";
pub const ENV_IMBALANCE_RATIO: &str = "TAXON_IMBALANCE_RATIO";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_survives_worst_penalty() {
        assert!(1.0 - IMBALANCE_PENALTY >= EXACT_MATCH_CONFIDENCE);
    }

    #[test]
    fn test_runner_up_margin_is_small() {
        assert!(TIE_MARGIN < MIN_CONFIDENCE);
        assert!(TIE_MARGIN > 0.0);
    }
}
