//! Structured logging field name constants.
//!
//! The analyzer and the CLI use these constants for consistent structured
//! logging fields so runs can be queried by field name.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Run failed, no report produced |
//! | WARN  | Stage skipped, report still produced |
//! | INFO  | Run completions |
//! | DEBUG | Decision points, stage summaries, config choices |
//! | TRACE | Per-entity iteration |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Component within the engine.
/// Values: "scanner", "classifier", "recommender", "report", "analyzer", "cli"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "analyze", "scan", "classify", "recommend"
pub const OPERATION: &str = "op";

/// Analysis mode ("audit", "migration").
pub const MODE: &str = "mode";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Entity id being inspected.
pub const ENTITY_ID: &str = "entity_id";

/// Taxonomy level of the entity being inspected.
pub const LEVEL: &str = "level";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Raw observations produced by the scanner.
pub const OBSERVATION_COUNT: &str = "observation_count";

/// Classified issues in the report.
pub const ISSUE_COUNT: &str = "issue_count";

/// Mapping recommendations in the report.
pub const MAPPING_COUNT: &str = "mapping_count";

/// Legacy categories considered by the recommender.
pub const LEGACY_COUNT: &str = "legacy_count";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_field_names_are_unique_snake_case() {
        let fields = [
            COMPONENT,
            OPERATION,
            MODE,
            ENTITY_ID,
            LEVEL,
            DURATION_MS,
            OBSERVATION_COUNT,
            ISSUE_COUNT,
            MAPPING_COUNT,
            LEGACY_COUNT,
            SUCCESS,
            ERROR_MSG,
        ];
        let unique: HashSet<&str> = fields.iter().copied().collect();
        assert_eq!(unique.len(), fields.len());
        for field in fields {
            assert!(field
                .chars()
                .all(|c| c.is_ascii_lowercase() || c == '_'));
        }
    }

    #[test]
    fn test_analyzer_fields_match_emitted_names() {
        // The analyzer and CLI emit these as literal tracing field names
        assert_eq!(ISSUE_COUNT, "issue_count");
        assert_eq!(MAPPING_COUNT, "mapping_count");
        assert_eq!(DURATION_MS, "duration_ms");
        assert_eq!(OPERATION, "op");
    }
}
