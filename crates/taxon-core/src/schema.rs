//! JSON Schemas for the engine's input and output documents.
//!
//! Built at runtime from `schemars` derives so the published schema never
//! drifts from the types the dashboard actually receives.

use schemars::schema_for;
use serde_json::Value;

use crate::models::TaxonomySnapshot;
use crate::report::SystemReport;

/// JSON Schema of [`SystemReport`].
pub fn report_schema() -> Value {
    serde_json::to_value(schema_for!(SystemReport)).unwrap_or(Value::Null)
}

/// JSON Schema of [`TaxonomySnapshot`].
pub fn snapshot_schema() -> Value {
    serde_json::to_value(schema_for!(TaxonomySnapshot)).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_schema_lists_dashboard_fields() {
        let schema = report_schema();
        let props = schema["properties"].as_object().unwrap();
        for field in ["timestamp", "currentStructure", "issues", "recommendations"] {
            assert!(props.contains_key(field), "missing {}", field);
        }
        assert_eq!(schema["title"], "SystemReport");
    }

    #[test]
    fn test_report_schema_defines_issue_shape() {
        let schema = report_schema();
        let issue = &schema["definitions"]["HierarchyIssue"]["properties"];
        assert!(issue.get("affectedItems").is_some());
        assert!(issue.get("severity").is_some());
    }

    #[test]
    fn test_snapshot_schema_lists_levels() {
        let schema = snapshot_schema();
        let props = schema["properties"].as_object().unwrap();
        for field in [
            "divisions",
            "categories",
            "subcategories",
            "concepts",
            "subconcepts",
            "providers",
            "services",
        ] {
            assert!(props.contains_key(field), "missing {}", field);
        }
    }
}
