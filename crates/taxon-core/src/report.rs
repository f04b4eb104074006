//! Analysis output types.
//!
//! These are the only artifacts the engine exposes. Field names serialize in
//! camelCase because the report is consumed directly by the admin dashboard.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// =============================================================================
// SEVERITY AND DEFECT KINDS
// =============================================================================

/// Issue severity. Declaration order is report order: high sorts first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(format!("Invalid severity: {}", s)),
        }
    }
}

/// Structural defects the scanner can observe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum DefectKind {
    /// Category with no parent division (legacy flat category).
    OrphanedCategory,

    /// Siblings sharing a normalized display name.
    DuplicateName,

    /// Reference to an entity that does not exist in the snapshot.
    DanglingReference,

    /// Branch node with no children and nothing attached.
    EmptyBranch,

    /// Simulated and production attachments mixed under one node.
    SimulatedLeakage,

    /// Node that is its own ancestor.
    CircularHierarchy,

    /// Child whose parent reference names a different node.
    ParentMismatch,

    /// Division count differs from the configured target structure.
    DivisionCountMismatch,
}

impl DefectKind {
    /// Human-readable label used in issue titles.
    pub fn label(self) -> &'static str {
        match self {
            Self::OrphanedCategory => "Orphaned category",
            Self::DuplicateName => "Duplicate name",
            Self::DanglingReference => "Dangling reference",
            Self::EmptyBranch => "Empty branch",
            Self::SimulatedLeakage => "Simulated data leakage",
            Self::CircularHierarchy => "Circular hierarchy",
            Self::ParentMismatch => "Parent mismatch",
            Self::DivisionCountMismatch => "Division count mismatch",
        }
    }
}

impl std::fmt::Display for DefectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OrphanedCategory => write!(f, "orphaned_category"),
            Self::DuplicateName => write!(f, "duplicate_name"),
            Self::DanglingReference => write!(f, "dangling_reference"),
            Self::EmptyBranch => write!(f, "empty_branch"),
            Self::SimulatedLeakage => write!(f, "simulated_leakage"),
            Self::CircularHierarchy => write!(f, "circular_hierarchy"),
            Self::ParentMismatch => write!(f, "parent_mismatch"),
            Self::DivisionCountMismatch => write!(f, "division_count_mismatch"),
        }
    }
}

impl std::str::FromStr for DefectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "orphaned_category" | "orphanedcategory" => Ok(Self::OrphanedCategory),
            "duplicate_name" | "duplicatename" => Ok(Self::DuplicateName),
            "dangling_reference" | "danglingreference" => Ok(Self::DanglingReference),
            "empty_branch" | "emptybranch" => Ok(Self::EmptyBranch),
            "simulated_leakage" | "simulatedleakage" => Ok(Self::SimulatedLeakage),
            "circular_hierarchy" | "circularhierarchy" => Ok(Self::CircularHierarchy),
            "parent_mismatch" | "parentmismatch" => Ok(Self::ParentMismatch),
            "division_count_mismatch" | "divisioncountmismatch" => {
                Ok(Self::DivisionCountMismatch)
            }
            _ => Err(format!("Invalid defect kind: {}", s)),
        }
    }
}

// =============================================================================
// ISSUES AND STATS
// =============================================================================

/// One classified, aggregated defect in the taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyIssue {
    pub severity: Severity,
    pub kind: DefectKind,
    pub title: String,
    pub description: String,
    /// Number of distinct affected entities.
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affected_items: Option<Vec<String>>,
}

/// Entity counts recomputed from the snapshot on every run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyStats {
    pub categories: usize,
    pub subcategories: usize,
    pub concepts: usize,
    pub subconcepts: usize,
    pub providers: usize,
    pub services: usize,
    pub simulated_providers: usize,
    pub simulated_services: usize,
}

// =============================================================================
// MIGRATION MAPPING
// =============================================================================

/// Proposed move of a legacy category under a target division.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MappingRecommendation {
    /// Display name of the legacy category.
    pub source_category: String,
    pub source_category_id: String,
    /// Display name of the candidate division.
    pub target_division: String,
    pub target_division_id: String,
    /// Score in [0, 1].
    pub confidence: f64,
    pub affected_providers: usize,
    pub affected_services: usize,
}

// =============================================================================
// SYSTEM REPORT
// =============================================================================

/// Structural summary shown at the top of the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CurrentStructure {
    pub divisions: usize,
    pub categories_in_divisions: usize,
    /// Legacy flat categories not yet migrated into a division.
    pub hebrew_categories: usize,
    pub subcategories: usize,
    pub providers: usize,
    pub services: usize,
}

/// Complete output of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SystemReport {
    pub timestamp: DateTime<Utc>,
    pub current_structure: CurrentStructure,
    pub issues: Vec<HierarchyIssue>,
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub mappings: Vec<MappingRecommendation>,
    #[serde(default)]
    pub stats: HierarchyStats,
}

impl SystemReport {
    /// Issues at the given severity.
    pub fn issues_with(&self, severity: Severity) -> impl Iterator<Item = &HierarchyIssue> {
        self.issues.iter().filter(move |i| i.severity == severity)
    }

    /// Issues of the given defect kind.
    pub fn issues_of(&self, kind: DefectKind) -> impl Iterator<Item = &HierarchyIssue> {
        self.issues.iter().filter(move |i| i.kind == kind)
    }

    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_severity_order_puts_high_first() {
        let mut severities = vec![Severity::Low, Severity::High, Severity::Medium];
        severities.sort();
        assert_eq!(
            severities,
            vec![Severity::High, Severity::Medium, Severity::Low]
        );
    }

    #[test]
    fn test_severity_serialization() {
        assert_eq!(serde_json::to_string(&Severity::High).unwrap(), "\"high\"");
        assert_eq!("MEDIUM".parse::<Severity>().unwrap(), Severity::Medium);
        assert!("critical".parse::<Severity>().is_err());
    }

    #[test]
    fn test_defect_kind_parsing() {
        assert_eq!(
            "dangling_reference".parse::<DefectKind>().unwrap(),
            DefectKind::DanglingReference
        );
        assert_eq!(
            "circularhierarchy".parse::<DefectKind>().unwrap(),
            DefectKind::CircularHierarchy
        );
        assert_eq!(
            DefectKind::SimulatedLeakage.to_string(),
            "simulated_leakage"
        );
        assert!("orphan".parse::<DefectKind>().is_err());
    }

    #[test]
    fn test_issue_omits_absent_optional_fields() {
        let issue = HierarchyIssue {
            severity: Severity::Low,
            kind: DefectKind::EmptyBranch,
            title: "Empty branch".to_string(),
            description: "Subcategory 'Tents' has nothing under it".to_string(),
            count: 1,
            category: None,
            subcategory: None,
            affected_items: None,
        };

        let value = serde_json::to_value(&issue).unwrap();
        let obj = value.as_object().unwrap();
        assert!(!obj.contains_key("category"));
        assert!(!obj.contains_key("subcategory"));
        assert!(!obj.contains_key("affectedItems"));
        assert_eq!(obj["severity"], "low");
    }

    #[test]
    fn test_report_field_names() {
        let report = SystemReport {
            timestamp: Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap(),
            current_structure: CurrentStructure {
                divisions: 5,
                categories_in_divisions: 12,
                hebrew_categories: 3,
                subcategories: 40,
                providers: 7,
                services: 9,
            },
            issues: vec![],
            recommendations: vec!["Nothing to do".to_string()],
            mappings: vec![],
            stats: HierarchyStats::default(),
        };

        let value = serde_json::to_value(&report).unwrap();
        let structure = &value["currentStructure"];
        assert_eq!(structure["divisions"], 5);
        assert_eq!(structure["categoriesInDivisions"], 12);
        assert_eq!(structure["hebrewCategories"], 3);
        assert_eq!(structure["subcategories"], 40);
        assert!(value["recommendations"].is_array());
        assert_eq!(value["stats"]["simulatedProviders"], 0);
    }
}
