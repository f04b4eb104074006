//! Report assembly.
//!
//! Gathers the outputs of the analysis stages into one [`SystemReport`] and
//! derives the human-readable recommendation lines from them.

use chrono::{DateTime, Utc};

use taxon_core::{
    CurrentStructure, DefectKind, HierarchyIssue, HierarchyStats, Level, MappingRecommendation,
    Severity, SystemReport,
};

use crate::index::TaxonomyIndex;

/// Line used when a run has nothing to recommend.
pub const NO_ACTION: &str = "No structural issues found; no action required.";

/// Headline counts of the current structure.
pub fn current_structure(index: &TaxonomyIndex<'_>) -> CurrentStructure {
    let snapshot = index.snapshot();
    let categories = 0..snapshot.categories.len();
    CurrentStructure {
        divisions: snapshot.divisions.len(),
        categories_in_divisions: categories
            .clone()
            .filter(|&c| index.category_division(c).is_some())
            .count(),
        hebrew_categories: categories.filter(|&c| index.is_legacy(c)).count(),
        subcategories: snapshot.count(Level::Subcategory),
        providers: snapshot.providers.len(),
        services: snapshot.services.len(),
    }
}

/// Builder for [`SystemReport`].
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    captured_at: DateTime<Utc>,
    structure: CurrentStructure,
    stats: HierarchyStats,
    issues: Vec<HierarchyIssue>,
    mappings: Vec<MappingRecommendation>,
    notes: Vec<String>,
}

impl ReportBuilder {
    pub fn new(captured_at: DateTime<Utc>) -> Self {
        Self {
            captured_at,
            structure: CurrentStructure::default(),
            stats: HierarchyStats::default(),
            issues: Vec::new(),
            mappings: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn structure(mut self, structure: CurrentStructure) -> Self {
        self.structure = structure;
        self
    }

    pub fn stats(mut self, stats: HierarchyStats) -> Self {
        self.stats = stats;
        self
    }

    /// Issues, already classified and ordered.
    pub fn issues(mut self, issues: Vec<HierarchyIssue>) -> Self {
        self.issues = issues;
        self
    }

    /// Mappings, already ordered.
    pub fn mappings(mut self, mappings: Vec<MappingRecommendation>) -> Self {
        self.mappings = mappings;
        self
    }

    /// Stage note carried into the recommendation lines.
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn build(self) -> SystemReport {
        let recommendations = recommendation_lines(&self.issues, &self.mappings, &self.notes);
        SystemReport {
            timestamp: self.captured_at,
            current_structure: self.structure,
            issues: self.issues,
            recommendations,
            mappings: self.mappings,
            stats: self.stats,
        }
    }
}

/// Recommendation lines: one per issue, one per mapping, then the notes.
fn recommendation_lines(
    issues: &[HierarchyIssue],
    mappings: &[MappingRecommendation],
    notes: &[String],
) -> Vec<String> {
    let mut lines: Vec<String> = issues.iter().map(issue_line).collect();
    lines.extend(mappings.iter().map(mapping_line));
    lines.extend(notes.iter().cloned());
    if lines.is_empty() {
        lines.push(NO_ACTION.to_string());
    }
    lines
}

fn issue_line(issue: &HierarchyIssue) -> String {
    let action = match issue.kind {
        DefectKind::DanglingReference => "Repair or remove references to missing entities",
        DefectKind::CircularHierarchy => "Break the circular parent/child chain",
        DefectKind::OrphanedCategory if issue.severity == Severity::High => {
            "Assign orphaned categories to a division before migrating their providers"
        }
        DefectKind::OrphanedCategory => "Assign orphaned categories to a division",
        DefectKind::DuplicateName => "Merge or rename duplicate siblings",
        DefectKind::SimulatedLeakage => "Separate simulated entries from production data",
        DefectKind::ParentMismatch => "Reconcile child lists with parent references",
        DefectKind::DivisionCountMismatch => "Align the division set with the target structure",
        DefectKind::EmptyBranch => "Populate or remove empty branches",
    };
    let scope = issue
        .category
        .as_deref()
        .map(|c| format!(" in '{}'", c))
        .unwrap_or_default();
    format!(
        "[{}] {}{} ({} affected)",
        issue.severity, action, scope, issue.count
    )
}

fn mapping_line(mapping: &MappingRecommendation) -> String {
    format!(
        "Map \"{}\" to \"{}\" (confidence {:.0}%, {} providers, {} services)",
        mapping.source_category,
        mapping.target_division,
        mapping.confidence * 100.0,
        mapping.affected_providers,
        mapping.affected_services
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use taxon_core::{Category, Division, TaxonomySnapshot};

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_empty_report_says_no_action() {
        let report = ReportBuilder::new(at()).build();
        assert_eq!(report.timestamp, at());
        assert_eq!(report.recommendations, vec![NO_ACTION.to_string()]);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_recommendations_follow_issues_then_mappings_then_notes() {
        let issue = HierarchyIssue {
            severity: Severity::High,
            kind: DefectKind::DanglingReference,
            title: "Dangling reference".to_string(),
            description: "Provider 'p1' references missing subcategory 'x'".to_string(),
            count: 1,
            category: Some("Weddings".to_string()),
            subcategory: None,
            affected_items: Some(vec!["p1".to_string()]),
        };
        let mapping = MappingRecommendation {
            source_category: "Catering".to_string(),
            source_category_id: "c1".to_string(),
            target_division: "Food & Drink".to_string(),
            target_division_id: "food".to_string(),
            confidence: 0.92,
            affected_providers: 3,
            affected_services: 7,
        };

        let report = ReportBuilder::new(at())
            .issues(vec![issue])
            .mappings(vec![mapping])
            .note("Target snapshot was invalid")
            .build();

        assert_eq!(report.recommendations.len(), 3);
        assert_eq!(
            report.recommendations[0],
            "[high] Repair or remove references to missing entities in 'Weddings' (1 affected)"
        );
        assert_eq!(
            report.recommendations[1],
            "Map \"Catering\" to \"Food & Drink\" (confidence 92%, 3 providers, 7 services)"
        );
        assert_eq!(report.recommendations[2], "Target snapshot was invalid");
    }

    #[test]
    fn test_structure_counts_assigned_and_legacy_categories() {
        let snapshot = TaxonomySnapshot {
            divisions: vec![Division {
                id: "d1".to_string(),
                name: "Events".to_string(),
                category_ids: vec!["c1".to_string()],
                ..Default::default()
            }],
            categories: vec![
                Category {
                    id: "c1".to_string(),
                    name: "Weddings".to_string(),
                    ..Default::default()
                },
                Category {
                    id: "c2".to_string(),
                    name: "הפקות".to_string(),
                    language: Some("he".to_string()),
                    ..Default::default()
                },
                Category {
                    id: "c3".to_string(),
                    name: "Lost".to_string(),
                    division_id: Some("missing".to_string()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let index = TaxonomyIndex::build(&snapshot).unwrap();

        let structure = current_structure(&index);
        assert_eq!(structure.divisions, 1);
        assert_eq!(structure.categories_in_divisions, 1);
        assert_eq!(structure.hebrew_categories, 1);
        assert_eq!(structure.subcategories, 0);
    }
}
