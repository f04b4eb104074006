//! Issue classifier.
//!
//! Turns the scanner's raw observations into aggregated, prioritized
//! [`HierarchyIssue`]s and recounts [`HierarchyStats`].

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use taxon_core::{
    AnalysisConfig, DefectKind, HierarchyIssue, HierarchyStats, Level, Result, Severity,
    TaxonomySnapshot,
};

use crate::scanner::Observation;

/// Severity of one observation.
pub fn severity_of(observation: &Observation) -> Severity {
    match observation.kind {
        DefectKind::DanglingReference | DefectKind::CircularHierarchy => Severity::High,
        DefectKind::OrphanedCategory if observation.attached > 0 => Severity::High,
        DefectKind::OrphanedCategory
        | DefectKind::DuplicateName
        | DefectKind::SimulatedLeakage
        | DefectKind::ParentMismatch
        | DefectKind::DivisionCountMismatch => Severity::Medium,
        DefectKind::EmptyBranch => Severity::Low,
    }
}

type GroupKey = (DefectKind, Severity, Option<String>);

#[derive(Default)]
struct Group {
    entities: Vec<String>,
    seen: HashSet<(Level, String)>,
    items: Vec<String>,
    descriptions: Vec<String>,
    categories: HashSet<Option<String>>,
    subcategories: HashSet<Option<String>>,
    first_category: Option<String>,
    first_subcategory: Option<String>,
}

impl Group {
    fn add(&mut self, observation: Observation) {
        if self.entities.is_empty() {
            self.first_category = observation.category.clone();
            self.first_subcategory = observation.subcategory.clone();
        }
        self.categories.insert(observation.category);
        self.subcategories.insert(observation.subcategory);

        // Ids are only unique within a level.
        if self
            .seen
            .insert((observation.level, observation.entity_id.clone()))
        {
            self.items.push(observation.entity_id.clone());
            self.entities.push(observation.entity_id);
        }
        if self.entities.len() == 1 && !self.descriptions.contains(&observation.description) {
            self.descriptions.push(observation.description);
        }
    }

    /// The context value when every observation agrees on it.
    fn shared(values: &HashSet<Option<String>>, first: Option<String>) -> Option<String> {
        if values.len() == 1 {
            first
        } else {
            None
        }
    }
}

/// Aggregates observations into issues.
pub struct Classifier {
    max_affected_items: usize,
    group_by_category: bool,
}

impl Classifier {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            max_affected_items: config.max_affected_items.max(1),
            group_by_category: config.group_by_category,
        }
    }

    /// Classify and aggregate a sequence of observations.
    ///
    /// The first error in the sequence aborts classification.
    pub fn classify<I>(&self, observations: I) -> Result<Vec<HierarchyIssue>>
    where
        I: IntoIterator<Item = Result<Observation>>,
    {
        let mut groups: BTreeMap<GroupKey, Group> = BTreeMap::new();
        let mut total = 0usize;

        for observation in observations {
            let observation = observation?;
            total += 1;
            let scope = if self.group_by_category {
                observation.category.clone()
            } else {
                None
            };
            let key = (observation.kind, severity_of(&observation), scope);
            groups.entry(key).or_default().add(observation);
        }

        let mut issues: Vec<HierarchyIssue> = groups
            .into_iter()
            .map(|((kind, severity, scope), group)| self.build_issue(kind, severity, scope, group))
            .collect();

        issues.sort_by(|a, b| {
            (a.severity, Reverse(a.count), &a.title, &a.category).cmp(&(
                b.severity,
                Reverse(b.count),
                &b.title,
                &b.category,
            ))
        });

        debug!(
            observation_count = total,
            issue_count = issues.len(),
            "Classified observations"
        );
        Ok(issues)
    }

    fn build_issue(
        &self,
        kind: DefectKind,
        severity: Severity,
        scope: Option<String>,
        group: Group,
    ) -> HierarchyIssue {
        let count = group.entities.len();

        let mut title = kind.label().to_string();
        if kind == DefectKind::OrphanedCategory && severity == Severity::High {
            title.push_str(" with attached providers/services");
        }

        let mut description = if count == 1 {
            group.descriptions.join("; ")
        } else {
            summarize(kind, severity, count)
        };

        let mut items = group.items;
        if items.len() > self.max_affected_items {
            let hidden = items.len() - self.max_affected_items;
            items.truncate(self.max_affected_items);
            description.push_str(&format!(" ({} more not listed)", hidden));
        }

        let (category, subcategory) = if self.group_by_category {
            (
                scope,
                Group::shared(&group.subcategories, group.first_subcategory),
            )
        } else {
            (
                Group::shared(&group.categories, group.first_category),
                Group::shared(&group.subcategories, group.first_subcategory),
            )
        };

        HierarchyIssue {
            severity,
            kind,
            title,
            description,
            count,
            category,
            subcategory,
            affected_items: Some(items),
        }
    }
}

fn summarize(kind: DefectKind, severity: Severity, count: usize) -> String {
    match kind {
        DefectKind::OrphanedCategory if severity == Severity::High => format!(
            "{} categories are not assigned to any division but carry providers or services",
            count
        ),
        DefectKind::OrphanedCategory => {
            format!("{} categories are not assigned to any division", count)
        }
        DefectKind::DuplicateName => {
            format!("{} entries share a display name with a sibling", count)
        }
        DefectKind::DanglingReference => {
            format!("{} entities reference ids missing from the snapshot", count)
        }
        DefectKind::EmptyBranch => format!(
            "{} branches have no children and no providers or services",
            count
        ),
        DefectKind::SimulatedLeakage => format!(
            "{} providers or services sit among entries with the opposite simulation flag",
            count
        ),
        DefectKind::CircularHierarchy => {
            format!("{} nodes take part in circular parent/child chains", count)
        }
        DefectKind::ParentMismatch => format!(
            "{} nodes are listed under a parent they do not name",
            count
        ),
        DefectKind::DivisionCountMismatch => {
            format!("{} division count mismatches", count)
        }
    }
}

/// Full recount of the snapshot.
pub fn compute_stats(snapshot: &TaxonomySnapshot) -> HierarchyStats {
    HierarchyStats {
        categories: snapshot.categories.len(),
        subcategories: snapshot.subcategories.len(),
        concepts: snapshot.concepts.len(),
        subconcepts: snapshot.subconcepts.len(),
        providers: snapshot.providers.len(),
        services: snapshot.services.len(),
        simulated_providers: snapshot.providers.iter().filter(|p| p.is_simulated).count(),
        simulated_services: snapshot.services.iter().filter(|s| s.is_simulated).count(),
    }
}
