//! Category-to-division mapping recommender.
//!
//! Scores every legacy category of the current snapshot against every
//! division of a target taxonomy. Scores are deterministic; nothing is ever
//! applied to the snapshot.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use taxon_core::defaults::EXACT_MATCH_CONFIDENCE;
use taxon_core::{Level, MappingRecommendation, RecommenderConfig, Result};

use crate::cancel::CancellationToken;
use crate::index::{NodeKey, TaxonomyIndex};
use crate::similarity::best_similarity;

/// One scored (category, division) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub division: usize,
    pub similarity: f64,
    pub sibling_bonus: f64,
    pub imbalance_penalty: f64,
    pub confidence: f64,
}

pub struct Recommender {
    config: RecommenderConfig,
    cancel: CancellationToken,
}

impl Recommender {
    pub fn new(config: RecommenderConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Mapping suggestions for every legacy category of `source`.
    ///
    /// Ordered by descending confidence, then source category id, then
    /// target division id.
    pub fn recommend(
        &self,
        source: &TaxonomyIndex<'_>,
        target: &TaxonomyIndex<'_>,
    ) -> Result<Vec<MappingRecommendation>> {
        let loads = division_loads(target);
        let groups = group_divisions(source, target);
        let categories = &source.snapshot().categories;
        let divisions = &target.snapshot().divisions;

        let mut mappings = Vec::new();
        let mut legacy_count = 0usize;
        for (position, category) in categories.iter().enumerate() {
            if !source.is_legacy(position) {
                continue;
            }
            self.cancel.check()?;
            legacy_count += 1;

            let sibling_divisions = category
                .legacy_group
                .as_deref()
                .and_then(|group| groups.get(group));
            let candidates = self.score(&category.name, target, &loads, sibling_divisions);
            let (providers, services) =
                source.subtree_attachments(NodeKey::new(Level::Category, position));

            for candidate in select(candidates, self.config.tie_margin) {
                let division = &divisions[candidate.division];
                debug!(
                    entity_id = %category.id,
                    target = %division.id,
                    similarity = candidate.similarity,
                    confidence = candidate.confidence,
                    "Mapping candidate kept"
                );
                mappings.push(MappingRecommendation {
                    source_category: category.name.clone(),
                    source_category_id: category.id.clone(),
                    target_division: division.name.clone(),
                    target_division_id: division.id.clone(),
                    confidence: candidate.confidence,
                    affected_providers: providers,
                    affected_services: services,
                });
            }
        }

        mappings.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.source_category_id.cmp(&b.source_category_id))
                .then_with(|| a.target_division_id.cmp(&b.target_division_id))
        });
        debug!(
            legacy_count,
            mapping_count = mappings.len(),
            "Scored legacy categories"
        );
        Ok(mappings)
    }

    /// Score one category name against every target division, dropping
    /// candidates under the confidence floor.
    pub fn score(
        &self,
        name: &str,
        target: &TaxonomyIndex<'_>,
        loads: &[usize],
        sibling_divisions: Option<&HashSet<String>>,
    ) -> Vec<Candidate> {
        let divisions = &target.snapshot().divisions;
        let total: usize = loads.iter().sum();
        let threshold = if divisions.is_empty() {
            0.0
        } else {
            total as f64 / divisions.len() as f64 * self.config.imbalance_ratio
        };

        let mut candidates: Vec<Candidate> = divisions
            .iter()
            .enumerate()
            .map(|(position, division)| {
                let names = std::iter::once(division.name.as_str())
                    .chain(division.aliases.iter().map(String::as_str));
                let similarity = best_similarity(name, names);

                let sibling_bonus = if sibling_divisions.is_some_and(|ids| ids.contains(&division.id))
                {
                    self.config.sibling_bonus
                } else {
                    0.0
                };

                let load = loads.get(position).copied().unwrap_or(0) as f64;
                let imbalance_penalty = if total > 0 && threshold > 0.0 && load > threshold {
                    let excess = ((load - threshold) / threshold).clamp(0.0, 1.0);
                    self.config.imbalance_penalty * excess
                } else {
                    0.0
                };

                let mut confidence =
                    (similarity + sibling_bonus - imbalance_penalty).clamp(0.0, 1.0);
                if similarity >= 1.0 {
                    confidence = confidence.max(EXACT_MATCH_CONFIDENCE);
                }

                Candidate {
                    division: position,
                    similarity,
                    sibling_bonus,
                    imbalance_penalty,
                    confidence: round4(confidence),
                }
            })
            .filter(|c| c.confidence >= self.config.min_confidence)
            .collect();

        candidates.sort_by(|a, b| {
            b.confidence.total_cmp(&a.confidence).then_with(|| {
                divisions[a.division].id.cmp(&divisions[b.division].id)
            })
        });
        candidates
    }
}

/// Best candidate, plus the runner-up when it is within `tie_margin`.
fn select(candidates: Vec<Candidate>, tie_margin: f64) -> Vec<Candidate> {
    let mut kept = Vec::with_capacity(2);
    let mut iter = candidates.into_iter();
    if let Some(best) = iter.next() {
        let floor = best.confidence - tie_margin - 1e-9;
        kept.push(best);
        if let Some(runner_up) = iter.next().filter(|c| c.confidence >= floor) {
            kept.push(runner_up);
        }
    }
    kept
}

/// Categories already assigned to each target division.
pub fn division_loads(target: &TaxonomyIndex<'_>) -> Vec<usize> {
    let mut loads = vec![0; target.snapshot().divisions.len()];
    for position in 0..target.snapshot().categories.len() {
        if let Some(division) = target.category_division(position) {
            loads[division] += 1;
        }
    }
    loads
}

/// Division ids already holding a category of each legacy group, gathered
/// from both snapshots.
fn group_divisions(
    source: &TaxonomyIndex<'_>,
    target: &TaxonomyIndex<'_>,
) -> HashMap<String, HashSet<String>> {
    let mut groups: HashMap<String, HashSet<String>> = HashMap::new();
    for index in [source, target] {
        let snapshot = index.snapshot();
        for (position, category) in snapshot.categories.iter().enumerate() {
            let Some(group) = category.legacy_group.as_ref() else {
                continue;
            };
            if let Some(division) = index.category_division(position) {
                groups
                    .entry(group.clone())
                    .or_default()
                    .insert(snapshot.divisions[division].id.clone());
            }
        }
    }
    groups
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use taxon_core::{Category, Division, NodeRef, Provider, TaxonomySnapshot};

    fn division(id: &str, name: &str, aliases: &[&str]) -> Division {
        Division {
            id: id.to_string(),
            name: name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            ..Default::default()
        }
    }

    fn legacy(id: &str, name: &str, group: Option<&str>) -> Category {
        Category {
            id: id.to_string(),
            name: name.to_string(),
            legacy_group: group.map(str::to_string),
            ..Default::default()
        }
    }

    fn assigned(id: &str, name: &str, division: &str, group: Option<&str>) -> Category {
        Category {
            division_id: Some(division.to_string()),
            ..legacy(id, name, group)
        }
    }

    fn target() -> TaxonomySnapshot {
        TaxonomySnapshot {
            divisions: vec![
                division("food", "Food & Drink", &["Catering"]),
                division("venues", "Venues", &[]),
            ],
            ..Default::default()
        }
    }

    fn recommend(
        config: RecommenderConfig,
        source: &TaxonomySnapshot,
        target: &TaxonomySnapshot,
    ) -> Vec<MappingRecommendation> {
        let source = TaxonomyIndex::build(source).unwrap();
        let target = TaxonomyIndex::build(target).unwrap();
        Recommender::new(config).recommend(&source, &target).unwrap()
    }

    #[test]
    fn test_alias_match_maps_catering_to_food() {
        let source = TaxonomySnapshot {
            categories: vec![legacy("c1", "Catering", None)],
            providers: vec![Provider {
                id: "p1".to_string(),
                node: Some(NodeRef::new(Level::Category, "c1")),
                ..Default::default()
            }],
            ..Default::default()
        };

        let mappings = recommend(RecommenderConfig::default(), &source, &target());
        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].target_division_id, "food");
        assert!(mappings[0].confidence > 0.8);
        assert_eq!(mappings[0].affected_providers, 1);
        assert_eq!(mappings[0].affected_services, 0);
    }

    #[test]
    fn test_assigned_categories_are_not_scored() {
        let source = TaxonomySnapshot {
            divisions: vec![division("food", "Food & Drink", &[])],
            categories: vec![assigned("c1", "Catering", "food", None)],
            ..Default::default()
        };

        assert!(recommend(RecommenderConfig::default(), &source, &target()).is_empty());
    }

    #[test]
    fn test_sibling_group_adds_bonus() {
        let config = RecommenderConfig {
            min_confidence: 0.0,
            ..Default::default()
        };
        let plain = TaxonomySnapshot {
            categories: vec![legacy("c1", "Bakery", None)],
            ..Default::default()
        };
        let grouped = TaxonomySnapshot {
            categories: vec![legacy("c1", "Bakery", Some("sweets"))],
            ..Default::default()
        };
        let mut target = target();
        target
            .categories
            .push(assigned("t1", "Pastry", "food", Some("sweets")));

        let confidence = |source: &TaxonomySnapshot| {
            recommend(config.clone(), source, &target)
                .into_iter()
                .find(|m| m.target_division_id == "food")
                .map(|m| m.confidence)
                .unwrap()
        };

        let gain = confidence(&grouped) - confidence(&plain);
        assert!((gain - config.sibling_bonus).abs() < 1e-3, "gain was {}", gain);
    }

    #[test]
    fn test_overloaded_division_is_penalized() {
        let mut target = target();
        for i in 0..5 {
            target
                .categories
                .push(assigned(&format!("t{}", i), "Something", "food", None));
        }
        let source = TaxonomySnapshot {
            categories: vec![legacy("c1", "Catering", None)],
            ..Default::default()
        };

        let mappings = recommend(RecommenderConfig::default(), &source, &target);
        assert_eq!(mappings.len(), 1);
        assert!(mappings[0].confidence < 1.0);
        assert!(mappings[0].confidence >= EXACT_MATCH_CONFIDENCE);
    }

    #[test]
    fn test_near_tie_surfaces_runner_up() {
        let target = TaxonomySnapshot {
            divisions: vec![
                division("live", "Live Music", &[]),
                division("djs", "Music & DJs", &[]),
                division("venues", "Venues", &[]),
            ],
            ..Default::default()
        };
        let source = TaxonomySnapshot {
            categories: vec![legacy("c1", "Music", None)],
            ..Default::default()
        };

        let mappings = recommend(RecommenderConfig::default(), &source, &target);
        let targets: Vec<&str> = mappings
            .iter()
            .map(|m| m.target_division_id.as_str())
            .collect();
        assert_eq!(targets, vec!["djs", "live"]);
    }

    #[test]
    fn test_confidence_stays_in_bounds() {
        let config = RecommenderConfig {
            min_confidence: 0.0,
            sibling_bonus: 1.0,
            ..Default::default()
        };
        let source = TaxonomySnapshot {
            categories: vec![legacy("c1", "Catering", Some("g"))],
            ..Default::default()
        };
        let mut target = target();
        target.categories.push(assigned("t1", "Bar", "food", Some("g")));

        for mapping in recommend(config, &source, &target) {
            assert!((0.0..=1.0).contains(&mapping.confidence));
        }
    }

    #[test]
    fn test_cancelled_recommender_fails() {
        let source = TaxonomySnapshot {
            categories: vec![legacy("c1", "Catering", None)],
            ..Default::default()
        };
        let target = target();
        let source = TaxonomyIndex::build(&source).unwrap();
        let target = TaxonomyIndex::build(&target).unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let result = Recommender::new(RecommenderConfig::default())
            .with_cancellation(token)
            .recommend(&source, &target);
        assert!(matches!(result, Err(taxon_core::Error::Cancelled)));
    }
}
