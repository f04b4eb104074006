//! Consistency scanner.
//!
//! Walks a validated [`TaxonomyIndex`] and yields raw defect observations
//! lazily, one entity at a time. Traversal order is fixed: divisions,
//! categories, subcategories, concepts, subconcepts, the hierarchy cycle pass,
//! providers, services. A bad entity never stops the scan; it only produces
//! observations. The cancellation token is checked before every entity.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::trace;

use taxon_core::{DefectKind, Level, NodeRef, Result};

use crate::cancel::CancellationToken;
use crate::index::{NodeKey, TaxonomyIndex};
use crate::similarity::normalize_name;

/// Entity id used for observations about the taxonomy as a whole.
pub const TAXONOMY_ROOT: &str = "taxonomy";

/// One raw defect observation about one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub kind: DefectKind,
    pub level: Level,
    pub entity_id: String,
    /// Other entity ids involved (missing targets, cycle members, ...).
    pub related: Vec<String>,
    pub description: String,
    /// Name of the enclosing category.
    pub category: Option<String>,
    /// Name of the enclosing subcategory.
    pub subcategory: Option<String>,
    /// Providers plus services attached in the entity's subtree.
    pub attached: usize,
}

/// Per-node tally of simulated vs production attachments.
#[derive(Debug, Clone, Copy, Default)]
struct Mix {
    simulated: usize,
    production: usize,
}

impl Mix {
    /// Which side is out of place at a mixed node; ties flag the simulated side.
    fn flagged(self) -> Option<bool> {
        if self.simulated == 0 || self.production == 0 {
            None
        } else {
            Some(self.simulated <= self.production)
        }
    }
}

/// Scanner over one snapshot. Cheap to build; [`Scanner::scan`] can be
/// called any number of times and always yields the same sequence.
pub struct Scanner<'i, 'a> {
    index: &'i TaxonomyIndex<'a>,
    expected_divisions: Option<usize>,
    cancel: CancellationToken,
    duplicates: HashSet<NodeKey>,
    mix: HashMap<NodeKey, Mix>,
}

impl<'i, 'a> Scanner<'i, 'a> {
    pub fn new(index: &'i TaxonomyIndex<'a>) -> Self {
        let mut scanner = Self {
            index,
            expected_divisions: None,
            cancel: CancellationToken::new(),
            duplicates: HashSet::new(),
            mix: HashMap::new(),
        };
        scanner.duplicates = scanner.find_duplicates();
        scanner.mix = scanner.tally_mix();
        scanner
    }

    /// Report a mismatch when the division count differs from `expected`.
    pub fn with_expected_divisions(mut self, expected: Option<usize>) -> Self {
        self.expected_divisions = expected;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Fresh lazy observation sequence.
    pub fn scan(&self) -> ScanIter<'_, 'i, 'a> {
        ScanIter {
            scanner: self,
            phase: Phase::Structure,
            cursor: 0,
            pending: VecDeque::new(),
            visited: HashSet::new(),
        }
    }

    /// Siblings sharing a normalized name. Sibling sets are keyed by the
    /// resolved parent, so orphans form one set per level. A parent id that
    /// does not resolve still groups the nodes naming it.
    fn find_duplicates(&self) -> HashSet<NodeKey> {
        type SiblingKey<'s> = (Level, Option<NodeKey>, Option<&'s str>, String);
        let mut groups: HashMap<SiblingKey<'_>, Vec<NodeKey>> = HashMap::new();
        for level in Level::NODES {
            for node in self.index.nodes(level) {
                let parent = self.index.parent(node.key);
                let unresolved = if parent.is_none() { node.parent_id } else { None };
                groups
                    .entry((level, parent, unresolved, normalize_name(node.name)))
                    .or_default()
                    .push(node.key);
            }
        }
        groups
            .into_values()
            .filter(|keys| keys.len() > 1)
            .flatten()
            .collect()
    }

    fn tally_mix(&self) -> HashMap<NodeKey, Mix> {
        let snapshot = self.index.snapshot();
        let mut mix: HashMap<NodeKey, Mix> = HashMap::new();
        for level in Level::NODES {
            for node in self.index.nodes(level) {
                let Some(attached) = self.index.attachments(node.key) else {
                    continue;
                };
                let flags = attached
                    .providers
                    .iter()
                    .map(|&p| snapshot.providers[p].is_simulated)
                    .chain(
                        attached
                            .services
                            .iter()
                            .map(|&s| snapshot.services[s].is_simulated),
                    );
                let entry = mix.entry(node.key).or_default();
                for simulated in flags {
                    if simulated {
                        entry.simulated += 1;
                    } else {
                        entry.production += 1;
                    }
                }
            }
        }
        mix
    }

    fn observe(&self, kind: DefectKind, key: NodeKey, description: String) -> Observation {
        let node = self.index.node(key);
        let (category, subcategory) = self.index.context(key);
        Observation {
            kind,
            level: key.level,
            entity_id: node.id.to_string(),
            related: Vec::new(),
            description,
            category,
            subcategory,
            attached: 0,
        }
    }

    fn describe(&self, key: NodeKey) -> String {
        let node = self.index.node(key);
        format!("{} '{}' ({})", capitalize(key.level), node.name, node.id)
    }

    fn check_division_count(&self, out: &mut VecDeque<Observation>) {
        let Some(expected) = self.expected_divisions else {
            return;
        };
        let snapshot = self.index.snapshot();
        let found = snapshot.divisions.len();
        if found != expected {
            out.push_back(Observation {
                kind: DefectKind::DivisionCountMismatch,
                level: Level::Division,
                entity_id: TAXONOMY_ROOT.to_string(),
                related: snapshot.divisions.iter().map(|d| d.id.clone()).collect(),
                description: format!(
                    "Found {} divisions ({}); the target structure expects {}",
                    found,
                    snapshot
                        .divisions
                        .iter()
                        .map(|d| d.id.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                    expected
                ),
                category: None,
                subcategory: None,
                attached: 0,
            });
        }
    }

    /// All per-node checks for one node, in a fixed order.
    fn check_node(&self, key: NodeKey, out: &mut VecDeque<Observation>) {
        let index = self.index;
        let node = index.node(key);
        trace!(level = %key.level, entity_id = node.id, "Checking node");

        if key.level == Level::Category {
            let category = &index.snapshot().categories[key.index];
            match category.division_id.as_deref() {
                Some(division_id) if index.lookup(Level::Division, division_id).is_none() => {
                    let mut obs = self.observe(
                        DefectKind::DanglingReference,
                        key,
                        format!(
                            "{} names missing division '{}'",
                            self.describe(key),
                            division_id
                        ),
                    );
                    obs.related.push(division_id.to_string());
                    out.push_back(obs);
                }
                None if index.is_legacy(key.index) => {
                    let (providers, services) = index.subtree_attachments(key);
                    let attached = providers + services;
                    let mut description =
                        format!("{} is not assigned to any division", self.describe(key));
                    if attached > 0 {
                        description.push_str(&format!(
                            " ({} providers and {} services attached)",
                            providers, services
                        ));
                    }
                    let mut obs = self.observe(DefectKind::OrphanedCategory, key, description);
                    obs.attached = attached;
                    out.push_back(obs);
                }
                _ => {}
            }
        } else if let (Some(parent_level), Some(parent_id)) =
            (key.level.parent_level(), node.parent_id)
        {
            if index.lookup(parent_level, parent_id).is_none() {
                let mut obs = self.observe(
                    DefectKind::DanglingReference,
                    key,
                    format!(
                        "{} names missing {} '{}' as its parent",
                        self.describe(key),
                        parent_level,
                        parent_id
                    ),
                );
                obs.related.push(parent_id.to_string());
                out.push_back(obs);
            }
        }

        if self.duplicates.contains(&key) {
            out.push_back(self.observe(
                DefectKind::DuplicateName,
                key,
                format!(
                    "{} shares its name with a sibling {}",
                    self.describe(key),
                    key.level
                ),
            ));
        }

        for child_id in node.child_ids {
            match index.resolve_child(key.level, child_id) {
                None => {
                    let mut obs = self.observe(
                        DefectKind::DanglingReference,
                        key,
                        format!(
                            "{} lists missing child '{}'",
                            self.describe(key),
                            child_id
                        ),
                    );
                    obs.related.push(child_id.clone());
                    out.push_back(obs);
                }
                Some(child) => {
                    let child_node = index.node(child);
                    let belongs_elsewhere = child_node
                        .parent_id
                        .is_some_and(|parent_id| parent_id != node.id);
                    let wrong_level = Some(child.level) != key.level.child_level();
                    if belongs_elsewhere || wrong_level {
                        let reason = if wrong_level {
                            format!("is a {}, not a {}", child.level, child_level_name(key.level))
                        } else {
                            format!(
                                "names '{}' as its parent",
                                child_node.parent_id.unwrap_or_default()
                            )
                        };
                        let mut obs = self.observe(
                            DefectKind::ParentMismatch,
                            child,
                            format!(
                                "{} is listed under {} '{}' but {}",
                                self.describe(child),
                                key.level,
                                node.id,
                                reason
                            ),
                        );
                        obs.related.push(node.id.to_string());
                        out.push_back(obs);
                    }
                }
            }
        }

        let is_branch = matches!(
            key.level,
            Level::Category | Level::Subcategory | Level::Concept
        );
        if is_branch && index.children(key).is_empty() && index.attached_count(key) == 0 {
            out.push_back(self.observe(
                DefectKind::EmptyBranch,
                key,
                format!(
                    "{} has no children and no providers or services",
                    self.describe(key)
                ),
            ));
        }
    }

    /// Depth-first walk from `root` with an explicit stack. A child already
    /// on the current path closes a cycle: every member is reported and the
    /// walk does not descend through that edge.
    fn walk_cycles(
        &self,
        root: NodeKey,
        visited: &mut HashSet<NodeKey>,
        out: &mut VecDeque<Observation>,
    ) -> Result<()> {
        if !visited.insert(root) {
            return Ok(());
        }

        let mut path: Vec<(NodeKey, usize)> = vec![(root, 0)];
        let mut on_path: HashSet<NodeKey> = HashSet::from([root]);

        while let Some((key, next)) = path.last_mut() {
            let key = *key;
            let children = self.index.children(key);
            if *next >= children.len() {
                path.pop();
                on_path.remove(&key);
                continue;
            }
            let child = children[*next];
            *next += 1;

            if on_path.contains(&child) {
                let start = path
                    .iter()
                    .position(|(k, _)| *k == child)
                    .unwrap_or_default();
                let members: Vec<NodeKey> = path[start..].iter().map(|(k, _)| *k).collect();
                self.report_cycle(&members, out);
            } else if visited.insert(child) {
                self.cancel.check()?;
                on_path.insert(child);
                path.push((child, 0));
            }
        }
        Ok(())
    }

    fn report_cycle(&self, members: &[NodeKey], out: &mut VecDeque<Observation>) {
        let ids: Vec<String> = members
            .iter()
            .map(|&k| self.index.node(k).id.to_string())
            .collect();
        let mut chain = ids.clone();
        if let Some(first) = ids.first() {
            chain.push(first.clone());
        }
        let chain = chain.join(" → ");

        for &member in members {
            let mut obs = self.observe(
                DefectKind::CircularHierarchy,
                member,
                format!("{} is its own ancestor: {}", self.describe(member), chain),
            );
            obs.related = ids.clone();
            out.push_back(obs);
        }
    }

    fn check_node_ref(
        &self,
        level: Level,
        entity_id: &str,
        node_ref: &NodeRef,
        out: &mut VecDeque<Observation>,
    ) {
        if self.index.resolve_ref(node_ref).is_none() {
            out.push_back(Observation {
                kind: DefectKind::DanglingReference,
                level,
                entity_id: entity_id.to_string(),
                related: vec![node_ref.id.clone()],
                description: format!(
                    "{} '{}' references missing {}",
                    capitalize(level),
                    entity_id,
                    node_ref
                ),
                category: None,
                subcategory: None,
                attached: 0,
            });
        }
    }

    fn check_leakage(
        &self,
        level: Level,
        entity_id: &str,
        simulated: bool,
        node: Option<NodeKey>,
        out: &mut VecDeque<Observation>,
    ) {
        let Some(node) = node else {
            return;
        };
        let flagged = self.mix.get(&node).and_then(|m| m.flagged());
        if flagged == Some(simulated) {
            let (category, subcategory) = self.index.context(node);
            let side = if simulated { "Simulated" } else { "Production" };
            let others = if simulated { "production" } else { "simulated" };
            out.push_back(Observation {
                kind: DefectKind::SimulatedLeakage,
                level,
                entity_id: entity_id.to_string(),
                related: vec![self.index.node(node).id.to_string()],
                description: format!(
                    "{} {} '{}' is attached to {} among {} entries",
                    side,
                    level,
                    entity_id,
                    self.describe(node),
                    others
                ),
                category,
                subcategory,
                attached: 0,
            });
        }
    }

    fn check_provider(&self, position: usize, out: &mut VecDeque<Observation>) {
        let provider = &self.index.snapshot().providers[position];
        trace!(level = "provider", entity_id = %provider.id, "Checking provider");

        let node = provider.node.as_ref().and_then(|r| {
            self.check_node_ref(Level::Provider, &provider.id, r, out);
            self.index.resolve_ref(r)
        });

        for service_id in &provider.service_ids {
            if self.index.service_index(service_id).is_none() {
                out.push_back(Observation {
                    kind: DefectKind::DanglingReference,
                    level: Level::Provider,
                    entity_id: provider.id.clone(),
                    related: vec![service_id.clone()],
                    description: format!(
                        "Provider '{}' offers missing service '{}'",
                        provider.id, service_id
                    ),
                    category: None,
                    subcategory: None,
                    attached: 0,
                });
            }
        }

        self.check_leakage(Level::Provider, &provider.id, provider.is_simulated, node, out);
    }

    fn check_service(&self, position: usize, out: &mut VecDeque<Observation>) {
        let index = self.index;
        let service = &index.snapshot().services[position];
        trace!(level = "service", entity_id = %service.id, "Checking service");

        if let Some(node_ref) = &service.node {
            self.check_node_ref(Level::Service, &service.id, node_ref, out);
        }

        let provider = service.provider_id.as_deref().map(|id| (id, index.provider_index(id)));
        if let Some((provider_id, None)) = provider {
            out.push_back(Observation {
                kind: DefectKind::DanglingReference,
                level: Level::Service,
                entity_id: service.id.clone(),
                related: vec![provider_id.to_string()],
                description: format!(
                    "Service '{}' belongs to missing provider '{}'",
                    service.id, provider_id
                ),
                category: None,
                subcategory: None,
                attached: 0,
            });
        }

        let node = match &service.node {
            Some(node_ref) => index.resolve_ref(node_ref),
            None => provider
                .and_then(|(_, p)| p)
                .and_then(|p| index.snapshot().providers[p].node.as_ref())
                .and_then(|r| index.resolve_ref(r)),
        };
        self.check_leakage(Level::Service, &service.id, service.is_simulated, node, out);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Structure,
    Nodes(usize),
    Cycles(usize),
    Providers,
    Services,
    Done,
}

/// Lazy observation sequence produced by [`Scanner::scan`].
///
/// Yields `Err` once if the run is cancelled, then ends.
pub struct ScanIter<'s, 'i, 'a> {
    scanner: &'s Scanner<'i, 'a>,
    phase: Phase,
    cursor: usize,
    pending: VecDeque<Observation>,
    visited: HashSet<NodeKey>,
}

impl ScanIter<'_, '_, '_> {
    fn advance(&mut self, phase: Phase) {
        self.phase = phase;
        self.cursor = 0;
    }

    /// Process one entity (or move to the next phase).
    fn step(&mut self) -> Result<()> {
        let scanner = self.scanner;
        let snapshot = scanner.index.snapshot();
        match self.phase {
            Phase::Structure => {
                scanner.check_division_count(&mut self.pending);
                self.advance(Phase::Nodes(0));
            }
            Phase::Nodes(level_pos) => {
                let level = Level::NODES[level_pos];
                if self.cursor < snapshot.count(level) {
                    scanner.cancel.check()?;
                    scanner.check_node(NodeKey::new(level, self.cursor), &mut self.pending);
                    self.cursor += 1;
                } else if level_pos + 1 < Level::NODES.len() {
                    self.advance(Phase::Nodes(level_pos + 1));
                } else {
                    self.advance(Phase::Cycles(0));
                }
            }
            Phase::Cycles(level_pos) => {
                let level = Level::NODES[level_pos];
                if self.cursor < snapshot.count(level) {
                    scanner.cancel.check()?;
                    let root = NodeKey::new(level, self.cursor);
                    scanner.walk_cycles(root, &mut self.visited, &mut self.pending)?;
                    self.cursor += 1;
                } else if level_pos + 1 < Level::NODES.len() {
                    self.advance(Phase::Cycles(level_pos + 1));
                } else {
                    self.advance(Phase::Providers);
                }
            }
            Phase::Providers => {
                if self.cursor < snapshot.providers.len() {
                    scanner.cancel.check()?;
                    scanner.check_provider(self.cursor, &mut self.pending);
                    self.cursor += 1;
                } else {
                    self.advance(Phase::Services);
                }
            }
            Phase::Services => {
                if self.cursor < snapshot.services.len() {
                    scanner.cancel.check()?;
                    scanner.check_service(self.cursor, &mut self.pending);
                    self.cursor += 1;
                } else {
                    self.advance(Phase::Done);
                }
            }
            Phase::Done => {}
        }
        Ok(())
    }
}

impl Iterator for ScanIter<'_, '_, '_> {
    type Item = Result<Observation>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(observation) = self.pending.pop_front() {
                return Some(Ok(observation));
            }
            if self.phase == Phase::Done {
                return None;
            }
            if let Err(e) = self.step() {
                self.pending.clear();
                self.phase = Phase::Done;
                return Some(Err(e));
            }
        }
    }
}

fn capitalize(level: Level) -> String {
    let name = level.to_string();
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => name,
    }
}

fn child_level_name(level: Level) -> String {
    level
        .child_level()
        .map(|l| l.to_string())
        .unwrap_or_else(|| "leaf".to_string())
}
