//! Validated arena over a taxonomy snapshot.
//!
//! Every node is addressed by a [`NodeKey`] (level + position in that level's
//! slice). Child lists and parent ids from the snapshot are resolved once,
//! here; all traversal downstream works on keys and explicit visited sets, so
//! cyclic or duplicated references cannot cause unbounded recursion.

use std::collections::{HashMap, HashSet};

use taxon_core::{Error, Level, NodeRef, Result, TaxonomySnapshot};

/// Arena address of a hierarchy node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey {
    pub level: Level,
    pub index: usize,
}

impl NodeKey {
    pub fn new(level: Level, index: usize) -> Self {
        Self { level, index }
    }
}

/// Uniform read-only view of one node, whatever its level.
#[derive(Debug, Clone, Copy)]
pub struct NodeView<'a> {
    pub key: NodeKey,
    pub id: &'a str,
    pub name: &'a str,
    /// Parent id as declared by the node itself.
    pub parent_id: Option<&'a str>,
    /// Child ids as declared by the node itself.
    pub child_ids: &'a [String],
}

/// Providers and services attached directly to one node (snapshot positions).
#[derive(Debug, Clone, Default)]
pub struct Attachments {
    pub providers: Vec<usize>,
    pub services: Vec<usize>,
}

impl Attachments {
    pub fn len(&self) -> usize {
        self.providers.len() + self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty() && self.services.is_empty()
    }
}

/// Validated, indexed snapshot.
pub struct TaxonomyIndex<'a> {
    snapshot: &'a TaxonomySnapshot,
    ids: HashMap<Level, HashMap<&'a str, usize>>,
    children: HashMap<NodeKey, Vec<NodeKey>>,
    listed_by: HashMap<NodeKey, NodeKey>,
    attachments: HashMap<NodeKey, Attachments>,
}

impl<'a> TaxonomyIndex<'a> {
    /// Validate and index a snapshot.
    ///
    /// Fails on empty ids and on ids repeated within a level; nothing else in
    /// the snapshot is fatal.
    pub fn build(snapshot: &'a TaxonomySnapshot) -> Result<Self> {
        let mut ids = HashMap::new();
        ids.insert(
            Level::Division,
            index_ids(Level::Division, snapshot.divisions.iter().map(|d| d.id.as_str()))?,
        );
        ids.insert(
            Level::Category,
            index_ids(Level::Category, snapshot.categories.iter().map(|c| c.id.as_str()))?,
        );
        for level in [Level::Subcategory, Level::Concept, Level::Subconcept] {
            ids.insert(
                level,
                index_ids(level, snapshot.branches(level).into_iter().map(|b| b.id()))?,
            );
        }
        ids.insert(
            Level::Provider,
            index_ids(Level::Provider, snapshot.providers.iter().map(|p| p.id.as_str()))?,
        );
        ids.insert(
            Level::Service,
            index_ids(Level::Service, snapshot.services.iter().map(|s| s.id.as_str()))?,
        );

        let mut index = Self {
            snapshot,
            ids,
            children: HashMap::new(),
            listed_by: HashMap::new(),
            attachments: HashMap::new(),
        };
        index.link_children();
        index.link_attachments();
        Ok(index)
    }

    /// Children come from two sources: the parent's own child list, and
    /// nodes naming the parent in their parent id. Listed children keep
    /// their declared order; inferred ones follow in snapshot order.
    fn link_children(&mut self) {
        let mut seen: HashSet<(NodeKey, NodeKey)> = HashSet::new();

        for level in Level::NODES {
            for position in 0..self.snapshot.count(level) {
                let parent = NodeKey::new(level, position);
                let view = self.node(parent);
                for child_id in view.child_ids {
                    if let Some(child) = self.resolve_child(level, child_id) {
                        if seen.insert((parent, child)) {
                            self.children.entry(parent).or_default().push(child);
                        }
                        self.listed_by.entry(child).or_insert(parent);
                    }
                }
            }
        }

        for level in Level::NODES {
            for position in 0..self.snapshot.count(level) {
                let child = NodeKey::new(level, position);
                if let Some(parent) = self.declared_parent(child) {
                    if seen.insert((parent, child)) {
                        self.children.entry(parent).or_default().push(child);
                    }
                }
            }
        }
    }

    /// A service without its own node inherits its provider's node.
    fn link_attachments(&mut self) {
        let snapshot = self.snapshot;
        for (position, provider) in snapshot.providers.iter().enumerate() {
            if let Some(node) = provider.node.as_ref().and_then(|r| self.resolve_ref(r)) {
                self.attachments.entry(node).or_default().providers.push(position);
            }
        }

        for (position, service) in snapshot.services.iter().enumerate() {
            let node = match &service.node {
                Some(node_ref) => self.resolve_ref(node_ref),
                None => service
                    .provider_id
                    .as_deref()
                    .and_then(|id| self.provider_index(id))
                    .and_then(|p| snapshot.providers[p].node.as_ref())
                    .and_then(|r| self.resolve_ref(r)),
            };
            if let Some(node) = node {
                self.attachments.entry(node).or_default().services.push(position);
            }
        }
    }

    pub fn snapshot(&self) -> &'a TaxonomySnapshot {
        self.snapshot
    }

    /// Position of an entity id within its level.
    pub fn position(&self, level: Level, id: &str) -> Option<usize> {
        self.ids.get(&level).and_then(|m| m.get(id)).copied()
    }

    pub fn lookup(&self, level: Level, id: &str) -> Option<NodeKey> {
        if !level.is_node() {
            return None;
        }
        self.position(level, id).map(|index| NodeKey::new(level, index))
    }

    pub fn provider_index(&self, id: &str) -> Option<usize> {
        self.position(Level::Provider, id)
    }

    pub fn service_index(&self, id: &str) -> Option<usize> {
        self.position(Level::Service, id)
    }

    pub fn node(&self, key: NodeKey) -> NodeView<'a> {
        let snapshot = self.snapshot;
        match key.level {
            Level::Division => {
                let d = &snapshot.divisions[key.index];
                NodeView {
                    key,
                    id: &d.id,
                    name: &d.name,
                    parent_id: None,
                    child_ids: &d.category_ids,
                }
            }
            Level::Category => {
                let c = &snapshot.categories[key.index];
                NodeView {
                    key,
                    id: &c.id,
                    name: &c.name,
                    parent_id: c.division_id.as_deref(),
                    child_ids: &c.subcategory_ids,
                }
            }
            level => match snapshot.branch(level, key.index) {
                Some(b) => NodeView {
                    key,
                    id: b.id(),
                    name: b.name(),
                    parent_id: b.parent_id(),
                    child_ids: b.child_ids(),
                },
                // Providers and services are never hierarchy nodes.
                None => NodeView {
                    key,
                    id: "",
                    name: "",
                    parent_id: None,
                    child_ids: &[],
                },
            },
        }
    }

    /// All nodes of one level in snapshot order.
    pub fn nodes(&self, level: Level) -> impl Iterator<Item = NodeView<'a>> + '_ {
        let count = if level.is_node() {
            self.snapshot.count(level)
        } else {
            0
        };
        (0..count).map(move |index| self.node(NodeKey::new(level, index)))
    }

    /// Resolve a child id listed by a node of `parent_level`.
    ///
    /// The expected child level wins; otherwise the id is looked up across
    /// all node levels, top first.
    pub fn resolve_child(&self, parent_level: Level, id: &str) -> Option<NodeKey> {
        if let Some(key) = parent_level
            .child_level()
            .and_then(|level| self.lookup(level, id))
        {
            return Some(key);
        }
        Level::NODES
            .iter()
            .find_map(|&level| self.lookup(level, id))
    }

    pub fn resolve_ref(&self, node_ref: &NodeRef) -> Option<NodeKey> {
        self.lookup(node_ref.level, &node_ref.id)
    }

    /// Parent named by the node's own parent id, resolved at the parent level.
    pub fn declared_parent(&self, key: NodeKey) -> Option<NodeKey> {
        let parent_level = key.level.parent_level()?;
        let parent_id = self.node(key).parent_id?;
        self.lookup(parent_level, parent_id)
    }

    /// First node whose child list names this node.
    pub fn listed_by(&self, key: NodeKey) -> Option<NodeKey> {
        self.listed_by.get(&key).copied()
    }

    /// Declared parent, falling back to the first listing parent.
    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.declared_parent(key).or_else(|| self.listed_by(key))
    }

    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.children.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn attachments(&self, key: NodeKey) -> Option<&Attachments> {
        self.attachments.get(&key)
    }

    pub fn attached_count(&self, key: NodeKey) -> usize {
        self.attachments(key).map(Attachments::len).unwrap_or(0)
    }

    /// Division a category effectively belongs to.
    pub fn category_division(&self, category: usize) -> Option<usize> {
        let key = NodeKey::new(Level::Category, category);
        self.parent(key)
            .filter(|p| p.level == Level::Division)
            .map(|p| p.index)
    }

    /// Legacy flat category: no division id and no division listing it.
    pub fn is_legacy(&self, category: usize) -> bool {
        self.snapshot.categories[category].division_id.is_none()
            && self.category_division(category).is_none()
    }

    /// Every node reachable from `root`, root first, each at most once.
    pub fn subtree(&self, root: NodeKey) -> Vec<NodeKey> {
        let mut visited = HashSet::from([root]);
        let mut order = vec![root];
        let mut stack = vec![root];

        while let Some(key) = stack.pop() {
            for &child in self.children(key).iter().rev() {
                if visited.insert(child) {
                    order.push(child);
                    stack.push(child);
                }
            }
        }
        order
    }

    /// Distinct providers and services attached anywhere in the subtree.
    pub fn subtree_attachments(&self, root: NodeKey) -> (usize, usize) {
        let mut providers = HashSet::new();
        let mut services = HashSet::new();
        for key in self.subtree(root) {
            if let Some(attached) = self.attachments(key) {
                providers.extend(attached.providers.iter().copied());
                services.extend(attached.services.iter().copied());
            }
        }
        (providers.len(), services.len())
    }

    /// Names of the enclosing category and subcategory, if any.
    pub fn context(&self, key: NodeKey) -> (Option<String>, Option<String>) {
        let mut category = None;
        let mut subcategory = None;
        let mut visited = HashSet::new();
        let mut current = Some(key);

        while let Some(k) = current {
            if !visited.insert(k) {
                break;
            }
            match k.level {
                Level::Category if category.is_none() => {
                    category = Some(self.node(k).name.to_string());
                }
                Level::Subcategory if subcategory.is_none() => {
                    subcategory = Some(self.node(k).name.to_string());
                }
                _ => {}
            }
            current = self.parent(k);
        }
        (category, subcategory)
    }
}

fn index_ids<'a>(
    level: Level,
    ids: impl Iterator<Item = &'a str>,
) -> Result<HashMap<&'a str, usize>> {
    let mut map = HashMap::new();
    for (position, id) in ids.enumerate() {
        if id.trim().is_empty() {
            return Err(Error::MissingId { level, position });
        }
        if map.insert(id, position).is_some() {
            return Err(Error::DuplicateId {
                level,
                id: id.to_string(),
            });
        }
    }
    Ok(map)
}
