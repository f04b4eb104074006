//! Taxonomy snapshot data model.
//!
//! A snapshot is the already-materialized state of the marketplace taxonomy:
//! five node levels (divisions, categories, subcategories, concepts,
//! subconcepts) plus the providers and services attached to them. Each level
//! has its own type so level-specific fields survive ingestion; cross-entity
//! links are plain ids, validated later by the analysis index.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// =============================================================================
// LEVELS
// =============================================================================

/// Every kind of entity that can appear in a snapshot.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Division,
    Category,
    Subcategory,
    Concept,
    Subconcept,
    Provider,
    Service,
}

impl Level {
    /// Node levels in hierarchy order, top first.
    pub const NODES: [Level; 5] = [
        Level::Division,
        Level::Category,
        Level::Subcategory,
        Level::Concept,
        Level::Subconcept,
    ];

    /// The level whose ids appear in this level's child list.
    pub fn child_level(self) -> Option<Level> {
        match self {
            Self::Division => Some(Self::Category),
            Self::Category => Some(Self::Subcategory),
            Self::Subcategory => Some(Self::Concept),
            Self::Concept => Some(Self::Subconcept),
            Self::Subconcept | Self::Provider | Self::Service => None,
        }
    }

    /// The level a node of this level names as its parent.
    pub fn parent_level(self) -> Option<Level> {
        match self {
            Self::Category => Some(Self::Division),
            Self::Subcategory => Some(Self::Category),
            Self::Concept => Some(Self::Subcategory),
            Self::Subconcept => Some(Self::Concept),
            Self::Division | Self::Provider | Self::Service => None,
        }
    }

    /// Whether this is a hierarchy node level (as opposed to an attachment).
    pub fn is_node(self) -> bool {
        !matches!(self, Self::Provider | Self::Service)
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Division => write!(f, "division"),
            Self::Category => write!(f, "category"),
            Self::Subcategory => write!(f, "subcategory"),
            Self::Concept => write!(f, "concept"),
            Self::Subconcept => write!(f, "subconcept"),
            Self::Provider => write!(f, "provider"),
            Self::Service => write!(f, "service"),
        }
    }
}

impl std::str::FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "division" => Ok(Self::Division),
            "category" => Ok(Self::Category),
            "subcategory" => Ok(Self::Subcategory),
            "concept" => Ok(Self::Concept),
            "subconcept" => Ok(Self::Subconcept),
            "provider" => Ok(Self::Provider),
            "service" => Ok(Self::Service),
            _ => Err(format!("Invalid taxonomy level: {}", s)),
        }
    }
}

/// Level-tagged reference from a provider or service to a taxonomy node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct NodeRef {
    pub level: Level,
    pub id: String,
}

impl NodeRef {
    pub fn new(level: Level, id: impl Into<String>) -> Self {
        Self {
            level,
            id: id.into(),
        }
    }
}

impl std::fmt::Display for NodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} '{}'", self.level, self.id)
    }
}

// =============================================================================
// HIERARCHY NODES
// =============================================================================

/// Top-level grouping of the target taxonomy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Division {
    pub id: String,
    pub name: String,
    /// Alternative names matched by the mapping recommender.
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub category_ids: Vec<String>,
}

/// Second level. A category without a division is a legacy flat category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    /// Language tag of `name` (e.g. "he", "en").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub division_id: Option<String>,
    #[serde(default)]
    pub subcategory_ids: Vec<String>,
    /// Legacy grouping this category came from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_group: Option<String>,
}

/// Read access shared by the levels below categories.
pub trait Branch {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn parent_id(&self) -> Option<&str>;
    fn child_ids(&self) -> &[String];
}

macro_rules! branch_level {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
        #[serde(rename_all = "camelCase")]
        pub struct $name {
            pub id: String,
            pub name: String,
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub parent_id: Option<String>,
            #[serde(default)]
            pub child_ids: Vec<String>,
        }

        impl $name {
            pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
                Self {
                    id: id.into(),
                    name: name.into(),
                    ..Default::default()
                }
            }

            pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
                self.parent_id = Some(parent_id.into());
                self
            }
        }

        impl Branch for $name {
            fn id(&self) -> &str {
                &self.id
            }

            fn name(&self) -> &str {
                &self.name
            }

            fn parent_id(&self) -> Option<&str> {
                self.parent_id.as_deref()
            }

            fn child_ids(&self) -> &[String] {
                &self.child_ids
            }
        }
    };
}

branch_level!(
    /// Third level, under a category.
    Subcategory
);
branch_level!(
    /// Fourth level, under a subcategory.
    Concept
);
branch_level!(
    /// Leaf level, under a concept.
    Subconcept
);

// =============================================================================
// ATTACHMENTS
// =============================================================================

/// A marketplace provider classified under a taxonomy node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub id: String,
    #[serde(default)]
    pub is_simulated: bool,
    #[serde(default)]
    pub service_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeRef>,
}

/// A service offered by a provider, classified under a taxonomy node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    #[serde(default)]
    pub is_simulated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeRef>,
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Immutable view of the taxonomy handed to the engine by an external loader.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaxonomySnapshot {
    #[serde(default)]
    pub divisions: Vec<Division>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub subcategories: Vec<Subcategory>,
    #[serde(default)]
    pub concepts: Vec<Concept>,
    #[serde(default)]
    pub subconcepts: Vec<Subconcept>,
    #[serde(default)]
    pub providers: Vec<Provider>,
    #[serde(default)]
    pub services: Vec<Service>,
}

impl TaxonomySnapshot {
    /// Parse a snapshot from JSON text.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// One entity of a level below categories.
    pub fn branch(&self, level: Level, index: usize) -> Option<&dyn Branch> {
        match level {
            Level::Subcategory => self.subcategories.get(index).map(|b| b as &dyn Branch),
            Level::Concept => self.concepts.get(index).map(|b| b as &dyn Branch),
            Level::Subconcept => self.subconcepts.get(index).map(|b| b as &dyn Branch),
            _ => None,
        }
    }

    /// All entities of a level below categories, in snapshot order.
    pub fn branches(&self, level: Level) -> Vec<&dyn Branch> {
        (0..self.count(level))
            .map_while(|index| self.branch(level, index))
            .collect()
    }

    /// Number of entities of the given level.
    pub fn count(&self, level: Level) -> usize {
        match level {
            Level::Division => self.divisions.len(),
            Level::Category => self.categories.len(),
            Level::Subcategory => self.subcategories.len(),
            Level::Concept => self.concepts.len(),
            Level::Subconcept => self.subconcepts.len(),
            Level::Provider => self.providers.len(),
            Level::Service => self.services.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_serialization() {
        let levels = vec![
            (Level::Division, "division"),
            (Level::Category, "category"),
            (Level::Subcategory, "subcategory"),
            (Level::Concept, "concept"),
            (Level::Subconcept, "subconcept"),
            (Level::Provider, "provider"),
            (Level::Service, "service"),
        ];

        for (level, expected) in levels {
            let json = serde_json::to_string(&level).unwrap();
            assert_eq!(json, format!("\"{}\"", expected));
            assert_eq!(level.to_string(), expected);
            assert_eq!(expected.parse::<Level>().unwrap(), level);
        }
    }

    #[test]
    fn test_level_parsing_rejects_unknown() {
        assert!("division ".parse::<Level>().is_err());
        assert!("tag".parse::<Level>().is_err());
    }

    #[test]
    fn test_level_navigation() {
        assert_eq!(Level::Division.child_level(), Some(Level::Category));
        assert_eq!(Level::Concept.child_level(), Some(Level::Subconcept));
        assert_eq!(Level::Subconcept.child_level(), None);
        assert_eq!(Level::Subcategory.parent_level(), Some(Level::Category));
        assert_eq!(Level::Division.parent_level(), None);
        assert!(!Level::Provider.is_node());
        assert!(Level::Subconcept.is_node());
    }

    #[test]
    fn test_snapshot_from_camel_case_json() {
        let json = r#"{
            "divisions": [{"id": "d1", "name": "Food & Drink", "aliases": ["Catering"], "categoryIds": ["c1"]}],
            "categories": [{"id": "c1", "name": "אירועים", "language": "he", "divisionId": "d1"}],
            "subcategories": [{"id": "s1", "name": "Weddings", "parentId": "c1"}],
            "providers": [{"id": "p1", "isSimulated": true, "node": {"level": "subcategory", "id": "s1"}}],
            "services": [{"id": "v1", "providerId": "p1"}]
        }"#;

        let snapshot = TaxonomySnapshot::from_json(json).unwrap();

        assert_eq!(snapshot.divisions[0].aliases, vec!["Catering".to_string()]);
        assert_eq!(snapshot.categories[0].division_id.as_deref(), Some("d1"));
        assert_eq!(snapshot.subcategories[0].parent_id.as_deref(), Some("c1"));
        assert!(snapshot.concepts.is_empty());
        assert!(snapshot.providers[0].is_simulated);
        assert_eq!(
            snapshot.providers[0].node,
            Some(NodeRef::new(Level::Subcategory, "s1"))
        );
        assert!(!snapshot.services[0].is_simulated);
        assert_eq!(snapshot.count(Level::Service), 1);
    }

    #[test]
    fn test_snapshot_rejects_malformed_json() {
        let err = TaxonomySnapshot::from_json(r#"{"divisions": [{"name": "x"}]}"#).unwrap_err();
        assert!(err.to_string().contains("Serialization error"));
    }

    #[test]
    fn test_branches_by_level() {
        let snapshot = TaxonomySnapshot {
            concepts: vec![Concept::new("k1", "Jazz").with_parent("s1")],
            ..Default::default()
        };
        let concepts = snapshot.branches(Level::Concept);
        assert_eq!(concepts.len(), 1);
        assert_eq!(concepts[0].id(), "k1");
        assert_eq!(concepts[0].parent_id(), Some("s1"));
        assert!(snapshot.branches(Level::Subcategory).is_empty());
        assert!(snapshot.branches(Level::Provider).is_empty());
        assert!(snapshot.branch(Level::Concept, 1).is_none());
    }
}
