//! Test fixtures for analysis integration tests.
//!
//! A small, fully consistent marketplace taxonomy plus a target structure
//! for migration runs. Tests mutate copies to introduce specific defects.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use taxon_core::{Category, Division, Level, NodeRef, Provider, TaxonomySnapshot};

/// Two divisions, three categories, every branch populated.
pub const MARKETPLACE: &str = r#"{
  "divisions": [
    {"id": "d-celebrations", "name": "Celebrations", "categoryIds": ["c-weddings", "c-parties"]},
    {"id": "d-places", "name": "Places", "categoryIds": ["c-halls"]}
  ],
  "categories": [
    {"id": "c-weddings", "name": "Weddings", "divisionId": "d-celebrations", "subcategoryIds": ["s-photo"]},
    {"id": "c-parties", "name": "Parties", "divisionId": "d-celebrations", "subcategoryIds": ["s-dj"]},
    {"id": "c-halls", "name": "אולמות", "language": "he", "divisionId": "d-places", "subcategoryIds": ["s-garden"]}
  ],
  "subcategories": [
    {"id": "s-photo", "name": "Photography", "parentId": "c-weddings", "childIds": ["k-drone"]},
    {"id": "s-dj", "name": "DJs", "parentId": "c-parties"},
    {"id": "s-garden", "name": "Garden Halls", "parentId": "c-halls"}
  ],
  "concepts": [
    {"id": "k-drone", "name": "Drone Photography", "parentId": "s-photo"}
  ],
  "providers": [
    {"id": "p-lens", "serviceIds": ["v-album"], "node": {"level": "concept", "id": "k-drone"}},
    {"id": "p-beats", "node": {"level": "subcategory", "id": "s-dj"}},
    {"id": "p-rose", "node": {"level": "subcategory", "id": "s-garden"}}
  ],
  "services": [
    {"id": "v-album", "providerId": "p-lens"}
  ]
}"#;

/// Target structure for migration runs.
pub const TARGET: &str = r#"{
  "divisions": [
    {"id": "t-food", "name": "Food & Drink", "aliases": ["Catering"]},
    {"id": "t-venues", "name": "Venues"}
  ]
}"#;

pub fn marketplace() -> TaxonomySnapshot {
    TaxonomySnapshot::from_json(MARKETPLACE).expect("marketplace fixture parses")
}

pub fn target() -> TaxonomySnapshot {
    TaxonomySnapshot::from_json(TARGET).expect("target fixture parses")
}

pub fn captured_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 4, 8, 0, 0).unwrap()
}

/// Category assigned to `division`, with no children.
pub fn category_in(id: &str, name: &str, division: &str) -> Category {
    Category {
        id: id.to_string(),
        name: name.to_string(),
        division_id: Some(division.to_string()),
        ..Default::default()
    }
}

/// Legacy flat category.
pub fn legacy_category(id: &str, name: &str) -> Category {
    Category {
        id: id.to_string(),
        name: name.to_string(),
        language: Some("he".to_string()),
        ..Default::default()
    }
}

pub fn provider_at(id: &str, level: Level, node: &str) -> Provider {
    Provider {
        id: id.to_string(),
        node: Some(NodeRef::new(level, node)),
        ..Default::default()
    }
}

pub fn division(id: &str, name: &str) -> Division {
    Division {
        id: id.to_string(),
        name: name.to_string(),
        ..Default::default()
    }
}
