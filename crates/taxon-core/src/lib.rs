//! # taxon-core
//!
//! Core types for the taxonomy integrity engine: the snapshot data model,
//! the report and issue types, configuration, and the shared error type.
//!
//! This crate holds no analysis logic; see `taxon-analysis`.

pub mod config;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod report;
pub mod schema;

// Re-export commonly used types at crate root
pub use config::{AnalysisConfig, ConfigError, RecommenderConfig};
pub use error::{Error, Result};
pub use models::*;
pub use report::*;
