//! # taxon-analysis
//!
//! Taxonomy integrity analysis: consistency scanning, issue classification,
//! category-to-division mapping recommendations, and report assembly.
//!
//! ```no_run
//! use taxon_analysis::{AnalysisMode, Analyzer};
//! use taxon_core::{AnalysisConfig, TaxonomySnapshot};
//!
//! # fn main() -> taxon_core::Result<()> {
//! let snapshot = TaxonomySnapshot::from_json(r#"{"categories": []}"#)?;
//! let report = Analyzer::new(AnalysisConfig::default())
//!     .analyze(&snapshot, None, AnalysisMode::Audit)?;
//! println!("{}", report.to_json_pretty()?);
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod cancel;
pub mod classifier;
pub mod index;
pub mod recommender;
pub mod report;
pub mod scanner;
pub mod similarity;

pub use analyzer::{AnalysisMode, Analyzer};
pub use cancel::CancellationToken;
pub use classifier::{compute_stats, severity_of, Classifier};
pub use index::{NodeKey, TaxonomyIndex};
pub use recommender::Recommender;
pub use report::{current_structure, ReportBuilder};
pub use scanner::{Observation, Scanner};
