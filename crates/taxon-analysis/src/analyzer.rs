//! Analysis entry point.
//!
//! Runs the pipeline over one snapshot: index, scan, classify, optionally
//! recommend, and assemble the report. Only an invalid primary snapshot or
//! an interrupted run is an error; a failing recommendation stage degrades
//! to a note in the report.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use taxon_core::{AnalysisConfig, Result, SystemReport, TaxonomySnapshot};

use crate::cancel::CancellationToken;
use crate::classifier::{compute_stats, Classifier};
use crate::index::TaxonomyIndex;
use crate::recommender::Recommender;
use crate::report::{current_structure, ReportBuilder};
use crate::scanner::Scanner;

/// Note carried when migration mode runs without a target taxonomy.
pub const MISSING_TARGET_NOTE: &str =
    "Migration mode requested without a target taxonomy; no mappings were produced.";

/// What a run is for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    /// Integrity issues only.
    #[default]
    Audit,
    /// Integrity issues plus category-to-division mappings.
    Migration,
}

impl std::fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Audit => write!(f, "audit"),
            Self::Migration => write!(f, "migration"),
        }
    }
}

impl std::str::FromStr for AnalysisMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "audit" => Ok(Self::Audit),
            "migration" | "migrate" => Ok(Self::Migration),
            _ => Err(format!("Invalid analysis mode: {}", s)),
        }
    }
}

/// Taxonomy integrity analyzer.
///
/// Stateless between runs: the same snapshot, mode, and capture time always
/// produce the same report.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: AnalysisConfig,
    cancel: CancellationToken,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze `snapshot`, stamping the report with the current time.
    pub fn analyze(
        &self,
        snapshot: &TaxonomySnapshot,
        target: Option<&TaxonomySnapshot>,
        mode: AnalysisMode,
    ) -> Result<SystemReport> {
        self.analyze_at(snapshot, target, mode, Utc::now())
    }

    /// Analyze `snapshot` with an explicit capture time.
    #[instrument(
        skip_all,
        fields(component = "analyzer", op = "analyze", mode = %mode)
    )]
    pub fn analyze_at(
        &self,
        snapshot: &TaxonomySnapshot,
        target: Option<&TaxonomySnapshot>,
        mode: AnalysisMode,
        captured_at: DateTime<Utc>,
    ) -> Result<SystemReport> {
        let start = Instant::now();
        let index = TaxonomyIndex::build(snapshot)?;
        self.cancel.check()?;

        let mut builder = ReportBuilder::new(captured_at)
            .structure(current_structure(&index))
            .stats(compute_stats(snapshot));

        // A usable target is only indexed in migration mode.
        let target_index = match (mode, target) {
            (AnalysisMode::Migration, Some(target)) => match TaxonomyIndex::build(target) {
                Ok(target_index) => Some(target_index),
                Err(e) => {
                    warn!(error = %e, "Target taxonomy rejected, skipping recommendations");
                    builder = builder.note(format!(
                        "Target taxonomy was rejected ({}); no mappings were produced.",
                        e
                    ));
                    None
                }
            },
            (AnalysisMode::Migration, None) => {
                warn!("Migration mode without a target taxonomy, skipping recommendations");
                builder = builder.note(MISSING_TARGET_NOTE);
                None
            }
            (AnalysisMode::Audit, target) => {
                if target.is_some() {
                    debug!("Target taxonomy ignored in audit mode");
                }
                None
            }
        };

        let expected_divisions = self
            .config
            .expected_divisions
            .or_else(|| target_index.as_ref().map(|t| t.snapshot().divisions.len()));
        debug!(
            expected_divisions = ?expected_divisions,
            max_affected_items = self.config.max_affected_items,
            group_by_category = self.config.group_by_category,
            "Scanning snapshot"
        );

        let scanner = Scanner::new(&index)
            .with_expected_divisions(expected_divisions)
            .with_cancellation(self.cancel.clone());
        let issues = Classifier::new(&self.config).classify(scanner.scan())?;
        let issue_count = issues.len();
        builder = builder.issues(issues);

        let mut mapping_count = 0;
        if let Some(target_index) = &target_index {
            let mappings = Recommender::new(self.config.recommender.clone())
                .with_cancellation(self.cancel.clone())
                .recommend(&index, target_index)?;
            mapping_count = mappings.len();
            builder = builder.mappings(mappings);
        }

        let report = builder.build();
        info!(
            issue_count,
            mapping_count,
            duration_ms = start.elapsed().as_millis() as u64,
            "Analysis complete"
        );
        Ok(report)
    }
}
