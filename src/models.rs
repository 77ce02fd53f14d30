//! Data models for the statistics collector.
//!
//! This module contains the core data structures used throughout the
//! application: the closed set of known metric files, the tables read from
//! them, and the correlation results written to the reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A known metric result file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    /// Reference metric every other metric is correlated against
    Tpl,
    Mig,
    Dci,
    /// FactorVAE metric
    Fvm,
    /// BetaVAE metric
    Bvm,
}

impl MetricKind {
    /// Metrics correlated against the reference, in report column order.
    pub const OTHERS: [MetricKind; 4] = [
        MetricKind::Mig,
        MetricKind::Dci,
        MetricKind::Fvm,
        MetricKind::Bvm,
    ];

    /// Column of the reference file holding the active dimension count.
    pub const ACTIVE_DIMS_COLUMN: &'static str = "n_active_dims.mean";

    /// File name of the collected results inside a model directory.
    pub const fn file_name(&self) -> &'static str {
        match self {
            MetricKind::Tpl => "collected-tpl-mean.csv",
            MetricKind::Mig => "collected-mig-mean.csv",
            MetricKind::Dci => "collected-dci-mean.csv",
            MetricKind::Fvm => "collected-factor_vae_metric-mean.csv",
            MetricKind::Bvm => "collected-beta_vae_sklearn-mean.csv",
        }
    }

    /// Column holding the metric value.
    pub const fn value_column(&self) -> &'static str {
        match self {
            MetricKind::Tpl => "avg_tpl.mean",
            MetricKind::Mig => "discrete_mig.mean",
            MetricKind::Dci => "disentanglement.mean",
            MetricKind::Fvm | MetricKind::Bvm => "eval_accuracy.mean",
        }
    }

    /// Short code used in report file names and table headers.
    pub const fn code(&self) -> &'static str {
        match self {
            MetricKind::Tpl => "TPL",
            MetricKind::Mig => "MIG",
            MetricKind::Dci => "DCI",
            MetricKind::Fvm => "FVM",
            MetricKind::Bvm => "BVM",
        }
    }

    /// Look up a non-reference metric by its file name.
    pub fn other_from_file_name(name: &str) -> Option<MetricKind> {
        Self::OTHERS.into_iter().find(|kind| kind.file_name() == name)
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Correlation function used to compare the reference with other metrics.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum CorrelationType {
    /// Spearman rank correlation (default)
    #[default]
    #[value(name = "Spearman")]
    Spearman,
    /// Coefficient of a single-feature Lasso regression
    #[value(name = "Lasso")]
    Lasso,
}

impl fmt::Display for CorrelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrelationType::Spearman => write!(f, "Spearman"),
            CorrelationType::Lasso => write!(f, "Lasso"),
        }
    }
}

/// How the expected metric set is established across model directories.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaPolicy {
    /// Locate metrics in every directory and require identical sets
    #[default]
    Strict,
    /// Use the metric set of the first directory for all of them
    FirstDir,
}

/// A model result directory and its display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelDir {
    pub path: PathBuf,
    pub name: String,
}

/// Value column of a non-reference metric file.
#[derive(Debug, Clone)]
pub struct MetricTable {
    pub kind: MetricKind,
    pub path: PathBuf,
    pub values: Vec<f64>,
}

/// Reference metric values paired with the active dimension count per row.
#[derive(Debug, Clone)]
pub struct ReferenceTable {
    pub path: PathBuf,
    pub values: Vec<f64>,
    pub active_dims: Vec<f64>,
}

impl ReferenceTable {
    /// Number of samples (rows).
    pub fn len(&self) -> usize {
        self.values.len()
    }
}

/// Result of correlating one activation dimension subgroup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DimOutcome {
    Scored { score: f64 },
    /// The correlator could not fit this subgroup.
    Unfit { reason: String },
}

impl DimOutcome {
    /// Score, if the subgroup could be fitted.
    pub fn score(&self) -> Option<f64> {
        match self {
            DimOutcome::Scored { score } => Some(*score),
            DimOutcome::Unfit { .. } => None,
        }
    }
}

/// Per-dimension correlation score with its sample count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimScore {
    pub dim: f64,
    pub n_samples: usize,
    #[serde(flatten)]
    pub outcome: DimOutcome,
}

impl DimScore {
    /// Render the dimension value for file names, e.g. `2.0` or `2.5`.
    pub fn dim_label(&self) -> String {
        format_dim(self.dim)
    }
}

/// Format an activation dimension value.
pub fn format_dim(dim: f64) -> String {
    format_float(dim)
}

/// Shortest round-trip rendering of a float in the form the result files
/// already use: integral values keep `.0`, and exponents carry a sign and at
/// least two digits (`1e-07`, `1.5e+16`).
pub fn format_float(value: f64) -> String {
    let repr = format!("{:?}", value);
    match repr.split_once('e') {
        Some((mantissa, exponent)) => match exponent.parse::<i32>() {
            Ok(exp) => {
                let sign = if exp < 0 { '-' } else { '+' };
                format!("{}e{}{:02}", mantissa, sign, exp.unsigned_abs())
            }
            Err(_) => repr,
        },
        None => repr,
    }
}

/// Correlation results of the reference against one other metric.
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationReport {
    pub metric: MetricKind,
    pub overall: f64,
    pub per_dim: Vec<DimScore>,
    pub ranked: f64,
    /// Number of samples in the ranked subset.
    pub ranked_samples: usize,
}

/// All correlation results for one model directory.
#[derive(Debug, Clone, Serialize)]
pub struct ModelReport {
    pub name: String,
    pub path: PathBuf,
    pub correlations: Vec<CorrelationReport>,
}

/// Models x metric codes table of scores.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryTable {
    /// Row labels (model names).
    pub index: Vec<String>,
    /// Column labels (metric codes).
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl SummaryTable {
    /// Create an empty table with the given column labels.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            index: Vec::new(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row. The number of scores must match the column count.
    pub fn push_row(&mut self, name: impl Into<String>, scores: Vec<f64>) {
        debug_assert_eq!(scores.len(), self.columns.len());
        self.index.push(name.into());
        self.rows.push(scores);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
impl SummaryTable {
    /// Look up the score of a model for a metric code.
    pub fn get(&self, model: &str, column: &str) -> Option<f64> {
        let row = self.index.iter().position(|m| m == model)?;
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(col).copied()
    }
}

/// Metadata attached to the JSON run summary.
#[derive(Debug, Clone, Serialize)]
pub struct RunMetadata {
    pub generated_at: DateTime<Utc>,
    pub correlation_type: CorrelationType,
    pub parent_dir: PathBuf,
    pub model_count: usize,
    pub metrics: Vec<MetricKind>,
    pub top_fraction: f64,
}

/// Complete results of one collection run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub metadata: RunMetadata,
    pub models: Vec<ModelReport>,
}
