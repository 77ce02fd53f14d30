//! Correlation of the reference metric against one other metric.
//!
//! Produces the overall score, one score per activation dimension and the
//! score of the top-ranked subset.

use super::correlation::Correlator;
use crate::error::CollectError;
use crate::models::{format_dim, CorrelationReport, DimOutcome, DimScore, MetricTable, ReferenceTable};
use std::cmp::Ordering;
use tracing::{debug, warn};

/// Options controlling one correlation pass.
#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    /// Fraction of top-ranked samples kept for the ranked score.
    pub top_fraction: f64,
    /// Fail instead of recording an unfit dimension subgroup.
    pub strict_dimensions: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            top_fraction: 0.6,
            strict_dimensions: false,
        }
    }
}

/// Distinct values in ascending order.
pub fn unique_dims(dims: &[f64]) -> Vec<f64> {
    let mut unique = dims.to_vec();
    unique.sort_by(f64::total_cmp);
    unique.dedup_by(|a, b| a.total_cmp(b) == Ordering::Equal);
    unique
}

/// Indices (in original row order) of the samples whose descending rank is
/// below `fraction * n`. Ties keep their original row order.
pub fn top_ranked_indices(values: &[f64], fraction: f64) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    // Stable sort, so equal values keep row order
    order.sort_by(|&i, &j| values[j].total_cmp(&values[i]));

    let threshold = fraction * values.len() as f64;
    let mut kept: Vec<usize> = order
        .into_iter()
        .enumerate()
        .filter(|(rank, _)| (*rank as f64) < threshold)
        .map(|(_, idx)| idx)
        .collect();
    kept.sort_unstable();
    kept
}

fn select(values: &[f64], indices: &[usize]) -> Vec<f64> {
    indices.iter().map(|&i| values[i]).collect()
}

/// Score each activation dimension subgroup.
pub fn per_dimension_scores(
    reference: &ReferenceTable,
    other: &[f64],
    correlator: &dyn Correlator,
    strict: bool,
) -> Result<Vec<DimScore>, CollectError> {
    let mut scores = Vec::new();

    for dim in unique_dims(&reference.active_dims) {
        let indices: Vec<usize> = reference
            .active_dims
            .iter()
            .enumerate()
            .filter(|(_, d)| d.total_cmp(&dim) == Ordering::Equal)
            .map(|(i, _)| i)
            .collect();

        let tpl = select(&reference.values, &indices);
        let metric = select(other, &indices);

        let outcome = match correlator.correlate(&tpl, &metric) {
            Ok(score) => DimOutcome::Scored { score },
            Err(e) if strict => return Err(e.into()),
            Err(e) => {
                warn!(
                    "{} dimension {} ({} samples) could not be fitted: {}",
                    correlator.name(),
                    format_dim(dim),
                    indices.len(),
                    e
                );
                DimOutcome::Unfit {
                    reason: e.to_string(),
                }
            }
        };

        scores.push(DimScore {
            dim,
            n_samples: indices.len(),
            outcome,
        });
    }

    Ok(scores)
}

/// Correlate the reference table with one other metric table.
pub fn correlate_metric(
    reference: &ReferenceTable,
    other: &MetricTable,
    correlator: &dyn Correlator,
    options: EngineOptions,
) -> Result<CorrelationReport, CollectError> {
    if reference.len() != other.values.len() {
        return Err(CollectError::RowCountMismatch {
            path: other.path.clone(),
            reference: reference.len(),
            other: other.values.len(),
        });
    }

    let overall = correlator.correlate(&reference.values, &other.values)?;

    let per_dim = per_dimension_scores(
        reference,
        &other.values,
        correlator,
        options.strict_dimensions,
    )?;

    let ranked_indices = top_ranked_indices(&other.values, options.top_fraction);
    let ranked = correlator.correlate(
        &select(&reference.values, &ranked_indices),
        &select(&other.values, &ranked_indices),
    )?;

    debug!(
        metric = other.kind.code(),
        overall,
        ranked,
        ranked_samples = ranked_indices.len(),
        dims = per_dim.len(),
        "correlated"
    );

    Ok(CorrelationReport {
        metric: other.kind,
        overall,
        per_dim,
        ranked,
        ranked_samples: ranked_indices.len(),
    })
}
