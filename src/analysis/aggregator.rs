//! Folding per-model results into summary tables.

use crate::models::{DimOutcome, ModelReport, SummaryTable};

/// Which score of a [`crate::models::CorrelationReport`] a table holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryKind {
    /// Score over all samples.
    Overall,
    /// Score over the top-ranked subset.
    Ranked,
}

impl SummaryKind {
    /// File name prefix of the summary CSV.
    pub fn prefix(&self) -> &'static str {
        match self {
            SummaryKind::Overall => "overall",
            SummaryKind::Ranked => "rank",
        }
    }
}

/// Build a models x metrics summary table.
///
/// Every report is expected to carry the metrics of `columns` in that order;
/// a metric missing from a report yields NaN.
pub fn build_summary(reports: &[ModelReport], columns: &[String], kind: SummaryKind) -> SummaryTable {
    let mut table = SummaryTable::new(columns.to_vec());

    for report in reports {
        let scores = columns
            .iter()
            .map(|code| {
                report
                    .correlations
                    .iter()
                    .find(|c| c.metric.code() == code.as_str())
                    .map(|c| match kind {
                        SummaryKind::Overall => c.overall,
                        SummaryKind::Ranked => c.ranked,
                    })
                    .unwrap_or(f64::NAN)
            })
            .collect();
        table.push_row(report.name.clone(), scores);
    }

    table
}

/// Count dimension subgroups that could not be fitted across all reports.
pub fn count_unfit_dimensions(reports: &[ModelReport]) -> usize {
    reports
        .iter()
        .flat_map(|r| &r.correlations)
        .flat_map(|c| &c.per_dim)
        .filter(|d| matches!(d.outcome, DimOutcome::Unfit { .. }))
        .count()
}

/// Mean score per column, ignoring NaN cells.
pub fn column_means(table: &SummaryTable) -> Vec<f64> {
    (0..table.columns.len())
        .map(|col| {
            let finite: Vec<f64> = table
                .rows
                .iter()
                .filter_map(|row| row.get(col).copied())
                .filter(|v| v.is_finite())
                .collect();
            if finite.is_empty() {
                f64::NAN
            } else {
                finite.iter().sum::<f64>() / finite.len() as f64
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CorrelationReport, DimScore, MetricKind};
    use std::path::PathBuf;

    fn report(metric: MetricKind, overall: f64, ranked: f64) -> CorrelationReport {
        CorrelationReport {
            metric,
            overall,
            per_dim: vec![
                DimScore {
                    dim: 2.0,
                    n_samples: 4,
                    outcome: DimOutcome::Scored { score: overall },
                },
                DimScore {
                    dim: 5.0,
                    n_samples: 1,
                    outcome: DimOutcome::Unfit {
                        reason: "Insufficient data".to_string(),
                    },
                },
            ],
            ranked,
            ranked_samples: 3,
        }
    }

    fn model(name: &str, correlations: Vec<CorrelationReport>) -> ModelReport {
        ModelReport {
            name: name.to_string(),
            path: PathBuf::from(name),
            correlations,
        }
    }

    #[test]
    fn test_build_summary_tables() {
        let reports = vec![
            model(
                "beta_vae",
                vec![
                    report(MetricKind::Mig, 0.5, 0.25),
                    report(MetricKind::Dci, 0.75, 0.125),
                ],
            ),
            model(
                "factor_vae",
                vec![
                    report(MetricKind::Mig, -0.5, 0.0),
                    report(MetricKind::Dci, 1.0, 1.0),
                ],
            ),
        ];
        let columns = vec!["MIG".to_string(), "DCI".to_string()];

        let overall = build_summary(&reports, &columns, SummaryKind::Overall);
        assert_eq!(overall.index, vec!["beta_vae", "factor_vae"]);
        assert_eq!(overall.get("beta_vae", "DCI"), Some(0.75));
        assert_eq!(overall.get("factor_vae", "MIG"), Some(-0.5));

        let ranked = build_summary(&reports, &columns, SummaryKind::Ranked);
        assert_eq!(ranked.get("beta_vae", "DCI"), Some(0.125));

        assert_eq!(column_means(&overall), vec![0.0, 0.875]);
        assert_eq!(count_unfit_dimensions(&reports), 4);
    }

    #[test]
    fn test_missing_metric_yields_nan() {
        let reports = vec![model("m", vec![report(MetricKind::Mig, 0.5, 0.5)])];
        let columns = vec!["MIG".to_string(), "FVM".to_string()];

        let table = build_summary(&reports, &columns, SummaryKind::Overall);
        assert!(table.get("m", "FVM").unwrap().is_nan());
        assert!(column_means(&table)[1].is_nan());
    }

    #[test]
    fn test_prefixes() {
        assert_eq!(SummaryKind::Overall.prefix(), "overall");
        assert_eq!(SummaryKind::Ranked.prefix(), "rank");
    }
}
