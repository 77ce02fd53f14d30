//! Report file generation.
//!
//! All outputs are overwritten on rerun.

use crate::analysis::SummaryKind;
use crate::error::CollectError;
use crate::models::{
    format_float, CorrelationReport, CorrelationType, DimScore, MetricKind, RunSummary, SummaryTable,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the per-dimension score file, e.g. `Spearman_MIG_3.txt`.
pub fn dim_score_file_name(
    correlation_type: CorrelationType,
    metric: MetricKind,
    score: &DimScore,
) -> String {
    format!("{}_{}_{}.txt", correlation_type, metric.code(), score.dim_label())
}

/// Content of a per-dimension score file.
pub fn format_dim_score(score: &DimScore) -> String {
    match score.outcome.score() {
        Some(value) => format!("score={:.4}, n={}", value, score.n_samples),
        None => format!("score=nan, n={}", score.n_samples),
    }
}

/// Write one text file per activation dimension into the model directory.
pub fn write_dim_scores(
    model_dir: &Path,
    correlation_type: CorrelationType,
    report: &CorrelationReport,
) -> Result<Vec<PathBuf>, CollectError> {
    let mut written = Vec::with_capacity(report.per_dim.len());

    for score in &report.per_dim {
        let path = model_dir.join(dim_score_file_name(correlation_type, report.metric, score));
        fs::write(&path, format_dim_score(score)).map_err(|e| CollectError::io(&path, e))?;
        written.push(path);
    }

    debug!(
        "Wrote {} dimension files for {} in {}",
        written.len(),
        report.metric,
        model_dir.display()
    );
    Ok(written)
}

/// Name of a summary CSV, e.g. `overall_Spearman_TPL_vs_others.csv`.
pub fn summary_file_name(kind: SummaryKind, correlation_type: CorrelationType) -> String {
    format!(
        "{}_{}_{}_vs_others.csv",
        kind.prefix(),
        correlation_type,
        MetricKind::Tpl.code()
    )
}

/// Render a score for CSV output: shortest round-trip form, empty for NaN.
fn format_cell(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        format_float(value)
    }
}

/// Write a summary table as CSV with an unnamed index column.
pub fn write_summary_csv(table: &SummaryTable, path: &Path) -> Result<(), CollectError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| CollectError::csv(path, e))?;

    let mut header = vec![String::new()];
    header.extend(table.columns.iter().cloned());
    writer
        .write_record(&header)
        .map_err(|e| CollectError::csv(path, e))?;

    for (name, row) in table.index.iter().zip(&table.rows) {
        let mut record = vec![name.clone()];
        record.extend(row.iter().map(|v| format_cell(*v)));
        writer
            .write_record(&record)
            .map_err(|e| CollectError::csv(path, e))?;
    }

    writer.flush().map_err(|e| CollectError::io(path, e))?;
    Ok(())
}

/// Read a summary table written by [`write_summary_csv`].
pub fn read_summary_csv(path: &Path) -> Result<SummaryTable, CollectError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| CollectError::csv(path, e))?;

    let headers = reader
        .headers()
        .map_err(|e| CollectError::csv(path, e))?
        .clone();
    let columns: Vec<String> = headers.iter().skip(1).map(String::from).collect();
    let mut table = SummaryTable::new(columns);

    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|e| CollectError::csv(path, e))?;
        let name = record.get(0).unwrap_or("").to_string();

        let mut scores = Vec::with_capacity(table.columns.len());
        for (col, column) in table.columns.iter().enumerate() {
            let raw = record.get(col + 1).unwrap_or("");
            let value = if raw.is_empty() {
                f64::NAN
            } else {
                raw.parse::<f64>().map_err(|_| CollectError::InvalidValue {
                    path: path.to_path_buf(),
                    column: column.clone(),
                    row: row + 1,
                    value: raw.to_string(),
                })?
            };
            scores.push(value);
        }
        table.push_row(name, scores);
    }

    Ok(table)
}

/// Generate the JSON run summary.
pub fn generate_json_summary(summary: &RunSummary) -> Result<String, CollectError> {
    serde_json::to_string_pretty(summary).map_err(Into::into)
}

/// Write the JSON run summary to a file.
pub fn write_json_summary(summary: &RunSummary, path: &Path) -> Result<(), CollectError> {
    let content = generate_json_summary(summary)?;
    fs::write(path, content).map_err(|e| CollectError::io(path, e))
}

/// Render a summary table for the console.
pub fn format_console_table(table: &SummaryTable, means: &[f64]) -> String {
    if table.is_empty() {
        return "   (no models)\n".to_string();
    }

    let name_width = table
        .index
        .iter()
        .map(|n| n.chars().count())
        .chain(std::iter::once("mean".len()))
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    out.push_str(&format!("   {:<width$}", "model", width = name_width));
    for column in &table.columns {
        out.push_str(&format!(" {:>8}", column));
    }
    out.push('\n');

    let mut push_row = |label: &str, values: &[f64]| {
        out.push_str(&format!("   {:<width$}", label, width = name_width));
        for value in values {
            if value.is_nan() {
                out.push_str(&format!(" {:>8}", "-"));
            } else {
                out.push_str(&format!(" {:>8.4}", value));
            }
        }
        out.push('\n');
    };

    for (name, row) in table.index.iter().zip(&table.rows) {
        push_row(name, row);
    }
    if table.len() > 1 {
        push_row("mean", means);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DimOutcome, ModelReport, RunMetadata};
    use chrono::Utc;
    use tempfile::TempDir;

    fn scored(dim: f64, n_samples: usize, score: f64) -> DimScore {
        DimScore {
            dim,
            n_samples,
            outcome: DimOutcome::Scored { score },
        }
    }

    fn sample_table() -> SummaryTable {
        let mut table = SummaryTable::new(vec!["MIG".to_string(), "DCI".to_string()]);
        table.push_row("beta_vae_", vec![0.123456789, -0.5]);
        table.push_row("factor_vae_", vec![1.0, 1e-7]);
        table
    }

    #[test]
    fn test_dim_score_file_name_and_content() {
        let score = scored(3.0, 12, 0.87654);
        assert_eq!(
            dim_score_file_name(CorrelationType::Spearman, MetricKind::Mig, &score),
            "Spearman_MIG_3.0.txt"
        );
        assert_eq!(format_dim_score(&score), "score=0.8765, n=12");

        let unfit = DimScore {
            dim: 4.5,
            n_samples: 1,
            outcome: DimOutcome::Unfit {
                reason: "x".to_string(),
            },
        };
        assert_eq!(
            dim_score_file_name(CorrelationType::Lasso, MetricKind::Bvm, &unfit),
            "Lasso_BVM_4.5.txt"
        );
        assert_eq!(format_dim_score(&unfit), "score=nan, n=1");
    }

    #[test]
    fn test_write_dim_scores_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let mut report = CorrelationReport {
            metric: MetricKind::Dci,
            overall: 0.5,
            per_dim: vec![scored(2.0, 3, 0.5), scored(4.0, 2, -1.0)],
            ranked: 0.5,
            ranked_samples: 3,
        };

        let written = write_dim_scores(temp_dir.path(), CorrelationType::Spearman, &report).unwrap();
        assert_eq!(written.len(), 2);

        report.per_dim[0] = scored(2.0, 3, 0.25);
        write_dim_scores(temp_dir.path(), CorrelationType::Spearman, &report).unwrap();

        let content = fs::read_to_string(temp_dir.path().join("Spearman_DCI_2.0.txt")).unwrap();
        assert_eq!(content, "score=0.2500, n=3");
        let content = fs::read_to_string(temp_dir.path().join("Spearman_DCI_4.0.txt")).unwrap();
        assert_eq!(content, "score=-1.0000, n=2");
    }

    #[test]
    fn test_summary_file_names() {
        assert_eq!(
            summary_file_name(SummaryKind::Overall, CorrelationType::Spearman),
            "overall_Spearman_TPL_vs_others.csv"
        );
        assert_eq!(
            summary_file_name(SummaryKind::Ranked, CorrelationType::Lasso),
            "rank_Lasso_TPL_vs_others.csv"
        );
    }

    #[test]
    fn test_summary_csv_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("overall.csv");
        let table = sample_table();

        write_summary_csv(&table, &path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with(",MIG,DCI\n"));
        assert!(content.contains("factor_vae_,1.0,1e-07\n"));

        let read_back = read_summary_csv(&path).unwrap();
        assert_eq!(read_back, table);
    }

    #[test]
    fn test_summary_csv_nan_cells() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("rank.csv");
        let mut table = SummaryTable::new(vec!["FVM".to_string()]);
        table.push_row("m", vec![f64::NAN]);

        write_summary_csv(&table, &path).unwrap();
        let read_back = read_summary_csv(&path).unwrap();
        assert!(read_back.get("m", "FVM").unwrap().is_nan());
    }

    #[test]
    fn test_generate_json_summary() {
        let summary = RunSummary {
            metadata: RunMetadata {
                generated_at: Utc::now(),
                correlation_type: CorrelationType::Spearman,
                parent_dir: PathBuf::from("/data/runs"),
                model_count: 1,
                metrics: vec![MetricKind::Mig],
                top_fraction: 0.6,
            },
            models: vec![ModelReport {
                name: "beta_vae_".to_string(),
                path: PathBuf::from("/data/runs/beta_vae_0001"),
                correlations: vec![CorrelationReport {
                    metric: MetricKind::Mig,
                    overall: 0.5,
                    per_dim: vec![scored(2.0, 3, 0.5)],
                    ranked: 0.25,
                    ranked_samples: 2,
                }],
            }],
        };

        let json = generate_json_summary(&summary).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["metadata"]["correlation_type"], "Spearman");
        assert_eq!(value["models"][0]["name"], "beta_vae_");
        assert_eq!(value["models"][0]["correlations"][0]["metric"], "Mig");
        assert_eq!(
            value["models"][0]["correlations"][0]["per_dim"][0]["status"],
            "scored"
        );
    }

    #[test]
    fn test_format_console_table() {
        let table = sample_table();
        let text = format_console_table(&table, &[0.5, 0.25]);
        assert!(text.contains("MIG"));
        assert!(text.contains("beta_vae_"));
        assert!(text.contains("0.1235"));
        assert!(text.contains("mean"));
    }

    #[test]
    fn test_format_console_table_empty() {
        let table = SummaryTable::new(vec!["MIG".to_string()]);
        assert_eq!(format_console_table(&table, &[f64::NAN]), "   (no models)\n");
    }
}
