//! The collection run: scan, locate, correlate, write.
//!
//! Models are processed one after another and metrics in column order. Any
//! error aborts the whole run; nothing is retried and no partial summary is
//! written.

use crate::analysis::{
    build_summary, correlate_metric, correlator_for, count_unfit_dimensions, EngineOptions,
    SummaryKind,
};
use crate::config::Config;
use crate::error::CollectError;
use crate::loader;
use crate::models::{ModelDir, ModelReport, RunMetadata, RunSummary, SummaryTable};
use crate::report;
use crate::scanner::{self, MetricPlan};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Everything produced by a successful run.
#[derive(Debug)]
pub struct RunOutcome {
    pub summary: RunSummary,
    pub overall: SummaryTable,
    pub ranked: SummaryTable,
    pub overall_path: PathBuf,
    pub ranked_path: PathBuf,
    /// Number of per-dimension text files written.
    pub dim_files: usize,
    /// Number of dimension subgroups that could not be fitted.
    pub unfit_dims: usize,
}

/// Discover model directories and settle the metric set.
pub fn plan(config: &Config) -> Result<(Vec<ModelDir>, MetricPlan), CollectError> {
    let parent = &config.general.parent_parent_dir;
    let model_dirs = scanner::discover_model_dirs(parent)?;
    info!("Found {} model directories in {}", model_dirs.len(), parent.display());

    let metric_plan = scanner::plan_metrics(&model_dirs, config.general.schema_policy)?;
    info!("Metrics: [{}]", metric_plan.codes().join(", "));

    Ok((model_dirs, metric_plan))
}

fn progress_bar(len: usize, show: bool) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .map(|s| s.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

/// Correlate every metric of one model and write its dimension files.
fn process_model(
    model_dir: &ModelDir,
    metric_plan: &MetricPlan,
    config: &Config,
    options: EngineOptions,
) -> Result<(ModelReport, usize), CollectError> {
    let correlation_type = config.general.correlation_type;
    let correlator = correlator_for(correlation_type, &config.lasso);

    let reference = loader::load_reference(model_dir)?;
    debug!(
        "{}: {} reference samples",
        model_dir.path.display(),
        reference.len()
    );

    let mut correlations = Vec::with_capacity(metric_plan.metrics.len());
    let mut dim_files = 0;
    for &kind in &metric_plan.metrics {
        let table = loader::load_metric(model_dir, kind)?;
        let result = correlate_metric(&reference, &table, correlator.as_ref(), options)?;

        dim_files += report::write_dim_scores(&model_dir.path, correlation_type, &result)?.len();
        correlations.push(result);
    }

    Ok((
        ModelReport {
            name: model_dir.name.clone(),
            path: model_dir.path.clone(),
            correlations,
        },
        dim_files,
    ))
}

/// Run the full collection.
pub fn run(config: &Config, show_progress: bool) -> Result<RunOutcome, CollectError> {
    config.validate()?;

    let (model_dirs, metric_plan) = plan(config)?;
    let options = EngineOptions {
        top_fraction: config.ranking.top_fraction,
        strict_dimensions: config.report.strict_dimensions,
    };

    let pb = progress_bar(model_dirs.len(), show_progress);
    let mut reports = Vec::with_capacity(model_dirs.len());
    let mut dim_files = 0;

    for model_dir in &model_dirs {
        pb.set_message(model_dir.name.clone());
        let (model_report, written) = match process_model(model_dir, &metric_plan, config, options) {
            Ok(result) => result,
            Err(e) => {
                pb.abandon();
                return Err(e);
            }
        };
        dim_files += written;
        reports.push(model_report);
        pb.inc(1);
    }
    pb.finish_and_clear();

    let columns = metric_plan.codes();
    let overall = build_summary(&reports, &columns, SummaryKind::Overall);
    let ranked = build_summary(&reports, &columns, SummaryKind::Ranked);

    let parent = &config.general.parent_parent_dir;
    let correlation_type = config.general.correlation_type;
    let overall_path = parent.join(report::summary_file_name(SummaryKind::Overall, correlation_type));
    let ranked_path = parent.join(report::summary_file_name(SummaryKind::Ranked, correlation_type));

    report::write_summary_csv(&overall, &overall_path)?;
    report::write_summary_csv(&ranked, &ranked_path)?;
    info!("Wrote {}", overall_path.display());
    info!("Wrote {}", ranked_path.display());

    let unfit_dims = count_unfit_dimensions(&reports);
    if unfit_dims > 0 {
        warn!("{} dimension subgroups could not be fitted (written as nan)", unfit_dims);
    }

    let summary = RunSummary {
        metadata: RunMetadata {
            generated_at: Utc::now(),
            correlation_type,
            parent_dir: parent.clone(),
            model_count: reports.len(),
            metrics: metric_plan.metrics.clone(),
            top_fraction: config.ranking.top_fraction,
        },
        models: reports,
    };

    if let Some(ref json_path) = config.report.summary_json {
        report::write_json_summary(&summary, json_path)?;
        info!("Wrote {}", json_path.display());
    }

    Ok(RunOutcome {
        summary,
        overall,
        ranked,
        overall_path,
        ranked_path,
        dim_files,
        unfit_dims,
    })
}
