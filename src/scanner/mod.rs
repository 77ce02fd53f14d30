//! Model directory discovery and metric file location.
//!
//! A parent directory holds one result directory per evaluated model; each
//! of those holds the collected reference file and some of the other metric
//! files. This module finds them and settles which metrics the run covers.

use crate::error::CollectError;
use crate::models::{MetricKind, ModelDir, SchemaPolicy};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Number of trailing characters stripped from a directory name to form
/// the model name.
const NAME_SUFFIX_LEN: usize = 4;

/// Derive a model name by stripping the fixed-length suffix.
pub fn model_name(dir_name: &str) -> String {
    let keep = dir_name.chars().count().saturating_sub(NAME_SUFFIX_LEN);
    dir_name.chars().take(keep).collect()
}

/// Check if a name is hidden (skipped like a shell `*` glob would).
fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Enumerate the model directories directly under `parent`, sorted by name.
pub fn discover_model_dirs(parent: &Path) -> Result<Vec<ModelDir>, CollectError> {
    if !parent.is_dir() {
        return Err(CollectError::config(format!(
            "Parent directory does not exist or is not a directory: {}",
            parent.display()
        )));
    }

    let mut dirs = Vec::new();
    let walker = WalkDir::new(parent)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| parent.to_path_buf());
            let source = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
            CollectError::io(path, source)
        })?;

        let file_name = entry.file_name().to_string_lossy().to_string();
        if is_hidden(&file_name) {
            continue;
        }
        if !entry.file_type().is_dir() {
            debug!("Skipping non-directory entry: {}", entry.path().display());
            continue;
        }

        dirs.push(ModelDir {
            path: entry.path().to_path_buf(),
            name: model_name(&file_name),
        });
    }

    if dirs.is_empty() {
        return Err(CollectError::config(format!(
            "No model directories found under {}",
            parent.display()
        )));
    }

    Ok(dirs)
}

/// List the recognized non-reference metric files present in a model
/// directory, in report column order.
pub fn locate_metric_files(model_dir: &Path) -> Result<Vec<MetricKind>, CollectError> {
    let entries = fs::read_dir(model_dir).map_err(|e| CollectError::io(model_dir, e))?;

    let mut found = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| CollectError::io(model_dir, e))?;
        let name = entry.file_name().to_string_lossy().to_string();
        if let Some(kind) = MetricKind::other_from_file_name(&name) {
            found.push(kind);
        }
    }

    found.sort();
    Ok(found)
}

/// Metrics to correlate, checked against every model directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricPlan {
    pub metrics: Vec<MetricKind>,
}

impl MetricPlan {
    /// Metric codes in column order.
    pub fn codes(&self) -> Vec<String> {
        self.metrics.iter().map(|m| m.code().to_string()).collect()
    }

    /// Path of a metric file inside a model directory.
    pub fn metric_path(model_dir: &ModelDir, kind: MetricKind) -> PathBuf {
        model_dir.path.join(kind.file_name())
    }
}

fn join_codes(metrics: &[MetricKind]) -> String {
    metrics
        .iter()
        .map(|m| m.code())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Establish the metric set for the run and verify every directory against it.
///
/// The first directory defines the expected metrics under both policies.
/// `Strict` also rejects directories carrying extra metric files; both
/// policies fail on a missing file before anything is read.
pub fn plan_metrics(
    model_dirs: &[ModelDir],
    policy: SchemaPolicy,
) -> Result<MetricPlan, CollectError> {
    let first = model_dirs
        .first()
        .ok_or_else(|| CollectError::config("No model directories to plan metrics for"))?;

    let expected = locate_metric_files(&first.path)?;
    if expected.is_empty() {
        warn!(
            "No supervised metric files found in {}; summary tables will have no columns",
            first.path.display()
        );
    }
    debug!(
        "Metric set from {}: [{}]",
        first.path.display(),
        join_codes(&expected)
    );

    for model_dir in model_dirs {
        let reference = MetricPlan::metric_path(model_dir, MetricKind::Tpl);
        if !reference.is_file() {
            return Err(CollectError::MissingMetricFile {
                model_dir: model_dir.path.clone(),
                file: MetricKind::Tpl.file_name().to_string(),
            });
        }

        match policy {
            SchemaPolicy::Strict => {
                let found = locate_metric_files(&model_dir.path)?;
                if let Some(missing) = expected.iter().find(|m| !found.contains(m)) {
                    return Err(CollectError::MissingMetricFile {
                        model_dir: model_dir.path.clone(),
                        file: missing.file_name().to_string(),
                    });
                }
                if found != expected {
                    return Err(CollectError::InconsistentMetrics {
                        model_dir: model_dir.path.clone(),
                        expected: join_codes(&expected),
                        found: join_codes(&found),
                    });
                }
            }
            SchemaPolicy::FirstDir => {
                for kind in &expected {
                    if !MetricPlan::metric_path(model_dir, *kind).is_file() {
                        return Err(CollectError::MissingMetricFile {
                            model_dir: model_dir.path.clone(),
                            file: kind.file_name().to_string(),
                        });
                    }
                }
            }
        }
    }

    Ok(MetricPlan { metrics: expected })
}
