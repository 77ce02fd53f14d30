//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.tplcollect.toml` files.

use crate::error::CollectError;
use crate::models::{CorrelationType, SchemaPolicy};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".tplcollect.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Lasso solver settings.
    #[serde(default)]
    pub lasso: LassoConfig,

    /// Ranked-subset settings.
    #[serde(default)]
    pub ranking: RankingConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General run settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory holding one subdirectory per evaluated model.
    #[serde(default = "default_parent_parent_dir")]
    pub parent_parent_dir: PathBuf,

    /// Correlation function.
    #[serde(default)]
    pub correlation_type: CorrelationType,

    /// How the expected metric set is established.
    #[serde(default)]
    pub schema_policy: SchemaPolicy,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            parent_parent_dir: default_parent_parent_dir(),
            correlation_type: CorrelationType::default(),
            schema_policy: SchemaPolicy::default(),
        }
    }
}

fn default_parent_parent_dir() -> PathBuf {
    PathBuf::from("/mnt/hdd/repo_results/test")
}

/// Lasso solver settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LassoConfig {
    /// L1 penalty strength.
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    /// Coordinate descent iteration cap.
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,

    /// Convergence tolerance, relative to the centered target's squared norm.
    #[serde(default = "default_tol")]
    pub tol: f64,
}

impl Default for LassoConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            max_iter: default_max_iter(),
            tol: default_tol(),
        }
    }
}

fn default_alpha() -> f64 {
    1.0
}

fn default_max_iter() -> usize {
    10_000
}

fn default_tol() -> f64 {
    1e-4
}

/// Ranked-subset settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Fraction of top-ranked samples kept for the ranked score.
    #[serde(default = "default_top_fraction")]
    pub top_fraction: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            top_fraction: default_top_fraction(),
        }
    }
}

fn default_top_fraction() -> f64 {
    0.6
}

/// Report generation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Abort the run when a dimension subgroup cannot be fitted.
    #[serde(default)]
    pub strict_dimensions: bool,

    /// Optional JSON summary of the whole run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_json: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load `.tplcollect.toml` from `dir`.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default_in(dir: &Path) -> Result<Option<Self>> {
        let default_path = dir.join(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(&default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref dir) = args.parent_parent_dir {
            self.general.parent_parent_dir = dir.clone();
        }
        if let Some(correlation_type) = args.correlation_type {
            self.general.correlation_type = correlation_type;
        }
        if let Some(policy) = args.schema_policy {
            self.general.schema_policy = policy;
        }

        if let Some(fraction) = args.top_fraction {
            self.ranking.top_fraction = fraction;
        }
        if let Some(alpha) = args.lasso_alpha {
            self.lasso.alpha = alpha;
        }
        if let Some(max_iter) = args.lasso_max_iter {
            self.lasso.max_iter = max_iter;
        }

        if let Some(ref path) = args.summary_json {
            self.report.summary_json = Some(path.clone());
        }

        // Flags always override
        if args.strict_dimensions {
            self.report.strict_dimensions = true;
        }
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), CollectError> {
        let fraction = self.ranking.top_fraction;
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(CollectError::config(format!(
                "top_fraction must be in (0, 1], got {}",
                fraction
            )));
        }
        if !(self.lasso.alpha >= 0.0 && self.lasso.alpha.is_finite()) {
            return Err(CollectError::config(format!(
                "lasso alpha must be a finite non-negative number, got {}",
                self.lasso.alpha
            )));
        }
        if self.lasso.max_iter == 0 {
            return Err(CollectError::config("lasso max_iter must be at least 1"));
        }
        if !(self.lasso.tol > 0.0 && self.lasso.tol.is_finite()) {
            return Err(CollectError::config(format!(
                "lasso tol must be a finite positive number, got {}",
                self.lasso.tol
            )));
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
