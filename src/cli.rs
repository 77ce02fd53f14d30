//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation. Values left unset fall back to the
//! configuration file (see [`crate::config::Config::merge_with_args`]).

use crate::models::{CorrelationType, SchemaPolicy};
use clap::Parser;
use std::path::PathBuf;

/// tplcollect - correlate TPL with supervised disentanglement metrics
///
/// Scans a directory of model result directories, correlates the TPL
/// score of every run with MIG, DCI, FactorVAE and BetaVAE scores, and
/// writes per-dimension text files plus two summary CSV tables.
///
/// Examples:
///   tplcollect --parent_parent_dir /data/runs
///   tplcollect --parent_parent_dir /data/runs --correlation_type Lasso
///   tplcollect --parent_parent_dir /data/runs --dry-run
///   tplcollect --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Directory containing one subdirectory per evaluated model
    ///
    /// Defaults to the configuration file value (/mnt/hdd/repo_results/test).
    #[arg(
        long = "parent_parent_dir",
        visible_alias = "parent-parent-dir",
        value_name = "DIR",
        env = "TPLCOLLECT_PARENT_DIR"
    )]
    pub parent_parent_dir: Option<PathBuf>,

    /// Correlation function (Spearman, Lasso)
    #[arg(
        long = "correlation_type",
        visible_alias = "correlation-type",
        value_name = "TYPE",
        ignore_case = true
    )]
    pub correlation_type: Option<CorrelationType>,

    /// How the expected metric files are determined across model directories
    ///
    /// strict: every directory must hold the same metric files.
    /// first-dir: the first directory defines the metric files for all.
    #[arg(long, value_name = "POLICY")]
    pub schema_policy: Option<SchemaPolicy>,

    /// Fraction of top-ranked samples used for the ranked score
    #[arg(long, value_name = "FRACTION")]
    pub top_fraction: Option<f64>,

    /// L1 penalty of the Lasso correlator
    #[arg(long, value_name = "ALPHA")]
    pub lasso_alpha: Option<f64>,

    /// Iteration cap of the Lasso solver
    #[arg(long, value_name = "N")]
    pub lasso_max_iter: Option<usize>,

    /// Abort when an activation dimension subgroup cannot be fitted
    #[arg(long)]
    pub strict_dimensions: bool,

    /// Also write a JSON summary of all results to this file
    #[arg(long, value_name = "FILE")]
    pub summary_json: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .tplcollect.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: scan model directories and metric files without computing
    ///
    /// Shows which models and metrics would be processed and exits.
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .tplcollect.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(fraction) = self.top_fraction {
            if !(fraction > 0.0 && fraction <= 1.0) {
                return Err("Top fraction must be in (0, 1]".to_string());
            }
        }

        if let Some(alpha) = self.lasso_alpha {
            if !(alpha >= 0.0 && alpha.is_finite()) {
                return Err("Lasso alpha must be a non-negative number".to_string());
            }
        }

        if self.lasso_max_iter == Some(0) {
            return Err("Lasso max iterations must be at least 1".to_string());
        }

        // Validate parent directory if provided
        if let Some(ref dir) = self.parent_parent_dir {
            if !dir.exists() {
                return Err(format!("Parent directory does not exist: {}", dir.display()));
            }
            if !dir.is_dir() {
                return Err(format!(
                    "Parent path is not a directory: {}",
                    dir.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            parent_parent_dir: None,
            correlation_type: None,
            schema_policy: None,
            top_fraction: None,
            lasso_alpha: None,
            lasso_max_iter: None,
            strict_dimensions: false,
            summary_json: None,
            config: None,
            verbose: false,
            quiet: false,
            dry_run: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_underscore_flag_names() {
        let args = Args::try_parse_from([
            "tplcollect",
            "--parent_parent_dir",
            "/tmp",
            "--correlation_type",
            "Lasso",
        ])
        .unwrap();
        assert_eq!(args.parent_parent_dir, Some(PathBuf::from("/tmp")));
        assert_eq!(args.correlation_type, Some(CorrelationType::Lasso));
    }

    #[test]
    fn test_parse_kebab_aliases_and_case() {
        let args = Args::try_parse_from([
            "tplcollect",
            "--parent-parent-dir",
            "/tmp",
            "--correlation-type",
            "spearman",
            "--schema-policy",
            "first-dir",
        ])
        .unwrap();
        assert_eq!(args.correlation_type, Some(CorrelationType::Spearman));
        assert_eq!(args.schema_policy, Some(SchemaPolicy::FirstDir));
    }

    #[test]
    fn test_rejects_unknown_correlation_type() {
        let result = Args::try_parse_from(["tplcollect", "--correlation_type", "Pearson"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_ranges() {
        let mut args = make_args();
        args.top_fraction = Some(0.0);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.lasso_max_iter = Some(0);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.parent_parent_dir = Some(PathBuf::from("/definitely/not/here"));
        assert!(args.validate().is_err());

        assert!(make_args().validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
