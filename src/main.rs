//! tplcollect - TPL correlation collector
//!
//! A CLI tool that walks a directory of model evaluation results and
//! correlates the TPL score of every run with the supervised
//! disentanglement metrics collected next to it.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Any error (arguments, config, missing files, schema, fit)

mod analysis;
mod cli;
mod config;
mod error;
mod loader;
mod models;
mod pipeline;
mod report;
mod scanner;

use analysis::column_means;
use anyhow::{Context, Result};
use cli::Args;
use config::{Config, DEFAULT_CONFIG_FILE};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("tplcollect v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run_collect(args) {
        error!("Collection failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .tplcollect.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", DEFAULT_CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to set the results directory, correlation type and solver options.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete collection workflow.
fn run_collect(args: Args) -> Result<()> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(&args, Path::new("."))?;
    config.merge_with_args(&args);
    config.validate().context("Invalid configuration")?;

    // Handle --dry-run: scan and exit
    if args.dry_run {
        return handle_dry_run(&config);
    }

    if !args.quiet {
        println!(
            "📊 Collecting {} correlations in {}",
            config.general.correlation_type,
            config.general.parent_parent_dir.display()
        );
    }

    let outcome = pipeline::run(&config, !args.quiet)?;

    if args.quiet {
        return Ok(());
    }

    let duration = start_time.elapsed().as_secs_f64();

    println!("\n📈 Overall {} (TPL vs others):", config.general.correlation_type);
    print!(
        "{}",
        report::format_console_table(&outcome.overall, &column_means(&outcome.overall))
    );
    println!(
        "\n📈 Top {:.0}% ranked subset:",
        config.ranking.top_fraction * 100.0
    );
    print!(
        "{}",
        report::format_console_table(&outcome.ranked, &column_means(&outcome.ranked))
    );

    println!("\n   Models: {}", outcome.summary.models.len());
    println!("   Dimension files: {}", outcome.dim_files);
    if outcome.unfit_dims > 0 {
        println!("   ⚠️  Unfit dimension subgroups: {}", outcome.unfit_dims);
    }
    println!("   Duration: {:.1}s", duration);
    println!(
        "\n✅ Done! Summaries saved to:\n   {}\n   {}",
        outcome.overall_path.display(),
        outcome.ranked_path.display()
    );

    Ok(())
}

/// Handle --dry-run: list models and metrics, write nothing.
fn handle_dry_run(config: &Config) -> Result<()> {
    println!("\n🔍 Dry run: scanning model directories (nothing is written)...\n");

    let (model_dirs, metric_plan) = pipeline::plan(config)?;

    println!("   Metrics: {}", metric_plan.codes().join(", "));
    println!("   Found {} model directories:\n", model_dirs.len());
    for model_dir in &model_dirs {
        println!("     📁 {} ({})", model_dir.name, model_dir.path.display());
    }

    let correlation_type = config.general.correlation_type;
    let overall_name = report::summary_file_name(analysis::SummaryKind::Overall, correlation_type);
    let ranked_name = report::summary_file_name(analysis::SummaryKind::Ranked, correlation_type);
    println!("\n   Would write {} and {}", overall_name, ranked_name);

    // Show the summary a previous run left behind
    let existing = config.general.parent_parent_dir.join(&overall_name);
    if existing.is_file() {
        let table = report::read_summary_csv(&existing)?;
        println!("\n📈 Existing {}:", overall_name);
        print!("{}", report::format_console_table(&table, &column_means(&table)));
    }

    println!("\n✅ Dry run complete.");
    Ok(())
}

/// Load configuration from file or use defaults.
///
/// `dir` is where the default config file is looked up. A config file that
/// exists but cannot be read or parsed is an error.
fn load_config(args: &Args, dir: &Path) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default_in(dir)
        .with_context(|| format!("Invalid {} in {}", DEFAULT_CONFIG_FILE, dir.display()))?
    {
        Some(config) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        None => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}
