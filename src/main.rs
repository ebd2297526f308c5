//! weblog-report - web traffic analysis from event logs
//!
//! A CLI tool that loads a CSV event log, aggregates daily visits, top
//! pages and session durations, and writes a PDF report (or JSON metrics).
//!
//! Exit codes:
//!   0 - Success
//!   1 - Invalid arguments, unreadable input, or a failed render

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use weblog_report::analysis::recommendations::visits_text;
use weblog_report::cli::{Args, OutputFormat};
use weblog_report::config::{Config, CONFIG_FILE};
use weblog_report::fonts::FontSet;
use weblog_report::models::Metrics;
use weblog_report::pipeline::{PipelineOptions, ReportPipeline};
use weblog_report::report::generate_json_report;

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

    info!("weblog-report v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run_report(args) {
        error!("Report failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .weblog-report.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to customize the session duration policy, fonts, and more.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// `RUST_LOG` takes precedence over --verbose/--quiet when set.
fn init_logging(args: &Args) {
    let level = args.log_level();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete report workflow.
fn run_report(args: Args) -> Result<()> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate().context("Invalid settings")?;

    let input = args
        .input
        .clone()
        .context("An input file is required (--input)")?;
    let output = output_path(&args, &config);

    let fonts = FontSet::resolve(config.fonts.preferred.as_deref(), &config.fonts.fallbacks);
    let pipeline = ReportPipeline::new(PipelineOptions::from(&config), fonts);

    println!("📥 Loading event log: {}", input.display());
    println!(
        "   Session duration: {} ({})",
        config.analysis.session_duration,
        config.analysis.session_duration.version()
    );

    let progress = stage_progress(args.quiet);

    // Step 1: Load and aggregate
    progress.set_message("Aggregating events...");
    let (rows, metrics) = pipeline
        .analyze_path(&input)
        .with_context(|| format!("Failed to analyze {}", input.display()))?;
    info!("Loaded {} events from {}", rows, input.display());

    // Step 2: Render and write
    let metrics = match args.format {
        OutputFormat::Json => {
            progress.set_message("Writing JSON metrics...");
            let json = generate_json_report(&metrics)?;
            std::fs::write(&output, json)
                .with_context(|| format!("Failed to write report to {}", output.display()))?;

            if let Some(ref chart_path) = args.chart_output {
                progress.set_message("Rendering chart...");
                pipeline.chart(&metrics)?.save(chart_path)?;
                info!("Chart saved to {}", chart_path.display());
            }
            metrics
        }
        OutputFormat::Pdf => {
            progress.set_message("Rendering chart and report...");
            let report = pipeline.render(rows, metrics)?;
            report
                .document
                .save(&output)
                .with_context(|| format!("Failed to write report to {}", output.display()))?;
            debug!(
                "Report has {} page(s), sections: {:?}",
                report.document.page_count, report.document.sections
            );

            if let Some(ref chart_path) = args.chart_output {
                report.chart.save(chart_path)?;
                info!("Chart saved to {}", chart_path.display());
            }
            report.metrics
        }
    };

    progress.finish_and_clear();

    print_summary(rows, &metrics, start_time.elapsed());
    println!("\n✅ Report complete! Saved to: {}", output.display());

    Ok(())
}

/// Spinner shown while the pipeline runs. Hidden in quiet mode.
fn stage_progress(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn print_summary(rows: usize, metrics: &Metrics, elapsed: Duration) {
    println!("\n📊 Analysis Summary:");
    println!("   Events: {}", rows);
    println!("   Days: {}", metrics.daily_visits.len());
    println!("   Sessions: {}", metrics.session_count);
    match metrics.average_session_duration {
        Some(avg) => println!("   Average session duration: {:.2}s", avg),
        None => println!("   Average session duration: n/a"),
    }
    if let Some(top) = metrics.top_pages.iter().next() {
        println!("   Top page: {} ({})", top.page_url, visits_text(top.visits));
    }
    println!("   Duration: {:.1}s", elapsed.as_secs_f64());
}

/// Resolve the report path. JSON output defaults to a `.json` sibling of
/// the configured path when --output is not given.
fn output_path(args: &Args, config: &Config) -> PathBuf {
    if let Some(ref output) = args.output {
        return output.clone();
    }

    let path = PathBuf::from(&config.general.output);
    match args.format {
        OutputFormat::Json => path.with_extension("json"),
        OutputFormat::Pdf => path,
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}
