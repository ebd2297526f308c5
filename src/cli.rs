//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::SessionDurationPolicy;
use clap::Parser;
use std::path::PathBuf;

/// weblog-report - traffic analysis reports from web event logs
///
/// Reads a CSV event log (session_id, page_url, timestamp, ...), computes
/// daily visits, top pages and session durations, and writes a PDF report
/// with a chart and recommendations.
///
/// Examples:
///   weblog-report --input events.csv
///   weblog-report --input events.csv --output traffic.pdf --top-n 10
///   weblog-report --input events.csv --session-duration mean-event-duration
///   weblog-report --input events.csv --format json --output metrics.json
///   weblog-report --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Event log to analyze (CSV with a header row)
    #[arg(short, long, value_name = "FILE", required_unless_present = "init_config")]
    pub input: Option<PathBuf>,

    /// Output file path for the report
    ///
    /// Defaults to the config file setting, or analysis_report.pdf.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (pdf, json)
    #[arg(long, default_value = "pdf", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .weblog-report.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of pages in the top pages ranking
    #[arg(short = 'n', long, value_name = "COUNT")]
    pub top_n: Option<usize>,

    /// How session duration is defined
    ///
    /// span: last event minus first event of the session.
    /// mean-event-duration: mean of the event_duration column.
    #[arg(long, value_name = "POLICY")]
    pub session_duration: Option<SessionDurationArg>,

    /// Field delimiter of the event log (single character, or "tab")
    #[arg(long, value_name = "CHAR")]
    pub delimiter: Option<String>,

    /// TrueType font used for report and chart text
    ///
    /// Tried before the configured fallbacks.
    #[arg(long, value_name = "FILE", env = "WEBLOG_REPORT_FONT")]
    pub font: Option<PathBuf>,

    /// Report title
    #[arg(long, value_name = "TEXT")]
    pub title: Option<String>,

    /// Also save the chart as a PNG file
    #[arg(long, value_name = "FILE")]
    pub chart_output: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .weblog-report.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// PDF document (default)
    #[default]
    Pdf,
    /// JSON metrics
    Json,
}

/// Session duration policy as named on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SessionDurationArg {
    Span,
    MeanEventDuration,
}

impl From<SessionDurationArg> for SessionDurationPolicy {
    fn from(arg: SessionDurationArg) -> Self {
        match arg {
            SessionDurationArg::Span => SessionDurationPolicy::Span,
            SessionDurationArg::MeanEventDuration => SessionDurationPolicy::MeanEventDuration,
        }
    }
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

        match self.input {
            Some(ref input) if !input.is_file() => {
                return Err(format!("Input file does not exist: {}", input.display()));
            }
            None => return Err("An input file is required (--input)".to_string()),
            _ => {}
        }

        if self.top_n == Some(0) {
            return Err("Top-n must be at least 1".to_string());
        }

        if let Some(ref delimiter) = self.delimiter {
            if delimiter != "tab" && delimiter != "\\t" && delimiter.len() != 1 {
                return Err(format!(
                    "Delimiter must be a single character, got '{}'",
                    delimiter
                ));
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
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
            input: Some(PathBuf::from("Cargo.toml")),
            output: None,
            format: OutputFormat::Pdf,
            config: None,
            top_n: None,
            session_duration: None,
            delimiter: None,
            font: None,
            title: None,
            chart_output: None,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_validation_ok() {
        assert!(make_args().validate().is_ok());
    }

    #[test]
    fn test_validation_missing_input() {
        let mut args = make_args();
        args.input = Some(PathBuf::from("no/such/events.csv"));
        assert!(args.validate().is_err());

        args.input = None;
        assert!(args.validate().is_err());

        args.init_config = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_top_n() {
        let mut args = make_args();
        args.top_n = Some(0);
        assert!(args.validate().is_err());
        args.top_n = Some(3);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_delimiter() {
        let mut args = make_args();
        args.delimiter = Some(";".to_string());
        assert!(args.validate().is_ok());
        args.delimiter = Some("tab".to_string());
        assert!(args.validate().is_ok());
        args.delimiter = Some("::".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
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

    #[test]
    fn test_parse_from_command_line() {
        let args = Args::try_parse_from([
            "weblog-report",
            "--input",
            "events.csv",
            "--session-duration",
            "mean-event-duration",
            "-n",
            "3",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(args.top_n, Some(3));
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(
            args.session_duration.map(SessionDurationPolicy::from),
            Some(SessionDurationPolicy::MeanEventDuration)
        );
    }

    #[test]
    fn test_merge_into_config() {
        let mut args = make_args();
        args.top_n = Some(8);
        args.session_duration = Some(SessionDurationArg::MeanEventDuration);
        args.title = Some("Q3 Traffic".to_string());

        let mut config = crate::config::Config::default();
        config.merge_with_args(&args);

        assert_eq!(config.analysis.top_n, 8);
        assert_eq!(
            config.analysis.session_duration,
            SessionDurationPolicy::MeanEventDuration
        );
        assert_eq!(config.report.title, "Q3 Traffic");
        assert_eq!(config.general.output, "analysis_report.pdf");
    }
}
