//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.weblog-report.toml` files.

use crate::models::SessionDurationPolicy;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".weblog-report.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Aggregation settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Chart canvas settings.
    #[serde(default)]
    pub chart: ChartConfig,

    /// Report document settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// Font resources.
    #[serde(default)]
    pub fonts: FontConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
        }
    }
}

fn default_output() -> String {
    "analysis_report.pdf".to_string()
}

/// Aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Number of pages in the top pages ranking.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Session duration definition.
    #[serde(default)]
    pub session_duration: SessionDurationPolicy,

    /// Field delimiter of the event log (a single character).
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            session_duration: SessionDurationPolicy::default(),
            delimiter: default_delimiter(),
        }
    }
}

impl AnalysisConfig {
    /// Delimiter as a byte. Validated by [`Config::validate`].
    pub fn delimiter_byte(&self) -> u8 {
        match self.delimiter.as_str() {
            "\\t" | "tab" => b'\t',
            other => other.bytes().next().unwrap_or(b','),
        }
    }
}

fn default_top_n() -> usize {
    5
}

fn default_delimiter() -> String {
    ",".to_string()
}

/// Chart canvas settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Canvas width in pixels.
    #[serde(default = "default_chart_width")]
    pub width: u32,

    /// Canvas height in pixels.
    #[serde(default = "default_chart_height")]
    pub height: u32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: default_chart_width(),
            height: default_chart_height(),
        }
    }
}

fn default_chart_width() -> u32 {
    1000
}

fn default_chart_height() -> u32 {
    1300
}

/// Report document settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Document title.
    #[serde(default = "default_title")]
    pub title: String,

    /// Display width of the chart in millimetres.
    #[serde(default = "default_image_width")]
    pub image_width_mm: f32,

    /// Display height of the chart in millimetres.
    #[serde(default = "default_image_height")]
    pub image_height_mm: f32,

    /// Maximum sessions listed individually.
    #[serde(default = "default_max_session_lines")]
    pub max_session_lines: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            image_width_mm: default_image_width(),
            image_height_mm: default_image_height(),
            max_session_lines: default_max_session_lines(),
        }
    }
}

fn default_title() -> String {
    "Web Traffic Analysis Report".to_string()
}

fn default_image_width() -> f32 {
    150.0
}

fn default_image_height() -> f32 {
    200.0
}

fn default_max_session_lines() -> usize {
    50
}

/// Font resources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontConfig {
    /// Font file tried first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred: Option<PathBuf>,

    /// Font files tried in order when the preferred one is unavailable.
    #[serde(default = "default_font_fallbacks")]
    pub fallbacks: Vec<PathBuf>,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            preferred: None,
            fallbacks: default_font_fallbacks(),
        }
    }
}

fn default_font_fallbacks() -> Vec<PathBuf> {
    vec![
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
        "/Library/Fonts/Arial.ttf",
        "C:/Windows/Fonts/arial.ttf",
        "C:/Windows/Fonts/calibri.ttf",
    ]
    .into_iter()
    .map(PathBuf::from)
    .collect()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        if self.analysis.top_n == 0 {
            bail!("analysis.top_n must be at least 1");
        }
        if !matches!(self.analysis.delimiter.as_str(), "\\t" | "tab")
            && self.analysis.delimiter.len() != 1
        {
            bail!(
                "analysis.delimiter must be a single ASCII character, got '{}'",
                self.analysis.delimiter
            );
        }
        if self.chart.width < 100 || self.chart.height < 100 {
            bail!("chart width and height must be at least 100 pixels");
        }
        if self.report.image_width_mm <= 0.0 || self.report.image_height_mm <= 0.0 {
            bail!("report image size must be positive");
        }
        Ok(())
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(top_n) = args.top_n {
            self.analysis.top_n = top_n;
        }
        if let Some(policy) = args.session_duration {
            self.analysis.session_duration = policy.into();
        }
        if let Some(ref delimiter) = args.delimiter {
            self.analysis.delimiter = delimiter.clone();
        }
        if let Some(ref font) = args.font {
            self.fonts.preferred = Some(font.clone());
        }
        if let Some(ref title) = args.title {
            self.report.title = title.clone();
        }
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
