//! End-to-end report pipeline.
//!
//! Runs load → aggregate → {chart, recommendations} → assemble for one
//! request. The pipeline only holds settings; every run builds its own
//! table, metrics and document, so one pipeline can serve many requests.

use crate::analysis::{synthesize, Aggregator, Recommendations, DEFAULT_TOP_N};
use crate::chart::{ChartImage, ChartRenderer, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::error::Result;
use crate::fonts::FontSet;
use crate::loader::EventLoader;
use crate::models::{Metrics, SessionDurationPolicy};
use crate::report::{ReportAssembler, ReportDocument, ReportSettings};
use std::io::Read;
use std::path::Path;
use tracing::info;

/// Settings for one pipeline.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub policy: SessionDurationPolicy,
    pub top_n: usize,
    pub delimiter: u8,
    pub chart_width: u32,
    pub chart_height: u32,
    pub report: ReportSettings,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            policy: SessionDurationPolicy::default(),
            top_n: DEFAULT_TOP_N,
            delimiter: b',',
            chart_width: DEFAULT_WIDTH,
            chart_height: DEFAULT_HEIGHT,
            report: ReportSettings::default(),
        }
    }
}

impl From<&crate::config::Config> for PipelineOptions {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            policy: config.analysis.session_duration,
            top_n: config.analysis.top_n,
            delimiter: config.analysis.delimiter_byte(),
            chart_width: config.chart.width,
            chart_height: config.chart.height,
            report: ReportSettings {
                title: config.report.title.clone(),
                image_width_mm: config.report.image_width_mm,
                image_height_mm: config.report.image_height_mm,
                max_session_lines: config.report.max_session_lines,
                ..ReportSettings::default()
            },
        }
    }
}

/// Everything produced by one full run.
#[derive(Debug, Clone)]
pub struct ReportOutput {
    /// Rows in the loaded table.
    pub rows: usize,
    pub metrics: Metrics,
    pub chart: ChartImage,
    pub recommendations: Recommendations,
    pub document: ReportDocument,
}

/// Composes the pipeline stages.
#[derive(Debug, Clone)]
pub struct ReportPipeline {
    loader: EventLoader,
    aggregator: Aggregator,
    charts: ChartRenderer,
    assembler: ReportAssembler,
}

impl ReportPipeline {
    /// Build a pipeline. `fonts` is resolved once by the caller.
    pub fn new(options: PipelineOptions, fonts: FontSet) -> Self {
        Self {
            loader: EventLoader::for_policy(options.policy).with_delimiter(options.delimiter),
            aggregator: Aggregator::new(options.policy, options.top_n),
            charts: ChartRenderer::new(options.chart_width, options.chart_height, &fonts),
            assembler: ReportAssembler::new(options.report, fonts),
        }
    }

    /// Load a log file and compute its metrics.
    pub fn analyze_path(&self, path: &Path) -> Result<(usize, Metrics)> {
        let table = self.loader.load_path(path)?;
        Ok((table.len(), self.aggregator.metrics(&table)))
    }

    /// Load a log stream and compute its metrics.
    pub fn analyze_reader<R: Read>(&self, reader: R) -> Result<(usize, Metrics)> {
        let table = self.loader.load_reader(reader)?;
        Ok((table.len(), self.aggregator.metrics(&table)))
    }

    /// Render only the chart for `metrics`.
    pub fn chart(&self, metrics: &Metrics) -> Result<ChartImage> {
        self.charts
            .render(&metrics.daily_visits, &metrics.top_pages)
    }

    /// Render the chart, the recommendations and the document for `metrics`.
    pub fn render(&self, rows: usize, metrics: Metrics) -> Result<ReportOutput> {
        let chart = self.chart(&metrics)?;
        let recommendations = synthesize(&metrics.daily_visits, &metrics.top_pages);
        let document = self.assembler.assemble(&metrics, &chart, &recommendations)?;

        Ok(ReportOutput {
            rows,
            metrics,
            chart,
            recommendations,
            document,
        })
    }

    /// Run every stage over a log file.
    pub fn run(&self, path: &Path) -> Result<ReportOutput> {
        let (rows, metrics) = self.analyze_path(path)?;
        info!(
            "Analyzed {} rows: {} days, {} sessions",
            rows,
            metrics.daily_visits.len(),
            metrics.session_count
        );
        self.render(rows, metrics)
    }
}
