//! Report document assembly.
//!
//! This module turns a metrics snapshot, the rendered chart and the
//! synthesized recommendations into a paginated PDF. Content is first mapped
//! to layout blocks, then laid out, then serialized. Any failure along the
//! way is reported as a single render error and no bytes are returned.

use super::layout::{layout, Block, PageSetup, TextStyle};
use super::pdf::write_pdf;
use crate::analysis::recommendations::visits_text;
use crate::analysis::Recommendations;
use crate::chart::ChartImage;
use crate::error::{Error, Result};
use crate::fonts::FontSet;
use crate::models::Metrics;
use image::GenericImageView;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use tracing::{error, info};

/// Layout settings for the report document.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSettings {
    /// Title shown at the top of the first page.
    pub title: String,
    /// Display width of the embedded chart.
    pub image_width_mm: f32,
    /// Display height of the embedded chart.
    pub image_height_mm: f32,
    /// Session lines listed before the rest are summarized.
    pub max_session_lines: usize,
    pub page: PageSetup,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            title: "Web Traffic Analysis Report".to_string(),
            image_width_mm: 150.0,
            image_height_mm: 200.0,
            max_session_lines: 50,
            page: PageSetup::default(),
        }
    }
}

/// A finished report.
#[derive(Debug, Clone)]
pub struct ReportDocument {
    /// Serialized PDF.
    pub bytes: Vec<u8>,
    pub page_count: usize,
    /// Section headings in document order.
    pub sections: Vec<String>,
}

impl ReportDocument {
    /// Write the PDF to disk.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, &self.bytes)?;
        info!("Report saved to: {}", path.display());
        Ok(())
    }
}

/// Lays out and serializes report documents.
#[derive(Debug, Clone)]
pub struct ReportAssembler {
    settings: ReportSettings,
    fonts: FontSet,
}

impl ReportAssembler {
    pub fn new(settings: ReportSettings, fonts: FontSet) -> Self {
        Self { settings, fonts }
    }

    pub fn settings(&self) -> &ReportSettings {
        &self.settings
    }

    /// Build the complete PDF document.
    pub fn assemble(
        &self,
        metrics: &Metrics,
        chart: &ChartImage,
        recommendations: &Recommendations,
    ) -> Result<ReportDocument> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.try_assemble(metrics, chart, recommendations)
        }));

        let result = match outcome {
            Ok(result) => result.map_err(into_render_error),
            Err(_) => Err(Error::render("document", "PDF backend panicked")),
        };

        if let Err(ref e) = result {
            error!("Report assembly failed: {}", e);
        }
        result
    }

    fn try_assemble(
        &self,
        metrics: &Metrics,
        chart: &ChartImage,
        recommendations: &Recommendations,
    ) -> Result<ReportDocument> {
        let pixels = chart.decode()?;
        if pixels.dimensions().0 == 0 || pixels.dimensions().1 == 0 {
            return Err(Error::render("document", "chart image is empty"));
        }

        let blocks = self.build_blocks(metrics, recommendations);
        let laid_out = layout(&blocks, &self.settings.page)?;
        let bytes = write_pdf(
            &laid_out,
            &self.settings.title,
            &self.settings.page,
            &self.fonts,
            &pixels,
        )?;

        info!(
            "Assembled report: {} page(s), {} bytes",
            laid_out.pages.len(),
            bytes.len()
        );

        Ok(ReportDocument {
            bytes,
            page_count: laid_out.pages.len(),
            sections: laid_out.sections,
        })
    }

    /// Map report content to layout blocks.
    pub fn build_blocks(&self, metrics: &Metrics, recommendations: &Recommendations) -> Vec<Block> {
        let mut blocks = vec![
            Block::text(TextStyle::Title, self.settings.title.as_str()),
            Block::Spacer(20.0),
            Block::text(TextStyle::Heading1, "1. Analysis Results"),
        ];

        self.push_daily_visits(&mut blocks, metrics);
        self.push_top_pages(&mut blocks, metrics);
        self.push_sessions(&mut blocks, metrics);

        blocks.push(Block::text(TextStyle::Heading1, "2. Data Visualization"));
        blocks.push(Block::Image {
            width_mm: self.settings.image_width_mm,
            height_mm: self.settings.image_height_mm,
        });
        blocks.push(Block::Spacer(40.0));

        blocks.push(Block::text(TextStyle::Heading1, "3. Recommendations"));
        for section in recommendations.sections() {
            blocks.push(Block::text(TextStyle::Body, section.heading.as_str()));
            for line in &section.blocks {
                let style = if line.is_emphasis() {
                    TextStyle::Indented
                } else {
                    TextStyle::Body
                };
                blocks.push(Block::text(style, line.text.as_str()));
            }
            blocks.push(Block::Spacer(10.0));
        }

        blocks
    }

    fn push_daily_visits(&self, blocks: &mut Vec<Block>, metrics: &Metrics) {
        blocks.push(Block::text(TextStyle::Heading2, "1.1 Daily visits"));
        blocks.push(Block::text(
            TextStyle::Body,
            format!("Total visits: {}", metrics.daily_visits.total()),
        ));

        if metrics.daily_visits.is_empty() {
            blocks.push(Block::text(TextStyle::Indented, "- No visits recorded"));
        }
        for (date, count) in metrics.daily_visits.iter() {
            blocks.push(Block::text(
                TextStyle::Indented,
                format!("- {}: {}", date, visits_text(*count)),
            ));
        }
        blocks.push(Block::Spacer(12.0));
    }

    fn push_top_pages(&self, blocks: &mut Vec<Block>, metrics: &Metrics) {
        blocks.push(Block::text(TextStyle::Heading2, "1.2 Most visited pages"));

        if metrics.top_pages.is_empty() {
            blocks.push(Block::text(TextStyle::Indented, "- No page visits recorded"));
        }
        for page in metrics.top_pages.iter() {
            blocks.push(Block::text(
                TextStyle::Indented,
                format!("- {}: {}", page.page_url, visits_text(page.visits)),
            ));
        }
        blocks.push(Block::Spacer(12.0));
    }

    fn push_sessions(&self, blocks: &mut Vec<Block>, metrics: &Metrics) {
        blocks.push(Block::text(TextStyle::Heading2, "1.3 Session duration"));
        blocks.push(Block::text(
            TextStyle::Body,
            format!("Total sessions: {}", metrics.session_count),
        ));

        let average = match metrics.average_session_duration {
            Some(avg) => format!("Average session duration: {:.2} seconds", avg),
            None => "Average session duration: not available (no sessions)".to_string(),
        };
        blocks.push(Block::text(TextStyle::Body, average));
        blocks.push(Block::text(
            TextStyle::Body,
            format!(
                "Duration measured as {} ({})",
                metrics.session_duration_policy.description(),
                metrics.policy_version
            ),
        ));

        let limit = self.settings.max_session_lines;
        for (session_id, duration) in metrics.session_durations.iter().take(limit) {
            blocks.push(Block::text(
                TextStyle::Indented,
                format!("- Session {}: {:.2} seconds", session_id, duration),
            ));
        }
        let hidden = metrics.session_durations.len().saturating_sub(limit);
        if hidden > 0 {
            blocks.push(Block::text(
                TextStyle::Indented,
                format!(
                    "... and {} more {}",
                    hidden,
                    if hidden == 1 { "session" } else { "sessions" }
                ),
            ));
        }
        blocks.push(Block::Spacer(12.0));
    }
}

/// Collapse any failure inside assembly into a render error.
fn into_render_error(err: Error) -> Error {
    match err {
        Error::Render { .. } => err,
        other => Error::render("document", other.to_string()),
    }
}

/// Serialize the metrics snapshot as pretty JSON.
pub fn generate_json_report(metrics: &Metrics) -> anyhow::Result<String> {
    serde_json::to_string_pretty(metrics).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{synthesize, Aggregator};
    use crate::chart::ChartRenderer;
    use crate::loader::EventLoader;
    use crate::models::EventTable;

    const SAMPLE: &str = "\
session_id,page_url,timestamp
s1,/home,2024-01-01 10:00:00
s1,/cart,2024-01-01 10:05:00
s2,/home,2024-01-02 09:00:00
";

    fn inputs(table: &EventTable) -> (Metrics, ChartImage, Recommendations) {
        let metrics = Aggregator::default().metrics(table);
        let chart = ChartRenderer::without_text(500, 650)
            .render(&metrics.daily_visits, &metrics.top_pages)
            .unwrap();
        let recs = synthesize(&metrics.daily_visits, &metrics.top_pages);
        (metrics, chart, recs)
    }

    fn sample_table() -> EventTable {
        EventLoader::new().load_reader(SAMPLE.as_bytes()).unwrap()
    }

    fn assembler() -> ReportAssembler {
        ReportAssembler::new(ReportSettings::default(), FontSet::builtin())
    }

    #[test]
    fn test_assemble_produces_pdf() {
        let (metrics, chart, recs) = inputs(&sample_table());
        let doc = assembler().assemble(&metrics, &chart, &recs).unwrap();

        assert!(doc.bytes.starts_with(b"%PDF"));
        assert!(doc.page_count >= 2);
    }

    #[test]
    fn test_section_order() {
        let (metrics, chart, recs) = inputs(&sample_table());
        let doc = assembler().assemble(&metrics, &chart, &recs).unwrap();

        assert_eq!(
            doc.sections,
            vec![
                "1. Analysis Results",
                "1.1 Daily visits",
                "1.2 Most visited pages",
                "1.3 Session duration",
                "2. Data Visualization",
                "3. Recommendations",
            ]
        );
    }

    #[test]
    fn test_assemble_is_repeatable() {
        let (metrics, chart, recs) = inputs(&sample_table());
        let first = assembler().assemble(&metrics, &chart, &recs).unwrap();
        let second = assembler().assemble(&metrics, &chart, &recs).unwrap();

        assert_eq!(first.page_count, second.page_count);
        assert_eq!(first.sections, second.sections);
    }

    #[test]
    fn test_assemble_empty_metrics() {
        let (metrics, chart, recs) = inputs(&EventTable::default());
        let doc = assembler().assemble(&metrics, &chart, &recs).unwrap();

        assert!(doc.bytes.starts_with(b"%PDF"));
        assert_eq!(doc.sections.len(), 6);
    }

    #[test]
    fn test_blocks_contain_totals() {
        let (metrics, _, recs) = inputs(&sample_table());
        let blocks = assembler().build_blocks(&metrics, &recs);

        let texts: Vec<&str> = blocks
            .iter()
            .filter_map(|b| match b {
                Block::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();

        assert!(texts.contains(&"Total visits: 3"));
        assert!(texts.contains(&"Total sessions: 2"));
        assert!(texts.contains(&"Average session duration: 150.00 seconds"));
        assert!(texts.contains(&"- Session s1: 300.00 seconds"));
        assert!(texts.contains(&"- /home: 2 visits"));
    }

    #[test]
    fn test_emphasis_lines_are_indented() {
        let (metrics, _, recs) = inputs(&sample_table());
        let blocks = assembler().build_blocks(&metrics, &recs);

        for block in &blocks {
            if let Block::Text { style, text } = block {
                if text.starts_with(crate::analysis::recommendations::EMPHASIS_MARKER) {
                    assert_eq!(*style, TextStyle::Indented);
                }
            }
        }
    }

    #[test]
    fn test_session_lines_are_capped() {
        let csv: String = std::iter::once("session_id,page_url,timestamp".to_string())
            .chain((0..10).map(|i| format!("s{},/p,2024-01-01 10:00:00", i)))
            .collect::<Vec<_>>()
            .join("\n");
        let table = EventLoader::new().load_reader(csv.as_bytes()).unwrap();
        let (metrics, _, recs) = inputs(&table);

        let settings = ReportSettings {
            max_session_lines: 3,
            ..ReportSettings::default()
        };
        let blocks = ReportAssembler::new(settings, FontSet::builtin()).build_blocks(&metrics, &recs);

        let session_lines = blocks
            .iter()
            .filter(|b| matches!(b, Block::Text { text, .. } if text.starts_with("- Session")))
            .count();
        assert_eq!(session_lines, 3);
        assert!(blocks
            .iter()
            .any(|b| matches!(b, Block::Text { text, .. } if text == "... and 7 more sessions")));
    }

    #[test]
    fn test_single_hidden_session_is_singular() {
        let csv = "session_id,page_url,timestamp\ns1,/p,2024-01-01 10:00:00\ns2,/p,2024-01-01 11:00:00\n";
        let table = EventLoader::new().load_reader(csv.as_bytes()).unwrap();
        let (metrics, _, recs) = inputs(&table);

        let settings = ReportSettings {
            max_session_lines: 1,
            ..ReportSettings::default()
        };
        let blocks = ReportAssembler::new(settings, FontSet::builtin()).build_blocks(&metrics, &recs);
        assert!(blocks
            .iter()
            .any(|b| matches!(b, Block::Text { text, .. } if text == "... and 1 more session")));
    }

    #[test]
    fn test_assemble_with_embedded_font() {
        let Some(fonts) = crate::fonts::system_fonts() else {
            eprintln!("no system font available; skipping");
            return;
        };
        let renderer = ChartRenderer::new(600, 780, &fonts);
        let assembler = ReportAssembler::new(ReportSettings::default(), fonts);

        for table in [sample_table(), EventTable::default()] {
            let metrics = Aggregator::default().metrics(&table);
            let chart = renderer
                .render(&metrics.daily_visits, &metrics.top_pages)
                .unwrap();
            let recs = synthesize(&metrics.daily_visits, &metrics.top_pages);

            let doc = assembler.assemble(&metrics, &chart, &recs).unwrap();
            assert!(doc.bytes.starts_with(b"%PDF"));
            assert!(doc.page_count >= 2);
            assert_eq!(doc.sections.len(), 6);
        }
    }

    #[test]
    fn test_oversized_image_reports_render_error() {
        let (metrics, chart, recs) = inputs(&sample_table());
        let settings = ReportSettings {
            image_width_mm: 400.0,
            ..ReportSettings::default()
        };

        let err = ReportAssembler::new(settings, FontSet::builtin())
            .assemble(&metrics, &chart, &recs)
            .unwrap_err();
        assert!(matches!(err, Error::Render { .. }));
    }

    #[test]
    fn test_corrupt_chart_reports_render_error() {
        let (metrics, _, recs) = inputs(&sample_table());
        let chart = ChartImage {
            width: 10,
            height: 10,
            png: b"not a png".to_vec(),
        };

        let err = assembler().assemble(&metrics, &chart, &recs).unwrap_err();
        assert!(matches!(err, Error::Render { .. }));
    }

    #[test]
    fn test_generate_json_report() {
        let (metrics, _, _) = inputs(&sample_table());
        let json = generate_json_report(&metrics).unwrap();

        assert!(json.contains("\"daily_visits\""));
        assert!(json.contains("\"2024-01-01\": 2"));
        assert!(json.contains("\"top_pages\""));
        assert!(json.contains("\"average_session_duration\": 150.0"));
        assert!(json.contains("\"session_duration_policy\": \"span\""));
    }
}
