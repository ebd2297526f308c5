//! Recommendation text synthesis.
//!
//! Turns aggregate values into templated narrative text. No thresholds or
//! anomaly detection are applied; the output is presentation text laid out
//! by the report assembler in three fixed sections.

use crate::models::{DailyVisitCounts, TopPages};
use serde::Serialize;

/// Prefix marking a line as emphasis. The report indents these lines.
pub const EMPHASIS_MARKER: &str = "->";

const PAGE_SUGGESTIONS: &[&str] = &[
    "Optimize page load speed",
    "Improve the user interface",
    "Add interactive features to keep visitors on the page longer",
];

const GENERAL_SUGGESTIONS: &[&str] = &[
    "Run A/B tests to optimize the interface",
    "Analyze and improve SEO for rarely visited pages",
    "Add more detailed user behavior tracking",
    "Build a content marketing strategy to grow traffic",
];

/// `"1 visit"`, `"2 visits"`.
pub fn visits_text(count: u64) -> String {
    if count == 1 {
        "1 visit".to_string()
    } else {
        format!("{} visits", count)
    }
}

/// A single line of recommendation text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TextBlock {
    pub text: String,
}

impl TextBlock {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    fn emphasis(text: impl AsRef<str>) -> Self {
        Self::new(format!("{} {}", EMPHASIS_MARKER, text.as_ref()))
    }

    /// Whether the line starts with [`EMPHASIS_MARKER`].
    pub fn is_emphasis(&self) -> bool {
        self.text.starts_with(EMPHASIS_MARKER)
    }
}

/// A titled group of recommendation lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecommendationSection {
    pub heading: String,
    pub blocks: Vec<TextBlock>,
}

/// The three recommendation sections, in report order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendations {
    pub daily: RecommendationSection,
    pub pages: RecommendationSection,
    pub general: RecommendationSection,
}

impl Recommendations {
    /// Sections in the order they appear in the report.
    pub fn sections(&self) -> [&RecommendationSection; 3] {
        [&self.daily, &self.pages, &self.general]
    }
}

/// Build the recommendation text from the aggregates.
pub fn synthesize(daily_visits: &DailyVisitCounts, top_pages: &TopPages) -> Recommendations {
    Recommendations {
        daily: daily_section(daily_visits),
        pages: pages_section(top_pages),
        general: RecommendationSection {
            heading: "3. General suggestions for improving the website:".to_string(),
            blocks: GENERAL_SUGGESTIONS
                .iter()
                .map(|s| TextBlock::new(format!("   - {}", s)))
                .collect(),
        },
    }
}

fn daily_section(daily_visits: &DailyVisitCounts) -> RecommendationSection {
    let mut blocks: Vec<TextBlock> = daily_visits
        .iter()
        .map(|(date, count)| TextBlock::new(format!("- {}: {}", date, visits_text(*count))))
        .collect();

    match (daily_visits.busiest(), daily_visits.quietest()) {
        (Some((busy_date, busy)), Some((quiet_date, quiet))) => {
            blocks.push(TextBlock::emphasis(format!(
                "Observation: daily visits ranged from {} on {} to {} on {}.",
                quiet, quiet_date, busy, busy_date
            )));
            blocks.push(TextBlock::emphasis(
                "Suggestion: review the low-traffic days to find the cause and plan improvements.",
            ));
        }
        _ => {
            blocks.push(TextBlock::new("- No visits were recorded."));
            blocks.push(TextBlock::emphasis(
                "Suggestion: verify that event tracking is enabled on the site.",
            ));
        }
    }

    RecommendationSection {
        heading: "1. Daily visit analysis:".to_string(),
        blocks,
    }
}

fn pages_section(top_pages: &TopPages) -> RecommendationSection {
    let mut blocks: Vec<TextBlock> = top_pages
        .iter()
        .map(|p| TextBlock::new(format!("- {}: {}", p.page_url, visits_text(p.visits))))
        .collect();

    if blocks.is_empty() {
        blocks.push(TextBlock::new("- No page visits were recorded."));
    }

    blocks.push(TextBlock::emphasis("Suggested improvements:"));
    blocks.extend(
        PAGE_SUGGESTIONS
            .iter()
            .map(|s| TextBlock::new(format!("   - {}", s))),
    );

    RecommendationSection {
        heading: "2. Most visited pages:".to_string(),
        blocks,
    }
}
