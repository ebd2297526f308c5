//! Page layout for report documents.
//!
//! The layout engine knows nothing about analytics: it takes a flat list of
//! blocks and flows them top to bottom onto fixed-size pages, breaking
//! pages when a block does not fit. Text width is estimated from the font
//! size, which is enough to wrap lines for the faces the report uses.

use crate::error::{Error, Result};

/// Millimetres per typographic point.
pub const MM_PER_PT: f32 = 0.352_778;

/// Average glyph advance as a fraction of the font size.
const AVG_CHAR_WIDTH: f32 = 0.55;

/// Paper size and margins in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSetup {
    pub width_mm: f32,
    pub height_mm: f32,
    pub margin_mm: f32,
}

impl Default for PageSetup {
    /// US Letter with one-inch margins.
    fn default() -> Self {
        Self {
            width_mm: 215.9,
            height_mm: 279.4,
            margin_mm: 25.4,
        }
    }
}

impl PageSetup {
    pub fn content_width(&self) -> f32 {
        self.width_mm - 2.0 * self.margin_mm
    }

    pub fn content_height(&self) -> f32 {
        self.height_mm - 2.0 * self.margin_mm
    }
}

/// Paragraph styles available to report blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextStyle {
    Title,
    Heading1,
    Heading2,
    Body,
    /// Body text shifted right.
    Indented,
}

impl TextStyle {
    /// Font size in points.
    pub fn font_size(&self) -> f32 {
        match self {
            TextStyle::Title => 24.0,
            TextStyle::Heading1 => 18.0,
            TextStyle::Heading2 => 14.0,
            TextStyle::Body | TextStyle::Indented => 10.0,
        }
    }

    fn leading_mm(&self) -> f32 {
        self.font_size() * 1.2 * MM_PER_PT
    }

    fn space_before_mm(&self) -> f32 {
        match self {
            TextStyle::Heading1 => 12.0 * MM_PER_PT,
            TextStyle::Heading2 => 10.0 * MM_PER_PT,
            _ => 0.0,
        }
    }

    fn space_after_mm(&self) -> f32 {
        match self {
            TextStyle::Title => 30.0 * MM_PER_PT,
            TextStyle::Heading1 | TextStyle::Heading2 => 6.0 * MM_PER_PT,
            TextStyle::Body | TextStyle::Indented => 2.0 * MM_PER_PT,
        }
    }

    fn indent_mm(&self) -> f32 {
        match self {
            TextStyle::Indented => 30.0 * MM_PER_PT,
            _ => 0.0,
        }
    }

    fn is_section_heading(&self) -> bool {
        matches!(self, TextStyle::Heading1 | TextStyle::Heading2)
    }
}

/// A unit of document content.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Text { style: TextStyle, text: String },
    /// Vertical gap in points.
    Spacer(f32),
    /// Placeholder for the embedded image at a fixed display size.
    Image { width_mm: f32, height_mm: f32 },
}

impl Block {
    pub fn text(style: TextStyle, text: impl Into<String>) -> Self {
        Block::Text {
            style,
            text: text.into(),
        }
    }
}

/// Content positioned on a page. Coordinates are in millimetres from the
/// bottom-left corner, as PDF expects.
#[derive(Debug, Clone, PartialEq)]
pub enum Placed {
    Text {
        x_mm: f32,
        /// Baseline position.
        y_mm: f32,
        size_pt: f32,
        text: String,
    },
    Image {
        x_mm: f32,
        /// Bottom edge position.
        y_mm: f32,
        width_mm: f32,
        height_mm: f32,
    },
}

/// One laid-out page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Placed>,
}

/// Result of laying out a block list.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub pages: Vec<Page>,
    /// Section headings in document order.
    pub sections: Vec<String>,
}

/// Flow `blocks` onto pages.
pub fn layout(blocks: &[Block], setup: &PageSetup) -> Result<Layout> {
    if setup.content_width() <= 0.0 || setup.content_height() <= 0.0 {
        return Err(Error::render("layout", "page margins leave no content area"));
    }

    let mut flow = Flow::new(*setup);
    let mut sections = Vec::new();

    for block in blocks {
        match block {
            Block::Text { style, text } => {
                if style.is_section_heading() {
                    sections.push(text.clone());
                }
                flow.text(*style, text);
            }
            Block::Spacer(points) => flow.space(points * MM_PER_PT),
            Block::Image {
                width_mm,
                height_mm,
            } => flow.image(*width_mm, *height_mm)?,
        }
    }

    Ok(Layout {
        pages: flow.finish(),
        sections,
    })
}

/// Cursor state while flowing blocks.
struct Flow {
    setup: PageSetup,
    pages: Vec<Page>,
    current: Page,
    /// Distance consumed below the top margin on the current page.
    cursor: f32,
}

impl Flow {
    fn new(setup: PageSetup) -> Self {
        Self {
            setup,
            pages: Vec::new(),
            current: Page::default(),
            cursor: 0.0,
        }
    }

    fn remaining(&self) -> f32 {
        self.setup.content_height() - self.cursor
    }

    fn break_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.current));
        self.cursor = 0.0;
    }

    fn space(&mut self, amount: f32) {
        if self.cursor == 0.0 {
            return;
        }
        if amount >= self.remaining() {
            self.break_page();
        } else {
            self.cursor += amount;
        }
    }

    fn text(&mut self, style: TextStyle, text: &str) {
        self.space(style.space_before_mm());

        let size = style.font_size();
        let leading = style.leading_mm();
        let indent = style.indent_mm();
        let max_chars = chars_per_line(self.setup.content_width() - indent, size);

        for line in wrap(text, max_chars) {
            if leading > self.remaining() {
                self.break_page();
            }

            let x = if style == TextStyle::Title {
                let width = estimated_width(&line, size);
                self.setup.margin_mm + ((self.setup.content_width() - width) / 2.0).max(0.0)
            } else {
                self.setup.margin_mm + indent
            };
            let baseline =
                self.setup.height_mm - self.setup.margin_mm - self.cursor - size * MM_PER_PT;

            self.current.items.push(Placed::Text {
                x_mm: x,
                y_mm: baseline,
                size_pt: size,
                text: line,
            });
            self.cursor += leading;
        }

        self.space(style.space_after_mm());
    }

    fn image(&mut self, width: f32, height: f32) -> Result<()> {
        if width > self.setup.content_width() || height > self.setup.content_height() {
            return Err(Error::render(
                "layout",
                format!(
                    "image of {:.0}x{:.0} mm does not fit the page content area",
                    width, height
                ),
            ));
        }

        if height > self.remaining() {
            self.break_page();
        }

        let x = self.setup.margin_mm + (self.setup.content_width() - width) / 2.0;
        let y = self.setup.height_mm - self.setup.margin_mm - self.cursor - height;
        self.current.items.push(Placed::Image {
            x_mm: x,
            y_mm: y,
            width_mm: width,
            height_mm: height,
        });
        self.cursor += height;

        Ok(())
    }

    fn finish(mut self) -> Vec<Page> {
        if !self.current.items.is_empty() || self.pages.is_empty() {
            self.pages.push(self.current);
        }
        self.pages
    }
}

fn chars_per_line(width_mm: f32, size_pt: f32) -> usize {
    let char_width = size_pt * AVG_CHAR_WIDTH * MM_PER_PT;
    ((width_mm / char_width).floor() as usize).max(1)
}

fn estimated_width(text: &str, size_pt: f32) -> f32 {
    text.chars().count() as f32 * size_pt * AVG_CHAR_WIDTH * MM_PER_PT
}

/// Word-wrap `text` to at most `max_chars` per line.
///
/// Leading whitespace of the original text is kept on the first line.
/// Words longer than a line are split.
fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let body = text.trim_start();
    let prefix = &text[..text.len() - body.len()];

    let mut lines = Vec::new();
    let mut line = prefix.to_string();
    let mut line_len = line.chars().count();
    let mut has_words = false;

    for word in body.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();

        loop {
            let sep = usize::from(has_words);
            if line_len + sep + word.len() <= max_chars {
                if has_words {
                    line.push(' ');
                }
                line.extend(word.iter());
                line_len += sep + word.len();
                has_words = true;
                break;
            }

            if has_words {
                lines.push(std::mem::take(&mut line));
                line_len = 0;
                has_words = false;
                continue;
            }

            // Word alone is too long for the line
            let room = max_chars.saturating_sub(line_len).max(1);
            let rest = word.split_off(room.min(word.len()));
            line.extend(word.iter());
            lines.push(std::mem::take(&mut line));
            line_len = 0;
            word = rest;
            if word.is_empty() {
                break;
            }
        }
    }

    if has_words || lines.is_empty() {
        lines.push(line);
    }

    lines
}
