//! Top-to-bottom layout of a single incident report.
//!
//! The layout is a single pass over the report: logo, title, status badge,
//! metadata lines, the word-wrapped narrative and finally the risk table.  A
//! [`PageCursor`] tracks the baseline of the next element and starts a new
//! page whenever it drops below the minimum for the element being placed, so no
//! line and no table row is ever split across pages.
//!
//! Wrapping counts characters instead of measuring glyph widths.  With
//! Helvetica at 10 pt a budget of 95 characters stays inside the A4 text
//! column for ordinary Norwegian prose.

use std::path::Path;

use log::{debug, warn};

use crate::images;
use crate::model::{CaseStatus, ReportMetadata};
use crate::surface::{Rect, Rgb, Surface, TextStyle};

const POINTS_PER_CM: f64 = 72.0 / 2.54;

fn cm(value: f64) -> f64 {
    value * POINTS_PER_CM
}

/// Geometry and typography used by [`render_report`].
///
/// Every length is in PDF points.  The defaults give the A4 layout of the
/// smart reports.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutConfig {
    pub page_width: f64,
    pub page_height: f64,
    pub left_margin: f64,
    pub top_margin: f64,
    /// Lowest baseline allowed for text lines before a page break.
    pub text_min_y: f64,
    /// Lowest top edge allowed for a table row before a page break.
    pub table_min_y: f64,
    pub title_advance: f64,
    pub badge_width: f64,
    pub badge_height: f64,
    pub badge_radius: f64,
    pub badge_advance: f64,
    pub meta_leading: f64,
    pub meta_gap: f64,
    pub heading_advance: f64,
    pub body_leading: f64,
    /// Extra space after each paragraph.
    pub paragraph_gap: f64,
    /// Maximum characters per wrapped body line.
    pub line_budget: usize,
    pub column_widths: [f64; 3],
    pub row_height: f64,
    pub cell_padding: f64,
    /// Maximum characters shown per table cell.
    pub cell_char_limit: usize,
    pub table_gap: f64,
    pub logo_size: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        let body_leading = 14.0;
        Self {
            page_width: 595.2756,
            page_height: 841.8898,
            left_margin: cm(2.0),
            top_margin: cm(2.2),
            text_min_y: cm(2.5),
            table_min_y: cm(3.0),
            title_advance: 18.0,
            badge_width: 145.0,
            badge_height: 16.0,
            badge_radius: 3.0,
            badge_advance: 26.0,
            meta_leading: 14.0,
            meta_gap: 6.0,
            heading_advance: 14.0,
            body_leading,
            paragraph_gap: body_leading / 2.0,
            line_budget: 95,
            column_widths: [cm(3.0), cm(9.0), cm(5.0)],
            row_height: 16.0,
            cell_padding: 4.0,
            cell_char_limit: 120,
            table_gap: 6.0,
            logo_size: cm(2.5),
        }
    }
}

impl LayoutConfig {
    /// Baseline of the first element on every page.
    pub fn page_top(&self) -> f64 {
        self.page_height - self.top_margin
    }

    pub fn table_width(&self) -> f64 {
        self.column_widths.iter().sum()
    }

    fn logo_rect(&self) -> Rect {
        Rect::new(
            self.page_width - cm(4.0),
            self.page_height - cm(3.0),
            self.logo_size,
            self.logo_size,
        )
    }
}

pub const HEADER_ROW_BACKGROUND: Rgb = Rgb::grey(0.827);
pub const BODY_ROW_BACKGROUND: Rgb = Rgb::grey(0.961);
const CELL_BORDER: Rgb = Rgb::BLACK;

const TITLE_STYLE: TextStyle = TextStyle::bold(14);
const HEADING_STYLE: TextStyle = TextStyle::bold(12);
const META_STYLE: TextStyle = TextStyle::regular(10);
const BODY_STYLE: TextStyle = TextStyle::regular(10);
const CELL_STYLE: TextStyle = TextStyle::regular(9);
const BADGE_STYLE: TextStyle = TextStyle::bold(9).with_color(Rgb::WHITE);

/// Coloured status indicator drawn under the title.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusBadge {
    OpenCase,
    UnderReview,
    Resolved,
}

impl StatusBadge {
    pub fn for_status(status: CaseStatus) -> Self {
        match status {
            CaseStatus::Open => Self::OpenCase,
            CaseStatus::Processing => Self::UnderReview,
            CaseStatus::Closed => Self::Resolved,
        }
    }

    /// Label printed inside the badge.
    pub fn label(self) -> &'static str {
        match self {
            Self::OpenCase => "Åpen sak",
            Self::UnderReview => "Under behandling",
            Self::Resolved => "Løst",
        }
    }

    /// Fill colour: red, amber or green.
    pub fn color(self) -> Rgb {
        match self {
            Self::OpenCase => Rgb::new(1.0, 0.0, 0.0),
            Self::UnderReview => Rgb::new(1.0, 0.8, 0.0),
            Self::Resolved => Rgb::new(0.0, 0.6, 0.0),
        }
    }
}

/// Vertical position of the next element, owned by one render call.
#[derive(Clone, Debug)]
pub struct PageCursor {
    y: f64,
    page: usize,
    top: f64,
}

impl PageCursor {
    pub fn new(config: &LayoutConfig) -> Self {
        Self {
            y: config.page_top(),
            page: 0,
            top: config.page_top(),
        }
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    /// Zero-based index of the current page.
    pub fn page(&self) -> usize {
        self.page
    }

    pub fn advance(&mut self, distance: f64) {
        self.y -= distance;
    }

    /// Starts a new page when the cursor sits below `min_y`.
    ///
    /// Returns `true` if a page break happened.
    pub fn break_if_below<S: Surface + ?Sized>(&mut self, surface: &mut S, min_y: f64) -> bool {
        if self.y >= min_y {
            return false;
        }
        surface.new_page();
        self.page += 1;
        self.y = self.top;
        debug!("page break to page {}", self.page + 1);
        true
    }
}

/// Outcome of a layout pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LayoutSummary {
    pub pages: usize,
    pub body_lines: usize,
    pub table_rows: usize,
    pub logo_drawn: bool,
}

/// Greedily packs the words of one paragraph into lines of at most `budget` characters.
///
/// A word longer than the budget is placed on a line of its own.  Blank
/// paragraphs produce no lines.
pub fn wrap_paragraph(paragraph: &str, budget: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut buffer = String::new();

    for word in paragraph.split_whitespace() {
        if buffer.is_empty() {
            buffer.push_str(word);
        } else if buffer.chars().count() + 1 + word.chars().count() <= budget {
            buffer.push(' ');
            buffer.push_str(word);
        } else {
            lines.push(std::mem::take(&mut buffer));
            buffer.push_str(word);
        }
    }

    if !buffer.is_empty() {
        lines.push(buffer);
    }

    lines
}

fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

/// Lays out `metadata` on `surface`.
///
/// The surface is left on the last page; finishing the document is the
/// caller's job.  `logo` takes precedence over the path stored in the metadata.
pub fn render_report<S: Surface + ?Sized>(
    surface: &mut S,
    metadata: &ReportMetadata,
    logo: Option<&Path>,
    config: &LayoutConfig,
) -> LayoutSummary {
    let mut cursor = PageCursor::new(config);
    let mut summary = LayoutSummary::default();
    let x = config.left_margin;

    if let Some(path) = logo.or_else(|| metadata.logo()) {
        summary.logo_drawn = draw_logo(surface, path, config);
    }

    let title = if metadata.title().trim().is_empty() {
        "HMS Smartrapport"
    } else {
        metadata.title()
    };
    surface.draw_text(title, x, cursor.y(), TITLE_STYLE);
    cursor.advance(config.title_advance);

    draw_badge(surface, StatusBadge::for_status(metadata.status()), x, cursor.y(), config);
    cursor.advance(config.badge_advance);

    let language = if metadata.language().is_empty() {
        "NO".to_string()
    } else {
        metadata.language().to_uppercase()
    };
    let meta_lines = [
        format!("Kategori: {}", metadata.category()),
        format!("Dato: {}", metadata.date()),
        format!("Opprettet av: {}", metadata.created_by()),
        format!("Språk: {}", language),
    ];
    for line in &meta_lines {
        cursor.break_if_below(surface, config.text_min_y);
        surface.draw_text(line, x, cursor.y(), META_STYLE);
        cursor.advance(config.meta_leading);
        cursor.break_if_below(surface, config.text_min_y);
    }
    cursor.advance(config.meta_gap);
    cursor.break_if_below(surface, config.text_min_y);

    if !metadata.body_text().trim().is_empty() {
        surface.draw_text("Rapporttekst:", x, cursor.y(), HEADING_STYLE);
        cursor.advance(config.heading_advance);
        cursor.break_if_below(surface, config.text_min_y);
        summary.body_lines = draw_body(surface, &mut cursor, metadata.body_text(), config);
    }

    let rows = metadata.risk_rows();
    if !rows.is_empty() {
        cursor.break_if_below(surface, config.text_min_y);
        surface.draw_text("Risikovurdering:", x, cursor.y(), HEADING_STYLE);
        cursor.advance(config.heading_advance + 2.0);
        summary.table_rows = draw_table(surface, &mut cursor, rows, config);
    }

    summary.pages = cursor.page() + 1;
    summary
}

fn draw_logo<S: Surface + ?Sized>(surface: &mut S, path: &Path, config: &LayoutConfig) -> bool {
    if !path.is_file() {
        debug!("logo {} not found, skipping", path.display());
        return false;
    }

    let image = match images::decode_image_from_path(path) {
        Ok(image) => image,
        Err(err) => {
            warn!("skipping logo {}: {}", path.display(), err);
            return false;
        }
    };

    match surface.draw_image(&image, config.logo_rect()) {
        Ok(()) => true,
        Err(err) => {
            warn!("failed to draw logo {}: {}", path.display(), err);
            false
        }
    }
}

fn draw_badge<S: Surface + ?Sized>(
    surface: &mut S,
    badge: StatusBadge,
    x: f64,
    y: f64,
    config: &LayoutConfig,
) {
    let rect = Rect::new(x, y - 12.0, config.badge_width, config.badge_height);
    surface.fill_rounded_rect(rect, config.badge_radius, badge.color());
    surface.draw_text(badge.label(), x + 6.0, y - 9.0, BADGE_STYLE);
}

fn draw_body<S: Surface + ?Sized>(
    surface: &mut S,
    cursor: &mut PageCursor,
    text: &str,
    config: &LayoutConfig,
) -> usize {
    let mut drawn = 0;

    for paragraph in text.lines() {
        let lines = wrap_paragraph(paragraph, config.line_budget);
        if lines.is_empty() {
            cursor.advance(config.body_leading / 2.0);
            cursor.break_if_below(surface, config.text_min_y);
            continue;
        }

        for line in &lines {
            surface.draw_text(line, config.left_margin, cursor.y(), BODY_STYLE);
            drawn += 1;
            cursor.advance(config.body_leading);
            cursor.break_if_below(surface, config.text_min_y);
        }

        cursor.advance(config.paragraph_gap);
        cursor.break_if_below(surface, config.text_min_y);
    }

    drawn
}

fn draw_table<S: Surface + ?Sized>(
    surface: &mut S,
    cursor: &mut PageCursor,
    rows: &[Vec<String>],
    config: &LayoutConfig,
) -> usize {
    let table_width = config.table_width();

    for (index, row) in rows.iter().enumerate() {
        cursor.break_if_below(surface, config.table_min_y);

        let bottom = cursor.y() - config.row_height;
        let background = if index == 0 {
            HEADER_ROW_BACKGROUND
        } else {
            BODY_ROW_BACKGROUND
        };
        surface.fill_rect(
            Rect::new(config.left_margin, bottom, table_width, config.row_height),
            background,
        );

        let mut cell_x = config.left_margin;
        for (column, width) in config.column_widths.iter().enumerate() {
            surface.stroke_rect(Rect::new(cell_x, bottom, *width, config.row_height), CELL_BORDER);
            let text = row.get(column).map(String::as_str).unwrap_or("");
            let text = truncate_chars(text, config.cell_char_limit);
            if !text.is_empty() {
                surface.draw_text(
                    text,
                    cell_x + config.cell_padding,
                    bottom + config.cell_padding,
                    CELL_STYLE,
                );
            }
            cell_x += width;
        }

        cursor.advance(config.row_height);
    }

    cursor.advance(config.table_gap);
    rows.len()
}
