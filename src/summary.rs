//! Category summary reports in the flowing `genpdf` layout.
//!
//! A summary shows key figures for one category plus the ten most recent
//! manual records and smart reports.  The caller supplies everything through
//! a [`CategorySnapshot`]; nothing here touches a database.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use genpdf::elements::{Break, FrameCellDecorator, Image, LinearLayout, Paragraph, TableLayout};
use genpdf::style::{Color, Style};
use genpdf::{Alignment, Element, Margins, Mm, PaperSize, Scale};
use image::GenericImageView;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::builder::DocumentBuilder;
use crate::error::RenderError;
use crate::images;
use crate::model::CaseStatus;
use crate::paths::{Category, ReportKind, UploadLayout};

/// Number of rows listed per table.
pub const LATEST_LIMIT: usize = 10;
pub const BRAND: &str = "HMS SYSTEM";
pub const EMPTY_ROW: &str = "Ingen data";

const BLUE_DARK: Color = Color::Rgb(0, 85, 212);
const RED: Color = Color::Rgb(220, 38, 38);
const AMBER: Color = Color::Rgb(202, 138, 4);
const GREEN: Color = Color::Rgb(22, 163, 74);

const LOGO_WIDTH_MM: f64 = 26.0;
const LOGO_DPI: f64 = 300.0;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

fn mm(value: f64) -> Mm {
    Mm::from(printpdf::Mm(value))
}

/// A manually registered record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordEntry {
    pub title: String,
    #[serde(default)]
    pub status: CaseStatus,
    pub created_at: NaiveDateTime,
    #[serde(default)]
    pub created_by: Option<String>,
}

/// A stored smart report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SmartReportEntry {
    pub title: String,
    #[serde(default)]
    pub status: CaseStatus,
    pub created_at: NaiveDateTime,
}

/// Number of entries per status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub open: usize,
    pub processing: usize,
    pub closed: usize,
}

impl StatusCounts {
    fn from_statuses(statuses: impl Iterator<Item = CaseStatus>) -> Self {
        statuses.fold(Self::default(), |mut counts, status| {
            match status {
                CaseStatus::Open => counts.open += 1,
                CaseStatus::Processing => counts.processing += 1,
                CaseStatus::Closed => counts.closed += 1,
            }
            counts
        })
    }

    pub fn total(&self) -> usize {
        self.open + self.processing + self.closed
    }
}

/// Everything a category summary shows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategorySnapshot {
    pub category: Category,
    /// Manual records across every category.
    #[serde(default)]
    pub total_records_all_categories: usize,
    #[serde(default)]
    pub records: Vec<RecordEntry>,
    #[serde(default)]
    pub smart_reports: Vec<SmartReportEntry>,
}

impl CategorySnapshot {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            total_records_all_categories: 0,
            records: Vec::new(),
            smart_reports: Vec::new(),
        }
    }

    pub fn record_counts(&self) -> StatusCounts {
        StatusCounts::from_statuses(self.records.iter().map(|record| record.status))
    }

    pub fn smart_counts(&self) -> StatusCounts {
        StatusCounts::from_statuses(self.smart_reports.iter().map(|report| report.status))
    }

    /// Newest records first, at most [`LATEST_LIMIT`].
    pub fn latest_records(&self) -> Vec<&RecordEntry> {
        let mut records: Vec<_> = self.records.iter().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(LATEST_LIMIT);
        records
    }

    /// Newest smart reports first, at most [`LATEST_LIMIT`].
    pub fn latest_smart_reports(&self) -> Vec<&SmartReportEntry> {
        let mut reports: Vec<_> = self.smart_reports.iter().collect();
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        reports.truncate(LATEST_LIMIT);
        reports
    }

    /// Rows of the key-figure table as `(label, value)` pairs.
    pub fn key_figures(&self) -> Vec<(String, usize)> {
        let label = self.category.label();
        let manual = self.record_counts();
        let smart = self.smart_counts();
        vec![
            ("Totalt (alle kategorier)".to_string(), self.total_records_all_categories),
            (format!("Totalt – {label} (manuell)"), manual.total()),
            ("Åpen (manuell)".to_string(), manual.open),
            ("Under arbeid (manuell)".to_string(), manual.processing),
            ("Lukket (manuell)".to_string(), manual.closed),
            (format!("Totalt – {label} (smart)"), smart.total()),
            ("Åpen (smart)".to_string(), smart.open),
            ("Under behandling (smart)".to_string(), smart.processing),
            ("Lukket (smart)".to_string(), smart.closed),
        ]
    }
}

/// Label and text colour of a status cell.
pub fn status_label(status: CaseStatus) -> (&'static str, Color) {
    match status {
        CaseStatus::Open => ("Åpen", RED),
        CaseStatus::Processing => ("Under arbeid", AMBER),
        CaseStatus::Closed => ("Lukket", GREEN),
    }
}

fn text(value: impl Into<String>) -> Paragraph {
    Paragraph::new(value.into())
}

fn aligned(value: impl Into<String>, alignment: Alignment) -> Paragraph {
    let mut paragraph = text(value);
    paragraph.set_alignment(alignment);
    paragraph
}

fn cell(element: impl Element + 'static) -> impl Element {
    element.padded(Margins::all(mm(1.5)))
}

fn header_cell(value: &str) -> impl Element {
    cell(text(value).styled(Style::new().bold()))
}

fn status_cell(status: CaseStatus) -> impl Element {
    let (label, color) = status_label(status);
    cell(text(label).styled(Style::new().with_color(color)))
}

fn new_table(weights: Vec<usize>) -> TableLayout {
    let mut table = TableLayout::new(weights);
    table.set_cell_decorator(FrameCellDecorator::new(true, true, false));
    table
}

fn key_figure_table(snapshot: &CategorySnapshot) -> Result<TableLayout, RenderError> {
    let mut table = new_table(vec![3, 2]);
    table
        .row()
        .element(header_cell("Nøkkeltall"))
        .element(header_cell(""))
        .push()?;
    for (label, value) in snapshot.key_figures() {
        table
            .row()
            .element(cell(text(label)))
            .element(cell(text(value.to_string())))
            .push()?;
    }
    Ok(table)
}

fn records_table(snapshot: &CategorySnapshot) -> Result<TableLayout, RenderError> {
    let mut table = new_table(vec![7, 3, 3, 3]);
    table
        .row()
        .element(header_cell("Tittel"))
        .element(header_cell("Status"))
        .element(header_cell("Dato"))
        .element(header_cell("Opprettet av"))
        .push()?;

    let records = snapshot.latest_records();
    if records.is_empty() {
        table
            .row()
            .element(cell(text(EMPTY_ROW)))
            .element(cell(text("-")))
            .element(cell(text("-")))
            .element(cell(text("-")))
            .push()?;
    }
    for record in records {
        table
            .row()
            .element(cell(text(non_blank(&record.title))))
            .element(status_cell(record.status))
            .element(cell(text(record.created_at.format(TIMESTAMP_FORMAT).to_string())))
            .element(cell(text(non_blank(record.created_by.as_deref().unwrap_or_default()))))
            .push()?;
    }
    Ok(table)
}

fn smart_reports_table(snapshot: &CategorySnapshot) -> Result<TableLayout, RenderError> {
    let mut table = new_table(vec![9, 3, 3]);
    table
        .row()
        .element(header_cell("Tittel"))
        .element(header_cell("Status"))
        .element(header_cell("Dato"))
        .push()?;

    let reports = snapshot.latest_smart_reports();
    if reports.is_empty() {
        table
            .row()
            .element(cell(text(EMPTY_ROW)))
            .element(cell(text("-")))
            .element(cell(text("-")))
            .push()?;
    }
    for report in reports {
        table
            .row()
            .element(cell(text(non_blank(&report.title))))
            .element(status_cell(report.status))
            .element(cell(text(report.created_at.format(TIMESTAMP_FORMAT).to_string())))
            .push()?;
    }
    Ok(table)
}

fn non_blank(value: &str) -> String {
    if value.trim().is_empty() {
        "-".to_string()
    } else {
        value.to_string()
    }
}

fn logo_element(path: &Path) -> Option<Image> {
    let decoded = match images::decode_image_from_path(path) {
        Ok(decoded) => decoded,
        Err(err) => {
            warn!("skipping logo {}: {}", path.display(), err);
            return None;
        }
    };
    let rgb = image::DynamicImage::ImageRgb8(decoded.to_rgb8());
    let natural_width_mm = 25.4 * f64::from(rgb.width()) / LOGO_DPI;
    match Image::from_dynamic_image(rgb) {
        Ok(mut logo) => {
            if natural_width_mm > f64::EPSILON {
                let scale = LOGO_WIDTH_MM / natural_width_mm;
                logo.set_scale(Scale::new(scale, scale));
            }
            Some(logo)
        }
        Err(err) => {
            warn!("skipping logo {}: {}", path.display(), err);
            None
        }
    }
}

/// Builds the summary document without rendering it.
pub fn build_summary_document(
    snapshot: &CategorySnapshot,
    generated_at: NaiveDateTime,
    created_by: &str,
    logo: Option<&Path>,
) -> Result<genpdf::Document, RenderError> {
    let label = snapshot.category.label();
    let stamp = format!(
        "Generert: {}  |  Av: {}",
        generated_at.format(TIMESTAMP_FORMAT),
        created_by
    );

    let mut document = DocumentBuilder::new()
        .with_title(format!("HMS Rapport – {label}"))
        .with_paper_size(PaperSize::A4)
        .with_margins(Margins::trbl(mm(14.0), mm(20.0), mm(14.0), mm(20.0)))
        .with_font_size(9)
        .with_line_spacing(1.25)
        .with_header(move |page| {
            let mut header = LinearLayout::vertical();
            header.push(
                aligned(BRAND, Alignment::Right)
                    .styled(Style::new().bold().with_font_size(14).with_color(BLUE_DARK)),
            );
            if page == 1 {
                header.push(aligned(stamp.clone(), Alignment::Right));
            }
            header.push(Break::new(1.0));
            header
        })
        .with_footer(mm(8.0), |page| aligned(format!("Side {page}"), Alignment::Center))
        .build()?;

    if let Some(logo) = logo.and_then(logo_element) {
        document.push(logo);
        document.push(Break::new(0.5));
    }

    document.push(
        text(format!("HMS Rapport – {label}"))
            .styled(Style::new().bold().with_font_size(16).with_color(BLUE_DARK)),
    );
    document.push(Break::new(1.0));
    document.push(key_figure_table(snapshot)?);
    document.push(Break::new(1.5));

    document.push(
        text(format!("Siste {LATEST_LIMIT} registreringer (manuell)"))
            .styled(Style::new().bold().with_font_size(11)),
    );
    document.push(Break::new(0.5));
    document.push(records_table(snapshot)?);
    document.push(Break::new(1.5));

    document.push(
        text(format!("Siste {LATEST_LIMIT} smartrapporter"))
            .styled(Style::new().bold().with_font_size(11)),
    );
    document.push(Break::new(0.5));
    document.push(smart_reports_table(snapshot)?);

    Ok(document)
}

/// Renders the summary into memory.
pub fn render_summary(
    snapshot: &CategorySnapshot,
    generated_at: NaiveDateTime,
    created_by: &str,
    logo: Option<&Path>,
) -> Result<Vec<u8>, RenderError> {
    let document = build_summary_document(snapshot, generated_at, created_by, logo)?;
    let mut bytes = Vec::new();
    document.render(&mut bytes)?;
    Ok(bytes)
}

/// Writes the summary under the category's `auto_reports` directory and returns its path.
pub fn generate_category_summary(
    layout: &UploadLayout,
    snapshot: &CategorySnapshot,
    generated_at: NaiveDateTime,
    created_by: &str,
    logo: Option<&Path>,
) -> Result<PathBuf, RenderError> {
    layout.ensure_report_dir(snapshot.category, ReportKind::Auto)?;
    let path = layout.auto_report_path(snapshot.category, generated_at, created_by);
    let bytes = render_summary(snapshot, generated_at, created_by, logo)?;
    fs::write(&path, &bytes).map_err(|err| RenderError::io(&path, err))?;
    info!(
        "wrote {} summary to {} ({} bytes)",
        snapshot.category,
        path.display(),
        bytes.len()
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn record(title: &str, status: CaseStatus, day: u32) -> RecordEntry {
        RecordEntry {
            title: title.to_string(),
            status,
            created_at: at(day, 8),
            created_by: Some("Kari".to_string()),
        }
    }

    #[test]
    fn key_figures_count_statuses() {
        let mut snapshot = CategorySnapshot::new(Category::Risk);
        snapshot.total_records_all_categories = 40;
        snapshot.records = vec![
            record("a", CaseStatus::Open, 1),
            record("b", CaseStatus::Open, 2),
            record("c", CaseStatus::Closed, 3),
        ];
        snapshot.smart_reports = vec![SmartReportEntry {
            title: "s".into(),
            status: CaseStatus::Processing,
            created_at: at(4, 9),
        }];

        let figures = snapshot.key_figures();
        assert_eq!(figures[0], ("Totalt (alle kategorier)".to_string(), 40));
        assert_eq!(figures[1], ("Totalt – Risiko (manuell)".to_string(), 3));
        assert_eq!(figures[2].1, 2);
        assert_eq!(figures[4].1, 1);
        assert_eq!(figures[5].1, 1);
        assert_eq!(figures[7].1, 1);
    }

    #[test]
    fn latest_records_are_newest_first_and_limited() {
        let mut snapshot = CategorySnapshot::new(Category::Ppe);
        snapshot.records = (1..=12)
            .map(|day| record(&format!("r{day}"), CaseStatus::Open, day))
            .collect();
        let latest = snapshot.latest_records();
        assert_eq!(latest.len(), LATEST_LIMIT);
        assert_eq!(latest[0].title, "r12");
        assert_eq!(latest[9].title, "r3");
    }

    #[test]
    fn snapshot_deserializes_with_lenient_status() {
        let snapshot: CategorySnapshot = serde_json::from_str(
            r#"{
                "category": "maintenance",
                "records": [{"title": "Defekt vifte", "status": "in_progress", "created_at": "2024-05-01T08:00:00"}]
            }"#,
        )
        .unwrap();
        assert_eq!(snapshot.category, Category::Maintenance);
        assert_eq!(snapshot.records[0].status, CaseStatus::Processing);
        assert_eq!(snapshot.records[0].created_by, None);
    }

    #[test]
    fn status_labels_are_coloured() {
        assert_eq!(status_label(CaseStatus::Open).0, "Åpen");
        assert!(matches!(
            status_label(CaseStatus::Closed).1,
            Color::Rgb(22, 163, 74)
        ));
    }
}
