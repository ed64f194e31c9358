//! PDF output for incident reports using `printpdf`.
//!
//! [`PdfSurface`] implements [`Surface`] on top of a `printpdf` document with
//! the built-in Helvetica fonts, and [`render`] wires it to the report layout.

use std::f64::consts::FRAC_PI_2;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use log::info;
use printpdf::{
    BuiltinFont, Color, CustomPdfConformance, IndirectFontRef, Line, Mm, PdfConformance,
    PdfDocument, PdfDocumentReference, PdfLayerReference, Point,
};

use crate::error::RenderError;
use crate::images;
use crate::layout::{self, LayoutConfig, LayoutSummary};
use crate::model::ReportMetadata;
use crate::surface::{FontWeight, Rect, Rgb, Surface, TextStyle};

const LAYER_NAME: &str = "Innhold";
const IMAGE_DPI: f64 = 300.0;
const STROKE_WIDTH: f64 = 1.0;
const CORNER_SEGMENTS: usize = 4;

fn mm(points: f64) -> Mm {
    Mm(points * 25.4 / 72.0)
}

fn pdf_color(color: Rgb) -> Color {
    Color::Rgb(printpdf::Rgb::new(color.r, color.g, color.b, None))
}

fn point(x: f64, y: f64) -> (Point, bool) {
    (Point::new(mm(x), mm(y)), false)
}

fn pdf_error(err: printpdf::Error) -> RenderError {
    RenderError::Pdf(err.to_string())
}

/// A [`Surface`] backed by an in-memory `printpdf` document.
pub struct PdfSurface {
    document: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    page_width: f64,
    page_height: f64,
    pages: usize,
}

impl PdfSurface {
    /// Creates a document with a single empty page of the given size (in points).
    pub fn new(title: &str, page_width: f64, page_height: f64) -> Result<Self, RenderError> {
        let (document, page, layer) =
            PdfDocument::new(title, mm(page_width), mm(page_height), LAYER_NAME);
        let document = document.with_conformance(PdfConformance::Custom(CustomPdfConformance {
            requires_icc_profile: false,
            requires_xmp_metadata: false,
            ..Default::default()
        }));
        let layer = document.get_page(page).get_layer(layer);
        let regular = document
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(pdf_error)?;
        let bold = document
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(pdf_error)?;

        Ok(Self {
            document,
            layer,
            regular,
            bold,
            page_width,
            page_height,
            pages: 1,
        })
    }

    /// Number of pages created so far.
    pub fn page_count(&self) -> usize {
        self.pages
    }

    /// Writes the finished document to `path`.
    pub fn save(self, path: &Path) -> Result<(), RenderError> {
        let file = File::create(path).map_err(|err| RenderError::io(path, err))?;
        self.document
            .save(&mut BufWriter::new(file))
            .map_err(pdf_error)
    }

    fn font(&self, weight: FontWeight) -> &IndirectFontRef {
        match weight {
            FontWeight::Regular => &self.regular,
            FontWeight::Bold => &self.bold,
        }
    }

    fn rect_points(rect: Rect) -> Vec<(Point, bool)> {
        vec![
            point(rect.x, rect.y),
            point(rect.x + rect.width, rect.y),
            point(rect.x + rect.width, rect.top()),
            point(rect.x, rect.top()),
        ]
    }

    /// Approximates each rounded corner with a short polyline.
    fn rounded_points(rect: Rect, radius: f64) -> Vec<(Point, bool)> {
        let radius = radius.min(rect.width / 2.0).min(rect.height / 2.0).max(0.0);
        let corners = [
            (rect.x + rect.width - radius, rect.y + radius, -FRAC_PI_2),
            (rect.x + rect.width - radius, rect.top() - radius, 0.0),
            (rect.x + radius, rect.top() - radius, FRAC_PI_2),
            (rect.x + radius, rect.y + radius, 2.0 * FRAC_PI_2),
        ];

        let mut points = Vec::with_capacity(corners.len() * (CORNER_SEGMENTS + 1));
        for (cx, cy, start) in corners {
            for step in 0..=CORNER_SEGMENTS {
                let angle = start + FRAC_PI_2 * step as f64 / CORNER_SEGMENTS as f64;
                points.push(point(cx + radius * angle.cos(), cy + radius * angle.sin()));
            }
        }
        points
    }

    fn fill_polygon(&mut self, points: Vec<(Point, bool)>, color: Rgb) {
        self.layer.set_fill_color(pdf_color(color));
        self.layer.add_shape(Line {
            points,
            is_closed: true,
            has_fill: true,
            has_stroke: false,
            is_clipping_path: false,
        });
    }
}

impl Surface for PdfSurface {
    fn draw_text(&mut self, text: &str, x: f64, y: f64, style: TextStyle) {
        self.layer.set_fill_color(pdf_color(style.color));
        let font = self.font(style.weight).clone();
        self.layer
            .use_text(text, style.size.into(), mm(x), mm(y), &font);
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgb) {
        self.fill_polygon(Self::rect_points(rect), color);
    }

    fn stroke_rect(&mut self, rect: Rect, color: Rgb) {
        self.layer.set_outline_color(pdf_color(color));
        self.layer.set_outline_thickness(STROKE_WIDTH);
        self.layer.add_shape(Line {
            points: Self::rect_points(rect),
            is_closed: true,
            has_fill: false,
            has_stroke: true,
            is_clipping_path: false,
        });
    }

    fn fill_rounded_rect(&mut self, rect: Rect, radius: f64, color: Rgb) {
        self.fill_polygon(Self::rounded_points(rect, radius), color);
    }

    fn draw_image(&mut self, image: &image::DynamicImage, rect: Rect) -> Result<(), RenderError> {
        let rgb = image::DynamicImage::ImageRgb8(image.to_rgb8());
        let scale = images::fit_scale(&rgb, rect.width, rect.height, IMAGE_DPI);
        printpdf::Image::from_dynamic_image(&rgb).add_to_layer(
            self.layer.clone(),
            Some(mm(rect.x)),
            Some(mm(rect.y)),
            None,
            Some(scale),
            Some(scale),
            Some(IMAGE_DPI),
        );
        Ok(())
    }

    fn new_page(&mut self) {
        let (page, layer) =
            self.document
                .add_page(mm(self.page_width), mm(self.page_height), LAYER_NAME);
        self.layer = self.document.get_page(page).get_layer(layer);
        self.pages += 1;
    }
}

/// Renders `metadata` to a PDF file at `path` using the default layout.
///
/// Missing parent directories are created.  A `logo` that does not exist or
/// cannot be decoded is skipped; only I/O and PDF writer failures are errors.
pub fn render(
    path: impl AsRef<Path>,
    metadata: &ReportMetadata,
    logo: Option<&Path>,
) -> Result<LayoutSummary, RenderError> {
    render_with_config(path, metadata, logo, &LayoutConfig::default())
}

/// Same as [`render`] with explicit layout settings.
pub fn render_with_config(
    path: impl AsRef<Path>,
    metadata: &ReportMetadata,
    logo: Option<&Path>,
    config: &LayoutConfig,
) -> Result<LayoutSummary, RenderError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| RenderError::io(parent, err))?;
    }

    let mut surface = PdfSurface::new(metadata.title(), config.page_width, config.page_height)?;
    let summary = layout::render_report(&mut surface, metadata, logo, config);
    surface.save(path)?;

    info!(
        "rendered {} ({} page(s), {} body line(s), {} table row(s))",
        path.display(),
        summary.pages,
        summary.body_lines,
        summary.table_rows
    );
    Ok(summary)
}
