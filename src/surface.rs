//! Abstraction over a two-dimensional page surface.
//!
//! The report layout only needs a handful of drawing primitives.  Keeping them
//! behind [`Surface`] lets the layout run against the PDF writer in
//! [`crate::pdf`] or against [`RecordingSurface`], which simply records every
//! call so that tests can inspect what would have been drawn.
//!
//! All coordinates are PDF points measured from the bottom-left corner of the
//! page, matching the convention of the PDF imaging model.

use crate::error::RenderError;

/// An RGB colour with components in the `0.0..=1.0` range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);

    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Uniform grey of the given intensity.
    pub const fn grey(level: f64) -> Self {
        Self::new(level, level, level)
    }
}

/// Axis-aligned rectangle anchored at its bottom-left corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn top(&self) -> f64 {
        self.y + self.height
    }
}

/// Font weight available on every surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FontWeight {
    #[default]
    Regular,
    Bold,
}

/// Style applied to a single text run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextStyle {
    pub weight: FontWeight,
    pub size: u8,
    pub color: Rgb,
}

impl TextStyle {
    pub const fn regular(size: u8) -> Self {
        Self {
            weight: FontWeight::Regular,
            size,
            color: Rgb::BLACK,
        }
    }

    pub const fn bold(size: u8) -> Self {
        Self {
            weight: FontWeight::Bold,
            size,
            color: Rgb::BLACK,
        }
    }

    pub const fn with_color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }
}

/// Drawing primitives used by the report layout.
pub trait Surface {
    /// Draws a single line of text with its baseline starting at `(x, y)`.
    fn draw_text(&mut self, text: &str, x: f64, y: f64, style: TextStyle);

    /// Fills a rectangle without an outline.
    fn fill_rect(&mut self, rect: Rect, color: Rgb);

    /// Strokes the outline of a rectangle.
    fn stroke_rect(&mut self, rect: Rect, color: Rgb);

    /// Fills a rectangle with rounded corners.
    fn fill_rounded_rect(&mut self, rect: Rect, radius: f64, color: Rgb);

    /// Places an image scaled into `rect`.
    fn draw_image(&mut self, image: &image::DynamicImage, rect: Rect) -> Result<(), RenderError>;

    /// Ends the current page and starts a fresh one.
    fn new_page(&mut self);
}

/// One primitive call captured by [`RecordingSurface`].
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    Text {
        page: usize,
        text: String,
        x: f64,
        y: f64,
        style: TextStyle,
    },
    FillRect {
        page: usize,
        rect: Rect,
        color: Rgb,
    },
    StrokeRect {
        page: usize,
        rect: Rect,
        color: Rgb,
    },
    RoundedRect {
        page: usize,
        rect: Rect,
        radius: f64,
        color: Rgb,
    },
    Image {
        page: usize,
        rect: Rect,
        pixels: (u32, u32),
    },
    NewPage,
}

impl DrawOp {
    /// Zero-based page the primitive was drawn on; `None` for page breaks.
    pub fn page(&self) -> Option<usize> {
        match self {
            Self::Text { page, .. }
            | Self::FillRect { page, .. }
            | Self::StrokeRect { page, .. }
            | Self::RoundedRect { page, .. }
            | Self::Image { page, .. } => Some(*page),
            Self::NewPage => None,
        }
    }
}

/// Surface that records every primitive instead of drawing it.
#[derive(Clone, Debug, Default)]
pub struct RecordingSurface {
    ops: Vec<DrawOp>,
    page: usize,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded primitives in call order.
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Number of pages, counting the initial page.
    pub fn page_count(&self) -> usize {
        self.page + 1
    }

    /// Text runs in drawing order.
    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Text runs together with the page and baseline they were drawn at.
    pub fn placed_texts(&self) -> Vec<(usize, &str, f64)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { page, text, y, .. } => Some((*page, text.as_str(), *y)),
                _ => None,
            })
            .collect()
    }
}

impl Surface for RecordingSurface {
    fn draw_text(&mut self, text: &str, x: f64, y: f64, style: TextStyle) {
        self.ops.push(DrawOp::Text {
            page: self.page,
            text: text.to_string(),
            x,
            y,
            style,
        });
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgb) {
        self.ops.push(DrawOp::FillRect {
            page: self.page,
            rect,
            color,
        });
    }

    fn stroke_rect(&mut self, rect: Rect, color: Rgb) {
        self.ops.push(DrawOp::StrokeRect {
            page: self.page,
            rect,
            color,
        });
    }

    fn fill_rounded_rect(&mut self, rect: Rect, radius: f64, color: Rgb) {
        self.ops.push(DrawOp::RoundedRect {
            page: self.page,
            rect,
            radius,
            color,
        });
    }

    fn draw_image(&mut self, image: &image::DynamicImage, rect: Rect) -> Result<(), RenderError> {
        use image::GenericImageView;

        self.ops.push(DrawOp::Image {
            page: self.page,
            rect,
            pixels: image.dimensions(),
        });
        Ok(())
    }

    fn new_page(&mut self) {
        self.ops.push(DrawOp::NewPage);
        self.page += 1;
    }
}
