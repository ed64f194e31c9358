//! `genpdf` document setup for the category summaries.
//!
//! [`DocumentBuilder`] loads the report font family and installs a
//! [`PageFrame`] decorator.  The frame applies the page margins, renders the
//! running header at the top of each page and reserves a fixed band at the
//! bottom for the footer, so body content never overlaps either.

use genpdf::error::{Error, ErrorKind};
use genpdf::render::Area;
use genpdf::style::Style;
use genpdf::{Context, Element, Margins, Mm, PageDecorator, PaperSize, Position, Size};

use crate::fonts;

/// Produces the element drawn on a page, given its 1-based page number.
pub type PageElement = Box<dyn Fn(usize) -> Box<dyn Element>>;

fn page_element<F, E>(factory: F) -> PageElement
where
    F: Fn(usize) -> E + 'static,
    E: Element + 'static,
{
    Box::new(move |page| Box::new(factory(page)) as Box<dyn Element>)
}

fn default_margins() -> Margins {
    Margins::all(Mm::from(printpdf::Mm(15.0)))
}

/// Builder for summary documents.  Defaults to untitled A4 with 15 mm margins.
pub struct DocumentBuilder {
    title: String,
    paper_size: Size,
    font_size: Option<u8>,
    line_spacing: Option<f64>,
    frame: PageFrame,
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self {
            title: String::new(),
            paper_size: PaperSize::A4.into(),
            font_size: None,
            line_spacing: None,
            frame: PageFrame::default(),
        }
    }
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Title stored in the PDF metadata.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_paper_size(mut self, paper_size: impl Into<Size>) -> Self {
        self.paper_size = paper_size.into();
        self
    }

    pub fn with_margins(mut self, margins: impl Into<Margins>) -> Self {
        self.frame.margins = margins.into();
        self
    }

    pub fn with_font_size(mut self, font_size: u8) -> Self {
        self.font_size = Some(font_size);
        self
    }

    pub fn with_line_spacing(mut self, line_spacing: f64) -> Self {
        self.line_spacing = Some(line_spacing);
        self
    }

    /// Header drawn at the top of every page.  Its height is taken from the
    /// rendered element, so it may differ between pages.
    pub fn with_header<F, E>(mut self, header: F) -> Self
    where
        F: Fn(usize) -> E + 'static,
        E: Element + 'static,
    {
        self.frame.header = Some(page_element(header));
        self
    }

    /// Footer drawn in a band of `height` at the bottom of every page.
    pub fn with_footer<F, E>(mut self, height: impl Into<Mm>, footer: F) -> Self
    where
        F: Fn(usize) -> E + 'static,
        E: Element + 'static,
    {
        self.frame.footer = Some((height.into(), page_element(footer)));
        self
    }

    /// Builds the document.
    ///
    /// Fails when no font family can be loaded (see [`crate::fonts`]).
    pub fn build(self) -> Result<genpdf::Document, Error> {
        let mut document = genpdf::Document::new(fonts::default_font_family()?);
        document.set_minimal_conformance();
        if !self.title.is_empty() {
            document.set_title(self.title);
        }
        document.set_paper_size(self.paper_size);
        if let Some(font_size) = self.font_size {
            document.set_font_size(font_size);
        }
        if let Some(line_spacing) = self.line_spacing {
            document.set_line_spacing(line_spacing);
        }
        document.set_page_decorator(self.frame);
        Ok(document)
    }
}

/// Page decorator holding the margins, header and footer of a summary.
pub struct PageFrame {
    page: usize,
    margins: Margins,
    header: Option<PageElement>,
    footer: Option<(Mm, PageElement)>,
}

impl Default for PageFrame {
    fn default() -> Self {
        Self {
            page: 0,
            margins: default_margins(),
            header: None,
            footer: None,
        }
    }
}

impl PageDecorator for PageFrame {
    fn decorate_page<'a>(
        &mut self,
        context: &Context,
        mut area: Area<'a>,
        style: Style,
    ) -> Result<Area<'a>, Error> {
        self.page += 1;
        area.add_margins(self.margins);

        if let Some(header) = &self.header {
            let rendered = header(self.page).render(context, area.clone(), style)?;
            area.add_offset(Position::new(0, rendered.size.height));
        }

        if let Some((height, footer)) = &self.footer {
            let available = area.size().height;
            if *height > available {
                return Err(Error::new(
                    format!("footer band does not fit on page {}", self.page),
                    ErrorKind::InvalidData,
                ));
            }

            let mut band = area.clone();
            band.add_offset(Position::new(0, available - *height));
            if footer(self.page).render(context, band, style)?.has_more {
                return Err(Error::new(
                    format!("footer overflows its band on page {}", self.page),
                    ErrorKind::PageSizeExceeded,
                ));
            }
            area.set_height(available - *height);
        }

        Ok(area)
    }
}
