//! Document construction: page size, margins and a page-number footer.

use genpdf::error::{Error, ErrorKind};
use genpdf::fonts::{FontData, FontFamily};
use genpdf::render::Area;
use genpdf::style::Style;
use genpdf::{Context, Document, Element, Margins, Mm, PageDecorator, Position, Size};

/// Page margins as top, right, bottom and left edges.
pub type Edges = (Mm, Mm, Mm, Mm);

type FooterFactory = dyn Fn(usize) -> Box<dyn Element>;

/// Builder for report documents with a fixed page size.
pub struct DocumentBuilder {
    paper_size: Size,
    margins: Edges,
    footer: Option<PageFooter>,
    title: Option<String>,
}

impl DocumentBuilder {
    pub fn new(paper_size: impl Into<Size>) -> Self {
        Self {
            paper_size: paper_size.into(),
            margins: (Mm::from(0), Mm::from(0), Mm::from(0), Mm::from(0)),
            footer: None,
            title: None,
        }
    }

    /// Outer page margins. A footer is drawn inside the bottom margin.
    pub fn with_margins(
        mut self,
        top: impl Into<Mm>,
        right: impl Into<Mm>,
        bottom: impl Into<Mm>,
        left: impl Into<Mm>,
    ) -> Self {
        self.margins = (top.into(), right.into(), bottom.into(), left.into());
        self
    }

    /// Draws `footer(page)` in a band of `height` at the top of the bottom margin, with 1-based
    /// page numbers.
    pub fn with_page_footer<F, E>(mut self, height: impl Into<Mm>, footer: F) -> Self
    where
        F: Fn(usize) -> E + 'static,
        E: Element + 'static,
    {
        self.footer = Some(PageFooter {
            height: height.into(),
            factory: Box::new(move |page| Box::new(footer(page)) as Box<dyn Element>),
        });
        self
    }

    /// PDF metadata title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn build(self, font_family: FontFamily<FontData>) -> Document {
        let mut document = Document::new(font_family);
        document.set_paper_size(self.paper_size);
        if let Some(title) = self.title {
            document.set_title(title);
        }
        document.set_page_decorator(ReportPageDecorator {
            page: 0,
            margins: self.margins,
            footer: self.footer,
        });
        document
    }
}

struct PageFooter {
    height: Mm,
    factory: Box<FooterFactory>,
}

struct ReportPageDecorator {
    page: usize,
    margins: Edges,
    footer: Option<PageFooter>,
}

impl PageDecorator for ReportPageDecorator {
    fn decorate_page<'a>(
        &mut self,
        context: &Context,
        mut area: Area<'a>,
        style: Style,
    ) -> Result<Area<'a>, Error> {
        self.page += 1;

        let (top, right, bottom, left) = self.margins;
        let Some(footer) = &self.footer else {
            area.add_margins(Margins::trbl(top, right, bottom, left));
            return Ok(area);
        };
        if footer.height > bottom {
            return Err(Error::new(
                format!(
                    "footer band of {:?} does not fit into the bottom margin of {:?}",
                    footer.height, bottom
                ),
                ErrorKind::InvalidData,
            ));
        }
        area.add_margins(Margins::trbl(top, right, bottom - footer.height, left));

        let band_top = area.size().height - footer.height;
        let mut band = area.clone();
        band.add_offset(Position::new(0, band_top));
        let mut element = (footer.factory)(self.page);
        if element.render(context, band, style)?.has_more {
            return Err(Error::new(
                format!("page {} footer overflows its band", self.page),
                ErrorKind::PageSizeExceeded,
            ));
        }

        area.set_height(band_top);
        Ok(area)
    }
}
