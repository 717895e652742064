//! `genpdf` elements that draw laid-out report units.
//!
//! Each [`UnitElement`] replays the drawing operations produced by
//! [`layout_unit`](crate::layout::layout_unit), box by box. Flowing units continue on the next
//! page when a box does not fit; atomic units move to the next page as a whole.

use genpdf::error::Error;
use genpdf::style::{Color, Style};
use genpdf::{render, Element, Mm, Position, RenderResult, Size};

use crate::layout::{DrawOp, LayoutBox, UnitLayout};

/// Distance between the strokes that make up a filled rectangle.
const FILL_STROKE_PITCH_MM: f64 = 0.3;
const FIT_TOLERANCE_MM: f64 = 0.01;

pub(crate) fn mm_from_f64(value: f64) -> Mm {
    Mm::from(printpdf::Mm(value))
}

pub(crate) fn mm_to_f64(value: Mm) -> f64 {
    let mm: printpdf::Mm = value.into();
    mm.0
}

fn position(x: f64, y: f64) -> Position {
    Position::new(mm_from_f64(x), mm_from_f64(y))
}

/// Draws one laid-out unit.
pub struct UnitElement {
    layout: UnitLayout,
    next_box: usize,
    page_height: f64,
}

impl UnitElement {
    /// Creates the element. `page_height` is the height of the content area on an empty page; a
    /// box taller than that is drawn anyway instead of being pushed to the next page forever.
    pub fn new(layout: UnitLayout, page_height: f64) -> Self {
        Self {
            layout,
            next_box: 0,
            page_height,
        }
    }

    fn remaining(&self) -> &[LayoutBox] {
        &self.layout.boxes[self.next_box.min(self.layout.boxes.len())..]
    }

    /// Number of boxes that fit into `available` millimetres, starting at the cursor.
    fn fitting_boxes(&self, available: f64) -> usize {
        let remaining = self.remaining();
        if self.layout.keep_together {
            let total: f64 = remaining.iter().map(|b| b.height).sum();
            return if total <= available + FIT_TOLERANCE_MM {
                remaining.len()
            } else {
                0
            };
        }

        let mut used = 0.0;
        let mut count = 0;
        for layout_box in remaining {
            if used + layout_box.height > available + FIT_TOLERANCE_MM {
                break;
            }
            used += layout_box.height;
            count += 1;
        }
        count
    }
}

impl Element for UnitElement {
    fn render(
        &mut self,
        context: &genpdf::Context,
        area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        let mut result = RenderResult::default();
        if self.remaining().is_empty() {
            return Ok(result);
        }

        let available = mm_to_f64(area.size().height);
        let mut count = self.fitting_boxes(available);
        if count == 0 {
            let fresh_page = available + FIT_TOLERANCE_MM >= self.page_height;
            if !fresh_page {
                result.has_more = true;
                return Ok(result);
            }
            log::warn!("layout box taller than the page; drawing it past the bottom margin");
            count = if self.layout.keep_together {
                self.remaining().len()
            } else {
                1
            };
        }

        let mut top = 0.0;
        for layout_box in &self.remaining()[..count] {
            for op in &layout_box.ops {
                draw(context, &area, style, top, op)?;
            }
            top += layout_box.height;
        }
        self.next_box += count;

        result.size = Size::new(area.size().width, mm_from_f64(top));
        result.has_more = !self.remaining().is_empty();
        Ok(result)
    }
}

fn draw(
    context: &genpdf::Context,
    area: &render::Area<'_>,
    style: Style,
    top: f64,
    op: &DrawOp,
) -> Result<(), Error> {
    match op {
        DrawOp::Text {
            x,
            y,
            text,
            style: text_style,
        } => {
            let text_style = style.and(text_style.to_style());
            match area.text_section(&context.font_cache, position(*x, top + y), text_style) {
                Some(mut section) => section.print_str(text, text_style)?,
                None => log::debug!("no room for text line at {:.1} mm", top + y),
            }
        }
        DrawOp::Fill {
            x,
            y,
            width,
            height,
            color,
        } => fill_rect(area, *x, top + y, *width, *height, *color),
        DrawOp::Line { from, to, color } => area.draw_line(
            vec![position(from.0, top + from.1), position(to.0, top + to.1)],
            Style::new().with_color(*color),
        ),
    }
    Ok(())
}

/// Fills a rectangle with closely spaced horizontal strokes.
fn fill_rect(area: &render::Area<'_>, x: f64, y: f64, width: f64, height: f64, color: Color) {
    let line_style = Style::new().with_color(color);
    let half = FILL_STROKE_PITCH_MM / 2.0;
    let mut offset = half;
    while offset < height {
        let line_y = y + offset.min(height - half);
        area.draw_line(
            vec![position(x, line_y), position(x + width, line_y)],
            line_style,
        );
        offset += FILL_STROKE_PITCH_MM;
    }
}
