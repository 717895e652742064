//! Final layout pass: draws every unit on a page of the estimated height.

use std::sync::OnceLock;

use genpdf::elements::Paragraph;
use genpdf::{Alignment, Element as _, Size};

use crate::builder::DocumentBuilder;
use crate::elements::{mm_from_f64, UnitElement};
use crate::error::RenderError;
use crate::estimate::{estimate_page_height, PageGeometry};
use crate::fonts::{FontResolver, ResolvedFonts};
use crate::layout::RenderPlan;
use crate::metrics::{EmWidthMetrics, TextMetrics};

/// Renders compiled plans to PDF bytes.
///
/// The font family is resolved on first use and shared by every later render.
pub struct DocumentRenderer {
    fonts: FontResolver,
    resolved: OnceLock<ResolvedFonts>,
    geometry: PageGeometry,
    metrics: Box<dyn TextMetrics>,
}

impl Default for DocumentRenderer {
    fn default() -> Self {
        Self::new(FontResolver::default())
    }
}

impl DocumentRenderer {
    pub fn new(fonts: FontResolver) -> Self {
        Self {
            fonts,
            resolved: OnceLock::new(),
            geometry: PageGeometry::default(),
            metrics: Box::new(EmWidthMetrics),
        }
    }

    /// Page height for `plan`, honouring a positive override.
    pub fn page_height(&self, plan: &RenderPlan, override_height: Option<f64>) -> f64 {
        estimate_page_height(plan, &self.geometry, self.metrics.as_ref(), override_height)
    }

    fn fonts(&self) -> Result<&ResolvedFonts, RenderError> {
        if let Some(resolved) = self.resolved.get() {
            return Ok(resolved);
        }
        let resolved = self.fonts.resolve()?;
        log::info!(
            "Using font family '{}' from {}",
            resolved.name,
            resolved.directory.display()
        );
        Ok(self.resolved.get_or_init(|| resolved))
    }

    /// Draws `plan` on pages of `page_height` millimetres with a page-number footer.
    pub fn render(
        &self,
        plan: &RenderPlan,
        page_height: f64,
        title: &str,
    ) -> Result<Vec<u8>, RenderError> {
        if plan.is_empty() {
            return Err(RenderError::EmptyDocument);
        }
        let fonts = self.fonts()?;

        let geometry = self.geometry;
        let footer_style = plan.styles.footer.to_style();
        let mut document = DocumentBuilder::new(Size::new(
            mm_from_f64(geometry.page_width),
            mm_from_f64(page_height),
        ))
        .with_margins(
            mm_from_f64(geometry.margin_top),
            mm_from_f64(geometry.margin_right),
            mm_from_f64(geometry.margin_bottom),
            mm_from_f64(geometry.margin_left),
        )
        .with_page_footer(mm_from_f64(geometry.footer_height), move |page| {
            Paragraph::new(format!("第 {page} 页"))
                .aligned(Alignment::Center)
                .styled(footer_style)
        })
        .with_title(title)
        .build(fonts.family.clone());

        let content_height = geometry.content_height(page_height);
        for layout in plan.layout(geometry.content_width(), self.metrics.as_ref()) {
            document.push(UnitElement::new(layout, content_height));
        }

        let mut bytes = Vec::new();
        document.render(&mut bytes).map_err(RenderError::Layout)?;
        log::info!(
            "Rendered '{title}' ({} units, {page_height:.1} mm page) to {} bytes",
            plan.units.len(),
            bytes.len()
        );
        Ok(bytes)
    }

    /// Estimates the page height and renders in one step.
    pub fn render_plan(
        &self,
        plan: &RenderPlan,
        override_height: Option<f64>,
        title: &str,
    ) -> Result<(Vec<u8>, f64), RenderError> {
        let page_height = self.page_height(plan, override_height);
        let bytes = self.render(plan, page_height, title)?;
        Ok((bytes, page_height))
    }
}
