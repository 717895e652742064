//! Page-height estimation for single-page output.
//!
//! The estimator runs the same unit layout as the renderer, without emitting anything, and sizes
//! the page so that every unit fits on it.

use crate::layout::RenderPlan;
use crate::metrics::TextMetrics;

/// Width of an A4 page in millimetres.
pub const A4_WIDTH_MM: f64 = 210.0;
/// Height of an A4 page in millimetres.
pub const A4_HEIGHT_MM: f64 = 297.0;

/// Fixed page dimensions shared by the estimate and the render pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageGeometry {
    pub page_width: f64,
    pub margin_left: f64,
    pub margin_right: f64,
    pub margin_top: f64,
    /// Bottom margin including the footer band.
    pub margin_bottom: f64,
    /// Height of the footer band reserved inside the bottom margin.
    pub footer_height: f64,
    /// Extra space added below the measured content.
    pub safety_pad: f64,
    /// Smallest page height ever produced.
    pub min_height: f64,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            page_width: A4_WIDTH_MM,
            margin_left: 22.0,
            margin_right: 22.0,
            margin_top: 18.0,
            margin_bottom: 18.0,
            footer_height: 10.0,
            safety_pad: 6.0,
            min_height: A4_HEIGHT_MM,
        }
    }
}

impl PageGeometry {
    /// Width available to units.
    pub fn content_width(&self) -> f64 {
        self.page_width - self.margin_left - self.margin_right
    }

    /// Height left for units on a page of `page_height` millimetres.
    pub fn content_height(&self, page_height: f64) -> f64 {
        page_height - self.margin_top - self.margin_bottom
    }
}

/// Sums the vertical extent of every unit laid out at the content width.
pub fn measure_content_height(
    plan: &RenderPlan,
    geometry: &PageGeometry,
    metrics: &dyn TextMetrics,
) -> f64 {
    plan.layout(geometry.content_width(), metrics)
        .iter()
        .map(|unit| unit.height())
        .sum()
}

/// Computes the height of the single output page.
///
/// A finite positive `override_height` is returned unchanged. Otherwise the height is the measured
/// content plus margins and the safety pad, never less than [`PageGeometry::min_height`].
pub fn estimate_page_height(
    plan: &RenderPlan,
    geometry: &PageGeometry,
    metrics: &dyn TextMetrics,
    override_height: Option<f64>,
) -> f64 {
    if let Some(height) = override_height.filter(|h| h.is_finite() && *h > 0.0) {
        log::debug!("using fixed page height override of {height} mm");
        return height;
    }

    let content = measure_content_height(plan, geometry, metrics);
    let height = (content + geometry.margin_top + geometry.margin_bottom + geometry.safety_pad)
        .max(geometry.min_height);
    log::debug!(
        "estimated page height {height:.1} mm for {} units ({content:.1} mm of content)",
        plan.units.len()
    );
    height
}
