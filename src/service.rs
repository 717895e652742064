//! End-to-end report pipeline.
//!
//! generated text → extraction and validation (one repair at most) → date normalization →
//! layout compilation → page-height estimation → rendering.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::config::Settings;
use crate::dates::{normalize_report, Clock, ReportingPeriod, SystemClock};
use crate::error::{ReportError, ServiceError};
use crate::fonts::FontResolver;
use crate::layout::{compile, RenderPlan};
use crate::model::ReportStructure;
use crate::prompts::{build_prompt, SYSTEM_PROMPT};
use crate::render::DocumentRenderer;
use crate::repair::{CompletionRequest, GenerationService, RepairEscalator};
use crate::theme::{theme_for, ReportModule};
use crate::upstream::UpstreamClient;

const FILENAME_FORBIDDEN: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Download name for a rendered report: `<store>_<module name>.pdf`.
pub fn pdf_filename(module_id: &str, store_name: &str) -> String {
    let store = store_name.trim();
    let store = if store.is_empty() { "report" } else { store };
    let name = format!("{store}_{}", theme_for(module_id).name);
    let safe: String = name
        .chars()
        .map(|c| if FILENAME_FORBIDDEN.contains(&c) { '_' } else { c })
        .collect();
    format!("{}.pdf", safe.trim())
}

/// Form submission for a new report.
#[derive(Clone, Debug)]
pub struct GenerateRequest {
    pub module: ReportModule,
    /// Form fields as a JSON object.
    pub payload: Value,
    /// Screenshot attached to market reports, as a `data:` URL.
    pub image_data_url: Option<String>,
}

/// Rendered report together with what it was rendered from.
#[derive(Clone, Debug)]
pub struct CompiledReport {
    pub bytes: Vec<u8>,
    pub page_height_mm: f64,
    /// Structure after date normalization.
    pub structure: ReportStructure,
    pub filename: String,
}

/// Runs the report pipeline. One instance serves any number of concurrent requests.
pub struct ReportService {
    settings: Settings,
    generation: Arc<dyn GenerationService>,
    renderer: DocumentRenderer,
    clock: Box<dyn Clock>,
}

impl ReportService {
    /// Builds a service that generates through the configured upstream endpoint.
    pub fn from_settings(settings: Settings) -> Result<Self, ReportError> {
        let client = UpstreamClient::new(
            settings.base_url.clone(),
            settings.api_key.clone(),
            settings.request_timeout,
        )
        .map_err(ReportError::Generation)?;
        Ok(Self::new(settings, Arc::new(client)))
    }

    pub fn new(settings: Settings, generation: Arc<dyn GenerationService>) -> Self {
        let renderer = DocumentRenderer::new(FontResolver::new(settings.fonts_dir.clone()));
        let clock = SystemClock::with_offset_hours(settings.utc_offset_hours);
        Self {
            settings,
            generation,
            renderer,
            clock: Box::new(clock),
        }
    }

    pub fn with_renderer(mut self, renderer: DocumentRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Generates, repairs if needed, and renders a report for a form submission.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<CompiledReport, ReportError> {
        let started = Instant::now();
        let deadline = self.settings.request_timeout;
        let module = request.module;
        let model = self.settings.model_for(module);

        let prompt = build_prompt(module, &request.payload);
        let mut completion = CompletionRequest::new(model, SYSTEM_PROMPT, prompt);
        if module == ReportModule::Market {
            if let Some(image) = &request.image_data_url {
                completion = completion.with_image(image.clone());
            }
        }

        log::info!("Generating {module} report with model {model}");
        let raw = tokio::time::timeout(deadline, self.generation.complete(completion))
            .await
            .map_err(|_| ReportError::GenerationTimedOut(deadline))?
            .map_err(|err| match err {
                ServiceError::TimedOut => ReportError::GenerationTimedOut(deadline),
                other => ReportError::Generation(other),
            })?;

        let remaining = deadline.saturating_sub(started.elapsed());
        let structure = self.resolve_structure(module.id(), &raw, remaining).await?;
        self.render_structure(module.id(), structure)
    }

    /// Compiles an already generated response, repairing it through the generation service once
    /// if needed.
    pub async fn compile_response(
        &self,
        module_id: &str,
        raw: &str,
    ) -> Result<CompiledReport, ReportError> {
        let structure = self
            .resolve_structure(module_id, raw, self.settings.request_timeout)
            .await?;
        self.render_structure(module_id, structure)
    }

    /// Extracts and validates `raw`, with at most one repair bounded by `timeout`.
    pub async fn resolve_structure(
        &self,
        module_id: &str,
        raw: &str,
        timeout: Duration,
    ) -> Result<ReportStructure, ReportError> {
        let model = ReportModule::from_id(module_id)
            .map_or(self.settings.default_model.as_str(), |module| self.settings.model_for(module));
        RepairEscalator::new(self.generation.as_ref(), model)
            .with_timeout(timeout)
            .resolve(raw)
            .await
    }

    /// Normalizes dates in `report` and compiles it with the module's theme.
    pub fn plan(
        &self,
        module_id: &str,
        mut report: ReportStructure,
    ) -> (ReportStructure, RenderPlan) {
        let period = ReportingPeriod::current(self.clock.as_ref());
        normalize_report(&mut report, &period);
        let plan = compile(&report, theme_for(module_id));
        (report, plan)
    }

    /// Page height `report` would be rendered at.
    pub fn estimate(&self, module_id: &str, report: ReportStructure) -> f64 {
        let (_, plan) = self.plan(module_id, report);
        let override_height = self.settings.page_height_override;
        self.renderer.page_height(&plan, override_height)
    }

    /// Renders a validated structure. No I/O besides loading fonts on first use.
    pub fn render_structure(
        &self,
        module_id: &str,
        report: ReportStructure,
    ) -> Result<CompiledReport, ReportError> {
        let (structure, plan) = self.plan(module_id, report);
        let title = if structure.cover.report_title.trim().is_empty() {
            theme_for(module_id).name
        } else {
            structure.cover.report_title.as_str()
        };
        let override_height = self.settings.page_height_override;
        let (bytes, page_height_mm) = self.renderer.render_plan(&plan, override_height, title)?;
        let filename = pdf_filename(module_id, &structure.cover.store_name);
        Ok(CompiledReport {
            bytes,
            page_height_mm,
            structure,
            filename,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_uses_store_and_module_name() {
        assert_eq!(
            pdf_filename("brand", "吴家牛羊肉馆"),
            "吴家牛羊肉馆_品牌定位分析.pdf"
        );
        assert_eq!(
            pdf_filename("data-statistics", " 示例店 "),
            "示例店_数据统计分析.pdf"
        );
    }

    #[test]
    fn filename_replaces_forbidden_characters() {
        assert_eq!(
            pdf_filename("market", r#"A/B:C*D?"E"<F>|G\H"#),
            "A_B_C_D__E__F__G_H_商圈调研分析.pdf"
        );
    }

    #[test]
    fn filename_falls_back_for_empty_store_and_unknown_module() {
        assert_eq!(pdf_filename("brand", "  "), "report_品牌定位分析.pdf");
        assert_eq!(pdf_filename("weather", "店"), "店_报告.pdf");
    }
}
