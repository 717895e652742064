//! Structure resolution with a single repair round-trip.
//!
//! A generated response that fails extraction or validation is sent back to the generation
//! service once, with a corrective instruction and lower temperature. If the repaired response
//! fails too, the request is terminal.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{RepairFailure, ReportError, ServiceError};
use crate::model::ReportStructure;
use crate::schema::parse_report;

/// Default sampling temperature of an initial generation.
pub const DEFAULT_TEMPERATURE: f64 = 0.8;
/// Default completion budget of an initial generation.
pub const DEFAULT_MAX_TOKENS: u32 = 16384;
/// Temperature of the repair request.
pub const REPAIR_TEMPERATURE: f64 = 0.2;
/// Completion budget of the repair request.
pub const REPAIR_MAX_TOKENS: u32 = 12000;
/// Longest prefix of the failed response, in characters, that is sent for repair.
pub const REPAIR_INPUT_LIMIT: usize = 12000;

const REPAIR_SYSTEM_PROMPT: &str = "你是一位严格的JSON修复助手。";
const REPAIR_INSTRUCTION: &str =
    "请将以下内容修复为严格 JSON 对象，仅输出 JSON，不要 Markdown/HTML：";

/// One chat completion call.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub system: String,
    pub user_prompt: String,
    /// `data:` URL of an image attached to the user message.
    pub image_data_url: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(
        model: impl Into<String>,
        system: impl Into<String>,
        user_prompt: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            system: system.into(),
            user_prompt: user_prompt.into(),
            image_data_url: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_image(mut self, data_url: impl Into<String>) -> Self {
        self.image_data_url = Some(data_url.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Text generation backend.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Returns the assistant text for `request`.
    async fn complete(&self, request: CompletionRequest) -> Result<String, ServiceError>;
}

/// Builds the corrective instruction from a failed response.
pub fn corrective_prompt(raw: &str) -> String {
    let truncated = raw
        .char_indices()
        .nth(REPAIR_INPUT_LIMIT)
        .map_or(raw, |(end, _)| &raw[..end]);
    format!("{REPAIR_INSTRUCTION}\n\n{truncated}")
}

/// Turns generated text into a validated report, repairing it at most once.
pub struct RepairEscalator<'a> {
    service: &'a dyn GenerationService,
    model: &'a str,
    timeout: Duration,
}

impl<'a> RepairEscalator<'a> {
    /// `model` is the model the repair request is sent to.
    pub fn new(service: &'a dyn GenerationService, model: &'a str) -> Self {
        Self {
            service,
            model,
            timeout: Duration::from_secs(120),
        }
    }

    /// Limits how long the repair request may take.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn resolve(&self, raw: &str) -> Result<ReportStructure, ReportError> {
        let first = match parse_report(raw) {
            Ok(report) => return Ok(report),
            Err(err) => err,
        };
        log::warn!("Generated response is not a valid report ({first}); requesting a repair");

        match self.repair(raw).await {
            Ok(report) => {
                log::info!("Repaired response validated");
                Ok(report)
            }
            Err(repair) => {
                log::warn!("Repair did not produce a valid report: {repair}");
                Err(ReportError::UnrecoverableStructure { first, repair })
            }
        }
    }

    async fn repair(&self, raw: &str) -> Result<ReportStructure, RepairFailure> {
        let prompt = corrective_prompt(raw);
        let request = CompletionRequest::new(self.model, REPAIR_SYSTEM_PROMPT, prompt)
            .with_temperature(REPAIR_TEMPERATURE)
            .with_max_tokens(REPAIR_MAX_TOKENS);

        let response = tokio::time::timeout(self.timeout, self.service.complete(request))
            .await
            .map_err(|_| RepairFailure::TimedOut(self.timeout))?
            .map_err(RepairFailure::Service)?;
        parse_report(&response).map_err(RepairFailure::Structure)
    }
}
