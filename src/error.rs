//! Error taxonomy for the report pipeline.
//!
//! Extraction and validation failures ([`StructureError`]) are recoverable once through the repair
//! round-trip. Everything that reaches a caller is a [`ReportError`].

use std::time::Duration;

use thiserror::Error;

/// The generated text could not be turned into a structured object.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The remaining text is not valid JSON.
    #[error("generated text is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The text parsed, but the top-level value is not an object.
    #[error("expected a JSON object at the top level, found {found}")]
    NotAnObject {
        /// Kind of the value that was found instead.
        found: &'static str,
    },
}

/// A parsed object does not match the report shape.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{path}: {reason}")]
pub struct ValidationError {
    path: String,
    reason: String,
}

impl ValidationError {
    pub(crate) fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Location of the first failing field, e.g. `sections[0].blocks[1].type`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Why the field was rejected.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// First-attempt failure of extraction or validation.
#[derive(Debug, Error)]
pub enum StructureError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("report structure is invalid: {0}")]
    Validation(#[from] ValidationError),
}

/// Failure reported by a generation service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("no API key configured for the generation service")]
    MissingApiKey,
    #[error("generation service request timed out")]
    TimedOut,
    #[error("generation service network error: {0}")]
    Network(String),
    #[error("generation service returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Leading part of the response body.
        body: String,
    },
    #[error("generation service response is malformed: {0}")]
    MalformedResponse(String),
}

/// Why the single repair round-trip did not produce a usable structure.
#[derive(Debug, Error)]
pub enum RepairFailure {
    #[error("repair request failed: {0}")]
    Service(#[source] ServiceError),
    #[error("repair request exceeded the request deadline ({0:?})")]
    TimedOut(Duration),
    #[error("repaired response is still unusable: {0}")]
    Structure(#[source] StructureError),
}

/// Layout or emission failure. Never retried.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("nothing to render: the unit sequence is empty")]
    EmptyDocument,
    #[error("no embeddable font family could be resolved; tried: {attempts}")]
    FontUnavailable {
        /// Human readable list of every candidate that was checked.
        attempts: String,
    },
    #[error("document layout failed: {0}")]
    Layout(#[source] genpdf::error::Error),
}

/// Prompt construction failure.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PromptError {
    #[error("unsupported report module `{0}`")]
    UnsupportedModule(String),
}

/// Terminal failure of a report request.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report generation failed: {0}")]
    Generation(#[source] ServiceError),
    #[error("report generation exceeded the request deadline ({0:?})")]
    GenerationTimedOut(Duration),
    #[error("report structure is unrecoverable (first attempt: {first}; repair: {repair})")]
    UnrecoverableStructure {
        /// Failure of the first extraction/validation attempt.
        first: StructureError,
        /// Failure of the repair round-trip.
        #[source]
        repair: RepairFailure,
    },
    #[error(transparent)]
    Render(#[from] RenderError),
}
