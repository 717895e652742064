//! Compiles generated store-analysis reports into single-page PDF documents.
//!
//! The pipeline turns free-form model output into a validated [`ReportStructure`], rewrites stale
//! dates to the current reporting period, lays the report out as one continuous page sized to its
//! content, and renders it with [`genpdf`].

pub mod builder;
pub mod config;
pub mod dates;
pub mod elements;
pub mod error;
pub mod estimate;
pub mod extract;
pub mod fonts;
pub mod layout;
pub mod metrics;
pub mod model;
pub mod prompts;
pub mod render;
pub mod repair;
pub mod schema;
pub mod service;
pub mod style;
pub mod theme;
pub mod upstream;

pub use config::Settings;
pub use error::{RenderError, ReportError};
pub use model::{Block, CoverInfo, HighlightCard, ReportStructure, Section};
pub use render::DocumentRenderer;
pub use repair::{CompletionRequest, GenerationService};
pub use service::{pdf_filename, CompiledReport, GenerateRequest, ReportService};
pub use theme::{theme_for, ReportModule, Theme};
