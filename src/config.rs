//! Settings read from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::fonts::FONTS_DIR_ENV;
use crate::theme::ReportModule;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 8;

const TIMEOUT_ENV: &str = "REPORT_REQUEST_TIMEOUT_SECS";
const PAGE_HEIGHT_ENV: &str = "REPORT_PAGE_HEIGHT_MM";
const UTC_OFFSET_ENV: &str = "REPORT_UTC_OFFSET_HOURS";

/// Runtime settings of the report service.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub base_url: String,
    pub api_key: String,
    pub default_model: String,
    pub brand_model: Option<String>,
    pub market_model: Option<String>,
    pub store_activity_model: Option<String>,
    pub data_statistics_model: Option<String>,
    /// Deadline for the whole request, initial generation and repair included.
    pub request_timeout: Duration,
    /// Fixed page height in millimetres, bypassing estimation.
    pub page_height_override: Option<f64>,
    pub fonts_dir: Option<PathBuf>,
    pub utc_offset_hours: i32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            api_key: String::new(),
            default_model: DEFAULT_MODEL.to_owned(),
            brand_model: None,
            market_model: None,
            store_activity_model: None,
            data_statistics_model: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            page_height_override: None,
            fonts_dir: None,
            utc_offset_hours: DEFAULT_UTC_OFFSET_HOURS,
        }
    }
}

impl Settings {
    /// Reads the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads settings through `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        let page_height_override =
            parse::<f64>(get(PAGE_HEIGHT_ENV), PAGE_HEIGHT_ENV).filter(|height| {
                let valid = height.is_finite() && *height > 0.0;
                if !valid {
                    log::warn!("Ignoring non-positive {PAGE_HEIGHT_ENV}={height}");
                }
                valid
            });

        Self {
            base_url: get("UPSTREAM_BASE_URL").unwrap_or(defaults.base_url),
            api_key: get("UPSTREAM_API_KEY").unwrap_or_default(),
            default_model: get("UPSTREAM_MODEL_DEFAULT").unwrap_or(defaults.default_model),
            brand_model: get("UPSTREAM_MODEL_BRAND"),
            market_model: get("UPSTREAM_MODEL_MARKET"),
            store_activity_model: get("UPSTREAM_MODEL_STORE_ACTIVITY"),
            data_statistics_model: get("UPSTREAM_MODEL_DATA_STATISTICS"),
            request_timeout: parse::<u64>(get(TIMEOUT_ENV), TIMEOUT_ENV)
                .filter(|secs| *secs > 0)
                .map_or(defaults.request_timeout, Duration::from_secs),
            page_height_override,
            fonts_dir: get(FONTS_DIR_ENV).map(PathBuf::from),
            utc_offset_hours: parse(get(UTC_OFFSET_ENV), UTC_OFFSET_ENV)
                .unwrap_or(defaults.utc_offset_hours),
        }
    }

    /// Model for `module`: its override when set, otherwise the default model.
    pub fn model_for(&self, module: ReportModule) -> &str {
        let specific = match module {
            ReportModule::Brand => &self.brand_model,
            ReportModule::Market => &self.market_model,
            ReportModule::StoreActivity => &self.store_activity_model,
            ReportModule::DataStatistics => &self.data_statistics_model,
        };
        specific.as_deref().unwrap_or(&self.default_model)
    }
}

fn parse<T: FromStr>(value: Option<String>, name: &str) -> Option<T> {
    let value = value?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            log::warn!("Ignoring invalid {name}={value:?}; using the default");
            None
        }
    }
}
