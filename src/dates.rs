//! Rewrites date references to the current reporting period.
//!
//! Generated reports routinely carry stale dates. The cover's `period_text` and `plan_date` are
//! always overwritten; every other text field has its date-shaped substrings replaced in place,
//! keeping the original separators and surrounding text.

use std::borrow::Cow;
use std::sync::OnceLock;

use chrono::{Datelike, FixedOffset, NaiveDate, Offset, Utc};
use regex::{Captures, Regex};

use crate::model::ReportStructure;

/// Source of the current date.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall clock evaluated at a fixed UTC offset.
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    /// Creates a clock for the given offset in hours; out-of-range offsets fall back to UTC.
    pub fn with_offset_hours(hours: i32) -> Self {
        let offset = hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| {
                log::warn!("UTC offset of {hours}h is out of range; using UTC");
                Utc.fix()
            });
        Self { offset }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::with_offset_hours(8)
    }
}

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.offset).date_naive()
    }
}

/// Clock pinned to a single date.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Year, month and day substituted into date-shaped content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReportingPeriod {
    year: i32,
    month: u32,
    day: u32,
}

impl ReportingPeriod {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
        }
    }

    pub fn current(clock: &dyn Clock) -> Self {
        Self::from_date(clock.today())
    }

    /// Canonical cover period, e.g. `2026年01月`.
    pub fn period_text(&self) -> String {
        format!("{}年{:02}月", self.year, self.month)
    }

    /// Canonical plan date, e.g. `2026-01-31`.
    pub fn plan_date(&self) -> String {
        format!("{}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(concat!(
            r"(?P<year>20\d{2})(?:",
            r"(?P<sep>[-/.])(?P<month>\d{1,2})(?:(?P<sep2>[-/.])(?P<day>\d{1,2}))?",
            r"|年(?P<cn_month>\d{1,2})月(?:(?P<cn_day>\d{1,2})(?P<ri>日)?)?",
            r")"
        ))
        .expect("date pattern is valid")
    })
}

/// Replaces every date-shaped substring of `text` with the reporting period.
pub fn normalize_text<'t>(text: &'t str, period: &ReportingPeriod) -> Cow<'t, str> {
    date_pattern().replace_all(text, |caps: &Captures<'_>| rewrite_match(text, caps, period))
}

fn rewrite_match(text: &str, caps: &Captures<'_>, period: &ReportingPeriod) -> String {
    let Some(whole) = caps.get(0) else {
        return String::new();
    };
    let original = whole.as_str();

    let preceded_by_digit = text[..whole.start()]
        .chars()
        .next_back()
        .is_some_and(|c| c.is_ascii_digit());
    if preceded_by_digit {
        return original.to_owned();
    }

    let ReportingPeriod { year, month, day } = *period;

    if let Some(sep) = caps.name("sep") {
        let sep = sep.as_str();
        let same_separator = caps.name("sep2").is_some_and(|s| s.as_str() == sep);
        let (replacement, end) = match caps.name("day") {
            Some(day_match) if same_separator => (
                format!("{year}{sep}{month:02}{sep}{day:02}"),
                day_match.end(),
            ),
            _ => {
                let month_end = caps.name("month").map_or(whole.end(), |m| m.end());
                (format!("{year}{sep}{month:02}"), month_end)
            }
        };
        if followed_by_digit(text, end) {
            return original.to_owned();
        }
        // A mismatched second separator is left as it was.
        return format!("{replacement}{}", &text[end..whole.end()]);
    }

    let end = whole.end();
    match caps.name("cn_day") {
        Some(cn_day) => {
            if caps.name("ri").is_none() && followed_by_digit(text, cn_day.end()) {
                return original.to_owned();
            }
            let suffix = if caps.name("ri").is_some() { "日" } else { "" };
            format!("{year}年{month:02}月{day:02}{suffix}")
        }
        None if followed_by_digit(text, end) => original.to_owned(),
        None => format!("{year}年{month:02}月"),
    }
}

fn followed_by_digit(text: &str, at: usize) -> bool {
    text[at..].chars().next().is_some_and(|c| c.is_ascii_digit())
}

fn normalize_in_place(text: &mut String, period: &ReportingPeriod) {
    let rewritten = match normalize_text(text, period) {
        Cow::Owned(rewritten) => rewritten,
        Cow::Borrowed(_) => return,
    };
    *text = rewritten;
}

/// Applies the reporting period to every text field of the report.
///
/// The cover period and plan date are replaced unconditionally.
pub fn normalize_report(report: &mut ReportStructure, period: &ReportingPeriod) {
    let cover = &mut report.cover;
    for field in [
        &mut cover.store_name,
        &mut cover.report_title,
        &mut cover.report_subtitle,
        &mut cover.business_line,
    ] {
        normalize_in_place(field, period);
    }
    cover.period_text = period.period_text();
    cover.plan_date = period.plan_date();

    for section in &mut report.sections {
        normalize_in_place(&mut section.title, period);
        normalize_in_place(&mut section.summary, period);
        for block in &mut section.blocks {
            block.for_each_text_mut(|text| normalize_in_place(text, period));
        }
    }
}
