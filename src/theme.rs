//! Report modules and their color themes.

use std::fmt;
use std::str::FromStr;

use genpdf::style::Color;

use crate::error::PromptError;

/// Kinds of report the service can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReportModule {
    Brand,
    Market,
    StoreActivity,
    DataStatistics,
}

impl ReportModule {
    pub const ALL: [ReportModule; 4] = [
        Self::Brand,
        Self::Market,
        Self::StoreActivity,
        Self::DataStatistics,
    ];

    /// Identifier used on the wire and in configuration.
    pub fn id(self) -> &'static str {
        match self {
            Self::Brand => "brand",
            Self::Market => "market",
            Self::StoreActivity => "store-activity",
            Self::DataStatistics => "data-statistics",
        }
    }

    pub fn theme(self) -> &'static Theme {
        match self {
            Self::Brand => &BRAND,
            Self::Market => &MARKET,
            Self::StoreActivity => &STORE_ACTIVITY,
            Self::DataStatistics => &DATA_STATISTICS,
        }
    }

    /// Looks up a module by identifier.
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|module| module.id() == id.trim())
    }
}

impl fmt::Display for ReportModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ReportModule {
    type Err = PromptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_id(s).ok_or_else(|| PromptError::UnsupportedModule(s.trim().to_owned()))
    }
}

/// Immutable color triple applied to a rendered report.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Theme {
    pub name: &'static str,
    pub primary: Color,
    pub light: Color,
    pub dark: Color,
}

const BRAND: Theme = Theme {
    name: "品牌定位分析",
    primary: Color::Rgb(0x9B, 0x5B, 0x2A),
    light: Color::Rgb(0xF3, 0xE7, 0xDD),
    dark: Color::Rgb(0x6E, 0x3E, 0x1E),
};

const MARKET: Theme = Theme {
    name: "商圈调研分析",
    primary: Color::Rgb(0x2F, 0x6F, 0xBD),
    light: Color::Rgb(0xE7, 0xF0, 0xFB),
    dark: Color::Rgb(0x1F, 0x4C, 0x86),
};

const STORE_ACTIVITY: Theme = Theme {
    name: "店铺活动方案",
    primary: Color::Rgb(0xE0, 0x7A, 0x2F),
    light: Color::Rgb(0xFB, 0xEB, 0xDD),
    dark: Color::Rgb(0xA6, 0x4E, 0x1B),
};

const DATA_STATISTICS: Theme = Theme {
    name: "数据统计分析",
    primary: Color::Rgb(0x6B, 0x5F, 0xB5),
    light: Color::Rgb(0xEC, 0xE9, 0xF8),
    dark: Color::Rgb(0x40, 0x35, 0x7E),
};

/// Theme used for identifiers that do not name a module.
pub const DEFAULT_THEME: Theme = Theme {
    name: "报告",
    ..BRAND
};

/// Resolves the theme for a module identifier. Unknown identifiers get [`DEFAULT_THEME`].
pub fn theme_for(module_id: &str) -> &'static Theme {
    ReportModule::from_id(module_id).map_or(&DEFAULT_THEME, ReportModule::theme)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_modules() {
        assert_eq!(theme_for("market").primary, Color::Rgb(0x2F, 0x6F, 0xBD));
        assert_eq!(theme_for(" store-activity ").name, "店铺活动方案");
        assert_eq!(theme_for("data-statistics").dark, Color::Rgb(0x40, 0x35, 0x7E));
    }

    #[test]
    fn unknown_module_falls_back_to_default() {
        let theme = theme_for("weather");
        assert_eq!(theme, &DEFAULT_THEME);
        assert_eq!(theme.name, "报告");
        assert_eq!(theme.primary, BRAND.primary);
        assert_eq!(theme_for(""), &DEFAULT_THEME);
    }

    #[test]
    fn module_ids_round_trip_through_from_str() {
        for module in ReportModule::ALL {
            assert_eq!(module.id().parse::<ReportModule>(), Ok(module));
        }
        assert_eq!(
            "weather".parse::<ReportModule>(),
            Err(PromptError::UnsupportedModule("weather".into()))
        );
    }
}
