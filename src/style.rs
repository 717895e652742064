//! Text styles for each role in a report, derived from a [`Theme`].

use genpdf::style::{Color, Style};

use crate::theme::Theme;

/// Millimetres per typographic point.
pub const PT_TO_MM: f64 = 25.4 / 72.0;

const BODY_COLOR: Color = Color::Rgb(0x33, 0x33, 0x33);
const MUTED_COLOR: Color = Color::Rgb(0x66, 0x66, 0x66);
const WHITE: Color = Color::Rgb(0xFF, 0xFF, 0xFF);
const GRID_COLOR: Color = Color::Rgb(0xDD, 0xDD, 0xDD);

/// Font size, weight, color and line pitch of a run of text.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextStyle {
    pub font_size: u8,
    pub bold: bool,
    pub color: Color,
    /// Distance between consecutive baselines, in points.
    pub leading: f64,
}

impl TextStyle {
    fn new(font_size: u8, leading: f64, color: Color) -> Self {
        Self {
            font_size,
            bold: false,
            color,
            leading,
        }
    }

    fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    /// Line pitch in millimetres.
    pub fn leading_mm(&self) -> f64 {
        self.leading * PT_TO_MM
    }

    /// Converts to a `genpdf` style for the render pass.
    pub fn to_style(&self) -> Style {
        let mut style = Style::new();
        style.set_font_size(self.font_size);
        style.set_color(self.color);
        if self.bold {
            style.set_bold();
        }
        style
    }
}

/// Resolved styles for one render call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StyleSheet {
    pub theme: Theme,
    pub body: TextStyle,
    pub small: TextStyle,
    pub cover_title: TextStyle,
    pub cover_subtitle: TextStyle,
    pub section_title: TextStyle,
    pub subtitle: TextStyle,
    pub toc_title: TextStyle,
    pub toc_item: TextStyle,
    pub table_header: TextStyle,
    pub table_cell: TextStyle,
    pub card_title: TextStyle,
    pub card_body: TextStyle,
    pub footer: TextStyle,
    /// Header row background.
    pub table_header_fill: Color,
    /// Background of every other body row.
    pub table_stripe_fill: Color,
    pub grid: Color,
}

impl StyleSheet {
    /// Applies the theme to titles, rules, table headers and card accents.
    pub fn themed(theme: &Theme) -> Self {
        Self {
            theme: *theme,
            body: TextStyle::new(11, 18.0, BODY_COLOR),
            small: TextStyle::new(9, 14.0, MUTED_COLOR),
            cover_title: TextStyle::new(30, 36.0, theme.primary).bold(),
            cover_subtitle: TextStyle::new(16, 24.0, MUTED_COLOR),
            section_title: TextStyle::new(18, 24.0, theme.primary).bold(),
            subtitle: TextStyle::new(13, 20.0, theme.dark).bold(),
            toc_title: TextStyle::new(18, 24.0, theme.primary).bold(),
            toc_item: TextStyle::new(10, 14.0, BODY_COLOR),
            table_header: TextStyle::new(10, 15.0, WHITE).bold(),
            table_cell: TextStyle::new(10, 15.0, BODY_COLOR),
            card_title: TextStyle::new(11, 16.0, theme.dark).bold(),
            card_body: TextStyle::new(10, 16.0, BODY_COLOR),
            footer: TextStyle::new(9, 12.0, theme.dark),
            table_header_fill: theme.primary,
            table_stripe_fill: theme.light,
            grid: GRID_COLOR,
        }
    }
}
