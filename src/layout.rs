//! Compiles a report into renderable units and lays each unit out at a fixed width.
//!
//! [`compile`] produces the ordered unit sequence: cover, table of contents, then for every
//! section a numbered title followed by one unit per block (one per card for highlight cards).
//!
//! [`layout_unit`] turns a unit into stacked [`LayoutBox`]es carrying positioned drawing
//! operations. It is a pure function of the unit, the style sheet, the width and the text metrics,
//! and it is used unchanged by the page-size estimator and by the renderer.

use genpdf::style::Color;

use crate::metrics::{wrap_text, TextMetrics};
use crate::model::{Block, CoverInfo, HighlightCard, ReportStructure};
use crate::style::{StyleSheet, TextStyle, PT_TO_MM};
use crate::theme::Theme;

/// Headers used for a table that arrives without any.
pub const DEFAULT_TABLE_HEADERS: [&str; 2] = ["项", "内容"];
/// Text of the single table-of-contents entry of a report without sections.
pub const EMPTY_TOC_TEXT: &str = "暂无目录";
/// Heading of the table of contents.
pub const TOC_HEADING: &str = "目录";

const BLOCK_GAP_MM: f64 = 4.0;
const RULE_GAP_BEFORE_MM: f64 = 2.0;
const SECTION_RULE_GAP_AFTER_MM: f64 = 4.0;
const TOC_RULE_GAP_AFTER_MM: f64 = 6.0;
const TOC_DOTS: &str = "........................";
const ACCENT_BAR_MM: f64 = 0.7;
const CARD_PADDING_X_PT: f64 = 8.0;
const CARD_PADDING_Y_PT: f64 = 6.0;
const CELL_PADDING_X_PT: f64 = 6.0;
const CELL_PADDING_Y_PT: f64 = 4.0;
const BULLET_INDENT_PT: f64 = 14.0;
const BULLET: &str = "•";
const SUBTITLE_GAP_MM: f64 = 2.0;

const COVER_TOP_MM: f64 = 40.0;
const COVER_TITLE_GAP_MM: f64 = 6.0;
const COVER_META_GAP_MM: f64 = 24.0;
const COVER_LINE_GAPS_MM: [f64; 4] = [0.0, 4.0, 3.0, 3.0];
const COVER_BOTTOM_MM: f64 = 12.0;

/// Table-of-contents line for one section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TocEntry {
    /// 1-based section number.
    pub index: usize,
    pub title: String,
    pub summary: String,
}

/// Transient layout object for one structural element of a report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderableUnit {
    Cover(CoverInfo),
    TableOfContents(Vec<TocEntry>),
    SectionTitle { index: usize, title: String },
    Paragraph(String),
    Subtitle(String),
    Bullets(Vec<String>),
    /// Rows are already normalized to the header's column count.
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    HighlightCard(HighlightCard),
}

impl RenderableUnit {
    /// Whether the unit must never be split across pages.
    pub fn keep_together(&self) -> bool {
        matches!(
            self,
            Self::Cover(_) | Self::SectionTitle { .. } | Self::Subtitle(_) | Self::HighlightCard(_)
        )
    }
}

/// Units of one report together with the styles they are drawn with.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderPlan {
    pub styles: StyleSheet,
    pub units: Vec<RenderableUnit>,
}

impl RenderPlan {
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Lays out every unit at `width`.
    pub fn layout(&self, width: f64, metrics: &dyn TextMetrics) -> Vec<UnitLayout> {
        self.units
            .iter()
            .map(|unit| layout_unit(unit, &self.styles, width, metrics))
            .collect()
    }
}

/// Converts a report into its ordered unit sequence, styled with `theme`.
pub fn compile(report: &ReportStructure, theme: &Theme) -> RenderPlan {
    let mut units = vec![
        RenderableUnit::Cover(report.cover.clone()),
        RenderableUnit::TableOfContents(
            report
                .sections
                .iter()
                .enumerate()
                .map(|(i, section)| TocEntry {
                    index: i + 1,
                    title: section.title.clone(),
                    summary: section.summary.clone(),
                })
                .collect(),
        ),
    ];

    for (i, section) in report.sections.iter().enumerate() {
        units.push(RenderableUnit::SectionTitle {
            index: i + 1,
            title: section.title.clone(),
        });
        for block in &section.blocks {
            compile_block(block, &mut units);
        }
    }

    RenderPlan {
        styles: StyleSheet::themed(theme),
        units,
    }
}

fn compile_block(block: &Block, units: &mut Vec<RenderableUnit>) {
    match block {
        Block::Paragraph { text } => units.push(RenderableUnit::Paragraph(text.clone())),
        Block::Subtitle { text } => units.push(RenderableUnit::Subtitle(text.clone())),
        Block::Bullets { items } => units.push(RenderableUnit::Bullets(items.clone())),
        Block::Table { headers, rows } => {
            let headers = if headers.is_empty() {
                DEFAULT_TABLE_HEADERS.iter().map(|h| h.to_string()).collect()
            } else {
                headers.clone()
            };
            let rows = normalize_rows(rows, headers.len());
            units.push(RenderableUnit::Table { headers, rows });
        }
        Block::HighlightCards { items } => units.extend(
            items
                .iter()
                .cloned()
                .map(RenderableUnit::HighlightCard),
        ),
    }
}

/// Truncates or pads every row to exactly `columns` cells.
pub fn normalize_rows(rows: &[Vec<String>], columns: usize) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| {
            let mut row: Vec<String> = row.iter().take(columns).cloned().collect();
            row.resize(columns, String::new());
            row
        })
        .collect()
}

/// Positioned drawing operation, relative to the top-left corner of its box, in millimetres.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    /// One line of text whose line box starts at `y`.
    Text {
        x: f64,
        y: f64,
        text: String,
        style: TextStyle,
    },
    /// Solid rectangle.
    Fill {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        color: Color,
    },
    /// Straight hairline.
    Line {
        from: (f64, f64),
        to: (f64, f64),
        color: Color,
    },
}

/// A horizontal slice of a unit; boxes are never split.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayoutBox {
    pub height: f64,
    pub ops: Vec<DrawOp>,
}

impl LayoutBox {
    fn spacer(height: f64) -> Self {
        Self {
            height,
            ops: Vec::new(),
        }
    }
}

/// Laid-out unit: boxes stacked top to bottom.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UnitLayout {
    pub boxes: Vec<LayoutBox>,
    pub keep_together: bool,
}

impl UnitLayout {
    /// Total vertical extent in millimetres.
    pub fn height(&self) -> f64 {
        self.boxes.iter().map(|b| b.height).sum()
    }
}

/// Lays out one unit at `width` millimetres.
pub fn layout_unit(
    unit: &RenderableUnit,
    styles: &StyleSheet,
    width: f64,
    metrics: &dyn TextMetrics,
) -> UnitLayout {
    let cx = LayoutContext {
        styles,
        width,
        metrics,
    };
    let boxes = match unit {
        RenderableUnit::Cover(cover) => vec![cx.cover(cover)],
        RenderableUnit::TableOfContents(entries) => cx.table_of_contents(entries),
        RenderableUnit::SectionTitle { index, title } => vec![cx.section_title(*index, title)],
        RenderableUnit::Paragraph(text) => cx.paragraph(text),
        RenderableUnit::Subtitle(text) => vec![cx.subtitle(text)],
        RenderableUnit::Bullets(items) => cx.bullets(items),
        RenderableUnit::Table { headers, rows } => cx.table(headers, rows),
        RenderableUnit::HighlightCard(card) => cx.highlight_card(card),
    };
    UnitLayout {
        boxes,
        keep_together: unit.keep_together(),
    }
}

struct LayoutContext<'a> {
    styles: &'a StyleSheet,
    width: f64,
    metrics: &'a dyn TextMetrics,
}

/// Offset that centers a line of `style` text within its leading.
fn baseline_inset(style: &TextStyle) -> f64 {
    ((style.leading - 1.2 * f64::from(style.font_size)) / 2.0).max(0.0) * PT_TO_MM
}

impl LayoutContext<'_> {
    fn wrap(&self, text: &str, width: f64, style: &TextStyle) -> Vec<String> {
        wrap_text(text, width.max(1.0), style, self.metrics)
    }

    /// Appends wrapped lines to `ops` starting at `y`; returns the consumed height.
    fn push_lines(
        &self,
        ops: &mut Vec<DrawOp>,
        lines: Vec<String>,
        x: f64,
        y: f64,
        style: &TextStyle,
    ) -> f64 {
        let leading = style.leading_mm();
        let count = lines.len();
        for (i, line) in lines.into_iter().enumerate() {
            ops.push(DrawOp::Text {
                x,
                y: y + i as f64 * leading + baseline_inset(style),
                text: line,
                style: *style,
            });
        }
        count as f64 * leading
    }

    fn push_centered(&self, ops: &mut Vec<DrawOp>, text: &str, y: f64, style: &TextStyle) -> f64 {
        let leading = style.leading_mm();
        let lines = self.wrap(text, self.width, style);
        let count = lines.len();
        for (i, line) in lines.into_iter().enumerate() {
            let x = ((self.width - self.metrics.text_width(&line, style)) / 2.0).max(0.0);
            ops.push(DrawOp::Text {
                x,
                y: y + i as f64 * leading + baseline_inset(style),
                text: line,
                style: *style,
            });
        }
        count as f64 * leading
    }

    fn rule(&self, y: f64, color: Color) -> DrawOp {
        DrawOp::Line {
            from: (0.0, y),
            to: (self.width, y),
            color,
        }
    }

    fn cover(&self, cover: &CoverInfo) -> LayoutBox {
        let styles = self.styles;
        let mut ops = Vec::new();
        let mut y = COVER_TOP_MM;
        y += self.push_centered(&mut ops, &cover.store_name, y, &styles.cover_title);
        y += COVER_TITLE_GAP_MM;
        y += self.push_centered(&mut ops, &cover.report_title, y, &styles.cover_subtitle);
        y += COVER_META_GAP_MM;

        let meta = [
            &cover.report_subtitle,
            &cover.business_line,
            &cover.period_text,
            &cover.plan_date,
        ];
        for (gap, text) in COVER_LINE_GAPS_MM.iter().zip(meta) {
            y += gap;
            let lines = self.wrap(text, self.width, &styles.small);
            y += self.push_lines(&mut ops, lines, 0.0, y, &styles.small);
        }

        y += COVER_BOTTOM_MM / 2.0;
        ops.push(self.rule(y, styles.theme.primary));
        y += COVER_BOTTOM_MM / 2.0;
        LayoutBox { height: y, ops }
    }

    fn table_of_contents(&self, entries: &[TocEntry]) -> Vec<LayoutBox> {
        let styles = self.styles;
        let mut heading = Vec::new();
        let lines = self.wrap(TOC_HEADING, self.width, &styles.toc_title);
        let mut y = self.push_lines(&mut heading, lines, 0.0, 0.0, &styles.toc_title);
        y += RULE_GAP_BEFORE_MM;
        heading.push(self.rule(y, styles.theme.primary));
        y += TOC_RULE_GAP_AFTER_MM;

        let mut boxes = vec![LayoutBox {
            height: y,
            ops: heading,
        }];

        let texts: Vec<String> = if entries.is_empty() {
            vec![EMPTY_TOC_TEXT.to_owned()]
        } else {
            entries
                .iter()
                .map(|entry| {
                    format!(
                        "{}. {} {TOC_DOTS} {}",
                        entry.index, entry.title, entry.summary
                    )
                })
                .collect()
        };
        for text in texts {
            boxes.push(self.accent_box(&[(text.as_str(), &styles.toc_item)]));
        }
        boxes.push(LayoutBox::spacer(BLOCK_GAP_MM * 2.0));
        boxes
    }

    /// Light panel with a primary accent bar on the left, holding the given text runs.
    fn accent_box(&self, runs: &[(&str, &TextStyle)]) -> LayoutBox {
        let pad_x = CARD_PADDING_X_PT * PT_TO_MM;
        let pad_y = CARD_PADDING_Y_PT * PT_TO_MM;
        let inner = self.width - 2.0 * pad_x;

        let mut text_ops = Vec::new();
        let mut y = pad_y;
        for (text, style) in runs {
            let lines = self.wrap(text, inner, style);
            y += self.push_lines(&mut text_ops, lines, pad_x, y, style);
        }
        let height = y + pad_y;

        let theme = &self.styles.theme;
        let mut ops = vec![
            DrawOp::Fill {
                x: 0.0,
                y: 0.0,
                width: self.width,
                height,
                color: theme.light,
            },
            DrawOp::Fill {
                x: 0.0,
                y: 0.0,
                width: ACCENT_BAR_MM,
                height,
                color: theme.primary,
            },
        ];
        ops.extend(text_ops);
        LayoutBox { height, ops }
    }

    fn section_title(&self, index: usize, title: &str) -> LayoutBox {
        let styles = self.styles;
        let mut ops = Vec::new();
        let lines = self.wrap(&format!("{index}. {title}"), self.width, &styles.section_title);
        let mut y = self.push_lines(&mut ops, lines, 0.0, 0.0, &styles.section_title);
        y += RULE_GAP_BEFORE_MM;
        ops.push(self.rule(y, styles.theme.primary));
        y += SECTION_RULE_GAP_AFTER_MM;
        LayoutBox { height: y, ops }
    }

    /// One box per line so long paragraphs can flow.
    fn line_boxes(&self, lines: Vec<String>, x: f64, style: &TextStyle) -> Vec<LayoutBox> {
        lines
            .into_iter()
            .map(|line| {
                let mut ops = Vec::new();
                let height = self.push_lines(&mut ops, vec![line], x, 0.0, style);
                LayoutBox { height, ops }
            })
            .collect()
    }

    fn paragraph(&self, text: &str) -> Vec<LayoutBox> {
        let style = &self.styles.body;
        let mut boxes = self.line_boxes(self.wrap(text, self.width, style), 0.0, style);
        boxes.push(LayoutBox::spacer(BLOCK_GAP_MM));
        boxes
    }

    fn subtitle(&self, text: &str) -> LayoutBox {
        let style = &self.styles.subtitle;
        let mut ops = Vec::new();
        let lines = self.wrap(text, self.width, style);
        let height = self.push_lines(&mut ops, lines, 0.0, SUBTITLE_GAP_MM, style);
        LayoutBox {
            height: height + 2.0 * SUBTITLE_GAP_MM,
            ops,
        }
    }

    fn bullets(&self, items: &[String]) -> Vec<LayoutBox> {
        let style = &self.styles.body;
        let indent = BULLET_INDENT_PT * PT_TO_MM;
        let mut boxes = Vec::new();
        for item in items {
            let lines = self.wrap(item, self.width - indent, style);
            let mut item_boxes = self.line_boxes(lines, indent, style);
            if let Some(first) = item_boxes.first_mut() {
                first.ops.push(DrawOp::Text {
                    x: indent / 3.0,
                    y: baseline_inset(style),
                    text: BULLET.to_owned(),
                    style: *style,
                });
            }
            boxes.extend(item_boxes);
        }
        boxes.push(LayoutBox::spacer(BLOCK_GAP_MM));
        boxes
    }

    fn table(&self, headers: &[String], rows: &[Vec<String>]) -> Vec<LayoutBox> {
        let styles = self.styles;
        let columns = headers.len().max(1);
        let mut boxes = Vec::with_capacity(rows.len() + 2);
        boxes.push(self.table_row(
            headers,
            columns,
            &styles.table_header,
            Some(styles.table_header_fill),
            true,
        ));
        for (i, row) in rows.iter().enumerate() {
            let fill = (i % 2 == 1).then_some(styles.table_stripe_fill);
            boxes.push(self.table_row(row, columns, &styles.table_cell, fill, false));
        }
        boxes.push(LayoutBox::spacer(BLOCK_GAP_MM));
        boxes
    }

    fn table_row(
        &self,
        cells: &[String],
        columns: usize,
        style: &TextStyle,
        fill: Option<Color>,
        top_border: bool,
    ) -> LayoutBox {
        let column_width = self.width / columns as f64;
        let pad_x = CELL_PADDING_X_PT * PT_TO_MM;
        let pad_y = CELL_PADDING_Y_PT * PT_TO_MM;

        let mut text_ops = Vec::new();
        let mut content_height: f64 = 0.0;
        for (i, cell) in cells.iter().enumerate().take(columns) {
            let x = i as f64 * column_width + pad_x;
            let lines = self.wrap(cell, column_width - 2.0 * pad_x, style);
            let height = self.push_lines(&mut text_ops, lines, x, pad_y, style);
            content_height = content_height.max(height);
        }
        let height = content_height.max(style.leading_mm()) + 2.0 * pad_y;

        let grid = self.styles.grid;
        let mut ops = Vec::new();
        if let Some(color) = fill {
            ops.push(DrawOp::Fill {
                x: 0.0,
                y: 0.0,
                width: self.width,
                height,
                color,
            });
        }
        ops.extend(text_ops);
        if top_border {
            ops.push(self.rule(0.0, grid));
        }
        ops.push(self.rule(height, grid));
        for column in 0..=columns {
            let x = column as f64 * column_width;
            ops.push(DrawOp::Line {
                from: (x, 0.0),
                to: (x, height),
                color: grid,
            });
        }
        LayoutBox { height, ops }
    }

    fn highlight_card(&self, card: &HighlightCard) -> Vec<LayoutBox> {
        let styles = self.styles;
        vec![
            self.accent_box(&[
                (card.title.as_str(), &styles.card_title),
                (card.text.as_str(), &styles.card_body),
            ]),
            LayoutBox::spacer(BLOCK_GAP_MM),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::EmWidthMetrics;
    use crate::model::{Section, HighlightCard};
    use crate::theme::theme_for;

    const WIDTH: f64 = 166.0;

    fn report() -> ReportStructure {
        ReportStructure::new(CoverInfo {
            store_name: "示例店".into(),
            report_title: "店铺活动方案".into(),
            ..CoverInfo::default()
        })
        .with_section(Section::new("A", "B").with_blocks([
            Block::paragraph("X"),
            Block::subtitle("Y"),
            Block::Bullets {
                items: vec!["one".into(), "two".into()],
            },
            Block::Table {
                headers: vec!["h1".into(), "h2".into(), "h3".into()],
                rows: vec![
                    vec!["a".into()],
                    vec!["a".into(), "b".into(), "c".into(), "d".into()],
                ],
            },
            Block::HighlightCards {
                items: vec![HighlightCard::new("t1", "x1"), HighlightCard::new("t2", "x2")],
            },
        ]))
        .with_section(Section::new("C", "D"))
    }

    #[test]
    fn compiles_units_in_reading_order() {
        let plan = compile(&report(), theme_for("brand"));
        let kinds: Vec<&str> = plan
            .units
            .iter()
            .map(|unit| match unit {
                RenderableUnit::Cover(_) => "cover",
                RenderableUnit::TableOfContents(_) => "toc",
                RenderableUnit::SectionTitle { .. } => "section",
                RenderableUnit::Paragraph(_) => "paragraph",
                RenderableUnit::Subtitle(_) => "subtitle",
                RenderableUnit::Bullets(_) => "bullets",
                RenderableUnit::Table { .. } => "table",
                RenderableUnit::HighlightCard(_) => "card",
            })
            .collect();
        assert_eq!(
            kinds,
            [
                "cover", "toc", "section", "paragraph", "subtitle", "bullets", "table", "card",
                "card", "section"
            ]
        );
        assert_eq!(
            plan.units[1],
            RenderableUnit::TableOfContents(vec![
                TocEntry {
                    index: 1,
                    title: "A".into(),
                    summary: "B".into()
                },
                TocEntry {
                    index: 2,
                    title: "C".into(),
                    summary: "D".into()
                },
            ])
        );
        assert_eq!(
            plan.units[9],
            RenderableUnit::SectionTitle {
                index: 2,
                title: "C".into()
            }
        );
    }

    #[test]
    fn table_rows_match_header_width() {
        let plan = compile(&report(), theme_for("brand"));
        let RenderableUnit::Table { headers, rows } = &plan.units[6] else {
            panic!("expected a table unit");
        };
        assert_eq!(headers.len(), 3);
        assert_eq!(rows[0], ["a", "", ""]);
        assert_eq!(rows[1], ["a", "b", "c"]);
    }

    #[test]
    fn table_without_headers_uses_defaults() {
        let mut units = Vec::new();
        compile_block(
            &Block::Table {
                headers: Vec::new(),
                rows: vec![vec!["x".into()]],
            },
            &mut units,
        );
        assert_eq!(
            units[0],
            RenderableUnit::Table {
                headers: vec!["项".into(), "内容".into()],
                rows: vec![vec!["x".into(), String::new()]],
            }
        );
    }

    #[test]
    fn header_row_uses_theme_fill() {
        let theme = theme_for("market");
        let plan = compile(&report(), theme);
        let layout = layout_unit(&plan.units[6], &plan.styles, WIDTH, &EmWidthMetrics);
        assert!(!layout.keep_together);
        assert_eq!(layout.boxes.len(), 4);
        assert!(matches!(
            layout.boxes[0].ops[0],
            DrawOp::Fill { color, .. } if color == theme.primary
        ));
        let header_texts = layout.boxes[0]
            .ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Text { style, .. } if style.bold))
            .count();
        assert_eq!(header_texts, 3);
    }

    #[test]
    fn cards_are_atomic_and_sections_flow() {
        let plan = compile(&report(), theme_for("brand"));
        let card = layout_unit(&plan.units[7], &plan.styles, WIDTH, &EmWidthMetrics);
        assert!(card.keep_together);
        let paragraph = layout_unit(&plan.units[3], &plan.styles, WIDTH, &EmWidthMetrics);
        assert!(!paragraph.keep_together);
    }

    #[test]
    fn empty_report_lists_placeholder_toc_entry() {
        let plan = compile(&ReportStructure::default(), theme_for("brand"));
        assert_eq!(plan.units.len(), 2);
        let toc = layout_unit(&plan.units[1], &plan.styles, WIDTH, &EmWidthMetrics);
        let has_placeholder = toc.boxes.iter().flat_map(|b| &b.ops).any(
            |op| matches!(op, DrawOp::Text { text, .. } if text == EMPTY_TOC_TEXT),
        );
        assert!(has_placeholder);
    }

    #[test]
    fn longer_text_is_taller() {
        let plan = compile(&report(), theme_for("brand"));
        let short = layout_unit(
            &RenderableUnit::Paragraph("短".into()),
            &plan.styles,
            WIDTH,
            &EmWidthMetrics,
        );
        let long = layout_unit(
            &RenderableUnit::Paragraph("长".repeat(500)),
            &plan.styles,
            WIDTH,
            &EmWidthMetrics,
        );
        assert!(long.height() > short.height());
        assert!(long.boxes.len() > 2);
    }

    #[test]
    fn text_stays_inside_width() {
        let plan = compile(&report(), theme_for("brand"));
        let unit = RenderableUnit::Bullets(vec!["很长的要点".repeat(30)]);
        let layout = layout_unit(&unit, &plan.styles, WIDTH, &EmWidthMetrics);
        for op in layout.boxes.iter().flat_map(|b| &b.ops) {
            if let DrawOp::Text { x, text, style, .. } = op {
                assert!(x + EmWidthMetrics.text_width(text, style) <= WIDTH + 1e-6);
            }
        }
    }
}
