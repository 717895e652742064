//! Data structures describing a validated report.
//!
//! A [`ReportStructure`] is produced once per request by [`crate::schema`], rewritten in place by
//! [`crate::dates`] and consumed by [`crate::layout`]. It owns every nested value; nothing is
//! shared between reports.

use serde::Serialize;

/// Cover page metadata.
///
/// `period_text` and `plan_date` are replaced during date normalization and are never trusted
/// from generated input.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CoverInfo {
    pub store_name: String,
    pub report_title: String,
    pub report_subtitle: String,
    pub business_line: String,
    pub period_text: String,
    pub plan_date: String,
}

/// A titled card inside a [`Block::HighlightCards`] block.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HighlightCard {
    pub title: String,
    pub text: String,
}

impl HighlightCard {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
        }
    }
}

/// Content blocks that make up a section.
///
/// The set is closed; an unknown `type` tag is rejected during validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    /// Flowing body text.
    Paragraph { text: String },
    /// Emphasized sub-heading.
    Subtitle { text: String },
    /// Bulleted list.
    Bullets { items: Vec<String> },
    /// Grid with a header row.
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    /// Boxed title/text cards.
    HighlightCards { items: Vec<HighlightCard> },
}

impl Block {
    /// Convenience helper for building a paragraph block.
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::Paragraph { text: text.into() }
    }

    /// Convenience helper for building a subtitle block.
    pub fn subtitle(text: impl Into<String>) -> Self {
        Self::Subtitle { text: text.into() }
    }

    /// Returns the wire tag of the block.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Paragraph { .. } => "paragraph",
            Self::Subtitle { .. } => "subtitle",
            Self::Bullets { .. } => "bullets",
            Self::Table { .. } => "table",
            Self::HighlightCards { .. } => "highlight_cards",
        }
    }

    /// Visits every text field of the block mutably.
    pub(crate) fn for_each_text_mut(&mut self, mut visit: impl FnMut(&mut String)) {
        match self {
            Self::Paragraph { text } | Self::Subtitle { text } => visit(text),
            Self::Bullets { items } => items.iter_mut().for_each(visit),
            Self::Table { headers, rows } => {
                headers.iter_mut().for_each(&mut visit);
                rows.iter_mut().flatten().for_each(visit);
            }
            Self::HighlightCards { items } => {
                for card in items {
                    visit(&mut card.title);
                    visit(&mut card.text);
                }
            }
        }
    }
}

/// Logical representation of a report section. Sections are numbered in order, starting at 1.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Section {
    pub title: String,
    pub summary: String,
    pub blocks: Vec<Block>,
}

impl Section {
    /// Creates a new section with the provided title and table-of-contents summary.
    pub fn new(title: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            summary: summary.into(),
            blocks: Vec::new(),
        }
    }

    /// Appends a block and returns the updated section.
    pub fn with_block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    /// Extends the section with additional blocks and returns the updated instance.
    pub fn with_blocks<I>(mut self, blocks: I) -> Self
    where
        I: IntoIterator<Item = Block>,
    {
        self.blocks.extend(blocks);
        self
    }
}

/// Root aggregate: the cover plus ordered sections.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReportStructure {
    pub cover: CoverInfo,
    pub sections: Vec<Section>,
}

impl ReportStructure {
    pub fn new(cover: CoverInfo) -> Self {
        Self {
            cover,
            sections: Vec::new(),
        }
    }

    /// Appends a section and returns the updated report.
    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_blocks_with_type_tag() {
        let block = Block::HighlightCards {
            items: vec![HighlightCard::new("节点", "上线")],
        };
        let value = serde_json::to_value(&block).expect("serialize block");
        assert_eq!(value["type"], "highlight_cards");
        assert_eq!(value["items"][0]["title"], "节点");
        assert_eq!(block.tag(), "highlight_cards");
    }

    #[test]
    fn visits_every_table_cell() {
        let mut block = Block::Table {
            headers: vec!["a".into(), "b".into()],
            rows: vec![vec!["c".into()], vec!["d".into(), "e".into()]],
        };
        let mut seen = Vec::new();
        block.for_each_text_mut(|text| seen.push(text.clone()));
        assert_eq!(seen, ["a", "b", "c", "d", "e"]);
    }
}
