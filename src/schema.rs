//! Validates an extracted JSON object against the report shape.
//!
//! Validation walks the whole value and builds a fully typed [`ReportStructure`]; the first field
//! or block tag that does not fit is reported with its path. Unknown object keys are ignored.

use serde_json::{Map, Value};

use crate::error::{StructureError, ValidationError};
use crate::extract::extract_object;
use crate::model::{Block, CoverInfo, HighlightCard, ReportStructure, Section};

/// Block tags accepted by the validator, in documentation order.
pub const BLOCK_TAGS: &[&str] = &["paragraph", "subtitle", "bullets", "table", "highlight_cards"];

type Result<T> = std::result::Result<T, ValidationError>;

/// Runs extraction and validation on raw generated text.
pub fn parse_report(text: &str) -> std::result::Result<ReportStructure, StructureError> {
    let object = extract_object(text)?;
    Ok(validate_report(&object)?)
}

/// Converts a parsed top-level object into a [`ReportStructure`].
pub fn validate_report(object: &Map<String, Value>) -> Result<ReportStructure> {
    let cover = validate_cover(object_field(object, "", "cover")?, "cover")?;
    let sections = array_field(object, "", "sections")?
        .iter()
        .enumerate()
        .map(|(index, value)| validate_section(value, &format!("sections[{index}]")))
        .collect::<Result<Vec<_>>>()?;
    Ok(ReportStructure { cover, sections })
}

fn validate_cover(object: &Map<String, Value>, path: &str) -> Result<CoverInfo> {
    Ok(CoverInfo {
        store_name: string_field(object, path, "store_name")?,
        report_title: string_field(object, path, "report_title")?,
        report_subtitle: string_field(object, path, "report_subtitle")?,
        business_line: string_field(object, path, "business_line")?,
        period_text: string_field(object, path, "period_text")?,
        plan_date: string_field(object, path, "plan_date")?,
    })
}

fn validate_section(value: &Value, path: &str) -> Result<Section> {
    let object = as_object(value, path)?;
    let title = string_field(object, path, "title")?;
    let summary = string_field(object, path, "summary")?;
    let blocks_path = join(path, "blocks");
    let blocks = array_field(object, path, "blocks")?
        .iter()
        .enumerate()
        .map(|(index, value)| validate_block(value, &format!("{blocks_path}[{index}]")))
        .collect::<Result<Vec<_>>>()?;
    Ok(Section {
        title,
        summary,
        blocks,
    })
}

fn validate_block(value: &Value, path: &str) -> Result<Block> {
    let object = as_object(value, path)?;
    let tag = string_field(object, path, "type")?;
    let block = match tag.as_str() {
        "paragraph" => Block::Paragraph {
            text: string_field(object, path, "text")?,
        },
        "subtitle" => Block::Subtitle {
            text: string_field(object, path, "text")?,
        },
        "bullets" => Block::Bullets {
            items: string_list_field(object, path, "items")?,
        },
        "table" => {
            let headers = string_list_field(object, path, "headers")?;
            let rows_path = join(path, "rows");
            let rows = array_field(object, path, "rows")?
                .iter()
                .enumerate()
                .map(|(index, row)| string_list(row, &format!("{rows_path}[{index}]")))
                .collect::<Result<Vec<_>>>()?;
            Block::Table { headers, rows }
        }
        "highlight_cards" => {
            let items_path = join(path, "items");
            let items = array_field(object, path, "items")?
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    let item_path = format!("{items_path}[{index}]");
                    let card = as_object(item, &item_path)?;
                    Ok(HighlightCard {
                        title: string_field(card, &item_path, "title")?,
                        text: string_field(card, &item_path, "text")?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Block::HighlightCards { items }
        }
        unknown => {
            return Err(ValidationError::new(
                join(path, "type"),
                format!(
                    "unknown block type `{unknown}`; expected one of {}",
                    BLOCK_TAGS.join(", ")
                ),
            ))
        }
    };
    Ok(block)
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_owned()
    } else {
        format!("{path}.{key}")
    }
}

fn field<'a>(object: &'a Map<String, Value>, path: &str, key: &str) -> Result<&'a Value> {
    object
        .get(key)
        .ok_or_else(|| ValidationError::new(join(path, key), "missing required field"))
}

fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| ValidationError::new(path, "expected an object"))
}

fn object_field<'a>(
    object: &'a Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<&'a Map<String, Value>> {
    as_object(field(object, path, key)?, &join(path, key))
}

fn array_field<'a>(object: &'a Map<String, Value>, path: &str, key: &str) -> Result<&'a [Value]> {
    field(object, path, key)?
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| ValidationError::new(join(path, key), "expected an array"))
}

fn string_field(object: &Map<String, Value>, path: &str, key: &str) -> Result<String> {
    field(object, path, key)?
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| ValidationError::new(join(path, key), "expected a string"))
}

fn string_list_field(object: &Map<String, Value>, path: &str, key: &str) -> Result<Vec<String>> {
    string_list(field(object, path, key)?, &join(path, key))
}

fn string_list(value: &Value, path: &str) -> Result<Vec<String>> {
    let items = value
        .as_array()
        .ok_or_else(|| ValidationError::new(path, "expected an array of strings"))?;
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            item.as_str().map(str::to_owned).ok_or_else(|| {
                ValidationError::new(format!("{path}[{index}]"), "expected a string")
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cover() -> Value {
        json!({
            "store_name": "示例店",
            "report_title": "店铺活动方案",
            "report_subtitle": "外卖营销策划方案",
            "business_line": "主营：快餐简餐",
            "period_text": "活动周期：2026年01月01日 - 2026年01月31日",
            "plan_date": "策划日期：2026年01月"
        })
    }

    fn validate(value: Value) -> Result<ReportStructure> {
        validate_report(value.as_object().expect("test input is an object"))
    }

    #[test]
    fn validates_every_block_kind() {
        let report = validate(json!({
            "cover": cover(),
            "sections": [{
                "title": "活动目标",
                "summary": "制定短期、中期、长期目标",
                "blocks": [
                    {"type": "paragraph", "text": "测试内容"},
                    {"type": "subtitle", "text": "小标题"},
                    {"type": "bullets", "items": ["一", "二"]},
                    {"type": "table", "headers": ["时间", "动作"], "rows": [["周一", "上新"]]},
                    {"type": "highlight_cards", "items": [{"title": "节点", "text": "上线"}]}
                ]
            }]
        }))
        .expect("valid report");

        assert_eq!(report.cover.store_name, "示例店");
        let tags: Vec<_> = report.sections[0].blocks.iter().map(Block::tag).collect();
        assert_eq!(tags, BLOCK_TAGS);
    }

    #[test]
    fn ignores_unknown_keys() {
        let report = validate(json!({
            "cover": cover(),
            "sections": [],
            "extra": true
        }))
        .expect("extra keys are ignored");
        assert!(report.sections.is_empty());
    }

    #[test]
    fn names_missing_cover_field() {
        let mut cover = cover();
        cover.as_object_mut().unwrap().remove("plan_date");
        let err = validate(json!({"cover": cover, "sections": []})).unwrap_err();
        assert_eq!(err.path(), "cover.plan_date");
        assert_eq!(err.reason(), "missing required field");
    }

    #[test]
    fn names_unknown_block_tag() {
        let err = validate(json!({
            "cover": cover(),
            "sections": [{
                "title": "A",
                "summary": "B",
                "blocks": [{"type": "paragraph", "text": "X"}, {"type": "chart", "data": []}]
            }]
        }))
        .unwrap_err();
        assert_eq!(err.path(), "sections[0].blocks[1].type");
        assert!(err.reason().contains("`chart`"));
        assert_eq!(
            err.to_string(),
            format!(
                "sections[0].blocks[1].type: unknown block type `chart`; expected one of {}",
                BLOCK_TAGS.join(", ")
            )
        );
    }

    #[test]
    fn names_non_string_table_cell() {
        let err = validate(json!({
            "cover": cover(),
            "sections": [{
                "title": "A",
                "summary": "B",
                "blocks": [{"type": "table", "headers": ["a"], "rows": [["ok"], ["x", 3]]}]
            }]
        }))
        .unwrap_err();
        assert_eq!(err.path(), "sections[0].blocks[0].rows[1][1]");
        assert_eq!(err.reason(), "expected a string");
    }

    #[test]
    fn reports_first_failure_only() {
        let err = validate(json!({"sections": 5})).unwrap_err();
        assert_eq!(err.path(), "cover");
    }

    #[test]
    fn parse_report_distinguishes_stages() {
        assert!(matches!(parse_report("nope"), Err(StructureError::Parse(_))));
        assert!(matches!(
            parse_report(r#"{"cover": {}}"#),
            Err(StructureError::Validation(_))
        ));
    }
}
