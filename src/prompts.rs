//! Initial prompts for each report module.
//!
//! Every prompt lists the submitted form fields (missing ones read `未提供`) followed by the
//! structured-output rules the validator expects.

use serde_json::{Map, Value};

use crate::error::PromptError;
use crate::theme::ReportModule;

/// System message of the initial generation request.
pub const SYSTEM_PROMPT: &str =
    "你是一位资深的餐饮外卖运营与市场分析专家。请严格按照JSON规则输出，不要附加多余文字。";

/// Placeholder for a form field that was not submitted.
pub const MISSING: &str = "未提供";

/// Most menu items quoted in a store-activity prompt.
pub const MENU_ITEM_LIMIT: usize = 30;

/// Shape of the object the model must return.
pub const JSON_RULES: &str = r#"请严格输出 JSON 对象，不要输出 Markdown 或 HTML，不要用 ``` 包裹。
顶层字段：cover、sections。
cover 字段包含：
- store_name
- report_title
- report_subtitle
- business_line
- period_text
- plan_date

sections 为数组，每项包含：
- title（章节标题）
- summary（目录摘要，一句话）
- blocks（内容块数组）

blocks 支持类型：
1) {"type": "paragraph", "text": "..."}
2) {"type": "subtitle", "text": "..."}
3) {"type": "bullets", "items": ["..."] }
4) {"type": "table", "headers": ["..."], "rows": [["..."]] }
5) {"type": "highlight_cards", "items": [{"title": "...", "text": "..."}] }"#;

const OUTPUT_REQUIREMENT: &str =
    "要求：不要输出任何问候/开场白；按文末 JSON 规则组织全部内容。\n\n";

/// Builds the prompt for a module identifier.
pub fn build_prompt_for(module_id: &str, payload: &Value) -> Result<String, PromptError> {
    let module: ReportModule = module_id.parse()?;
    Ok(build_prompt(module, payload))
}

/// Builds the prompt for `module` from a JSON object of form fields.
pub fn build_prompt(module: ReportModule, payload: &Value) -> String {
    let empty = Map::new();
    let fields = payload.as_object().unwrap_or(&empty);
    let body = match module {
        ReportModule::Brand => brand(fields),
        ReportModule::Market => market(fields),
        ReportModule::StoreActivity => store_activity(fields),
        ReportModule::DataStatistics => data_statistics(fields),
    };
    format!("{body}\n{JSON_RULES}\n")
}

/// Trimmed text of the first non-empty string field among `keys`.
fn text(fields: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|key| fields.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .unwrap_or(MISSING)
        .to_owned()
}

/// Display form of any scalar field.
fn value(fields: &Map<String, Value>, key: &str) -> String {
    match fields.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_owned(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(true)) => "是".to_owned(),
        Some(Value::Bool(false)) => "否".to_owned(),
        _ => MISSING.to_owned(),
    }
}

fn brand(fields: &Map<String, Value>) -> String {
    format!(
        "请基于以下信息输出一份餐饮品牌定位分析报告。\n{OUTPUT_REQUIREMENT}\
         ## 店铺信息\n\
         - 店铺名称：{}\n\
         - 经营品类：{}\n\
         - 店铺地址：{}\n\
         - 目标客群：{}\n\
         - 人均价格：{}\n\
         - 主营产品：{}\n\n\
         请重点给出：定位结论、差异化卖点、菜单结构建议、价格带建议、包装与品牌表达建议、\
         美团外卖运营建议（转化、复购、活动）。\n",
        text(fields, &["storeName"]),
        text(fields, &["category"]),
        text(fields, &["address"]),
        text(fields, &["targetGroup"]),
        text(fields, &["priceRange"]),
        text(fields, &["mainProducts"]),
    )
}

fn market(fields: &Map<String, Value>) -> String {
    let screenshot = fields
        .get("enableScreenshotAnalysis")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let hint = if screenshot {
        "开启（会提供一张美团外卖竞品截图，请结合截图内容给出分析与建议。）"
    } else {
        "关闭（不提供截图，仅根据文本信息分析。）"
    };
    format!(
        "请输出一份商圈调研分析报告（面向外卖经营/选址/投放决策）。\n{OUTPUT_REQUIREMENT}\
         ## 商圈信息\n\
         - 商圈名称：{}\n\
         - 所在位置：{}\n\
         - 商圈类型：{}\n\
         - 拟开店/参考店铺：{}\n\
         - 截图分析：{hint}\n\n\
         请覆盖：客群画像、消费水平、餐饮业态、竞争强度、机会点与风险点、\
         针对美团外卖的具体动作（菜品结构、定价、活动、配送、评价与复购）。\n",
        text(fields, &["areaName"]),
        text(fields, &["location"]),
        text(fields, &["areaType"]),
        text(fields, &["storeName"]),
    )
}

fn menu_preview(menu: Option<&Value>) -> String {
    let lines: Vec<String> = match menu {
        Some(Value::Array(items)) => items
            .iter()
            .take(MENU_ITEM_LIMIT)
            .filter_map(|item| {
                let name = item.get("name").and_then(Value::as_str).map(str::trim)?;
                if name.is_empty() {
                    return None;
                }
                let price = match item.get("price") {
                    Some(Value::String(p)) if !p.trim().is_empty() => p.trim().to_owned(),
                    Some(Value::Number(n)) => n.to_string(),
                    _ => "未标价".to_owned(),
                };
                Some(format!("- {name}（{price}）"))
            })
            .collect(),
        Some(Value::String(items)) => items
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .take(MENU_ITEM_LIMIT)
            .map(|line| format!("- {line}"))
            .collect(),
        _ => Vec::new(),
    };
    if lines.is_empty() {
        format!("- {MISSING}")
    } else {
        lines.join("\n")
    }
}

fn store_activity(fields: &Map<String, Value>) -> String {
    format!(
        "请基于以下信息输出一份“美团外卖店铺活动方案”。\n{OUTPUT_REQUIREMENT}\
         ## 店铺信息\n\
         - 店铺名称：{}\n\
         - 店铺地址：{}\n\
         - 经营品类：{}\n\
         - 营业时间：{}\n\n\
         ## 菜品（节选）\n{}\n\n\
         请给出：满减/配送费/返券/秒杀/套餐搭配/好评返券等方案，\
         并包含执行时间、门槛、目标（转化/复购/评分）与注意事项。\n",
        text(fields, &["storeName", "store-name"]),
        text(fields, &["storeAddress", "store-address"]),
        text(fields, &["businessCategory", "business-category"]),
        text(fields, &["businessHours", "business-hours"]),
        menu_preview(fields.get("menuItems")),
    )
}

fn data_statistics(fields: &Map<String, Value>) -> String {
    let v = |key: &str| value(fields, key);
    format!(
        "请基于以下30天运营数据，输出一份外卖店铺数据统计分析报告。\n{OUTPUT_REQUIREMENT}\
         ## 店铺信息\n\
         - 店铺名称：{}\n\
         - 店铺地址：{}\n\
         - 经营品类：{}\n\
         - 营业时间：{}\n\n\
         ## 核心漏斗数据（30天）\n\
         - 曝光人数：{}\n\
         - 入店人数：{}\n\
         - 下单人数：{}\n\
         - 入店转化率：{}%\n\
         - 下单转化率：{}%\n\n\
         ## 配送服务设置\n\
         - 起送价：{}\n\
         - 配送费：{}\n\
         - 配送范围：{}\n\n\
         ## 店铺权重与服务开通\n\
         - 闲时出餐时长：{}分钟\n\
         - 忙时出餐时长：{}分钟\n\
         - 青山公益：{}\n\
         - 到店自取：{}\n\
         - 接受预订单：{}\n\
         - 准时宝：{}\n\
         - 放心吃：{}\n\n\
         请分析：漏斗问题定位、配送竞争力、店铺权重设置影响、\
         以及最重要的3-5条可执行优化动作（按优先级排序）。\n",
        text(fields, &["storeName"]),
        text(fields, &["storeAddress"]),
        text(fields, &["businessCategory"]),
        text(fields, &["businessHours"]),
        v("exposureCount"),
        v("visitCount"),
        v("orderCount"),
        v("visitConversion"),
        v("orderConversion"),
        v("minOrderPrice"),
        v("deliveryFee"),
        v("deliveryRange"),
        v("idleCookingTime"),
        v("busyCookingTime"),
        v("greenCharity"),
        v("selfPickup"),
        v("preOrder"),
        v("onTimeGuarantee"),
        v("foodSafety"),
    )
}
