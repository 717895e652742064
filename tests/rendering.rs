use lopdf::Object;
use sha2::{Digest, Sha256};
use store_report::estimate::A4_HEIGHT_MM;
use store_report::fonts::FontResolver;
use store_report::layout::{compile, RenderPlan};
use store_report::model::{Block, CoverInfo, HighlightCard, ReportStructure, Section};
use store_report::style::StyleSheet;
use store_report::theme::{theme_for, DEFAULT_THEME};
use store_report::{DocumentRenderer, RenderError};

const MM_TO_PT: f64 = 72.0 / 25.4;
const PARAGRAPH: &str = "本月外卖订单量同比增长 23%，主要来自午市套餐与满减活动的拉动。";

fn fonts_available() -> bool {
    if FontResolver::default().fonts_available() {
        true
    } else {
        eprintln!(
            "Skipping: no font family found. Set REPORT_FONTS_DIR or copy assets/fonts next to the binary."
        );
        false
    }
}

fn sample_report(sections: usize) -> ReportStructure {
    let mut report = ReportStructure::new(CoverInfo {
        store_name: "示例店".into(),
        report_title: "店铺活动方案".into(),
        report_subtitle: "外卖营销策划方案".into(),
        business_line: "主营：快餐简餐".into(),
        period_text: "2026年01月".into(),
        plan_date: "2026-01-31".into(),
    });
    for i in 0..sections {
        report = report.with_section(
            Section::new(format!("活动节奏 {}", i + 1), "按周推进满减与返券").with_blocks([
                Block::paragraph(PARAGRAPH.repeat(3)),
                Block::subtitle("执行要点"),
                Block::Bullets {
                    items: vec!["满 30 减 5".into(), "新客立减 8 元".into()],
                },
                Block::Table {
                    headers: vec!["时间".into(), "动作".into(), "目标".into()],
                    rows: vec![
                        vec!["第一周".into(), "上线套餐".into(), "转化".into()],
                        vec!["第二周".into(), "好评返券".into()],
                    ],
                },
                Block::HighlightCards {
                    items: vec![
                        HighlightCard::new("核心目标", "提升下单转化率至 12%"),
                        HighlightCard::new("风险提示", "避免满减叠加导致毛利过低"),
                    ],
                },
            ]),
        );
    }
    report
}

fn render(plan: &RenderPlan, override_height: Option<f64>) -> (Vec<u8>, f64) {
    DocumentRenderer::default()
        .render_plan(plan, override_height, "店铺活动方案")
        .expect("render report")
}

fn number(object: &Object) -> f64 {
    match object {
        Object::Integer(value) => *value as f64,
        Object::Real(value) => *value as f64,
        other => panic!("expected a number, found {other:?}"),
    }
}

/// Page count and MediaBox height (in points) of the first page.
fn inspect(bytes: &[u8]) -> (usize, f64) {
    let document = lopdf::Document::load_mem(bytes).expect("parse rendered PDF");
    let pages = document.get_pages();
    let first = *pages.values().next().expect("at least one page");

    let mut dict = document
        .get_object(first)
        .and_then(Object::as_dict)
        .expect("page dictionary");
    let media_box = loop {
        if let Ok(media_box) = dict.get(b"MediaBox").and_then(Object::as_array) {
            break media_box;
        }
        let parent = dict
            .get(b"Parent")
            .and_then(Object::as_reference)
            .expect("MediaBox on the page or an ancestor");
        dict = document
            .get_object(parent)
            .and_then(Object::as_dict)
            .expect("parent dictionary");
    };
    (pages.len(), number(&media_box[3]) - number(&media_box[1]))
}

fn scrub_pdf(bytes: &[u8]) -> Vec<u8> {
    fn scrub_segment(data: &mut [u8], tag: &[u8], terminator: u8) {
        let mut index = 0;
        while index + tag.len() < data.len() {
            if data[index..].starts_with(tag) {
                let mut cursor = index + tag.len();
                while cursor < data.len() && data[cursor] != terminator {
                    if terminator == b')'
                        || !matches!(data[cursor], b'<' | b'>' | b' ' | b'\n' | b'\r' | b'\t')
                    {
                        data[cursor] = b'0';
                    }
                    cursor += 1;
                }
                index = cursor;
            } else {
                index += 1;
            }
        }
    }

    fn scrub_xml(data: &mut [u8], start: &[u8], end: &[u8]) {
        let mut offset = 0;
        while let Some(start_pos) = data[offset..]
            .windows(start.len())
            .position(|window| window == start)
        {
            let start_index = offset + start_pos + start.len();
            let Some(end_pos) = data[start_index..]
                .windows(end.len())
                .position(|window| window == end)
            else {
                break;
            };
            for byte in &mut data[start_index..start_index + end_pos] {
                if !matches!(*byte, b'<' | b'>' | b'/' | b' ' | b'\n' | b'\r' | b'\t') {
                    *byte = b'0';
                }
            }
            offset = start_index + end_pos + end.len();
        }
    }

    let mut normalized = bytes.to_vec();
    let tags: [&[u8]; 3] = [b"/CreationDate(", b"/ModDate(", b"/Producer("];
    for tag in tags {
        scrub_segment(&mut normalized, tag, b')');
    }
    scrub_segment(&mut normalized, b"/ID[", b']');
    let xml_tags: [(&[u8], &[u8]); 6] = [
        (b"<xmp:CreateDate>", b"</xmp:CreateDate>"),
        (b"<xmp:ModifyDate>", b"</xmp:ModifyDate>"),
        (b"<xmp:MetadataDate>", b"</xmp:MetadataDate>"),
        (b"<xmpMM:DocumentID>", b"</xmpMM:DocumentID>"),
        (b"<xmpMM:InstanceID>", b"</xmpMM:InstanceID>"),
        (b"<xmpMM:VersionID>", b"</xmpMM:VersionID>"),
    ];
    for (start, end) in xml_tags {
        scrub_xml(&mut normalized, start, end);
    }
    normalized
}

fn normalized_hash(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(scrub_pdf(bytes)).into()
}

#[test]
fn short_report_renders_one_a4_page() {
    if !fonts_available() {
        return;
    }
    let overview = Section::new("概览", "本月经营摘要").with_block(Block::paragraph("客流平稳。"));
    let report = ReportStructure::new(sample_report(0).cover).with_section(overview);
    let plan = compile(&report, theme_for("store-activity"));
    let (bytes, height) = render(&plan, None);

    assert!(bytes.starts_with(b"%PDF"));
    assert_eq!(height, A4_HEIGHT_MM);
    let (pages, media_height) = inspect(&bytes);
    assert_eq!(pages, 1);
    assert!((media_height - A4_HEIGHT_MM * MM_TO_PT).abs() < 1.0, "{media_height}");
}

#[test]
fn long_report_stays_on_one_taller_page() {
    if !fonts_available() {
        return;
    }
    let plan = compile(&sample_report(10), theme_for("brand"));
    let (bytes, height) = render(&plan, None);

    assert!(height > A4_HEIGHT_MM);
    let (pages, media_height) = inspect(&bytes);
    assert_eq!(pages, 1, "estimated height must hold all content");
    assert!((media_height - height * MM_TO_PT).abs() < 1.0);
}

#[test]
fn fixed_height_override_paginates() {
    if !fonts_available() {
        return;
    }
    let plan = compile(&sample_report(10), theme_for("market"));
    let (bytes, height) = render(&plan, Some(A4_HEIGHT_MM));

    assert_eq!(height, A4_HEIGHT_MM);
    let (pages, _) = inspect(&bytes);
    assert!(pages > 1);
}

#[test]
fn rendering_is_deterministic() {
    if !fonts_available() {
        return;
    }
    let plan = compile(&sample_report(2), theme_for("data-statistics"));
    let (bytes_a, _) = render(&plan, None);
    let (bytes_b, _) = render(&plan, None);

    assert_eq!(bytes_a.len(), bytes_b.len(), "PDF sizes should match");
    assert_eq!(
        normalized_hash(&bytes_a),
        normalized_hash(&bytes_b),
        "PDF renders must be deterministic after metadata normalization"
    );
}

#[test]
fn empty_unit_sequence_is_rejected() {
    let plan = RenderPlan {
        styles: StyleSheet::themed(&DEFAULT_THEME),
        units: Vec::new(),
    };
    assert!(matches!(
        DocumentRenderer::default().render_plan(&plan, None, "空"),
        Err(RenderError::EmptyDocument)
    ));
}

#[test]
fn missing_fonts_are_reported_with_attempts() {
    let renderer = DocumentRenderer::new(FontResolver::with_directories([std::env::temp_dir()
        .join("store-report-no-fonts")]));
    let plan = compile(&sample_report(1), &DEFAULT_THEME);
    match renderer.render_plan(&plan, None, "报告") {
        Err(RenderError::FontUnavailable { attempts }) => {
            assert!(attempts.contains("store-report-no-fonts"));
        }
        other => panic!("expected FontUnavailable, got {:?}", other.map(|(_, h)| h)),
    }
}
