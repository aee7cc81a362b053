//! Integration tests for template rendering.
//!
//! Templates are built in memory as minimal DOCX containers.

use std::io::{Cursor, Write};
use std::sync::Arc;
use std::time::Duration;

use reportgen_assets::MockFetcher;
use reportgen_templates::{
    archive, RenderContext, RenderOptions, TemplateDocument, TemplateError, TemplateRenderer,
    WarningReason,
};
use serde_json::json;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];
const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 16];

fn paragraph(text: &str) -> String {
    format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", text)
}

fn build_docx(body: &str, header: Option<&str>) -> Vec<u8> {
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
        body
    );

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut entries: Vec<(&str, String)> = vec![
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("word/document.xml", document),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS.to_string()),
        ("word/styles.xml", "<w:styles/>".to_string()),
    ];
    if let Some(header) = header {
        entries.push(("word/header1.xml", format!("<w:hdr>{}</w:hdr>", header)));
    }
    for (name, content) in entries {
        writer.start_file(name, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn renderer(fetcher: MockFetcher) -> TemplateRenderer {
    TemplateRenderer::new(RenderOptions::default(), Arc::new(fetcher))
}

fn context(value: serde_json::Value) -> RenderContext {
    RenderContext::from_value(value).unwrap()
}

fn part_text(bytes: &[u8], part: &str) -> String {
    TemplateDocument::open(bytes.to_vec())
        .unwrap()
        .text(part)
        .unwrap_or_default()
        .to_string()
}

#[tokio::test]
async fn test_scenario_name_and_missing_formatted_tag() {
    let template = build_docx(&paragraph("{{Name}}|{{Missing:upper()}}"), None);
    let output = renderer(MockFetcher::new())
        .render_bytes(template, &context(json!({"Name": "Acme"})))
        .await
        .unwrap();

    let body = part_text(&output.bytes, "word/document.xml");
    assert!(body.contains("<w:t>Acme|</w:t>"));
    assert_eq!(output.warning_identifiers(), vec!["Missing"]);
}

#[tokio::test]
async fn test_control_characters_do_not_reach_the_markup() {
    let template = build_docx(&paragraph("{{Note}}"), None);
    let output = renderer(MockFetcher::new())
        .render_bytes(template, &context(json!({"Note": "a\u{0b}b\u{01}c"})))
        .await
        .unwrap();

    let body = part_text(&output.bytes, "word/document.xml");
    assert!(body.contains("<w:t>a</w:t><w:br/><w:t xml:space=\"preserve\">bc</w:t>"));
    assert!(!body.contains('\u{0b}'));
    assert!(!body.contains('\u{01}'));
    assert!(!output.has_warnings());
}

#[tokio::test]
async fn test_formatter_resolves_like_plain_tag() {
    let ctx = context(json!({"Name": "Acme"}));
    let plain = renderer(MockFetcher::new())
        .render_bytes(build_docx(&paragraph("{{Name}}"), None), &ctx)
        .await
        .unwrap();
    let formatted = renderer(MockFetcher::new())
        .render_bytes(build_docx(&paragraph("{{Name:upper()}}"), None), &ctx)
        .await
        .unwrap();

    assert_eq!(
        part_text(&plain.bytes, "word/document.xml"),
        part_text(&formatted.bytes, "word/document.xml")
    );
}

#[tokio::test]
async fn test_surrounding_markup_is_preserved() {
    let body = r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">Client:  {{Client}} </w:t></w:r></w:p>"#;
    let output = renderer(MockFetcher::new())
        .render_bytes(build_docx(body, None), &context(json!({"Client": "Acme"})))
        .await
        .unwrap();

    let expected = body.replace("{{Client}}", "Acme");
    assert!(part_text(&output.bytes, "word/document.xml").contains(&expected));
    assert_eq!(
        part_text(&output.bytes, "word/styles.xml"),
        "<w:styles/>"
    );
}

#[tokio::test]
async fn test_tag_split_across_runs() {
    let body = "<w:p><w:r><w:t>{{Cli</w:t></w:r><w:r><w:rPr><w:i/></w:rPr><w:t>ent}}</w:t></w:r></w:p>";
    let output = renderer(MockFetcher::new())
        .render_bytes(build_docx(body, None), &context(json!({"Client": "Acme"})))
        .await
        .unwrap();

    assert!(part_text(&output.bytes, "word/document.xml").contains(
        "<w:p><w:r><w:t>Acme</w:t></w:r><w:r><w:rPr><w:i/></w:rPr><w:t></w:t></w:r></w:p>"
    ));
    assert!(!output.has_warnings());
}

#[tokio::test]
async fn test_photo_scenario_success_and_failure() {
    let ctx = context(json!({"Photo": {"url": "https://x/y.png"}}));
    let template = build_docx(&paragraph("{%Photo%}"), None);

    let ok = renderer(MockFetcher::new().with_asset("https://x/y.png", PNG))
        .render_bytes(template.clone(), &ctx)
        .await
        .unwrap();
    assert!(!ok.has_warnings());
    let body = part_text(&ok.bytes, "word/document.xml");
    assert!(body.contains("<w:drawing>"));
    assert!(body.contains("cx=\"2381250\" cy=\"2381250\""));
    let rels = part_text(&ok.bytes, "word/_rels/document.xml.rels");
    assert!(rels.contains("Id=\"rId1\""));
    assert!(rels.contains("Target=\"media/reportgen_image1.png\""));

    let failed = renderer(MockFetcher::new())
        .render_bytes(template, &ctx)
        .await
        .unwrap();
    let body = part_text(&failed.bytes, "word/document.xml");
    assert!(!body.contains("<w:drawing>"));
    assert!(body.contains("<w:t></w:t>"));
    assert_eq!(failed.warning_identifiers(), vec!["Photo"]);
    assert!(!part_text(&failed.bytes, "[Content_Types].xml").contains("image/png"));
}

#[tokio::test]
async fn test_both_image_forms_and_attachment_lists() {
    let ctx = context(json!({
        "Logo": "https://x/logo.jpg",
        "Gallery": [{"url": "https://x/a.png", "filename": "a.png"}, {"url": "https://x/b.png"}]
    }));
    let fetcher = MockFetcher::new()
        .with_asset("https://x/logo.jpg", JPEG)
        .with_asset("https://x/a.png", PNG);
    let template = build_docx(&paragraph("{%Logo} {%Gallery%}"), None);

    let output = renderer(fetcher.clone()).render_bytes(template, &ctx).await.unwrap();

    assert!(!output.has_warnings());
    assert_eq!(output.stats.images_embedded, 2);
    assert_eq!(fetcher.calls(), vec!["https://x/logo.jpg", "https://x/a.png"]);

    let doc = TemplateDocument::open(output.bytes).unwrap();
    assert_eq!(doc.bytes("word/media/reportgen_image1.jpeg"), Some(JPEG));
    assert_eq!(doc.bytes("word/media/reportgen_image2.png"), Some(PNG));
    let types = doc.text("[Content_Types].xml").unwrap();
    assert!(types.contains("Extension=\"jpeg\""));
    assert!(types.contains("Extension=\"png\""));
}

#[tokio::test]
async fn test_image_in_header_gets_own_relationships() {
    let template = build_docx(&paragraph("Body"), Some(&paragraph("{%Logo%}")));
    let fetcher = MockFetcher::new().with_asset("https://x/logo.png", PNG);

    let output = renderer(fetcher)
        .render_bytes(template, &context(json!({"Logo": {"url": "https://x/logo.png"}})))
        .await
        .unwrap();

    let rels = part_text(&output.bytes, "word/_rels/header1.xml.rels");
    assert!(rels.contains("Id=\"rIdReportgen1\""));
    assert!(part_text(&output.bytes, "word/header1.xml").contains("r:embed=\"rIdReportgen1\""));
    assert_eq!(
        part_text(&output.bytes, "word/_rels/document.xml.rels"),
        DOCUMENT_RELS
    );
}

#[tokio::test]
async fn test_render_is_idempotent() {
    let ctx = context(json!({"Name": "Acme", "Photo": {"url": "https://x/y.png"}}));
    let template = build_docx(&paragraph("{{Name}} {%Photo%}"), Some(&paragraph("{{Name}}")));
    let fetcher = MockFetcher::new().with_asset("https://x/y.png", PNG);

    let first = renderer(fetcher.clone())
        .render_bytes(template.clone(), &ctx)
        .await
        .unwrap();
    let second = renderer(fetcher)
        .render_bytes(template, &ctx)
        .await
        .unwrap();

    assert_eq!(first.bytes, second.bytes);
}

#[tokio::test]
async fn test_round_trip_without_substitution() {
    let template = build_docx(&paragraph("nothing to do"), Some(&paragraph("still nothing")));
    let document = archive::open(template.clone()).unwrap();
    assert_eq!(archive::reassemble(&document).unwrap(), template);
}

#[tokio::test]
async fn test_corrupt_container_is_fatal() {
    let err = renderer(MockFetcher::new())
        .render_bytes(b"PK\x03\x04 broken".to_vec(), &RenderContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, TemplateError::Archive(_)));
}

#[tokio::test]
async fn test_malformed_tags_are_left_literal_and_reported() {
    let template = build_docx(&paragraph("{{Name}} {{first name}} {{Open"), None);
    let output = renderer(MockFetcher::new())
        .render_bytes(template, &context(json!({"Name": "Acme"})))
        .await
        .unwrap();

    let body = part_text(&output.bytes, "word/document.xml");
    assert!(body.contains("<w:t>Acme {{first name}} {{Open</w:t>"));
    assert_eq!(output.warnings.len(), 2);
    assert!(output
        .warnings
        .iter()
        .all(|w| matches!(w.reason, WarningReason::Malformed(_))));
}

#[tokio::test]
async fn test_image_fetches_are_bounded() {
    let locators: Vec<String> = (0..6).map(|i| format!("https://x/{}.png", i)).collect();
    let fetcher = locators
        .iter()
        .fold(MockFetcher::new(), |f, l| f.with_asset(l.clone(), PNG))
        .with_delay(Duration::from_millis(10));

    let mut payload = serde_json::Map::new();
    let mut body = String::new();
    for (i, locator) in locators.iter().enumerate() {
        payload.insert(format!("Img{}", i), json!({"url": locator}));
        body.push_str(&paragraph(&format!("{{%Img{}%}}", i)));
    }

    let renderer = TemplateRenderer::new(
        RenderOptions::new().fetch_concurrency(2),
        Arc::new(fetcher.clone()),
    );
    let output = renderer
        .render_bytes(build_docx(&body, None), &RenderContext::new(payload))
        .await
        .unwrap();

    assert_eq!(output.stats.images_embedded, 6);
    assert!(fetcher.peak_in_flight() <= 2);
}
