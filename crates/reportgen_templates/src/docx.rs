//! WordprocessingML specifics: which parts carry tags, how text is escaped
//! and how images are embedded.

use std::sync::OnceLock;

use regex::Regex;

use crate::archive::TemplateDocument;

pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
pub const MAIN_DOCUMENT_PART: &str = "word/document.xml";

/// Parts without which a container is not a usable template.
pub const REQUIRED_PARTS: &[&str] = &[CONTENT_TYPES_PART, MAIN_DOCUMENT_PART];

/// English Metric Units per pixel at 96 dpi.
pub const EMU_PER_PIXEL: u64 = 9525;

const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const IMAGE_RELATIONSHIP_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

const RUN_BREAK: &str = "</w:t><w:br/><w:t xml:space=\"preserve\">";

fn template_part_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^word/(document|header\d*|footer\d*|footnotes|endnotes)\.xml$")
            .expect("template part pattern is valid")
    })
}

fn doc_pr_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"<wp:docPr\b[^>]*?\bid="(\d+)""#).expect("docPr pattern is valid")
    })
}

/// Whether placeholders in this part are rendered.
pub fn is_template_part(name: &str) -> bool {
    template_part_pattern().is_match(name)
}

/// Names of the tag-bearing parts of a document, in container order.
pub fn template_parts(document: &TemplateDocument) -> Vec<String> {
    document
        .part_names()
        .filter(|name| is_template_part(name))
        .map(str::to_string)
        .collect()
}

/// Whether `c` may appear in an XML 1.0 document.
pub fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n'
            | '\r'
            | '\u{20}'..='\u{D7FF}'
            | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}'
    )
}

/// Escape text for inclusion in element content.
///
/// Characters XML 1.0 forbids are dropped.
pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c if is_xml_char(c) => escaped.push(c),
            _ => {}
        }
    }
    escaped
}

/// Escape a substituted value, turning newlines into run breaks when asked.
///
/// A vertical tab is the soft line break of office exports and counts as a
/// newline.
pub fn text_value(value: &str, linebreaks: bool) -> String {
    let escaped = escape_xml(&value.replace('\u{0B}', "\n"));
    if !linebreaks || !escaped.contains('\n') {
        return escaped;
    }
    escaped
        .replace("\r\n", "\n")
        .split('\n')
        .collect::<Vec<_>>()
        .join(RUN_BREAK)
}

/// Detected image encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
}

impl ImageFormat {
    /// Sniff the format from magic bytes, falling back to PNG.
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Self::Jpeg
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Self::Gif
        } else if bytes.starts_with(b"BM") {
            Self::Bmp
        } else {
            Self::Png
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
        }
    }
}

/// Relationships part that belongs to `part`, e.g.
/// `word/_rels/document.xml.rels` for `word/document.xml`.
pub fn rels_part_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Relationship target of `media` as seen from `part`.
pub fn relative_target(part: &str, media: &str) -> String {
    let dir = part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
    match media.strip_prefix(dir).and_then(|rest| rest.strip_prefix('/')) {
        Some(relative) if !dir.is_empty() => relative.to_string(),
        _ => format!("/{}", media),
    }
}

/// Add an image relationship to a relationships part (or create one).
pub fn add_image_relationship(rels: Option<&str>, id: &str, target: &str) -> String {
    let relationship = format!(
        r#"<Relationship Id="{}" Type="{}" Target="{}"/>"#,
        escape_xml(id),
        IMAGE_RELATIONSHIP_TYPE,
        escape_xml(target)
    );

    let Some(rels) = rels else {
        return format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{}">{}</Relationships>"#,
            RELATIONSHIPS_NS, relationship
        );
    };

    if let Some(pos) = rels.rfind("</Relationships>") {
        let mut updated = String::with_capacity(rels.len() + relationship.len());
        updated.push_str(&rels[..pos]);
        updated.push_str(&relationship);
        updated.push_str(&rels[pos..]);
        return updated;
    }

    // Self-closing root: <Relationships xmlns="..."/>
    match rels.rfind("/>") {
        Some(pos) => format!("{}>{}</Relationships>{}", &rels[..pos], relationship, &rels[pos + 2..]),
        None => rels.to_string(),
    }
}

pub fn has_relationship_id(rels: &str, id: &str) -> bool {
    rels.contains(&format!("Id=\"{}\"", id))
}

/// Register a default content type for `format` unless the extension is
/// already declared.
pub fn ensure_content_type(content_types: &str, format: ImageFormat) -> String {
    let declared = format!("extension=\"{}\"", format.extension());
    if content_types.to_ascii_lowercase().contains(&declared) {
        return content_types.to_string();
    }

    let default = format!(
        r#"<Default Extension="{}" ContentType="{}"/>"#,
        format.extension(),
        format.content_type()
    );
    match content_types.rfind("</Types>") {
        Some(pos) => format!("{}{}{}", &content_types[..pos], default, &content_types[pos..]),
        None => content_types.to_string(),
    }
}

/// Highest `wp:docPr` id used in `markup`.
pub fn max_drawing_id(markup: &str) -> u32 {
    doc_pr_pattern()
        .captures_iter(markup)
        .filter_map(|caps| caps[1].parse::<u32>().ok())
        .max()
        .unwrap_or(0)
}

/// Inline drawing for an embedded image.
///
/// Placeholders sit inside `<w:t>`, and a drawing must be a sibling of the
/// text element, so the text element is closed before and reopened after.
pub fn inline_image(
    relationship_id: &str,
    drawing_id: u32,
    file_name: &str,
    width_px: u32,
    height_px: u32,
) -> String {
    let cx = u64::from(width_px) * EMU_PER_PIXEL;
    let cy = u64::from(height_px) * EMU_PER_PIXEL;
    let name = escape_xml(file_name);
    let rid = escape_xml(relationship_id);

    format!(
        concat!(
            "</w:t><w:drawing>",
            "<wp:inline xmlns:wp=\"http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing\" ",
            "distT=\"0\" distB=\"0\" distL=\"0\" distR=\"0\">",
            "<wp:extent cx=\"{cx}\" cy=\"{cy}\"/>",
            "<wp:effectExtent l=\"0\" t=\"0\" r=\"0\" b=\"0\"/>",
            "<wp:docPr id=\"{id}\" name=\"Picture {id}\"/>",
            "<wp:cNvGraphicFramePr>",
            "<a:graphicFrameLocks xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" noChangeAspect=\"1\"/>",
            "</wp:cNvGraphicFramePr>",
            "<a:graphic xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\">",
            "<a:graphicData uri=\"http://schemas.openxmlformats.org/drawingml/2006/picture\">",
            "<pic:pic xmlns:pic=\"http://schemas.openxmlformats.org/drawingml/2006/picture\">",
            "<pic:nvPicPr><pic:cNvPr id=\"0\" name=\"{name}\"/><pic:cNvPicPr/></pic:nvPicPr>",
            "<pic:blipFill>",
            "<a:blip xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\" r:embed=\"{rid}\"/>",
            "<a:stretch><a:fillRect/></a:stretch>",
            "</pic:blipFill>",
            "<pic:spPr>",
            "<a:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"{cx}\" cy=\"{cy}\"/></a:xfrm>",
            "<a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom>",
            "</pic:spPr>",
            "</pic:pic>",
            "</a:graphicData>",
            "</a:graphic>",
            "</wp:inline>",
            "</w:drawing><w:t xml:space=\"preserve\">"
        ),
        cx = cx,
        cy = cy,
        id = drawing_id,
        name = name,
        rid = rid,
    )
}
