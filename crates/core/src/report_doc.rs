//! Word (.docx) rendering of analysis results.
//!
//! A `.docx` file is a zip of WordprocessingML parts. The analysis JSON is
//! first flattened into [`Block`]s (title, headings, paragraphs, bullets),
//! then serialized into `word/document.xml` alongside the fixed package
//! parts.

use std::io::{Cursor, Write};

use chrono::{DateTime, Utc};
use serde_json::Value;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::CoreError;

pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Nesting below this depth is rendered as inline JSON.
const MAX_HEADING_DEPTH: usize = 3;

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
<Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>
</Types>"#;

const PACKAGE_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

const DOCUMENT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:rPr><w:sz w:val="22"/></w:rPr></w:style>
<w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/><w:basedOn w:val="Normal"/><w:rPr><w:b/><w:sz w:val="40"/></w:rPr></w:style>
<w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:rPr><w:b/><w:sz w:val="32"/></w:rPr></w:style>
<w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/><w:basedOn w:val="Normal"/><w:rPr><w:b/><w:sz w:val="28"/></w:rPr></w:style>
<w:style w:type="paragraph" w:styleId="Heading3"><w:name w:val="heading 3"/><w:basedOn w:val="Normal"/><w:rPr><w:b/><w:sz w:val="24"/></w:rPr></w:style>
</w:styles>"#;

/// One paragraph-level element of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Title(String),
    Heading(usize, String),
    Paragraph(String),
    Bullet(String),
}

/// `risk_assessment` → `Risk Assessment`.
pub fn humanize_key(key: &str) -> String {
    key.split(['_', '-'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => "n/a".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn push_value(blocks: &mut Vec<Block>, key: Option<&str>, value: &Value, depth: usize) {
    match value {
        Value::Object(map) if depth <= MAX_HEADING_DEPTH => {
            if let Some(key) = key {
                blocks.push(Block::Heading(depth, humanize_key(key)));
            }
            for (k, v) in map {
                push_value(blocks, Some(k.as_str()), v, depth + 1);
            }
        }
        Value::Array(items) if depth <= MAX_HEADING_DEPTH => {
            if let Some(key) = key {
                blocks.push(Block::Heading(depth, humanize_key(key)));
            }
            if items.is_empty() {
                blocks.push(Block::Paragraph("None".to_string()));
            }
            for item in items {
                match item {
                    Value::Object(_) | Value::Array(_) => {
                        blocks.push(Block::Bullet(item.to_string()));
                    }
                    scalar => blocks.push(Block::Bullet(scalar_text(scalar))),
                }
            }
        }
        Value::Object(_) | Value::Array(_) => {
            let label = key.map(humanize_key).unwrap_or_default();
            blocks.push(Block::Paragraph(format!("{label}: {value}")));
        }
        scalar => match key {
            Some(key) => blocks.push(Block::Paragraph(format!(
                "{}: {}",
                humanize_key(key),
                scalar_text(scalar)
            ))),
            None => blocks.push(Block::Paragraph(scalar_text(scalar))),
        },
    }
}

/// Flatten `content` into document blocks under a title line.
pub fn document_blocks(title: &str, generated_at: DateTime<Utc>, content: &Value) -> Vec<Block> {
    let mut blocks = vec![
        Block::Title(title.to_string()),
        Block::Paragraph(format!(
            "Generated: {}",
            generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        )),
    ];
    push_value(&mut blocks, None, content, 1);
    blocks
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            // Control characters are not allowed in XML 1.0.
            c if (c as u32) < 0x20 && !matches!(c, '\t' | '\n' | '\r') => {}
            c => out.push(c),
        }
    }
    out
}

fn paragraph_xml(style: Option<&str>, text: &str) -> String {
    let props = style
        .map(|s| format!(r#"<w:pPr><w:pStyle w:val="{s}"/></w:pPr>"#))
        .unwrap_or_default();
    format!(
        r#"<w:p>{props}<w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
        escape_xml(text)
    )
}

/// `word/document.xml` for the given blocks.
pub fn document_xml(blocks: &[Block]) -> String {
    let body: String = blocks
        .iter()
        .map(|block| match block {
            Block::Title(text) => paragraph_xml(Some("Title"), text),
            Block::Heading(level, text) => {
                paragraph_xml(Some(format!("Heading{}", (*level).clamp(1, 3)).as_str()), text)
            }
            Block::Paragraph(text) => paragraph_xml(None, text),
            Block::Bullet(text) => paragraph_xml(None, &format!("• {text}")),
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}<w:sectPr/></w:body></w:document>"#
    )
}

fn zip_error(e: impl std::fmt::Display) -> CoreError {
    CoreError::Internal(format!("Failed to build document: {e}"))
}

/// Package the blocks as a `.docx` file.
pub fn render_docx(blocks: &[Block]) -> Result<Vec<u8>, CoreError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES_XML.to_string()),
        ("_rels/.rels", PACKAGE_RELS_XML.to_string()),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS_XML.to_string()),
        ("word/styles.xml", STYLES_XML.to_string()),
        ("word/document.xml", document_xml(blocks)),
    ];
    for (name, xml) in parts {
        writer.start_file(name, options).map_err(zip_error)?;
        writer.write_all(xml.as_bytes()).map_err(zip_error)?;
    }

    Ok(writer.finish().map_err(zip_error)?.into_inner())
}

/// File name offered for download, e.g. `fraud-analysis-S123-20240501T100000.docx`.
pub fn report_filename(kind: &str, subject: &str, generated_at: DateTime<Utc>) -> String {
    let safe = |s: &str| -> String {
        s.chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
            .collect()
    };
    format!(
        "{}-{}-{}.docx",
        safe(kind),
        safe(subject),
        generated_at.format("%Y%m%dT%H%M%S")
    )
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;
    use serde_json::json;

    fn at() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn blocks_follow_json_structure() {
        let content = json!({
            "issue_key": "PAY-7",
            "risk_level": "High",
            "recommendations": ["Add 3DS", "Alert ops"],
            "risk_assessment": { "score": 72.5, "factors": [] }
        });

        let blocks = document_blocks("Security Analysis", at(), &content);

        assert_eq!(
            blocks,
            vec![
                Block::Title("Security Analysis".into()),
                Block::Paragraph("Generated: 2024-05-01 10:00:00 UTC".into()),
                Block::Paragraph("Issue Key: PAY-7".into()),
                Block::Paragraph("Risk Level: High".into()),
                Block::Heading(2, "Recommendations".into()),
                Block::Bullet("Add 3DS".into()),
                Block::Bullet("Alert ops".into()),
                Block::Heading(2, "Risk Assessment".into()),
                Block::Paragraph("Score: 72.5".into()),
                Block::Heading(3, "Factors".into()),
                Block::Paragraph("None".into()),
            ]
        );
    }

    #[test]
    fn text_is_escaped() {
        let xml = document_xml(&[Block::Paragraph("a < b & \"c\"\u{1}".into())]);
        assert!(xml.contains("a &lt; b &amp; &quot;c&quot;</w:t>"));
    }

    #[test]
    fn docx_package_contains_document_part() {
        let blocks = document_blocks("Report", at(), &json!({"session_id": "S-1"}));
        let bytes = render_docx(&blocks).unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert!(archive.by_name("[Content_Types].xml").is_ok());
        assert!(archive.by_name("word/styles.xml").is_ok());

        let mut document = String::new();
        archive
            .by_name("word/document.xml")
            .unwrap()
            .read_to_string(&mut document)
            .unwrap();
        assert!(document.contains("Session Id: S-1"));
    }

    #[test]
    fn filenames_are_sanitized() {
        assert_eq!(
            report_filename("fraud-analysis", "S 1/2", at()),
            "fraud-analysis-S-1-2-20240501T100000.docx"
        );
    }

    #[test]
    fn humanized_keys() {
        assert_eq!(humanize_key("risk_assessment"), "Risk Assessment");
        assert_eq!(humanize_key("jwt-analysis"), "Jwt Analysis");
    }
}
