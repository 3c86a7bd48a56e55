//! Markup to plain text conversion

use super::ContentType;
use crate::error::{Error, Result};
use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};
use scraper::{Html, Selector};

/// Column width html2text wraps at before whitespace is normalized
const RENDER_WIDTH: usize = 80;

/// Convert a fetched document to plain text according to its type
pub fn convert(content: &str, content_type: ContentType) -> Result<String> {
    match content_type {
        ContentType::Html => to_plain_text(content),
        ContentType::Markdown => Ok(markdown_to_text(content)),
        ContentType::PlainText | ContentType::Unknown => Ok(content.to_string()),
    }
}

/// Render HTML markup as readable plain text.
///
/// Only the `<body>` is rendered when one exists, so `<head>` metadata does
/// not leak into the chunks.
pub fn to_plain_text(markup: &str) -> Result<String> {
    let document = Html::parse_document(markup);
    let body = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next().map(|e| e.html()))
        .unwrap_or_else(|| markup.to_string());

    let text = html2text::from_read(body.as_bytes(), RENDER_WIDTH)
        .map_err(|e| Error::Convert(format!("Failed to render HTML: {}", e)))?;
    Ok(normalize_whitespace(&text))
}

/// Flatten Markdown to text: markup characters go, block structure stays
/// as line breaks
pub fn markdown_to_text(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut in_code_block = false;

    for event in Parser::new(content) {
        match event {
            Event::Text(text) => out.push_str(&text),
            Event::Code(code) => out.push_str(&code),
            Event::SoftBreak => out.push(if in_code_block { '\n' } else { ' ' }),
            Event::HardBreak => out.push('\n'),
            Event::Start(Tag::CodeBlock(kind)) => {
                in_code_block = true;
                if let CodeBlockKind::Fenced(_) = kind {
                    out.push('\n');
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                out.push('\n');
            }
            Event::Start(Tag::Item) => out.push_str("• "),
            Event::End(TagEnd::Heading(_)) | Event::End(TagEnd::Paragraph) => {
                out.push_str("\n\n")
            }
            Event::End(TagEnd::Item) | Event::End(TagEnd::List(_)) => out.push('\n'),
            _ => {}
        }
    }

    normalize_whitespace(&out)
}

/// Collapse runs of whitespace. Two or more newlines become a paragraph
/// break, one newline stays a line break, anything else becomes a space.
pub fn normalize_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut pending_whitespace = false;
    let mut newlines = 0;

    for c in text.chars() {
        if c.is_whitespace() {
            if c == '\n' {
                newlines += 1;
            }
            pending_whitespace = true;
            continue;
        }

        if pending_whitespace && !result.is_empty() {
            match newlines {
                0 => result.push(' '),
                1 => result.push('\n'),
                _ => result.push_str("\n\n"),
            }
        }
        newlines = 0;
        pending_whitespace = false;
        result.push(c);
    }

    result
}
