//! Text extraction for uploaded study material.

use anyhow::{Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::debug;

const DOCX_BODY: &str = "word/document.xml";

/// Extracts plain text from an uploaded file, dispatching on its extension.
///
/// `.pdf` and `.docx` are parsed; anything else is decoded as UTF-8 with
/// invalid sequences replaced. The result is trimmed.
pub fn extract_text(file_name: &str, bytes: &[u8]) -> Result<String> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    debug!(file_name = %file_name, extension = %extension, size = bytes.len(), "Extracting document text");

    let text = match extension.as_str() {
        "pdf" => pdf_extract::extract_text_from_mem(bytes)
            .with_context(|| format!("Failed to read PDF '{}'", file_name))?,
        "docx" => extract_docx(bytes).with_context(|| format!("Failed to read DOCX '{}'", file_name))?,
        _ => String::from_utf8_lossy(bytes).into_owned(),
    };

    Ok(text.trim().to_string())
}

fn extract_docx(bytes: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY)
        .context("Missing word/document.xml")?
        .read_to_string(&mut xml)?;

    paragraphs_from_document_xml(&xml).map(|paragraphs| paragraphs.join("\n"))
}

/// Collects the text runs of each `w:p` element, one string per paragraph.
fn paragraphs_from_document_xml(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => current.clear(),
                b"t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tab" => current.push('\t'),
                b"br" | b"cr" => current.push('\n'),
                b"p" => paragraphs.push(String::new()),
                _ => {}
            },
            Event::Text(t) if in_text => current.push_str(&t.unescape()?),
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => paragraphs.push(std::mem::take(&mut current)),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}
