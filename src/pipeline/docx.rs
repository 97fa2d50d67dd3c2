//! DOCX text extraction.
//!
//! A `.docx` file is a ZIP container; the body lives in `word/document.xml`
//! as WordprocessingML. Only a handful of elements matter for plain text:
//!
//! | Element | Meaning |
//! |---------|---------|
//! | `w:p`   | paragraph |
//! | `w:t`   | text run content |
//! | `w:tab` | tab character |
//! | `w:br`, `w:cr` | line break |
//! | `w:tbl`, `w:tr`, `w:tc` | table, row, cell |
//!
//! Body paragraphs come out first, one per line; then every table row as its
//! non-empty cell texts joined with ` | `.

use super::postprocess::clean_text;
use super::Extraction;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use tracing::{debug, info};

/// Confidence for a DOCX with any text. Structured text needs no guessing.
pub const DOCX_CONFIDENCE: f32 = 0.95;

const DOCUMENT_PART: &str = "word/document.xml";

/// Extract text from the DOCX at `path`.
pub fn extract_docx(path: &Path) -> Result<Extraction, String> {
    let file = File::open(path).map_err(|e| format!("cannot open DOCX: {e}"))?;
    let text = docx_text(file)?;
    let confidence = if text.trim().is_empty() {
        0.0
    } else {
        DOCX_CONFIDENCE
    };
    Ok(Extraction {
        text,
        confidence,
        page_errors: Vec::new(),
    })
}

/// Read the document part out of a DOCX container and flatten it to text.
pub fn docx_text<R: Read + Seek>(reader: R) -> Result<String, String> {
    let mut archive =
        zip::ZipArchive::new(reader).map_err(|e| format!("not a DOCX container: {e}"))?;
    let mut part = archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| format!("missing {DOCUMENT_PART}: {e}"))?;
    let mut xml = String::new();
    part.read_to_string(&mut xml)
        .map_err(|e| format!("cannot read {DOCUMENT_PART}: {e}"))?;

    let body = parse_document_xml(&xml);
    info!(
        "DOCX: {} paragraphs, {} table rows",
        body.paragraphs.len(),
        body.table_rows.len()
    );

    let mut out = String::new();
    for line in body.paragraphs.iter().chain(body.table_rows.iter()) {
        out.push_str(line);
        out.push('\n');
    }
    Ok(clean_text(&out))
}

#[derive(Debug, Default)]
struct DocumentBody {
    paragraphs: Vec<String>,
    table_rows: Vec<String>,
}

#[derive(Default)]
struct ParseState {
    table_depth: usize,
    in_text: bool,
    paragraph: String,
    cell: String,
    row: Vec<String>,
}

/// Walk the tags of `word/document.xml` in order.
///
/// Paragraphs inside a table cell accumulate into the cell (newline
/// separated) instead of the body list.
fn parse_document_xml(xml: &str) -> DocumentBody {
    let mut body = DocumentBody::default();
    let mut st = ParseState::default();
    let mut rest = xml;

    while let Some(open) = rest.find('<') {
        if st.in_text {
            st.paragraph.push_str(&unescape(&rest[..open]));
        }
        let Some(close) = rest[open..].find('>') else {
            break;
        };
        let tag = &rest[open + 1..open + close];
        rest = &rest[open + close + 1..];
        handle_tag(tag, &mut st, &mut body);
    }

    debug!("Parsed document.xml, table depth at end {}", st.table_depth);
    body
}

fn handle_tag(tag: &str, st: &mut ParseState, body: &mut DocumentBody) {
    if tag.starts_with('?') || tag.starts_with('!') {
        return;
    }
    let closing = tag.starts_with('/');
    let self_closing = tag.ends_with('/');
    let name = tag
        .trim_start_matches('/')
        .trim_end_matches('/')
        .split_whitespace()
        .next()
        .unwrap_or("");

    match (name, closing) {
        ("w:t", false) => st.in_text = !self_closing,
        ("w:t", true) => st.in_text = false,
        // tab stops in paragraph properties carry w:pos; only run tabs are text
        ("w:tab", false) if !tag.contains("w:pos") => st.paragraph.push('\t'),
        ("w:br", false) | ("w:cr", false) => st.paragraph.push('\n'),
        ("w:p", false) if self_closing => finish_paragraph(st, body),
        ("w:p", true) => finish_paragraph(st, body),
        ("w:tbl", false) if !self_closing => st.table_depth += 1,
        ("w:tbl", true) => st.table_depth = st.table_depth.saturating_sub(1),
        ("w:tc", true) => {
            let cell = std::mem::take(&mut st.cell);
            st.row.push(cell.trim().to_string());
        }
        ("w:tr", true) => {
            let cells: Vec<String> = std::mem::take(&mut st.row)
                .into_iter()
                .filter(|c| !c.is_empty())
                .collect();
            if !cells.is_empty() {
                body.table_rows.push(cells.join(" | "));
            }
        }
        _ => {}
    }
}

fn finish_paragraph(st: &mut ParseState, body: &mut DocumentBody) {
    let text = std::mem::take(&mut st.paragraph);
    if st.table_depth > 0 {
        if !st.cell.is_empty() {
            st.cell.push('\n');
        }
        st.cell.push_str(&text);
    } else if !text.trim().is_empty() {
        body.paragraphs.push(text);
    }
}

fn unescape(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let Some(semi) = tail.find(';') else {
            out.push_str(tail);
            return out;
        };
        let entity = &tail[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
