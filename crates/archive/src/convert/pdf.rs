//! Plain text to PDF layout
//!
//! US-Letter pages, Courier 10pt, 12pt leading, 50pt margins. Long lines wrap
//! at word boundaries where possible.

use anyhow::{Context, Result};
use lopdf::{Document, Object, Stream, dictionary};

const PAGE_WIDTH: i64 = 612;
const PAGE_HEIGHT: i64 = 792;
const MARGIN: i64 = 50;
const FONT_SIZE: i64 = 10;
const LEADING: i64 = 12;
/// Courier glyphs are 0.6em wide
const CHARS_PER_LINE: usize = ((PAGE_WIDTH - 2 * MARGIN) * 10 / (FONT_SIZE * 6)) as usize;
const LINES_PER_PAGE: usize = ((PAGE_HEIGHT - 2 * MARGIN) / LEADING) as usize;
const TAB_WIDTH: usize = 4;

/// Lay out `text` on as many pages as it needs and serialize the PDF
pub fn text_to_pdf(text: &str) -> Result<Vec<u8>> {
    let lines = wrap_lines(text, CHARS_PER_LINE);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    let chunks: Vec<&[String]> = if lines.is_empty() {
        vec![lines.as_slice()]
    } else {
        lines.chunks(LINES_PER_PAGE).collect()
    };

    for chunk in chunks {
        let content = page_content(chunk);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).context("Failed to serialize PDF")?;
    Ok(buffer)
}

fn page_content(lines: &[String]) -> String {
    let mut content = String::new();
    content.push_str("BT\n");
    content.push_str(&format!("/F1 {} Tf\n", FONT_SIZE));
    content.push_str(&format!("{} {} Td\n", MARGIN, PAGE_HEIGHT - MARGIN));
    content.push_str(&format!("{} TL\n", LEADING));
    for line in lines {
        content.push_str(&format!("({}) Tj T*\n", escape_pdf_string(line)));
    }
    content.push_str("ET\n");
    content
}

/// Split text into display lines no wider than `width` characters
fn wrap_lines(text: &str, width: usize) -> Vec<String> {
    let mut out = Vec::new();
    for raw in text.lines() {
        let line = raw.replace('\t', &" ".repeat(TAB_WIDTH));
        let mut rest: Vec<char> = line.trim_end().chars().collect();
        if rest.is_empty() {
            out.push(String::new());
            continue;
        }
        while rest.len() > width {
            // Break after the last space that fits, else mid-word
            let cut = rest[..width]
                .iter()
                .rposition(|c| *c == ' ')
                .map(|i| i + 1)
                .unwrap_or(width);
            let head: String = rest[..cut].iter().collect();
            out.push(head.trim_end().to_string());
            rest.drain(..cut);
        }
        out.push(rest.into_iter().collect());
    }
    out
}

/// Escape a line for a PDF literal string in WinAnsi encoding
///
/// Latin-1 characters are written as octal escapes; anything outside it
/// becomes `?`.
fn escape_pdf_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\\' => out.push_str("\\\\"),
            c if c.is_ascii() && !c.is_control() => out.push(c),
            c if ('\u{a0}'..='\u{ff}').contains(&c) => {
                out.push_str(&format!("\\{:03o}", c as u32));
            }
            _ => out.push('?'),
        }
    }
    out
}
