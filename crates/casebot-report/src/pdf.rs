// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! PDF layout on top of the `lopdf` object model.
//!
//! Pages are A4 with Helvetica 12pt text. The first line sits at y=800 and
//! each line steps down 14pt; once the cursor drops below y=100 a new page
//! starts. Helvetica is a standard Type1 font, so only Latin-1 text can be
//! shown; anything else is replaced with `?`.

use casebot_core::CaseError;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::layout::{ReportDocument, WRAP_WIDTH, wrap_line};

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN_X: i64 = 50;
const FIRST_LINE_Y: i64 = 800;
const LINE_STEP: i64 = 14;
const BOTTOM_Y: i64 = 100;
const FONT_SIZE: i64 = 12;

/// Renders `doc` into PDF bytes.
pub fn render_pdf(doc: &ReportDocument) -> Result<Vec<u8>, CaseError> {
    let mut lines = vec![doc.heading.clone(), String::new()];
    for line in &doc.lines {
        lines.extend(wrap_line(line, WRAP_WIDTH));
    }

    let mut pdf = Document::with_version("1.5");
    let pages_id = pdf.new_object_id();
    let font_id = pdf.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
        ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
    ]));
    let resources_id = pdf.add_object(Dictionary::from_iter(vec![(
        "Font",
        Object::Dictionary(Dictionary::from_iter(vec![("F1", Object::Reference(font_id))])),
    )]));

    let mut page_ids = Vec::new();
    for page_lines in paginate(&lines) {
        let content = page_content(page_lines);
        let encoded = content
            .encode()
            .map_err(|e| CaseError::Internal(format!("cannot encode PDF content: {e}")))?;
        let content_id = pdf.add_object(Stream::new(Dictionary::new(), encoded));
        let page_id = pdf.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Resources", Object::Reference(resources_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(PAGE_WIDTH),
                    Object::Integer(PAGE_HEIGHT),
                ]),
            ),
            ("Contents", Object::Reference(content_id)),
        ]));
        page_ids.push(page_id);
    }

    finish(pdf, pages_id, &page_ids)
}

fn finish(
    mut pdf: Document,
    pages_id: ObjectId,
    page_ids: &[ObjectId],
) -> Result<Vec<u8>, CaseError> {
    let pages = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(page_ids.len() as i64)),
        (
            "Kids",
            Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
        ),
    ]);
    pdf.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = pdf.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    pdf.trailer.set("Root", Object::Reference(catalog_id));
    pdf.compress();

    let mut buffer = Vec::new();
    pdf.save_to(&mut buffer)
        .map_err(|e| CaseError::Internal(format!("cannot serialize PDF: {e}")))?;
    Ok(buffer)
}

/// Splits lines into pages by the vertical cursor rule.
fn paginate(lines: &[String]) -> Vec<&[String]> {
    let per_page = ((FIRST_LINE_Y - BOTTOM_Y) / LINE_STEP + 1) as usize;
    if lines.is_empty() {
        return vec![lines];
    }
    lines.chunks(per_page).collect()
}

fn page_content(lines: &[String]) -> Content {
    let mut operations = Vec::with_capacity(lines.len() * 5);
    let mut y = FIRST_LINE_Y;
    for line in lines {
        if !line.is_empty() {
            operations.extend([
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![Object::Name(b"F1".to_vec()), Object::Integer(FONT_SIZE)],
                ),
                Operation::new("Td", vec![Object::Integer(MARGIN_X), Object::Integer(y)]),
                Operation::new(
                    "Tj",
                    vec![Object::String(to_latin1(line), StringFormat::Literal)],
                ),
                Operation::new("ET", vec![]),
            ]);
        }
        y -= LINE_STEP;
    }
    Content { operations }
}

/// Encodes text for a WinAnsi Type1 font, replacing unsupported characters.
pub fn to_latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match u32::from(c) {
            0x20..=0x7E | 0xA0..=0xFF => c as u8,
            _ => b'?',
        })
        .collect()
}
