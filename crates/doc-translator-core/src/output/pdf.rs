//! Paginated plain-text PDF built directly with lopdf.
//!
//! Uses the standard Helvetica fonts with WinAnsi encoding, so no font files
//! are embedded. Characters outside that encoding print as `?`.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use super::RenderContext;
use super::blocks::{Block, parse_blocks, plain};
use crate::error::{Error, Result};
use crate::pipeline::TranslationOutcome;

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 56.0;

const TITLE_SIZE: f32 = 20.0;
const META_SIZE: f32 = 9.0;
const BODY_SIZE: f32 = 11.0;
const HEADING_SIZES: [f32; 6] = [17.0, 15.0, 13.0, 12.0, 11.0, 11.0];

/// Line height as a multiple of font size.
const LINE_HEIGHT_FACTOR: f32 = 1.35;

/// Average Helvetica glyph width as a fraction of font size.
const CHAR_WIDTH_FACTOR: f32 = 0.5;

const LIST_INDENT: f32 = 14.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Font {
    Regular,
    Bold,
    Italic,
}

impl Font {
    const fn resource(self) -> &'static str {
        match self {
            Self::Regular => "F1",
            Self::Bold => "F2",
            Self::Italic => "F3",
        }
    }
}

#[derive(Debug)]
enum Mark {
    Text {
        x: f32,
        y: f32,
        font: Font,
        size: f32,
        text: String,
    },
    Rule {
        y: f32,
    },
}

/// Flows blocks down the page, starting a new page when the cursor would
/// cross the bottom margin.
struct Layout {
    pages: Vec<Vec<Mark>>,
    y: f32,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn ensure_room(&mut self, height: f32) {
        if self.y - height < MARGIN {
            self.pages.push(Vec::new());
            self.y = PAGE_HEIGHT - MARGIN;
        }
    }

    fn push(&mut self, mark: Mark) {
        if let Some(page) = self.pages.last_mut() {
            page.push(mark);
        }
    }

    fn text(&mut self, text: &str, font: Font, size: f32, indent: f32, gap_after: f32) {
        let line_height = size * LINE_HEIGHT_FACTOR;
        let width = PAGE_WIDTH - 2.0 * MARGIN - indent;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let max_chars = (width / (size * CHAR_WIDTH_FACTOR)).max(1.0) as usize;

        for line in word_wrap(text, max_chars) {
            self.ensure_room(line_height);
            self.y -= line_height;
            self.push(Mark::Text {
                x: MARGIN + indent,
                y: self.y,
                font,
                size,
                text: line,
            });
        }
        self.y -= gap_after;
    }

    fn rule(&mut self) {
        self.ensure_room(BODY_SIZE * 2.0);
        self.y -= BODY_SIZE;
        self.push(Mark::Rule { y: self.y });
        self.y -= BODY_SIZE;
    }
}

pub(super) fn render(outcome: &TranslationOutcome, ctx: &RenderContext<'_>) -> Result<Vec<u8>> {
    let mut layout = Layout::new();

    layout.text(ctx.title, Font::Bold, TITLE_SIZE, 0.0, 6.0);
    for (label, value) in ctx.banner(outcome) {
        layout.text(&format!("{label}: {value}"), Font::Italic, META_SIZE, 0.0, 0.0);
    }
    layout.y -= BODY_SIZE;

    for block in parse_blocks(&outcome.text) {
        match block {
            Block::Heading { level, text } => {
                let size = HEADING_SIZES[usize::from(level.clamp(1, 6)) - 1];
                layout.y -= size * 0.5;
                layout.text(&plain(&text), Font::Bold, size, 0.0, size * 0.4);
            }
            Block::Paragraph(text) => {
                layout.text(&plain(&text), Font::Regular, BODY_SIZE, 0.0, BODY_SIZE * 0.6);
            }
            Block::ListItem { marker, text } => {
                let item = format!("{marker} {}", plain(&text));
                layout.text(&item, Font::Regular, BODY_SIZE, LIST_INDENT, BODY_SIZE * 0.3);
            }
            Block::Rule => layout.rule(),
        }
    }

    build_document(ctx, layout.pages)
}

fn build_document(ctx: &RenderContext<'_>, pages: Vec<Vec<Mark>>) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font = |doc: &mut Document, base: &str| -> ObjectId {
        doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(base.as_bytes().to_vec())),
            ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
        ]))
    };
    let regular = font(&mut doc, "Helvetica");
    let bold = font(&mut doc, "Helvetica-Bold");
    let italic = font(&mut doc, "Helvetica-Oblique");

    let resources_id = doc.add_object(Dictionary::from_iter([(
        "Font",
        Object::Dictionary(Dictionary::from_iter([
            (Font::Regular.resource(), Object::Reference(regular)),
            (Font::Bold.resource(), Object::Reference(bold)),
            (Font::Italic.resource(), Object::Reference(italic)),
        ])),
    )]));

    let mut kids = Vec::with_capacity(pages.len());
    for marks in pages {
        let content: Content<Vec<Operation>> = Content {
            operations: marks.iter().flat_map(operations).collect(),
        };
        let encoded = content
            .encode()
            .map_err(|e| Error::Lopdf(format!("Failed to encode page content: {e}")))?;
        let content_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

        let page_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
            ("Resources", Object::Reference(resources_id)),
            (
                "MediaBox",
                Object::Array(vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()]),
            ),
        ]));
        kids.push(Object::Reference(page_id));
    }

    let count = i64::try_from(kids.len()).unwrap_or(i64::MAX);
    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(count)),
        ])),
    );

    let catalog_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut info = Dictionary::from_iter([
        ("Title", text_string(ctx.title)),
        ("Producer", Object::string_literal("doc-translator")),
    ]);
    if let Some(author) = &ctx.metadata.author {
        info.set("Author", text_string(author));
    }
    let info_id = doc.add_object(info);
    doc.trailer.set("Info", Object::Reference(info_id));

    doc.compress();

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| Error::PdfSave(format!("Failed to save translated PDF: {e}")))?;
    Ok(output)
}

fn operations(mark: &Mark) -> Vec<Operation> {
    match mark {
        Mark::Text {
            x,
            y,
            font,
            size,
            text,
        } => vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![font.resource().into(), (*size).into()]),
            Operation::new("Td", vec![(*x).into(), (*y).into()]),
            Operation::new("Tj", vec![Object::String(win_ansi(text), StringFormat::Literal)]),
            Operation::new("ET", vec![]),
        ],
        Mark::Rule { y } => vec![
            Operation::new("w", vec![0.5_f32.into()]),
            Operation::new("G", vec![0.6_f32.into()]),
            Operation::new("m", vec![MARGIN.into(), (*y).into()]),
            Operation::new("l", vec![(PAGE_WIDTH - MARGIN).into(), (*y).into()]),
            Operation::new("S", vec![]),
        ],
    }
}

/// Document info strings: UTF-16BE with BOM so any script survives.
fn text_string(text: &str) -> Object {
    let mut bytes = vec![0xFE, 0xFF];
    bytes.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Encode for WinAnsiEncoding.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            c if (' '..='~').contains(&c) || ('\u{A0}'..='\u{FF}').contains(&c) => {
                u8::try_from(u32::from(c)).unwrap_or(b'?')
            }
            _ => b'?',
        })
        .collect()
}

/// Greedy word wrap on character counts.
fn word_wrap(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if current_line.is_empty() {
            current_line = word.to_string();
            current_len = word_len;
        } else if current_len + 1 + word_len <= max_chars {
            current_line.push(' ');
            current_line.push_str(word);
            current_len += 1 + word_len;
        } else {
            lines.push(std::mem::take(&mut current_line));
            current_line = word.to_string();
            current_len = word_len;
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    lines
}
