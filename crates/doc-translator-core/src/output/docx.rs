use quick_xml::escape::escape;
use std::fmt::Write as _;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::RenderContext;
use super::blocks::{Block, inline_spans, parse_blocks};
use crate::error::{Error, Result};
use crate::pipeline::TranslationOutcome;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
</Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
</Relationships>"#;

/// Font sizes in half-points, indexed by heading level.
const HEADING_SIZES: [u32; 6] = [32, 28, 26, 24, 24, 24];
const TITLE_SIZE: u32 = 40;
const META_SIZE: u32 = 18;

pub(super) fn render(outcome: &TranslationOutcome, ctx: &RenderContext<'_>) -> Result<Vec<u8>> {
    let document = document_xml(outcome, ctx);
    let core = core_xml(ctx);

    let parts: [(&str, &str); 4] = [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", ROOT_RELS),
        ("docProps/core.xml", &core),
        ("word/document.xml", &document),
    ];

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, data) in parts {
        zip.start_file(name, options).map_err(|e| render_error(&e))?;
        zip.write_all(data.as_bytes()).map_err(|e| render_error(&e))?;
    }

    let cursor = zip.finish().map_err(|e| render_error(&e))?;
    Ok(cursor.into_inner())
}

fn render_error(e: &dyn std::fmt::Display) -> Error {
    Error::OutputRender {
        format: "docx",
        reason: e.to_string(),
    }
}

fn document_xml(outcome: &TranslationOutcome, ctx: &RenderContext<'_>) -> String {
    let mut body = String::new();

    paragraph(&mut body, &[(ctx.title, true)], Some(TITLE_SIZE), false);
    for (label, value) in ctx.banner(outcome) {
        let label = format!("{label}: ");
        paragraph(
            &mut body,
            &[(label.as_str(), true), (value.as_str(), false)],
            Some(META_SIZE),
            false,
        );
    }

    for block in parse_blocks(&outcome.text) {
        match block {
            Block::Heading { level, text } => {
                let size = HEADING_SIZES[usize::from(level.clamp(1, 6)) - 1];
                let runs: Vec<(&str, bool)> =
                    inline_spans(&text).iter().map(|s| (s.text, true)).collect();
                paragraph(&mut body, &runs, Some(size), false);
            }
            Block::Paragraph(text) => {
                let runs: Vec<(&str, bool)> =
                    inline_spans(&text).iter().map(|s| (s.text, s.bold)).collect();
                paragraph(&mut body, &runs, None, false);
            }
            Block::ListItem { marker, text } => {
                let prefix = format!("{marker} ");
                let spans = inline_spans(&text);
                let mut runs = vec![(prefix.as_str(), false)];
                runs.extend(spans.iter().map(|s| (s.text, s.bold)));
                paragraph(&mut body, &runs, None, true);
            }
            Block::Rule => {
                body.push_str(
                    "<w:p><w:pPr><w:pBdr><w:bottom w:val=\"single\" w:sz=\"6\" w:space=\"1\" \
                     w:color=\"auto\"/></w:pBdr></w:pPr></w:p>",
                );
            }
        }
    }

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
         <w:body>{body}<w:sectPr><w:pgSz w:w=\"11906\" w:h=\"16838\"/>\
         <w:pgMar w:top=\"1440\" w:right=\"1440\" w:bottom=\"1440\" w:left=\"1440\"/>\
         </w:sectPr></w:body></w:document>"
    )
}

fn paragraph(out: &mut String, runs: &[(&str, bool)], size: Option<u32>, indent: bool) {
    out.push_str("<w:p><w:pPr><w:spacing w:after=\"200\"/>");
    if indent {
        out.push_str("<w:ind w:left=\"360\"/>");
    }
    out.push_str("</w:pPr>");

    for (text, bold) in runs {
        out.push_str("<w:r>");
        if *bold || size.is_some() {
            out.push_str("<w:rPr>");
            if *bold {
                out.push_str("<w:b/>");
            }
            if let Some(size) = size {
                let _ = write!(out, "<w:sz w:val=\"{size}\"/>");
            }
            out.push_str("</w:rPr>");
        }
        let _ = write!(out, "<w:t xml:space=\"preserve\">{}</w:t></w:r>", escape(*text));
    }

    out.push_str("</w:p>");
}

fn core_xml(ctx: &RenderContext<'_>) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <cp:coreProperties xmlns:cp=\"http://schemas.openxmlformats.org/package/2006/metadata/core-properties\" \
         xmlns:dc=\"http://purl.org/dc/elements/1.1/\">",
    );
    let _ = write!(xml, "<dc:title>{}</dc:title>", escape(ctx.title));
    let _ = write!(xml, "<dc:language>{}</dc:language>", escape(ctx.target.as_str()));
    if let Some(author) = &ctx.metadata.author {
        let _ = write!(xml, "<dc:creator>{}</dc:creator>", escape(author));
    }
    xml.push_str("</cp:coreProperties>");
    xml
}
