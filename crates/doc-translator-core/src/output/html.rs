use quick_xml::escape::escape;
use std::fmt::Write;

use super::RenderContext;
use super::blocks::{Block, inline_spans, parse_blocks};
use crate::pipeline::TranslationOutcome;

const STYLE: &str = "\
body { font-family: Arial, sans-serif; line-height: 1.6; margin: 40px; color: #333; }
h1, h2, h3, h4, h5, h6 { color: #2c3e50; margin-top: 24px; margin-bottom: 16px; }
p, li { margin-bottom: 16px; }
hr { border: 0; border-top: 1px solid #ddd; margin: 32px 0; }
.metadata { background-color: #f8f9fa; padding: 16px; border-radius: 8px; margin-bottom: 24px; font-size: 14px; color: #666; }";

pub(super) fn render(outcome: &TranslationOutcome, ctx: &RenderContext<'_>) -> String {
    let mut html = String::with_capacity(outcome.text.len() * 2);
    let title = escape(ctx.title);

    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"{}\">\n<head>\n<meta charset=\"UTF-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
         <title>{title}</title>\n<style>\n{STYLE}\n</style>\n</head>\n<body>\n",
        escape(ctx.target.as_str())
    );

    html.push_str("<div class=\"metadata\">\n");
    for (label, value) in ctx.banner(outcome) {
        let _ = writeln!(html, "<strong>{label}:</strong> {}<br>", escape(&value));
    }
    html.push_str("</div>\n");
    let _ = writeln!(html, "<h1>{title}</h1>");

    let mut in_list = false;
    for block in parse_blocks(&outcome.text) {
        let is_item = matches!(block, Block::ListItem { .. });
        if in_list && !is_item {
            html.push_str("</ul>\n");
        } else if !in_list && is_item {
            html.push_str("<ul>\n");
        }
        in_list = is_item;

        match block {
            Block::Heading { level, text } => {
                // h1 is the document title
                let level = (level + 1).min(6);
                let _ = writeln!(html, "<h{level}>{}</h{level}>", inline(&text));
            }
            Block::Paragraph(text) => {
                let _ = writeln!(html, "<p>{}</p>", inline(&text));
            }
            Block::ListItem { marker, text } => {
                let _ = writeln!(html, "<li>{} {}</li>", escape(&marker), inline(&text));
            }
            Block::Rule => html.push_str("<hr>\n"),
        }
    }
    if in_list {
        html.push_str("</ul>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn inline(text: &str) -> String {
    inline_spans(text)
        .into_iter()
        .map(|span| {
            if span.bold {
                format!("<strong>{}</strong>", escape(span.text))
            } else {
                escape(span.text).into_owned()
            }
        })
        .collect()
}
