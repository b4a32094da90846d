//! Minimal block structure shared by the rich output writers.
//!
//! Translations are plain prose or light markdown (headings, lists, bold,
//! rules). Anything else is kept as paragraph text.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph(String),
    ListItem { marker: String, text: String },
    Rule,
}

/// Split text into blocks. Blank lines end paragraphs; heading, list and
/// rule lines stand alone.
pub fn parse_blocks(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();

    let flush = |paragraph: &mut Vec<&str>, blocks: &mut Vec<Block>| {
        if !paragraph.is_empty() {
            blocks.push(Block::Paragraph(paragraph.join(" ")));
            paragraph.clear();
        }
    };

    for line in text.lines() {
        let line = line.trim();

        if line.is_empty() {
            flush(&mut paragraph, &mut blocks);
        } else if is_rule(line) {
            flush(&mut paragraph, &mut blocks);
            blocks.push(Block::Rule);
        } else if let Some((level, heading)) = heading(line) {
            flush(&mut paragraph, &mut blocks);
            blocks.push(Block::Heading {
                level,
                text: heading.to_string(),
            });
        } else if let Some((marker, item)) = list_item(line) {
            flush(&mut paragraph, &mut blocks);
            blocks.push(Block::ListItem {
                marker,
                text: item.to_string(),
            });
        } else {
            paragraph.push(line);
        }
    }
    flush(&mut paragraph, &mut blocks);

    blocks
}

fn is_rule(line: &str) -> bool {
    line.len() >= 3
        && (line.chars().all(|c| c == '-') || line.chars().all(|c| c == '*'))
}

fn heading(line: &str) -> Option<(u8, &str)> {
    let hashes = line.bytes().take_while(|&b| b == b'#').count();
    if !(1..=6).contains(&hashes) {
        return None;
    }
    let rest = line[hashes..].strip_prefix(' ')?.trim();
    let level = u8::try_from(hashes).ok()?;
    (!rest.is_empty()).then_some((level, rest))
}

fn list_item(line: &str) -> Option<(String, &str)> {
    if let Some(rest) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
        return Some(("\u{2022}".to_string(), rest.trim()));
    }
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 {
        let rest = line[digits..].strip_prefix(". ")?;
        return Some((format!("{}.", &line[..digits]), rest.trim()));
    }
    None
}

/// A run of text, bold or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span<'a> {
    pub text: &'a str,
    pub bold: bool,
}

/// Split on `**` markers. An unpaired marker is kept as literal text.
pub fn inline_spans(text: &str) -> Vec<Span<'_>> {
    let pieces: Vec<&str> = text.split("**").collect();
    let paired = pieces.len() % 2 == 1;

    if !paired {
        return vec![Span { text, bold: false }];
    }

    pieces
        .into_iter()
        .enumerate()
        .filter(|(_, piece)| !piece.is_empty())
        .map(|(i, piece)| Span {
            text: piece,
            bold: i % 2 == 1,
        })
        .collect()
}

/// Text with inline markers removed, for writers without styled runs.
pub fn plain(text: &str) -> String {
    inline_spans(text).iter().map(|s| s.text).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_blocks() {
        let text = "# Title\n\nFirst line\ncontinues here.\n\n- one\n2. two\n\n---\n\n## Part";
        assert_eq!(
            parse_blocks(text),
            vec![
                Block::Heading {
                    level: 1,
                    text: "Title".into()
                },
                Block::Paragraph("First line continues here.".into()),
                Block::ListItem {
                    marker: "\u{2022}".into(),
                    text: "one".into()
                },
                Block::ListItem {
                    marker: "2.".into(),
                    text: "two".into()
                },
                Block::Rule,
                Block::Heading {
                    level: 2,
                    text: "Part".into()
                },
            ]
        );
    }

    #[test]
    fn test_not_headings() {
        assert_eq!(
            parse_blocks("#hashtag\n####### seven"),
            vec![Block::Paragraph("#hashtag ####### seven".into())]
        );
    }

    #[test]
    fn test_inline_spans() {
        assert_eq!(
            inline_spans("a **b** c"),
            vec![
                Span { text: "a ", bold: false },
                Span { text: "b", bold: true },
                Span { text: " c", bold: false },
            ]
        );
        assert_eq!(inline_spans("2 ** 3"), vec![Span { text: "2 ** 3", bold: false }]);
        assert_eq!(plain("**Note:** read"), "Note: read");
    }
}
