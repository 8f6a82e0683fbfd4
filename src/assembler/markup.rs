// document-synthesis-service/src/assembler/markup.rs

//! Lightweight markup used for free-text analysis and professional documents.
//!
//! Supported: `#`/`##`/`###` headings, `-`/`*`/`•` bullets, `1.` numbered
//! items, pipe tables (separator rows skipped), whole-line `**bold**`, and
//! blank lines between paragraphs. Anything else is paragraph text.

#[derive(Debug, Clone, PartialEq)]
pub enum MarkupBlock {
    Heading { level: u8, text: String },
    Paragraph(String),
    Bold(String),
    Bullets(Vec<String>),
    Numbered(Vec<String>),
    Table(Vec<Vec<String>>),
}

pub fn parse(source: &str) -> Vec<MarkupBlock> {
    let mut blocks = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();

    let flush = |paragraph: &mut Vec<&str>, blocks: &mut Vec<MarkupBlock>| {
        if !paragraph.is_empty() {
            blocks.push(MarkupBlock::Paragraph(strip_inline(&paragraph.join(" "))));
            paragraph.clear();
        }
    };

    for raw in source.lines() {
        let line = raw.trim();
        if line.is_empty() {
            flush(&mut paragraph, &mut blocks);
            continue;
        }

        if let Some((level, text)) = heading(line) {
            flush(&mut paragraph, &mut blocks);
            blocks.push(MarkupBlock::Heading { level, text: strip_inline(text) });
        } else if let Some(item) = bullet(line) {
            flush(&mut paragraph, &mut blocks);
            match blocks.last_mut() {
                Some(MarkupBlock::Bullets(items)) => items.push(strip_inline(item)),
                _ => blocks.push(MarkupBlock::Bullets(vec![strip_inline(item)])),
            }
        } else if let Some(item) = numbered(line) {
            flush(&mut paragraph, &mut blocks);
            match blocks.last_mut() {
                Some(MarkupBlock::Numbered(items)) => items.push(strip_inline(item)),
                _ => blocks.push(MarkupBlock::Numbered(vec![strip_inline(item)])),
            }
        } else if line.starts_with('|') {
            flush(&mut paragraph, &mut blocks);
            if is_separator_row(line) {
                continue;
            }
            let cells = table_cells(line);
            match blocks.last_mut() {
                Some(MarkupBlock::Table(rows)) => rows.push(cells),
                _ => blocks.push(MarkupBlock::Table(vec![cells])),
            }
        } else if let Some(text) = bold_line(line) {
            flush(&mut paragraph, &mut blocks);
            blocks.push(MarkupBlock::Bold(text.to_string()));
        } else {
            paragraph.push(line);
        }
    }
    flush(&mut paragraph, &mut blocks);
    blocks
}

fn heading(line: &str) -> Option<(u8, &str)> {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    if !(1..=3).contains(&hashes) {
        return None;
    }
    let rest = &line[hashes..];
    rest.starts_with(' ').then(|| (hashes as u8, rest.trim()))
}

fn bullet(line: &str) -> Option<&str> {
    ["- ", "* ", "• "]
        .iter()
        .find_map(|marker| line.strip_prefix(marker))
        .map(str::trim)
}

fn numbered(line: &str) -> Option<&str> {
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 || digits > 3 {
        return None;
    }
    line[digits..]
        .strip_prefix(". ")
        .or_else(|| line[digits..].strip_prefix(") "))
        .map(str::trim)
}

fn bold_line(line: &str) -> Option<&str> {
    let inner = line.strip_prefix("**")?.strip_suffix("**")?;
    (!inner.is_empty() && !inner.contains("**")).then_some(inner.trim())
}

fn is_separator_row(line: &str) -> bool {
    line.chars().all(|c| matches!(c, '|' | '-' | ':' | ' '))
}

fn table_cells(line: &str) -> Vec<String> {
    let inner = line.trim_matches('|');
    inner.split('|').map(|cell| strip_inline(cell.trim())).collect()
}

/// Drops inline emphasis markers; the builtin fonts cannot mix styles in a line.
fn strip_inline(text: &str) -> String {
    text.replace("**", "").replace("__", "")
}
