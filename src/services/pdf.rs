//! Control report rendering.
//!
//! One A4 portrait document: title, generation stamp and a grid table whose
//! header repeats on every page. Text uses the standard Helvetica faces with
//! WinAnsi encoding, so no font program is embedded.

use crate::domain::models::ControlLine;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};

const PAGE_WIDTH: f32 = 595.28;
const PAGE_HEIGHT: f32 = 841.89;
const MARGIN: f32 = 40.0;
const TITLE_Y: f32 = 50.0;
const STAMP_Y: f32 = 70.0;
const TABLE_Y: f32 = 90.0;
const TITLE_SIZE: f32 = 14.0;
const STAMP_SIZE: f32 = 10.0;
const CELL_SIZE: f32 = 9.0;
const CELL_PADDING: f32 = 6.0;
const LINE_FACTOR: f32 = 1.15;

const HEADERS: [&str; 5] = [
    "Nome",
    "Descrição do FO",
    "Lançado por",
    "Punição",
    "Julgado por",
];
const COLUMN_WEIGHTS: [f32; 5] = [85.0, 170.0, 95.0, 95.0, 95.0];

fn column_widths() -> [f32; 5] {
    let available = PAGE_WIDTH - 2.0 * MARGIN;
    let total: f32 = COLUMN_WEIGHTS.iter().sum();
    COLUMN_WEIGHTS.map(|w| w * available / total)
}

/// Approximate Helvetica advance width, in units of the font size.
fn glyph_width(c: char) -> f32 {
    match c {
        'i' | 'j' | 'l' | 'I' | '\'' | '|' | '.' | ',' | ':' | ';' | '!' => 0.25,
        ' ' | 'f' | 't' | 'r' | '(' | ')' | '[' | ']' | '-' | '/' => 0.33,
        'm' | 'w' | 'M' | 'W' => 0.83,
        c if c.is_uppercase() => 0.68,
        c if c.is_ascii_digit() => 0.56,
        _ => 0.53,
    }
}

fn text_width(text: &str, size: f32) -> f32 {
    text.chars().map(glyph_width).sum::<f32>() * size
}

/// Greedy word wrap; words wider than the column are split by character.
pub fn wrap(text: &str, max_width: f32, size: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current, word)
            };
            if text_width(&candidate, size) <= max_width {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if text_width(word, size) <= max_width {
                current = word.to_string();
                continue;
            }
            for c in word.chars() {
                current.push(c);
                if text_width(&current, size) > max_width && current.chars().count() > 1 {
                    current.pop();
                    lines.push(std::mem::take(&mut current));
                    current.push(c);
                }
            }
        }
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// WinAnsi bytes: Latin-1 passes through, a few typographic marks are
/// remapped, anything else becomes `?`.
pub fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '—' => 0x97,
            '–' => 0x96,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '€' => 0x80,
            c if (c as u32) < 0x80 => c as u8,
            c if (0xA0..=0xFF).contains(&(c as u32)) => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

struct Page {
    ops: Vec<Operation>,
}

impl Page {
    fn new() -> Self {
        Self { ops: Vec::new() }
    }

    /// `top` is measured from the top edge, like the layout constants.
    fn text(&mut self, font: &str, size: f32, x: f32, top: f32, text: &str) {
        self.ops.push(Operation::new("BT", vec![]));
        self.ops
            .push(Operation::new("Tf", vec![font.into(), size.into()]));
        self.ops.push(Operation::new(
            "Td",
            vec![x.into(), (PAGE_HEIGHT - top).into()],
        ));
        self.ops.push(Operation::new(
            "Tj",
            vec![Object::String(win_ansi(text), StringFormat::Literal)],
        ));
        self.ops.push(Operation::new("ET", vec![]));
    }

    fn rect(&mut self, x: f32, top: f32, width: f32, height: f32) {
        self.ops.push(Operation::new(
            "re",
            vec![
                x.into(),
                (PAGE_HEIGHT - top - height).into(),
                width.into(),
                height.into(),
            ],
        ));
        self.ops.push(Operation::new("S", vec![]));
    }
}

fn line_height() -> f32 {
    CELL_SIZE * LINE_FACTOR
}

fn row_cells(widths: &[f32; 5], cells: [&str; 5]) -> (Vec<Vec<String>>, f32) {
    let wrapped: Vec<Vec<String>> = cells
        .iter()
        .zip(widths.iter())
        .map(|(text, w)| wrap(text, w - 2.0 * CELL_PADDING, CELL_SIZE))
        .collect();
    let max_lines = wrapped.iter().map(Vec::len).max().unwrap_or(1) as f32;
    (wrapped, max_lines * line_height() + 2.0 * CELL_PADDING)
}

fn draw_row(page: &mut Page, widths: &[f32; 5], top: f32, font: &str, cells: &[Vec<String>], height: f32) {
    let mut x = MARGIN;
    for (lines, w) in cells.iter().zip(widths.iter()) {
        page.rect(x, top, *w, height);
        for (i, line) in lines.iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            let baseline = top + CELL_PADDING + CELL_SIZE * 0.85 + i as f32 * line_height();
            page.text(font, CELL_SIZE, x + CELL_PADDING, baseline, line);
        }
        x += w;
    }
}

fn layout(title: &str, generated_at: &str, lines: &[ControlLine]) -> Vec<Page> {
    let widths = column_widths();
    let (header_cells, header_height) = row_cells(&widths, HEADERS);
    let bottom = PAGE_HEIGHT - MARGIN;

    let mut pages = Vec::new();
    let mut page = Page::new();
    page.text("F2", TITLE_SIZE, MARGIN, TITLE_Y, title);
    page.text(
        "F1",
        STAMP_SIZE,
        MARGIN,
        STAMP_Y,
        &format!("Gerado em: {}", generated_at),
    );
    draw_row(&mut page, &widths, TABLE_Y, "F2", &header_cells, header_height);
    let mut cursor = TABLE_Y + header_height;

    let body_top = MARGIN + header_height;
    let lines_that_fit = |top: f32| -> usize {
        ((bottom - top - 2.0 * CELL_PADDING) / line_height()).floor().max(0.0) as usize
    };
    let page_capacity = lines_that_fit(body_top);

    for line in lines {
        let (cells, _) = row_cells(
            &widths,
            [
                line.candidate_name.as_str(),
                line.description.as_str(),
                line.issued_by.as_str(),
                line.punishment.as_str(),
                line.judged_by.as_str(),
            ],
        );
        let total = cells.iter().map(Vec::len).max().unwrap_or(1);
        let mut start = 0;
        while start < total {
            let remaining = total - start;
            let room = lines_that_fit(cursor);
            // A row that fits a fresh page is moved there whole; taller rows
            // are split at the page bottom.
            let move_whole = start == 0 && remaining <= page_capacity && room < remaining;
            if room == 0 || move_whole {
                pages.push(std::mem::replace(&mut page, Page::new()));
                draw_row(&mut page, &widths, MARGIN, "F2", &header_cells, header_height);
                cursor = body_top;
                continue;
            }
            let take = remaining.min(room);
            let slice: Vec<Vec<String>> = cells
                .iter()
                .map(|c| c.iter().skip(start).take(take).cloned().collect())
                .collect();
            let height = take as f32 * line_height() + 2.0 * CELL_PADDING;
            draw_row(&mut page, &widths, cursor, "F1", &slice, height);
            cursor += height;
            start += take;
        }
    }
    pages.push(page);
    pages
}

fn font(doc: &mut Document, base: &str) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base,
        "Encoding" => "WinAnsiEncoding",
    })
}

/// Renders the control table and returns the PDF bytes.
pub fn render_control(
    title: &str,
    generated_at: &str,
    lines: &[ControlLine],
) -> anyhow::Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let regular = font(&mut doc, "Helvetica");
    let bold = font(&mut doc, "Helvetica-Bold");
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for page in layout(title, generated_at, lines) {
        let content = Content {
            operations: page.ops,
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
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
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}
