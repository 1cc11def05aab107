//! Layout analysis: content streams to span trees.
//!
//! Walks a page's content stream, tracking the graphics and text state to
//! position every shown string, then groups the resulting spans into lines
//! by baseline and lines into blocks by spacing, size and indentation.
//! Coordinates are converted to the model's top-left origin.

use crate::error::Result;
use crate::model::{Block, Line, Matrix, Rect, Span};
use crate::placement::metrics;

use super::backend::{get_number_from_value, ContentOp, PageId, PdfBackend, PdfValue};

/// TJ adjustment (1/1000 em) above which a word space is inserted.
const TJ_SPACE_THRESHOLD: f32 = 200.0;

/// Leading used when a stream relies on T* without ever setting TL.
const FALLBACK_LEADING: f32 = 1.2;

/// A span with its baseline, before grouping.
#[derive(Debug, Clone)]
struct PositionedSpan {
    span: Span,
    /// Baseline in model coordinates (y grows downward)
    baseline: f32,
}

/// Something painted on the page, in stream order.
#[derive(Debug, Clone)]
enum PageItem {
    Text(PositionedSpan),
    Image(Rect),
}

/// Text state tracked between BT and ET.
#[derive(Debug, Clone)]
struct TextState {
    tm: Matrix,
    tlm: Matrix,
    font: Vec<u8>,
    font_size: f32,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            tm: Matrix::IDENTITY,
            tlm: Matrix::IDENTITY,
            font: Vec::new(),
            font_size: 12.0,
            leading: 0.0,
        }
    }
}

impl TextState {
    fn begin(&mut self) {
        self.tm = Matrix::IDENTITY;
        self.tlm = Matrix::IDENTITY;
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.tlm = Matrix::new(1.0, 0.0, 0.0, 1.0, tx, ty).concat(&self.tlm);
        self.tm = self.tlm;
    }

    fn next_line(&mut self) {
        let leading = if self.leading > 0.0 {
            self.leading
        } else {
            self.font_size * FALLBACK_LEADING
        };
        self.move_line(0.0, -leading);
    }

    fn advance(&mut self, width: f32) {
        self.tm = Matrix::new(1.0, 0.0, 0.0, 1.0, width, 0.0).concat(&self.tm);
    }
}

/// Builds span trees from PDF pages.
pub struct LayoutAnalyzer<'a> {
    backend: &'a dyn PdfBackend,
}

impl<'a> LayoutAnalyzer<'a> {
    /// Create a new layout analyzer.
    pub fn new(backend: &'a dyn PdfBackend) -> Self {
        Self { backend }
    }

    /// Extract the blocks of a page in rendering order.
    pub fn extract_page_blocks(&self, page: PageId) -> Result<Vec<Block>> {
        let page_box = self.backend.page_box(page);
        let data = self.backend.page_content(page)?;
        if data.is_empty() {
            return Ok(Vec::new());
        }
        let ops = self.backend.decode_content(&data)?;
        let items = self.collect_items(page, &ops, &page_box);
        Ok(build_blocks(items))
    }

    /// Walk the operations and position every painted element.
    fn collect_items(&self, page: PageId, ops: &[ContentOp], page_box: &Rect) -> Vec<PageItem> {
        let mut items = Vec::new();
        let mut ctm = Matrix::IDENTITY;
        let mut stack: Vec<Matrix> = Vec::new();
        let mut text = TextState::default();
        let mut in_text = false;

        for op in ops {
            match op.operator.as_str() {
                "q" => stack.push(ctm),
                "Q" => ctm = stack.pop().unwrap_or(Matrix::IDENTITY),
                "cm" => {
                    if let Some(m) = matrix_operands(op) {
                        ctm = m.concat(&ctm);
                    }
                }
                "BT" => {
                    in_text = true;
                    text.begin();
                }
                "ET" => in_text = false,
                "Tf" => {
                    if let Some(PdfValue::Name(name)) = op.operands.first() {
                        text.font = name.clone();
                    }
                    text.font_size = op.number(1).unwrap_or(text.font_size);
                }
                "TL" => text.leading = op.number(0).unwrap_or(text.leading),
                "Td" => {
                    if let (Some(tx), Some(ty)) = (op.number(0), op.number(1)) {
                        text.move_line(tx, ty);
                    }
                }
                "TD" => {
                    if let (Some(tx), Some(ty)) = (op.number(0), op.number(1)) {
                        text.leading = -ty;
                        text.move_line(tx, ty);
                    }
                }
                "Tm" => {
                    if let Some(m) = matrix_operands(op) {
                        text.tlm = m;
                        text.tm = m;
                    }
                }
                "T*" => text.next_line(),
                "Tj" | "TJ" | "'" | "\"" if in_text => {
                    if op.operator != "Tj" && op.operator != "TJ" {
                        text.next_line();
                    }
                    let shown = match op.operator.as_str() {
                        "\"" => op.operands.get(2),
                        _ => op.operands.first(),
                    };
                    let decoded = match shown {
                        Some(PdfValue::Array(parts)) => self.decode_tj(page, &text.font, parts),
                        Some(PdfValue::Str(bytes)) => {
                            self.backend.decode_text(page, &text.font, bytes)
                        }
                        _ => String::new(),
                    };
                    if let Some(span) = self.position_span(page, &decoded, &text, &ctm, page_box) {
                        items.push(PageItem::Text(span));
                    }
                    text.advance(metrics::text_width(&decoded, text.font_size));
                }
                "Do" => {
                    let area = ctm.apply_rect(&Rect::new(0.0, 0.0, 1.0, 1.0));
                    let rect = to_model(&area, page_box);
                    if !rect.is_degenerate() {
                        items.push(PageItem::Image(rect));
                    }
                }
                _ => {}
            }
        }

        items
    }

    /// Decode a TJ array, inserting a space for large negative kerning.
    fn decode_tj(&self, page: PageId, font: &[u8], parts: &[PdfValue]) -> String {
        let mut combined = String::new();
        for part in parts {
            match part {
                PdfValue::Str(bytes) => {
                    combined.push_str(&self.backend.decode_text(page, font, bytes));
                }
                PdfValue::Integer(_) | PdfValue::Real(_) => {
                    let adjustment = -get_number_from_value(part).unwrap_or(0.0);
                    if adjustment > TJ_SPACE_THRESHOLD
                        && !combined.is_empty()
                        && !combined.ends_with(' ')
                    {
                        combined.push(' ');
                    }
                }
                _ => {}
            }
        }
        combined
    }

    fn position_span(
        &self,
        page: PageId,
        decoded: &str,
        text: &TextState,
        ctm: &Matrix,
        page_box: &Rect,
    ) -> Option<PositionedSpan> {
        if decoded.trim().is_empty() {
            return None;
        }

        let render = text.tm.concat(ctm);
        let (x, y) = render.apply(0.0, 0.0);
        let size = text.font_size * render.vertical_scale();
        let hscale = render.horizontal_scale();
        let width = metrics::text_width(decoded, text.font_size) * hscale;

        // PDF space: baseline at y, glyphs extend up by the ascent.
        let pdf_rect = Rect::new(
            x,
            y - size * metrics::DESCENT,
            x + width,
            y + size * metrics::ASCENT,
        );
        let bbox = to_model(&pdf_rect, page_box);
        if !bbox.is_valid() {
            return None;
        }

        let font = self
            .backend
            .font_base_name(page, &text.font)
            .unwrap_or_else(|| String::from_utf8_lossy(&text.font).to_string());

        Some(PositionedSpan {
            span: Span::new(decoded, bbox).with_font(font, size),
            baseline: page_box.y1 - y,
        })
    }
}

/// Six numeric operands as a matrix.
fn matrix_operands(op: &ContentOp) -> Option<Matrix> {
    Some(Matrix::new(
        op.number(0)?,
        op.number(1)?,
        op.number(2)?,
        op.number(3)?,
        op.number(4)?,
        op.number(5)?,
    ))
}

/// Convert a PDF-space rectangle to model space (top-left origin).
fn to_model(r: &Rect, page_box: &Rect) -> Rect {
    Rect::new(
        r.x0 - page_box.x0,
        page_box.y1 - r.y1,
        r.x1 - page_box.x0,
        page_box.y1 - r.y0,
    )
}

/// Group painted items into blocks, keeping stream order. An image always
/// closes the current text block.
fn build_blocks(items: Vec<PageItem>) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut pending: Vec<PositionedSpan> = Vec::new();

    for item in items {
        match item {
            PageItem::Text(span) => pending.push(span),
            PageItem::Image(rect) => {
                blocks.extend(group_lines_into_blocks(group_spans_into_lines(
                    std::mem::take(&mut pending),
                )));
                blocks.push(Block::non_text(rect));
            }
        }
    }
    blocks.extend(group_lines_into_blocks(group_spans_into_lines(pending)));
    blocks
}

/// A line under construction with its baseline and dominant size.
struct LineGroup {
    spans: Vec<Span>,
    baseline: f32,
    size: f32,
}

impl LineGroup {
    fn bbox(&self) -> Rect {
        Rect::union_all(self.spans.iter().map(|s| &s.bbox)).unwrap_or_default()
    }
}

/// Group spans into lines in stream order. A span joins the current line
/// when it shares the baseline and does not jump across a gutter.
fn group_spans_into_lines(spans: Vec<PositionedSpan>) -> Vec<LineGroup> {
    let mut lines: Vec<LineGroup> = Vec::new();

    for ps in spans {
        let size = ps.span.size.max(1.0);
        let joins = lines.last().map_or(false, |line| {
            let prev = line.spans.last().map(|s| s.bbox).unwrap_or_default();
            let same_baseline = (ps.baseline - line.baseline).abs() <= size * 0.3;
            let gap = ps.span.bbox.x0 - prev.x1;
            same_baseline && gap > -size && gap <= size * 3.0
        });

        if joins {
            if let Some(line) = lines.last_mut() {
                line.size = line.size.max(ps.span.size);
                line.spans.push(ps.span);
            }
        } else {
            lines.push(LineGroup {
                baseline: ps.baseline,
                size: ps.span.size,
                spans: vec![ps.span],
            });
        }
    }

    lines
}

/// Group consecutive lines into blocks.
fn group_lines_into_blocks(lines: Vec<LineGroup>) -> Vec<Block> {
    if lines.is_empty() {
        return Vec::new();
    }

    let avg_spacing = calculate_avg_line_spacing(&lines);
    let mut blocks = Vec::new();
    let mut current: Vec<LineGroup> = Vec::new();

    for line in lines {
        if let Some(prev) = current.last() {
            if should_break_block(prev, &line, avg_spacing) {
                blocks.push(finish_block(std::mem::take(&mut current)));
            }
        }
        current.push(line);
    }
    if !current.is_empty() {
        blocks.push(finish_block(current));
    }

    blocks
}

fn finish_block(lines: Vec<LineGroup>) -> Block {
    Block::from_lines(
        lines
            .into_iter()
            .map(|l| Line::from_spans(l.spans))
            .collect(),
    )
}

fn calculate_avg_line_spacing(lines: &[LineGroup]) -> f32 {
    let spacings: Vec<f32> = lines
        .windows(2)
        .map(|w| w[1].baseline - w[0].baseline)
        .filter(|s| *s > 0.1)
        .collect();

    if spacings.is_empty() {
        return 12.0;
    }

    spacings.iter().sum::<f32>() / spacings.len() as f32
}

/// Whether `curr` starts a new block after `prev`.
fn should_break_block(prev: &LineGroup, curr: &LineGroup, avg_spacing: f32) -> bool {
    let spacing = curr.baseline - prev.baseline;

    // Moving up the page (new column, new region) or a paragraph gap
    if spacing <= 0.1 || spacing > avg_spacing * 1.5 {
        return true;
    }

    // Significant font size change
    if (prev.size - curr.size).abs() > 1.0 {
        return true;
    }

    let prev_box = prev.bbox();
    let curr_box = curr.bbox();

    // Significant left margin change (indentation or another column)
    if (prev_box.x0 - curr_box.x0).abs() > 20.0 {
        return true;
    }

    // No horizontal overlap at all
    curr_box.x0 > prev_box.x1 || curr_box.x1 < prev_box.x0
}
