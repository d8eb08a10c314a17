//! Paginated A4 PDF export.
//!
//! Writes PDF 1.4 directly: two standard Type1 fonts (Helvetica, Helvetica-Bold) with
//! WinAnsi encoding, one content stream per page, and a classic xref table.
//! Text is measured with the tables in `font_metrics` so wrapping matches what the
//! viewer draws.

use crate::errors::AppError;
use crate::report::font_metrics::{wrap_lines, Font};
use crate::report::{CategoryBar, ReportDocument, ReportRenderer};

// ────────────────────────────────────────────────────────────────────────────
// Page geometry (points)
// ────────────────────────────────────────────────────────────────────────────

const PAGE_WIDTH: f32 = 595.276;
const PAGE_HEIGHT: f32 = 841.89;
const MARGIN: f32 = 50.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const LINE_SPACING: f32 = 1.4;

const BAR_LABEL_WIDTH: f32 = 120.0;
const BAR_WIDTH: f32 = 280.0;
const BAR_HEIGHT: f32 = 10.0;

const BODY_SIZE: f32 = 11.0;
const SMALL_SIZE: f32 = 9.0;

/// First object id used for pages; 1–4 are catalog, page tree and the two fonts.
const FIRST_PAGE_OBJECT: usize = 5;

#[derive(Debug, Clone, Copy, Default)]
pub struct PdfRenderer;

impl ReportRenderer for PdfRenderer {
    fn extension(&self) -> &'static str {
        "pdf"
    }

    fn mime_type(&self) -> &'static str {
        "application/pdf"
    }

    fn render_bytes(&self, document: &ReportDocument) -> Result<Vec<u8>, AppError> {
        let pages = lay_out(document);
        if pages.is_empty() {
            return Err(AppError::Render("document produced no pages".to_string()));
        }
        Ok(write_pdf(&pages))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Layout
// ────────────────────────────────────────────────────────────────────────────

fn lay_out(doc: &ReportDocument) -> Vec<String> {
    let mut page = PageWriter::new();

    page.text_line(&doc.title, Font::HelveticaBold, 20.0, 0.0);
    page.gap(6.0);
    page.text_line(&format!("Position: {}", doc.job_role), Font::Helvetica, BODY_SIZE, 0.0);
    page.text_line(
        &format!("Experience Level: {}", doc.experience_level),
        Font::Helvetica,
        BODY_SIZE,
        0.0,
    );
    page.text_line(
        &format!("Date: {}", doc.date.format("%Y-%m-%d")),
        Font::Helvetica,
        BODY_SIZE,
        0.0,
    );
    page.gap(12.0);

    page.text_line(
        &format!("Overall Score: {}/100", doc.overall_score),
        Font::HelveticaBold,
        16.0,
        0.0,
    );
    page.gap(4.0);
    for bar in &doc.category_bars {
        page.score_bar(bar);
    }

    page.bullet_section("Top Strengths", &doc.top_strengths);
    page.bullet_section("Areas for Improvement", &doc.top_improvements);

    for q in &doc.questions {
        page.gap(14.0);
        // Keep a heading together with at least its first question line.
        page.ensure(14.0 * LINE_SPACING + BODY_SIZE * LINE_SPACING);
        page.text_line(
            &format!("Question {} ({})", q.number, q.question_type),
            Font::HelveticaBold,
            13.0,
            0.0,
        );
        page.paragraph(&q.question, Font::Helvetica, BODY_SIZE, 0.0);

        page.labelled("Answer:", &q.answer);
        if let Some(code) = &q.code {
            page.labelled("Code:", code);
        }

        let scores: Vec<String> = q
            .scores
            .iter()
            .map(|s| format!("{} {}", s.label, s.value))
            .collect();
        page.gap(2.0);
        page.paragraph(&scores.join("  |  "), Font::Helvetica, SMALL_SIZE, 0.0);
        page.labelled("Feedback:", &q.feedback);
    }

    page.finish()
}

/// Accumulates content streams, breaking to a new page when the cursor would cross
/// the bottom margin.
struct PageWriter {
    pages: Vec<String>,
    current: String,
    /// Baseline cursor, measured from the bottom edge.
    y: f32,
}

impl PageWriter {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: String::new(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn ensure(&mut self, height: f32) {
        if self.y - height < MARGIN {
            self.pages.push(std::mem::take(&mut self.current));
            self.y = PAGE_HEIGHT - MARGIN;
        }
    }

    fn gap(&mut self, height: f32) {
        self.y -= height;
    }

    fn text_line(&mut self, text: &str, font: Font, size: f32, indent: f32) {
        let line_height = size * LINE_SPACING;
        self.ensure(line_height);
        self.y -= size;
        self.current.push_str(&format!(
            "BT /{} {:.1} Tf {:.2} {:.2} Td ({}) Tj ET\n",
            font.resource(),
            size,
            MARGIN + indent,
            self.y,
            encode_pdf_string(text)
        ));
        self.y -= line_height - size;
    }

    fn paragraph(&mut self, text: &str, font: Font, size: f32, indent: f32) {
        for line in wrap_lines(text, font, size, CONTENT_WIDTH - indent) {
            self.text_line(&line, font, size, indent);
        }
    }

    fn labelled(&mut self, label: &str, body: &str) {
        self.gap(4.0);
        self.ensure(2.0 * BODY_SIZE * LINE_SPACING);
        self.text_line(label, Font::HelveticaBold, BODY_SIZE, 0.0);
        self.paragraph(body, Font::Helvetica, BODY_SIZE, 10.0);
    }

    fn bullet_section(&mut self, heading: &str, entries: &[String]) {
        if entries.is_empty() {
            return;
        }
        self.gap(10.0);
        self.ensure(14.0 * LINE_SPACING + BODY_SIZE * LINE_SPACING);
        self.text_line(heading, Font::HelveticaBold, 14.0, 0.0);
        for entry in entries {
            let lines = wrap_lines(entry, Font::Helvetica, BODY_SIZE, CONTENT_WIDTH - 12.0);
            for (i, line) in lines.iter().enumerate() {
                let text = if i == 0 {
                    format!("- {line}")
                } else {
                    line.clone()
                };
                let indent = if i == 0 { 0.0 } else { 12.0 };
                self.text_line(&text, Font::Helvetica, BODY_SIZE, indent);
            }
        }
    }

    /// Label, grey track, filled portion proportional to `value`, then the number.
    fn score_bar(&mut self, bar: &CategoryBar) {
        let row_height = BAR_HEIGHT + 8.0;
        self.ensure(row_height);
        self.y -= row_height;

        let bar_x = MARGIN + BAR_LABEL_WIDTH;
        let fill = BAR_WIDTH * bar.value.min(100) as f32 / 100.0;

        self.current.push_str(&format!(
            "BT /F1 {:.1} Tf {:.2} {:.2} Td ({}) Tj ET\n",
            BODY_SIZE,
            MARGIN,
            self.y + 1.0,
            encode_pdf_string(&bar.label)
        ));
        self.current.push_str(&format!(
            "0.90 0.90 0.90 rg {bar_x:.2} {:.2} {BAR_WIDTH:.2} {BAR_HEIGHT:.2} re f\n",
            self.y
        ));
        self.current.push_str(&format!(
            "0.20 0.40 0.80 rg {bar_x:.2} {:.2} {fill:.2} {BAR_HEIGHT:.2} re f\n0 0 0 rg\n",
            self.y
        ));
        self.current.push_str(&format!(
            "BT /F1 {:.1} Tf {:.2} {:.2} Td ({}) Tj ET\n",
            BODY_SIZE,
            bar_x + BAR_WIDTH + 10.0,
            self.y + 1.0,
            bar.value
        ));
    }

    /// Closes the last page and stamps "Page i of n" footers.
    fn finish(mut self) -> Vec<String> {
        self.pages.push(self.current);
        let total = self.pages.len();
        for (i, page) in self.pages.iter_mut().enumerate() {
            let footer = format!("Page {} of {}", i + 1, total);
            let x = PAGE_WIDTH - MARGIN - Font::Helvetica.measure(&footer, SMALL_SIZE);
            page.push_str(&format!(
                "BT /F1 {SMALL_SIZE:.1} Tf {x:.2} {:.2} Td ({footer}) Tj ET\n",
                MARGIN / 2.0
            ));
        }
        self.pages
    }
}

/// Escapes a string for a PDF literal under WinAnsi encoding. Characters with no
/// WinAnsi code point become `?`.
fn encode_pdf_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            ' '..='~' => out.push(c),
            '\u{a0}'..='\u{ff}' => out.push_str(&format!("\\{:03o}", c as u32)),
            _ => match win_ansi_punctuation(c) {
                Some(code) => out.push_str(&format!("\\{code:03o}")),
                None => out.push('?'),
            },
        }
    }
    out
}

/// Typographic punctuation in the 0x80-0x9F block of WinAnsiEncoding.
fn win_ansi_punctuation(c: char) -> Option<u8> {
    let code = match c {
        '\u{2026}' => 0x85, // ellipsis
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201c}' => 0x93,
        '\u{201d}' => 0x94,
        '\u{2022}' => 0x95, // bullet
        '\u{2013}' => 0x96, // en dash
        '\u{2014}' => 0x97, // em dash
        _ => return None,
    };
    Some(code)
}

// ────────────────────────────────────────────────────────────────────────────
// File structure
// ────────────────────────────────────────────────────────────────────────────

fn write_pdf(pages: &[String]) -> Vec<u8> {
    let page_ids: Vec<usize> = (0..pages.len())
        .map(|i| FIRST_PAGE_OBJECT + 2 * i)
        .collect();
    let kids: Vec<String> = page_ids.iter().map(|id| format!("{id} 0 R")).collect();

    let mut objects: Vec<String> = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            pages.len()
        ),
        font_object(Font::Helvetica),
        font_object(Font::HelveticaBold),
    ];
    for (content, page_id) in pages.iter().zip(&page_ids) {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
             /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
            page_id + 1
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{content}endstream",
            content.len()
        ));
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
    }

    let xref_offset = out.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in &offsets {
        xref.push_str(&format!("{offset:010} 00000 n \n"));
    }
    xref.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
        objects.len() + 1
    ));
    out.extend_from_slice(xref.as_bytes());
    out
}

fn font_object(font: Font) -> String {
    format!(
        "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
        font.base_font()
    )
}
