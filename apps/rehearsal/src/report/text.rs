use std::fmt::Write;

use crate::errors::AppError;
use crate::report::{ReportDocument, ReportRenderer};

const BLOCK_SEPARATOR: &str = "-------------------";

/// Plain-text export laid out like the interview history download.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextRenderer;

impl PlainTextRenderer {
    pub fn render_string(&self, doc: &ReportDocument) -> Result<String, AppError> {
        write_report(doc).map_err(|e| AppError::Render(e.to_string()))
    }
}

impl ReportRenderer for PlainTextRenderer {
    fn extension(&self) -> &'static str {
        "txt"
    }

    fn mime_type(&self) -> &'static str {
        "text/plain; charset=utf-8"
    }

    fn render_bytes(&self, document: &ReportDocument) -> Result<Vec<u8>, AppError> {
        self.render_string(document).map(String::into_bytes)
    }
}

fn write_report(doc: &ReportDocument) -> Result<String, std::fmt::Error> {
    let mut out = String::new();

    writeln!(out, "{}", doc.title)?;
    writeln!(out, "Date: {}", doc.date.format("%Y-%m-%d"))?;
    writeln!(out, "Position: {}", doc.job_role)?;
    writeln!(out, "Experience Level: {}", doc.experience_level)?;
    writeln!(out, "Status: {}", doc.status)?;

    for q in &doc.questions {
        writeln!(out)?;
        writeln!(out, "Question {} ({}):", q.number, q.question_type)?;
        writeln!(out, "{}", q.question)?;
        writeln!(out)?;
        writeln!(out, "Your Answer:")?;
        writeln!(out, "{}", q.answer)?;
        if let Some(code) = &q.code {
            writeln!(out)?;
            writeln!(out, "Code:")?;
            writeln!(out, "{code}")?;
        }
        writeln!(out)?;
        let scores: Vec<String> = q
            .scores
            .iter()
            .map(|s| format!("{} {}", s.label, s.value))
            .collect();
        writeln!(out, "Scores: {}", scores.join(", "))?;
        writeln!(out)?;
        writeln!(out, "Feedback:")?;
        writeln!(out, "{}", q.feedback)?;
        writeln!(out, "{BLOCK_SEPARATOR}")?;
    }

    writeln!(out)?;
    writeln!(out, "Overall Performance:")?;
    writeln!(out, "Overall Score: {}/100", doc.overall_score)?;
    for bar in &doc.category_bars {
        writeln!(out, "{}: {}/100", bar.label, bar.value)?;
    }

    if !doc.top_strengths.is_empty() {
        writeln!(out)?;
        writeln!(out, "Top Strengths:")?;
        for s in &doc.top_strengths {
            writeln!(out, "- {s}")?;
        }
    }
    if !doc.top_improvements.is_empty() {
        writeln!(out)?;
        writeln!(out, "Areas for Improvement:")?;
        for s in &doc.top_improvements {
            writeln!(out, "- {s}")?;
        }
    }

    Ok(out)
}
