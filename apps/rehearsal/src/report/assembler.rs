//! Report Assembler: flattens a finished session into renderer-ready content.
//!
//! The document holds sanitized strings and numbers only; all layout decisions
//! belong to the renderers.

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{AggregateReport, Category, CategoryScores, InterviewSession};
use crate::report::sanitize::{sanitize_list, sanitize_text};

pub const REPORT_TITLE: &str = "Interview Report";

/// One labelled score in 0..=100, drawn as a bar in the paginated form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryBar {
    pub label: String,
    pub value: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionBlock {
    /// 1-based.
    pub number: usize,
    pub question_type: String,
    pub question: String,
    pub answer: String,
    pub code: Option<String>,
    pub scores: Vec<CategoryBar>,
    pub feedback: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportDocument {
    pub title: String,
    pub job_role: String,
    pub experience_level: String,
    pub date: NaiveDate,
    pub status: String,
    pub overall_score: u32,
    pub category_bars: Vec<CategoryBar>,
    pub top_strengths: Vec<String>,
    pub top_improvements: Vec<String>,
    pub questions: Vec<QuestionBlock>,
}

/// Builds the exportable document. Questions pair submitted responses with
/// `report.per_question` in order.
pub fn assemble(
    session: &InterviewSession,
    report: &AggregateReport,
    date: NaiveDate,
) -> ReportDocument {
    let category_bars = Category::ALL
        .iter()
        .filter_map(|c| {
            report.category_scores.get(*c).map(|mean| CategoryBar {
                label: c.label().to_string(),
                value: mean.round().clamp(0.0, 100.0) as u32,
            })
        })
        .collect();

    let questions = session
        .submitted_responses()
        .zip(&report.per_question)
        .enumerate()
        .map(|(i, (response, evaluation))| {
            let answer = sanitize_text(&response.answer);
            QuestionBlock {
                number: i + 1,
                question_type: response.question_type.as_str().to_string(),
                question: sanitize_text(&response.question),
                answer: if answer.is_empty() {
                    "(no answer)".to_string()
                } else {
                    answer
                },
                code: response.code_text().map(sanitize_text),
                scores: question_bars(&evaluation.scores),
                feedback: sanitize_text(&evaluation.narrative_feedback),
            }
        })
        .collect();

    ReportDocument {
        title: REPORT_TITLE.to_string(),
        job_role: sanitize_text(&session.job_role),
        experience_level: sanitize_text(&session.experience_level),
        date,
        status: session.status.label().to_string(),
        overall_score: report.overall_score,
        category_bars,
        top_strengths: sanitize_list(&report.top_strengths),
        top_improvements: sanitize_list(&report.top_improvements),
        questions,
    }
}

fn question_bars(scores: &CategoryScores) -> Vec<CategoryBar> {
    Category::ALL
        .iter()
        .filter_map(|c| {
            scores.get(*c).map(|value| CategoryBar {
                label: c.label().to_string(),
                value,
            })
        })
        .collect()
}
