use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::evaluation::AggregateReport;
use crate::models::session::InterviewSession;

/// One question's entry in the persisted interview history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordEntry {
    pub question: String,
    pub answer: String,
    pub code: Option<String>,
    pub feedback: String,
}

/// Append-only history record written once per finished interview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewRecord {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub job_role: String,
    pub experience_level: String,
    pub status: String,
    pub overall_score: u32,
    pub recorded_at: DateTime<Utc>,
    pub entries: Vec<RecordEntry>,
}

impl InterviewRecord {
    /// Pairs submitted responses with their evaluations, in question order.
    pub fn from_session(session: &InterviewSession, report: &AggregateReport) -> Self {
        let entries = session
            .submitted_responses()
            .zip(report.per_question.iter())
            .map(|(response, evaluation)| RecordEntry {
                question: response.question.clone(),
                answer: response.answer.clone(),
                code: response.code_text().map(str::to_string),
                feedback: evaluation.narrative_feedback.clone(),
            })
            .collect();

        Self {
            session_id: session.id,
            user_id: session.user_id,
            job_role: session.job_role.clone(),
            experience_level: session.experience_level.clone(),
            status: session.status.label().to_string(),
            overall_score: report.overall_score,
            recorded_at: Utc::now(),
            entries,
        }
    }
}
