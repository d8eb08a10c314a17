use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of questions in a full interview.
pub const QUESTION_COUNT: usize = 10;

/// Question category. Fixed by position in the interview, never chosen by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Introduction,
    Aptitude,
    Technical,
    Coding,
}

impl QuestionType {
    /// 0 → introduction, 1–3 → aptitude, 4–6 → technical, 7 and up → coding.
    pub fn for_index(index: usize) -> Self {
        match index {
            0 => QuestionType::Introduction,
            1..=3 => QuestionType::Aptitude,
            4..=6 => QuestionType::Technical,
            _ => QuestionType::Coding,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Introduction => "introduction",
            QuestionType::Aptitude => "aptitude",
            QuestionType::Technical => "technical",
            QuestionType::Coding => "coding",
        }
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tagged session state. Transitions live in `session::state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Active { index: usize },
    /// `early_stop` records whether the user aborted, which decides the terminal state.
    AwaitingEvaluation { early_stop: bool },
    Completed,
    Aborted,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Aborted)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Active { .. } => "active",
            SessionStatus::AwaitingEvaluation { .. } => "awaiting_evaluation",
            SessionStatus::Completed => "completed",
            SessionStatus::Aborted => "aborted",
        }
    }
}

/// One question and the candidate's answer to it.
///
/// Answer fields are mutable until `submitted_at` is set; the controller never
/// touches a submitted response again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResponse {
    pub index: usize,
    pub question: String,
    pub question_type: QuestionType,
    pub answer: String,
    pub code: Option<String>,
    pub timer_seconds: u32,
    pub submitted_at: Option<DateTime<Utc>>,
}

impl QuestionResponse {
    pub fn new(index: usize, question: String, timer_seconds: u32) -> Self {
        Self {
            index,
            question,
            question_type: QuestionType::for_index(index),
            answer: String::new(),
            code: None,
            timer_seconds,
            submitted_at: None,
        }
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted_at.is_some()
    }

    /// Non-blank code only; an empty editor does not count as a code answer.
    pub fn code_text(&self) -> Option<&str> {
        self.code.as_deref().filter(|c| !c.trim().is_empty())
    }

    pub fn has_code(&self) -> bool {
        self.code_text().is_some()
    }
}

/// Input for a new interview, as submitted by the interactive client's setup form.
#[derive(Debug, Clone, Deserialize)]
pub struct InterviewRequest {
    pub user_id: Uuid,
    pub job_role: String,
    pub experience_level: String,
    pub job_description: String,
    pub resume_text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_role: String,
    pub experience_level: String,
    pub job_description: String,
    pub resume_text: Option<String>,
    pub responses: Vec<QuestionResponse>,
    pub current_index: usize,
    pub status: SessionStatus,
    pub elapsed_seconds: u64,
    pub started_at: Option<DateTime<Utc>>,
}

impl InterviewSession {
    pub fn new(request: InterviewRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: request.user_id,
            job_role: request.job_role,
            experience_level: request.experience_level,
            job_description: request.job_description,
            resume_text: request.resume_text,
            responses: Vec::with_capacity(QUESTION_COUNT),
            current_index: 0,
            status: SessionStatus::Idle,
            elapsed_seconds: 0,
            started_at: None,
        }
    }

    /// The response currently open for answering, if any.
    pub fn active_response_mut(&mut self) -> Option<&mut QuestionResponse> {
        match self.status {
            SessionStatus::Active { index } => self
                .responses
                .get_mut(index)
                .filter(|r| !r.is_submitted()),
            _ => None,
        }
    }

    pub fn active_response(&self) -> Option<&QuestionResponse> {
        match self.status {
            SessionStatus::Active { index } => {
                self.responses.get(index).filter(|r| !r.is_submitted())
            }
            _ => None,
        }
    }

    /// Submitted responses in question order. These are what gets evaluated.
    pub fn submitted_responses(&self) -> impl Iterator<Item = &QuestionResponse> {
        self.responses.iter().filter(|r| r.is_submitted())
    }
}
