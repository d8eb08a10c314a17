//! Question Generator: produces question text for a slot in the fixed type schedule.
//!
//! Never fails: after the retry budget is spent, a fixed placeholder for the slot's
//! question type is returned so the session keeps moving.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::SessionSettings;
use crate::errors::AppError;
use crate::interview::prompts::{
    APTITUDE_GUIDANCE, CODING_GUIDANCE, INTRODUCTION_GUIDANCE, QUESTION_PROMPT_TEMPLATE,
    TECHNICAL_GUIDANCE,
};
use crate::interview::truncate_chars;
use crate::llm_client::prompts::PLAIN_TEXT_SYSTEM;
use crate::llm_client::retry::{run_with_retry, RetryPolicy};
use crate::llm_client::{
    complete_within, CompletionError, CompletionRequest, CompletionService,
};
use crate::models::{InterviewSession, QuestionType};

/// Resume text beyond this many characters is cut from the prompt.
const RESUME_EXCERPT_CHARS: usize = 1500;

pub struct QuestionGenerator {
    llm: Arc<dyn CompletionService>,
    retry: RetryPolicy,
    timeout: Duration,
    model: Option<String>,
}

impl QuestionGenerator {
    pub fn new(llm: Arc<dyn CompletionService>, settings: &SessionSettings) -> Self {
        Self {
            llm,
            retry: RetryPolicy::new(
                settings.generation_max_attempts,
                settings.generation_retry_delay,
            ),
            timeout: settings.generation_timeout,
            model: settings.completion_model.clone(),
        }
    }

    /// Returns question text for slot `index`. Falls back to a placeholder, never errors.
    pub async fn generate(&self, session: &InterviewSession, index: usize) -> String {
        let question_type = QuestionType::for_index(index);
        let prompt = build_question_prompt(session, question_type);
        let request =
            CompletionRequest::new(&prompt, PLAIN_TEXT_SYSTEM).with_model(self.model.as_deref());

        let result = run_with_retry(
            self.retry,
            "question_generation",
            |attempt| self.attempt(request, attempt),
            AppError::is_recoverable,
        )
        .await;

        match result {
            Ok(question) => {
                info!(session_id = %session.id, index, %question_type, "Question generated");
                question
            }
            Err(failure) => {
                warn!(
                    session_id = %session.id,
                    index,
                    attempts = failure.attempts,
                    error = %failure.error,
                    "Question generation failed, using placeholder"
                );
                placeholder_question(question_type).to_string()
            }
        }
    }

    async fn attempt(
        &self,
        request: CompletionRequest<'_>,
        attempt: u32,
    ) -> Result<String, AppError> {
        let text = complete_within(self.llm.as_ref(), request, self.timeout)
            .await
            .map_err(|e| classify_completion_error(e, attempt))?;

        let question = clean_question(&text);
        if question.is_empty() {
            return Err(AppError::GenerationFailure(
                "completion returned an empty question".to_string(),
            ));
        }
        Ok(question)
    }
}

/// Transient completion failures stay recoverable; anything else (bad key, bad request)
/// ends the retry loop at once.
fn classify_completion_error(error: CompletionError, attempt: u32) -> AppError {
    match error {
        CompletionError::RateLimited => AppError::RateLimited { attempts: attempt },
        e if e.is_retryable() => AppError::GenerationFailure(e.to_string()),
        e => AppError::Internal(e.into()),
    }
}

/// Fixed per-type question used when generation is exhausted.
pub fn placeholder_question(question_type: QuestionType) -> &'static str {
    match question_type {
        QuestionType::Introduction => {
            "Tell me about yourself and what draws you to this role."
        }
        QuestionType::Aptitude => {
            "Walk me through how you would estimate the number of requests per day a popular web service handles."
        }
        QuestionType::Technical => {
            "Describe a technical decision you made recently, the alternatives you weighed, and the trade-offs involved."
        }
        QuestionType::Coding => {
            "Write a function that returns the first character in a string that does not repeat, or nothing if every character repeats."
        }
    }
}

fn type_guidance(question_type: QuestionType) -> &'static str {
    match question_type {
        QuestionType::Introduction => INTRODUCTION_GUIDANCE,
        QuestionType::Aptitude => APTITUDE_GUIDANCE,
        QuestionType::Technical => TECHNICAL_GUIDANCE,
        QuestionType::Coding => CODING_GUIDANCE,
    }
}

pub(crate) fn build_question_prompt(
    session: &InterviewSession,
    question_type: QuestionType,
) -> String {
    let resume_section = match session.resume_text.as_deref().map(str::trim) {
        Some(resume) if !resume.is_empty() => format!(
            "Candidate background (resume excerpt): {}\n",
            truncate_chars(resume, RESUME_EXCERPT_CHARS)
        ),
        _ => String::new(),
    };

    QUESTION_PROMPT_TEMPLATE
        .replace("{question_type}", question_type.as_str())
        .replace("{type_guidance}", type_guidance(question_type))
        .replace("{job_role}", session.job_role.trim())
        .replace("{experience_level}", session.experience_level.trim())
        .replace("{job_description}", session.job_description.trim())
        .replace("{resume_section}", &resume_section)
}

/// Trims whitespace and a single pair of wrapping quotes.
fn clean_question(text: &str) -> String {
    let text = text.trim();
    let unquoted = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text);
    unquoted.trim().to_string()
}
