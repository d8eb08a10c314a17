//! Evaluation Pipeline: scores one submitted answer at a time.
//!
//! Every path ends in a usable `Evaluation`: completion failures and unparseable
//! output become the deterministic fallback, never an error to the caller.

use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::SessionSettings;
use crate::errors::AppError;
use crate::interview::prompts::{
    CODE_FLAWS_FIELD, CODE_SCORE_FIELD, EVALUATION_PROMPT_TEMPLATE, EVALUATION_SYSTEM,
};
use crate::interview::truncate_chars;
use crate::llm_client::retry::{run_with_retry, RetryPolicy};
use crate::llm_client::{
    complete_within, strip_json_fences, CompletionError, CompletionRequest, CompletionService,
};
use crate::models::{
    CategoryScores, Evaluation, EvaluationSource, InterviewSession, QuestionResponse,
};

/// Scores assigned when no usable model judgment exists.
pub const FALLBACK_SCORES: CategoryScores = CategoryScores {
    technical: 58,
    communication: 60,
    problem_solving: 57,
    code_quality: Some(55),
};

/// Every fallback category score falls inside this band.
pub const FALLBACK_SCORE_BAND: RangeInclusive<u32> = 55..=64;

/// Role and level the answer is judged against.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    pub job_role: &'a str,
    pub experience_level: &'a str,
}

impl<'a> From<&'a InterviewSession> for EvaluationContext<'a> {
    fn from(session: &'a InterviewSession) -> Self {
        Self {
            job_role: session.job_role.trim(),
            experience_level: session.experience_level.trim(),
        }
    }
}

/// `completed` of `total` answers evaluated. Only ever increases within a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluationProgress {
    pub completed: usize,
    pub total: usize,
}

/// Result of validating a completion against the evaluation schema.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Parsed(Evaluation),
    Failed(String),
}

pub struct EvaluationPipeline {
    llm: Arc<dyn CompletionService>,
    retry: RetryPolicy,
    timeout: Duration,
    answer_char_limit: usize,
    code_char_limit: usize,
    model: Option<String>,
}

impl EvaluationPipeline {
    pub fn new(llm: Arc<dyn CompletionService>, settings: &SessionSettings) -> Self {
        Self {
            llm,
            retry: RetryPolicy::new(
                settings.evaluation_max_attempts,
                settings.evaluation_retry_delay,
            ),
            timeout: settings.evaluation_timeout,
            answer_char_limit: settings.answer_char_limit,
            code_char_limit: settings.code_char_limit,
            model: settings.completion_model.clone(),
        }
    }

    /// Scores one response. Never fails.
    pub async fn evaluate(
        &self,
        ctx: EvaluationContext<'_>,
        response: &QuestionResponse,
    ) -> Evaluation {
        let has_code = response.has_code();
        let prompt = self.build_evaluation_prompt(ctx, response);
        let request =
            CompletionRequest::new(&prompt, EVALUATION_SYSTEM).with_model(self.model.as_deref());

        let result = run_with_retry(
            self.retry,
            "answer_evaluation",
            |_| complete_within(self.llm.as_ref(), request, self.timeout),
            CompletionError::is_retryable,
        )
        .await;

        let raw = match result {
            Ok(raw) => raw,
            Err(failure) => {
                let error = match failure.error {
                    CompletionError::RateLimited => AppError::RateLimited {
                        attempts: failure.attempts,
                    },
                    other => AppError::Internal(other.into()),
                };
                warn!(
                    index = response.index,
                    attempts = failure.attempts,
                    error = %error,
                    "Evaluation call failed, using fallback"
                );
                return fallback_evaluation(ctx, has_code, error.to_string());
            }
        };

        match parse_evaluation(&raw, has_code) {
            ParseOutcome::Parsed(evaluation) => evaluation,
            ParseOutcome::Failed(reason) => {
                let error = AppError::ParseFailure(reason);
                warn!(index = response.index, error = %error, "Using fallback evaluation");
                fallback_evaluation(ctx, has_code, error.to_string())
            }
        }
    }

    /// Evaluates every submitted response in order, one call in flight at a time,
    /// publishing progress after each.
    pub async fn evaluate_all(
        &self,
        session: &InterviewSession,
        progress: &watch::Sender<EvaluationProgress>,
    ) -> Vec<Evaluation> {
        let ctx = EvaluationContext::from(session);
        let responses: Vec<&QuestionResponse> = session.submitted_responses().collect();
        let total = responses.len();

        progress.send_replace(EvaluationProgress {
            completed: 0,
            total,
        });

        let mut evaluations = Vec::with_capacity(total);
        for (done, response) in responses.into_iter().enumerate() {
            evaluations.push(self.evaluate(ctx, response).await);
            progress.send_replace(EvaluationProgress {
                completed: done + 1,
                total,
            });
        }

        let fallbacks = evaluations.iter().filter(|e| e.is_fallback()).count();
        info!(session_id = %session.id, total, fallbacks, "Evaluation finished");
        evaluations
    }

    fn build_evaluation_prompt(
        &self,
        ctx: EvaluationContext<'_>,
        response: &QuestionResponse,
    ) -> String {
        let answer = match response.answer.trim() {
            "" => "(no answer given)".to_string(),
            text => truncate_chars(text, self.answer_char_limit),
        };
        let (code_section, code_score_field, code_flaws_field) = match response.code_text() {
            Some(code) => (
                format!("Code:\n{}\n", truncate_chars(code, self.code_char_limit)),
                CODE_SCORE_FIELD,
                CODE_FLAWS_FIELD,
            ),
            None => (String::new(), "", ""),
        };

        EVALUATION_PROMPT_TEMPLATE
            .replace("{job_role}", ctx.job_role)
            .replace("{experience_level}", ctx.experience_level)
            .replace("{question_type}", response.question_type.as_str())
            .replace("{question}", response.question.trim())
            .replace("{answer}", &answer)
            .replace("{code_section}", &code_section)
            .replace("{code_score_field}", code_score_field)
            .replace("{code_flaws_field}", code_flaws_field)
    }
}

// ──────────────────────────────────────────────
// Strict schema
// ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawEvaluation {
    scores: RawScores,
    review: RawReview,
}

#[derive(Debug, Deserialize)]
struct RawScores {
    technical: f64,
    communication: f64,
    #[serde(alias = "problemSolving")]
    problem_solving: f64,
    #[serde(default, alias = "codeQuality")]
    code_quality: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawReview {
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default, alias = "technicalFlaws")]
    technical_flaws: Vec<String>,
    #[serde(default, alias = "communicationFlaws")]
    communication_flaws: Vec<String>,
    #[serde(default, alias = "problemSolvingFlaws")]
    problem_solving_flaws: Vec<String>,
    #[serde(default, alias = "codeFlaws")]
    code_flaws: Vec<String>,
    verdict: String,
}

/// Parses a raw completion. Tries the whole text first, then the first embedded
/// `{...}` object.
pub fn parse_evaluation(raw: &str, has_code: bool) -> ParseOutcome {
    let text = strip_json_fences(raw);

    let parsed = match serde_json::from_str::<RawEvaluation>(text) {
        Ok(parsed) => parsed,
        Err(direct) => match extract_json_object(text) {
            Some(object) => match serde_json::from_str::<RawEvaluation>(object) {
                Ok(parsed) => parsed,
                Err(e) => return ParseOutcome::Failed(format!("embedded object rejected: {e}")),
            },
            None => return ParseOutcome::Failed(format!("no JSON object found: {direct}")),
        },
    };

    match validate(parsed, has_code) {
        Ok(evaluation) => ParseOutcome::Parsed(evaluation),
        Err(reason) => ParseOutcome::Failed(reason),
    }
}

/// Returns the first balanced `{...}` in `text`, ignoring braces inside JSON strings.
/// When braces never balance, falls back to the span from the first `{` to the last `}`.
pub(crate) fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn validate(raw: RawEvaluation, has_code: bool) -> Result<Evaluation, String> {
    let code_quality = match (has_code, raw.scores.code_quality) {
        (true, Some(score)) => Some(check_score("code_quality", score)?),
        (true, None) => return Err("code_quality missing for an answer with code".to_string()),
        (false, _) => None,
    };
    let scores = CategoryScores {
        technical: check_score("technical", raw.scores.technical)?,
        communication: check_score("communication", raw.scores.communication)?,
        problem_solving: check_score("problem_solving", raw.scores.problem_solving)?,
        code_quality,
    };

    let verdict = raw.review.verdict.trim();
    if verdict.is_empty() {
        return Err("verdict is empty".to_string());
    }

    let code_flaws = if has_code {
        raw.review.code_flaws
    } else {
        Vec::new()
    };
    let weaknesses = raw
        .review
        .technical_flaws
        .into_iter()
        .chain(raw.review.communication_flaws)
        .chain(raw.review.problem_solving_flaws)
        .chain(code_flaws);

    Ok(Evaluation {
        scores,
        strengths: clean_entries(raw.review.strengths),
        weaknesses: clean_entries(weaknesses),
        narrative_feedback: verdict.to_string(),
        source: EvaluationSource::Model,
    })
}

/// Accepts `85` and `85.0`; rejects fractions and anything outside 0-100.
fn check_score(field: &str, value: f64) -> Result<u32, String> {
    if value.fract() != 0.0 {
        return Err(format!("{field} score {value} is not a whole number"));
    }
    if !(0.0..=100.0).contains(&value) {
        return Err(format!("{field} score {value} outside 0-100"));
    }
    Ok(value as u32)
}

fn clean_entries(entries: impl IntoIterator<Item = String>) -> Vec<String> {
    entries
        .into_iter()
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .collect()
}

// ──────────────────────────────────────────────
// Fallback
// ──────────────────────────────────────────────

/// Deterministic evaluation used whenever the model's judgment is unavailable.
/// Identical inputs always produce an identical evaluation.
pub fn fallback_evaluation(
    ctx: EvaluationContext<'_>,
    has_code: bool,
    reason: impl Into<String>,
) -> Evaluation {
    let mut weaknesses = vec![
        "Technical depth was not clearly demonstrated".to_string(),
        "Explanation could be more structured and concise".to_string(),
        "Approach to the problem was not fully reasoned through".to_string(),
    ];
    if has_code {
        weaknesses.push("Code would benefit from clearer structure and edge-case handling".to_string());
    }

    Evaluation {
        scores: CategoryScores {
            code_quality: if has_code { FALLBACK_SCORES.code_quality } else { None },
            ..FALLBACK_SCORES
        },
        strengths: vec![
            "Engaged with the question".to_string(),
            "Showed some familiarity with the topic".to_string(),
        ],
        weaknesses,
        narrative_feedback: format!(
            "Response falls short of expectations for a {} {}. Focus on concrete examples, \
             clear structure, and depth appropriate to the role.",
            ctx.experience_level, ctx.job_role
        ),
        source: EvaluationSource::Fallback {
            reason: reason.into(),
        },
    }
}
