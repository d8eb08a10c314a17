//! Shared fakes for the session integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use rehearsal::errors::AppError;
use rehearsal::interview::prompts::EVALUATION_SYSTEM;
use rehearsal::llm_client::{CompletionError, CompletionRequest, CompletionService};
use rehearsal::models::InterviewRequest;
use rehearsal::session::{Collaborators, SessionController, SilentPlayer};
use rehearsal::store::MemoryStore;
use rehearsal::transcription::TranscriptionService;
use rehearsal::SessionSettings;

// --- Mock implementations ---

/// How the fake answers evaluation prompts.
#[derive(Clone)]
pub enum EvaluationScript {
    /// Every evaluation call is rate limited.
    AlwaysRateLimited,
    /// Every evaluation call returns this text.
    Respond(String),
}

/// Generates numbered questions and answers evaluation prompts from a script.
pub struct FakeCompletion {
    evaluation: EvaluationScript,
    questions: Mutex<usize>,
    evaluation_calls: Mutex<usize>,
}

impl FakeCompletion {
    pub fn new(evaluation: EvaluationScript) -> Arc<Self> {
        Arc::new(Self {
            evaluation,
            questions: Mutex::new(0),
            evaluation_calls: Mutex::new(0),
        })
    }

    pub fn evaluation_calls(&self) -> usize {
        *self.evaluation_calls.lock().unwrap()
    }
}

#[async_trait]
impl CompletionService for FakeCompletion {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, CompletionError> {
        if request.system != EVALUATION_SYSTEM {
            let mut n = self.questions.lock().unwrap();
            *n += 1;
            return Ok(format!("Generated question #{n}"));
        }

        *self.evaluation_calls.lock().unwrap() += 1;
        match &self.evaluation {
            EvaluationScript::AlwaysRateLimited => Err(CompletionError::RateLimited),
            EvaluationScript::Respond(text) => Ok(text.clone()),
        }
    }
}

/// Transcribes any audio as its UTF-8 text.
pub struct EchoTranscriber;

#[async_trait]
impl TranscriptionService for EchoTranscriber {
    async fn transcribe(&self, audio: Bytes) -> Result<String, AppError> {
        Ok(String::from_utf8_lossy(&audio).into_owned())
    }
}

pub fn backend_request() -> InterviewRequest {
    InterviewRequest {
        user_id: Uuid::new_v4(),
        job_role: "Backend Engineer".to_string(),
        experience_level: "mid".to_string(),
        job_description: "Design and operate Rust services on PostgreSQL.".to_string(),
        resume_text: Some("Four years of backend work.".to_string()),
    }
}

pub struct Harness {
    pub controller: SessionController,
    pub completion: Arc<FakeCompletion>,
    pub store: Arc<MemoryStore>,
}

pub async fn harness(evaluation: EvaluationScript, with_voice: bool) -> Harness {
    let completion = FakeCompletion::new(evaluation);
    let store = Arc::new(MemoryStore::new());
    let request = backend_request();
    store.grant_credits(request.user_id, 5).await;

    let controller = SessionController::new(
        request,
        SessionSettings::default(),
        Collaborators {
            completion: completion.clone(),
            transcription: with_voice
                .then(|| Arc::new(EchoTranscriber) as Arc<dyn TranscriptionService>),
            speech: Arc::new(SilentPlayer),
            store: store.clone(),
        },
    );

    Harness {
        controller,
        completion,
        store,
    }
}

/// A well-formed evaluation without a code score.
pub fn evaluation_json(technical: u32, communication: u32, problem_solving: u32) -> String {
    format!(
        r#"{{"scores": {{"technical": {technical}, "communication": {communication}, "problem_solving": {problem_solving}}},
            "review": {{"strengths": ["Clear example"], "technical_flaws": ["Missed edge cases"],
                        "communication_flaws": [], "problem_solving_flaws": [],
                        "verdict": "Reasonable answer."}}}}"#
    )
}
