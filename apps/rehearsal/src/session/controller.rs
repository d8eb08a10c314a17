//! Session Controller: drives one interview from the first question to the report.
//!
//! Owns the session exclusively. Background tasks never touch it; they send
//! `TaskMessage`s that are applied here through `next_update`.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::SessionSettings;
use crate::errors::AppError;
use crate::interview::{aggregate, EvaluationPipeline, EvaluationProgress, QuestionGenerator};
use crate::llm_client::CompletionService;
use crate::models::{
    AggregateReport, InterviewRecord, InterviewRequest, InterviewSession, QuestionResponse,
    QuestionType, SessionStatus,
};
use crate::session::state::{transition, SessionEvent};
use crate::session::tasks::{
    spawn_capture, spawn_playback, spawn_timer, CaptureEvent, SpeechPlayer, TaskGuard,
    TaskMessage, TimerEvent,
};
use crate::store::InterviewStore;
use crate::transcription::TranscriptionService;

/// External services a session talks to, injected at construction.
#[derive(Clone)]
pub struct Collaborators {
    pub completion: Arc<dyn CompletionService>,
    /// Voice capture is refused when absent.
    pub transcription: Option<Arc<dyn TranscriptionService>>,
    pub speech: Arc<dyn SpeechPlayer>,
    pub store: Arc<dyn InterviewStore>,
}

/// What the interactive client should show next.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    QuestionReady {
        index: usize,
        question_type: QuestionType,
        text: String,
    },
    TimerTick {
        remaining_seconds: u32,
    },
    TranscriptUpdated {
        text: String,
        is_final: bool,
    },
    TranscriptionFailed {
        reason: String,
    },
    /// Terminal. The full report is available from `SessionController::report`.
    Finished {
        status: SessionStatus,
        overall_score: u32,
    },
}

pub struct SessionController {
    session: InterviewSession,
    settings: SessionSettings,
    generator: QuestionGenerator,
    evaluator: EvaluationPipeline,
    transcription: Option<Arc<dyn TranscriptionService>>,
    speech: Arc<dyn SpeechPlayer>,
    store: Arc<dyn InterviewStore>,

    tx: mpsc::UnboundedSender<TaskMessage>,
    rx: mpsc::UnboundedReceiver<TaskMessage>,
    timer_epoch: u64,
    capture_epoch: u64,
    timer: Option<TaskGuard>,
    capture: Option<TaskGuard>,
    playback: Option<TaskGuard>,
    muted: bool,

    started: Option<Instant>,
    progress: watch::Sender<EvaluationProgress>,
    report: Option<AggregateReport>,
}

impl SessionController {
    pub fn new(
        request: InterviewRequest,
        settings: SessionSettings,
        collaborators: Collaborators,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (progress, _) = watch::channel(EvaluationProgress::default());

        Self {
            session: InterviewSession::new(request),
            generator: QuestionGenerator::new(collaborators.completion.clone(), &settings),
            evaluator: EvaluationPipeline::new(collaborators.completion, &settings),
            settings,
            transcription: collaborators.transcription,
            speech: collaborators.speech,
            store: collaborators.store,
            tx,
            rx,
            timer_epoch: 0,
            capture_epoch: 0,
            timer: None,
            capture: None,
            playback: None,
            muted: false,
            started: None,
            progress,
            report: None,
        }
    }

    pub fn session(&self) -> &InterviewSession {
        &self.session
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status
    }

    /// Set once the session is Completed or Aborted.
    pub fn report(&self) -> Option<&AggregateReport> {
        self.report.as_ref()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<EvaluationProgress> {
        self.progress.subscribe()
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    // ──────────────────────────────────────────────
    // State machine operations
    // ──────────────────────────────────────────────

    /// Opens the session and produces question 0.
    pub async fn start(&mut self) -> Result<SessionUpdate, AppError> {
        let next = transition(self.session.status, SessionEvent::Start)?;
        self.started = Some(Instant::now());
        self.session.started_at = Some(Utc::now());
        self.session.status = next;

        info!(
            session_id = %self.session.id,
            job_role = %self.session.job_role,
            experience_level = %self.session.experience_level,
            "Interview started"
        );

        self.open_question(0).await
    }

    /// Freezes the active answer and moves to the next question, or to evaluation
    /// after the last one.
    pub async fn submit_answer(&mut self) -> Result<SessionUpdate, AppError> {
        self.advance(SessionEvent::Submit).await
    }

    /// Countdown reached zero: submits whatever answer exists.
    pub async fn timer_expire(&mut self) -> Result<SessionUpdate, AppError> {
        info!(
            session_id = %self.session.id,
            index = self.session.current_index,
            "Answer time expired"
        );
        self.advance(SessionEvent::TimerExpired).await
    }

    /// Ends the interview early. Only submitted answers are evaluated; the open
    /// question is discarded.
    pub async fn abort(&mut self) -> Result<SessionUpdate, AppError> {
        let next = transition(self.session.status, SessionEvent::Abort)?;
        self.stop_answer_tasks();
        self.stop_playback();

        let before = self.session.responses.len();
        self.session.responses.retain(QuestionResponse::is_submitted);
        self.session.status = next;

        info!(
            session_id = %self.session.id,
            answered = self.session.responses.len(),
            discarded = before - self.session.responses.len(),
            "Interview aborted"
        );

        self.finalize().await
    }

    async fn advance(&mut self, event: SessionEvent) -> Result<SessionUpdate, AppError> {
        let next = transition(self.session.status, event)?;
        self.stop_answer_tasks();

        if let Some(response) = self.session.active_response_mut() {
            response.submitted_at = Some(Utc::now());
        }
        self.session.status = next;

        match next {
            SessionStatus::Active { index } => self.open_question(index).await,
            _ => self.finalize().await,
        }
    }

    async fn open_question(&mut self, index: usize) -> Result<SessionUpdate, AppError> {
        let text = self.generator.generate(&self.session, index).await;
        let response = QuestionResponse::new(
            index,
            text.clone(),
            self.settings.answer_time_limit_secs,
        );
        let question_type = response.question_type;
        self.session.responses.push(response);
        self.session.current_index = index;

        self.timer_epoch += 1;
        self.timer = Some(spawn_timer(
            self.tx.clone(),
            self.timer_epoch,
            self.settings.answer_time_limit_secs,
        ));
        self.restart_playback();

        debug!(session_id = %self.session.id, index, %question_type, "Question active");
        Ok(SessionUpdate::QuestionReady {
            index,
            question_type,
            text,
        })
    }

    /// Evaluates, aggregates and records the session. Runs once, on entering
    /// `AwaitingEvaluation`.
    async fn finalize(&mut self) -> Result<SessionUpdate, AppError> {
        self.stop_playback();
        self.session.elapsed_seconds = self
            .started
            .map(|t| t.elapsed().as_secs())
            .unwrap_or_default();

        let evaluations = self
            .evaluator
            .evaluate_all(&self.session, &self.progress)
            .await;
        let report = aggregate(evaluations);

        let next = transition(self.session.status, SessionEvent::EvaluationFinished)?;
        self.session.status = next;

        info!(
            session_id = %self.session.id,
            status = next.label(),
            overall_score = report.overall_score,
            elapsed_seconds = self.session.elapsed_seconds,
            "Interview finished"
        );

        self.persist(&report).await;
        let overall_score = report.overall_score;
        self.report = Some(report);

        Ok(SessionUpdate::Finished {
            status: next,
            overall_score,
        })
    }

    /// Store failures are logged and swallowed; the computed report is still returned.
    async fn persist(&self, report: &AggregateReport) {
        let record = InterviewRecord::from_session(&self.session, report);
        if let Err(e) = self.store.append_record(&record).await {
            warn!(session_id = %self.session.id, error = %e, "Failed to store interview record");
        }
        if let Err(e) = self.store.consume_interview_credit(self.session.user_id).await {
            warn!(
                session_id = %self.session.id,
                user_id = %self.session.user_id,
                error = %e,
                "Failed to consume interview credit"
            );
        }
    }

    // ──────────────────────────────────────────────
    // Answer input
    // ──────────────────────────────────────────────

    pub fn set_answer(&mut self, text: impl Into<String>) -> Result<(), AppError> {
        self.open_response()?.answer = text.into();
        Ok(())
    }

    pub fn set_code(&mut self, code: impl Into<String>) -> Result<(), AppError> {
        self.open_response()?.code = Some(code.into());
        Ok(())
    }

    /// Starts transcribing `audio` for the active question. The final transcript
    /// replaces the typed answer when the sender side closes.
    pub fn start_voice_capture(&mut self, audio: mpsc::Receiver<Bytes>) -> Result<(), AppError> {
        self.open_response()?;
        let transcriber = self.transcription.clone().ok_or_else(|| {
            AppError::TranscriptionFailure("no transcription service configured".to_string())
        })?;

        self.stop_capture();
        self.capture = Some(spawn_capture(
            self.tx.clone(),
            self.capture_epoch,
            audio,
            transcriber,
            self.settings.transcript_interim_chunks,
        ));
        debug!(session_id = %self.session.id, epoch = self.capture_epoch, "Voice capture started");
        Ok(())
    }

    /// Stops voice capture; anything it was about to report is discarded.
    pub fn stop_voice_capture(&mut self) {
        self.stop_capture();
    }

    fn open_response(&mut self) -> Result<&mut QuestionResponse, AppError> {
        let label = self.session.status.label();
        self.session
            .active_response_mut()
            .ok_or_else(|| AppError::InvalidTransition(format!("no open question while {label}")))
    }

    // ──────────────────────────────────────────────
    // Playback
    // ──────────────────────────────────────────────

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        self.restart_playback();
    }

    pub fn repeat_question(&mut self) -> Result<(), AppError> {
        self.open_response()?;
        self.restart_playback();
        Ok(())
    }

    /// Cancels any utterance in flight and, unless muted, reads the active question.
    fn restart_playback(&mut self) {
        self.stop_playback();
        if self.muted {
            return;
        }
        if let Some(response) = self.session.active_response() {
            self.playback = Some(spawn_playback(
                self.speech.clone(),
                response.question.clone(),
            ));
        }
    }

    fn stop_playback(&mut self) {
        self.playback = None;
    }

    // ──────────────────────────────────────────────
    // Task messages
    // ──────────────────────────────────────────────

    /// Waits for the next message from a running timer or capture and applies it.
    /// Returns `None` once no task is running and nothing is queued.
    pub async fn next_update(&mut self) -> Option<SessionUpdate> {
        loop {
            let message = if self.timer.is_none() && self.capture.is_none() {
                self.rx.try_recv().ok()?
            } else {
                self.rx.recv().await?
            };
            if let Some(update) = self.apply(message).await {
                return Some(update);
            }
        }
    }

    async fn apply(&mut self, message: TaskMessage) -> Option<SessionUpdate> {
        match message {
            TaskMessage::Timer { epoch, .. } if epoch != self.timer_epoch => {
                debug!(epoch, current = self.timer_epoch, "Discarding stale timer message");
                None
            }
            TaskMessage::Timer {
                event: TimerEvent::Tick { remaining },
                ..
            } => Some(SessionUpdate::TimerTick {
                remaining_seconds: remaining,
            }),
            TaskMessage::Timer {
                event: TimerEvent::Expired,
                ..
            } => {
                self.timer = None;
                match self.timer_expire().await {
                    Ok(update) => Some(update),
                    Err(e) => {
                        warn!(error = %e, "Timer expiry ignored");
                        None
                    }
                }
            }
            TaskMessage::Capture { epoch, .. } if epoch != self.capture_epoch => {
                warn!(epoch, current = self.capture_epoch, "Discarding transcript from stopped capture");
                None
            }
            TaskMessage::Capture {
                event: CaptureEvent::Interim(text),
                ..
            } => Some(SessionUpdate::TranscriptUpdated {
                text,
                is_final: false,
            }),
            TaskMessage::Capture {
                event: CaptureEvent::Final(text),
                ..
            } => {
                self.capture = None;
                if let Some(response) = self.session.active_response_mut() {
                    response.answer = text.clone();
                }
                Some(SessionUpdate::TranscriptUpdated {
                    text,
                    is_final: true,
                })
            }
            TaskMessage::Capture {
                event: CaptureEvent::Failed(reason),
                ..
            } => {
                self.capture = None;
                warn!(session_id = %self.session.id, %reason, "Transcription failed, keeping typed answer");
                Some(SessionUpdate::TranscriptionFailed { reason })
            }
        }
    }

    /// Stops the countdown and voice capture for the current question. Messages they
    /// already queued become stale.
    fn stop_answer_tasks(&mut self) {
        self.timer = None;
        self.timer_epoch += 1;
        self.stop_capture();
    }

    fn stop_capture(&mut self) {
        self.capture = None;
        self.capture_epoch += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::{CompletionError, CompletionRequest};
    use crate::session::tasks::SilentPlayer;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use uuid::Uuid;

    /// Answers generation prompts with a fixed question and fails every evaluation.
    struct QuestionsOnly;

    #[async_trait]
    impl CompletionService for QuestionsOnly {
        async fn complete(
            &self,
            request: CompletionRequest<'_>,
        ) -> Result<String, CompletionError> {
            if request.prompt.contains("Generate one") {
                Ok("Describe a system you built.".to_string())
            } else {
                Err(CompletionError::RateLimited)
            }
        }
    }

    /// Counts utterances started and cancelled. An utterance never finishes on its own.
    #[derive(Default)]
    struct RecordingPlayer {
        spoken: Mutex<Vec<String>>,
        cancelled: Arc<AtomicUsize>,
    }

    impl RecordingPlayer {
        fn started(&self) -> usize {
            self.spoken.lock().unwrap().len()
        }

        fn cancelled(&self) -> usize {
            self.cancelled.load(Ordering::SeqCst)
        }
    }

    struct CountOnDrop(Arc<AtomicUsize>);

    impl Drop for CountOnDrop {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl SpeechPlayer for RecordingPlayer {
        async fn speak(&self, text: &str) -> Result<(), AppError> {
            self.spoken.lock().unwrap().push(text.to_string());
            let _cancel = CountOnDrop(self.cancelled.clone());
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    /// Transcribes audio as its UTF-8 text.
    struct EchoTranscriber;

    #[async_trait]
    impl TranscriptionService for EchoTranscriber {
        async fn transcribe(&self, audio: Bytes) -> Result<String, AppError> {
            Ok(String::from_utf8_lossy(&audio).into_owned())
        }
    }

    /// Lets spawned tasks run without advancing the clock.
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn make_controller(store: Arc<MemoryStore>) -> SessionController {
        make_controller_with(store, Arc::new(SilentPlayer), None)
    }

    fn make_controller_with(
        store: Arc<MemoryStore>,
        speech: Arc<dyn SpeechPlayer>,
        transcription: Option<Arc<dyn TranscriptionService>>,
    ) -> SessionController {
        SessionController::new(
            InterviewRequest {
                user_id: Uuid::new_v4(),
                job_role: "Backend Engineer".to_string(),
                experience_level: "mid".to_string(),
                job_description: "Rust services".to_string(),
                resume_text: None,
            },
            SessionSettings::default(),
            Collaborators {
                completion: Arc::new(QuestionsOnly),
                transcription,
                speech,
                store,
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_produces_first_question() {
        let mut controller = make_controller(Arc::new(MemoryStore::new()));
        let update = controller.start().await.unwrap();
        assert_eq!(
            update,
            SessionUpdate::QuestionReady {
                index: 0,
                question_type: QuestionType::Introduction,
                text: "Describe a system you built.".to_string(),
            }
        );
        assert_eq!(controller.status(), SessionStatus::Active { index: 0 });
        assert!(controller.start().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_answer_edits_rejected_before_start() {
        let mut controller = make_controller(Arc::new(MemoryStore::new()));
        assert!(matches!(
            controller.set_answer("hello"),
            Err(AppError::InvalidTransition(_))
        ));
        assert!(controller.submit_answer().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_freezes_answer_and_advances() {
        let mut controller = make_controller(Arc::new(MemoryStore::new()));
        controller.start().await.unwrap();
        controller.set_answer("I built a queue.").unwrap();
        let update = controller.submit_answer().await.unwrap();

        assert!(matches!(update, SessionUpdate::QuestionReady { index: 1, .. }));
        let first = &controller.session().responses[0];
        assert_eq!(first.answer, "I built a queue.");
        assert!(first.is_submitted());
        assert_eq!(first.question_type, QuestionType::Introduction);
        assert_eq!(controller.session().responses[1].question_type, QuestionType::Aptitude);
    }

    #[tokio::test(start_paused = true)]
    async fn test_voice_capture_refused_without_service() {
        let mut controller = make_controller(Arc::new(MemoryStore::new()));
        controller.start().await.unwrap();
        let (_audio_tx, audio_rx) = mpsc::channel(1);
        assert!(matches!(
            controller.start_voice_capture(audio_rx),
            Err(AppError::TranscriptionFailure(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_tick_surfaces_remaining_seconds() {
        let mut controller = make_controller(Arc::new(MemoryStore::new()));
        controller.start().await.unwrap();
        assert_eq!(
            controller.next_update().await,
            Some(SessionUpdate::TimerTick {
                remaining_seconds: 299
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_consumes_credit_and_records_history() {
        let store = Arc::new(MemoryStore::new());
        let mut controller = make_controller(store.clone());
        store.grant_credits(controller.session().user_id, 3).await;

        controller.start().await.unwrap();
        controller.set_answer("First answer").unwrap();
        controller.submit_answer().await.unwrap();
        controller.set_answer("Unsubmitted").unwrap();

        let update = controller.abort().await.unwrap();
        assert!(matches!(
            update,
            SessionUpdate::Finished {
                status: SessionStatus::Aborted,
                ..
            }
        ));
        assert_eq!(controller.session().responses.len(), 1);
        assert_eq!(controller.report().unwrap().per_question.len(), 1);

        let records = store.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, "aborted");
        assert_eq!(records[0].entries[0].answer, "First answer");
        assert_eq!(
            store.remaining_credits(controller.session().user_id).await,
            Some(2)
        );
        assert!(controller.abort().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistence_failure_does_not_block_report() {
        // No credits granted: consuming one fails, the session still finishes.
        let store = Arc::new(MemoryStore::new());
        let mut controller = make_controller(store.clone());
        controller.start().await.unwrap();
        controller.submit_answer().await.unwrap();
        controller.abort().await.unwrap();

        assert_eq!(controller.status(), SessionStatus::Aborted);
        assert!(controller.report().is_some());
        assert_eq!(store.records().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_question_cancels_previous_playback() {
        let player = Arc::new(RecordingPlayer::default());
        let mut controller =
            make_controller_with(Arc::new(MemoryStore::new()), player.clone(), None);

        controller.start().await.unwrap();
        settle().await;
        assert_eq!(player.started(), 1);
        assert_eq!(player.cancelled(), 0);

        controller.submit_answer().await.unwrap();
        settle().await;
        assert_eq!(player.started(), 2);
        assert_eq!(player.cancelled(), 1);

        controller.abort().await.unwrap();
        settle().await;
        assert_eq!(player.started(), 2);
        assert_eq!(player.cancelled(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mute_silences_and_repeat_replays_question() {
        let player = Arc::new(RecordingPlayer::default());
        let mut controller =
            make_controller_with(Arc::new(MemoryStore::new()), player.clone(), None);
        controller.start().await.unwrap();
        settle().await;

        controller.set_muted(true);
        settle().await;
        assert!(controller.is_muted());
        assert_eq!(player.cancelled(), 1);

        // Muted: repeating is accepted but nothing is read.
        controller.repeat_question().unwrap();
        settle().await;
        assert_eq!(player.started(), 1);

        controller.set_muted(false);
        settle().await;
        assert_eq!(player.started(), 2);

        controller.repeat_question().unwrap();
        settle().await;
        assert_eq!(player.started(), 3);
        assert_eq!(player.cancelled(), 2);
        assert!(player
            .spoken
            .lock()
            .unwrap()
            .iter()
            .all(|q| q == "Describe a system you built."));
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeat_rejected_before_start() {
        let mut controller = make_controller(Arc::new(MemoryStore::new()));
        assert!(matches!(
            controller.repeat_question(),
            Err(AppError::InvalidTransition(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_capture_keeps_typed_answer() {
        let mut controller = make_controller_with(
            Arc::new(MemoryStore::new()),
            Arc::new(SilentPlayer),
            Some(Arc::new(EchoTranscriber)),
        );
        controller.start().await.unwrap();
        controller.set_answer("typed").unwrap();

        let (audio_tx, audio_rx) = mpsc::channel(4);
        controller.start_voice_capture(audio_rx).unwrap();
        audio_tx.send(Bytes::from_static(b"spoken")).await.unwrap();
        drop(audio_tx);
        settle().await;

        controller.stop_voice_capture();
        assert_eq!(
            controller.next_update().await,
            Some(SessionUpdate::TimerTick {
                remaining_seconds: 299
            })
        );
        assert_eq!(controller.session().responses[0].answer, "typed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_during_capture_drops_transcript() {
        let store = Arc::new(MemoryStore::new());
        let mut controller = make_controller_with(
            store.clone(),
            Arc::new(SilentPlayer),
            Some(Arc::new(EchoTranscriber)),
        );
        controller.start().await.unwrap();
        controller.set_answer("First answer").unwrap();
        controller.submit_answer().await.unwrap();

        // One capture has its final transcript queued, the next is still listening.
        let (done_tx, done_rx) = mpsc::channel(4);
        controller.start_voice_capture(done_rx).unwrap();
        done_tx.send(Bytes::from_static(b"finished words")).await.unwrap();
        drop(done_tx);
        settle().await;
        let (live_tx, live_rx) = mpsc::channel(4);
        controller.start_voice_capture(live_rx).unwrap();
        live_tx.send(Bytes::from_static(b"still talking")).await.unwrap();

        controller.abort().await.unwrap();
        settle().await;

        assert!(live_tx.send(Bytes::from_static(b"more")).await.is_err());
        assert_eq!(controller.next_update().await, None);
        let responses = &controller.session().responses;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].answer, "First answer");
        assert_eq!(store.records().await[0].entries[0].answer, "First answer");
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_seconds_measured_from_start() {
        let mut controller = make_controller(Arc::new(MemoryStore::new()));
        controller.start().await.unwrap();
        tokio::time::advance(Duration::from_secs(42)).await;
        controller.abort().await.unwrap();
        assert_eq!(controller.session().elapsed_seconds, 42);
    }
}
