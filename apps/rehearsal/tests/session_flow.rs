//! End-to-end interview sessions against fake collaborators.
//!
//! All tests run on paused tokio time so retry delays and the answer countdown
//! elapse instantly.

mod common;

use std::time::Duration;

use bytes::Bytes;
use chrono::NaiveDate;
use tokio::sync::mpsc;

use rehearsal::interview::evaluator::FALLBACK_SCORE_BAND;
use rehearsal::interview::EvaluationProgress;
use rehearsal::models::{QuestionType, SessionStatus, QUESTION_COUNT};
use rehearsal::report::{assemble, PdfRenderer, PlainTextRenderer, ReportRenderer};
use rehearsal::SessionUpdate;

use common::{evaluation_json, harness, EvaluationScript};

/// Documented overall band when every evaluation is a fallback.
const FALLBACK_OVERALL_BAND: std::ops::RangeInclusive<u32> = 47..=64;

#[tokio::test(start_paused = true)]
async fn full_session_with_failing_evaluator_uses_fallbacks() {
    let mut h = harness(EvaluationScript::AlwaysRateLimited, false).await;
    let c = &mut h.controller;

    c.start().await.unwrap();
    for i in 0..QUESTION_COUNT {
        c.set_answer(format!("Answer to question {}", i + 1)).unwrap();
        if QuestionType::for_index(i) == QuestionType::Coding {
            c.set_code("fn solve() -> u32 { 42 }").unwrap();
        }
        let update = c.submit_answer().await.unwrap();
        if i + 1 < QUESTION_COUNT {
            assert!(matches!(update, SessionUpdate::QuestionReady { index, .. } if index == i + 1));
        } else {
            assert!(matches!(
                update,
                SessionUpdate::Finished { status: SessionStatus::Completed, .. }
            ));
        }
    }

    let session = c.session();
    assert_eq!(session.responses.len(), QUESTION_COUNT);
    for (i, response) in session.responses.iter().enumerate() {
        assert_eq!(response.question_type, QuestionType::for_index(i));
        assert!(response.is_submitted());
    }

    let report = c.report().unwrap();
    assert_eq!(report.per_question.len(), QUESTION_COUNT);
    assert!(report.per_question.iter().all(|e| e.is_fallback()));
    for evaluation in &report.per_question {
        assert!(FALLBACK_SCORE_BAND.contains(&evaluation.scores.technical));
    }
    assert!(FALLBACK_OVERALL_BAND.contains(&report.overall_score));
    assert!(!report.top_strengths.is_empty());
    assert!(!report.top_improvements.is_empty());
    assert!(report.top_strengths.len() <= 5 && report.top_improvements.len() <= 5);
    // Three attempts per answer before falling back.
    assert_eq!(h.completion.evaluation_calls(), 3 * QUESTION_COUNT);

    let records = h.store.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].entries.len(), QUESTION_COUNT);
    assert_eq!(records[0].job_role, "Backend Engineer");
    assert_eq!(records[0].status, "completed");
    assert_eq!(h.store.remaining_credits(session.user_id).await, Some(4));
}

#[tokio::test(start_paused = true)]
async fn abort_after_four_answers_evaluates_only_those() {
    let mut h = harness(EvaluationScript::Respond(evaluation_json(80, 72, 60)), false).await;
    let c = &mut h.controller;

    c.start().await.unwrap();
    for i in 0..4 {
        c.set_answer(format!("Answer {i}")).unwrap();
        c.submit_answer().await.unwrap();
    }
    c.set_answer("Half-finished thought").unwrap();

    let update = c.abort().await.unwrap();
    assert!(matches!(
        update,
        SessionUpdate::Finished { status: SessionStatus::Aborted, .. }
    ));

    let report = c.report().unwrap();
    assert_eq!(report.per_question.len(), 4);
    assert!(report.per_question.iter().all(|e| !e.is_fallback()));
    assert_eq!(report.category_scores.code_quality, None);
    // 0.35*80 + 0.25*72 + 0.25*60, code quality contributes nothing.
    assert_eq!(report.overall_score, 61);
    assert_eq!(h.completion.evaluation_calls(), 4);

    assert_eq!(c.session().responses.len(), 4);
    assert_eq!(
        h.store.remaining_credits(c.session().user_id).await,
        Some(4)
    );
    assert!(c.submit_answer().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn timer_expiry_submits_current_answer() {
    let mut h = harness(EvaluationScript::AlwaysRateLimited, false).await;
    let c = &mut h.controller;

    c.start().await.unwrap();
    c.set_answer("Partial answer").unwrap();

    let mut ticks = 0;
    let next_question = loop {
        match c.next_update().await.unwrap() {
            SessionUpdate::TimerTick { .. } => ticks += 1,
            other => break other,
        }
    };

    assert_eq!(ticks, 299);
    assert!(matches!(next_question, SessionUpdate::QuestionReady { index: 1, .. }));
    let first = &c.session().responses[0];
    assert_eq!(first.answer, "Partial answer");
    assert!(first.is_submitted());
    assert_eq!(c.status(), SessionStatus::Active { index: 1 });
}

#[tokio::test(start_paused = true)]
async fn final_transcript_replaces_typed_answer() {
    let mut h = harness(EvaluationScript::AlwaysRateLimited, true).await;
    let c = &mut h.controller;

    c.start().await.unwrap();
    c.set_answer("typed").unwrap();

    let (audio_tx, audio_rx) = mpsc::channel(4);
    c.start_voice_capture(audio_rx).unwrap();
    audio_tx.send(Bytes::from_static(b"I would shard by tenant")).await.unwrap();
    drop(audio_tx);

    let update = loop {
        match c.next_update().await.unwrap() {
            SessionUpdate::TimerTick { .. } => continue,
            other => break other,
        }
    };
    assert_eq!(
        update,
        SessionUpdate::TranscriptUpdated {
            text: "I would shard by tenant".to_string(),
            is_final: true,
        }
    );
    assert_eq!(c.session().responses[0].answer, "I would shard by tenant");
}

#[tokio::test(start_paused = true)]
async fn transcript_arriving_after_submit_is_discarded() {
    let mut h = harness(EvaluationScript::AlwaysRateLimited, true).await;
    let c = &mut h.controller;

    c.start().await.unwrap();
    c.set_answer("typed answer").unwrap();

    let (audio_tx, audio_rx) = mpsc::channel(4);
    c.start_voice_capture(audio_rx).unwrap();
    audio_tx.send(Bytes::from_static(b"late words")).await.unwrap();
    drop(audio_tx);
    // Let the capture task queue its final transcript without applying it.
    tokio::time::sleep(Duration::from_millis(10)).await;

    c.submit_answer().await.unwrap();

    // The queued transcript is stale; the first update is the new question's countdown.
    assert_eq!(
        c.next_update().await,
        Some(SessionUpdate::TimerTick {
            remaining_seconds: 299
        })
    );
    assert_eq!(c.session().responses[0].answer, "typed answer");
    assert_eq!(c.session().responses[1].answer, "");
}

#[tokio::test(start_paused = true)]
async fn evaluation_progress_is_monotonic() {
    let mut h = harness(EvaluationScript::AlwaysRateLimited, false).await;
    let c = &mut h.controller;
    let mut progress = c.subscribe_progress();

    let observer = tokio::spawn(async move {
        let mut seen = Vec::new();
        while progress.changed().await.is_ok() {
            let value = *progress.borrow_and_update();
            seen.push(value);
            if value.total > 0 && value.completed == value.total {
                break;
            }
        }
        seen
    });

    c.start().await.unwrap();
    for _ in 0..3 {
        c.submit_answer().await.unwrap();
    }
    c.abort().await.unwrap();

    let seen = observer.await.unwrap();
    assert!(seen.windows(2).all(|w| w[0].completed <= w[1].completed));
    assert_eq!(
        seen.last().copied(),
        Some(EvaluationProgress {
            completed: 3,
            total: 3
        })
    );
}

#[tokio::test(start_paused = true)]
async fn finished_session_exports_text_and_pdf() {
    let mut h = harness(EvaluationScript::Respond(evaluation_json(60, 60, 60)), false).await;
    let c = &mut h.controller;

    c.start().await.unwrap();
    c.set_answer("I enjoy  building\nreliable systems.").unwrap();
    c.submit_answer().await.unwrap();
    c.abort().await.unwrap();

    let date = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
    let document = assemble(c.session(), c.report().unwrap(), date);
    let dir = tempfile::tempdir().unwrap();

    let text = PlainTextRenderer.render(&document).unwrap();
    let text_path = text.write_to(dir.path()).await.unwrap();
    let written = std::fs::read_to_string(&text_path).unwrap();
    assert!(text_path.ends_with("interview-report-2026-10-17.txt"));
    assert!(written.contains("Your Answer:\nI enjoy building reliable systems.\n"));
    assert!(written.contains("Overall Score: 51/100"));

    let pdf = PdfRenderer.render(&document).unwrap();
    let pdf_path = pdf.write_to(dir.path()).await.unwrap();
    assert!(pdf_path.ends_with("interview-report-2026-10-17.pdf"));
    assert!(std::fs::read(&pdf_path).unwrap().starts_with(b"%PDF-1.4"));
    assert_eq!(pdf.mime_type, "application/pdf");
}
