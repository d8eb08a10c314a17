//! Background activities of an active question: countdown, voice capture, playback.
//!
//! Each runs as its own tokio task owning a `CancellationToken`. Timer and capture
//! report back over the controller's channel, tagged with the epoch they were started
//! under; the controller drops anything whose epoch is no longer current.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::transcription::TranscriptionService;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TimerEvent {
    Tick { remaining: u32 },
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CaptureEvent {
    Interim(String),
    Final(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TaskMessage {
    Timer { epoch: u64, event: TimerEvent },
    Capture { epoch: u64, event: CaptureEvent },
}

/// Cancels its task when stopped or dropped.
pub(crate) struct TaskGuard {
    cancel: CancellationToken,
}

impl TaskGuard {
    fn new() -> (Self, CancellationToken) {
        let cancel = CancellationToken::new();
        (
            Self {
                cancel: cancel.clone(),
            },
            cancel,
        )
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Counts down once per second from `limit_secs`, reporting each tick, then expiry.
pub(crate) fn spawn_timer(
    tx: mpsc::UnboundedSender<TaskMessage>,
    epoch: u64,
    limit_secs: u32,
) -> TaskGuard {
    let (guard, cancel) = TaskGuard::new();

    tokio::spawn(async move {
        let mut remaining = limit_secs;
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        interval.tick().await; // first tick completes immediately

        while remaining > 0 {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                _ = interval.tick() => {
                    remaining -= 1;
                    if remaining > 0 {
                        let event = TimerEvent::Tick { remaining };
                        if tx.send(TaskMessage::Timer { epoch, event }).is_err() {
                            return;
                        }
                    }
                }
            }
        }

        let _ = tx.send(TaskMessage::Timer {
            epoch,
            event: TimerEvent::Expired,
        });
    });

    guard
}

/// Buffers audio chunks until the stream closes, then transcribes the whole answer.
/// Every `interim_every` chunks the buffer so far is transcribed as an interim update;
/// `interim_every == 0` disables interim updates.
pub(crate) fn spawn_capture(
    tx: mpsc::UnboundedSender<TaskMessage>,
    epoch: u64,
    mut audio: mpsc::Receiver<Bytes>,
    transcriber: Arc<dyn TranscriptionService>,
    interim_every: usize,
) -> TaskGuard {
    let (guard, cancel) = TaskGuard::new();

    tokio::spawn(async move {
        let mut buffer = BytesMut::new();
        let mut chunks = 0usize;

        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                chunk = audio.recv() => chunk,
            };
            let Some(chunk) = chunk else { break };

            buffer.extend_from_slice(&chunk);
            chunks += 1;
            if interim_every == 0 || chunks % interim_every != 0 {
                continue;
            }

            let interim = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                result = transcriber.transcribe(buffer.clone().freeze()) => result,
            };
            match interim {
                Ok(text) => {
                    let event = CaptureEvent::Interim(text);
                    if tx.send(TaskMessage::Capture { epoch, event }).is_err() {
                        return;
                    }
                }
                Err(e) => debug!(epoch, error = %e, "Interim transcription failed"),
            }
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            result = transcriber.transcribe(buffer.freeze()) => result,
        };
        let event = match result {
            Ok(text) => CaptureEvent::Final(text),
            Err(e) => CaptureEvent::Failed(e.to_string()),
        };
        let _ = tx.send(TaskMessage::Capture { epoch, event });
    });

    guard
}

/// Reads question text aloud.
#[async_trait]
pub trait SpeechPlayer: Send + Sync {
    /// Resolves when the utterance finishes. Dropping the future stops playback.
    async fn speak(&self, text: &str) -> Result<(), AppError>;
}

/// Playback for headless clients; finishes immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentPlayer;

#[async_trait]
impl SpeechPlayer for SilentPlayer {
    async fn speak(&self, _text: &str) -> Result<(), AppError> {
        Ok(())
    }
}

/// Starts one utterance. Never reports back; the controller only ever cancels it.
pub(crate) fn spawn_playback(player: Arc<dyn SpeechPlayer>, text: String) -> TaskGuard {
    let (guard, cancel) = TaskGuard::new();

    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => debug!("Question playback cancelled"),
            result = player.speak(&text) => {
                if let Err(e) = result {
                    warn!(error = %e, "Question playback failed");
                }
            }
        }
    });

    guard
}
