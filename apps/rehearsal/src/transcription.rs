//! Speech-to-text for spoken answers.
//!
//! Transcription failures are recoverable by contract: the candidate keeps the
//! typed-answer path, so every error here maps to `AppError::TranscriptionFailure`.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{multipart, Client};
use serde::Deserialize;
use tracing::debug;

use crate::errors::AppError;

const OPENAI_TRANSCRIPTION_URL: &str = "https://api.openai.com/v1/audio/transcriptions";
const TRANSCRIPTION_MODEL: &str = "whisper-1";

#[async_trait]
pub trait TranscriptionService: Send + Sync {
    /// Transcribes a complete captured audio buffer.
    async fn transcribe(&self, audio: Bytes) -> Result<String, AppError>;
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// OpenAI Whisper adapter. Uploads WAV audio as multipart form data.
#[derive(Clone)]
pub struct WhisperClient {
    client: Client,
    api_key: String,
}

impl WhisperClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }
}

#[async_trait]
impl TranscriptionService for WhisperClient {
    async fn transcribe(&self, audio: Bytes) -> Result<String, AppError> {
        if audio.is_empty() {
            return Err(AppError::TranscriptionFailure(
                "no audio captured".to_string(),
            ));
        }

        let file = multipart::Part::bytes(audio.to_vec())
            .file_name("answer.wav")
            .mime_str("audio/wav")
            .map_err(|e| AppError::TranscriptionFailure(e.to_string()))?;
        let form = multipart::Form::new()
            .text("model", TRANSCRIPTION_MODEL)
            .part("file", file);

        let response = self
            .client
            .post(OPENAI_TRANSCRIPTION_URL)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::TranscriptionFailure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::TranscriptionFailure(format!(
                "status {}: {}",
                status.as_u16(),
                body
            )));
        }

        let parsed: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| AppError::TranscriptionFailure(e.to_string()))?;

        debug!(chars = parsed.text.len(), "Transcription succeeded");
        Ok(parsed.text.trim().to_string())
    }
}
