use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::config::Config;
use crate::llm_client::{self, CompletionService, LlmClient};
use crate::models::InterviewRequest;
use crate::session::{Collaborators, SessionController, SilentPlayer, SpeechPlayer};
use crate::store::{create_pool, InterviewStore, MemoryStore, PgInterviewStore};
use crate::transcription::{TranscriptionService, WhisperClient};

/// Long-lived services shared by every session the embedding client starts.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub completion: Arc<dyn CompletionService>,
    /// `None` when `OPENAI_API_KEY` is unset; sessions then accept typed answers only.
    pub transcription: Option<Arc<dyn TranscriptionService>>,
    pub speech: Arc<dyn SpeechPlayer>,
    pub store: Arc<dyn InterviewStore>,
}

impl AppState {
    /// Builds production adapters from configuration. Connects to PostgreSQL when
    /// `DATABASE_URL` is set, otherwise keeps records in memory.
    pub async fn from_config(config: Config) -> Result<Self> {
        let completion: Arc<dyn CompletionService> =
            Arc::new(LlmClient::new(config.anthropic_api_key.clone()));
        info!(
            "Completion client initialized (model: {})",
            config
                .session
                .completion_model
                .as_deref()
                .unwrap_or(llm_client::MODEL)
        );

        let transcription = config.openai_api_key.clone().map(|key| {
            info!("Transcription client initialized");
            Arc::new(WhisperClient::new(key)) as Arc<dyn TranscriptionService>
        });

        let store: Arc<dyn InterviewStore> = match &config.database_url {
            Some(url) => Arc::new(PgInterviewStore::new(create_pool(url).await?)),
            None => {
                info!("DATABASE_URL not set, interview records kept in memory");
                Arc::new(MemoryStore::new())
            }
        };

        Ok(Self {
            config,
            completion,
            transcription,
            speech: Arc::new(SilentPlayer),
            store,
        })
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            completion: self.completion.clone(),
            transcription: self.transcription.clone(),
            speech: self.speech.clone(),
            store: self.store.clone(),
        }
    }

    /// A fresh, idle session for `request`.
    pub fn new_session(&self, request: InterviewRequest) -> SessionController {
        SessionController::new(
            request,
            self.config.session.clone(),
            self.collaborators(),
        )
    }
}
