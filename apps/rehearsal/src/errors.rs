use thiserror::Error;

/// Crate-wide error taxonomy.
///
/// Generation and evaluation failures never reach the session controller's caller:
/// they are logged and replaced by placeholders or fallback evaluations. The variants
/// exist so those paths can carry a typed reason up to the point where the fallback
/// is applied.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Question generation failed: {0}")]
    GenerationFailure(String),

    #[error("Rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("Evaluation parse failure: {0}")]
    ParseFailure(String),

    #[error("Transcription failed: {0}")]
    TranscriptionFailure(String),

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("Invalid session transition: {0}")]
    InvalidTransition(String),

    #[error("Render failed: {0}")]
    Render(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// True for failures the session is expected to absorb without surfacing to the user.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::GenerationFailure(_)
                | AppError::RateLimited { .. }
                | AppError::ParseFailure(_)
                | AppError::TranscriptionFailure(_)
                | AppError::PersistenceFailure(_)
        )
    }
}
