//! Interview rehearsal core.
//!
//! A `SessionController` runs one mock interview: ten questions on a fixed type
//! schedule, timed answers (typed or spoken), AI evaluation with deterministic
//! fallback, and a weighted report exportable as plain text or PDF.

pub mod config;
pub mod errors;
pub mod interview;
pub mod llm_client;
pub mod models;
pub mod report;
pub mod session;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod transcription;

pub use config::{Config, SessionSettings};
pub use errors::AppError;
pub use session::{Collaborators, SessionController, SessionUpdate};
pub use state::AppState;
