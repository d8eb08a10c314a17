//! Interview history and credit bookkeeping.
//!
//! Expected tables:
//!   interview_records(id UUID PK, user_id UUID, job_role TEXT, experience_level TEXT,
//!                     status TEXT, overall_score SMALLINT, entries JSONB, recorded_at TIMESTAMPTZ)
//!   users(id UUID PK, interviews_remaining INTEGER)

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::InterviewRecord;

#[async_trait]
pub trait InterviewStore: Send + Sync {
    /// Appends one finished interview. Records are never updated.
    async fn append_record(&self, record: &InterviewRecord) -> Result<(), AppError>;

    /// Deducts one interview from the user's allowance. Never goes below zero.
    async fn consume_interview_credit(&self, user_id: Uuid) -> Result<(), AppError>;
}

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

#[derive(Clone)]
pub struct PgInterviewStore {
    pool: PgPool,
}

impl PgInterviewStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn persistence(e: sqlx::Error) -> AppError {
    AppError::PersistenceFailure(e.to_string())
}

#[async_trait]
impl InterviewStore for PgInterviewStore {
    async fn append_record(&self, record: &InterviewRecord) -> Result<(), AppError> {
        let entries = serde_json::to_value(&record.entries)
            .map_err(|e| AppError::PersistenceFailure(format!("serialize entries: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO interview_records
                (id, user_id, job_role, experience_level, status, overall_score, entries, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(record.session_id)
        .bind(record.user_id)
        .bind(&record.job_role)
        .bind(&record.experience_level)
        .bind(&record.status)
        .bind(record.overall_score as i16)
        .bind(&entries)
        .bind(record.recorded_at)
        .execute(&self.pool)
        .await
        .map_err(persistence)?;

        info!(
            session_id = %record.session_id,
            entries = record.entries.len(),
            "Interview record stored"
        );
        Ok(())
    }

    async fn consume_interview_credit(&self, user_id: Uuid) -> Result<(), AppError> {
        let updated = sqlx::query(
            "UPDATE users SET interviews_remaining = GREATEST(interviews_remaining - 1, 0) WHERE id = $1",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(persistence)?;

        if updated.rows_affected() == 0 {
            return Err(AppError::PersistenceFailure(format!(
                "no credit row for user {user_id}"
            )));
        }
        Ok(())
    }
}

/// In-process store for clients without a database, and for tests.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<InterviewRecord>>,
    credits: Mutex<HashMap<Uuid, u32>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn grant_credits(&self, user_id: Uuid, credits: u32) {
        self.credits.lock().await.insert(user_id, credits);
    }

    pub async fn remaining_credits(&self, user_id: Uuid) -> Option<u32> {
        self.credits.lock().await.get(&user_id).copied()
    }

    pub async fn records(&self) -> Vec<InterviewRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl InterviewStore for MemoryStore {
    async fn append_record(&self, record: &InterviewRecord) -> Result<(), AppError> {
        self.records.lock().await.push(record.clone());
        Ok(())
    }

    async fn consume_interview_credit(&self, user_id: Uuid) -> Result<(), AppError> {
        let mut credits = self.credits.lock().await;
        match credits.get_mut(&user_id) {
            Some(remaining) => {
                *remaining = remaining.saturating_sub(1);
                Ok(())
            }
            None => Err(AppError::PersistenceFailure(format!(
                "no credit row for user {user_id}"
            ))),
        }
    }
}
