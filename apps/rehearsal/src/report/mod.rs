// Report export: assembly of sanitized content plus plain-text and PDF renderers.

pub mod assembler;
pub mod font_metrics;
pub mod pdf;
pub mod sanitize;
pub mod text;

use std::path::{Path, PathBuf};

use bytes::Bytes;
use chrono::NaiveDate;
use tracing::info;

use crate::errors::AppError;

pub use assembler::{assemble, CategoryBar, QuestionBlock, ReportDocument};
pub use pdf::PdfRenderer;
pub use sanitize::sanitize_text;
pub use text::PlainTextRenderer;

/// Turns an assembled document into a downloadable artifact.
pub trait ReportRenderer: Send + Sync {
    fn extension(&self) -> &'static str;
    fn mime_type(&self) -> &'static str;
    fn render_bytes(&self, document: &ReportDocument) -> Result<Vec<u8>, AppError>;

    fn render(&self, document: &ReportDocument) -> Result<RenderedReport, AppError> {
        let bytes = self.render_bytes(document)?;
        Ok(RenderedReport {
            file_name: report_file_name(document.date, self.extension()),
            mime_type: self.mime_type(),
            bytes: Bytes::from(bytes),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedReport {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Bytes,
}

impl RenderedReport {
    /// Writes the artifact into `dir` under its dated file name.
    pub async fn write_to(&self, dir: &Path) -> Result<PathBuf, AppError> {
        let path = dir.join(&self.file_name);
        tokio::fs::write(&path, &self.bytes)
            .await
            .map_err(|e| AppError::Render(format!("write {}: {e}", path.display())))?;
        info!(path = %path.display(), bytes = self.bytes.len(), "Report written");
        Ok(path)
    }
}

pub fn report_file_name(date: NaiveDate, extension: &str) -> String {
    format!("interview-report-{}.{extension}", date.format("%Y-%m-%d"))
}
