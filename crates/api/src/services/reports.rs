//! Generated .docx documents, kept in memory until downloaded or expired.

use std::collections::HashMap;
use std::time::Duration;

use beacon_core::error::CoreError;
use beacon_core::report_doc::{document_blocks, render_docx, report_filename};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

/// How long a generated document stays downloadable.
pub const REPORT_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
pub struct StoredReport {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedReport {
    pub success: bool,
    pub report_id: Uuid,
    pub filename: String,
    pub download_url: String,
    pub size_bytes: usize,
}

pub struct ReportRegistry {
    reports: RwLock<HashMap<Uuid, StoredReport>>,
    ttl: chrono::Duration,
}

impl Default for ReportRegistry {
    fn default() -> Self {
        Self::with_ttl(REPORT_TTL)
    }
}

impl ReportRegistry {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            reports: RwLock::new(HashMap::new()),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
        }
    }

    fn is_expired(&self, report: &StoredReport, now: DateTime<Utc>) -> bool {
        now - report.created_at > self.ttl
    }

    /// Drop every expired entry.
    pub async fn sweep(&self) -> usize {
        let now = Utc::now();
        let mut reports = self.reports.write().await;
        let before = reports.len();
        reports.retain(|_, report| !self.is_expired(report, now));
        let removed = before - reports.len();
        if removed > 0 {
            tracing::debug!(removed, "Swept expired reports");
        }
        removed
    }

    /// Render `content` to a document and register it for download.
    pub async fn generate(
        &self,
        title: &str,
        kind: &str,
        subject: &str,
        content: &Value,
    ) -> Result<GeneratedReport, CoreError> {
        self.sweep().await;

        let created_at = Utc::now();
        let bytes = render_docx(&document_blocks(title, created_at, content))?;
        let filename = report_filename(kind, subject, created_at);
        let report_id = Uuid::new_v4();
        let size_bytes = bytes.len();

        self.reports.write().await.insert(
            report_id,
            StoredReport {
                filename: filename.clone(),
                bytes,
                created_at,
            },
        );
        tracing::info!(%report_id, %filename, size_bytes, "Report generated");

        Ok(GeneratedReport {
            success: true,
            report_id,
            filename,
            download_url: format!("/api/reports/{report_id}"),
            size_bytes,
        })
    }

    /// A registered document; unknown and expired ids are not found.
    pub async fn download(&self, report_id: Uuid) -> Result<StoredReport, CoreError> {
        self.sweep().await;
        self.reports
            .read()
            .await
            .get(&report_id)
            .cloned()
            .ok_or(CoreError::NotFound {
                entity: "Report",
                id: report_id.to_string(),
            })
    }
}
