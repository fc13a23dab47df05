use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::analysis::Analysis;
use crate::types::JobStatus;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_name: String,
    pub company_inn: String,
    pub status: JobStatus,
    pub result_id: Option<Uuid>,
    pub error: Option<String>,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub user_id: Uuid,
    pub company_name: String,
    pub company_inn: String,
}

/// Status payload returned by GET /api/job/:id
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
    pub id: Uuid,
    pub status: JobStatus,
    pub result_id: Option<Uuid>,
    pub error: Option<String>,
}

impl From<&Job> for JobView {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            status: job.status,
            result_id: job.result_id,
            error: job.error.clone(),
        }
    }
}

/// Outcome of recording a successful production run
#[derive(Debug, Clone)]
pub enum JobCompletion {
    /// Quota debited, analysis stored, job completed
    Completed(Analysis),
    /// Owner had no analyses left; job marked failed, nothing stored
    QuotaExhausted,
    /// Job was no longer processing (recovered or failed elsewhere); nothing written
    NotProcessing,
}

/// Result of one stale-job recovery sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveredJobs {
    pub requeued: u64,
    pub failed: u64,
}
