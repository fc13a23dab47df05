//! Job lifecycle: a claimed (processing) job is run through the producer
//! and always leaves with a terminal status unless the process dies.

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::database::models::{Job, JobCompletion, NewAnalysis};
use crate::database::Store;
use crate::services::producer::{AnalysisProducer, CompanyRequest};

pub const GENERATION_FAILED_MESSAGE: &str = "Analysis generation failed";
pub const GENERATION_TIMED_OUT_MESSAGE: &str = "Analysis generation timed out";
pub const PERSISTENCE_FAILED_MESSAGE: &str = "Failed to save analysis";

/// Terminal result of processing one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Failed(String),
    /// The job stopped being ours (recovered as stale) before we could record a result
    Abandoned,
}

pub struct JobProcessor {
    store: Arc<dyn Store>,
    producer: Arc<dyn AnalysisProducer>,
    timeout: Duration,
}

impl JobProcessor {
    pub fn new(store: Arc<dyn Store>, producer: Arc<dyn AnalysisProducer>, timeout: Duration) -> Self {
        Self { store, producer, timeout }
    }

    /// Produce and persist the report for a job already claimed into processing
    pub async fn process(&self, job: Job) -> JobOutcome {
        let company = CompanyRequest {
            company_name: job.company_name.clone(),
            company_inn: job.company_inn.clone(),
        };

        let produced = match tokio::time::timeout(self.timeout, self.producer.produce(&company)).await {
            Ok(Ok(report)) => report,
            Ok(Err(e)) => {
                error!(job_id = %job.id, "Producer failed: {}", e);
                return self.fail(&job, GENERATION_FAILED_MESSAGE).await;
            }
            Err(_) => {
                error!(job_id = %job.id, timeout = ?self.timeout, "Producer timed out");
                return self.fail(&job, GENERATION_TIMED_OUT_MESSAGE).await;
            }
        };

        let analysis = NewAnalysis {
            user_id: job.user_id,
            company_name: job.company_name.clone(),
            company_inn: job.company_inn.clone(),
            report_text: produced.report_text,
            target_proposal: produced.target_proposal,
        };

        match self.store.complete_job(job.id, job.attempts, analysis).await {
            Ok(JobCompletion::Completed(analysis)) => {
                info!(job_id = %job.id, analysis_id = %analysis.id, "Job completed");
                JobOutcome::Completed
            }
            Ok(JobCompletion::QuotaExhausted) => {
                warn!(job_id = %job.id, user_id = %job.user_id, "Job failed: quota exhausted");
                JobOutcome::Failed(crate::database::store::QUOTA_EXHAUSTED_MESSAGE.to_string())
            }
            Ok(JobCompletion::NotProcessing) => {
                warn!(job_id = %job.id, "Job left processing before completion; result discarded");
                JobOutcome::Abandoned
            }
            Err(e) => {
                error!(job_id = %job.id, "Failed to persist analysis: {}", e);
                self.fail(&job, PERSISTENCE_FAILED_MESSAGE).await
            }
        }
    }

    async fn fail(&self, job: &Job, message: &str) -> JobOutcome {
        match self.store.fail_job(job.id, job.attempts, message).await {
            Ok(true) => JobOutcome::Failed(message.to_string()),
            Ok(false) => {
                warn!(job_id = %job.id, "Job left processing before failure was recorded");
                JobOutcome::Abandoned
            }
            Err(e) => {
                // The stale-job sweep will pick it up
                error!(job_id = %job.id, "Failed to record job failure: {}", e);
                JobOutcome::Failed(message.to_string())
            }
        }
    }
}
