use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    Analysis, Job, JobCompletion, NewAnalysis, NewJob, NewUser, PublicReport, RecoveredJobs, User,
};
use crate::types::{Plan, PlanCounts, Role};

/// Message recorded on jobs whose owner ran out of analyses before completion
pub const QUOTA_EXHAUSTED_MESSAGE: &str = "No analyses remaining on the current plan";

/// Message recorded on jobs that exhausted their attempts while stuck in processing
pub const STALE_JOB_MESSAGE: &str = "Analysis did not finish in time";

/// Persistence operations used by handlers and the job worker.
///
/// Every user-scoped method takes the owner id and filters by it; callers
/// pass the authenticated user, never a client-supplied owner.
#[async_trait]
pub trait Store: Send + Sync {
    async fn health_check(&self) -> Result<(), DatabaseError>;

    // Users

    /// Fails with `Conflict` when the email is taken
    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError>;
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;
    async fn count_users_by_plan(&self) -> Result<PlanCounts, DatabaseError>;
    async fn count_admins(&self) -> Result<i64, DatabaseError>;
    async fn set_role_by_email(&self, email: &str, role: Role) -> Result<Option<User>, DatabaseError>;
    async fn set_plan(&self, user_id: Uuid, plan: Plan, analyses_remaining: i32) -> Result<Option<User>, DatabaseError>;

    // Analyses

    /// Counts non-deleted analyses only
    async fn count_analyses(&self, user_id: Uuid) -> Result<i64, DatabaseError>;
    /// Newest first; `trashed` selects the trash instead of live analyses
    async fn list_analyses(&self, user_id: Uuid, trashed: bool) -> Result<Vec<Analysis>, DatabaseError>;
    /// Owned, non-deleted analysis
    async fn find_analysis(&self, user_id: Uuid, id: Uuid) -> Result<Option<Analysis>, DatabaseError>;
    /// Any non-deleted analysis, without ownership data
    async fn find_public_report(&self, id: Uuid) -> Result<Option<PublicReport>, DatabaseError>;
    /// Flip the trash flag; true only if an owned row in the opposite state changed
    async fn set_analysis_deleted(&self, user_id: Uuid, id: Uuid, is_deleted: bool) -> Result<bool, DatabaseError>;
    /// Hard delete an owned, trashed analysis; returns affected rows
    async fn purge_analysis(&self, user_id: Uuid, id: Uuid) -> Result<u64, DatabaseError>;

    // Jobs

    async fn create_job(&self, job: NewJob) -> Result<Job, DatabaseError>;
    async fn find_job(&self, id: Uuid) -> Result<Option<Job>, DatabaseError>;
    /// Jobs in pending or processing for this user
    async fn count_open_jobs(&self, user_id: Uuid) -> Result<i64, DatabaseError>;
    /// Atomically move the oldest pending job to processing and return it
    async fn claim_next_job(&self) -> Result<Option<Job>, DatabaseError>;
    /// Debit quota, store the analysis and complete the job in one transaction.
    /// Only the claim that produced `attempt` may complete the job.
    async fn complete_job(&self, job_id: Uuid, attempt: i32, analysis: NewAnalysis) -> Result<JobCompletion, DatabaseError>;
    /// Mark a processing job failed; false if it was not processing under `attempt`
    async fn fail_job(&self, job_id: Uuid, attempt: i32, error: &str) -> Result<bool, DatabaseError>;
    /// Requeue or dead-letter jobs processing since before `stale_before`
    async fn recover_stale_jobs(&self, stale_before: DateTime<Utc>, max_attempts: i32) -> Result<RecoveredJobs, DatabaseError>;
}
