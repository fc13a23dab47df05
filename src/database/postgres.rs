use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::{
    Analysis, Job, JobCompletion, NewAnalysis, NewJob, NewUser, PublicReport, RecoveredJobs, User,
};
use crate::database::store::{Store, QUOTA_EXHAUSTED_MESSAGE, STALE_JOB_MESSAGE};
use crate::types::{Plan, PlanCounts, Role};

const USER_COLUMNS: &str =
    "id, email, password_hash, role, plan, analyses_remaining, created_at, updated_at";

const ANALYSIS_COLUMNS: &str =
    "id, user_id, company_name, company_inn, report_text, target_proposal, is_deleted, created_at, updated_at";

const JOB_COLUMNS: &str = "id, user_id, company_name, company_inn, status, result_id, error, attempts, \
     created_at, started_at, finished_at, updated_at";

/// PostgreSQL-backed store
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(database: &DatabaseManager) -> Self {
        Self {
            pool: database.pool().clone(),
        }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        let sql = format!(
            "INSERT INTO users (id, email, password_hash, role, plan, analyses_remaining)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role)
            .bind(user.plan)
            .bind(user.analyses_remaining)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    DatabaseError::Conflict(format!("User with email '{}' already exists", user.email))
                }
                other => other.into(),
            })
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql).bind(id).fetch_optional(&self.pool).await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn count_users_by_plan(&self) -> Result<PlanCounts, DatabaseError> {
        let rows = sqlx::query_as::<_, (Plan, i64)>("SELECT plan, COUNT(*) FROM users GROUP BY plan")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().collect())
    }

    async fn count_admins(&self) -> Result<i64, DatabaseError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = 'admin'")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }

    async fn set_role_by_email(&self, email: &str, role: Role) -> Result<Option<User>, DatabaseError> {
        let sql = format!(
            "UPDATE users SET role = $2, updated_at = NOW() WHERE email = $1 RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .bind(role)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn set_plan(&self, user_id: Uuid, plan: Plan, analyses_remaining: i32) -> Result<Option<User>, DatabaseError> {
        let sql = format!(
            "UPDATE users SET plan = $2, analyses_remaining = $3, updated_at = NOW()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .bind(plan)
            .bind(analyses_remaining)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn count_analyses(&self, user_id: Uuid) -> Result<i64, DatabaseError> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM analyses WHERE user_id = $1 AND is_deleted = FALSE")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count.0)
    }

    async fn list_analyses(&self, user_id: Uuid, trashed: bool) -> Result<Vec<Analysis>, DatabaseError> {
        let sql = format!(
            "SELECT {ANALYSIS_COLUMNS} FROM analyses
             WHERE user_id = $1 AND is_deleted = $2
             ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, Analysis>(&sql)
            .bind(user_id)
            .bind(trashed)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn find_analysis(&self, user_id: Uuid, id: Uuid) -> Result<Option<Analysis>, DatabaseError> {
        let sql = format!(
            "SELECT {ANALYSIS_COLUMNS} FROM analyses WHERE id = $1 AND user_id = $2 AND is_deleted = FALSE"
        );
        let row = sqlx::query_as::<_, Analysis>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_public_report(&self, id: Uuid) -> Result<Option<PublicReport>, DatabaseError> {
        let row = sqlx::query_as::<_, PublicReport>(
            "SELECT id, company_name, company_inn, report_text, target_proposal, created_at
             FROM analyses
             WHERE id = $1 AND is_deleted = FALSE",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn set_analysis_deleted(&self, user_id: Uuid, id: Uuid, is_deleted: bool) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE analyses SET is_deleted = $3, updated_at = NOW()
             WHERE id = $1 AND user_id = $2 AND is_deleted = NOT $3",
        )
        .bind(id)
        .bind(user_id)
        .bind(is_deleted)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn purge_analysis(&self, user_id: Uuid, id: Uuid) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM analyses WHERE id = $1 AND user_id = $2 AND is_deleted = TRUE")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn create_job(&self, job: NewJob) -> Result<Job, DatabaseError> {
        let sql = format!(
            "INSERT INTO jobs (id, user_id, company_name, company_inn)
             VALUES ($1, $2, $3, $4)
             RETURNING {JOB_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Job>(&sql)
            .bind(Uuid::new_v4())
            .bind(job.user_id)
            .bind(&job.company_name)
            .bind(&job.company_inn)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_job(&self, id: Uuid) -> Result<Option<Job>, DatabaseError> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1");
        let row = sqlx::query_as::<_, Job>(&sql).bind(id).fetch_optional(&self.pool).await?;
        Ok(row)
    }

    async fn count_open_jobs(&self, user_id: Uuid) -> Result<i64, DatabaseError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM jobs WHERE user_id = $1 AND status IN ('pending', 'processing')",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0)
    }

    async fn claim_next_job(&self) -> Result<Option<Job>, DatabaseError> {
        // SKIP LOCKED makes concurrent claimers pick different rows instead of the same one
        let sql = format!(
            "UPDATE jobs
             SET status = 'processing', attempts = attempts + 1, started_at = NOW(), updated_at = NOW()
             WHERE id = (
                 SELECT id FROM jobs
                 WHERE status = 'pending'
                 ORDER BY created_at ASC, id ASC
                 LIMIT 1
                 FOR UPDATE SKIP LOCKED
             )
             RETURNING {JOB_COLUMNS}"
        );
        let job = sqlx::query_as::<_, Job>(&sql).fetch_optional(&self.pool).await?;
        if let Some(job) = &job {
            debug!(job_id = %job.id, attempts = job.attempts, "Claimed job");
        }
        Ok(job)
    }

    async fn complete_job(&self, job_id: Uuid, attempt: i32, analysis: NewAnalysis) -> Result<JobCompletion, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let processing: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM jobs WHERE id = $1 AND status = 'processing' AND attempts = $2 FOR UPDATE",
        )
        .bind(job_id)
        .bind(attempt)
        .fetch_optional(&mut *tx)
        .await?;
        if processing.is_none() {
            tx.rollback().await?;
            return Ok(JobCompletion::NotProcessing);
        }

        let debited = sqlx::query(
            "UPDATE users SET analyses_remaining = analyses_remaining - 1, updated_at = NOW()
             WHERE id = $1 AND analyses_remaining > 0",
        )
        .bind(analysis.user_id)
        .execute(&mut *tx)
        .await?;

        if debited.rows_affected() == 0 {
            sqlx::query(
                "UPDATE jobs SET status = 'failed', error = $2, finished_at = NOW(), updated_at = NOW()
                 WHERE id = $1",
            )
            .bind(job_id)
            .bind(QUOTA_EXHAUSTED_MESSAGE)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;
            return Ok(JobCompletion::QuotaExhausted);
        }

        let sql = format!(
            "INSERT INTO analyses (id, user_id, company_name, company_inn, report_text, target_proposal)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {ANALYSIS_COLUMNS}"
        );
        let stored = sqlx::query_as::<_, Analysis>(&sql)
            .bind(Uuid::new_v4())
            .bind(analysis.user_id)
            .bind(&analysis.company_name)
            .bind(&analysis.company_inn)
            .bind(&analysis.report_text)
            .bind(&analysis.target_proposal)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE jobs SET status = 'completed', result_id = $2, error = NULL, finished_at = NOW(), updated_at = NOW()
             WHERE id = $1",
        )
        .bind(job_id)
        .bind(stored.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(JobCompletion::Completed(stored))
    }

    async fn fail_job(&self, job_id: Uuid, attempt: i32, error: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'failed', error = $3, finished_at = NOW(), updated_at = NOW()
             WHERE id = $1 AND attempts = $2 AND status = 'processing'",
        )
        .bind(job_id)
        .bind(attempt)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn recover_stale_jobs(&self, stale_before: DateTime<Utc>, max_attempts: i32) -> Result<RecoveredJobs, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let failed = sqlx::query(
            "UPDATE jobs SET status = 'failed', error = $3, finished_at = NOW(), updated_at = NOW()
             WHERE status = 'processing' AND started_at < $1 AND attempts >= $2",
        )
        .bind(stale_before)
        .bind(max_attempts)
        .bind(STALE_JOB_MESSAGE)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let requeued = sqlx::query(
            "UPDATE jobs SET status = 'pending', started_at = NULL, updated_at = NOW()
             WHERE status = 'processing' AND started_at < $1 AND attempts < $2",
        )
        .bind(stale_before)
        .bind(max_attempts)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        if requeued > 0 || failed > 0 {
            info!(requeued, failed, "Recovered stale jobs");
        }
        Ok(RecoveredJobs { requeued, failed })
    }
}
