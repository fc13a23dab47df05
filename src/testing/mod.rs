//! In-memory doubles for the store and the producer, used by unit tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use crate::database::models::{
    Analysis, Job, JobCompletion, NewAnalysis, NewJob, NewUser, PublicReport, RecoveredJobs, User,
};
use crate::database::store::{QUOTA_EXHAUSTED_MESSAGE, STALE_JOB_MESSAGE};
use crate::database::{DatabaseError, Store};
use crate::services::producer::{AnalysisProducer, CompanyRequest, ProducedReport, ProducerError};
use crate::types::{JobStatus, Plan, PlanCounts, Role};

#[derive(Default)]
struct State {
    users: Vec<User>,
    analyses: Vec<Analysis>,
    jobs: Vec<Job>,
}

/// Store with the same observable semantics as `PgStore`; one lock per operation
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("memory store poisoned")
    }

    pub fn seed_user(&self, email: &str, plan: Plan, analyses_remaining: i32) -> User {
        self.seed_user_with_role(email, Role::User, plan, analyses_remaining)
    }

    pub fn seed_admin(&self, email: &str) -> User {
        self.seed_user_with_role(email, Role::Admin, Plan::Profi, 0)
    }

    pub fn seed_user_with_role(&self, email: &str, role: Role, plan: Plan, analyses_remaining: i32) -> User {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            // Not a valid PHC string; seeded users authenticate by token only
            password_hash: "unusable".to_string(),
            role,
            plan,
            analyses_remaining,
            created_at: now,
            updated_at: now,
        };
        self.lock().users.push(user.clone());
        user
    }

    pub fn seed_analysis(&self, user_id: Uuid, company_name: &str, is_deleted: bool) -> Analysis {
        let now = Utc::now();
        let analysis = Analysis {
            id: Uuid::new_v4(),
            user_id,
            company_name: company_name.to_string(),
            company_inn: "7707083893".to_string(),
            report_text: format!("Report on {}", company_name),
            target_proposal: format!("Proposal for {}", company_name),
            is_deleted,
            created_at: now,
            updated_at: now,
        };
        self.lock().analyses.push(analysis.clone());
        analysis
    }

    pub fn seed_job(&self, user_id: Uuid, status: JobStatus, created_at: DateTime<Utc>) -> Job {
        let job = Job {
            id: Uuid::new_v4(),
            user_id,
            company_name: "ООО Вектор".to_string(),
            company_inn: "7707083893".to_string(),
            status,
            result_id: None,
            error: None,
            attempts: 0,
            created_at,
            started_at: None,
            finished_at: None,
            updated_at: created_at,
        };
        self.lock().jobs.push(job.clone());
        job
    }

    pub fn analysis_exists(&self, id: Uuid) -> bool {
        self.lock().analyses.iter().any(|a| a.id == id)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        let mut state = self.lock();
        if state.users.iter().any(|u| u.email == user.email) {
            return Err(DatabaseError::Conflict(format!("User with email '{}' already exists", user.email)));
        }
        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            plan: user.plan,
            analyses_remaining: user.analyses_remaining,
            created_at: now,
            updated_at: now,
        };
        state.users.push(created.clone());
        Ok(created)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        Ok(self.lock().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        Ok(self.lock().users.iter().find(|u| u.email == email).cloned())
    }

    async fn count_users_by_plan(&self) -> Result<PlanCounts, DatabaseError> {
        Ok(self.lock().users.iter().map(|u| (u.plan, 1)).collect())
    }

    async fn count_admins(&self) -> Result<i64, DatabaseError> {
        Ok(self.lock().users.iter().filter(|u| u.role == Role::Admin).count() as i64)
    }

    async fn set_role_by_email(&self, email: &str, role: Role) -> Result<Option<User>, DatabaseError> {
        let mut state = self.lock();
        Ok(state.users.iter_mut().find(|u| u.email == email).map(|u| {
            u.role = role;
            u.updated_at = Utc::now();
            u.clone()
        }))
    }

    async fn set_plan(&self, user_id: Uuid, plan: Plan, analyses_remaining: i32) -> Result<Option<User>, DatabaseError> {
        let mut state = self.lock();
        Ok(state.users.iter_mut().find(|u| u.id == user_id).map(|u| {
            u.plan = plan;
            u.analyses_remaining = analyses_remaining;
            u.updated_at = Utc::now();
            u.clone()
        }))
    }

    async fn count_analyses(&self, user_id: Uuid) -> Result<i64, DatabaseError> {
        Ok(self
            .lock()
            .analyses
            .iter()
            .filter(|a| a.user_id == user_id && !a.is_deleted)
            .count() as i64)
    }

    async fn list_analyses(&self, user_id: Uuid, trashed: bool) -> Result<Vec<Analysis>, DatabaseError> {
        let mut rows: Vec<Analysis> = self
            .lock()
            .analyses
            .iter()
            .filter(|a| a.user_id == user_id && a.is_deleted == trashed)
            .cloned()
            .collect();
        rows.reverse();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn find_analysis(&self, user_id: Uuid, id: Uuid) -> Result<Option<Analysis>, DatabaseError> {
        Ok(self
            .lock()
            .analyses
            .iter()
            .find(|a| a.id == id && a.user_id == user_id && !a.is_deleted)
            .cloned())
    }

    async fn find_public_report(&self, id: Uuid) -> Result<Option<PublicReport>, DatabaseError> {
        Ok(self
            .lock()
            .analyses
            .iter()
            .find(|a| a.id == id && !a.is_deleted)
            .map(PublicReport::from))
    }

    async fn set_analysis_deleted(&self, user_id: Uuid, id: Uuid, is_deleted: bool) -> Result<bool, DatabaseError> {
        let mut state = self.lock();
        match state
            .analyses
            .iter_mut()
            .find(|a| a.id == id && a.user_id == user_id && a.is_deleted != is_deleted)
        {
            Some(analysis) => {
                analysis.is_deleted = is_deleted;
                analysis.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn purge_analysis(&self, user_id: Uuid, id: Uuid) -> Result<u64, DatabaseError> {
        let mut state = self.lock();
        let before = state.analyses.len();
        state
            .analyses
            .retain(|a| !(a.id == id && a.user_id == user_id && a.is_deleted));
        Ok((before - state.analyses.len()) as u64)
    }

    async fn create_job(&self, job: NewJob) -> Result<Job, DatabaseError> {
        let now = Utc::now();
        let created = Job {
            id: Uuid::new_v4(),
            user_id: job.user_id,
            company_name: job.company_name,
            company_inn: job.company_inn,
            status: JobStatus::Pending,
            result_id: None,
            error: None,
            attempts: 0,
            created_at: now,
            started_at: None,
            finished_at: None,
            updated_at: now,
        };
        self.lock().jobs.push(created.clone());
        Ok(created)
    }

    async fn find_job(&self, id: Uuid) -> Result<Option<Job>, DatabaseError> {
        Ok(self.lock().jobs.iter().find(|j| j.id == id).cloned())
    }

    async fn count_open_jobs(&self, user_id: Uuid) -> Result<i64, DatabaseError> {
        Ok(self
            .lock()
            .jobs
            .iter()
            .filter(|j| j.user_id == user_id && matches!(j.status, JobStatus::Pending | JobStatus::Processing))
            .count() as i64)
    }

    async fn claim_next_job(&self) -> Result<Option<Job>, DatabaseError> {
        let mut state = self.lock();
        let now = Utc::now();
        Ok(state
            .jobs
            .iter_mut()
            .filter(|j| j.status == JobStatus::Pending)
            .min_by_key(|j| j.created_at)
            .map(|job| {
                job.status = JobStatus::Processing;
                job.attempts += 1;
                job.started_at = Some(now);
                job.updated_at = now;
                job.clone()
            }))
    }

    async fn complete_job(&self, job_id: Uuid, attempt: i32, analysis: NewAnalysis) -> Result<JobCompletion, DatabaseError> {
        let mut state = self.lock();
        let now = Utc::now();

        let Some(job_index) = state
            .jobs
            .iter()
            .position(|j| j.id == job_id && j.attempts == attempt && j.status == JobStatus::Processing)
        else {
            return Ok(JobCompletion::NotProcessing);
        };

        let debited = match state
            .users
            .iter_mut()
            .find(|u| u.id == analysis.user_id && u.analyses_remaining > 0)
        {
            Some(user) => {
                user.analyses_remaining -= 1;
                user.updated_at = now;
                true
            }
            None => false,
        };

        if !debited {
            let job = &mut state.jobs[job_index];
            job.status = JobStatus::Failed;
            job.error = Some(QUOTA_EXHAUSTED_MESSAGE.to_string());
            job.finished_at = Some(now);
            job.updated_at = now;
            return Ok(JobCompletion::QuotaExhausted);
        }

        let stored = Analysis {
            id: Uuid::new_v4(),
            user_id: analysis.user_id,
            company_name: analysis.company_name,
            company_inn: analysis.company_inn,
            report_text: analysis.report_text,
            target_proposal: analysis.target_proposal,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        state.analyses.push(stored.clone());

        let job = &mut state.jobs[job_index];
        job.status = JobStatus::Completed;
        job.result_id = Some(stored.id);
        job.error = None;
        job.finished_at = Some(now);
        job.updated_at = now;

        Ok(JobCompletion::Completed(stored))
    }

    async fn fail_job(&self, job_id: Uuid, attempt: i32, error: &str) -> Result<bool, DatabaseError> {
        let mut state = self.lock();
        let now = Utc::now();
        match state
            .jobs
            .iter_mut()
            .find(|j| j.id == job_id && j.attempts == attempt && j.status == JobStatus::Processing)
        {
            Some(job) => {
                job.status = JobStatus::Failed;
                job.error = Some(error.to_string());
                job.finished_at = Some(now);
                job.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn recover_stale_jobs(&self, stale_before: DateTime<Utc>, max_attempts: i32) -> Result<RecoveredJobs, DatabaseError> {
        let mut state = self.lock();
        let now = Utc::now();
        let mut recovered = RecoveredJobs::default();

        let stale = state.jobs.iter_mut().filter(|j| {
            j.status == JobStatus::Processing && j.started_at.map_or(false, |started| started < stale_before)
        });
        for job in stale {
            if job.attempts >= max_attempts {
                job.status = JobStatus::Failed;
                job.error = Some(STALE_JOB_MESSAGE.to_string());
                job.finished_at = Some(now);
                recovered.failed += 1;
            } else {
                job.status = JobStatus::Pending;
                job.started_at = None;
                recovered.requeued += 1;
            }
            job.updated_at = now;
        }
        Ok(recovered)
    }
}

/// Producer returning canned content or a canned failure
pub struct StubProducer {
    fail: bool,
    delay: Option<Duration>,
}

impl StubProducer {
    pub fn ok() -> Self {
        Self { fail: false, delay: None }
    }

    pub fn failing() -> Self {
        Self { fail: true, delay: None }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl AnalysisProducer for StubProducer {
    async fn produce(&self, company: &CompanyRequest) -> Result<ProducedReport, ProducerError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(ProducerError::Status {
                status: 400,
                body: "model rejected the request".to_string(),
            });
        }
        Ok(ProducedReport {
            report_text: format!("Report on {} ({})", company.company_name, company.company_inn),
            target_proposal: format!("Proposal for {}", company.company_name),
        })
    }
}
