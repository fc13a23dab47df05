/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account role; admins can reach the /api/admin/* tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// Subscription tier controlling the analysis quota
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "plan_tier", rename_all = "lowercase")]
pub enum Plan {
    Trial,
    Start,
    Optimal,
    Profi,
}

/// Job lifecycle: pending -> processing -> completed | failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "job_status", rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Trial => "trial",
            Plan::Start => "start",
            Plan::Optimal => "optimal",
            Plan::Profi => "profi",
        }
    }
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

impl FromStr for Plan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trial" => Ok(Plan::Trial),
            "start" => Ok(Plan::Start),
            "optimal" => Ok(Plan::Optimal),
            "profi" => Ok(Plan::Profi),
            other => Err(format!("unknown plan '{}'", other)),
        }
    }
}

/// User counts per plan, serialized as {"Trial": n, "Start": n, "Optimal": n, "Profi": n}
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlanCounts {
    pub trial: i64,
    pub start: i64,
    pub optimal: i64,
    pub profi: i64,
}

impl PlanCounts {
    pub fn add(&mut self, plan: Plan, count: i64) {
        match plan {
            Plan::Trial => self.trial += count,
            Plan::Start => self.start += count,
            Plan::Optimal => self.optimal += count,
            Plan::Profi => self.profi += count,
        }
    }
}

impl FromIterator<(Plan, i64)> for PlanCounts {
    fn from_iter<I: IntoIterator<Item = (Plan, i64)>>(iter: I) -> Self {
        let mut counts = PlanCounts::default();
        for (plan, count) in iter {
            counts.add(plan, count);
        }
        counts
    }
}
