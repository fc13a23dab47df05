use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_name: String,
    pub company_inn: String,
    pub report_text: String,
    pub target_proposal: String,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAnalysis {
    pub user_id: Uuid,
    pub company_name: String,
    pub company_inn: String,
    pub report_text: String,
    pub target_proposal: String,
}

/// Shareable projection of a finished report: no owner, no trash flag
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PublicReport {
    pub id: Uuid,
    pub company_name: String,
    pub company_inn: String,
    pub report_text: String,
    pub target_proposal: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Analysis> for PublicReport {
    fn from(analysis: &Analysis) -> Self {
        Self {
            id: analysis.id,
            company_name: analysis.company_name.clone(),
            company_inn: analysis.company_inn.clone(),
            report_text: analysis.report_text.clone(),
            target_proposal: analysis.target_proposal.clone(),
            created_at: analysis.created_at,
        }
    }
}
