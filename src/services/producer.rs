//! Report generation against an OpenAI-compatible chat-completions API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::ProducerConfig;

/// Company a report is requested for
#[derive(Debug, Clone)]
pub struct CompanyRequest {
    pub company_name: String,
    pub company_inn: String,
}

/// Generated report content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducedReport {
    pub report_text: String,
    pub target_proposal: String,
}

#[derive(Debug, Error)]
pub enum ProducerError {
    #[error("analysis producer is not configured (PRODUCER_API_KEY missing)")]
    NotConfigured,
    #[error("invalid producer endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("request to producer failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("producer responded with {status}: {body}")]
    Status { status: u16, body: String },
    #[error("producer returned no content")]
    EmptyResponse,
}

impl ProducerError {
    /// Failures worth another attempt: network trouble, rate limiting, upstream 5xx
    pub fn is_transient(&self) -> bool {
        match self {
            ProducerError::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ProducerError::Status { status, .. } => *status == 429 || (500..=599).contains(status),
            ProducerError::NotConfigured | ProducerError::InvalidEndpoint(_) | ProducerError::EmptyResponse => false,
        }
    }
}

/// Produces report content for a company
#[async_trait]
pub trait AnalysisProducer: Send + Sync {
    async fn produce(&self, company: &CompanyRequest) -> Result<ProducedReport, ProducerError>;
}

const REPORT_SYSTEM_PROMPT: &str = "You are a B2B market analyst. Write a structured due-diligence \
report in Russian about the company identified by the user: business profile, likely products and \
customers, financial and legal risk signals, and procurement needs. Use Markdown headings.";

const PROPOSAL_SYSTEM_PROMPT: &str = "You are a B2B sales strategist. Based on the company report \
provided by the user, write a concise commercial proposal in Russian targeted at this company: the \
pain points addressed, the offer, and a suggested first contact message.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl ChatResponse {
    fn into_text(self) -> Result<String, ProducerError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(ProducerError::EmptyResponse)
    }
}

/// HTTP producer with bounded retries for transient failures
pub struct OpenAiProducer {
    client: reqwest::Client,
    endpoint: url::Url,
    api_key: Option<String>,
    model: String,
    max_retries: u32,
    retry_backoff: Duration,
}

impl OpenAiProducer {
    pub fn new(config: &ProducerConfig) -> Result<Self, ProducerError> {
        let base = if config.base_url.ends_with('/') {
            config.base_url.clone()
        } else {
            format!("{}/", config.base_url)
        };
        let endpoint = url::Url::parse(&base)
            .and_then(|base| base.join("chat/completions"))
            .map_err(|e| ProducerError::InvalidEndpoint(format!("{}: {}", config.base_url, e)))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        if config.api_key.is_none() {
            tracing::warn!("PRODUCER_API_KEY is not set; analysis jobs will fail until it is configured");
        }

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    async fn complete_with_retry(&self, system: &str, user: &str) -> Result<String, ProducerError> {
        let mut attempt = 0;
        loop {
            match self.complete(system, user).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = backoff_delay(self.retry_backoff, attempt);
                    attempt += 1;
                    tracing::warn!(attempt, max_retries = self.max_retries, ?delay, "Producer call failed, retrying: {}", e);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, ProducerError> {
        let api_key = self.api_key.as_deref().ok_or(ProducerError::NotConfigured)?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
            temperature: 0.4,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProducerError::Status {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        response.json::<ChatResponse>().await?.into_text()
    }
}

#[async_trait]
impl AnalysisProducer for OpenAiProducer {
    async fn produce(&self, company: &CompanyRequest) -> Result<ProducedReport, ProducerError> {
        let subject = format!("Company: {}\nINN: {}", company.company_name, company.company_inn);
        let report_text = self.complete_with_retry(REPORT_SYSTEM_PROMPT, &subject).await?;

        let proposal_input = format!("{}\n\nReport:\n{}", subject, report_text);
        let target_proposal = self.complete_with_retry(PROPOSAL_SYSTEM_PROMPT, &proposal_input).await?;

        Ok(ProducedReport {
            report_text,
            target_proposal,
        })
    }
}

/// `base * 2^attempt`, saturating instead of overflowing
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_saturates() {
        let base = Duration::from_millis(500);
        assert_eq!(backoff_delay(base, 0), Duration::from_millis(500));
        assert_eq!(backoff_delay(base, 3), Duration::from_secs(4));
        assert_eq!(backoff_delay(base, 32), base.saturating_mul(u32::MAX));
        assert_eq!(backoff_delay(Duration::MAX, 40), Duration::MAX);
    }

    #[test]
    fn classifies_status_failures() {
        let status = |status| ProducerError::Status { status, body: String::new() };
        assert!(status(429).is_transient());
        assert!(status(500).is_transient());
        assert!(status(503).is_transient());
        assert!(!status(400).is_transient());
        assert!(!status(401).is_transient());
        assert!(!ProducerError::NotConfigured.is_transient());
        assert!(!ProducerError::EmptyResponse.is_transient());
    }

    #[test]
    fn extracts_first_choice_text() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"  Report body \n"}}]}"#,
        )
        .unwrap();
        assert_eq!(response.into_text().unwrap(), "Report body");
    }

    #[test]
    fn blank_or_missing_content_is_empty() {
        let blank: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"   "}}]}"#).unwrap();
        assert!(matches!(blank.into_text(), Err(ProducerError::EmptyResponse)));

        let none: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(none.into_text(), Err(ProducerError::EmptyResponse)));
    }

    #[test]
    fn endpoint_joins_base_url() {
        let config = ProducerConfig {
            base_url: "https://llm.example.com/v1".to_string(),
            ..ProducerConfig::default()
        };
        let producer = OpenAiProducer::new(&config).unwrap();
        assert_eq!(producer.endpoint.as_str(), "https://llm.example.com/v1/chat/completions");
    }

    #[tokio::test]
    async fn unconfigured_producer_fails_without_network() {
        let producer = OpenAiProducer::new(&ProducerConfig::default()).unwrap();
        let company = CompanyRequest {
            company_name: "ООО Ромашка".to_string(),
            company_inn: "7707083893".to_string(),
        };
        assert!(matches!(producer.produce(&company).await, Err(ProducerError::NotConfigured)));
    }
}
