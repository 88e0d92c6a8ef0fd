//! Zero-shot text classification behind a trait, with an HTTP implementation
//! speaking the Hugging Face inference API format.
use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{RecommendError, RecommendResult};

const WARM_UP_ATTEMPTS: u32 = 6;
const WARM_UP_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoredLabel {
    pub label: String,
    pub score: f32,
}

#[async_trait]
pub trait ZeroShotClassifier: Send + Sync {
    /// Returns the candidate labels ranked by the model, best first.
    async fn classify(&self, text: &str, labels: &[String]) -> RecommendResult<Vec<ScoredLabel>>;
}

/// Picks the first label in the classifier's own ordering.
pub async fn top_label(
    classifier: &dyn ZeroShotClassifier,
    text: &str,
    labels: &[String],
) -> RecommendResult<String> {
    let ranked = classifier.classify(text, labels).await?;
    ranked.into_iter().next().map(|s| s.label).ok_or_else(|| {
        RecommendError::ClassificationUnavailable("classifier returned no labels".to_string())
    })
}

#[derive(Debug, Clone)]
pub struct HttpZeroShotClient {
    client: Client,
    url: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ZeroShotResponse {
    Columns { labels: Vec<String>, scores: Vec<f32> },
    Rows(Vec<ScoredLabel>),
}

impl ZeroShotResponse {
    fn into_ranked(self) -> Vec<ScoredLabel> {
        match self {
            ZeroShotResponse::Columns { labels, scores } => labels
                .into_iter()
                .zip(scores)
                .map(|(label, score)| ScoredLabel { label, score })
                .collect(),
            ZeroShotResponse::Rows(rows) => rows,
        }
    }
}

impl HttpZeroShotClient {
    pub fn new(url: &str, token: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let user_agent = format!("recomana/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("Failed to build classifier HTTP client")?;
        Ok(Self {
            client,
            url: url.to_string(),
            token,
        })
    }

    /// Blocks until the model answers a sample request. Must complete before the
    /// client is handed to the interpreter.
    pub async fn warm_up(self) -> RecommendResult<Self> {
        self.warm_up_with(WARM_UP_ATTEMPTS, WARM_UP_BACKOFF).await
    }

    /// Tries up to `attempts` times, sleeping `backoff` between failures.
    pub async fn warm_up_with(self, attempts: u32, backoff: Duration) -> RecommendResult<Self> {
        let sample_labels = vec!["si".to_string(), "no".to_string()];
        info!("Warming up zero-shot classifier at {}", self.url);
        let mut last_err = None;
        for attempt in 1..=attempts {
            match self.classify("hola", &sample_labels).await {
                Ok(_) => {
                    info!("Classifier ready after {} attempt(s)", attempt);
                    return Ok(self);
                }
                Err(e) => {
                    warn!(attempt, "Classifier not ready yet: {}", e);
                    last_err = Some(e);
                    if attempt < attempts {
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            RecommendError::ClassificationUnavailable("warm-up never attempted".to_string())
        }))
    }
}

#[async_trait]
impl ZeroShotClassifier for HttpZeroShotClient {
    async fn classify(&self, text: &str, labels: &[String]) -> RecommendResult<Vec<ScoredLabel>> {
        let body = json!({
            "inputs": text,
            "parameters": { "candidate_labels": labels }
        });
        let mut req = self.client.post(&self.url).json(&body);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let res = req
            .send()
            .await
            .map_err(|e| RecommendError::ClassificationUnavailable(e.to_string()))?;

        let status = res.status();
        let bytes = res
            .bytes()
            .await
            .map_err(|e| RecommendError::ClassificationUnavailable(e.to_string()))?;
        if status == StatusCode::SERVICE_UNAVAILABLE {
            return Err(RecommendError::ClassificationUnavailable(
                "model is still loading".to_string(),
            ));
        }
        if !status.is_success() {
            return Err(RecommendError::ClassificationUnavailable(format!(
                "classifier HTTP error (status {}): {}",
                status,
                String::from_utf8_lossy(&bytes)
            )));
        }
        parse_response(&bytes)
    }
}

fn parse_response(bytes: &[u8]) -> RecommendResult<Vec<ScoredLabel>> {
    let parsed: ZeroShotResponse = serde_json::from_slice(bytes).map_err(|e| {
        RecommendError::ClassificationUnavailable(format!("unreadable classifier response: {e}"))
    })?;
    Ok(parsed.into_ranked())
}
