//! Similarity-search collaborator: looks up prior successful approaches
//! for the concern keywords a chunk surfaced. Strictly best-effort; the
//! caller logs failures and moves on.

use bson::oid::ObjectId;
use reqwest::Client;
use serde::Deserialize;
use stylecoach_config::{RetrySettings, SimilaritySettings};
use thiserror::Error;

use crate::retry::{self, Transient};

#[derive(Debug, Error)]
pub enum SimilarityError {
    #[error("similarity search not configured")]
    NotConfigured,
    #[error("similarity request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("similarity API error {status}: {body}")]
    Api { status: u16, body: String },
}

impl Transient for SimilarityError {
    fn is_transient(&self) -> bool {
        match self {
            SimilarityError::Request(e) => retry::reqwest_transient(e),
            SimilarityError::Api { status, .. } => retry::status_transient(*status),
            SimilarityError::NotConfigured => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    cases: Vec<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct SimilarCaseClient {
    client: Client,
    endpoint: Option<String>,
    api_key: Option<String>,
    limit: u32,
    retry: RetrySettings,
}

impl SimilarCaseClient {
    pub fn new(settings: &SimilaritySettings, retry: RetrySettings) -> Self {
        Self {
            client: Client::new(),
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone(),
            limit: settings.limit,
            retry,
        }
    }

    pub fn is_available(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Returns prior success cases matching the keywords. Case content
    /// is an opaque collaborator payload, passed through to the
    /// broadcast unmodified.
    pub async fn search(
        &self,
        session_id: ObjectId,
        keywords: &[String],
    ) -> Result<Vec<serde_json::Value>, SimilarityError> {
        let endpoint = self.endpoint.as_ref().ok_or(SimilarityError::NotConfigured)?;

        let response: SearchResponse = retry::with_backoff(&self.retry, "similarity_search", || async {
            let mut req = self.client.post(endpoint).json(&serde_json::json!({
                "sessionId": session_id.to_hex(),
                "keywords": keywords,
                "limit": self.limit,
            }));
            if let Some(key) = &self.api_key {
                req = req.bearer_auth(key);
            }

            let resp = req.send().await?;
            if !resp.status().is_success() {
                let status = resp.status().as_u16();
                let body = resp.text().await.unwrap_or_default();
                return Err(SimilarityError::Api { status, body });
            }
            Ok(resp.json::<SearchResponse>().await?)
        })
        .await?;

        Ok(response.cases)
    }
}
