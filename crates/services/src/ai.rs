//! Conversation-analysis language-model collaborator (Claude API).
//!
//! The model is prompted for a JSON object but is not guaranteed to
//! return schema-pure output, so responses go through balanced-object
//! extraction followed by strict typed deserialization; a miss is a
//! first-class `AiError::Parse`, never a silent fallback.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use stylecoach_config::{ClaudeSettings, RetrySettings};
use stylecoach_db::models::{AnalysisMetrics, CustomerInfo};
use thiserror::Error;
use tracing::debug;

use crate::retry::{self, Transient};

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI collaborator not configured (missing API key)")]
    NotConfigured,
    #[error("AI request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("AI API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("AI response contained no text content")]
    EmptyResponse,
    #[error("Failed to parse AI analysis: {0}")]
    Parse(String),
}

impl Transient for AiError {
    fn is_transient(&self) -> bool {
        match self {
            AiError::Request(e) => retry::reqwest_transient(e),
            AiError::Api { status, .. } => retry::status_transient(*status),
            _ => false,
        }
    }
}

const ANALYSIS_SYSTEM_PROMPT: &str = r#"You are an expert coach analyzing salon stylist-customer conversations. Score the transcript on seven indicators and report the raw measures behind each score.

Indicators and weights:
1. talkRatio (15%): stylist:customer speaking time, 40:60 is ideal
2. questionQuality (15%): share of open questions, 60%+ is ideal
3. emotion (15%): share of positive customer expressions, 70%+ is ideal
4. concernKeywords (10%): hair/scalp concern keywords mentioned by the customer (dryness, frizz, volume loss, gray hair, damage, split ends, scalp itch, ...)
5. proposalTiming (15%): time from concern detection to a product proposal, within 3 minutes is ideal
6. proposalQuality (15%): whether proposed products match the detected concerns
7. conversion (15%): whether a retail purchase was agreed

Respond with ONLY a JSON object in exactly this shape, no commentary:
{
  "overallScore": number,
  "metrics": {
    "talkRatio": { "score": number, "stylistRatio": number, "customerRatio": number, "details": string },
    "questionQuality": { "score": number, "openCount": number, "closedCount": number, "details": string },
    "emotion": { "score": number, "positiveRatio": number, "negativeRatio": number, "details": string },
    "concernKeywords": { "score": number, "keywords": string[], "details": string },
    "proposalTiming": { "score": number, "timingMs": number | null, "details": string },
    "proposalQuality": { "score": number, "matchRate": number, "details": string },
    "conversion": { "score": number, "isConverted": boolean, "details": string }
  },
  "suggestions": string[],
  "highlights": string[]
}"#;

#[derive(Debug, Serialize)]
struct ClaudeRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<ClaudeMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ClaudeMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

/// Analysis result as the model reports it. `overall_score` is kept for
/// the wire contract but discarded downstream in favor of the locally
/// recomputed aggregate.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAnalysis {
    #[serde(default)]
    pub overall_score: f64,
    pub metrics: AnalysisMetrics,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiReport {
    pub summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub action_items: Vec<String>,
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ConversationAi {
    client: Client,
    api_key: Option<String>,
    messages_url: String,
    model: String,
    max_tokens: u32,
    retry: RetrySettings,
}

impl ConversationAi {
    pub fn new(settings: &ClaudeSettings, retry: RetrySettings) -> Self {
        let base = settings.base_url.trim_end_matches('/');
        Self {
            client: Client::new(),
            api_key: settings.api_key.clone(),
            messages_url: format!("{base}/v1/messages"),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            retry,
        }
    }

    pub fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    /// Runs the seven-indicator analysis over a speaker-labeled
    /// transcript.
    pub async fn analyze_conversation(&self, conversation: &str) -> Result<AiAnalysis, AiError> {
        let user = format!("Analyze this conversation:\n\n{conversation}");
        let text = self
            .complete(Some(ANALYSIS_SYSTEM_PROMPT), &user)
            .await?;

        let json = extract_json_object(&text)
            .ok_or_else(|| AiError::Parse("no JSON object in response".to_string()))?;
        serde_json::from_str(json).map_err(|e| AiError::Parse(e.to_string()))
    }

    /// Requests the session-level summary, strengths, improvements and
    /// next-visit action items.
    pub async fn generate_report(
        &self,
        conversation: &str,
        metrics: Option<&AnalysisMetrics>,
        customer_info: &CustomerInfo,
    ) -> Result<AiReport, AiError> {
        let metrics_json = metrics
            .map(|m| serde_json::to_string_pretty(m).unwrap_or_default())
            .unwrap_or_else(|| "{}".to_string());
        let customer_json = serde_json::to_string(customer_info).unwrap_or_default();

        // Long sessions get truncated: the indicator snapshot carries the
        // quantitative signal, the transcript prefix is for tone.
        let excerpt: String = conversation.chars().take(3000).collect();

        let user = format!(
            "You are a salon customer-service coach. From the conversation \
             and indicator snapshot below, write a session report.\n\n\
             ## Conversation\n{excerpt}\n\n\
             ## Indicators\n{metrics_json}\n\n\
             ## Customer\n{customer_json}\n\n\
             Respond with ONLY a JSON object:\n\
             {{\n  \"summary\": string,\n  \"strengths\": string[],\n  \
             \"improvements\": string[],\n  \"actionItems\": string[],\n  \
             \"feedback\": string\n}}"
        );

        let text = self.complete(None, &user).await?;
        let json = extract_json_object(&text)
            .ok_or_else(|| AiError::Parse("no JSON object in response".to_string()))?;
        serde_json::from_str(json).map_err(|e| AiError::Parse(e.to_string()))
    }

    async fn complete(&self, system: Option<&str>, user: &str) -> Result<String, AiError> {
        let api_key = self.api_key.as_ref().ok_or(AiError::NotConfigured)?;

        retry::with_backoff(&self.retry, "claude_messages", || async {
            let request = ClaudeRequest {
                model: &self.model,
                max_tokens: self.max_tokens,
                system,
                messages: vec![ClaudeMessage {
                    role: "user",
                    content: user,
                }],
            };

            let response = self
                .client
                .post(&self.messages_url)
                .header("x-api-key", api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request)
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                return Err(AiError::Api { status, body });
            }

            let parsed: ClaudeResponse = response.json().await?;
            let text = parsed
                .content
                .first()
                .and_then(|c| c.text.clone())
                .ok_or(AiError::EmptyResponse)?;

            debug!(chars = text.len(), "AI completion received");
            Ok(text)
        })
        .await
    }
}

/// Returns the first balanced top-level JSON object in `text`, honoring
/// string literals and escapes. Models occasionally wrap the object in
/// prose or markdown fences; this strips all of that.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
