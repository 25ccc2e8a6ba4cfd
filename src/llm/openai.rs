//! OpenAI-style chat-completions transport.
//!
//! Classifies failures for the retry layer: HTTP 429 becomes
//! [`Error::Throttled`] with any `Retry-After` hint normalized to a
//! `Duration`; network errors, timeouts, and other statuses become
//! [`Error::Unavailable`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::debug;

use super::CompletionClient;
use crate::error::{Error, Result};

pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    model: String,
}

impl OpenAiClient {
    pub fn new(
        base_url: String,
        api_key: SecretString,
        model: String,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| Error::Unavailable(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string(), api_key, model })
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %self.model, "requesting completion");

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&json!({
                "model": self.model,
                "messages": [{"role": "user", "content": prompt}],
            }))
            .send()
            .await
            .map_err(|err| Error::Unavailable(format!("POST {url}: {err}")))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(parse_retry_after);
            return Err(Error::Throttled { retry_after });
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Unavailable(format!("completion returned {status}: {detail}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| Error::Unavailable(format!("malformed completion body: {err}")))?;
        Ok(extract_text(&body).unwrap_or_default())
    }
}

/// Normalize a retry-after value to a `Duration`.
///
/// Accepts seconds or milliseconds; numeric values >= 1000 are read as
/// milliseconds. Non-numeric forms (HTTP dates) yield `None` and the
/// computed backoff applies instead.
fn parse_retry_after(raw: &str) -> Option<Duration> {
    let value: f64 = raw.trim().parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    let millis = if value >= 1000.0 { value } else { value * 1000.0 };
    Some(Duration::from_millis(millis as u64))
}

fn extract_text(body: &Value) -> Option<String> {
    let text = body
        .get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()?
        .trim()
        .to_string();
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_after_seconds_are_normalized() {
        assert_eq!(parse_retry_after("20"), Some(Duration::from_secs(20)));
        assert_eq!(parse_retry_after(" 1.5 "), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn retry_after_millis_pass_through() {
        assert_eq!(parse_retry_after("2500"), Some(Duration::from_millis(2500)));
    }

    #[test]
    fn unparseable_retry_after_is_ignored() {
        assert_eq!(parse_retry_after("Wed, 21 Oct 2026 07:28:00 GMT"), None);
        assert_eq!(parse_retry_after("-3"), None);
    }

    #[test]
    fn extracts_first_choice_text() {
        let body = json!({
            "choices": [{"message": {"role": "assistant", "content": " hang them out \n"}}],
        });
        assert_eq!(extract_text(&body).as_deref(), Some("hang them out"));
    }

    #[test]
    fn missing_choices_yield_none() {
        assert_eq!(extract_text(&json!({"error": "nope"})), None);
    }
}
