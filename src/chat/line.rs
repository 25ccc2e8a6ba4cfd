//! LINE-style messaging API client.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

use super::{ChatTransport, truncate_message};
use crate::error::{Error, Result};

pub struct LineClient {
    http: reqwest::Client,
    base_url: String,
    access_token: SecretString,
}

impl LineClient {
    pub fn new(base_url: String, access_token: SecretString, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| Error::Chat(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string(), access_token })
    }

    async fn send(&self, path: &str, body: serde_json::Value) -> Result<()> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(self.access_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|err| Error::Chat(format!("POST {url}: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Chat(format!("POST {url} returned {status}: {detail}")));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for LineClient {
    async fn reply(&self, delivery_token: &str, text: &str) -> Result<()> {
        self.send(
            "/v2/bot/message/reply",
            json!({
                "replyToken": delivery_token,
                "messages": [{"type": "text", "text": truncate_message(text)}],
            }),
        )
        .await
    }

    async fn push(&self, user_id: &str, text: &str) -> Result<()> {
        self.send(
            "/v2/bot/message/push",
            json!({
                "to": user_id,
                "messages": [{"type": "text", "text": truncate_message(text)}],
            }),
        )
        .await
    }
}
