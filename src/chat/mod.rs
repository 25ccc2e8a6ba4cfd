//! Chat platform integration.
//!
//! Inbound webhook payloads are loosely typed; they are parsed into the
//! closed [`ChatEvent`] variant type here, before any business logic sees
//! them. Events missing a delivery token or sender are dropped at the
//! boundary so downstream code never null-checks.

mod line;

pub use line::LineClient;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::Result;

/// Outbound messages longer than this are truncated with a marker.
pub const MAX_MESSAGE_CHARS: usize = 2000;

const TRUNCATION_MARKER: char = '\u{2026}';

/// Reply/push transport to the chat platform.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Deliver text in response to an inbound event, consuming its token.
    async fn reply(&self, delivery_token: &str, text: &str) -> Result<()>;

    /// Deliver text to a user outside any reply context.
    async fn push(&self, user_id: &str, text: &str) -> Result<()>;
}

/// A validated inbound chat event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// An interactive text message.
    Text { delivery_token: String, user_id: String, text: String },
    /// Anything else that still carries a token and sender (stickers,
    /// follows, images); answered with a direct status summary.
    Other { delivery_token: String, user_id: String, kind: String },
}

impl ChatEvent {
    pub fn delivery_token(&self) -> &str {
        match self {
            ChatEvent::Text { delivery_token, .. } | ChatEvent::Other { delivery_token, .. } => {
                delivery_token
            }
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            ChatEvent::Text { user_id, .. } | ChatEvent::Other { user_id, .. } => user_id,
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            ChatEvent::Text { .. } => "text",
            ChatEvent::Other { kind, .. } => kind,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            ChatEvent::Text { text, .. } => text,
            ChatEvent::Other { .. } => "",
        }
    }

    /// Validate a raw webhook event. Returns `None` when the event cannot
    /// be routed (no token or no sender).
    pub fn from_raw(raw: RawEvent) -> Option<Self> {
        let delivery_token = raw.reply_token.filter(|t| !t.is_empty())?;
        let user_id = raw.source.and_then(|s| s.user_id).filter(|u| !u.is_empty())?;
        let event_kind = raw.kind.unwrap_or_else(|| "unknown".into());

        match raw.message {
            Some(message) if event_kind == "message" => {
                let message_kind = message.kind.unwrap_or_else(|| "unknown".into());
                match message.text {
                    Some(text) if message_kind == "text" => {
                        Some(ChatEvent::Text { delivery_token, user_id, text })
                    }
                    _ => Some(ChatEvent::Other { delivery_token, user_id, kind: message_kind }),
                }
            }
            _ => Some(ChatEvent::Other { delivery_token, user_id, kind: event_kind }),
        }
    }
}

/// Webhook request body: a batch of events.
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub events: Vec<RawEvent>,
}

/// One event as delivered by the platform, before validation.
#[derive(Debug, Deserialize)]
pub struct RawEvent {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(rename = "replyToken")]
    pub reply_token: Option<String>,
    pub source: Option<RawSource>,
    pub message: Option<RawMessage>,
}

#[derive(Debug, Deserialize)]
pub struct RawSource {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawMessage {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub text: Option<String>,
}

/// Cap outbound text at [`MAX_MESSAGE_CHARS`], appending a marker when
/// anything was cut. Operates on characters, never mid-codepoint.
pub fn truncate_message(text: &str) -> String {
    if text.chars().count() <= MAX_MESSAGE_CHARS {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(MAX_MESSAGE_CHARS - 1).collect();
    truncated.push(TRUNCATION_MARKER);
    truncated
}
