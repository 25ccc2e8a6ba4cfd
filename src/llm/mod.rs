//! Completion-API call path.
//!
//! Everything that talks to the completion service goes through one
//! [`Orchestrator`]: cache lookup first, then a slot on the shared
//! [`CallQueue`], then a [`RetryPolicy`]-wrapped call on the transport.

pub mod cache;
pub mod limiter;
pub mod openai;
pub mod orchestrator;
pub mod retry;

pub use cache::{ResponseCache, fingerprint, normalize_text};
pub use limiter::CallQueue;
pub use openai::OpenAiClient;
pub use orchestrator::Orchestrator;
pub use retry::RetryPolicy;

use async_trait::async_trait;

use crate::error::Result;

/// Transport to the completion service.
///
/// Implementations classify failures: an explicit throttling signal must
/// surface as [`crate::Error::Throttled`] so the retry policy can see it;
/// anything else is terminal for the call.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}
