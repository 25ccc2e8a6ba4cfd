//! Completion orchestration: cache, queue, retry, transport.
//!
//! `answer` is the single operation every consumer uses. A cache hit
//! returns immediately and consumes no rate-limit slot. On a miss the
//! call takes a slot on the shared queue, retries throttles inside that
//! slot, and only a real (non-empty) model answer is cached. Failures
//! propagate: fabricating fallback text is the caller's job, so cache
//! semantics stay "only real model answers get cached".

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::cache::{ResponseCache, fingerprint};
use super::limiter::CallQueue;
use super::retry::RetryPolicy;
use super::CompletionClient;
use crate::error::Result;
use crate::sensor::SensorReading;

const MAX_PROMPT_QUESTION_CHARS: usize = 280;

pub struct Orchestrator {
    cache: ResponseCache,
    queue: CallQueue,
    retry: RetryPolicy,
    client: Arc<dyn CompletionClient>,
}

impl Orchestrator {
    /// Build the orchestrator and start its call queue. Must be called
    /// within a tokio runtime.
    pub fn new(
        client: Arc<dyn CompletionClient>,
        requests_per_minute: u32,
        max_retries: u32,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            cache: ResponseCache::new(cache_ttl),
            queue: CallQueue::new(requests_per_minute),
            retry: RetryPolicy::new(max_retries),
            client,
        }
    }

    /// Answer `question` given the current `reading`.
    pub async fn answer(&self, question: &str, reading: &SensorReading) -> Result<String> {
        let key = fingerprint(question, reading);
        if let Some(cached) = self.cache.get(&key) {
            debug!(%key, "cache hit, skipping completion call");
            return Ok(cached);
        }

        let prompt = build_prompt(question, reading);
        let client = Arc::clone(&self.client);
        let retry = self.retry;
        let answer = self
            .queue
            .schedule(move || async move {
                retry
                    .execute(|| {
                        let client = Arc::clone(&client);
                        let prompt = prompt.clone();
                        async move { client.complete(&prompt).await }
                    })
                    .await
            })
            .await?;

        if !answer.trim().is_empty() {
            self.cache.put(&key, &answer);
        }
        Ok(answer)
    }
}

fn build_prompt(question: &str, reading: &SensorReading) -> String {
    let question: String = question.trim().chars().take(MAX_PROMPT_QUESTION_CHARS).collect();
    format!(
        "The latest balcony sensor reading: light {:.0} lux, temperature {:.1} degrees Celsius, \
         relative humidity {:.1} percent. Answer the resident's question in one or two short \
         sentences, in the language of the question.\nQuestion: {question}",
        reading.light, reading.temperature, reading.humidity,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    struct CountingClient {
        calls: AtomicU32,
        throttle_first: u32,
    }

    impl CountingClient {
        fn new() -> Self {
            Self { calls: AtomicU32::new(0), throttle_first: 0 }
        }

        fn throttling(throttle_first: u32) -> Self {
            Self { calls: AtomicU32::new(0), throttle_first }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionClient for CountingClient {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.throttle_first {
                return Err(Error::Throttled { retry_after: None });
            }
            // Different text on every literal call, so a repeated answer
            // proves the cache served it.
            Ok(format!("answer-{}", n + 1))
        }
    }

    fn orchestrator(client: Arc<CountingClient>) -> Orchestrator {
        Orchestrator::new(client, 600, 3, Duration::from_secs(120))
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_question_within_ttl_is_served_from_cache() {
        let client = Arc::new(CountingClient::new());
        let orchestrator = orchestrator(Arc::clone(&client));
        let reading = SensorReading { light: 20_000.0, temperature: 32.0, humidity: 55.0 };

        let first = orchestrator.answer("ตอนนี้ควรตากผ้าไหม", &reading).await.unwrap();
        let second = orchestrator.answer("ตอนนี้ควรตากผ้าไหม", &reading).await.unwrap();

        assert_eq!(first, "answer-1");
        assert_eq!(second, first);
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rounded_equivalent_readings_share_a_slot() {
        let client = Arc::new(CountingClient::new());
        let orchestrator = orchestrator(Arc::clone(&client));

        let a = SensorReading { light: 20_000.2, temperature: 31.8, humidity: 55.4 };
        let b = SensorReading { light: 20_000.0, temperature: 32.0, humidity: 55.0 };
        let first = orchestrator.answer("dry?", &a).await.unwrap();
        let second = orchestrator.answer("DRY", &b).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn changed_conditions_trigger_a_fresh_call() {
        let client = Arc::new(CountingClient::new());
        let orchestrator = orchestrator(Arc::clone(&client));

        let a = SensorReading { light: 20_000.0, temperature: 32.0, humidity: 55.0 };
        let b = SensorReading { light: 300.0, temperature: 32.0, humidity: 55.0 };
        orchestrator.answer("dry?", &a).await.unwrap();
        orchestrator.answer("dry?", &b).await.unwrap();

        assert_eq!(client.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn throttles_are_retried_inside_the_call_slot() {
        let client = Arc::new(CountingClient::throttling(2));
        let orchestrator = orchestrator(Arc::clone(&client));
        let reading = SensorReading { light: 100.0, temperature: 25.0, humidity: 60.0 };

        let answer = orchestrator.answer("dry?", &reading).await.unwrap();
        assert_eq!(answer, "answer-3");
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_not_cached() {
        struct FailingOnce {
            calls: AtomicU32,
        }

        #[async_trait]
        impl CompletionClient for FailingOnce {
            async fn complete(&self, _prompt: &str) -> Result<String> {
                if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(Error::Unavailable("bad gateway".into()))
                } else {
                    Ok("recovered".into())
                }
            }
        }

        let client = Arc::new(FailingOnce { calls: AtomicU32::new(0) });
        let orchestrator = Orchestrator::new(Arc::clone(&client) as Arc<dyn CompletionClient>, 600, 3, Duration::from_secs(120));
        let reading = SensorReading { light: 100.0, temperature: 25.0, humidity: 60.0 };

        assert!(orchestrator.answer("dry?", &reading).await.is_err());
        let answer = orchestrator.answer("dry?", &reading).await.unwrap();
        assert_eq!(answer, "recovered");
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn prompt_embeds_the_three_sensor_values_and_question() {
        let reading = SensorReading { light: 20_000.0, temperature: 32.0, humidity: 55.0 };
        let prompt = build_prompt("ตอนนี้ควรตากผ้าไหม", &reading);
        assert!(prompt.contains("20000 lux"));
        assert!(prompt.contains("32.0 degrees"));
        assert!(prompt.contains("55.0 percent"));
        assert!(prompt.ends_with("ตอนนี้ควรตากผ้าไหม"));
    }

    #[test]
    fn prompt_question_is_bounded() {
        let reading = SensorReading { light: 1.0, temperature: 1.0, humidity: 1.0 };
        let long_question = "x".repeat(10_000);
        let prompt = build_prompt(&long_question, &reading);
        assert!(prompt.chars().count() < 1000);
    }
}
