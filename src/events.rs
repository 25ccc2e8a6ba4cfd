//! Inbound chat event processing.
//!
//! Per-event state machine:
//!
//! ```text
//! received -> [rejected: duplicate token]
//! received -> admitted -> classified -> {direct-reply | ai-reply}
//!          -> delivered -> pending record cleared
//! ```
//!
//! Admission and pending-record creation are one atomic insert, so at
//! most one processing attempt runs per delivery token. The pending
//! record is cleared exactly once at the end, whichever branch ran; a
//! clearing failure is logged and accepted (the token may be reprocessed
//! if the platform redelivers it).

use std::sync::Arc;

use tracing::{debug, warn};

use crate::chat::ChatEvent;
use crate::error::{Error, Result};
use crate::llm::normalize_text;
use crate::report;
use crate::state::AppState;
use crate::store::PendingReply;

/// Questions the model path answers. Anything else gets a direct status
/// summary without spending a completion call.
const SUPPORTED_QUESTIONS: &[&str] = &[
    report::DRYING_QUESTION,
    "ตากผ้าได้ไหม",
    "should i dry clothes now",
    "is it a good time to dry laundry",
];

/// Terminal entry point for one event; never leaves a dangling failure.
pub async fn process_event(state: Arc<AppState>, event: ChatEvent) {
    let token = event.delivery_token().to_string();
    match handle_event(&state, &event).await {
        Ok(()) => debug!(%token, "event handled"),
        Err(Error::DuplicateDelivery(_)) => debug!(%token, "duplicate delivery skipped"),
        Err(err) => warn!(%token, %err, "event processing failed"),
    }
}

async fn handle_event(state: &AppState, event: &ChatEvent) -> Result<()> {
    let pending = PendingReply::new(
        event.delivery_token(),
        event.user_id(),
        event.kind(),
        event.text(),
    );
    if !state.store.insert_pending(&pending).await? {
        return Err(Error::DuplicateDelivery(pending.delivery_token));
    }

    if let Err(err) = state.store.ensure_user(event.user_id()).await {
        warn!(user_id = event.user_id(), %err, "failed to record user");
    }

    let outcome = respond(state, event).await;

    if let Err(err) = state.store.delete_pending(pending.id).await {
        warn!(
            token = %pending.delivery_token,
            %err,
            "failed to clear pending reply; token may be reprocessed on redelivery"
        );
    }
    outcome
}

async fn respond(state: &AppState, event: &ChatEvent) -> Result<()> {
    let Some(reading) = state.latest_reading().await else {
        return state.chat.reply(event.delivery_token(), &report::no_data_message()).await;
    };

    let (token, user_id, text) = match event {
        ChatEvent::Text { delivery_token, user_id, text } => (delivery_token, user_id, text),
        ChatEvent::Other { delivery_token, .. } => {
            return state.chat.reply(delivery_token, &report::status_report(&reading)).await;
        }
    };

    if !is_supported_question(text) {
        return state.chat.reply(token, &report::status_report(&reading)).await;
    }

    state.chat.reply(token, &report::ack_message()).await?;

    match state.orchestrator.answer(text, &reading).await {
        Ok(answer) if !answer.trim().is_empty() => {
            state.chat.push(user_id, &report::answer_reply(text, &answer)).await
        }
        Ok(_) => {
            warn!(%token, "model returned an empty answer");
            state.chat.push(user_id, &report::failure_notice()).await
        }
        Err(err) => {
            warn!(%token, %err, "completion path failed, sending failure notice");
            state.chat.push(user_id, &report::failure_notice()).await?;
            Err(err)
        }
    }
}

fn is_supported_question(text: &str) -> bool {
    let normalized = normalize_text(text);
    SUPPORTED_QUESTIONS.contains(&normalized.as_str())
}
