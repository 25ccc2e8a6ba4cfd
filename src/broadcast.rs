//! Periodic status broadcast.
//!
//! Every tick, pushes a report to all known users. The advice line goes
//! through the orchestrator (the same global call queue the chat path
//! uses) and falls back to the plain summary when the model path fails,
//! so a throttled completion API never silences the broadcast.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::report;
use crate::state::AppState;

pub async fn run(state: Arc<AppState>, interval: Duration) {
    info!(interval_secs = interval.as_secs(), "broadcast loop started");
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick fires immediately; skip it so a fresh start does not
    // broadcast before any sensor data can arrive.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if let Err(err) = broadcast_once(&state).await {
            warn!(%err, "broadcast sweep failed");
        }
    }
}

/// One sweep: build the report, push it to every known user.
pub async fn broadcast_once(state: &AppState) -> Result<usize> {
    let Some(reading) = state.latest_reading().await else {
        debug!("no sensor reading yet, skipping broadcast");
        return Ok(0);
    };
    let users = state.store.list_users().await?;
    if users.is_empty() {
        debug!("no known users, skipping broadcast");
        return Ok(0);
    }

    let advice = match state.orchestrator.answer(report::DRYING_QUESTION, &reading).await {
        Ok(answer) if !answer.trim().is_empty() => Some(answer),
        Ok(_) => None,
        Err(err) => {
            warn!(%err, "advice unavailable, broadcasting plain summary");
            None
        }
    };
    let message = report::broadcast_report(&reading, advice.as_deref());

    let mut delivered = 0;
    for user in &users {
        match state.chat.push(&user.user_id, &message).await {
            Ok(()) => delivered += 1,
            Err(err) => warn!(user_id = %user.user_id, %err, "broadcast push failed"),
        }
    }
    info!(delivered, total = users.len(), "broadcast sweep complete");
    Ok(delivered)
}
