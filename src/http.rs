//! HTTP surface: sensor ingest/query and the chat webhook.
//!
//! The webhook acknowledges receipt immediately; each parsed event is
//! processed in its own spawned task.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::chat::{ChatEvent, WebhookPayload};
use crate::error::Error;
use crate::events;
use crate::sensor::SensorReading;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/sensor", get(current_reading).post(ingest_reading))
        .route("/webhook", post(receive_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Ingest payload; fields are optional at the wire level so a missing one
/// maps to a 400 instead of a deserialization rejection.
#[derive(Debug, Deserialize)]
struct SensorIngest {
    light: Option<f64>,
    temperature: Option<f64>,
    humidity: Option<f64>,
}

async fn ingest_reading(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SensorIngest>,
) -> Result<StatusCode, Error> {
    let reading = SensorReading::try_from_parts(body.light, body.temperature, body.humidity)?;
    state.set_reading(reading).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn current_reading(State(state): State<Arc<AppState>>) -> Response {
    match state.latest_reading().await {
        Some(reading) => Json(reading).into_response(),
        None => (StatusCode::NOT_FOUND, "no sensor reading ingested yet").into_response(),
    }
}

async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<WebhookPayload>,
) -> StatusCode {
    for raw in payload.events {
        match ChatEvent::from_raw(raw) {
            Some(event) => {
                tokio::spawn(events::process_event(Arc::clone(&state), event));
            }
            None => warn!("dropping webhook event without token or sender"),
        }
    }
    StatusCode::OK
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
