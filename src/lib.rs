//! clothesline: a notification relay between an IoT environmental
//! sensor, a chat messaging platform, and an LLM completion API.
//!
//! The relay ingests periodic sensor readings (light, temperature,
//! humidity), answers user chat questions by combining the latest reading
//! with a completion model, and periodically pushes a status report to
//! all known users. Inbound events are de-duplicated by delivery token,
//! and every completion call flows through one rate-limited queue with
//! bounded retry and a short-lived response cache.

pub mod broadcast;
pub mod chat;
pub mod config;
pub mod error;
pub mod events;
pub mod http;
pub mod llm;
pub mod report;
pub mod sensor;
pub mod state;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};
pub use state::AppState;
