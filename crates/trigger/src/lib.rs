#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Weave Trigger
//!
//! The Trigger Dispatcher : registers triggers on workflow
//! activation, authenticates and ingests webhook requests, evaluates
//! cron-based schedules, and brokers `Execute Workflow` sub-executions —
//! the only place in the workspace an external stimulus turns into a
//! `POST /executions`-equivalent call against `weave-facade`.

/// Webhook request authentication (`httpBasicAuth`, `httpHeaderAuth`,
/// `webhookQueryAuth`), constant-time throughout.
pub mod auth;
/// The dispatcher: registration, ingestion, and sub-execution.
pub mod dispatcher;
/// Cron-based schedule evaluation.
pub mod schedule;
/// Parsing a trigger row's type-specific settings JSON.
pub mod settings;
/// Webhook request/response shapes.
pub mod webhook;

pub use auth::WebhookRequest;
pub use dispatcher::TriggerDispatcher;
pub use settings::{ScheduleTriggerSettings, WebhookAuthentication, WebhookTriggerSettings};
pub use webhook::{build_trigger_data, WebhookIngestResult};
