//! Parsing the type-specific JSON blob stored on a [`weave_persistence::TriggerRow`]
//! (`triggers.settings JSON`).

use weave_core::CredentialId;
use weave_error::{EngineError, EngineResult};

/// How a webhook route authenticates an inbound request.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookAuthentication {
    /// `authentication: "none"` or the field absent entirely.
    None,
    /// `authentication: "<credentialId>"` — resolved via the Credential
    /// Resolver at request time.
    Credential(CredentialId),
    /// Backward-compatible inline shape: `{ authentication: "basic",
    /// username, password }`. Normalized to behave exactly like a
    /// `httpBasicAuth` credential, without a store round trip.
    InlineBasic { username: String, password: String },
}

/// A registered webhook's declared shape.
#[derive(Debug, Clone)]
pub struct WebhookTriggerSettings {
    /// The HTTP method this route accepts. Matched case-insensitively.
    pub http_method: String,
    /// How the request must be authenticated.
    pub authentication: WebhookAuthentication,
}

impl WebhookTriggerSettings {
    /// Parse from the raw JSON stored on the trigger row.
    pub fn parse(settings: &serde_json::Value) -> EngineResult<Self> {
        let http_method = settings
            .get("httpMethod")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("POST")
            .to_uppercase();

        let authentication = match settings.get("authentication") {
            None => WebhookAuthentication::None,
            Some(serde_json::Value::String(s)) if s == "none" => WebhookAuthentication::None,
            Some(serde_json::Value::String(s)) if s == "basic" => {
                let username = settings
                    .get("username")
                    .and_then(serde_json::Value::as_str)
                    .ok_or_else(|| {
                        EngineError::validation("inline basic auth missing username")
                    })?
                    .to_string();
                let password = settings
                    .get("password")
                    .and_then(serde_json::Value::as_str)
                    .ok_or_else(|| {
                        EngineError::validation("inline basic auth missing password")
                    })?
                    .to_string();
                WebhookAuthentication::InlineBasic { username, password }
            }
            Some(serde_json::Value::String(s)) => {
                WebhookAuthentication::Credential(CredentialId::new(s.clone()))
            }
            Some(_) => {
                return Err(EngineError::validation(
                    "authentication must be a string: a credential id, \"none\", or \"basic\"",
                ))
            }
        };

        Ok(Self {
            http_method,
            authentication,
        })
    }
}

/// A registered schedule trigger's declared shape.
#[derive(Debug, Clone)]
pub struct ScheduleTriggerSettings {
    /// Standard five-field cron expression.
    pub cron_expression: String,
    /// IANA timezone name the expression is evaluated against. Informational
    /// only: the scheduler evaluates in UTC and records this alongside each
    /// fire so a caller can re-derive local time.
    pub timezone: String,
}

impl ScheduleTriggerSettings {
    /// Parse from the raw JSON stored on the trigger row.
    pub fn parse(settings: &serde_json::Value) -> EngineResult<Self> {
        let cron_expression = settings
            .get("cronExpression")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| EngineError::validation("schedule trigger missing cronExpression"))?
            .to_string();
        let timezone = settings
            .get("timezone")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("UTC")
            .to_string();
        Ok(Self {
            cron_expression,
            timezone,
        })
    }
}
