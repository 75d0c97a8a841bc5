//! Webhook request authentication.
//!
//! Every comparison against a secret value is constant-time; every failure
//! collapses to the same [`EngineError::authentication`] without echoing the
//! expected value back to the caller.

use std::collections::HashMap;

use base64::Engine as _;
use subtle::ConstantTimeEq;
use weave_credential::{Credential, CredentialResolver};
use weave_error::{EngineError, EngineResult};

use crate::settings::WebhookAuthentication;

/// The inbound request shape the dispatcher authenticates against.
/// HTTP-framework-agnostic so `weave-api` can build one from an `axum`
/// request without this crate depending on `axum`.
#[derive(Debug, Clone, Default)]
pub struct WebhookRequest {
    /// Header names lower-cased; values as received.
    pub headers: HashMap<String, String>,
    /// Query parameters, as received.
    pub query: HashMap<String, String>,
}

fn ct_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Credential types recognized for webhook authentication.
const HTTP_BASIC_AUTH: &str = "httpBasicAuth";
const HTTP_HEADER_AUTH: &str = "httpHeaderAuth";
const WEBHOOK_QUERY_AUTH: &str = "webhookQueryAuth";

/// Validate `request` against `authentication`. `Ok` on success; any
/// failure is an [`EngineError::authentication`].
pub fn authenticate(
    authentication: &WebhookAuthentication,
    resolver: &CredentialResolver,
    request: &WebhookRequest,
) -> EngineResult<()> {
    match authentication {
        WebhookAuthentication::None => Ok(()),
        WebhookAuthentication::InlineBasic { username, password } => {
            check_basic_auth(request, username, password)
        }
        WebhookAuthentication::Credential(credential_id) => {
            let credential = resolver
                .resolve(
                    credential_id,
                    &[
                        HTTP_BASIC_AUTH.to_string(),
                        HTTP_HEADER_AUTH.to_string(),
                        WEBHOOK_QUERY_AUTH.to_string(),
                    ],
                )
                .map_err(|_| EngineError::authentication("webhook credential did not resolve"))?;
            match credential.credential_type.as_str() {
                HTTP_BASIC_AUTH => check_basic_auth_credential(request, &credential),
                HTTP_HEADER_AUTH => check_header_auth(request, &credential),
                WEBHOOK_QUERY_AUTH => check_query_auth(request, &credential),
                other => Err(EngineError::authentication(format!(
                    "unsupported webhook credential type {other}"
                ))),
            }
        }
    }
}

fn check_basic_auth(request: &WebhookRequest, expected_user: &str, expected_pass: &str) -> EngineResult<()> {
    let (user, pass) = parse_basic_auth_header(request)?;
    if ct_eq(&user, expected_user) && ct_eq(&pass, expected_pass) {
        Ok(())
    } else {
        Err(EngineError::authentication("basic auth mismatch"))
    }
}

fn check_basic_auth_credential(request: &WebhookRequest, credential: &Credential) -> EngineResult<()> {
    let expected_user = credential
        .data
        .get("username")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| EngineError::authentication("credential missing username"))?;
    let expected_pass = credential
        .data
        .get("password")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| EngineError::authentication("credential missing password"))?;
    check_basic_auth(request, expected_user, expected_pass)
}

fn parse_basic_auth_header(request: &WebhookRequest) -> EngineResult<(String, String)> {
    let header = request
        .headers
        .get("authorization")
        .ok_or_else(|| EngineError::authentication("missing Authorization header"))?;
    let encoded = header
        .strip_prefix("Basic ")
        .ok_or_else(|| EngineError::authentication("Authorization header is not Basic"))?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|_| EngineError::authentication("malformed Basic auth payload"))?;
    let decoded = String::from_utf8(decoded)
        .map_err(|_| EngineError::authentication("malformed Basic auth payload"))?;
    let (user, pass) = decoded
        .split_once(':')
        .ok_or_else(|| EngineError::authentication("malformed Basic auth payload"))?;
    Ok((user.to_string(), pass.to_string()))
}

fn check_header_auth(request: &WebhookRequest, credential: &Credential) -> EngineResult<()> {
    let header_name = credential
        .data
        .get("name")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| EngineError::authentication("credential missing header name"))?
        .to_ascii_lowercase();
    let expected_value = credential
        .data
        .get("value")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| EngineError::authentication("credential missing header value"))?;
    let actual = request
        .headers
        .get(&header_name)
        .ok_or_else(|| EngineError::authentication("missing auth header"))?;
    if ct_eq(actual, expected_value) {
        Ok(())
    } else {
        Err(EngineError::authentication("header auth mismatch"))
    }
}

fn check_query_auth(request: &WebhookRequest, credential: &Credential) -> EngineResult<()> {
    let param_name = credential
        .data
        .get("name")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| EngineError::authentication("credential missing query param name"))?;
    let expected_value = credential
        .data
        .get("value")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| EngineError::authentication("credential missing query param value"))?;
    let actual = request
        .query
        .get(param_name)
        .ok_or_else(|| EngineError::authentication("missing auth query parameter"))?;
    if ct_eq(actual, expected_value) {
        Ok(())
    } else {
        Err(EngineError::authentication("query auth mismatch"))
    }
}
