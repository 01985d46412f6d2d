// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Crate-wide error type.
//!
//! ## Taxonomy
//!
//! | Variant | Raised when | Recovery |
//! |---------|-------------|----------|
//! | `InvalidCredentials` | token issuance rejected the identifier/secret | surface message, no state change |
//! | `AuthorizationExpired` | a request came back `401` | refresh protocol, else escalates |
//! | `SessionInvalidated` | refresh failed or no refresh token | forced logout + redirect |
//! | `NetworkFailure` | transport error or timeout | surface, never retried |
//! | `ValidationRejected` | any other `4xx` | surface body verbatim |

use reqwest::{Method, StatusCode};
use serde_json::Value;

use crate::storage::StorageError;

/// Fallback shown when a rejection carries no readable message.
const GENERIC_FAILURE_MESSAGE: &str = "The request could not be completed.";

/// Fallback shown when the token endpoint rejects a login without a `detail`.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email or password.";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid credentials: {message}")]
    InvalidCredentials { message: String },

    #[error("authorization expired for {method} {path}")]
    AuthorizationExpired {
        method: Method,
        path: String,
        body: Value,
    },

    #[error("session invalidated: {reason}")]
    SessionInvalidated { reason: String },

    #[error("network failure: {0}")]
    NetworkFailure(String),

    #[error("request rejected with status {status}")]
    ValidationRejected { status: StatusCode, body: Value },

    #[error("unexpected response status {status}")]
    UnexpectedStatus { status: StatusCode, body: Value },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("token storage failed: {0}")]
    Storage(#[from] StorageError),
}

impl ClientError {
    /// HTTP status attached to the error, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::AuthorizationExpired { .. } => Some(StatusCode::UNAUTHORIZED),
            ClientError::ValidationRejected { status, .. }
            | ClientError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for errors that end the current session.
    pub fn is_session_error(&self) -> bool {
        matches!(
            self,
            ClientError::AuthorizationExpired { .. } | ClientError::SessionInvalidated { .. }
        )
    }

    /// Message suitable for display next to the form or page that failed.
    ///
    /// Server rejections prefer the `detail` field, then the flattened
    /// field errors (`{"email": ["Enter a valid email."]}`).
    pub fn user_message(&self) -> String {
        match self {
            ClientError::InvalidCredentials { message } => message.clone(),
            ClientError::SessionInvalidated { .. } | ClientError::AuthorizationExpired { .. } => {
                "Your session has ended. Please sign in again.".to_string()
            }
            ClientError::NetworkFailure(_) => {
                "The server could not be reached. Check your connection and try again."
                    .to_string()
            }
            ClientError::ValidationRejected { body, .. }
            | ClientError::UnexpectedStatus { body, .. } => {
                rejection_message(body).unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string())
            }
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

/// Extract a human-readable message from a rejection body.
pub fn rejection_message(body: &Value) -> Option<String> {
    if let Some(detail) = body.get("detail").and_then(Value::as_str) {
        if !detail.trim().is_empty() {
            return Some(detail.to_string());
        }
    }

    let mut parts = Vec::new();
    collect_messages(body, &mut parts);
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

fn collect_messages(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) if !s.trim().is_empty() => out.push(s.trim().to_string()),
        Value::Array(items) => items.iter().for_each(|item| collect_messages(item, out)),
        Value::Object(map) => map.values().for_each(|item| collect_messages(item, out)),
        _ => {}
    }
}
