// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request and response types handled by the pipeline.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::error::ClientError;

/// Outgoing request body.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Structured payload. Keys are converted to snake_case before sending.
    Json(Value),
    /// Pre-encoded payload (multipart form, file upload). Sent unmodified.
    Raw { content_type: String, bytes: Vec<u8> },
}

/// A call to the platform API, described relative to the base URL.
///
/// ```rust,ignore
/// let request = ApiRequest::get("/courses/").query(json!({ "teacherId": 3, "page": 2 }));
/// let response = pipeline.send(request).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<Value>,
    pub body: Option<RequestBody>,
    pub headers: HeaderMap,
    /// Attach the stored bearer credential.
    pub authenticated: bool,
    /// Run the refresh protocol when the server answers `401`.
    pub refresh_on_unauthorized: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            body: None,
            headers: HeaderMap::new(),
            authenticated: true,
            refresh_on_unauthorized: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Query parameters as a JSON object.
    pub fn query(mut self, query: Value) -> Self {
        self.query = Some(query);
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    /// Pre-encoded body sent as-is with the given content type.
    pub fn raw(mut self, content_type: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.body = Some(RequestBody::Raw {
            content_type: content_type.into(),
            bytes: bytes.into(),
        });
        self
    }

    /// Header override. Takes precedence over headers the pipeline adds.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Send without credentials and without the refresh protocol.
    pub fn anonymous(mut self) -> Self {
        self.authenticated = false;
        self.refresh_on_unauthorized = false;
        self
    }

    /// Surface a `401` directly instead of refreshing.
    pub fn without_refresh(mut self) -> Self {
        self.refresh_on_unauthorized = false;
        self
    }

    /// True when the payload must pass through without key conversion.
    pub fn is_passthrough(&self) -> bool {
        if matches!(self.body, Some(RequestBody::Raw { .. })) {
            return true;
        }
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.trim().to_ascii_lowercase().starts_with("multipart/form-data"))
    }
}

/// A request in flight, carrying its retry marker explicitly.
#[derive(Debug, Clone)]
pub(crate) struct PendingRequest {
    pub request: ApiRequest,
    pub request_id: Uuid,
    /// Set once the request has been resubmitted after a refresh.
    pub retried: bool,
    /// Bearer to use instead of the stored one (set for the retry).
    pub bearer_override: Option<String>,
}

impl PendingRequest {
    pub fn new(request: ApiRequest) -> Self {
        Self {
            request,
            request_id: Uuid::new_v4(),
            retried: false,
            bearer_override: None,
        }
    }

    /// Mark for resubmission with a fresh access token.
    pub fn into_retry(mut self, access_token: String) -> Self {
        self.retried = true;
        self.bearer_override = Some(access_token);
        self
    }
}

/// Decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// JSON body with keys converted to camelCase.
    Json(Value),
    /// Any other body, untouched.
    Raw(Vec<u8>),
}

impl ResponseBody {
    /// The body as a JSON value; raw bodies become a string (or null if empty).
    pub fn to_value(&self) -> Value {
        match self {
            ResponseBody::Json(value) => value.clone(),
            ResponseBody::Raw(bytes) if bytes.is_empty() => Value::Null,
            ResponseBody::Raw(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        }
    }
}

/// Response handed back to callers of the pipeline.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ResponseBody,
}

impl ApiResponse {
    /// Deserialize the (camelCased) JSON body.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        match &self.body {
            ResponseBody::Json(value) => serde_json::from_value(value.clone())
                .map_err(|e| ClientError::InvalidResponse(format!("unexpected body shape: {e}"))),
            ResponseBody::Raw(_) => Err(ClientError::InvalidResponse(
                "response body is not JSON".to_string(),
            )),
        }
    }

    /// Raw body bytes (JSON bodies are re-serialized).
    pub fn bytes(&self) -> Vec<u8> {
        match &self.body {
            ResponseBody::Raw(bytes) => bytes.clone(),
            ResponseBody::Json(value) => serde_json::to_vec(value).unwrap_or_default(),
        }
    }
}
