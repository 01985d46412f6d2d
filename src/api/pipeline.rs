// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The request pipeline: single chokepoint for every call to the platform API.
//!
//! ## Per-request flow
//!
//! 1. Attach `Authorization: Bearer <access>` from the token store
//! 2. Convert query/body keys camelCase → snake_case (raw uploads excepted)
//! 3. Send through the [`Transport`]
//! 4. Convert JSON response keys snake_case → camelCase
//! 5. On `401`, refresh once and resubmit once
//!
//! ## Refresh protocol
//!
//! ```text
//!   NORMAL ──401──▶ REFRESHING ──ok──▶ NORMAL      (request resubmitted once)
//!                       │
//!                       └──fail / no refresh token──▶ FAILED
//!                              (token store cleared, logout hook invoked)
//! ```
//!
//! At most one refresh is outstanding: concurrent `401`s attach to the same
//! in-flight future and resume once it settles.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn, Instrument};
use url::Url;
use uuid::Uuid;

use super::casing::{camelize_keys, decamelize_keys};
use super::request::{ApiRequest, ApiResponse, PendingRequest, RequestBody, ResponseBody};
use super::transport::{Transport, WireRequest, WireResponse};
use crate::error::ClientError;
use crate::models::RefreshedTokens;
use crate::storage::TokenStore;

/// Token-refresh endpoint, relative to the API base URL.
pub const REFRESH_PATH: &str = "/token/refresh/";

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Callback invoked when the session cannot be recovered.
pub type UnauthorizedHook = Arc<dyn Fn() + Send + Sync>;

/// State of the authorization-recovery state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFlowState {
    Normal,
    Refreshing,
    Failed,
}

/// Why a refresh attempt did not produce a new access token.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RefreshFailure {
    #[error("no refresh token stored")]
    MissingRefreshToken,

    #[error("refresh endpoint returned {0}")]
    Rejected(StatusCode),

    #[error("refresh request failed: {0}")]
    Transport(String),

    #[error("refresh response was invalid: {0}")]
    InvalidResponse(String),
}

type SharedRefresh = Shared<BoxFuture<'static, Result<String, RefreshFailure>>>;

/// Authenticated, casing-normalizing client for the platform API.
///
/// Cheap to clone; clones share credentials, refresh state and the logout
/// hook.
#[derive(Clone)]
pub struct RequestPipeline {
    inner: Arc<PipelineInner>,
}

struct PipelineInner {
    base_url: String,
    transport: Arc<dyn Transport>,
    tokens: Arc<dyn TokenStore>,
    flow: Mutex<AuthFlowState>,
    in_flight: Mutex<Option<SharedRefresh>>,
    on_unauthorized: RwLock<Option<UnauthorizedHook>>,
}

impl RequestPipeline {
    /// Create a pipeline rooted at `base_url` (e.g. `http://127.0.0.1:8000/api`).
    pub fn new(
        base_url: impl Into<String>,
        transport: Arc<dyn Transport>,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            inner: Arc::new(PipelineInner {
                base_url,
                transport,
                tokens,
                flow: Mutex::new(AuthFlowState::Normal),
                in_flight: Mutex::new(None),
                on_unauthorized: RwLock::new(None),
            }),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn token_store(&self) -> &Arc<dyn TokenStore> {
        &self.inner.tokens
    }

    pub fn auth_state(&self) -> AuthFlowState {
        self.inner.flow()
    }

    /// Register the callback run after an unrecoverable authorization failure.
    pub fn set_unauthorized_hook(&self, hook: UnauthorizedHook) {
        let mut slot = self
            .inner
            .on_unauthorized
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Some(hook);
    }

    /// True when a credential pair is stored.
    pub fn has_credentials(&self) -> bool {
        self.inner.tokens.get().is_some()
    }

    /// Store a freshly issued pair; subsequent requests carry it.
    pub fn install_credentials(&self, access: &str, refresh: &str) -> Result<(), ClientError> {
        self.inner.tokens.set(access, refresh)?;
        self.inner.set_flow(AuthFlowState::Normal);
        Ok(())
    }

    /// Drop the stored pair; subsequent requests go out without a bearer.
    pub fn clear_credentials(&self) {
        if let Err(e) = self.inner.tokens.clear() {
            warn!(error = %e, "failed to clear stored credentials");
        }
    }

    /// Send a request through the pipeline.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let pending = PendingRequest::new(request);
        let span = tracing::debug_span!(
            "api_request",
            request_id = %pending.request_id,
            method = %pending.request.method,
            path = %pending.request.path
        );
        self.send_pending(pending).instrument(span).await
    }

    async fn send_pending(&self, mut pending: PendingRequest) -> Result<ApiResponse, ClientError> {
        loop {
            let bearer = self.bearer_for(&pending);
            let response = self.dispatch(&pending, bearer.as_deref()).await?;

            if response.status != StatusCode::UNAUTHORIZED {
                return check_status(response);
            }
            if pending.retried || !pending.request.refresh_on_unauthorized {
                return Err(ClientError::AuthorizationExpired {
                    method: pending.request.method.clone(),
                    path: pending.request.path.clone(),
                    body: response.body.to_value(),
                });
            }

            debug!("authorization expired, recovering");
            let access = self.recover_authorization(bearer.as_deref()).await?;
            pending = pending.into_retry(access);
        }
    }

    fn bearer_for(&self, pending: &PendingRequest) -> Option<String> {
        if !pending.request.authenticated {
            return None;
        }
        pending
            .bearer_override
            .clone()
            .or_else(|| self.inner.tokens.get().map(|pair| pair.access_token))
    }

    /// Obtain a usable access token after a `401`, refreshing if nobody else
    /// already has.
    async fn recover_authorization(&self, stale: Option<&str>) -> Result<String, ClientError> {
        match self.inner.tokens.get() {
            // A concurrent refresh (or a new login) already replaced the
            // credential this request was sent with.
            Some(pair) if stale != Some(pair.access_token.as_str()) => {
                debug!("credential replaced while request was in flight, retrying");
                return Ok(pair.access_token);
            }
            None if self.inner.flow() == AuthFlowState::Failed => {
                return Err(ClientError::SessionInvalidated {
                    reason: "session already invalidated".to_string(),
                });
            }
            _ => {}
        }

        match self.shared_refresh().await {
            Ok(access) => Ok(access),
            Err(failure) => match self.inner.tokens.get() {
                // The refresh failed for a pair that a new login has replaced.
                Some(pair) if stale != Some(pair.access_token.as_str()) => Ok(pair.access_token),
                _ => Err(ClientError::SessionInvalidated {
                    reason: failure.to_string(),
                }),
            },
        }
    }

    /// The in-flight refresh, starting one if none is running.
    fn shared_refresh(&self) -> SharedRefresh {
        let mut slot = self
            .inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = slot.as_ref() {
            debug!("joining in-flight token refresh");
            return existing.clone();
        }

        self.inner.set_flow(AuthFlowState::Refreshing);
        let inner = Arc::clone(&self.inner);
        let refresh = async move { inner.run_refresh().await }.boxed().shared();
        *slot = Some(refresh.clone());
        refresh
    }

    async fn dispatch(
        &self,
        pending: &PendingRequest,
        bearer: Option<&str>,
    ) -> Result<ApiResponse, ClientError> {
        let request = &pending.request;
        let passthrough = request.is_passthrough();

        let mut url = self.inner.url_for(&request.path)?;
        if let Some(query) = &request.query {
            let query = if passthrough {
                query.clone()
            } else {
                decamelize_keys(query.clone())
            };
            append_query(&mut url, &query)?;
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Ok(value) = HeaderValue::from_str(&pending.request_id.to_string()) {
            headers.insert(REQUEST_ID_HEADER, value);
        }

        let body = match &request.body {
            Some(RequestBody::Json(value)) => {
                let value = if passthrough {
                    value.clone()
                } else {
                    decamelize_keys(value.clone())
                };
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                Some(serde_json::to_vec(&value).map_err(|e| {
                    ClientError::InvalidRequest(format!("failed to encode body: {e}"))
                })?)
            }
            Some(RequestBody::Raw {
                content_type,
                bytes,
            }) => {
                let value = HeaderValue::from_str(content_type).map_err(|_| {
                    ClientError::InvalidRequest(format!("invalid content type: {content_type}"))
                })?;
                headers.insert(CONTENT_TYPE, value);
                Some(bytes.clone())
            }
            None => None,
        };

        for (name, value) in &request.headers {
            headers.insert(name.clone(), value.clone());
        }

        if let Some(token) = bearer {
            // A caller-supplied Authorization header wins, except on the retry.
            if pending.retried || !request.headers.contains_key(AUTHORIZATION) {
                let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                    ClientError::InvalidRequest("access token is not a valid header value".into())
                })?;
                headers.insert(AUTHORIZATION, value);
            }
        }

        debug!(retried = pending.retried, authorized = bearer.is_some(), "sending request");
        let wire = self
            .inner
            .transport
            .execute(WireRequest {
                method: request.method.clone(),
                url,
                headers,
                body,
            })
            .await
            .map_err(|e| {
                warn!(error = %e, "request failed before a response was received");
                ClientError::NetworkFailure(e.to_string())
            })?;

        debug!(status = %wire.status, "response received");
        Ok(decode_response(wire))
    }

    // ========== Typed Helpers ==========

    /// `GET` and deserialize the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send(ApiRequest::get(path)).await?.json()
    }

    /// `POST` a serializable body and deserialize the JSON response.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(ApiRequest::post(path).json(to_value(body)?))
            .await?
            .json()
    }

    /// `PUT` a serializable body and deserialize the JSON response.
    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(ApiRequest::put(path).json(to_value(body)?))
            .await?
            .json()
    }

    /// `PATCH` a serializable body and deserialize the JSON response.
    pub async fn patch_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(ApiRequest::patch(path).json(to_value(body)?))
            .await?
            .json()
    }

    /// `DELETE`, discarding any body.
    pub async fn delete(&self, path: &str) -> Result<(), ClientError> {
        self.send(ApiRequest::delete(path)).await.map(|_| ())
    }
}

impl PipelineInner {
    fn flow(&self) -> AuthFlowState {
        *self.flow.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_flow(&self, state: AuthFlowState) {
        *self.flow.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn url_for(&self, path: &str) -> Result<Url, ClientError> {
        let raw = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        };
        Url::parse(&raw).map_err(|e| ClientError::InvalidRequest(format!("invalid URL {raw}: {e}")))
    }

    /// Body of the shared refresh future. Runs once per refresh, whoever
    /// polls it.
    async fn run_refresh(self: Arc<Self>) -> Result<String, RefreshFailure> {
        let used_refresh = self.tokens.refresh_token();
        let outcome = match used_refresh.as_deref() {
            Some(refresh) => self.request_new_tokens(refresh).await,
            None => Err(RefreshFailure::MissingRefreshToken),
        };

        let mut session_ended = false;
        match &outcome {
            Ok(tokens) => {
                if let Some(used) = used_refresh.as_deref() {
                    self.store_refreshed(used, tokens);
                }
                self.set_flow(AuthFlowState::Normal);
                info!(rotated = tokens.refresh.is_some(), "access token refreshed");
            }
            Err(failure) if self.pair_unchanged(used_refresh.as_deref()) => {
                warn!(reason = %failure, "token refresh failed, ending session");
                if let Err(e) = self.tokens.clear() {
                    warn!(error = %e, "failed to clear stored credentials");
                }
                self.set_flow(AuthFlowState::Failed);
                session_ended = true;
            }
            Err(failure) => {
                debug!(reason = %failure, "refresh failed for replaced credentials, keeping new session");
                self.set_flow(AuthFlowState::Normal);
            }
        }

        *self.in_flight.lock().unwrap_or_else(PoisonError::into_inner) = None;

        if session_ended {
            self.notify_unauthorized();
        }
        outcome.map(|tokens| tokens.access)
    }

    /// True when the stored pair is still the one a refresh started from, or
    /// nothing is stored.
    fn pair_unchanged(&self, used_refresh: Option<&str>) -> bool {
        match (self.tokens.get(), used_refresh) {
            (None, _) => true,
            (Some(pair), Some(used)) => pair.refresh_token == used,
            (Some(_), None) => false,
        }
    }

    async fn request_new_tokens(&self, refresh: &str) -> Result<RefreshedTokens, RefreshFailure> {
        let url = self
            .url_for(REFRESH_PATH)
            .map_err(|e| RefreshFailure::InvalidResponse(e.to_string()))?;
        let body = serde_json::to_vec(&json!({ "refresh": refresh }))
            .map_err(|e| RefreshFailure::InvalidResponse(e.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Ok(value) = HeaderValue::from_str(&Uuid::new_v4().to_string()) {
            headers.insert(REQUEST_ID_HEADER, value);
        }

        let response = self
            .transport
            .execute(WireRequest {
                method: Method::POST,
                url,
                headers,
                body: Some(body),
            })
            .await
            .map_err(|e| RefreshFailure::Transport(e.to_string()))?;

        if !response.status.is_success() {
            return Err(RefreshFailure::Rejected(response.status));
        }

        let tokens: RefreshedTokens = serde_json::from_slice(&response.body)
            .map_err(|e| RefreshFailure::InvalidResponse(e.to_string()))?;
        if tokens.access.trim().is_empty() {
            return Err(RefreshFailure::InvalidResponse(
                "refresh response did not include an access token".to_string(),
            ));
        }

        Ok(tokens)
    }

    /// Persist refreshed tokens unless the pair changed while the refresh
    /// was running (logout, or a new login).
    fn store_refreshed(&self, used_refresh: &str, tokens: &RefreshedTokens) {
        let still_current = self
            .tokens
            .get()
            .is_some_and(|pair| pair.refresh_token == used_refresh);
        if !still_current {
            debug!("credentials changed during refresh, not storing refreshed token");
            return;
        }

        let stored = match &tokens.refresh {
            Some(rotated) => self.tokens.set(&tokens.access, rotated),
            None => self.tokens.update_access(&tokens.access),
        };
        if let Err(e) = stored {
            warn!(error = %e, "failed to persist refreshed access token");
        }
    }

    fn notify_unauthorized(&self) {
        let hook = self
            .on_unauthorized
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(hook) = hook {
            hook();
        }
    }
}

fn to_value<B: Serialize + ?Sized>(body: &B) -> Result<Value, ClientError> {
    serde_json::to_value(body)
        .map_err(|e| ClientError::InvalidRequest(format!("failed to encode body: {e}")))
}

fn append_query(url: &mut Url, query: &Value) -> Result<(), ClientError> {
    let Value::Object(map) = query else {
        return Err(ClientError::InvalidRequest(
            "query parameters must be a JSON object".to_string(),
        ));
    };

    let mut pairs = Vec::new();
    for (key, value) in map {
        match value {
            Value::Array(items) => {
                for item in items {
                    if let Some(item) = query_scalar(item) {
                        pairs.push((key.as_str(), item));
                    }
                }
            }
            other => {
                if let Some(value) = query_scalar(other) {
                    pairs.push((key.as_str(), value));
                }
            }
        }
    }

    if !pairs.is_empty() {
        let mut serializer = url.query_pairs_mut();
        for (key, value) in pairs {
            serializer.append_pair(key, &value);
        }
    }
    Ok(())
}

fn query_scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|media| media.trim().eq_ignore_ascii_case("application/json"))
}

fn decode_response(wire: WireResponse) -> ApiResponse {
    let WireResponse {
        status,
        headers,
        body,
    } = wire;

    let body = if is_json(&headers) {
        if body.iter().all(u8::is_ascii_whitespace) {
            ResponseBody::Json(Value::Null)
        } else {
            match serde_json::from_slice::<Value>(&body) {
                Ok(value) => ResponseBody::Json(camelize_keys(value)),
                Err(e) => {
                    debug!(error = %e, "JSON-typed response did not parse, keeping raw body");
                    ResponseBody::Raw(body)
                }
            }
        }
    } else {
        ResponseBody::Raw(body)
    };

    ApiResponse {
        status,
        headers,
        body,
    }
}

fn check_status(response: ApiResponse) -> Result<ApiResponse, ClientError> {
    let status = response.status;
    if status.is_success() {
        Ok(response)
    } else if status.is_client_error() {
        Err(ClientError::ValidationRejected {
            status,
            body: response.body.to_value(),
        })
    } else {
        Err(ClientError::UnexpectedStatus {
            status,
            body: response.body.to_value(),
        })
    }
}
