// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Manager
//!
//! Sole writer of [`SessionState`]. Everything else observes it through
//! [`SessionManager::subscribe`] or [`SessionManager::snapshot`].
//!
//! ## Lifecycle
//!
//! ```text
//!   loading ──bootstrap ok──▶ authenticated ◀──login──┐
//!      │                           │                  │
//!      └──no creds / failure──▶ anonymous ◀──logout───┘
//! ```
//!
//! ## Ordering
//!
//! A successful token issuance and each `logout` bump a generation counter. Results of an
//! operation are published only if the generation it started under is still
//! current, so a logout during an in-flight login cannot be overwritten by
//! the login's late result.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::gate::LOGIN_PATH;
use super::navigator::Navigator;
use super::roles::Role;
use crate::api::{ApiRequest, RequestPipeline};
use crate::error::{rejection_message, ClientError, INVALID_CREDENTIALS_MESSAGE};
use crate::models::{IssuedTokens, TokenRequest, User};

/// Token-issuance endpoint.
pub const TOKEN_PATH: &str = "/token/";
/// Current-user endpoint.
pub const CURRENT_USER_PATH: &str = "/users/me/";

/// Who is signed in right now.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub is_authenticated: bool,
    pub current_user: Option<User>,
    pub is_loading: bool,
}

/// Coarse view of [`SessionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Loading,
    Authenticated,
    Anonymous,
}

impl SessionState {
    /// Initial state, before bootstrap finishes.
    pub fn loading() -> Self {
        Self {
            is_authenticated: false,
            current_user: None,
            is_loading: true,
        }
    }

    pub fn anonymous() -> Self {
        Self {
            is_authenticated: false,
            current_user: None,
            is_loading: false,
        }
    }

    pub fn authenticated(user: User) -> Self {
        Self {
            is_authenticated: true,
            current_user: Some(user),
            is_loading: false,
        }
    }

    pub fn status(&self) -> SessionStatus {
        if self.is_loading {
            SessionStatus::Loading
        } else if self.is_authenticated && self.current_user.is_some() {
            SessionStatus::Authenticated
        } else {
            SessionStatus::Anonymous
        }
    }

    /// Role of the signed-in user, if any.
    pub fn current_role(&self) -> Option<Role> {
        self.current_user
            .as_ref()
            .filter(|_| self.is_authenticated)
            .map(|user| user.role)
    }
}

/// Owns the session lifecycle: bootstrap, login, logout, user refresh.
pub struct SessionManager {
    pipeline: RequestPipeline,
    navigator: Arc<dyn Navigator>,
    state: watch::Sender<SessionState>,
    generation: AtomicU64,
    bootstrapped: AtomicBool,
}

impl SessionManager {
    /// Create the manager and register it as the pipeline's logout hook.
    pub fn new(pipeline: RequestPipeline, navigator: Arc<dyn Navigator>) -> Arc<Self> {
        let (state, _) = watch::channel(SessionState::loading());
        let manager = Arc::new(Self {
            pipeline,
            navigator,
            state,
            generation: AtomicU64::new(0),
            bootstrapped: AtomicBool::new(false),
        });

        let weak = Arc::downgrade(&manager);
        manager.pipeline.set_unauthorized_hook(Arc::new(move || {
            if let Some(manager) = weak.upgrade() {
                info!("session could not be recovered, signing out");
                manager.logout();
            }
        }));

        manager
    }

    pub fn pipeline(&self) -> &RequestPipeline {
        &self.pipeline
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Restore the session from stored credentials.
    ///
    /// Runs once per manager; later calls return the current state without
    /// touching the network.
    pub async fn bootstrap(&self) -> SessionState {
        if self.bootstrapped.swap(true, Ordering::SeqCst) {
            debug!("session bootstrap already ran");
            return self.snapshot();
        }

        let generation = self.current_generation();
        if !self.pipeline.has_credentials() {
            info!("no stored credentials, starting anonymous");
            self.publish(generation, SessionState::anonymous());
            self.finish_loading();
            return self.snapshot();
        }

        debug!("validating stored credentials");
        match self.fetch_current_user().await {
            Ok(user) => {
                info!(user_id = user.id, role = %user.role, "session restored");
                self.publish(generation, SessionState::authenticated(user));
            }
            Err(e) => {
                warn!(error = %e, "stored credentials could not be validated, starting anonymous");
                self.publish(generation, SessionState::anonymous());
            }
        }
        self.finish_loading();
        self.snapshot()
    }

    /// Exchange email and password for credentials and load the user.
    ///
    /// On failure the session state is left as it was.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ClientError> {
        let started = self.current_generation();

        let body = serde_json::to_value(TokenRequest { email, password })
            .map_err(|e| ClientError::InvalidRequest(format!("failed to encode login: {e}")))?;
        let response = self
            .pipeline
            .send(ApiRequest::post(TOKEN_PATH).json(body).anonymous())
            .await
            .map_err(into_login_error)?;
        let tokens: IssuedTokens = response.json()?;

        // Claim the session only once issuance succeeded; a rejected login
        // must not discard an in-flight bootstrap or refetch.
        let generation = started + 1;
        if self
            .generation
            .compare_exchange(started, generation, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("login superseded before credentials were stored");
            return Err(superseded());
        }
        self.pipeline
            .install_credentials(&tokens.access, &tokens.refresh)?;

        let user = match self.fetch_current_user().await {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "signed in but the current user could not be loaded");
                if self.is_current(generation) {
                    self.pipeline.clear_credentials();
                }
                return Err(e);
            }
        };

        if !self.publish(generation, SessionState::authenticated(user.clone())) {
            debug!("login superseded before the user was published");
            return Err(superseded());
        }

        info!(user_id = user.id, role = %user.role, "signed in");
        Ok(user)
    }

    /// End the session and send the UI to the login page.
    ///
    /// Also the pipeline's hook for unrecoverable authorization failures.
    pub fn logout(&self) {
        self.pipeline.clear_credentials();
        self.state.send_modify(|state| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            *state = SessionState::anonymous();
        });
        info!("signed out");

        let current = self.navigator.current_path();
        if current.trim_end_matches('/') != LOGIN_PATH {
            self.navigator.navigate(LOGIN_PATH);
        }
    }

    /// Reload the current user, e.g. after a profile edit.
    ///
    /// A failed fetch leaves the session as it was.
    pub async fn refetch_user(&self) -> Result<User, ClientError> {
        if !self.pipeline.has_credentials() {
            return Err(ClientError::SessionInvalidated {
                reason: "not signed in".to_string(),
            });
        }

        let generation = self.current_generation();
        let user = self.fetch_current_user().await?;
        if self.publish(generation, SessionState::authenticated(user.clone())) {
            debug!(user_id = user.id, "current user reloaded");
        }
        Ok(user)
    }

    async fn fetch_current_user(&self) -> Result<User, ClientError> {
        self.pipeline.get_json::<User>(CURRENT_USER_PATH).await
    }

    fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.current_generation() == generation
    }

    /// Replace the state if `generation` is still current.
    fn publish(&self, generation: u64, next: SessionState) -> bool {
        self.state.send_if_modified(|state| {
            if !self.is_current(generation) {
                return false;
            }
            *state = next;
            true
        })
    }

    fn finish_loading(&self) {
        self.state.send_if_modified(|state| {
            if !state.is_loading {
                return false;
            }
            state.is_loading = false;
            true
        });
    }
}

fn into_login_error(error: ClientError) -> ClientError {
    match error {
        ClientError::AuthorizationExpired { body, .. } => ClientError::InvalidCredentials {
            message: rejection_message(&body)
                .unwrap_or_else(|| INVALID_CREDENTIALS_MESSAGE.to_string()),
        },
        ClientError::ValidationRejected { status, body } if status.as_u16() == 400 => {
            ClientError::InvalidCredentials {
                message: rejection_message(&body)
                    .unwrap_or_else(|| INVALID_CREDENTIALS_MESSAGE.to_string()),
            }
        }
        other => other,
    }
}

fn superseded() -> ClientError {
    ClientError::SessionInvalidated {
        reason: "superseded by a later sign-in or sign-out".to_string(),
    }
}
