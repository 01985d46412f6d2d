// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Composition root: one pipeline, one session manager, one route table.

use std::sync::Arc;

use tracing::info;

use crate::api::{HttpTransport, RequestPipeline, Transport};
use crate::auth::{Decision, Navigator, RouteTable, SessionManager};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::storage::{FileTokenStore, MemoryTokenStore, TokenStore};

/// Process-wide client context handed to UI code.
#[derive(Clone)]
pub struct ClientState {
    pub pipeline: RequestPipeline,
    pub session: Arc<SessionManager>,
    pub routes: Arc<RouteTable>,
}

impl ClientState {
    /// Build the production stack from configuration.
    pub fn from_config(
        config: &ClientConfig,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ClientError> {
        let transport = HttpTransport::new(config.http_timeout).map_err(|e| {
            ClientError::NetworkFailure(format!("failed to initialise transport: {e}"))
        })?;

        let tokens: Arc<dyn TokenStore> = match &config.token_store_path {
            Some(path) => {
                info!(path = %path.display(), "using file token store");
                Arc::new(FileTokenStore::new(path))
            }
            None => {
                info!("using in-memory token store");
                Arc::new(MemoryTokenStore::new())
            }
        };

        Ok(Self::with_parts(
            &config.api_base_url,
            Arc::new(transport),
            tokens,
            navigator,
        ))
    }

    /// Assemble from explicit parts and wire the logout hook.
    pub fn with_parts(
        base_url: &str,
        transport: Arc<dyn Transport>,
        tokens: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let pipeline = RequestPipeline::new(base_url, transport, tokens);
        let session = SessionManager::new(pipeline.clone(), navigator);
        Self {
            pipeline,
            session,
            routes: Arc::new(RouteTable::standard()),
        }
    }

    /// Admission decision for `path` against the current session.
    pub fn authorize(&self, path: &str) -> Option<Decision> {
        self.routes.authorize(&self.session.snapshot(), path)
    }
}
