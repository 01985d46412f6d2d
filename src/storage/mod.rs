// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Credential Storage
//!
//! Durable storage for the single [`CredentialPair`] the client holds. The
//! rest of the crate only sees the [`TokenStore`] trait, so the medium can be
//! swapped without touching the request pipeline or the session manager.
//!
//! ## Backends
//!
//! - [`MemoryTokenStore`] - process-local, lost on exit
//! - [`FileTokenStore`] - JSON document on disk, survives restarts
//!
//! ## Storage Layout
//!
//! ```text
//! {TOKEN_STORE_PATH}
//!   { "accessToken": "...", "refreshToken": "..." }
//! ```

pub mod file_store;
pub mod token_store;

pub use file_store::FileTokenStore;
pub use token_store::{CredentialPair, MemoryTokenStore, TokenStore};

/// Error type for credential storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Storage medium is not available (poisoned lock, missing mount)
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
