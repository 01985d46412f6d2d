// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token store contract and the in-memory backend.

use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use super::{StorageError, StorageResult};

/// Access and refresh token held for the signed-in account.
///
/// Serialized under the two well-known keys `accessToken` and
/// `refreshToken`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl CredentialPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access_token: access.into(),
            refresh_token: refresh.into(),
        }
    }

    /// A pair with a blank access token is treated as absent.
    pub fn is_usable(&self) -> bool {
        !self.access_token.trim().is_empty()
    }
}

// Tokens never reach logs.
impl std::fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Durable storage for the credential pair.
///
/// Access is synchronous. A medium that cannot be read reports `None` from
/// [`TokenStore::get`]; callers treat that as "no credentials".
pub trait TokenStore: Send + Sync {
    /// Current credential pair, if any.
    fn get(&self) -> Option<CredentialPair>;

    /// Replace the stored pair.
    fn set(&self, access: &str, refresh: &str) -> StorageResult<()>;

    /// Remove the stored pair. Clearing an empty store is not an error.
    fn clear(&self) -> StorageResult<()>;

    /// Replace only the access token, keeping the refresh token.
    ///
    /// Does nothing when no pair is stored.
    fn update_access(&self, access: &str) -> StorageResult<()> {
        match self.get() {
            Some(pair) => self.set(access, &pair.refresh_token),
            None => Ok(()),
        }
    }

    /// Refresh token of the current pair, if any.
    fn refresh_token(&self) -> Option<String> {
        self.get()
            .map(|pair| pair.refresh_token)
            .filter(|token| !token.trim().is_empty())
    }
}

/// Process-local token store.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    pair: RwLock<Option<CredentialPair>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a pair (useful for testing).
    pub fn with_pair(access: &str, refresh: &str) -> Self {
        Self {
            pair: RwLock::new(Some(CredentialPair::new(access, refresh))),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<CredentialPair> {
        self.pair
            .read()
            .ok()?
            .clone()
            .filter(CredentialPair::is_usable)
    }

    fn set(&self, access: &str, refresh: &str) -> StorageResult<()> {
        let mut pair = self
            .pair
            .write()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        *pair = Some(CredentialPair::new(access, refresh));
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        let mut pair = self
            .pair
            .write()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        *pair = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_store_has_no_credentials() {
        let store = MemoryTokenStore::new();
        assert!(store.get().is_none());
        assert!(store.refresh_token().is_none());
    }

    #[test]
    fn set_get_clear() {
        let store = MemoryTokenStore::new();
        store.set("T1", "R1").unwrap();
        assert_eq!(store.get(), Some(CredentialPair::new("T1", "R1")));

        store.clear().unwrap();
        assert!(store.get().is_none());
        // Clearing twice is fine.
        store.clear().unwrap();
    }

    #[test]
    fn update_access_keeps_refresh_token() {
        let store = MemoryTokenStore::with_pair("T1", "R1");
        store.update_access("T2").unwrap();
        assert_eq!(store.get(), Some(CredentialPair::new("T2", "R1")));
    }

    #[test]
    fn update_access_on_empty_store_is_noop() {
        let store = MemoryTokenStore::new();
        store.update_access("T2").unwrap();
        assert!(store.get().is_none());
    }

    #[test]
    fn blank_access_token_reads_as_absent() {
        let store = MemoryTokenStore::with_pair("  ", "R1");
        assert!(store.get().is_none());
    }

    #[test]
    fn debug_output_redacts_tokens() {
        let rendered = format!("{:?}", CredentialPair::new("secret-access", "secret-refresh"));
        assert!(!rendered.contains("secret"));
    }
}
