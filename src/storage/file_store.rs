// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! File-backed token store.
//!
//! The credential pair is a single JSON document. Writes go to a temp file
//! that is renamed over the target, so a crash mid-write never leaves a
//! half-written document behind.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::warn;

use super::{CredentialPair, StorageError, StorageResult, TokenStore};

/// Token store persisted to a JSON file.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    // Serializes writers within the process.
    write_lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the credentials document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_pair(&self) -> StorageResult<Option<CredentialPair>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let pair: CredentialPair = serde_json::from_reader(BufReader::new(file))?;
        Ok(Some(pair).filter(CredentialPair::is_usable))
    }

    fn write_pair(&self, pair: &CredentialPair) -> StorageResult<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = self.path.with_extension("tmp");
        {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, pair)?;
            writer.flush()?;
        }

        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<CredentialPair> {
        match self.read_pair() {
            Ok(pair) => pair,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "credential store unreadable, treating as signed out");
                None
            }
        }
    }

    fn set(&self, access: &str, refresh: &str) -> StorageResult<()> {
        self.write_pair(&CredentialPair::new(access, refresh))
    }

    fn clear(&self) -> StorageResult<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, FileTokenStore) {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let store = FileTokenStore::new(dir.path().join("session").join("credentials.json"));
        (dir, store)
    }

    #[test]
    fn missing_file_means_no_credentials() {
        let (_dir, store) = test_store();
        assert!(store.get().is_none());
    }

    #[test]
    fn set_persists_under_well_known_keys() {
        let (_dir, store) = test_store();
        store.set("T1", "R1").unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["accessToken"], "T1");
        assert_eq!(raw["refreshToken"], "R1");
        assert!(!store.path().with_extension("tmp").exists());
    }

    #[test]
    fn credentials_survive_a_new_store_instance() {
        let (_dir, store) = test_store();
        store.set("T1", "R1").unwrap();

        let reopened = FileTokenStore::new(store.path());
        assert_eq!(reopened.get(), Some(CredentialPair::new("T1", "R1")));
    }

    #[test]
    fn clear_removes_file_and_is_idempotent() {
        let (_dir, store) = test_store();
        store.set("T1", "R1").unwrap();
        store.clear().unwrap();
        assert!(store.get().is_none());
        assert!(!store.path().exists());
        store.clear().unwrap();
    }

    #[test]
    fn corrupt_file_reads_as_absent() {
        let (_dir, store) = test_store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), b"{ not json").unwrap();
        assert!(store.get().is_none());
    }

    #[test]
    fn update_access_rewrites_only_access_token() {
        let (_dir, store) = test_store();
        store.set("T1", "R1").unwrap();
        store.update_access("T2").unwrap();
        assert_eq!(store.get(), Some(CredentialPair::new("T2", "R1")));
    }
}
