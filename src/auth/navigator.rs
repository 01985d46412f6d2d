// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Navigation side effects requested by the session core.

use std::sync::{Mutex, PoisonError};

/// Where the UI currently is, and how to send it elsewhere.
pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;

    fn navigate(&self, path: &str);
}

/// In-process navigator that records every navigation.
#[derive(Debug)]
pub struct MemoryNavigator {
    history: Mutex<Vec<String>>,
}

impl MemoryNavigator {
    /// Navigator positioned at `initial`.
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            history: Mutex::new(vec![initial.into()]),
        }
    }

    /// Every path visited, starting with the initial one.
    pub fn history(&self) -> Vec<String> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for MemoryNavigator {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for MemoryNavigator {
    fn current_path(&self) -> String {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
            .unwrap_or_else(|| "/".to_string())
    }

    fn navigate(&self, path: &str) {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_navigation_history() {
        let nav = MemoryNavigator::new("/courses");
        assert_eq!(nav.current_path(), "/courses");

        nav.navigate("/login");
        assert_eq!(nav.current_path(), "/login");
        assert_eq!(nav.history(), vec!["/courses", "/login"]);
    }

    #[test]
    fn default_starts_at_root() {
        assert_eq!(MemoryNavigator::default().current_path(), "/");
    }
}
