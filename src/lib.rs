// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Munificent Session - session and API core for the learning platform client
//!
//! This crate owns who is signed in, how credentials are stored, and how
//! every call to the platform's REST API is authenticated, case-normalized
//! and recovered after an expired access token.
//!
//! ## Modules
//!
//! - `api` - Request pipeline (bearer, casing, refresh-once on `401`)
//! - `auth` - Session manager, roles and route admission
//! - `storage` - Credential pair persistence
//! - `config` - Environment-driven configuration
//! - `telemetry` - `tracing` subscriber setup

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;
pub mod telemetry;

pub use config::ClientConfig;
pub use error::ClientError;
pub use state::ClientState;
