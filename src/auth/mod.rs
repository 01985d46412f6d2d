// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session and Authorization
//!
//! ## Flow
//!
//! 1. [`SessionManager::bootstrap`] validates stored credentials once at startup
//! 2. [`SessionManager::login`] exchanges email/password for a token pair,
//!    then loads the current user
//! 3. UI code asks [`RouteTable::authorize`] (or [`decide`] directly) before
//!    rendering a page
//! 4. [`SessionManager::logout`] runs on user request or when the request
//!    pipeline cannot recover an expired session
//!
//! ## Roles
//!
//! Unknown or missing roles are treated as [`Role::Student`]: they are never
//! admitted to admin or teacher pages.

pub mod gate;
pub mod navigator;
pub mod roles;
pub mod routes;
pub mod session;

pub use gate::{decide, role_default_path, Decision, LOGIN_PATH};
pub use navigator::{MemoryNavigator, Navigator};
pub use roles::Role;
pub use routes::{login_page_redirect, post_login_destination, RouteAccess, RouteTable};
pub use session::{SessionManager, SessionState, SessionStatus, CURRENT_USER_PATH, TOKEN_PATH};
