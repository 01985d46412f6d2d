// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Entities the session core reads from the platform API. Field names follow
//! the client-side camelCase convention: the request pipeline converts the
//! backend's snake_case keys before these types are deserialized.
//!
//! ## Model Categories
//!
//! - **Users**: the signed-in [`User`] and its [`UserProfile`] extension
//! - **Tokens**: token-issuance and token-refresh payloads
//! - **Lists**: the [`Paginated`] envelope used by list endpoints

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::Role;

// =============================================================================
// Users
// =============================================================================

/// The user returned by the current-user endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Unknown or missing roles resolve to [`Role::Student`].
    #[serde(default, deserialize_with = "Role::deserialize_lenient")]
    pub role: Role,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default)]
    pub profile: Option<UserProfile>,
}

impl User {
    /// "First Last", falling back to the email when both names are blank.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.email.clone()
        } else {
            full.to_string()
        }
    }
}

/// Profile extension attached to a user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub parent_name: Option<String>,
    #[serde(default)]
    pub parent_phone: Option<String>,
    #[serde(default)]
    pub school: Option<String>,
    #[serde(default)]
    pub student_class: Option<String>,
    /// Any further profile fields the backend adds.
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

// =============================================================================
// Tokens
// =============================================================================

/// Login request sent to the token-issuance endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct TokenRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Token-issuance response.
#[derive(Debug, Clone, Deserialize)]
pub struct IssuedTokens {
    pub access: String,
    pub refresh: String,
}

/// Token-refresh response. `refresh` is present when the backend rotates it.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshedTokens {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

// =============================================================================
// Lists
// =============================================================================

/// Page of results from a paginated list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Paginated<T> {
    /// True when the server reported another page after this one.
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn user_deserializes_from_camel_case() {
        let user: User = serde_json::from_value(json!({
            "id": 1,
            "email": "a@b.com",
            "firstName": "Ann",
            "lastName": "Lee",
            "role": "teacher",
            "isActive": true,
            "lastLogin": "2026-03-01T10:15:00Z",
            "profile": { "id": 4, "phone": "+100", "studentClass": "9B", "publicSubjects": "Math" }
        }))
        .unwrap();

        assert_eq!(user.role, Role::Teacher);
        assert!(user.is_active);
        assert!(user.last_login.is_some());
        let profile = user.profile.unwrap();
        assert_eq!(profile.student_class.as_deref(), Some("9B"));
        assert_eq!(profile.extra.get("publicSubjects"), Some(&json!("Math")));
    }

    #[test]
    fn user_with_unknown_role_is_a_student() {
        let user: User = serde_json::from_value(json!({
            "id": 2,
            "email": "x@y.com",
            "role": "owner"
        }))
        .unwrap();
        assert_eq!(user.role, Role::Student);
        assert_eq!(user.display_name(), "x@y.com");
    }

    #[test]
    fn refreshed_tokens_without_rotation() {
        let tokens: RefreshedTokens = serde_json::from_value(json!({ "access": "T2" })).unwrap();
        assert_eq!(tokens.access, "T2");
        assert!(tokens.refresh.is_none());
    }

    #[test]
    fn paginated_envelope() {
        let page: Paginated<i32> = serde_json::from_value(json!({
            "count": 3,
            "next": "http://api/courses/?page=2",
            "previous": null,
            "results": [1, 2]
        }))
        .unwrap();
        assert!(page.has_next());
        assert_eq!(page.results, vec![1, 2]);
    }
}
