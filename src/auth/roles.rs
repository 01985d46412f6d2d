// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles for navigation and authorization.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Landing page for administrators.
pub const ADMIN_LANDING_PATH: &str = "/admin/dashboard";
/// Landing page for teachers.
pub const TEACHER_LANDING_PATH: &str = "/teacher/dashboard";
/// Landing page for students and anyone whose role is not recognised.
pub const STUDENT_LANDING_PATH: &str = "/dashboard";

/// User roles for authorization.
///
/// ## Role Hierarchy
///
/// - `Admin` - Platform administration (users, courses, requests, settings)
/// - `Teacher` - Own courses and enrolled students
/// - `Student` - Own courses, tests and profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
    Admin,
}

impl Role {
    /// Parse role from string (case-insensitive).
    pub fn from_str(s: &str) -> Option<Role> {
        match s.trim().to_lowercase().as_str() {
            "student" => Some(Role::Student),
            "teacher" => Some(Role::Teacher),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    /// Default page a user of this role lands on.
    pub fn landing_path(&self) -> &'static str {
        match self {
            Role::Admin => ADMIN_LANDING_PATH,
            Role::Teacher => TEACHER_LANDING_PATH,
            Role::Student => STUDENT_LANDING_PATH,
        }
    }

    /// Deserialize a role field, mapping unknown, missing or malformed
    /// values to the default role instead of failing the whole record.
    pub fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Role, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<Value>::deserialize(deserializer)?;
        Ok(raw
            .as_ref()
            .and_then(Value::as_str)
            .and_then(Role::from_str)
            .unwrap_or_default())
    }
}

impl Default for Role {
    /// Default role is Student (least privilege).
    fn default() -> Self {
        Role::Student
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Student => write!(f, "student"),
            Role::Teacher => write!(f, "teacher"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Holder {
        #[serde(default, deserialize_with = "Role::deserialize_lenient")]
        role: Role,
    }

    #[test]
    fn from_str_parses_correctly() {
        assert_eq!(Role::from_str("admin"), Some(Role::Admin));
        assert_eq!(Role::from_str("TEACHER"), Some(Role::Teacher));
        assert_eq!(Role::from_str(" Student "), Some(Role::Student));
        assert_eq!(Role::from_str("superuser"), None);
    }

    #[test]
    fn landing_paths_follow_role() {
        assert_eq!(Role::Admin.landing_path(), "/admin/dashboard");
        assert_eq!(Role::Teacher.landing_path(), "/teacher/dashboard");
        assert_eq!(Role::Student.landing_path(), "/dashboard");
    }

    #[test]
    fn default_role_is_student() {
        assert_eq!(Role::default(), Role::Student);
    }

    #[test]
    fn unknown_role_deserializes_to_student() {
        let holder: Holder = serde_json::from_str(r#"{"role":"superuser"}"#).unwrap();
        assert_eq!(holder.role, Role::Student);

        let holder: Holder = serde_json::from_str(r#"{"role":null}"#).unwrap();
        assert_eq!(holder.role, Role::Student);

        let holder: Holder = serde_json::from_str(r#"{"role":7}"#).unwrap();
        assert_eq!(holder.role, Role::Student);

        let holder: Holder = serde_json::from_str("{}").unwrap();
        assert_eq!(holder.role, Role::Student);
    }

    #[test]
    fn known_role_deserializes() {
        let holder: Holder = serde_json::from_str(r#"{"role":"admin"}"#).unwrap();
        assert_eq!(holder.role, Role::Admin);
    }
}
