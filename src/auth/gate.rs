// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Route admission decisions.
//!
//! Pure functions of the session state and a route's allowed roles; the
//! caller performs whatever rendering or redirect the decision names.

use super::roles::{Role, STUDENT_LANDING_PATH};
use super::session::SessionState;

/// Public entry point unauthenticated users are sent to.
pub const LOGIN_PATH: &str = "/login";

/// Outcome of an admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Session is still bootstrapping; render a placeholder.
    ShowLoading,
    /// Navigate to `to`. `from` is the originally requested path when the
    /// redirect is to the login page.
    Redirect { to: String, from: Option<String> },
    /// Render the route.
    Admit,
}

impl Decision {
    pub fn is_admit(&self) -> bool {
        matches!(self, Decision::Admit)
    }

    /// Redirect target, if this is a redirect.
    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            Decision::Redirect { to, .. } => Some(to),
            _ => None,
        }
    }
}

/// Decide admission for `requested_path`, restricted to `allowed_roles`.
pub fn decide(session: &SessionState, allowed_roles: &[Role], requested_path: &str) -> Decision {
    if session.is_loading {
        return Decision::ShowLoading;
    }

    let user = match (&session.current_user, session.is_authenticated) {
        (Some(user), true) => user,
        _ => {
            return Decision::Redirect {
                to: LOGIN_PATH.to_string(),
                from: Some(requested_path.to_string()),
            }
        }
    };

    if allowed_roles.contains(&user.role) {
        Decision::Admit
    } else {
        Decision::Redirect {
            to: role_default_path(Some(user.role)).to_string(),
            from: None,
        }
    }
}

/// Landing page for a role. No role means the lowest privilege.
pub fn role_default_path(role: Option<Role>) -> &'static str {
    role.map_or(STUDENT_LANDING_PATH, |role| role.landing_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::roles::{ADMIN_LANDING_PATH, TEACHER_LANDING_PATH};
    use crate::models::User;
    use serde_json::json;

    fn user_with_role(role: &str) -> User {
        serde_json::from_value(json!({ "id": 1, "email": "a@b.com", "role": role })).unwrap()
    }

    const ALL: [Role; 3] = [Role::Student, Role::Teacher, Role::Admin];

    #[test]
    fn loading_always_shows_loading() {
        let mut loading = SessionState::loading();
        assert_eq!(decide(&loading, &ALL, "/dashboard"), Decision::ShowLoading);
        assert_eq!(decide(&loading, &[], "/dashboard"), Decision::ShowLoading);

        // Even with a user already attached.
        loading.current_user = Some(user_with_role("admin"));
        loading.is_authenticated = true;
        assert_eq!(decide(&loading, &[Role::Student], "/dashboard"), Decision::ShowLoading);
    }

    #[test]
    fn anonymous_is_sent_to_login_with_origin() {
        let decision = decide(&SessionState::anonymous(), &[Role::Admin], "/admin/users");
        assert_eq!(
            decision,
            Decision::Redirect {
                to: "/login".to_string(),
                from: Some("/admin/users".to_string()),
            }
        );
    }

    #[test]
    fn wrong_role_is_sent_to_own_landing_page() {
        let teacher = SessionState::authenticated(user_with_role("teacher"));
        assert_eq!(
            decide(&teacher, &[Role::Admin], "/admin/dashboard").redirect_target(),
            Some(TEACHER_LANDING_PATH)
        );

        let admin = SessionState::authenticated(user_with_role("admin"));
        assert_eq!(
            decide(&admin, &[Role::Student], "/my-courses").redirect_target(),
            Some(ADMIN_LANDING_PATH)
        );
    }

    #[test]
    fn matching_role_is_admitted() {
        let student = SessionState::authenticated(user_with_role("student"));
        assert!(decide(&student, &[Role::Student], "/profile").is_admit());
    }

    #[test]
    fn unrecognized_role_gets_student_treatment() {
        let odd = SessionState::authenticated(user_with_role("superuser"));
        assert_eq!(
            decide(&odd, &[Role::Admin], "/admin/settings").redirect_target(),
            Some(STUDENT_LANDING_PATH)
        );
        assert!(decide(&odd, &[Role::Student], "/dashboard").is_admit());
    }

    #[test]
    fn default_path_without_role_is_student_landing() {
        assert_eq!(role_default_path(None), STUDENT_LANDING_PATH);
        assert_eq!(role_default_path(Some(Role::Admin)), ADMIN_LANDING_PATH);
    }
}
