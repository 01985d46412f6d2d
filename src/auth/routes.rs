// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Route descriptors for the platform's pages.
//!
//! ## Route Map
//!
//! | Pattern | Access |
//! |---------|--------|
//! | `/`, `/about-us`, `/courses`, `/blog`, `/blog/:slug`, `/login` | public |
//! | `/dashboard`, `/my-courses`, `/course-detail/:courseId`, `/my-courses/:courseId/test`, `/profile` | student |
//! | `/admin/{dashboard,users,students,courses,requests,settings}` | admin |
//! | `/teacher/{dashboard,students}` | teacher |
//! | `/admin`, `/teacher` | gated like the section, then redirect to its dashboard |

use super::gate::{decide, Decision, LOGIN_PATH};
use super::roles::{Role, ADMIN_LANDING_PATH, TEACHER_LANDING_PATH};
use super::session::SessionState;
use crate::models::User;

/// Who may open a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteAccess {
    Public,
    Protected(Vec<Role>),
    /// Index route forwarding to another path, gated like its target.
    Redirect(&'static str),
}

#[derive(Debug, Clone)]
struct RouteEntry {
    pattern: &'static str,
    access: RouteAccess,
}

/// Ordered set of route patterns. `:name` segments match any single segment.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The platform's page routes.
    pub fn standard() -> Self {
        let student = || RouteAccess::Protected(vec![Role::Student]);
        let admin = || RouteAccess::Protected(vec![Role::Admin]);
        let teacher = || RouteAccess::Protected(vec![Role::Teacher]);

        Self::new()
            // Public
            .route("/", RouteAccess::Public)
            .route("/about-us", RouteAccess::Public)
            .route("/courses", RouteAccess::Public)
            .route("/blog", RouteAccess::Public)
            .route("/blog/:slug", RouteAccess::Public)
            .route(LOGIN_PATH, RouteAccess::Public)
            // Student
            .route("/dashboard", student())
            .route("/my-courses", student())
            .route("/course-detail/:courseId", student())
            .route("/my-courses/:courseId/test", student())
            .route("/profile", student())
            // Admin
            .route("/admin", RouteAccess::Redirect(ADMIN_LANDING_PATH))
            .route("/admin/dashboard", admin())
            .route("/admin/users", admin())
            .route("/admin/students", admin())
            .route("/admin/courses", admin())
            .route("/admin/requests", admin())
            .route("/admin/settings", admin())
            // Teacher
            .route("/teacher", RouteAccess::Redirect(TEACHER_LANDING_PATH))
            .route("/teacher/dashboard", teacher())
            .route("/teacher/students", teacher())
    }

    pub fn route(mut self, pattern: &'static str, access: RouteAccess) -> Self {
        self.entries.push(RouteEntry { pattern, access });
        self
    }

    /// Access descriptor of the first pattern matching `path`.
    pub fn resolve(&self, path: &str) -> Option<&RouteAccess> {
        let path = normalize(path);
        self.entries
            .iter()
            .find(|entry| matches_pattern(entry.pattern, path))
            .map(|entry| &entry.access)
    }

    /// Admission decision for `path`, or `None` when no route matches.
    pub fn authorize(&self, session: &SessionState, path: &str) -> Option<Decision> {
        let decision = match self.resolve(path)? {
            RouteAccess::Public => Decision::Admit,
            RouteAccess::Redirect(to) => self.authorize_index(session, path, *to),
            RouteAccess::Protected(roles) => decide(session, roles, path),
        };
        Some(decision)
    }

    /// An index route forwards only users its target would admit.
    fn authorize_index(&self, session: &SessionState, path: &str, to: &'static str) -> Decision {
        let forward = || Decision::Redirect {
            to: to.to_string(),
            from: None,
        };
        match self.resolve(to) {
            Some(RouteAccess::Protected(roles)) => match decide(session, roles, path) {
                Decision::Admit => forward(),
                gated => gated,
            },
            _ => forward(),
        }
    }
}

/// Where to go after a successful login.
pub fn post_login_destination(from: Option<&str>, user: &User) -> String {
    match from.map(str::trim) {
        Some(from) if !from.is_empty() && normalize(from) != LOGIN_PATH => from.to_string(),
        _ => user.role.landing_path().to_string(),
    }
}

/// Destination for a visit to the login page while already signed in.
pub fn login_page_redirect(session: &SessionState, from: Option<&str>) -> Option<String> {
    if session.is_loading || !session.is_authenticated {
        return None;
    }
    session
        .current_user
        .as_ref()
        .map(|user| post_login_destination(from, user))
}

fn normalize(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

fn matches_pattern(pattern: &str, path: &str) -> bool {
    let mut pattern_segments = pattern.split('/').filter(|s| !s.is_empty());
    let mut path_segments = path.split('/').filter(|s| !s.is_empty());
    loop {
        match (pattern_segments.next(), path_segments.next()) {
            (None, None) => return true,
            (Some(expected), Some(actual)) => {
                if !expected.starts_with(':') && expected != actual {
                    return false;
                }
            }
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session_for(role: &str) -> SessionState {
        let user: User =
            serde_json::from_value(json!({ "id": 4, "email": "u@school.test", "role": role }))
                .unwrap();
        SessionState::authenticated(user)
    }

    #[test]
    fn resolves_static_and_parameterized_routes() {
        let table = RouteTable::standard();
        assert_eq!(table.resolve("/"), Some(&RouteAccess::Public));
        assert_eq!(table.resolve("/blog/first-post"), Some(&RouteAccess::Public));
        assert_eq!(
            table.resolve("/my-courses/12/test"),
            Some(&RouteAccess::Protected(vec![Role::Student]))
        );
        assert_eq!(
            table.resolve("/admin/users/?page=2"),
            Some(&RouteAccess::Protected(vec![Role::Admin]))
        );
        assert_eq!(table.resolve("/my-courses/12/test/extra"), None);
        assert_eq!(table.resolve("/nowhere"), None);
    }

    #[test]
    fn public_routes_admit_everyone_even_while_loading() {
        let table = RouteTable::standard();
        assert_eq!(table.authorize(&SessionState::loading(), "/blog"), Some(Decision::Admit));
        assert_eq!(table.authorize(&SessionState::anonymous(), "/courses"), Some(Decision::Admit));
    }

    #[test]
    fn protected_routes_apply_gate() {
        let table = RouteTable::standard();
        assert_eq!(
            table.authorize(&SessionState::anonymous(), "/course-detail/3"),
            Some(Decision::Redirect {
                to: "/login".to_string(),
                from: Some("/course-detail/3".to_string()),
            })
        );
        assert_eq!(
            table
                .authorize(&session_for("teacher"), "/admin/settings")
                .and_then(|d| d.redirect_target().map(str::to_string)),
            Some(TEACHER_LANDING_PATH.to_string())
        );
        assert_eq!(
            table.authorize(&session_for("teacher"), "/teacher/students"),
            Some(Decision::Admit)
        );
    }

    #[test]
    fn section_index_redirects_to_dashboard() {
        let table = RouteTable::standard();
        assert_eq!(
            table
                .authorize(&session_for("admin"), "/admin/")
                .and_then(|d| d.redirect_target().map(str::to_string)),
            Some(ADMIN_LANDING_PATH.to_string())
        );
    }

    #[test]
    fn section_index_is_gated_before_forwarding() {
        let table = RouteTable::standard();
        assert_eq!(
            table
                .authorize(&session_for("teacher"), "/admin")
                .and_then(|d| d.redirect_target().map(str::to_string)),
            Some(TEACHER_LANDING_PATH.to_string())
        );
        assert_eq!(
            table.authorize(&SessionState::anonymous(), "/teacher"),
            Some(Decision::Redirect {
                to: "/login".to_string(),
                from: Some("/teacher".to_string()),
            })
        );
        assert_eq!(
            table.authorize(&SessionState::loading(), "/admin"),
            Some(Decision::ShowLoading)
        );
    }

    #[test]
    fn unknown_path_is_not_found() {
        assert_eq!(
            RouteTable::standard().authorize(&session_for("admin"), "/missing"),
            None
        );
    }

    #[test]
    fn login_destination_prefers_original_path() {
        let session = session_for("admin");
        let user = session.current_user.as_ref().unwrap();
        assert_eq!(post_login_destination(Some("/admin/courses"), user), "/admin/courses");
        assert_eq!(post_login_destination(None, user), ADMIN_LANDING_PATH);
        assert_eq!(post_login_destination(Some("/login"), user), ADMIN_LANDING_PATH);
        assert_eq!(post_login_destination(Some("  "), user), ADMIN_LANDING_PATH);
    }

    #[test]
    fn login_page_skips_form_when_signed_in() {
        assert_eq!(login_page_redirect(&SessionState::anonymous(), Some("/profile")), None);
        assert_eq!(login_page_redirect(&SessionState::loading(), None), None);
        assert_eq!(
            login_page_redirect(&session_for("student"), Some("/profile")),
            Some("/profile".to_string())
        );
        assert_eq!(
            login_page_redirect(&session_for("teacher"), None),
            Some(TEACHER_LANDING_PATH.to_string())
        );
    }
}
