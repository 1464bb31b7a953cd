//! # Route Guard
//!
//! Decides what a navigation renders based on the session state.
//!
//! ## Decision Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Protected Route Evaluation                           │
//! │                                                                         │
//! │  navigate("/products")                                                 │
//! │       │                                                                 │
//! │       ├── 1. session still loading?     → Loading (spinner, stay)      │
//! │       │                                                                 │
//! │       ├── 2. no session?                → Redirect("/login")           │
//! │       │                                                                 │
//! │       ├── 3. admin route, not admin?    → Redirect("/")                │
//! │       │                                                                 │
//! │       ├── 4. onboarding incomplete and                                 │
//! │       │      path != "/onboarding"?     → Redirect("/onboarding")      │
//! │       │                                                                 │
//! │       └── 5. otherwise                  → Render                       │
//! │                                                                         │
//! │  The order is fixed: a non-admin on an admin route goes home even if   │
//! │  onboarding is still pending.                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Public routes (`/login`, `/register`) are evaluated separately: they
//! render for anonymous visitors and send signed-in users home.

use serde::Serialize;
use ts_rs::TS;

use crate::types::Session;

pub const HOME_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
pub const ONBOARDING_PATH: &str = "/onboarding";

// =============================================================================
// Routes
// =============================================================================

/// Who may open a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Reachable without a session.
    Public,
    /// Any signed-in user.
    Authenticated,
    /// Signed-in administrators only.
    Admin,
}

/// An entry of the route table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub path: &'static str,
    pub access: Access,
}

impl Route {
    pub const fn new(path: &'static str, access: Access) -> Self {
        Route { path, access }
    }

    #[inline]
    pub const fn is_admin_only(&self) -> bool {
        matches!(self.access, Access::Admin)
    }
}

/// The application's routes.
pub const ROUTES: &[Route] = &[
    Route::new(LOGIN_PATH, Access::Public),
    Route::new(REGISTER_PATH, Access::Public),
    Route::new(HOME_PATH, Access::Authenticated),
    Route::new(ONBOARDING_PATH, Access::Authenticated),
    Route::new("/dashboard", Access::Authenticated),
    Route::new("/products", Access::Authenticated),
    Route::new("/categories", Access::Authenticated),
    Route::new("/suppliers", Access::Authenticated),
    Route::new("/sales", Access::Authenticated),
    Route::new("/reports", Access::Authenticated),
    Route::new("/settings", Access::Authenticated),
    Route::new("/users", Access::Admin),
    Route::new("/company", Access::Admin),
];

/// Looks up the route for a path.
///
/// Nested paths inherit their section's access (`/users/42` is admin-only).
/// Unknown paths are treated as authenticated routes.
pub fn resolve_route(path: &str) -> Route {
    let path = normalize_path(path);

    ROUTES
        .iter()
        .filter(|r| {
            r.path == path
                || (r.path != HOME_PATH
                    && path.starts_with(r.path)
                    && path[r.path.len()..].starts_with('/'))
        })
        .max_by_key(|r| r.path.len())
        .copied()
        .unwrap_or(Route {
            path: "*",
            access: Access::Authenticated,
        })
}

/// Strips query, fragment and trailing slash.
fn normalize_path(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let path = &path[..end];
    if path.len() > 1 {
        path.trim_end_matches('/')
    } else if path.is_empty() {
        HOME_PATH
    } else {
        path
    }
}

// =============================================================================
// Guard
// =============================================================================

/// Snapshot of the session provider the guard decides on.
#[derive(Debug, Clone, Copy)]
pub struct GuardInput<'a> {
    pub session: Option<&'a Session>,
    pub is_loading: bool,
    pub onboarding_complete: bool,
}

impl<'a> GuardInput<'a> {
    /// Input for a resolved session, onboarding flag taken from it.
    pub fn from_session(session: Option<&'a Session>) -> Self {
        GuardInput {
            session,
            is_loading: false,
            onboarding_complete: session.is_some_and(|s| s.onboarding_complete),
        }
    }

    pub fn loading() -> Self {
        GuardInput {
            session: None,
            is_loading: true,
            onboarding_complete: false,
        }
    }
}

/// What the router should do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(tag = "kind", content = "to", rename_all = "snake_case")]
pub enum GuardDecision {
    /// Show a loading indicator, do not navigate.
    Loading,
    /// Navigate to another path instead.
    Redirect(String),
    /// Render the requested view.
    Render,
}

impl GuardDecision {
    fn redirect(path: &str) -> Self {
        GuardDecision::Redirect(path.to_string())
    }
}

/// Evaluates a navigation to `path`.
///
/// ```rust
/// use estoque_core::guard::{evaluate, GuardDecision, GuardInput};
///
/// let decision = evaluate(&GuardInput::from_session(None), "/dashboard");
/// assert_eq!(decision, GuardDecision::Redirect("/login".to_string()));
/// ```
pub fn evaluate(input: &GuardInput<'_>, path: &str) -> GuardDecision {
    let route = resolve_route(path);

    if input.is_loading {
        return GuardDecision::Loading;
    }

    if route.access == Access::Public {
        return match input.session {
            Some(_) => GuardDecision::redirect(HOME_PATH),
            None => GuardDecision::Render,
        };
    }

    let Some(session) = input.session else {
        return GuardDecision::redirect(LOGIN_PATH);
    };

    if route.is_admin_only() && !session.is_admin {
        return GuardDecision::redirect(HOME_PATH);
    }

    if !input.onboarding_complete && route.path != ONBOARDING_PATH {
        return GuardDecision::redirect(ONBOARDING_PATH);
    }

    GuardDecision::Render
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(is_admin: bool, onboarding_complete: bool) -> Session {
        Session {
            user_id: "u1".to_string(),
            name: "Ana".to_string(),
            email: "ana@loja.com".to_string(),
            company_id: Some("c1".to_string()),
            is_admin,
            onboarding_complete,
        }
    }

    #[test]
    fn test_loading_wins() {
        assert_eq!(evaluate(&GuardInput::loading(), "/users"), GuardDecision::Loading);
        assert_eq!(evaluate(&GuardInput::loading(), "/login"), GuardDecision::Loading);
    }

    #[test]
    fn test_anonymous_goes_to_login() {
        let input = GuardInput::from_session(None);
        assert_eq!(
            evaluate(&input, "/dashboard"),
            GuardDecision::Redirect("/login".to_string())
        );
        assert_eq!(evaluate(&input, "/login"), GuardDecision::Render);
        assert_eq!(evaluate(&input, "/register"), GuardDecision::Render);
    }

    #[test]
    fn test_non_admin_goes_home_before_onboarding() {
        let s = session(false, false);
        let input = GuardInput::from_session(Some(&s));
        assert_eq!(evaluate(&input, "/users"), GuardDecision::Redirect("/".to_string()));
        assert_eq!(evaluate(&input, "/company/edit"), GuardDecision::Redirect("/".to_string()));
    }

    #[test]
    fn test_onboarding_redirect() {
        let s = session(true, false);
        let input = GuardInput::from_session(Some(&s));
        assert_eq!(
            evaluate(&input, "/products"),
            GuardDecision::Redirect("/onboarding".to_string())
        );
        assert_eq!(evaluate(&input, "/onboarding"), GuardDecision::Render);
        assert_eq!(evaluate(&input, "/onboarding/"), GuardDecision::Render);
    }

    #[test]
    fn test_explicit_onboarding_flag_is_used() {
        let s = session(false, false);
        let input = GuardInput {
            session: Some(&s),
            is_loading: false,
            onboarding_complete: true,
        };
        assert_eq!(evaluate(&input, "/sales"), GuardDecision::Render);
    }

    #[test]
    fn test_render_when_everything_passes() {
        let s = session(true, true);
        let input = GuardInput::from_session(Some(&s));
        assert_eq!(evaluate(&input, "/users"), GuardDecision::Render);
        assert_eq!(evaluate(&input, "/products?page=2"), GuardDecision::Render);
        assert_eq!(evaluate(&input, "/login"), GuardDecision::Redirect("/".to_string()));
    }

    #[test]
    fn test_resolve_route() {
        assert_eq!(resolve_route("/users/42").access, Access::Admin);
        assert_eq!(resolve_route("/usersettings").access, Access::Authenticated);
        assert_eq!(resolve_route("").path, "/");
        assert_eq!(resolve_route("/nowhere").path, "*");
    }

    #[test]
    fn test_decision_serialization() {
        let json = serde_json::to_string(&GuardDecision::Redirect("/login".to_string())).unwrap();
        assert_eq!(json, r#"{"kind":"redirect","to":"/login"}"#);
        let json = serde_json::to_string(&GuardDecision::Render).unwrap();
        assert_eq!(json, r#"{"kind":"render"}"#);
    }
}
