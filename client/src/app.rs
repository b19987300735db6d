//! Routing, the navigation gate, and header navigation.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every route component applies the same unauthenticated-redirect rule, so
//! it lives here as pure functions over a [`Session`] snapshot. [`App`] ties
//! them to a live [`SessionStore`] and runs bootstrap on first navigation.

#[cfg(test)]
#[path = "app_test.rs"]
mod app_test;

use crate::state::session::{Session, SessionPhase, SessionStore};

/// Client routes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    Landing,
    Login,
    Signup,
    Dashboard,
}

impl Route {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Landing => "/",
            Self::Login => "/login",
            Self::Signup => "/signup",
            Self::Dashboard => "/dashboard",
        }
    }

    /// Parse a location path. Query strings, fragments, and trailing slashes
    /// are ignored; unknown paths fall back to the landing page.
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        match path.trim_end_matches('/') {
            "/login" | "login" => Self::Login,
            "/signup" | "signup" => Self::Signup,
            "/dashboard" | "dashboard" => Self::Dashboard,
            _ => Self::Landing,
        }
    }

    /// Routes that require an authenticated session.
    #[must_use]
    pub fn is_protected(self) -> bool {
        matches!(self, Self::Dashboard)
    }
}

/// Outcome of checking a session against a protected route.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateDecision {
    RenderProtected,
    /// Session state is still being derived; show a loading indicator.
    Loading,
    /// `replace` means the protected location must not stay in history.
    Redirect { to: Route, replace: bool },
}

/// Decide whether protected content may render for `session`.
#[must_use]
pub fn gate(session: &Session) -> GateDecision {
    match session.phase {
        SessionPhase::Authenticated if session.profile.is_some() => GateDecision::RenderProtected,
        SessionPhase::Uninitialized | SessionPhase::Rehydrating | SessionPhase::Authenticating => GateDecision::Loading,
        SessionPhase::Authenticated | SessionPhase::Anonymous => {
            GateDecision::Redirect { to: Route::Login, replace: true }
        }
    }
}

/// What the host should show for a requested route.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Navigation {
    Render(Route),
    Loading(Route),
    Redirect { from: Route, to: Route, replace: bool },
}

/// Apply the gate to protected routes. Public routes always render.
#[must_use]
pub fn resolve(route: Route, session: &Session) -> Navigation {
    if !route.is_protected() {
        return Navigation::Render(route);
    }
    match gate(session) {
        GateDecision::RenderProtected => Navigation::Render(route),
        GateDecision::Loading => Navigation::Loading(route),
        GateDecision::Redirect { to, replace } => Navigation::Redirect { from: route, to, replace },
    }
}

// =============================================================================
// HEADER
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavAction {
    Open(Route),
    Logout,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NavLink {
    pub label: &'static str,
    pub action: NavAction,
}

/// Header links. Keyed on the credential, not the profile, so a session that
/// is still rehydrating already offers Logout.
#[must_use]
pub fn nav_links(session: &Session) -> Vec<NavLink> {
    if session.credential.is_some() {
        vec![
            NavLink { label: "Dashboard", action: NavAction::Open(Route::Dashboard) },
            NavLink { label: "Logout", action: NavAction::Logout },
        ]
    } else {
        vec![
            NavLink { label: "Login", action: NavAction::Open(Route::Login) },
            NavLink { label: "Sign up", action: NavAction::Open(Route::Signup) },
        ]
    }
}

// =============================================================================
// APP
// =============================================================================

/// Navigation entry point over a live session.
pub struct App<'a> {
    session: &'a SessionStore,
}

impl<'a> App<'a> {
    pub fn new(session: &'a SessionStore) -> Self {
        Self { session }
    }

    #[must_use]
    pub fn session(&self) -> &'a SessionStore {
        self.session
    }

    /// Resolve `path`, bootstrapping the session first if nothing has derived
    /// it yet.
    pub async fn open(&self, path: &str) -> Navigation {
        let route = Route::from_path(path);
        let snapshot = if self.session.snapshot().phase == SessionPhase::Uninitialized {
            self.session.bootstrap().await
        } else {
            self.session.snapshot()
        };
        let navigation = resolve(route, &snapshot);
        tracing::debug!(path, ?navigation, "navigation resolved");
        navigation
    }
}
