use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};

use super::config::RouteSettings;
use super::context::SessionContext;
use super::traits::{AuthProvider, ProfileStore};
use super::types::SessionState;

/// Declared access requirements of one view.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct RouteDescriptor {
    pub path: String,
    pub name: String,
    pub requires_auth: bool,
    pub admin_only: bool,
}

impl RouteDescriptor {
    #[must_use]
    pub fn public(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            requires_auth: false,
            admin_only: false,
        }
    }

    #[must_use]
    pub fn authenticated(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            requires_auth: true,
            ..Self::public(path, name)
        }
    }

    #[must_use]
    pub fn admin(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            requires_auth: true,
            admin_only: true,
            ..Self::public(path, name)
        }
    }
}

/// Static route configuration. Unknown paths match a public not-found route.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<RouteDescriptor>,
    not_found: RouteDescriptor,
}

impl RouteTable {
    #[must_use]
    pub fn new(routes: Vec<RouteDescriptor>) -> Self {
        Self {
            routes,
            not_found: RouteDescriptor::public("*", "not-found"),
        }
    }

    /// Routes of the guard-duty application.
    #[must_use]
    pub fn guardias() -> Self {
        Self::new(vec![
            RouteDescriptor::public("/login", "login"),
            RouteDescriptor::public("/auth/callback", "auth-callback"),
            // Teachers
            RouteDescriptor::authenticated("/", "home"),
            RouteDescriptor::authenticated("/formulario", "formulario"),
            RouteDescriptor::authenticated("/mis-guardias", "mis-guardias"),
            RouteDescriptor::authenticated("/horario", "horario"),
            RouteDescriptor::authenticated("/gestion-faltas", "gestion-faltas"),
            // Administrators
            RouteDescriptor::admin("/admin", "admin-panel"),
            RouteDescriptor::admin("/historico", "historico"),
            RouteDescriptor::admin("/estadisticas", "estadisticas"),
            RouteDescriptor::admin("/usuarios", "usuarios"),
        ])
    }

    /// Descriptor for `path` (already normalized). Matching ignores ASCII case.
    #[must_use]
    pub fn find(&self, path: &str) -> &RouteDescriptor {
        self.routes
            .iter()
            .find(|r| r.path.eq_ignore_ascii_case(path))
            .unwrap_or(&self.not_found)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteDescriptor> {
        self.routes.iter()
    }
}

/// Strip query string, fragment and trailing slash (except for the root),
/// and collapse repeated slashes.
#[must_use]
pub fn normalize_path(path: &str) -> Cow<'_, str> {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let path = match path[..end].trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };
    if !path.contains("//") {
        return Cow::Borrowed(path);
    }

    let mut collapsed = String::with_capacity(path.len());
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        collapsed.push('/');
        collapsed.push_str(segment);
    }
    Cow::Owned(collapsed)
}

/// Guard decision for one navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Redirect(String),
    /// A newer navigation started while this one was resolving; ignore this verdict.
    Superseded,
}

/// Pre-transition hook for the host view router.
///
/// Each check takes a sequence number; if a newer check starts while the
/// session is being resolved, the older one returns [`Verdict::Superseded`]
/// so only the most recent navigation's result is applied.
pub struct NavigationGuard<A, P> {
    context: SessionContext<A, P>,
    routes: RouteTable,
    settings: RouteSettings,
    latest: AtomicU64,
}

impl<A: AuthProvider, P: ProfileStore> NavigationGuard<A, P> {
    #[must_use]
    pub fn new(context: SessionContext<A, P>, routes: RouteTable) -> Self {
        let settings = context.config().routes.clone();
        Self {
            context,
            routes,
            settings,
            latest: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn context(&self) -> &SessionContext<A, P> {
        &self.context
    }

    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Decide whether the transition `from -> to` may proceed.
    pub async fn check(&self, to: &str, from: Option<&str>) -> Verdict {
        let seq = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let path = normalize_path(to);
        let path: &str = &path;

        // Runs before any session exists, while the provider is finishing sign-in
        if path.eq_ignore_ascii_case(&self.settings.callback_path) {
            return Verdict::Allow;
        }

        let state = match self.context.resolve().await {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(error = %e, to = %path, "Session resolution failed; treating as signed out");
                SessionState::Anonymous
            }
        };

        if self.latest.load(Ordering::SeqCst) != seq {
            tracing::debug!(to = %path, seq, "Navigation superseded");
            return Verdict::Superseded;
        }

        let verdict = decide(path, self.routes.find(path), &state, &self.settings);
        if let Verdict::Redirect(target) = &verdict {
            tracing::debug!(from = ?from, to = %path, redirect = %target, "Navigation redirected");
        }
        verdict
    }
}

/// Apply the guard's checks, in order, to a resolved session.
pub(crate) fn decide(
    path: &str,
    route: &RouteDescriptor,
    state: &SessionState,
    settings: &RouteSettings,
) -> Verdict {
    if route.requires_auth && !state.is_authenticated() {
        return Verdict::Redirect(settings.login_path.clone());
    }

    if path.eq_ignore_ascii_case(&settings.login_path) && state.is_authenticated() {
        let target = match &settings.admin_landing {
            Some(landing) if state.is_admin() => landing.clone(),
            _ => settings.home_path.clone(),
        };
        return Verdict::Redirect(target);
    }

    if route.admin_only && !state.is_admin() {
        return Verdict::Redirect(settings.home_path.clone());
    }

    Verdict::Allow
}
