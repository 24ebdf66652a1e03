//! Session resolution and navigation guarding.
//!
//! A [`SessionContext`] answers "who is calling and what may they do" from the
//! auth provider's session plus the application's profile store, caching the
//! profile so navigations do not re-query it. A [`NavigationGuard`] turns that
//! answer into allow/redirect verdicts for the host view router.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use guardias_auth::session::{AuthConfig, NavigationGuard, RouteTable, SessionContext, Verdict};
//!
//! // 1. Implement AuthProvider and ProfileStore, or use the Supabase adapters
//! let config = AuthConfig::from_env()?;
//! let context = SessionContext::new(auth, profiles, config);
//! let _watcher = context.watch_auth_events();
//!
//! // 2. Run the guard before each view transition
//! let guard = NavigationGuard::new(context.clone(), RouteTable::guardias());
//! match guard.check("/estadisticas", Some("/")).await {
//!     Verdict::Allow => render(),
//!     Verdict::Redirect(path) => navigate(&path),
//!     Verdict::Superseded => {}
//! }
//! ```

mod cache;
mod config;
mod context;
mod error;
mod guard;
#[cfg(test)]
pub(crate) mod testing;
mod traits;
mod types;

pub use cache::ProfileCache;
pub use config::{AuthConfig, AuthMode};
pub use context::SessionContext;
pub use error::AuthError;
pub use guard::{NavigationGuard, RouteDescriptor, RouteTable, Verdict, normalize_path};
pub use traits::{AuthProvider, BoxError, ProfileStore};
pub use types::{AuthEvent, Identity, OAuthOptions, OAuthRedirect, Session, SessionState};

#[cfg(any(feature = "supabase", feature = "api"))]
pub(crate) use config::env_var;
