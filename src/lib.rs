#![doc = include_str!("../README.md")]

pub mod domain;
pub mod error;
#[cfg(any(feature = "supabase", feature = "api"))]
mod http;
pub mod pkce;
pub mod session;
pub mod token;
pub mod types;

#[cfg(feature = "api")]
pub mod api;
#[cfg(feature = "supabase")]
pub mod supabase;

// Re-exports for convenient access
#[cfg(feature = "api")]
pub use api::ApiClient;
pub use domain::is_allowed_domain;
pub use error::Error;
pub use pkce::{PkcePair, generate_code_challenge, generate_code_verifier};
pub use session::{
    AuthConfig, AuthError, AuthEvent, AuthMode, AuthProvider, Identity, NavigationGuard,
    ProfileStore, RouteDescriptor, RouteTable, Session, SessionContext, SessionState, Verdict,
};
#[cfg(feature = "supabase")]
pub use supabase::{SupabaseAuth, SupabaseClient, SupabaseConfig, SupabaseProfiles};
pub use token::{AccessClaims, decode_unverified};
pub use types::{Email, Profile, ProviderUserId, Role};
