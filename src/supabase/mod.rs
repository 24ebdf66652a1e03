//! Supabase adapters: GoTrue for authentication, PostgREST for profiles.
//!
//! ```rust,ignore
//! let client = SupabaseClient::new(SupabaseConfig::from_env()?)?;
//! let auth = SupabaseAuth::new(client);
//! let context = SessionContext::new(auth.clone(), auth.profiles(), AuthConfig::from_env()?);
//! ```

mod auth;
mod client;
mod profiles;

pub use auth::SupabaseAuth;
pub use client::{SupabaseClient, SupabaseConfig, TokenResponse, UserInfo, UserMetadata};
pub use profiles::SupabaseProfiles;
