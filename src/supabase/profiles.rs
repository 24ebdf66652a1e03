use std::sync::Arc;

use parking_lot::RwLock;

use super::client::SupabaseClient;
use crate::session::{BoxError, ProfileStore, Session};
use crate::types::{Email, Profile};

/// [`ProfileStore`] over the project's profile table via PostgREST.
///
/// Queries run with the signed-in user's access token so row-level security
/// applies; with no session they fall back to the anon key.
#[derive(Clone)]
pub struct SupabaseProfiles {
    client: Arc<SupabaseClient>,
    session: Arc<RwLock<Option<Session>>>,
}

impl SupabaseProfiles {
    pub(crate) fn new(client: Arc<SupabaseClient>, session: Arc<RwLock<Option<Session>>>) -> Self {
        Self { client, session }
    }

    /// Store that always queries with the anon key.
    #[must_use]
    pub fn anonymous(client: Arc<SupabaseClient>) -> Self {
        Self::new(client, Arc::new(RwLock::new(None)))
    }

    fn access_token(&self) -> Option<String> {
        self.session.read().as_ref().map(|s| s.access_token.clone())
    }
}

impl ProfileStore for SupabaseProfiles {
    async fn find_by_email(&self, email: &Email) -> Result<Option<Profile>, BoxError> {
        let token = self.access_token();
        let profile = self.client.select_profile(token.as_deref(), email).await?;
        tracing::debug!(%email, found = profile.is_some(), "profile lookup");
        Ok(profile)
    }

    async fn upsert(&self, profile: Profile) -> Result<Option<Profile>, BoxError> {
        let token = self.access_token();
        let stored = self.client.insert_profile(token.as_deref(), &profile).await?;
        tracing::debug!(email = %profile.email, inserted = stored.is_some(), "profile provisioning");
        Ok(stored)
    }
}
