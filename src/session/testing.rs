//! In-memory collaborators for resolver and guard tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use tokio::sync::{Notify, broadcast};

use super::traits::{AuthProvider, BoxError, ProfileStore};
use super::types::{AuthEvent, OAuthOptions, OAuthRedirect, Session};
use crate::types::{Email, Profile, ProviderUserId, Role};

pub(crate) const PASSWORD: &str = "correct horse";

pub(crate) fn session_for(email: &str) -> Session {
    Session::new(
        format!("token-for-{email}"),
        ProviderUserId(format!("id-{email}")),
        email.parse().unwrap(),
    )
}

pub(crate) fn profile(email: &str, role: Role) -> Profile {
    Profile::new(email.parse().unwrap(), "Teacher", role)
}

pub(crate) struct FakeAuth {
    session: Mutex<Option<Session>>,
    gate: Mutex<Option<Arc<Notify>>>,
    failing: AtomicBool,
    get_calls: AtomicUsize,
    sign_in_calls: AtomicUsize,
    sign_outs: AtomicUsize,
    events: broadcast::Sender<AuthEvent>,
}

impl FakeAuth {
    pub(crate) fn signed_out() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            session: Mutex::new(None),
            gate: Mutex::new(None),
            failing: AtomicBool::new(false),
            get_calls: AtomicUsize::new(0),
            sign_in_calls: AtomicUsize::new(0),
            sign_outs: AtomicUsize::new(0),
            events,
        }
    }

    pub(crate) fn signed_in(email: &str) -> Self {
        let auth = Self::signed_out();
        auth.set_session(Some(session_for(email)));
        auth
    }

    pub(crate) fn set_session(&self, session: Option<Session>) {
        *self.session.lock() = session;
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make subsequent `get_session` calls wait for `gate` to be notified.
    pub(crate) fn set_gate(&self, gate: Option<Arc<Notify>>) {
        *self.gate.lock() = gate;
    }

    pub(crate) fn has_session(&self) -> bool {
        self.session.lock().is_some()
    }

    pub(crate) fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn sign_in_calls(&self) -> usize {
        self.sign_in_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn sign_outs(&self) -> usize {
        self.sign_outs.load(Ordering::SeqCst)
    }

    pub(crate) fn emit(&self, event: AuthEvent) {
        let _ = self.events.send(event);
    }
}

impl AuthProvider for FakeAuth {
    async fn get_session(&self) -> Result<Option<Session>, BoxError> {
        let gate = self.gate.lock().clone();
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err("auth service unreachable".into());
        }
        Ok(self.session.lock().clone())
    }

    async fn sign_in_with_password(&self, email: &Email, password: &str) -> Result<Session, BoxError> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        if password != PASSWORD {
            return Err("Invalid login credentials".into());
        }
        let session = session_for(email.as_str());
        self.set_session(Some(session.clone()));
        Ok(session)
    }

    fn sign_in_with_oauth(
        &self,
        provider: &str,
        options: &OAuthOptions,
    ) -> Result<OAuthRedirect, BoxError> {
        let mut url = format!(
            "https://auth.test/authorize?provider={provider}&redirect_to={}",
            options.redirect_to
        );
        for (key, value) in &options.query_params {
            url.push_str(&format!("&{key}={value}"));
        }
        Ok(OAuthRedirect::new(url, "verifier"))
    }

    async fn exchange_code_for_session(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<Session, BoxError> {
        if code_verifier != "verifier" {
            return Err("code verifier mismatch".into());
        }
        // Tests encode the signed-in email in the code
        let session = session_for(code);
        self.set_session(Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), BoxError> {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        self.set_session(None);
        Ok(())
    }

    fn on_auth_state_change(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

#[derive(Default)]
pub(crate) struct FakeProfiles {
    rows: Mutex<Vec<Profile>>,
    failing: AtomicBool,
    lookups: AtomicUsize,
    upserts: AtomicUsize,
}

impl FakeProfiles {
    pub(crate) fn with(rows: Vec<Profile>) -> Self {
        let store = Self::default();
        *store.rows.lock() = rows;
        store
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn set_role(&self, email: &str, role: Role) {
        for row in self.rows.lock().iter_mut() {
            if row.email.as_str() == email {
                row.role = role;
            }
        }
    }

    pub(crate) fn rows(&self) -> Vec<Profile> {
        self.rows.lock().clone()
    }

    pub(crate) fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub(crate) fn upserts(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }
}

impl ProfileStore for FakeProfiles {
    async fn find_by_email(&self, email: &Email) -> Result<Option<Profile>, BoxError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err("connection reset by peer".into());
        }
        Ok(self
            .rows
            .lock()
            .iter()
            .find(|p| &p.email == email && p.active)
            .cloned())
    }

    async fn upsert(&self, profile: Profile) -> Result<Option<Profile>, BoxError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.rows.lock();
        if rows.iter().any(|p| p.email == profile.email) {
            return Ok(None);
        }
        rows.push(profile.clone());
        Ok(Some(profile))
    }
}
