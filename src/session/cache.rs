use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::types::{Email, Profile};

struct Entry {
    profile: Profile,
    stored_at: Instant,
}

/// Single-slot mirror of the last resolved profile.
///
/// At most one identity is active on a client, so there is no eviction policy:
/// `put` replaces the slot. With a TTL, entries older than it read as misses
/// so role changes made by an administrator are picked up without a sign-out.
pub struct ProfileCache {
    slot: Mutex<Option<Entry>>,
    ttl: Option<Duration>,
}

impl ProfileCache {
    /// Create a cache whose entries expire after `ttl` (`None`: never).
    #[must_use]
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            slot: Mutex::new(None),
            ttl,
        }
    }

    /// Cached profile for `email`, if the slot holds that email and is still fresh.
    #[must_use]
    pub fn get(&self, email: &Email) -> Option<Profile> {
        let mut slot = self.slot.lock();
        let entry = slot.as_ref()?;
        if &entry.profile.email != email {
            return None;
        }
        if self.ttl.is_some_and(|ttl| entry.stored_at.elapsed() >= ttl) {
            *slot = None;
            return None;
        }
        Some(entry.profile.clone())
    }

    pub fn put(&self, profile: Profile) {
        *self.slot.lock() = Some(Entry {
            profile,
            stored_at: Instant::now(),
        });
    }

    pub fn clear(&self) {
        *self.slot.lock() = None;
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slot.lock().is_none()
    }
}

impl Default for ProfileCache {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    fn profile(email: &str, role: Role) -> Profile {
        Profile::new(email.parse().unwrap(), "Ana", role)
    }

    #[test]
    fn hit_for_same_email_only() {
        let cache = ProfileCache::default();
        cache.put(profile("ana@school.edu", Role::Admin));

        let hit = cache.get(&"ana@school.edu".parse().unwrap()).unwrap();
        assert_eq!(hit.role, Role::Admin);
        assert!(cache.get(&"bob@school.edu".parse().unwrap()).is_none());
    }

    #[test]
    fn put_replaces_slot() {
        let cache = ProfileCache::default();
        cache.put(profile("ana@school.edu", Role::User));
        cache.put(profile("bob@school.edu", Role::User));

        assert!(cache.get(&"ana@school.edu".parse().unwrap()).is_none());
        assert!(cache.get(&"bob@school.edu".parse().unwrap()).is_some());
    }

    #[test]
    fn clear_empties() {
        let cache = ProfileCache::default();
        cache.put(profile("ana@school.edu", Role::User));
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get(&"ana@school.edu".parse().unwrap()).is_none());
    }

    #[test]
    fn expired_entry_is_a_miss() {
        let cache = ProfileCache::new(Some(Duration::ZERO));
        cache.put(profile("ana@school.edu", Role::User));
        assert!(cache.get(&"ana@school.edu".parse().unwrap()).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn long_ttl_keeps_entry() {
        let cache = ProfileCache::new(Some(Duration::from_secs(3600)));
        cache.put(profile("ana@school.edu", Role::User));
        assert!(cache.get(&"ana@school.edu".parse().unwrap()).is_some());
    }
}
