use std::sync::Arc;

use increator_kv::{KVStore, WriteBatch};
use tracing::debug;

use crate::error::{IdentityError, Result};
use crate::keys::{creator_key, creator_prefix, handle_key};
use crate::types::{Platform, Profile, ProfileId};

/// The `creators` collection: profile snapshots keyed by profile id, with a
/// uniqueness index over verified `(platform, handle)` pairs.
pub struct CreatorStore {
    store: Arc<dyn KVStore>,
}

impl CreatorStore {
    pub fn new(store: Arc<dyn KVStore>) -> Self {
        Self { store }
    }

    /// Insert or supersede a profile snapshot.
    ///
    /// Fails with [`IdentityError::Conflict`] if the profile is verified and
    /// its handle on this platform is held by a different profile.
    pub fn insert(&self, profile: &Profile) -> Result<()> {
        profile.validate()?;

        let key = creator_key(&profile.id);
        let previous = self.get(&profile.id)?;
        let mut batch = WriteBatch::new();

        let new_handle = profile
            .verified
            .then(|| profile.handle())
            .flatten()
            .map(|h| handle_key(profile.platform, h));

        if let Some(hk) = &new_handle {
            if let Some(holder) = self.read(hk)? {
                let holder = String::from_utf8_lossy(&holder);
                if holder != profile.id.as_str() {
                    return Err(IdentityError::Conflict(format!(
                        "{} handle {:?} already held by {holder}",
                        profile.platform,
                        profile.handle().unwrap_or_default()
                    )));
                }
            }
            batch.put(hk.as_str(), profile.id.as_str().as_bytes());
        }

        // A superseded snapshot may have held a different verified handle.
        if let Some(prev) = &previous {
            let old_handle = prev
                .verified
                .then(|| prev.handle())
                .flatten()
                .map(|h| handle_key(prev.platform, h));
            if let Some(old) = old_handle {
                if Some(&old) != new_handle.as_ref() {
                    batch.delete(old);
                }
            }
        }

        let data = rmp_serde::to_vec_named(profile)
            .map_err(|e| IdentityError::Serialization(e.to_string()))?;
        batch.put(key.as_str(), data);

        self.store
            .write(&batch)
            .map_err(|e| IdentityError::storage("insert creator", key, e))?;
        debug!(id = %profile.id, superseded = previous.is_some(), "identity: stored creator");
        Ok(())
    }

    pub fn get(&self, id: &ProfileId) -> Result<Option<Profile>> {
        match self.read(&creator_key(id))? {
            Some(data) => Ok(Some(decode(&data)?)),
            None => Ok(None),
        }
    }

    /// Like [`CreatorStore::get`] but absent profiles are an error.
    pub fn require(&self, id: &ProfileId) -> Result<Profile> {
        self.get(id)?
            .ok_or_else(|| IdentityError::NotFound(format!("profile {id}")))
    }

    /// Look up the profile holding a verified handle on a platform.
    pub fn by_handle(&self, platform: Platform, handle: &str) -> Result<Option<Profile>> {
        match self.read(&handle_key(platform, handle))? {
            Some(id) => self.get(&ProfileId::new(String::from_utf8_lossy(&id))),
            None => Ok(None),
        }
    }

    /// All stored profiles, ordered by id.
    pub fn list(&self) -> Result<Vec<Profile>> {
        let entries = self
            .store
            .scan(creator_prefix())
            .map_err(|e| IdentityError::storage("scan", creator_prefix(), e))?;
        entries.iter().map(|(_, v)| decode(v)).collect()
    }

    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.store
            .get(key)
            .map_err(|e| IdentityError::storage("get", key, e))
    }
}

fn decode(data: &[u8]) -> Result<Profile> {
    rmp_serde::from_slice(data).map_err(|e| IdentityError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use increator_kv::MemoryStore;

    fn store() -> CreatorStore {
        CreatorStore::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_insert_and_get() {
        let s = store();
        let p = Profile::new("yt:1", Platform::Youtube)
            .with_handle("@tech")
            .with_bio("gadgets")
            .with_followers(1200);
        s.insert(&p).unwrap();
        assert_eq!(s.get(&p.id).unwrap(), Some(p.clone()));
        assert_eq!(s.require(&p.id).unwrap(), p);
        assert!(matches!(
            s.require(&ProfileId::from("yt:missing")),
            Err(IdentityError::NotFound(_))
        ));
    }

    #[test]
    fn test_verified_handle_is_unique_per_platform() {
        let s = store();
        let a = Profile::new("yt:1", Platform::Youtube).with_handle("@tech").verified();
        let b = Profile::new("yt:2", Platform::Youtube).with_handle("@tech").verified();
        let c = Profile::new("ig:1", Platform::Instagram).with_handle("@tech").verified();

        s.insert(&a).unwrap();
        assert!(matches!(s.insert(&b), Err(IdentityError::Conflict(_))));
        s.insert(&c).unwrap();

        assert_eq!(s.by_handle(Platform::Youtube, "@tech").unwrap().unwrap().id, a.id);
        assert_eq!(s.by_handle(Platform::Instagram, "@tech").unwrap().unwrap().id, c.id);
    }

    #[test]
    fn test_unverified_handles_may_repeat() {
        let s = store();
        s.insert(&Profile::new("yt:1", Platform::Youtube).with_handle("@tech")).unwrap();
        s.insert(&Profile::new("yt:2", Platform::Youtube).with_handle("@tech")).unwrap();
        assert!(s.by_handle(Platform::Youtube, "@tech").unwrap().is_none());
        assert_eq!(s.list().unwrap().len(), 2);
    }

    #[test]
    fn test_reinsert_supersedes_snapshot_and_handle() {
        let s = store();
        let v1 = Profile::new("yt:1", Platform::Youtube).with_handle("@old").verified();
        s.insert(&v1).unwrap();
        s.insert(&v1).unwrap();

        let v2 = Profile::new("yt:1", Platform::Youtube).with_handle("@new").verified();
        s.insert(&v2).unwrap();

        assert!(s.by_handle(Platform::Youtube, "@old").unwrap().is_none());
        assert_eq!(s.by_handle(Platform::Youtube, "@new").unwrap(), Some(v2));

        // The released handle is free again.
        let other = Profile::new("yt:2", Platform::Youtube).with_handle("@old").verified();
        s.insert(&other).unwrap();
    }

    #[test]
    fn test_invalid_profile_rejected() {
        let s = store();
        let p = Profile::new("yt:1", Platform::Youtube).verified();
        assert!(matches!(s.insert(&p), Err(IdentityError::Validation(_))));
        assert!(s.list().unwrap().is_empty());
    }
}
