//! Persistence. A small string-keyed KV abstraction with JSON payloads,
//! backed by memory (tests, embedding hosts with their own persistence) or
//! a single JSON file. Profiles sit on top through [`ProfileStore`].

mod file;
mod memory;

pub use file::{default_path, FileStore};
pub use memory::MemoryStore;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::engine::profile::Profile;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage serialization: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("storage backend: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub trait KvStore: Send + Sync {
    fn get_raw(&self, key: &str) -> StoreResult<Option<String>>;
    fn put_raw(&self, key: &str, value: &str) -> StoreResult<()>;
    fn delete(&self, key: &str) -> StoreResult<()>;
}

impl<S: KvStore + ?Sized> KvStore for Arc<S> {
    fn get_raw(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get_raw(key)
    }

    fn put_raw(&self, key: &str, value: &str) -> StoreResult<()> {
        (**self).put_raw(key, value)
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        (**self).delete(key)
    }
}

pub fn get_json<S, T>(store: &S, key: &str) -> StoreResult<Option<T>>
where
    S: KvStore + ?Sized,
    T: DeserializeOwned,
{
    match store.get_raw(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub fn put_json<S, T>(store: &S, key: &str, value: &T) -> StoreResult<()>
where
    S: KvStore + ?Sized,
    T: Serialize,
{
    let raw = serde_json::to_string(value)?;
    store.put_raw(key, &raw)
}

/// Profile persistence seam. The trait is synchronous; both shipped
/// backends resolve in-memory, and callers wrap file IO as needed.
pub trait ProfileStore: Send + Sync {
    fn get(&self, user_id: &str) -> StoreResult<Option<Profile>>;
    fn put(&self, user_id: &str, profile: &Profile) -> StoreResult<()>;
}

/// [`ProfileStore`] over any [`KvStore`], one JSON document per user.
pub struct KvProfileStore<S> {
    store: S,
}

impl<S: KvStore> KvProfileStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn key(user_id: &str) -> String {
        format!("profile:{user_id}")
    }
}

impl<S: KvStore> ProfileStore for KvProfileStore<S> {
    fn get(&self, user_id: &str) -> StoreResult<Option<Profile>> {
        get_json(&self.store, &Self::key(user_id))
    }

    fn put(&self, user_id: &str, profile: &Profile) -> StoreResult<()> {
        put_json(&self.store, &Self::key(user_id), profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_round_trips_through_kv_json() {
        let store = KvProfileStore::new(MemoryStore::new());
        assert!(store.get("ada").unwrap().is_none());

        let mut profile = Profile::default();
        profile.phonological_capacity = 7.25;
        store.put("ada", &profile).unwrap();

        let loaded = store.get("ada").unwrap().unwrap();
        assert_eq!(loaded.phonological_capacity, 7.25);
        assert_eq!(loaded.challenge_areas, profile.challenge_areas);
    }

    #[test]
    fn profile_keys_are_namespaced_per_user() {
        let kv = Arc::new(MemoryStore::new());
        let store = KvProfileStore::new(kv.clone());
        let profile = Profile::default();
        store.put("ada", &profile).unwrap();
        assert!(kv.get_raw("profile:ada").unwrap().is_some());
        assert!(kv.get_raw("profile:grace").unwrap().is_none());
    }
}
