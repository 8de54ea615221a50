//! Mutex-guarded keyed stores backing the session and timer registries.
//!
//! Every operation on a store instance serializes on that store's single
//! mutex, so a read-modify-write expressed as one [`KeyedStore::update`] call
//! can never interleave with another mutation on the same store. Values are
//! cloned in and out; callers never hold a reference into the map.

use std::collections::HashMap;

use thiserror::Error;
use tokio::sync::Mutex;

/// Failures surfaced by the plain store operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A `create` hit a key that is already present.
    #[error("key `{0}` already exists")]
    KeyExists(String),
    /// A `read`/`remove` referenced a key that is not present.
    #[error("key `{0}` does not exist")]
    KeyMissing(String),
}

/// Failures surfaced by [`KeyedStore::update`].
#[derive(Debug, Error)]
pub enum UpdateError<E> {
    /// The key was not present; nothing was applied.
    #[error("key `{0}` does not exist")]
    Missing(String),
    /// The update closure refused the change; the stored value is untouched.
    #[error(transparent)]
    Rejected(E),
}

/// Full CRUD store keyed by string, used for live sessions.
pub struct KeyedStore<T: Clone> {
    entries: Mutex<HashMap<String, T>>,
}

impl<T: Clone> KeyedStore<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Insert `value` under `key`, failing if the key is already taken.
    pub async fn create(&self, key: &str, value: T) -> Result<T, StoreError> {
        let mut entries = self.entries.lock().await;
        if entries.contains_key(key) {
            return Err(StoreError::KeyExists(key.to_owned()));
        }
        entries.insert(key.to_owned(), value.clone());
        Ok(value)
    }

    /// Clone out the value stored under `key`.
    pub async fn read(&self, key: &str) -> Result<T, StoreError> {
        let entries = self.entries.lock().await;
        entries
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::KeyMissing(key.to_owned()))
    }

    /// Atomically apply `apply` to a private copy of the value under `key`.
    ///
    /// The closure runs while the store mutex is held. The new value is
    /// committed and returned only when the closure succeeds; on rejection
    /// the stored value is left exactly as it was.
    pub async fn update<F, E>(&self, key: &str, apply: F) -> Result<T, UpdateError<E>>
    where
        F: FnOnce(&mut T) -> Result<(), E>,
    {
        let mut entries = self.entries.lock().await;
        let Some(current) = entries.get(key) else {
            return Err(UpdateError::Missing(key.to_owned()));
        };
        let mut draft = current.clone();
        apply(&mut draft).map_err(UpdateError::Rejected)?;
        entries.insert(key.to_owned(), draft.clone());
        Ok(draft)
    }

    /// Remove the value under `key`, returning it.
    pub async fn remove(&self, key: &str) -> Result<T, StoreError> {
        let mut entries = self.entries.lock().await;
        entries
            .remove(key)
            .ok_or_else(|| StoreError::KeyMissing(key.to_owned()))
    }

    /// Validate and remove the value under `key` in one locked step.
    ///
    /// `check` runs while the store mutex is held, so no other mutation can
    /// slip between the validation and the removal. On rejection the entry
    /// stays untouched.
    pub async fn remove_if<F, E>(&self, key: &str, check: F) -> Result<T, UpdateError<E>>
    where
        F: FnOnce(&T) -> Result<(), E>,
    {
        let mut entries = self.entries.lock().await;
        let Some(current) = entries.get(key) else {
            return Err(UpdateError::Missing(key.to_owned()));
        };
        check(current).map_err(UpdateError::Rejected)?;
        entries
            .remove(key)
            .ok_or_else(|| UpdateError::Missing(key.to_owned()))
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

impl<T: Clone> Default for KeyedStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Create/contains/remove store for owned handles that cannot be cloned out.
///
/// Used for running timer tasks: [`HandleStore::remove`] is the only way to
/// take ownership of a handle, which makes "delete the handle before acting
/// on it" race-free across concurrent cancellers.
pub struct HandleStore<T> {
    entries: Mutex<HashMap<String, T>>,
}

impl<T> HandleStore<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Insert `value` under `key`, failing if the key is already taken.
    pub async fn create(&self, key: &str, value: T) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        if entries.contains_key(key) {
            return Err(StoreError::KeyExists(key.to_owned()));
        }
        entries.insert(key.to_owned(), value);
        Ok(())
    }

    /// Whether a handle is currently stored under `key`.
    pub async fn contains(&self, key: &str) -> bool {
        self.entries.lock().await.contains_key(key)
    }

    /// Remove and return the handle under `key`.
    ///
    /// A [`StoreError::KeyMissing`] result means another caller already took
    /// the handle; treat it as "nothing left to cancel".
    pub async fn remove(&self, key: &str) -> Result<T, StoreError> {
        let mut entries = self.entries.lock().await;
        entries
            .remove(key)
            .ok_or_else(|| StoreError::KeyMissing(key.to_owned()))
    }
}

impl<T> Default for HandleStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn create_rejects_duplicate_keys() {
        let store = KeyedStore::new();
        assert_eq!(store.create("a", 1).await, Ok(1));
        assert_eq!(
            store.create("a", 2).await,
            Err(StoreError::KeyExists("a".into()))
        );
        assert_eq!(store.read("a").await, Ok(1));
    }

    #[tokio::test]
    async fn read_and_remove_missing_keys_fail() {
        let store: KeyedStore<u32> = KeyedStore::new();
        assert_eq!(store.read("a").await, Err(StoreError::KeyMissing("a".into())));
        assert_eq!(
            store.remove("a").await,
            Err(StoreError::KeyMissing("a".into()))
        );
    }

    #[tokio::test]
    async fn update_commits_only_on_success() {
        let store = KeyedStore::new();
        store.create("a", 10).await.unwrap();

        let committed = store
            .update("a", |value: &mut u32| {
                *value += 1;
                Ok::<_, &str>(())
            })
            .await
            .unwrap();
        assert_eq!(committed, 11);

        let rejected = store
            .update("a", |value: &mut u32| {
                *value = 999;
                Err("nope")
            })
            .await;
        assert!(matches!(rejected, Err(UpdateError::Rejected("nope"))));
        assert_eq!(store.read("a").await, Ok(11));
    }

    #[tokio::test]
    async fn update_missing_key_fails_without_applying() {
        let store: KeyedStore<u32> = KeyedStore::new();
        let result = store
            .update("a", |_value| Ok::<_, &str>(()))
            .await;
        assert!(matches!(result, Err(UpdateError::Missing(_))));
    }

    #[tokio::test]
    async fn remove_if_removes_only_on_passing_check() {
        let store = KeyedStore::new();
        store.create("a", 5).await.unwrap();

        let rejected = store
            .remove_if("a", |value: &u32| {
                if *value > 3 { Err("too big") } else { Ok(()) }
            })
            .await;
        assert!(matches!(rejected, Err(UpdateError::Rejected("too big"))));
        assert_eq!(store.read("a").await, Ok(5));

        let removed = store.remove_if("a", |_value| Ok::<_, &str>(())).await;
        assert!(matches!(removed, Ok(5)));
        assert!(matches!(
            store.remove_if("a", |_value| Ok::<_, &str>(())).await,
            Err(UpdateError::Missing(_))
        ));
    }

    #[tokio::test]
    async fn remove_returns_prior_value() {
        let store = KeyedStore::new();
        store.create("a", 7).await.unwrap();
        assert_eq!(store.remove("a").await, Ok(7));
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn concurrent_updates_are_serialized() {
        let store = Arc::new(KeyedStore::new());
        store.create("counter", 0u32).await.unwrap();

        let mut tasks = Vec::new();
        for _ in 0..100 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store
                    .update("counter", |value| {
                        *value += 1;
                        Ok::<_, ()>(())
                    })
                    .await
                    .unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(store.read("counter").await, Ok(100));
    }

    #[tokio::test]
    async fn handle_store_single_consumer_wins() {
        let store = HandleStore::new();
        store.create("t", "handle").await.unwrap();
        assert!(store.contains("t").await);

        assert_eq!(store.remove("t").await, Ok("handle"));
        assert_eq!(
            store.remove("t").await,
            Err(StoreError::KeyMissing("t".into()))
        );
        assert!(!store.contains("t").await);
    }
}
