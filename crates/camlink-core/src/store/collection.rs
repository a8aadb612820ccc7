// ── Reactive entity collection ──
//
// Concurrent storage keyed by a primary string key, with a secondary id
// index and push-based change notification via a `watch` channel.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::watch;

/// Concurrent, reactive collection for one entity type.
///
/// Every mutation rebuilds the snapshot that subscribers receive.
pub(crate) struct EntityCollection<T: Clone + Send + Sync + 'static> {
    /// Primary storage: key -> entity. Devices are keyed by IP address.
    by_key: DashMap<String, Arc<T>>,

    /// Secondary index: id -> key.
    id_to_key: DashMap<String, String>,

    /// Reverse of `id_to_key` for removal.
    key_to_id: DashMap<String, String>,

    snapshot: watch::Sender<Arc<Vec<Arc<T>>>>,
}

impl<T: Clone + Send + Sync + 'static> EntityCollection<T> {
    pub(crate) fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            by_key: DashMap::new(),
            id_to_key: DashMap::new(),
            key_to_id: DashMap::new(),
            snapshot,
        }
    }

    /// Merge `incoming` into the entity at `key`, or create one from it.
    ///
    /// Runs under the key's shard lock, so a concurrent `update` on the same
    /// key cannot interleave. `id` indexes newly created entities only; a
    /// merge keeps the existing id. Returns the stored value and whether it
    /// was created.
    pub(crate) fn merge_or_insert<U>(
        &self,
        key: String,
        id: String,
        incoming: U,
        merge: impl FnOnce(&mut T, U),
        create: impl FnOnce(U) -> T,
    ) -> (Arc<T>, bool) {
        let (value, is_new) = match self.by_key.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                merge(Arc::make_mut(entry.get_mut()), incoming);
                (Arc::clone(entry.get()), false)
            }
            Entry::Vacant(entry) => {
                let value = Arc::new(create(incoming));
                entry.insert(Arc::clone(&value));
                (value, true)
            }
        };
        if is_new {
            // The newest key claims a shared id; older keys keep their
            // `key_to_id` entry so the id can fall back to them.
            self.id_to_key.insert(id.clone(), key.clone());
            self.key_to_id.insert(key, id);
        }
        self.rebuild_snapshot();
        (value, is_new)
    }

    /// Mutate an entity in place. Returns the updated value, or `None` if
    /// the key is absent.
    pub(crate) fn update(&self, key: &str, f: impl FnOnce(&mut T)) -> Option<Arc<T>> {
        let updated = {
            let mut entry = self.by_key.get_mut(key)?;
            f(Arc::make_mut(entry.value_mut()));
            Arc::clone(entry.value())
        };
        // The shard guard must be released before the snapshot walks the map.
        self.rebuild_snapshot();
        Some(updated)
    }

    /// Remove an entity by key.
    pub(crate) fn remove(&self, key: &str) -> Option<Arc<T>> {
        let removed = self.by_key.remove(key).map(|(_, v)| v);
        if removed.is_some() {
            if let Some((_, id)) = self.key_to_id.remove(key) {
                self.release_id(id, key);
            }
            self.rebuild_snapshot();
        }
        removed
    }

    pub(crate) fn get_by_key(&self, key: &str) -> Option<Arc<T>> {
        self.by_key.get(key).map(|r| Arc::clone(r.value()))
    }

    /// Primary key for an id, if indexed.
    pub(crate) fn key_for_id(&self, id: &str) -> Option<String> {
        self.id_to_key.get(id).map(|r| r.value().clone())
    }

    /// Current snapshot (cheap `Arc` clone).
    pub(crate) fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
        self.snapshot.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<T>>>> {
        self.snapshot.subscribe()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_key.len()
    }

    /// Drop `id`'s index entry if it points at `key`, handing the id to
    /// another key that still carries it.
    fn release_id(&self, id: String, key: &str) {
        if self
            .id_to_key
            .remove_if(&id, |_, indexed| indexed == key)
            .is_none()
        {
            return;
        }
        let fallback = self
            .key_to_id
            .iter()
            .find(|r| *r.value() == id)
            .map(|r| r.key().clone());
        if let Some(other) = fallback {
            self.id_to_key.insert(id, other);
        }
    }

    fn rebuild_snapshot(&self) {
        let values: Vec<Arc<T>> = self.by_key.iter().map(|r| Arc::clone(r.value())).collect();
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn put(col: &EntityCollection<String>, key: &str, id: &str, value: &str) -> bool {
        col.merge_or_insert(
            key.into(),
            id.into(),
            value.to_owned(),
            |existing, newer| *existing = newer,
            |v| v,
        )
        .1
    }

    #[test]
    fn merge_or_insert_reports_new_keys() {
        let col: EntityCollection<String> = EntityCollection::new();
        assert!(put(&col, "10.0.0.1", "a", "one"));
        assert!(!put(&col, "10.0.0.1", "a", "two"));
        assert_eq!(col.len(), 1);
        assert_eq!(*col.get_by_key("10.0.0.1").unwrap(), "two");
    }

    #[test]
    fn merge_keeps_the_first_id() {
        let col: EntityCollection<String> = EntityCollection::new();
        put(&col, "k", "first", "a");
        put(&col, "k", "second", "b");

        assert_eq!(col.key_for_id("first").as_deref(), Some("k"));
        assert!(col.key_for_id("second").is_none());
    }

    #[test]
    fn update_mutates_and_publishes() {
        let col: EntityCollection<String> = EntityCollection::new();
        put(&col, "k", "id", "a");
        let rx = col.subscribe();

        let updated = col.update("k", |s| s.push('b')).unwrap();
        assert_eq!(*updated, "ab");
        assert_eq!(*rx.borrow()[0], "ab");
        assert!(col.update("missing", String::clear).is_none());
    }

    #[test]
    fn shared_id_follows_the_newest_key() {
        let col: EntityCollection<String> = EntityCollection::new();
        put(&col, "10.0.0.1", "cam", "old");
        put(&col, "10.0.0.2", "cam", "new");
        assert_eq!(col.key_for_id("cam").as_deref(), Some("10.0.0.2"));

        // Removing the stale key leaves the live one indexed.
        col.remove("10.0.0.1");
        assert_eq!(col.key_for_id("cam").as_deref(), Some("10.0.0.2"));
    }

    #[test]
    fn shared_id_falls_back_when_the_owner_goes() {
        let col: EntityCollection<String> = EntityCollection::new();
        put(&col, "10.0.0.1", "cam", "old");
        put(&col, "10.0.0.2", "cam", "new");

        col.remove("10.0.0.2");
        assert_eq!(col.key_for_id("cam").as_deref(), Some("10.0.0.1"));
        col.remove("10.0.0.1");
        assert!(col.key_for_id("cam").is_none());
    }

    #[test]
    fn remove_cleans_up_indexes() {
        let col: EntityCollection<String> = EntityCollection::new();
        put(&col, "k", "id", "v");

        assert_eq!(*col.remove("k").unwrap(), "v");
        assert!(col.remove("k").is_none());
        assert!(col.key_for_id("id").is_none());
        assert!(col.snapshot().is_empty());
    }
}
