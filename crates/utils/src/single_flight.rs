// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use std::{
    collections::HashMap,
    future::Future,
    hash::Hash,
    sync::{Arc, Mutex, PoisonError},
};
use tokio::sync::OnceCell;
use tracing::trace;

/// A read-through cache where concurrent first-time lookups of the same key collapse into a
/// single in-flight initialisation. A failed initialisation leaves the slot empty so that the
/// next caller tries again.
#[derive(Debug)]
pub struct SingleFlight<K, V> {
    slots: Mutex<HashMap<K, Arc<OnceCell<V>>>>,
}

impl<K, V> Default for SingleFlight<K, V> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &K) -> Arc<OnceCell<V>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(key.clone()).or_default().clone()
    }

    /// Return the cached value for `key`, running `init` if nobody has populated it yet.
    pub async fn get_or_try_init<F, Fut, E>(&self, key: &K, init: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let slot = self.slot(key);
        if let Some(value) = slot.get() {
            trace!("cache hit for {:?}", key);
            return Ok(value.clone());
        }
        slot.get_or_try_init(init).await.cloned()
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.get(key).and_then(|slot| slot.get().cloned())
    }

    /// Remove every populated entry and hand the values back to the caller.
    pub fn drain(&self) -> Vec<V> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .drain()
            .filter_map(|(_, slot)| slot.get().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn concurrent_lookups_share_one_init() {
        let cache: Arc<SingleFlight<String, u64>> = Arc::new(SingleFlight::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks = (0..16).map(|_| {
            let cache = cache.clone();
            let calls = calls.clone();
            tokio::spawn(async move {
                cache
                    .get_or_try_init(&"relayer".to_string(), || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok::<_, String>(42)
                    })
                    .await
            })
        });

        for result in futures::future::join_all(tasks).await {
            assert_eq!(result.unwrap().unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let cache: SingleFlight<&'static str, u64> = SingleFlight::new();

        let err = cache
            .get_or_try_init(&"a", || async { Err::<u64, _>("boom") })
            .await;
        assert_eq!(err, Err("boom"));
        assert_eq!(cache.get(&"a"), None);

        let ok = cache
            .get_or_try_init(&"a", || async { Ok::<_, &str>(7) })
            .await;
        assert_eq!(ok, Ok(7));
        assert_eq!(cache.get(&"a"), Some(7));
    }

    #[tokio::test]
    async fn drain_empties_the_cache() {
        let cache: SingleFlight<u8, u8> = SingleFlight::new();
        cache
            .get_or_try_init(&1, || async { Ok::<_, ()>(10) })
            .await
            .unwrap();
        cache
            .get_or_try_init(&2, || async { Ok::<_, ()>(20) })
            .await
            .unwrap();

        let mut drained = cache.drain();
        drained.sort();
        assert_eq!(drained, vec![10, 20]);
        assert!(cache.drain().is_empty());
    }
}
