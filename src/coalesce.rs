//! Single-producer in-flight map.
//!
//! [`InFlight`] guarantees that for any key at most one producer runs at a
//! time. Callers that arrive while a producer is outstanding join it and
//! observe the same settled outcome. The entry is retired by the producer
//! task itself as soon as it settles, before the outcome is published, so a
//! failed attempt never blocks the next caller from starting a fresh one.
//!
//! Producers run on their own tokio task: a caller going away does not cancel
//! work that other callers (present or future) still benefit from.

use crate::core::{ReplayError, Result};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde_json::json;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Outcome<V> = Shared<BoxFuture<'static, Result<V>>>;
type Entries<K, V> = Arc<Mutex<HashMap<K, Outcome<V>>>>;

pub struct InFlight<K, V> {
    entries: Entries<K, V>,
}

impl<K, V> InFlight<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Joins the outstanding producer for `key`, or starts `producer` if
    /// there is none. `producer` is only invoked in the latter case.
    pub async fn acquire<F, Fut>(&self, key: K, producer: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let outcome = {
            // Check-and-insert happens under one lock; the spawned task
            // cannot retire the entry before it has been registered.
            let mut entries = lock(&*self.entries);
            match entries.get(&key) {
                Some(existing) => existing.clone(),
                None => {
                    let retire = Retire {
                        entries: Arc::clone(&self.entries),
                        key: key.clone(),
                    };
                    let work = producer();
                    let task = tokio::spawn(async move {
                        let _retire = retire;
                        work.await
                    });
                    let outcome = task
                        .map(|joined| {
                            joined.unwrap_or_else(|err| {
                                Err(ReplayError::unknown(
                                    "in-flight task did not complete",
                                    json!({ "kind": "task", "cause": err.to_string() }),
                                ))
                            })
                        })
                        .boxed()
                        .shared();
                    entries.insert(key, outcome.clone());
                    outcome
                }
            }
        };

        outcome.await
    }

    /// Number of keys with an outstanding producer.
    pub fn len(&self) -> usize {
        lock(&*self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &K) -> bool {
        lock(&*self.entries).contains_key(key)
    }
}

impl<K, V> Default for InFlight<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

fn lock<K, V>(entries: &Mutex<HashMap<K, V>>) -> MutexGuard<'_, HashMap<K, V>> {
    entries.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Removes the entry when the producer task finishes, including by panic.
struct Retire<K: Eq + Hash, V> {
    entries: Entries<K, V>,
    key: K,
}

impl<K: Eq + Hash, V> Drop for Retire<K, V> {
    fn drop(&mut self) {
        lock(&*self.entries).remove(&self.key);
    }
}
