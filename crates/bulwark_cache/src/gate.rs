// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Per-key loading gates that coalesce concurrent misses.

use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::hash::Hash;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async mutex per key with a load in progress.
///
/// The map only holds weak references; a gate lives as long as some caller holds or waits on it
/// and its map slot is removed by the last holder.
pub(crate) struct Gates<K> {
    gates: Mutex<HashMap<K, Weak<AsyncMutex<()>>>>,
}

impl<K> Default for Gates<K> {
    fn default() -> Self {
        Self {
            gates: Mutex::new(HashMap::new()),
        }
    }
}

impl<K> Debug for Gates<K> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gates").field("len", &self.gates.lock().len()).finish()
    }
}

impl<K> Gates<K>
where
    K: Clone + Eq + Hash,
{
    /// Waits until the caller is the only one loading `key`.
    pub(crate) async fn acquire(&self, key: &K) -> GateGuard<'_, K> {
        let gate = {
            let mut gates = self.gates.lock();

            if let Some(gate) = gates.get(key).and_then(Weak::upgrade) {
                gate
            } else {
                let gate = Arc::new(AsyncMutex::new(()));
                gates.insert(key.clone(), Arc::downgrade(&gate));
                gate
            }
        };

        let guard = Arc::clone(&gate).lock_owned().await;

        GateGuard {
            gates: self,
            key: key.clone(),
            gate,
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.gates.lock().len()
    }
}

/// Holds a key's gate; dropping it lets the next waiter in.
pub(crate) struct GateGuard<'a, K>
where
    K: Clone + Eq + Hash,
{
    gates: &'a Gates<K>,
    key: K,
    gate: Arc<AsyncMutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<K> Debug for GateGuard<'_, K>
where
    K: Clone + Eq + Hash,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("GateGuard").finish_non_exhaustive()
    }
}

impl<K> Drop for GateGuard<'_, K>
where
    K: Clone + Eq + Hash,
{
    fn drop(&mut self) {
        // The owned guard keeps its own reference to the gate; release it before counting.
        drop(self.guard.take());

        let mut gates = self.gates.gates.lock();
        let ours = gates.get(&self.key).is_some_and(|slot| slot.as_ptr() == Arc::as_ptr(&self.gate));

        if ours && Arc::strong_count(&self.gate) == 1 {
            gates.remove(&self.key);
        }
    }
}
