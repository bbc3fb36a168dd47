// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one open connection for as long as the process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ResourceId(u64);

impl ResourceId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl Display for ResourceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug)]
pub(crate) struct Resource<H> {
    pub id: ResourceId,
    pub address: Arc<str>,
    pub handle: H,
    slot: u64,
}

/// Open connections ordered by the slot of the `connect` call that opened them. The first one is
/// the primary.
///
/// A connection keeps its slot across reconnects, so a primary that comes back after a lost link or
/// a failed first open takes index 0 again.
#[derive(Debug)]
pub(crate) struct ResourceSet<H> {
    entries: Vec<Resource<H>>,
}

impl<H> Default for ResourceSet<H> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<H: Clone> ResourceSet<H> {
    pub fn push(&mut self, slot: u64, address: Arc<str>, handle: H) -> ResourceId {
        let id = ResourceId::next();
        let position = self.entries.partition_point(|r| r.slot <= slot);
        self.entries.insert(
            position,
            Resource {
                id,
                address,
                handle,
                slot,
            },
        );
        id
    }

    pub fn remove(&mut self, id: ResourceId) -> Option<Resource<H>> {
        let position = self.entries.iter().position(|r| r.id == id)?;
        Some(self.entries.remove(position))
    }

    pub fn primary(&self) -> Option<H> {
        self.entries.first().map(|r| r.handle.clone())
    }

    pub fn handles(&self) -> Vec<H> {
        self.entries.iter().map(|r| r.handle.clone()).collect()
    }

    pub fn drain(&mut self) -> Vec<Resource<H>> {
        std::mem::take(&mut self.entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
