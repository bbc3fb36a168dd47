// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::sync::Arc;

use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
use parking_lot::Mutex;

use crate::{Connector, LinkEvent};

/// An in-memory [`Connector`] for tests.
///
/// Opens succeed unless failures were scripted with [`fail_opens`][Self::fail_opens] or
/// [`refuse`][Self::refuse]. Every open connection gets an event channel that tests feed through
/// [`send`][Self::send].
///
/// Available only with the `test-util` feature.
#[derive(Debug, Clone, Default)]
pub struct FakeConnector {
    state: Arc<Mutex<FakeState>>,
}

#[derive(Debug, Default)]
struct FakeState {
    next_id: u32,
    pending_failures: HashMap<String, u32>,
    refused: Vec<String>,
    fail_closes: bool,
    opened: Vec<String>,
    closed: Vec<FakeHandle>,
    links: HashMap<u32, UnboundedSender<LinkEvent>>,
}

/// A connection opened by [`FakeConnector`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FakeHandle {
    id: u32,
    address: Arc<str>,
}

impl FakeHandle {
    /// Unique per connector.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// The address the connection was opened to.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }
}

/// A scripted failure of [`FakeConnector`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct FakeError(String);

impl FakeConnector {
    /// Creates a connector whose opens all succeed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `times` opens of `address` fail.
    pub fn fail_opens(&self, address: &str, times: u32) {
        self.state.lock().pending_failures.insert(address.to_string(), times);
    }

    /// Makes every open of `address` fail.
    pub fn refuse(&self, address: &str) {
        self.state.lock().refused.push(address.to_string());
    }

    /// Makes every close fail. The connection is still forgotten.
    pub fn fail_closes(&self, fail: bool) {
        self.state.lock().fail_closes = fail;
    }

    /// Addresses of every open attempt, in order.
    #[must_use]
    pub fn opened(&self) -> Vec<String> {
        self.state.lock().opened.clone()
    }

    /// Number of open attempts for `address`.
    #[must_use]
    pub fn open_count(&self, address: &str) -> usize {
        self.state.lock().opened.iter().filter(|a| *a == address).count()
    }

    /// Connections passed to [`Connector::close`], in order.
    #[must_use]
    pub fn closed(&self) -> Vec<FakeHandle> {
        self.state.lock().closed.clone()
    }

    /// Pushes `event` to the link of `handle`. Returns `false` if the link is gone.
    pub fn send(&self, handle: &FakeHandle, event: LinkEvent) -> bool {
        self.state
            .lock()
            .links
            .get(&handle.id)
            .is_some_and(|link| link.unbounded_send(event).is_ok())
    }
}

impl Connector for FakeConnector {
    type Handle = FakeHandle;
    type Error = FakeError;
    type Events = UnboundedReceiver<LinkEvent>;

    async fn open(&self, address: &str) -> Result<(FakeHandle, UnboundedReceiver<LinkEvent>), FakeError> {
        let mut state = self.state.lock();
        state.opened.push(address.to_string());

        if state.refused.iter().any(|a| a == address) {
            return Err(FakeError(format!("connection to {address} refused")));
        }

        if let Some(remaining) = state.pending_failures.get_mut(address).filter(|r| **r > 0) {
            *remaining -= 1;
            return Err(FakeError(format!("connection to {address} timed out")));
        }

        state.next_id += 1;
        let handle = FakeHandle {
            id: state.next_id,
            address: Arc::from(address),
        };
        let (sender, receiver) = unbounded();
        state.links.insert(handle.id, sender);

        Ok((handle, receiver))
    }

    async fn close(&self, handle: FakeHandle) -> Result<(), FakeError> {
        let mut state = self.state.lock();
        state.links.remove(&handle.id);
        state.closed.push(handle.clone());

        if state.fail_closes {
            return Err(FakeError(format!("closing {} failed", handle.address)));
        }

        Ok(())
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use futures::executor::block_on;

    use super::*;

    #[test]
    fn scripted_failures_run_out() {
        let connector = FakeConnector::new();
        connector.fail_opens("a", 1);

        block_on(async {
            assert!(connector.open("a").await.is_err());
            assert!(connector.open("a").await.is_ok());
        });

        assert_eq!(connector.open_count("a"), 2);
    }

    #[test]
    fn events_reach_the_link() {
        let connector = FakeConnector::new();

        block_on(async {
            let (handle, mut events) = connector.open("a").await.unwrap();
            assert!(connector.send(&handle, LinkEvent::Reconnected));
            assert_eq!(events.next().await, Some(LinkEvent::Reconnected));

            connector.close(handle.clone()).await.unwrap();
            assert!(!connector.send(&handle, LinkEvent::Disconnected));
            assert_eq!(events.next().await, None);
        });
    }
}
