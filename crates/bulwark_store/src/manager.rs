// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use bulwark_clock::Clock;
use bulwark_observe::{Attribute, Observer};
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::AbortHandle;

use crate::resources::{Resource, ResourceId, ResourceSet};
use crate::retry::Lineage;
use crate::telemetry::{
    ADDRESS, ATTEMPT_INDEX, ATTEMPT_IS_LAST, ERROR, FAILURES, MESSAGE, RESOURCE_ID, RETRY_DELAY, SOURCE, StoreActivity,
};
use crate::{ConnectionState, Connector, Diagnostics, LinkEvent, RetryPolicy, StoreError};

/// Keeps connections to a primary data store and any number of backups.
///
/// [`connect`][Self::connect] starts a supervisor task per address. The supervisor opens the
/// connection, keeps it in the resource set while it is healthy, and re-opens it according to the
/// [`RetryPolicy`] when the open fails or the link is lost.
///
/// Connections are ranked by their `connect` call, not by how fast they opened. The earliest call
/// with an open connection is the primary and the others are backups in call order. A primary that
/// is lost, or whose first open fails, takes index 0 back as soon as it is reopened.
///
/// Cloning the manager is cheap and every clone shares the same connections.
///
/// Supervisors and fan-out backups run on the Tokio runtime the calling task runs on. With the
/// system clock, retry delays need the runtime's time driver.
///
/// # Examples
///
/// ```
/// # use std::convert::Infallible;
/// # use bulwark_store::{Connector, LinkEvent};
/// # use futures::stream::{self, Pending};
/// # struct Loopback;
/// # impl Connector for Loopback {
/// #     type Handle = String;
/// #     type Error = Infallible;
/// #     type Events = Pending<LinkEvent>;
/// #     async fn open(&self, address: &str) -> Result<(String, Self::Events), Infallible> {
/// #         Ok((address.to_string(), stream::pending()))
/// #     }
/// #     async fn close(&self, _handle: String) -> Result<(), Infallible> { Ok(()) }
/// # }
/// use bulwark_clock::Clock;
/// use bulwark_store::{ConnectionManager, ConnectionState};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let manager = ConnectionManager::builder(Loopback, Clock::new_system()).build();
/// let mut state = manager.subscribe();
///
/// manager.connect("primary:27017");
/// state.wait_for(|s| *s == ConnectionState::Connected).await.unwrap();
///
/// assert_eq!(manager.primary().unwrap(), "primary:27017");
/// manager.disconnect().await;
/// # }
/// ```
pub struct ConnectionManager<C: Connector> {
    pub(crate) inner: Arc<Inner<C>>,
}

impl<C: Connector> Clone for ConnectionManager<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Connector> Debug for ConnectionManager<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("state", &self.state())
            .field("connections", &self.inner.resources.lock().len())
            .field("policy", &self.inner.policy)
            .finish_non_exhaustive()
    }
}

impl<C: Connector> ConnectionManager<C> {
    /// Starts building a manager that opens connections through `connector`.
    #[must_use]
    pub fn builder(connector: C, clock: Clock) -> ConnectionManagerBuilder<C> {
        ConnectionManagerBuilder::new(connector, clock)
    }

    /// Starts supervising a connection to `address` and returns immediately.
    ///
    /// The returned [`ConnectTask`] stops the supervisor when cancelled. A connection that is open
    /// at that point stays in the resource set until [`disconnect`][Self::disconnect].
    ///
    /// Connecting `address` again while an earlier supervisor of it has given up replaces the
    /// failed one.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a Tokio runtime.
    pub fn connect(&self, address: impl Into<Arc<str>>) -> ConnectTask {
        let address = address.into();
        let runtime = tokio::runtime::Handle::current();

        // A disconnect must see the slot together with its abort handle.
        let mut links = self.inner.links.lock();
        let link = links.open(Arc::clone(&address));
        let abort = runtime
            .spawn(supervise(Arc::clone(&self.inner), link, Arc::clone(&address)))
            .abort_handle();
        links.attach(link, abort.clone());
        drop(links);

        self.inner.publish();

        ConnectTask { address, abort }
    }

    /// Stops every supervisor and closes every open connection.
    ///
    /// Close failures are logged and otherwise ignored.
    pub async fn disconnect(&self) {
        let supervisors = self.inner.links.lock().clear();
        for abort in supervisors {
            abort.abort();
        }

        let resources = self.inner.resources.lock().drain();
        self.inner.publish();

        for resource in resources {
            self.inner.close(resource).await;
        }
    }

    /// Returns the primary connection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when no connection is open.
    pub fn primary(&self) -> Result<C::Handle, StoreError> {
        self.inner.resources.lock().primary().ok_or(StoreError::NotFound)
    }

    /// Returns every open connection, primary first.
    #[must_use]
    pub fn all(&self) -> Vec<C::Handle> {
        self.inner.resources.lock().handles()
    }

    /// The current state, see [`ConnectionState`].
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Returns a receiver that observes every change of [`state`][Self::state].
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// The policy every supervisor of this manager follows.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        self.inner.policy
    }
}

/// Builds a [`ConnectionManager`].
#[derive(Debug)]
pub struct ConnectionManagerBuilder<C> {
    connector: C,
    clock: Clock,
    observer: Option<Observer>,
    policy: RetryPolicy,
    diagnostics: Diagnostics,
}

impl<C: Connector> ConnectionManagerBuilder<C> {
    fn new(connector: C, clock: Clock) -> Self {
        Self {
            connector,
            clock,
            observer: None,
            policy: RetryPolicy::default(),
            diagnostics: Diagnostics::default(),
        }
    }

    /// Sets the observer that receives `store.*` events. Events are discarded when unset.
    #[must_use]
    pub fn observer(mut self, observer: Observer) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Sets how failed connections are retried.
    #[must_use]
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets which driver diagnostics are logged.
    #[must_use]
    pub fn diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Builds the manager. Nothing is connected until [`ConnectionManager::connect`] is called.
    #[must_use]
    pub fn build(self) -> ConnectionManager<C> {
        let (state, _) = watch::channel(ConnectionState::Disconnected);

        ConnectionManager {
            inner: Arc::new(Inner {
                connector: self.connector,
                observer: self.observer.unwrap_or_else(Observer::silent),
                clock: self.clock,
                policy: self.policy,
                diagnostics: self.diagnostics,
                resources: Mutex::new(ResourceSet::default()),
                links: Mutex::new(Links::default()),
                state,
            }),
        }
    }
}

/// Supervision of one address started by [`ConnectionManager::connect`].
#[derive(Debug, Clone)]
pub struct ConnectTask {
    address: Arc<str>,
    abort: AbortHandle,
}

impl ConnectTask {
    /// Stops the supervisor, including any pending retry.
    pub fn cancel(&self) {
        self.abort.abort();
    }

    /// Returns `true` once the supervisor gave up or was cancelled.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }

    /// The supervised address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }
}

pub(crate) struct Inner<C: Connector> {
    connector: C,
    pub(crate) clock: Clock,
    observer: Observer,
    policy: RetryPolicy,
    diagnostics: Diagnostics,
    resources: Mutex<ResourceSet<C::Handle>>,
    links: Mutex<Links>,
    state: watch::Sender<ConnectionState>,
}

impl<C: Connector> Inner<C> {
    pub(crate) fn record(&self, activity: StoreActivity, attributes: &[Attribute]) {
        self.observer.emit(activity.level(), activity.as_str(), attributes);
    }

    fn set_link(&self, link: LinkId, state: ConnectionState) {
        self.links.lock().set(link, state);
        self.publish();
    }

    /// Recomputes the manager state and notifies subscribers when it changed.
    fn publish(&self) {
        let links = self.links.lock();
        let state = if self.resources.lock().len() > 0 {
            ConnectionState::Connected
        } else {
            links.aggregate()
        };

        self.state.send_if_modified(|current| {
            let changed = *current != state;
            *current = state;
            changed
        });
    }

    /// Adds a freshly opened connection to the resource set, unless its link was dropped by a
    /// disconnect in the meantime. The handle is given back in that case.
    fn admit(&self, link: LinkId, address: &Arc<str>, handle: C::Handle) -> Result<ResourceId, C::Handle> {
        let links = self.links.lock();
        if !links.contains(link) {
            return Err(handle);
        }

        Ok(self.resources.lock().push(link, Arc::clone(address), handle))
    }

    async fn close(&self, resource: Resource<C::Handle>) {
        let Resource { id, address, handle, .. } = resource;
        self.close_handle(
            handle,
            vec![Attribute::new(ADDRESS, address.to_string()), Attribute::new(RESOURCE_ID, id.get())],
        )
        .await;
    }

    async fn close_handle(&self, handle: C::Handle, mut attributes: Vec<Attribute>) {
        match self.connector.close(handle).await {
            Ok(()) => self.record(StoreActivity::Closed, &attributes),
            Err(error) => {
                attributes.push(Attribute::new(ERROR, error.to_string()));
                self.record(StoreActivity::CloseFailed, &attributes);
            }
        }
    }

    /// Follows an open link until it fails or is closed by the remote side.
    async fn follow(&self, address: &str, events: &mut C::Events) {
        while let Some(event) = events.next().await {
            match event {
                LinkEvent::Reconnected => self.record(StoreActivity::Reconnected, &[Attribute::new(ADDRESS, address.to_string())]),
                LinkEvent::Diagnostic { source, message } => {
                    if self.diagnostics.admits(&source, &message) {
                        self.record(
                            StoreActivity::Diagnostic,
                            &[
                                Attribute::new(ADDRESS, address.to_string()),
                                Attribute::new(SOURCE, source),
                                Attribute::new(MESSAGE, message),
                            ],
                        );
                    }
                }
                LinkEvent::Error(message) => {
                    self.record(
                        StoreActivity::LinkError,
                        &[Attribute::new(ADDRESS, address.to_string()), Attribute::new(ERROR, message)],
                    );
                    break;
                }
                LinkEvent::Disconnected => break,
            }
        }

        self.record(StoreActivity::LinkLost, &[Attribute::new(ADDRESS, address.to_string())]);
    }
}

/// Opens `address`, keeps the connection while it is healthy and retries until the policy is exhausted.
async fn supervise<C: Connector>(inner: Arc<Inner<C>>, link: LinkId, address: Arc<str>) {
    let mut guard = LinkGuard {
        inner: Arc::clone(&inner),
        link,
        exhausted: false,
    };
    let mut lineage = Lineage::new(inner.policy);
    let address_attribute = Attribute::new(ADDRESS, address.to_string());

    loop {
        inner.set_link(link, ConnectionState::Connecting);
        inner.record(StoreActivity::Connecting, &[address_attribute.clone()]);

        match inner.connector.open(&address).await {
            Ok((handle, mut events)) => {
                lineage.reset();

                let id = match inner.admit(link, &address, handle) {
                    Ok(id) => id,
                    Err(handle) => {
                        inner.close_handle(handle, vec![address_attribute]).await;
                        return;
                    }
                };
                inner.set_link(link, ConnectionState::Connected);
                inner.record(
                    StoreActivity::Connected,
                    &[address_attribute.clone(), Attribute::new(RESOURCE_ID, id.get())],
                );

                inner.follow(&address, &mut events).await;

                // Already gone when a disconnect drained the set while the link was followed.
                let removed = inner.resources.lock().remove(id);
                inner.set_link(link, ConnectionState::Disconnected);

                if let Some(resource) = removed {
                    inner.close(resource).await;
                }
            }
            Err(error) => {
                inner.set_link(link, ConnectionState::Disconnected);
                inner.record(
                    StoreActivity::ConnectFailed,
                    &[address_attribute.clone(), Attribute::new(ERROR, error.to_string())],
                );
            }
        }

        let Some(attempt) = lineage.fail() else {
            guard.exhausted = true;
            inner.set_link(link, ConnectionState::Failed);
            inner.observer.processing_error(
                StoreActivity::RetryExhausted.as_str(),
                &[address_attribute, Attribute::new(FAILURES, lineage.failures())],
            );
            return;
        };

        inner.record(
            StoreActivity::RetryScheduled,
            &[
                address_attribute.clone(),
                Attribute::new(ATTEMPT_INDEX, attempt.index()),
                Attribute::new(ATTEMPT_IS_LAST, attempt.is_last()),
                Attribute::new(RETRY_DELAY, inner.policy.delay()),
            ],
        );

        inner.clock.delay(inner.policy.delay()).await;
    }
}

/// Forgets a supervised link when its supervisor is cancelled.
struct LinkGuard<C: Connector> {
    inner: Arc<Inner<C>>,
    link: LinkId,
    exhausted: bool,
}

impl<C: Connector> Drop for LinkGuard<C> {
    fn drop(&mut self) {
        // An exhausted link stays behind as `Failed`.
        if !self.exhausted {
            self.inner.links.lock().remove(self.link);
            self.inner.publish();
        }
    }
}

type LinkId = u64;

#[derive(Debug)]
struct Link {
    address: Arc<str>,
    state: ConnectionState,
    abort: Option<AbortHandle>,
}

/// Per-address supervision state.
#[derive(Debug, Default)]
struct Links {
    next: LinkId,
    slots: HashMap<LinkId, Link>,
}

impl Links {
    /// Reserves a slot for `address`, forgetting earlier supervisors of it that gave up.
    fn open(&mut self, address: Arc<str>) -> LinkId {
        self.slots
            .retain(|_, link| link.state != ConnectionState::Failed || link.address != address);

        let id = self.next;
        self.next = self.next.wrapping_add(1);
        self.slots.insert(
            id,
            Link {
                address,
                state: ConnectionState::Connecting,
                abort: None,
            },
        );
        id
    }

    fn attach(&mut self, id: LinkId, abort: AbortHandle) {
        if let Some(link) = self.slots.get_mut(&id) {
            link.abort = Some(abort);
        }
    }

    fn set(&mut self, id: LinkId, state: ConnectionState) {
        if let Some(link) = self.slots.get_mut(&id) {
            link.state = state;
        }
    }

    fn contains(&self, id: LinkId) -> bool {
        self.slots.contains_key(&id)
    }

    fn remove(&mut self, id: LinkId) {
        self.slots.remove(&id);
    }

    fn clear(&mut self) -> Vec<AbortHandle> {
        self.slots.drain().filter_map(|(_, link)| link.abort).collect()
    }

    fn aggregate(&self) -> ConnectionState {
        ConnectionState::aggregate(self.slots.values().map(|link| link.state))
    }
}
