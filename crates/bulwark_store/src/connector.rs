// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Display;

use futures::Stream;

/// A lifecycle notification pushed by a storage driver for an open connection.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LinkEvent {
    /// The driver re-established the link on its own.
    Reconnected,
    /// The link failed. The connection is dropped and a retry is scheduled.
    Error(String),
    /// The link was closed by the remote side. The connection is dropped and a retry is scheduled.
    Disconnected,
    /// Free-form driver output, logged only when diagnostics are enabled.
    Diagnostic {
        /// The driver component that produced the message, such as `Db` or `Cursor`.
        source: String,
        /// The message itself.
        message: String,
    },
}

/// Opens and closes connections to a data store.
///
/// The connection manager is generic over this trait so it never depends on a concrete client.
/// A connector is shared by every supervisor of a manager and must therefore be `Send + Sync`.
///
/// # Examples
///
/// ```
/// use std::convert::Infallible;
///
/// use bulwark_store::{Connector, LinkEvent};
/// use futures::stream::{self, Pending};
///
/// /// Connects to nothing and never reports link changes.
/// struct Loopback;
///
/// impl Connector for Loopback {
///     type Handle = String;
///     type Error = Infallible;
///     type Events = Pending<LinkEvent>;
///
///     async fn open(&self, address: &str) -> Result<(String, Self::Events), Infallible> {
///         Ok((address.to_string(), stream::pending()))
///     }
///
///     async fn close(&self, _handle: String) -> Result<(), Infallible> {
///         Ok(())
///     }
/// }
/// ```
pub trait Connector: Send + Sync + 'static {
    /// A cheaply cloneable reference to an open connection.
    type Handle: Clone + Send + Sync + 'static;

    /// Why opening or closing failed.
    type Error: Display + Send + 'static;

    /// Lifecycle events of one open connection. The stream ending counts as [`LinkEvent::Disconnected`].
    type Events: Stream<Item = LinkEvent> + Send + Unpin + 'static;

    /// Opens a connection to `address`.
    fn open(&self, address: &str) -> impl Future<Output = Result<(Self::Handle, Self::Events), Self::Error>> + Send;

    /// Closes a connection previously returned by [`open`][Self::open].
    fn close(&self, handle: Self::Handle) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
