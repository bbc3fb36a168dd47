// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{self, Display, Formatter};

/// Connection status published by a [`ConnectionManager`][crate::ConnectionManager].
///
/// With several links the manager reports the best one: any connected link makes the manager
/// `Connected`, and it is `Failed` only when every supervised link gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[non_exhaustive]
pub enum ConnectionState {
    /// Every link has exhausted its retries.
    Failed,
    /// No link is open and none is being opened right now.
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// At least one link is open.
    Connected,
}

impl ConnectionState {
    /// Lowercase name of the state.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Failed => "failed",
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }

    /// Folds per-link states into the state of the manager.
    pub(crate) fn aggregate(states: impl IntoIterator<Item = Self>) -> Self {
        states.into_iter().max().unwrap_or(Self::Disconnected)
    }
}

impl Display for ConnectionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(&[], ConnectionState::Disconnected)]
    #[case(&[ConnectionState::Failed], ConnectionState::Failed)]
    #[case(&[ConnectionState::Failed, ConnectionState::Disconnected], ConnectionState::Disconnected)]
    #[case(&[ConnectionState::Disconnected, ConnectionState::Connecting], ConnectionState::Connecting)]
    #[case(&[ConnectionState::Failed, ConnectionState::Connected, ConnectionState::Connecting], ConnectionState::Connected)]
    fn aggregate_reports_best_link(#[case] links: &[ConnectionState], #[case] expected: ConnectionState) {
        assert_eq!(ConnectionState::aggregate(links.iter().copied()), expected);
    }

    #[test]
    fn display() {
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
    }
}
