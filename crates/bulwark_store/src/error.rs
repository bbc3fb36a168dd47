// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// Errors reported by [`ConnectionManager`][crate::ConnectionManager] lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    /// No connection has been established yet, or every connection was lost.
    #[error("no primary data store is connected")]
    NotFound,
}

/// Why a fan-out operation did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum FanoutError<E> {
    /// The operation was given no resources; it was not run at all.
    #[error("invalid call for data store operation: the resource set is empty")]
    EmptyResourceSet,

    /// The operation failed on the primary; no backup was called.
    #[error("primary data store operation failed: {0}")]
    Primary(E),
}

impl<E> FanoutError<E> {
    /// Returns the primary's error, if that is why the operation failed.
    pub fn into_primary(self) -> Option<E> {
        match self {
            Self::Primary(error) => Some(error),
            Self::EmptyResourceSet => None,
        }
    }
}
