// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

/// The result of an operation together with how long it took.
///
/// Produced by [`Clock::timed`][crate::Clock::timed].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct Timed<R> {
    /// The value produced by the operation.
    pub result: R,
    /// The time the operation took.
    pub duration: Duration,
}

impl<R> Timed<R> {
    /// Maps the result while keeping the duration.
    pub fn map<U>(self, f: impl FnOnce(R) -> U) -> Timed<U> {
        Timed {
            result: f(self.result),
            duration: self.duration,
        }
    }
}
