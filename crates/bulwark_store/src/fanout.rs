// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use bulwark_observe::Attribute;

use crate::manager::Inner;
use crate::telemetry::{BACKUP_INDEX, ERROR, RESOURCE, STATUS, Status, StoreActivity, duration_ms};
use crate::{ConnectionManager, Connector, FanoutError};

impl<C: Connector> ConnectionManager<C> {
    /// Runs `operation` against the primary and, if it succeeds, against every backup.
    ///
    /// The first entry of `resources` is the primary. Its operation is awaited and decides the
    /// result. Only after it succeeded is `operation` started on each remaining entry, every one on
    /// its own task. Those backup calls are not awaited; their outcome is logged and never changes
    /// the returned value. Backups are not retried.
    ///
    /// Every call emits a `store.operation` event per resource with `resource` (`primary` or
    /// `backup_<index>`), `status` and `duration_ms`.
    ///
    /// # Errors
    ///
    /// Returns [`FanoutError::EmptyResourceSet`] without calling `operation` when `resources` is
    /// empty, and [`FanoutError::Primary`] when the primary's operation fails. No backup is called
    /// in either case.
    ///
    /// # Panics
    ///
    /// Panics when backups are present and the call is made outside of a Tokio runtime.
    pub async fn run_with_fanout<Op, Fut, R, E>(&self, resources: Vec<C::Handle>, operation: Op) -> Result<R, FanoutError<E>>
    where
        Op: Fn(C::Handle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: Send + 'static,
        E: Display + Send + 'static,
    {
        let mut resources = resources.into_iter();

        let Some(primary) = resources.next() else {
            self.inner.record(StoreActivity::OperationRejected, &[]);
            return Err(FanoutError::EmptyResourceSet);
        };

        let timed = self.inner.clock.timed(operation(primary)).await;

        let value = match timed.result {
            Ok(value) => {
                self.inner.record_outcome("primary".into(), Status::Success, timed.duration);
                value
            }
            Err(error) => {
                self.inner.record_outcome("primary".into(), Status::Failure, timed.duration);
                self.inner.record(
                    StoreActivity::PrimaryFailed,
                    &[Attribute::new(ERROR, error.to_string()), duration_ms(timed.duration)],
                );
                return Err(FanoutError::Primary(error));
            }
        };

        let operation = Arc::new(operation);

        for (offset, backup) in resources.enumerate() {
            let index = offset + 1;
            let inner = Arc::clone(&self.inner);
            let operation = Arc::clone(&operation);

            tokio::spawn(async move {
                let timed = inner.clock.timed((*operation)(backup)).await;
                inner.record_backup(index, timed.result.err(), timed.duration);
            });
        }

        Ok(value)
    }

    /// Runs `operation` against the current primary and backups.
    ///
    /// Equivalent to `run_with_fanout(self.all(), operation)`.
    ///
    /// # Errors
    ///
    /// See [`run_with_fanout`][Self::run_with_fanout].
    pub async fn run<Op, Fut, R, E>(&self, operation: Op) -> Result<R, FanoutError<E>>
    where
        Op: Fn(C::Handle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: Send + 'static,
        E: Display + Send + 'static,
    {
        self.run_with_fanout(self.all(), operation).await
    }
}

impl<C: Connector> Inner<C> {
    fn record_outcome(&self, resource: String, status: Status, duration: Duration) {
        self.record(
            StoreActivity::Operation,
            &[
                Attribute::new(RESOURCE, resource),
                Attribute::new(STATUS, status.as_str()),
                duration_ms(duration),
            ],
        );
    }

    fn record_backup<E: Display>(&self, index: usize, error: Option<E>, duration: Duration) {
        let resource = format!("backup_{index}");

        let Some(error) = error else {
            self.record_outcome(resource, Status::Success, duration);
            return;
        };

        self.record_outcome(resource, Status::Failure, duration);
        self.record(
            StoreActivity::BackupFailed,
            &[
                Attribute::new(BACKUP_INDEX, index),
                Attribute::new(ERROR, error.to_string()),
                duration_ms(duration),
            ],
        );
    }
}
