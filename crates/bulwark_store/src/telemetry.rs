// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use bulwark_observe::{Attribute, Level};

pub(crate) const ADDRESS: &str = "store.address";
pub(crate) const RESOURCE_ID: &str = "store.resource_id";
pub(crate) const ERROR: &str = "store.error";
pub(crate) const MESSAGE: &str = "store.message";
pub(crate) const SOURCE: &str = "store.source";
pub(crate) const ATTEMPT_INDEX: &str = "store.attempt.index";
pub(crate) const ATTEMPT_IS_LAST: &str = "store.attempt.is_last";
pub(crate) const RETRY_DELAY: &str = "store.retry.delay";
pub(crate) const FAILURES: &str = "store.failures";
pub(crate) const BACKUP_INDEX: &str = "store.backup.index";

pub(crate) const RESOURCE: &str = "resource";
pub(crate) const STATUS: &str = "status";
pub(crate) const DURATION_MS: &str = "duration_ms";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StoreActivity {
    Connecting,
    Connected,
    ConnectFailed,
    Reconnected,
    LinkError,
    LinkLost,
    Diagnostic,
    RetryScheduled,
    RetryExhausted,
    Closed,
    CloseFailed,
    Operation,
    OperationRejected,
    PrimaryFailed,
    BackupFailed,
}

impl StoreActivity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "store.connecting",
            Self::Connected => "store.connected",
            Self::ConnectFailed => "store.connect_failed",
            Self::Reconnected => "store.reconnected",
            Self::LinkError => "store.link_error",
            Self::LinkLost => "store.link_lost",
            Self::Diagnostic => "store.diagnostic",
            Self::RetryScheduled => "store.retry_scheduled",
            Self::RetryExhausted => "store.retry_exhausted",
            Self::Closed => "store.closed",
            Self::CloseFailed => "store.close_failed",
            Self::Operation => "store.operation",
            Self::OperationRejected => "store.operation_rejected",
            Self::PrimaryFailed => "store.primary_failed",
            Self::BackupFailed => "store.backup_failed",
        }
    }

    pub fn level(self) -> Level {
        match self {
            Self::Diagnostic => Level::Trace,
            Self::Connecting | Self::Connected | Self::Reconnected | Self::LinkLost | Self::Closed | Self::Operation => Level::Info,
            Self::RetryScheduled => Level::Warn,
            Self::ConnectFailed
            | Self::LinkError
            | Self::RetryExhausted
            | Self::CloseFailed
            | Self::OperationRejected
            | Self::PrimaryFailed
            | Self::BackupFailed => Level::Error,
        }
    }
}

/// Outcome of one operation against one resource of a fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Status {
    Success,
    Failure,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

pub(crate) fn duration_ms(duration: Duration) -> Attribute {
    Attribute::new(DURATION_MS, u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}
