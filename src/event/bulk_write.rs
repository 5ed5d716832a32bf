//! Contains the events related to the dispatch of bulk write sub-batches.

use std::time::Duration;

use crate::{coll::Namespace, error::Error};

/// An event that triggers when a sub-batch is handed to the executor.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct BatchStartedEvent {
    /// The collection the bulk operation targets.
    pub namespace: Namespace,

    /// The index, in the caller's request list, of the first request in the sub-batch.
    pub offset: usize,

    /// The number of requests in the sub-batch.
    pub len: usize,

    /// Whether the sub-batch is executed in order.
    pub ordered: bool,
}

/// An event that triggers when the executor returns outcomes for a sub-batch. Item failures and
/// write concern errors are reported here, not as [`BatchFailedEvent`]s.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct BatchSucceededEvent {
    /// The collection the bulk operation targets.
    pub namespace: Namespace,

    /// The index, in the caller's request list, of the first request in the sub-batch.
    pub offset: usize,

    /// The number of requests in the sub-batch.
    pub len: usize,

    /// The number of requests the executor reported an outcome for.
    pub n_attempted: usize,

    /// The number of requests that failed.
    pub n_errors: usize,

    /// Whether the executor reported a write concern error for the sub-batch.
    pub write_concern_failed: bool,

    /// The time the executor took to return.
    pub duration: Duration,
}

/// An event that triggers when the executor fails to return outcomes for a sub-batch.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct BatchFailedEvent {
    /// The collection the bulk operation targets.
    pub namespace: Namespace,

    /// The index, in the caller's request list, of the first request in the sub-batch.
    pub offset: usize,

    /// The number of requests in the sub-batch.
    pub len: usize,

    /// The error the executor returned.
    pub failure: Error,

    /// The time the executor took to return.
    pub duration: Duration,
}

/// An event emitted during the execution of a bulk write operation.
#[derive(Clone, Debug)]
#[allow(missing_docs)]
#[non_exhaustive]
pub enum BulkWriteEvent {
    BatchStarted(BatchStartedEvent),
    BatchSucceeded(BatchSucceededEvent),
    BatchFailed(BatchFailedEvent),
}
