//! The boundary between the bulk write engine and the transport that talks to the remote store.

use std::{fmt::Debug, time::Duration};

use crate::{
    bson::Bson,
    bulk::WriteRequest,
    coll::Namespace,
    concern::WriteConcern,
    error::{Result, WriteConcernError, WriteError},
    BoxFuture,
};

/// Ships a sub-batch of write requests to the remote store and returns the raw per-request
/// outcomes.
///
/// The engine guarantees that an ordered operation never has more than one sub-batch in flight,
/// and that no sub-batch is dispatched after an earlier one of the same ordered operation
/// reported a failure. Unordered sub-batches of one operation may be dispatched concurrently.
///
/// Once `execute_batch` is called the engine polls the returned future to completion.
pub trait BatchExecutor: Debug + Send + Sync {
    /// Execute `batch` and report an outcome for every request the remote store attempted.
    ///
    /// When `batch.write_concern` is unacknowledged the remote store sends no reply and the
    /// returned outcomes are ignored; an empty [`RawBatchResult`] should be returned.
    ///
    /// An `Err` means the batch as a whole could not be executed, e.g. a transport failure or
    /// an exceeded [`max_time`](WriteBatch::max_time) (reported with
    /// [`Error::timeout`](crate::error::Error::timeout)).
    fn execute_batch<'a>(&'a self, batch: WriteBatch<'a>) -> BoxFuture<'a, Result<RawBatchResult>>;
}

/// A contiguous run of requests from a bulk operation, handed to a [`BatchExecutor`].
#[derive(Clone, Copy, Debug)]
#[non_exhaustive]
pub struct WriteBatch<'a> {
    /// The collection the requests target.
    pub namespace: &'a Namespace,

    /// The requests, in submission order.
    pub requests: &'a [WriteRequest],

    /// The index, in the caller's request list, of `requests[0]`.
    pub offset: usize,

    /// Whether the remote store must stop at the first failure.
    pub ordered: bool,

    /// The resolved write concern. An empty write concern means the remote store's default.
    pub write_concern: &'a WriteConcern,

    /// Whether document-level validation should be bypassed.
    pub bypass_document_validation: Option<bool>,

    /// A comment to attach to the operation.
    pub comment: Option<&'a Bson>,

    /// The time budget for this batch.
    pub max_time: Option<Duration>,
}

/// The raw outcome of a sub-batch as reported by a [`BatchExecutor`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawBatchResult {
    /// One outcome per attempted request. Requests the remote store did not attempt have no
    /// entry.
    pub outcomes: Vec<RawItemOutcome>,

    /// Set when the requested write concern was not satisfied. This says nothing about whether
    /// the individual writes succeeded.
    pub write_concern_error: Option<WriteConcernError>,
}

impl RawBatchResult {
    /// An empty result, as returned for unacknowledged writes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an outcome to this result.
    pub fn with_outcome(mut self, outcome: RawItemOutcome) -> Self {
        self.outcomes.push(outcome);
        self
    }

    /// Sets the write concern error of this result.
    pub fn with_write_concern_error(mut self, error: WriteConcernError) -> Self {
        self.write_concern_error = Some(error);
        self
    }

    pub(crate) fn n_errors(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.result.is_err())
            .count()
    }
}

/// The outcome of a single attempted request.
#[derive(Clone, Debug, PartialEq)]
pub struct RawItemOutcome {
    /// The index of the request within its [`WriteBatch`].
    pub index: usize,

    /// What happened.
    pub result: std::result::Result<WriteSummary, WriteError>,
}

impl RawItemOutcome {
    /// A request at `index` within the batch that was applied.
    pub fn success(index: usize, summary: WriteSummary) -> Self {
        Self {
            index,
            result: Ok(summary),
        }
    }

    /// A request at `index` within the batch that failed.
    pub fn failure(index: usize, error: WriteError) -> Self {
        Self {
            index,
            result: Err(error),
        }
    }
}

/// The effect of a successfully applied request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WriteSummary {
    /// The number of documents the filter matched. Zero for inserts and removes.
    pub matched_count: u64,

    /// The number of documents whose content changed, if the remote store reports it.
    pub modified_count: Option<u64>,

    /// The number of documents removed.
    pub removed_count: u64,

    /// Whether an upsert created a new document.
    pub upserted: bool,

    /// The `_id` of the document an upsert created, if the remote store reported it.
    pub upserted_id: Option<Bson>,
}

impl WriteSummary {
    /// An insert that was applied.
    pub fn inserted() -> Self {
        Self::default()
    }

    /// An update or replace that matched `matched_count` documents, of which `modified_count`
    /// changed.
    pub fn matched(matched_count: u64, modified_count: Option<u64>) -> Self {
        Self {
            matched_count,
            modified_count,
            ..Default::default()
        }
    }

    /// An upsert that matched nothing and created a document. `id` is the `_id` of the created
    /// document if the remote store reported it.
    pub fn upserted(id: Option<Bson>) -> Self {
        Self {
            modified_count: Some(0),
            upserted: true,
            upserted_id: id,
            ..Default::default()
        }
    }

    /// A remove that deleted `removed_count` documents.
    pub fn removed(removed_count: u64) -> Self {
        Self {
            removed_count,
            ..Default::default()
        }
    }

    /// Clears the modified count, as reported by remote stores that do not track it.
    pub fn without_modified_count(mut self) -> Self {
        self.modified_count = None;
        self
    }
}
