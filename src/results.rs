//! Contains the result types returned by bulk write operations.

use serde::Serialize;
use serde_with::skip_serializing_none;

use crate::bson::Bson;

/// A document created by an upserting update or replace request.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct BulkWriteUpsert {
    /// The zero-based index of the originating request in submission order.
    pub index: usize,

    /// The `_id` of the created document.
    pub id: Bson,
}

impl BulkWriteUpsert {
    pub(crate) fn new(index: usize, id: Bson) -> Self {
        Self { index, id }
    }
}

/// The outcome of a successfully executed bulk write operation, or the partial outcome carried by
/// a [`BulkWriteError`](crate::error::BulkWriteError).
///
/// If the operation was executed with an unacknowledged write concern, no counts are known and
/// every count accessor returns `None`.
#[skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkWriteResult {
    acknowledged: bool,
    inserted_count: i64,
    matched_count: i64,
    removed_count: i64,
    modified_count: Option<i64>,
    upserts: Vec<BulkWriteUpsert>,
}

impl Default for BulkWriteResult {
    fn default() -> Self {
        Self::acknowledged()
    }
}

impl BulkWriteResult {
    pub(crate) fn acknowledged() -> Self {
        Self {
            acknowledged: true,
            inserted_count: 0,
            matched_count: 0,
            removed_count: 0,
            modified_count: Some(0),
            upserts: Vec::new(),
        }
    }

    pub(crate) fn unacknowledged() -> Self {
        Self {
            acknowledged: false,
            inserted_count: 0,
            matched_count: 0,
            removed_count: 0,
            modified_count: None,
            upserts: Vec::new(),
        }
    }

    /// Whether the writes were acknowledged by the remote store.
    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged
    }

    /// The number of documents inserted.
    pub fn inserted_count(&self) -> Option<i64> {
        self.acknowledged.then_some(self.inserted_count)
    }

    /// The number of documents matched by update and replace requests, whether or not they were
    /// modified.
    pub fn matched_count(&self) -> Option<i64> {
        self.acknowledged.then_some(self.matched_count)
    }

    /// The number of documents removed.
    pub fn removed_count(&self) -> Option<i64> {
        self.acknowledged.then_some(self.removed_count)
    }

    /// The number of documents whose content was actually changed. This is `None` if the remote
    /// store did not report it for every update or replace request.
    pub fn modified_count(&self) -> Option<i64> {
        if self.acknowledged {
            self.modified_count
        } else {
            None
        }
    }

    /// Whether [`modified_count`](BulkWriteResult::modified_count) is available.
    pub fn is_modified_count_available(&self) -> bool {
        self.modified_count().is_some()
    }

    /// The documents created by upserts, in request order.
    pub fn upserts(&self) -> &[BulkWriteUpsert] {
        &self.upserts
    }

    /// The number of documents created by upserts.
    pub fn upserted_count(&self) -> Option<i64> {
        self.acknowledged.then_some(self.upserts.len() as i64)
    }

    pub(crate) fn add_inserted(&mut self) {
        self.inserted_count += 1;
    }

    pub(crate) fn add_matched(&mut self, n: u64) {
        self.matched_count += n as i64;
    }

    pub(crate) fn add_removed(&mut self, n: u64) {
        self.removed_count += n as i64;
    }

    /// Adds to the modified count. Once a contribution is missing the count stays unavailable.
    pub(crate) fn add_modified(&mut self, n: Option<u64>) {
        self.modified_count = match (self.modified_count, n) {
            (Some(current), Some(n)) => Some(current + n as i64),
            _ => None,
        };
    }

    pub(crate) fn add_upsert(&mut self, upsert: BulkWriteUpsert) {
        self.upserts.push(upsert);
    }
}
