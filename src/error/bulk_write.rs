use serde::Serialize;

use crate::{
    error::{IndexedWriteError, WriteConcernError},
    results::BulkWriteResult,
};

/// The error returned from [`BulkWriteOperation::execute`](crate::BulkWriteOperation::execute)
/// when one or more requests failed or the requested write concern could not be satisfied.
///
/// The [`partial_result`](BulkWriteError::partial_result) describes everything that was applied
/// before (and, for unordered operations, after) the failures. Callers should inspect it before
/// deciding how to proceed; the engine never retries on its own.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct BulkWriteError {
    /// The per-request failures, ordered by request index. An ordered operation reports at most
    /// one.
    pub write_errors: Vec<IndexedWriteError>,

    /// The failure to satisfy the write concern, if there was one.
    pub write_concern_error: Option<WriteConcernError>,

    /// The counts and upserts of the requests that succeeded.
    pub partial_result: BulkWriteResult,
}

impl BulkWriteError {
    /// The per-request failures, ordered by request index.
    pub fn write_errors(&self) -> &[IndexedWriteError] {
        &self.write_errors
    }

    /// The failure to satisfy the write concern, if there was one.
    pub fn write_concern_error(&self) -> Option<&WriteConcernError> {
        self.write_concern_error.as_ref()
    }

    /// The counts and upserts of the requests that succeeded.
    pub fn partial_result(&self) -> &BulkWriteResult {
        &self.partial_result
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.write_errors.is_empty() && self.write_concern_error.is_none()
    }
}
