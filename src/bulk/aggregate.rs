use std::ops::Range;

use crate::{
    bson::Bson,
    bson_util::exact_id_match,
    bulk::{dispatch::BatchOutcome, models::OperationType, WriteRequest},
    error::{BulkWriteError, Error, ErrorKind, IndexedWriteError, Result, WriteConcernError},
    executor::{RawBatchResult, RawItemOutcome, WriteSummary},
    results::{BulkWriteResult, BulkWriteUpsert},
};

/// Folds the outcomes of acknowledged sub-batches into a [`BulkWriteResult`] or a
/// [`BulkWriteError`]. Batches must be recorded in request order.
pub(crate) struct ResultAggregator<'a> {
    requests: &'a [WriteRequest],
    ordered: bool,
    result: BulkWriteResult,
    write_errors: Vec<IndexedWriteError>,
    write_concern_error: Option<WriteConcernError>,
    failure: Option<Error>,
    recorded_any: bool,
    stopped: bool,
}

impl<'a> ResultAggregator<'a> {
    pub(crate) fn new(requests: &'a [WriteRequest], ordered: bool) -> Self {
        Self {
            requests,
            ordered,
            result: BulkWriteResult::acknowledged(),
            write_errors: Vec::new(),
            write_concern_error: None,
            failure: None,
            recorded_any: false,
            stopped: false,
        }
    }

    pub(crate) fn record_batch(&mut self, outcome: BatchOutcome) {
        if self.stopped {
            return;
        }

        match outcome.result {
            Ok(raw) => self.record_raw(outcome.range, raw),
            Err(error) => self.record_failure(error),
        }
    }

    /// Whether an ordered operation has failed, so no further sub-batch may be dispatched.
    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped
    }

    fn record_raw(&mut self, range: Range<usize>, raw: RawBatchResult) {
        if let Some(write_concern_error) = raw.write_concern_error {
            self.recorded_any = true;
            // only the first write concern error is reported
            if self.write_concern_error.is_none() {
                self.write_concern_error = Some(write_concern_error);
            }
        }

        let (outcomes, violation) = check_outcomes(raw.outcomes, range.len(), self.ordered);
        if let Some(error) = violation {
            self.record_failure(error);
        }

        if self.ordered {
            // Items are attempted in sequence. Anything reported after the first failed item was
            // not attempted and contributes nothing.
            for outcome in outcomes {
                let index = range.start + outcome.index;
                match outcome.result {
                    Ok(summary) => self.record_applied(index, summary),
                    Err(write_error) => {
                        self.recorded_any = true;
                        self.write_errors.push(write_error.at_index(index));
                        self.stopped = true;
                        return;
                    }
                }
            }
        } else {
            // Every item was attempted, so every success counts, including those after a failure.
            for outcome in outcomes {
                let index = range.start + outcome.index;
                match outcome.result {
                    Ok(summary) => self.record_applied(index, summary),
                    Err(write_error) => {
                        self.recorded_any = true;
                        self.write_errors.push(write_error.at_index(index));
                    }
                }
            }
        }
    }

    /// Counts a request the remote store applied. A summary that cannot be reported fails the
    /// operation without discarding the rest of the batch.
    fn record_applied(&mut self, index: usize, summary: WriteSummary) {
        if let Err(error) = self.record_success(index, summary) {
            self.record_failure(error);
        }
    }

    fn record_success(&mut self, index: usize, summary: WriteSummary) -> Result<()> {
        let requests = self.requests;
        let request = &requests[index];
        match request.operation_type() {
            OperationType::Insert => self.result.add_inserted(),
            OperationType::Update => {
                if summary.upserted {
                    let id = upserted_id(request, summary.upserted_id).ok_or_else(|| {
                        Error::invalid_response(format!(
                            "upsert at index {index} created a document without reporting its \
                             _id"
                        ))
                    })?;
                    self.result.add_upsert(BulkWriteUpsert::new(index, id));
                }
                self.result.add_matched(summary.matched_count);
                self.result.add_modified(summary.modified_count);
            }
            OperationType::Remove => self.result.add_removed(summary.removed_count),
        }
        self.recorded_any = true;
        Ok(())
    }

    fn record_failure(&mut self, error: Error) {
        if self.failure.is_none() {
            self.failure = Some(error);
        }
        if self.ordered {
            self.stopped = true;
        }
    }

    pub(crate) fn finish(mut self) -> Result<BulkWriteResult> {
        self.write_errors.sort_by_key(|write_error| write_error.index);
        let bulk_write_error = BulkWriteError {
            write_errors: self.write_errors,
            write_concern_error: self.write_concern_error,
            partial_result: self.result,
        };

        match self.failure {
            Some(failure) if !self.recorded_any => Err(failure),
            Some(failure) => {
                Err(Error::from(ErrorKind::BulkWrite(bulk_write_error)).with_source(failure))
            }
            None if bulk_write_error.is_empty() => Ok(bulk_write_error.partial_result),
            None => Err(ErrorKind::BulkWrite(bulk_write_error).into()),
        }
    }
}

/// Orders `outcomes` by index and keeps those that fit a batch of `len` requests, along with the
/// first way in which they break the executor contract, if any.
fn check_outcomes(
    mut outcomes: Vec<RawItemOutcome>,
    len: usize,
    ordered: bool,
) -> (Vec<RawItemOutcome>, Option<Error>) {
    outcomes.sort_by_key(|outcome| outcome.index);

    let mut violation = None;
    let mut kept: Vec<RawItemOutcome> = Vec::with_capacity(outcomes.len());
    let mut expected = 0;
    for outcome in outcomes {
        if outcome.index >= len {
            note_violation(
                &mut violation,
                format!(
                    "outcome index {} is out of range for a batch of {len} requests",
                    outcome.index
                ),
            );
            continue;
        }
        if outcome.index < expected {
            note_violation(
                &mut violation,
                format!(
                    "more than one outcome was reported for batch index {}",
                    outcome.index
                ),
            );
            continue;
        }
        if outcome.index > expected {
            note_violation(
                &mut violation,
                format!("no outcome was reported for the request at batch index {expected}"),
            );
        }
        expected = outcome.index + 1;
        kept.push(outcome);
    }

    let stopped_early = ordered && kept.iter().any(|outcome| outcome.result.is_err());
    if expected < len && !stopped_early {
        note_violation(
            &mut violation,
            format!("expected {len} outcomes, got {}", kept.len()),
        );
    }

    (kept, violation)
}

fn note_violation(violation: &mut Option<Error>, message: String) {
    if violation.is_none() {
        *violation = Some(Error::invalid_response(message));
    }
}

/// The `_id` of a document created by an upsert: the one the remote store reported, or else the
/// one the request pinned.
fn upserted_id(request: &WriteRequest, reported: Option<Bson>) -> Option<Bson> {
    if reported.is_some() {
        return reported;
    }
    if let Some(id) = request.filter().and_then(exact_id_match) {
        return Some(id.clone());
    }
    match request {
        WriteRequest::ReplaceOne { replacement, .. } => replacement.get("_id").cloned(),
        _ => None,
    }
}
