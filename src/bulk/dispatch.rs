use std::{ops::Range, time::Instant};

use futures_util::{stream, StreamExt};

#[cfg(feature = "tracing-unstable")]
use crate::trace::{
    trace_or_log_enabled,
    BulkWriteTracingEventEmitter,
    TracingOrLogLevel,
    BULK_WRITE_TRACING_EVENT_TARGET,
};
use crate::{
    bson::Bson,
    bulk::WriteRequest,
    coll::Namespace,
    concern::WriteConcern,
    error::Result,
    event::{
        bulk_write::{BatchFailedEvent, BatchStartedEvent, BatchSucceededEvent, BulkWriteEvent},
        EventHandler,
    },
    executor::{BatchExecutor, RawBatchResult, WriteBatch},
};

/// What the executor returned for the sub-batch at `range`.
#[derive(Debug)]
pub(crate) struct BatchOutcome {
    pub(crate) range: Range<usize>,
    pub(crate) result: Result<RawBatchResult>,
}

/// Hands the sub-batches of one bulk operation to the executor.
pub(crate) struct Dispatcher<'a> {
    pub(crate) executor: &'a dyn BatchExecutor,
    pub(crate) namespace: &'a Namespace,
    pub(crate) requests: &'a [WriteRequest],
    pub(crate) ordered: bool,
    pub(crate) write_concern: &'a WriteConcern,
    pub(crate) bypass_document_validation: Option<bool>,
    pub(crate) comment: Option<&'a Bson>,
    pub(crate) max_time: Option<std::time::Duration>,
    pub(crate) max_concurrent_batches: usize,
    pub(crate) event_handler: Option<&'a EventHandler<BulkWriteEvent>>,
}

impl Dispatcher<'_> {
    /// Dispatches `batches` and hands each outcome to `record`, in request order.
    ///
    /// Ordered operations dispatch one sub-batch at a time and stop as soon as `record` returns
    /// `false`. Unordered operations keep up to `max_concurrent_batches` sub-batches in flight,
    /// always dispatch every one of them and ignore what `record` returns.
    pub(crate) async fn dispatch(
        &self,
        batches: Vec<Range<usize>>,
        mut record: impl FnMut(BatchOutcome) -> bool,
    ) {
        if self.ordered {
            for range in batches {
                let outcome = self.dispatch_one(range).await;
                if !record(outcome) {
                    break;
                }
            }
        } else {
            let outcomes: Vec<BatchOutcome> =
                stream::iter(batches.into_iter().map(|range| self.dispatch_one(range)))
                    .buffered(self.max_concurrent_batches)
                    .collect()
                    .await;
            for outcome in outcomes {
                record(outcome);
            }
        }
    }

    async fn dispatch_one(&self, range: Range<usize>) -> BatchOutcome {
        let batch = WriteBatch {
            namespace: self.namespace,
            requests: &self.requests[range.clone()],
            offset: range.start,
            ordered: self.ordered,
            write_concern: self.write_concern,
            bypass_document_validation: self.bypass_document_validation,
            comment: self.comment,
            max_time: self.max_time,
        };

        self.emit_event(|| {
            BulkWriteEvent::BatchStarted(BatchStartedEvent {
                namespace: self.namespace.clone(),
                offset: range.start,
                len: range.len(),
                ordered: self.ordered,
            })
        });

        let start = Instant::now();
        let result = self.executor.execute_batch(batch).await;
        let duration = start.elapsed();

        match result {
            Ok(ref raw) => self.emit_event(|| {
                BulkWriteEvent::BatchSucceeded(BatchSucceededEvent {
                    namespace: self.namespace.clone(),
                    offset: range.start,
                    len: range.len(),
                    n_attempted: raw.outcomes.len(),
                    n_errors: raw.n_errors(),
                    write_concern_failed: raw.write_concern_error.is_some(),
                    duration,
                })
            }),
            Err(ref error) => self.emit_event(|| {
                BulkWriteEvent::BatchFailed(BatchFailedEvent {
                    namespace: self.namespace.clone(),
                    offset: range.start,
                    len: range.len(),
                    failure: error.clone(),
                    duration,
                })
            }),
        }

        BatchOutcome { range, result }
    }

    #[cfg(not(feature = "tracing-unstable"))]
    fn emit_event(&self, generate_event: impl FnOnce() -> BulkWriteEvent) {
        if let Some(handler) = self.event_handler {
            handler.handle(generate_event());
        }
    }

    #[cfg(feature = "tracing-unstable")]
    fn emit_event(&self, generate_event: impl FnOnce() -> BulkWriteEvent) {
        let tracing_emitter = if trace_or_log_enabled!(
            target: BULK_WRITE_TRACING_EVENT_TARGET,
            TracingOrLogLevel::Debug
        ) {
            Some(BulkWriteTracingEventEmitter)
        } else {
            None
        };
        if !(tracing_emitter.is_some() || self.event_handler.is_some()) {
            return;
        }

        let event = generate_event();
        match (self.event_handler, tracing_emitter) {
            (Some(handler), Some(emitter)) => {
                handler.handle(event.clone());
                emitter.handle(event);
            }
            (Some(handler), None) => handler.handle(event),
            (None, Some(emitter)) => emitter.handle(event),
            (None, None) => {}
        }
    }
}
