use crate::{coll::Namespace, event::bulk_write::BulkWriteEvent};

pub(crate) const BULK_WRITE_TRACING_EVENT_TARGET: &str = "mongodb_bulk::bulk_write";

pub(crate) trait TracingRepresentation {
    type Representation;

    fn tracing_representation(&self) -> Self::Representation;
}

impl TracingRepresentation for crate::error::Error {
    type Representation = String;

    fn tracing_representation(&self) -> String {
        self.to_string()
    }
}

impl TracingRepresentation for Namespace {
    type Representation = String;

    fn tracing_representation(&self) -> String {
        self.to_string()
    }
}

/// We don't currently use all of these levels but they are included for completeness.
#[allow(dead_code)]
pub(crate) enum TracingOrLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl TracingOrLogLevel {
    pub(crate) const fn as_log_level(&self) -> log::Level {
        match self {
            TracingOrLogLevel::Error => log::Level::Error,
            TracingOrLogLevel::Warn => log::Level::Warn,
            TracingOrLogLevel::Info => log::Level::Info,
            TracingOrLogLevel::Debug => log::Level::Debug,
            TracingOrLogLevel::Trace => log::Level::Trace,
        }
    }

    pub(crate) const fn as_tracing_level(&self) -> tracing::Level {
        match self {
            TracingOrLogLevel::Error => tracing::Level::ERROR,
            TracingOrLogLevel::Warn => tracing::Level::WARN,
            TracingOrLogLevel::Info => tracing::Level::INFO,
            TracingOrLogLevel::Debug => tracing::Level::DEBUG,
            TracingOrLogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Pending https://github.com/tokio-rs/tracing/issues/2036 we can remove this and just use tracing::enabled.
macro_rules! trace_or_log_enabled {
    (target: $target:expr, $lvl:expr) => {
        tracing::enabled!(target: $target, $lvl.as_tracing_level())
            || log::log_enabled!(target: $target, $lvl.as_log_level())
    };
}
pub(crate) use trace_or_log_enabled;

/// Type responsible for converting bulk write monitoring events to tracing events and
/// emitting them.
pub(crate) struct BulkWriteTracingEventEmitter;

impl BulkWriteTracingEventEmitter {
    pub(crate) fn handle(&self, event: BulkWriteEvent) {
        match event {
            BulkWriteEvent::BatchStarted(event) => {
                tracing::debug!(
                    target: BULK_WRITE_TRACING_EVENT_TARGET,
                    namespace = event.namespace.tracing_representation(),
                    offset = event.offset,
                    batchLength = event.len,
                    ordered = event.ordered,
                    "Bulk write batch started"
                );
            }
            BulkWriteEvent::BatchSucceeded(event) => {
                tracing::debug!(
                    target: BULK_WRITE_TRACING_EVENT_TARGET,
                    namespace = event.namespace.tracing_representation(),
                    offset = event.offset,
                    batchLength = event.len,
                    attempted = event.n_attempted,
                    writeErrors = event.n_errors,
                    writeConcernFailed = event.write_concern_failed,
                    durationMS = event.duration.as_millis(),
                    "Bulk write batch succeeded"
                );
            }
            BulkWriteEvent::BatchFailed(event) => {
                tracing::debug!(
                    target: BULK_WRITE_TRACING_EVENT_TARGET,
                    namespace = event.namespace.tracing_representation(),
                    offset = event.offset,
                    batchLength = event.len,
                    failure = event.failure.tracing_representation(),
                    errorKind = event.failure.kind.name(),
                    durationMS = event.duration.as_millis(),
                    "Bulk write batch failed"
                );
            }
        }
    }
}
