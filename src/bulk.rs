//! Contains the bulk write operation builder.

mod aggregate;
mod batch;
mod dispatch;
pub(crate) mod models;

use crate::{
    bson::Document,
    bson_util::get_or_prepend_id_field,
    coll::{options::BulkWriteOptions, Collection},
    error::{Error, Result},
    results::BulkWriteResult,
};

use self::{aggregate::ResultAggregator, batch::split_into_batches, dispatch::Dispatcher};

pub use self::models::{UpdateModifications, WriteRequest};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ExecutionState {
    Building,
    Executed,
}

/// A sequence of writes against one collection, built up one request at a time and executed
/// together exactly once. Create one with
/// [`Collection::initialize_ordered_bulk_operation`] or
/// [`Collection::initialize_unordered_bulk_operation`].
///
/// Once [`execute`](BulkWriteOperation::execute) has been called, whether or not it succeeded,
/// the operation can no longer be modified or executed again; doing so returns an error for
/// which [`Error::is_state_error`] is true.
#[derive(Debug)]
pub struct BulkWriteOperation {
    collection: Collection,
    ordered: bool,
    requests: Vec<WriteRequest>,
    state: ExecutionState,
}

impl BulkWriteOperation {
    pub(crate) fn new(collection: Collection, ordered: bool) -> Self {
        Self {
            collection,
            ordered,
            requests: Vec::new(),
            state: ExecutionState::Building,
        }
    }

    /// Whether this operation stops at the first failed request.
    pub fn is_ordered(&self) -> bool {
        self.ordered
    }

    /// Whether [`execute`](BulkWriteOperation::execute) has been called.
    pub fn is_executed(&self) -> bool {
        self.state == ExecutionState::Executed
    }

    /// The requests queued so far, in submission order.
    pub fn requests(&self) -> &[WriteRequest] {
        &self.requests
    }

    /// Queues an insert of `document`.
    ///
    /// If `document` has no `_id` field, one is generated and prepended to it. The caller sees
    /// the new `_id` immediately, whatever the outcome of a later
    /// [`execute`](BulkWriteOperation::execute).
    pub fn insert(&mut self, document: &mut Document) -> Result<()> {
        self.check_building()?;
        get_or_prepend_id_field(document, self.collection.id_generator());
        self.push(WriteRequest::InsertOne {
            document: document.clone(),
        })
    }

    /// Starts a request on the documents that match `filter`. The returned scope queues exactly
    /// one request once one of its terminal methods is called.
    pub fn find(&mut self, filter: Document) -> Result<RequestScope<'_>> {
        self.check_building()?;
        Ok(RequestScope {
            operation: self,
            filter,
        })
    }

    /// Executes the queued requests.
    ///
    /// The write concern in `options` takes precedence over the collection's. With an
    /// unacknowledged write concern the requests are sent but their outcomes are never reported,
    /// and the returned [`BulkWriteResult`] carries no counts.
    ///
    /// If any request fails, or the write concern cannot be satisfied, an
    /// [`ErrorKind::BulkWrite`](crate::error::ErrorKind::BulkWrite) error is returned describing
    /// the failures and what had already been applied.
    pub async fn execute(
        &mut self,
        options: impl Into<Option<BulkWriteOptions>>,
    ) -> Result<BulkWriteResult> {
        self.check_building()?;
        self.state = ExecutionState::Executed;

        if self.requests.is_empty() {
            return Err(Error::invalid_argument(
                "a bulk write operation must contain at least one request",
            ));
        }

        let options = options.into().unwrap_or_default();
        let write_concern = options
            .write_concern
            .or_else(|| self.collection.write_concern().cloned())
            .unwrap_or_default();
        write_concern.validate()?;

        let batches = split_into_batches(&self.requests, self.collection.limits())?;

        let dispatcher = Dispatcher {
            executor: self.collection.executor(),
            namespace: self.collection.namespace(),
            requests: &self.requests,
            ordered: self.ordered,
            write_concern: &write_concern,
            bypass_document_validation: options.bypass_document_validation,
            comment: options.comment.as_ref(),
            max_time: self.collection.max_time(),
            max_concurrent_batches: self.collection.limits().max_concurrent_batches,
            event_handler: self.collection.bulk_write_event_handler(),
        };

        if !write_concern.is_acknowledged() {
            // Nothing is reported about individual requests. Only a failure to hand a sub-batch
            // to the remote store is surfaced.
            let mut failure = None;
            dispatcher
                .dispatch(batches, |outcome| match outcome.result {
                    Ok(_) => true,
                    Err(error) => {
                        if failure.is_none() {
                            failure = Some(error);
                        }
                        false
                    }
                })
                .await;
            return match failure {
                Some(error) => Err(error),
                None => Ok(BulkWriteResult::unacknowledged()),
            };
        }

        let mut aggregator = ResultAggregator::new(&self.requests, self.ordered);
        dispatcher
            .dispatch(batches, |outcome| {
                aggregator.record_batch(outcome);
                !aggregator.is_stopped()
            })
            .await;
        aggregator.finish()
    }

    fn check_building(&self) -> Result<()> {
        match self.state {
            ExecutionState::Building => Ok(()),
            ExecutionState::Executed => Err(Error::invalid_state(
                "bulk write operation has already been executed",
            )),
        }
    }

    fn push(&mut self, request: WriteRequest) -> Result<()> {
        self.check_building()?;
        request.validate(self.collection.limits().max_bson_object_size)?;
        self.requests.push(request);
        Ok(())
    }
}

/// A request under construction on the documents matching a filter, returned by
/// [`BulkWriteOperation::find`].
#[must_use]
#[derive(Debug)]
pub struct RequestScope<'a> {
    operation: &'a mut BulkWriteOperation,
    filter: Document,
}

impl<'a> RequestScope<'a> {
    /// Makes the next update or replace create a document if the filter matches nothing.
    pub fn upsert(self) -> UpsertRequestScope<'a> {
        UpsertRequestScope { scope: self }
    }

    /// Queues an update of the first document matching the filter.
    pub fn update_one(self, update: impl Into<UpdateModifications>) -> Result<()> {
        self.update_common(update.into(), false, false)
    }

    /// Queues an update of every document matching the filter.
    pub fn update_many(self, update: impl Into<UpdateModifications>) -> Result<()> {
        self.update_common(update.into(), true, false)
    }

    /// Same as [`update_many`](RequestScope::update_many).
    pub fn update(self, update: impl Into<UpdateModifications>) -> Result<()> {
        self.update_many(update)
    }

    /// Queues a replacement of the first document matching the filter. `replacement` must not
    /// contain update operators.
    pub fn replace_one(self, replacement: Document) -> Result<()> {
        self.replace_common(replacement, false)
    }

    /// Queues a removal of the first document matching the filter.
    pub fn remove_one(self) -> Result<()> {
        let filter = self.filter;
        self.operation.push(WriteRequest::RemoveOne { filter })
    }

    /// Queues a removal of every document matching the filter.
    pub fn remove_many(self) -> Result<()> {
        let filter = self.filter;
        self.operation.push(WriteRequest::RemoveMany { filter })
    }

    /// Same as [`remove_many`](RequestScope::remove_many).
    pub fn remove(self) -> Result<()> {
        self.remove_many()
    }

    fn update_common(self, update: UpdateModifications, multi: bool, upsert: bool) -> Result<()> {
        let filter = self.filter;
        let request = if multi {
            WriteRequest::UpdateMany {
                filter,
                update,
                upsert,
            }
        } else {
            WriteRequest::UpdateOne {
                filter,
                update,
                upsert,
            }
        };
        self.operation.push(request)
    }

    fn replace_common(self, replacement: Document, upsert: bool) -> Result<()> {
        let filter = self.filter;
        self.operation.push(WriteRequest::ReplaceOne {
            filter,
            replacement,
            upsert,
        })
    }
}

/// A [`RequestScope`] whose update or replace creates a document when the filter matches
/// nothing. Removals cannot upsert, so they are not offered here.
#[must_use]
#[derive(Debug)]
pub struct UpsertRequestScope<'a> {
    scope: RequestScope<'a>,
}

impl UpsertRequestScope<'_> {
    /// Queues an upserting update of the first document matching the filter.
    pub fn update_one(self, update: impl Into<UpdateModifications>) -> Result<()> {
        self.scope.update_common(update.into(), false, true)
    }

    /// Queues an upserting update of every document matching the filter.
    pub fn update_many(self, update: impl Into<UpdateModifications>) -> Result<()> {
        self.scope.update_common(update.into(), true, true)
    }

    /// Same as [`update_many`](UpsertRequestScope::update_many).
    pub fn update(self, update: impl Into<UpdateModifications>) -> Result<()> {
        self.update_many(update)
    }

    /// Queues an upserting replacement of the first document matching the filter.
    pub fn replace_one(self, replacement: Document) -> Result<()> {
        self.scope.replace_common(replacement, true)
    }
}
