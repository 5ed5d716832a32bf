use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use crate::{
    bson::{doc, oid::ObjectId, Bson, Document},
    bulk::{UpdateModifications, WriteRequest},
    concern::WriteConcern,
    error::{Error, Result, WriteConcernError, WriteError, DUPLICATE_KEY_CODE},
    executor::{BatchExecutor, RawBatchResult, RawItemOutcome, WriteBatch, WriteSummary},
    BoxFuture,
};

/// What the in-memory store was handed for one sub-batch.
#[derive(Clone, Debug)]
pub(crate) struct RecordedBatch {
    pub(crate) offset: usize,
    pub(crate) len: usize,
    pub(crate) ordered: bool,
    pub(crate) write_concern: WriteConcern,
    pub(crate) bypass_document_validation: Option<bool>,
    pub(crate) comment: Option<Bson>,
    pub(crate) max_time: Option<Duration>,
}

/// A [`BatchExecutor`] backed by a vector of documents. Filters match on top-level equality and
/// updates support `$set`, `$unset` and `$inc`.
#[derive(Debug, Default)]
pub(crate) struct InMemoryExecutor {
    documents: Mutex<Vec<Document>>,
    batches: Mutex<Vec<RecordedBatch>>,
    write_concern_error: Option<WriteConcernError>,
    batch_failures: HashMap<usize, Error>,
    omit_modified_count: bool,
    omit_upserted_id: bool,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl InMemoryExecutor {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Seeds the store.
    pub(crate) fn with_documents(self, documents: Vec<Document>) -> Self {
        *self.documents.lock().unwrap() = documents;
        self
    }

    /// Reports `error` for every sub-batch after applying its writes.
    pub(crate) fn with_write_concern_error(mut self, error: WriteConcernError) -> Self {
        self.write_concern_error = Some(error);
        self
    }

    /// Fails the `n`th dispatched sub-batch (zero-based) with `error` without applying it.
    pub(crate) fn with_batch_failure(mut self, n: usize, error: Error) -> Self {
        self.batch_failures.insert(n, error);
        self
    }

    /// Leaves the modified count out of update and replace outcomes.
    pub(crate) fn without_modified_count(mut self) -> Self {
        self.omit_modified_count = true;
        self
    }

    /// Reports upserts without the `_id` of the created document.
    pub(crate) fn without_upserted_id(mut self) -> Self {
        self.omit_upserted_id = true;
        self
    }

    /// Sleeps for `delay` before applying each sub-batch.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn documents(&self) -> Vec<Document> {
        self.documents.lock().unwrap().clone()
    }

    pub(crate) fn batches(&self) -> Vec<RecordedBatch> {
        self.batches.lock().unwrap().clone()
    }

    /// The largest number of sub-batches that were executing at the same time.
    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn apply_batch(&self, batch: &WriteBatch<'_>) -> Result<RawBatchResult> {
        let dispatch_index = {
            let mut batches = self.batches.lock().unwrap();
            batches.push(RecordedBatch {
                offset: batch.offset,
                len: batch.requests.len(),
                ordered: batch.ordered,
                write_concern: batch.write_concern.clone(),
                bypass_document_validation: batch.bypass_document_validation,
                comment: batch.comment.cloned(),
                max_time: batch.max_time,
            });
            batches.len() - 1
        };
        if let Some(error) = self.batch_failures.get(&dispatch_index) {
            return Err(error.clone());
        }

        let mut documents = self.documents.lock().unwrap();
        let mut raw = RawBatchResult::new();
        for (index, request) in batch.requests.iter().enumerate() {
            match apply_request(&mut documents, request) {
                Ok(summary) => {
                    let summary = if self.omit_modified_count && summary.matched_count > 0 {
                        summary.without_modified_count()
                    } else if self.omit_upserted_id && summary.upserted {
                        WriteSummary::upserted(None)
                    } else {
                        summary
                    };
                    raw.outcomes.push(RawItemOutcome::success(index, summary));
                }
                Err(error) => {
                    raw.outcomes.push(RawItemOutcome::failure(index, error));
                    if batch.ordered {
                        break;
                    }
                }
            }
        }
        raw.write_concern_error = self.write_concern_error.clone();

        if !batch.write_concern.is_acknowledged() {
            return Ok(RawBatchResult::new());
        }
        Ok(raw)
    }
}

impl BatchExecutor for InMemoryExecutor {
    fn execute_batch<'a>(&'a self, batch: WriteBatch<'a>) -> BoxFuture<'a, Result<RawBatchResult>> {
        Box::pin(async move {
            let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let result = self.apply_batch(&batch);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        })
    }
}

type WriteResult<T> = std::result::Result<T, WriteError>;

fn apply_request(documents: &mut Vec<Document>, request: &WriteRequest) -> WriteResult<WriteSummary> {
    match request {
        WriteRequest::InsertOne { document } => {
            let id = document
                .get("_id")
                .ok_or_else(|| WriteError::new(2, "document is missing _id"))?;
            check_unique_id(documents, id)?;
            documents.push(document.clone());
            Ok(WriteSummary::inserted())
        }
        WriteRequest::UpdateOne {
            filter,
            update,
            upsert,
        } => update_documents(documents, filter, update, *upsert, false),
        WriteRequest::UpdateMany {
            filter,
            update,
            upsert,
        } => update_documents(documents, filter, update, *upsert, true),
        WriteRequest::ReplaceOne {
            filter,
            replacement,
            upsert,
        } => replace_document(documents, filter, replacement, *upsert),
        WriteRequest::RemoveOne { filter } => Ok(remove_documents(documents, filter, false)),
        WriteRequest::RemoveMany { filter } => Ok(remove_documents(documents, filter, true)),
    }
}

fn matches(document: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(key, value)| document.get(key) == Some(value))
}

fn check_unique_id(documents: &[Document], id: &Bson) -> WriteResult<()> {
    if documents.iter().any(|document| document.get("_id") == Some(id)) {
        return Err(
            WriteError::new(DUPLICATE_KEY_CODE, format!("E11000 duplicate key error: {id}"))
                .with_code_name("DuplicateKey"),
        );
    }
    Ok(())
}

/// The document an upsert starts from: the filter's equality fields plus an `_id`.
fn upsert_seed(filter: &Document) -> Document {
    let mut seed = Document::new();
    if !filter.contains_key("_id") {
        seed.insert("_id", ObjectId::new());
    }
    for (key, value) in filter {
        if !key.starts_with('$') {
            seed.insert(key.clone(), value.clone());
        }
    }
    seed
}

fn update_documents(
    documents: &mut Vec<Document>,
    filter: &Document,
    update: &UpdateModifications,
    upsert: bool,
    multi: bool,
) -> WriteResult<WriteSummary> {
    let mut matched = 0;
    let mut modified = 0;
    for document in documents.iter_mut().filter(|document| matches(document, filter)) {
        let updated = apply_update(document, update)?;
        matched += 1;
        if updated != *document {
            modified += 1;
            *document = updated;
        }
        if !multi {
            break;
        }
    }

    if matched == 0 && upsert {
        let created = apply_update(&upsert_seed(filter), update)?;
        let id = created.get("_id").cloned().unwrap_or(Bson::Null);
        check_unique_id(documents, &id)?;
        documents.push(created);
        return Ok(WriteSummary::upserted(Some(id)));
    }

    Ok(WriteSummary::matched(matched, Some(modified)))
}

fn replace_document(
    documents: &mut Vec<Document>,
    filter: &Document,
    replacement: &Document,
    upsert: bool,
) -> WriteResult<WriteSummary> {
    if let Some(document) = documents
        .iter_mut()
        .find(|document| matches(document, filter))
    {
        let id = document.get("_id").cloned().unwrap_or(Bson::Null);
        if replacement.get("_id").is_some_and(|new_id| *new_id != id) {
            return Err(WriteError::new(66, "the _id field cannot be changed")
                .with_code_name("ImmutableField"));
        }
        let mut replaced = doc! { "_id": id };
        for (key, value) in replacement {
            if key != "_id" {
                replaced.insert(key.clone(), value.clone());
            }
        }
        let modified = u64::from(replaced != *document);
        *document = replaced;
        return Ok(WriteSummary::matched(1, Some(modified)));
    }

    if !upsert {
        return Ok(WriteSummary::matched(0, Some(0)));
    }

    let id = replacement
        .get("_id")
        .or_else(|| filter.get("_id"))
        .cloned()
        .unwrap_or_else(|| Bson::ObjectId(ObjectId::new()));
    check_unique_id(documents, &id)?;
    let mut created = doc! { "_id": id.clone() };
    for (key, value) in replacement {
        if key != "_id" {
            created.insert(key.clone(), value.clone());
        }
    }
    documents.push(created);
    Ok(WriteSummary::upserted(Some(id)))
}

fn remove_documents(documents: &mut Vec<Document>, filter: &Document, multi: bool) -> WriteSummary {
    let mut removed = 0;
    documents.retain(|document| {
        if (multi || removed == 0) && matches(document, filter) {
            removed += 1;
            false
        } else {
            true
        }
    });
    WriteSummary::removed(removed)
}

fn apply_update(document: &Document, update: &UpdateModifications) -> WriteResult<Document> {
    let mut updated = document.clone();
    match update {
        UpdateModifications::Document(operators) => apply_operators(&mut updated, operators)?,
        UpdateModifications::Pipeline(stages) => {
            for stage in stages {
                apply_operators(&mut updated, stage)?;
            }
        }
    }
    Ok(updated)
}

fn apply_operators(document: &mut Document, operators: &Document) -> WriteResult<()> {
    for (operator, fields) in operators {
        match (operator.as_str(), fields) {
            ("$set", Bson::Document(fields)) => {
                for (key, value) in fields {
                    document.insert(key.clone(), value.clone());
                }
            }
            ("$unset", Bson::Document(fields)) => {
                for key in fields.keys() {
                    document.remove(key);
                }
            }
            ("$unset", Bson::String(key)) => {
                document.remove(key);
            }
            ("$unset", Bson::Array(keys)) => {
                for key in keys.iter().filter_map(Bson::as_str) {
                    document.remove(key);
                }
            }
            ("$inc", Bson::Document(fields)) => {
                for (key, delta) in fields {
                    let value = increment(document.get(key), delta)?;
                    document.insert(key.clone(), value);
                }
            }
            (operator, _) => {
                return Err(WriteError::new(9, format!("unknown modifier: {operator}"))
                    .with_code_name("FailedToParse"))
            }
        }
    }
    Ok(())
}

fn increment(current: Option<&Bson>, delta: &Bson) -> WriteResult<Bson> {
    let value = match (current, delta) {
        (None, delta) => delta.clone(),
        (Some(Bson::Int32(a)), Bson::Int32(b)) => Bson::Int32(a + b),
        (Some(Bson::Int32(a)), Bson::Int64(b)) => Bson::Int64(i64::from(*a) + b),
        (Some(Bson::Int64(a)), Bson::Int32(b)) => Bson::Int64(a + i64::from(*b)),
        (Some(Bson::Int64(a)), Bson::Int64(b)) => Bson::Int64(a + b),
        (Some(Bson::Double(a)), Bson::Double(b)) => Bson::Double(a + b),
        (Some(Bson::Double(a)), Bson::Int32(b)) => Bson::Double(a + f64::from(*b)),
        (Some(Bson::Int32(a)), Bson::Double(b)) => Bson::Double(f64::from(*a) + b),
        _ => {
            return Err(WriteError::new(14, "cannot apply $inc to a non-numeric value")
                .with_code_name("TypeMismatch"))
        }
    };
    Ok(value)
}
