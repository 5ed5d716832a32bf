pub mod options;

use std::{fmt, fmt::Debug, str::FromStr, sync::Arc};

use serde::{de::Error as DeError, Deserialize, Deserializer, Serialize};

use self::options::{BatchLimits, CollectionOptions};
use crate::{
    bulk::BulkWriteOperation,
    concern::WriteConcern,
    error::{Error, Result},
    event::{bulk_write::BulkWriteEvent, EventHandler},
    executor::BatchExecutor,
    id::{IdGenerator, ObjectIdGenerator},
};

/// `Collection` is the client-side handle to a single collection on the remote store. It binds a
/// [`Namespace`] to the [`BatchExecutor`] that ships writes there and is the starting point for
/// bulk write operations.
///
/// `Collection` uses [`std::sync::Arc`](https://doc.rust-lang.org/std/sync/struct.Arc.html) internally,
/// so it can safely be shared across threads or async tasks.
///
/// # Example
/// ```rust
/// # use std::sync::Arc;
/// # use mongodb_bulk::{bson::{doc, Document}, error::Result, BatchExecutor, Collection, Namespace};
/// #
/// # async fn run(executor: Arc<dyn BatchExecutor>) -> Result<()> {
/// let coll = Collection::new(Namespace::new("shop", "items"), executor);
///
/// let mut bulk = coll.initialize_ordered_bulk_operation();
/// bulk.insert(&mut doc! { "sku": "a-1", "qty": 10 })?;
/// bulk.find(doc! { "sku": "b-2" })?
///     .upsert()
///     .update_one(doc! { "$inc": { "qty": 5 } })?;
/// bulk.find(doc! { "qty": 0 })?.remove_many()?;
///
/// let result = bulk.execute(None).await?;
/// println!("inserted {:?} documents", result.inserted_count());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Collection {
    inner: Arc<CollectionInner>,
}

#[derive(Clone, Debug)]
struct CollectionInner {
    namespace: Namespace,
    executor: Arc<dyn BatchExecutor>,
    id_generator: Arc<dyn IdGenerator>,
    write_concern: Option<WriteConcern>,
    max_time: Option<std::time::Duration>,
    limits: BatchLimits,
    bulk_write_event_handler: Option<EventHandler<BulkWriteEvent>>,
}

impl Collection {
    /// Creates a handle to the collection at `namespace` with default options.
    pub fn new(namespace: Namespace, executor: Arc<dyn BatchExecutor>) -> Self {
        Self::with_options(namespace, executor, None)
    }

    /// Creates a handle to the collection at `namespace` with the given options.
    pub fn with_options(
        namespace: Namespace,
        executor: Arc<dyn BatchExecutor>,
        options: impl Into<Option<CollectionOptions>>,
    ) -> Self {
        let options = options.into().unwrap_or_default();
        let limits = BatchLimits::from_options(&options);

        Self {
            inner: Arc::new(CollectionInner {
                namespace,
                executor,
                id_generator: Arc::new(ObjectIdGenerator),
                write_concern: options.write_concern,
                max_time: options.max_time,
                limits,
                bulk_write_event_handler: options.bulk_write_event_handler,
            }),
        }
    }

    /// Gets a clone of the `Collection` that assigns `_id`s to inserted documents with
    /// `id_generator` instead of generating [`ObjectId`](crate::bson::oid::ObjectId)s.
    pub fn with_id_generator(&self, id_generator: Arc<dyn IdGenerator>) -> Self {
        let mut new_inner = CollectionInner::clone(&self.inner);
        new_inner.id_generator = id_generator;
        Self {
            inner: Arc::new(new_inner),
        }
    }

    /// Gets the name of the `Collection`.
    pub fn name(&self) -> &str {
        &self.inner.namespace.coll
    }

    /// Gets the namespace of the `Collection`.
    pub fn namespace(&self) -> &Namespace {
        &self.inner.namespace
    }

    /// Gets the write concern of the `Collection`.
    pub fn write_concern(&self) -> Option<&WriteConcern> {
        self.inner.write_concern.as_ref()
    }

    /// Starts an ordered bulk write operation. Its requests are executed in the order they are
    /// added, and execution stops at the first request that fails.
    pub fn initialize_ordered_bulk_operation(&self) -> BulkWriteOperation {
        BulkWriteOperation::new(self.clone(), true)
    }

    /// Starts an unordered bulk write operation. Every request is attempted regardless of the
    /// failure of others, possibly in parallel.
    pub fn initialize_unordered_bulk_operation(&self) -> BulkWriteOperation {
        BulkWriteOperation::new(self.clone(), false)
    }

    pub(crate) fn executor(&self) -> &dyn BatchExecutor {
        self.inner.executor.as_ref()
    }

    pub(crate) fn id_generator(&self) -> &dyn IdGenerator {
        self.inner.id_generator.as_ref()
    }

    pub(crate) fn max_time(&self) -> Option<std::time::Duration> {
        self.inner.max_time
    }

    pub(crate) fn limits(&self) -> &BatchLimits {
        &self.inner.limits
    }

    pub(crate) fn bulk_write_event_handler(&self) -> Option<&EventHandler<BulkWriteEvent>> {
        self.inner.bulk_write_event_handler.as_ref()
    }
}

/// A struct modeling the canonical name for a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    /// The name of the database associated with this namespace.
    pub db: String,

    /// The name of the collection this namespace corresponds to.
    pub coll: String,
}

impl Namespace {
    /// Construct a `Namespace` with the given database and collection.
    pub fn new(db: impl Into<String>, coll: impl Into<String>) -> Self {
        Self {
            db: db.into(),
            coll: coll.into(),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}.{}", self.db, self.coll)
    }
}

impl<'de> Deserialize<'de> for Namespace {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        s.parse()
            .map_err(|_| D::Error::custom("Missing one or more fields in namespace"))
    }
}

impl Serialize for Namespace {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&(self.db.clone() + "." + &self.coll))
    }
}

impl FromStr for Namespace {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split('.');

        let db = parts.next();
        let coll = parts.collect::<Vec<_>>().join(".");

        match (db, coll) {
            (Some(db), coll) if !db.is_empty() && !coll.is_empty() => Ok(Self {
                db: db.to_string(),
                coll,
            }),
            _ => Err(Self::Err::invalid_argument(
                "Missing one or more fields in namespace",
            )),
        }
    }
}
