use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use typed_builder::TypedBuilder;

use crate::{
    bson::Bson,
    concern::WriteConcern,
    event::{bulk_write::BulkWriteEvent, EventHandler},
    serde_util,
};

/// The largest number of requests sent to the executor in a single sub-batch, unless configured
/// otherwise.
pub const DEFAULT_MAX_WRITE_BATCH_SIZE: u32 = 100_000;

/// The largest message, in bytes, handed to the executor in a single sub-batch, unless
/// configured otherwise.
pub const DEFAULT_MAX_MESSAGE_SIZE_BYTES: u32 = 48_000_000;

/// The largest document, in bytes, that may be inserted or used as a replacement, unless
/// configured otherwise.
pub const DEFAULT_MAX_BSON_OBJECT_SIZE: u32 = 16 * 1024 * 1024;

/// The number of unordered sub-batches that may be in flight at once, unless configured
/// otherwise.
pub const DEFAULT_MAX_CONCURRENT_BATCHES: u32 = 4;

/// These are the valid options for creating a [`Collection`](crate::Collection).
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Deserialize, Serialize, TypedBuilder)]
#[builder(field_defaults(default, setter(strip_option)))]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct CollectionOptions {
    /// The default write concern for bulk operations created from the collection.
    pub write_concern: Option<WriteConcern>,

    /// The maximum number of requests in a single sub-batch.
    pub max_write_batch_size: Option<u32>,

    /// The maximum size, in bytes, of the requests in a single sub-batch.
    pub max_message_size_bytes: Option<u32>,

    /// The maximum size, in bytes, of a single inserted or replacement document.
    pub max_bson_object_size: Option<u32>,

    /// The maximum number of unordered sub-batches dispatched concurrently. Ordered operations
    /// always dispatch one sub-batch at a time.
    pub max_concurrent_batches: Option<u32>,

    /// The time budget the executor is asked to enforce for each sub-batch. An executor that
    /// exceeds it reports a timeout error.
    #[serde(rename = "maxTimeMS")]
    #[serde(serialize_with = "serde_util::serialize_duration_option_as_int_millis")]
    #[serde(deserialize_with = "serde_util::deserialize_duration_option_from_u64_millis")]
    #[serde(default)]
    pub max_time: Option<Duration>,

    /// The handler that receives an event for every sub-batch dispatched.
    #[serde(skip)]
    pub bulk_write_event_handler: Option<EventHandler<BulkWriteEvent>>,
}

/// Limits used to split a bulk operation into sub-batches, resolved from
/// [`CollectionOptions`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct BatchLimits {
    pub(crate) max_write_batch_size: usize,
    pub(crate) max_message_size_bytes: usize,
    pub(crate) max_bson_object_size: usize,
    pub(crate) max_concurrent_batches: usize,
}

impl BatchLimits {
    pub(crate) fn from_options(options: &CollectionOptions) -> Self {
        Self {
            max_write_batch_size: options
                .max_write_batch_size
                .unwrap_or(DEFAULT_MAX_WRITE_BATCH_SIZE)
                .max(1) as usize,
            max_message_size_bytes: options
                .max_message_size_bytes
                .unwrap_or(DEFAULT_MAX_MESSAGE_SIZE_BYTES) as usize,
            max_bson_object_size: options
                .max_bson_object_size
                .unwrap_or(DEFAULT_MAX_BSON_OBJECT_SIZE) as usize,
            max_concurrent_batches: options
                .max_concurrent_batches
                .unwrap_or(DEFAULT_MAX_CONCURRENT_BATCHES)
                .max(1) as usize,
        }
    }
}

/// Specifies the options to a
/// [`BulkWriteOperation::execute`](crate::BulkWriteOperation::execute) call.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Deserialize, Serialize, TypedBuilder)]
#[builder(field_defaults(default, setter(into)))]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct BulkWriteOptions {
    /// The write concern for the operation. Falls back to the collection's write concern, and
    /// then to the remote store's default.
    pub write_concern: Option<WriteConcern>,

    /// Opt out of document-level validation on the remote store.
    pub bypass_document_validation: Option<bool>,

    /// Tags the operation with an arbitrary value, which the executor may forward to the remote
    /// store's logs and profiler.
    pub comment: Option<Bson>,
}

impl From<WriteConcern> for BulkWriteOptions {
    fn from(write_concern: WriteConcern) -> Self {
        Self {
            write_concern: Some(write_concern),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{bson::doc, concern::Acknowledgment};

    #[test]
    fn default_limits() {
        let limits = BatchLimits::from_options(&CollectionOptions::default());
        assert_eq!(
            limits,
            BatchLimits {
                max_write_batch_size: 100_000,
                max_message_size_bytes: 48_000_000,
                max_bson_object_size: 16 * 1024 * 1024,
                max_concurrent_batches: 4,
            }
        );
    }

    #[test]
    fn zero_limits_are_clamped() {
        let options = CollectionOptions::builder()
            .max_write_batch_size(0)
            .max_concurrent_batches(0)
            .build();
        let limits = BatchLimits::from_options(&options);
        assert_eq!(limits.max_write_batch_size, 1);
        assert_eq!(limits.max_concurrent_batches, 1);
    }

    #[test]
    fn deserialize_collection_options() {
        let options: CollectionOptions = crate::bson::from_document(doc! {
            "writeConcern": { "w": "majority", "wtimeout": 500 },
            "maxWriteBatchSize": 1000,
            "maxMessageSizeBytes": 1024,
            "maxTimeMS": 2000,
        })
        .unwrap();

        let expected_write_concern = WriteConcern::builder()
            .w(Acknowledgment::Majority)
            .w_timeout(Duration::from_millis(500))
            .build();
        assert_eq!(options.write_concern, Some(expected_write_concern));
        assert_eq!(options.max_write_batch_size, Some(1000));
        assert_eq!(options.max_message_size_bytes, Some(1024));
        assert_eq!(options.max_bson_object_size, None);
        assert_eq!(options.max_time, Some(Duration::from_millis(2000)));
        assert!(options.bulk_write_event_handler.is_none());
    }

    #[test]
    fn bulk_write_options_from_write_concern() {
        let options: BulkWriteOptions = WriteConcern::majority().into();
        assert_eq!(options.write_concern, Some(WriteConcern::majority()));
        assert_eq!(options.bypass_document_validation, None);
    }
}
