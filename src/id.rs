//! Client-side generation of document identifiers.

use std::fmt::Debug;

use crate::bson::{oid::ObjectId, Bson};

/// A source of fresh `_id` values for inserted documents that do not carry one.
///
/// Implementations must never return the same value twice within the lifetime of the process,
/// and must not require coordination with other processes to do so.
pub trait IdGenerator: Debug + Send + Sync {
    /// Produce a new identifier.
    fn next_id(&self) -> Bson;
}

/// Generates [`ObjectId`]s: a 4-byte timestamp, a 5-byte per-process random value and a 3-byte
/// counter that starts at a random value.
#[derive(Clone, Copy, Debug, Default)]
#[non_exhaustive]
pub struct ObjectIdGenerator;

impl IdGenerator for ObjectIdGenerator {
    fn next_id(&self) -> Bson {
        Bson::ObjectId(ObjectId::new())
    }
}
