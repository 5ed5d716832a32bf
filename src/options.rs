//! Contains all of the types needed to specify options to bulk write operations.
//!
//! The options structs in this module use the
//! [`typed-builder`](https://crates.io/crates/typed-builder) crate to derive a type-safe builder
//! API on them. For example, to create an instance of
//! [`CollectionOptions`](struct.CollectionOptions.html) with only `max_write_batch_size` and
//! `write_concern` set, the builder API can be used as follows:
//!
//! ```rust
//! # use mongodb_bulk::options::{CollectionOptions, WriteConcern};
//! #
//! # let options = CollectionOptions::builder()
//! #                   .max_write_batch_size(1000)
//! #                   .write_concern(WriteConcern::majority())
//! #                   .build();
//! ```

pub use crate::{coll::options::*, concern::*};
