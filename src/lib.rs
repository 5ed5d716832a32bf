#![doc = include_str!("../README.md")]
#![warn(
    missing_docs,
    rustdoc::missing_crate_level_docs,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]
#![allow(
    clippy::unreadable_literal,
    clippy::match_like_matches_macro,
    clippy::derive_partial_eq_without_eq
)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod options;

mod bson_util;
mod bulk;
mod coll;
mod concern;
pub mod error;
pub mod event;
pub mod executor;
pub mod id;
pub mod results;
pub(crate) mod runtime;
mod serde_util;
#[cfg(feature = "tracing-unstable")]
mod trace;

pub use bson2 as bson;

pub use crate::{
    bulk::{BulkWriteOperation, RequestScope, UpdateModifications, UpsertRequestScope, WriteRequest},
    coll::{Collection, Namespace},
    executor::BatchExecutor,
};

/// A boxed future.
pub type BoxFuture<'a, T> = std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;
