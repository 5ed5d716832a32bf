//! Contains the types for write concerns.


use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use typed_builder::TypedBuilder;

use crate::{
    bson::Bson,
    error::{Error, Result},
    serde_util,
};

/// The durability guarantee a bulk operation asks the remote store for. It is forwarded to the
/// executor with every sub-batch, and decides whether per-request outcomes are reported at all.
///
/// An empty write concern defers to the remote store's default, which is acknowledged.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, TypedBuilder, Serialize, Deserialize)]
#[builder(field_defaults(default, setter(into)))]
#[non_exhaustive]
pub struct WriteConcern {
    /// How many nodes must acknowledge each write.
    pub w: Option<Acknowledgment>,

    /// How long the remote store may wait for `w` to be satisfied before reporting a write
    /// concern error. The writes themselves are not rolled back when this expires.
    #[serde(rename = "wtimeout", alias = "wtimeoutMS")]
    #[serde(serialize_with = "serde_util::serialize_duration_option_as_int_millis")]
    #[serde(deserialize_with = "serde_util::deserialize_duration_option_from_u64_millis")]
    #[serde(default)]
    pub w_timeout: Option<Duration>,

    /// Whether each write must reach the on-disk journal before it is acknowledged.
    #[serde(rename = "j", alias = "journal")]
    pub journal: Option<bool>,
}

/// How many members of the remote store's replica set must acknowledge a write, the `w` field of
/// a [`WriteConcern`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(into = "Bson", try_from = "Bson")]
#[non_exhaustive]
pub enum Acknowledgment {
    /// The write must reach this many nodes. `Nodes(0)` makes the write concern unacknowledged:
    /// the executor reports no per-request outcomes and the bulk operation returns an
    /// unacknowledged result.
    Nodes(u32),

    /// The write must reach a majority of nodes.
    Majority,

    /// The write must satisfy the named custom write concern configured on the remote store.
    Custom(String),
}

impl From<Acknowledgment> for Bson {
    fn from(w: Acknowledgment) -> Self {
        match w {
            Acknowledgment::Nodes(n) => match i32::try_from(n) {
                Ok(n) => Bson::Int32(n),
                Err(_) => Bson::Int64(n.into()),
            },
            Acknowledgment::Majority => Bson::String("majority".to_string()),
            Acknowledgment::Custom(name) => Bson::String(name),
        }
    }
}

impl TryFrom<Bson> for Acknowledgment {
    type Error = String;

    fn try_from(value: Bson) -> std::result::Result<Self, Self::Error> {
        let nodes = match value {
            Bson::String(name) => return Ok(name.into()),
            Bson::Int32(n) => u32::try_from(n).ok(),
            Bson::Int64(n) => u32::try_from(n).ok(),
            _ => None,
        };
        nodes
            .map(Acknowledgment::Nodes)
            .ok_or_else(|| "w must be a non-negative integer or a string".to_string())
    }
}

impl From<u32> for Acknowledgment {
    fn from(i: u32) -> Self {
        Acknowledgment::Nodes(i)
    }
}

impl From<String> for Acknowledgment {
    fn from(name: String) -> Self {
        match name.as_str() {
            "majority" => Acknowledgment::Majority,
            _ => Acknowledgment::Custom(name),
        }
    }
}

impl From<&str> for Acknowledgment {
    fn from(name: &str) -> Self {
        name.to_string().into()
    }
}

impl WriteConcern {
    /// Requires acknowledgement from `n` nodes.
    pub fn nodes(n: u32) -> Self {
        Acknowledgment::Nodes(n).into()
    }

    /// Requires acknowledgement from a majority of nodes.
    pub fn majority() -> Self {
        Acknowledgment::Majority.into()
    }

    /// Requires the named custom write concern to be satisfied.
    pub fn custom(name: impl Into<String>) -> Self {
        Acknowledgment::from(name.into()).into()
    }

    /// A fire-and-forget `WriteConcern`: no acknowledgement is requested.
    pub fn unacknowledged() -> Self {
        Acknowledgment::Nodes(0).into()
    }

    /// Whether this write concern requests any acknowledgement from the remote store.
    pub fn is_acknowledged(&self) -> bool {
        self.w != Some(Acknowledgment::Nodes(0)) || self.journal == Some(true)
    }

    /// Whether no field is set, in which case the remote store's default applies.
    pub fn is_empty(&self) -> bool {
        self.w.is_none() && self.w_timeout.is_none() && self.journal.is_none()
    }

    /// Rejects a write concern that asks for no acknowledgement but a journaled write.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.w == Some(Acknowledgment::Nodes(0)) && self.journal == Some(true) {
            return Err(Error::invalid_argument(
                "write concern cannot have w=0 and j=true",
            ));
        }

        Ok(())
    }
}

impl From<Acknowledgment> for WriteConcern {
    fn from(w: Acknowledgment) -> Self {
        WriteConcern {
            w: Some(w),
            ..Default::default()
        }
    }
}
