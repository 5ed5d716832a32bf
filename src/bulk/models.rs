#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

use crate::{
    bson::Document,
    bson_util::{document_size_bytes, replacement_document_check, update_document_check},
    error::{Error, Result},
};

/// Enum modeling the modifications to apply during an update.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(untagged)]
#[non_exhaustive]
pub enum UpdateModifications {
    /// A document that contains only update operator expressions.
    Document(Document),

    /// An aggregation pipeline.
    Pipeline(Vec<Document>),
}

impl UpdateModifications {
    fn validate(&self) -> Result<()> {
        match self {
            UpdateModifications::Document(update) => update_document_check(update),
            UpdateModifications::Pipeline(stages) if stages.is_empty() => Err(
                Error::invalid_argument("update pipeline must contain at least one stage"),
            ),
            UpdateModifications::Pipeline(_) => Ok(()),
        }
    }
}

impl From<Document> for UpdateModifications {
    fn from(item: Document) -> Self {
        UpdateModifications::Document(item)
    }
}

impl From<Vec<Document>> for UpdateModifications {
    fn from(item: Vec<Document>) -> Self {
        UpdateModifications::Pipeline(item)
    }
}

/// A single write queued on a [`BulkWriteOperation`](crate::BulkWriteOperation).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
#[non_exhaustive]
pub enum WriteRequest {
    #[non_exhaustive]
    InsertOne { document: Document },
    #[non_exhaustive]
    UpdateOne {
        filter: Document,
        update: UpdateModifications,
        upsert: bool,
    },
    #[non_exhaustive]
    UpdateMany {
        filter: Document,
        update: UpdateModifications,
        upsert: bool,
    },
    #[non_exhaustive]
    ReplaceOne {
        filter: Document,
        replacement: Document,
        upsert: bool,
    },
    #[non_exhaustive]
    RemoveOne { filter: Document },
    #[non_exhaustive]
    RemoveMany { filter: Document },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum OperationType {
    Insert,
    Update,
    Remove,
}

impl WriteRequest {
    pub(crate) fn operation_type(&self) -> OperationType {
        match self {
            Self::InsertOne { .. } => OperationType::Insert,
            Self::UpdateOne { .. } | Self::UpdateMany { .. } | Self::ReplaceOne { .. } => {
                OperationType::Update
            }
            Self::RemoveOne { .. } | Self::RemoveMany { .. } => OperationType::Remove,
        }
    }

    /// Whether this request should apply to all documents that match the filter. Returns `None`
    /// if the request does not use a filter.
    pub fn multi(&self) -> Option<bool> {
        match self {
            Self::UpdateMany { .. } | Self::RemoveMany { .. } => Some(true),
            Self::UpdateOne { .. } | Self::ReplaceOne { .. } | Self::RemoveOne { .. } => {
                Some(false)
            }
            Self::InsertOne { .. } => None,
        }
    }

    /// The filter of this request, if it has one.
    pub fn filter(&self) -> Option<&Document> {
        match self {
            Self::InsertOne { .. } => None,
            Self::UpdateOne { filter, .. }
            | Self::UpdateMany { filter, .. }
            | Self::ReplaceOne { filter, .. }
            | Self::RemoveOne { filter }
            | Self::RemoveMany { filter } => Some(filter),
        }
    }

    /// Whether this request creates a document when its filter matches nothing.
    pub fn upsert(&self) -> bool {
        match self {
            Self::UpdateOne { upsert, .. }
            | Self::UpdateMany { upsert, .. }
            | Self::ReplaceOne { upsert, .. } => *upsert,
            Self::InsertOne { .. } | Self::RemoveOne { .. } | Self::RemoveMany { .. } => false,
        }
    }

    pub(crate) fn operation_name(&self) -> &'static str {
        match self {
            Self::InsertOne { .. } => "insertOne",
            Self::UpdateOne { .. } => "updateOne",
            Self::UpdateMany { .. } => "updateMany",
            Self::ReplaceOne { .. } => "replaceOne",
            Self::RemoveOne { .. } => "removeOne",
            Self::RemoveMany { .. } => "removeMany",
        }
    }

    /// Checks this request before it is queued. `max_document_size` bounds inserted and
    /// replacement documents.
    pub(crate) fn validate(&self, max_document_size: usize) -> Result<()> {
        match self {
            Self::InsertOne { document } => check_document_size(document, max_document_size),
            Self::UpdateOne { filter, update, .. } | Self::UpdateMany { filter, update, .. } => {
                self.check_filter(filter)?;
                update.validate()
            }
            Self::ReplaceOne {
                filter,
                replacement,
                ..
            } => {
                self.check_filter(filter)?;
                replacement_document_check(replacement)?;
                check_document_size(replacement, max_document_size)
            }
            // an empty filter removes every document
            Self::RemoveOne { .. } | Self::RemoveMany { .. } => Ok(()),
        }
    }

    fn check_filter(&self, filter: &Document) -> Result<()> {
        if filter.is_empty() {
            return Err(Error::invalid_argument(format!(
                "{} requires a non-empty filter",
                self.operation_name()
            )));
        }
        Ok(())
    }

    /// The approximate number of bytes this request occupies in an outgoing message.
    pub(crate) fn size_bytes(&self) -> Result<usize> {
        let size = match self {
            Self::InsertOne { document } => document_size_bytes(document)?,
            Self::UpdateOne { filter, update, .. } | Self::UpdateMany { filter, update, .. } => {
                let update_size = match update {
                    UpdateModifications::Document(update) => document_size_bytes(update)?,
                    UpdateModifications::Pipeline(stages) => {
                        let mut size = 0;
                        for stage in stages {
                            size += document_size_bytes(stage)?;
                        }
                        size
                    }
                };
                document_size_bytes(filter)? + update_size
            }
            Self::ReplaceOne {
                filter,
                replacement,
                ..
            } => document_size_bytes(filter)? + document_size_bytes(replacement)?,
            Self::RemoveOne { filter } | Self::RemoveMany { filter } => {
                document_size_bytes(filter)?
            }
        };
        Ok(size)
    }
}

fn check_document_size(document: &Document, max_document_size: usize) -> Result<()> {
    let size = document_size_bytes(document)?;
    if size > max_document_size {
        return Err(Error::invalid_argument(format!(
            "document is {size} bytes, which exceeds the maximum of {max_document_size} bytes"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::bson::doc;

    const MAX: usize = 16 * 1024 * 1024;

    #[test]
    fn update_requires_filter_and_operators() {
        let update = WriteRequest::UpdateOne {
            filter: doc! {},
            update: doc! { "$set": { "x": 1 } }.into(),
            upsert: false,
        };
        assert!(update.validate(MAX).unwrap_err().is_invalid_argument());

        let update = WriteRequest::UpdateMany {
            filter: doc! { "x": 1 },
            update: doc! { "x": 2 }.into(),
            upsert: true,
        };
        assert!(update.validate(MAX).unwrap_err().is_invalid_argument());

        let update = WriteRequest::UpdateMany {
            filter: doc! { "x": 1 },
            update: vec![doc! { "$set": { "y": "$x" } }].into(),
            upsert: false,
        };
        update.validate(MAX).unwrap();

        let update = WriteRequest::UpdateOne {
            filter: doc! { "x": 1 },
            update: Vec::<Document>::new().into(),
            upsert: false,
        };
        assert!(update.validate(MAX).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn replace_rejects_operators() {
        let replace = WriteRequest::ReplaceOne {
            filter: doc! { "_id": 1 },
            replacement: doc! { "$set": { "x": 1 } },
            upsert: false,
        };
        assert!(replace.validate(MAX).unwrap_err().is_invalid_argument());

        let replace = WriteRequest::ReplaceOne {
            filter: doc! {},
            replacement: doc! { "x": 1 },
            upsert: false,
        };
        assert!(replace.validate(MAX).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn remove_allows_empty_filter() {
        WriteRequest::RemoveMany { filter: doc! {} }
            .validate(MAX)
            .unwrap();
        WriteRequest::RemoveOne { filter: doc! {} }
            .validate(MAX)
            .unwrap();
    }

    #[test]
    fn oversized_documents_rejected() {
        let insert = WriteRequest::InsertOne {
            document: doc! { "x": "a".repeat(100) },
        };
        insert.validate(MAX).unwrap();
        assert!(insert.validate(64).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn accessors() {
        let request = WriteRequest::ReplaceOne {
            filter: doc! { "_id": 1 },
            replacement: doc! { "x": 1 },
            upsert: true,
        };
        assert_eq!(request.operation_type(), OperationType::Update);
        assert_eq!(request.multi(), Some(false));
        assert_eq!(request.filter(), Some(&doc! { "_id": 1 }));
        assert!(request.upsert());

        let request = WriteRequest::InsertOne {
            document: doc! { "_id": 1 },
        };
        assert_eq!(request.operation_type(), OperationType::Insert);
        assert_eq!(request.multi(), None);
        assert_eq!(request.filter(), None);
        assert!(!request.upsert());

        let request = WriteRequest::RemoveMany {
            filter: doc! { "x": 1 },
        };
        assert_eq!(request.operation_type(), OperationType::Remove);
        assert_eq!(request.multi(), Some(true));
    }
}
