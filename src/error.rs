//! Contains the `Error` and `Result` types that `mongodb_bulk` uses.

pub(crate) mod bulk_write;

use std::{any::Any, collections::HashSet, fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bson::Document;

pub use bulk_write::BulkWriteError;

/// The error code the server reports when a write would violate a unique index.
pub const DUPLICATE_KEY_CODE: i32 = 11000;

/// The result type for all methods that can return an error in the `mongodb_bulk` crate.
pub type Result<T> = std::result::Result<T, Error>;

/// An error that can occur in the `mongodb_bulk` crate. The inner
/// [`ErrorKind`](enum.ErrorKind.html) is wrapped in a `Box` to keep the error small.
#[derive(Clone, Debug, Error)]
#[cfg_attr(
    feature = "error-backtrace",
    error("Kind: {kind}, labels: {labels:?}, source: {source:?}, backtrace: {backtrace}")
)]
#[cfg_attr(
    not(feature = "error-backtrace"),
    error("Kind: {kind}, labels: {labels:?}, source: {source:?}")
)]
#[non_exhaustive]
pub struct Error {
    /// The type of error that occurred.
    pub kind: Box<ErrorKind>,

    labels: HashSet<String>,

    #[source]
    pub(crate) source: Option<Box<Error>>,

    #[cfg(feature = "error-backtrace")]
    pub(crate) backtrace: Arc<std::backtrace::Backtrace>,
}

impl Error {
    /// Create a new `Error` wrapping an arbitrary value. [`BatchExecutor`](crate::BatchExecutor)
    /// implementations can use this to surface their own failures.
    pub fn custom(e: impl Any + Send + Sync) -> Self {
        Self::new(ErrorKind::Custom(Arc::new(e)), None::<Option<String>>)
    }

    /// Retrieve a reference to a value provided to `Error::custom`. Returns `None` if this is not
    /// a custom error or if the payload types mismatch.
    pub fn get_custom<E: Any>(&self) -> Option<&E> {
        if let ErrorKind::Custom(c) = &*self.kind {
            c.downcast_ref()
        } else {
            None
        }
    }

    /// Create an error indicating that the remote store exceeded the operation's time budget.
    pub fn timeout(message: impl Into<String>) -> Self {
        ErrorKind::Timeout {
            message: message.into(),
        }
        .into()
    }

    /// Create an error indicating that the remote store sent a reply that could not be
    /// interpreted.
    pub fn invalid_response(message: impl Into<String>) -> Error {
        ErrorKind::InvalidResponse {
            message: message.into(),
        }
        .into()
    }

    pub(crate) fn new(kind: ErrorKind, labels: Option<impl IntoIterator<Item = String>>) -> Self {
        let mut labels: HashSet<String> = labels
            .map(|labels| labels.into_iter().collect())
            .unwrap_or_default();
        if let Some(wc) = kind.get_write_concern_error() {
            labels.extend(wc.labels.clone());
        }
        Self {
            kind: Box::new(kind),
            labels,
            source: None,
            #[cfg(feature = "error-backtrace")]
            backtrace: Arc::new(std::backtrace::Backtrace::capture()),
        }
    }

    pub(crate) fn invalid_argument(message: impl Into<String>) -> Error {
        ErrorKind::InvalidArgument {
            message: message.into(),
        }
        .into()
    }

    pub(crate) fn invalid_state(message: impl Into<String>) -> Error {
        ErrorKind::InvalidState {
            message: message.into(),
        }
        .into()
    }

    /// Whether this error was raised because a bulk operation was reused after it was executed.
    pub fn is_state_error(&self) -> bool {
        matches!(self.kind.as_ref(), ErrorKind::InvalidState { .. })
    }

    /// Whether this error was raised because a request failed client-side validation.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self.kind.as_ref(), ErrorKind::InvalidArgument { .. })
    }

    /// Whether this error, or the error that caused it, is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self.kind.as_ref(), ErrorKind::Timeout { .. })
            || matches!(self.kind.as_ref(), ErrorKind::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::TimedOut)
            || self
                .source
                .as_ref()
                .map(|source| source.is_timeout())
                .unwrap_or(false)
    }

    /// Whether any of the write errors carried by this error is a duplicate key violation.
    pub fn is_duplicate_key(&self) -> bool {
        match self.kind.as_ref() {
            ErrorKind::BulkWrite(bulk_write_error) => bulk_write_error
                .write_errors
                .iter()
                .any(|write_error| write_error.code == DUPLICATE_KEY_CODE),
            _ => false,
        }
    }

    /// Returns the labels for this error.
    pub fn labels(&self) -> &HashSet<String> {
        &self.labels
    }

    /// Whether this error contains the specified label.
    pub fn contains_label<T: AsRef<str>>(&self, label: T) -> bool {
        let label = label.as_ref();
        self.labels().contains(label)
            || self
                .source
                .as_ref()
                .map(|source| source.contains_label(label))
                .unwrap_or(false)
    }

    /// Adds the given label to this error.
    pub fn add_label<T: AsRef<str>>(&mut self, label: T) {
        let label = label.as_ref().to_string();
        self.labels.insert(label);
    }

    /// The error that caused this one, if any. A [`BulkWriteError`] whose sub-batch dispatch was
    /// cut short by an executor failure carries that failure here.
    pub fn source_error(&self) -> Option<&Error> {
        self.source.as_deref()
    }

    pub(crate) fn with_source<E: Into<Option<Error>>>(mut self, source: E) -> Self {
        self.source = source.into().map(Box::new);
        self
    }
}

impl<E> From<E> for Error
where
    ErrorKind: From<E>,
{
    fn from(err: E) -> Self {
        Error::new(err.into(), None::<Option<String>>)
    }
}

impl From<crate::bson::ser::Error> for ErrorKind {
    fn from(err: crate::bson::ser::Error) -> Self {
        Self::BsonSerialization(err)
    }
}

impl From<std::io::Error> for ErrorKind {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl From<std::io::ErrorKind> for ErrorKind {
    fn from(err: std::io::ErrorKind) -> Self {
        Self::Io(Arc::new(err.into()))
    }
}

/// The types of errors that can occur.
#[allow(missing_docs)]
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum ErrorKind {
    /// An invalid argument was provided, e.g. a request that failed validation or an empty bulk
    /// operation. Nothing was dispatched.
    #[error("An invalid argument was provided: {message}")]
    #[non_exhaustive]
    InvalidArgument { message: String },

    /// A bulk operation was modified or executed after it had already been executed. Nothing was
    /// dispatched.
    #[error("Invalid state: {message}")]
    #[non_exhaustive]
    InvalidState { message: String },

    /// Wrapper around `bson::ser::Error`.
    #[error("{0}")]
    BsonSerialization(crate::bson::ser::Error),

    /// One or more writes in a bulk operation failed, or its write concern could not be
    /// satisfied. The error carries whatever had already been applied.
    #[error("An error occurred when executing a bulk write operation: {0:?}")]
    BulkWrite(BulkWriteError),

    /// Wrapper around [`std::io::Error`](https://doc.rust-lang.org/std/io/struct.Error.html).
    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),

    /// The executor returned an outcome that does not fit the dispatched batch.
    #[error("The executor returned an invalid reply to a bulk write batch: {message}")]
    #[non_exhaustive]
    InvalidResponse { message: String },

    /// The remote store exceeded the operation's time budget.
    #[error("Operation timed out: {message}")]
    #[non_exhaustive]
    Timeout { message: String },

    /// A custom value produced by user code.
    #[error("Custom user error{string}", string = display_custom(.0))]
    Custom(Arc<dyn Any + Send + Sync>),
}

fn display_custom(custom: &Arc<dyn Any + Send + Sync>) -> String {
    if let Some(string) = custom.downcast_ref::<String>() {
        format!(": {string}")
    } else {
        String::new()
    }
}

impl ErrorKind {
    fn get_write_concern_error(&self) -> Option<&WriteConcernError> {
        match self {
            ErrorKind::BulkWrite(BulkWriteError {
                write_concern_error,
                ..
            }) => write_concern_error.as_ref(),
            _ => None,
        }
    }

    #[cfg(feature = "tracing-unstable")]
    pub(crate) fn name(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument { .. } => "InvalidArgument",
            ErrorKind::InvalidState { .. } => "InvalidState",
            ErrorKind::BsonSerialization(..) => "BsonSerialization",
            ErrorKind::BulkWrite(..) => "BulkWrite",
            ErrorKind::Io(..) => "Io",
            ErrorKind::InvalidResponse { .. } => "InvalidResponse",
            ErrorKind::Timeout { .. } => "Timeout",
            ErrorKind::Custom(..) => "Custom",
        }
    }
}

/// An error that occurred due to not being able to satisfy a write concern.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[non_exhaustive]
pub struct WriteConcernError {
    /// Identifies the type of write concern error.
    pub code: i32,

    /// The name associated with the error code.
    #[serde(rename = "codeName", default)]
    pub code_name: String,

    /// A description of the error that occurred.
    #[serde(alias = "errmsg", default = "String::new")]
    pub message: String,

    /// A document identifying the write concern setting related to the error.
    #[serde(rename = "errInfo")]
    pub details: Option<Document>,

    /// Labels categorizing the error.
    #[serde(rename = "errorLabels", default)]
    pub(crate) labels: Vec<String>,
}

impl WriteConcernError {
    /// Construct a write concern error with the given code and message.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            code_name: String::new(),
            message: message.into(),
            details: None,
            labels: Vec::new(),
        }
    }

    /// Set the code name of this error.
    pub fn with_code_name(mut self, code_name: impl Into<String>) -> Self {
        self.code_name = code_name.into();
        self
    }

    /// Set the details document of this error.
    pub fn with_details(mut self, details: Document) -> Self {
        self.details = Some(details);
        self
    }

    /// Add a label to this error.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }
}

impl fmt::Display for WriteConcernError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(
            fmt,
            "Write concern error code {} ({}): {}",
            self.code, self.code_name, self.message
        )
    }
}

/// An error that occurred during a single write that wasn't due to being unable to satisfy a
/// write concern. This is the per-request failure an executor reports.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct WriteError {
    /// Identifies the type of write error.
    pub code: i32,

    /// The name associated with the error code.
    ///
    /// Note that the server will not return this in some cases, hence `code_name` being an
    /// `Option`.
    #[serde(rename = "codeName", default)]
    pub code_name: Option<String>,

    /// A description of the error that occurred.
    #[serde(rename = "errmsg", default = "String::new")]
    pub message: String,

    /// A document providing more information about the write error (e.g. details
    /// pertaining to document validation).
    #[serde(rename = "errInfo")]
    pub details: Option<Document>,
}

impl WriteError {
    /// Construct a write error with the given code and message.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            code_name: None,
            message: message.into(),
            details: None,
        }
    }

    /// Set the code name of this error.
    pub fn with_code_name(mut self, code_name: impl Into<String>) -> Self {
        self.code_name = Some(code_name.into());
        self
    }

    pub(crate) fn at_index(self, index: usize) -> IndexedWriteError {
        IndexedWriteError {
            index,
            code: self.code,
            code_name: self.code_name,
            message: self.message,
            details: self.details,
        }
    }
}

/// An individual write error that occurred during a bulk write operation.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct IndexedWriteError {
    /// Index into the caller's list of requests that this error corresponds to.
    #[serde(default)]
    pub index: usize,

    /// Identifies the type of write error.
    pub code: i32,

    /// The name associated with the error code.
    ///
    /// Note that the server will not return this in some cases, hence `code_name` being an
    /// `Option`.
    #[serde(rename = "codeName", default)]
    pub code_name: Option<String>,

    /// A description of the error that occurred.
    #[serde(rename = "errmsg", default = "String::new")]
    pub message: String,

    /// A document providing more information about the write error.
    #[serde(rename = "errInfo")]
    pub details: Option<Document>,
}
