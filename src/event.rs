//! Contains the events emitted while a bulk write operation dispatches its sub-batches, and the
//! handler type that receives them.

pub mod bulk_write;

use std::{fmt, sync::Arc};

use futures_core::future::BoxFuture;
use tokio::sync::mpsc;

/// Where a [`Collection`](crate::Collection) sends its events. Set one with
/// [`CollectionOptions::bulk_write_event_handler`](crate::options::CollectionOptions).
///
/// A channel sender converts into a handler directly:
///
/// ```rust
/// # use mongodb_bulk::options::CollectionOptions;
/// # fn example() {
/// let (tx, mut rx) = tokio::sync::mpsc::channel(100);
/// tokio::spawn(async move {
///     while let Some(event) = rx.recv().await {
///         println!("{:?}", event);
///     }
/// });
/// let options = CollectionOptions::builder()
///     .bulk_write_event_handler(tx.into())
///     .build();
/// # }
/// ```
///
/// and closures are wrapped with [`EventHandler::callback`]:
///
/// ```rust
/// # use mongodb_bulk::{event::EventHandler, options::CollectionOptions};
/// let options = CollectionOptions::builder()
///     .bulk_write_event_handler(EventHandler::callback(|event| println!("{:?}", event)))
///     .build();
/// ```
///
/// Callbacks run inline on the task executing the bulk operation, so they should return quickly.
/// Async callbacks and channel sends run on tasks spawned onto the current tokio runtime.
#[derive(Clone)]
#[non_exhaustive]
pub enum EventHandler<T> {
    /// A synchronous callback.
    Callback(Arc<dyn Fn(T) + Sync + Send>),
    /// A callback whose returned future is spawned.
    AsyncCallback(Arc<dyn Fn(T) -> BoxFuture<'static, ()> + Sync + Send>),
    /// A `tokio` channel sender. A full channel delays the event, never the operation.
    TokioMpsc(mpsc::Sender<T>),
}

impl<T> fmt::Debug for EventHandler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Callback(_) => "Callback",
            Self::AsyncCallback(_) => "AsyncCallback",
            Self::TokioMpsc(_) => "TokioMpsc",
        };
        f.debug_tuple("EventHandler").field(&kind).finish()
    }
}

impl<T> From<mpsc::Sender<T>> for EventHandler<T> {
    fn from(sender: mpsc::Sender<T>) -> Self {
        Self::TokioMpsc(sender)
    }
}

impl<T: Send + Sync + 'static> EventHandler<T> {
    /// Wraps a synchronous callback.
    pub fn callback(f: impl Fn(T) + Send + Sync + 'static) -> Self {
        Self::Callback(Arc::new(f))
    }

    /// Wraps an async callback.
    pub fn async_callback(f: impl Fn(T) -> BoxFuture<'static, ()> + Send + Sync + 'static) -> Self {
        Self::AsyncCallback(Arc::new(f))
    }

    pub(crate) fn handle(&self, event: T) {
        match self {
            Self::Callback(callback) => callback(event),
            Self::AsyncCallback(callback) => crate::runtime::spawn_detached(callback(event)),
            Self::TokioMpsc(sender) => {
                let sender = sender.clone();
                crate::runtime::spawn_detached(async move {
                    // the receiver may have been dropped
                    let _ = sender.send(event).await;
                });
            }
        }
    }
}
