use std::future::Future;

/// Runs `fut` to completion in the background on the current tokio runtime.
///
/// This must be called from an async block or function running on a runtime. The task is
/// detached; a panic inside it is reported by tokio and does not reach the caller.
pub(crate) fn spawn_detached<F>(fut: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    let handle = tokio::runtime::Handle::current();
    drop(handle.spawn(fut));
}
