use std::fmt::Display;
use std::future::Future;

/// Run `future` in the background without handing a join handle to the caller.
///
/// Errors and panics are logged under `label`; nothing propagates.
pub fn spawn_detached<F, E>(label: &'static str, future: F)
where
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let handle = tokio::spawn(future);
    tokio::spawn(async move {
        match handle.await {
            Ok(Ok(())) => tracing::debug!(task = label, "Background task finished"),
            Ok(Err(e)) => tracing::error!(task = label, error = %e, "Background task failed"),
            Err(e) => tracing::error!(task = label, error = %e, "Background task panicked"),
        }
    });
}
