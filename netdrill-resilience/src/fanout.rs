//! Concurrent fan-out with first-error cancellation

use futures::stream::{FuturesUnordered, StreamExt};
use log::debug;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Run every task concurrently and wait for all of them.
///
/// Each task receives a child of `parent`. When a task fails, the child token
/// is cancelled so siblings can stop, the remaining tasks are drained, and the
/// first error is returned. On success the outputs are returned in task order.
pub async fn launch_all<I, F, Fut, T, E>(parent: &CancellationToken, tasks: I) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = F>,
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let token = parent.child_token();
    let mut running: FuturesUnordered<_> = tasks
        .into_iter()
        .enumerate()
        .map(|(index, task)| {
            let fut = task(token.clone());
            async move { (index, fut.await) }
        })
        .collect();

    debug!("Launched {} concurrent tasks", running.len());

    let mut outputs: Vec<Option<T>> = (0..running.len()).map(|_| None).collect();
    let mut first_error = None;

    while let Some((index, result)) = running.next().await {
        match result {
            Ok(output) => outputs[index] = Some(output),
            Err(error) => {
                if first_error.is_none() {
                    debug!("Task {} failed, cancelling remaining tasks", index);
                    token.cancel();
                    first_error = Some(error);
                }
            }
        }
    }

    match first_error {
        Some(error) => Err(error),
        None => Ok(outputs.into_iter().flatten().collect()),
    }
}
