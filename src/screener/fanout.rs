use std::future::Future;

use anyhow::Result;
use tokio::task::JoinSet;
use tracing::error;

/// Launch one task per input, await them all, and collect every outcome
///
/// Fan-in is unordered; each task succeeds or fails on its own and a failure
/// never cancels its siblings. A panicked task is logged and dropped from the
/// output.
pub async fn join_all<I, T, F, Fut>(inputs: Vec<I>, task: F) -> Vec<(I, Result<T>)>
where
    I: Clone + Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let mut set = JoinSet::new();
    for input in inputs {
        let fut = task(input.clone());
        set.spawn(async move { (input, fut.await) });
    }

    let mut outcomes = Vec::with_capacity(set.len());
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => error!("Screening task panicked: {}", e),
        }
    }

    outcomes
}
