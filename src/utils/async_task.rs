use std::time::Duration;

use tokio::time::sleep;
use tokio::time::timeout;
use tracing::error;
use tracing::warn;

use crate::config::BackoffPolicy;
use crate::Result;

/// Runs `task` under `policy`: each attempt is bounded by the policy timeout,
/// failed attempts back off exponentially up to the policy cap.
///
/// A `max_retries` of 0 means unlimited attempts. On exhaustion the last
/// underlying error is returned so callers can add their own context.
pub(crate) async fn task_with_timeout_and_exponential_backoff<F, T, P>(
    task: F,
    policy: BackoffPolicy,
) -> Result<P>
where
    F: Fn() -> T,                               // The type of the async function
    T: std::future::Future<Output = Result<P>>, // The future returned by the async function
{
    let timeout_duration = Duration::from_millis(policy.timeout_ms);
    let max_delay = Duration::from_millis(policy.max_delay_ms);
    let mut delay = Duration::from_millis(policy.base_delay_ms);
    let mut attempts = 0;
    loop {
        let e = match timeout(timeout_duration, task()).await {
            Ok(Ok(r)) => {
                return Ok(r); // Exit on success
            }
            Ok(Err(error)) => {
                warn!("attempt {attempts} failed with error: {:?}", &error);
                error
            }
            Err(_) => {
                warn!("attempt {attempts} timed out after {timeout_duration:?}");
                crate::Error::Fatal(format!("attempt timed out after {timeout_duration:?}"))
            }
        };

        attempts += 1;
        if policy.max_retries > 0 && attempts >= policy.max_retries {
            warn!("task failed after {attempts} attempts");
            return Err(e);
        }
        sleep(delay).await;
        delay = std::cmp::min(delay * 2, max_delay); // Exponential backoff
    }
}

// Helper function to spawn tasks and track their JoinHandles
pub(crate) async fn spawn_task<F, Fut>(
    name: &str,
    task_fn: F,
    handles: Option<&mut Vec<tokio::task::JoinHandle<()>>>,
) where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: std::future::Future<Output = Result<()>> + Send + 'static,
{
    // Clone the name so it can be safely moved into the async block
    let name = name.to_string();
    let handle = tokio::spawn(async move {
        if let Err(e) = task_fn().await {
            error!("spawned task: {name} stopped or encountered an error: {:?}", e);
        }
    });

    // Push the handle into the vector inside the Option
    if let Some(h) = handles {
        h.push(handle);
    }
}
