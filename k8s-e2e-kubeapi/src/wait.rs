//! Deadline-bound probe loop shared by the readiness operations.
//!
//! The deadline is checked before every probe, so an already-expired
//! timeout returns without touching the API, and the loop can never run
//! past its budget by more than one probe plus one sleep.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};

use crate::{Error, Result};

/// Outcome of a single readiness probe.
pub(crate) enum Probe<T> {
    /// Condition holds; the wait succeeds with this value.
    Ready(T),
    /// Condition does not hold yet; sleep and probe again.
    Pending,
    /// Hard failure; the wait aborts immediately without retrying.
    Fault(Error),
}

pub(crate) async fn poll_until<T, F, Fut>(
    what: &str,
    timeout: Duration,
    interval: Duration,
    mut probe: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Probe<T>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if Instant::now() >= deadline {
            return Err(Error::Timeout {
                what: what.to_string(),
                timeout,
            });
        }
        match probe().await {
            Probe::Ready(value) => return Ok(value),
            Probe::Pending => {}
            Probe::Fault(err) => return Err(err),
        }
        sleep(interval).await;
    }
}
