//! Timeout-bounded convergence polling.
//!
//! The control plane is eventually consistent and reconciled by the external
//! operator at its own cadence, so all waiting is cooperative polling with a
//! fixed sleep interval. There is no backoff: tightening or widening the
//! interval does not speed up convergence, it only changes API load.

use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

use crate::error::{Error, Result};

/// Interval and deadline for a single polled condition.
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    /// Fixed sleep between reads.
    pub interval: Duration,
    /// Total time budget. Once the accumulated sleep time reaches this,
    /// the wait fails with the last observed value.
    pub timeout: Duration,
}

impl PollSettings {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

/// Repeatedly read a value until `predicate` accepts it.
///
/// Each iteration re-reads fresh state; nothing is cached, since the
/// external operator mutates the cluster concurrently. Read errors
/// propagate immediately. On timeout the error carries `awaited` and the
/// last observed value so the failure states exactly what was being
/// waited on.
pub async fn wait_for<T, F, Fut, P>(
    awaited: &str,
    mut read: F,
    predicate: P,
    settings: PollSettings,
) -> Result<T>
where
    T: Debug,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    P: Fn(&T) -> bool,
{
    let mut elapsed = Duration::ZERO;
    loop {
        let value = read().await?;
        if predicate(&value) {
            debug!(awaited, observed = ?value, "Condition satisfied");
            return Ok(value);
        }
        elapsed += settings.interval;
        if elapsed >= settings.timeout {
            return Err(Error::DeadlineExceeded {
                awaited: awaited.to_string(),
                last_observed: format!("{value:?}"),
            });
        }
        debug!(awaited, observed = ?value, "Condition not yet satisfied, sleeping");
        sleep(settings.interval).await;
    }
}
