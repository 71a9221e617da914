use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

/// Why a [`poll_until`] call ended without a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    TimedOut,
    Cancelled,
}

/// Call `probe` immediately and then every `interval` until it yields a value,
/// `deadline` passes, or `cancel` fires.
///
/// The last probe happens at the deadline itself, so a value that appears just
/// before the deadline is still seen, and the call never overruns the deadline
/// by more than one probe.
pub async fn poll_until<T>(
    deadline: Instant,
    interval: Duration,
    cancel: &CancellationToken,
    mut probe: impl FnMut() -> Option<T>,
) -> Result<T, WaitOutcome> {
    loop {
        if let Some(value) = probe() {
            return Ok(value);
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(WaitOutcome::TimedOut);
        }

        let next = (now + interval).min(deadline);
        tokio::select! {
            _ = cancel.cancelled() => return Err(WaitOutcome::Cancelled),
            _ = sleep_until(next) => {}
        }
    }
}
