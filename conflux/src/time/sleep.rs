use crate::awaiter::WaitUntil;

use std::time::{Duration, Instant};

/// Returns an awaiter that completes once `duration` has elapsed.
///
/// The deadline is fixed when this function is called; the timer itself is
/// registered with the ambient executor's reactor on first poll. Polled
/// outside of any executor context, it resolves to
/// [`Error::NoContext`](crate::Error::NoContext) unless the deadline has
/// already passed.
///
/// # Examples
///
/// ```rust,ignore
/// use std::time::Duration;
///
/// conflux::time::sleep(Duration::from_millis(10)).await?;
/// ```
pub fn sleep(duration: Duration) -> WaitUntil {
    WaitUntil::after(duration, None)
}

/// Returns an awaiter that completes at or after `deadline`.
pub fn sleep_until(deadline: Instant) -> WaitUntil {
    WaitUntil::new(deadline, None)
}
