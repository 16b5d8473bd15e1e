//! Monotonic time source for the refresh-while-waiting loops.

use embassy_time::Instant;

/// A monotonic clock.
///
/// `now` must never go backwards. [`Hub75::sleep`](crate::Hub75::sleep) and
/// the row brightness compensation spin on it.
pub trait Clock {
    /// Current time.
    fn now(&self) -> Instant;
}

/// Clock backed by the platform's `embassy-time` driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use embassy_time::Duration;

    use super::*;

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock;
        let start = clock.now();
        let mut last = start;
        while clock.now() < start + Duration::from_millis(2) {
            let now = clock.now();
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn test_clock_by_reference() {
        fn elapsed<C: Clock>(clock: C, since: Instant) -> Duration {
            clock.now() - since
        }
        let clock = SystemClock;
        let start = clock.now();
        assert!(elapsed(&clock, start) >= Duration::from_ticks(0));
    }
}
