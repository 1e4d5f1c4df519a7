use std::time::{Duration, Instant};

/// A fixed-period tick source. The caller polls it with the current time
/// instead of handing it a callback, so a tick handler always finishes
/// before the next tick can fire.
pub struct Ticker {
    period: Duration,
    next_due: Instant,
}

impl Ticker {
    pub fn new(period: Duration, now: Instant) -> Self {
        Ticker { period, next_due: now + period }
    }

    /// Fires at most once per call. A poll that has fallen more than a whole
    /// period behind re-anchors on `now` rather than firing a burst.
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }

        self.next_due += self.period;
        if self.next_due <= now {
            self.next_due = now + self.period;
        }

        true
    }

    pub fn reset(&mut self, now: Instant) {
        self.next_due = now + self.period;
    }
}
