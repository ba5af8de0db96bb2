//! Fixed-rate update timer driven by the UI frame loop

use std::time::{Duration, Instant};

/// Fires at most once per `interval`
#[derive(Debug, Clone)]
pub struct UpdateTimer {
    interval: Duration,
    next: Instant,
}

impl UpdateTimer {
    /// Timer ticking `fps` times per second, first tick due immediately
    pub fn from_fps(fps: u32, now: Instant) -> Self {
        Self {
            interval: interval_for(fps),
            next: now,
        }
    }

    /// Restart the schedule so the next tick is due at `now`
    pub fn reset(&mut self, now: Instant) {
        self.next = now;
    }

    /// Report whether a tick is due, consuming at most one tick.
    ///
    /// A late frame does not cause a burst of catch-up ticks.
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.next {
            return false;
        }
        self.next += self.interval;
        if self.next <= now {
            self.next = now + self.interval;
        }
        true
    }

    /// Time left until the next tick
    pub fn remaining(&self, now: Instant) -> Duration {
        self.next.saturating_duration_since(now)
    }
}

fn interval_for(fps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / fps.max(1) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_from_fps() {
        let start = Instant::now();
        let mut timer = UpdateTimer::from_fps(30, start);
        assert!(timer.poll(start));
        assert_eq!(timer.remaining(start).as_millis(), 33);

        let mut timer = UpdateTimer::from_fps(0, start);
        assert!(timer.poll(start));
        assert_eq!(timer.remaining(start), Duration::from_secs(1));
    }

    #[test]
    fn test_poll_fires_once_per_interval() {
        let start = Instant::now();
        let mut timer = UpdateTimer::from_fps(10, start);

        assert!(timer.poll(start));
        assert!(!timer.poll(start + Duration::from_millis(50)));
        assert!(timer.poll(start + Duration::from_millis(100)));
        assert!(!timer.poll(start + Duration::from_millis(150)));
    }

    #[test]
    fn test_poll_does_not_burst_after_stall() {
        let start = Instant::now();
        let mut timer = UpdateTimer::from_fps(10, start);
        assert!(timer.poll(start));

        let late = start + Duration::from_secs(2);
        assert!(timer.poll(late));
        assert!(!timer.poll(late));
        assert_eq!(timer.remaining(late), Duration::from_millis(100));
    }

    #[test]
    fn test_reset_makes_tick_due() {
        let start = Instant::now();
        let mut timer = UpdateTimer::from_fps(10, start);
        assert!(timer.poll(start));

        let soon = start + Duration::from_millis(10);
        assert!(!timer.poll(soon));
        timer.reset(soon);
        assert!(timer.poll(soon));
    }
}
