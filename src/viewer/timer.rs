//! One-shot deadline timer driven by the host clock.
//!
//! The engine never sleeps or spawns; the host passes the current time to
//! `fire_if_due` (through `GridController::tick`) and the timer reports
//! whether its deadline has passed.

use web_time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timer {
    deadline: Option<Instant>,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the timer unless it is already pending. Returns whether it was armed.
    pub fn schedule(&mut self, now: Instant, delay: Duration) -> bool {
        if self.is_pending() {
            return false;
        }
        self.deadline = Some(now + delay);
        true
    }

    /// Returns whether a deadline was pending.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Disarm and return `true` if the deadline has passed.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const MS_10: Duration = Duration::from_millis(10);

    #[test]
    fn test_fires_once_after_deadline() {
        let start = Instant::now();
        let mut timer = Timer::new();
        assert!(timer.schedule(start, MS_10));
        assert!(!timer.fire_if_due(start + Duration::from_millis(5)));
        assert!(timer.fire_if_due(start + MS_10));
        assert!(!timer.is_pending());
        assert!(!timer.fire_if_due(start + Duration::from_millis(50)));
    }

    #[test]
    fn test_schedule_does_not_extend_pending() {
        let start = Instant::now();
        let mut timer = Timer::new();
        timer.schedule(start, MS_10);
        assert!(!timer.schedule(start + Duration::from_millis(8), MS_10));
        assert_eq!(timer.deadline(), Some(start + MS_10));
    }

    #[test]
    fn test_cancel_disarms() {
        let start = Instant::now();
        let mut timer = Timer::new();
        timer.schedule(start, MS_10);
        assert!(timer.cancel());
        assert!(!timer.is_pending());
        assert!(!timer.cancel());
        assert!(!timer.fire_if_due(start + Duration::from_secs(1)));
    }
}
