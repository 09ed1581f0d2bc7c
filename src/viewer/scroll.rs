//! Percentage scrollbar proxy and wheel accumulation.
//!
//! `ScrollContainer` mirrors the host's scrollbar as two percentages. Native
//! scrollbar callbacks become absolute scroll events, except inside the guard
//! window after a programmatic move (the echo of our own update). Wheel ticks
//! are summed and flushed as one incremental event when the debounce timer
//! fires.

use serde::{Deserialize, Serialize};
use web_time::{Duration, Instant};

use super::timer::Timer;
use crate::config::GridConfig;
use crate::types::{clamp_percent, Px};

/// Scroll request consumed by `GridController::handle_scroll`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ScrollEvent {
    /// Pixel deltas; positive values scroll forward (content moves up/left).
    #[serde(rename_all = "camelCase")]
    Incremental {
        horizontal_increment: Px,
        vertical_increment: Px,
    },
    /// Percent positions in `0..=100`; `None` leaves that axis alone.
    Absolute {
        horizontal: Option<f64>,
        vertical: Option<f64>,
    },
}

/// Who asked for a scroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScrollOrigin {
    Wheel,
    Drag,
    Programmatic,
}

impl ScrollOrigin {
    /// Whether the scrollbar proxy should follow the resulting position.
    pub fn syncs_container(self) -> bool {
        matches!(self, Self::Wheel | Self::Drag)
    }
}

#[derive(Debug, Clone)]
pub struct ScrollContainer {
    scroll_x: f64,
    scroll_y: f64,
    viewport_width: Px,
    viewport_height: Px,
    wheel_dx: Px,
    wheel_dy: Px,
    wheel_timer: Timer,
    wheel_debounce: Duration,
    programmatic_guard: Duration,
    last_programmatic: Option<Instant>,
}

impl ScrollContainer {
    pub fn new(config: &GridConfig) -> Self {
        Self {
            scroll_x: 0.0,
            scroll_y: 0.0,
            viewport_width: 0.0,
            viewport_height: 0.0,
            wheel_dx: 0.0,
            wheel_dy: 0.0,
            wheel_timer: Timer::new(),
            wheel_debounce: config.wheel_debounce(),
            programmatic_guard: config.programmatic_scroll_guard(),
            last_programmatic: None,
        }
    }

    pub fn scroll_x(&self) -> f64 {
        self.scroll_x
    }

    pub fn scroll_y(&self) -> f64 {
        self.scroll_y
    }

    pub fn set_viewport_size(&mut self, width: Px, height: Px) {
        self.viewport_width = width.max(0.0);
        self.viewport_height = height.max(0.0);
    }

    /// The viewport has been measured with a non-zero size.
    pub fn has_viewport(&self) -> bool {
        self.viewport_width > 0.0 && self.viewport_height > 0.0
    }

    /// Move the proxy programmatically. Native callbacks within the guard
    /// window that follows are treated as echoes and ignored.
    pub fn set_position(&mut self, x: Option<f64>, y: Option<f64>, now: Instant) {
        self.apply(x, y);
        self.last_programmatic = Some(now);
    }

    /// A native scrollbar callback. Returns the absolute event to apply, or
    /// `None` when it is an echo of a programmatic move or there is no viewport.
    pub fn native_scroll(
        &mut self,
        x: Option<f64>,
        y: Option<f64>,
        now: Instant,
    ) -> Option<ScrollEvent> {
        if self.in_guard_window(now) || !self.has_viewport() {
            return None;
        }
        self.apply(x, y);
        Some(self.absolute(x.is_some(), y.is_some()))
    }

    /// Scrollbar thumb drag. Applied immediately, never debounced.
    pub fn drag_to(&mut self, x: Option<f64>, y: Option<f64>) -> ScrollEvent {
        self.apply(x, y);
        self.absolute(x.is_some(), y.is_some())
    }

    /// Accumulate a wheel tick and arm the flush timer if idle.
    ///
    /// Returns `false` when the input was absorbed because the viewport has
    /// no size yet.
    pub fn wheel(&mut self, dx: Px, dy: Px, now: Instant) -> bool {
        if !self.has_viewport() {
            return false;
        }
        if dx.is_finite() {
            self.wheel_dx += dx;
        }
        if dy.is_finite() {
            self.wheel_dy += dy;
        }
        self.wheel_timer.schedule(now, self.wheel_debounce);
        true
    }

    /// Accumulated, not yet flushed wheel deltas.
    pub fn pending_wheel(&self) -> (Px, Px) {
        (self.wheel_dx, self.wheel_dy)
    }

    /// When the next `poll` can produce an event.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.wheel_timer.deadline()
    }

    /// Flush the accumulator once the debounce timer fired.
    pub fn poll(&mut self, now: Instant) -> Option<ScrollEvent> {
        if !self.wheel_timer.fire_if_due(now) {
            return None;
        }
        let event = ScrollEvent::Incremental {
            horizontal_increment: self.wheel_dx,
            vertical_increment: self.wheel_dy,
        };
        self.wheel_dx = 0.0;
        self.wheel_dy = 0.0;
        Some(event)
    }

    /// Drop the accumulator and its pending flush.
    pub fn cancel_pending(&mut self) {
        self.wheel_timer.cancel();
        self.wheel_dx = 0.0;
        self.wheel_dy = 0.0;
    }

    fn in_guard_window(&self, now: Instant) -> bool {
        self.last_programmatic
            .is_some_and(|at| now.saturating_duration_since(at) < self.programmatic_guard)
    }

    fn apply(&mut self, x: Option<f64>, y: Option<f64>) {
        if let Some(x) = x {
            self.scroll_x = clamp_percent(x);
        }
        if let Some(y) = y {
            self.scroll_y = clamp_percent(y);
        }
    }

    fn absolute(&self, horizontal: bool, vertical: bool) -> ScrollEvent {
        ScrollEvent::Absolute {
            horizontal: horizontal.then_some(self.scroll_x),
            vertical: vertical.then_some(self.scroll_y),
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;

    fn container() -> ScrollContainer {
        let mut c = ScrollContainer::new(&GridConfig::default());
        c.set_viewport_size(800.0, 600.0);
        c
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_wheel_accumulates_into_one_event() {
        let start = Instant::now();
        let mut c = container();
        assert!(c.wheel(0.0, 30.0, start));
        assert!(c.wheel(5.0, 40.0, start + ms(4)));
        assert!(c.wheel(0.0, -10.0, start + ms(8)));
        assert_eq!(c.pending_wheel(), (5.0, 60.0));

        // Armed by the first tick, not re-armed by the later ones
        assert_eq!(c.next_deadline(), Some(start + ms(10)));
        assert!(c.poll(start + ms(9)).is_none());
        assert_eq!(
            c.poll(start + ms(10)),
            Some(ScrollEvent::Incremental {
                horizontal_increment: 5.0,
                vertical_increment: 60.0
            })
        );
        assert_eq!(c.pending_wheel(), (0.0, 0.0));
        assert!(c.poll(start + ms(30)).is_none());
    }

    #[test]
    fn test_wheel_absorbed_without_viewport() {
        let start = Instant::now();
        let mut c = ScrollContainer::new(&GridConfig::default());
        assert!(!c.wheel(0.0, 100.0, start));
        assert_eq!(c.pending_wheel(), (0.0, 0.0));
        assert!(c.next_deadline().is_none());
        assert!(c.native_scroll(None, Some(50.0), start).is_none());
    }

    #[test]
    fn test_programmatic_guard_window() {
        let start = Instant::now();
        let mut c = container();
        c.set_position(Some(10.0), Some(20.0), start);
        assert_eq!((c.scroll_x(), c.scroll_y()), (10.0, 20.0));

        assert!(c.native_scroll(None, Some(21.0), start + ms(100)).is_none());
        assert_eq!(c.scroll_y(), 20.0);

        let event = c.native_scroll(None, Some(70.0), start + ms(400)).unwrap();
        assert_eq!(
            event,
            ScrollEvent::Absolute {
                horizontal: None,
                vertical: Some(70.0)
            }
        );
        assert_eq!(c.scroll_y(), 70.0);
    }

    #[test]
    fn test_drag_is_immediate_and_clamped() {
        let mut c = container();
        let event = c.drag_to(Some(150.0), None);
        assert_eq!(
            event,
            ScrollEvent::Absolute {
                horizontal: Some(100.0),
                vertical: None
            }
        );
    }

    #[test]
    fn test_cancel_pending_drops_accumulator() {
        let start = Instant::now();
        let mut c = container();
        c.wheel(0.0, 30.0, start);
        c.cancel_pending();
        assert!(c.poll(start + ms(50)).is_none());
        assert_eq!(c.pending_wheel(), (0.0, 0.0));
    }

    #[test]
    fn test_event_json_shape() {
        let event = ScrollEvent::Incremental {
            horizontal_increment: 0.0,
            vertical_increment: 12.5,
        };
        let json = serde_json::to_value(event).unwrap();
        assert_eq!(json["kind"], "incremental");
        assert_eq!(json["verticalIncrement"], 12.5);
    }
}
