//! # Interaction tracking
//!
//! Whether the user is currently moving things, and for how long they have been at it. Motion
//! events flip the tracker into `moving` and push back a per-kind idle deadline. The owner arms
//! that deadline and calls [`InteractionTracker::go_idle`] when it expires.

use crate::clock::Timestamp;
use crate::config::InteractionConfig;
use std::time::Duration;

#[derive(Copy, Clone, PartialEq, Eq, Debug, strum::AsRefStr)]
pub enum MotionKind {
    /// An object dragged with a mouse or pen.
    PointerDrag,
    /// Multi-touch gesture. Only counts with more than one touch point.
    Pinch { touches: u32 },
    TouchDrag,
    /// Arrow-key nudge of the active object.
    KeyboardNudge,
}

/// What the owner should do after a motion event.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct MotionResponse {
    /// The tracker just entered `moving`; switch the surface to performance settings.
    pub entered_moving: bool,
    /// (Re-)arm the idle timer for this deadline.
    pub idle_at: Option<Timestamp>,
    /// Request a debounced layer sync.
    pub request_sync: bool,
}

#[derive(Debug)]
pub struct InteractionTracker {
    config: InteractionConfig,
    moving: bool,
    /// Motion events since entering `moving`.
    counter: u32,
    /// Touch drags in the current burst.
    touch_burst: u32,
    last_touch: Option<Timestamp>,
}
impl InteractionTracker {
    #[must_use]
    pub fn new(config: InteractionConfig) -> Self {
        Self {
            config,
            moving: false,
            counter: 0,
            touch_burst: 0,
            last_touch: None,
        }
    }
    #[must_use]
    pub fn moving(&self) -> bool {
        self.moving
    }
    #[must_use]
    pub fn counter(&self) -> u32 {
        self.counter
    }
    /// Past the continuous-movement threshold, snapshots are not worth taking until idle.
    #[must_use]
    pub fn skip_snapshots(&self) -> bool {
        self.moving && self.counter > self.config.continuous_threshold
    }
    fn idle_delay(&self, kind: MotionKind) -> Duration {
        Duration::from_millis(match kind {
            MotionKind::Pinch { .. } => self.config.pinch_idle_ms,
            MotionKind::TouchDrag => self.config.touch_idle_ms,
            MotionKind::PointerDrag | MotionKind::KeyboardNudge => self.config.pointer_idle_ms,
        })
    }
    pub fn on_motion(&mut self, kind: MotionKind, now: Timestamp) -> MotionResponse {
        let mut response = MotionResponse::default();
        let enter = match kind {
            MotionKind::Pinch { touches } if touches <= 1 => return response,
            MotionKind::TouchDrag => {
                let gap = Duration::from_millis(self.config.touch_burst_gap_ms);
                if self.last_touch.map_or(true, |last| now.since(last) > gap) {
                    self.touch_burst = 0;
                }
                self.touch_burst += 1;
                self.last_touch = Some(now);
                if self.config.touch_sync_every != 0
                    && self.touch_burst % self.config.touch_sync_every == 0
                {
                    response.request_sync = true;
                }
                self.touch_burst > self.config.touch_moving_after
            }
            _ => true,
        };
        if enter && !self.moving {
            log::debug!("{} started motion", kind.as_ref());
            self.moving = true;
            response.entered_moving = true;
        }
        if self.moving {
            self.counter = self.counter.saturating_add(1);
        }
        response.idle_at = Some(now.after(self.idle_delay(kind)));
        response
    }
    /// Leave `moving`. Returns whether the tracker was moving.
    pub fn go_idle(&mut self) -> bool {
        let was_moving = self.moving;
        if was_moving {
            log::debug!("motion settled after {} events", self.counter);
        }
        self.moving = false;
        self.counter = 0;
        self.touch_burst = 0;
        was_moving
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Axis {
    X,
    Y,
}

/// Shift-drag constraint: once the drag has left a small dead zone it follows the dominant
/// axis only, snapping along it to a grid.
#[derive(Debug)]
pub struct AxisLock {
    threshold: f64,
    grid: f64,
    initial: Option<[f64; 2]>,
    axis: Option<Axis>,
}
impl AxisLock {
    #[must_use]
    pub fn new(config: &InteractionConfig) -> Self {
        Self {
            threshold: config.axis_lock_threshold,
            grid: config.axis_lock_grid,
            initial: None,
            axis: None,
        }
    }
    #[must_use]
    pub fn axis(&self) -> Option<Axis> {
        self.axis
    }
    /// Constrain a dragged object's position. Without shift the lock is released.
    pub fn constrain(&mut self, shift: bool, position: [f64; 2]) -> [f64; 2] {
        if !shift {
            self.reset();
            return position;
        }
        let initial = *self.initial.get_or_insert(position);
        if self.axis.is_none() {
            let dx = (position[0] - initial[0]).abs();
            let dy = (position[1] - initial[1]).abs();
            if dx > self.threshold || dy > self.threshold {
                self.axis = Some(if dx >= dy { Axis::X } else { Axis::Y });
            }
        }
        let snap = |value: f64| {
            if self.grid > 0.0 {
                (value / self.grid).round() * self.grid
            } else {
                value
            }
        };
        match self.axis {
            Some(Axis::X) => [snap(position[0]), initial[1]],
            Some(Axis::Y) => [initial[0], snap(position[1])],
            None => position,
        }
    }
    pub fn reset(&mut self) {
        self.initial = None;
        self.axis = None;
    }
}

#[cfg(test)]
mod test {
    use super::{Axis, AxisLock, InteractionTracker, MotionKind};
    use crate::clock::Timestamp;
    use crate::config::InteractionConfig;

    fn tracker() -> InteractionTracker {
        InteractionTracker::new(InteractionConfig::default())
    }

    #[test]
    fn pointer_drag_enters_and_counts() {
        let mut tracker = tracker();
        let response = tracker.on_motion(MotionKind::PointerDrag, Timestamp(1_000));
        assert!(response.entered_moving);
        assert_eq!(response.idle_at, Some(Timestamp(1_300)));
        for step in 1..=5 {
            let response = tracker.on_motion(MotionKind::PointerDrag, Timestamp(1_000 + step));
            assert!(!response.entered_moving);
        }
        assert_eq!(tracker.counter(), 6);
        assert!(tracker.skip_snapshots());
        assert!(tracker.go_idle());
        assert!(!tracker.moving());
        assert_eq!(tracker.counter(), 0);
        assert!(!tracker.go_idle());
    }
    #[test]
    fn single_finger_pinch_is_ignored() {
        let mut tracker = tracker();
        let response = tracker.on_motion(MotionKind::Pinch { touches: 1 }, Timestamp(0));
        assert_eq!(response.idle_at, None);
        assert!(!tracker.moving());
        let response = tracker.on_motion(MotionKind::Pinch { touches: 2 }, Timestamp(0));
        assert!(response.entered_moving);
        assert_eq!(response.idle_at, Some(Timestamp(500)));
    }
    #[test]
    fn touch_bursts() {
        let mut tracker = tracker();
        assert!(!tracker.on_motion(MotionKind::TouchDrag, Timestamp(0)).entered_moving);
        assert!(!tracker.on_motion(MotionKind::TouchDrag, Timestamp(10)).entered_moving);
        let third = tracker.on_motion(MotionKind::TouchDrag, Timestamp(20));
        assert!(third.entered_moving);
        assert_eq!(third.idle_at, Some(Timestamp(720)));

        // A long pause starts a new burst; the 15th drag of a burst asks for a sync.
        tracker.go_idle();
        let mut syncs = Vec::new();
        for step in 0..30u64 {
            let response = tracker.on_motion(MotionKind::TouchDrag, Timestamp(5_000 + step));
            if response.request_sync {
                syncs.push(step);
            }
        }
        assert_eq!(syncs, [14, 29]);
    }
    #[test]
    fn axis_lock_follows_dominant_axis() {
        let mut lock = AxisLock::new(&InteractionConfig::default());
        assert_eq!(lock.constrain(true, [100.0, 100.0]), [100.0, 100.0]);
        // Inside the dead zone nothing is constrained.
        assert_eq!(lock.constrain(true, [103.0, 102.0]), [103.0, 102.0]);
        assert_eq!(lock.constrain(true, [117.0, 104.0]), [120.0, 100.0]);
        assert_eq!(lock.axis(), Some(Axis::X));
        assert_eq!(lock.constrain(true, [133.0, 140.0]), [140.0, 100.0]);
        assert_eq!(lock.constrain(false, [133.0, 140.0]), [133.0, 140.0]);
        assert_eq!(lock.axis(), None);
    }
}
