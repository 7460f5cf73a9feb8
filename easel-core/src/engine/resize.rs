//! Container size tracking. The host reports the sizes it can see and the detector decides
//! whether, and when, the canvas should follow.

use crate::clock::Timestamp;
use crate::config::ResizeConfig;
use std::time::Duration;

#[derive(Copy, Clone, PartialEq, Debug)]
pub enum ResizeDecision {
    Ignore,
    /// Resize to this size now.
    Apply([f64; 2]),
    /// Resize to this size after the delay, unless a later check replaces it.
    Debounce([f64; 2], Duration),
}

pub struct ResizeDetector {
    config: ResizeConfig,
    last_check: Option<Timestamp>,
    pending: Option<[f64; 2]>,
}
impl ResizeDetector {
    #[must_use]
    pub fn new(config: ResizeConfig) -> Self {
        Self {
            config,
            last_check: None,
            pending: None,
        }
    }
    /// Compare the visible sizes against the `current` canvas size.
    ///
    /// The element size wins when it is usable and larger than the container.
    pub fn check(
        &mut self,
        now: Timestamp,
        container: [f64; 2],
        element: [f64; 2],
        current: [f64; 2],
    ) -> ResizeDecision {
        let first = self.last_check.is_none();
        let throttle = Duration::from_millis(self.config.throttle_ms);
        if self.last_check.is_some_and(|last| now.since(last) < throttle) {
            return ResizeDecision::Ignore;
        }
        let pick = |element: f64, container: f64| {
            if element > self.config.min_size && element > container {
                element
            } else {
                container
            }
        };
        let target = [pick(element[0], container[0]), pick(element[1], container[1])];
        let delta = [
            (target[0] - current[0]).abs(),
            (target[1] - current[1]).abs(),
        ];
        let needs_resize = target[0] > self.config.min_size
            && target[1] > self.config.min_size
            && (delta[0] > self.config.tolerance || delta[1] > self.config.tolerance);
        if !needs_resize {
            self.last_check = Some(now);
            return ResizeDecision::Ignore;
        }
        let target = [target[0].round(), target[1].round()];
        if first || delta[0] + delta[1] > self.config.large_change {
            self.applied(now);
            ResizeDecision::Apply(target)
        } else {
            self.pending = Some(target);
            ResizeDecision::Debounce(target, Duration::from_millis(self.config.debounce_ms))
        }
    }
    /// The debounced size, if one is waiting.
    pub fn take_pending(&mut self) -> Option<[f64; 2]> {
        self.pending.take()
    }
    /// Record that a resize happened, restarting the throttle window.
    pub fn applied(&mut self, now: Timestamp) {
        self.pending = None;
        self.last_check = Some(now);
    }
}
