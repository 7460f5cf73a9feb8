//! # Time
//!
//! The engine never sleeps. Every throttle and debounce decision is made against a [`Clock`], and
//! pending work is expressed as named deadlines in [`Timers`] that the host polls.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Milliseconds since the owning clock's epoch.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Timestamp(pub u64);
impl Timestamp {
    #[must_use]
    pub fn millis(self) -> u64 {
        self.0
    }
    /// Time elapsed since `earlier`, or zero if `earlier` is in the future.
    #[must_use]
    pub fn since(self, earlier: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
    #[must_use]
    pub fn after(self, delay: Duration) -> Timestamp {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        Timestamp(self.0.saturating_add(millis))
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock, counting from construction.
pub struct SystemClock {
    epoch: std::time::Instant,
}
impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: std::time::Instant::now(),
        }
    }
}
impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}
impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let millis = u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX);
        Timestamp(millis)
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}
impl ManualClock {
    #[must_use]
    pub fn starting_at(millis: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(millis)),
        }
    }
    pub fn advance(&self, by: Duration) {
        let millis = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.now.fetch_add(millis, Ordering::Relaxed);
    }
    pub fn set(&self, to: Timestamp) {
        self.now.store(to.0, Ordering::Relaxed);
    }
}
impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.now.load(Ordering::Relaxed))
    }
}

/// One deadline per timer kind. Arming a kind that is already armed replaces its deadline,
/// which is exactly debounce semantics.
#[derive(Debug)]
pub struct Timers<K> {
    deadlines: smallvec::SmallVec<[(K, Timestamp); 4]>,
}
impl<K> Default for Timers<K> {
    fn default() -> Self {
        Self {
            deadlines: smallvec::SmallVec::new(),
        }
    }
}
impl<K: Copy + Eq + std::fmt::Debug> Timers<K> {
    pub fn arm(&mut self, kind: K, at: Timestamp) {
        log::trace!("arming {kind:?} for {}ms", at.millis());
        match self.deadlines.iter_mut().find(|(k, _)| *k == kind) {
            Some((_, deadline)) => *deadline = at,
            None => self.deadlines.push((kind, at)),
        }
    }
    /// Returns true if the timer was armed.
    pub fn cancel(&mut self, kind: K) -> bool {
        let before = self.deadlines.len();
        self.deadlines.retain(|(k, _)| *k != kind);
        before != self.deadlines.len()
    }
    #[must_use]
    pub fn is_armed(&self, kind: K) -> bool {
        self.deadlines.iter().any(|(k, _)| *k == kind)
    }
    #[must_use]
    pub fn deadline(&self, kind: K) -> Option<Timestamp> {
        self.deadlines
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, at)| *at)
    }
    #[must_use]
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.deadlines.iter().map(|(_, at)| *at).min()
    }
    /// Disarm and return every timer due at `now`, earliest first.
    pub fn take_expired(&mut self, now: Timestamp) -> smallvec::SmallVec<[K; 4]> {
        let mut expired: smallvec::SmallVec<[(K, Timestamp); 4]> = self
            .deadlines
            .iter()
            .copied()
            .filter(|(_, at)| *at <= now)
            .collect();
        expired.sort_by_key(|(_, at)| *at);
        self.deadlines.retain(|(_, at)| *at > now);
        expired.into_iter().map(|(kind, _)| kind).collect()
    }
}
