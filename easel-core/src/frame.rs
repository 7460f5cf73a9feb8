//! # Frame scheduling
//!
//! Render work is queued as jobs and run in animation-frame-aligned batches. At most one cycle is in
//! flight: the first submission while idle starts one (the host should then deliver animation
//! frames), later submissions only enqueue. Each frame runs a bounded batch, smaller while the
//! user is moving something, and frames that arrive too soon after the previous batch during
//! motion are skipped. The cycle ends once a batch leaves the queue empty.

use crate::clock::Timestamp;
use crate::config::FrameConfig;

/// A unit of render work, run with mutable access to its context `C`.
pub type Job<C> = Box<dyn FnOnce(&mut C, Timestamp) -> anyhow::Result<()> + Send>;

/// Largest batch that stays inline.
pub type Batch<J> = smallvec::SmallVec<[J; 5]>;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Priority {
    /// Runs after everything already queued.
    Normal,
    /// Runs before everything already queued.
    High,
}

/// What to do with the current animation frame.
pub enum FramePass<J> {
    /// Too soon after the previous batch. Keep asking for frames.
    Deferred,
    Run(Batch<J>),
}

pub struct FrameScheduler<J> {
    config: FrameConfig,
    queue: std::collections::VecDeque<J>,
    running: bool,
    last_pass: Option<Timestamp>,
}
impl<J> FrameScheduler<J> {
    #[must_use]
    pub fn new(config: FrameConfig) -> Self {
        Self {
            config,
            queue: std::collections::VecDeque::new(),
            running: false,
            last_pass: None,
        }
    }
    /// Enqueue a job. Returns true if this started a new cycle, in which case an animation frame
    /// should be requested.
    pub fn submit(&mut self, job: J, priority: Priority) -> bool {
        match priority {
            Priority::High => self.queue.push_front(job),
            Priority::Normal => self.queue.push_back(job),
        }
        if self.running {
            false
        } else {
            log::trace!("frame cycle started");
            self.running = true;
            true
        }
    }
    /// Whether a cycle is in flight and wants animation frames.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
    /// Take the batch for this frame. Every [`FramePass::Run`] must be followed by
    /// [`Self::end_frame`] once the batch has been run.
    pub fn begin_frame(&mut self, now: Timestamp, moving: bool) -> FramePass<J> {
        if !self.running {
            return FramePass::Run(Batch::new());
        }
        if moving {
            if let Some(last) = self.last_pass {
                if now.since(last) < self.config.moving_interval() {
                    log::trace!("frame deferred, {}ms since last pass", now.since(last).as_millis());
                    return FramePass::Deferred;
                }
            }
        }
        self.last_pass = Some(now);
        let take = self.config.jobs_per_frame(moving).min(self.queue.len());
        FramePass::Run(self.queue.drain(..take).collect())
    }
    /// Finish the frame. Returns whether the cycle continues.
    pub fn end_frame(&mut self) -> bool {
        if self.queue.is_empty() {
            if self.running {
                log::trace!("frame cycle finished");
            }
            self.running = false;
        }
        self.running
    }
    /// Drop every queued job and end the cycle.
    pub fn clear(&mut self) {
        if !self.queue.is_empty() {
            log::debug!("dropping {} queued render jobs", self.queue.len());
        }
        self.queue.clear();
        self.running = false;
    }
}

/// Run jobs in order against `context`. A failing job is logged and does not stop the rest.
pub fn run_batch<C>(context: &mut C, now: Timestamp, batch: impl IntoIterator<Item = Job<C>>) {
    for job in batch {
        if let Err(e) = job(context, now) {
            log::warn!("render job failed: {e:#}");
        }
    }
}

#[cfg(test)]
mod test {
    use super::{run_batch, FramePass, FrameScheduler, Job, Priority};
    use crate::clock::Timestamp;
    use crate::config::FrameConfig;

    fn scheduler() -> FrameScheduler<u32> {
        FrameScheduler::new(FrameConfig::default())
    }
    fn run(pass: FramePass<u32>) -> Vec<u32> {
        match pass {
            FramePass::Run(batch) => batch.into_vec(),
            FramePass::Deferred => panic!("unexpected deferral"),
        }
    }

    #[test]
    fn priority_jobs_jump_the_queue() {
        let mut frames = scheduler();
        assert!(frames.submit(1, Priority::Normal));
        assert!(!frames.submit(2, Priority::Normal));
        assert!(!frames.submit(3, Priority::High));
        assert_eq!(run(frames.begin_frame(Timestamp(0), false)), [3, 1, 2]);
        assert!(!frames.end_frame());
        assert!(!frames.is_running());
        // Idle again, so the next submission starts a new cycle.
        assert!(frames.submit(4, Priority::Normal));
    }
    #[test]
    fn per_frame_budget() {
        let mut frames = scheduler();
        for job in 0..7 {
            frames.submit(job, Priority::Normal);
        }
        assert_eq!(run(frames.begin_frame(Timestamp(0), false)).len(), 5);
        assert!(frames.end_frame());
        assert_eq!(run(frames.begin_frame(Timestamp(100), true)), [5, 6]);
        assert!(!frames.end_frame());

        for job in 0..3 {
            frames.submit(job, Priority::Normal);
        }
        assert_eq!(run(frames.begin_frame(Timestamp(1_000), true)).len(), 2);
        assert!(frames.end_frame());
    }
    #[test]
    fn moving_frames_respect_interval() {
        let mut frames = scheduler();
        for job in 0..6 {
            frames.submit(job, Priority::Normal);
        }
        assert_eq!(run(frames.begin_frame(Timestamp(0), true)).len(), 2);
        assert!(frames.end_frame());
        assert!(matches!(
            frames.begin_frame(Timestamp(16), true),
            FramePass::Deferred
        ));
        assert!(frames.is_running());
        assert_eq!(run(frames.begin_frame(Timestamp(67), true)).len(), 2);
        frames.end_frame();
        // No cap once idle.
        assert_eq!(run(frames.begin_frame(Timestamp(70), false)).len(), 2);
        assert!(!frames.end_frame());
    }
    #[test]
    fn failing_job_does_not_stop_batch() {
        let mut log: Vec<u32> = Vec::new();
        let jobs: Vec<Job<Vec<u32>>> = vec![
            Box::new(|log: &mut Vec<u32>, _: Timestamp| -> anyhow::Result<()> {
                log.push(1);
                Ok(())
            }),
            Box::new(|_: &mut Vec<u32>, _: Timestamp| -> anyhow::Result<()> {
                anyhow::bail!("boom")
            }),
            Box::new(|log: &mut Vec<u32>, now: Timestamp| -> anyhow::Result<()> {
                log.push(u32::try_from(now.millis())?);
                Ok(())
            }),
        ];
        run_batch(&mut log, Timestamp(3), jobs);
        assert_eq!(log, [1, 3]);
    }
    #[test]
    fn clear_ends_cycle() {
        let mut frames = scheduler();
        frames.submit(1, Priority::Normal);
        frames.clear();
        assert!(!frames.is_running());
        assert_eq!(frames.pending(), 0);
    }
}
