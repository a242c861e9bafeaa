//! Fractional progress reporting for long builds.

/// Receives progress fractions in `[0, 1]`.
pub trait ProgressAction {
    /// Called with the overall fraction completed.
    fn event_raised(&mut self, fraction: f64);
}

/// Discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreProgress;

impl ProgressAction for IgnoreProgress {
    fn event_raised(&mut self, _fraction: f64) {}
}

/// Maps a phase's local `[0, 1]` progress into `[start, end]` of the overall range.
pub struct ProgressPhase<'a> {
    inner: &'a mut dyn ProgressAction,
    start: f64,
    end: f64,
}

impl<'a> ProgressPhase<'a> {
    /// Creates a phase covering `[start, end]`.
    pub fn new(inner: &'a mut dyn ProgressAction, start: f64, end: f64) -> Self {
        Self { inner, start, end }
    }

    /// Reports `done` out of `total` steps, at most about a hundred times per phase.
    #[allow(clippy::cast_precision_loss)]
    pub fn step(&mut self, done: usize, total: usize) {
        let stride = (total / 100).max(1);
        if total == 0 || done % stride == 0 || done == total {
            let local = if total == 0 {
                1.0
            } else {
                done as f64 / total as f64
            };
            self.event_raised(local);
        }
    }
}

impl ProgressAction for ProgressPhase<'_> {
    fn event_raised(&mut self, fraction: f64) {
        let local = fraction.clamp(0.0, 1.0);
        self.inner
            .event_raised(self.start + local * (self.end - self.start));
    }
}
