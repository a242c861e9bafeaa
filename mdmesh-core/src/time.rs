//! Mapping of a time value onto a slice index of the fourth dimension.

/// Maps a time value onto a step index in `[0, n_steps)`.
pub trait TimeMapper: Send + Sync + std::fmt::Debug {
    /// Step index for `time` on an axis spanning `[t_min, t_max]` in `n_steps` bins.
    fn time_step(&self, time: f64, t_min: f64, t_max: f64, n_steps: usize) -> usize;

    /// Virtual copy.
    fn clone_box(&self) -> Box<dyn TimeMapper>;
}

impl Clone for Box<dyn TimeMapper> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Linear map from axis coordinates to steps.
///
/// Times outside the axis map to step 0; the upper limit maps to the last step.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeToTimeStep;

impl TimeMapper for TimeToTimeStep {
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn time_step(&self, time: f64, t_min: f64, t_max: f64, n_steps: usize) -> usize {
        if n_steps == 0 || time.is_nan() || time < t_min || time > t_max {
            return 0;
        }
        let range = t_max - t_min;
        if range <= 0.0 {
            return 0;
        }
        let step = ((time - t_min) / range * n_steps as f64).floor() as usize;
        step.min(n_steps - 1)
    }

    fn clone_box(&self) -> Box<dyn TimeMapper> {
        Box::new(*self)
    }
}

/// The time value already is a step index.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeStepToTimeStep;

impl TimeMapper for TimeStepToTimeStep {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn time_step(&self, time: f64, _t_min: f64, _t_max: f64, n_steps: usize) -> usize {
        if n_steps == 0 || !time.is_finite() || time < 0.0 {
            return 0;
        }
        (time.floor() as usize).min(n_steps - 1)
    }

    fn clone_box(&self) -> Box<dyn TimeMapper> {
        Box::new(*self)
    }
}
