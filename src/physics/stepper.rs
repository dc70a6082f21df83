/// Fixed-timestep accumulator.
///
/// Wall-clock time is accumulated and consumed in `fixed_dt` slices, at most
/// `max_sub_steps` per call. Whatever exceeds that budget is dropped instead of
/// carried over, so a long hitch produces a short stretch of under-simulation
/// rather than a burst of catch-up steps.
#[derive(Debug, Clone)]
pub struct FixedStepper {
    fixed_dt: f32,
    max_sub_steps: u32,
    accumulator: f32,
}

impl FixedStepper {
    pub fn new(fixed_dt: f32, max_sub_steps: u32) -> Self {
        Self {
            fixed_dt,
            max_sub_steps,
            accumulator: 0.0,
        }
    }

    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    pub fn max_sub_steps(&self) -> u32 {
        self.max_sub_steps
    }

    /// Leftover time that did not fill a whole step yet.
    pub fn accumulated(&self) -> f32 {
        self.accumulator
    }

    /// Change step size or budget; the accumulator survives if the step is unchanged.
    pub fn configure(&mut self, fixed_dt: f32, max_sub_steps: u32) {
        if fixed_dt != self.fixed_dt {
            self.fixed_dt = fixed_dt;
            self.accumulator = 0.0;
        }
        self.max_sub_steps = max_sub_steps;
    }

    /// Feed elapsed wall-clock seconds, returns how many fixed steps to run.
    pub fn advance(&mut self, wall_dt: f32) -> u32 {
        let wall_dt = if wall_dt.is_finite() { wall_dt.max(0.0) } else { 0.0 };
        self.accumulator += wall_dt;

        let mut steps = 0;
        while self.accumulator >= self.fixed_dt && steps < self.max_sub_steps {
            self.accumulator -= self.fixed_dt;
            steps += 1;
        }

        // budget exhausted: drop everything but the partial step
        self.accumulator %= self.fixed_dt;
        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn one_frame_one_step() {
        let mut s = FixedStepper::new(DT, 3);
        assert_eq!(s.advance(DT), 1);
    }

    #[test]
    fn partial_frames_accumulate() {
        let mut s = FixedStepper::new(DT, 3);
        assert_eq!(s.advance(DT * 0.5), 0);
        assert_eq!(s.advance(DT * 0.5), 1);
        assert!(s.accumulated() < DT);
    }

    #[test]
    fn hitch_is_capped_and_excess_dropped() {
        let mut s = FixedStepper::new(DT, 3);
        assert_eq!(s.advance(1.0), 3);
        assert!(s.accumulated() < DT);
        // the dropped second never comes back
        assert_eq!(s.advance(0.0), 0);
    }

    #[test]
    fn negative_and_nan_deltas_are_ignored() {
        let mut s = FixedStepper::new(DT, 3);
        assert_eq!(s.advance(-1.0), 0);
        assert_eq!(s.advance(f32::NAN), 0);
        assert_eq!(s.accumulated(), 0.0);
    }

    #[test]
    fn configure_keeps_accumulator_for_same_step() {
        let mut s = FixedStepper::new(DT, 3);
        s.advance(DT * 0.5);
        s.configure(DT, 5);
        assert_eq!(s.max_sub_steps(), 5);
        assert!(s.accumulated() > 0.0);
        s.configure(DT * 2.0, 5);
        assert_eq!(s.accumulated(), 0.0);
    }
}
