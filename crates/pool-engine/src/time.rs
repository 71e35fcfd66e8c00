/// Fixed timestep accumulator.
/// Turns variable frame time into a whole number of physics steps so a shot
/// plays out identically regardless of display refresh rate.
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    /// Wall-clock seconds represented by one physics step.
    step_seconds: f64,
    /// Accumulated time from variable frame deltas.
    accumulator: f64,
}

/// Maximum steps returned for a single frame (spiral-of-death guard).
pub const MAX_STEPS_PER_FRAME: u32 = 10;

impl FixedTimestep {
    pub fn new(step_seconds: f64) -> Self {
        Self {
            step_seconds,
            accumulator: 0.0,
        }
    }

    /// Add frame time to the accumulator. Returns the number of fixed steps to run.
    pub fn accumulate(&mut self, frame_dt: f64) -> u32 {
        if !(frame_dt > 0.0) {
            return 0;
        }
        self.accumulator += frame_dt;
        self.accumulator = self
            .accumulator
            .min(self.step_seconds * MAX_STEPS_PER_FRAME as f64);
        let steps = (self.accumulator / self.step_seconds) as u32;
        self.accumulator -= steps as f64 * self.step_seconds;
        steps
    }

    /// Interpolation alpha for rendering between steps (0.0 to 1.0).
    pub fn alpha(&self) -> f64 {
        self.accumulator / self.step_seconds
    }

    pub fn step_seconds(&self) -> f64 {
        self.step_seconds
    }

    /// Drop leftover time, e.g. when a shot settles.
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}
