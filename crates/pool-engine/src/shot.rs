//! Shot descriptors: aim angle in degrees, power in [0, 1].

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::rng::Rng;

/// Initial cue-ball speed at full power, in table units per step.
pub const MAX_SHOT_SPEED: f64 = 15.0;

/// Aim parameters for one strike. Consumed once to set the cue ball's velocity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shot {
    /// Degrees, normalised into [0, 360). 0 points along +x, 90 along +y.
    pub angle: f64,
    /// Fraction of the maximum speed, clamped into [0, 1].
    pub power: f64,
}

impl Shot {
    pub fn new(angle: f64, power: f64) -> Self {
        Self {
            angle: normalize_degrees(angle),
            power: if power.is_finite() { power.clamp(0.0, 1.0) } else { 0.0 },
        }
    }

    /// Angle (degrees, [0, 360)) of the vector from `from` to `to`.
    /// `None` when the two points coincide.
    pub fn angle_between(from: DVec2, to: DVec2) -> Option<f64> {
        let delta = to - from;
        if delta.length_squared() < f64::EPSILON {
            return None;
        }
        Some(normalize_degrees(delta.y.atan2(delta.x).to_degrees()))
    }

    pub fn direction(&self) -> DVec2 {
        let rad = self.angle.to_radians();
        DVec2::new(rad.cos(), rad.sin())
    }

    /// Cue-ball velocity for this shot: `power × max_speed` along the aim.
    pub fn velocity(&self, max_speed: f64) -> DVec2 {
        self.direction() * (self.power * max_speed)
    }

    /// The same shot with a uniform angular error of up to `spread_degrees`.
    pub fn perturbed(&self, rng: &mut Rng, spread_degrees: f64) -> Self {
        if spread_degrees <= 0.0 {
            return *self;
        }
        let deviation = rng.range(-spread_degrees, spread_degrees);
        Self::new(self.angle + deviation, self.power)
    }
}

fn normalize_degrees(angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    let a = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negatives
    if a >= 360.0 {
        0.0
    } else {
        a
    }
}
