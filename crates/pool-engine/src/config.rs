use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::physics::{StepParams, DEFAULT_DT, MAX_STEPS_PER_SHOT, REST_EPSILON};
use crate::shot::MAX_SHOT_SPEED;
use crate::table::{Table, TableConfig};

/// Engine configuration. Every field is optional in JSON and falls back to
/// the default below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Table geometry and surface coefficients.
    pub table: TableConfig,
    /// Physics timestep in step units (default: 1.0).
    pub dt: f64,
    /// Cue-ball speed at full power, units per step (default: 15).
    pub max_shot_speed: f64,
    /// Speed below which a velocity component snaps to zero (default: 0.01).
    pub rest_epsilon: f64,
    /// Steps after which a shot is force-settled (default: 10 000).
    pub max_steps_per_shot: u32,
    /// Wall-clock seconds per physics step (default: 1/60).
    pub frame_dt: f64,
    /// Maximum random aim error per shot, in degrees (default: 0).
    pub aim_noise_degrees: f64,
    /// Seed for the aim-noise generator (default: 42).
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            table: TableConfig::default(),
            dt: DEFAULT_DT,
            max_shot_speed: MAX_SHOT_SPEED,
            rest_epsilon: REST_EPSILON,
            max_steps_per_shot: MAX_STEPS_PER_SHOT,
            frame_dt: 1.0 / 60.0,
            aim_noise_degrees: 0.0,
            seed: 42,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.table.validate()?;
        for (name, value) in [
            ("dt", self.dt),
            ("max shot speed", self.max_shot_speed),
            ("rest epsilon", self.rest_epsilon),
            ("frame dt", self.frame_dt),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        if self.max_steps_per_shot == 0 {
            return Err(ConfigError::NonPositive {
                name: "max steps per shot",
                value: 0.0,
            });
        }
        if !(self.aim_noise_degrees >= 0.0 && self.aim_noise_degrees.is_finite()) {
            return Err(ConfigError::NonPositive {
                name: "aim noise",
                value: self.aim_noise_degrees,
            });
        }
        Ok(())
    }

    pub fn table(&self) -> Result<Table, ConfigError> {
        Table::from_config(&self.table)
    }

    pub fn step_params(&self) -> StepParams {
        StepParams {
            dt: self.dt,
            rest_epsilon: self.rest_epsilon,
            max_shot_speed: self.max_shot_speed,
            max_steps_per_shot: self.max_steps_per_shot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.step_params(), StepParams::default());
        let table = config.table().unwrap();
        assert_eq!(table.width, 800.0);
        assert_eq!(table.pocket_radius, 25.0);
    }

    #[test]
    fn partial_json_takes_defaults() {
        let config = EngineConfig::from_json(r#"{ "table": { "width": 1000 }, "seed": 7 }"#).unwrap();
        assert_eq!(config.table.width, 1000.0);
        assert_eq!(config.table.height, 400.0);
        assert_eq!(config.seed, 7);
        assert_eq!(config.max_shot_speed, 15.0);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            EngineConfig::from_json(r#"{ "table": { "friction": 1.5 } }"#),
            Err(ConfigError::Friction(_))
        ));
        assert!(matches!(
            EngineConfig::from_json(r#"{ "restEpsilon": 0 }"#),
            Err(ConfigError::NonPositive { name: "rest epsilon", .. })
        ));
        assert!(matches!(
            EngineConfig::from_json(r#"{ "maxStepsPerShot": 0 }"#),
            Err(ConfigError::NonPositive { .. })
        ));
        assert!(matches!(EngineConfig::from_json("{ not json"), Err(ConfigError::Parse(_))));
    }
}
