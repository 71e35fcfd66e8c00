//! Static table geometry. Immutable for the lifetime of a game.

use std::fmt;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::balls::{rack, Ball};
use crate::error::ConfigError;

pub const DEFAULT_WIDTH: f64 = 800.0;
pub const DEFAULT_HEIGHT: f64 = 400.0;
pub const BALL_RADIUS: f64 = 14.0;
pub const POCKET_RADIUS: f64 = 25.0;

// Pocket centres, measured in from the rails
const CORNER_POCKET_INSET: f64 = 25.0;
const SIDE_POCKET_INSET: f64 = 20.0;

/// Velocity multiplier applied every step (felt drag).
pub const FRICTION: f64 = 0.985;
/// Speed retained on a cushion bounce.
pub const CUSHION_RESTITUTION: f64 = 0.8;
/// Restitution for ball-to-ball impacts.
pub const BALL_RESTITUTION: f64 = 0.95;

/// The six pockets, in the order the advisor scans them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Pocket {
    TopLeft,
    TopMiddle,
    TopRight,
    BottomLeft,
    BottomMiddle,
    BottomRight,
}

impl Pocket {
    pub const ALL: [Pocket; 6] = [
        Pocket::TopLeft,
        Pocket::TopMiddle,
        Pocket::TopRight,
        Pocket::BottomLeft,
        Pocket::BottomMiddle,
        Pocket::BottomRight,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Pocket::TopLeft => "top left",
            Pocket::TopMiddle => "top middle",
            Pocket::TopRight => "top right",
            Pocket::BottomLeft => "bottom left",
            Pocket::BottomMiddle => "bottom middle",
            Pocket::BottomRight => "bottom right",
        }
    }
}

impl fmt::Display for Pocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Serializable table description. Missing fields fall back to the
/// engine constants shared with callers for coordinate scaling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableConfig {
    pub width: f64,
    pub height: f64,
    pub ball_radius: f64,
    pub pocket_radius: f64,
    pub friction: f64,
    pub cushion_restitution: f64,
    pub ball_restitution: f64,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            ball_radius: BALL_RADIUS,
            pocket_radius: POCKET_RADIUS,
            friction: FRICTION,
            cushion_restitution: CUSHION_RESTITUTION,
            ball_restitution: BALL_RESTITUTION,
        }
    }
}

impl TableConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.width > 0.0 && self.height > 0.0) {
            return Err(ConfigError::Dimensions { width: self.width, height: self.height });
        }
        if !(self.ball_radius > 0.0) {
            return Err(ConfigError::NonPositive { name: "ball radius", value: self.ball_radius });
        }
        if !(self.pocket_radius > 0.0) {
            return Err(ConfigError::NonPositive { name: "pocket radius", value: self.pocket_radius });
        }
        if self.width <= self.ball_radius * 2.0 || self.height <= self.ball_radius * 2.0 {
            return Err(ConfigError::TooSmall {
                width: self.width,
                height: self.height,
                radius: self.ball_radius,
            });
        }
        if !(self.friction > 0.0 && self.friction < 1.0) {
            return Err(ConfigError::Friction(self.friction));
        }
        for (name, value) in [
            ("cushion", self.cushion_restitution),
            ("ball", self.ball_restitution),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::Restitution { name, value });
            }
        }
        Ok(())
    }
}

/// Table geometry and surface coefficients.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub width: f64,
    pub height: f64,
    pub ball_radius: f64,
    pub pocket_radius: f64,
    pub pockets: [DVec2; 6],
    pub friction: f64,
    pub restitution: f64,
    pub ball_restitution: f64,
}

impl Table {
    /// The default 800x400 table.
    pub fn standard() -> Self {
        Self::build(&TableConfig::default())
    }

    pub fn from_config(config: &TableConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: &TableConfig) -> Self {
        let (w, h) = (config.width, config.height);
        Self {
            width: w,
            height: h,
            ball_radius: config.ball_radius,
            pocket_radius: config.pocket_radius,
            pockets: [
                DVec2::new(CORNER_POCKET_INSET, CORNER_POCKET_INSET),
                DVec2::new(w / 2.0, SIDE_POCKET_INSET),
                DVec2::new(w - CORNER_POCKET_INSET, CORNER_POCKET_INSET),
                DVec2::new(CORNER_POCKET_INSET, h - CORNER_POCKET_INSET),
                DVec2::new(w / 2.0, h - SIDE_POCKET_INSET),
                DVec2::new(w - CORNER_POCKET_INSET, h - CORNER_POCKET_INSET),
            ],
            friction: config.friction,
            restitution: config.cushion_restitution,
            ball_restitution: config.ball_restitution,
        }
    }

    pub fn pocket_pos(&self, pocket: Pocket) -> DVec2 {
        self.pockets[pocket.index()]
    }

    /// Pockets paired with their centres.
    pub fn pockets(&self) -> impl Iterator<Item = (Pocket, DVec2)> + '_ {
        Pocket::ALL.iter().map(move |&p| (p, self.pockets[p.index()]))
    }

    /// The pocket whose capture radius contains `pos`, if any.
    pub fn pocket_at(&self, pos: DVec2) -> Option<Pocket> {
        self.pockets()
            .find(|(_, centre)| centre.distance(pos) < self.pocket_radius)
            .map(|(p, _)| p)
    }

    pub fn nearest_pocket(&self, pos: DVec2) -> Pocket {
        let mut best = Pocket::TopLeft;
        let mut best_dist = f64::INFINITY;
        for (pocket, centre) in self.pockets() {
            let d = centre.distance_squared(pos);
            if d < best_dist {
                best = pocket;
                best_dist = d;
            }
        }
        best
    }

    /// Lowest and highest centre coordinates a ball can occupy.
    pub fn playable_bounds(&self) -> (DVec2, DVec2) {
        let r = self.ball_radius;
        (DVec2::splat(r), DVec2::new(self.width - r, self.height - r))
    }

    pub fn is_playable(&self, pos: DVec2) -> bool {
        let (min, max) = self.playable_bounds();
        pos.cmpge(min).all() && pos.cmple(max).all()
    }

    /// Cue ball starting spot (quarter length, centre line).
    pub fn head_spot(&self) -> DVec2 {
        DVec2::new(self.width * 0.25, self.height / 2.0)
    }

    /// Rack apex position (three-quarter length, centre line).
    pub fn foot_spot(&self) -> DVec2 {
        DVec2::new(self.width * 0.75, self.height / 2.0)
    }

    /// Standard starting layout for this table.
    pub fn default_layout(&self) -> Vec<Ball> {
        rack(self.head_spot(), self.foot_spot(), self.ball_radius)
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_pockets() {
        let table = Table::standard();
        assert_eq!(table.pocket_pos(Pocket::TopRight), DVec2::new(775.0, 25.0));
        assert_eq!(table.pocket_pos(Pocket::TopMiddle), DVec2::new(400.0, 20.0));
        assert_eq!(table.pocket_pos(Pocket::BottomLeft), DVec2::new(25.0, 375.0));
        assert_eq!(table.pockets().count(), 6);
    }

    #[test]
    fn pocket_capture_radius() {
        let table = Table::standard();
        assert_eq!(table.pocket_at(DVec2::new(770.0, 30.0)), Some(Pocket::TopRight));
        assert_eq!(table.pocket_at(DVec2::new(400.0, 200.0)), None);
        assert_eq!(table.nearest_pocket(DVec2::new(600.0, 150.0)), Pocket::TopRight);
    }

    #[test]
    fn config_missing_fields_use_defaults() {
        let config: TableConfig = serde_json::from_str(r#"{ "width": 1000.0 }"#).unwrap();
        assert_eq!(config.width, 1000.0);
        assert_eq!(config.height, DEFAULT_HEIGHT);
        assert_eq!(config.ball_radius, BALL_RADIUS);
        let table = Table::from_config(&config).unwrap();
        assert_eq!(table.pocket_pos(Pocket::BottomRight), DVec2::new(975.0, 375.0));
    }

    #[test]
    fn config_rejects_bad_coefficients() {
        let bad_friction = TableConfig { friction: 1.0, ..TableConfig::default() };
        assert!(matches!(bad_friction.validate(), Err(ConfigError::Friction(_))));

        let bad_restitution = TableConfig { cushion_restitution: 1.5, ..TableConfig::default() };
        assert!(matches!(
            bad_restitution.validate(),
            Err(ConfigError::Restitution { name: "cushion", .. })
        ));

        let tiny = TableConfig { width: 20.0, ..TableConfig::default() };
        assert!(matches!(tiny.validate(), Err(ConfigError::TooSmall { .. })));
    }

    #[test]
    fn default_layout_is_playable() {
        let table = Table::standard();
        let balls = table.default_layout();
        assert_eq!(balls.len(), 16);
        assert!(balls.iter().all(|b| table.is_playable(b.pos)));
        assert!(balls.iter().all(|b| table.pocket_at(b.pos).is_none()));
    }
}
