//! Ball data: colours, groups, trajectory trails and the reds-and-yellows rack.

use std::fmt;
use std::str::FromStr;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::error::BallError;

/// Number of recent positions kept per ball for trajectory drawing.
pub const TRAIL_CAPACITY: usize = 20;

/// Ball colour as detected on the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BallColor {
    White,
    Black,
    Red,
    Yellow,
}

impl BallColor {
    pub fn as_str(self) -> &'static str {
        match self {
            BallColor::White => "white",
            BallColor::Black => "black",
            BallColor::Red => "red",
            BallColor::Yellow => "yellow",
        }
    }

    /// The group this colour belongs to, if it is a group colour.
    pub fn group(self) -> Option<BallGroup> {
        match self {
            BallColor::Red => Some(BallGroup::Red),
            BallColor::Yellow => Some(BallGroup::Yellow),
            BallColor::White | BallColor::Black => None,
        }
    }
}

impl fmt::Display for BallColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BallColor {
    type Err = BallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "white" => Ok(BallColor::White),
            "black" => Ok(BallColor::Black),
            "red" => Ok(BallColor::Red),
            "yellow" => Ok(BallColor::Yellow),
            _ => Err(BallError::UnknownColor(s.to_string())),
        }
    }
}

/// One of the two object-ball groups a player can own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BallGroup {
    Red,
    Yellow,
}

impl BallGroup {
    pub fn color(self) -> BallColor {
        match self {
            BallGroup::Red => BallColor::Red,
            BallGroup::Yellow => BallColor::Yellow,
        }
    }

    pub fn other(self) -> BallGroup {
        match self {
            BallGroup::Red => BallGroup::Yellow,
            BallGroup::Yellow => BallGroup::Red,
        }
    }
}

impl fmt::Display for BallGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.color().fmt(f)
    }
}

/// Stable ball identity. Never reused within a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BallId(pub u32);

impl fmt::Display for BallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Fixed-capacity ring buffer of the most recent ball positions.
#[derive(Debug, Clone, PartialEq)]
pub struct Trail {
    points: [DVec2; TRAIL_CAPACITY],
    head: usize,
    len: usize,
}

impl Trail {
    pub fn new() -> Self {
        Self {
            points: [DVec2::ZERO; TRAIL_CAPACITY],
            head: 0,
            len: 0,
        }
    }

    /// Record a position, overwriting the oldest one when full.
    pub fn push(&mut self, point: DVec2) {
        self.points[self.head] = point;
        self.head = (self.head + 1) % TRAIL_CAPACITY;
        self.len = (self.len + 1).min(TRAIL_CAPACITY);
    }

    /// Points from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = DVec2> + '_ {
        let start = (self.head + TRAIL_CAPACITY - self.len) % TRAIL_CAPACITY;
        (0..self.len).map(move |i| self.points[(start + i) % TRAIL_CAPACITY])
    }

    pub fn latest(&self) -> Option<DVec2> {
        if self.len == 0 {
            return None;
        }
        Some(self.points[(self.head + TRAIL_CAPACITY - 1) % TRAIL_CAPACITY])
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}

impl Default for Trail {
    fn default() -> Self {
        Self::new()
    }
}

/// A ball on (or in a pocket of) the table.
///
/// Pocketed balls stay in the collection with zero velocity so ids and
/// indices remain stable for history and rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct Ball {
    pub id: BallId,
    pub color: BallColor,
    pub number: Option<u8>,
    pub pos: DVec2,
    pub vel: DVec2,
    pub pocketed: bool,
    pub trail: Trail,
}

impl Ball {
    /// Build a resting ball, validating the colour/number combination.
    pub fn new(id: BallId, color: BallColor, number: Option<u8>, pos: DVec2) -> Result<Self, BallError> {
        if let Some(n) = number {
            if color.group().is_none() {
                return Err(BallError::NumberNotAllowed { color });
            }
            if !(1..=7).contains(&n) {
                return Err(BallError::NumberOutOfRange { number: n });
            }
        }
        if !pos.is_finite() {
            return Err(BallError::NonFinite { id: id.0 });
        }
        Ok(Self {
            id,
            color,
            number,
            pos,
            vel: DVec2::ZERO,
            pocketed: false,
            trail: Trail::new(),
        })
    }

    pub fn cue(id: BallId, pos: DVec2) -> Self {
        Self {
            id,
            color: BallColor::White,
            number: None,
            pos,
            vel: DVec2::ZERO,
            pocketed: false,
            trail: Trail::new(),
        }
    }

    pub fn with_velocity(mut self, vel: DVec2) -> Self {
        self.vel = vel;
        self
    }

    pub fn is_cue(&self) -> bool {
        self.color == BallColor::White
    }

    /// Still on the table and taking part in physics.
    pub fn is_active(&self) -> bool {
        !self.pocketed
    }

    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.vel.length_squared()
    }

    /// Drop the ball into a pocket: it stops and leaves the simulation.
    pub fn pocket(&mut self) {
        self.pocketed = true;
        self.vel = DVec2::ZERO;
    }

    /// Human-readable label, e.g. "red 3" or "black".
    pub fn label(&self) -> String {
        match self.number {
            Some(n) => format!("{} {}", self.color, n),
            None => self.color.to_string(),
        }
    }
}

/// Non-pocketed balls per colour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallCounts {
    pub red: u32,
    pub yellow: u32,
    pub black: u32,
    pub white: u32,
}

impl BallCounts {
    pub fn from_balls(balls: &[Ball]) -> Self {
        let mut counts = Self::default();
        for ball in balls.iter().filter(|b| b.is_active()) {
            match ball.color {
                BallColor::Red => counts.red += 1,
                BallColor::Yellow => counts.yellow += 1,
                BallColor::Black => counts.black += 1,
                BallColor::White => counts.white += 1,
            }
        }
        counts
    }

    pub fn get(&self, color: BallColor) -> u32 {
        match color {
            BallColor::Red => self.red,
            BallColor::Yellow => self.yellow,
            BallColor::Black => self.black,
            BallColor::White => self.white,
        }
    }

    pub fn group(&self, group: BallGroup) -> u32 {
        self.get(group.color())
    }
}

/// The first non-pocketed white ball.
pub fn find_cue(balls: &[Ball]) -> Option<&Ball> {
    balls.iter().find(|b| b.is_cue() && b.is_active())
}

/// Index of the cue ball, pocketed or not.
pub fn cue_index(balls: &[Ball]) -> Option<usize> {
    balls.iter().position(|b| b.is_cue())
}

/// Reds-and-yellows triangle relative to its apex.
/// The apex points LEFT toward the cue ball, rows spread RIGHT.
///
/// ```text
///  R            <- apex (row 0)
///  Y  R
///  R  B  Y      <- black in the centre of row 2
///  Y  R  Y  R
///  Y  R  Y  R  Y
/// ```
const RACK_LAYOUT: [(BallColor, usize, f64); 15] = [
    (BallColor::Red, 0, 0.0),
    (BallColor::Yellow, 1, -0.5),
    (BallColor::Red, 1, 0.5),
    (BallColor::Red, 2, -1.0),
    (BallColor::Black, 2, 0.0),
    (BallColor::Yellow, 2, 1.0),
    (BallColor::Yellow, 3, -1.5),
    (BallColor::Red, 3, -0.5),
    (BallColor::Yellow, 3, 0.5),
    (BallColor::Red, 3, 1.5),
    (BallColor::Yellow, 4, -2.0),
    (BallColor::Red, 4, -1.0),
    (BallColor::Yellow, 4, 0.0),
    (BallColor::Red, 4, 1.0),
    (BallColor::Yellow, 4, 2.0),
];

/// Full starting layout: cue ball at `cue_spot` (id 0) and the 15-ball rack
/// with its apex at `apex` (ids 1..=15). Reds and yellows are numbered 1..=7
/// in rack order.
pub fn rack(cue_spot: DVec2, apex: DVec2, ball_radius: f64) -> Vec<Ball> {
    // Gap between ball centres (tight rack, small clearance)
    let gap = ball_radius * 2.0 + 1.0;
    let row_offset = gap * 0.866; // sqrt(3)/2 for an equilateral triangle

    let mut balls = Vec::with_capacity(16);
    balls.push(Ball::cue(BallId(0), cue_spot));

    let mut reds = 0u8;
    let mut yellows = 0u8;
    for (i, &(color, row, v_offset)) in RACK_LAYOUT.iter().enumerate() {
        let number = match color {
            BallColor::Red => {
                reds += 1;
                Some(reds)
            }
            BallColor::Yellow => {
                yellows += 1;
                Some(yellows)
            }
            _ => None,
        };
        let pos = DVec2::new(apex.x + row as f64 * row_offset, apex.y + v_offset * gap);
        balls.push(Ball {
            id: BallId(i as u32 + 1),
            color,
            number,
            pos,
            vel: DVec2::ZERO,
            pocketed: false,
            trail: Trail::new(),
        });
    }
    balls
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_parses_case_insensitively() {
        assert_eq!("Red".parse::<BallColor>().unwrap(), BallColor::Red);
        assert_eq!(" yellow ".parse::<BallColor>().unwrap(), BallColor::Yellow);
        assert!(matches!("blue".parse::<BallColor>(), Err(BallError::UnknownColor(_))));
    }

    #[test]
    fn numbers_only_on_group_balls() {
        let err = Ball::new(BallId(1), BallColor::Black, Some(8), DVec2::ZERO).unwrap_err();
        assert_eq!(err, BallError::NumberNotAllowed { color: BallColor::Black });

        let err = Ball::new(BallId(1), BallColor::Red, Some(9), DVec2::ZERO).unwrap_err();
        assert_eq!(err, BallError::NumberOutOfRange { number: 9 });

        assert!(Ball::new(BallId(1), BallColor::Yellow, Some(7), DVec2::ZERO).is_ok());
    }

    #[test]
    fn trail_keeps_most_recent_points() {
        let mut trail = Trail::new();
        for i in 0..(TRAIL_CAPACITY + 5) {
            trail.push(DVec2::new(i as f64, 0.0));
        }
        assert_eq!(trail.len(), TRAIL_CAPACITY);
        let xs: Vec<f64> = trail.iter().map(|p| p.x).collect();
        assert_eq!(xs.first().copied(), Some(5.0));
        assert_eq!(xs.last().copied(), Some((TRAIL_CAPACITY + 4) as f64));
        assert_eq!(trail.latest(), Some(DVec2::new((TRAIL_CAPACITY + 4) as f64, 0.0)));
    }

    #[test]
    fn pocketing_stops_the_ball() {
        let mut ball = Ball::cue(BallId(0), DVec2::new(10.0, 10.0)).with_velocity(DVec2::new(3.0, 4.0));
        assert_eq!(ball.kinetic_energy(), 12.5);
        ball.pocket();
        assert!(!ball.is_active());
        assert_eq!(ball.vel, DVec2::ZERO);
    }

    #[test]
    fn rack_has_seven_of_each_group() {
        let balls = rack(DVec2::new(200.0, 200.0), DVec2::new(600.0, 200.0), 14.0);
        let counts = BallCounts::from_balls(&balls);
        assert_eq!(counts, BallCounts { red: 7, yellow: 7, black: 1, white: 1 });
        assert!(balls[0].is_cue());

        let mut ids: Vec<u32> = balls.iter().map(|b| b.id.0).collect();
        ids.dedup();
        assert_eq!(ids.len(), 16);
    }

    #[test]
    fn rack_balls_do_not_overlap() {
        let radius = 14.0;
        let balls = rack(DVec2::new(200.0, 200.0), DVec2::new(600.0, 200.0), radius);
        for i in 0..balls.len() {
            for j in (i + 1)..balls.len() {
                assert!(balls[i].pos.distance(balls[j].pos) >= radius * 2.0);
            }
        }
    }

    #[test]
    fn counts_skip_pocketed_balls() {
        let mut balls = rack(DVec2::new(200.0, 200.0), DVec2::new(600.0, 200.0), 14.0);
        balls[1].pocket();
        let counts = BallCounts::from_balls(&balls);
        assert_eq!(counts.group(BallGroup::Red), 6);
        assert_eq!(find_cue(&balls).map(|b| b.id), Some(BallId(0)));
    }
}
