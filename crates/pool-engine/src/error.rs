use thiserror::Error;

use crate::balls::BallColor;

/// Rejected ball records coming from the detection collaborator or a test fixture.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BallError {
    #[error("unknown ball colour: {0:?}")]
    UnknownColor(String),

    #[error("ball number {number} out of range 1..=7")]
    NumberOutOfRange { number: u8 },

    #[error("{color} ball cannot carry a number")]
    NumberNotAllowed { color: BallColor },

    #[error("non-finite coordinate on ball {id}")]
    NonFinite { id: u32 },
}

/// Invalid table or engine configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("table dimensions must be positive, got {width}x{height}")]
    Dimensions { width: f64, height: f64 },

    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("friction must lie in (0, 1), got {0}")]
    Friction(f64),

    #[error("{name} restitution must lie in (0, 1], got {value}")]
    Restitution { name: &'static str, value: f64 },

    #[error("table {width}x{height} too small for ball radius {radius}")]
    TooSmall { width: f64, height: f64, radius: f64 },

    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Programmer errors raised by the rules state machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RulesError {
    #[error("invalid ball group colour {0}: must be red or yellow")]
    InvalidGroupColor(BallColor),

    #[error("ball groups are already assigned")]
    GroupsAlreadyAssigned,
}

/// Malformed JSON at the wire boundary.
#[derive(Error, Debug)]
pub enum WireError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bad ball record: {0}")]
    Ball(#[from] BallError),

    #[error("unknown skill level: {0:?}")]
    UnknownSkillLevel(String),

    #[error("ball id {0} appears more than once")]
    DuplicateId(u32),
}

/// Session-level refusals.
#[derive(Error, Debug)]
pub enum MatchError {
    #[error("balls are still moving")]
    BallsMoving,

    #[error("a ball group must be selected before the next shot")]
    GroupChoicePending,

    #[error("no ball group choice is pending")]
    NoGroupChoice,

    #[error("game is over")]
    GameOver,

    #[error("no cue ball on the table")]
    NoCueBall,

    #[error(transparent)]
    Rules(#[from] RulesError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
