//! JSON shapes exchanged with the browser and the ball-detection collaborator.
//!
//! Everything crossing the boundary is validated here so the simulation loop
//! only ever sees well-formed `Ball`s.

use std::collections::HashSet;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::advisor::{ObjectBall, SkillLevel, Suggestion};
use crate::balls::{Ball, BallColor, BallId};
use crate::error::WireError;
use crate::physics::ShotResult;
use crate::shot::Shot;
use crate::table::{Pocket, Table};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl From<DVec2> for Point {
    fn from(v: DVec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

/// One ball record. Colour arrives as a free string and is checked on
/// conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallSnapshot {
    pub id: u32,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u8>,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub vx: f64,
    #[serde(default)]
    pub vy: f64,
    #[serde(default)]
    pub pocketed: bool,
}

impl BallSnapshot {
    pub fn to_ball(&self) -> Result<Ball, WireError> {
        let color: BallColor = self.color.parse()?;
        let mut ball = Ball::new(BallId(self.id), color, self.number, DVec2::new(self.x, self.y))?;
        let vel = DVec2::new(self.vx, self.vy);
        if vel.is_finite() {
            ball.vel = vel;
        }
        if self.pocketed {
            ball.pocket();
        }
        Ok(ball)
    }
}

impl From<&Ball> for BallSnapshot {
    fn from(ball: &Ball) -> Self {
        Self {
            id: ball.id.0,
            color: ball.color.as_str().to_string(),
            number: ball.number,
            x: ball.pos.x,
            y: ball.pos.y,
            vx: ball.vel.x,
            vy: ball.vel.y,
            pocketed: ball.pocketed,
        }
    }
}

pub fn snapshot(balls: &[Ball]) -> Vec<BallSnapshot> {
    balls.iter().map(BallSnapshot::from).collect()
}

/// `{ angle, power }` as sent by the aiming UI.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShotRequest {
    pub angle: f64,
    pub power: f64,
}

impl From<ShotRequest> for Shot {
    fn from(req: ShotRequest) -> Self {
        Shot::new(req.angle, req.power)
    }
}

pub fn parse_shot(json: &str) -> Result<Shot, WireError> {
    let req: ShotRequest = serde_json::from_str(json)?;
    Ok(req.into())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShotResultView {
    pub final_balls: Vec<BallSnapshot>,
    pub pocketed_this_shot: Vec<BallSnapshot>,
}

impl From<&ShotResult> for ShotResultView {
    fn from(result: &ShotResult) -> Self {
        Self {
            final_balls: snapshot(&result.final_balls),
            pocketed_this_shot: snapshot(&result.pocketed_this_shot),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectBallView {
    pub id: u32,
    pub color: BallColor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<u8>,
}

impl From<ObjectBall> for ObjectBallView {
    fn from(ball: ObjectBall) -> Self {
        Self {
            id: ball.id.0,
            color: ball.color,
            number: ball.number,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionView {
    pub name: String,
    pub description: String,
    pub tips: String,
    pub level: SkillLevel,
    pub angle: f64,
    pub power: f64,
    pub power_level: SkillLevel,
    pub object_ball: Option<ObjectBallView>,
    pub pocket: Option<Pocket>,
    pub pocket_position: Option<Point>,
    pub contact_point: Option<Point>,
    pub difficulty: f64,
    pub path_clear: bool,
    pub cue_path_clear: bool,
}

impl From<&Suggestion> for SuggestionView {
    fn from(s: &Suggestion) -> Self {
        Self {
            name: s.name.clone(),
            description: s.description.clone(),
            tips: s.tips.clone(),
            level: s.level,
            angle: s.angle,
            power: s.power,
            power_level: SkillLevel::for_power(s.power),
            object_ball: s.object_ball.map(ObjectBallView::from),
            pocket: s.pocket,
            pocket_position: s.pocket_pos.map(Point::from),
            contact_point: s.contact_point.map(Point::from),
            difficulty: s.difficulty,
            path_clear: s.path_clear,
            cue_path_clear: s.cue_path_clear,
        }
    }
}

pub fn suggestions_view(suggestions: &[Suggestion]) -> Vec<SuggestionView> {
    suggestions.iter().map(SuggestionView::from).collect()
}

/// Aiming advice for the shot controls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AimHelpView {
    pub level: SkillLevel,
    pub text: &'static str,
}

impl From<SkillLevel> for AimHelpView {
    fn from(level: SkillLevel) -> Self {
        Self {
            level,
            text: level.helper_text(),
        }
    }
}

/// Parse a JSON ball array. Fails on malformed JSON, an invalid record or a
/// repeated id.
pub fn parse_balls(json: &str) -> Result<Vec<Ball>, WireError> {
    let records: Vec<BallSnapshot> = serde_json::from_str(json)?;
    let balls = records
        .iter()
        .map(BallSnapshot::to_ball)
        .collect::<Result<Vec<_>, _>>()?;
    match first_duplicate(&balls) {
        Some(id) => Err(WireError::DuplicateId(id.0)),
        None => Ok(balls),
    }
}

fn first_duplicate(balls: &[Ball]) -> Option<BallId> {
    let mut seen = HashSet::new();
    balls.iter().map(|b| b.id).find(|id| !seen.insert(*id))
}

/// Detected layout, or the default rack when no white ball was found or an
/// id repeats.
pub fn layout_or_default(balls: Vec<Ball>, table: &Table) -> Vec<Ball> {
    if let Some(id) = first_duplicate(&balls) {
        log::warn!("Ball id {} repeated in detected layout, using default rack", id.0);
        return table.default_layout();
    }
    if balls.iter().any(|b| b.color == BallColor::White) {
        balls
    } else {
        log::warn!("No cue ball in detected layout ({} balls), using default rack", balls.len());
        table.default_layout()
    }
}

/// Parse a detected layout, substituting the default rack when it has no
/// white ball.
pub fn load_layout(json: &str, table: &Table) -> Result<Vec<Ball>, WireError> {
    let balls = parse_balls(json)?;
    Ok(layout_or_default(balls, table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BallError;

    const LAYOUT: &str = r#"[
        { "id": 0, "color": "white", "x": 200, "y": 200 },
        { "id": 1, "color": "Red", "number": 3, "x": 600, "y": 150 },
        { "id": 2, "color": "black", "x": 500, "y": 300, "pocketed": true }
    ]"#;

    #[test]
    fn parses_detected_layout() {
        let table = Table::standard();
        let balls = load_layout(LAYOUT, &table).unwrap();
        assert_eq!(balls.len(), 3);
        assert_eq!(balls[1].color, BallColor::Red);
        assert_eq!(balls[1].number, Some(3));
        assert_eq!(balls[1].pos, DVec2::new(600.0, 150.0));
        assert!(balls[2].pocketed);
        assert_eq!(balls[2].vel, DVec2::ZERO);
    }

    #[test]
    fn missing_cue_ball_substitutes_default_rack() {
        let table = Table::standard();
        let balls = load_layout(r#"[{ "id": 4, "color": "red", "x": 10, "y": 10 }]"#, &table).unwrap();
        assert_eq!(balls, table.default_layout());
    }

    #[test]
    fn rejects_bad_records() {
        let table = Table::standard();
        assert!(matches!(
            load_layout(r#"[{ "id": 1, "color": "blue", "x": 1, "y": 1 }]"#, &table),
            Err(WireError::Ball(BallError::UnknownColor(_)))
        ));
        assert!(matches!(
            load_layout(r#"[{ "id": 1, "color": "black", "number": 8, "x": 1, "y": 1 }]"#, &table),
            Err(WireError::Ball(BallError::NumberNotAllowed { .. }))
        ));
        assert!(matches!(load_layout("nope", &table), Err(WireError::Json(_))));
    }

    #[test]
    fn rejects_repeated_ids() {
        let json = r#"[
            { "id": 0, "color": "white", "x": 200, "y": 200 },
            { "id": 1, "color": "red", "number": 1, "x": 600, "y": 150 },
            { "id": 1, "color": "yellow", "number": 1, "x": 700, "y": 100 }
        ]"#;
        assert!(matches!(parse_balls(json), Err(WireError::DuplicateId(1))));
    }

    #[test]
    fn repeated_ids_substitute_default_rack() {
        let table = Table::standard();
        let mut balls = parse_balls(LAYOUT).unwrap();
        balls[2].id = balls[1].id;
        assert_eq!(layout_or_default(balls, &table), table.default_layout());
    }

    #[test]
    fn shot_request_is_normalised() {
        let shot = parse_shot(r#"{ "angle": 370, "power": 2 }"#).unwrap();
        assert!((shot.angle - 10.0).abs() < 1e-9);
        assert_eq!(shot.power, 1.0);
    }

    #[test]
    fn suggestion_view_shape() {
        let table = Table::standard();
        let balls = parse_balls(LAYOUT).unwrap();
        let suggestions = crate::advisor::suggest(
            &balls,
            SkillLevel::Expert,
            &table,
            crate::advisor::TargetRule::OpenTable,
        );
        let json = serde_json::to_value(suggestions_view(&suggestions)).unwrap();
        let first = &json[0];
        assert_eq!(first["pocket"], "topRight");
        assert_eq!(first["objectBall"]["color"], "red");
        assert_eq!(first["objectBall"]["number"], 3);
        assert_eq!(first["level"], "expert");
        assert!(first["powerLevel"].is_string());
        assert_eq!(first["pocketPosition"]["x"], 775.0);
        assert!(first["contactPoint"]["x"].is_number());
    }

    #[test]
    fn aim_help_shape() {
        let json = serde_json::to_value(AimHelpView::from(SkillLevel::Beginner)).unwrap();
        assert_eq!(json["level"], "beginner");
        assert!(json["text"].as_str().unwrap().starts_with("Aim directly"));
    }

    #[test]
    fn snapshot_round_trips_state() {
        let table = Table::standard();
        let balls = table.default_layout();
        let json = serde_json::to_string(&snapshot(&balls)).unwrap();
        assert_eq!(parse_balls(&json).unwrap(), balls);
    }
}
