//! A match session: one table, its balls and the rules state, driven by the
//! host one frame at a time.
//!
//! The host calls `take_shot`, then `tick(frame_dt)` every animation frame
//! until it returns a verdict. Between shots `suggestions` reads the resting
//! table for the player to move.

use chrono::{DateTime, Utc};
use glam::DVec2;
use serde::Serialize;

use crate::advisor::{suggest, SkillLevel, Suggestion};
use crate::balls::{cue_index, find_cue, Ball, BallColor, BallId};
use crate::config::EngineConfig;
use crate::error::MatchError;
use crate::physics::{ShotResult, Simulation};
use crate::rng::Rng;
use crate::rules::{GameState, GameStatus, ShotInput, ShotVerdict, TurnOutcome};
use crate::shot::Shot;
use crate::table::Table;
use crate::time::FixedTimestep;
use crate::wire::{self, BallSnapshot, Point};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchPhase {
    Aiming,
    BallsMoving,
    AwaitingGroupChoice,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrailView {
    pub id: u32,
    pub points: Vec<Point>,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSnapshot {
    pub phase: MatchPhase,
    pub width: f64,
    pub height: f64,
    pub ball_radius: f64,
    pub pocket_radius: f64,
    pub pockets: Vec<Point>,
    pub balls: Vec<BallSnapshot>,
    pub trails: Vec<TrailView>,
    /// Interpolation factor between the last two physics steps.
    pub alpha: f64,
    pub can_shoot: bool,
    pub status: GameStatus,
}

pub struct Match {
    config: EngineConfig,
    sim: Simulation,
    rules: GameState,
    phase: MatchPhase,
    timestep: FixedTimestep,
    rng: Rng,
    before_shot: Vec<Ball>,
    current_shot: Option<Shot>,
    last_verdict: Option<ShotVerdict>,
    last_result: Option<ShotResult>,
}

impl Match {
    /// New game on the default rack.
    pub fn new(config: EngineConfig) -> Result<Self, MatchError> {
        config.validate()?;
        let table = config.table()?;
        let balls = table.default_layout();
        Ok(Self::build(config, table, balls))
    }

    /// Default config on the standard table.
    pub fn standard() -> Self {
        let table = Table::standard();
        let balls = table.default_layout();
        Self::build(EngineConfig::default(), table, balls)
    }

    /// New game on a detected layout. Falls back to the default rack when
    /// the layout has no cue ball or repeats an id. A white that arrives
    /// already pocketed goes back on the head spot.
    pub fn with_layout(config: EngineConfig, balls: Vec<Ball>) -> Result<Self, MatchError> {
        config.validate()?;
        let table = config.table()?;
        let balls = wire::layout_or_default(balls, &table);
        let mut game = Self::build(config, table, balls);
        if find_cue(game.balls()).is_none() {
            game.restore_ball(BallColor::White);
        }
        Ok(game)
    }

    fn build(config: EngineConfig, table: Table, balls: Vec<Ball>) -> Self {
        let rules = GameState::new(&balls, Utc::now());
        let timestep = FixedTimestep::new(config.frame_dt);
        let rng = Rng::new(config.seed);
        let sim = Simulation::new(table, balls, config.step_params());
        Self {
            config,
            sim,
            rules,
            phase: MatchPhase::Aiming,
            timestep,
            rng,
            before_shot: Vec::new(),
            current_shot: None,
            last_verdict: None,
            last_result: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn table(&self) -> &Table {
        self.sim.table()
    }

    pub fn balls(&self) -> &[Ball] {
        self.sim.balls()
    }

    pub fn rules(&self) -> &GameState {
        &self.rules
    }

    pub fn last_verdict(&self) -> Option<&ShotVerdict> {
        self.last_verdict.as_ref()
    }

    pub fn last_result(&self) -> Option<&ShotResult> {
        self.last_result.as_ref()
    }

    pub fn is_settled(&self) -> bool {
        self.phase != MatchPhase::BallsMoving
    }

    /// A shot needs a resting table, a cue ball and something to hit.
    pub fn can_shoot(&self) -> bool {
        let balls = self.sim.balls();
        self.phase == MatchPhase::Aiming
            && find_cue(balls).is_some()
            && balls.iter().any(|b| b.is_active() && !b.is_cue())
    }

    /// Strike the cue ball. Returns the shot actually applied, which differs
    /// from `shot` when aim noise is configured.
    pub fn take_shot(&mut self, shot: Shot) -> Result<Shot, MatchError> {
        match self.phase {
            MatchPhase::Aiming => {}
            MatchPhase::BallsMoving => return Err(MatchError::BallsMoving),
            MatchPhase::AwaitingGroupChoice => return Err(MatchError::GroupChoicePending),
            MatchPhase::Finished => return Err(MatchError::GameOver),
        }
        if find_cue(self.sim.balls()).is_none() {
            return Err(MatchError::NoCueBall);
        }

        let applied = shot.perturbed(&mut self.rng, self.config.aim_noise_degrees);
        self.before_shot = self.sim.balls().to_vec();
        self.sim.strike(&applied);
        self.current_shot = Some(applied);
        self.timestep.reset();
        self.phase = MatchPhase::BallsMoving;
        log::info!(
            "{} shoots: angle {:.1}, power {:.2}, speed {:.2}",
            self.rules.current_player(),
            applied.angle,
            applied.power,
            applied.power * self.config.max_shot_speed
        );
        Ok(applied)
    }

    /// Advance by one display frame. Returns the verdict on the frame the
    /// table comes to rest.
    pub fn tick(&mut self, frame_dt: f64) -> Option<ShotVerdict> {
        if self.phase != MatchPhase::BallsMoving {
            return None;
        }
        let steps = self.timestep.accumulate(frame_dt);
        for _ in 0..steps {
            for (id, pocket) in self.sim.step().pocketed {
                log::debug!("Ball {} pocketed in {} pocket", id, pocket);
            }
            if self.sim.is_settled() {
                break;
            }
        }
        if self.sim.is_settled() {
            Some(self.finish_shot(Utc::now()))
        } else {
            None
        }
    }

    /// Step the shot in progress to rest without waiting for frames.
    pub fn run_until_settled(&mut self) -> Option<ShotVerdict> {
        if self.phase != MatchPhase::BallsMoving {
            return None;
        }
        self.sim.run_until_settled();
        Some(self.finish_shot(Utc::now()))
    }

    fn finish_shot(&mut self, now: DateTime<Utc>) -> ShotVerdict {
        let result = self.sim.result();
        log::debug!(
            "Shot settled after {} steps, {} ball(s) pocketed",
            self.sim.steps_this_shot(),
            result.pocketed_this_shot.len()
        );
        let input = ShotInput {
            before: &self.before_shot,
            after: &result.final_balls,
            shot: self.current_shot.take(),
            pocketed: &result.pocketed_this_shot,
        };
        let (mut rules, verdict) = self.rules.evaluate(&input, now);

        if verdict.outcome == TurnOutcome::Rerack {
            let balls = self.sim.table().default_layout();
            rules = rules.rerack(&balls, now);
            self.sim.reset(balls);
        } else if !verdict.is_game_over {
            self.restore_ball(BallColor::White);
            // Black can only be down here alongside a cue-ball foul
            self.restore_ball(BallColor::Black);
        }
        self.rules = rules;

        self.phase = if verdict.is_game_over {
            MatchPhase::Finished
        } else if verdict.can_select_group {
            MatchPhase::AwaitingGroupChoice
        } else {
            MatchPhase::Aiming
        };
        self.timestep.reset();
        self.last_result = Some(result);
        self.last_verdict = Some(verdict.clone());
        verdict
    }

    // Cue ball goes back on the head spot, black on the foot spot
    fn restore_ball(&mut self, color: BallColor) {
        let table = self.sim.table().clone();
        let spot = match color {
            BallColor::White => table.head_spot(),
            _ => table.foot_spot(),
        };
        let index = match color {
            BallColor::White => cue_index(self.sim.balls()),
            _ => self.sim.balls().iter().position(|b| b.color == color),
        };
        let Some(index) = index else {
            if color == BallColor::White {
                let id = next_id(self.sim.balls());
                let pos = free_spot(self.sim.balls(), &table, spot, id);
                let mut balls = self.sim.balls().to_vec();
                balls.push(Ball::cue(id, pos));
                self.sim.reset(balls);
                log::info!("Cue ball added at ({:.0}, {:.0})", pos.x, pos.y);
            }
            return;
        };
        if !self.sim.balls()[index].pocketed {
            return;
        }
        let id = self.sim.balls()[index].id;
        let pos = free_spot(self.sim.balls(), &table, spot, id);
        let ball = &mut self.sim.balls_mut()[index];
        ball.pos = pos;
        ball.vel = DVec2::ZERO;
        ball.pocketed = false;
        ball.trail.clear();
        log::info!("{} respotted at ({:.0}, {:.0})", ball.label(), pos.x, pos.y);
    }

    /// Ranked suggestions for the player to move. Empty while balls are
    /// moving or after the game ended.
    pub fn suggestions(&self, level: SkillLevel) -> Vec<Suggestion> {
        match self.phase {
            MatchPhase::Aiming | MatchPhase::AwaitingGroupChoice => {
                suggest(self.sim.balls(), level, self.sim.table(), self.rules.target_rule())
            }
            MatchPhase::BallsMoving | MatchPhase::Finished => Vec::new(),
        }
    }

    /// Resolve a pending group choice for the player who pocketed both colours.
    pub fn select_group(&mut self, color: BallColor) -> Result<(), MatchError> {
        if self.phase != MatchPhase::AwaitingGroupChoice {
            return Err(MatchError::NoGroupChoice);
        }
        self.rules = self.rules.assign_ball_groups(color, Utc::now())?;
        self.phase = MatchPhase::Aiming;
        Ok(())
    }

    /// Start a new game on a fresh rack.
    pub fn rerack(&mut self) {
        let balls = self.sim.table().default_layout();
        self.rules = GameState::new(&balls, Utc::now());
        self.sim.reset(balls);
        self.timestep.reset();
        self.phase = MatchPhase::Aiming;
        self.before_shot.clear();
        self.current_shot = None;
        self.last_verdict = None;
        self.last_result = None;
        log::info!("New rack");
    }

    pub fn status(&self) -> GameStatus {
        self.rules.status()
    }

    pub fn snapshot(&self) -> MatchSnapshot {
        let table = self.sim.table();
        let balls = self.sim.balls();
        MatchSnapshot {
            phase: self.phase,
            width: table.width,
            height: table.height,
            ball_radius: table.ball_radius,
            pocket_radius: table.pocket_radius,
            pockets: table.pockets.iter().map(|&p| Point::from(p)).collect(),
            balls: wire::snapshot(balls),
            trails: balls
                .iter()
                .filter(|b| b.is_active() && !b.trail.is_empty())
                .map(|b| TrailView {
                    id: b.id.0,
                    points: b.trail.iter().map(Point::from).collect(),
                })
                .collect(),
            alpha: self.timestep.alpha(),
            can_shoot: self.can_shoot(),
            status: self.rules.status(),
        }
    }
}

fn next_id(balls: &[Ball]) -> BallId {
    BallId(balls.iter().map(|b| b.id.0 + 1).max().unwrap_or(0))
}

/// First position from `spot` stepping along +x (wrapping at the far rail)
/// where a ball touches no other active ball.
fn free_spot(balls: &[Ball], table: &Table, spot: DVec2, id: BallId) -> DVec2 {
    let diameter = table.ball_radius * 2.0;
    let (min, max) = table.playable_bounds();
    let overlaps = |pos: DVec2| {
        balls
            .iter()
            .any(|b| b.id != id && b.is_active() && b.pos.distance(pos) < diameter)
    };

    let mut pos = spot.clamp(min, max);
    for _ in 0..64 {
        if !overlaps(pos) {
            return pos;
        }
        pos.x += diameter + 1.0;
        if pos.x > max.x {
            pos.x = min.x;
        }
    }
    log::warn!("No free spot near ({:.0}, {:.0})", spot.x, spot.y);
    pos
}
