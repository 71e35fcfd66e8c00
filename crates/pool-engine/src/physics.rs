//! Discrete step physics for balls on a rectangular table.
//!
//! One call to [`step`] advances every non-pocketed ball by one timestep:
//!
//! 1. capture balls already sitting inside a pocket's radius
//! 2. integrate positions (`pos += vel * dt`)
//! 3. resolve ball-ball overlaps pairwise (positional split + elastic impulse)
//! 4. clamp against the cushions and reflect the perpendicular velocity
//! 5. apply felt friction and snap tiny velocity components to zero
//! 6. capture balls that ended the step inside a pocket
//!
//! Cushion handling is discrete penetration correction, not continuous-time
//! collision: a ball found within one radius of a rail is moved back onto the
//! rail offset. At screen-space speeds (≤ 15 units/step, radius 14) a ball
//! cannot cross a ball diameter in one step. The pair loop is O(n²) over the
//! active balls; a rack has at most 16.

use glam::DVec2;

use crate::balls::{cue_index, Ball, BallId};
use crate::shot::{Shot, MAX_SHOT_SPEED};
use crate::table::{Pocket, Table};

/// Velocity components below this (units/step) are snapped to zero.
pub const REST_EPSILON: f64 = 0.01;
/// One step per animation frame.
pub const DEFAULT_DT: f64 = 1.0;
/// Hard stop for a single shot; the table is force-settled after this many steps.
pub const MAX_STEPS_PER_SHOT: u32 = 10_000;

// Equal masses for every ball
const BALL_MASS: f64 = 1.0;

/// Tunables for a [`Simulation`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepParams {
    pub dt: f64,
    pub rest_epsilon: f64,
    pub max_shot_speed: f64,
    pub max_steps_per_shot: u32,
}

impl Default for StepParams {
    fn default() -> Self {
        Self {
            dt: DEFAULT_DT,
            rest_epsilon: REST_EPSILON,
            max_shot_speed: MAX_SHOT_SPEED,
            max_steps_per_shot: MAX_STEPS_PER_SHOT,
        }
    }
}

/// A collision between two balls during a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionPair {
    pub ball_a: BallId,
    pub ball_b: BallId,
}

/// What happened during one step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepEvents {
    pub pocketed: Vec<(BallId, Pocket)>,
    pub collisions: Vec<CollisionPair>,
    pub cushion_hits: u32,
}

/// Outcome of a whole shot, handed to the rules engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ShotResult {
    pub final_balls: Vec<Ball>,
    pub pocketed_this_shot: Vec<Ball>,
}

/// Advance every active ball by one step using the default rest epsilon.
pub fn step(balls: &mut [Ball], table: &Table, dt: f64) -> StepEvents {
    step_with_epsilon(balls, table, dt, REST_EPSILON)
}

pub fn step_with_epsilon(balls: &mut [Ball], table: &Table, dt: f64, rest_epsilon: f64) -> StepEvents {
    let mut events = StepEvents::default();

    capture_pocketed(balls, table, &mut events);

    for ball in balls.iter_mut().filter(|b| b.is_active()) {
        ball.pos += ball.vel * dt;
    }

    resolve_ball_collisions(balls, table, &mut events);

    for ball in balls.iter_mut().filter(|b| b.is_active()) {
        if bounce_off_cushions(ball, table) {
            events.cushion_hits += 1;
        }
        ball.vel *= table.friction;
        if ball.vel.x.abs() < rest_epsilon {
            ball.vel.x = 0.0;
        }
        if ball.vel.y.abs() < rest_epsilon {
            ball.vel.y = 0.0;
        }
    }

    capture_pocketed(balls, table, &mut events);

    for ball in balls.iter_mut().filter(|b| b.is_active()) {
        if ball.trail.latest() != Some(ball.pos) {
            ball.trail.push(ball.pos);
        }
    }

    events
}

/// Every active ball has both velocity components below `rest_epsilon`.
pub fn is_settled(balls: &[Ball], rest_epsilon: f64) -> bool {
    balls
        .iter()
        .filter(|b| b.is_active())
        .all(|b| b.vel.x.abs() < rest_epsilon && b.vel.y.abs() < rest_epsilon)
}

/// Total kinetic energy of the active balls.
pub fn kinetic_energy(balls: &[Ball]) -> f64 {
    balls.iter().filter(|b| b.is_active()).map(Ball::kinetic_energy).sum()
}

/// Set the cue ball moving. Returns `false` (and changes nothing) when there
/// is no cue ball on the table.
pub fn strike(balls: &mut [Ball], shot: &Shot, max_speed: f64) -> bool {
    let Some(idx) = cue_index(balls).filter(|&i| balls[i].is_active()) else {
        log::warn!("Shot ignored: no cue ball on the table");
        return false;
    };
    let velocity = shot.velocity(max_speed);
    log::debug!(
        "Strike: angle={:.1} power={:.2} speed={:.2}",
        shot.angle,
        shot.power,
        velocity.length()
    );
    balls[idx].vel = velocity;
    true
}

fn capture_pocketed(balls: &mut [Ball], table: &Table, events: &mut StepEvents) {
    for ball in balls.iter_mut().filter(|b| b.is_active()) {
        if let Some(pocket) = table.pocket_at(ball.pos) {
            log::info!("Ball {} ({}) pocketed into {} pocket", ball.id, ball.label(), pocket);
            ball.pocket();
            events.pocketed.push((ball.id, pocket));
        }
    }
}

/// Clamp a ball back onto the rail offset and reflect its perpendicular
/// velocity. Returns `true` if any rail was hit.
fn bounce_off_cushions(ball: &mut Ball, table: &Table) -> bool {
    let (min, max) = table.playable_bounds();
    let e = table.restitution;
    let mut hit = false;

    if ball.pos.x < min.x {
        ball.pos.x = min.x;
        if ball.vel.x < 0.0 {
            ball.vel.x = -ball.vel.x * e;
            hit = true;
        }
    } else if ball.pos.x > max.x {
        ball.pos.x = max.x;
        if ball.vel.x > 0.0 {
            ball.vel.x = -ball.vel.x * e;
            hit = true;
        }
    }

    if ball.pos.y < min.y {
        ball.pos.y = min.y;
        if ball.vel.y < 0.0 {
            ball.vel.y = -ball.vel.y * e;
            hit = true;
        }
    } else if ball.pos.y > max.y {
        ball.pos.y = max.y;
        if ball.vel.y > 0.0 {
            ball.vel.y = -ball.vel.y * e;
            hit = true;
        }
    }

    hit
}

fn resolve_ball_collisions(balls: &mut [Ball], table: &Table, events: &mut StepEvents) {
    let min_dist = table.ball_radius * 2.0;
    let e = table.ball_restitution;
    let count = balls.len();

    for i in 0..count {
        if !balls[i].is_active() {
            continue;
        }
        for j in (i + 1)..count {
            if !balls[j].is_active() {
                continue;
            }
            let delta = balls[j].pos - balls[i].pos;
            let dist_sq = delta.length_squared();
            if dist_sq >= min_dist * min_dist {
                continue;
            }

            let dist = dist_sq.sqrt();
            // Exactly coincident centres have no normal; separate along +x
            let normal = delta.try_normalize().unwrap_or(DVec2::X);

            // Positional correction: split the overlap evenly
            let separation = normal * ((min_dist - dist) * 0.5);
            balls[i].pos -= separation;
            balls[j].pos += separation;

            // Velocity correction: skip if already separating
            let relative = balls[j].vel - balls[i].vel;
            let along_normal = relative.dot(normal);
            if along_normal >= 0.0 {
                continue;
            }
            let impulse = -(1.0 + e) * along_normal / (1.0 / BALL_MASS + 1.0 / BALL_MASS);
            balls[i].vel -= normal * (impulse / BALL_MASS);
            balls[j].vel += normal * (impulse / BALL_MASS);

            events.collisions.push(CollisionPair {
                ball_a: balls[i].id,
                ball_b: balls[j].id,
            });
        }
    }
}

/// A table of balls plus the bookkeeping for the shot in progress.
/// The caller drives it: `strike`, then `step` once per tick until `is_settled`.
#[derive(Debug, Clone)]
pub struct Simulation {
    table: Table,
    balls: Vec<Ball>,
    params: StepParams,
    pocketed_this_shot: Vec<BallId>,
    steps_this_shot: u32,
}

impl Simulation {
    pub fn new(table: Table, balls: Vec<Ball>, params: StepParams) -> Self {
        Self {
            table,
            balls,
            params,
            pocketed_this_shot: Vec::new(),
            steps_this_shot: 0,
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn balls(&self) -> &[Ball] {
        &self.balls
    }

    pub fn balls_mut(&mut self) -> &mut [Ball] {
        &mut self.balls
    }

    pub fn params(&self) -> &StepParams {
        &self.params
    }

    /// Replace the whole layout (re-rack, new detection result).
    pub fn reset(&mut self, balls: Vec<Ball>) {
        self.balls = balls;
        self.pocketed_this_shot.clear();
        self.steps_this_shot = 0;
    }

    /// Start a shot. Returns `false` if there is no cue ball to strike.
    pub fn strike(&mut self, shot: &Shot) -> bool {
        self.pocketed_this_shot.clear();
        self.steps_this_shot = 0;
        strike(&mut self.balls, shot, self.params.max_shot_speed)
    }

    pub fn step(&mut self) -> StepEvents {
        let events = step_with_epsilon(
            &mut self.balls,
            &self.table,
            self.params.dt,
            self.params.rest_epsilon,
        );
        self.pocketed_this_shot
            .extend(events.pocketed.iter().map(|(id, _)| *id));
        self.steps_this_shot += 1;

        if self.steps_this_shot >= self.params.max_steps_per_shot && !self.is_settled() {
            log::warn!(
                "Shot still moving after {} steps, force-settling",
                self.steps_this_shot
            );
            for ball in &mut self.balls {
                ball.vel = DVec2::ZERO;
            }
        }
        events
    }

    pub fn is_settled(&self) -> bool {
        is_settled(&self.balls, self.params.rest_epsilon)
    }

    pub fn steps_this_shot(&self) -> u32 {
        self.steps_this_shot
    }

    pub fn kinetic_energy(&self) -> f64 {
        kinetic_energy(&self.balls)
    }

    /// Step until the table is at rest and return the shot result.
    pub fn run_until_settled(&mut self) -> ShotResult {
        while !self.is_settled() {
            self.step();
        }
        log::debug!("Shot settled after {} steps", self.steps_this_shot);
        self.result()
    }

    /// Snapshot of the table plus every ball pocketed since the last strike.
    pub fn result(&self) -> ShotResult {
        let pocketed_this_shot = self
            .pocketed_this_shot
            .iter()
            .filter_map(|id| self.balls.iter().find(|b| b.id == *id).cloned())
            .collect();
        ShotResult {
            final_balls: self.balls.clone(),
            pocketed_this_shot,
        }
    }
}
