//! Shot advisor: enumerates (object ball, pocket) pairs, checks line of sight,
//! scores difficulty and returns a skill-filtered, ranked list.
//!
//! Pure over its inputs. Reads a snapshot and never mutates it, so it is safe
//! to call from another thread while physics is paused.

use std::fmt;
use std::str::FromStr;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::balls::{find_cue, Ball, BallColor, BallGroup, BallId};
use crate::error::WireError;
use crate::shot::Shot;
use crate::table::{Pocket, Table};

// Difficulty model
const BASE_DIFFICULTY: f64 = 0.2;
const CUE_DISTANCE_SCALE: f64 = 800.0;
const POCKET_DISTANCE_SCALE: f64 = 1000.0;
const POCKET_PATH_PENALTY: f64 = 0.3;
const CUE_PATH_PENALTY: f64 = 0.2;

// Power heuristic: 0.5 plus distance over 500, capped
const BASE_POWER: f64 = 0.5;
const POWER_DISTANCE_SCALE: f64 = 500.0;
const MAX_SUGGESTED_POWER: f64 = 0.95;

const FALLBACK_POWER: f64 = 0.5;
const FALLBACK_DIFFICULTY: f64 = 0.7;
const GENERIC_POWER: f64 = 0.6;

/// Player skill, used to filter suggestions and to label them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Expert,
}

impl SkillLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            SkillLevel::Beginner => "beginner",
            SkillLevel::Intermediate => "intermediate",
            SkillLevel::Expert => "expert",
        }
    }

    /// Difficulty band a shot falls into.
    pub fn for_difficulty(difficulty: f64) -> Self {
        if difficulty > 0.6 {
            SkillLevel::Expert
        } else if difficulty > 0.3 {
            SkillLevel::Intermediate
        } else {
            SkillLevel::Beginner
        }
    }

    /// Skill a given power setting calls for.
    pub fn for_power(power: f64) -> Self {
        if power > 0.8 {
            SkillLevel::Expert
        } else if power > 0.6 {
            SkillLevel::Intermediate
        } else {
            SkillLevel::Beginner
        }
    }

    /// Aiming advice shown next to the shot controls.
    pub fn helper_text(self) -> &'static str {
        match self {
            SkillLevel::Beginner => {
                "Aim directly at the ball you want to hit. Use medium power for a controlled shot."
            }
            SkillLevel::Intermediate => {
                "Focus on a clean hit. Plan where the white will go after contact."
            }
            SkillLevel::Expert => {
                "Consider using side spin for positional play. Vary power based on next position."
            }
        }
    }

    fn max_suggestions(self) -> usize {
        match self {
            SkillLevel::Beginner => 2,
            SkillLevel::Intermediate => 3,
            SkillLevel::Expert => 4,
        }
    }

    fn accepts(self, candidate: &ShotCandidate) -> bool {
        match self {
            SkillLevel::Beginner => {
                candidate.difficulty < 0.4 && candidate.pocket_path_clear && candidate.cue_path_clear
            }
            SkillLevel::Intermediate => candidate.difficulty < 0.7,
            SkillLevel::Expert => true,
        }
    }
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillLevel {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(SkillLevel::Beginner),
            "intermediate" => Ok(SkillLevel::Intermediate),
            "expert" => Ok(SkillLevel::Expert),
            _ => Err(WireError::UnknownSkillLevel(s.to_string())),
        }
    }
}

/// Which balls the shooter may legally aim at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetRule {
    /// Groups unassigned: any red or yellow.
    OpenTable,
    /// The shooter's own group, or the black once that group is cleared.
    Group(BallGroup),
}

/// Identity of the ball a suggestion aims at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectBall {
    pub id: BallId,
    pub color: BallColor,
    pub number: Option<u8>,
}

impl ObjectBall {
    fn of(ball: &Ball) -> Self {
        Self {
            id: ball.id,
            color: ball.color,
            number: ball.number,
        }
    }
}

/// One scored (object ball, pocket) option before skill filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct ShotCandidate {
    pub object_ball: ObjectBall,
    pub pocket: Pocket,
    pub pocket_pos: DVec2,
    /// Where the cue ball must be at impact: two radii behind the object
    /// ball on the pocket line.
    pub contact_point: DVec2,
    pub angle: f64,
    pub power: f64,
    pub difficulty: f64,
    pub pocket_path_clear: bool,
    pub cue_path_clear: bool,
    pub cue_distance: f64,
    pub pocket_distance: f64,
    /// Synthesised direct-aim option, not a computed pocketing line.
    pub fallback: bool,
}

/// A presentable suggestion carrying everything the physics needs to take it.
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub name: String,
    pub description: String,
    pub tips: String,
    pub level: SkillLevel,
    pub angle: f64,
    pub power: f64,
    pub object_ball: Option<ObjectBall>,
    pub pocket: Option<Pocket>,
    pub pocket_pos: Option<DVec2>,
    pub contact_point: Option<DVec2>,
    pub difficulty: f64,
    pub path_clear: bool,
    pub cue_path_clear: bool,
}

impl Suggestion {
    pub fn shot(&self) -> Shot {
        Shot::new(self.angle, self.power)
    }
}

/// Ranked suggestions for the player to move.
///
/// - no cue ball: a single generic "Direct Shot"
/// - no legal target: empty
/// - otherwise at least one suggestion
pub fn suggest(balls: &[Ball], level: SkillLevel, table: &Table, rule: TargetRule) -> Vec<Suggestion> {
    let Some(cue) = find_cue(balls) else {
        log::warn!("No cue ball detected, returning generic suggestion");
        return vec![generic_suggestion()];
    };

    let mut ranked = candidates(cue, balls, table, rule);
    if ranked.is_empty() {
        return Vec::new();
    }
    rank(&mut ranked);

    let mut picked: Vec<ShotCandidate> = ranked
        .iter()
        .filter(|c| level.accepts(c))
        .take(level.max_suggestions())
        .cloned()
        .collect();
    if picked.is_empty() {
        picked.push(ranked[0].clone());
    }

    log::debug!(
        "{} suggestions for {} ({} candidates)",
        picked.len(),
        level,
        ranked.len()
    );
    picked.iter().map(describe).collect()
}

/// Balls the shooter may aim at under `rule`.
pub fn legal_targets(balls: &[Ball], rule: TargetRule) -> Vec<&Ball> {
    let active = || balls.iter().filter(|b| b.is_active());
    match rule {
        TargetRule::OpenTable => active().filter(|b| b.color.group().is_some()).collect(),
        TargetRule::Group(group) => {
            let own: Vec<&Ball> = active().filter(|b| b.color == group.color()).collect();
            if own.is_empty() {
                active().filter(|b| b.color == BallColor::Black).collect()
            } else {
                own
            }
        }
    }
}

/// Every geometrically valid candidate for the legal targets, or one
/// direct-aim fallback per target when no pocketing line exists.
pub fn candidates(cue: &Ball, balls: &[Ball], table: &Table, rule: TargetRule) -> Vec<ShotCandidate> {
    let targets = legal_targets(balls, rule);

    let mut found: Vec<ShotCandidate> = targets
        .iter()
        .flat_map(|target| {
            table
                .pockets()
                .filter_map(move |(pocket, pocket_pos)| pocketing_line(cue, target, pocket, pocket_pos, balls, table))
        })
        .collect();

    if found.is_empty() {
        found = targets
            .iter()
            .filter_map(|target| direct_fallback(cue, target, balls, table))
            .collect();
        if !found.is_empty() {
            log::debug!("No pocketing line available, using {} direct-aim fallbacks", found.len());
        }
    }
    found
}

fn pocketing_line(
    cue: &Ball,
    target: &Ball,
    pocket: Pocket,
    pocket_pos: DVec2,
    balls: &[Ball],
    table: &Table,
) -> Option<ShotCandidate> {
    let to_pocket = pocket_pos - target.pos;
    let pocket_distance = to_pocket.length();
    let dir = to_pocket.try_normalize()?;

    let contact_point = target.pos - dir * (table.ball_radius * 2.0);
    if !table.is_playable(contact_point) {
        return None;
    }

    let cue_distance = cue.pos.distance(contact_point);
    // Cue already on the contact point: aim straight down the pocket line
    let angle = Shot::angle_between(cue.pos, contact_point)
        .or_else(|| Shot::angle_between(target.pos, pocket_pos))?;

    let pocket_path_clear = is_path_clear(target.pos, pocket_pos, balls, table.ball_radius, &[target.id]);
    let cue_path_clear = is_path_clear(cue.pos, contact_point, balls, table.ball_radius, &[cue.id]);

    Some(ShotCandidate {
        object_ball: ObjectBall::of(target),
        pocket,
        pocket_pos,
        contact_point,
        angle,
        power: suggested_power(cue_distance),
        difficulty: difficulty(cue_distance, pocket_distance, pocket_path_clear, cue_path_clear),
        pocket_path_clear,
        cue_path_clear,
        cue_distance,
        pocket_distance,
        fallback: false,
    })
}

fn direct_fallback(cue: &Ball, target: &Ball, balls: &[Ball], table: &Table) -> Option<ShotCandidate> {
    let dir = (target.pos - cue.pos).try_normalize()?;
    let angle = Shot::angle_between(cue.pos, target.pos)?;
    let contact_point = target.pos - dir * (table.ball_radius * 2.0);
    let pocket = table.nearest_pocket(target.pos);
    let pocket_pos = table.pocket_pos(pocket);

    Some(ShotCandidate {
        object_ball: ObjectBall::of(target),
        pocket,
        pocket_pos,
        contact_point,
        angle,
        power: FALLBACK_POWER,
        difficulty: FALLBACK_DIFFICULTY,
        pocket_path_clear: is_path_clear(target.pos, pocket_pos, balls, table.ball_radius, &[target.id]),
        cue_path_clear: is_path_clear(cue.pos, contact_point, balls, table.ball_radius, &[cue.id]),
        cue_distance: cue.pos.distance(contact_point),
        pocket_distance: target.pos.distance(pocket_pos),
        fallback: true,
    })
}

/// `true` when no active ball (other than `ignore`) has its centre within
/// `radius` of the segment `start..end`. Balls projecting outside the
/// segment span do not block.
pub fn is_path_clear(start: DVec2, end: DVec2, balls: &[Ball], radius: f64, ignore: &[BallId]) -> bool {
    let segment = end - start;
    let length = segment.length();
    let Some(dir) = segment.try_normalize() else {
        return true;
    };

    balls
        .iter()
        .filter(|b| b.is_active() && !ignore.contains(&b.id))
        .all(|b| {
            let to_ball = b.pos - start;
            let projection = to_ball.dot(dir);
            if projection < 0.0 || projection > length {
                return true;
            }
            let closest = start + dir * projection;
            closest.distance(b.pos) >= radius
        })
}

/// Weighted difficulty in [0, 1].
pub fn difficulty(cue_distance: f64, pocket_distance: f64, pocket_path_clear: bool, cue_path_clear: bool) -> f64 {
    let mut d = BASE_DIFFICULTY + cue_distance / CUE_DISTANCE_SCALE + pocket_distance / POCKET_DISTANCE_SCALE;
    if !pocket_path_clear {
        d += POCKET_PATH_PENALTY;
    }
    if !cue_path_clear {
        d += CUE_PATH_PENALTY;
    }
    d.clamp(0.0, 1.0)
}

fn suggested_power(cue_distance: f64) -> f64 {
    (BASE_POWER + cue_distance / POWER_DISTANCE_SCALE).min(MAX_SUGGESTED_POWER)
}

// Easiest first; ties broken by ball id then pocket order so output is stable
fn rank(candidates: &mut [ShotCandidate]) {
    candidates.sort_by(|a, b| {
        a.difficulty
            .total_cmp(&b.difficulty)
            .then(a.object_ball.id.cmp(&b.object_ball.id))
            .then(a.pocket.index().cmp(&b.pocket.index()))
    });
}

/// Offered when no cue ball was detected.
pub fn generic_suggestion() -> Suggestion {
    Suggestion {
        name: "Direct Shot".to_string(),
        description: "Aim directly at the nearest object ball".to_string(),
        tips: "Keep your cue level and follow through smoothly".to_string(),
        level: SkillLevel::Beginner,
        angle: 0.0,
        power: GENERIC_POWER,
        object_ball: None,
        pocket: None,
        pocket_pos: None,
        contact_point: None,
        difficulty: 0.0,
        path_clear: false,
        cue_path_clear: false,
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn ball_title(ball: &ObjectBall) -> String {
    match (ball.color, ball.number) {
        (BallColor::Black, _) => "Black Ball".to_string(),
        (color, Some(n)) => format!("{} {}", capitalize(color.as_str()), n),
        (color, None) => capitalize(color.as_str()),
    }
}

fn ball_phrase(ball: &ObjectBall) -> String {
    match ball.number {
        Some(n) => format!("the {} ball #{}", ball.color, n),
        None => format!("the {} ball", ball.color),
    }
}

fn describe(candidate: &ShotCandidate) -> Suggestion {
    let band = SkillLevel::for_difficulty(candidate.difficulty);
    let ball = &candidate.object_ball;
    let degrees = candidate.angle.round() as i64 % 360;

    let (name, description) = if candidate.fallback {
        (
            format!("Direct Shot ({})", ball_title(ball)),
            format!(
                "Aim {}° straight at {}. No clean line to a pocket; play it toward the {} pocket.",
                degrees,
                ball_phrase(ball),
                candidate.pocket
            ),
        )
    } else {
        let complexity = match band {
            SkillLevel::Expert => "Challenging",
            SkillLevel::Intermediate => "Moderate",
            SkillLevel::Beginner => "Simple",
        };
        (
            format!("{} Shot ({})", complexity, ball_title(ball)),
            format!(
                "Aim {}° to hit {} into the {} pocket.",
                degrees,
                ball_phrase(ball),
                candidate.pocket
            ),
        )
    };

    let mut tips = match band {
        SkillLevel::Expert => {
            "This is a challenging shot requiring precise aim and control. Focus on your stance and follow-through."
        }
        SkillLevel::Intermediate => {
            "Take your time to line up this shot. Make sure your bridge hand is stable."
        }
        SkillLevel::Beginner => "Keep your cue level and follow through smoothly after making contact.",
    }
    .to_string();
    if !candidate.pocket_path_clear {
        tips.push_str(" Caution: There are obstacles in the path to the pocket.");
    }

    Suggestion {
        name,
        description,
        tips,
        level: band,
        angle: candidate.angle,
        power: candidate.power,
        object_ball: Some(*ball),
        pocket: Some(candidate.pocket),
        pocket_pos: Some(candidate.pocket_pos),
        contact_point: Some(candidate.contact_point),
        difficulty: candidate.difficulty,
        path_clear: candidate.pocket_path_clear,
        cue_path_clear: candidate.cue_path_clear,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ball(id: u32, color: BallColor, number: Option<u8>, x: f64, y: f64) -> Ball {
        Ball::new(BallId(id), color, number, DVec2::new(x, y)).unwrap()
    }

    fn cue_and_red(cue: (f64, f64), red: (f64, f64)) -> Vec<Ball> {
        vec![
            ball(0, BallColor::White, None, cue.0, cue.1),
            ball(1, BallColor::Red, Some(3), red.0, red.1),
        ]
    }

    #[test]
    fn aims_at_ghost_ball_for_nearest_clear_pocket() {
        let table = Table::standard();
        let balls = cue_and_red((200.0, 200.0), (600.0, 150.0));
        let suggestions = suggest(&balls, SkillLevel::Expert, &table, TargetRule::OpenTable);

        let best = &suggestions[0];
        assert_eq!(best.pocket, Some(Pocket::TopRight));
        assert_eq!(best.pocket_pos, Some(DVec2::new(775.0, 25.0)));
        assert!(best.path_clear && best.cue_path_clear);

        // The shot travels from the cue ball to the contact point...
        let contact = best.contact_point.unwrap();
        let expected = Shot::angle_between(DVec2::new(200.0, 200.0), contact).unwrap();
        assert!((best.angle - expected).abs() < 1e-9);

        // ...which sits two radii behind the red, so contact -> red points at the pocket
        let red = DVec2::new(600.0, 150.0);
        assert!((contact.distance(red) - 28.0).abs() < 1e-9);
        let impact_dir = (red - contact).normalize();
        let pocket_dir = (DVec2::new(775.0, 25.0) - red).normalize();
        assert!(impact_dir.dot(pocket_dir) > 0.999_999);
    }

    #[test]
    fn beginner_always_gets_the_best_candidate() {
        let table = Table::standard();
        let balls = cue_and_red((200.0, 200.0), (600.0, 150.0));
        let suggestions = suggest(&balls, SkillLevel::Beginner, &table, TargetRule::OpenTable);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].pocket, Some(Pocket::TopRight));
        assert!(suggestions[0].difficulty >= 0.4);
    }

    #[test]
    fn easy_clear_shot_passes_beginner_filter() {
        let table = Table::standard();
        let balls = cue_and_red((640.0, 120.0), (700.0, 60.0));
        let suggestions = suggest(&balls, SkillLevel::Beginner, &table, TargetRule::OpenTable);
        assert!(!suggestions.is_empty());
        let s = &suggestions[0];
        assert!(s.difficulty < 0.4, "difficulty {}", s.difficulty);
        assert!(s.path_clear && s.cue_path_clear);
        assert_eq!(s.level, SkillLevel::Intermediate);
        assert_eq!(s.name, "Moderate Shot (Red 3)");
        assert!(s.description.ends_with("the red ball #3 into the top right pocket."));
    }

    #[test]
    fn blocked_pocket_path_is_penalised() {
        let table = Table::standard();
        let red = DVec2::new(600.0, 150.0);
        let pocket = DVec2::new(775.0, 25.0);
        let blocker = red + (pocket - red).normalize() * 100.0;
        let mut balls = cue_and_red((200.0, 200.0), (red.x, red.y));
        balls.push(ball(2, BallColor::Yellow, Some(1), blocker.x, blocker.y));

        let cue = balls[0].clone();
        let all = candidates(&cue, &balls, &table, TargetRule::Group(BallGroup::Red));
        let to_top_right = all.iter().find(|c| c.pocket == Pocket::TopRight).unwrap();
        assert!(!to_top_right.pocket_path_clear);
        assert!(to_top_right.cue_path_clear);
        assert_eq!(to_top_right.difficulty, 1.0);
        assert!(describe(to_top_right).tips.contains("Caution"));
    }

    #[test]
    fn targets_follow_rules_context() {
        let table = Table::standard();
        let mut balls = table.default_layout();

        let open = legal_targets(&balls, TargetRule::OpenTable);
        assert_eq!(open.len(), 14);
        assert!(open.iter().all(|b| b.color != BallColor::Black));

        let yellows = legal_targets(&balls, TargetRule::Group(BallGroup::Yellow));
        assert_eq!(yellows.len(), 7);
        assert!(yellows.iter().all(|b| b.color == BallColor::Yellow));

        for b in balls.iter_mut().filter(|b| b.color == BallColor::Yellow) {
            b.pocket();
        }
        let black = legal_targets(&balls, TargetRule::Group(BallGroup::Yellow));
        assert_eq!(black.len(), 1);
        assert_eq!(black[0].color, BallColor::Black);
    }

    #[test]
    fn missing_cue_ball_gives_generic_fallback() {
        let table = Table::standard();
        let balls = vec![ball(1, BallColor::Red, Some(1), 300.0, 200.0)];
        let suggestions = suggest(&balls, SkillLevel::Expert, &table, TargetRule::OpenTable);
        assert_eq!(suggestions, vec![generic_suggestion()]);
        assert_eq!(suggestions[0].power, 0.6);
    }

    #[test]
    fn no_legal_target_gives_nothing() {
        let table = Table::standard();
        let balls = vec![ball(0, BallColor::White, None, 300.0, 200.0)];
        assert!(suggest(&balls, SkillLevel::Beginner, &table, TargetRule::OpenTable).is_empty());
    }

    #[test]
    fn rail_frozen_ball_falls_back_to_direct_aim() {
        let table = Table::standard();
        let balls = cue_and_red((200.0, 200.0), (200.0, 14.0));
        let cue = balls[0].clone();
        let all = candidates(&cue, &balls, &table, TargetRule::OpenTable);
        assert_eq!(all.len(), 1);
        let fallback = &all[0];
        assert!(fallback.fallback);
        assert_eq!(fallback.difficulty, FALLBACK_DIFFICULTY);
        assert_eq!(fallback.power, FALLBACK_POWER);
        assert!((fallback.angle - 270.0).abs() < 1e-9);
        assert_eq!(fallback.pocket, Pocket::TopLeft);

        let suggestions = suggest(&balls, SkillLevel::Beginner, &table, TargetRule::OpenTable);
        assert_eq!(suggestions.len(), 1);
        assert!(suggestions[0].name.starts_with("Direct Shot"));
    }

    #[test]
    fn coincident_cue_and_target_is_skipped() {
        let table = Table::standard();
        let balls = cue_and_red((200.0, 14.0), (200.0, 14.0));
        let cue = balls[0].clone();
        let all = candidates(&cue, &balls, &table, TargetRule::OpenTable);
        assert!(all.iter().all(|c| c.angle.is_finite() && c.difficulty.is_finite()));
        assert!(all.is_empty());
    }

    #[test]
    fn level_caps_and_ordering() {
        let table = Table::standard();
        let balls = table.default_layout();
        let expert = suggest(&balls, SkillLevel::Expert, &table, TargetRule::OpenTable);
        assert!(!expert.is_empty() && expert.len() <= 4);
        assert!(expert.windows(2).all(|w| w[0].difficulty <= w[1].difficulty));

        let intermediate = suggest(&balls, SkillLevel::Intermediate, &table, TargetRule::OpenTable);
        assert!(!intermediate.is_empty() && intermediate.len() <= 3);
        if intermediate.len() > 1 {
            assert!(intermediate.iter().all(|s| s.difficulty < 0.7));
        }

        let again = suggest(&balls, SkillLevel::Expert, &table, TargetRule::OpenTable);
        assert_eq!(expert, again);
    }

    #[test]
    fn path_clearance_respects_segment_span() {
        let balls = vec![ball(5, BallColor::Red, Some(1), 150.0, 105.0)];
        let start = DVec2::new(100.0, 100.0);
        let end = DVec2::new(200.0, 100.0);
        assert!(!is_path_clear(start, end, &balls, 14.0, &[]));
        assert!(is_path_clear(start, end, &balls, 14.0, &[BallId(5)]));
        // Beyond the end of the segment
        assert!(is_path_clear(start, DVec2::new(120.0, 100.0), &balls, 14.0, &[]));
        // Degenerate segment
        assert!(is_path_clear(start, start, &balls, 14.0, &[]));
    }

    #[test]
    fn difficulty_is_clamped() {
        assert_eq!(difficulty(0.0, 0.0, true, true), 0.2);
        assert_eq!(difficulty(2000.0, 2000.0, false, false), 1.0);
        assert!((difficulty(400.0, 100.0, true, false) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn skill_level_labels() {
        assert_eq!("Expert".parse::<SkillLevel>().unwrap(), SkillLevel::Expert);
        assert!("pro".parse::<SkillLevel>().is_err());
        assert_eq!(SkillLevel::for_power(0.9), SkillLevel::Expert);
        assert_eq!(SkillLevel::for_power(0.7), SkillLevel::Intermediate);
        assert_eq!(SkillLevel::for_difficulty(0.1), SkillLevel::Beginner);
    }
}
