//! Reds-and-yellows (UK 8-ball) rules as an immutable state machine.
//!
//! `GameState::evaluate` is a pure transition: it takes the state, the
//! before/after snapshots and the balls pocketed in one shot, and returns the
//! next state plus a verdict. Precedence, highest first:
//!
//! 1. cue ball pocketed: foul, turn passes
//! 2. black pocketed on the break: foul, re-rack, breaker keeps the turn
//! 3. black pocketed otherwise: shooter wins only with their group cleared,
//!    else the opponent wins
//! 4. open table: both colours wait for a group choice, one colour is
//!    assigned to the shooter, none passes the turn
//! 5. groups assigned: an opponent ball passes the turn, an own ball
//!    continues, none passes

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::advisor::TargetRule;
use crate::balls::{Ball, BallColor, BallCounts, BallGroup, BallId};
use crate::error::RulesError;
use crate::shot::Shot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Player {
    One,
    Two,
}

impl Player {
    pub fn opponent(self) -> Player {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Player::One => 1,
            Player::Two => 2,
        }
    }
}

impl From<Player> for u8 {
    fn from(player: Player) -> u8 {
        player.number()
    }
}

impl TryFrom<u8> for Player {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            1 => Ok(Player::One),
            2 => Ok(Player::Two),
            _ => Err(format!("player must be 1 or 2, got {}", n)),
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Player {}", self.number())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    AwaitingBreak,
    OpenTable,
    GroupsAssigned,
    GameOver,
}

/// Which group each player owns; both `None` while the table is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerGroups {
    #[serde(rename = "player1")]
    pub one: Option<BallGroup>,
    #[serde(rename = "player2")]
    pub two: Option<BallGroup>,
}

impl PlayerGroups {
    pub fn get(&self, player: Player) -> Option<BallGroup> {
        match player {
            Player::One => self.one,
            Player::Two => self.two,
        }
    }

    fn assign(&mut self, player: Player, group: BallGroup) {
        match player {
            Player::One => {
                self.one = Some(group);
                self.two = Some(group.other());
            }
            Player::Two => {
                self.two = Some(group);
                self.one = Some(group.other());
            }
        }
    }

    pub fn is_assigned(&self) -> bool {
        self.one.is_some() && self.two.is_some()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoulCounts {
    #[serde(rename = "player1")]
    pub one: u32,
    #[serde(rename = "player2")]
    pub two: u32,
}

impl FoulCounts {
    pub fn get(&self, player: Player) -> u32 {
        match player {
            Player::One => self.one,
            Player::Two => self.two,
        }
    }

    fn record(&mut self, player: Player) {
        match player {
            Player::One => self.one += 1,
            Player::Two => self.two += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Foul {
    CueBallPocketed,
    BlackOnBreak,
    BlackPocketedEarly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum LogEvent {
    GameStarted,
    Foul { foul: Foul },
    GroupsAssigned { group: BallGroup },
    GroupChoicePending,
    OwnBallPotted { count: u32 },
    TurnEnded,
    Rerack,
    GameWon { winner: Player },
}

impl LogEvent {
    pub fn is_foul(&self) -> bool {
        matches!(self, LogEvent::Foul { .. })
    }
}

/// One append-only history record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub player: Player,
    pub event: LogEvent,
    pub message: String,
    pub ball_groups: PlayerGroups,
    pub remaining_balls: BallCounts,
}

/// How the turn proceeds after a shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TurnOutcome {
    /// Shooter plays again.
    Continue,
    /// Opponent plays next.
    Pass,
    /// Black went down on the break: re-rack, breaker breaks again.
    Rerack,
    /// Both colours pocketed on an open table; shooter picks a group.
    AwaitGroupChoice,
    GameOver,
    /// Shot submitted after the game ended; nothing changed.
    Ignored,
}

/// One shot as seen by the rules.
#[derive(Debug, Clone, Copy)]
pub struct ShotInput<'a> {
    pub before: &'a [Ball],
    pub after: &'a [Ball],
    pub shot: Option<Shot>,
    pub pocketed: &'a [Ball],
}

/// Result of evaluating one shot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShotVerdict {
    pub shooter: Player,
    /// Player to move after this shot.
    pub current_player: Player,
    pub next_player: Option<Player>,
    pub is_foul: bool,
    pub is_game_over: bool,
    pub winner: Option<Player>,
    pub message: String,
    pub detailed_message: String,
    pub can_select_group: bool,
    pub rerack_required: bool,
    pub ball_groups: PlayerGroups,
    pub remaining_balls: BallCounts,
    /// Balls counted as newly pocketed by this shot.
    pub pocketed: Vec<BallId>,
    pub outcome: TurnOutcome,
}

/// Read-only view for history panels and status bars.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStatus {
    pub is_game_started: bool,
    pub phase: Phase,
    pub current_player: Player,
    pub ball_groups: PlayerGroups,
    pub is_ball_groups_assigned: bool,
    pub is_break_shot: bool,
    pub can_select_group: bool,
    pub remaining_balls: BallCounts,
    pub fouls: FoulCounts,
    pub winner: Option<Player>,
    pub shots_played: u32,
    pub log: Vec<LogEntry>,
}

/// Complete rules state. Never mutated in place by callers; every transition
/// returns a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    phase: Phase,
    current_player: Player,
    groups: PlayerGroups,
    is_break_shot: bool,
    group_choice_pending: bool,
    remaining: BallCounts,
    fouls: FoulCounts,
    winner: Option<Player>,
    shots_played: u32,
    log: Vec<LogEntry>,
}

/// Per-colour tally of the balls a shot newly pocketed.
#[derive(Debug, Default)]
struct Potted {
    ids: Vec<BallId>,
    cue: bool,
    black: bool,
    red: u32,
    yellow: u32,
}

impl Potted {
    // A ball counts once: repeats within the list and balls already down in
    // the before snapshot are dropped.
    fn tally(before: &[Ball], pocketed: &[Ball]) -> Self {
        let mut potted = Potted::default();
        for ball in pocketed {
            if potted.ids.contains(&ball.id) {
                continue;
            }
            let already_down = before.iter().any(|b| b.id == ball.id && b.pocketed);
            if already_down {
                continue;
            }
            potted.ids.push(ball.id);
            match ball.color {
                BallColor::White => potted.cue = true,
                BallColor::Black => potted.black = true,
                BallColor::Red => potted.red += 1,
                BallColor::Yellow => potted.yellow += 1,
            }
        }
        potted
    }

    fn of_group(&self, group: BallGroup) -> u32 {
        match group {
            BallGroup::Red => self.red,
            BallGroup::Yellow => self.yellow,
        }
    }
}

impl GameState {
    /// Start a game on `balls`: player one to break.
    pub fn new(balls: &[Ball], now: DateTime<Utc>) -> Self {
        let mut state = Self {
            phase: Phase::AwaitingBreak,
            current_player: Player::One,
            groups: PlayerGroups::default(),
            is_break_shot: true,
            group_choice_pending: false,
            remaining: BallCounts::from_balls(balls),
            fouls: FoulCounts::default(),
            winner: None,
            shots_played: 0,
            log: Vec::new(),
        };
        state.record(now, Player::One, LogEvent::GameStarted, "Game started. Player 1 to break.".to_string());
        log::info!("Game started with {} balls on the table", balls.iter().filter(|b| b.is_active()).count());
        state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_player(&self) -> Player {
        self.current_player
    }

    pub fn groups(&self) -> PlayerGroups {
        self.groups
    }

    pub fn is_ball_groups_assigned(&self) -> bool {
        self.groups.is_assigned()
    }

    pub fn is_break_shot(&self) -> bool {
        self.is_break_shot
    }

    pub fn can_select_group(&self) -> bool {
        self.group_choice_pending
    }

    pub fn remaining(&self) -> BallCounts {
        self.remaining
    }

    pub fn fouls(&self) -> FoulCounts {
        self.fouls
    }

    pub fn winner(&self) -> Option<Player> {
        self.winner
    }

    pub fn is_game_over(&self) -> bool {
        self.phase == Phase::GameOver
    }

    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    /// The `n` most recent log entries, newest first.
    pub fn recent_log(&self, n: usize) -> Vec<&LogEntry> {
        self.log.iter().rev().take(n).collect()
    }

    /// What the player to move may aim at.
    pub fn target_rule(&self) -> TargetRule {
        match self.groups.get(self.current_player) {
            Some(group) => TargetRule::Group(group),
            None => TargetRule::OpenTable,
        }
    }

    pub fn status(&self) -> GameStatus {
        GameStatus {
            is_game_started: true,
            phase: self.phase,
            current_player: self.current_player,
            ball_groups: self.groups,
            is_ball_groups_assigned: self.groups.is_assigned(),
            is_break_shot: self.is_break_shot,
            can_select_group: self.group_choice_pending,
            remaining_balls: self.remaining,
            fouls: self.fouls,
            winner: self.winner,
            shots_played: self.shots_played,
            log: self.log.clone(),
        }
    }

    /// Give `color` to the player to move and the other colour to the opponent.
    pub fn assign_ball_groups(&self, color: BallColor, now: DateTime<Utc>) -> Result<GameState, RulesError> {
        let group = color.group().ok_or(RulesError::InvalidGroupColor(color))?;
        if self.groups.is_assigned() {
            return Err(RulesError::GroupsAlreadyAssigned);
        }
        let mut next = self.clone();
        next.assign(group, now);
        Ok(next)
    }

    /// Fresh rack after a black on the break: counts reset, breaker and fouls kept.
    pub fn rerack(&self, balls: &[Ball], now: DateTime<Utc>) -> GameState {
        let mut next = self.clone();
        next.phase = Phase::AwaitingBreak;
        next.is_break_shot = true;
        next.group_choice_pending = false;
        next.groups = PlayerGroups::default();
        next.remaining = BallCounts::from_balls(balls);
        let message = format!("Table re-racked. {} to break.", next.current_player);
        next.record(now, next.current_player, LogEvent::Rerack, message);
        next
    }

    /// Apply one shot. After game over the input is ignored and the state
    /// returned unchanged.
    pub fn evaluate(&self, input: &ShotInput<'_>, now: DateTime<Utc>) -> (GameState, ShotVerdict) {
        let shooter = self.current_player;

        if self.phase == Phase::GameOver {
            log::warn!("Shot submitted after game over, ignoring");
            let verdict = self.verdict(
                shooter,
                TurnOutcome::Ignored,
                false,
                "Game is over".to_string(),
                "Start a new game to keep playing.".to_string(),
                Vec::new(),
            );
            return (self.clone(), verdict);
        }

        let potted = Potted::tally(input.before, input.pocketed);
        let was_break = self.is_break_shot;

        let mut next = self.clone();
        next.remaining = BallCounts::from_balls(input.after);
        next.is_break_shot = false;
        next.group_choice_pending = false;
        next.shots_played += 1;
        if next.phase == Phase::AwaitingBreak {
            next.phase = Phase::OpenTable;
        }

        let (outcome, is_foul, message, detail) = if potted.cue {
            next.foul(now, shooter, Foul::CueBallPocketed, "Foul! Cue ball pocketed.");
            next.pass_turn(now, shooter);
            (
                TurnOutcome::Pass,
                true,
                "Foul! Cue ball pocketed".to_string(),
                format!("{}'s turn with ball in hand.", shooter.opponent()),
            )
        } else if potted.black && was_break {
            next.foul(now, shooter, Foul::BlackOnBreak, "Foul! Black ball pocketed on the break.");
            next.phase = Phase::AwaitingBreak;
            next.is_break_shot = true;
            (
                TurnOutcome::Rerack,
                true,
                "Foul! Black ball pocketed on the break".to_string(),
                format!("The table must be re-racked. {} breaks again.", shooter),
            )
        } else if potted.black {
            let cleared = self
                .groups
                .get(shooter)
                .map(|group| next.remaining.group(group) == 0)
                .unwrap_or(false);
            if cleared {
                next.win(now, shooter, shooter);
                (
                    TurnOutcome::GameOver,
                    false,
                    format!("{} wins!", shooter),
                    format!("{} cleared their group and pocketed the black.", shooter),
                )
            } else {
                let winner = shooter.opponent();
                next.foul(now, shooter, Foul::BlackPocketedEarly, "Foul! Black ball pocketed early.");
                next.win(now, shooter, winner);
                (
                    TurnOutcome::GameOver,
                    true,
                    format!("{} wins!", winner),
                    format!("{} pocketed the black before clearing their group.", shooter),
                )
            }
        } else if let Some(own) = self.groups.get(shooter) {
            let own_count = potted.of_group(own);
            let opponent_count = potted.of_group(own.other());
            if opponent_count > 0 {
                next.pass_turn(now, shooter);
                (
                    TurnOutcome::Pass,
                    false,
                    format!("{}'s turn", shooter.opponent()),
                    format!("{} pocketed an opponent ball.", shooter),
                )
            } else if own_count > 0 {
                next.record(
                    now,
                    shooter,
                    LogEvent::OwnBallPotted { count: own_count },
                    format!("{} pocketed {} {} ball(s).", shooter, own_count, own),
                );
                (
                    TurnOutcome::Continue,
                    false,
                    format!("Good shot, {}!", shooter),
                    format!("{} continues.", shooter),
                )
            } else {
                next.pass_turn(now, shooter);
                (
                    TurnOutcome::Pass,
                    false,
                    format!("{}'s turn", shooter.opponent()),
                    "No ball pocketed.".to_string(),
                )
            }
        } else {
            match (potted.red > 0, potted.yellow > 0) {
                (true, true) => {
                    next.group_choice_pending = true;
                    next.record(
                        now,
                        shooter,
                        LogEvent::GroupChoicePending,
                        format!("{} pocketed both colours and chooses a group.", shooter),
                    );
                    (
                        TurnOutcome::AwaitGroupChoice,
                        false,
                        "Choose your group".to_string(),
                        format!("{} pocketed both red and yellow. Pick a colour to play.", shooter),
                    )
                }
                (true, false) | (false, true) => {
                    let group = if potted.red > 0 { BallGroup::Red } else { BallGroup::Yellow };
                    next.assign(group, now);
                    (
                        TurnOutcome::Continue,
                        false,
                        format!("{} is {}", shooter, group),
                        format!("{} plays {}, {} plays {}. {} continues.", shooter, group, shooter.opponent(), group.other(), shooter),
                    )
                }
                (false, false) => {
                    next.pass_turn(now, shooter);
                    (
                        TurnOutcome::Pass,
                        false,
                        format!("{}'s turn", shooter.opponent()),
                        "No ball pocketed.".to_string(),
                    )
                }
            }
        };

        if is_foul {
            log::info!("{}: {}", message, detail);
        } else {
            log::debug!("{}: {}", message, detail);
        }
        let verdict = next.verdict(shooter, outcome, is_foul, message, detail, potted.ids);
        (next, verdict)
    }

    fn verdict(
        &self,
        shooter: Player,
        outcome: TurnOutcome,
        is_foul: bool,
        message: String,
        detailed_message: String,
        pocketed: Vec<BallId>,
    ) -> ShotVerdict {
        let is_game_over = self.phase == Phase::GameOver;
        ShotVerdict {
            shooter,
            current_player: self.current_player,
            next_player: if is_game_over { None } else { Some(self.current_player) },
            is_foul,
            is_game_over,
            winner: self.winner,
            message,
            detailed_message,
            can_select_group: self.group_choice_pending,
            rerack_required: outcome == TurnOutcome::Rerack,
            ball_groups: self.groups,
            remaining_balls: self.remaining,
            pocketed,
            outcome,
        }
    }

    fn record(&mut self, now: DateTime<Utc>, player: Player, event: LogEvent, message: String) {
        self.log.push(LogEntry {
            timestamp: now,
            player,
            event,
            message,
            ball_groups: self.groups,
            remaining_balls: self.remaining,
        });
    }

    fn foul(&mut self, now: DateTime<Utc>, player: Player, foul: Foul, message: &str) {
        self.fouls.record(player);
        self.record(now, player, LogEvent::Foul { foul }, message.to_string());
    }

    fn pass_turn(&mut self, now: DateTime<Utc>, shooter: Player) {
        self.current_player = shooter.opponent();
        let message = format!("{}'s turn ended.", shooter);
        self.record(now, shooter, LogEvent::TurnEnded, message);
    }

    fn win(&mut self, now: DateTime<Utc>, shooter: Player, winner: Player) {
        self.phase = Phase::GameOver;
        self.winner = Some(winner);
        self.record(now, shooter, LogEvent::GameWon { winner }, format!("{} wins!", winner));
        log::info!("{} wins the game", winner);
    }

    fn assign(&mut self, group: BallGroup, now: DateTime<Utc>) {
        let player = self.current_player;
        self.groups.assign(player, group);
        self.group_choice_pending = false;
        self.phase = Phase::GroupsAssigned;
        let message = format!("{} plays {}.", player, group);
        self.record(now, player, LogEvent::GroupsAssigned { group }, message);
        log::info!("{} assigned {}", player, group);
    }
}
