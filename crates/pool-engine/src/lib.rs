pub mod advisor;
pub mod balls;
pub mod config;
pub mod error;
pub mod game;
pub mod physics;
pub mod rng;
pub mod rules;
pub mod shot;
pub mod table;
pub mod time;
pub mod wire;

// Re-export key types at crate root for convenience
pub use advisor::{suggest, SkillLevel, Suggestion, TargetRule};
pub use balls::{Ball, BallColor, BallCounts, BallGroup, BallId, Trail};
pub use config::EngineConfig;
pub use error::{BallError, ConfigError, MatchError, RulesError, WireError};
pub use game::{Match, MatchPhase, MatchSnapshot};
pub use physics::{is_settled, step, strike, ShotResult, Simulation, StepEvents, StepParams};
pub use rng::Rng;
pub use rules::{GameState, GameStatus, LogEntry, Phase, Player, ShotInput, ShotVerdict, TurnOutcome};
pub use shot::Shot;
pub use table::{Pocket, Table, TableConfig};
pub use time::FixedTimestep;
