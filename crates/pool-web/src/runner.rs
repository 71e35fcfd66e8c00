use pool_engine::wire::{self, AimHelpView, ShotResultView};
use pool_engine::{BallColor, EngineConfig, Match, Shot, SkillLevel};
use serde::Serialize;

/// Owns one `Match` and speaks JSON strings to the page.
///
/// The page keeps a single runner in a `thread_local!` and calls the
/// `#[wasm_bindgen]` free functions in `lib.rs`, because wasm-bindgen cannot
/// export the engine types directly. Failures come back as `{"error": ...}`.
pub struct MatchRunner {
    game: Match,
}

impl MatchRunner {
    /// Build a runner from optional JSON. Empty strings mean defaults; a
    /// bad config or layout is logged and replaced by the default.
    pub fn from_json(config_json: &str, layout_json: &str) -> Self {
        let config = if config_json.trim().is_empty() {
            EngineConfig::default()
        } else {
            EngineConfig::from_json(config_json).unwrap_or_else(|e| {
                log::warn!("Invalid engine config, using defaults: {}", e);
                EngineConfig::default()
            })
        };

        let game = if layout_json.trim().is_empty() {
            Match::new(config)
        } else {
            match wire::parse_balls(layout_json) {
                Ok(balls) => Match::with_layout(config, balls),
                Err(e) => {
                    log::warn!("Invalid ball layout, using default rack: {}", e);
                    Match::new(config)
                }
            }
        };

        Self {
            game: game.unwrap_or_else(|e| {
                log::warn!("Could not start match ({}), using standard table", e);
                Match::standard()
            }),
        }
    }

    pub fn game(&self) -> &Match {
        &self.game
    }

    pub fn shoot(&mut self, angle: f64, power: f64) -> String {
        match self.game.take_shot(Shot::new(angle, power)) {
            Ok(applied) => to_json(&applied),
            Err(e) => error_json(&e.to_string()),
        }
    }

    pub fn shoot_json(&mut self, json: &str) -> String {
        match wire::parse_shot(json) {
            Ok(shot) => self.shoot(shot.angle, shot.power),
            Err(e) => error_json(&e.to_string()),
        }
    }

    /// Advance one display frame. `true` on the frame the shot settles.
    pub fn tick(&mut self, frame_dt: f64) -> bool {
        self.game.tick(frame_dt).is_some()
    }

    pub fn is_settled(&self) -> bool {
        self.game.is_settled()
    }

    pub fn snapshot_json(&self) -> String {
        to_json(&self.game.snapshot())
    }

    pub fn suggestions_json(&self, level: &str) -> String {
        match level.parse::<SkillLevel>() {
            Ok(level) => to_json(&wire::suggestions_view(&self.game.suggestions(level))),
            Err(e) => error_json(&e.to_string()),
        }
    }

    pub fn aim_help_json(&self, level: &str) -> String {
        match level.parse::<SkillLevel>() {
            Ok(level) => to_json(&AimHelpView::from(level)),
            Err(e) => error_json(&e.to_string()),
        }
    }

    pub fn select_group(&mut self, color: &str) -> String {
        let result = color
            .parse::<BallColor>()
            .map_err(|e| e.to_string())
            .and_then(|color| self.game.select_group(color).map_err(|e| e.to_string()));
        match result {
            Ok(()) => to_json(&self.game.status()),
            Err(e) => error_json(&e),
        }
    }

    pub fn status_json(&self) -> String {
        to_json(&self.game.status())
    }

    /// Most recent history entries, newest first.
    pub fn recent_log_json(&self, n: usize) -> String {
        to_json(&self.game.rules().recent_log(n))
    }

    /// `null` until the first shot settles.
    pub fn last_verdict_json(&self) -> String {
        to_json(&self.game.last_verdict())
    }

    pub fn last_result_json(&self) -> String {
        to_json(&self.game.last_result().map(ShotResultView::from))
    }

    pub fn rerack(&mut self) {
        self.game.rerack();
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| error_json(&e.to_string()))
}

fn error_json(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn parse(s: &str) -> Value {
        serde_json::from_str(s).unwrap()
    }

    #[test]
    fn defaults_from_empty_input() {
        let runner = MatchRunner::from_json("", "");
        let snap = parse(&runner.snapshot_json());
        assert_eq!(snap["phase"], "aiming");
        assert_eq!(snap["width"], 800.0);
        assert_eq!(snap["balls"].as_array().unwrap().len(), 16);
        assert_eq!(runner.last_verdict_json(), "null");
    }

    #[test]
    fn bad_input_falls_back() {
        let runner = MatchRunner::from_json(r#"{ "table": { "width": -1 } }"#, "[oops");
        assert_eq!(runner.game().table().width, 800.0);
        assert_eq!(runner.game().balls().len(), 16);
    }

    #[test]
    fn detected_layout_is_used() {
        let layout = r#"[
            { "id": 0, "color": "white", "x": 200, "y": 200 },
            { "id": 1, "color": "red", "number": 3, "x": 600, "y": 150 }
        ]"#;
        let runner = MatchRunner::from_json("", layout);
        let suggestions = parse(&runner.suggestions_json("beginner"));
        assert_eq!(suggestions.as_array().unwrap().len(), 1);
        assert_eq!(suggestions[0]["pocket"], "topRight");
        assert_eq!(suggestions[0]["powerLevel"], "expert");
        assert!(parse(&runner.suggestions_json("wizard"))["error"].is_string());
    }

    #[test]
    fn shot_lifecycle() {
        let mut runner = MatchRunner::from_json("", "");
        let applied = parse(&runner.shoot_json(r#"{ "angle": 0, "power": 0.8 }"#));
        assert_eq!(applied["power"], 0.8);
        assert!(!runner.is_settled());
        assert!(parse(&runner.shoot(0.0, 0.5))["error"].is_string());

        let mut settled = false;
        for _ in 0..20_000 {
            if runner.tick(1.0 / 60.0) {
                settled = true;
                break;
            }
        }
        assert!(settled);
        assert!(runner.is_settled());

        let verdict = parse(&runner.last_verdict_json());
        assert!(verdict["message"].is_string());
        assert!(verdict["isFoul"].is_boolean());
        let result = parse(&runner.last_result_json());
        assert_eq!(result["finalBalls"].as_array().unwrap().len(), 16);

        let log = parse(&runner.recent_log_json(20));
        assert!(log.as_array().unwrap().len() >= 2);
        assert!(log[0]["timestamp"].is_string());

        runner.rerack();
        assert_eq!(runner.last_verdict_json(), "null");
        assert_eq!(parse(&runner.status_json())["shotsPlayed"], 0);
    }

    #[test]
    fn aim_help_by_level() {
        let runner = MatchRunner::from_json("", "");
        let help = parse(&runner.aim_help_json("Expert"));
        assert_eq!(help["level"], "expert");
        assert!(help["text"].as_str().unwrap().contains("spin"));
        assert!(parse(&runner.aim_help_json("pro"))["error"].is_string());
    }

    #[test]
    fn group_selection_errors_are_reported() {
        let mut runner = MatchRunner::from_json("", "");
        assert!(parse(&runner.select_group("red"))["error"].is_string());
        assert!(parse(&runner.select_group("purple"))["error"].is_string());
    }
}
