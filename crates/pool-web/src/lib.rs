pub mod runner;

pub use runner::MatchRunner;

use std::cell::RefCell;

use wasm_bindgen::prelude::*;

thread_local! {
    static RUNNER: RefCell<Option<MatchRunner>> = RefCell::new(None);
}

fn with_runner<R>(fallback: R, f: impl FnOnce(&mut MatchRunner) -> R) -> R {
    RUNNER.with(|cell| match cell.borrow_mut().as_mut() {
        Some(runner) => f(runner),
        None => {
            log::error!("Match not initialized. Call pool_init() first.");
            fallback
        }
    })
}

fn not_initialized() -> String {
    r#"{"error":"match not initialized"}"#.to_string()
}

/// Start a match. Pass empty strings for the default config and rack.
#[wasm_bindgen]
pub fn pool_init(config_json: &str, layout_json: &str) {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);

    let runner = MatchRunner::from_json(config_json, layout_json);
    RUNNER.with(|cell| {
        *cell.borrow_mut() = Some(runner);
    });
    log::info!("pool: initialized");
}

#[wasm_bindgen]
pub fn pool_shoot(angle: f64, power: f64) -> String {
    with_runner(not_initialized(), |r| r.shoot(angle, power))
}

#[wasm_bindgen]
pub fn pool_shoot_json(json: &str) -> String {
    with_runner(not_initialized(), |r| r.shoot_json(json))
}

/// Advance one animation frame (`dt` in seconds). Returns `true` on the
/// frame the shot comes to rest.
#[wasm_bindgen]
pub fn pool_tick(dt: f64) -> bool {
    with_runner(false, |r| r.tick(dt))
}

#[wasm_bindgen]
pub fn pool_is_settled() -> bool {
    with_runner(true, |r| r.is_settled())
}

// ---- Data accessors ----

#[wasm_bindgen]
pub fn pool_snapshot_json() -> String {
    with_runner(not_initialized(), |r| r.snapshot_json())
}

#[wasm_bindgen]
pub fn pool_suggestions_json(level: &str) -> String {
    with_runner(not_initialized(), |r| r.suggestions_json(level))
}

#[wasm_bindgen]
pub fn pool_aim_help_json(level: &str) -> String {
    with_runner(not_initialized(), |r| r.aim_help_json(level))
}

#[wasm_bindgen]
pub fn pool_status_json() -> String {
    with_runner(not_initialized(), |r| r.status_json())
}

#[wasm_bindgen]
pub fn pool_recent_log_json(count: u32) -> String {
    with_runner(not_initialized(), |r| r.recent_log_json(count as usize))
}

#[wasm_bindgen]
pub fn pool_last_verdict_json() -> String {
    with_runner(not_initialized(), |r| r.last_verdict_json())
}

#[wasm_bindgen]
pub fn pool_last_result_json() -> String {
    with_runner(not_initialized(), |r| r.last_result_json())
}

// ---- Commands ----

#[wasm_bindgen]
pub fn pool_select_group(color: &str) -> String {
    with_runner(not_initialized(), |r| r.select_group(color))
}

#[wasm_bindgen]
pub fn pool_rerack() {
    with_runner((), |r| r.rerack());
}
